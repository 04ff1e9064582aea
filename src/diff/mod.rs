//! Diff result model, built-in engines and text formatting
//!
//! Engines implement [`DiffEngine`] and produce a flat edit script
//! ([`DiffResult`]). The formatter renders inline or side-by-side results
//! for terminal output.

pub mod engines;
pub mod formatter;
pub mod model;

pub use engines::{
    DiffEngine, EngineCapabilities, EngineConfig, PreciseEngine, ScalableEngine,
    PRECISE_ENGINE_ID, SCALABLE_ENGINE_ID,
};
pub use formatter::{DiffFormatter, Layout};
pub use model::{
    line_breaks, visual_rows, Change, ChangeKind, DiffMode, DiffResult, DiffStats, SideBySideResult,
};
