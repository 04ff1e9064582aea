use std::collections::BTreeMap;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use similar::{Algorithm, ChangeTag, TextDiff};

use super::model::{Change, ChangeKind, DiffMode, DiffResult};
use crate::core::alignment::AlignmentEngine;

/// Per-engine configuration map
pub type EngineConfig = BTreeMap<String, Value>;

/// Built-in id of the character-precise engine
pub const PRECISE_ENGINE_ID: &str = "dmp";
/// Built-in id of the engine tuned for large, line-oriented inputs
pub const SCALABLE_ENGINE_ID: &str = "dtl";

/// What an engine can handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineCapabilities {
    pub supports_large_files: bool,
    pub supports_unicode: bool,
    pub supports_binary: bool,
    pub supports_line_mode: bool,
    pub supports_char_mode: bool,
    pub supports_word_mode: bool,
    /// Combined input size in bytes above which the engine is not recommended
    pub max_recommended_size: usize,
    pub description: String,
}

impl EngineCapabilities {
    pub fn supports_mode(&self, mode: DiffMode) -> bool {
        match mode {
            DiffMode::Auto => true,
            DiffMode::Line => self.supports_line_mode,
            DiffMode::Char => self.supports_char_mode,
            DiffMode::Word => self.supports_word_mode,
        }
    }
}

/// Trait implemented by every pluggable diff engine
///
/// Engines are created fresh for each computation and dropped afterwards,
/// so implementations may keep per-run state in `&self` without locking.
pub trait DiffEngine: Send {
    /// Compute a flat edit script turning `left` into `right`
    fn compute(&self, left: &str, right: &str, mode: DiffMode) -> DiffResult;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn capabilities(&self) -> EngineCapabilities;

    /// Current configuration, including defaults
    fn configuration(&self) -> EngineConfig;

    /// Merge `config` into the current configuration
    fn set_configuration(&mut self, config: EngineConfig);

    /// Keys this engine interprets
    fn configuration_keys(&self) -> Vec<String>;

    /// Rough cost estimate for diffing the two inputs
    fn estimate_complexity(&self, left: &str, right: &str) -> usize {
        left.len() + right.len()
    }

    /// Whether the inputs fall within this engine's recommended size
    fn is_recommended_for(&self, left: &str, right: &str) -> bool {
        left.len() + right.len() <= self.capabilities().max_recommended_size
    }
}

/// Granularity at which `similar` tokenizes the inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Granularity {
    Line,
    Char,
    Word,
}

impl Granularity {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Char => "char",
            Self::Word => "word",
        }
    }
}

// Shared conversion from similar's change stream to our change units
fn edit_script(
    left: &str,
    right: &str,
    granularity: Granularity,
    algorithm: Algorithm,
    timeout: Option<Duration>,
) -> Vec<Change> {
    let mut config = TextDiff::configure();
    config.algorithm(algorithm);
    if let Some(timeout) = timeout {
        config.timeout(timeout);
    }

    let diff = match granularity {
        Granularity::Line => config.diff_lines(left, right),
        Granularity::Char => config.diff_chars(left, right),
        Granularity::Word => config.diff_words(left, right),
    };

    let mut changes: Vec<Change> = Vec::new();
    for change in diff.iter_all_changes() {
        let kind = match change.tag() {
            ChangeTag::Equal => ChangeKind::Equal,
            ChangeTag::Insert => ChangeKind::Insert,
            ChangeTag::Delete => ChangeKind::Delete,
        };

        match changes.last_mut() {
            Some(last) if last.kind == kind => last.text.push_str(change.value()),
            _ => changes.push(Change::new(kind, change.value())),
        }
    }

    changes
}

/// Assign source positions and inline line numbers
fn finalize(mut changes: Vec<Change>) -> Vec<Change> {
    let mut left_pos = 0;
    let mut right_pos = 0;

    for change in &mut changes {
        let len = change.char_len();
        match change.kind {
            ChangeKind::Equal => {
                change.position = left_pos;
                left_pos += len;
                right_pos += len;
            }
            ChangeKind::Delete | ChangeKind::Replace => {
                change.position = left_pos;
                left_pos += len;
            }
            ChangeKind::Insert => {
                change.position = right_pos;
                right_pos += len;
            }
        }
    }

    AlignmentEngine::number_inline(&mut changes);
    changes
}

/// Absorb short equalities sitting between two edits into the surrounding
/// edit regions, so the script reads as whole-word replacements.
fn merge_small_equalities(changes: Vec<Change>, edit_cost: usize) -> Vec<Change> {
    enum Segment {
        Equal(String),
        Edit { deleted: String, inserted: String },
    }

    let mut segments: Vec<Segment> = Vec::new();
    for change in changes {
        match change.kind {
            ChangeKind::Equal => segments.push(Segment::Equal(change.text)),
            kind => {
                if !matches!(segments.last(), Some(Segment::Edit { .. })) {
                    segments.push(Segment::Edit {
                        deleted: String::new(),
                        inserted: String::new(),
                    });
                }
                if let Some(Segment::Edit { deleted, inserted }) = segments.last_mut() {
                    if kind == ChangeKind::Insert {
                        inserted.push_str(&change.text);
                    } else {
                        deleted.push_str(&change.text);
                    }
                }
            }
        }
    }

    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
    let mut iter = segments.into_iter().peekable();
    while let Some(segment) = iter.next() {
        match segment {
            Segment::Equal(text) => {
                let between_edits = matches!(merged.last(), Some(Segment::Edit { .. }))
                    && matches!(iter.peek(), Some(Segment::Edit { .. }));
                if between_edits && text.chars().count() < edit_cost {
                    if let Some(Segment::Edit { deleted, inserted }) = merged.last_mut() {
                        deleted.push_str(&text);
                        inserted.push_str(&text);
                    }
                } else {
                    merged.push(Segment::Equal(text));
                }
            }
            Segment::Edit { deleted, inserted } => {
                if let Some(Segment::Edit { deleted: d, inserted: i }) = merged.last_mut() {
                    d.push_str(&deleted);
                    i.push_str(&inserted);
                } else {
                    merged.push(Segment::Edit { deleted, inserted });
                }
            }
        }
    }

    let mut out = Vec::new();
    for segment in merged {
        match segment {
            Segment::Equal(text) => out.push(Change::equal(text)),
            Segment::Edit { deleted, inserted } => {
                if !deleted.is_empty() {
                    out.push(Change::delete(deleted));
                }
                if !inserted.is_empty() {
                    out.push(Change::insert(inserted));
                }
            }
        }
    }
    out
}

fn config_f64(config: &EngineConfig, key: &str, default: f64) -> f64 {
    config.get(key).and_then(Value::as_f64).unwrap_or(default)
}

fn config_usize(config: &EngineConfig, key: &str, default: usize) -> usize {
    config
        .get(key)
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .unwrap_or(default)
}

fn config_bool(config: &EngineConfig, key: &str, default: bool) -> bool {
    config.get(key).and_then(Value::as_bool).unwrap_or(default)
}

fn attach_metadata(result: DiffResult, engine: &str, name: &str, mode: DiffMode, granularity: Granularity) -> DiffResult {
    let total = result.changes.len();
    result
        .with_metadata("engine", engine)
        .with_metadata("engine_name", name)
        .with_metadata("mode", mode.as_str())
        .with_metadata("granularity", granularity.as_str())
        .with_metadata("total_changes", total)
}

/// Character-precise Myers engine with semantic cleanup
pub struct PreciseEngine {
    config: EngineConfig,
}

impl PreciseEngine {
    pub const CONFIG_TIMEOUT: &'static str = "timeout";
    pub const CONFIG_EDIT_COST: &'static str = "edit_cost";
    pub const CONFIG_CHECK_LINES: &'static str = "check_lines";
    pub const CONFIG_SEMANTIC_CLEANUP: &'static str = "semantic_cleanup";

    pub fn new() -> Self {
        let mut config = EngineConfig::new();
        // 0 disables the deadline
        config.insert(Self::CONFIG_TIMEOUT.to_string(), Value::from(0.0));
        config.insert(Self::CONFIG_EDIT_COST.to_string(), Value::from(4));
        config.insert(Self::CONFIG_CHECK_LINES.to_string(), Value::from(false));
        config.insert(Self::CONFIG_SEMANTIC_CLEANUP.to_string(), Value::from(true));
        Self { config }
    }

    fn timeout(&self) -> Option<Duration> {
        let secs = config_f64(&self.config, Self::CONFIG_TIMEOUT, 0.0);
        // Values too large for a Duration mean no deadline
        if secs > 0.0 {
            Duration::try_from_secs_f64(secs).ok()
        } else {
            None
        }
    }
}

impl Default for PreciseEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffEngine for PreciseEngine {
    fn compute(&self, left: &str, right: &str, mode: DiffMode) -> DiffResult {
        let granularity = match mode {
            DiffMode::Char => Granularity::Char,
            DiffMode::Line => Granularity::Line,
            DiffMode::Auto => {
                if config_bool(&self.config, Self::CONFIG_CHECK_LINES, false) {
                    Granularity::Line
                } else {
                    Granularity::Char
                }
            }
            DiffMode::Word => {
                return DiffResult::failure(format!("{} does not support word mode", self.name()));
            }
        };

        let mut changes = edit_script(left, right, granularity, Algorithm::Myers, self.timeout());
        if config_bool(&self.config, Self::CONFIG_SEMANTIC_CLEANUP, true) {
            let edit_cost = config_usize(&self.config, Self::CONFIG_EDIT_COST, 4);
            changes = merge_small_equalities(changes, edit_cost);
        }

        let result = DiffResult::success(finalize(changes));
        attach_metadata(result, PRECISE_ENGINE_ID, self.name(), mode, granularity)
    }

    fn name(&self) -> &str {
        "Myers-Precise"
    }

    fn description(&self) -> &str {
        "Character-precise Myers diff with semantic cleanup, best for short texts"
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            supports_large_files: false,
            supports_unicode: true,
            supports_binary: false,
            supports_line_mode: true,
            supports_char_mode: true,
            supports_word_mode: false,
            max_recommended_size: 1024 * 1024,
            description: self.description().to_string(),
        }
    }

    fn configuration(&self) -> EngineConfig {
        self.config.clone()
    }

    fn set_configuration(&mut self, config: EngineConfig) {
        self.config.extend(config);
    }

    fn configuration_keys(&self) -> Vec<String> {
        [
            Self::CONFIG_TIMEOUT,
            Self::CONFIG_EDIT_COST,
            Self::CONFIG_CHECK_LINES,
            Self::CONFIG_SEMANTIC_CLEANUP,
        ]
        .iter()
        .map(|k| k.to_string())
        .collect()
    }

    fn estimate_complexity(&self, left: &str, right: &str) -> usize {
        // Myers is O((N+M)D); without D assume the worst case on chars
        let n = left.chars().count();
        let m = right.chars().count();
        n.saturating_mul(m.max(1))
    }
}

/// Line-oriented engine for large inputs
pub struct ScalableEngine {
    config: EngineConfig,
}

impl ScalableEngine {
    pub const CONFIG_LARGE_FILE_THRESHOLD: &'static str = "large_file_threshold";
    pub const CONFIG_ENABLE_HEURISTICS: &'static str = "enable_heuristics";
    pub const CONFIG_MAX_DIFF_SIZE: &'static str = "max_diff_size";

    const DEFAULT_LARGE_FILE_THRESHOLD: usize = 1024 * 1024;
    const DEFAULT_MAX_DIFF_SIZE: usize = 10 * 1024 * 1024;

    pub fn new() -> Self {
        let mut config = EngineConfig::new();
        config.insert(
            Self::CONFIG_LARGE_FILE_THRESHOLD.to_string(),
            Value::from(Self::DEFAULT_LARGE_FILE_THRESHOLD),
        );
        config.insert(Self::CONFIG_ENABLE_HEURISTICS.to_string(), Value::from(false));
        config.insert(
            Self::CONFIG_MAX_DIFF_SIZE.to_string(),
            Value::from(Self::DEFAULT_MAX_DIFF_SIZE),
        );
        Self { config }
    }
}

impl Default for ScalableEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffEngine for ScalableEngine {
    fn compute(&self, left: &str, right: &str, mode: DiffMode) -> DiffResult {
        let total = left.len() + right.len();
        let max_size = config_usize(&self.config, Self::CONFIG_MAX_DIFF_SIZE, Self::DEFAULT_MAX_DIFF_SIZE);
        if total > max_size {
            return DiffResult::failure(format!(
                "input size {} exceeds max_diff_size {}",
                total, max_size
            ));
        }

        let granularity = match mode {
            DiffMode::Line => Granularity::Line,
            DiffMode::Char => Granularity::Char,
            DiffMode::Word => Granularity::Word,
            DiffMode::Auto => {
                let threshold = config_usize(
                    &self.config,
                    Self::CONFIG_LARGE_FILE_THRESHOLD,
                    Self::DEFAULT_LARGE_FILE_THRESHOLD,
                );
                if total > threshold {
                    Granularity::Line
                } else {
                    Granularity::Char
                }
            }
        };

        let algorithm = if granularity == Granularity::Line
            && config_bool(&self.config, Self::CONFIG_ENABLE_HEURISTICS, false)
        {
            Algorithm::Patience
        } else {
            Algorithm::Myers
        };

        let changes = edit_script(left, right, granularity, algorithm, None);
        let result = DiffResult::success(finalize(changes));
        attach_metadata(result, SCALABLE_ENGINE_ID, self.name(), mode, granularity)
    }

    fn name(&self) -> &str {
        "Scalable-Lines"
    }

    fn description(&self) -> &str {
        "Line-oriented diff optimized for large files, switches to characters for small inputs"
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            supports_large_files: true,
            supports_unicode: true,
            supports_binary: false,
            supports_line_mode: true,
            supports_char_mode: true,
            supports_word_mode: true,
            max_recommended_size: Self::DEFAULT_MAX_DIFF_SIZE,
            description: self.description().to_string(),
        }
    }

    fn configuration(&self) -> EngineConfig {
        self.config.clone()
    }

    fn set_configuration(&mut self, config: EngineConfig) {
        self.config.extend(config);
    }

    fn configuration_keys(&self) -> Vec<String> {
        [
            Self::CONFIG_LARGE_FILE_THRESHOLD,
            Self::CONFIG_ENABLE_HEURISTICS,
            Self::CONFIG_MAX_DIFF_SIZE,
        ]
        .iter()
        .map(|k| k.to_string())
        .collect()
    }

    fn estimate_complexity(&self, left: &str, right: &str) -> usize {
        left.lines().count() + right.lines().count()
    }
}
