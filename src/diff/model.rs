use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a single edit-script unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Equal,
    Insert,
    Delete,
    /// Left-side text of a replaced region. The replacing text travels in
    /// the Insert unit that follows it.
    Replace,
}

impl ChangeKind {
    /// Whether units of this kind carry text from the left document
    pub fn is_left_side(&self) -> bool {
        matches!(self, Self::Equal | Self::Delete | Self::Replace)
    }

    /// Whether units of this kind carry text from the right document
    pub fn is_right_side(&self) -> bool {
        matches!(self, Self::Equal | Self::Insert)
    }
}

/// Granularity hint forwarded to engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DiffMode {
    /// Let the engine decide based on the input
    #[default]
    Auto,
    Line,
    Char,
    Word,
}

impl DiffMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Line => "line",
            Self::Char => "char",
            Self::Word => "word",
        }
    }
}

impl std::fmt::Display for DiffMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One unit of an edit script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub kind: ChangeKind,
    /// Literal span covered by this unit, may contain line breaks
    pub text: String,
    /// 1-based line in the side this unit is anchored to; `None` until numbered
    pub line_number: Option<usize>,
    /// Character offset in the source side where this unit begins
    pub position: usize,
    /// Synthetic blank row inserted by side-by-side alignment
    #[serde(default)]
    pub padding: bool,
}

impl Change {
    pub fn new(kind: ChangeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            line_number: None,
            position: 0,
            padding: false,
        }
    }

    pub fn equal(text: impl Into<String>) -> Self {
        Self::new(ChangeKind::Equal, text)
    }

    pub fn insert(text: impl Into<String>) -> Self {
        Self::new(ChangeKind::Insert, text)
    }

    pub fn delete(text: impl Into<String>) -> Self {
        Self::new(ChangeKind::Delete, text)
    }

    pub fn replace(text: impl Into<String>) -> Self {
        Self::new(ChangeKind::Replace, text)
    }

    /// Blank row standing in for `opposite` on the other column
    pub fn padding_for(opposite: &Change, line_number: usize) -> Self {
        Self {
            kind: opposite.kind,
            text: "\n".repeat(visual_rows(&opposite.text)),
            line_number: Some(line_number),
            position: 0,
            padding: true,
        }
    }

    pub fn with_line_number(mut self, line_number: usize) -> Self {
        self.line_number = Some(line_number);
        self
    }

    /// Number of line breaks this unit advances its line counter by
    pub fn line_breaks(&self) -> usize {
        line_breaks(&self.text)
    }

    /// Number of visual rows this unit occupies when rendered line by line
    pub fn visual_rows(&self) -> usize {
        visual_rows(&self.text)
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Count of `\n` in `text`. Line counters advance by this amount, so a
/// fragment without a trailing newline stays on the line it started on.
pub fn line_breaks(text: &str) -> usize {
    text.bytes().filter(|b| *b == b'\n').count()
}

/// Rows `text` occupies when rendered: every line break closes a row, and a
/// trailing fragment without a newline occupies one more.
pub fn visual_rows(text: &str) -> usize {
    let breaks = line_breaks(text);
    if !text.is_empty() && !text.ends_with('\n') {
        breaks + 1
    } else {
        breaks
    }
}

/// Counts of units and characters per kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub equal_units: usize,
    pub inserted_units: usize,
    pub deleted_units: usize,
    pub replaced_units: usize,
    pub chars_inserted: usize,
    pub chars_deleted: usize,
}

impl DiffStats {
    pub fn total_changes(&self) -> usize {
        self.inserted_units + self.deleted_units + self.replaced_units
    }

    pub fn is_identical(&self) -> bool {
        self.total_changes() == 0
    }
}

/// Outcome of one engine run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    pub changes: Vec<Change>,
    pub ok: bool,
    pub error_text: Option<String>,
    /// Informational only: engine name, mode used, change count
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl DiffResult {
    pub fn success(changes: Vec<Change>) -> Self {
        Self {
            changes,
            ok: true,
            error_text: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn failure(error_text: impl Into<String>) -> Self {
        Self {
            changes: Vec::new(),
            ok: false,
            error_text: Some(error_text.into()),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    pub fn error_text(&self) -> &str {
        self.error_text.as_deref().unwrap_or("")
    }

    pub fn stats(&self) -> DiffStats {
        let mut stats = DiffStats::default();
        for change in self.changes.iter().filter(|c| !c.padding) {
            match change.kind {
                ChangeKind::Equal => stats.equal_units += 1,
                ChangeKind::Insert => {
                    stats.inserted_units += 1;
                    stats.chars_inserted += change.char_len();
                }
                ChangeKind::Delete => {
                    stats.deleted_units += 1;
                    stats.chars_deleted += change.char_len();
                }
                ChangeKind::Replace => {
                    stats.replaced_units += 1;
                    stats.chars_deleted += change.char_len();
                }
            }
        }
        stats
    }

    /// Share of unchanged characters relative to the longer input
    pub fn similarity(&self, left: &str, right: &str) -> f64 {
        let total = left.chars().count().max(right.chars().count());
        if total == 0 {
            return 1.0;
        }

        let equal: usize = self
            .changes
            .iter()
            .filter(|c| c.kind == ChangeKind::Equal && !c.padding)
            .map(Change::char_len)
            .sum();

        equal as f64 / total as f64
    }

    /// Concatenation of the text one side of the diff is made of
    pub fn reconstruct_left(&self) -> String {
        self.changes
            .iter()
            .filter(|c| !c.padding && c.kind.is_left_side())
            .map(|c| c.text.as_str())
            .collect()
    }

    pub fn reconstruct_right(&self) -> String {
        self.changes
            .iter()
            .filter(|c| !c.padding && c.kind.is_right_side())
            .map(|c| c.text.as_str())
            .collect()
    }
}

impl Default for DiffResult {
    fn default() -> Self {
        Self::success(Vec::new())
    }
}

/// Two column-aligned views derived from one `DiffResult`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideBySideResult {
    pub left: DiffResult,
    pub right: DiffResult,
    pub engine_used: String,
}

impl SideBySideResult {
    /// The same failure reported on both columns
    pub fn failure(error_text: impl Into<String>, engine_used: impl Into<String>) -> Self {
        let error_text = error_text.into();
        Self {
            left: DiffResult::failure(error_text.clone()),
            right: DiffResult::failure(error_text),
            engine_used: engine_used.into(),
        }
    }

    pub fn ok(&self) -> bool {
        self.left.ok && self.right.ok
    }

    pub fn error_text(&self) -> &str {
        self.left.error_text()
    }

    pub fn row_count(&self) -> usize {
        self.left.changes.len().max(self.right.changes.len())
    }

    /// Left and right units paired row by row
    pub fn rows(&self) -> impl Iterator<Item = (&Change, &Change)> {
        self.left.changes.iter().zip(self.right.changes.iter())
    }
}
