//! Side-by-side alignment of edit scripts
//!
//! Turns one flat change sequence into two columns of equal length. Row `i`
//! of the left column and row `i` of the right column always occupy the same
//! visual height: either both hold the same Equal text, or one holds real
//! content and the other a padding unit of matching height.
//!
//! Line counters advance by the number of line breaks in a unit, while row
//! heights use [`visual_rows`](crate::diff::visual_rows). A Replace unit is
//! expected to be followed by the Insert unit carrying its replacement; the
//! pair is not repaired if an engine breaks that convention.

use crate::diff::{Change, ChangeKind, DiffResult, SideBySideResult};

/// Stateless transform from flat edit scripts to aligned or numbered views
pub struct AlignmentEngine;

impl AlignmentEngine {
    /// Split `result` into two line-numbered, row-synchronized columns
    pub fn align(result: &DiffResult, engine_used: &str) -> SideBySideResult {
        if !result.ok {
            return SideBySideResult::failure(result.error_text(), engine_used);
        }

        let mut left = Vec::with_capacity(result.changes.len());
        let mut right = Vec::with_capacity(result.changes.len());
        let mut left_line = 1;
        let mut right_line = 1;

        for change in &result.changes {
            let breaks = change.line_breaks();
            match change.kind {
                ChangeKind::Equal => {
                    left.push(change.clone().with_line_number(left_line));
                    right.push(change.clone().with_line_number(right_line));
                    left_line += breaks;
                    right_line += breaks;
                }
                ChangeKind::Delete | ChangeKind::Replace => {
                    left.push(change.clone().with_line_number(left_line));
                    right.push(Change::padding_for(change, right_line));
                    left_line += breaks;
                }
                ChangeKind::Insert => {
                    left.push(Change::padding_for(change, left_line));
                    right.push(change.clone().with_line_number(right_line));
                    right_line += breaks;
                }
            }
        }

        tracing::debug!(
            rows = left.len(),
            left_lines = left_line - 1,
            right_lines = right_line - 1,
            "aligned edit script"
        );

        SideBySideResult {
            left: Self::column(result, left),
            right: Self::column(result, right),
            engine_used: engine_used.to_string(),
        }
    }

    /// Number a single-column script in place.
    ///
    /// Equal and Replace anchor to the left counter and advance both, Delete
    /// anchors to and advances the left, Insert the right.
    pub fn number_inline(changes: &mut [Change]) {
        let mut left_line = 1;
        let mut right_line = 1;

        for change in changes.iter_mut() {
            let breaks = change.line_breaks();
            match change.kind {
                ChangeKind::Equal | ChangeKind::Replace => {
                    change.line_number = Some(left_line);
                    left_line += breaks;
                    right_line += breaks;
                }
                ChangeKind::Delete => {
                    change.line_number = Some(left_line);
                    left_line += breaks;
                }
                ChangeKind::Insert => {
                    change.line_number = Some(right_line);
                    right_line += breaks;
                }
            }
        }
    }

    fn column(source: &DiffResult, changes: Vec<Change>) -> DiffResult {
        let mut column = DiffResult::success(changes);
        column.metadata = source.metadata.clone();
        column
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(changes: Vec<Change>) -> DiffResult {
        DiffResult::success(changes)
    }

    #[test]
    fn test_identity_is_one_row() {
        let result = script(vec![Change::equal("same\ntext\n")]);
        let aligned = AlignmentEngine::align(&result, "dmp");

        assert_eq!(aligned.left.changes.len(), 1);
        assert_eq!(aligned.right.changes.len(), 1);
        assert_eq!(aligned.left.changes[0].line_number, Some(1));
        assert!(!aligned.left.changes[0].padding);
        assert!(!aligned.right.changes[0].padding);
        assert_eq!(aligned.engine_used, "dmp");
    }

    #[test]
    fn test_insert_into_empty_left() {
        let result = script(vec![Change::insert("world")]);
        let aligned = AlignmentEngine::align(&result, "dmp");

        assert_eq!(aligned.row_count(), 1);
        assert!(aligned.left.changes[0].padding);
        assert!(!aligned.right.changes[0].padding);
        assert_eq!(aligned.right.changes[0].text, "world");
    }

    #[test]
    fn test_delete_pads_right_without_advancing() {
        let result = script(vec![
            Change::equal("a\n"),
            Change::delete("b\nc\n"),
            Change::equal("d\n"),
        ]);
        let aligned = AlignmentEngine::align(&result, "dtl");

        let left_lines: Vec<_> = aligned.left.changes.iter().map(|c| c.line_number).collect();
        let right_lines: Vec<_> = aligned.right.changes.iter().map(|c| c.line_number).collect();
        assert_eq!(left_lines, vec![Some(1), Some(2), Some(4)]);
        assert_eq!(right_lines, vec![Some(1), Some(2), Some(2)]);

        let pad = &aligned.right.changes[1];
        assert!(pad.padding);
        assert_eq!(pad.visual_rows(), 2);
    }

    #[test]
    fn test_replace_followed_by_insert() {
        let result = script(vec![
            Change::equal("x\n"),
            Change::replace("old\n"),
            Change::insert("new\n"),
        ]);
        let aligned = AlignmentEngine::align(&result, "custom");

        assert_eq!(aligned.row_count(), 3);
        assert_eq!(aligned.left.changes[1].kind, ChangeKind::Replace);
        assert!(aligned.right.changes[1].padding);
        assert!(aligned.left.changes[2].padding);
        assert_eq!(aligned.right.changes[2].text, "new\n");
        assert_eq!(aligned.right.changes[2].line_number, Some(2));
    }

    #[test]
    fn test_rows_have_equal_height() {
        let result = script(vec![
            Change::equal("ab"),
            Change::delete("c\nd"),
            Change::insert("e\n\nf\n"),
            Change::equal("\ng"),
        ]);
        let aligned = AlignmentEngine::align(&result, "dmp");

        for (left, right) in aligned.rows() {
            assert_eq!(left.visual_rows(), right.visual_rows());
            assert!(!(left.padding && right.padding));
        }
    }

    #[test]
    fn test_failed_result_fails_both_sides() {
        let aligned = AlignmentEngine::align(&DiffResult::failure("engine exploded"), "dtl");

        assert!(!aligned.ok());
        assert_eq!(aligned.left.error_text(), "engine exploded");
        assert_eq!(aligned.right.error_text(), "engine exploded");
    }

    #[test]
    fn test_number_inline() {
        let mut changes = vec![
            Change::equal("a\nb\n"),
            Change::delete("c\n"),
            Change::insert("x\ny\n"),
            Change::replace("d\n"),
            Change::equal("e\n"),
        ];
        AlignmentEngine::number_inline(&mut changes);

        let lines: Vec<_> = changes.iter().map(|c| c.line_number).collect();
        // left: 1-2 equal, 3 deleted, 4 replaced, 5 equal
        assert_eq!(lines, vec![Some(1), Some(3), Some(3), Some(4), Some(5)]);
    }

    #[test]
    fn test_char_level_fragments_stay_on_line() {
        let result = script(vec![
            Change::equal("hel"),
            Change::delete("lo"),
            Change::insert("p"),
            Change::equal("\nnext\n"),
        ]);
        let aligned = AlignmentEngine::align(&result, "dmp");

        assert_eq!(aligned.left.changes[3].line_number, Some(1));
        assert_eq!(aligned.right.changes[3].line_number, Some(1));
    }
}
