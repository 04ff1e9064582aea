use std::path::Path;
use clap::ValueEnum;
use super::model::{Change, ChangeKind, DiffResult, SideBySideResult};

/// How a diff is laid out for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Layout {
    /// One column with `+`/`-` markers
    #[default]
    Inline,
    /// Two aligned columns
    SideBySide,
}

/// Formats diff results into text for terminals
pub struct DiffFormatter;

impl DiffFormatter {
    /// Format a flat edit script as one marked column.
    ///
    /// Every line starts with its marker (`' '`, `+` or `-`) followed by the
    /// line number of the side it belongs to.
    pub fn format_inline<P: AsRef<Path>>(result: &DiffResult, old_path: P, new_path: P) -> String {
        let mut output = Vec::new();
        output.push(format!("--- {}", old_path.as_ref().display()));
        output.push(format!("+++ {}", new_path.as_ref().display()));

        if !result.ok {
            output.push(format!("! {}", result.error_text()));
            return output.join("\n");
        }

        for change in &result.changes {
            let marker = Self::marker(change.kind);
            for (offset, line) in change.text.lines().enumerate() {
                let number = Self::number_cell(change, offset);
                output.push(format!("{} {} | {}", marker, number, line));
            }
        }

        output.join("\n")
    }

    /// Format an aligned result as two columns of `width` total characters
    pub fn format_side_by_side<P: AsRef<Path>>(
        result: &SideBySideResult,
        old_path: P,
        new_path: P,
        width: usize,
    ) -> String {
        let mut output = Vec::new();
        let half_width = width.saturating_sub(3) / 2; // Account for separator " | "

        output.push(format!(
            "{:<width$} | {}",
            Self::truncate_line(&format!("--- {}", old_path.as_ref().display()), half_width),
            format!("+++ {}", new_path.as_ref().display()),
            width = half_width
        ));
        output.push("-".repeat(width));

        if !result.ok() {
            output.push(format!("! {}", result.error_text()));
            return output.join("\n");
        }

        for (left, right) in result.rows() {
            let left_cells = Self::cells(left);
            let right_cells = Self::cells(right);
            let height = left_cells.len().max(right_cells.len());

            for i in 0..height {
                let l = left_cells.get(i).map(String::as_str).unwrap_or("");
                let r = right_cells.get(i).map(String::as_str).unwrap_or("");
                output.push(format!(
                    "{:<width$} | {}",
                    Self::truncate_line(l, half_width),
                    Self::truncate_line(r, half_width),
                    width = half_width
                ));
            }
        }

        output.join("\n")
    }

    /// Format diff statistics as a summary
    pub fn format_stats(result: &DiffResult) -> String {
        if !result.ok {
            return format!("Diff failed: {}", result.error_text());
        }

        let stats = result.stats();
        if stats.is_identical() {
            return "No changes".to_string();
        }

        let mut parts = Vec::new();
        let inserted = stats.inserted_units;
        let deleted = stats.deleted_units + stats.replaced_units;

        if inserted > 0 {
            parts.push(format!("{} insertion{}", inserted, if inserted == 1 { "" } else { "s" }));
        }
        if deleted > 0 {
            parts.push(format!("{} deletion{}", deleted, if deleted == 1 { "" } else { "s" }));
        }
        parts.push(format!("{} chars added, {} chars removed", stats.chars_inserted, stats.chars_deleted));

        parts.join(", ")
    }

    /// Display lines for one aligned unit; padding renders as blank cells
    fn cells(change: &Change) -> Vec<String> {
        change
            .text
            .lines()
            .enumerate()
            .map(|(offset, line)| {
                if change.padding {
                    String::new()
                } else {
                    format!("{} {} {}", Self::number_cell(change, offset), Self::marker(change.kind), line)
                }
            })
            .collect()
    }

    fn marker(kind: ChangeKind) -> char {
        match kind {
            ChangeKind::Equal => ' ',
            ChangeKind::Insert => '+',
            ChangeKind::Delete | ChangeKind::Replace => '-',
        }
    }

    fn number_cell(change: &Change, offset: usize) -> String {
        match change.line_number {
            Some(n) => format!("{:>4}", n + offset),
            None => "    ".to_string(),
        }
    }

    fn truncate_line(line: &str, max_width: usize) -> String {
        if line.chars().count() > max_width {
            if max_width > 3 {
                let kept: String = line.chars().take(max_width - 3).collect();
                format!("{}...", kept)
            } else {
                line.chars().take(max_width).collect()
            }
        } else {
            line.to_string()
        }
    }
}
