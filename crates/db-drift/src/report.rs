//! Diff report output.
//!
//! A [`ReportSink`] receives one formatted text block per table whose content
//! differs. Blocks are appended, never rewritten.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::diff::{CellValue, DiffRequest, RowDifference};
use crate::error::Result;

/// Append-only destination for diff blocks.
pub trait ReportSink: Send {
    fn append(&mut self, block: &str) -> Result<()>;
}

/// Appends blocks to a file, creating it if needed.
///
/// The file is opened per block so concurrent readers always see whole blocks
/// and an aborted run leaves everything written so far.
#[derive(Debug, Clone)]
pub struct FileReportSink {
    path: PathBuf,
}

impl FileReportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for FileReportSink {
    fn append(&mut self, block: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(block.as_bytes())?;
        Ok(())
    }
}

/// Collects blocks in memory.
///
/// Clones share one buffer, so a clone kept by the caller sees every block
/// appended through the one handed to the comparator.
#[derive(Debug, Default, Clone)]
pub struct MemoryReportSink {
    blocks: Arc<Mutex<Vec<String>>>,
}

impl MemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the blocks appended so far.
    pub fn blocks(&self) -> Vec<String> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.blocks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ReportSink for MemoryReportSink {
    fn append(&mut self, block: &str) -> Result<()> {
        self.lock().push(block.to_string());
        Ok(())
    }
}

/// Render the differences of one table.
///
/// ```text
/// public.users
///   (id, name, email)
/// - (1, alice, NULL)
/// + (1, alice, alice@example.com)
/// ```
///
/// Key columns come first. A `-` line carries the source row, a `+` line the
/// target row; a key missing on one side has only one line.
pub fn format_differences(request: &DiffRequest, differences: &[RowDifference]) -> String {
    let mut out = String::new();
    out.push_str(&request.full_name());
    out.push('\n');

    let header: Vec<&str> = request.all_columns().map(String::as_str).collect();
    out.push_str(&format!("  ({})\n", header.join(", ")));

    for diff in differences {
        if let Some(values) = &diff.source {
            out.push_str(&format!("- {}\n", render_row(&diff.key, values)));
        }
        if let Some(values) = &diff.target {
            out.push_str(&format!("+ {}\n", render_row(&diff.key, values)));
        }
    }
    out.push('\n');
    out
}

fn render_row(key: &[CellValue], values: &[CellValue]) -> String {
    let cells: Vec<&str> = key
        .iter()
        .chain(values.iter())
        .map(|v| v.as_deref().unwrap_or("NULL"))
        .collect();
    format!("({})", cells.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn request() -> DiffRequest {
        DiffRequest {
            schema: "public".into(),
            table: "users".into(),
            key_columns: vec!["id".into()],
            value_columns: vec!["name".into(), "email".into()],
            update_column: None,
        }
    }

    fn s(v: &str) -> CellValue {
        Some(v.to_string())
    }

    #[test]
    fn test_format_changed_and_missing() {
        let diffs = vec![
            RowDifference::changed(
                vec![s("1")],
                vec![s("alice"), None],
                vec![s("alice"), s("alice@example.com")],
            ),
            RowDifference::missing_in_target(vec![s("2")], vec![s("bob"), s("bob@example.com")]),
        ];

        let block = format_differences(&request(), &diffs);
        let lines: Vec<&str> = block.lines().collect();
        assert_eq!(
            lines,
            vec![
                "public.users",
                "  (id, name, email)",
                "- (1, alice, NULL)",
                "+ (1, alice, alice@example.com)",
                "- (2, bob, bob@example.com)",
                "",
            ]
        );
    }

    #[test]
    fn test_format_missing_in_source() {
        let diffs = vec![RowDifference::missing_in_source(
            vec![s("9")],
            vec![s("zed"), None],
        )];
        let block = format_differences(&request(), &diffs);
        assert!(block.contains("+ (9, zed, NULL)"));
        assert!(!block.contains("- ("));
    }

    #[test]
    fn test_file_sink_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("diff.txt");
        let mut sink = FileReportSink::new(&path);

        sink.append("first\n").unwrap();
        sink.append("second\n").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\nsecond\n");
        assert_eq!(sink.path(), path.as_path());
    }

    #[test]
    fn test_file_sink_missing_directory() {
        let dir = tempdir().unwrap();
        let mut sink = FileReportSink::new(dir.path().join("nope").join("diff.txt"));
        assert!(sink.append("x").is_err());
    }

    #[test]
    fn test_memory_sink_clones_share_blocks() {
        let reader = MemoryReportSink::new();
        let mut writer: Box<dyn ReportSink> = Box::new(reader.clone());

        writer.append("a").unwrap();
        writer.append("b").unwrap();

        assert_eq!(reader.blocks(), vec!["a".to_string(), "b".to_string()]);
    }
}
