//! Report writer for photosweep runs.
//!
//! This module renders every phase of a run to any [`Write`] sink, in one of
//! two formats:
//! - plain text for the console (optionally colored with `yansi`)
//! - HTML, the same text wrapped in `<pre>` with paths as `file:///` links
//!
//! # Example
//!
//! ```
//! use photosweep::output::{ReportFormat, Reporter};
//!
//! let mut reporter = Reporter::new(Vec::new(), ReportFormat::Html);
//! reporter.begin().unwrap();
//! reporter.line("nothing to do").unwrap();
//! reporter.finish().unwrap();
//! let html = String::from_utf8(reporter.into_inner()).unwrap();
//! assert!(html.contains("<pre>"));
//! ```

pub mod html;

use std::io::{self, Write};
use std::path::Path;

use bytesize::ByteSize;
use yansi::{Paint, Style};

use crate::actions::{BatchCopyResult, BatchDeleteResult};
use crate::duplicates::{Detection, HashStats};
use crate::reconcile::{
    CopyCandidate, CopyReason, Explained, MatchKind, OrphanPlan, Reconciliation,
    ORPHAN_SUMMARY_THRESHOLD,
};
use crate::scanner::{is_media_file, FileRecord, WalkOutput};

const HEADING: Style = Style::new().bold().underline();
const WARN: Style = Style::new().yellow();
const BAD: Style = Style::new().red().bold();
const GOOD: Style = Style::new().green();

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Plain text
    #[default]
    Text,
    /// HTML with clickable paths
    Html,
}

/// Writes human-readable reports to a sink.
#[derive(Debug)]
pub struct Reporter<W: Write> {
    out: W,
    format: ReportFormat,
    color: bool,
}

impl<W: Write> Reporter<W> {
    /// Create a reporter. Color is off until enabled with [`Reporter::with_color`].
    pub fn new(out: W, format: ReportFormat) -> Self {
        Self {
            out,
            format,
            color: false,
        }
    }

    /// Enable or disable ANSI color (text format only).
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Format in use.
    pub fn format(&self) -> ReportFormat {
        self.format
    }

    /// Recover the sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write the document prologue (HTML only).
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn begin(&mut self) -> io::Result<()> {
        if self.format == ReportFormat::Html {
            self.out.write_all(html::HTML_HEADER.as_bytes())?;
        }
        Ok(())
    }

    /// Write the document epilogue (HTML only) and flush.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.format == ReportFormat::Html {
            self.out.write_all(html::HTML_FOOTER.as_bytes())?;
        }
        self.out.flush()
    }

    fn styled(&self, text: &str, style: Style) -> String {
        match self.format {
            ReportFormat::Html => html::escape(text),
            ReportFormat::Text if self.color => text.paint(style).to_string(),
            ReportFormat::Text => text.to_string(),
        }
    }

    fn path(&self, path: &Path) -> String {
        match self.format {
            ReportFormat::Html => html::file_link(path),
            ReportFormat::Text => path.display().to_string(),
        }
    }

    /// Write one line of free text.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn line(&mut self, text: &str) -> io::Result<()> {
        let text = self.styled(text, Style::new());
        writeln!(self.out, "{text}")
    }

    fn heading(&mut self, title: &str) -> io::Result<()> {
        let title = self.styled(title, HEADING);
        writeln!(self.out)?;
        writeln!(self.out, "{title}")
    }

    /// Summarise one walked tree.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn walk_summary(&mut self, root: &Path, walk: &WalkOutput) -> io::Result<()> {
        let root = self.path(root);
        let total: u64 = walk.records.iter().map(|r| r.size).sum();
        writeln!(
            self.out,
            "Indexed {} files ({}) under {} ({} protected)",
            walk.records.len(),
            ByteSize::b(total),
            root,
            walk.protected_count()
        )?;
        for err in &walk.errors {
            let msg = self.styled(&format!("  skipped: {err}"), WARN);
            writeln!(self.out, "{msg}")?;
        }
        Ok(())
    }

    /// Summarise a hashing run.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn hash_summary(&mut self, stats: &HashStats) -> io::Result<()> {
        writeln!(
            self.out,
            "Fingerprinted {} of {} files ({} from cache, {} corrupt)",
            stats.hashed, stats.files, stats.cache_hits, stats.corrupt
        )
    }

    /// List duplicates and corrupt files.
    ///
    /// Duplicates that are not media files are marked as such, since they are
    /// never deleted.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn duplicates(&mut self, detection: &Detection) -> io::Result<()> {
        self.heading(&format!("Duplicates ({})", detection.duplicates.len()))?;
        for dup in &detection.duplicates {
            let this = self.path(&dup.path);
            let original = detection
                .original_of(dup)
                .map(|o| self.path(&o.path))
                .unwrap_or_default();
            writeln!(self.out, "{this} ({})", ByteSize::b(dup.size))?;
            writeln!(self.out, "    same as {original}")?;
            if !is_media_file(&dup.path) {
                let note = self.styled("    not an image file, will not be deleted", WARN);
                writeln!(self.out, "{note}")?;
            }
        }
        writeln!(
            self.out,
            "{} duplicate(s), {} reclaimable",
            detection.duplicates.len(),
            ByteSize::b(detection.reclaimable_bytes())
        )?;

        if !detection.corrupt.is_empty() {
            self.corrupt(&detection.corrupt)?;
        }
        Ok(())
    }

    /// List files that failed to decode.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn corrupt(&mut self, records: &[FileRecord]) -> io::Result<()> {
        self.heading(&format!("Corrupt images ({})", records.len()))?;
        for record in records {
            let label = self.styled("CORRUPT", BAD);
            let path = self.path(&record.path);
            writeln!(self.out, "{label} {path}")?;
        }
        Ok(())
    }

    /// Report the outcome of a batch deletion.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn deletions(&mut self, result: &BatchDeleteResult) -> io::Result<()> {
        for done in &result.successes {
            let label = self.styled("DELETED", GOOD);
            let path = self.path(&done.path);
            writeln!(self.out, "{label} {path}")?;
        }
        for failure in &result.failures {
            let msg = self.styled(&format!("FAILED {failure}"), BAD);
            writeln!(self.out, "{msg}")?;
        }
        writeln!(self.out, "{}", result.summary())
    }

    /// Report destination-only files and whether the source explains them.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn reconciliation(
        &mut self,
        source_root: &Path,
        dest_root: &Path,
        dest_duplicates: usize,
        result: &Reconciliation,
    ) -> io::Result<()> {
        let dest = self.path(dest_root);
        writeln!(self.out, "{dest} contains {dest_duplicates} duplicate(s)")?;
        self.heading(&format!(
            "Destination files not in source ({} missing, {} found elsewhere)",
            result.missing.len(),
            result.found_elsewhere.len()
        ))?;
        for item in &result.found_elsewhere {
            self.explained(item)?;
        }
        let root = self.path(source_root);
        for item in &result.missing {
            let label = self.styled("MISSING", BAD);
            let path = self.path(&item.dest.path);
            writeln!(self.out, "{label} {path} not found under {root}")?;
            if item.matched.kind != MatchKind::None {
                self.explained_candidate(item)?;
            }
        }
        Ok(())
    }

    fn explained(&mut self, item: &Explained) -> io::Result<()> {
        let path = self.path(&item.dest.path);
        writeln!(self.out, "{path}")?;
        self.explained_candidate(item)
    }

    fn explained_candidate(&mut self, item: &Explained) -> io::Result<()> {
        let Some(candidate) = item.matched.candidate.as_ref() else {
            return Ok(());
        };
        let candidate_path = self.path(&candidate.path);
        let detail = match item.matched.kind {
            MatchKind::ExactContent => "identical content".to_string(),
            MatchKind::NameAndSize | MatchKind::NameOnly => format!(
                "{}, {} vs {} ({:.2}% size difference)",
                if item.matched.kind == MatchKind::NameAndSize {
                    "name and size"
                } else {
                    "name only"
                },
                ByteSize::b(item.dest.size),
                ByteSize::b(candidate.size),
                item.matched.size_delta_ratio * 100.0
            ),
            MatchKind::None => String::new(),
        };
        let label = self.styled("MATCHES", GOOD);
        writeln!(self.out, "    {label} {candidate_path}: {detail}")
    }

    /// Report the copy plan and, when it ran, its outcome.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn copy_plan(
        &mut self,
        plan: &[CopyCandidate],
        executed: Option<&BatchCopyResult>,
    ) -> io::Result<()> {
        let verb = if executed.is_some() { "Copying" } else { "Would copy" };
        self.heading(&format!("{verb} {} file(s)", plan.len()))?;
        for candidate in plan {
            let from = self.path(&candidate.source.path);
            let to = self.path(&candidate.dest);
            let why = match candidate.reason {
                CopyReason::Absent => "absent".to_string(),
                CopyReason::SizeDiffers { dest_size } => format!(
                    "size differs: {} vs {}",
                    ByteSize::b(candidate.source.size),
                    ByteSize::b(dest_size)
                ),
            };
            writeln!(self.out, "{from} -> {to} ({why})")?;
            if candidate.nonstandard {
                let note = self.styled("    warning: not a recognized media file", WARN);
                writeln!(self.out, "{note}")?;
            }
        }
        if let Some(result) = executed {
            for failure in &result.failures {
                let msg = self.styled(&format!("FAILED {failure}"), BAD);
                writeln!(self.out, "{msg}")?;
            }
            writeln!(self.out, "{}", result.summary())?;
        }
        Ok(())
    }

    /// Report the orphan plan. Directories with many orphan files are
    /// summarised as a count.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn orphan_plan(&mut self, plan: &OrphanPlan, executing: bool) -> io::Result<()> {
        let verb = if executing { "Deleting" } else { "Would delete" };
        self.heading(&format!(
            "{verb} {} orphan file(s) and {} orphan directory(ies)",
            plan.files.len(),
            plan.directories.len()
        ))?;
        for dir in &plan.directories {
            let path = self.path(dir);
            writeln!(self.out, "{path}{}", std::path::MAIN_SEPARATOR)?;
        }
        for (dir, files) in plan.files_by_directory() {
            if files.len() > ORPHAN_SUMMARY_THRESHOLD {
                let path = self.path(dir);
                writeln!(self.out, "{} files in {path}", files.len())?;
            } else {
                for file in files {
                    let path = self.path(file);
                    writeln!(self.out, "{path}")?;
                }
            }
        }
        for err in &plan.errors {
            let msg = self.styled(&format!("  skipped: {err}"), WARN);
            writeln!(self.out, "{msg}")?;
        }
        Ok(())
    }
}
