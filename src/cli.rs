//! Command-line interface definitions for photosweep.
//!
//! # Example
//!
//! ```bash
//! # Report duplicates across two trees
//! photosweep -s ~/Pictures -s /mnt/phone
//!
//! # Delete them (later occurrences only)
//! photosweep -s ~/Pictures --delete
//!
//! # Explain files that exist only in the backup
//! photosweep -s ~/Pictures -d /mnt/backup --report-missing --html > missing.html
//!
//! # Mirror the source into the backup and remove orphans
//! photosweep -s ~/Pictures -d /mnt/backup --copy --delete
//! ```
//!
//! The single-dash spellings `-delete`, `-copy`, `-reportMissing` and
//! `-html` are accepted too; see [`normalize_legacy_args`].

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

/// Duplicate finder and backup reconciler for photo collections.
///
/// photosweep fingerprints images by their decoded pixels, so the same
/// picture saved twice in different containers is still a duplicate. With a
/// destination it copies what the backup lacks and removes what the source
/// no longer has.
#[derive(Debug, Parser)]
#[command(name = "photosweep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Source directory (repeat for several)
    #[arg(short, long = "source", value_name = "DIR", required = true)]
    pub sources: Vec<PathBuf>,

    /// Destination directory to reconcile against the source
    #[arg(short, long, value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Delete duplicates (no destination) or orphans (with a destination)
    #[arg(long)]
    pub delete: bool,

    /// Copy source files missing from or resized in the destination
    #[arg(long, requires = "dest")]
    pub copy: bool,

    /// Explain destination-only files instead of copying or deleting
    #[arg(long, requires = "dest", conflicts_with_all = ["copy", "delete"])]
    pub report_missing: bool,

    /// Write the report as HTML with clickable paths
    #[arg(long)]
    pub html: bool,

    /// Number of hashing worker threads (overrides the config file)
    #[arg(short = 'j', long, value_name = "N")]
    pub workers: Option<usize>,

    /// Path to a TOML config file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors and the report
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,
}

/// Legacy single-dash flag spellings and their long forms.
const LEGACY_FLAGS: &[(&str, &str)] = &[
    ("-delete", "--delete"),
    ("-copy", "--copy"),
    ("-reportMissing", "--report-missing"),
    ("-html", "--html"),
];

/// Rewrite legacy single-dash flags to their `--long` forms.
///
/// Without this, clap would read `-delete` as `-d elete`.
///
/// ```
/// use photosweep::cli::normalize_legacy_args;
///
/// let args = normalize_legacy_args(["photosweep", "-s", "a", "-delete"]);
/// assert_eq!(args[3], "--delete");
/// ```
pub fn normalize_legacy_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            LEGACY_FLAGS
                .iter()
                .find(|(legacy, _)| arg.as_os_str() == *legacy)
                .map_or(arg, |(_, long)| OsString::from(*long))
        })
        .collect()
}

impl Cli {
    /// Parse the process arguments, accepting legacy spellings.
    #[must_use]
    pub fn parse_normalized() -> Self {
        Self::parse_from(normalize_legacy_args(std::env::args_os()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(normalize_legacy_args(args.iter().copied()))
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_multiple_sources() {
        let cli = parse(&["photosweep", "-s", "/a", "--source", "/b"]).unwrap();
        assert_eq!(cli.sources, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert!(cli.dest.is_none());
    }

    #[test]
    fn test_source_required() {
        let err = parse(&["photosweep", "--delete"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_legacy_flags() {
        let cli = parse(&["photosweep", "-s", "/a", "-d", "/b", "-reportMissing", "-html"]).unwrap();
        assert!(cli.report_missing);
        assert!(cli.html);

        let cli = parse(&["photosweep", "-s", "/a", "-d", "/b", "-copy", "-delete"]).unwrap();
        assert!(cli.copy);
        assert!(cli.delete);
    }

    #[test]
    fn test_report_missing_conflicts() {
        let err = parse(&["photosweep", "-s", "/a", "-d", "/b", "--report-missing", "--copy"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_copy_requires_dest() {
        assert!(parse(&["photosweep", "-s", "/a", "--copy"]).is_err());
    }

    #[test]
    fn test_verbose_count() {
        let cli = parse(&["photosweep", "-s", "/a", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_legacy_rewrite_leaves_values_alone() {
        let args = normalize_legacy_args(["photosweep", "-s", "-delete-me"]);
        assert_eq!(args[2], "-delete-me");
    }
}
