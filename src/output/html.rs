//! HTML helpers for the report writer.
//!
//! The HTML report is the plain-text report wrapped in `<pre>`, with every
//! path rendered as a `file:///` link so it can be opened from a browser.

use std::path::Path;

/// Document prologue written before the report body.
pub const HTML_HEADER: &str = "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>photosweep report</title></head>\n<body>\n<pre>\n";

/// Document epilogue written after the report body.
pub const HTML_FOOTER: &str = "</pre>\n</body>\n</html>\n";

/// Escape text for inclusion in HTML content or a double-quoted attribute.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// `file:///` URL for a path. Backslashes become forward slashes.
#[must_use]
pub fn file_url(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/");
    match s.strip_prefix('/') {
        Some(rest) => format!("file:///{rest}"),
        None => format!("file:///{s}"),
    }
}

/// Anchor element linking to a path, labelled with the path.
#[must_use]
pub fn file_link(path: &Path) -> String {
    format!(
        "<a href=\"{}\">{}</a>",
        escape(&file_url(path)),
        escape(&path.to_string_lossy())
    )
}
