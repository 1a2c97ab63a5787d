//! Plain-text rendering shared by the near-miss and verification reports.
//!
//! Output is deterministic for a given input (ordered maps, no timestamps
//! unless requested) so reports can be compared against golden files.

use crate::request_log::CapturedRequest;
use crate::stub::{FieldDiff, RequestParts};
use similar::{ChangeTag, TextDiff};
use std::fmt::{self, Write};

/// Marker appended to table rows whose field did not match.
pub const MISMATCH_MARKER: &str = "<<<<< mismatch";

const ABSENT: &str = "<absent>";

/// Rendering knobs taken from the endpoint configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub max_body_preview: usize,
    pub include_timestamps: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_body_preview: 1000,
            include_timestamps: false,
        }
    }
}

/// Render a body for display: UTF-8 text truncated to `max` chars, or a
/// byte count for binary content.
pub fn preview_body(body: &[u8], max: usize) -> String {
    if body.is_empty() {
        return "<empty>".to_string();
    }
    match std::str::from_utf8(body) {
        Ok(text) => truncate(text, max),
        Err(_) => format!("<{} bytes binary>", body.len()),
    }
}

fn truncate(text: &str, max: usize) -> String {
    let total = text.chars().count();
    if total <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max).collect();
    format!("{kept}... ({} more chars)", total - max)
}

/// Collapse a value onto one line for table cells.
fn inline(value: &str, max: usize) -> String {
    truncate(&value.replace('\r', "\\r").replace('\n', "\\n"), max)
}

/// Render a captured request as an indented block.
pub fn render_request(
    f: &mut impl Write,
    request: &CapturedRequest,
    options: &RenderOptions,
) -> fmt::Result {
    writeln!(
        f,
        "  #{} {} {}",
        request.sequence,
        request.method(),
        request.path()
    )?;
    if options.include_timestamps {
        writeln!(f, "      timestamp: {}", request.timestamp.to_rfc3339())?;
    }
    render_request_details(f, &request.parts(), options)?;
    let stub = match (&request.matched_stub_index, &request.matched_stub_name) {
        (Some(index), Some(name)) => format!("'{name}' (#{index})"),
        (Some(index), None) => format!("#{index}"),
        (None, _) => "none".to_string(),
    };
    writeln!(f, "      matched stub: {stub}")
}

/// Render headers, query parameters and body, one per line.
pub fn render_request_details(
    f: &mut impl Write,
    request: &RequestParts<'_>,
    options: &RenderOptions,
) -> fmt::Result {
    for (name, values) in request.headers {
        for value in values {
            writeln!(f, "      header {name}: {value}")?;
        }
    }
    for (name, values) in request.query_parameters {
        for value in values {
            writeln!(f, "      query {name}: {value}")?;
        }
    }
    let body = preview_body(request.body, options.max_body_preview);
    let mut lines = body.lines();
    if let Some(first) = lines.next() {
        writeln!(f, "      body: {first}")?;
        for line in lines {
            writeln!(f, "            {line}")?;
        }
    }
    Ok(())
}

/// Render a list of captured requests, or a placeholder when empty.
pub fn render_requests(
    f: &mut impl Write,
    requests: &[CapturedRequest],
    options: &RenderOptions,
) -> fmt::Result {
    if requests.is_empty() {
        return writeln!(f, "  (none)");
    }
    for request in requests {
        render_request(f, request, options)?;
    }
    Ok(())
}

/// Render field outcomes as an aligned `field | expected | actual` table.
pub fn render_field_table(
    f: &mut impl Write,
    fields: &[FieldDiff],
    options: &RenderOptions,
) -> fmt::Result {
    let max = options.max_body_preview;
    let rows: Vec<(String, String, String, bool)> = fields
        .iter()
        .map(|d| {
            (
                d.field.to_string(),
                inline(&d.expected, max),
                inline(d.actual.as_deref().unwrap_or(ABSENT), max),
                d.matched,
            )
        })
        .collect();

    let field_w = rows.iter().map(|r| r.0.chars().count()).chain([5]).max().unwrap_or(5);
    let expected_w = rows.iter().map(|r| r.1.chars().count()).chain([8]).max().unwrap_or(8);
    let actual_w = rows.iter().map(|r| r.2.chars().count()).chain([6]).max().unwrap_or(6);

    writeln!(
        f,
        "  {:<field_w$} | {:<expected_w$} | {}",
        "field", "expected", "actual"
    )?;
    writeln!(
        f,
        "  {}-+-{}-+-{}",
        "-".repeat(field_w),
        "-".repeat(expected_w),
        "-".repeat(actual_w)
    )?;
    for (field, expected, actual, matched) in &rows {
        if *matched {
            writeln!(f, "  {field:<field_w$} | {expected:<expected_w$} | {actual}")?;
        } else {
            writeln!(
                f,
                "  {field:<field_w$} | {expected:<expected_w$} | {actual:<actual_w$}  {MISMATCH_MARKER}"
            )?;
        }
    }

    for d in fields.iter().filter(|d| !d.matched) {
        if let (Some(expected), Some(actual)) = (&d.expected_body, &d.actual) {
            writeln!(f)?;
            writeln!(f, "  {} diff (-expected +actual):", d.field)?;
            render_line_diff(f, expected, actual)?;
        }
    }
    Ok(())
}

fn render_line_diff(f: &mut impl Write, expected: &str, actual: &str) -> fmt::Result {
    let diff = TextDiff::from_lines(expected, actual);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };
        let line = change.value().trim_end_matches(['\r', '\n']);
        writeln!(f, "  {sign}{line}")?;
    }
    Ok(())
}
