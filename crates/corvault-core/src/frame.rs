//! Isolating the JSON payload from raw CLI output.
//!
//! In JSON mode the array CLI first echoes the status of
//! `set cli-parameters json`, then prints the requested document, then a few
//! `#`-prefixed trailer lines. The banner carries no delimiter we can search
//! for, so it is skipped by line count and the result is checked to open a
//! JSON object.

use crate::catalog::Category;
use crate::error::{CollectError, Result};

/// Leading lines discarded before the payload.
///
/// Matches the banner printed by current Corvault firmware.
pub const DEFAULT_HEADER_LINES: usize = 17;

/// Lines starting with this marker after the banner are dropped.
pub const COMMENT_MARKER: char = '#';

/// Drop the first `header_lines` lines unconditionally, then drop every line
/// that starts with [`COMMENT_MARKER`]. Kept lines are trimmed at the end and
/// re-joined with `\n`.
pub fn frame<I, S>(lines: I, header_lines: usize) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut payload = String::new();
    for line in lines.into_iter().skip(header_lines) {
        let line = line.as_ref();
        if line.starts_with(COMMENT_MARKER) {
            continue;
        }
        payload.push_str(line.trim_end());
        payload.push('\n');
    }
    payload
}

/// Frame `lines` and check the result is a plausible JSON document.
///
/// Empty output is a [`CollectError::Framing`]; output that does not open with
/// `{` is a [`CollectError::SchemaDrift`] since it means the banner length and
/// `header_lines` disagree.
pub fn isolate_payload<I, S>(category: Category, lines: I, header_lines: usize) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let payload = frame(lines, header_lines);
    let Some(first_line) = payload.lines().find(|l| !l.trim().is_empty()) else {
        return Err(CollectError::Framing {
            category,
            reason: format!("no payload lines left after skipping {header_lines} header lines"),
        });
    };
    if !first_line.trim_start().starts_with('{') {
        return Err(CollectError::SchemaDrift {
            category,
            header_lines,
            first_line: first_line.trim().to_string(),
        });
    }
    log::debug!(
        "{category}: framed {} payload bytes ({} lines)",
        payload.len(),
        payload.lines().count()
    );
    Ok(payload)
}
