//! Interpreting one line of interactive input.
//!
//! Frontends own the prompt loop; these functions only decide what a raw
//! answer means. Typing `exit` at any prompt aborts the run.

use chrono::NaiveDate;

use crate::error::{FaboxError, Result};

/// Input that cancels the current command.
pub const ABORT_SENTINEL: &str = "exit";

/// Format of the tag name offered by default, e.g. `220101`.
const DEFAULT_TAG_FORMAT: &str = "%y%m%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Zero-based index into the offered items.
    Picked(usize),
    /// Neither a valid position nor an item name; ask again.
    NoMatch,
}

/// Resolve `raw` against `items`: a 1-based position or an exact item name.
pub fn select_one<S: AsRef<str>>(items: &[S], raw: &str) -> Result<Selection> {
    let raw = raw.trim();
    check_abort(raw)?;

    if let Ok(position) = raw.parse::<usize>()
        && (1..=items.len()).contains(&position)
    {
        return Ok(Selection::Picked(position - 1));
    }

    Ok(items
        .iter()
        .position(|item| item.as_ref() == raw)
        .map_or(Selection::NoMatch, Selection::Picked))
}

/// Free-form text; `None` for a blank answer.
pub fn free_form(raw: &str) -> Result<Option<String>> {
    let raw = raw.trim();
    check_abort(raw)?;
    Ok((!raw.is_empty()).then(|| raw.to_string()))
}

/// Only `y` or `Y` confirm.
pub fn confirm(raw: &str) -> Result<bool> {
    let raw = raw.trim();
    check_abort(raw)?;
    Ok(matches!(raw, "y" | "Y"))
}

/// Tag name offered when the user does not pick one.
pub fn default_tag_name(date: NaiveDate) -> String {
    date.format(DEFAULT_TAG_FORMAT).to_string()
}

fn check_abort(raw: &str) -> Result<()> {
    if raw == ABORT_SENTINEL {
        return Err(FaboxError::UserAbort);
    }
    Ok(())
}
