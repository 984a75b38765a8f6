//! Small text helpers shared by the renderers.

use console::{measure_text_width, pad_str, truncate_str, Alignment};

/// `450ms`, `12s`, `2m 5s`, `1h 3m`.
pub fn format_duration(ms: u64) -> String {
    if ms < 1_000 {
        return format!("{}ms", ms);
    }
    let secs = ms / 1_000;
    if secs < 60 {
        return format!("{}s", secs);
    }
    let mins = secs / 60;
    if mins < 60 {
        let rem = secs % 60;
        return if rem == 0 {
            format!("{}m", mins)
        } else {
            format!("{}m {}s", mins, rem)
        };
    }
    let hours = mins / 60;
    let rem = mins % 60;
    if rem == 0 {
        format!("{}h", hours)
    } else {
        format!("{}h {}m", hours, rem)
    }
}

/// Display width in terminal columns, ignoring ANSI escapes.
pub fn width(text: &str) -> usize {
    measure_text_width(text)
}

/// Truncates to `max` columns with an ellipsis, then pads to exactly `max`.
pub fn fit(text: &str, max: usize) -> String {
    let cut = truncate_str(text, max, "…");
    pad_str(&cut, max, Alignment::Left, None).into_owned()
}

/// Pads to `min` columns without truncating.
pub fn pad_right(text: &str, min: usize) -> String {
    pad_str(text, min, Alignment::Left, None).into_owned()
}

/// Collapses whitespace runs (including newlines) into single spaces.
pub fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
