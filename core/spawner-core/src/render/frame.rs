//! Box drawing sized to content.

use console::Style;

use crate::format::{fit, width};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Rounded,
    Heavy,
}

struct Glyphs {
    top_left: &'static str,
    top_right: &'static str,
    bottom_left: &'static str,
    bottom_right: &'static str,
    horizontal: &'static str,
    vertical: &'static str,
}

impl FrameKind {
    fn glyphs(self) -> Glyphs {
        match self {
            FrameKind::Rounded => Glyphs {
                top_left: "╭",
                top_right: "╮",
                bottom_left: "╰",
                bottom_right: "╯",
                horizontal: "─",
                vertical: "│",
            },
            FrameKind::Heavy => Glyphs {
                top_left: "┏",
                top_right: "┓",
                bottom_left: "┗",
                bottom_right: "┛",
                horizontal: "━",
                vertical: "┃",
            },
        }
    }
}

/// Draws `body` inside a frame with `title` set into the top edge.
///
/// The inner width is the widest of title and body, clamped to
/// `min_inner..=max_inner`. Longer lines are cut with an ellipsis. Styled
/// input is fine: widths ignore ANSI escapes.
pub fn draw(
    kind: FrameKind,
    title: &str,
    body: &[String],
    border: &Style,
    min_inner: usize,
    max_inner: usize,
) -> String {
    let g = kind.glyphs();
    let max_inner = max_inner.max(min_inner);

    let wanted = body
        .iter()
        .map(|line| width(line))
        .chain(std::iter::once(width(title) + 1))
        .max()
        .unwrap_or(0);
    let inner = wanted.clamp(min_inner, max_inner).max(2);

    // `╭─ title ───╮` spans inner + 4 columns like the body rows.
    let title = fit(title, inner - 1).trim_end().to_string();
    let dashes = inner - 1 - width(&title);

    let mut out = Vec::with_capacity(body.len() + 2);
    out.push(format!(
        "{} {} {}",
        border.apply_to(format!("{}{}", g.top_left, g.horizontal)),
        title,
        border.apply_to(format!("{}{}", g.horizontal.repeat(dashes), g.top_right)),
    ));
    for line in body {
        out.push(format!(
            "{} {} {}",
            border.apply_to(g.vertical),
            fit(line, inner),
            border.apply_to(g.vertical),
        ));
    }
    out.push(
        border
            .apply_to(format!(
                "{}{}{}",
                g.bottom_left,
                g.horizontal.repeat(inner + 2),
                g.bottom_right
            ))
            .to_string(),
    );

    out.join("\n")
}
