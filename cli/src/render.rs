//! Line-oriented renderer for a terminal.
//!
//! Each drawn operation becomes one line of text; a full repaint prints a
//! separator first. Good enough to watch a canvas converge from a shell.

use std::io::Write;

use scribble::canvas::op::{Geometry, Operation, Point};
use scribble::canvas::render::Renderer;

pub struct TextRenderer<W: Write> {
    out: W,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn clear_surface(&mut self) {
        let _ = writeln!(self.out, "-- canvas cleared --");
    }

    fn render(&mut self, op: &Operation) {
        let _ = writeln!(self.out, "{}", describe(op));
    }
}

/// One-line description of an operation.
#[must_use]
pub fn describe(op: &Operation) -> String {
    let owner = op.owner_id.to_string();
    let owner = owner.get(..8).unwrap_or(&owner);
    match &op.geometry {
        Geometry::Freehand { prev_point, current_point, color, width, tool } => {
            let from = prev_point.map_or_else(|| "start".to_owned(), fmt_point);
            format!(
                "[{owner}] {stroke} {tool:?} {from} -> {to} {color} w{width}",
                stroke = op.stroke_id,
                to = fmt_point(*current_point),
            )
        }
        Geometry::Shape { shape, start_point, end_point, color, width } => format!(
            "[{owner}] {stroke} {shape:?} {from} -> {to} {color} w{width}",
            stroke = op.stroke_id,
            from = fmt_point(*start_point),
            to = fmt_point(*end_point),
        ),
    }
}

fn fmt_point(p: Point) -> String {
    format!("({:.0},{:.0})", p.x, p.y)
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
