//! Stroke builder: turns pointer gestures into draw submissions.
//!
//! The builder is a small gesture state machine. It is fed one
//! [`PointerEvent`] at a time and emits the [`Submission`]s a client sends to
//! the server.
//!
//! - Freehand tools start a fresh stroke id on pointer-down and emit one
//!   segment for the down event and each move. Pointer-up only ends the
//!   gesture.
//! - Shape tools emit nothing until pointer-up, then a single shape spanning
//!   the down and up points under its own stroke id.

use crate::canvas::op::{Geometry, Point, ShapeKind, StrokeId, Submission, Tool};

/// Line width used for every shape.
pub const SHAPE_WIDTH: f64 = 5.0;

/// Tool the pointer is currently drawing with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawTool {
    Freehand(Tool),
    Shape(ShapeKind),
}

impl Default for DrawTool {
    fn default() -> Self {
        Self::Freehand(Tool::Pen)
    }
}

/// One pointer sample from the input layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub point: Point,
    /// Pointer went down.
    pub is_start: bool,
    /// Pointer went up.
    pub is_end: bool,
}

impl PointerEvent {
    #[must_use]
    pub fn down(point: Point) -> Self {
        Self { point, is_start: true, is_end: false }
    }

    #[must_use]
    pub fn moved(point: Point) -> Self {
        Self { point, is_start: false, is_end: false }
    }

    #[must_use]
    pub fn up(point: Point) -> Self {
        Self { point, is_start: false, is_end: true }
    }
}

/// Gesture in progress between pointer-down and pointer-up.
#[derive(Debug, Clone)]
enum Gesture {
    Idle,
    Freehand { stroke_id: StrokeId, tool: Tool, last: Point },
    Shape { shape: ShapeKind, anchor: Point, current: Point },
}

#[derive(Debug, Clone)]
pub struct StrokeBuilder {
    tool: DrawTool,
    color: String,
    gesture: Gesture,
}

impl StrokeBuilder {
    #[must_use]
    pub fn new(tool: DrawTool, color: impl Into<String>) -> Self {
        Self { tool, color: color.into(), gesture: Gesture::Idle }
    }

    /// Feed one pointer sample. Returns the submission to send, if any.
    ///
    /// Moves and ups with no preceding down are ignored.
    pub fn feed(&mut self, event: PointerEvent) -> Option<Submission> {
        if event.is_start {
            return self.begin(event.point);
        }

        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle => None,
            Gesture::Freehand { stroke_id, tool, last } => {
                if event.is_end {
                    return None;
                }
                let submission = self.segment(&stroke_id, tool, Some(last), event.point);
                self.gesture = Gesture::Freehand { stroke_id, tool, last: event.point };
                Some(submission)
            }
            Gesture::Shape { shape, anchor, .. } => {
                if event.is_end {
                    return Some(Submission {
                        stroke_id: StrokeId::generate(),
                        geometry: self.shape_geometry(shape, anchor, event.point),
                    });
                }
                self.gesture = Gesture::Shape { shape, anchor, current: event.point };
                None
            }
        }
    }

    /// Rubber-band geometry for a shape still being dragged.
    #[must_use]
    pub fn preview(&self) -> Option<Geometry> {
        match &self.gesture {
            Gesture::Shape { shape, anchor, current } => Some(self.shape_geometry(*shape, *anchor, *current)),
            _ => None,
        }
    }

    fn begin(&mut self, point: Point) -> Option<Submission> {
        match self.tool {
            DrawTool::Freehand(tool) => {
                let stroke_id = StrokeId::generate();
                let submission = self.segment(&stroke_id, tool, None, point);
                self.gesture = Gesture::Freehand { stroke_id, tool, last: point };
                Some(submission)
            }
            DrawTool::Shape(shape) => {
                self.gesture = Gesture::Shape { shape, anchor: point, current: point };
                None
            }
        }
    }

    fn segment(&self, stroke_id: &StrokeId, tool: Tool, prev_point: Option<Point>, current_point: Point) -> Submission {
        Submission {
            stroke_id: stroke_id.clone(),
            geometry: Geometry::Freehand {
                prev_point,
                current_point,
                color: self.color.clone(),
                width: tool.width(),
                tool,
            },
        }
    }

    fn shape_geometry(&self, shape: ShapeKind, start_point: Point, end_point: Point) -> Geometry {
        Geometry::Shape { shape, start_point, end_point, color: self.color.clone(), width: SHAPE_WIDTH }
    }
}

#[cfg(test)]
#[path = "stroke_test.rs"]
mod tests;
