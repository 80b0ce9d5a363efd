//! Canvas — operation model, log, history, presence, and the sync protocol.
//!
//! Everything here is synchronous and transport-agnostic. The websocket route
//! and the canvas services own locking and fan-out; these types only know how
//! to mutate and describe canvas state.

pub mod history;
pub mod log;
pub mod op;
pub mod presence;
pub mod protocol;
pub mod render;
pub mod replica;
pub mod stroke;

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::op::{Geometry, Operation, Point, SessionId, ShapeKind, StrokeId, Submission, Tool};

    pub fn pen_submission(stroke: &str) -> Submission {
        Submission {
            stroke_id: StrokeId::new(stroke).expect("stroke id"),
            geometry: Geometry::Freehand {
                prev_point: Some(Point::new(0.0, 0.0)),
                current_point: Point::new(1.0, 1.0),
                color: "#000".into(),
                width: Tool::Pen.width(),
                tool: Tool::Pen,
            },
        }
    }

    pub fn rect_submission(stroke: &str) -> Submission {
        Submission {
            stroke_id: StrokeId::new(stroke).expect("stroke id"),
            geometry: Geometry::Shape {
                shape: ShapeKind::Rectangle,
                start_point: Point::new(10.0, 10.0),
                end_point: Point::new(40.0, 30.0),
                color: "#ef4444".into(),
                width: 5.0,
            },
        }
    }

    /// One freehand pen segment of `stroke`, owned by `owner`.
    pub fn segment(owner: SessionId, stroke: &str) -> Operation {
        Operation::new(owner, pen_submission(stroke))
    }

    /// A completed rectangle `stroke`, owned by `owner`.
    pub fn shape(owner: SessionId, stroke: &str) -> Operation {
        Operation::new(owner, rect_submission(stroke))
    }

    pub fn stroke_ids(ops: &[Operation]) -> Vec<String> {
        ops.iter().map(|op| op.stroke_id.to_string()).collect()
    }
}
