//! Operation model: the atomic drawing contribution recorded in the log.
//!
//! An `Operation` is either one segment of a freehand stroke or one completed
//! shape. Every operation carries the `StrokeId` of the logical drawing action
//! it belongs to, the `SessionId` of the connection that created it, and a
//! `Visibility` flag that undo/redo toggle.
//!
//! Clients never send complete operations. They send a `Submission` (stroke id
//! plus geometry); the server validates it and stamps owner and visibility.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::frame::{Data, ErrorCode};

// =============================================================================
// ERRORS
// =============================================================================

/// Reasons a submission is refused. None of these are surfaced to the sender.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("stroke_id missing or blank")]
    MissingStrokeId,
    #[error("malformed geometry: {0}")]
    MalformedGeometry(#[from] serde_json::Error),
    #[error("point coordinates must be finite")]
    NonFinitePoint,
    #[error("stroke width must be finite and positive, got {0}")]
    InvalidWidth(f64),
    #[error("color missing or blank")]
    MissingColor,
    #[error("stroke {0} belongs to another session")]
    StrokeOwnedByOther(StrokeId),
}

impl ErrorCode for OperationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingStrokeId => "E_MISSING_STROKE_ID",
            Self::MalformedGeometry(_) => "E_MALFORMED_GEOMETRY",
            Self::NonFinitePoint => "E_NON_FINITE_POINT",
            Self::InvalidWidth(_) => "E_INVALID_WIDTH",
            Self::MissingColor => "E_MISSING_COLOR",
            Self::StrokeOwnedByOther(_) => "E_STROKE_OWNED_BY_OTHER",
        }
    }
}

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Opaque participant identity, issued once per websocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Issue a fresh session identity.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier shared by every operation of one logical drawing action.
///
/// Client-generated and opaque; the only constraint is that it is not blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StrokeId(String);

impl StrokeId {
    /// Validate a raw stroke identifier.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::MissingStrokeId`] if `raw` is empty or
    /// whitespace only.
    pub fn new(raw: impl Into<String>) -> Result<Self, OperationError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(OperationError::MissingStrokeId);
        }
        Ok(Self(raw))
    }

    /// Generate a random stroke identifier for a new drawing action.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StrokeId {
    type Error = OperationError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<StrokeId> for String {
    fn from(id: StrokeId) -> Self {
        id.0
    }
}

impl fmt::Display for StrokeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// GEOMETRY
// =============================================================================

/// A point in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Freehand tool used for a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Pen,
    Eraser,
}

impl Tool {
    /// Line width the drawing surface uses for this tool.
    #[must_use]
    pub fn width(self) -> f64 {
        match self {
            Self::Pen => 5.0,
            Self::Eraser => 20.0,
        }
    }
}

/// Shape drawn from a start point to an end point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle,
    Circle,
    Triangle,
    Arrow,
}

/// Everything the rendering collaborator needs to reproduce the visual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Geometry {
    /// One segment of a pen or eraser stroke. The first segment of a stroke
    /// has no previous point.
    Freehand {
        #[serde(default)]
        prev_point: Option<Point>,
        current_point: Point,
        color: String,
        width: f64,
        tool: Tool,
    },
    /// A completed shape.
    Shape {
        shape: ShapeKind,
        start_point: Point,
        end_point: Point,
        color: String,
        width: f64,
    },
}

impl Geometry {
    /// Reject geometry the rendering collaborator cannot draw.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), OperationError> {
        let (points, color, width) = match self {
            Self::Freehand { prev_point, current_point, color, width, .. } => {
                let mut points = vec![*current_point];
                points.extend(prev_point.iter().copied());
                (points, color, *width)
            }
            Self::Shape { start_point, end_point, color, width, .. } => {
                (vec![*start_point, *end_point], color, *width)
            }
        };

        if !points.iter().all(Point::is_finite) {
            return Err(OperationError::NonFinitePoint);
        }
        if !width.is_finite() || width <= 0.0 {
            return Err(OperationError::InvalidWidth(width));
        }
        if color.trim().is_empty() {
            return Err(OperationError::MissingColor);
        }
        Ok(())
    }
}

// =============================================================================
// OPERATION
// =============================================================================

/// Logical-delete state of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Visible,
    Tombstoned,
}

/// What a client sends for one draw action: everything except the owner and
/// visibility, which only the server assigns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub stroke_id: StrokeId,
    #[serde(flatten)]
    pub geometry: Geometry,
}

impl Submission {
    /// Parse and validate a submission from frame data.
    ///
    /// Fields the client has no authority over (`owner_id`, `visibility`) are
    /// ignored if present.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError`] if the stroke id is missing or blank, or the
    /// geometry is missing, malformed, or undrawable.
    pub fn from_data(data: &Data) -> Result<Self, OperationError> {
        let stroke_id = data
            .get("stroke_id")
            .and_then(serde_json::Value::as_str)
            .ok_or(OperationError::MissingStrokeId)
            .and_then(StrokeId::new)?;

        let geometry: Geometry = serde_json::from_value(serde_json::Value::Object(data.clone()))?;
        geometry.validate()?;

        Ok(Self { stroke_id, geometry })
    }

    /// Frame payload for sending this submission.
    #[must_use]
    pub fn to_data(&self) -> Data {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => Data::new(),
        }
    }
}

/// One entry of the operation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub stroke_id: StrokeId,
    pub owner_id: SessionId,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(flatten)]
    pub geometry: Geometry,
}

impl Operation {
    /// Stamp a validated submission with its owner. New operations are visible.
    #[must_use]
    pub fn new(owner_id: SessionId, submission: Submission) -> Self {
        Self {
            stroke_id: submission.stroke_id,
            owner_id,
            visibility: Visibility::Visible,
            geometry: submission.geometry,
        }
    }

    #[must_use]
    pub fn is_tombstoned(&self) -> bool {
        self.visibility == Visibility::Tombstoned
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visibility == Visibility::Visible
    }

    /// Frame payload for broadcasting this operation.
    #[must_use]
    pub fn to_data(&self) -> Data {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => Data::new(),
        }
    }
}

#[cfg(test)]
#[path = "op_test.rs"]
mod tests;
