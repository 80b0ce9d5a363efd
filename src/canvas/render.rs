//! Rendering collaborator interface.
//!
//! Pixel-level drawing lives outside this crate. The replica drives any
//! surface that implements [`Renderer`]: one call per newly visible operation,
//! or a full repaint after a resync.

use crate::canvas::op::Operation;

pub trait Renderer {
    /// Wipe the drawing surface.
    fn clear_surface(&mut self);

    /// Draw one non-tombstoned operation on top of what is already there.
    fn render(&mut self, op: &Operation);

    /// Repaint from a full sequence: clear, then draw visible entries in order.
    fn render_all(&mut self, ops: &[Operation]) {
        self.clear_surface();
        for op in ops.iter().filter(|op| op.is_visible()) {
            self.render(op);
        }
    }
}

/// Renderer that draws nothing, for headless replicas.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn clear_surface(&mut self) {}

    fn render(&mut self, _op: &Operation) {}
}
