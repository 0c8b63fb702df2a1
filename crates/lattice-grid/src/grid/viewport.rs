//! Scroll position and per-row visual state.

/// The visible window over the grid's content.
///
/// A hierarchy change can request a scroll offset that the next layout pass
/// applies; it is held here as the pending offset until [`take_pending_offset`]
/// consumes it.
///
/// [`take_pending_offset`]: Viewport::take_pending_offset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Viewport {
    offset: f64,
    height: f64,
    pending_offset: Option<f64>,
}

impl Viewport {
    /// A viewport of `height` scrolled to the top.
    pub fn new(height: f64) -> Self {
        Self {
            offset: 0.0,
            height: height.max(0.0),
            pending_offset: None,
        }
    }

    /// Content offset of the viewport's top edge.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Height of the viewport.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Content offset of the viewport's bottom edge.
    pub fn bottom(&self) -> f64 {
        self.offset + self.height
    }

    /// Scroll to `offset`. Negative offsets clamp to zero.
    pub fn set_offset(&mut self, offset: f64) {
        self.offset = offset.max(0.0);
    }

    /// Resize the viewport.
    pub fn set_height(&mut self, height: f64) {
        self.height = height.max(0.0);
    }

    /// Offset requested for the next layout pass.
    pub fn pending_offset(&self) -> Option<f64> {
        self.pending_offset
    }

    /// Request an offset for the next layout pass.
    pub fn set_pending_offset(&mut self, offset: f64) {
        self.pending_offset = Some(offset.max(0.0));
    }

    /// Take the requested offset, if any.
    pub fn take_pending_offset(&mut self) -> Option<f64> {
        self.pending_offset.take()
    }

    /// Scroll the least distance that shows `top..bottom`.
    ///
    /// Returns `true` if the offset changed. Extents taller than the viewport
    /// align to their top.
    pub fn ensure_visible(&mut self, top: f64, bottom: f64) -> bool {
        let old = self.offset;
        if top < self.offset || bottom - top > self.height {
            self.offset = top.max(0.0);
        } else if bottom > self.bottom() {
            self.offset = (bottom - self.height).max(0.0);
        }
        self.offset != old
    }
}

/// Visual flags of one realized row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowVisualState {
    /// The row is selected.
    pub is_selected: bool,
    /// The row holds the current cell.
    pub is_current: bool,
    /// The slot is a group header.
    pub is_group_header: bool,
    /// The pointer is over the row.
    pub is_pointer_over: bool,
}
