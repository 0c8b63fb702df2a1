//! Hooks into the host that owns the grid's editing and scrolling.
//!
//! The grid has no widgets of its own. Cell editing and real scrolling live
//! in the host; the grid asks through these traits before it commits a
//! selection change.

/// The host's cell editor.
pub trait EditingHost: Send {
    /// Returns `true` while a cell editor is open.
    fn is_editing(&self) -> bool;

    /// Commit the open edit.
    ///
    /// Returns `false` when the edit cannot be committed (for example, the
    /// value fails validation). The grid then leaves selection and currency
    /// unchanged.
    fn commit_edit(&mut self) -> bool;
}

/// The host's scroll container.
pub trait ScrollHost: Send {
    /// Bring the cell at `slot` and `column` into view.
    ///
    /// Returns `false` when the cell cannot be shown.
    fn scroll_into_view(&mut self, slot: usize, column: Option<usize>) -> bool;
}
