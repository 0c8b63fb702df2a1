//! Selection vocabulary: modes, units, actions and gestures.
//!
//! A pointer or keyboard gesture is mapped to a [`SelectionAction`] first;
//! the grid's orchestrator then applies the action to the selection model
//! and the grid's own selection state in one step.

/// How many rows may be selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// At most one row (or cell).
    Single,
    /// Any number, with Ctrl toggling and Shift extending.
    #[default]
    Extended,
}

/// What a click selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionUnit {
    /// Whole rows.
    #[default]
    FullRow,
    /// Cells; the row header selects the whole row.
    CellOrRowHeader,
    /// Cells; the column header selects the whole column.
    CellOrColumnHeader,
    /// Cells; both headers select.
    CellOrRowOrColumnHeader,
}

impl SelectionUnit {
    /// Returns `true` for the cell-based units.
    pub fn is_cell_based(self) -> bool {
        self != Self::FullRow
    }

    /// Returns `true` if clicking a row header selects the row.
    pub fn allows_row_header(self) -> bool {
        matches!(self, Self::CellOrRowHeader | Self::CellOrRowOrColumnHeader)
    }

    /// Returns `true` if clicking a column header selects the column.
    pub fn allows_column_header(self) -> bool {
        matches!(
            self,
            Self::CellOrColumnHeader | Self::CellOrRowOrColumnHeader
        )
    }
}

/// A selection mutation requested together with a currency move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionAction {
    /// Move currency only.
    #[default]
    None,
    /// Add the target to the selection and make it the anchor.
    AddCurrentToSelection,
    /// Remove the target from the selection; the anchor stays.
    RemoveCurrentFromSelection,
    /// Select the closed range between the anchor and the target.
    SelectFromAnchorToCurrent,
    /// Select only the target and make it the anchor.
    SelectCurrent,
}

impl SelectionAction {
    /// Normalize an action for a selection mode.
    ///
    /// Single mode has no multi-row actions: adding and extending both
    /// replace the selection.
    pub fn for_mode(self, mode: SelectionMode) -> Self {
        match (mode, self) {
            (
                SelectionMode::Single,
                Self::AddCurrentToSelection | Self::SelectFromAnchorToCurrent,
            ) => Self::SelectCurrent,
            (_, action) => action,
        }
    }

    /// Returns `true` if the action changes selection state.
    pub fn mutates_selection(self) -> bool {
        self != Self::None
    }
}

/// Modifier state of a selection gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionGesture {
    /// Ctrl (Cmd) held.
    pub ctrl: bool,
    /// Shift held.
    pub shift: bool,
}

impl SelectionGesture {
    /// No modifiers.
    pub fn plain() -> Self {
        Self::default()
    }

    /// Ctrl held.
    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            shift: false,
        }
    }

    /// Shift held.
    pub fn shift() -> Self {
        Self {
            ctrl: false,
            shift: true,
        }
    }

    /// Action for a pointer press on a target whose current selection state
    /// is `target_selected`.
    pub fn pointer_action(self, mode: SelectionMode, target_selected: bool) -> SelectionAction {
        match mode {
            SelectionMode::Single => {
                if self.ctrl && target_selected {
                    SelectionAction::RemoveCurrentFromSelection
                } else {
                    SelectionAction::SelectCurrent
                }
            }
            SelectionMode::Extended => {
                if self.shift {
                    SelectionAction::SelectFromAnchorToCurrent
                } else if self.ctrl {
                    if target_selected {
                        SelectionAction::RemoveCurrentFromSelection
                    } else {
                        SelectionAction::AddCurrentToSelection
                    }
                } else {
                    SelectionAction::SelectCurrent
                }
            }
        }
    }

    /// Action for a keyboard navigation key.
    ///
    /// Ctrl moves currency without touching the selection.
    pub fn keyboard_action(self, mode: SelectionMode) -> SelectionAction {
        if self.shift && mode == SelectionMode::Extended {
            SelectionAction::SelectFromAnchorToCurrent
        } else if self.ctrl {
            SelectionAction::None
        } else {
            SelectionAction::SelectCurrent
        }
    }
}

/// Keyboard navigation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Previous visible slot.
    Up,
    /// Next visible slot.
    Down,
    /// First visible slot.
    Home,
    /// Last visible slot.
    End,
    /// One viewport up.
    PageUp,
    /// One viewport down.
    PageDown,
}

/// A request for [`DataGrid::process_selection_and_currency`].
///
/// The target is resolved in order: item, group, then the backup slot.
///
/// [`DataGrid::process_selection_and_currency`]: super::DataGrid::process_selection_and_currency
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionRequest<T> {
    /// Requested column; coerced onto a selectable column.
    pub column_index: Option<usize>,
    /// Data item to target.
    pub item: Option<T>,
    /// Row group whose header to target.
    pub group: Option<usize>,
    /// Slot used when neither the item nor the group resolves. May be
    /// negative when produced by hit-testing.
    pub backup_slot: isize,
    /// Selection mutation to apply.
    pub action: SelectionAction,
    /// Scroll the new current cell into view.
    pub scroll_into_view: bool,
}

impl<T> SelectionRequest<T> {
    /// Target a slot.
    pub fn slot(slot: isize, action: SelectionAction) -> Self {
        Self {
            column_index: None,
            item: None,
            group: None,
            backup_slot: slot,
            action,
            scroll_into_view: false,
        }
    }

    /// Target an item.
    pub fn item(item: T, action: SelectionAction) -> Self {
        Self {
            item: Some(item),
            ..Self::slot(-1, action)
        }
    }

    /// Target a row group's header.
    pub fn group(group: usize, action: SelectionAction) -> Self {
        Self {
            group: Some(group),
            ..Self::slot(-1, action)
        }
    }

    /// Set the column.
    pub fn with_column(mut self, column_index: usize) -> Self {
        self.column_index = Some(column_index);
        self
    }

    /// Set the backup slot.
    pub fn with_backup_slot(mut self, slot: isize) -> Self {
        self.backup_slot = slot;
        self
    }

    /// Request scrolling the new current cell into view.
    pub fn with_scroll_into_view(mut self, scroll: bool) -> Self {
        self.scroll_into_view = scroll;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_mode_normalizes_multi_actions() {
        let mode = SelectionMode::Single;
        assert_eq!(
            SelectionAction::AddCurrentToSelection.for_mode(mode),
            SelectionAction::SelectCurrent
        );
        assert_eq!(
            SelectionAction::SelectFromAnchorToCurrent.for_mode(mode),
            SelectionAction::SelectCurrent
        );
        assert_eq!(
            SelectionAction::RemoveCurrentFromSelection.for_mode(mode),
            SelectionAction::RemoveCurrentFromSelection
        );
        assert_eq!(
            SelectionAction::AddCurrentToSelection.for_mode(SelectionMode::Extended),
            SelectionAction::AddCurrentToSelection
        );
    }

    #[test]
    fn test_pointer_gestures() {
        let extended = SelectionMode::Extended;
        assert_eq!(
            SelectionGesture::plain().pointer_action(extended, true),
            SelectionAction::SelectCurrent
        );
        assert_eq!(
            SelectionGesture::ctrl().pointer_action(extended, false),
            SelectionAction::AddCurrentToSelection
        );
        assert_eq!(
            SelectionGesture::ctrl().pointer_action(extended, true),
            SelectionAction::RemoveCurrentFromSelection
        );
        assert_eq!(
            SelectionGesture::shift().pointer_action(extended, false),
            SelectionAction::SelectFromAnchorToCurrent
        );
        assert_eq!(
            SelectionGesture::shift().pointer_action(SelectionMode::Single, false),
            SelectionAction::SelectCurrent
        );
    }

    #[test]
    fn test_keyboard_gestures() {
        assert_eq!(
            SelectionGesture::ctrl().keyboard_action(SelectionMode::Extended),
            SelectionAction::None
        );
        assert_eq!(
            SelectionGesture::shift().keyboard_action(SelectionMode::Single),
            SelectionAction::SelectCurrent
        );
    }

    #[test]
    fn test_request_builders() {
        let request = SelectionRequest::item("x", SelectionAction::SelectCurrent)
            .with_column(2)
            .with_scroll_into_view(true);
        assert_eq!(request.item, Some("x"));
        assert_eq!(request.column_index, Some(2));
        assert_eq!(request.backup_slot, -1);
        assert!(request.scroll_into_view);

        let request = SelectionRequest::<&str>::group(1, SelectionAction::None);
        assert_eq!(request.group, Some(1));
    }

    #[test]
    fn test_unit_capabilities() {
        assert!(!SelectionUnit::FullRow.is_cell_based());
        assert!(SelectionUnit::CellOrRowHeader.allows_row_header());
        assert!(!SelectionUnit::CellOrRowHeader.allows_column_header());
        assert!(SelectionUnit::CellOrRowOrColumnHeader.allows_column_header());
    }
}
