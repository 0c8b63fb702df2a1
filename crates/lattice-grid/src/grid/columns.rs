//! Grid columns.
//!
//! Columns are identified by a stable [`ColumnId`]; their position in the
//! collection is the *column index* used by cell selection and currency.
//! Operations on an id that no longer belongs to the collection are host
//! bugs and return [`GridError::DetachedColumn`].

use crate::error::{GridError, Result};

/// Stable identity of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId(u64);

impl ColumnId {
    /// Get the raw u64 value of this column ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// A grid column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    id: ColumnId,
    header: String,
    is_visible: bool,
    is_filler: bool,
}

impl Column {
    /// The column's id.
    pub fn id(&self) -> ColumnId {
        self.id
    }

    /// Header text.
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Whether the column is shown.
    pub fn is_visible(&self) -> bool {
        self.is_visible
    }

    /// Whether this is the filler column that pads the remaining width.
    /// Filler columns never take currency or selection.
    pub fn is_filler(&self) -> bool {
        self.is_filler
    }

    /// Whether cells in this column can be current or selected.
    pub fn is_selectable(&self) -> bool {
        self.is_visible && !self.is_filler
    }
}

/// Ordered column collection.
#[derive(Debug, Clone, Default)]
pub struct Columns {
    columns: Vec<Column>,
    next_id: u64,
}

impl Columns {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a visible column.
    pub fn add(&mut self, header: impl Into<String>) -> ColumnId {
        self.push(header.into(), false)
    }

    /// Append a filler column.
    pub fn add_filler(&mut self) -> ColumnId {
        self.push(String::new(), true)
    }

    fn push(&mut self, header: String, is_filler: bool) -> ColumnId {
        self.next_id += 1;
        let id = ColumnId(self.next_id);
        self.columns.push(Column {
            id,
            header,
            is_visible: true,
            is_filler,
        });
        id
    }

    /// Remove a column. Returns the index it occupied.
    pub fn remove(&mut self, id: ColumnId) -> Result<usize> {
        let index = self.require(id)?;
        self.columns.remove(index);
        Ok(index)
    }

    /// Number of columns, including hidden and filler ones.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Index of a column.
    pub fn index_of(&self, id: ColumnId) -> Option<usize> {
        self.columns.iter().position(|c| c.id == id)
    }

    /// Id of the column at `index`.
    pub fn id_at(&self, index: usize) -> Option<ColumnId> {
        self.columns.get(index).map(|c| c.id)
    }

    /// Column by id.
    pub fn get(&self, id: ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Column by index.
    pub fn at(&self, index: usize) -> Result<&Column> {
        self.columns.get(index).ok_or(GridError::ColumnOutOfRange {
            index,
            count: self.columns.len(),
        })
    }

    /// All columns in order.
    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    fn require(&self, id: ColumnId) -> Result<usize> {
        self.index_of(id).ok_or(GridError::DetachedColumn(id))
    }

    /// Show or hide a column. Returns `true` if visibility changed.
    pub fn set_visible(&mut self, id: ColumnId, visible: bool) -> Result<bool> {
        let index = self.require(id)?;
        let column = &mut self.columns[index];
        let changed = column.is_visible != visible;
        column.is_visible = visible;
        Ok(changed)
    }

    /// Change a column's header.
    pub fn set_header(&mut self, id: ColumnId, header: impl Into<String>) -> Result<()> {
        let index = self.require(id)?;
        self.columns[index].header = header.into();
        Ok(())
    }

    /// Indexes of columns that can hold currency and selection.
    pub fn selectable_indexes(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_selectable())
            .map(|(i, _)| i)
            .collect()
    }

    /// Returns `true` if the column at `index` is selectable.
    pub fn is_selectable(&self, index: usize) -> bool {
        self.columns.get(index).is_some_and(Column::is_selectable)
    }

    /// First selectable column.
    pub fn first_selectable(&self) -> Option<usize> {
        self.columns.iter().position(Column::is_selectable)
    }

    /// Coerce a requested column index onto a selectable column.
    ///
    /// Hidden, filler and out-of-range columns fall back to the first
    /// selectable column. `None` stays `None`.
    pub fn coerce(&self, index: Option<usize>) -> Option<usize> {
        let index = index?;
        if self.is_selectable(index) {
            Some(index)
        } else {
            self.first_selectable()
        }
    }
}
