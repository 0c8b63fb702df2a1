//! Logging facilities for Lattice Grid.
//!
//! Lattice Grid uses the `tracing` crate for instrumentation. Library code
//! never installs a subscriber; to see logs, install one in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("lattice_grid::selection=debug,lattice_grid::anchor=trace")
//!     .init();
//! ```

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Signal/slot system target.
    pub const SIGNAL: &str = "lattice_grid_core::signal";
    /// Re-entrancy guard target.
    pub const SYNC: &str = "lattice_grid_core::sync";
    /// Selection/currency orchestration target.
    pub const SELECTION: &str = "lattice_grid::selection";
    /// Selection model adapter target.
    pub const ADAPTER: &str = "lattice_grid::adapter";
    /// Slot/index mapping target.
    pub const SLOTS: &str = "lattice_grid::slots";
    /// Hierarchical anchor and scroll preservation target.
    pub const ANCHOR: &str = "lattice_grid::anchor";
    /// External binding synchronization target.
    pub const BINDING: &str = "lattice_grid::binding";
    /// Message dispatch and deferred task target.
    pub const DISPATCH: &str = "lattice_grid::dispatch";
    /// Data source change handling target.
    pub const DATA: &str = "lattice_grid::data";
}

/// Names of the debug spans entered at hot entry points.
pub mod span_names {
    /// Selection and currency state transition.
    pub const PROCESS_SELECTION: &str = "lattice_grid::process_selection_and_currency";
    /// Pull of selection state from the selection model.
    pub const APPLY_SELECTION_MODEL: &str = "lattice_grid::apply_selection_from_selection_model";
    /// Hierarchy structural change handling.
    pub const HIERARCHY_CHANGE: &str = "lattice_grid::hierarchy_change";
}
