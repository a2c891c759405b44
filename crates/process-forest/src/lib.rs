//! Rebuild process trees from flat snapshots of operating system processes.
//!
//! A collector hands over every process it saw on an endpoint at one point in
//! time. [`build_forest`] links each process to its parent by pid and reports
//! whether parent references loop, which happens with pid reuse or when the
//! listing raced with processes being created and reaped.

mod forest;
mod record;
mod validate;
mod view;

pub use forest::{NodeId, ProcessForest, ProcessNode, Walk, build_forest};
pub use record::{Pid, ProcessDetails, ProcessRecord, RawProcess};
pub use validate::{MissingPidError, partition_records, validate_records};
pub use view::{ForestView, MAX_VIEW_DEPTH, NodeView, ViewDepthError};
