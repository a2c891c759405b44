//! Checks that have to pass before records are handed to the forest builder.
//!
//! The builder only accepts [`ProcessRecord`]s, which always carry a pid. A
//! collector result missing a pid points at a partial or corrupted collection
//! and has to be surfaced to the operator, so rejected records are reported
//! by input position instead of being dropped on the floor.

use itertools::Itertools;
use log::debug;
use thiserror::Error;

use crate::record::{ProcessRecord, RawProcess};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "{} process records missing a process id (positions: {})",
    .positions.len(),
    .positions.iter().join(", ")
)]
pub struct MissingPidError {
    /// Input positions of the records without a pid
    pub positions: Vec<usize>,
}

impl MissingPidError {
    pub fn count(&self) -> usize {
        self.positions.len()
    }
}

/// Convert every raw process into a record, failing if any of them has no pid.
pub fn validate_records(raw: Vec<RawProcess>) -> Result<Vec<ProcessRecord>, MissingPidError> {
    let (records, positions) = partition_records(raw);
    if positions.is_empty() {
        Ok(records)
    } else {
        Err(MissingPidError { positions })
    }
}

/// Split raw processes into valid records and the positions of the rejected ones.
pub fn partition_records(raw: Vec<RawProcess>) -> (Vec<ProcessRecord>, Vec<usize>) {
    let mut records = Vec::with_capacity(raw.len());
    let mut rejected = Vec::new();

    for (position, process) in raw.into_iter().enumerate() {
        match ProcessRecord::try_from(process) {
            Ok(record) => records.push(record),
            Err(_) => rejected.push(position),
        }
    }

    debug!(
        "Validated {} process records, {} without a pid",
        records.len(),
        rejected.len()
    );
    (records, rejected)
}
