use std::fs;
use std::io::Read;
use std::path::Path;

use crate::config::MissingPidPolicy;
use crate::prelude::*;
use process_forest::{ProcessRecord, RawProcess, partition_records, validate_records};
use serde::Deserialize;

/// Shapes a process snapshot file can take
#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    /// A bare list of processes
    Processes(Vec<RawProcess>),
    /// Flow results as exported by the server API
    Results { items: Vec<ResultItem> },
}

#[derive(Deserialize)]
struct ResultItem {
    payload: RawProcess,
}

/// Read a snapshot from `path`, `-` meaning stdin
pub fn load(path: &Path) -> Result<Vec<RawProcess>> {
    let content = if path == Path::new("-") {
        let mut content = Vec::new();
        std::io::stdin()
            .read_to_end(&mut content)
            .context("Failed to read process snapshot from stdin")?;
        content
    } else {
        fs::read(path)
            .with_context(|| format!("Failed to read process snapshot at {}", path.display()))?
    };

    let processes = parse(&content)
        .with_context(|| format!("Failed to parse process snapshot at {}", path.display()))?;
    debug!("Loaded {} processes from {}", processes.len(), path.display());
    Ok(processes)
}

pub fn parse(content: &[u8]) -> Result<Vec<RawProcess>> {
    let snapshot: SnapshotFile = serde_json::from_slice(content)?;
    Ok(match snapshot {
        SnapshotFile::Processes(processes) => processes,
        SnapshotFile::Results { items } => items.into_iter().map(|item| item.payload).collect(),
    })
}

/// Turn raw processes into records the forest can be built from.
///
/// Records without a pid are either fatal or skipped with a warning,
/// depending on `policy`.
pub fn prepare_records(
    raw: Vec<RawProcess>,
    policy: MissingPidPolicy,
) -> Result<Vec<ProcessRecord>> {
    match policy {
        MissingPidPolicy::Error => Ok(validate_records(raw)?),
        MissingPidPolicy::Skip => {
            let (records, rejected) = partition_records(raw);
            if !rejected.is_empty() {
                warn!(
                    "Skipping {} process records missing a process id (positions: {})",
                    rejected.len(),
                    rejected.iter().join(", ")
                );
            }
            Ok(records)
        }
    }
}
