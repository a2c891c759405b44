use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Operating system process identifier
pub type Pid = u32;

/// Descriptive payload of a sampled process.
///
/// None of these fields take part in building the forest, they are carried
/// through unchanged so that a renderer can display them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exe: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cmdline: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Creation time in microseconds since the Unix epoch
    #[serde(
        default,
        deserialize_with = "deserialize_micros",
        skip_serializing_if = "Option::is_none"
    )]
    pub ctime: Option<u64>,
    /// Any other field reported by the collector
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProcessDetails {
    /// Creation time of the process, if `ctime` is set and fits in a timestamp
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let micros = i64::try_from(self.ctime?).ok()?;
        DateTime::from_timestamp_micros(micros)
    }
}

/// A process as delivered by a collector, before any validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProcess {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<Pid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ppid: Option<Pid>,
    #[serde(flatten)]
    pub details: ProcessDetails,
}

/// A sampled process with a known pid, ready to be placed in a forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub pid: Pid,
    /// Reported parent, `None` when the collector knows of no parent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ppid: Option<Pid>,
    #[serde(flatten)]
    pub details: ProcessDetails,
}

impl ProcessRecord {
    pub fn new(pid: Pid) -> Self {
        Self {
            pid,
            ppid: None,
            details: ProcessDetails::default(),
        }
    }

    pub fn with_parent(mut self, ppid: Pid) -> Self {
        self.ppid = Some(ppid);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.details.name = Some(name.into());
        self
    }
}

impl TryFrom<RawProcess> for ProcessRecord {
    /// The rejected process is handed back untouched
    type Error = RawProcess;

    fn try_from(raw: RawProcess) -> Result<Self, Self::Error> {
        match raw.pid {
            Some(pid) => Ok(Self {
                pid,
                ppid: raw.ppid,
                details: raw.details,
            }),
            None => Err(raw),
        }
    }
}

/// 64-bit integers may come either as JSON numbers or as decimal strings.
fn deserialize_micros<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Micros {
        Number(u64),
        Text(String),
    }

    match Option::<Micros>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Micros::Number(value)) => Ok(Some(value)),
        Some(Micros::Text(text)) => text
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
