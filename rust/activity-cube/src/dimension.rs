//! The closed set of dimensions a dashboard cube may group, split, or filter by.

use crate::error::{Result, ServiceError};
use serde::Serialize;
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Time,
    Datname,
    ClientAddr,
    ApplicationName,
    BackendType,
    Query,
    Usename,
    WaitEventName,
}

impl Dimension {
    /// Every accepted dimension, in the order rules are enumerated.
    pub const ALL: [Dimension; 8] = [
        Dimension::Time,
        Dimension::Datname,
        Dimension::ClientAddr,
        Dimension::ApplicationName,
        Dimension::BackendType,
        Dimension::Query,
        Dimension::Usename,
        Dimension::WaitEventName,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Time => "time",
            Dimension::Datname => "datname",
            Dimension::ClientAddr => "client_addr",
            Dimension::ApplicationName => "application_name",
            Dimension::BackendType => "backend_type",
            Dimension::Query => "query",
            Dimension::Usename => "usename",
            Dimension::WaitEventName => "wait_event_name",
        }
    }

    /// Series label carrying this dimension. `time` is the sample axis, not a label.
    pub fn label(self) -> Option<&'static str> {
        match self {
            Dimension::Time => None,
            other => Some(other.as_str()),
        }
    }

    pub fn is_time(self) -> bool {
        matches!(self, Dimension::Time)
    }

    /// Legend candidates for pre-computed rules: everything except `time`.
    pub fn legends() -> impl Iterator<Item = Dimension> {
        Self::ALL.into_iter().filter(|dim| !dim.is_time())
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = ServiceError;

    fn from_str(raw: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|dim| dim.as_str() == raw)
            .ok_or_else(|| ServiceError::InvalidDimension(raw.to_string()))
    }
}
