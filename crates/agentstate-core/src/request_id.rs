use crate::error::{AgentError, Result};
use crate::paths;
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::OnceLock;

/// `{AGENT_PREFIX}-{YYYY-MM-DD}-{NNN}`, e.g. `BE-2026-10-18-003`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId {
    pub prefix: String,
    pub date: NaiveDate,
    pub seq: u32,
}

static REQUEST_ID_RE: OnceLock<Regex> = OnceLock::new();

fn request_id_re() -> &'static Regex {
    REQUEST_ID_RE.get_or_init(|| {
        Regex::new(r"^([A-Z][A-Z0-9]*)-(\d{4}-\d{2}-\d{2})-(\d{3,})$").unwrap()
    })
}

impl RequestId {
    pub fn new(prefix: impl Into<String>, date: NaiveDate, seq: u32) -> Result<Self> {
        let prefix = prefix.into();
        if !paths::is_valid_prefix(&prefix) || seq == 0 {
            return Err(AgentError::InvalidRequestId(format!(
                "{prefix}-{date}-{seq:03}"
            )));
        }
        Ok(Self { prefix, date, seq })
    }

    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || AgentError::InvalidRequestId(s.to_string());
        let caps = request_id_re().captures(s.trim()).ok_or_else(invalid)?;
        let date = NaiveDate::parse_from_str(&caps[2], "%Y-%m-%d").map_err(|_| invalid())?;
        let seq: u32 = caps[3].parse().map_err(|_| invalid())?;
        if seq == 0 {
            return Err(invalid());
        }
        Ok(Self {
            prefix: caps[1].to_string(),
            date,
            seq,
        })
    }

    /// Next ID for `prefix` on `date`: one past the highest sequence among
    /// `existing` sharing the same prefix and date, starting at 001.
    pub fn next<'a>(
        prefix: &str,
        date: NaiveDate,
        existing: impl IntoIterator<Item = &'a RequestId>,
    ) -> Result<Self> {
        let max = existing
            .into_iter()
            .filter(|id| id.prefix == prefix && id.date == date)
            .map(|id| id.seq)
            .max()
            .unwrap_or(0);
        let seq = max.checked_add(1).ok_or_else(|| AgentError::RequestIdRejected {
            id: format!("{prefix}-{date}-{max:03}"),
            reason: "no sequence numbers left for this prefix and date".to_string(),
        })?;
        Self::new(prefix, date, seq)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{:03}",
            self.prefix,
            self.date.format("%Y-%m-%d"),
            self.seq
        )
    }
}

impl std::str::FromStr for RequestId {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        RequestId::parse(&s).map_err(serde::de::Error::custom)
    }
}
