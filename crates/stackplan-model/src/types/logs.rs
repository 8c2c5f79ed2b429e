use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::id::ResourceId;

/// What happens to a log channel when the plan is torn down
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TeardownPolicy {
    #[default]
    Retain,
    Destroy,
}

/// How long log output is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LogRetention {
    Days(u32),
    NeverExpire,
}

impl LogRetention {
    /// Six months
    pub const DEFAULT: Self = Self::Days(180);

    /// Day counts the log backend accepts
    pub const SUPPORTED_DAYS: [u32; 22] = [
        1, 3, 5, 7, 14, 30, 60, 90, 120, 150, 180, 365, 400, 545, 731, 1096, 1827, 2192, 2557,
        2922, 3288, 3653,
    ];

    #[must_use]
    pub fn is_supported(self) -> bool {
        match self {
            Self::Days(days) => Self::SUPPORTED_DAYS.contains(&days),
            Self::NeverExpire => true,
        }
    }
}

impl Default for LogRetention {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for LogRetention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Days(days) => write!(f, "{days} days"),
            Self::NeverExpire => f.write_str("never expire"),
        }
    }
}

/// Request for a named log destination
///
/// Unset fields take the defaults (six months, retain) before requests are
/// compared, so an explicit `180 days` and an omitted retention agree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LogChannelRequest {
    pub name: String,
    #[serde(default)]
    pub retention: Option<LogRetention>,
    #[serde(default)]
    pub teardown: Option<TeardownPolicy>,
}

impl LogChannelRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            retention: None,
            teardown: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn retention(mut self, retention: LogRetention) -> Self {
        self.retention = Some(retention);
        self
    }

    #[inline]
    #[must_use]
    pub fn teardown(mut self, teardown: TeardownPolicy) -> Self {
        self.teardown = Some(teardown);
        self
    }
}

/// A retention-bounded destination for container output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct LogChannel {
    pub id: ResourceId,
    pub name: String,
    pub retention: LogRetention,
    pub teardown: TeardownPolicy,
}

impl LogChannel {
    #[inline]
    #[must_use]
    pub fn destroy_on_teardown(&self) -> bool {
        self.teardown == TeardownPolicy::Destroy
    }

    /// Retention in days, `None` when logs never expire
    #[must_use]
    pub fn retention_days(&self) -> Option<u32> {
        match self.retention {
            LogRetention::Days(days) => Some(days),
            LogRetention::NeverExpire => None,
        }
    }

    /// Retention and teardown, as reported in conflicts
    #[must_use]
    pub fn policy_summary(&self) -> String {
        format!("retention {}, teardown {:?}", self.retention, self.teardown)
    }
}

/// How a container routes its output to a channel
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct LogBinding {
    pub channel: ResourceId,
    pub stream_prefix: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retention_is_six_months() {
        assert_eq!(LogRetention::default(), LogRetention::Days(180));
        assert!(LogRetention::default().is_supported());
    }

    #[test]
    fn unsupported_day_counts() {
        assert!(!LogRetention::Days(0).is_supported());
        assert!(!LogRetention::Days(181).is_supported());
        assert!(LogRetention::NeverExpire.is_supported());
    }

    #[test]
    fn default_teardown_retains() {
        assert_eq!(TeardownPolicy::default(), TeardownPolicy::Retain);
    }
}
