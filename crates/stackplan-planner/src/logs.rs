//! Log channel registry
//!
//! Provides [`LogChannelRegistry`], which deduplicates log channel requests
//! by name. Channels are referenced by containers, never owned by them.

use indexmap::IndexMap;
use stackplan_model::{
    ConfigError, ConflictError, LogChannel, LogChannelRequest, LogRetention, PlanError, ResourceId,
};

/// Registry of log channels keyed by channel name
///
/// Repeated requests with the same name and policy yield the same channel.
/// A repeated name with a different retention or teardown policy is a
/// [`ConflictError`]. Nothing is ever removed.
#[derive(Debug, Default, Clone)]
pub struct LogChannelRegistry {
    channels: IndexMap<String, LogChannel>,
}

impl LogChannelRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: IndexMap::new(),
        }
    }

    /// Register a channel requirement, returning the shared channel
    ///
    /// # Errors
    /// - [`ConfigError::EmptyLogChannelName`] / [`ConfigError::InvalidRetention`]
    ///   for malformed requests
    /// - [`ConflictError::LogChannelPolicy`] if the name is already
    ///   registered with a different policy
    pub fn request(&mut self, request: &LogChannelRequest) -> Result<&LogChannel, PlanError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ConfigError::EmptyLogChannelName.into());
        }

        let retention = request.retention.unwrap_or_default();
        if !retention.is_supported() {
            let days = match retention {
                LogRetention::Days(days) => days,
                LogRetention::NeverExpire => 0,
            };
            return Err(ConfigError::InvalidRetention {
                channel: name.to_string(),
                days,
            }
            .into());
        }

        let requested = LogChannel {
            id: ResourceId::for_log_channel(name),
            name: name.to_string(),
            retention,
            teardown: request.teardown.unwrap_or_default(),
        };

        match self.channels.get_index_of(name) {
            Some(index) => {
                let existing = &self.channels[index];
                if *existing != requested {
                    return Err(ConflictError::LogChannelPolicy {
                        name: name.to_string(),
                        existing: existing.policy_summary(),
                        requested: requested.policy_summary(),
                    }
                    .into());
                }
                tracing::debug!(channel = name, "log channel reused");
                Ok(&self.channels[index])
            }
            None => {
                tracing::debug!(channel = name, retention = %requested.retention, "log channel registered");
                let (index, _) = self.channels.insert_full(name.to_string(), requested);
                Ok(&self.channels[index])
            }
        }
    }

    /// Look up a channel by name
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&LogChannel> {
        self.channels.get(name)
    }

    /// Check if a channel with `name` exists
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Channels in registration order
    pub fn iter(&self) -> impl Iterator<Item = &LogChannel> {
        self.channels.values()
    }

    /// Consume the registry, yielding channels in registration order
    pub fn into_channels(self) -> impl Iterator<Item = LogChannel> {
        self.channels.into_values()
    }
}
