//! Environment overrides applied on top of a loaded config document

use anyhow::{Context, Result};
use stackplan_planner::PlanConfig;

pub(crate) const VPC_CIDR: &str = "STACKPLAN_VPC_CIDR";
pub(crate) const VPC_LOOKUP: &str = "STACKPLAN_VPC_LOOKUP";
pub(crate) const DESIRED_COUNT: &str = "STACKPLAN_DESIRED_COUNT";
pub(crate) const STACK_NAME: &str = "STACKPLAN_STACK_NAME";

/// Values read from `STACKPLAN_*` variables; unset or empty variables are
/// ignored
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct EnvOverrides {
    pub(crate) vpc_cidr: Option<String>,
    pub(crate) vpc_lookup: Option<String>,
    pub(crate) desired_count: Option<i64>,
    pub(crate) stack_name: Option<String>,
}

impl EnvOverrides {
    pub(crate) fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let desired_count = get(DESIRED_COUNT)
            .map(|raw| {
                raw.parse::<i64>()
                    .with_context(|| format!("{DESIRED_COUNT}={raw:?} is not an integer"))
            })
            .transpose()?;

        Ok(Self {
            vpc_cidr: get(VPC_CIDR),
            vpc_lookup: get(VPC_LOOKUP),
            desired_count,
            stack_name: get(STACK_NAME),
        })
    }

    /// Setting a CIDR clears a configured lookup key and vice versa. Both
    /// set at once are passed through so validation reports the ambiguity.
    pub(crate) fn apply(&self, config: &mut PlanConfig) {
        if let Some(cidr) = &self.vpc_cidr {
            config.network.cidr = Some(cidr.clone());
            config.network.lookup_key = None;
        }
        if let Some(key) = &self.vpc_lookup {
            if self.vpc_cidr.is_none() {
                config.network.cidr = None;
            }
            config.network.lookup_key = Some(key.clone());
        }
        if let Some(count) = self.desired_count {
            config.service.desired_count = count;
        }
        if let Some(name) = &self.stack_name {
            config.stack_name = name.clone();
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn overrides(vars: &[(&str, &str)]) -> Result<EnvOverrides> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        EnvOverrides::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment() {
        assert!(overrides(&[]).unwrap().is_empty());
        assert!(overrides(&[(VPC_CIDR, "  ")]).unwrap().is_empty());
    }

    #[test]
    fn cidr_replaces_lookup() {
        let mut config = stackplan_test_utils::scenario_config();
        config.network.cidr = None;
        config.network.lookup_key = Some("vpc-old".into());

        overrides(&[(VPC_CIDR, "10.1.0.0/16")]).unwrap().apply(&mut config);
        assert_eq!(config.network.cidr.as_deref(), Some("10.1.0.0/16"));
        assert_eq!(config.network.lookup_key, None);
    }

    #[test]
    fn lookup_replaces_cidr() {
        let mut config = stackplan_test_utils::scenario_config();
        overrides(&[(VPC_LOOKUP, "vpc-shared"), (STACK_NAME, "other")])
            .unwrap()
            .apply(&mut config);
        assert_eq!(config.network.cidr, None);
        assert_eq!(config.network.lookup_key.as_deref(), Some("vpc-shared"));
        assert_eq!(config.stack_name, "other");
    }

    #[test]
    fn desired_count_must_parse() {
        let mut config = stackplan_test_utils::scenario_config();
        overrides(&[(DESIRED_COUNT, "3")]).unwrap().apply(&mut config);
        assert_eq!(config.service.desired_count, 3);

        assert!(overrides(&[(DESIRED_COUNT, "three")]).is_err());
    }
}
