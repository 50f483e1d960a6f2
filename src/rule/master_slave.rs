use super::config::MasterSlaveRuleConfiguration;
use crate::core::{ProxyError, Result};
use std::collections::BTreeSet;

/// Master/replica sub-rule
///
/// Everything but the disabled set is fixed at construction. The disabled
/// set is toggled by health-driven state changes without rebuilding the rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterSlaveRule {
    name: String,
    master_data_source_name: String,
    slave_data_source_names: Vec<String>,
    disabled_data_source_names: BTreeSet<String>,
}

impl MasterSlaveRule {
    pub fn new(config: &MasterSlaveRuleConfiguration) -> Result<Self> {
        if config.name.trim().is_empty() {
            return Err(ProxyError::Rule("Master-slave rule name cannot be empty".into()));
        }
        if config.master_data_source_name.trim().is_empty() {
            return Err(ProxyError::Rule(format!(
                "Master-slave rule '{}' has no master data source",
                config.name
            )));
        }
        if config.slave_data_source_names.is_empty() {
            return Err(ProxyError::Rule(format!(
                "Master-slave rule '{}' has no slave data sources",
                config.name
            )));
        }

        Ok(Self {
            name: config.name.clone(),
            master_data_source_name: config.master_data_source_name.clone(),
            slave_data_source_names: config.slave_data_source_names.clone(),
            disabled_data_source_names: BTreeSet::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn master_data_source_name(&self) -> &str {
        &self.master_data_source_name
    }

    pub fn slave_data_source_names(&self) -> &[String] {
        &self.slave_data_source_names
    }

    pub fn disabled_data_source_names(&self) -> &BTreeSet<String> {
        &self.disabled_data_source_names
    }

    /// Slaves that are currently eligible for reads
    pub fn available_slave_data_source_names(&self) -> Vec<&str> {
        self.slave_data_source_names
            .iter()
            .filter(|name| !self.disabled_data_source_names.contains(*name))
            .map(String::as_str)
            .collect()
    }

    /// Whether `data_source_name` is the master or one of the slaves
    pub fn contains_data_source(&self, data_source_name: &str) -> bool {
        self.master_data_source_name == data_source_name
            || self.slave_data_source_names.iter().any(|s| s == data_source_name)
    }

    pub fn update_disabled_data_source_names(&mut self, data_source_name: &str, disabled: bool) {
        if disabled {
            self.disabled_data_source_names.insert(data_source_name.to_string());
        } else {
            self.disabled_data_source_names.remove(data_source_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MasterSlaveRuleConfiguration {
        MasterSlaveRuleConfiguration {
            name: "ms_ds".into(),
            master_data_source_name: "master".into(),
            slave_data_source_names: vec!["slave_0".into(), "slave_1".into()],
        }
    }

    #[test]
    fn test_toggle_disabled() {
        let mut rule = MasterSlaveRule::new(&config()).unwrap();

        rule.update_disabled_data_source_names("slave_0", true);
        assert_eq!(rule.available_slave_data_source_names(), vec!["slave_1"]);

        rule.update_disabled_data_source_names("slave_0", true);
        assert_eq!(rule.disabled_data_source_names().len(), 1);

        rule.update_disabled_data_source_names("slave_0", false);
        assert!(rule.disabled_data_source_names().is_empty());
        assert_eq!(rule.available_slave_data_source_names(), vec!["slave_0", "slave_1"]);
    }

    #[test]
    fn test_invalid_config() {
        let mut invalid = config();
        invalid.slave_data_source_names.clear();
        assert!(MasterSlaveRule::new(&invalid).is_err());

        let mut invalid = config();
        invalid.master_data_source_name = " ".into();
        assert!(MasterSlaveRule::new(&invalid).is_err());
    }
}
