use super::config::{EncryptColumnRuleConfiguration, EncryptRuleConfiguration};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Encryption sub-rule: which columns are stored encrypted and under which names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptRule {
    /// table (lowercase) -> logic column -> column rule
    tables: HashMap<String, BTreeMap<String, EncryptColumnRuleConfiguration>>,
}

impl EncryptRule {
    pub fn new(config: Option<&EncryptRuleConfiguration>) -> Self {
        let Some(config) = config else {
            return Self::default();
        };

        let tables = config
            .tables
            .iter()
            .filter(|(_, table)| !table.columns.is_empty())
            .map(|(name, table)| {
                let columns = table
                    .columns
                    .iter()
                    .map(|(logic, column)| (logic.clone(), column.clone()))
                    .collect();
                (name.to_lowercase(), columns)
            })
            .collect();

        Self { tables }
    }

    pub fn encrypt_table_names(&self) -> BTreeSet<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    pub fn is_encrypt_table(&self, table: &str) -> bool {
        self.tables.contains_key(&table.to_lowercase())
    }

    pub fn cipher_column(&self, table: &str, logic_column: &str) -> Option<&str> {
        self.tables
            .get(&table.to_lowercase())?
            .get(logic_column)
            .map(|c| c.cipher_column.as_str())
    }

    /// cipher column -> logic column
    pub fn cipher_to_logic_columns(&self, table: &str) -> HashMap<&str, &str> {
        self.tables
            .get(&table.to_lowercase())
            .map(|columns| {
                columns
                    .iter()
                    .map(|(logic, c)| (c.cipher_column.as_str(), logic.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Plain and assisted-query columns, which stay invisible to clients
    pub fn assisted_and_plain_columns(&self, table: &str) -> BTreeSet<&str> {
        self.tables
            .get(&table.to_lowercase())
            .map(|columns| {
                columns
                    .values()
                    .flat_map(|c| [c.plain_column.as_deref(), c.assisted_query_column.as_deref()])
                    .flatten()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns() {
        let config = EncryptRuleConfiguration::default().column(
            "T_USER",
            "pwd",
            EncryptColumnRuleConfiguration::new("pwd_cipher")
                .plain_column("pwd_plain")
                .assisted_query_column("pwd_assisted"),
        );
        let rule = EncryptRule::new(Some(&config));

        assert!(rule.is_encrypt_table("t_user"));
        assert_eq!(rule.cipher_column("t_user", "pwd"), Some("pwd_cipher"));
        assert_eq!(rule.cipher_to_logic_columns("t_user").get("pwd_cipher"), Some(&"pwd"));
        assert_eq!(
            rule.assisted_and_plain_columns("t_user").into_iter().collect::<Vec<_>>(),
            vec!["pwd_assisted", "pwd_plain"]
        );
    }

    #[test]
    fn test_empty_rule() {
        let rule = EncryptRule::new(None);
        assert!(rule.encrypt_table_names().is_empty());
        assert!(rule.cipher_to_logic_columns("t_user").is_empty());
    }
}
