use super::loader::TableMetaDataDecorator;
use super::table::TableMetaData;
use crate::rule::ShardingRule;

/// Presents encrypted tables with their logic columns
///
/// Cipher columns are renamed to the logic column they store; plain and
/// assisted-query columns are removed.
pub struct EncryptTableMetaDataDecorator;

impl TableMetaDataDecorator for EncryptTableMetaDataDecorator {
    fn name(&self) -> &str {
        "encrypt"
    }

    fn decorate(
        &self,
        table_name: &str,
        mut table: TableMetaData,
        rule: &ShardingRule,
    ) -> TableMetaData {
        let encrypt_rule = rule.encrypt_rule();
        if !encrypt_rule.is_encrypt_table(table_name) {
            return table;
        }

        let logic_columns = encrypt_rule.cipher_to_logic_columns(table_name);
        let hidden = encrypt_rule.assisted_and_plain_columns(table_name);

        let columns = table
            .columns()
            .iter()
            .filter(|column| !hidden.contains(column.name.as_str()))
            .map(|column| {
                let mut column = column.clone();
                if let Some(logic) = logic_columns.get(column.name.as_str()) {
                    column.name = logic.to_string();
                }
                column
            })
            .collect();
        table.set_columns(columns);
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ColumnMetaData;
    use crate::rule::{
        EncryptColumnRuleConfiguration, EncryptRuleConfiguration, ShardingRuleConfiguration,
    };

    fn rule() -> ShardingRule {
        let config = ShardingRuleConfiguration::default().encrypt_rule(
            EncryptRuleConfiguration::default().column(
                "t_user",
                "pwd",
                EncryptColumnRuleConfiguration::new("pwd_cipher")
                    .plain_column("pwd_plain")
                    .assisted_query_column("pwd_assisted"),
            ),
        );
        ShardingRule::new(config, ["ds_0"]).unwrap()
    }

    fn user_table() -> TableMetaData {
        TableMetaData::new(
            vec![
                ColumnMetaData::new("user_id", "int").primary_key(),
                ColumnMetaData::new("pwd_cipher", "varchar"),
                ColumnMetaData::new("pwd_plain", "varchar"),
                ColumnMetaData::new("pwd_assisted", "varchar"),
            ],
            ["idx_user"],
        )
    }

    #[test]
    fn test_decorate_encrypt_table() {
        let table = EncryptTableMetaDataDecorator.decorate("T_USER", user_table(), &rule());

        assert_eq!(table.column_names(), vec!["user_id", "pwd"]);
        assert_eq!(table.column("pwd").unwrap().data_type, "varchar");
        assert!(table.contains_index("idx_user"));
    }

    #[test]
    fn test_other_tables_untouched() {
        let table = EncryptTableMetaDataDecorator.decorate("t_order", user_table(), &rule());
        assert_eq!(table, user_table());
    }
}
