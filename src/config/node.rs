/// Config-center path layout
///
/// `<root>/<name>/config/schema/<schema>/rule` holds a schema's sharding rule,
/// `<root>/<name>/config/schema/<schema>/datasource` its data sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigNode {
    root: String,
    name: String,
}

impl ConfigNode {
    const ROOT: &'static str = "config";
    const SCHEMA_NODE: &'static str = "schema";
    const RULE_NODE: &'static str = "rule";
    const DATA_SOURCE_NODE: &'static str = "datasource";

    pub fn new(root: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
        }
    }

    /// Parent of every schema node; rule watches are registered here
    pub fn schema_path(&self) -> String {
        self.full_path(Self::SCHEMA_NODE)
    }

    pub fn rule_path(&self, schema_name: &str) -> String {
        format!("{}/{}/{}", self.schema_path(), schema_name, Self::RULE_NODE)
    }

    pub fn data_source_path(&self, schema_name: &str) -> String {
        format!("{}/{}/{}", self.schema_path(), schema_name, Self::DATA_SOURCE_NODE)
    }

    /// Schema name of a rule path, `None` for any other path
    pub fn schema_name_from_rule_path(&self, path: &str) -> Option<String> {
        let rest = path.strip_prefix(&self.schema_path())?.strip_prefix('/')?;
        let (schema_name, node) = rest.split_once('/')?;
        if schema_name.is_empty() || node != Self::RULE_NODE {
            return None;
        }
        Some(schema_name.to_string())
    }

    fn full_path(&self, node: &str) -> String {
        format!("{}/{}/{}/{}", self.root, self.name, Self::ROOT, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let node = ConfigNode::new("", "orchestration_ds");

        assert_eq!(node.schema_path(), "/orchestration_ds/config/schema");
        assert_eq!(
            node.rule_path("sharding_db"),
            "/orchestration_ds/config/schema/sharding_db/rule"
        );
        assert_eq!(
            node.data_source_path("sharding_db"),
            "/orchestration_ds/config/schema/sharding_db/datasource"
        );
    }

    #[test]
    fn test_schema_name_from_rule_path() {
        let node = ConfigNode::new("/ns", "demo");

        assert_eq!(
            node.schema_name_from_rule_path("/ns/demo/config/schema/sharding_db/rule"),
            Some("sharding_db".to_string())
        );
        assert_eq!(
            node.schema_name_from_rule_path("/ns/demo/config/schema/sharding_db/datasource"),
            None
        );
        assert_eq!(node.schema_name_from_rule_path("/ns/demo/config/schema//rule"), None);
        assert_eq!(node.schema_name_from_rule_path("/other/config/schema/x/rule"), None);
    }
}
