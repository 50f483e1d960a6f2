use crate::event::OrchestrationShardingSchema;

/// Registry layout of runtime state
///
/// `<root>/<name>/state/instances/<instance id>` holds one ephemeral liveness
/// node per running proxy, `<root>/<name>/state/datasources` is the durable
/// parent of per data source state such as `disabled` markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateNode {
    root: String,
    name: String,
}

impl StateNode {
    const ROOT: &'static str = "state";
    const INSTANCES_NODE_PATH: &'static str = "instances";
    const DATA_SOURCES_NODE_PATH: &'static str = "datasources";

    pub fn new(root: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
        }
    }

    pub fn instances_node_full_path(&self, instance_id: &str) -> String {
        format!("{}/{}", self.instances_node_full_root_path(), instance_id)
    }

    pub fn instances_node_full_root_path(&self) -> String {
        self.full_path(Self::INSTANCES_NODE_PATH)
    }

    pub fn data_sources_node_full_root_path(&self) -> String {
        self.full_path(Self::DATA_SOURCES_NODE_PATH)
    }

    /// Node of one `<schema>.<data source>` below the data sources root
    pub fn data_source_node_full_path(&self, schema_data_source_name: &str) -> String {
        format!("{}/{}", self.data_sources_node_full_root_path(), schema_data_source_name)
    }

    /// Schema and data source addressed by a node directly below the data sources root
    pub fn get_orchestration_sharding_schema(
        &self,
        data_source_node_full_path: &str,
    ) -> Option<OrchestrationShardingSchema> {
        let leaf = data_source_node_full_path
            .strip_prefix(&self.data_sources_node_full_root_path())?
            .strip_prefix('/')?;
        if leaf.is_empty() || leaf.contains('/') {
            return None;
        }
        Some(OrchestrationShardingSchema::parse(leaf))
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
        let node = StateNode::new("", "orchestration_ds");

        assert_eq!(
            node.instances_node_full_path("127.0.0.1@-@1234"),
            "/orchestration_ds/state/instances/127.0.0.1@-@1234"
        );
        assert_eq!(node.data_sources_node_full_root_path(), "/orchestration_ds/state/datasources");
        assert_eq!(
            node.data_source_node_full_path("sharding_db.ds_0"),
            "/orchestration_ds/state/datasources/sharding_db.ds_0"
        );
    }

    #[test]
    fn test_paths_are_deterministic() {
        let a = StateNode::new("/prod", "demo");
        let b = StateNode::new("/prod", "demo");
        assert_eq!(a.instances_node_full_path("i1"), b.instances_node_full_path("i1"));
        assert_eq!(a.instances_node_full_root_path(), "/prod/demo/state/instances");
    }

    #[test]
    fn test_orchestration_sharding_schema_from_path() {
        let node = StateNode::new("", "demo");

        assert_eq!(
            node.get_orchestration_sharding_schema("/demo/state/datasources/sharding_db.ds_1"),
            Some(OrchestrationShardingSchema::new("sharding_db", "ds_1"))
        );
        assert_eq!(
            node.get_orchestration_sharding_schema("/demo/state/datasources/ds_1"),
            Some(OrchestrationShardingSchema::new("logic_db", "ds_1"))
        );
        assert_eq!(node.get_orchestration_sharding_schema("/demo/state/datasources"), None);
        assert_eq!(node.get_orchestration_sharding_schema("/demo/state/instances/x"), None);
        assert_eq!(node.get_orchestration_sharding_schema("/demo/state/datasources/a/b"), None);
    }
}
