//! In-memory registry backend
//!
//! `InMemoryRegistryServer` plays the coordination service: it owns the node
//! tree, the client sessions and the watch subscriptions. Every
//! `InMemoryRegistryRepository` is one client holding one session on it, so
//! several repositories sharing a server behave like several proxy processes
//! sharing one registry cluster.

use super::key::{child_name, is_under};
use super::{DataChangedEventListener, RegistryRepository};
use crate::config::{InstanceConfiguration, RegistryProperties};
use crate::core::{ProxyError, Result};
use crate::event::{ChangedType, DataChangedEvent};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, mpsc};

pub type SessionId = u64;

struct Node {
    value: String,
    /// Owning session of an ephemeral node
    owner: Option<SessionId>,
}

struct Watcher {
    key: String,
    session: SessionId,
    tx: mpsc::UnboundedSender<DataChangedEvent>,
}

struct ServerState {
    nodes: BTreeMap<String, Node>,
    sessions: HashSet<SessionId>,
    watchers: Vec<Watcher>,
    next_session: SessionId,
    available: bool,
    latency: Duration,
}

impl ServerState {
    fn check(&self, session: SessionId) -> Result<()> {
        if !self.available {
            return Err(ProxyError::RegistryUnavailable(InMemoryRegistryRepository::TYPE.into()));
        }
        if !self.sessions.contains(&session) {
            return Err(ProxyError::Registry(format!("Session {} has expired", session)));
        }
        Ok(())
    }

    fn notify(&mut self, event: DataChangedEvent) {
        // A closed receiver means the watching client is gone
        self.watchers.retain(|watcher| {
            if !is_under(&event.key, &watcher.key) {
                return true;
            }
            watcher.tx.send(event.clone()).is_ok()
        });
    }
}

/// Shared coordination service
#[derive(Clone)]
pub struct InMemoryRegistryServer {
    state: Arc<Mutex<ServerState>>,
}

impl InMemoryRegistryServer {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ServerState {
                nodes: BTreeMap::new(),
                sessions: HashSet::new(),
                watchers: Vec::new(),
                next_session: 1,
                available: true,
                latency: Duration::ZERO,
            })),
        }
    }

    /// Simulates the service becoming (un)reachable
    pub async fn set_available(&self, available: bool) {
        self.state.lock().await.available = available;
    }

    /// Delay applied to every read
    pub async fn set_latency(&self, latency: Duration) {
        self.state.lock().await.latency = latency;
    }

    pub async fn is_session_alive(&self, session: SessionId) -> bool {
        self.state.lock().await.sessions.contains(&session)
    }

    pub async fn contains_key(&self, key: &str) -> bool {
        self.state.lock().await.nodes.contains_key(key)
    }

    /// Drops a session as if its client crashed or lost connectivity
    ///
    /// Ephemeral nodes owned by the session are deleted and watchers observe
    /// a DELETED change for each of them.
    pub async fn expire_session(&self, session: SessionId) {
        let mut state = self.state.lock().await;
        if !state.sessions.remove(&session) {
            return;
        }

        let owned: Vec<String> = state
            .nodes
            .iter()
            .filter(|(_, node)| node.owner == Some(session))
            .map(|(key, _)| key.clone())
            .collect();
        for key in owned {
            if let Some(node) = state.nodes.remove(&key) {
                state.notify(DataChangedEvent::new(key, node.value, ChangedType::Deleted));
            }
        }

        state.watchers.retain(|watcher| watcher.session != session);
        debug!("Registry session {} closed", session);
    }

    async fn open_session(&self) -> Result<SessionId> {
        let mut state = self.state.lock().await;
        if !state.available {
            return Err(ProxyError::RegistryUnavailable(InMemoryRegistryRepository::TYPE.into()));
        }
        let session = state.next_session;
        state.next_session += 1;
        state.sessions.insert(session);
        Ok(session)
    }

    async fn simulate_latency(&self) {
        let latency = self.state.lock().await.latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    async fn get(&self, session: SessionId, key: &str) -> Result<Option<String>> {
        self.simulate_latency().await;
        let state = self.state.lock().await;
        state.check(session)?;
        Ok(state.nodes.get(key).map(|node| node.value.clone()))
    }

    async fn children(&self, session: SessionId, key: &str) -> Result<Vec<String>> {
        self.simulate_latency().await;
        let state = self.state.lock().await;
        state.check(session)?;
        let children: BTreeSet<String> = state
            .nodes
            .keys()
            .filter_map(|node| child_name(node, key))
            .map(str::to_string)
            .collect();
        Ok(children.into_iter().collect())
    }

    async fn put(&self, session: SessionId, key: &str, value: &str, ephemeral: bool) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check(session)?;

        let owner = ephemeral.then_some(session);
        let changed_type = match state.nodes.insert(
            key.to_string(),
            Node {
                value: value.to_string(),
                owner,
            },
        ) {
            Some(_) => ChangedType::Updated,
            None => ChangedType::Added,
        };
        state.notify(DataChangedEvent::new(key, value, changed_type));
        Ok(())
    }

    async fn add_watcher(
        &self,
        session: SessionId,
        key: &str,
        tx: mpsc::UnboundedSender<DataChangedEvent>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check(session)?;
        state.watchers.push(Watcher {
            key: key.to_string(),
            session,
            tx,
        });
        Ok(())
    }
}

impl Default for InMemoryRegistryServer {
    fn default() -> Self {
        Self::new()
    }
}

/// One client session on an [`InMemoryRegistryServer`]
///
/// Keys are stored under `/<namespace>` when the configuration names one;
/// listeners always see keys without that prefix.
pub struct InMemoryRegistryRepository {
    server: InMemoryRegistryServer,
    session: RwLock<Option<SessionId>>,
    namespace: RwLock<String>,
    properties: RwLock<RegistryProperties>,
}

impl InMemoryRegistryRepository {
    pub const TYPE: &'static str = "memory";

    pub fn new(server: InMemoryRegistryServer) -> Self {
        Self {
            server,
            session: RwLock::new(None),
            namespace: RwLock::new(String::new()),
            properties: RwLock::new(RegistryProperties::default()),
        }
    }

    /// Current session, `None` before `init` or after `close`
    pub async fn session_id(&self) -> Option<SessionId> {
        *self.session.read().await
    }

    async fn full_key(&self, key: &str) -> String {
        let namespace = self.namespace.read().await;
        format!("{}{}", namespace, key)
    }

    async fn session_or_log(&self, operation: &str, key: &str) -> Option<SessionId> {
        let session = *self.session.read().await;
        if session.is_none() {
            debug!("Registry {} on '{}' skipped: repository is not initialized", operation, key);
        }
        session
    }
}

#[async_trait]
impl RegistryRepository for InMemoryRegistryRepository {
    async fn init(&self, config: &InstanceConfiguration) -> Result<()> {
        if let Err(e) = config.validate() {
            error!("Init registry '{}' failed: {}", Self::TYPE, e);
            return Err(ProxyError::Config(e));
        }

        let session = match self.server.open_session().await {
            Ok(session) => session,
            Err(e) => {
                error!(
                    "Init registry '{}' on '{}' failed: {}",
                    Self::TYPE,
                    config.server_lists,
                    e
                );
                return Err(e);
            }
        };

        *self.namespace.write().await = config
            .namespace
            .as_deref()
            .map(|ns| ns.trim_matches('/'))
            .filter(|ns| !ns.is_empty())
            .map(|ns| format!("/{}", ns))
            .unwrap_or_default();
        *self.properties.write().await = config.registry_properties();

        let previous = self.session.write().await.replace(session);
        if let Some(previous) = previous {
            self.server.expire_session(previous).await;
        }

        info!(
            "Registry '{}' connected to '{}' with session {}",
            Self::TYPE,
            config.server_lists,
            session
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Option<String> {
        let session = self.session_or_log("get", key).await?;
        let timeout = self.properties.read().await.timeout();
        let full_key = self.full_key(key).await;

        match tokio::time::timeout(timeout, self.server.get(session, &full_key)).await {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                debug!("Registry get '{}' failed: {}", key, e);
                None
            }
            Err(_) => {
                warn!(
                    "{}",
                    ProxyError::Timeout(key.to_string(), timeout.as_millis() as u64)
                );
                None
            }
        }
    }

    async fn get_children_keys(&self, key: &str) -> Vec<String> {
        let Some(session) = self.session_or_log("get children", key).await else {
            return Vec::new();
        };
        let timeout = self.properties.read().await.timeout();
        let full_key = self.full_key(key).await;

        match tokio::time::timeout(timeout, self.server.children(session, &full_key)).await {
            Ok(Ok(children)) => children,
            Ok(Err(e)) => {
                debug!("Registry get children of '{}' failed: {}", key, e);
                Vec::new()
            }
            Err(_) => {
                warn!(
                    "{}",
                    ProxyError::Timeout(key.to_string(), timeout.as_millis() as u64)
                );
                Vec::new()
            }
        }
    }

    async fn persist(&self, key: &str, value: &str) {
        let Some(session) = self.session_or_log("persist", key).await else {
            return;
        };
        let full_key = self.full_key(key).await;
        if let Err(e) = self.server.put(session, &full_key, value, false).await {
            debug!("Registry persist '{}' failed: {}", key, e);
        }
    }

    async fn persist_ephemeral(&self, key: &str, value: &str) {
        let Some(session) = self.session_or_log("persist ephemeral", key).await else {
            return;
        };
        let full_key = self.full_key(key).await;
        if let Err(e) = self.server.put(session, &full_key, value, true).await {
            debug!("Registry persist ephemeral '{}' failed: {}", key, e);
        }
    }

    async fn watch(&self, key: &str, listener: Arc<dyn DataChangedEventListener>) {
        let Some(session) = self.session_or_log("watch", key).await else {
            return;
        };
        let namespace = self.namespace.read().await.clone();
        let full_key = format!("{}{}", namespace, key);

        let (tx, mut rx) = mpsc::unbounded_channel::<DataChangedEvent>();
        if let Err(e) = self.server.add_watcher(session, &full_key, tx).await {
            debug!("Registry watch '{}' failed: {}", key, e);
            return;
        }

        // Notification task: one per watch, delivers in change order
        tokio::spawn(async move {
            while let Some(mut event) = rx.recv().await {
                if let Some(stripped) = event.key.strip_prefix(&namespace) {
                    event.key = stripped.to_string();
                }
                listener.on_change(event);
            }
        });
    }

    async fn close(&self) {
        let session = self.session.write().await.take();
        if let Some(session) = session {
            self.server.expire_session(session).await;
            info!("Registry '{}' session {} released", Self::TYPE, session);
        }
    }

    fn get_type(&self) -> &str {
        Self::TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn config() -> InstanceConfiguration {
        InstanceConfiguration::new(InMemoryRegistryRepository::TYPE, "localhost:2181")
    }

    async fn connected(server: &InMemoryRegistryServer) -> InMemoryRegistryRepository {
        let repository = InMemoryRegistryRepository::new(server.clone());
        repository.init(&config()).await.unwrap();
        repository
    }

    fn collecting_listener() -> (
        Arc<dyn DataChangedEventListener>,
        mpsc::UnboundedReceiver<DataChangedEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let tx = StdMutex::new(tx);
        let listener = move |event: DataChangedEvent| {
            let _ = tx.lock().unwrap().send(event);
        };
        (Arc::new(listener), rx)
    }

    #[tokio::test]
    async fn test_persist_and_get() {
        let server = InMemoryRegistryServer::new();
        let repository = connected(&server).await;

        assert_eq!(repository.get("/demo/config").await, None);
        repository.persist("/demo/config", "v1").await;
        assert_eq!(repository.get("/demo/config").await.as_deref(), Some("v1"));
        assert_eq!(repository.get_type(), "memory");
    }

    #[tokio::test]
    async fn test_children_keys_are_sorted_and_unique() {
        let server = InMemoryRegistryServer::new();
        let repository = connected(&server).await;

        repository.persist("/demo/state/instances/b", "").await;
        repository.persist("/demo/state/instances/a", "").await;
        repository.persist("/demo/state/datasources", "").await;
        repository.persist("/demo/state/instances/a/child", "").await;

        assert_eq!(
            repository.get_children_keys("/demo/state").await,
            vec!["datasources", "instances"]
        );
        assert_eq!(repository.get_children_keys("/demo/state/instances").await, vec!["a", "b"]);
        assert!(repository.get_children_keys("/missing").await.is_empty());
    }

    #[tokio::test]
    async fn test_uninitialized_repository_degrades() {
        let repository = InMemoryRegistryRepository::new(InMemoryRegistryServer::new());

        repository.persist("/demo", "x").await;
        assert_eq!(repository.get("/demo").await, None);
        assert!(repository.get_children_keys("/").await.is_empty());
    }

    #[tokio::test]
    async fn test_init_fails_when_server_unavailable() {
        let server = InMemoryRegistryServer::new();
        server.set_available(false).await;

        let repository = InMemoryRegistryRepository::new(server.clone());
        assert!(matches!(
            repository.init(&config()).await,
            Err(ProxyError::RegistryUnavailable(_))
        ));
        assert_eq!(repository.session_id().await, None);

        server.set_available(true).await;
        repository.persist("/demo", "x").await;
        assert!(!server.contains_key("/demo").await);
    }

    #[tokio::test]
    async fn test_init_rejects_invalid_config() {
        let repository = InMemoryRegistryRepository::new(InMemoryRegistryServer::new());
        let invalid = InstanceConfiguration::new("memory", "");
        assert!(matches!(repository.init(&invalid).await, Err(ProxyError::Config(_))));
    }

    #[tokio::test]
    async fn test_get_times_out() {
        let server = InMemoryRegistryServer::new();
        let repository = InMemoryRegistryRepository::new(server.clone());
        repository.init(&config().property("timeout", "20")).await.unwrap();
        repository.persist("/slow", "v").await;

        server.set_latency(Duration::from_millis(200)).await;
        assert_eq!(repository.get("/slow").await, None);

        server.set_latency(Duration::ZERO).await;
        assert_eq!(repository.get("/slow").await.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_unavailable_server_degrades_operations() {
        let server = InMemoryRegistryServer::new();
        let repository = connected(&server).await;
        repository.persist("/demo", "v").await;

        server.set_available(false).await;
        assert_eq!(repository.get("/demo").await, None);
        repository.persist("/demo", "v2").await;

        server.set_available(true).await;
        assert_eq!(repository.get("/demo").await.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_prefix_watch_delivers_in_order() {
        let server = InMemoryRegistryServer::new();
        let repository = connected(&server).await;
        let (listener, mut rx) = collecting_listener();
        repository.watch("/demo/config", listener).await;

        repository.persist("/demo/config/a", "1").await;
        repository.persist("/demo/config/a", "2").await;
        repository.persist("/demo/other", "ignored").await;
        repository.persist("/demo/config", "3").await;

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        let third = rx.recv().await.unwrap();
        assert_eq!(first, DataChangedEvent::new("/demo/config/a", "1", ChangedType::Added));
        assert_eq!(second, DataChangedEvent::new("/demo/config/a", "2", ChangedType::Updated));
        assert_eq!(third, DataChangedEvent::new("/demo/config", "3", ChangedType::Added));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_ephemeral_node_removed_on_close() {
        let server = InMemoryRegistryServer::new();
        let owner = connected(&server).await;
        let observer = connected(&server).await;
        let (listener, mut rx) = collecting_listener();
        observer.watch("/demo/state/instances", listener).await;

        owner.persist_ephemeral("/demo/state/instances/i1", "").await;
        owner.persist("/demo/state/datasources", "").await;
        assert_eq!(rx.recv().await.unwrap().changed_type, ChangedType::Added);

        owner.close().await;
        owner.close().await;

        let deleted = rx.recv().await.unwrap();
        assert_eq!(deleted.key, "/demo/state/instances/i1");
        assert_eq!(deleted.changed_type, ChangedType::Deleted);
        assert_eq!(observer.get("/demo/state/instances/i1").await, None);
        assert_eq!(observer.get("/demo/state/datasources").await.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_namespace_is_transparent_to_clients() {
        let server = InMemoryRegistryServer::new();
        let repository = InMemoryRegistryRepository::new(server.clone());
        repository.init(&config().namespace("orchestration")).await.unwrap();
        let (listener, mut rx) = collecting_listener();
        repository.watch("/demo", listener).await;

        repository.persist("/demo/key", "v").await;

        assert!(server.contains_key("/orchestration/demo/key").await);
        assert_eq!(repository.get("/demo/key").await.as_deref(), Some("v"));
        assert_eq!(rx.recv().await.unwrap().key, "/demo/key");
    }

    #[tokio::test]
    async fn test_expired_session_rejects_writes() {
        let server = InMemoryRegistryServer::new();
        let repository = connected(&server).await;
        let session = repository.session_id().await.unwrap();

        server.expire_session(session).await;
        assert!(!server.is_session_alive(session).await);

        repository.persist("/demo", "x").await;
        assert!(!server.contains_key("/demo").await);
    }
}
