// ============================================================================
// Registry Repository
// ============================================================================
//
// Contract over a distributed key/value coordination service. Every
// operation except `init` degrades instead of failing: transport problems are
// logged and surface as absent values or no-ops, so an unreachable registry
// switches orchestration off without taking the proxy down.
//
// ============================================================================

pub mod factory;
pub mod key;
pub mod memory;

pub use factory::RegistryRepositoryFactory;
pub use memory::{InMemoryRegistryRepository, InMemoryRegistryServer, SessionId};

use crate::config::InstanceConfiguration;
use crate::core::Result;
use crate::event::DataChangedEvent;
use async_trait::async_trait;
use std::sync::Arc;

/// Callback fired on a backend-owned notification task
///
/// Implementations must return quickly; long work belongs on another task.
pub trait DataChangedEventListener: Send + Sync {
    fn on_change(&self, event: DataChangedEvent);
}

impl<F> DataChangedEventListener for F
where
    F: Fn(DataChangedEvent) + Send + Sync,
{
    fn on_change(&self, event: DataChangedEvent) {
        self(event)
    }
}

#[async_trait]
pub trait RegistryRepository: Send + Sync {
    /// Opens the backend session
    ///
    /// A failure leaves the repository unusable for the process lifetime.
    async fn init(&self, config: &InstanceConfiguration) -> Result<()>;

    /// Point read; `None` when absent or unreachable
    async fn get(&self, key: &str) -> Option<String>;

    /// Immediate child names in ascending order; empty when the backend has
    /// no hierarchy
    async fn get_children_keys(&self, key: &str) -> Vec<String>;

    /// Durable upsert
    async fn persist(&self, key: &str, value: &str);

    /// Upsert bound to this client's session
    async fn persist_ephemeral(&self, key: &str, value: &str);

    /// Registers `listener` for changes of `key` and, on hierarchical
    /// backends, of every key below it
    async fn watch(&self, key: &str, listener: Arc<dyn DataChangedEventListener>);

    /// Releases the session and its watches; idempotent
    async fn close(&self);

    /// Backend name used for configuration-driven selection
    fn get_type(&self) -> &str;
}
