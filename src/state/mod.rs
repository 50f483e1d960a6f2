// ============================================================================
// Instance State
// ============================================================================
//
// Path layout, identity and liveness announcement of a running proxy.
//
// ============================================================================

pub mod instance;
pub mod node;
pub mod service;

pub use instance::OrchestrationInstance;
pub use node::StateNode;
pub use service::{DISABLED_STATE, StateService};
