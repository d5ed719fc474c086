//! Application State

use std::sync::Arc;

use recon_core::Agent;
use recon_runtime::ReconConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Agent shared by every connection; sessions keep their own state
    pub agent: Arc<Agent>,

    /// Process configuration
    pub config: Arc<ReconConfig>,
}
