use std::sync::Arc;

use scriptbox_core::scripting::orchestrator::ScriptOrchestrator;
use scriptbox_core::scripting::repository::FsScriptRepository;

use crate::config::ServerConfig;

/// Orchestrator over the filesystem script store, as used by the server.
pub type Orchestrator = ScriptOrchestrator<FsScriptRepository>;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Script execution service. Stateless apart from its configuration.
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    /// Build the state from configuration, wiring the filesystem store into
    /// the orchestrator.
    pub fn new(config: ServerConfig) -> Self {
        let repository = FsScriptRepository::new(&config.execution);
        let orchestrator = ScriptOrchestrator::new(repository, config.execution.clone());
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// The script store backing the orchestrator.
    pub fn repository(&self) -> &FsScriptRepository {
        self.orchestrator.repository()
    }
}
