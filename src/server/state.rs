use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

use crate::affinity_store::AffinityStore;
use crate::config::AppConfig;
use crate::curation::{CurationRequest, RunServices};
use crate::scraper::BrowserGate;

/// Builds the collaborators of one run from its request.
pub type ServiceFactory = Arc<dyn Fn(&CurationRequest) -> Result<RunServices> + Send + Sync>;

#[derive(Clone)]
pub struct ServerState {
    pub config: AppConfig,
    pub start_time: Instant,
    pub services: ServiceFactory,
    pub active_runs: Arc<AtomicUsize>,
}

impl ServerState {
    pub fn new(config: AppConfig, services: ServiceFactory) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            services,
            active_runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// State wired to the production collaborators.
    ///
    /// Every run shares the affinity store and the browser gate.
    pub fn with_production_services(config: AppConfig, store: Arc<dyn AffinityStore>) -> Self {
        let gate = BrowserGate::new();
        let factory_config = config.clone();
        let services: ServiceFactory = Arc::new(move |request: &CurationRequest| {
            RunServices::from_config(&factory_config, request, store.clone(), gate.clone())
        });
        Self::new(config, services)
    }

    pub fn active_runs(&self) -> usize {
        self.active_runs.load(Ordering::SeqCst)
    }
}
