//! Components shared by every route, built once at startup

use std::sync::Arc;

use crate::backend::PlaybackBackend;
use crate::jobs::Pipeline;
use crate::provider::ProviderRegistry;
use crate::services::AuthService;
use crate::websocket::HubHandle;

#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub backend: Arc<dyn PlaybackBackend>,
    pub pipeline: Pipeline,
    pub hub: HubHandle,
    /// Outbound mailbox size per WebSocket connection
    pub ws_mailbox_capacity: usize,
}

impl AppState {
    pub fn new(
        auth_service: AuthService,
        backend: Arc<dyn PlaybackBackend>,
        providers: ProviderRegistry,
        hub: HubHandle,
        ws_mailbox_capacity: usize,
    ) -> Self {
        let pipeline = Pipeline::new(Arc::new(providers), backend.clone(), hub.clone());
        Self {
            auth_service,
            backend,
            pipeline,
            hub,
            ws_mailbox_capacity,
        }
    }
}
