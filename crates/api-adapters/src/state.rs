use std::sync::Arc;

use services::ForumServices;

use crate::metrics::Metrics;

/// Shared by every handler; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub services: ForumServices,
    pub metrics: Arc<Metrics>,
    pub app_name: Arc<str>,
    /// Read the client address from `X-Forwarded-For` / `X-Real-IP`.
    pub trust_proxy_headers: bool,
}

impl AppState {
    pub fn new(services: ForumServices, app_name: &str) -> Self {
        Self {
            services,
            metrics: Arc::new(Metrics::new()),
            app_name: Arc::from(app_name),
            trust_proxy_headers: false,
        }
    }

    pub fn trusting_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }
}
