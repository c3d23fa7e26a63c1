// Application state shared across handlers
use std::sync::Arc;

use crate::{app_config::AppConfig, services::PhishingDetector};

#[derive(Clone)]
pub struct AppState {
    pub detector: Arc<PhishingDetector>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(detector: PhishingDetector, config: AppConfig) -> Self {
        Self {
            detector: Arc::new(detector),
            config: Arc::new(config),
        }
    }
}
