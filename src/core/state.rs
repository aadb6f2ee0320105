// Application state (AppState)

use crate::core::config::Config;
use crate::device::gateway::{DeviceConnector, DeviceGateway, ZkConnector};
use std::sync::Arc;

/// Shared application state
///
/// Holds no device connection: every request opens and closes its own
/// session through the gateway.
#[derive(Clone)]
pub struct AppState {
    pub gateway: DeviceGateway,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self::with_connector(Arc::new(ZkConnector::new(config.device.clone())))
    }

    pub fn with_connector(connector: Arc<dyn DeviceConnector>) -> Self {
        Self {
            gateway: DeviceGateway::new(connector),
        }
    }
}
