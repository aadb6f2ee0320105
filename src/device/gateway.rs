// Connect / command / disconnect wrapper around a device session

use crate::core::config::DeviceConfig;
use crate::device::client::ZkClient;
use crate::device::error::{DeviceError, Result};
use crate::models::attendance::AttendanceLog;
use crate::models::fingerprint::FingerprintTemplate;
use crate::models::user::{User, UserUpdate};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, warn};

/// An open session with the terminal, used for one command sequence
#[async_trait]
pub trait DeviceSession: Send {
    async fn get_users(&mut self) -> Result<Vec<User>>;

    async fn get_attendance(&mut self) -> Result<Vec<AttendanceLog>>;

    async fn get_templates(&mut self) -> Result<Vec<FingerprintTemplate>>;

    /// Fails with `DeviceError::UserNotFound` when no user has this id
    async fn get_user_by_id(&mut self, user_id: &str) -> Result<User>;

    async fn set_user(&mut self, user: &UserUpdate) -> Result<()>;

    async fn delete_user(&mut self, user_id: &str) -> Result<()>;

    async fn delete_user_template(&mut self, user_id: &str, finger_index: u8) -> Result<()>;

    async fn disconnect(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait DeviceConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn DeviceSession>>;

    /// Human-readable device address for logs
    fn describe(&self) -> String;
}

/// Connector for a real terminal over TCP
pub struct ZkConnector {
    config: DeviceConfig,
}

impl ZkConnector {
    pub fn new(config: DeviceConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DeviceConnector for ZkConnector {
    async fn connect(&self) -> Result<Box<dyn DeviceSession>> {
        let client = ZkClient::connect(&self.config).await?;
        Ok(Box::new(client))
    }

    fn describe(&self) -> String {
        self.config.socket_addr()
    }
}

/// Opens a fresh session per request and always closes it afterwards.
/// Sessions are never pooled or reused.
#[derive(Clone)]
pub struct DeviceGateway {
    connector: Arc<dyn DeviceConnector>,
}

impl DeviceGateway {
    pub fn new(connector: Arc<dyn DeviceConnector>) -> Self {
        Self { connector }
    }

    pub fn device(&self) -> String {
        self.connector.describe()
    }

    /// Connect, reporting any failure as `DeviceError::Connect`
    pub async fn open(&self) -> Result<Box<dyn DeviceSession>> {
        self.connector.connect().await.map_err(|e| {
            error!(device = %self.device(), error = %e, "Failed to connect to device");
            match e {
                DeviceError::Connect(_) => e,
                other => DeviceError::Connect(other.to_string()),
            }
        })
    }

    /// Disconnect and hand back the command result. A failed disconnect is
    /// logged, never surfaced.
    pub async fn close<T>(&self, session: Box<dyn DeviceSession>, result: Result<T>) -> Result<T> {
        if let Err(e) = session.disconnect().await {
            warn!(device = %self.device(), error = %e, "Failed to disconnect from device");
        }
        result
    }
}
