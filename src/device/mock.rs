// In-memory terminal for handler and gateway tests

use crate::core::routes::build_router;
use crate::core::state::AppState;
use crate::device::constants::{command_name, CMD_ACK_ERROR, CMD_DEL_USER_TEMP};
use crate::device::error::{DeviceError, Result};
use crate::device::gateway::{DeviceConnector, DeviceSession};
use crate::device::records::check_privilege;
use crate::models::attendance::AttendanceLog;
use crate::models::fingerprint::FingerprintTemplate;
use crate::models::user::{User, UserUpdate};
use async_trait::async_trait;
use axum::Router;
use chrono::NaiveDateTime;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
pub struct MockState {
    pub users: Vec<User>,
    pub logs: Vec<AttendanceLog>,
    pub templates: Vec<FingerprintTemplate>,
    pub refuse_connections: bool,
    pub fail_disconnect: bool,
    /// Finger indexes whose deletion the device rejects
    pub failing_fingers: Vec<u8>,
    pub connects: usize,
    pub disconnects: usize,
}

#[derive(Clone, Default)]
pub struct MockDevice {
    state: Arc<Mutex<MockState>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn with_user(self, uid: u16, user_id: &str, name: &str) -> Self {
        self.state().users.push(User {
            uid,
            user_id: user_id.to_string(),
            name: name.to_string(),
            privilege: 0,
            password: String::new(),
            group_id: String::new(),
            card: 0,
            enabled: true,
        });
        self
    }

    pub fn with_log(self, user_id: &str, timestamp: &str) -> Self {
        let timestamp = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M:%S").unwrap();
        self.state().logs.push(AttendanceLog {
            uid: 0,
            user_id: user_id.to_string(),
            timestamp,
            status: 0,
            punch: 0,
        });
        self
    }

    pub fn with_template(self, user_id: &str, finger_index: u8) -> Self {
        self.state().templates.push(FingerprintTemplate {
            uid: 0,
            user_id: user_id.to_string(),
            finger_index,
            valid: true,
            size: 512,
        });
        self
    }

    /// Router wired to this device
    pub fn app(&self) -> Router {
        build_router(Arc::new(AppState::with_connector(Arc::new(self.clone()))))
    }
}

#[async_trait]
impl DeviceConnector for MockDevice {
    async fn connect(&self) -> Result<Box<dyn DeviceSession>> {
        let mut state = self.state();
        if state.refuse_connections {
            return Err(DeviceError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Connection refused",
            )));
        }
        state.connects += 1;

        Ok(Box::new(MockSession {
            state: Arc::clone(&self.state),
        }))
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

struct MockSession {
    state: Arc<Mutex<MockState>>,
}

impl MockSession {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl DeviceSession for MockSession {
    async fn get_users(&mut self) -> Result<Vec<User>> {
        let users = self.state().users.clone();
        Ok(users)
    }

    async fn get_attendance(&mut self) -> Result<Vec<AttendanceLog>> {
        let logs = self.state().logs.clone();
        Ok(logs)
    }

    async fn get_templates(&mut self) -> Result<Vec<FingerprintTemplate>> {
        let templates = self.state().templates.clone();
        Ok(templates)
    }

    async fn get_user_by_id(&mut self, user_id: &str) -> Result<User> {
        let user = self.state().users.iter().find(|u| u.user_id == user_id).cloned();
        user.ok_or_else(|| DeviceError::UserNotFound(user_id.to_string()))
    }

    async fn set_user(&mut self, user: &UserUpdate) -> Result<()> {
        check_privilege(user.privilege)?;
        let mut state = self.state();
        let next_uid = state.users.iter().map(|u| u.uid).max().unwrap_or(0) + 1;

        match state.users.iter().position(|u| u.user_id == user.user_id) {
            Some(index) => {
                let existing = &mut state.users[index];
                existing.name = user.name.clone();
                existing.privilege = user.privilege;
                existing.password = user.password.clone();
                existing.enabled = user.enabled;
            }
            None => state.users.push(User {
                uid: next_uid,
                user_id: user.user_id.clone(),
                name: user.name.clone(),
                privilege: user.privilege,
                password: user.password.clone(),
                group_id: String::new(),
                card: 0,
                enabled: user.enabled,
            }),
        }
        Ok(())
    }

    async fn delete_user(&mut self, user_id: &str) -> Result<()> {
        let mut state = self.state();
        let before = state.users.len();
        state.users.retain(|u| u.user_id != user_id);
        if state.users.len() == before {
            return Err(DeviceError::UserNotFound(user_id.to_string()));
        }
        Ok(())
    }

    async fn delete_user_template(&mut self, user_id: &str, finger_index: u8) -> Result<()> {
        let mut state = self.state();
        if state.failing_fingers.contains(&finger_index) {
            return Err(DeviceError::Rejected {
                command: command_name(CMD_DEL_USER_TEMP),
                code: CMD_ACK_ERROR,
            });
        }
        state
            .templates
            .retain(|t| !(t.user_id == user_id && t.finger_index == finger_index));
        Ok(())
    }

    async fn disconnect(self: Box<Self>) -> Result<()> {
        let mut state = self.state();
        state.disconnects += 1;
        if state.fail_disconnect {
            return Err(DeviceError::Timeout(5000));
        }
        Ok(())
    }
}
