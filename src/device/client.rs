//! TCP client for ZK attendance terminals.
//!
//! One `ZkClient` is one device session: `connect()` performs the
//! `CMD_CONNECT` handshake (plus `CMD_AUTH` when the terminal has a comm key
//! set), the read/write helpers issue commands, and `close()` sends
//! `CMD_EXIT` and shuts the socket down.
//!
//! There is no retry and no reconnect. Every socket read and write is
//! bounded by the configured timeout.

use crate::core::config::DeviceConfig;
use crate::device::constants::*;
use crate::device::error::{DeviceError, Result};
use crate::device::gateway::DeviceSession;
use crate::device::packet::{make_commkey, Packet, Request, ZkCodec, MAX_PAYLOAD_LEN};
use crate::device::records::{
    decode_attendance, decode_sizes, decode_templates, decode_users, encode_template_delete,
    encode_user, DeviceSizes, UserRecordWidth,
};
use crate::models::attendance::AttendanceLog;
use crate::models::fingerprint::FingerprintTemplate;
use crate::models::user::{User, UserUpdate};
use async_trait::async_trait;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, info, trace, warn};

/// Tick value mixed into the comm key
const AUTH_TICKS: u8 = 50;

pub struct ZkClient {
    framed: Framed<TcpStream, ZkCodec>,
    device: String,
    timeout: Duration,
    session_id: u16,
    reply_id: u16,
    /// Record width learned from the last user read
    user_width: UserRecordWidth,
}

impl ZkClient {
    /// Open a TCP connection and establish a device session
    pub async fn connect(config: &DeviceConfig) -> Result<Self> {
        let device = config.socket_addr();
        let timeout = config.timeout();

        debug!(device = %device, "Connecting to device");

        let stream = match tokio::time::timeout(timeout, TcpStream::connect(&device)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(DeviceError::Timeout(timeout.as_millis() as u64)),
        };

        if let Err(e) = stream.set_nodelay(true) {
            warn!(device = %device, error = %e, "Failed to set TCP_NODELAY");
        }

        let mut client = Self {
            framed: Framed::new(stream, ZkCodec),
            device,
            timeout,
            session_id: 0,
            reply_id: USHRT_MAX - 1,
            user_width: UserRecordWidth::Compact,
        };

        let response = client.send_command(CMD_CONNECT, &[]).await?;
        client.session_id = response.session_id;

        match response.command {
            CMD_ACK_UNAUTH => {
                let key = make_commkey(config.password, client.session_id, AUTH_TICKS);
                let auth = client.send_command(CMD_AUTH, &key).await?;
                if !is_success(auth.command) {
                    warn!(device = %client.device, "Device rejected comm key");
                    return Err(DeviceError::Unauthorized);
                }
            }
            code if is_success(code) => {}
            code => {
                return Err(DeviceError::Rejected {
                    command: command_name(CMD_CONNECT),
                    code,
                })
            }
        }

        info!(
            device = %client.device,
            session_id = client.session_id,
            "Device session established"
        );

        Ok(client)
    }

    /// Send `CMD_EXIT` and shut the socket down
    pub async fn close(mut self) -> Result<()> {
        let result = self.execute(CMD_EXIT, &[]).await.map(|_| ());

        if let Err(e) = self.framed.get_mut().shutdown().await {
            debug!(device = %self.device, error = %e, "Socket shutdown failed");
        }

        debug!(device = %self.device, "Device session closed");
        result
    }

    pub async fn read_users(&mut self) -> Result<Vec<User>> {
        let sizes = self.read_sizes().await?;
        if sizes.users == 0 {
            return Ok(Vec::new());
        }

        let data = self.read_with_buffer(CMD_USERTEMP_RRQ, FCT_USER, 0).await?;
        let (users, width) = decode_users(&data, sizes.users);
        if let Some(width) = width {
            self.user_width = width;
        }

        debug!(device = %self.device, count = users.len(), "Users read");
        Ok(users)
    }

    pub async fn read_attendance(&mut self) -> Result<Vec<AttendanceLog>> {
        let sizes = self.read_sizes().await?;
        if sizes.records == 0 {
            return Ok(Vec::new());
        }

        let users = self.read_users().await?;
        let data = self.read_with_buffer(CMD_ATTLOG_RRQ, 0, 0).await?;
        let logs = decode_attendance(&data, sizes.records, &users);

        debug!(device = %self.device, count = logs.len(), "Attendance records read");
        Ok(logs)
    }

    pub async fn read_templates(&mut self) -> Result<Vec<FingerprintTemplate>> {
        let sizes = self.read_sizes().await?;
        if sizes.fingers == 0 {
            return Ok(Vec::new());
        }

        let users = self.read_users().await?;
        let data = self.read_with_buffer(CMD_DB_RRQ, FCT_FINGERTMP, 0).await?;
        let templates = decode_templates(&data, &users)?;

        debug!(device = %self.device, count = templates.len(), "Templates read");
        Ok(templates)
    }

    pub async fn find_user(&mut self, user_id: &str) -> Result<User> {
        self.read_users()
            .await?
            .into_iter()
            .find(|u| u.user_id == user_id)
            .ok_or_else(|| DeviceError::UserNotFound(user_id.to_string()))
    }

    /// Create or overwrite a user. An existing slot for the same user id is
    /// reused along with its group and card; otherwise the next free slot.
    pub async fn write_user(&mut self, update: &UserUpdate) -> Result<()> {
        let users = self.read_users().await?;

        let (uid, group_id, card) = match users.iter().find(|u| u.user_id == update.user_id) {
            Some(existing) => (existing.uid, existing.group_id.clone(), existing.card),
            None => (next_uid(&users)?, String::new(), 0),
        };

        let payload = encode_user(uid, update, &group_id, card, self.user_width)?;
        self.execute(CMD_USER_WRQ, &payload).await?;
        self.refresh_data().await?;

        info!(
            device = %self.device,
            user_id = %update.user_id,
            uid,
            enabled = update.enabled,
            "User written"
        );
        Ok(())
    }

    pub async fn remove_user(&mut self, user_id: &str) -> Result<()> {
        let user = self.find_user(user_id).await?;

        self.execute(CMD_DELETE_USER, &user.uid.to_le_bytes()).await?;
        self.refresh_data().await?;

        info!(device = %self.device, user_id = %user_id, uid = user.uid, "User deleted");
        Ok(())
    }

    pub async fn remove_template(&mut self, user_id: &str, finger_index: u8) -> Result<()> {
        let payload = encode_template_delete(user_id, finger_index);
        self.execute(CMD_DEL_USER_TEMP, &payload).await?;

        debug!(device = %self.device, user_id = %user_id, finger_index, "Template deleted");
        Ok(())
    }

    async fn read_sizes(&mut self) -> Result<DeviceSizes> {
        let response = self.execute(CMD_GET_FREE_SIZES, &[]).await?;
        decode_sizes(&response.data)
    }

    async fn refresh_data(&mut self) -> Result<()> {
        self.execute(CMD_REFRESHDATA, &[]).await.map(|_| ())
    }

    async fn free_data(&mut self) -> Result<()> {
        self.execute(CMD_FREE_DATA, &[]).await.map(|_| ())
    }

    /// Bulk read through the device's transfer buffer
    async fn read_with_buffer(&mut self, command: u16, fct: i32, ext: i32) -> Result<Bytes> {
        let mut request = Vec::with_capacity(11);
        request.put_u8(1);
        request.put_u16_le(command);
        request.put_i32_le(fct);
        request.put_i32_le(ext);

        let response = self.execute(CMD_PREPARE_BUFFER, &request).await?;
        if response.command == CMD_DATA {
            return Ok(response.data);
        }

        if response.data.len() < 5 {
            return Err(DeviceError::Malformed(format!(
                "buffer size reply too short: {} bytes",
                response.data.len()
            )));
        }
        let size = (&response.data[1..]).get_u32_le();

        trace!(
            device = %self.device,
            command = command_name(command),
            size,
            "Reading buffer in chunks"
        );

        let mut data = transfer_buffer(size as usize);
        let mut start = 0u32;
        while start < size {
            let chunk = (size - start).min(MAX_CHUNK);
            let bytes = self.read_chunk(start, chunk).await?;
            data.extend_from_slice(&bytes);
            start += chunk;
        }

        self.free_data().await?;
        Ok(data.freeze())
    }

    async fn read_chunk(&mut self, start: u32, size: u32) -> Result<Bytes> {
        let mut request = Vec::with_capacity(8);
        request.put_u32_le(start);
        request.put_u32_le(size);

        let response = self.execute(CMD_READ_BUFFER, &request).await?;
        match response.command {
            CMD_DATA => Ok(response.data),
            CMD_PREPARE_DATA => self.receive_prepared(&response.data).await,
            code => Err(DeviceError::Rejected {
                command: command_name(CMD_READ_BUFFER),
                code,
            }),
        }
    }

    /// Collect the `CMD_DATA` packets announced by a `CMD_PREPARE_DATA` reply
    async fn receive_prepared(&mut self, mut announcement: &[u8]) -> Result<Bytes> {
        if announcement.len() < 4 {
            return Err(DeviceError::Malformed("missing prepared data size".to_string()));
        }
        let size = announcement.get_u32_le() as usize;

        let mut data = transfer_buffer(size);
        while data.len() < size {
            let packet = self.read_packet().await?;
            if packet.command != CMD_DATA || packet.data.is_empty() {
                return Err(DeviceError::Malformed(format!(
                    "expected CMD_DATA, got {} with {} bytes",
                    command_name(packet.command),
                    packet.data.len()
                )));
            }
            data.extend_from_slice(&packet.data);
        }

        let ack = self.read_packet().await?;
        if ack.command != CMD_ACK_OK {
            return Err(DeviceError::Malformed(format!(
                "expected CMD_ACK_OK after data, got {}",
                command_name(ack.command)
            )));
        }

        Ok(data.freeze())
    }

    /// Send a command and require a success reply
    async fn execute(&mut self, command: u16, data: &[u8]) -> Result<Packet> {
        let response = self.send_command(command, data).await?;

        if is_success(response.command) {
            Ok(response)
        } else {
            warn!(
                device = %self.device,
                command = command_name(command),
                reply = command_name(response.command),
                code = response.command,
                "Device rejected command"
            );
            Err(DeviceError::Rejected {
                command: command_name(command),
                code: response.command,
            })
        }
    }

    async fn send_command(&mut self, command: u16, data: &[u8]) -> Result<Packet> {
        let request = Request {
            command,
            session_id: self.session_id,
            reply_id: self.reply_id,
            data,
        };
        let timeout_ms = self.timeout.as_millis() as u64;

        trace!(
            device = %self.device,
            command = command_name(command),
            data = %hex::encode(data),
            "Sending packet"
        );

        tokio::time::timeout(self.timeout, self.framed.send(request))
            .await
            .map_err(|_| DeviceError::Timeout(timeout_ms))??;

        let response = self.read_packet().await?;
        self.reply_id = response.reply_id;

        debug!(
            device = %self.device,
            command = command_name(command),
            reply = command_name(response.command),
            "Device replied"
        );

        Ok(response)
    }

    async fn read_packet(&mut self) -> Result<Packet> {
        let timeout_ms = self.timeout.as_millis() as u64;

        let packet = tokio::time::timeout(self.timeout, self.framed.next())
            .await
            .map_err(|_| DeviceError::Timeout(timeout_ms))?
            .ok_or(DeviceError::ConnectionClosed)??;

        trace!(
            device = %self.device,
            command = command_name(packet.command),
            data = %hex::encode(&packet.data),
            "Received packet"
        );

        Ok(packet)
    }
}

/// Sizes come from the device, so the up-front reservation is bounded and
/// anything beyond it grows as data actually arrives
fn transfer_buffer(announced: usize) -> BytesMut {
    BytesMut::with_capacity(announced.min(MAX_PAYLOAD_LEN))
}

fn next_uid(users: &[User]) -> Result<u16> {
    users
        .iter()
        .map(|u| u.uid)
        .max()
        .unwrap_or(0)
        .checked_add(1)
        .ok_or_else(|| DeviceError::InvalidUser("no free user slot left".to_string()))
}

#[async_trait]
impl DeviceSession for ZkClient {
    async fn get_users(&mut self) -> Result<Vec<User>> {
        self.read_users().await
    }

    async fn get_attendance(&mut self) -> Result<Vec<AttendanceLog>> {
        self.read_attendance().await
    }

    async fn get_templates(&mut self) -> Result<Vec<FingerprintTemplate>> {
        self.read_templates().await
    }

    async fn get_user_by_id(&mut self, user_id: &str) -> Result<User> {
        self.find_user(user_id).await
    }

    async fn set_user(&mut self, user: &UserUpdate) -> Result<()> {
        self.write_user(user).await
    }

    async fn delete_user(&mut self, user_id: &str) -> Result<()> {
        self.remove_user(user_id).await
    }

    async fn delete_user_template(&mut self, user_id: &str, finger_index: u8) -> Result<()> {
        self.remove_template(user_id, finger_index).await
    }

    async fn disconnect(self: Box<Self>) -> Result<()> {
        (*self).close().await
    }
}
