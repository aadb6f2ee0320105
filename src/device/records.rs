// Binary record layouts for user, attendance and template buffers

use crate::device::constants::PRIVILEGE_DISABLED;
use crate::device::error::{DeviceError, Result};
use crate::models::attendance::AttendanceLog;
use crate::models::fingerprint::FingerprintTemplate;
use crate::models::user::{User, UserUpdate};
use crate::utils::time::decode_device_time;
use bytes::{Buf, BufMut};
use tracing::warn;

/// Counters reported by `CMD_GET_FREE_SIZES`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceSizes {
    pub users: u32,
    pub fingers: u32,
    pub records: u32,
}

/// Firmware-dependent width of a user record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRecordWidth {
    /// 28 bytes, numeric user ids
    Compact,
    /// 72 bytes, string user ids
    Extended,
}

impl UserRecordWidth {
    pub fn size(self) -> usize {
        match self {
            UserRecordWidth::Compact => 28,
            UserRecordWidth::Extended => 72,
        }
    }

    /// Pick the width from the buffer size and the advertised user count
    pub fn detect(total_size: usize, user_count: u32) -> Self {
        if user_count > 0 {
            match total_size / user_count as usize {
                28 => UserRecordWidth::Compact,
                72 => UserRecordWidth::Extended,
                other => {
                    warn!(record_size = other, "Unexpected user record size, assuming 72");
                    UserRecordWidth::Extended
                }
            }
        } else if total_size % 72 == 0 {
            UserRecordWidth::Extended
        } else {
            UserRecordWidth::Compact
        }
    }
}

pub fn decode_sizes(data: &[u8]) -> Result<DeviceSizes> {
    if data.len() < 80 {
        return Err(DeviceError::Malformed(format!(
            "size report too short: {} bytes",
            data.len()
        )));
    }

    let field = |index: usize| (&data[index * 4..]).get_u32_le();

    Ok(DeviceSizes {
        users: field(4),
        fingers: field(6),
        records: field(8),
    })
}

/// Split a buffered read into its declared size and record bytes
fn split_buffer(mut data: &[u8]) -> Option<(usize, &[u8])> {
    if data.len() <= 4 {
        return None;
    }
    let declared = data.get_u32_le() as usize;
    let total = declared.min(data.len());
    Some((total, &data[..total]))
}

pub fn decode_users(data: &[u8], user_count: u32) -> (Vec<User>, Option<UserRecordWidth>) {
    let Some((total, body)) = split_buffer(data) else {
        return (Vec::new(), None);
    };

    let width = UserRecordWidth::detect(total, user_count);
    let users = body
        .chunks_exact(width.size())
        .map(|record| match width {
            UserRecordWidth::Compact => decode_compact_user(record),
            UserRecordWidth::Extended => decode_extended_user(record),
        })
        .collect();

    (users, Some(width))
}

fn decode_compact_user(mut record: &[u8]) -> User {
    let uid = record.get_u16_le();
    let raw_privilege = record.get_u8();
    let password = take_string(&mut record, 5);
    let name = take_string(&mut record, 8).trim().to_string();
    let card = record.get_u32_le();
    record.advance(1);
    let group_id = record.get_u8().to_string();
    // timezone
    record.advance(2);
    let user_id = record.get_u32_le().to_string();

    build_user(uid, raw_privilege, password, name, card, group_id, user_id)
}

fn decode_extended_user(mut record: &[u8]) -> User {
    let uid = record.get_u16_le();
    let raw_privilege = record.get_u8();
    let password = take_string(&mut record, 8);
    let name = take_string(&mut record, 24).trim().to_string();
    let card = record.get_u32_le();
    record.advance(1);
    let group_id = take_string(&mut record, 7).trim().to_string();
    record.advance(1);
    let user_id = take_string(&mut record, 24);

    build_user(uid, raw_privilege, password, name, card, group_id, user_id)
}

fn build_user(
    uid: u16,
    raw_privilege: u8,
    password: String,
    name: String,
    card: u32,
    group_id: String,
    user_id: String,
) -> User {
    let name = if name.is_empty() {
        format!("NN-{}", user_id)
    } else {
        name
    };

    User {
        uid,
        user_id,
        name,
        privilege: raw_privilege & !PRIVILEGE_DISABLED,
        password,
        group_id,
        card,
        enabled: raw_privilege & PRIVILEGE_DISABLED == 0,
    }
}

/// Bit 0 of the stored privilege is the disabled flag, so only even
/// privilege values can be written.
pub fn check_privilege(privilege: u8) -> Result<()> {
    if privilege & PRIVILEGE_DISABLED != 0 {
        return Err(DeviceError::InvalidUser(format!(
            "privilege {} overlaps the disabled flag, use an even value",
            privilege
        )));
    }
    Ok(())
}

/// Encode a `CMD_USER_WRQ` payload
pub fn encode_user(
    uid: u16,
    update: &UserUpdate,
    group_id: &str,
    card: u32,
    width: UserRecordWidth,
) -> Result<Vec<u8>> {
    check_privilege(update.privilege)?;

    let mut privilege = update.privilege;
    if !update.enabled {
        privilege |= PRIVILEGE_DISABLED;
    }

    let mut buf = Vec::with_capacity(width.size());
    buf.put_u16_le(uid);
    buf.put_u8(privilege);

    match width {
        UserRecordWidth::Compact => {
            let user_id: u32 = update.user_id.parse().map_err(|_| {
                DeviceError::InvalidUser(format!(
                    "user_id '{}' must be numeric on this device",
                    update.user_id
                ))
            })?;
            let group: u8 = if group_id.is_empty() {
                0
            } else {
                group_id.parse().map_err(|_| {
                    DeviceError::InvalidUser(format!("group_id '{}' is not a number", group_id))
                })?
            };

            put_padded(&mut buf, update.password.as_bytes(), 5);
            put_padded(&mut buf, update.name.as_bytes(), 8);
            buf.put_u32_le(card);
            buf.put_u8(0);
            buf.put_u8(group);
            // timezone
            buf.put_u16_le(0);
            buf.put_u32_le(user_id);
        }
        UserRecordWidth::Extended => {
            put_padded(&mut buf, update.password.as_bytes(), 8);
            put_padded(&mut buf, update.name.as_bytes(), 24);
            buf.put_u32_le(card);
            buf.put_u8(0);
            put_padded(&mut buf, group_id.as_bytes(), 7);
            buf.put_u8(0);
            put_padded(&mut buf, update.user_id.as_bytes(), 24);
        }
    }

    Ok(buf)
}

pub fn decode_attendance(data: &[u8], record_count: u32, users: &[User]) -> Vec<AttendanceLog> {
    let Some((total, body)) = split_buffer(data) else {
        return Vec::new();
    };
    if record_count == 0 {
        return Vec::new();
    }

    let record_size = match total / record_count as usize {
        8 => 8,
        16 => 16,
        _ => 40,
    };

    body.chunks_exact(record_size)
        .filter_map(|mut record| {
            let (uid, user_id, status, raw_time, punch) = match record_size {
                8 => {
                    let uid = record.get_u16_le();
                    let user_id = users
                        .iter()
                        .find(|u| u.uid == uid)
                        .map(|u| u.user_id.clone())
                        .unwrap_or_else(|| uid.to_string());
                    let status = record.get_u8();
                    let raw_time = record.get_u32_le();
                    (uid, user_id, status, raw_time, record.get_u8())
                }
                16 => {
                    let user_id = record.get_u32_le().to_string();
                    let uid = users
                        .iter()
                        .find(|u| u.user_id == user_id)
                        .map(|u| u.uid)
                        .unwrap_or_else(|| user_id.parse().unwrap_or(0));
                    let raw_time = record.get_u32_le();
                    let status = record.get_u8();
                    (uid, user_id, status, raw_time, record.get_u8())
                }
                _ => {
                    let uid = record.get_u16_le();
                    let user_id = take_string(&mut record, 24);
                    let status = record.get_u8();
                    let raw_time = record.get_u32_le();
                    (uid, user_id, status, raw_time, record.get_u8())
                }
            };

            match decode_device_time(raw_time) {
                Some(timestamp) => Some(AttendanceLog {
                    uid,
                    user_id,
                    timestamp,
                    status,
                    punch,
                }),
                None => {
                    warn!(user_id = %user_id, raw_time, "Skipping attendance record with invalid timestamp");
                    None
                }
            }
        })
        .collect()
}

pub fn decode_templates(data: &[u8], users: &[User]) -> Result<Vec<FingerprintTemplate>> {
    let Some((_, mut body)) = split_buffer(data) else {
        return Ok(Vec::new());
    };

    let mut templates = Vec::new();
    while body.remaining() >= 6 {
        let mut header = &body[..6];
        let size = header.get_u16_le() as usize;
        if size < 6 || size > body.remaining() {
            return Err(DeviceError::Malformed(format!(
                "template record size {} with {} bytes left",
                size,
                body.remaining()
            )));
        }

        let uid = header.get_u16_le();
        let finger_index = header.get_u8();
        let valid = header.get_u8() != 0;
        let user_id = users
            .iter()
            .find(|u| u.uid == uid)
            .map(|u| u.user_id.clone())
            .unwrap_or_else(|| uid.to_string());

        templates.push(FingerprintTemplate {
            uid,
            user_id,
            finger_index,
            valid,
            size: size - 6,
        });

        body.advance(size);
    }

    Ok(templates)
}

/// `CMD_DEL_USER_TEMP` payload: 24-byte user id then the finger index
pub fn encode_template_delete(user_id: &str, finger_index: u8) -> Vec<u8> {
    let mut buf = Vec::with_capacity(25);
    put_padded(&mut buf, user_id.as_bytes(), 24);
    buf.put_u8(finger_index);
    buf
}

/// Write `value` into a fixed-width, zero-padded field, truncating if needed
fn put_padded(buf: &mut impl BufMut, value: &[u8], width: usize) {
    let len = value.len().min(width);
    buf.put_slice(&value[..len]);
    buf.put_bytes(0, width - len);
}

/// Read a fixed-width, NUL-terminated field
fn take_string(buf: &mut &[u8], width: usize) -> String {
    let field = buf.copy_to_bytes(width);
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}
