// Packet framing for the ZK TCP protocol
//
// Frame layout (all little-endian):
//   u16 0x5050 | u16 0x7282 | u32 payload length | payload
// Payload layout:
//   u16 command | u16 checksum | u16 session id | u16 reply id | data

use crate::device::constants::{MACHINE_PREPARE_DATA_1, MACHINE_PREPARE_DATA_2, USHRT_MAX};
use crate::device::error::{DeviceError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

pub const TCP_TOP_LEN: usize = 8;
pub const HEADER_LEN: usize = 8;

/// Upper bound on a single frame payload
pub const MAX_PAYLOAD_LEN: usize = 1 << 20;

/// A decoded frame from the terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub command: u16,
    pub checksum: u16,
    pub session_id: u16,
    pub reply_id: u16,
    pub data: Bytes,
}

/// A command on its way to the terminal.
///
/// `reply_id` is the id of the last reply seen. The checksum covers the
/// header with that id; the header that goes on the wire carries the
/// next one.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub command: u16,
    pub session_id: u16,
    pub reply_id: u16,
    pub data: &'a [u8],
}

/// Tokio codec turning the TCP byte stream into `Packet`s and `Request`s
/// into frames
#[derive(Debug, Default)]
pub struct ZkCodec;

impl Decoder for ZkCodec {
    type Item = Packet;
    type Error = DeviceError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>> {
        if src.len() < TCP_TOP_LEN {
            return Ok(None);
        }

        let mut top = &src[..TCP_TOP_LEN];
        let magic_1 = top.get_u16_le();
        let magic_2 = top.get_u16_le();
        if magic_1 != MACHINE_PREPARE_DATA_1 || magic_2 != MACHINE_PREPARE_DATA_2 {
            return Err(DeviceError::Malformed(format!(
                "bad frame prefix {}",
                hex::encode(&src[..4])
            )));
        }

        let length = top.get_u32_le() as usize;
        if !(HEADER_LEN..=MAX_PAYLOAD_LEN).contains(&length) {
            return Err(DeviceError::Malformed(format!(
                "frame length {} out of range",
                length
            )));
        }

        let frame_len = TCP_TOP_LEN + length;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        src.advance(TCP_TOP_LEN);
        let mut payload = src.split_to(length);

        Ok(Some(Packet {
            command: payload.get_u16_le(),
            checksum: payload.get_u16_le(),
            session_id: payload.get_u16_le(),
            reply_id: payload.get_u16_le(),
            data: payload.freeze(),
        }))
    }
}

impl<'a> Encoder<Request<'a>> for ZkCodec {
    type Error = DeviceError;

    fn encode(&mut self, request: Request<'a>, dst: &mut BytesMut) -> Result<()> {
        let mut payload = BytesMut::with_capacity(HEADER_LEN + request.data.len());
        payload.put_u16_le(request.command);
        payload.put_u16_le(0);
        payload.put_u16_le(request.session_id);
        payload.put_u16_le(request.reply_id);
        payload.put_slice(request.data);

        let sum = checksum(&payload);
        payload[2..4].copy_from_slice(&sum.to_le_bytes());
        payload[6..8].copy_from_slice(&next_reply_id(request.reply_id).to_le_bytes());

        put_frame(dst, &payload)
    }
}

fn put_frame(dst: &mut BytesMut, payload: &[u8]) -> Result<()> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(DeviceError::Malformed(format!(
            "payload of {} bytes is too large to send",
            payload.len()
        )));
    }

    dst.reserve(TCP_TOP_LEN + payload.len());
    dst.put_u16_le(MACHINE_PREPARE_DATA_1);
    dst.put_u16_le(MACHINE_PREPARE_DATA_2);
    dst.put_u32_le(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

pub fn next_reply_id(reply_id: u16) -> u16 {
    let next = reply_id as u32 + 1;
    if next >= USHRT_MAX as u32 {
        (next - USHRT_MAX as u32) as u16
    } else {
        next as u16
    }
}

/// 16-bit checksum used by the terminal firmware
pub fn checksum(mut buf: &[u8]) -> u16 {
    let max = USHRT_MAX as i64;
    let mut sum: i64 = 0;

    while buf.remaining() >= 2 {
        sum += buf.get_u16_le() as i64;
        if sum > max {
            sum -= max;
        }
    }
    if buf.has_remaining() {
        sum += buf.get_u8() as i64;
    }

    while sum > max {
        sum -= max;
    }

    sum = !sum;
    while sum < 0 {
        sum += max;
    }

    sum as u16
}

/// Derive the comm key sent with `CMD_AUTH`
pub fn make_commkey(password: u32, session_id: u16, ticks: u8) -> [u8; 4] {
    // Bit-reversed password, offset by the session id
    let k = password.reverse_bits().wrapping_add(session_id as u32);
    let b = k.to_le_bytes();
    let b = [b[0] ^ b'Z', b[1] ^ b'K', b[2] ^ b'S', b[3] ^ b'O'];

    // Swap the two 16-bit halves
    let b = [b[2], b[3], b[0], b[1]];

    [b[0] ^ ticks, b[1] ^ ticks, ticks, b[3] ^ ticks]
}

#[cfg(test)]
impl Packet {
    pub fn new(command: u16, session_id: u16, reply_id: u16, data: &[u8]) -> Self {
        Self {
            command,
            checksum: 0,
            session_id,
            reply_id,
            data: Bytes::copy_from_slice(data),
        }
    }

    /// Frame a reply the way the terminal sends it, reply id unchanged
    pub fn encode(&self) -> BytesMut {
        let mut payload = BytesMut::with_capacity(HEADER_LEN + self.data.len());
        payload.put_u16_le(self.command);
        payload.put_u16_le(0);
        payload.put_u16_le(self.session_id);
        payload.put_u16_le(self.reply_id);
        payload.put_slice(&self.data);

        let sum = checksum(&payload);
        payload[2..4].copy_from_slice(&sum.to_le_bytes());

        let mut frame = BytesMut::new();
        put_frame(&mut frame, &payload).unwrap();
        frame
    }
}
