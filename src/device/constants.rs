// ZK protocol command and reply codes

pub const CMD_DB_RRQ: u16 = 7;
pub const CMD_USER_WRQ: u16 = 8;
pub const CMD_USERTEMP_RRQ: u16 = 9;
pub const CMD_ATTLOG_RRQ: u16 = 13;
pub const CMD_DELETE_USER: u16 = 18;
pub const CMD_GET_FREE_SIZES: u16 = 50;
pub const CMD_DEL_USER_TEMP: u16 = 134;

pub const CMD_CONNECT: u16 = 1000;
pub const CMD_EXIT: u16 = 1001;
pub const CMD_REFRESHDATA: u16 = 1013;
pub const CMD_AUTH: u16 = 1102;

pub const CMD_PREPARE_DATA: u16 = 1500;
pub const CMD_DATA: u16 = 1501;
pub const CMD_FREE_DATA: u16 = 1502;
pub const CMD_PREPARE_BUFFER: u16 = 1503;
pub const CMD_READ_BUFFER: u16 = 1504;

pub const CMD_ACK_OK: u16 = 2000;
pub const CMD_ACK_ERROR: u16 = 2001;
pub const CMD_ACK_UNAUTH: u16 = 2005;

/// Function codes for buffered reads
pub const FCT_FINGERTMP: i32 = 2;
pub const FCT_USER: i32 = 5;

pub const MACHINE_PREPARE_DATA_1: u16 = 0x5050;
pub const MACHINE_PREPARE_DATA_2: u16 = 0x7282;

pub const USHRT_MAX: u16 = 65535;

/// Largest chunk requested per `CMD_READ_BUFFER` over TCP
pub const MAX_CHUNK: u32 = 0xFFC0;

#[cfg(test)]
pub const USER_ADMIN: u8 = 14;

/// Privilege bit marking a disabled user
pub const PRIVILEGE_DISABLED: u8 = 0x01;

pub fn command_name(command: u16) -> &'static str {
    match command {
        CMD_DB_RRQ => "CMD_DB_RRQ",
        CMD_USER_WRQ => "CMD_USER_WRQ",
        CMD_USERTEMP_RRQ => "CMD_USERTEMP_RRQ",
        CMD_ATTLOG_RRQ => "CMD_ATTLOG_RRQ",
        CMD_DELETE_USER => "CMD_DELETE_USER",
        CMD_GET_FREE_SIZES => "CMD_GET_FREE_SIZES",
        CMD_DEL_USER_TEMP => "CMD_DEL_USER_TEMP",
        CMD_CONNECT => "CMD_CONNECT",
        CMD_EXIT => "CMD_EXIT",
        CMD_REFRESHDATA => "CMD_REFRESHDATA",
        CMD_AUTH => "CMD_AUTH",
        CMD_PREPARE_DATA => "CMD_PREPARE_DATA",
        CMD_DATA => "CMD_DATA",
        CMD_FREE_DATA => "CMD_FREE_DATA",
        CMD_PREPARE_BUFFER => "CMD_PREPARE_BUFFER",
        CMD_READ_BUFFER => "CMD_READ_BUFFER",
        CMD_ACK_OK => "CMD_ACK_OK",
        CMD_ACK_ERROR => "CMD_ACK_ERROR",
        CMD_ACK_UNAUTH => "CMD_ACK_UNAUTH",
        _ => "UNKNOWN",
    }
}

/// Replies that count as success for a request
pub fn is_success(reply: u16) -> bool {
    matches!(reply, CMD_ACK_OK | CMD_PREPARE_DATA | CMD_DATA)
}
