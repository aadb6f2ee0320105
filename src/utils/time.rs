use chrono::{Local, NaiveDate, NaiveDateTime};

/// Format used for every timestamp in API responses
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current wall-clock time in the server's local zone, matching the
/// zone-less timestamps the terminal records
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Decode the terminal's packed timestamp.
///
/// Returns `None` for values that do not name a real calendar date.
pub fn decode_device_time(raw: u32) -> Option<NaiveDateTime> {
    let mut t = raw;

    let second = t % 60;
    t /= 60;
    let minute = t % 60;
    t /= 60;
    let hour = t % 24;
    t /= 24;
    let day = t % 31 + 1;
    t /= 31;
    let month = t % 12 + 1;
    t /= 12;
    let year = t as i32 + 2000;

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}

/// Inverse of `decode_device_time`, for building terminal records in tests
#[cfg(test)]
pub(crate) fn encode_device_time(timestamp: &NaiveDateTime) -> u32 {
    use chrono::{Datelike, Timelike};

    let days = (timestamp.year() as u32 % 100) * 12 * 31
        + (timestamp.month() - 1) * 31
        + timestamp.day()
        - 1;

    days * 24 * 60 * 60
        + (timestamp.hour() * 60 + timestamp.minute()) * 60
        + timestamp.second()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32, ss: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(hh, mm, ss)
            .unwrap()
    }

    #[test]
    fn test_decode_zero_is_epoch_2000() {
        assert_eq!(decode_device_time(0), Some(at(2000, 1, 1, 0, 0, 0)));
    }

    #[test]
    fn test_decode_known_value() {
        // 2024-01-02 08:30:15
        let raw: u32 = (24 * 12 * 31 + 1) * 86400 + (8 * 60 + 30) * 60 + 15;
        assert_eq!(decode_device_time(raw), Some(at(2024, 1, 2, 8, 30, 15)));
    }

    #[test]
    fn test_encode_matches_decode() {
        let ts = at(2023, 11, 30, 23, 59, 59);
        assert_eq!(decode_device_time(encode_device_time(&ts)), Some(ts));
    }

    #[test]
    fn test_decode_impossible_date() {
        // February 31st
        let raw: u32 = (24 * 12 * 31 + 31 + 30) * 86400;
        assert_eq!(decode_device_time(raw), None);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp(&at(2024, 3, 5, 7, 8, 9)),
            "2024-03-05 07:08:09"
        );
    }

    #[test]
    fn test_local_now_is_recent() {
        // Should be a reasonable timestamp (after 2020-01-01)
        assert!(local_now() > at(2020, 1, 1, 0, 0, 0));
    }
}
