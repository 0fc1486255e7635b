//! BCD timestamp packing shared by the root block and directory entries.
//!
//! Layout is 8 bytes: century, year, month, day, hour, minute, second,
//! weekday, each a binary-coded-decimal byte (high nibble = tens, low
//! nibble = units), per spec.md §6. Mirrors the pack/unpack pair style of
//! `fs::pascal::pack::{pack_date,unpack_date}`, generalized to the VMU's
//! wider field set and weekday byte.

use chrono::{Datelike, Timelike};

fn to_bcd(n: u32) -> u8 {
    (((n / 10) << 4) | (n % 10)) as u8
}

fn from_bcd(b: u8) -> u32 {
    ((b >> 4) as u32) * 10 + (b & 0x0f) as u32
}

/// Pack a timestamp into the VMU's 8-byte BCD layout. `None` packs the
/// current local time, matching the teacher's `pack_date(time: Option<...>)`
/// convention of defaulting to "now" when no timestamp is supplied.
pub fn pack_timestamp(time: Option<chrono::NaiveDateTime>) -> [u8; 8] {
    let now = time.unwrap_or_else(|| chrono::Local::now().naive_local());
    let year = now.year();
    [
        to_bcd((year / 100) as u32),
        to_bcd((year % 100) as u32),
        to_bcd(now.month()),
        to_bcd(now.day()),
        to_bcd(now.hour()),
        to_bcd(now.minute()),
        to_bcd(now.second()),
        now.weekday().num_days_from_monday() as u8,
    ]
}

/// Unpack the VMU's 8-byte BCD timestamp into a `NaiveDateTime`. Weekday is
/// not independently verified; it is recomputed implicitly by chrono from
/// the date and the stored byte is only round-tripped by callers that need
/// byte-for-byte equality (see `DirEntry`/`RootBlock`).
pub fn unpack_timestamp(bcd: [u8; 8]) -> Option<chrono::NaiveDateTime> {
    let century = from_bcd(bcd[0]);
    let year = (century * 100 + from_bcd(bcd[1])) as i32;
    let month = from_bcd(bcd[2]);
    let day = from_bcd(bcd[3]);
    let hour = from_bcd(bcd[4]);
    let minute = from_bcd(bcd[5]);
    let second = from_bcd(bcd[6]);
    chrono::NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let t = chrono::NaiveDate::from_ymd_opt(2026, 7, 31)
            .unwrap()
            .and_hms_opt(13, 5, 9)
            .unwrap();
        let bcd = pack_timestamp(Some(t));
        assert_eq!(bcd[0], 0x20);
        assert_eq!(bcd[1], 0x26);
        assert_eq!(bcd[2], 0x07);
        assert_eq!(bcd[3], 0x31);
        assert_eq!(unpack_timestamp(bcd), Some(t));
    }
}
