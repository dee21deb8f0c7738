use chrono::{Duration, LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::{OffsetComponents, Tz};

use crate::error::{DstError, DstResult};

pub const DST_SHIFT_HOURS: i64 = 1;

pub fn parse_timezone(id: &str) -> DstResult<Tz> {
    id.parse::<Tz>()
        .map_err(|_| DstError::UnknownTimezone(id.to_string()))
}

pub fn dst_active_at(tz: Tz, utc: NaiveDateTime) -> bool {
    tz.offset_from_utc_datetime(&utc).dst_offset() != Duration::zero()
}

fn base_offset(tz: Tz, local: NaiveDateTime) -> Duration {
    tz.offset_from_utc_datetime(&local).base_utc_offset()
}

/// The device clock stays on standard time. Shifts a device timestamp forward
/// an hour when DST is in effect at that instant.
pub fn correct(device_local: NaiveDateTime, tz: Tz) -> DstResult<(NaiveDateTime, bool)> {
    let utc = device_local
        .checked_sub_signed(base_offset(tz, device_local))
        .ok_or(DstError::OutOfRange(device_local))?;
    if !dst_active_at(tz, utc) {
        return Ok((device_local, false));
    }
    let corrected = device_local
        .checked_add_signed(Duration::hours(DST_SHIFT_HOURS))
        .ok_or(DstError::OutOfRange(device_local))?;
    Ok((corrected, true))
}

/// Local wall-clock time to device clock. The repeated hour at the end of DST
/// resolves to the earlier reading; the skipped hour is an error.
pub fn to_device_clock(local: NaiveDateTime, tz: Tz) -> DstResult<(NaiveDateTime, bool)> {
    let localized = match tz.from_local_datetime(&local) {
        LocalResult::Single(t) => t,
        LocalResult::Ambiguous(earlier, _) => earlier,
        LocalResult::None => {
            return Err(DstError::NonexistentLocalTime {
                local,
                timezone: tz.name().to_string(),
            })
        }
    };
    if !dst_active_at(tz, localized.naive_utc()) {
        return Ok((local, false));
    }
    let shifted = local
        .checked_sub_signed(Duration::hours(DST_SHIFT_HOURS))
        .ok_or(DstError::OutOfRange(local))?;
    Ok((shifted, true))
}
