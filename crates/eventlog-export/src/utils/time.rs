use anyhow::{Result, anyhow, bail};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

const EPOCH_SECONDS_CUTOFF: i128 = 100_000_000_000;
const EPOCH_MILLIS_CUTOFF: i128 = 100_000_000_000_000;
const EPOCH_MICROS_CUTOFF: i128 = 100_000_000_000_000_000;

/// Parses a stored event timestamp. Naive date-times are taken as UTC.
pub fn parse_event_timestamp(raw: &str) -> Result<OffsetDateTime> {
    let candidate = raw.trim();
    if candidate.is_empty() {
        bail!("timestamp input is empty");
    }

    if let Ok(epoch_raw) = candidate.parse::<i64>() {
        return epoch_to_datetime(epoch_raw);
    }

    if let Ok(parsed) = OffsetDateTime::parse(candidate, &Rfc3339) {
        return Ok(parsed.to_offset(UtcOffset::UTC));
    }

    if let Some(naive) = parse_naive_datetime(candidate) {
        return Ok(naive.assume_utc());
    }

    bail!("unsupported timestamp format: {candidate}");
}

/// Converts an integer epoch, inferring seconds, millis, micros or nanos by magnitude.
pub fn epoch_to_datetime(epoch_raw: i64) -> Result<OffsetDateTime> {
    if epoch_raw < 0 {
        bail!("negative epoch values are not supported");
    }

    let epoch_raw = i128::from(epoch_raw);
    let nanos = if epoch_raw < EPOCH_SECONDS_CUTOFF {
        epoch_raw * 1_000_000_000
    } else if epoch_raw < EPOCH_MILLIS_CUTOFF {
        epoch_raw * 1_000_000
    } else if epoch_raw < EPOCH_MICROS_CUTOFF {
        epoch_raw * 1_000
    } else {
        epoch_raw
    };

    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .map_err(|error| anyhow!("epoch value out of range: {error}"))
}

/// Parses a filter boundary: a bare date (midnight) or a naive date-time.
pub fn parse_filter_datetime(raw: &str) -> Result<PrimitiveDateTime> {
    let candidate = raw.trim();
    if candidate.is_empty() {
        bail!("date input is empty");
    }

    if let Ok(date) = Date::parse(candidate, format_description!("[year]-[month]-[day]")) {
        return Ok(date.midnight());
    }

    parse_naive_datetime(candidate).ok_or_else(|| {
        anyhow!("unsupported date format: {candidate} (expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)")
    })
}

#[must_use]
pub fn format_xes_timestamp(value: OffsetDateTime) -> String {
    let value = value.to_offset(UtcOffset::UTC);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}+00:00",
        value.year(),
        u8::from(value.month()),
        value.day(),
        value.hour(),
        value.minute(),
        value.second(),
        value.millisecond()
    )
}

fn parse_naive_datetime(candidate: &str) -> Option<PrimitiveDateTime> {
    let formats = [
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    ];

    formats
        .iter()
        .find_map(|format| PrimitiveDateTime::parse(candidate, format).ok())
}

#[cfg(test)]
mod tests {
    use super::{
        epoch_to_datetime, format_xes_timestamp, parse_event_timestamp, parse_filter_datetime,
    };
    use time::macros::datetime;

    #[test]
    fn parses_sql_datetime_as_utc() {
        let parsed =
            parse_event_timestamp("2026-02-05 07:00:03").expect("sql datetime should parse");
        assert_eq!(parsed.unix_timestamp(), 1_770_274_803);
        assert_eq!(format_xes_timestamp(parsed), "2026-02-05T07:00:03.000+00:00");
    }

    #[test]
    fn parses_fractional_seconds() {
        let parsed = parse_event_timestamp("2026-02-05 07:00:03.250")
            .expect("fractional datetime should parse");
        assert_eq!(format_xes_timestamp(parsed), "2026-02-05T07:00:03.250+00:00");
    }

    #[test]
    fn parses_rfc3339_with_offset_into_utc() {
        let parsed = parse_event_timestamp("2026-02-05T09:00:03+02:00")
            .expect("rfc3339 should parse");
        assert_eq!(format_xes_timestamp(parsed), "2026-02-05T07:00:03.000+00:00");
    }

    #[test]
    fn infers_epoch_units() {
        let seconds = epoch_to_datetime(1_770_274_803).expect("seconds should parse");
        let millis = epoch_to_datetime(1_770_274_803_000).expect("millis should parse");
        let micros = epoch_to_datetime(1_770_274_803_000_000).expect("micros should parse");
        assert_eq!(seconds, millis);
        assert_eq!(millis, micros);
    }

    #[test]
    fn rejects_unsupported_timestamp() {
        let err = parse_event_timestamp("yesterday").expect_err("garbage should fail");
        assert!(err.to_string().contains("unsupported timestamp format"));
    }

    #[test]
    fn filter_dates_accept_bare_dates_and_datetimes() {
        let date = parse_filter_datetime("2024-03-01").expect("bare date should parse");
        assert_eq!(date, datetime!(2024-03-01 0:00));

        let parsed =
            parse_filter_datetime("2024-03-01T12:30:00").expect("datetime should parse");
        assert_eq!(parsed, datetime!(2024-03-01 12:30));
    }

    #[test]
    fn filter_dates_reject_other_shapes() {
        let err = parse_filter_datetime("03/01/2024").expect_err("us date should fail");
        assert!(err.to_string().contains("unsupported date format"));
    }
}
