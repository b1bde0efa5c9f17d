//! RFC 1123 HTTP dates (`Sun, 06 Nov 1994 08:49:37 GMT`).

use chrono::{DateTime, NaiveDateTime, Utc};

const IMF_FIXDATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Parses an HTTP date. Returns `None` for anything unparsable; callers
/// treat that as "no usable date".
///
/// The preferred `GMT` form is tried first, then any RFC 2822 date with an
/// explicit zone (`+0000`, `UT`, `EST`, ...).
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, IMF_FIXDATE)
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc2822(value).map(|dt| dt.with_timezone(&Utc)))
        .ok()
}

/// Formats `time` as an IMF-fixdate, the form origin servers send.
pub fn format_http_date(time: DateTime<Utc>) -> String {
    time.format(IMF_FIXDATE).to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn parses_imf_fixdate() {
        let parsed = parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap());
    }

    #[test]
    fn parses_numeric_zone() {
        let parsed = parse_http_date("Sun, 06 Nov 1994 09:49:37 +0100").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_http_date("yesterday").is_none());
        assert!(parse_http_date("").is_none());
    }

    #[test]
    fn format_round_trips() {
        let t = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 5).unwrap();
        assert_eq!(format_http_date(t), "Sun, 01 Mar 2026 12:00:05 GMT");
        assert_eq!(parse_http_date(&format_http_date(t)), Some(t));
    }
}
