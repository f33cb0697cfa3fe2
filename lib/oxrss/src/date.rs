use time::OffsetDateTime;
use time::format_description::well_known::{Rfc2822, Rfc3339};

/// Parses the dates found in feeds into a Unix timestamp (in seconds).
///
/// RSS dates use [RFC 2822](https://www.rfc-editor.org/rfc/rfc2822) and Atom dates
/// [RFC 3339](https://www.rfc-editor.org/rfc/rfc3339), both are accepted.
///
/// ```
/// use oxrss::parse_date;
///
/// assert_eq!(parse_date("Tue, 10 Jun 2003 04:00:00 +0000"), Some(1_055_217_600));
/// assert_eq!(parse_date("2003-06-10T04:00:00Z"), Some(1_055_217_600));
/// assert_eq!(parse_date("yesterday"), None);
/// ```
pub fn parse_date(value: &str) -> Option<i64> {
    let value = value.trim();
    OffsetDateTime::parse(value, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(value, &Rfc3339))
        .ok()
        .map(OffsetDateTime::unix_timestamp)
}

/// Formats a Unix timestamp as an ISO 8601 UTC date time like `2003-06-10T04:00:00Z`.
pub(crate) fn format_timestamp(timestamp: i64) -> Option<String> {
    OffsetDateTime::from_unix_timestamp(timestamp)
        .ok()?
        .format(&Rfc3339)
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc2822_dates() {
        assert_eq!(
            parse_date(" Sat, 07 Sep 2002 00:00:01 +0000 "),
            Some(1_031_356_801)
        );
        assert_eq!(
            parse_date("Sat, 07 Sep 2002 02:00:01 +0200"),
            Some(1_031_356_801)
        );
    }

    #[test]
    fn rfc3339_dates() {
        assert_eq!(parse_date("2002-09-07T00:00:01Z"), Some(1_031_356_801));
        assert_eq!(
            parse_date("2002-09-06T20:00:01-04:00"),
            Some(1_031_356_801)
        );
    }

    #[test]
    fn invalid_dates() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("2002-09-07"), None);
    }

    #[test]
    fn formatting() {
        assert_eq!(
            format_timestamp(1_031_356_801).as_deref(),
            Some("2002-09-07T00:00:01Z")
        );
        assert_eq!(format_timestamp(0).as_deref(), Some("1970-01-01T00:00:00Z"));
    }
}
