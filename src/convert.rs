use crate::models::Properties;
use chrono::{SecondsFormat, Utc};

/// Format a millisecond duration as `HH:MM:SS.mmm`.
///
/// Straightforward integer division/modulo chain. Hours wrap modulo 24: the
/// format has no day component, so a duration of 24h or more rolls over.
pub(crate) fn format_duration(milliseconds: f64) -> String {
    let ms = if milliseconds.is_finite() && milliseconds > 0.0 {
        milliseconds as u64
    } else {
        0
    };
    let hours = ms / 3_600_000 % 24;
    let minutes = ms % 3_600_000 / 60_000;
    let seconds = ms % 60_000 / 1_000;
    let millis = ms % 1_000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}

/// ISO-8601 UTC timestamp with millisecond precision, generated at envelope
/// construction.
pub(crate) fn now_to_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Split a request URL into its de-queried base (`scheme://host/path`) and
/// the first `max_params` query parameters. Excess parameters are silently
/// dropped, not an error.
pub(crate) fn split_url(url: &str, max_params: usize) -> (String, Properties) {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let base = match parsed.port() {
                Some(port) => format!(
                    "{}://{}:{}{}",
                    parsed.scheme(),
                    parsed.host_str().unwrap_or(""),
                    port,
                    parsed.path()
                ),
                None => format!(
                    "{}://{}{}",
                    parsed.scheme(),
                    parsed.host_str().unwrap_or(""),
                    parsed.path()
                ),
            };
            let params = parsed
                .query_pairs()
                .take(max_params)
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            (base, params)
        }
        // Relative or unparsable URLs are kept as-is with no parameters.
        Err(_) => (url.to_owned(), Properties::new()),
    }
}

/// Human-readable rendering of an elapsed time in seconds, used for the
/// browse-duration message.
pub(crate) fn format_elapsed(seconds: f64) -> String {
    let seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    };
    let centis = ((seconds - seconds.floor()) * 100.0).round() as u64;
    let total = seconds as u64;
    if total < 60 {
        return format!("{}.{:02} seconds", total, centis);
    }

    let out = format!("{:02}.{:02}", total % 60, centis);
    let minutes = total % 3_600 / 60;
    if total < 3_600 {
        return format!("{}:{}", minutes, out);
    }

    let hours = total % 86_400 / 3_600;
    let out = format!("{:02}:{}", minutes, out);
    if total < 86_400 {
        return format!("{}:{}", hours, out);
    }

    format!("{}:{:02}:{}", total / 86_400, hours, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0.0, "00:00:00.000" ; "zero")]
    #[test_case(150.0, "00:00:00.150" ; "millis only")]
    #[test_case(1_000.0, "00:00:01.000" ; "one second")]
    #[test_case(61_001.0, "00:01:01.001" ; "minute rollover")]
    #[test_case(3_600_000.0, "01:00:00.000" ; "one hour")]
    #[test_case(86_399_999.0, "23:59:59.999" ; "just below a day")]
    #[test_case(90_000_000.0, "01:00:00.000" ; "wraps at 24h")]
    #[test_case(-5.0, "00:00:00.000" ; "negative clamped")]
    fn duration(ms: f64, expected: &'static str) {
        assert_eq!(expected, format_duration(ms));
    }

    #[test]
    fn duration_matches_wire_shape() {
        let re = regex::Regex::new(r"^\d{2}:\d{2}:\d{2}\.\d{3}$").unwrap();
        for ms in [0.0, 1.0, 999.0, 59_999.0, 3_599_999.0, 86_399_999.0] {
            assert!(re.is_match(&format_duration(ms)), "bad shape for {}", ms);
        }
    }

    #[test]
    fn duration_round_trips_below_24h() {
        for ms in [0u64, 150, 999, 60_000, 3_661_001, 86_399_999] {
            let formatted = format_duration(ms as f64);
            let (rest, millis) = formatted.split_once('.').unwrap();
            let parts: Vec<u64> = rest.split(':').map(|p| p.parse().unwrap()).collect();
            let round_trip =
                parts[0] * 3_600_000 + parts[1] * 60_000 + parts[2] * 1_000 + millis.parse::<u64>().unwrap();
            assert_eq!(ms, round_trip);
        }
    }

    #[test]
    fn split_url_caps_query_params() {
        let (base, params) = split_url("https://h/x?a=1&b=2&c=3", 2);
        assert_eq!("https://h/x", base);
        assert_eq!(2, params.len());
        assert_eq!("1", params["a"]);
        assert_eq!("2", params["b"]);
    }

    #[test]
    fn split_url_without_query() {
        let (base, params) = split_url("https://example.com/some/path", 10);
        assert_eq!("https://example.com/some/path", base);
        assert!(params.is_empty());
    }

    #[test]
    fn split_url_keeps_unparsable_input() {
        let (base, params) = split_url("/relative/path?a=1", 10);
        assert_eq!("/relative/path?a=1", base);
        assert!(params.is_empty());
    }

    #[test_case(0.5, "0.50 seconds" ; "under a second")]
    #[test_case(12.25, "12.25 seconds" ; "seconds")]
    #[test_case(90.0, "1:30.00" ; "minutes")]
    #[test_case(3_690.0, "1:01:30.00" ; "hours")]
    fn elapsed(seconds: f64, expected: &'static str) {
        assert_eq!(expected, format_elapsed(seconds));
    }
}
