/// Utility functions
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

/// Extract number from JSON value
pub fn num(v: &Value) -> Option<f64> {
    if let Some(x) = v.as_f64() {
        return Some(x);
    }
    if let Some(s) = v.as_str() {
        return s.parse::<f64>().ok();
    }
    None
}

/// Pick string value from JSON by trying multiple keys
pub fn s_pick(v: &Value, keys: &[&str]) -> Option<String> {
    for k in keys {
        if let Some(x) = v.get(*k) {
            if let Some(s) = x.as_str() {
                if !s.is_empty() {
                    return Some(s.to_string());
                }
            } else if x.is_number() {
                return Some(x.to_string());
            }
        }
    }
    None
}

/// Parse an upstream event timestamp. EONET reports RFC 3339, but bare
/// `YYYY-MM-DD` dates are tolerated as well.
pub fn parse_event_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

/// Truncate a timestamp to its `YYYY-MM-DD` date part.
pub fn date_only(s: &str) -> &str {
    s.split('T').next().unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_from_float() {
        let json = serde_json::json!(42.5);
        assert_eq!(num(&json), Some(42.5));
    }

    #[test]
    fn test_num_from_string() {
        let json = serde_json::json!("42.5");
        assert_eq!(num(&json), Some(42.5));
    }

    #[test]
    fn test_num_from_invalid() {
        let json = serde_json::json!("invalid");
        assert_eq!(num(&json), None);
    }

    #[test]
    fn test_s_pick_finds_first() {
        let json = serde_json::json!({"name": "test", "title": "backup"});
        assert_eq!(s_pick(&json, &["name", "title"]), Some("test".to_string()));
    }

    #[test]
    fn test_s_pick_numeric_id() {
        let json = serde_json::json!({"id": 8});
        assert_eq!(s_pick(&json, &["id"]), Some("8".to_string()));
    }

    #[test]
    fn test_s_pick_not_found() {
        let json = serde_json::json!({"other": "value"});
        assert_eq!(s_pick(&json, &["name", "title"]), None);
    }

    #[test]
    fn test_parse_event_date_rfc3339() {
        let parsed = parse_event_date("2025-01-10T12:30:00Z");
        assert!(parsed.is_some());
    }

    #[test]
    fn test_parse_event_date_bare_date() {
        let parsed = parse_event_date("2025-01-10");
        assert!(parsed.is_some());
    }

    #[test]
    fn test_parse_event_date_invalid() {
        assert_eq!(parse_event_date("not a date"), None);
        assert_eq!(parse_event_date(""), None);
    }

    #[test]
    fn test_date_only() {
        assert_eq!(date_only("2025-01-10T12:30:00Z"), "2025-01-10");
        assert_eq!(date_only("2025-01-10"), "2025-01-10");
    }
}
