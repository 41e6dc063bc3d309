//! Normalization of loosely typed upstream JSON
//!
//! Both data sources are inconsistent about shapes: lists arrive either bare
//! or wrapped in an `entries` object, numbers arrive as JSON numbers or as
//! strings, and identifiers are sometimes numeric. The helpers here are used
//! from `#[serde(deserialize_with = ...)]` attributes on the raw payload
//! structs so that every inconsistency is resolved in one place, at parse time.
//!
//! A string that is not a number is rejected rather than turned into NaN.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use serde::de::{self, Deserializer};
use serde::Deserialize;

/// A list that may or may not be wrapped in `{"entries": [...]}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Bare(Vec<T>),
    Wrapped { entries: Vec<T> },
}

impl<T> Listing<T> {
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Bare(items) => items,
            Listing::Wrapped { entries } => entries,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient {
    Number(f64),
    Text(String),
}

fn parse_number<E: de::Error>(text: &str) -> Result<Option<f64>, E> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    // `f64::from_str` accepts "NaN" and "inf", which are not data.
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(Some)
        .ok_or_else(|| E::custom(format!("expected a number, got {text:?}")))
}

fn finite<E: de::Error>(value: f64) -> Result<f64, E> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(E::custom(format!("expected a finite number, got {value}")))
    }
}

/// A number that may be encoded as a JSON string
pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Lenient::deserialize(deserializer)? {
        Lenient::Number(value) => finite(value),
        Lenient::Text(text) => {
            parse_number(&text)?.ok_or_else(|| de::Error::custom("expected a number, got \"\""))
        }
    }
}

/// An optional number; `null`, a missing field and `""` all become `None`.
///
/// Use together with `#[serde(default)]`.
pub fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Lenient>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Lenient::Number(value)) => finite(value).map(Some),
        Some(Lenient::Text(text)) => parse_number(&text),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Integer(value) => value.to_string(),
            RawId::Float(value) => value.to_string(),
            RawId::Text(text) => text.trim().to_string(),
        }
    }
}

/// An identifier that may be numeric or textual
pub fn identifier<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(RawId::into_string)
}

/// An optional identifier; `null` and `""` become `None`
pub fn optional_identifier<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?
        .map(RawId::into_string)
        .filter(|id| !id.is_empty()))
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an upstream timestamp into wall-clock time in `tz`.
///
/// Offsets (`Z`, `+02:00`) are converted into `tz`; timestamps without an
/// offset are taken as already local. A bare date maps to local noon, which
/// keeps it on its own calendar day for daily reduction.
pub fn local_timestamp<Tz: TimeZone>(text: &str, tz: &Tz) -> Option<NaiveDateTime> {
    let text = text.trim();

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(text) {
        return Some(with_offset.with_timezone(tz).naive_local());
    }

    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
    {
        return Some(naive);
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| Some(date.and_time(NaiveTime::from_hms_opt(12, 0, 0)?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Row {
        #[serde(deserialize_with = "identifier")]
        id: String,
        #[serde(deserialize_with = "number")]
        value: f64,
        #[serde(default, deserialize_with = "optional_number")]
        confidence: Option<f64>,
    }

    #[test]
    fn test_bare_and_wrapped_lists() {
        let bare: Listing<Row> = serde_json::from_str(r#"[{"id": 1, "value": 2.5}]"#).unwrap();
        let wrapped: Listing<Row> =
            serde_json::from_str(r#"{"entries": [{"id": "1", "value": "2.5"}]}"#).unwrap();

        let bare = bare.into_vec();
        let wrapped = wrapped.into_vec();
        assert_eq!(bare.len(), 1);
        assert_eq!(bare[0].id, wrapped[0].id);
        assert_eq!(bare[0].value, wrapped[0].value);
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let row: Row =
            serde_json::from_str(r#"{"id": " 42 ", "value": " -12.75 ", "confidence": "80"}"#)
                .unwrap();
        assert_eq!(row.id, "42");
        assert_eq!(row.value, -12.75);
        assert_eq!(row.confidence, Some(80.0));
    }

    #[test]
    fn test_missing_and_blank_optionals_are_none() {
        let row: Row = serde_json::from_str(r#"{"id": 1, "value": 1}"#).unwrap();
        assert_eq!(row.confidence, None);

        let row: Row = serde_json::from_str(r#"{"id": 1, "value": 1, "confidence": null}"#).unwrap();
        assert_eq!(row.confidence, None);

        let row: Row = serde_json::from_str(r#"{"id": 1, "value": 1, "confidence": ""}"#).unwrap();
        assert_eq!(row.confidence, None);
    }

    #[test]
    fn test_malformed_numbers_are_rejected() {
        let err = serde_json::from_str::<Row>(r#"{"id": 1, "value": "n/a"}"#).unwrap_err();
        assert!(err.to_string().contains("expected a number"));

        assert!(serde_json::from_str::<Row>(r#"{"id": 1, "value": ""}"#).is_err());
        assert!(
            serde_json::from_str::<Row>(r#"{"id": 1, "value": 1, "confidence": "high"}"#).is_err()
        );
    }

    #[test]
    fn test_non_finite_strings_are_rejected() {
        for text in ["NaN", "nan", "inf", "-inf", "infinity"] {
            let body = format!(r#"{{"id": 1, "value": "{text}"}}"#);
            let err = serde_json::from_str::<Row>(&body).unwrap_err();
            assert!(err.to_string().contains("expected a number"), "{text}: {err}");

            let body = format!(r#"{{"id": 1, "value": 2, "confidence": "{text}"}}"#);
            assert!(serde_json::from_str::<Row>(&body).is_err(), "{text}");
        }
    }

    #[test]
    fn test_local_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(13, 30, 0)
            .unwrap();

        assert_eq!(local_timestamp("2024-05-01T13:30:00", &Utc), Some(expected));
        assert_eq!(local_timestamp("2024-05-01 13:30", &Utc), Some(expected));
        assert_eq!(local_timestamp("2024-05-01T13:30:00Z", &Utc), Some(expected));
        assert_eq!(local_timestamp("2024-05-01T15:30:00+02:00", &Utc), Some(expected));
        assert_eq!(local_timestamp("not a date", &Utc), None);
    }

    #[test]
    fn test_offsets_convert_into_target_zone() {
        let tz: chrono_tz::Tz = "Europe/Ljubljana".parse().unwrap();
        let local = local_timestamp("2024-05-01T10:00:00Z", &tz).unwrap();
        // CEST is UTC+2 in May.
        assert_eq!(local.format("%H:%M").to_string(), "12:00");
    }

    #[test]
    fn test_bare_date_maps_to_noon() {
        let local = local_timestamp("2024-05-01", &Utc).unwrap();
        assert_eq!(local.format("%Y-%m-%d %H:%M").to_string(), "2024-05-01 12:00");
    }
}
