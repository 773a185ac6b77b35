//! Parsers from the engine's canonical scalar text into native values.
//!
//! Shared by the union encoder and the columnar appender so both channels
//! agree on what a piece of text means.

use base64::Engine as _;
use chrono::{DateTime, NaiveDate, NaiveTime, Timelike};
use num_bigint::BigInt;
use serde::Deserialize;

use crate::error::EncodeError;
use crate::schema::FieldType;

/// Offset date-time literal produced by the engine, e.g.
/// `2023-01-01T00:00:00+00:00`. Fractional seconds are optional.
pub const DATETIME_LITERAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";

pub const NUMERIC_SCALE: u32 = 9;
pub const NUMERIC_PRECISION: u32 = 38;
pub const BIGNUMERIC_SCALE: u32 = 38;
pub const BIGNUMERIC_PRECISION: u32 = 76;

/// How TIMESTAMP scalar text is encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampText {
    /// Engine timestamp value (decimal seconds since epoch) or a date-time
    /// literal.
    #[default]
    EngineValue,
    /// Integer microseconds since epoch, as written by the normalizer.
    IntegerMicros,
}

pub fn parse_int64(text: &str) -> Result<i64, EncodeError> {
    text.trim()
        .parse::<i64>()
        .map_err(|e| EncodeError::cast(FieldType::Int64, text, e))
}

pub fn parse_float64(text: &str) -> Result<f64, EncodeError> {
    text.trim()
        .parse::<f64>()
        .map_err(|e| EncodeError::cast(FieldType::Float64, text, e))
}

/// Accepts `1 t true 0 f false` in any letter case.
pub fn parse_bool(text: &str) -> Result<bool, EncodeError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => Ok(true),
        "0" | "f" | "false" => Ok(false),
        _ => Err(EncodeError::cast(FieldType::Bool, text, "not a boolean literal")),
    }
}

pub fn parse_bytes(text: &str) -> Result<Vec<u8>, EncodeError> {
    base64::engine::general_purpose::STANDARD
        .decode(text.trim())
        .map_err(|e| EncodeError::cast(FieldType::Bytes, text, e))
}

/// Days since 1970-01-01.
pub fn parse_date_days(text: &str) -> Result<i32, EncodeError> {
    let date = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|e| EncodeError::cast(FieldType::Date, text, e))?;
    let days = (date - NaiveDate::default()).num_days();
    i32::try_from(days).map_err(|e| EncodeError::cast(FieldType::Date, text, e))
}

/// Microseconds since midnight.
pub fn parse_time_micros(text: &str) -> Result<i64, EncodeError> {
    let time = NaiveTime::parse_from_str(text.trim(), "%H:%M:%S%.f")
        .map_err(|e| EncodeError::cast(FieldType::Time, text, e))?;
    Ok(i64::from(time.num_seconds_from_midnight()) * 1_000_000
        + i64::from(time.nanosecond() / 1_000))
}

/// Unscaled integer of a decimal literal at a fixed `precision` and `scale`.
///
/// `"-12.5"` at scale 9 becomes `-12500000000`. More fractional digits than
/// `scale`, or more integer digits than `precision - scale`, is a cast
/// failure.
pub fn parse_decimal(
    text: &str,
    field_type: FieldType,
    precision: u32,
    scale: u32,
) -> Result<BigInt, EncodeError> {
    let trimmed = text.trim();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(EncodeError::cast(field_type, text, "empty decimal literal"));
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(EncodeError::cast(field_type, text, "invalid decimal digit"));
    }
    if frac_part.len() > scale as usize {
        return Err(EncodeError::cast(
            field_type,
            text,
            format!("more than {scale} fractional digits"),
        ));
    }

    let int_digits = int_part.trim_start_matches('0').len();
    let max_int_digits = precision.saturating_sub(scale) as usize;
    if int_digits > max_int_digits {
        return Err(EncodeError::cast(
            field_type,
            text,
            format!("more than {max_int_digits} integer digits (precision {precision})"),
        ));
    }

    let mut digits = String::with_capacity(int_part.len() + scale as usize + 1);
    if negative {
        digits.push('-');
    }
    digits.push_str(if int_part.is_empty() { "0" } else { int_part });
    digits.push_str(frac_part);
    digits.extend(std::iter::repeat_n('0', scale as usize - frac_part.len()));

    digits
        .parse::<BigInt>()
        .map_err(|e| EncodeError::cast(field_type, text, e))
}

/// Engine timestamp value: decimal seconds since epoch with an optional
/// fractional part, converted to whole microseconds.
pub fn engine_seconds_to_micros(seconds: f64) -> Option<i64> {
    if !seconds.is_finite() {
        return None;
    }
    let micros = (seconds * 1_000_000.0).round();
    if micros < i64::MIN as f64 || micros > i64::MAX as f64 {
        return None;
    }
    Some(micros as i64)
}

/// `YYYY-MM-DDThh:mm:ss[.ffffff]±hh:mm` to microseconds since epoch.
pub fn datetime_literal_micros(text: &str) -> Option<i64> {
    DateTime::parse_from_str(text, DATETIME_LITERAL_FORMAT)
        .ok()
        .map(|dt| dt.timestamp_micros())
}

/// TIMESTAMP text to microseconds since epoch, for the casting encoders.
pub fn parse_timestamp_micros(text: &str, form: TimestampText) -> Result<i64, EncodeError> {
    let trimmed = text.trim();
    let parsed = match form {
        TimestampText::IntegerMicros => trimmed.parse::<i64>().ok(),
        TimestampText::EngineValue => trimmed
            .parse::<f64>()
            .ok()
            .and_then(engine_seconds_to_micros)
            .or_else(|| datetime_literal_micros(trimmed))
            .or_else(|| {
                DateTime::parse_from_rfc3339(trimmed)
                    .ok()
                    .map(|dt| dt.timestamp_micros())
            }),
    };
    parsed.ok_or_else(|| EncodeError::cast(FieldType::Timestamp, text, "unrecognized timestamp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_literals() {
        assert!(parse_bool("TRUE").unwrap());
        assert!(parse_bool("t").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert!(parse_bool("yes").is_err());
    }

    #[test]
    fn date_and_time() {
        assert_eq!(parse_date_days("1970-01-02").unwrap(), 1);
        assert_eq!(parse_date_days("1969-12-31").unwrap(), -1);
        assert_eq!(parse_time_micros("00:00:01.5").unwrap(), 1_500_000);
        assert_eq!(parse_time_micros("01:00:00").unwrap(), 3_600_000_000);
    }

    #[test]
    fn decimal_scaling() {
        let v = parse_decimal("-12.5", FieldType::Numeric, NUMERIC_PRECISION, NUMERIC_SCALE)
            .unwrap();
        assert_eq!(v, BigInt::from(-12_500_000_000i64));
        let v = parse_decimal(".25", FieldType::Numeric, 10, 2).unwrap();
        assert_eq!(v, BigInt::from(25));
        assert!(parse_decimal("1.234", FieldType::Numeric, 10, 2).is_err());
        assert!(parse_decimal("1e5", FieldType::Numeric, 10, 2).is_err());
        assert!(parse_decimal("-", FieldType::Numeric, 10, 2).is_err());
    }

    #[test]
    fn decimal_precision_bounds() {
        let numeric = |t: &str| {
            parse_decimal(t, FieldType::Numeric, NUMERIC_PRECISION, NUMERIC_SCALE)
        };
        let max = "9".repeat(29);
        assert!(numeric(&max).is_ok());
        assert!(numeric(&format!("-{max}.999999999")).is_ok());
        assert!(numeric(&format!("000{max}")).is_ok());
        let err = numeric(&format!("1{}", "0".repeat(29))).unwrap_err();
        assert!(matches!(err, EncodeError::CastFailure { .. }));
        assert!(numeric(&format!("1{}", "0".repeat(40))).is_err());

        let big = |t: &str| {
            parse_decimal(t, FieldType::BigNumeric, BIGNUMERIC_PRECISION, BIGNUMERIC_SCALE)
        };
        assert!(big(&"9".repeat(38)).is_ok());
        assert!(big(&format!("1{}", "0".repeat(38))).is_err());
    }

    #[test]
    fn bytes_are_base64() {
        assert_eq!(parse_bytes("aGk=").unwrap(), b"hi".to_vec());
        assert!(parse_bytes("***").is_err());
    }

    #[test]
    fn timestamp_forms() {
        assert_eq!(
            parse_timestamp_micros("1672531200.5", TimestampText::EngineValue).unwrap(),
            1_672_531_200_500_000
        );
        assert_eq!(
            parse_timestamp_micros("2023-01-01T00:00:00+00:00", TimestampText::EngineValue).unwrap(),
            1_672_531_200_000_000
        );
        assert_eq!(
            parse_timestamp_micros("2023-01-01T01:00:00.25+01:00", TimestampText::EngineValue)
                .unwrap(),
            1_672_531_200_250_000
        );
        assert_eq!(
            parse_timestamp_micros("1672531200000000", TimestampText::IntegerMicros).unwrap(),
            1_672_531_200_000_000
        );
        assert!(parse_timestamp_micros("yesterday", TimestampText::EngineValue).is_err());
    }

    #[test]
    fn datetime_literal_requires_offset() {
        assert!(datetime_literal_micros("2023-01-01T00:00:00").is_none());
        assert_eq!(datetime_literal_micros("1970-01-01T00:00:00-00:00"), Some(0));
    }
}
