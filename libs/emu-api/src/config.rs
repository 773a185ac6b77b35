use serde::Deserialize;

use crate::error::EncodeError;
use crate::text::TimestampText;

/// How the timestamp normalizer treats elements of REPEATED TIMESTAMP
/// fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampCompat {
    /// Elements go through the date-time literal parser only and lose their
    /// field name. Scalar fields keep the numeric-then-literal parser.
    #[default]
    Legacy,
    /// Elements use the same two-stage parser as scalar fields and are
    /// named after the field.
    Unified,
}

/// Encoder options supplied with each request.
///
/// ```toml
/// use_int64_timestamp = true
/// timestamp_compat = "legacy"
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Rewrite TIMESTAMP leaves to integer microseconds before encoding.
    pub use_int64_timestamp: bool,
    pub timestamp_compat: TimestampCompat,
}

impl EncoderConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, EncodeError> {
        toml::from_str(content).map_err(|e| EncodeError::Config(e.to_string()))
    }

    /// Text form TIMESTAMP scalars have once the config has been applied.
    pub fn timestamp_text(&self) -> TimestampText {
        if self.use_int64_timestamp {
            TimestampText::IntegerMicros
        } else {
            TimestampText::EngineValue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let cfg = EncoderConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, EncoderConfig::default());
        assert_eq!(cfg.timestamp_text(), TimestampText::EngineValue);
    }

    #[test]
    fn parses_toml() {
        let cfg = EncoderConfig::from_toml_str(
            "use_int64_timestamp = true\ntimestamp_compat = \"unified\"\n",
        )
        .unwrap();
        assert!(cfg.use_int64_timestamp);
        assert_eq!(cfg.timestamp_compat, TimestampCompat::Unified);
        assert_eq!(cfg.timestamp_text(), TimestampText::IntegerMicros);
    }

    #[test]
    fn rejects_unknown_compat() {
        let err = EncoderConfig::from_toml_str("timestamp_compat = \"fixed\"").unwrap_err();
        assert!(matches!(err, EncodeError::Config(_)));
    }
}
