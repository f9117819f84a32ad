//! Setting data types.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A named configuration value owned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    /// Unique setting key, e.g. "cost_per_km".
    pub key: String,
    /// Current value.
    pub value: SettingValue,
    /// Whether the backend still serves its built-in default.
    #[serde(default)]
    pub is_default: bool,
}

/// A setting value: a number or free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    /// Numeric value.
    Number(Decimal),
    /// Text value.
    Text(String),
}

impl SettingValue {
    /// Numeric view of the value. Text that parses as a number counts.
    #[must_use]
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => Decimal::from_str(s.trim()).ok(),
        }
    }

    /// Text view of the value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Number(_) => None,
            Self::Text(s) => Some(s),
        }
    }
}

impl From<Decimal> for SettingValue {
    fn from(value: Decimal) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl std::fmt::Display for SettingValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

// JSON numbers become `Number`, JSON strings stay `Text` even when numeric.
impl<'de> Deserialize<'de> for SettingValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Number(n) => {
                let text = n.to_string();
                Decimal::from_str(&text)
                    .or_else(|_| Decimal::from_scientific(&text))
                    .map(Self::Number)
                    .map_err(serde::de::Error::custom)
            }
            Value::String(s) => Ok(Self::Text(s)),
            Value::Bool(b) => Ok(Self::Text(b.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "expected a number or string setting value, got {other}"
            ))),
        }
    }
}
