use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shortest number length accepted by the optional length check.
pub const MIN_NUMBER_DIGITS: usize = 7;
/// Longest number length accepted by the optional length check (E.164).
pub const MAX_NUMBER_DIGITS: usize = 15;

/// A phone number in international form: ASCII digits only, no `+`, no separators.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NormalizedNumber(String);

impl NormalizedNumber {
    /// Accepts a string that is already canonical. Anything else is `None`.
    pub fn parse(digits: &str) -> Option<Self> {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self(digits.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 7 to 15 digits, the usual range for international numbers.
    pub fn has_plausible_length(&self) -> bool {
        (MIN_NUMBER_DIGITS..=MAX_NUMBER_DIGITS).contains(&self.len())
    }

    /// Click-to-chat deep link, e.g. `https://wa.me/972501234567`.
    pub fn chat_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }
}

impl fmt::Display for NormalizedNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl TryFrom<String> for NormalizedNumber {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("not a normalized number: {value:?}"))
    }
}

impl From<NormalizedNumber> for String {
    fn from(value: NormalizedNumber) -> Self {
        value.0
    }
}

/// Opaque history entry id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub String);

impl EntryId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One recently used number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: EntryId,
    pub number: NormalizedNumber,
    /// Snippet of the free text the number came from. Display only.
    #[serde(rename = "rawText", default, skip_serializing_if = "Option::is_none")]
    pub raw_text_preview: Option<String>,
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(
        number: NormalizedNumber,
        raw_text_preview: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntryId::generate(),
            number,
            raw_text_preview,
            created_at,
        }
    }
}

/// Best guess returned by an extraction gateway.
#[derive(Clone, Debug, PartialEq)]
pub struct Extraction {
    pub phone_number: String,
    pub confidence: f64,
    pub country_code_detected: bool,
}
