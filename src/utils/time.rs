//! RFC 3339 helpers for `time::OffsetDateTime`.
//!
//! Used both as a serde `with` module for [`crate::store::Exchange`] and
//! directly by the log store, which persists timestamps as RFC 3339 text.

use serde::{Deserialize, Deserializer, Serializer};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::{Error, Result};

/// Format an OffsetDateTime as an RFC 3339 string.
pub fn format(datetime: &OffsetDateTime) -> Result<String> {
    datetime
        .format(&Rfc3339)
        .map_err(|e| Error::encoding(format!("invalid timestamp: {e}"), Some(Box::new(e))))
}

/// Parse an RFC 3339 string into an OffsetDateTime.
pub fn parse(s: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(s, &Rfc3339)
        .map_err(|e| Error::encoding(format!("invalid timestamp {s:?}: {e}"), Some(Box::new(e))))
}

/// Deserialize an RFC 3339 formatted string into an OffsetDateTime.
pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    OffsetDateTime::parse(&s, &Rfc3339).map_err(serde::de::Error::custom)
}

/// Serialize an OffsetDateTime into an RFC 3339 formatted string.
pub fn serialize<S>(datetime: &OffsetDateTime, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let s = datetime
        .format(&Rfc3339)
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&s)
}
