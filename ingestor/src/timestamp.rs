use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};

/// Parses a sensor timestamp string into a canonical UTC instant.
///
/// Some publishers append a literal "Z" on top of an explicit "+00:00"
/// offset; others use the bare "Z" shorthand. Both variants are rewritten
/// to a plain "+00:00" offset before parsing. Strings without any offset
/// are rejected rather than guessed at as local or UTC.
pub fn normalize(raw: &str) -> Result<DateTime<Utc>> {
    let candidate = if let Some(stripped) = raw.strip_suffix("+00:00Z") {
        format!("{}+00:00", stripped)
    } else if let Some(stripped) = raw.strip_suffix('Z') {
        format!("{}+00:00", stripped)
    } else {
        raw.to_string()
    };

    DateTime::parse_from_rfc3339(&candidate)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::MalformedTimestamp(raw.to_string(), e))
}
