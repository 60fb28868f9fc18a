//! Shared identifier types and serde helpers.

use std::time::Duration;

/// Unique key of a data source; one schedule per id.
pub type DataSourceId = String;

/// Opaque tracing token propagated through a schedule's lifecycle.
pub type CorrelationId = String;

/// Generate a fresh correlation id.
pub fn new_correlation_id() -> CorrelationId {
    uuid::Uuid::new_v4().to_string()
}

/// Render a duration as `hh:mm:ss` (or `d.hh:mm:ss` past one day), with a
/// seven-digit fraction when sub-second precision is present.
pub fn format_timespan(value: Duration) -> String {
    let total = value.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    let mut out = if days > 0 {
        format!("{days}.{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    };
    let ticks = value.subsec_nanos() / 100;
    if ticks > 0 {
        out.push_str(&format!(".{ticks:07}"));
    }
    out
}

/// Parse `hh:mm:ss`, `d.hh:mm:ss`, optionally with a fractional second, or a
/// bare integer number of seconds.
pub fn parse_timespan(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if let Ok(secs) = input.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let parts: Vec<&str> = input.split(':').collect();
    if parts.len() != 3 {
        return Err(format!("`{input}` is not a valid timespan"));
    }
    let num = |s: &str| {
        s.parse::<u64>()
            .map_err(|_| format!("`{input}` is not a valid timespan"))
    };

    let (days, hours) = match parts[0].split_once('.') {
        Some((d, h)) => (num(d)?, num(h)?),
        None => (0, num(parts[0])?),
    };
    let minutes = num(parts[1])?;
    let (seconds, nanos) = match parts[2].split_once('.') {
        Some((s, frac)) => {
            if frac.is_empty() || frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return Err(format!("`{input}` has an invalid fraction"));
            }
            let padded = format!("{frac:0<9}");
            let nanos = padded
                .parse::<u32>()
                .map_err(|_| format!("`{input}` has an invalid fraction"))?;
            (num(s)?, nanos)
        }
        None => (num(parts[2])?, 0),
    };
    if hours > 23 || minutes > 59 || seconds > 59 {
        return Err(format!("`{input}` has a component out of range"));
    }

    let total = days
        .checked_mul(86_400)
        .and_then(|secs| secs.checked_add(hours * 3_600 + minutes * 60 + seconds))
        .ok_or_else(|| format!("`{input}` is too large"))?;
    Ok(Duration::new(total, nanos))
}

/// `#[serde(with = "...")]` adapter for `Duration` in timespan form.
pub mod timespan {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Seconds(u64),
        Text(String),
    }

    /// Serialize as `hh:mm:ss`.
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timespan(*value))
    }

    /// Deserialize from a timespan string or integer seconds.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Seconds(secs) => Ok(Duration::from_secs(secs)),
            Repr::Text(text) => super::parse_timespan(&text).map_err(serde::de::Error::custom),
        }
    }
}

/// `Option<Duration>` variant of [`timespan`].
pub mod timespan_opt {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    struct Wrapper(#[serde(with = "super::timespan")] Duration);

    /// Serialize `Some` as a timespan and `None` as null.
    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&super::format_timespan(*d)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize null or a timespan.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(d)| d))
    }
}
