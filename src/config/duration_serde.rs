//! Durations in configuration files and `SNAPPER_*` variables.
//!
//! Accepted forms: whole seconds (`30`), fractional seconds (`0.5`) or a
//! humantime string (`"1m 30s"`). Always written back as a humantime string.

use serde::{Deserialize, Deserializer, Serializer, de::Error};
use std::time::Duration;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Seconds(u64),
    Fractional(f64),
    Text(String),
}

impl RawDuration {
    fn into_duration(self) -> Result<Duration, String> {
        match self {
            Self::Seconds(secs) => Ok(Duration::from_secs(secs)),
            Self::Fractional(secs) => Duration::try_from_secs_f64(secs)
                .map_err(|_| format!("duration must be a non-negative number of seconds, got {secs}")),
            // Env values arrive as strings even when numeric
            Self::Text(text) => match text.trim().parse::<u64>() {
                Ok(secs) => Ok(Duration::from_secs(secs)),
                Err(_) => humantime::parse_duration(&text)
                    .map_err(|e| format!("invalid duration '{text}': {e}")),
            },
        }
    }
}

/// `#[serde(with = "duration_serde::duration")]`
pub mod duration {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        RawDuration::deserialize(deserializer)?
            .into_duration()
            .map_err(D::Error::custom)
    }
}
