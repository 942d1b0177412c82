//! Passenger tap-in / tap-out events from the upstream feed.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ids::StationId;

/// Whether a passenger entered or exited the station.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    In,
    Out,
}

/// A single passenger event at a station.
///
/// Wire form, as published by the upstream feed:
/// `{"station_id": "...", "passenger_event": "in" | "out", "datetime": "...Z"}`.
/// The datetime is ISO-8601 with a trailing `Z` that is stripped before
/// parsing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassengerEvent {
    pub station_id: StationId,
    #[serde(rename = "passenger_event")]
    pub kind: EventKind,
    #[serde(
        rename = "datetime",
        deserialize_with = "datetime_from_zulu",
        serialize_with = "datetime_to_zulu"
    )]
    pub timestamp: NaiveDateTime,
}

fn datetime_from_zulu<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let trimmed = raw.strip_suffix('Z').unwrap_or(&raw);
    trimmed.parse().map_err(serde::de::Error::custom)
}

fn datetime_to_zulu<S>(timestamp: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{}Z", timestamp.format("%Y-%m-%dT%H:%M:%S")))
}
