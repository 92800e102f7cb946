//! Raw input records and the classification/normalization rules applied to
//! them before they reach a segment.

use serde::{Deserialize, Serialize};

use crate::config::SegmenterConfig;
use crate::identity::IdentityTuple;

/// Unix seconds. Negative values (pre-1970) are accepted; the contract is
/// monotonicity within one ssvid's stream, not a particular epoch.
pub type Timestamp = i64;

/// A broad bucket over AIS message types, used only to weight identity
/// matching — not a structural property of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeClass {
    A,
    B,
    Other,
}

/// One AIS message as read off the wire. Every field but `id`, `ssvid`,
/// `timestamp` and `msg_type` is optional: a real stream mixes position
/// reports with sparser identity/voyage messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub ssvid: u32,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub course: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(rename = "type", default)]
    pub msg_type: u32,
    #[serde(default)]
    pub shipname: Option<String>,
    #[serde(default)]
    pub callsign: Option<String>,
    #[serde(default)]
    pub imo: Option<u64>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub receiver: Option<String>,
}

/// Where a message lands before it ever competes for a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Bad,
    Info,
    Positional,
}

pub fn type_class_of(msg_type: u32) -> TypeClass {
    match msg_type {
        1..=3 => TypeClass::A,
        18 | 19 => TypeClass::B,
        _ => TypeClass::Other,
    }
}

/// Classifies a message that has already been normalized (NaN/inf coerced
/// to absent, course wrapped). A message with no timestamp, an
/// out-of-range lat/lon, or an implausible reported speed is terminally
/// bad. Everything else carrying a full position is positional; everything
/// else is informational.
pub fn classify(msg: &Message, config: &SegmenterConfig) -> Classification {
    if msg.timestamp.is_none() {
        return Classification::Bad;
    }
    if let Some(lat) = msg.lat {
        if !(-90.0..=90.0).contains(&lat) {
            return Classification::Bad;
        }
    }
    if let Some(lon) = msg.lon {
        if !(-180.0..=180.0).contains(&lon) {
            return Classification::Bad;
        }
    }
    if let Some(speed) = msg.speed {
        let max = config.max_speed * config.reported_speed_multiplier;
        if speed < 0.0 || speed > max {
            return Classification::Bad;
        }
    }
    if msg.lat.is_some() && msg.lon.is_some() {
        Classification::Positional
    } else {
        Classification::Info
    }
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

fn trimmed(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Coerces NaN/infinite numeric fields to absent and wraps course into
/// `[0, 360)`. Leaves `lat`/`lon`/`speed` range validation to `classify`.
pub fn normalize(mut msg: Message) -> Message {
    msg.lat = finite(msg.lat);
    msg.lon = finite(msg.lon);
    msg.speed = finite(msg.speed);
    msg.heading = finite(msg.heading);
    msg.length = finite(msg.length);
    msg.width = finite(msg.width);
    msg.course = finite(msg.course).map(|c| c.rem_euclid(360.0));
    msg.shipname = trimmed(msg.shipname);
    msg.callsign = trimmed(msg.callsign);
    msg.destination = trimmed(msg.destination);
    msg
}

/// Extracts the identity attributes a message carries, for comparison
/// against a segment's identity store.
pub fn identity_tuple(msg: &Message) -> IdentityTuple {
    IdentityTuple {
        shipname: msg.shipname.clone(),
        callsign: msg.callsign.clone(),
        imo: msg.imo,
        destination: msg.destination.clone(),
        length: msg.length,
        width: msg.width,
        type_class: type_class_of(msg.msg_type),
    }
}
