//! Per-segment identity bookkeeping: which shipname/callsign/imo/etc.
//! values a segment has seen, and whether an incoming message's values
//! agree with, conflict with, or say nothing about them.

use serde::{Deserialize, Serialize};

use crate::message::{Timestamp, TypeClass};

/// The identity-bearing fields pulled off one message.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityTuple {
    pub shipname: Option<String>,
    pub callsign: Option<String>,
    pub imo: Option<u64>,
    pub destination: Option<String>,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub type_class: TypeClass,
}

/// The verdict for a single identity attribute, relative to a segment's
/// history. `confirmed` distinguishes a value seen often enough within the
/// confirmation window (full credit in ranking) from one seen only once or
/// twice so far (half credit) — but either is enough to detect a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityMatch {
    Match { confirmed: bool },
    Mismatch,
    Unknown,
}

impl IdentityMatch {
    fn weight(self, full: f64) -> f64 {
        match self {
            IdentityMatch::Match { confirmed: true } => full,
            IdentityMatch::Match { confirmed: false } => full / 2.0,
            _ => 0.0,
        }
    }
}

/// The identity verdict across all seven tracked attributes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IdentityMatchSet {
    pub shipname: IdentityMatch,
    pub callsign: IdentityMatch,
    pub imo: IdentityMatch,
    pub destination: IdentityMatch,
    pub length: IdentityMatch,
    pub width: IdentityMatch,
    pub type_class: IdentityMatch,
}

impl IdentityMatchSet {
    /// A hard rejection: shipname, callsign or imo conflicts outright.
    /// Destination, length, width and type_class are softer signals used
    /// only for ranking.
    pub fn has_hard_mismatch(&self) -> bool {
        matches!(self.shipname, IdentityMatch::Mismatch)
            || matches!(self.callsign, IdentityMatch::Mismatch)
            || matches!(self.imo, IdentityMatch::Mismatch)
    }

    /// Weighted identity score used to rank surviving candidates:
    /// shipname/callsign/imo each worth up to 3, destination up to 1.
    pub fn weighted_identity_score(&self) -> f64 {
        self.shipname.weight(3.0)
            + self.callsign.weight(3.0)
            + self.imo.weight(3.0)
            + self.destination.weight(1.0)
    }

    pub fn type_class_bonus(&self) -> f64 {
        match self.type_class {
            IdentityMatch::Match { .. } => 1.0,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AttributeObservation<V> {
    value: V,
    occurrences: Vec<Timestamp>,
    last_seen: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AttributeLog<V> {
    entries: Vec<AttributeObservation<V>>,
}

impl<V> Default for AttributeLog<V> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

fn count_within_window(occurrences: &[Timestamp], now: Timestamp, window_hours: f64) -> u32 {
    let window_secs = (window_hours * 3600.0).round() as i64;
    occurrences
        .iter()
        .filter(|&&t| t <= now && now - t <= window_secs)
        .count() as u32
}

impl<V: PartialEq + Clone> AttributeLog<V> {
    fn observe(&mut self, value: V, at: Timestamp, cap: usize, window_hours: f64) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.value == value) {
            entry.occurrences.retain(|&t| at - t <= (window_hours * 3600.0).round() as i64);
            entry.occurrences.push(at);
            entry.last_seen = at;
            return;
        }
        if self.entries.len() >= cap.max(1) {
            if let Some((idx, _)) = self
                .entries
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| e.last_seen)
            {
                self.entries.remove(idx);
            }
        }
        self.entries.push(AttributeObservation {
            value,
            occurrences: vec![at],
            last_seen: at,
        });
    }

    /// MATCH if `value` equals something this segment has already seen,
    /// MISMATCH if it has seen identity values but none of them equal
    /// `value`, UNKNOWN if it has never seen this attribute at all.
    fn status(&self, value: &V, now: Timestamp, window_hours: f64, confirm: u32) -> IdentityMatch {
        match self.entries.iter().find(|e| &e.value == value) {
            Some(entry) => IdentityMatch::Match {
                confirmed: count_within_window(&entry.occurrences, now, window_hours) >= confirm,
            },
            None if self.entries.is_empty() => IdentityMatch::Unknown,
            None => IdentityMatch::Mismatch,
        }
    }
}

/// Per-segment identity history: one bounded, LRU-by-last-seen multiset per
/// attribute.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityStore {
    shipname: AttributeLog<String>,
    callsign: AttributeLog<String>,
    imo: AttributeLog<u64>,
    destination: AttributeLog<String>,
    length: AttributeLog<OrderedF64>,
    width: AttributeLog<OrderedF64>,
    type_class: AttributeLog<TypeClass>,
}

/// `f64` wrapper with a total `PartialEq` suitable for exact-match identity
/// comparison. Values reaching here have already been NaN-filtered by
/// `message::normalize`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct OrderedF64(f64);

impl PartialEq for OrderedF64 {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl IdentityStore {
    pub fn observe(&mut self, tuple: &IdentityTuple, at: Timestamp, cap: usize, window_hours: f64) {
        if let Some(v) = &tuple.shipname {
            self.shipname.observe(v.clone(), at, cap, window_hours);
        }
        if let Some(v) = &tuple.callsign {
            self.callsign.observe(v.clone(), at, cap, window_hours);
        }
        if let Some(v) = tuple.imo {
            self.imo.observe(v, at, cap, window_hours);
        }
        if let Some(v) = &tuple.destination {
            self.destination.observe(v.clone(), at, cap, window_hours);
        }
        if let Some(v) = tuple.length {
            self.length.observe(OrderedF64(v), at, cap, window_hours);
        }
        if let Some(v) = tuple.width {
            self.width.observe(OrderedF64(v), at, cap, window_hours);
        }
        self.type_class.observe(tuple.type_class, at, cap, window_hours);
    }

    pub fn matches(
        &self,
        tuple: &IdentityTuple,
        now: Timestamp,
        window_hours: f64,
        confirm: u32,
    ) -> IdentityMatchSet {
        let status_opt = |log: &AttributeLog<String>, v: &Option<String>| match v {
            Some(v) => log.status(v, now, window_hours, confirm),
            None => IdentityMatch::Unknown,
        };
        IdentityMatchSet {
            shipname: status_opt(&self.shipname, &tuple.shipname),
            callsign: status_opt(&self.callsign, &tuple.callsign),
            imo: match tuple.imo {
                Some(v) => self.imo.status(&v, now, window_hours, confirm),
                None => IdentityMatch::Unknown,
            },
            destination: status_opt(&self.destination, &tuple.destination),
            length: match tuple.length {
                Some(v) => self.length.status(&OrderedF64(v), now, window_hours, confirm),
                None => IdentityMatch::Unknown,
            },
            width: match tuple.width {
                Some(v) => self.width.status(&OrderedF64(v), now, window_hours, confirm),
                None => IdentityMatch::Unknown,
            },
            type_class: self.type_class.status(&tuple.type_class, now, window_hours, confirm),
        }
    }
}
