//! A candidate continuous track: zero or more messages from one vessel
//! believed to represent one uninterrupted stretch of reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SegmenterConfig;
use crate::discrepancy::{self, PositionalFix};
use crate::identity::{IdentityMatchSet, IdentityStore, IdentityTuple};
use crate::message::{Message, Timestamp};

/// What kind of sink a segment is. `Positional` and `Info` segments live in
/// the active set and can absorb further messages; `Bad` and `Noise` are
/// terminal single-message sinks minted only to give every message a
/// segment id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    Positional,
    Info,
    Bad,
    Noise,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    id: String,
    ssvid: u32,
    first_timestamp: Timestamp,
    seq: u32,
    birth_order: u64,
    kind: SegmentKind,
    msg_count: u64,
    last_positional: Option<PositionalFix>,
    last_message_timestamp: Timestamp,
    identity: IdentityStore,
}

impl Segment {
    /// Mints the id for a segment born at `first_timestamp` with
    /// disambiguating counter `seq`: `{ssvid}-{YYYYMMDDTHHMMSSZ}-{seq}`.
    pub fn mint_id(ssvid: u32, first_timestamp: Timestamp, seq: u32) -> String {
        let dt = DateTime::<Utc>::from_timestamp(first_timestamp, 0)
            .unwrap_or_else(|| DateTime::<Utc>::from_timestamp(0, 0).unwrap());
        format!("{ssvid}-{}-{seq}", dt.format("%Y%m%dT%H%M%SZ"))
    }

    pub fn new(
        kind: SegmentKind,
        ssvid: u32,
        seq: u32,
        birth_order: u64,
        msg: &Message,
        identity_tuple: &IdentityTuple,
        config: &SegmenterConfig,
    ) -> Self {
        let ts = msg
            .timestamp
            .expect("a segment is only ever born from a message that carries a timestamp");
        let id = Self::mint_id(ssvid, ts, seq);
        let mut identity = IdentityStore::default();
        identity.observe(identity_tuple, ts, config.ident_cap, config.ident_window_hours);
        Self {
            id,
            ssvid,
            first_timestamp: ts,
            seq,
            birth_order,
            kind,
            msg_count: 1,
            last_positional: PositionalFix::from_message(msg),
            last_message_timestamp: ts,
            identity,
        }
    }

    pub fn add(&mut self, msg: &Message, identity_tuple: &IdentityTuple, config: &SegmenterConfig) {
        let ts = msg
            .timestamp
            .expect("only timestamped messages ever reach an active segment");
        self.msg_count += 1;
        self.last_message_timestamp = ts;
        self.identity
            .observe(identity_tuple, ts, config.ident_cap, config.ident_window_hours);
        if let Some(fix) = PositionalFix::from_message(msg) {
            self.last_positional = Some(fix);
        }
    }

    pub fn identity_matches(
        &self,
        tuple: &IdentityTuple,
        now: Timestamp,
        window_hours: f64,
        confirm: u32,
    ) -> IdentityMatchSet {
        self.identity.matches(tuple, now, window_hours, confirm)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn ssvid(&self) -> u32 {
        self.ssvid
    }

    pub fn first_timestamp(&self) -> Timestamp {
        self.first_timestamp
    }

    pub fn seq(&self) -> u32 {
        self.seq
    }

    pub fn birth_order(&self) -> u64 {
        self.birth_order
    }

    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    pub fn msg_count(&self) -> u64 {
        self.msg_count
    }

    pub fn last_positional(&self) -> Option<&PositionalFix> {
        self.last_positional.as_ref()
    }

    pub fn last_message_timestamp(&self) -> Timestamp {
        self.last_message_timestamp
    }

    pub fn age_hours(&self, now: Timestamp) -> f64 {
        discrepancy::hours(self.last_message_timestamp, now)
    }

    pub fn is_stale(&self, now: Timestamp, max_hours: f64) -> bool {
        self.age_hours(now) > max_hours
    }
}
