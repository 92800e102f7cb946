//! The per-vessel driver: feeds messages through classification and
//! matching, keeps the active segment set current, and mints ids.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::SegmenterConfig;
use crate::discrepancy::PositionalFix;
use crate::error::{ConfigError, SegmenterError};
use crate::matcher::{self, MatchRecord, Winner};
use crate::message::{self, Classification, Message, Timestamp};
use crate::segment::{Segment, SegmentKind};

/// What `Segmenter::process` hands back for one message: which segment it
/// landed in, and (if `collect_match_stats` is on) why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub message_id: String,
    pub segment_id: String,
    pub segment_kind: SegmentKind,
    pub match_stats: Option<Vec<MatchRecord>>,
    /// Segments retired by this call's staleness sweep, oldest first. Most
    /// calls retire nothing; a gap past `max_hours` can retire more than one.
    pub retired: Vec<SegmentSummary>,
}

/// A terminal snapshot of one segment, returned by `flush`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub segment_id: String,
    pub kind: SegmentKind,
    pub msg_count: u64,
    pub first_timestamp: Timestamp,
}

impl From<&Segment> for SegmentSummary {
    fn from(s: &Segment) -> Self {
        Self {
            segment_id: s.id().to_string(),
            kind: s.kind(),
            msg_count: s.msg_count(),
            first_timestamp: s.first_timestamp(),
        }
    }
}

/// Durable state for one ssvid, portable across process restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterSnapshot {
    ssvid: u32,
    active: Vec<Segment>,
    seq_counter: Vec<(Timestamp, u32)>,
    birth_counter: u64,
    last_input_timestamp: Option<Timestamp>,
}

/// Drives track segmentation for a single ssvid. One `Segmenter` per
/// vessel; callers fan out across ssvids themselves.
pub struct Segmenter {
    ssvid: u32,
    config: SegmenterConfig,
    active: Vec<Segment>,
    seq_counter: HashMap<Timestamp, u32>,
    birth_counter: u64,
    last_input_timestamp: Option<Timestamp>,
}

impl Segmenter {
    pub fn new(ssvid: u32, config: SegmenterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            ssvid,
            config,
            active: Vec::new(),
            seq_counter: HashMap::new(),
            birth_counter: 0,
            last_input_timestamp: None,
        })
    }

    pub fn ssvid(&self) -> u32 {
        self.ssvid
    }

    pub fn active_segment_count(&self) -> usize {
        self.active.len()
    }

    /// Total number of `Positional`/`Info` segments ever born for this
    /// ssvid, including ones already retired. Useful for end-of-run
    /// summaries; does not count `Bad`/`Noise` sinks.
    pub fn segments_born(&self) -> u64 {
        self.birth_counter
    }

    fn mint_seq(&mut self, ts: Timestamp) -> u32 {
        let counter = self.seq_counter.entry(ts).or_insert(0);
        *counter += 1;
        *counter
    }

    fn next_birth_order(&mut self) -> u64 {
        self.birth_counter += 1;
        self.birth_counter
    }

    /// Drops segments that have gone silent past `max_hours`, returning a
    /// summary of each one retired by this call.
    fn retire_stale(&mut self, now: Timestamp) -> Vec<SegmentSummary> {
        let max_hours = self.config.max_hours;
        let (keep, retired): (Vec<Segment>, Vec<Segment>) =
            std::mem::take(&mut self.active).into_iter().partition(|s| !s.is_stale(now, max_hours));
        self.active = keep;
        retired.iter().map(SegmentSummary::from).collect()
    }

    /// Processes one message. Returns the segment it was assigned to, or
    /// `Err` if this message's timestamp precedes the last one seen for
    /// this ssvid.
    pub fn process(&mut self, msg: &Message) -> Result<Assignment, SegmenterError> {
        if let Some(ts) = msg.timestamp {
            if let Some(previous) = self.last_input_timestamp {
                if ts < previous {
                    return Err(SegmenterError::UnsortedInput {
                        ssvid: self.ssvid,
                        previous,
                        current: ts,
                    });
                }
            }
            self.last_input_timestamp = Some(ts);
        }

        let normalized = message::normalize(msg.clone());
        let classification = message::classify(&normalized, &self.config);

        if classification == Classification::Bad {
            let ts = normalized.timestamp.unwrap_or(0);
            let seq = self.mint_seq(ts);
            let segment_id = Segment::mint_id(self.ssvid, ts, seq);
            return Ok(Assignment {
                message_id: normalized.id,
                segment_id,
                segment_kind: SegmentKind::Bad,
                match_stats: None,
                retired: Vec::new(),
            });
        }

        let now = normalized
            .timestamp
            .expect("non-Bad classification guarantees a timestamp");
        let retired = self.retire_stale(now);

        let identity_tuple = message::identity_tuple(&normalized);
        let positional_fix = PositionalFix::from_message(&normalized);

        let records: Vec<MatchRecord> = self
            .active
            .iter()
            .filter_map(|segment| {
                matcher::score_candidate(&self.config, segment, positional_fix.as_ref(), now, &identity_tuple)
            })
            .collect();

        let stats_for_output = if self.config.collect_match_stats {
            Some(records.clone())
        } else {
            None
        };

        let mut assignment = match matcher::select(&records) {
            Winner::Noise => {
                let seq = self.mint_seq(now);
                let segment_id = Segment::mint_id(self.ssvid, now, seq);
                Assignment {
                    message_id: normalized.id.clone(),
                    segment_id,
                    segment_kind: SegmentKind::Noise,
                    match_stats: stats_for_output,
                    retired: Vec::new(),
                }
            }
            Winner::Existing(id) => {
                let segment = self
                    .active
                    .iter_mut()
                    .find(|s| s.id() == id)
                    .expect("matcher never selects a segment id outside the active set");
                segment.add(&normalized, &identity_tuple, &self.config);
                Assignment {
                    message_id: normalized.id.clone(),
                    segment_id: id,
                    segment_kind: segment.kind(),
                    match_stats: stats_for_output,
                    retired: Vec::new(),
                }
            }
            Winner::None => {
                let kind = if positional_fix.is_some() {
                    SegmentKind::Positional
                } else {
                    SegmentKind::Info
                };
                let seq = self.mint_seq(now);
                let birth_order = self.next_birth_order();
                let segment = Segment::new(
                    kind,
                    self.ssvid,
                    seq,
                    birth_order,
                    &normalized,
                    &identity_tuple,
                    &self.config,
                );
                let segment_id = segment.id().to_string();
                self.active.push(segment);
                Assignment {
                    message_id: normalized.id.clone(),
                    segment_id,
                    segment_kind: kind,
                    match_stats: stats_for_output,
                    retired: Vec::new(),
                }
            }
        };

        assignment.retired = retired;
        Ok(assignment)
    }

    /// Retires every active segment, returning a terminal summary of each.
    /// Call once at end of stream, or before discarding this segmenter.
    pub fn flush(&mut self) -> Vec<SegmentSummary> {
        self.active.drain(..).map(|s| SegmentSummary::from(&s)).collect()
    }

    /// Captures enough state to resume this ssvid's stream later without
    /// re-deriving which segment a fresh message belongs to.
    pub fn snapshot(&self) -> SegmenterSnapshot {
        SegmenterSnapshot {
            ssvid: self.ssvid,
            active: self.active.clone(),
            seq_counter: self.seq_counter.iter().map(|(k, v)| (*k, *v)).collect(),
            birth_counter: self.birth_counter,
            last_input_timestamp: self.last_input_timestamp,
        }
    }

    /// Rebuilds a `Segmenter` from a snapshot. Noise segments are filtered
    /// out (they are terminal and were never part of the active set to
    /// begin with, but the filter is kept as an explicit invariant guard).
    pub fn restore(config: SegmenterConfig, snapshot: SegmenterSnapshot) -> Result<Self, ConfigError> {
        config.validate()?;
        let active = snapshot
            .active
            .into_iter()
            .filter(|s| !matches!(s.kind(), SegmentKind::Bad | SegmentKind::Noise))
            .collect();
        Ok(Self {
            ssvid: snapshot.ssvid,
            config,
            active,
            seq_counter: snapshot.seq_counter.into_iter().collect(),
            birth_counter: snapshot.birth_counter,
            last_input_timestamp: snapshot.last_input_timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positional(id: &str, ssvid: u32, ts: Timestamp, lat: f64, lon: f64, speed: f64, course: f64) -> Message {
        Message {
            id: id.into(),
            ssvid,
            timestamp: Some(ts),
            lat: Some(lat),
            lon: Some(lon),
            speed: Some(speed),
            course: Some(course),
            heading: None,
            msg_type: 1,
            shipname: Some("ALPHA".into()),
            callsign: None,
            imo: None,
            destination: None,
            length: None,
            width: None,
            receiver: None,
        }
    }

    #[test]
    fn first_positional_message_opens_a_new_segment() {
        let mut seg = Segmenter::new(1, SegmenterConfig::default()).unwrap();
        let a = seg.process(&positional("m1", 1, 0, 0.0, 0.0, 10.0, 90.0)).unwrap();
        assert_eq!(a.segment_kind, SegmentKind::Positional);
        assert_eq!(a.segment_id, "1-19700101T000000Z-1");
    }

    #[test]
    fn continuous_track_stays_in_one_segment() {
        let mut seg = Segmenter::new(1, SegmenterConfig::default()).unwrap();
        let a1 = seg.process(&positional("m1", 1, 0, 0.0, 0.0, 10.0, 90.0)).unwrap();
        let a2 = seg
            .process(&positional("m2", 1, 3600, 0.166, 0.0, 10.0, 90.0))
            .unwrap();
        assert_eq!(a1.segment_id, a2.segment_id);
    }

    #[test]
    fn teleport_opens_a_second_segment() {
        let mut seg = Segmenter::new(1, SegmenterConfig::default()).unwrap();
        let a1 = seg.process(&positional("m1", 1, 0, 0.0, 0.0, 10.0, 90.0)).unwrap();
        let a2 = seg
            .process(&positional("m2", 1, 600, 20.0, 0.0, 10.0, 90.0))
            .unwrap();
        assert_ne!(a1.segment_id, a2.segment_id);
    }

    #[test]
    fn unsorted_timestamps_are_fatal() {
        let mut seg = Segmenter::new(1, SegmenterConfig::default()).unwrap();
        seg.process(&positional("m1", 1, 100, 0.0, 0.0, 10.0, 90.0)).unwrap();
        let err = seg.process(&positional("m2", 1, 50, 0.0, 0.0, 10.0, 90.0));
        assert!(matches!(err, Err(SegmenterError::UnsortedInput { .. })));
    }

    #[test]
    fn flush_drains_the_active_set() {
        let mut seg = Segmenter::new(1, SegmenterConfig::default()).unwrap();
        seg.process(&positional("m1", 1, 0, 0.0, 0.0, 10.0, 90.0)).unwrap();
        let summaries = seg.flush();
        assert_eq!(summaries.len(), 1);
        assert_eq!(seg.active_segment_count(), 0);
    }

    #[test]
    fn snapshot_restore_round_trips_active_segments() {
        let mut seg = Segmenter::new(1, SegmenterConfig::default()).unwrap();
        seg.process(&positional("m1", 1, 0, 0.0, 0.0, 10.0, 90.0)).unwrap();
        let snapshot = seg.snapshot();
        let restored = Segmenter::restore(SegmenterConfig::default(), snapshot).unwrap();
        assert_eq!(restored.active_segment_count(), 1);
    }

    #[test]
    fn stale_gap_reports_the_retired_segment() {
        let mut seg = Segmenter::new(1, SegmenterConfig::default()).unwrap();
        seg.process(&positional("m1", 1, 0, 0.0, 0.0, 10.0, 90.0)).unwrap();
        let gap = (SegmenterConfig::default().max_hours * 3600.0) as i64 + 3600;
        let a2 = seg
            .process(&positional("m2", 1, gap, 0.0, 0.0, 10.0, 90.0))
            .unwrap();
        assert_eq!(a2.retired.len(), 1);
        assert_eq!(a2.retired[0].msg_count, 1);
    }

    #[test]
    fn bad_message_never_touches_the_active_set() {
        let mut seg = Segmenter::new(1, SegmenterConfig::default()).unwrap();
        let mut bad = positional("m1", 1, 0, 200.0, 0.0, 10.0, 90.0);
        bad.lat = Some(200.0);
        let a = seg.process(&bad).unwrap();
        assert_eq!(a.segment_kind, SegmentKind::Bad);
        assert_eq!(seg.active_segment_count(), 0);
    }
}

/// The six end-to-end scenarios walked through an ssvid's stream.
#[cfg(test)]
mod scenario_tests {
    use super::*;

    const SSVID: u32 = 123456789;

    fn msg(id: &str, ts: Timestamp, lat: f64, lon: f64, speed: Option<f64>, course: Option<f64>, shipname: &str) -> Message {
        Message {
            id: id.into(),
            ssvid: SSVID,
            timestamp: Some(ts),
            lat: Some(lat),
            lon: Some(lon),
            speed,
            course,
            heading: None,
            msg_type: 1,
            shipname: Some(shipname.to_string()),
            callsign: None,
            imo: None,
            destination: None,
            length: None,
            width: None,
            receiver: None,
        }
    }

    #[test]
    fn scenario_1_straight_track_stays_in_one_segment() {
        let mut seg = Segmenter::new(SSVID, SegmenterConfig::default()).unwrap();
        let a1 = seg.process(&msg("m1", 0, 0.0, 0.0, Some(10.0), Some(90.0), "ALPHA")).unwrap();
        let a2 = seg
            .process(&msg("m2", 3600, 0.0, 0.167, Some(10.0), Some(90.0), "ALPHA"))
            .unwrap();
        let a3 = seg
            .process(&msg("m3", 7200, 0.0, 0.334, Some(10.0), Some(90.0), "ALPHA"))
            .unwrap();
        assert_eq!(a1.segment_id, "123456789-19700101T000000Z-1");
        assert_eq!(a2.segment_id, a1.segment_id);
        assert_eq!(a3.segment_id, a1.segment_id);
    }

    #[test]
    fn scenario_2_teleport_opens_a_second_segment() {
        let mut seg = Segmenter::new(SSVID, SegmenterConfig::default()).unwrap();
        let a1 = seg.process(&msg("m1", 0, 0.0, 0.0, None, None, "ALPHA")).unwrap();
        let a2 = seg.process(&msg("m2", 600, 20.0, 0.0, None, None, "ALPHA")).unwrap();
        assert_eq!(a1.segment_id, "123456789-19700101T000000Z-1");
        assert_eq!(a2.segment_id, "123456789-19700101T001000Z-1");
    }

    #[test]
    fn scenario_3_near_duplicate_is_absorbed_as_noise() {
        let mut seg = Segmenter::new(SSVID, SegmenterConfig::default()).unwrap();
        let a1 = seg.process(&msg("m1", 0, 0.0, 0.0, Some(10.0), Some(90.0), "ALPHA")).unwrap();
        let a2 = seg
            .process(&msg("m2", 30, 0.0001, 0.0001, None, None, "ALPHA"))
            .unwrap();
        let a3 = seg
            .process(&msg("m3", 3600, 0.0, 0.167, Some(10.0), Some(90.0), "ALPHA"))
            .unwrap();
        assert_eq!(a1.segment_kind, SegmentKind::Positional);
        assert_eq!(a2.segment_kind, SegmentKind::Noise);
        assert_eq!(a3.segment_id, a1.segment_id);
        assert_ne!(a2.segment_id, a1.segment_id);
    }

    #[test]
    fn scenario_4_conflicting_shipname_forces_a_split() {
        let mut seg = Segmenter::new(SSVID, SegmenterConfig::default()).unwrap();
        let a1 = seg.process(&msg("m1", 0, 0.0, 0.0, None, None, "ALPHA")).unwrap();
        let a2 = seg.process(&msg("m2", 60, 0.0, 0.001, None, None, "BRAVO")).unwrap();
        let a3 = seg.process(&msg("m3", 120, 0.0, 0.002, None, None, "ALPHA")).unwrap();
        assert_ne!(a1.segment_id, a2.segment_id);
        assert_eq!(a3.segment_id, a1.segment_id);
    }

    #[test]
    fn scenario_5_gap_past_max_hours_retires_the_segment() {
        let mut seg = Segmenter::new(SSVID, SegmenterConfig::default()).unwrap();
        let a1 = seg.process(&msg("m1", 0, 0.0, 0.0, None, None, "ALPHA")).unwrap();
        let a2 = seg
            .process(&msg("m2", 25 * 3600, 0.0, 0.0167, None, None, "ALPHA"))
            .unwrap();
        assert_ne!(a1.segment_id, a2.segment_id);
        assert_eq!(seg.active_segment_count(), 1);
        assert_eq!(a2.retired.len(), 1);
        assert_eq!(a2.retired[0].segment_id, a1.segment_id);
    }

    #[test]
    fn scenario_6_bad_value_does_not_disturb_the_active_set() {
        let mut seg = Segmenter::new(SSVID, SegmenterConfig::default()).unwrap();
        let a1 = seg.process(&msg("m1", 0, 95.0, 0.0, None, None, "ALPHA")).unwrap();
        assert_eq!(a1.segment_kind, SegmentKind::Bad);
        assert_eq!(seg.active_segment_count(), 0);

        let a2 = seg.process(&msg("m2", 60, 0.0, 0.0, None, None, "ALPHA")).unwrap();
        assert_eq!(a2.segment_kind, SegmentKind::Positional);
        assert_eq!(a2.segment_id, "123456789-19700101T000100Z-1");
    }
}
