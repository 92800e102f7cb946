//! Scores an incoming message against every active segment and picks a
//! winner, a noise absorption, or neither (new segment).

use serde::{Deserialize, Serialize};

use crate::config::SegmenterConfig;
use crate::discrepancy::{self, PositionalFix};
use crate::identity::{IdentityMatchSet, IdentityTuple};
use crate::message::Timestamp;
use crate::segment::Segment;

/// Everything computed while scoring one (message, segment) pair. Kept
/// around for diagnostics (`collect_match_stats`) as well as for ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub segment_id: String,
    pub delta_t_hours: f64,
    pub discrepancy_nm: Option<f64>,
    pub max_allowed_discrepancy_nm: Option<f64>,
    pub positional_ok: bool,
    pub reported_speed_ok: bool,
    pub implied_speed_ok: bool,
    pub identity: IdentityMatchSet,
    pub noise_candidate: bool,
    last_positional_timestamp: Option<Timestamp>,
    birth_order: u64,
}

impl MatchRecord {
    pub fn passes_hard_gates(&self) -> bool {
        self.positional_ok
            && self.reported_speed_ok
            && self.implied_speed_ok
            && !self.identity.has_hard_mismatch()
    }

    fn identity_score(&self) -> f64 {
        self.identity.weighted_identity_score()
    }

    fn type_class_bonus(&self) -> f64 {
        self.identity.type_class_bonus()
    }
}

/// Relaxes the implied-speed tolerance for very short intervals, where GPS
/// jitter dominates over genuine vessel motion.
fn implied_speed_tolerance(delta_t_hours: f64) -> f64 {
    if delta_t_hours < 1.0 / 60.0 {
        2.0
    } else {
        1.0
    }
}

/// Scores `msg` against one active `segment`. Returns `None` if the
/// segment is already past `max_hours` old relative to `now` (it should
/// have been retired before matching ran; this is a defensive backstop).
pub fn score_candidate(
    config: &SegmenterConfig,
    segment: &Segment,
    msg_positional: Option<&PositionalFix>,
    now: Timestamp,
    identity_tuple: &IdentityTuple,
) -> Option<MatchRecord> {
    let delta_t_hours = match (msg_positional, segment.last_positional()) {
        (Some(_), Some(prev)) => discrepancy::hours(prev.timestamp, now),
        _ => discrepancy::hours(segment.last_message_timestamp(), now),
    };

    if delta_t_hours > config.max_hours {
        return None;
    }

    let identity = segment.identity_matches(
        identity_tuple,
        now,
        config.ident_window_hours,
        config.ident_confirm,
    );

    let (positional_ok, reported_speed_ok, implied_speed_ok, discrepancy_nm, max_allowed, noise_candidate) =
        match (msg_positional, segment.last_positional()) {
            (Some(obs), Some(prev)) => {
                let disc = discrepancy::discrepancy_nm(prev, obs);
                let max_disc =
                    discrepancy::max_allowed_discrepancy_nm(config.buffer_nm, config.penalty_speed, delta_t_hours);
                let positional_ok = disc <= max_disc;

                let reported_speed_ok = obs
                    .speed
                    .map_or(true, |s| s <= config.max_speed * config.reported_speed_multiplier);

                let plain_dist = discrepancy::distance_nm(prev.point(), obs.point());
                let implied_speed = plain_dist / delta_t_hours.max(f64::EPSILON);
                let implied_speed_ok =
                    implied_speed <= config.max_speed * implied_speed_tolerance(delta_t_hours);

                let noise_candidate =
                    plain_dist <= config.noise_dist && delta_t_hours <= config.noise_time_hours;

                (positional_ok, reported_speed_ok, implied_speed_ok, Some(disc), Some(max_disc), noise_candidate)
            }
            (Some(obs), None) => {
                // Segment has never had a position (an Info segment): the
                // positional check is waived, identity alone decides.
                let reported_speed_ok = obs
                    .speed
                    .map_or(true, |s| s <= config.max_speed * config.reported_speed_multiplier);
                (true, reported_speed_ok, true, None, None, false)
            }
            (None, _) => (true, true, true, None, None, false),
        };

    Some(MatchRecord {
        segment_id: segment.id().to_string(),
        delta_t_hours,
        discrepancy_nm,
        max_allowed_discrepancy_nm: max_allowed,
        positional_ok,
        reported_speed_ok,
        implied_speed_ok,
        identity,
        noise_candidate,
        last_positional_timestamp: segment.last_positional().map(|f| f.timestamp),
        birth_order: segment.birth_order(),
    })
}

/// The outcome of scoring a message against every active segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Winner {
    Existing(String),
    Noise,
    None,
}

/// Applies the selection rule: drop hard-gate failures, then prefer a
/// noise absorption over any real match, then rank survivors by identity
/// score, type_class agreement, recency, smallest discrepancy, and finally
/// earliest-born id.
pub fn select(records: &[MatchRecord]) -> Winner {
    let survivors: Vec<&MatchRecord> = records.iter().filter(|r| r.passes_hard_gates()).collect();
    if survivors.is_empty() {
        return Winner::None;
    }
    if survivors.iter().any(|r| r.noise_candidate) {
        return Winner::Noise;
    }
    let mut best = survivors[0];
    for candidate in &survivors[1..] {
        if better(candidate, best) {
            best = candidate;
        }
    }
    Winner::Existing(best.segment_id.clone())
}

fn better(a: &MatchRecord, b: &MatchRecord) -> bool {
    let a_score = a.identity_score();
    let b_score = b.identity_score();
    if a_score != b_score {
        return a_score > b_score;
    }
    let a_bonus = a.type_class_bonus();
    let b_bonus = b.type_class_bonus();
    if a_bonus != b_bonus {
        return a_bonus > b_bonus;
    }
    let a_ts = a.last_positional_timestamp.unwrap_or(i64::MIN);
    let b_ts = b.last_positional_timestamp.unwrap_or(i64::MIN);
    if a_ts != b_ts {
        return a_ts > b_ts;
    }
    let a_disc = a.discrepancy_nm.unwrap_or(f64::INFINITY);
    let b_disc = b.discrepancy_nm.unwrap_or(f64::INFINITY);
    if a_disc != b_disc {
        return a_disc < b_disc;
    }
    a.birth_order < b.birth_order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityMatch;

    fn record(id: &str, score_fields: (IdentityMatch, IdentityMatch, IdentityMatch, IdentityMatch), birth_order: u64) -> MatchRecord {
        MatchRecord {
            segment_id: id.to_string(),
            delta_t_hours: 1.0,
            discrepancy_nm: Some(1.0),
            max_allowed_discrepancy_nm: Some(10.0),
            positional_ok: true,
            reported_speed_ok: true,
            implied_speed_ok: true,
            identity: IdentityMatchSet {
                shipname: score_fields.0,
                callsign: score_fields.1,
                imo: score_fields.2,
                destination: score_fields.3,
                length: IdentityMatch::Unknown,
                width: IdentityMatch::Unknown,
                type_class: IdentityMatch::Unknown,
            },
            noise_candidate: false,
            last_positional_timestamp: Some(0),
            birth_order,
        }
    }

    #[test]
    fn empty_records_yield_no_winner() {
        assert_eq!(select(&[]), Winner::None);
    }

    #[test]
    fn hard_mismatch_is_dropped() {
        let r = record(
            "s1",
            (IdentityMatch::Mismatch, IdentityMatch::Unknown, IdentityMatch::Unknown, IdentityMatch::Unknown),
            0,
        );
        assert_eq!(select(&[r]), Winner::None);
    }

    #[test]
    fn higher_identity_score_wins() {
        let weak = record(
            "weak",
            (IdentityMatch::Unknown, IdentityMatch::Unknown, IdentityMatch::Unknown, IdentityMatch::Unknown),
            0,
        );
        let strong = record(
            "strong",
            (IdentityMatch::Match { confirmed: true }, IdentityMatch::Unknown, IdentityMatch::Unknown, IdentityMatch::Unknown),
            1,
        );
        assert_eq!(select(&[weak, strong]), Winner::Existing("strong".to_string()));
    }

    #[test]
    fn ties_fall_back_to_earliest_born() {
        let a = record(
            "a",
            (IdentityMatch::Unknown, IdentityMatch::Unknown, IdentityMatch::Unknown, IdentityMatch::Unknown),
            5,
        );
        let b = record(
            "b",
            (IdentityMatch::Unknown, IdentityMatch::Unknown, IdentityMatch::Unknown, IdentityMatch::Unknown),
            2,
        );
        assert_eq!(select(&[a, b]), Winner::Existing("b".to_string()));
    }

    #[test]
    fn noise_candidate_wins_over_any_ranked_match() {
        let mut noisy = record(
            "noisy",
            (IdentityMatch::Unknown, IdentityMatch::Unknown, IdentityMatch::Unknown, IdentityMatch::Unknown),
            0,
        );
        noisy.noise_candidate = true;
        let ranked = record(
            "ranked",
            (IdentityMatch::Match { confirmed: true }, IdentityMatch::Unknown, IdentityMatch::Unknown, IdentityMatch::Unknown),
            1,
        );
        assert_eq!(select(&[noisy, ranked]), Winner::Noise);
    }
}
