//! Fatal error types surfaced at the Segmenter boundary.
//!
//! Routine degradation (bad values, identity conflicts, staleness) is never
//! an `Err` here — it is always reflected as a distinguished `SegmentKind`
//! in the successful output. Only caller misuse (bad configuration) and a
//! genuine contract violation on the input stream (unsorted timestamps)
//! reach these types.

use thiserror::Error;

use crate::message::Timestamp;

/// Raised by `SegmenterConfig::validate` when a configuration value is
/// outside its allowed domain. Always fatal, always surfaced before the
/// first message is processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("max_hours must be greater than zero, got {0}")]
    NonPositiveMaxHours(f64),

    #[error("max_speed must be greater than zero, got {0}")]
    NonPositiveMaxSpeed(f64),

    #[error("reported_speed_multiplier must be at least 1.0, got {0}")]
    InvalidReportedSpeedMultiplier(f64),

    #[error("noise_dist must be non-negative, got {0}")]
    NegativeNoiseDist(f64),

    #[error("noise_time_hours must be non-negative, got {0}")]
    NegativeNoiseTime(f64),

    #[error("penalty_speed must be non-negative, got {0}")]
    NegativePenaltySpeed(f64),

    #[error("buffer_nm must be non-negative, got {0}")]
    NegativeBufferNm(f64),

    #[error("ident_confirm must be at least 1, got {0}")]
    InvalidIdentConfirm(u32),

    #[error("ident_window_hours must be non-negative, got {0}")]
    NegativeIdentWindow(f64),

    #[error("ident_cap must be at least 1, got {0}")]
    InvalidIdentCap(usize),

    #[error("segment_field must not be empty")]
    EmptySegmentField,
}

/// Raised by `Segmenter::process` when the input stream for one `ssvid`
/// violates the non-decreasing-timestamp contract. Fatal — the segmenter
/// never reorders input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SegmenterError {
    #[error(
        "unsorted input for ssvid {ssvid}: message at {current} arrived after {previous}"
    )]
    UnsortedInput {
        ssvid: u32,
        previous: Timestamp,
        current: Timestamp,
    },
}
