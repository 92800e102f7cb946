//! Tunables governing how aggressively the segmenter splits and merges
//! tracks. Defaults mirror what a production AIS pipeline has historically
//! run with; validate eagerly so a misconfiguration never surfaces partway
//! through a run.

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq)]
pub struct SegmenterConfig {
    /// Segments older than this (hours, by last message) are retired.
    pub max_hours: f64,
    /// Vessel speeds above this (knots) are implausible.
    pub max_speed: f64,
    /// A reported speed is rejected only once it exceeds `max_speed` scaled
    /// by this factor, to tolerate benign over-reporting.
    pub reported_speed_multiplier: f64,
    /// Below this distance (nm) and `noise_time_hours`, a fix is folded
    /// back into its source segment as noise rather than starting a new one.
    pub noise_dist: f64,
    /// See `noise_dist`.
    pub noise_time_hours: f64,
    /// Baseline rate (knots) used to grow the allowed-discrepancy envelope
    /// with elapsed time.
    pub penalty_speed: f64,
    /// Fixed floor (nm) added to the allowed-discrepancy envelope.
    pub buffer_nm: f64,
    /// Number of repeat observations, within `ident_window_hours`, before
    /// an identity value counts as confirmed rather than provisional.
    pub ident_confirm: u32,
    /// Rolling window (hours) over which `ident_confirm` repeats are counted.
    pub ident_window_hours: f64,
    /// Maximum distinct values retained per identity attribute, per segment.
    pub ident_cap: usize,
    /// Name of the field the CLI writes the segment id under.
    pub segment_field: String,
    /// Whether to attach per-candidate match diagnostics to the CLI output.
    pub collect_match_stats: bool,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_hours: 24.0,
            max_speed: 30.0,
            reported_speed_multiplier: 1.1,
            noise_dist: 0.1,
            noise_time_hours: 5.0 / 60.0,
            penalty_speed: 12.0,
            buffer_nm: 1.0,
            ident_confirm: 2,
            ident_window_hours: 15.0 / 60.0,
            ident_cap: 32,
            segment_field: "segment".to_string(),
            collect_match_stats: false,
        }
    }
}

impl SegmenterConfig {
    pub fn with_max_hours(mut self, v: f64) -> Self {
        self.max_hours = v;
        self
    }

    pub fn with_max_speed(mut self, v: f64) -> Self {
        self.max_speed = v;
        self
    }

    pub fn with_reported_speed_multiplier(mut self, v: f64) -> Self {
        self.reported_speed_multiplier = v;
        self
    }

    pub fn with_noise_dist(mut self, v: f64) -> Self {
        self.noise_dist = v;
        self
    }

    pub fn with_noise_time_hours(mut self, v: f64) -> Self {
        self.noise_time_hours = v;
        self
    }

    pub fn with_penalty_speed(mut self, v: f64) -> Self {
        self.penalty_speed = v;
        self
    }

    pub fn with_buffer_nm(mut self, v: f64) -> Self {
        self.buffer_nm = v;
        self
    }

    pub fn with_ident_confirm(mut self, v: u32) -> Self {
        self.ident_confirm = v;
        self
    }

    pub fn with_ident_window_hours(mut self, v: f64) -> Self {
        self.ident_window_hours = v;
        self
    }

    pub fn with_ident_cap(mut self, v: usize) -> Self {
        self.ident_cap = v;
        self
    }

    pub fn with_segment_field(mut self, v: impl Into<String>) -> Self {
        self.segment_field = v.into();
        self
    }

    pub fn with_collect_match_stats(mut self, v: bool) -> Self {
        self.collect_match_stats = v;
        self
    }

    /// Checks every field is within its allowed domain. Called by
    /// `Segmenter::new`/`Segmenter::restore` before any message is processed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_hours <= 0.0 {
            return Err(ConfigError::NonPositiveMaxHours(self.max_hours));
        }
        if self.max_speed <= 0.0 {
            return Err(ConfigError::NonPositiveMaxSpeed(self.max_speed));
        }
        if self.reported_speed_multiplier < 1.0 {
            return Err(ConfigError::InvalidReportedSpeedMultiplier(
                self.reported_speed_multiplier,
            ));
        }
        if self.noise_dist < 0.0 {
            return Err(ConfigError::NegativeNoiseDist(self.noise_dist));
        }
        if self.noise_time_hours < 0.0 {
            return Err(ConfigError::NegativeNoiseTime(self.noise_time_hours));
        }
        if self.penalty_speed < 0.0 {
            return Err(ConfigError::NegativePenaltySpeed(self.penalty_speed));
        }
        if self.buffer_nm < 0.0 {
            return Err(ConfigError::NegativeBufferNm(self.buffer_nm));
        }
        if self.ident_confirm < 1 {
            return Err(ConfigError::InvalidIdentConfirm(self.ident_confirm));
        }
        if self.ident_window_hours < 0.0 {
            return Err(ConfigError::NegativeIdentWindow(self.ident_window_hours));
        }
        if self.ident_cap < 1 {
            return Err(ConfigError::InvalidIdentCap(self.ident_cap));
        }
        if self.segment_field.trim().is_empty() {
            return Err(ConfigError::EmptySegmentField);
        }
        Ok(())
    }
}
