//! Per-vessel AIS track segmentation.
//!
//! A [`Segmenter`] consumes one ssvid's message stream in timestamp order
//! and assigns each message to a [`Segment`] id, splitting the stream into
//! continuous tracks wherever a jump in position, speed, or identity makes
//! two consecutive messages implausible as the same uninterrupted track.
//!
//! This crate is pure and synchronous: it does no I/O and does not log.
//! `segmenter_cli` is the thin front-end that reads NDJSON, drives one
//! `Segmenter` per ssvid, and reports what happened.

pub mod config;
pub mod discrepancy;
pub mod error;
pub mod identity;
pub mod matcher;
pub mod message;
pub mod segment;
pub mod segmenter;

pub use config::SegmenterConfig;
pub use error::{ConfigError, SegmenterError};
pub use matcher::MatchRecord;
pub use message::{Classification, Message, Timestamp, TypeClass};
pub use segment::{Segment, SegmentKind};
pub use segmenter::{Assignment, Segmenter, SegmenterSnapshot, SegmentSummary};
