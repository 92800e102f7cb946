//! Thin NDJSON front-end: reads AIS messages, shards them by `ssvid` into
//! one `segmenter_core::Segmenter` per vessel id, and writes each input
//! record back out tagged with its assigned segment id.

mod error;
mod io;

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use segmenter_core::{Message, SegmentKind, Segmenter, SegmenterConfig};

use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "segmenter", version, about = "Splits an AIS message stream into per-vessel segments")]
struct Cli {
    /// Input NDJSON path, or "-" for stdin.
    #[arg(default_value = "-")]
    input: String,

    /// Output NDJSON path. Defaults to stdout.
    #[arg(short, long)]
    output: Option<String>,

    #[arg(long, default_value_t = SegmenterConfig::default().max_hours)]
    max_hours: f64,

    #[arg(long, default_value_t = SegmenterConfig::default().max_speed)]
    max_speed: f64,

    #[arg(long, default_value_t = SegmenterConfig::default().reported_speed_multiplier)]
    reported_speed_multiplier: f64,

    #[arg(long, default_value_t = SegmenterConfig::default().noise_dist)]
    noise_dist: f64,

    /// Noise time window, in minutes.
    #[arg(long, default_value_t = SegmenterConfig::default().noise_time_hours * 60.0)]
    noise_time: f64,

    #[arg(long, default_value_t = SegmenterConfig::default().penalty_speed)]
    penalty_speed: f64,

    #[arg(long, default_value_t = SegmenterConfig::default().buffer_nm)]
    buffer_nm: f64,

    #[arg(long, default_value_t = SegmenterConfig::default().ident_confirm)]
    ident_confirm: u32,

    /// Identity confirmation window, in minutes.
    #[arg(long, default_value_t = SegmenterConfig::default().ident_window_hours * 60.0)]
    ident_window: f64,

    #[arg(long, default_value_t = SegmenterConfig::default().ident_cap)]
    ident_cap: usize,

    #[arg(long, default_value_t = SegmenterConfig::default().segment_field)]
    segment_field: String,

    #[arg(long, default_value_t = false)]
    collect_match_stats: bool,

    /// tracing-subscriber filter, e.g. "info" or "segmenter_cli=debug".
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn to_config(&self) -> SegmenterConfig {
        SegmenterConfig::default()
            .with_max_hours(self.max_hours)
            .with_max_speed(self.max_speed)
            .with_reported_speed_multiplier(self.reported_speed_multiplier)
            .with_noise_dist(self.noise_dist)
            .with_noise_time_hours(self.noise_time / 60.0)
            .with_penalty_speed(self.penalty_speed)
            .with_buffer_nm(self.buffer_nm)
            .with_ident_confirm(self.ident_confirm)
            .with_ident_window_hours(self.ident_window / 60.0)
            .with_ident_cap(self.ident_cap)
            .with_segment_field(self.segment_field.clone())
            .with_collect_match_stats(self.collect_match_stats)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(cli.log_level.clone()))
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "segmenter run failed");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config = cli.to_config();
    config.validate()?;

    let reader = io::open_input(&cli.input)?;
    let mut writer = io::open_output(cli.output.as_deref())?;

    let mut segmenters: HashMap<u32, Segmenter> = HashMap::new();
    let mut bad_count = 0u64;
    let mut noise_count = 0u64;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let mut value: serde_json::Value = serde_json::from_str(&line)
            .map_err(|source| CliError::Malformed { line: line_no + 1, source })?;
        let message: Message = serde_json::from_value(value.clone())
            .map_err(|source| CliError::Malformed { line: line_no + 1, source })?;

        let segmenter = segmenters.entry(message.ssvid).or_insert_with(|| {
            Segmenter::new(message.ssvid, config.clone()).expect("config was already validated")
        });

        let assignment = segmenter.process(&message)?;

        debug!(
            ssvid = message.ssvid,
            segment_id = %assignment.segment_id,
            kind = ?assignment.segment_kind,
            "processed message"
        );
        match assignment.segment_kind {
            SegmentKind::Bad => {
                bad_count += 1;
                warn!(ssvid = message.ssvid, id = %message.id, "message classified Bad");
            }
            SegmentKind::Noise => {
                noise_count += 1;
                warn!(ssvid = message.ssvid, id = %message.id, "message absorbed as noise");
            }
            SegmentKind::Positional | SegmentKind::Info => {}
        }

        for retired in &assignment.retired {
            info!(
                ssvid = message.ssvid,
                segment_id = %retired.segment_id,
                kind = ?retired.kind,
                msg_count = retired.msg_count,
                "segment retired"
            );
        }

        if let serde_json::Value::Object(map) = &mut value {
            map.insert(
                config.segment_field.clone(),
                serde_json::Value::String(assignment.segment_id),
            );
            if let Some(stats) = &assignment.match_stats {
                map.insert(
                    "segment_matches".to_string(),
                    serde_json::to_value(stats).expect("match stats always serialize"),
                );
            }
        }

        writeln!(writer, "{value}")?;
    }

    let mut segments_flushed = 0u64;
    let mut segments_born = 0u64;
    for segmenter in segmenters.values_mut() {
        segments_born += segmenter.segments_born();
        segments_flushed += segmenter.flush().len() as u64;
    }

    info!(
        ssvids = segmenters.len(),
        segments_born,
        segments_flushed,
        bad = bad_count,
        noise = noise_count,
        "stream complete"
    );

    writer.flush()?;
    Ok(())
}
