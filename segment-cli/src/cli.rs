use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "segment",
    author,
    version,
    about = "Split an FLV recording into independently playable segments",
    long_about = None
)]
pub struct Args {
    /// Input FLV file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Output filename pattern with a frame number, e.g. out%03d.flv
    pub output: String,

    /// Segment container format (inferred from the output pattern if unset)
    #[arg(short = 'f', long)]
    pub segment_format: Option<String>,

    /// Segment duration in seconds or [HH:]MM:SS[.frac]
    #[arg(short = 't', long)]
    pub segment_time: Option<String>,

    /// Comma-separated ascending cut points; overrides --segment-time
    #[arg(long)]
    pub segment_times: Option<String>,

    /// Tolerance applied when matching keyframes to cut points
    #[arg(long)]
    pub segment_delta: Option<String>,

    /// Write a filename,start,end segment list to this file
    #[arg(short = 'l', long)]
    pub segment_list: Option<PathBuf>,

    /// Rotate the segment list every N segments (0 = never)
    #[arg(long)]
    pub segment_list_size: Option<u32>,

    /// Wrap the segment number at N (0 = never)
    #[arg(long)]
    pub segment_wrap: Option<u32>,

    /// Whether wrapping also restarts the cut-point list: coupled or filename_only
    #[arg(long)]
    pub segment_wrap_mode: Option<String>,

    /// TOML file with segment options
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Extra segment options as key=value (can be specified multiple times)
    #[arg(short = 'p', long = "param")]
    pub params: Vec<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Options given as dedicated flags, as `(key, value)` pairs.
    pub fn option_flags(&self) -> Vec<(&'static str, String)> {
        let mut flags = Vec::new();
        let mut push = |key: &'static str, value: Option<String>| {
            if let Some(value) = value {
                flags.push((key, value));
            }
        };
        push("segment_format", self.segment_format.clone());
        push("segment_time", self.segment_time.clone());
        push("segment_times", self.segment_times.clone());
        push("segment_delta", self.segment_delta.clone());
        push(
            "segment_list",
            self.segment_list
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
        );
        push(
            "segment_list_size",
            self.segment_list_size.map(|n| n.to_string()),
        );
        push("segment_wrap", self.segment_wrap.map(|n| n.to_string()));
        push("segment_wrap_mode", self.segment_wrap_mode.clone());
        flags
    }
}
