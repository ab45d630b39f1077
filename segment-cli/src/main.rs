mod cli;
mod error;
mod options;

use std::fs::File;
use std::io::BufReader;
use std::process;
use std::sync::Arc;

use clap::Parser;
use pipeline_common::{CancellationToken, StreamerContext};
use segmenter::Segmenter;
use segmenter::formats::flv::FlvDemuxer;
use tracing::{Level, error, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::cli::Args;
use crate::error::Result;
use crate::options::resolve_options;

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    if let Err(e) = run(args) {
        error!("Application error: {}", e);
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let options = resolve_options(&args)?;

    let input = File::open(&args.input)?;
    let mut demuxer = FlvDemuxer::new(BufReader::with_capacity(1024 * 1024, input))?;
    let streams = Arc::new(demuxer.streams().clone());

    let name = args
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "segment".to_string());
    let context = Arc::new(StreamerContext::with_name(
        format!("[{name}]"),
        CancellationToken::new(),
    ));

    let mut segmenter = Segmenter::builder(args.output.clone(), streams)
        .options(options)
        .context(context)
        .retain_records(false)
        .on_segment_open(|path, index| {
            info!(segment = index, "Writing {}", path.display());
        })
        .on_segment_close(|record| {
            println!(
                "{}\t{:.3}\t{:.3}\t{} packets",
                record.path.display(),
                record.start_time,
                record.end_time,
                record.packets
            );
        })
        .build()?;

    while let Some(packet) = demuxer.read_packet()? {
        segmenter.write_packet(&packet)?;
    }
    let summary = segmenter.finish()?;

    info!(
        "Wrote {} segments ({} packets) from {}",
        summary.segment_count,
        summary.packets,
        args.input.display()
    );
    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(verbose)
                .with_writer(std::io::stderr),
        )
        .init();
}
