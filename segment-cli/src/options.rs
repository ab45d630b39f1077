use std::path::Path;

use segmenter::SegmentOptions;
use tracing::{debug, error, info};

use crate::cli::Args;
use crate::error::{AppError, Result};

/// Parses `key=value` parameter strings.
pub fn parse_params(params: &[String]) -> Result<Vec<(String, String)>> {
    debug!("Parsing {} parameters", params.len());

    params
        .iter()
        .map(|param| {
            param
                .split_once('=')
                .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
                .ok_or_else(|| {
                    error!("Invalid param format: {param}");
                    AppError::InvalidInput(format!("Invalid param format: {param}"))
                })
        })
        .collect()
}

pub fn load_config(path: &Path) -> Result<SegmentOptions> {
    let text = std::fs::read_to_string(path)?;
    let options = toml::from_str(&text)?;
    info!(path = %path.display(), "Loaded segment options");
    Ok(options)
}

/// Builds the segment options: config file first, then flags, then `-p`
/// parameters, each overriding the previous.
pub fn resolve_options(args: &Args) -> Result<SegmentOptions> {
    let mut options = match &args.config {
        Some(path) => load_config(path)?,
        None => SegmentOptions::default(),
    };

    for (key, value) in args.option_flags() {
        options.set(key, &value)?;
    }
    for (key, value) in parse_params(&args.params)? {
        options.set(&key, &value)?;
    }

    debug!(?options, "Resolved segment options");
    Ok(options)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("a=b", ("a", "b"))]
    #[case("segment_times = 1,2,3", ("segment_times", "1,2,3"))]
    #[case("k=v=w", ("k", "v=w"))]
    fn test_parse_params(#[case] input: &str, #[case] expected: (&str, &str)) {
        let parsed = parse_params(&[input.to_string()]).unwrap();
        assert_eq!(
            parsed,
            vec![(expected.0.to_string(), expected.1.to_string())]
        );
    }

    #[test]
    fn test_parse_params_rejects_missing_equals() {
        assert!(matches!(
            parse_params(&["novalue".to_string()]),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_precedence() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let config = dir.path().join("segment.toml");
        std::fs::write(
            &config,
            "segment_time = \"10\"\nsegment_list = \"from_config.csv\"\nsegment_wrap = 4\n",
        )?;

        let args = Args::try_parse_from([
            "segment",
            "-i",
            "in.flv",
            "out%03d.flv",
            "-c",
            config.to_str().unwrap(),
            "-t",
            "6",
            "-p",
            "segment_wrap=8",
        ])?;
        let options = resolve_options(&args)?;

        assert_eq!(options.segment_time, "6");
        assert_eq!(options.segment_list, Some(PathBuf::from("from_config.csv")));
        assert_eq!(options.segment_wrap, 8);
        Ok(())
    }

    #[test]
    fn test_unknown_param_is_config_error() {
        let args = Args::try_parse_from(["segment", "-i", "in.flv", "o%d.flv", "-p", "bogus=1"])
            .unwrap();
        let err = resolve_options(&args).unwrap_err();
        assert!(matches!(err, AppError::Segment(ref e) if e.is_config()));
    }
}
