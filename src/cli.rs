use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::request::ResponseFormat;

#[derive(Debug, Parser)]
#[command(author, version, about = "Summarise and classify business datasets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the full analysis for a JSON request and emit the response payload
    Analyze(AnalyzeArgs),
    /// Compute sales statistics for a CSV or JSON dataset
    Stats(StatsArgs),
    /// Detect the business domain of a CSV or JSON dataset
    Classify(ClassifyArgs),
    /// Render the prompt an analysis request would send, without calling the model
    Prompt(PromptArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "lowercase")]
pub enum FormatArg {
    Json,
    Markdown,
    Text,
}

impl From<FormatArg> for ResponseFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Json => ResponseFormat::Json,
            FormatArg::Markdown => ResponseFormat::Markdown,
            FormatArg::Text => ResponseFormat::Text,
        }
    }
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Request JSON file (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output file for the response JSON (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// YAML configuration file layered under environment overrides
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Skip the model call and return local results only
    #[arg(long)]
    pub offline: bool,
    /// Override the response format named in the request
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,
    /// Override the analysis type named in the request (sales, hr, marketing, strategic)
    #[arg(long = "analysis-type")]
    pub analysis_type: Option<String>,
    /// Character encoding of the request file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Input CSV or JSON file to profile (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Emit statistics as JSON instead of a table
    #[arg(long)]
    pub json: bool,
    /// CSV delimiter character
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding for input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ClassifyArgs {
    /// Input CSV or JSON file to classify (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Number of leading rows available to value-pattern scoring
    #[arg(long, default_value_t = crate::classify::CLASSIFY_SAMPLE_ROWS)]
    pub sample: usize,
    /// Emit the classification as JSON instead of a table
    #[arg(long)]
    pub json: bool,
    /// CSV delimiter character
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding for input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct PromptArgs {
    /// Request JSON file (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// YAML configuration file layered under environment overrides
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Override the response format named in the request
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,
    /// Override the analysis type named in the request
    #[arg(long = "analysis-type")]
    pub analysis_type: Option<String>,
    /// Character encoding of the request file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_names_are_accepted() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("semicolon"), Ok(b';'));
        assert_eq!(parse_delimiter("#"), Ok(b'#'));
        assert!(parse_delimiter("、").is_err());
        assert!(parse_delimiter("ab").is_err());
    }

    #[test]
    fn analyze_flags_parse() {
        let cli = Cli::try_parse_from([
            "bizdata-analyzer",
            "analyze",
            "-i",
            "req.json",
            "--offline",
            "--format",
            "markdown",
            "--analysis-type",
            "hr",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze(args) => {
                assert!(args.offline);
                assert_eq!(args.format, Some(FormatArg::Markdown));
                assert_eq!(args.analysis_type.as_deref(), Some("hr"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
