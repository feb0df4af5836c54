pub mod classify;
pub mod cli;
pub mod columns;
pub mod compat;
pub mod config;
pub mod data;
pub mod io_utils;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod request;
pub mod response;
pub mod stats;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};

use crate::{
    cli::{Cli, Commands},
    compat::AnalysisType,
    config::AnalyzerConfig,
    llm::HttpModelClient,
    pipeline::Analyzer,
    request::AnalysisRequest,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("bizdata_analyzer", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze(args) => handle_analyze(&args),
        Commands::Stats(args) => stats::execute(&args),
        Commands::Classify(args) => classify::execute(&args),
        Commands::Prompt(args) => handle_prompt(&args),
    }
}

fn handle_analyze(args: &cli::AnalyzeArgs) -> Result<()> {
    let config = AnalyzerConfig::load(args.config.as_deref())?;
    let request = read_request(
        &args.input,
        args.input_encoding.as_deref(),
        args.format,
        args.analysis_type.as_deref(),
    )?;
    info!(
        "Analyzing {} row(s) from {:?} with model '{}'",
        request.records.len(),
        args.input,
        config.model_id
    );
    let response = if args.offline {
        Analyzer::<HttpModelClient>::offline(config).analyze(&request)
    } else {
        match HttpModelClient::from_config(&config) {
            Ok(client) => Analyzer::new(config, client).analyze(&request),
            Err(err) => {
                warn!("Model client unavailable, returning local results only: {err}");
                Analyzer::<HttpModelClient>::unavailable(config, err).analyze(&request)
            }
        }
    };
    let rendered = serde_json::to_string_pretty(&response).context("Serializing response")?;
    io_utils::write_output(args.output.as_deref(), &rendered)
}

fn handle_prompt(args: &cli::PromptArgs) -> Result<()> {
    let config = AnalyzerConfig::load(args.config.as_deref())?;
    let request = read_request(
        &args.input,
        args.input_encoding.as_deref(),
        args.format,
        args.analysis_type.as_deref(),
    )?;
    let analyzer = Analyzer::<HttpModelClient>::offline(config);
    let local = analyzer.analyze_locally(&request);
    debug!(
        "Rendering prompt for {} (detected {})",
        local.resolved, local.classification.category
    );
    println!("{}", analyzer.render_prompt(&request, &local));
    Ok(())
}

fn read_request(
    input: &std::path::Path,
    encoding: Option<&str>,
    format: Option<cli::FormatArg>,
    analysis_type: Option<&str>,
) -> Result<AnalysisRequest> {
    let encoding = io_utils::resolve_encoding(encoding)?;
    let mut request = request::load_request(input, encoding)?;
    if let Some(format) = format {
        request.format = Some(format.into());
    }
    if let Some(raw) = analysis_type.map(str::trim).filter(|raw| !raw.is_empty()) {
        request.analysis_type = Some(AnalysisType::parse(raw));
    }
    Ok(request)
}
