use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use raagalyzer::cli::{AnalyzeArgs, Cli, Command, ServeArgs};
use raagalyzer::server::run_server;
use raagalyzer::Analyzer;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Command::Serve(args) => serve(&args),
        Command::Analyze(args) => analyze(&args),
    }
}

fn serve(args: &ServeArgs) -> Result<()> {
    let config = args.server_config()?;
    let analyzer = Analyzer::from_config(&config.models)?;
    info!(
        backend = analyzer.pitch_backend(),
        origins = ?config.allowed_origins,
        max_upload_bytes = config.max_upload_bytes,
        "starting server"
    );

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(run_server(analyzer, config))
}

fn analyze(args: &AnalyzeArgs) -> Result<()> {
    anyhow::ensure!(
        args.input.is_file(),
        "Input file does not exist: {:?}",
        args.input
    );
    let analyzer = Analyzer::from_config(&args.models.model_config()?)?;
    let response = analyzer.analyze_file(&args.input);

    let json = if args.pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    }
    .context("failed to serialize analysis result")?;
    println!("{json}");
    Ok(())
}
