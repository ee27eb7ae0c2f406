use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;

use routined::api;
use routined::api::AppState;
use routined::config::Config;
use routined::config::VoiceConfig;
use routined::generate::HttpGenerator;
use routined::generate::RecommendFlow;
use routined::routine::AnthropicClient;
use routined::routine::Policy;
use routined::routine::RoutinePipeline;
use routined::voice::GoogleSttClient;
use routined::voice::HumeClient;
use routined::voice::VoiceFlow;

#[derive(Parser)]
#[command(name = "routined", about = "Smart-home routine recommendation daemon")]
struct Args {
    /// Path to the TOML config file
    #[arg(long, default_value = "routined.toml")]
    config: PathBuf,

    /// Override the listen address from the config
    #[arg(long)]
    listen: Option<String>,

    /// Override the listen port from the config
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config.display()))?;

    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::from(config.logging.level))
        .init();

    tracing::info!("routined starting");
    tracing::info!("Loaded config from: {}", args.config.display());

    let api_key = config.language_model.api_key()?;
    let model = Arc::new(
        AnthropicClient::new(&config.language_model, api_key)
            .context("failed to build language model client")?,
    );
    let pipeline = RoutinePipeline::new(model, Policy::Lenient);

    let generator = Arc::new(
        HttpGenerator::new(&config.generator).context("failed to build generator client")?,
    );
    let recommend = Arc::new(RecommendFlow::new(
        generator,
        pipeline,
        config.generator.cache_capacity,
        config.generator.max_attempts,
    ));

    let voice = match &config.voice {
        Some(voice_config) => Some(Arc::new(build_voice_flow(voice_config)?)),
        None => {
            tracing::info!("Voice analysis not configured, /v1/voice_analysis disabled");
            None
        }
    };

    let listen = args.listen.unwrap_or(config.server.listen);
    let port = args.port.unwrap_or(config.server.port);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {e}");
            return;
        }
        tracing::info!("Received ctrl-c, shutting down");
        let _ = shutdown_tx.send(());
    });

    api::serve(listen, port, AppState::new(recommend, voice), shutdown_rx)
        .await
        .map_err(|e| anyhow::anyhow!("server error: {e}"))
}

fn build_voice_flow(config: &VoiceConfig) -> anyhow::Result<VoiceFlow> {
    let timeout = Duration::from_secs(config.timeout_secs);

    let stt = GoogleSttClient::new(&config.stt_base_url, config.stt_api_key()?, timeout)
        .context("failed to build speech-to-text client")?;
    let emotion = HumeClient::new(&config.hume_base_url, config.hume_api_key()?, timeout)
        .context("failed to build emotion analysis client")?;

    Ok(VoiceFlow::new(
        Arc::new(stt),
        Arc::new(emotion),
        Duration::from_secs(config.poll_interval_secs),
        Duration::from_secs(config.max_wait_secs),
    ))
}
