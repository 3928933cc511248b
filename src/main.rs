use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use soundtrack_finder::audio::{AudioBackendConfig, AudioSource, BackendCapture};
use soundtrack_finder::config::MAX_CAPTURE_SECS;
use soundtrack_finder::finder::{render, FinderOptions, SongFinder};
use soundtrack_finder::{
    create_router, AppState, AudioCapture, Config, LlmSoundtrackSource, RecognitionClient,
    SongRecognizer, SoundtrackClient,
};
use tracing::{info, info_span, Instrument};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "soundtrack-finder")]
#[command(about = "Identify a song and find the movies and TV shows that use it")]
struct Args {
    /// Configuration file (extension optional)
    #[arg(short, long, default_value = "config/soundtrack-finder")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record a clip, identify it and look up its soundtrack placements
    Listen {
        /// Recording length in seconds
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..=MAX_CAPTURE_SECS))]
        duration: Option<u64>,

        /// Use a WAV file instead of the microphone
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Soundtrack service base URL
        #[arg(long)]
        lookup_url: Option<String>,
    },
    /// Identify the song in a WAV file without looking up soundtracks
    Identify {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Run the soundtrack lookup service
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut cfg = Config::load(&args.config)?;

    match args.command {
        Command::Listen {
            duration,
            file,
            lookup_url,
        } => {
            if let Some(duration) = duration {
                cfg.capture.duration_secs = duration;
            }
            if let Some(url) = lookup_url {
                cfg.lookup.base_url = url;
            }
            listen(&cfg, file).await
        }
        Command::Identify { file } => identify(&cfg, file).await,
        Command::Serve { port } => {
            if let Some(port) = port {
                cfg.service.http.port = port;
            }
            serve(&cfg).await
        }
    }
}

fn backend_config(cfg: &Config) -> AudioBackendConfig {
    AudioBackendConfig {
        target_sample_rate: cfg.capture.sample_rate,
        target_channels: cfg.capture.channels,
        buffer_duration_ms: cfg.capture.buffer_ms,
    }
}

fn recognition_client(cfg: &Config) -> Result<RecognitionClient> {
    if !cfg.recognition.is_configured() {
        bail!(
            "Recognition credentials missing: set ACR_CLOUD_ACCESS_KEY, \
             ACR_CLOUD_ACCESS_SECRET and ACR_CLOUD_HOST (or the [recognition] config section)"
        );
    }
    RecognitionClient::new(cfg.recognition.clone()).context("Failed to build recognition client")
}

async fn listen(cfg: &Config, file: Option<PathBuf>) -> Result<()> {
    let source = match file {
        Some(path) => AudioSource::File(path),
        None => AudioSource::Microphone,
    };

    let capture = BackendCapture::new(source, backend_config(cfg))
        .with_normalization(cfg.capture.normalize);
    let recognizer = recognition_client(cfg)?;
    let lookup = SoundtrackClient::new(&cfg.lookup).context("Failed to build lookup client")?;

    let finder = SongFinder::new(
        Arc::new(capture),
        Arc::new(recognizer),
        Arc::new(lookup),
        FinderOptions {
            capture_duration: cfg.capture.duration(),
            still_working_after: Duration::from_secs(cfg.lookup.still_working_after_secs),
        },
    );

    println!("{}", finder.status().message);

    // Print status messages as the cycle progresses
    let mut status_rx = finder.subscribe();
    let printer = tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let status = status_rx.borrow_and_update().clone();
            if status.busy && !status.message.is_empty() {
                println!("{}", status.message);
            }
        }
    });

    let run_id = uuid::Uuid::new_v4();
    let outcome = finder
        .run()
        .instrument(info_span!("listen", %run_id))
        .await?;

    drop(finder);
    let _ = printer.await;

    print!("{}", render(&outcome));
    Ok(())
}

async fn identify(cfg: &Config, file: PathBuf) -> Result<()> {
    let recognizer = recognition_client(cfg)?;
    let capture = BackendCapture::new(AudioSource::File(file), backend_config(cfg))
        .with_normalization(cfg.capture.normalize);

    let clip = capture.capture(cfg.capture.duration()).await?;

    match recognizer.recognize(&clip).await {
        Some(song) => println!("🎵 Recognized: {}", song),
        None => println!("❌ No song recognized."),
    }
    Ok(())
}

async fn serve(cfg: &Config) -> Result<()> {
    if cfg.sources.openai_api_key.as_deref().unwrap_or_default().is_empty() {
        bail!("OPENAI_API_KEY (or sources.openai_api_key) is required to serve lookups");
    }

    let source = LlmSoundtrackSource::new(&cfg.sources).context("Failed to build soundtrack source")?;
    let state = AppState::new(Arc::new(source));
    let app = create_router(state, &cfg.service.http.allowed_origins);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("{} listening on {}", cfg.service.name, addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("HTTP server failed")?;

    Ok(())
}
