mod cli;

use clap::Parser;
use cli::{Cli, Commands, Overrides, RunArgs};
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use camgrab::config::GrabberSettings;
use camgrab::grabber::Grabber;
use camgrab::handlers::{HandlerRegistry, ResultRecord};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run(cli.config, args).await?,
        Commands::Once(overrides) => once(cli.config, overrides).await?,
        Commands::Config(overrides) => {
            let settings = settings(cli.config, overrides)?;
            print!("{}", settings.to_toml()?);
        }
    }

    Ok(())
}

fn settings(path: Option<PathBuf>, overrides: Overrides) -> Result<GrabberSettings, AnyError> {
    let mut settings = GrabberSettings::load_unvalidated(path)?;
    overrides.apply(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn grabber(settings: GrabberSettings) -> Result<Grabber, AnyError> {
    let config = settings.into_grabber_config(&HandlerRegistry::with_defaults())?;
    Ok(Grabber::new(config))
}

async fn once(path: Option<PathBuf>, overrides: Overrides) -> Result<(), AnyError> {
    let mut grabber = grabber(settings(path, overrides)?)?;
    let record = grabber.tick().await?;
    println!("{}", summary(&record));
    Ok(())
}

async fn run(path: Option<PathBuf>, args: RunArgs) -> Result<(), AnyError> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let mut grabber = grabber(settings(path, args.overrides)?)?.with_shutdown(shutdown_rx);

    loop {
        let remaining = args
            .count
            .map(|count| count.saturating_sub(grabber.stats().ticks));

        match grabber.run(remaining).await {
            Ok(()) => break,
            Err(err) if args.keep_going => {
                warn!(error = %err, "Tick failed, continuing");
                grabber.wait_interval().await;
            }
            Err(err) => return Err(err.into()),
        }
    }

    info!(stats = ?grabber.stats(), "camgrab stopped");
    Ok(())
}

fn summary(record: &ResultRecord) -> String {
    match (&record.error, &record.save_path_full) {
        (Some(err), _) => format!("{} ignored error: {err}", record.requested_at),
        (None, Some(path)) if record.is_saved => {
            format!("{} saved {}", record.requested_at, path.display())
        }
        (None, _) => format!("{} grabbed, not saved", record.requested_at),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
