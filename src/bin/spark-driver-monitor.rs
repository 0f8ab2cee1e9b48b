use clap::Parser;
use color_eyre::config::Frame;
use eyre::Result;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, Level};
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{filter::Directive, EnvFilter};
use uuid::Uuid;

use spark_driver_monitor::{client, new_leaked_tags, Config, LeakReaper};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<ExitCode> {
    let config = Config::parse();

    init_tracing_subscriber()?;
    install_color_eyre()?;
    print_build_info();

    let shutdown = CancellationToken::new();
    if let Err(err) = try_main(config, shutdown.clone()).await {
        error!(?err, "failed to start spark-driver-monitor");
        return Ok(ExitCode::FAILURE);
    }

    select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received interrupt, shutting down");
        }
        _ = shutdown.cancelled() => {
            info!("shutdown requested internally");
        }
    }
    shutdown.cancel();

    info!("bye!");
    Ok(ExitCode::SUCCESS)
}

async fn try_main(config: Config, shutdown: CancellationToken) -> Result<()> {
    let instance_id = Uuid::new_v4();
    info!(%instance_id, "starting spark-driver-monitor");

    client::init(&config).await?;
    let cluster_client = client::get();

    let leaked_tags = new_leaked_tags();
    let reaper = LeakReaper::new(
        cluster_client,
        leaked_tags,
        Arc::new(config),
        shutdown.clone(),
    );
    tokio::spawn(reaper.run());

    info!("leak reaper started");
    Ok(())
}

fn selfish_frame_filter(frames: &mut Vec<&Frame>) {
    frames.retain(|frame| {
        matches!(frame.name.as_ref(),
            Some(name) if name == "spark_driver_monitor"
            || name.starts_with("spark_driver_monitor::"))
    });
}

fn init_tracing_subscriber() -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(Directive::from(Level::INFO))
        .from_env()?;

    let fmt = tracing_subscriber::fmt::layer().with_filter(filter);

    tracing_subscriber::registry()
        .with(fmt)
        .with(ErrorLayer::default())
        .try_init()?;

    Ok(())
}

fn install_color_eyre() -> Result<()> {
    color_eyre::config::HookBuilder::new()
        .capture_span_trace_by_default(true)
        .add_frame_filter(Box::new(selfish_frame_filter))
        .install()?;
    Ok(())
}

fn print_build_info() {
    info!("tag: {}", env!("VERGEN_GIT_DESCRIBE"));
    debug!("branch: {}", env!("VERGEN_GIT_BRANCH"));
    debug!("commit: {}", env!("VERGEN_GIT_SHA"));
    debug!("commit date: {}", env!("VERGEN_GIT_COMMIT_DATE"));

    debug!("rustc: {}", env!("VERGEN_RUSTC_SEMVER"));
    debug!("build date: {}", env!("VERGEN_BUILD_TIMESTAMP"));
}
