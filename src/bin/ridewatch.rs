use std::sync::Arc;

use clap::Parser;
use ridewatch::{
    actors::poller::PollerHandle,
    config::read_config_file,
    provider::HttpTelemetryProvider,
    sampler::TelemetryEvent,
};
use tokio::sync::broadcast;
use tracing::{debug, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,
}

fn init() {
    dotenv::dotenv().ok();

    let filter = filter::Targets::new().with_targets(vec![
        ("ridewatch", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?;
    let provider = Arc::new(HttpTelemetryProvider::new(config.api_root()));

    // Setup-time authentication failure aborts loudly here; once running,
    // the poller reconnects on its own.
    let poller = PollerHandle::spawn(config, provider).await?;

    let events = poller.subscribe_events();
    tokio::spawn(log_events(events));

    let updates = poller.subscribe_updates();
    tokio::spawn(log_updates(updates, poller.clone()));

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    poller.shutdown().await?;

    Ok(())
}

async fn log_events(mut events: broadcast::Receiver<TelemetryEvent>) {
    loop {
        match events.recv().await {
            Ok(TelemetryEvent::RideOn { rider_id, count }) => {
                info!("{rider_id}: ride-on count is now {count}");
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("event subscriber lagged, skipped {skipped} events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn log_updates(
    mut updates: broadcast::Receiver<ridewatch::actors::messages::RiderUpdate>,
    poller: PollerHandle,
) {
    loop {
        match updates.recv().await {
            Ok(update) => {
                // Pull-based boundary: the notification only names the rider,
                // the current state is re-read through the handle.
                let Some(rider) = poller.rider(update.rider_id.clone()).await else {
                    continue;
                };
                debug!(
                    "{}: online={} speed={:.1} power={:.0} distance={:.0}",
                    rider.id,
                    rider.online,
                    rider.metrics.speed,
                    rider.metrics.power,
                    rider.metrics.distance
                );
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("update subscriber lagged, skipped {skipped} updates");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
