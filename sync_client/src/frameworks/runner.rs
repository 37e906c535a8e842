// Framework bootstrap for the headless participant.

use crate::frameworks::{config, headless::HeadlessPresentation};
use crate::interface_adapters::{LinkSettings, connect};
use crate::use_cases::ClientSyncAgent;

use std::io::{Error, Result};
use sync_protocol::identity;
use tokio::time::{MissedTickBehavior, interval};
use tracing::Instrument;

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Runs one headless participant until the relay goes away or ctrl-c arrives.
pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let url = config::server_url();
    let settings = LinkSettings {
        outbound_capacity: config::OUTBOUND_CHANNEL_CAPACITY,
        inbound_capacity: config::INBOUND_CHANNEL_CAPACITY,
    };

    let link = connect(&url, settings).await.map_err(|e| {
        tracing::error!(%url, error = %e, "failed to connect");
        Error::other(e)
    })?;

    let local_id = identity::generate();
    let span = tracing::info_span!("participant", participant_id = %local_id);
    let agent = ClientSyncAgent::new(local_id, link);

    drive(agent, HeadlessPresentation::new(48.0, 48.0))
        .instrument(span)
        .await;

    Ok(())
}

async fn drive(mut agent: ClientSyncAgent<u64>, mut scene: HeadlessPresentation) {
    tracing::info!("joined session");

    let mut ticker = interval(config::tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                scene.step();
                let report = agent.tick(&mut scene);
                if report.actions_applied > 0 {
                    tracing::debug!(
                        tables = report.tables_applied,
                        actions = report.actions_applied,
                        remote = agent.registry().len(),
                        "reconciled"
                    );
                }
                if !report.connected {
                    break;
                }
            }
            _ = &mut shutdown => {
                tracing::info!("shutting down");
                break;
            }
        }
    }
}
