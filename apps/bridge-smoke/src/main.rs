mod config;
mod logging;

use std::{process::ExitCode, time::Duration};

use config::{ConfigError, SmokeConfig};
use rtmp_bridge_core::{
    BridgeError, Command, PlayerSession, PlayerState, PublisherSession, PublisherState,
    SessionRuntimeHandle, SessionState, SessionUpdate, UpdateStream, spawn_runtime,
};
use rtmp_bridge_sim::{Failure, Script, SimulatedBackendFactory};
use thiserror::Error;
use tokio::{sync::broadcast::error::RecvError, time::timeout};
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
enum SmokeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error("timed out waiting for {wanted:?}")]
    Timeout { wanted: SessionState },
    #[error("session runtime closed its update stream")]
    UpdatesClosed,
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let config = match SmokeConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid smoke configuration");
            return ExitCode::FAILURE;
        }
    };

    let run_id = Uuid::new_v4();
    let result = async {
        publish(&config).await?;
        play(&config).await
    }
    .instrument(info_span!("smoke", %run_id))
    .await;

    match result {
        Ok(()) => {
            println!("RTMP bridge smoke run {run_id} finished.");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "smoke run failed");
            ExitCode::FAILURE
        }
    }
}

fn factory(config: &SmokeConfig, failure: Failure) -> SimulatedBackendFactory {
    let script = Script::default()
        .with_step_delay(config.step_delay())
        .with_failure(failure);
    let factory = SimulatedBackendFactory::new(script);
    match &config.license {
        Some(license) => factory.with_license(license.clone()),
        None => factory,
    }
}

async fn publish(config: &SmokeConfig) -> Result<(), SmokeError> {
    let props = config.publisher_config()?;
    info!(url = %props.url, "starting publisher session");

    let (session, queue) = PublisherSession::new(props, factory(config, Failure::None))?;
    let handle = spawn_runtime(session, queue);
    let mut updates = handle.subscribe();
    let wait = config.event_timeout();

    handle.dispatch(Command::StartPreview).await?;
    await_state(&mut updates, PublisherState::PreviewReady.into(), wait).await?;

    handle.dispatch(Command::Start).await?;
    await_state(&mut updates, PublisherState::Live.into(), wait).await?;

    // Hold the stream briefly so the live state is visible in the log.
    tokio::time::sleep(config.step_delay()).await;

    finish(&handle).await
}

async fn play(config: &SmokeConfig) -> Result<(), SmokeError> {
    let failure = if config.fail_player {
        Failure::ConnectTimeout
    } else {
        Failure::None
    };
    let props = config.player_config();
    info!(url = %props.url, ?failure, "starting player session");

    let (session, queue) = PlayerSession::new(props, factory(config, failure))?;
    let handle = spawn_runtime(session, queue);
    let mut updates = handle.subscribe();
    let wait = config.event_timeout();

    handle.dispatch(Command::Start).await?;
    await_state(&mut updates, PlayerState::Buffering.into(), wait).await?;

    if config.fail_player {
        await_state(&mut updates, PlayerState::Idle.into(), wait).await?;
        warn!("player timed out; reconnecting is left to the application");
        // The timeout already released the engine, so there is nothing to stop.
        handle.shutdown().await?;
        return Ok(());
    }

    await_state(&mut updates, PlayerState::Playing.into(), wait).await?;
    handle.dispatch(Command::Pause).await?;

    finish(&handle).await
}

async fn finish(handle: &SessionRuntimeHandle) -> Result<(), SmokeError> {
    handle.dispatch(Command::Stop).await?;
    handle.shutdown().await?;
    Ok(())
}

/// Print updates until the session reaches `wanted`.
async fn await_state(
    updates: &mut UpdateStream,
    wanted: SessionState,
    wait: Duration,
) -> Result<(), SmokeError> {
    let drained = timeout(wait, async {
        loop {
            match updates.recv().await {
                Ok(SessionUpdate::Event(event)) => {
                    println!("  event {} {:<20} {}", event.code, event.name(), event.message);
                }
                Ok(SessionUpdate::StateChanged(state)) => {
                    println!("  state {state:?}");
                    if state == wanted {
                        return Ok(());
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "update subscriber lagged");
                }
                Err(RecvError::Closed) => return Err(SmokeError::UpdatesClosed),
            }
        }
    })
    .await;

    drained.unwrap_or(Err(SmokeError::Timeout { wanted }))
}
