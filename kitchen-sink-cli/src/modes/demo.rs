/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use identity_client::IdentityApiClient;
use kitchen_sink_client::sdk::CallState;
use kitchen_sink_client::{
    bootstrap, spawn_store, AppState, ClientConfig, IdentityBadge, IdentitySource,
    LoopbackCallClient, LoopbackNetwork, Session, StoreHandle, VoipController, VoipView,
};
use tokio::task::JoinHandle;
use tracing::info;

use crate::cli_args::DemoArgs;

const STEP_TIMEOUT: Duration = Duration::from_secs(10);

/// One signed-in user of the demo.
struct Party {
    name: &'static str,
    session: Session,
    store: StoreHandle,
    controller: Arc<VoipController<StoreHandle>>,
    printer: JoinHandle<()>,
}

impl Party {
    async fn sign_in(
        name: &'static str,
        identity: Arc<dyn IdentitySource>,
        sdk: LoopbackCallClient,
        config: &ClientConfig,
    ) -> anyhow::Result<Self> {
        let (store, _task) = spawn_store(AppState::new(config.callee_validation));
        let printer = print_changes(name, &store);

        let session = bootstrap(identity, &sdk, &store, config.token_refresh_margin)
            .await
            .with_context(|| format!("{name} could not start a session"))?;
        let ready = step(name, "session ready", store.wait_for(|s| s.is_ready())).await?;
        let badge = IdentityBadge::from_state(&ready);
        info!(
            "[{name}] {} as {}",
            badge.status,
            badge.user_id.as_deref().unwrap_or("-")
        );

        let controller = VoipController::start(&session, store.clone(), config.callee_validation);
        Ok(Self {
            name,
            session,
            store,
            controller,
            printer,
        })
    }

    async fn wait_for(
        &self,
        what: &str,
        predicate: impl FnMut(&AppState) -> bool,
    ) -> anyhow::Result<AppState> {
        step(self.name, what, self.store.wait_for(predicate)).await
    }
}

async fn step<F>(name: &str, what: &str, wait: F) -> anyhow::Result<AppState>
where
    F: Future<Output = Option<AppState>>,
{
    tokio::time::timeout(STEP_TIMEOUT, wait)
        .await
        .with_context(|| format!("[{name}] timed out waiting for {what}"))?
        .ok_or_else(|| anyhow!("[{name}] store stopped while waiting for {what}"))
}

/// Print the rendered view whenever it changes.
fn print_changes(name: &'static str, store: &StoreHandle) -> JoinHandle<()> {
    let mut rx = store.subscribe();
    tokio::spawn(async move {
        let mut last = String::new();
        loop {
            let line = VoipView::from_state(&rx.borrow_and_update()).to_string();
            if line != last {
                println!("{name:>6}: {line}");
                last = line;
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
    })
}

pub async fn run_demo(args: DemoArgs) -> anyhow::Result<()> {
    let config = super::load_config(args.url.as_ref())?;
    info!("Using Identity Issuer at {}", config.identity_api_url);
    let identity: Arc<dyn IdentitySource> =
        Arc::new(IdentityApiClient::new(&config.identity_api_url));

    let network = LoopbackNetwork::new();
    let caller_sdk = LoopbackCallClient::new(network.clone());
    let callee_sdk = if args.no_camera {
        LoopbackCallClient::new(network.clone()).without_cameras()
    } else {
        LoopbackCallClient::new(network.clone())
    };

    let caller = Party::sign_in("caller", Arc::clone(&identity), caller_sdk, &config).await?;
    let callee = Party::sign_in("callee", identity, callee_sdk, &config).await?;
    let callee_id = callee.session.user_id().to_string();

    caller.controller.set_callee(&callee_id);
    caller
        .wait_for("start call to be enabled", |s| s.controls.start_call)
        .await?;
    let call = caller.controller.start_call(&callee_id).await?;
    info!("[caller] Calling {callee_id} (call {})", call.id());

    callee
        .wait_for("the incoming call", |s| s.controls.accept)
        .await?;
    callee.controller.accept_incoming().await?;

    caller
        .wait_for("the call to connect", |s| {
            s.call
                .as_ref()
                .is_some_and(|c| c.state == CallState::Connected)
        })
        .await?;
    tokio::time::sleep(args.hold).await;

    caller.controller.hang_up().await?;
    for party in [&caller, &callee] {
        let ended = party
            .wait_for("the call to end", |s| s.call.is_none() && s.last_ended.is_some())
            .await?;
        if let Some(reason) = ended.last_ended.and_then(|e| e.end_reason) {
            info!("[{}] Call ended with {reason}", party.name);
        }
    }

    // Let the printers catch up before exiting.
    tokio::time::sleep(Duration::from_millis(50)).await;
    for party in [caller, callee] {
        party.printer.abort();
    }
    Ok(())
}
