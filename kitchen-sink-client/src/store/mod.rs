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

//! Application store.
//!
//! One task owns the [`AppState`] and applies [`Action`]s in arrival order.
//! Every SDK listener, controller and bootstrap step dispatches through a
//! cloneable [`StoreHandle`]; views read snapshots from a `watch` channel.
//!
//! ```no_run
//! # async fn example() {
//! use kitchen_sink_client::store::{spawn_store, Action, AppState, Dispatch};
//!
//! let (store, _task) = spawn_store(AppState::default());
//! store.dispatch(Action::CalleeChanged("8:acs:...".to_string()));
//! let state = store.wait_for(|s| !s.callee.is_empty()).await;
//! # }
//! ```

mod actions;
mod reducer;
mod state;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

pub use actions::Action;
pub use reducer::reduce;
pub use state::{
    AppState, CallView, Controls, EndedCall, ErrorKind, ErrorNotice, IncomingCallView,
    SessionStatus, VideoSource, VideoTile,
};

/// Anything that accepts actions.
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, action: Action);
}

#[derive(Clone)]
pub struct StoreHandle {
    actions: mpsc::UnboundedSender<Action>,
    state: watch::Receiver<AppState>,
}

impl StoreHandle {
    /// Latest published state.
    pub fn snapshot(&self) -> AppState {
        self.state.borrow().clone()
    }

    /// Receiver that is notified on every published state.
    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.state.clone()
    }

    /// Wait until a published state satisfies `predicate`.
    ///
    /// Returns `None` if the store task has stopped first.
    pub async fn wait_for(&self, predicate: impl FnMut(&AppState) -> bool) -> Option<AppState> {
        let mut rx = self.state.clone();
        let state = rx.wait_for(predicate).await.ok()?;
        Some(state.clone())
    }
}

impl Dispatch for StoreHandle {
    fn dispatch(&self, action: Action) {
        let name = action.name();
        if self.actions.send(action).is_err() {
            log::warn!("Store is closed, dropping {name}");
        }
    }
}

/// Spawn the store task on the current tokio runtime.
///
/// The task ends once every [`StoreHandle`] has been dropped.
pub fn spawn_store(initial: AppState) -> (StoreHandle, JoinHandle<()>) {
    let mut initial = initial;
    initial.controls = Controls::derive(&initial);

    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();
    let (state_tx, state_rx) = watch::channel(initial);

    let task = tokio::spawn(async move {
        while let Some(action) = action_rx.recv().await {
            log::debug!("Applying {}", action.name());
            state_tx.send_modify(|state| reduce(state, action));
        }
        log::debug!("Store task finished");
    });

    (
        StoreHandle {
            actions: action_tx,
            state: state_rx,
        },
        task,
    )
}
