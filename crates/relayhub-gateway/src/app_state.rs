//! Shared application state for the hub.
//!
//! Wires the realtime core, dispatcher, and the auth/store collaborators.
//! Cloned into every handler; everything behind it is `Arc`.

use std::sync::Arc;

use tokio::sync::watch;

use crate::auth::{self, Authenticator};
use crate::config::HubConfig;
use crate::dispatch::Dispatcher;
use crate::realtime::RealtimeCore;
use crate::store::{MemoryStore, MessageStore};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    realtime: Arc<RealtimeCore>,
    dispatcher: Arc<Dispatcher>,
}

struct AppStateInner {
    cfg: HubConfig,
    store: Arc<dyn MessageStore>,
    auth: Arc<dyn Authenticator>,
    shutdown: watch::Sender<bool>,
}

impl AppState {
    pub fn new(cfg: HubConfig, store: Arc<dyn MessageStore>, auth: Arc<dyn Authenticator>) -> Self {
        let realtime = Arc::new(RealtimeCore::new(cfg.hub.send_timeout()));
        let dispatcher = Arc::new(Dispatcher::new(store.clone()));
        let (shutdown, _) = watch::channel(false);

        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                store,
                auth,
                shutdown,
            }),
            realtime,
            dispatcher,
        }
    }

    /// In-memory store plus the authenticator selected by `auth.mode`.
    pub fn from_config(cfg: HubConfig) -> Self {
        let auth = auth::from_config(&cfg.auth);
        Self::new(cfg, Arc::new(MemoryStore::new()), auth)
    }

    pub fn cfg(&self) -> &HubConfig {
        &self.inner.cfg
    }

    pub fn store(&self) -> Arc<dyn MessageStore> {
        Arc::clone(&self.inner.store)
    }

    pub fn auth(&self) -> &dyn Authenticator {
        self.inner.auth.as_ref()
    }

    pub fn realtime(&self) -> Arc<RealtimeCore> {
        Arc::clone(&self.realtime)
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn shutdown_rx(&self) -> watch::Receiver<bool> {
        self.inner.shutdown.subscribe()
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.inner.shutdown.borrow()
    }

    /// Flip the shutdown flag and close every live socket. Safe to call more
    /// than once; each socket is closed exactly once overall.
    pub fn begin_shutdown(&self) -> usize {
        self.inner.shutdown.send_replace(true);
        let closed = self.realtime.shutdown();
        tracing::info!(closed, "hub shutdown: sessions closed");
        closed
    }
}
