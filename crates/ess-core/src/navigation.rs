//! Navigation targets for post-login routing and forced logout

use crate::config::RouteConfig;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Entry points the session layer can send the user to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// Login form; reached after logout or an unrecoverable refresh failure
    Login,
    /// Onboarding flow for employees still being onboarded
    Onboarding,
    /// Main dashboard
    Dashboard,
}

/// Receives navigation decisions from the session layer
pub trait Navigator: Send + Sync {
    /// Move to `destination`
    fn navigate(&self, destination: Destination);

    /// Where the last navigation went
    fn current(&self) -> Option<Destination>;
}

/// Navigator that publishes the current destination on a watch channel
#[derive(Debug)]
pub struct WatchNavigator {
    tx: watch::Sender<Option<Destination>>,
    routes: RouteConfig,
}

impl WatchNavigator {
    pub fn new(routes: RouteConfig) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx, routes }
    }

    /// Subscribe to destination changes
    pub fn subscribe(&self) -> watch::Receiver<Option<Destination>> {
        self.tx.subscribe()
    }

    /// Path of the current destination, if any
    pub fn current_path(&self) -> Option<String> {
        self.current()
            .map(|destination| self.routes.path_for(destination).to_string())
    }
}

impl Default for WatchNavigator {
    fn default() -> Self {
        Self::new(RouteConfig::default())
    }
}

impl Navigator for WatchNavigator {
    fn navigate(&self, destination: Destination) {
        tracing::debug!(
            path = self.routes.path_for(destination),
            "navigating to {:?}",
            destination
        );
        self.tx.send_replace(Some(destination));
    }

    fn current(&self) -> Option<Destination> {
        *self.tx.borrow()
    }
}
