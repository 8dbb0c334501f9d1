//! Optimistic favorite/star/follow button state.
//!
//! `toggle` flips what the user sees right away and hands the backend
//! work to a single reconcile task. The task keeps sending idempotent
//! set mutations until the confirmed state matches the latest desired
//! state, so clicks that land while a request is in flight are folded in
//! instead of racing it. A failure puts the displayed state back to the
//! last confirmed value.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;

use super::FavoriteKind;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToggleError {
    #[error("Please sign in to save favorites.")]
    SignInRequired,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Saving failed: {0}")]
    Failed(String),
}

/// Backend side of a toggle: set membership to `on` and return the
/// state the backend ended up with.
#[async_trait]
pub trait FavoriteMutation: Send + Sync + 'static {
    async fn set_favorite(
        &self,
        kind: FavoriteKind,
        entity_id: &str,
        on: bool,
    ) -> Result<bool, ToggleError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToggleState {
    /// What the button shows
    pub displayed: bool,
    /// Last state the backend acknowledged
    pub confirmed: bool,
    /// A mutation is in flight
    pub pending: bool,
    /// Error from the most recent failed reconcile, cleared on the next toggle
    pub error: Option<ToggleError>,
}

struct Inner {
    desired: bool,
    confirmed: bool,
    running: bool,
    error: Option<ToggleError>,
}

impl Inner {
    fn state(&self) -> ToggleState {
        ToggleState {
            displayed: self.desired,
            confirmed: self.confirmed,
            pending: self.running,
            error: self.error.clone(),
        }
    }
}

pub struct FavoriteToggle<M> {
    kind: FavoriteKind,
    entity_id: Arc<str>,
    mutation: Arc<M>,
    inner: Arc<Mutex<Inner>>,
    state_tx: Arc<watch::Sender<ToggleState>>,
}

impl<M> Clone for FavoriteToggle<M> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            entity_id: Arc::clone(&self.entity_id),
            mutation: Arc::clone(&self.mutation),
            inner: Arc::clone(&self.inner),
            state_tx: Arc::clone(&self.state_tx),
        }
    }
}

impl<M: FavoriteMutation> FavoriteToggle<M> {
    pub fn new(kind: FavoriteKind, entity_id: &str, initial: bool, mutation: Arc<M>) -> Self {
        let inner = Inner {
            desired: initial,
            confirmed: initial,
            running: false,
            error: None,
        };
        let (state_tx, _) = watch::channel(inner.state());
        Self {
            kind,
            entity_id: Arc::from(entity_id),
            mutation,
            inner: Arc::new(Mutex::new(inner)),
            state_tx: Arc::new(state_tx),
        }
    }

    pub fn state(&self) -> ToggleState {
        self.lock().state()
    }

    pub fn subscribe(&self) -> watch::Receiver<ToggleState> {
        self.state_tx.subscribe()
    }

    /// Flip the displayed state and return it. Must be called from within
    /// a tokio runtime.
    pub fn toggle(&self) -> bool {
        let (displayed, spawn) = {
            let mut inner = self.lock();
            inner.desired = !inner.desired;
            inner.error = None;
            let spawn = !inner.running;
            inner.running = true;
            self.publish(&inner);
            (inner.desired, spawn)
        };
        if spawn {
            let this = self.clone();
            tokio::spawn(async move { this.reconcile().await });
        }
        displayed
    }

    /// Wait until no mutation is in flight and return the final state.
    pub async fn settled(&self) -> ToggleState {
        let mut rx = self.subscribe();
        match rx.wait_for(|state| !state.pending).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    async fn reconcile(self) {
        loop {
            let target = {
                let mut inner = self.lock();
                if inner.desired == inner.confirmed {
                    inner.running = false;
                    self.publish(&inner);
                    return;
                }
                inner.desired
            };

            let result = self
                .mutation
                .set_favorite(self.kind, &self.entity_id, target)
                .await;

            let mut inner = self.lock();
            match result {
                Ok(state) if state == target => {
                    inner.confirmed = state;
                    self.publish(&inner);
                }
                Ok(state) => {
                    tracing::warn!(
                        "{} {} came back {} after asking for {}",
                        self.kind.label(),
                        self.entity_id,
                        state,
                        target
                    );
                    inner.confirmed = state;
                    inner.desired = state;
                    inner.running = false;
                    inner.error = Some(ToggleError::Failed("state changed elsewhere".into()));
                    self.publish(&inner);
                    return;
                }
                Err(err) => {
                    tracing::error!(
                        "Favorite toggle error for {} {}: {}",
                        self.kind.label(),
                        self.entity_id,
                        err
                    );
                    inner.desired = inner.confirmed;
                    inner.running = false;
                    inner.error = Some(err);
                    self.publish(&inner);
                    return;
                }
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // State is plain data, a panic elsewhere can't leave it half written
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, inner: &Inner) {
        self.state_tx.send_replace(inner.state());
    }
}
