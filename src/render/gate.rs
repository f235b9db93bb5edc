// SPDX-License-Identifier: GPL-3.0-only

//! Bind-when-ready gate for render targets
//!
//! A render target may not be backed by a live surface when its session is
//! created. [`RenderTargetGate::bind`] runs a callback as soon as the target
//! is usable: immediately if it already is, otherwise on its first
//! `Available` notification through a one-shot subscription that removes
//! itself after delivering once. Later surface notifications never reach the
//! callback.

use super::target::{ListenerId, RenderTarget, SurfaceEvent};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, Weak};
use tracing::debug;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Result of [`RenderTargetGate::bind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// Target was ready; the callback already ran
    Immediate,
    /// Callback will run on the target's first `Available` notification
    Deferred,
    /// A bind for this target is already waiting; nothing was registered
    AlreadyPending,
}

/// A bind waiting for its target, keyed by target identity
struct PendingBind {
    target_id: String,
    target: Weak<dyn RenderTarget>,
}

type PendingBinds = Arc<Mutex<Vec<PendingBind>>>;

/// Subscription that delivers at most once, then unsubscribes
struct OneShot {
    target_id: String,
    target: Weak<dyn RenderTarget>,
    callback: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    listener: OnceLock<ListenerId>,
    pending: PendingBinds,
}

impl OneShot {
    fn fire(&self) {
        let Some(callback) = lock(&self.callback).take() else {
            return;
        };
        lock(&self.pending).retain(|bind| !Weak::ptr_eq(&bind.target, &self.target));
        self.detach();
        debug!(target_id = %self.target_id, "Render target ready, releasing bind");
        callback();
    }

    fn detach(&self) {
        if let (Some(target), Some(id)) = (self.target.upgrade(), self.listener.get()) {
            target.unsubscribe(*id);
        }
    }

    fn has_fired(&self) -> bool {
        lock(&self.callback).is_none()
    }
}

/// Tracks targets with a bind in flight
///
/// Entries whose target has been dropped are evicted, so a recreated target
/// with the same id binds afresh.
#[derive(Clone, Default)]
pub struct RenderTargetGate {
    pending: PendingBinds,
}

impl RenderTargetGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `on_ready` once the target is usable
    pub fn bind<F>(&self, target: &Arc<dyn RenderTarget>, on_ready: F) -> BindOutcome
    where
        F: FnOnce() + Send + 'static,
    {
        if target.is_ready() {
            on_ready();
            return BindOutcome::Immediate;
        }

        let target_id = target.id().to_string();
        let weak = Arc::downgrade(target);
        {
            let mut pending = lock(&self.pending);
            pending.retain(|bind| bind.target.strong_count() > 0);
            if pending.iter().any(|bind| Weak::ptr_eq(&bind.target, &weak)) {
                debug!(target_id = %target_id, "Bind already pending for render target");
                return BindOutcome::AlreadyPending;
            }
            pending.push(PendingBind {
                target_id: target_id.clone(),
                target: weak.clone(),
            });
        }

        let shot = Arc::new(OneShot {
            target_id: target_id.clone(),
            target: weak,
            callback: Mutex::new(Some(Box::new(on_ready))),
            listener: OnceLock::new(),
            pending: Arc::clone(&self.pending),
        });

        let listener_shot = Arc::clone(&shot);
        let id = target.subscribe(Arc::new(move |event: &SurfaceEvent| {
            if matches!(event, SurfaceEvent::Available(_)) {
                listener_shot.fire();
            }
        }));
        let _ = shot.listener.set(id);

        if shot.has_fired() {
            // Delivered before the listener id was known
            shot.detach();
        } else if target.is_ready() {
            // Became ready between the readiness check and the subscribe
            shot.fire();
        }

        debug!(target_id = %target_id, "Waiting for render target");
        BindOutcome::Deferred
    }

    /// A bind for a live target with this id is waiting for readiness
    pub fn is_pending(&self, target_id: &str) -> bool {
        lock(&self.pending)
            .iter()
            .any(|bind| bind.target_id == target_id && bind.target.strong_count() > 0)
    }
}
