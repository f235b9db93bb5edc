// SPDX-License-Identifier: GPL-3.0-only

//! Headless preview surface
//!
//! A [`RenderTarget`] that keeps the latest presented frame and a frame
//! counter instead of drawing. The UI layer (or the CLI) drives its
//! lifecycle with [`available`](PreviewSurface::available),
//! [`resize`](PreviewSurface::resize) and [`destroy`](PreviewSurface::destroy).

use super::target::{ListenerId, RenderTarget, SurfaceEvent, SurfaceListener};
use crate::backends::camera::types::{PreviewFrame, Resolution};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct PreviewSurface {
    id: String,
    ready: AtomicBool,
    size: Mutex<Option<Resolution>>,
    desired_buffer_size: Mutex<Option<Resolution>>,
    listeners: Mutex<Vec<(ListenerId, SurfaceListener)>>,
    next_listener: AtomicU64,
    frames_presented: AtomicU64,
    last_frame: Mutex<Option<PreviewFrame>>,
}

impl PreviewSurface {
    /// Create a surface that is not yet backed by a buffer
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ready: AtomicBool::new(false),
            size: Mutex::new(None),
            desired_buffer_size: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
            frames_presented: AtomicU64::new(0),
            last_frame: Mutex::new(None),
        }
    }

    /// Create a surface that is already usable
    pub fn ready(id: impl Into<String>, size: Resolution) -> Self {
        let surface = Self::new(id);
        surface.ready.store(true, Ordering::SeqCst);
        *lock(&surface.size) = Some(size);
        surface
    }

    /// Mark the surface usable and notify listeners
    pub fn available(&self, size: Resolution) {
        *lock(&self.size) = Some(size);
        self.ready.store(true, Ordering::SeqCst);
        debug!(target_id = %self.id, size = %size, "Surface available");
        self.notify(SurfaceEvent::Available(size));
    }

    pub fn resize(&self, size: Resolution) {
        *lock(&self.size) = Some(size);
        self.notify(SurfaceEvent::SizeChanged(size));
    }

    /// Release the backing buffer and notify listeners
    pub fn destroy(&self) {
        self.ready.store(false, Ordering::SeqCst);
        debug!(target_id = %self.id, "Surface destroyed");
        self.notify(SurfaceEvent::Destroyed);
    }

    pub fn desired_buffer_size(&self) -> Option<Resolution> {
        *lock(&self.desired_buffer_size)
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented.load(Ordering::Relaxed)
    }

    pub fn last_frame(&self) -> Option<PreviewFrame> {
        lock(&self.last_frame).clone()
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    fn notify(&self, event: SurfaceEvent) {
        // Snapshot so listeners can unsubscribe while being called
        let listeners: Vec<SurfaceListener> = lock(&self.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&event);
        }
    }
}

impl RenderTarget for PreviewSurface {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn size(&self) -> Option<Resolution> {
        *lock(&self.size)
    }

    fn set_desired_buffer_size(&self, size: Resolution) {
        debug!(target_id = %self.id, size = %size, "Desired buffer size set");
        *lock(&self.desired_buffer_size) = Some(size);
    }

    fn subscribe(&self, listener: SurfaceListener) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        lock(&self.listeners).push((id, listener));
        id
    }

    fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = lock(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    fn present(&self, frame: PreviewFrame) {
        let count = self.frames_presented.fetch_add(1, Ordering::Relaxed) + 1;
        if count % 120 == 1 {
            debug!(target_id = %self.id, frames = count, width = frame.width, height = frame.height, "Presenting frame");
        }
        *lock(&self.last_frame) = Some(frame);
        self.notify(SurfaceEvent::Updated);
    }
}

impl std::fmt::Debug for PreviewSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewSurface")
            .field("id", &self.id)
            .field("ready", &self.is_ready())
            .field("size", &self.size())
            .field("frames_presented", &self.frames_presented())
            .finish()
    }
}
