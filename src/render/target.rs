// SPDX-License-Identifier: GPL-3.0-only

//! Render target collaborator contract

use crate::backends::camera::types::{PreviewFrame, Resolution};
use std::sync::Arc;

/// Identifier of a listener registered on a render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Surface notification
///
/// Delivered to every subscribed listener; may fire many times over a
/// target's life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// The surface became usable at the given size
    Available(Resolution),
    SizeChanged(Resolution),
    Destroyed,
    /// A new frame was presented
    Updated,
}

/// Listener callback
pub type SurfaceListener = Arc<dyn Fn(&SurfaceEvent) + Send + Sync>;

/// Display-bound surface receiving preview frames
///
/// Owned by the UI layer. The session layer only observes readiness, sets
/// the desired buffer size and presents frames. Implementations must not
/// hold internal locks while invoking listeners, so a listener may
/// unsubscribe itself.
pub trait RenderTarget: Send + Sync {
    fn id(&self) -> &str;

    /// Surface is backed by a live buffer
    fn is_ready(&self) -> bool;

    /// Current pixel size, if known
    fn size(&self) -> Option<Resolution>;

    /// Size of the buffers the producer will fill
    fn set_desired_buffer_size(&self, size: Resolution);

    fn subscribe(&self, listener: SurfaceListener) -> ListenerId;

    /// Returns false if the listener was not registered
    fn unsubscribe(&self, id: ListenerId) -> bool;

    /// Hand over a frame for display
    fn present(&self, frame: PreviewFrame);
}
