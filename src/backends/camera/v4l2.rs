// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 camera platform
//!
//! Drives `/dev/videoN` capture nodes through the `v4l` crate. Device ids are
//! the node indices ("0" for `/dev/video0`). Opening and configuring run on
//! short-lived helper threads so callers never block on driver ioctls;
//! completions are posted through the session's [`EventSender`].
//!
//! A capture session is a memory-mapped buffer stream at the requested size.
//! Each repeating-request iteration dequeues one buffer and copies it out.

use super::CameraPlatform;
use super::types::*;
use super::v4l2_utils::{self, facing_from_bus_info, node_path, query_node_caps};
use crate::constants::v4l2::{BUFFER_COUNT, FRAME_TIMEOUT};
use crate::session::events::{DeviceEvent, EventSender};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::framesize::FrameSizeEnum;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

struct OpenDevice {
    device: Device,
    token: u64,
}

struct StreamSession {
    device: DeviceHandle,
    size: Resolution,
    format: PixelFormat,
    stream: Mutex<MmapStream<'static>>,
}

#[derive(Default)]
struct V4l2State {
    next_token: u64,
    devices: HashMap<DeviceId, OpenDevice>,
    sessions: HashMap<u64, Arc<StreamSession>>,
}

impl V4l2State {
    fn mint_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }
}

fn lock(state: &Mutex<V4l2State>) -> MutexGuard<'_, V4l2State> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// V4L2 platform implementation
pub struct V4l2Platform {
    state: Arc<Mutex<V4l2State>>,
}

impl Default for V4l2Platform {
    fn default() -> Self {
        Self::new()
    }
}

impl V4l2Platform {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(V4l2State::default())),
        }
    }
}

/// Supported sizes in driver order, deduplicated across pixel formats
///
/// Stepwise ranges contribute their maximum size.
fn enumerate_sizes(dev: &Device) -> std::io::Result<Vec<Resolution>> {
    let mut sizes: Vec<Resolution> = Vec::new();

    for fmt_desc in dev.enum_formats()? {
        let Ok(frame_sizes) = dev.enum_framesizes(fmt_desc.fourcc) else {
            continue;
        };
        for frame_size in frame_sizes {
            let size = match frame_size.size {
                FrameSizeEnum::Discrete(discrete) => {
                    Resolution::new(discrete.width, discrete.height)
                }
                FrameSizeEnum::Stepwise(step) => Resolution::new(step.max_width, step.max_height),
            };
            if !sizes.contains(&size) {
                sizes.push(size);
            }
        }
    }

    Ok(sizes)
}

/// First pixel format that supports `size`, falling back to the current one
fn select_fourcc(dev: &Device, size: Resolution) -> std::io::Result<FourCC> {
    for fmt_desc in dev.enum_formats()? {
        let Ok(frame_sizes) = dev.enum_framesizes(fmt_desc.fourcc) else {
            continue;
        };
        let supported = frame_sizes.iter().any(|fs| match &fs.size {
            FrameSizeEnum::Discrete(d) => d.width == size.width && d.height == size.height,
            FrameSizeEnum::Stepwise(s) => {
                (s.min_width..=s.max_width).contains(&size.width)
                    && (s.min_height..=s.max_height).contains(&size.height)
            }
        });
        if supported {
            return Ok(fmt_desc.fourcc);
        }
    }

    Ok(dev.format()?.fourcc)
}

fn error_code(err: &std::io::Error) -> i32 {
    err.raw_os_error()
        .unwrap_or(error_codes::ERROR_CAMERA_DEVICE)
}

fn open_device(state: &Mutex<V4l2State>, id: DeviceId, events: EventSender) {
    if lock(state).devices.contains_key(&id) {
        events.send(DeviceEvent::Error(error_codes::ERROR_CAMERA_IN_USE));
        return;
    }

    let path = node_path(id.as_str());
    let device = match Device::with_path(&path) {
        Ok(device) => device,
        Err(e) => {
            warn!(device = %id, path = %path.display(), error = %e, "Failed to open V4L2 device");
            events.send(DeviceEvent::Error(error_code(&e)));
            return;
        }
    };

    let mut guard = lock(state);
    // Another opener may have won the race while the node was opening
    if guard.devices.contains_key(&id) {
        drop(guard);
        events.send(DeviceEvent::Error(error_codes::ERROR_CAMERA_IN_USE));
        return;
    }
    let token = guard.mint_token();
    guard.devices.insert(id.clone(), OpenDevice { device, token });
    drop(guard);

    info!(device = %id, path = %path.display(), "V4L2 device opened");
    events.send(DeviceEvent::Opened(DeviceHandle {
        device_id: id,
        token,
    }));
}

fn configure_stream(
    state: &Mutex<V4l2State>,
    handle: &DeviceHandle,
    size: Resolution,
) -> Result<u64, String> {
    let mut guard = lock(state);
    let open = guard
        .devices
        .get_mut(&handle.device_id)
        .filter(|d| d.token == handle.token)
        .ok_or_else(|| "device handle is not open".to_string())?;

    let fourcc = select_fourcc(&open.device, size).map_err(|e| e.to_string())?;
    let applied = open
        .device
        .set_format(&Format::new(size.width, size.height, fourcc))
        .map_err(|e| format!("failed to set format: {}", e))?;

    if applied.width != size.width || applied.height != size.height {
        return Err(format!(
            "driver adjusted {} to {}x{}",
            size, applied.width, applied.height
        ));
    }

    let mut stream = MmapStream::with_buffers(&mut open.device, Type::VideoCapture, BUFFER_COUNT)
        .map_err(|e| format!("failed to create buffer stream: {}", e))?;
    stream.set_timeout(FRAME_TIMEOUT);

    let format = PixelFormat::from_fourcc(&applied.fourcc.repr);
    debug!(device = %handle.device_id, size = %size, format = %format, "V4L2 stream configured");

    let token = guard.mint_token();
    guard.sessions.insert(
        token,
        Arc::new(StreamSession {
            device: handle.clone(),
            size,
            format,
            stream: Mutex::new(stream),
        }),
    );
    Ok(token)
}

impl CameraPlatform for V4l2Platform {
    fn platform_type(&self) -> PlatformType {
        PlatformType::V4l2
    }

    fn device_ids(&self) -> BackendResult<Vec<DeviceId>> {
        let ids: Vec<DeviceId> = v4l2_utils::list_video_nodes()
            .into_iter()
            .filter(|(_, path)| {
                query_node_caps(path)
                    .map(|caps| caps.is_streaming_capture())
                    .unwrap_or(false)
            })
            .map(|(index, _)| DeviceId::new(index.to_string()))
            .collect();

        debug!(count = ids.len(), "Enumerated V4L2 capture nodes");
        Ok(ids)
    }

    fn characteristics(&self, id: &DeviceId) -> BackendResult<DeviceCharacteristics> {
        let path = node_path(id.as_str());
        let caps = query_node_caps(&path)
            .ok_or_else(|| BackendError::DeviceNotFound(path.display().to_string()))?;

        let dev = Device::with_path(&path)
            .map_err(|e| BackendError::QueryFailed(format!("{}: {}", path.display(), e)))?;
        let sizes = enumerate_sizes(&dev)
            .map_err(|e| BackendError::QueryFailed(format!("{}: {}", path.display(), e)))?;

        Ok(DeviceCharacteristics {
            facing: Some(facing_from_bus_info(&caps.bus_info)),
            output_sizes: (!sizes.is_empty()).then_some(sizes),
        })
    }

    fn open(&self, id: &DeviceId, events: EventSender) {
        let state = Arc::clone(&self.state);
        let id = id.clone();
        thread::spawn(move || open_device(&state, id, events));
    }

    fn create_capture_session(
        &self,
        device: &DeviceHandle,
        config: CaptureConfig,
        events: EventSender,
    ) {
        let state = Arc::clone(&self.state);
        let handle = device.clone();
        thread::spawn(move || match configure_stream(&state, &handle, config.size) {
            Ok(token) => events.send(DeviceEvent::Configured(CaptureSessionHandle {
                device_id: handle.device_id,
                token,
            })),
            Err(reason) => {
                warn!(device = %handle.device_id, reason = %reason, "V4L2 capture session setup failed");
                events.send(DeviceEvent::ConfigureFailed);
            }
        });
    }

    fn capture_next(
        &self,
        session: &CaptureSessionHandle,
        request: &CaptureRequest,
    ) -> BackendResult<PreviewFrame> {
        let entry = lock(&self.state)
            .sessions
            .get(&session.token)
            .filter(|s| s.device.device_id == session.device_id)
            .cloned()
            .ok_or_else(|| {
                BackendError::InvalidHandle(format!(
                    "capture session {} on camera {}",
                    session.token, session.device_id
                ))
            })?;

        if entry.size != request.size {
            return Err(BackendError::CaptureFailed(format!(
                "request size {} does not match session size {}",
                request.size, entry.size
            )));
        }

        let mut stream = entry.stream.lock().unwrap_or_else(|e| e.into_inner());
        let (buf, meta) = stream
            .next()
            .map_err(|e| BackendError::CaptureFailed(e.to_string()))?;

        let used = (meta.bytesused as usize).min(buf.len());
        let data: Arc<[u8]> = Arc::from(&buf[..used]);

        Ok(PreviewFrame {
            width: entry.size.width,
            height: entry.size.height,
            format: entry.format,
            data,
            sequence: meta.sequence as u64,
            captured_at: Instant::now(),
        })
    }

    fn close(&self, device: DeviceHandle) {
        let mut state = lock(&self.state);
        let is_current = state
            .devices
            .get(&device.device_id)
            .map(|d| d.token == device.token)
            .unwrap_or(false);
        if !is_current {
            debug!(device = %device.device_id, "Close for stale V4L2 handle ignored");
            return;
        }

        state.sessions.retain(|_, s| s.device != device);
        state.devices.remove(&device.device_id);
        info!(device = %device.device_id, "V4L2 device closed");
    }
}
