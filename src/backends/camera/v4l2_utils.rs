// SPDX-License-Identifier: GPL-3.0-only

//! Shared V4L2 utility functions
//!
//! Lightweight device-node discovery used by the V4L2 platform and the
//! device-node permission check. Capability queries go through a raw
//! `VIDIOC_QUERYCAP` so enumeration never has to set up a full device.

use super::types::LensFacing;
use crate::constants::v4l2::{DEV_DIR, NODE_PREFIX};
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use tracing::debug;

/// VIDIOC_QUERYCAP ioctl number
const VIDIOC_QUERYCAP: libc::c_ulong = 0x80685600;

const V4L2_CAP_VIDEO_CAPTURE: u32 = 0x0000_0001;
const V4L2_CAP_STREAMING: u32 = 0x0400_0000;
const V4L2_CAP_DEVICE_CAPS: u32 = 0x8000_0000;

/// V4L2 capability structure for VIDIOC_QUERYCAP ioctl
#[repr(C)]
struct V4l2Capability {
    driver: [u8; 16],
    card: [u8; 32],
    bus_info: [u8; 32],
    version: u32,
    capabilities: u32,
    device_caps: u32,
    reserved: [u32; 3],
}

/// Capability summary of one video node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCaps {
    pub driver: String,
    pub card: String,
    pub bus_info: String,
    /// Capabilities of this node (device caps when reported)
    pub caps: u32,
}

impl NodeCaps {
    /// Node can stream video capture frames
    pub fn is_streaming_capture(&self) -> bool {
        self.caps & V4L2_CAP_VIDEO_CAPTURE != 0 && self.caps & V4L2_CAP_STREAMING != 0
    }
}

fn query_v4l2_cap(fd: RawFd) -> Option<V4l2Capability> {
    let mut cap: V4l2Capability = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(fd, VIDIOC_QUERYCAP as _, &mut cap as *mut V4l2Capability) };
    if result < 0 { None } else { Some(cap) }
}

fn c_field(bytes: &[u8]) -> String {
    let len = bytes.iter().position(|&c| c == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..len]).to_string()
}

/// Query capabilities of a video node
pub fn query_node_caps(path: &Path) -> Option<NodeCaps> {
    let file = std::fs::File::open(path).ok()?;
    let cap = query_v4l2_cap(file.as_raw_fd())?;

    let caps = if cap.capabilities & V4L2_CAP_DEVICE_CAPS != 0 {
        cap.device_caps
    } else {
        cap.capabilities
    };

    let node = NodeCaps {
        driver: c_field(&cap.driver),
        card: c_field(&cap.card),
        bus_info: c_field(&cap.bus_info),
        caps,
    };
    debug!(path = %path.display(), driver = %node.driver, card = %node.card, bus_info = %node.bus_info, "Queried V4L2 node");
    Some(node)
}

/// Path of the node for a device index
pub fn node_path(index: &str) -> PathBuf {
    Path::new(DEV_DIR).join(format!("{}{}", NODE_PREFIX, index))
}

/// List `/dev/videoN` nodes as (N, path), sorted by N
pub fn list_video_nodes() -> Vec<(u32, PathBuf)> {
    let mut nodes: Vec<(u32, PathBuf)> = std::fs::read_dir(DEV_DIR)
        .into_iter()
        .flatten()
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            let index = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix(NODE_PREFIX))
                .and_then(|n| n.parse::<u32>().ok())?;
            Some((index, path))
        })
        .collect();

    nodes.sort_by_key(|(index, _)| *index);
    nodes
}

/// Derive lens facing from the V4L2 bus info
///
/// USB-attached nodes are external peripherals; everything else (platform,
/// PCI, CSI) is treated as a built-in front camera.
pub fn facing_from_bus_info(bus_info: &str) -> LensFacing {
    if bus_info.starts_with("usb-") {
        LensFacing::External
    } else {
        LensFacing::Front
    }
}

/// Check read/write access to a device node for the current user
pub fn node_accessible(path: &Path) -> bool {
    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    unsafe { libc::access(c_path.as_ptr(), libc::R_OK | libc::W_OK) == 0 }
}
