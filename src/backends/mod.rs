// SPDX-License-Identifier: MPL-2.0

//! Media capture backends
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               Scan Orchestrator             │
//! └────────────────────┬────────────────────────┘
//!                      │ MediaCaptureProvider
//! ┌────────────────────┴────────────────────────┐
//! │  ┌─────────────┐    ┌──────────────────┐    │
//! │  │ V4L2 camera │    │  Virtual camera  │    │
//! │  │ (/dev/video)│    │  (still image)   │    │
//! │  └─────────────┘    └──────────────────┘    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! - [`camera`]: provider traits, shared frame types and the V4L2 backend
//! - [`virtual_camera`]: a virtual device replaying an image file

pub mod camera;
pub mod virtual_camera;
