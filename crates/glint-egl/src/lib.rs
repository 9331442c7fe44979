//! Host-side EGL object model for the glint device.
//!
//! The guest's EGL library forwards calls over the glint transport; this
//! crate is what those calls land on. It keeps the guest-visible object
//! graph (displays, configs, surfaces, contexts) with full argument
//! validation and per-thread current state ([`api`]), and renders through
//! one of two backend strategies: [`offscreen`] draws into host pbuffers
//! and copies pixels back to guest memory, [`onscreen`] draws into winsys
//! buffers the emulator UI composites directly.
//!
//! Below the backends sits the [`driver`] boundary, the only place a real
//! GLX/WGL/CGL stack gets touched. The in-tree [`mock`] driver implements
//! it in memory with deterministic pixel patterns, which is what the tests
//! and the default server wiring run on.
#![forbid(unsafe_code)]

pub mod api;
pub mod attribs;
pub mod backend;
pub mod config;
pub mod context;
pub mod display;
pub mod driver;
pub mod error;
pub mod handle;
pub mod mock;
pub mod offscreen;
pub mod onscreen;
pub mod surface;

pub use api::{EglApi, EglThread};
pub use backend::{BackendDisplay, BackendImage, BackendSurface, EglBackend, WorkerCtx};
pub use config::ConfigAttribs;
pub use driver::NativeDriver;
pub use error::{error_code, EglError, EglResult, EGL_SUCCESS};
pub use handle::{HandleAllocator, HostHandle};
pub use mock::{MockDriver, MockWinsys};
pub use offscreen::OffscreenBackend;
pub use onscreen::{OnscreenBackend, WinsysInterface, WinsysSurface};
pub use surface::SurfaceKind;

#[cfg(test)]
mod tests;
