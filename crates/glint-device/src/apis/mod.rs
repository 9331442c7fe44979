//! Per-API call dispatchers.
//!
//! One submodule per wire API: [`egl`] routes calls into the validating
//! EGL model, [`gles`] covers the rendering-side calls the device handles
//! itself. Both keep per-process state and implement
//! [`crate::api::ApiProcess`].

pub mod egl;
mod egl_funcs;
pub mod gles;

pub use egl::EglApiProcess;
pub use gles::GlesApiProcess;
