//! EGL error codes as the guest sees them.

use thiserror::Error;

/// Numeric value of `EGL_SUCCESS`. Entry points marshal this back when a
/// call completes without error.
pub const EGL_SUCCESS: u32 = 0x3000;

/// An EGL-level semantic error. The discriminants are the standard EGL
/// error values, so a failed call can be marshaled back to the guest
/// without a translation table.
#[repr(u32)]
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EglError {
    #[error("EGL_NOT_INITIALIZED")]
    NotInitialized = 0x3001,
    #[error("EGL_BAD_ACCESS")]
    BadAccess = 0x3002,
    #[error("EGL_BAD_ALLOC")]
    BadAlloc = 0x3003,
    #[error("EGL_BAD_ATTRIBUTE")]
    BadAttribute = 0x3004,
    #[error("EGL_BAD_CONFIG")]
    BadConfig = 0x3005,
    #[error("EGL_BAD_CONTEXT")]
    BadContext = 0x3006,
    #[error("EGL_BAD_CURRENT_SURFACE")]
    BadCurrentSurface = 0x3007,
    #[error("EGL_BAD_DISPLAY")]
    BadDisplay = 0x3008,
    #[error("EGL_BAD_MATCH")]
    BadMatch = 0x3009,
    #[error("EGL_BAD_NATIVE_PIXMAP")]
    BadNativePixmap = 0x300A,
    #[error("EGL_BAD_NATIVE_WINDOW")]
    BadNativeWindow = 0x300B,
    #[error("EGL_BAD_PARAMETER")]
    BadParameter = 0x300C,
    #[error("EGL_BAD_SURFACE")]
    BadSurface = 0x300D,
}

impl EglError {
    /// Wire value for the guest-visible error out-parameter.
    pub const fn code(self) -> u32 {
        self as u32
    }
}

pub type EglResult<T> = Result<T, EglError>;

/// Wire value for an optional result: the error code on failure,
/// `EGL_SUCCESS` otherwise.
pub fn error_code<T>(r: &EglResult<T>) -> u32 {
    match r {
        Ok(_) => EGL_SUCCESS,
        Err(e) => e.code(),
    }
}
