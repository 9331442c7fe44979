//! Native windowing/GL driver boundary.
//!
//! Everything below the EGL model that actually touches a host GL stack
//! goes through [`NativeDriver`]. Native objects are opaque ids minted by
//! the driver; the model never interprets them.

use crate::config::ConfigAttribs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeDisplay(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeSurface(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeContext(pub u64);

/// What the driver has current on the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentBinding {
    pub dpy: NativeDisplay,
    pub draw: Option<NativeSurface>,
    pub read: Option<NativeSurface>,
    pub ctx: NativeContext,
}

/// Host-native layer the backends are built on. Implementations map these
/// onto a real GLX/WGL/CGL-style stack; the in-tree [`crate::mock`] driver
/// keeps everything in memory.
///
/// "Current" is per OS thread, mirroring GL. `make_current` with a `None`
/// context unbinds.
pub trait NativeDriver: Send + Sync {
    fn display_open(&self) -> NativeDisplay;
    fn display_close(&self, dpy: NativeDisplay);

    /// All native pixel formats that are color-renderable and can back at
    /// least a pbuffer surface.
    fn config_enum(&self, dpy: NativeDisplay) -> Vec<ConfigAttribs>;

    /// Releases any driver-side cookie carried in `cfg.driver_data`.
    fn config_cleanup(&self, dpy: NativeDisplay, cfg: &ConfigAttribs) {
        let _ = (dpy, cfg);
    }

    fn pbuffer_surface_create(
        &self,
        dpy: NativeDisplay,
        cfg: &ConfigAttribs,
        width: u32,
        height: u32,
    ) -> Option<NativeSurface>;

    fn pbuffer_surface_destroy(&self, dpy: NativeDisplay, sfc: NativeSurface);

    fn context_create(
        &self,
        dpy: NativeDisplay,
        cfg: &ConfigAttribs,
        share: Option<NativeContext>,
    ) -> Option<NativeContext>;

    fn context_destroy(&self, dpy: NativeDisplay, ctx: NativeContext);

    fn make_current(
        &self,
        dpy: NativeDisplay,
        draw: Option<NativeSurface>,
        read: Option<NativeSurface>,
        ctx: Option<NativeContext>,
    ) -> bool;

    /// Binding on the calling thread, if any.
    fn current(&self) -> Option<CurrentBinding>;

    /// Flushes pending commands on the calling thread's current context.
    fn flush(&self);

    /// Reads back the current draw surface into `dst`, bottom-up rows as
    /// GL returns them. `dst` must hold `width * height * bpp` bytes.
    fn read_pixels(&self, width: u32, height: u32, bpp: u32, dst: &mut [u8]) -> bool;
}
