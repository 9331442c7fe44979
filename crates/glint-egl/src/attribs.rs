//! EGL attribute tokens and enum values.
//!
//! Values are the standard EGL 1.4 numeric assignments; attribute lists on
//! the wire are `i32` token/value pairs terminated by [`EGL_NONE`].

use bitflags::bitflags;

pub const EGL_DONT_CARE: i32 = -1;
pub const EGL_UNKNOWN: i32 = -1;
pub const EGL_NONE: i32 = 0x3038;

pub const EGL_FALSE: i32 = 0;
pub const EGL_TRUE: i32 = 1;

/* Config attributes. */
pub const EGL_BUFFER_SIZE: i32 = 0x3020;
pub const EGL_ALPHA_SIZE: i32 = 0x3021;
pub const EGL_BLUE_SIZE: i32 = 0x3022;
pub const EGL_GREEN_SIZE: i32 = 0x3023;
pub const EGL_RED_SIZE: i32 = 0x3024;
pub const EGL_DEPTH_SIZE: i32 = 0x3025;
pub const EGL_STENCIL_SIZE: i32 = 0x3026;
pub const EGL_CONFIG_CAVEAT: i32 = 0x3027;
pub const EGL_CONFIG_ID: i32 = 0x3028;
pub const EGL_LEVEL: i32 = 0x3029;
pub const EGL_MAX_PBUFFER_HEIGHT: i32 = 0x302A;
pub const EGL_MAX_PBUFFER_PIXELS: i32 = 0x302B;
pub const EGL_MAX_PBUFFER_WIDTH: i32 = 0x302C;
pub const EGL_NATIVE_RENDERABLE: i32 = 0x302D;
pub const EGL_NATIVE_VISUAL_ID: i32 = 0x302E;
pub const EGL_NATIVE_VISUAL_TYPE: i32 = 0x302F;
pub const EGL_SAMPLES: i32 = 0x3031;
pub const EGL_SAMPLE_BUFFERS: i32 = 0x3032;
pub const EGL_SURFACE_TYPE: i32 = 0x3033;
pub const EGL_TRANSPARENT_TYPE: i32 = 0x3034;
pub const EGL_TRANSPARENT_BLUE_VALUE: i32 = 0x3035;
pub const EGL_TRANSPARENT_GREEN_VALUE: i32 = 0x3036;
pub const EGL_TRANSPARENT_RED_VALUE: i32 = 0x3037;
pub const EGL_BIND_TO_TEXTURE_RGB: i32 = 0x3039;
pub const EGL_BIND_TO_TEXTURE_RGBA: i32 = 0x303A;
pub const EGL_MIN_SWAP_INTERVAL: i32 = 0x303B;
pub const EGL_MAX_SWAP_INTERVAL: i32 = 0x303C;
pub const EGL_LUMINANCE_SIZE: i32 = 0x303D;
pub const EGL_ALPHA_MASK_SIZE: i32 = 0x303E;
pub const EGL_COLOR_BUFFER_TYPE: i32 = 0x303F;
pub const EGL_RENDERABLE_TYPE: i32 = 0x3040;
pub const EGL_MATCH_NATIVE_PIXMAP: i32 = 0x3041;
pub const EGL_CONFORMANT: i32 = 0x3042;

/* Config attribute values. */
pub const EGL_SLOW_CONFIG: i32 = 0x3050;
pub const EGL_NON_CONFORMANT_CONFIG: i32 = 0x3051;
pub const EGL_TRANSPARENT_RGB: i32 = 0x3052;
pub const EGL_RGB_BUFFER: i32 = 0x308E;
pub const EGL_LUMINANCE_BUFFER: i32 = 0x308F;

/* Surface attributes. */
pub const EGL_HEIGHT: i32 = 0x3056;
pub const EGL_WIDTH: i32 = 0x3057;
pub const EGL_LARGEST_PBUFFER: i32 = 0x3058;
pub const EGL_TEXTURE_FORMAT: i32 = 0x3080;
pub const EGL_TEXTURE_TARGET: i32 = 0x3081;
pub const EGL_MIPMAP_TEXTURE: i32 = 0x3082;
pub const EGL_MIPMAP_LEVEL: i32 = 0x3083;
pub const EGL_RENDER_BUFFER: i32 = 0x3086;
pub const EGL_VG_COLORSPACE: i32 = 0x3087;
pub const EGL_VG_ALPHA_FORMAT: i32 = 0x3088;
pub const EGL_HORIZONTAL_RESOLUTION: i32 = 0x3090;
pub const EGL_VERTICAL_RESOLUTION: i32 = 0x3091;
pub const EGL_PIXEL_ASPECT_RATIO: i32 = 0x3092;
pub const EGL_SWAP_BEHAVIOR: i32 = 0x3093;
pub const EGL_MULTISAMPLE_RESOLVE: i32 = 0x3099;

/* Surface attribute values. */
pub const EGL_NO_TEXTURE: i32 = 0x305C;
pub const EGL_TEXTURE_RGB: i32 = 0x305D;
pub const EGL_TEXTURE_RGBA: i32 = 0x305E;
pub const EGL_TEXTURE_2D: i32 = 0x305F;
pub const EGL_BACK_BUFFER: i32 = 0x3084;
pub const EGL_SINGLE_BUFFER: i32 = 0x3085;
pub const EGL_BUFFER_PRESERVED: i32 = 0x3094;
pub const EGL_BUFFER_DESTROYED: i32 = 0x3095;
pub const EGL_MULTISAMPLE_RESOLVE_DEFAULT: i32 = 0x309A;
pub const EGL_MULTISAMPLE_RESOLVE_BOX: i32 = 0x309B;
pub const EGL_DISPLAY_SCALING: i32 = 10000;

/* Context attributes. */
pub const EGL_CONTEXT_CLIENT_TYPE: i32 = 0x3097;
pub const EGL_CONTEXT_CLIENT_VERSION: i32 = 0x3098;

/* Client APIs. */
pub const EGL_OPENGL_ES_API: i32 = 0x30A0;
pub const EGL_OPENVG_API: i32 = 0x30A1;
pub const EGL_OPENGL_API: i32 = 0x30A2;

bitflags! {
    /// `EGL_SURFACE_TYPE` bits.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct SurfaceType: u32 {
        const PBUFFER = 0x0001;
        const PIXMAP = 0x0002;
        const WINDOW = 0x0004;
        const VG_COLORSPACE_LINEAR = 0x0020;
        const VG_ALPHA_FORMAT_PRE = 0x0040;
        const MULTISAMPLE_RESOLVE_BOX = 0x0200;
        const SWAP_BEHAVIOR_PRESERVED = 0x0400;
    }
}

bitflags! {
    /// `EGL_RENDERABLE_TYPE` / `EGL_CONFORMANT` bits.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct RenderableType: u32 {
        const OPENGL_ES = 0x0001;
        const OPENVG = 0x0002;
        const OPENGL_ES2 = 0x0004;
        const OPENGL = 0x0008;
    }
}

/// Splits a raw `token, value, ..., EGL_NONE` attribute list into pairs.
///
/// The terminator and anything after it are dropped; a trailing token with
/// no value is dropped as well, matching how a C scanner indexing `i` and
/// `i + 1` behaves.
pub fn attrib_pairs(list: &[i32]) -> impl Iterator<Item = (i32, i32)> + '_ {
    let end = list
        .iter()
        .step_by(2)
        .position(|&t| t == EGL_NONE)
        .map(|i| i * 2)
        .unwrap_or(list.len());
    list[..end]
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
}
