//! EGL config descriptors, selection criteria and ordering.

use crate::attribs::*;
use crate::error::{EglError, EglResult};

/// One native pixel format, in EGL terms. The backend reports these raw;
/// [`ConfigAttribs::normalize`] fixes up the fields the guest-facing model
/// mandates before the config is registered on a display.
#[derive(Debug, Clone)]
pub struct ConfigAttribs {
    pub red_size: i32,
    pub green_size: i32,
    pub blue_size: i32,
    pub alpha_size: i32,
    pub buffer_size: i32,
    pub luminance_size: i32,
    pub alpha_mask_size: i32,
    pub depth_size: i32,
    pub stencil_size: i32,
    pub caveat: i32,
    pub config_id: i32,
    pub frame_buffer_level: i32,
    pub max_pbuffer_width: i32,
    pub max_pbuffer_height: i32,
    pub max_pbuffer_pixels: i32,
    pub min_swap_interval: i32,
    pub max_swap_interval: i32,
    pub native_renderable: i32,
    pub native_visual_id: i32,
    pub native_visual_type: i32,
    pub samples: i32,
    pub surface_type: SurfaceType,
    pub renderable_type: RenderableType,
    pub conformant: RenderableType,
    pub color_buffer_type: i32,
    pub bind_to_texture_rgb: i32,
    pub bind_to_texture_rgba: i32,
    pub transparent_type: i32,
    pub transparent_red_value: i32,
    pub transparent_green_value: i32,
    pub transparent_blue_value: i32,
    /// Opaque driver cookie, handed back on `config_cleanup`.
    pub driver_data: u64,
}

impl ConfigAttribs {
    /// A plain RGBA8888 format, the shape most mock/test tables start from.
    pub fn rgba8888(config_id: i32, depth_size: i32, stencil_size: i32, samples: i32) -> Self {
        Self {
            red_size: 8,
            green_size: 8,
            blue_size: 8,
            alpha_size: 8,
            buffer_size: 32,
            luminance_size: 0,
            alpha_mask_size: 0,
            depth_size,
            stencil_size,
            caveat: EGL_NONE,
            config_id,
            frame_buffer_level: 0,
            max_pbuffer_width: 4096,
            max_pbuffer_height: 4096,
            max_pbuffer_pixels: 4096 * 4096,
            min_swap_interval: 0,
            max_swap_interval: 1,
            native_renderable: EGL_TRUE,
            native_visual_id: 0,
            native_visual_type: 0,
            samples,
            surface_type: SurfaceType::PBUFFER,
            renderable_type: RenderableType::OPENGL_ES | RenderableType::OPENGL_ES2,
            conformant: RenderableType::empty(),
            color_buffer_type: EGL_RGB_BUFFER,
            bind_to_texture_rgb: EGL_FALSE,
            bind_to_texture_rgba: EGL_FALSE,
            transparent_type: EGL_NONE,
            transparent_red_value: 0,
            transparent_green_value: 0,
            transparent_blue_value: 0,
            driver_data: 0,
        }
    }

    /// `EGL_SAMPLE_BUFFERS` is derived, not stored.
    pub fn sample_buffers(&self) -> i32 {
        if self.samples > 0 {
            1
        } else {
            0
        }
    }

    /// Formats the offscreen model can actually host: color-capable with at
    /// least pbuffer support, and a real depth/stencil attachment.
    pub(crate) fn usable_offscreen(&self) -> bool {
        self.red_size > 0
            && self.green_size > 0
            && self.blue_size > 0
            && self.depth_size > 0
            && self.stencil_size > 0
            && self.surface_type.contains(SurfaceType::PBUFFER)
    }

    /// Guest-facing fixups applied at display initialization: every surface
    /// kind is backed by a pbuffer, so all three kinds are advertised;
    /// conformance mirrors the renderable mask unless the format is marked
    /// non-conformant; transparency fields are zeroed unless the format is
    /// transparent-RGB.
    pub(crate) fn normalize(&mut self) {
        self.surface_type |= SurfaceType::WINDOW | SurfaceType::PBUFFER | SurfaceType::PIXMAP;
        self.conformant = if self.caveat == EGL_NON_CONFORMANT_CONFIG {
            RenderableType::empty()
        } else {
            self.renderable_type
        };
        if self.transparent_type != EGL_TRANSPARENT_RGB {
            self.transparent_type = EGL_NONE;
            self.transparent_red_value = 0;
            self.transparent_green_value = 0;
            self.transparent_blue_value = 0;
        }
    }

    /// `eglGetConfigAttrib` accessor. `None` means the attribute token is
    /// not recognized.
    pub fn get_attrib(&self, attribute: i32) -> Option<i32> {
        let v = match attribute {
            EGL_BUFFER_SIZE => self.buffer_size,
            EGL_RED_SIZE => self.red_size,
            EGL_GREEN_SIZE => self.green_size,
            EGL_BLUE_SIZE => self.blue_size,
            EGL_ALPHA_SIZE => self.alpha_size,
            EGL_LUMINANCE_SIZE => self.luminance_size,
            EGL_ALPHA_MASK_SIZE => self.alpha_mask_size,
            EGL_BIND_TO_TEXTURE_RGB => self.bind_to_texture_rgb,
            EGL_BIND_TO_TEXTURE_RGBA => self.bind_to_texture_rgba,
            EGL_COLOR_BUFFER_TYPE => self.color_buffer_type,
            EGL_CONFIG_CAVEAT => self.caveat,
            EGL_CONFIG_ID => self.config_id,
            EGL_CONFORMANT => self.conformant.bits() as i32,
            EGL_DEPTH_SIZE => self.depth_size,
            EGL_LEVEL => self.frame_buffer_level,
            EGL_MAX_PBUFFER_WIDTH => self.max_pbuffer_width,
            EGL_MAX_PBUFFER_HEIGHT => self.max_pbuffer_height,
            EGL_MAX_PBUFFER_PIXELS => self.max_pbuffer_pixels,
            EGL_MIN_SWAP_INTERVAL => self.min_swap_interval,
            EGL_MAX_SWAP_INTERVAL => self.max_swap_interval,
            EGL_NATIVE_RENDERABLE => self.native_renderable,
            EGL_NATIVE_VISUAL_ID => self.native_visual_id,
            EGL_NATIVE_VISUAL_TYPE => self.native_visual_type,
            EGL_RENDERABLE_TYPE => self.renderable_type.bits() as i32,
            EGL_SAMPLE_BUFFERS => self.sample_buffers(),
            EGL_SAMPLES => self.samples,
            EGL_STENCIL_SIZE => self.stencil_size,
            EGL_SURFACE_TYPE => self.surface_type.bits() as i32,
            EGL_TRANSPARENT_TYPE => self.transparent_type,
            EGL_TRANSPARENT_RED_VALUE => self.transparent_red_value,
            EGL_TRANSPARENT_GREEN_VALUE => self.transparent_green_value,
            EGL_TRANSPARENT_BLUE_VALUE => self.transparent_blue_value,
            _ => return None,
        };
        Some(v)
    }

    /// Display registration order: conformant formats first, then caveat
    /// severity, then the remaining tie-breakers down to config id. Chosen
    /// configs are returned in this order.
    pub(crate) fn sort_key(&self) -> (bool, i32, i32, i32, i32, i32, i32, i32, i32) {
        (
            self.conformant.is_empty(),
            caveat_rank(self.caveat),
            self.buffer_size,
            self.sample_buffers(),
            self.samples,
            self.depth_size,
            self.stencil_size,
            self.native_visual_type,
            self.config_id,
        )
    }
}

fn caveat_rank(caveat: i32) -> i32 {
    match caveat {
        EGL_NONE => 0,
        EGL_SLOW_CONFIG => 1,
        EGL_NON_CONFORMANT_CONFIG => 2,
        _ => 3,
    }
}

/// Parsed `eglChooseConfig` request.
#[derive(Debug)]
pub enum ConfigSelect {
    /// `EGL_CONFIG_ID` was present: exact, exclusive selection; every other
    /// criterion in the list is ignored.
    ById(i32),
    Criteria(Box<ConfigCriteria>),
}

/// Selection criteria with `EGL_DONT_CARE` sentinels. Defaults follow the
/// EGL 1.4 selection table.
#[derive(Debug, Clone)]
pub struct ConfigCriteria {
    pub red_size: i32,
    pub green_size: i32,
    pub blue_size: i32,
    pub alpha_size: i32,
    pub buffer_size: i32,
    pub luminance_size: i32,
    pub alpha_mask_size: i32,
    pub depth_size: i32,
    pub stencil_size: i32,
    pub caveat: i32,
    pub frame_buffer_level: i32,
    pub min_swap_interval: i32,
    pub max_swap_interval: i32,
    pub native_renderable: i32,
    pub native_visual_type: i32,
    pub samples: i32,
    pub sample_buffers: i32,
    pub surface_type: i32,
    pub renderable_type: i32,
    pub conformant: i32,
    pub color_buffer_type: i32,
    pub bind_to_texture_rgb: i32,
    pub bind_to_texture_rgba: i32,
    pub transparent_type: i32,
    pub transparent_red_value: i32,
    pub transparent_green_value: i32,
    pub transparent_blue_value: i32,
}

impl Default for ConfigCriteria {
    fn default() -> Self {
        Self {
            red_size: EGL_DONT_CARE,
            green_size: EGL_DONT_CARE,
            blue_size: EGL_DONT_CARE,
            alpha_size: EGL_DONT_CARE,
            buffer_size: EGL_DONT_CARE,
            luminance_size: EGL_DONT_CARE,
            alpha_mask_size: EGL_DONT_CARE,
            depth_size: EGL_DONT_CARE,
            stencil_size: EGL_DONT_CARE,
            caveat: EGL_DONT_CARE,
            frame_buffer_level: 0,
            min_swap_interval: EGL_DONT_CARE,
            max_swap_interval: EGL_DONT_CARE,
            native_renderable: EGL_DONT_CARE,
            native_visual_type: EGL_DONT_CARE,
            samples: EGL_DONT_CARE,
            sample_buffers: EGL_DONT_CARE,
            surface_type: SurfaceType::WINDOW.bits() as i32,
            renderable_type: RenderableType::OPENGL_ES.bits() as i32,
            conformant: EGL_DONT_CARE,
            color_buffer_type: EGL_RGB_BUFFER,
            bind_to_texture_rgb: EGL_DONT_CARE,
            bind_to_texture_rgba: EGL_DONT_CARE,
            transparent_type: EGL_NONE,
            transparent_red_value: EGL_DONT_CARE,
            transparent_green_value: EGL_DONT_CARE,
            transparent_blue_value: EGL_DONT_CARE,
        }
    }
}

impl ConfigCriteria {
    pub fn matches(&self, cfg: &ConfigAttribs) -> bool {
        at_least(cfg.buffer_size, self.buffer_size)
            && at_least(cfg.red_size, self.red_size)
            && at_least(cfg.green_size, self.green_size)
            && at_least(cfg.blue_size, self.blue_size)
            && at_least(cfg.alpha_size, self.alpha_size)
            && at_least(cfg.luminance_size, self.luminance_size)
            && at_least(cfg.alpha_mask_size, self.alpha_mask_size)
            && at_least(cfg.depth_size, self.depth_size)
            && at_least(cfg.stencil_size, self.stencil_size)
            && at_least(cfg.sample_buffers(), self.sample_buffers)
            && at_least(cfg.samples, self.samples)
            && exact(cfg.caveat, self.caveat)
            && exact(cfg.frame_buffer_level, self.frame_buffer_level)
            && exact(cfg.min_swap_interval, self.min_swap_interval)
            && exact(cfg.max_swap_interval, self.max_swap_interval)
            && exact(cfg.native_renderable, self.native_renderable)
            && exact(cfg.native_visual_type, self.native_visual_type)
            && exact(cfg.color_buffer_type, self.color_buffer_type)
            && exact(cfg.bind_to_texture_rgb, self.bind_to_texture_rgb)
            && exact(cfg.bind_to_texture_rgba, self.bind_to_texture_rgba)
            && exact(cfg.transparent_type, self.transparent_type)
            && exact(cfg.transparent_red_value, self.transparent_red_value)
            && exact(cfg.transparent_green_value, self.transparent_green_value)
            && exact(cfg.transparent_blue_value, self.transparent_blue_value)
            && mask(cfg.surface_type.bits(), self.surface_type)
            && mask(cfg.renderable_type.bits(), self.renderable_type)
            && mask(cfg.conformant.bits(), self.conformant)
    }
}

fn at_least(have: i32, want: i32) -> bool {
    want == EGL_DONT_CARE || have >= want
}

fn exact(have: i32, want: i32) -> bool {
    want == EGL_DONT_CARE || have == want
}

fn mask(have: u32, want: i32) -> bool {
    want == EGL_DONT_CARE || (have & want as u32) == want as u32
}

/// Validating parser for an `eglChooseConfig` attribute list.
///
/// `EGL_CONFIG_ID` short-circuits the scan and turns the request into an
/// exact lookup. Unknown tokens, negative sizes and out-of-range enum
/// values reject the whole list with `EGL_BAD_ATTRIBUTE`.
pub fn parse_criteria(list: &[i32]) -> EglResult<ConfigSelect> {
    let mut c = ConfigCriteria::default();

    for (token, value) in attrib_pairs(list) {
        match token {
            EGL_CONFIG_ID => return Ok(ConfigSelect::ById(value)),
            EGL_BUFFER_SIZE => c.buffer_size = size_value(value)?,
            EGL_RED_SIZE => c.red_size = size_value(value)?,
            EGL_GREEN_SIZE => c.green_size = size_value(value)?,
            EGL_BLUE_SIZE => c.blue_size = size_value(value)?,
            EGL_ALPHA_SIZE => c.alpha_size = size_value(value)?,
            EGL_LUMINANCE_SIZE => c.luminance_size = size_value(value)?,
            EGL_ALPHA_MASK_SIZE => c.alpha_mask_size = size_value(value)?,
            EGL_DEPTH_SIZE => c.depth_size = size_value(value)?,
            EGL_STENCIL_SIZE => c.stencil_size = size_value(value)?,
            EGL_SAMPLE_BUFFERS => c.sample_buffers = size_value(value)?,
            EGL_SAMPLES => c.samples = size_value(value)?,
            EGL_CONFIG_CAVEAT => {
                if value != EGL_DONT_CARE
                    && value != EGL_NONE
                    && value != EGL_SLOW_CONFIG
                    && value != EGL_NON_CONFORMANT_CONFIG
                {
                    return Err(EglError::BadAttribute);
                }
                c.caveat = value;
            }
            EGL_LEVEL => {
                // A level has no "don't care" reading.
                if value == EGL_DONT_CARE {
                    return Err(EglError::BadAttribute);
                }
                c.frame_buffer_level = value;
            }
            EGL_MIN_SWAP_INTERVAL => c.min_swap_interval = value,
            EGL_MAX_SWAP_INTERVAL => c.max_swap_interval = value,
            EGL_NATIVE_RENDERABLE => c.native_renderable = value,
            EGL_NATIVE_VISUAL_TYPE => {
                if value != EGL_DONT_CARE && !(0..=1).contains(&value) {
                    return Err(EglError::BadAttribute);
                }
                c.native_visual_type = value;
            }
            EGL_COLOR_BUFFER_TYPE => {
                if value != EGL_DONT_CARE && value != EGL_RGB_BUFFER && value != EGL_LUMINANCE_BUFFER {
                    return Err(EglError::BadAttribute);
                }
                c.color_buffer_type = value;
            }
            EGL_BIND_TO_TEXTURE_RGB => c.bind_to_texture_rgb = value,
            EGL_BIND_TO_TEXTURE_RGBA => c.bind_to_texture_rgba = value,
            EGL_SURFACE_TYPE => c.surface_type = value,
            EGL_RENDERABLE_TYPE => c.renderable_type = value,
            EGL_CONFORMANT => c.conformant = value,
            EGL_TRANSPARENT_TYPE => {
                if value != EGL_DONT_CARE && value != EGL_NONE && value != EGL_TRANSPARENT_RGB {
                    return Err(EglError::BadAttribute);
                }
                c.transparent_type = value;
            }
            EGL_TRANSPARENT_RED_VALUE => c.transparent_red_value = value,
            EGL_TRANSPARENT_GREEN_VALUE => c.transparent_green_value = value,
            EGL_TRANSPARENT_BLUE_VALUE => c.transparent_blue_value = value,
            // Legal to pass, no filtering effect here.
            EGL_MAX_PBUFFER_WIDTH | EGL_MAX_PBUFFER_HEIGHT | EGL_MAX_PBUFFER_PIXELS
            | EGL_NATIVE_VISUAL_ID | EGL_MATCH_NATIVE_PIXMAP => {}
            _ => return Err(EglError::BadAttribute),
        }
    }

    Ok(ConfigSelect::Criteria(Box::new(c)))
}

fn size_value(value: i32) -> EglResult<i32> {
    if value != EGL_DONT_CARE && value < 0 {
        return Err(EglError::BadAttribute);
    }
    Ok(value)
}
