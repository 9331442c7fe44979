//! Batch and call stream layouts.

/// One wire cell. Every value in the stream occupies a full slot with the
/// payload little-endian in the low bytes.
pub const SLOT_BYTES: u32 = 8;

/// Protocol version exchanged during the attach handshake. Bumped on any
/// incompatible change to the layouts in this crate.
pub const GLINT_PROTOCOL_VERSION: u32 = 1;

pub const fn align_up_slot(v: u32) -> u32 {
    (v + (SLOT_BYTES - 1)) & !(SLOT_BYTES - 1)
}

/* ------------------------------- Batch header ------------------------------ */

pub const BATCH_STATUS_OFFSET: u32 = 0;
pub const BATCH_FENCE_SEQ_OFFSET: u32 = 8;
pub const BATCH_SIZE_OFFSET: u32 = 16;
pub const BATCH_OUT_ARRAY_COUNT_OFFSET: u32 = 24;
pub const BATCH_HEADER_SIZE_BYTES: u32 = 32;

/// Completion status the host writes back into slot 0 of the batch header.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchStatus {
    /// Batch accepted (prefetch) or completed (writeback).
    Ok = 0xA,
    /// A guest memory access failed. The guest must fix up paging and
    /// resubmit the identical batch.
    Retry = 0xB,
}

impl BatchStatus {
    pub const fn from_u32(v: u32) -> Option<Self> {
        match v {
            0xA => Some(Self::Ok),
            0xB => Some(Self::Retry),
            _ => None,
        }
    }
}

/// Decoded batch header. `status` is host-written and deliberately absent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchHeader {
    pub fence_seq: u32,
    pub batch_size: u32,
    pub out_array_count: u32,
}

impl BatchHeader {
    pub const SIZE_BYTES: u32 = BATCH_HEADER_SIZE_BYTES;
}

/* -------------------------------- Call stream ------------------------------ */

pub const CALL_API_ID_OFFSET: u32 = 0;
pub const CALL_FUNC_ID_OFFSET: u32 = 8;
pub const CALL_DIRECT_OFFSET: u32 = 16;
pub const CALL_HEADER_SIZE_BYTES: u32 = 24;

/// Out-array descriptor pair trailing the call stream, one per direct-mode
/// out array in the batch.
pub const OUT_ARRAY_DESC_VA_OFFSET: u32 = 0;
pub const OUT_ARRAY_DESC_SIZE_OFFSET: u32 = 8;
pub const OUT_ARRAY_DESC_SIZE_BYTES: u32 = 16;

/// Upper bound on in-arrays a single call may carry.
pub const MAX_IN_ARRAYS: usize = 8;

/* ---------------------------------- APIs ----------------------------------- */

pub const NUM_APIS: usize = 2;

/// API selector carried in every call header. Ids are 1-based; 0 never
/// names an API.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiId {
    Egl = 1,
    Gles = 2,
}

impl ApiId {
    pub const fn from_u32(v: u32) -> Option<Self> {
        match v {
            1 => Some(Self::Egl),
            2 => Some(Self::Gles),
            _ => None,
        }
    }

    /// Zero-based slot in per-process API state arrays.
    pub const fn index(self) -> usize {
        self as usize - 1
    }
}

/// EGL API function ids. Ids are 1-based table indices; the order is ABI.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EglFunc {
    GetDisplay = 1,
    Initialize = 2,
    Terminate = 3,
    GetConfigs = 4,
    ChooseConfig = 5,
    GetConfigAttrib = 6,
    DestroySurface = 7,
    QuerySurface = 8,
    BindApi = 9,
    WaitClient = 10,
    ReleaseThread = 11,
    SurfaceAttrib = 12,
    CreateContext = 13,
    DestroyContext = 14,
    MakeCurrent = 15,
    QueryContext = 16,
    SwapBuffers = 17,
    CopyBuffers = 18,
    CreateWindowSurfaceOffscreen = 19,
    CreatePbufferSurfaceOffscreen = 20,
    CreatePixmapSurfaceOffscreen = 21,
    ResizeOffscreenSurface = 22,
    CreateWindowSurfaceOnscreen = 23,
    CreatePbufferSurfaceOnscreen = 24,
    CreatePixmapSurfaceOnscreen = 25,
    InvalidateOnscreenSurface = 26,
    CreateImage = 27,
}

impl EglFunc {
    pub const COUNT: u32 = 27;

    pub const fn from_u32(v: u32) -> Option<Self> {
        match v {
            1 => Some(Self::GetDisplay),
            2 => Some(Self::Initialize),
            3 => Some(Self::Terminate),
            4 => Some(Self::GetConfigs),
            5 => Some(Self::ChooseConfig),
            6 => Some(Self::GetConfigAttrib),
            7 => Some(Self::DestroySurface),
            8 => Some(Self::QuerySurface),
            9 => Some(Self::BindApi),
            10 => Some(Self::WaitClient),
            11 => Some(Self::ReleaseThread),
            12 => Some(Self::SurfaceAttrib),
            13 => Some(Self::CreateContext),
            14 => Some(Self::DestroyContext),
            15 => Some(Self::MakeCurrent),
            16 => Some(Self::QueryContext),
            17 => Some(Self::SwapBuffers),
            18 => Some(Self::CopyBuffers),
            19 => Some(Self::CreateWindowSurfaceOffscreen),
            20 => Some(Self::CreatePbufferSurfaceOffscreen),
            21 => Some(Self::CreatePixmapSurfaceOffscreen),
            22 => Some(Self::ResizeOffscreenSurface),
            23 => Some(Self::CreateWindowSurfaceOnscreen),
            24 => Some(Self::CreatePbufferSurfaceOnscreen),
            25 => Some(Self::CreatePixmapSurfaceOnscreen),
            26 => Some(Self::InvalidateOnscreenSurface),
            27 => Some(Self::CreateImage),
            _ => None,
        }
    }
}

/// GLES API function ids. Same contract as [`EglFunc`].
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlesFunc {
    GenTextures = 1,
    DeleteTextures = 2,
    CreateShader = 3,
    ShaderSource = 4,
    DeleteShader = 5,
    Flush = 6,
}

impl GlesFunc {
    pub const COUNT: u32 = 6;

    pub const fn from_u32(v: u32) -> Option<Self> {
        match v {
            1 => Some(Self::GenTextures),
            2 => Some(Self::DeleteTextures),
            3 => Some(Self::CreateShader),
            4 => Some(Self::ShaderSource),
            5 => Some(Self::DeleteShader),
            6 => Some(Self::Flush),
            _ => None,
        }
    }
}
