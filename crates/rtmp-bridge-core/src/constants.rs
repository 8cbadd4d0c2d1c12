//! Numeric tables shared with native media engines.
//!
//! Values are part of the wire contract with the backend and must never be
//! renumbered.

/// Codec identifiers accepted in `codecid`.
pub mod codec_id {
    pub const H264: u32 = 27;
    pub const H265: u32 = 173;
    pub const AAC: u32 = 86018;
}

/// Encoder profiles accepted in `profile`.
pub mod profile {
    /// Let the engine pick.
    pub const AUTO: u32 = 0;

    pub const H264_BASELINE: u32 = 66;
    pub const H264_MAIN: u32 = 77;
    pub const H264_HIGH: u32 = 100;

    pub const H265_MAIN: u32 = 1;

    pub const AAC_LC: u32 = 1;
    pub const AAC_HE: u32 = 4;
    pub const AAC_HE_V2: u32 = 28;
    pub const AAC_LD: u32 = 22;
    pub const AAC_ELD: u32 = 38;
}

/// Capture orientation accepted in `videoOrientation`.
pub mod video_orientation {
    pub const PORTRAIT: u32 = 1;
    pub const LANDSCAPE_RIGHT: u32 = 3;
    pub const LANDSCAPE_LEFT: u32 = 4;
}

/// Camera auto-focus / auto-exposure / auto-white-balance bit flags.
pub mod camera_flag {
    pub const AF: u32 = 1;
    pub const AE: u32 = 2;
    pub const AWB: u32 = 4;
}

/// Physical camera selection accepted in `cameraDevice`.
pub mod camera_device {
    pub const WIDE_ANGLE: u32 = 0;
    pub const TELEPHOTO: u32 = 1;
    pub const ULTRA_WIDE: u32 = 2;
    pub const DUAL: u32 = 3;
    pub const TRIPLE: u32 = 4;
}

/// Lifecycle codes emitted by the media engine.
pub mod event_code {
    pub const CONNECTING: i32 = 2000;
    pub const PREVIEW_READY: i32 = 2001;
    pub const STOPPED: i32 = 2002;
    pub const ERROR: i32 = 2003;
    pub const CONNECTION_STARTED: i32 = 2004;
    pub const STREAM_CONNECTED: i32 = 2005;
    pub const NETWORK_TIMEOUT: i32 = 2006;
    pub const DISCONNECTED: i32 = 2007;
}

/// Audio sample rates the engines accept.
pub const SUPPORTED_SAMPLE_RATES: [u32; 5] = [8_000, 16_000, 32_000, 44_100, 48_000];

/// Audio channel counts the engines accept.
pub const SUPPORTED_CHANNELS: [u8; 2] = [1, 2];
