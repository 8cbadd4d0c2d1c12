//! Session configuration, fixed for the lifetime of a session.
//!
//! Field names serialize to the property names native engines already use
//! (`audioParam`, `samplerate`, `HWAccelEnable`, ...), so a JSON prop bag can
//! be deserialized directly.

use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        SUPPORTED_CHANNELS, SUPPORTED_SAMPLE_RATES, camera_device, codec_id, profile,
        video_orientation,
    },
    error::BridgeError,
    types::{Role, ScaleMode},
};

/// Audio encoder parameters for a publisher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AudioParameters {
    #[serde(rename = "codecid")]
    pub codec_id: u32,
    pub profile: u32,
    /// Must be one of [`SUPPORTED_SAMPLE_RATES`].
    #[serde(rename = "samplerate")]
    pub sample_rate: u32,
    /// Must be one of [`SUPPORTED_CHANNELS`].
    pub channels: u8,
    /// Bits per second.
    pub bitrate: u32,
}

impl Default for AudioParameters {
    fn default() -> Self {
        Self {
            codec_id: codec_id::AAC,
            profile: profile::AAC_LC,
            sample_rate: 44_100,
            channels: 1,
            bitrate: 64_000,
        }
    }
}

impl AudioParameters {
    pub fn validate(&self) -> Result<(), BridgeError> {
        if !SUPPORTED_SAMPLE_RATES.contains(&self.sample_rate) {
            return Err(BridgeError::configuration(
                "audioParam.samplerate",
                format!(
                    "{} is not one of {SUPPORTED_SAMPLE_RATES:?}",
                    self.sample_rate
                ),
            ));
        }
        if !SUPPORTED_CHANNELS.contains(&self.channels) {
            return Err(BridgeError::configuration(
                "audioParam.channels",
                format!("{} is not one of {SUPPORTED_CHANNELS:?}", self.channels),
            ));
        }
        Ok(())
    }
}

/// Video encoder parameters for a publisher.
///
/// Values are passed through unchecked; the engine reports unsupported
/// combinations asynchronously with an error event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VideoParameters {
    #[serde(rename = "codecid")]
    pub codec_id: u32,
    pub profile: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Bits per second.
    pub bitrate: u32,
}

impl Default for VideoParameters {
    fn default() -> Self {
        Self {
            codec_id: codec_id::H264,
            profile: profile::H264_MAIN,
            width: 720,
            height: 1280,
            fps: 30,
            bitrate: 2_000_000,
        }
    }
}

/// Configuration of a publishing session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PublisherConfig {
    /// Target RTMP URL, for example `rtmp://live.example.com/app/key`.
    pub url: String,
    pub audio_param: AudioParameters,
    pub video_param: VideoParameters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crypto_key: Option<String>,
    #[serde(rename = "HWAccelEnable")]
    pub hw_accel_enable: bool,
    pub denoise_enable: bool,
    pub torch_enable: bool,
    pub enhanced_rtmp: bool,
    pub front_camera: bool,
    /// One of [`camera_device`].
    pub camera_device: u32,
    /// Zoom ratio.
    pub room_ratio: f32,
    /// One of [`video_orientation`].
    pub video_orientation: u32,
    /// Seconds between key frames.
    pub key_frame_interval: u32,
    pub volume: f32,
    /// Log every lifecycle event in human-readable form.
    pub debug: bool,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            audio_param: AudioParameters::default(),
            video_param: VideoParameters::default(),
            crypto_key: None,
            hw_accel_enable: true,
            denoise_enable: false,
            torch_enable: false,
            enhanced_rtmp: false,
            front_camera: false,
            camera_device: camera_device::WIDE_ANGLE,
            room_ratio: 1.0,
            video_orientation: video_orientation::PORTRAIT,
            key_frame_interval: 2,
            volume: 1.0,
            debug: false,
        }
    }
}

impl PublisherConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        validate_url(&self.url)?;
        self.audio_param.validate()
    }
}

/// Configuration of a playback session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerConfig {
    /// Source RTMP URL.
    pub url: String,
    pub scale_mode: ScaleMode,
    /// Start-up buffer in milliseconds.
    pub buffer_time: u32,
    /// Buffer ceiling in milliseconds; `0` leaves it to the engine.
    pub max_buffer_time: u32,
    /// Network timeout in milliseconds; `0` leaves it to the engine.
    pub timeout: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crypto_key: Option<String>,
    #[serde(rename = "HWAccelEnable")]
    pub hw_accel_enable: bool,
    pub play_in_background: bool,
    /// Log every lifecycle event in human-readable form.
    pub debug: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            scale_mode: ScaleMode::default(),
            buffer_time: 1_000,
            max_buffer_time: 0,
            timeout: 0,
            crypto_key: None,
            hw_accel_enable: true,
            play_in_background: false,
            debug: false,
        }
    }
}

impl PlayerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        validate_url(&self.url)?;
        if self.buffer_time > 0 && self.max_buffer_time > 0 && self.buffer_time > self.max_buffer_time
        {
            return Err(BridgeError::configuration(
                "bufferTime",
                format!(
                    "{} exceeds maxBufferTime {}",
                    self.buffer_time, self.max_buffer_time
                ),
            ));
        }
        Ok(())
    }
}

/// Configuration handed to a backend factory when a handle is acquired.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SessionConfig {
    Publisher(PublisherConfig),
    Player(PlayerConfig),
}

impl SessionConfig {
    pub fn role(&self) -> Role {
        match self {
            Self::Publisher(_) => Role::Publisher,
            Self::Player(_) => Role::Player,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Publisher(config) => &config.url,
            Self::Player(config) => &config.url,
        }
    }

    pub fn debug(&self) -> bool {
        match self {
            Self::Publisher(config) => config.debug,
            Self::Player(config) => config.debug,
        }
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        match self {
            Self::Publisher(config) => config.validate(),
            Self::Player(config) => config.validate(),
        }
    }
}

impl From<PublisherConfig> for SessionConfig {
    fn from(config: PublisherConfig) -> Self {
        Self::Publisher(config)
    }
}

impl From<PlayerConfig> for SessionConfig {
    fn from(config: PlayerConfig) -> Self {
        Self::Player(config)
    }
}

fn validate_url(url: &str) -> Result<(), BridgeError> {
    if url.trim().is_empty() {
        return Err(BridgeError::configuration("url", "must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeErrorCategory;

    #[test]
    fn deserializes_publisher_props() {
        let json = r#"{
            "url": "rtmp://live.example.com/app/key",
            "audioParam": { "codecid": 86018, "profile": 1, "samplerate": 48000, "channels": 2, "bitrate": 128000 },
            "videoParam": { "codecid": 173, "profile": 1, "width": 1920, "height": 1080, "fps": 60, "bitrate": 6000000 },
            "HWAccelEnable": false,
            "enhancedRtmp": true,
            "videoOrientation": 3,
            "debug": true
        }"#;

        let config: PublisherConfig = serde_json::from_str(json).expect("props must parse");
        assert_eq!(config.audio_param.sample_rate, 48_000);
        assert_eq!(config.audio_param.channels, 2);
        assert_eq!(config.video_param.codec_id, codec_id::H265);
        assert_eq!(config.video_param.fps, 60);
        assert!(!config.hw_accel_enable);
        assert!(config.enhanced_rtmp);
        assert_eq!(config.video_orientation, video_orientation::LANDSCAPE_RIGHT);
        // Omitted props fall back to defaults.
        assert_eq!(config.key_frame_interval, 2);
        assert_eq!(config.crypto_key, None);
        config.validate().expect("config must be valid");
    }

    #[test]
    fn rejects_unsupported_sample_rate() {
        let mut config = PublisherConfig::new("rtmp://live.example.com/app/key");
        config.audio_param.sample_rate = 22_050;

        let err = config.validate().expect_err("22050 Hz must be rejected");
        assert_eq!(err.category, BridgeErrorCategory::Configuration);
        assert!(err.message.contains("samplerate"));
    }

    #[test]
    fn rejects_unsupported_channel_count() {
        let mut config = PublisherConfig::new("rtmp://live.example.com/app/key");
        config.audio_param.channels = 6;

        let err = config.validate().expect_err("5.1 audio must be rejected");
        assert!(err.message.contains("channels"));
    }

    #[test]
    fn passes_video_parameters_through_unchecked() {
        let mut config = PublisherConfig::new("rtmp://live.example.com/app/key");
        config.video_param.width = 7;
        config.video_param.fps = 1_000;
        config.validate().expect("video values are left to the engine");
    }

    #[test]
    fn rejects_blank_url() {
        let err = PlayerConfig::new("   ")
            .validate()
            .expect_err("blank url must be rejected");
        assert_eq!(err.code, "configuration_error");
    }

    #[test]
    fn deserializes_player_props() {
        let json = r#"{
            "url": "rtmp://live.example.com/app/key",
            "scaleMode": "ScaleAspectFill",
            "bufferTime": 500,
            "maxBufferTime": 1000,
            "playInBackground": true,
            "cryptoKey": "0123456789abcdef"
        }"#;

        let config: PlayerConfig = serde_json::from_str(json).expect("props must parse");
        assert_eq!(config.scale_mode, ScaleMode::ScaleAspectFill);
        assert_eq!(config.crypto_key.as_deref(), Some("0123456789abcdef"));
        assert!(config.play_in_background);
        config.validate().expect("config must be valid");
    }

    #[test]
    fn rejects_unknown_scale_mode() {
        let json = r#"{ "url": "rtmp://a/b", "scaleMode": "Stretch" }"#;
        assert!(serde_json::from_str::<PlayerConfig>(json).is_err());
    }

    #[test]
    fn rejects_buffer_time_above_ceiling() {
        let mut config = PlayerConfig::new("rtmp://live.example.com/app/key");
        config.buffer_time = 3_000;
        config.max_buffer_time = 1_000;
        let err = config.validate().expect_err("buffer above ceiling must fail");
        assert!(err.message.contains("bufferTime"));
    }
}
