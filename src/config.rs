use crate::device::{Constraints, Facing};
use crate::playback::ReadyState;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct KioskConfig {
    pub camera: CameraConfig,
    pub playback: PlaybackConfig,
    pub capture: CaptureConfig,
    pub events: EventsConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraConfig {
    /// Which way the camera should face the visitor
    #[serde(default = "default_camera_facing")]
    pub facing: Facing,

    /// Ideal resolution (width, height); the device may substitute the nearest one
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PlaybackConfig {
    /// Fallback delay before playback is attempted without a ready signal
    #[serde(default = "default_fallback_ms")]
    pub fallback_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CaptureConfig {
    /// JPEG quality (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Encoded photos shorter than this are rejected
    #[serde(default = "default_min_frame_bytes")]
    pub min_frame_bytes: usize,

    /// Minimum surface readiness ordinal required to grab a frame
    #[serde(default = "default_min_ready_state")]
    pub min_ready_state: u8,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EventsConfig {
    /// Event bus capacity
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,

    /// How long a notification stays on screen
    #[serde(default = "default_notification_seconds")]
    pub notification_seconds: u64,
}

/// Knobs for the in-process simulated camera used by the `kiosk` binary
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Resolutions the simulated camera can deliver
    #[serde(default = "default_supported_resolutions")]
    pub supported_resolutions: Vec<(u32, u32)>,

    /// Refuse camera access as if the visitor denied permission
    #[serde(default)]
    pub deny_permission: bool,

    /// Delay before the camera grants access
    #[serde(default = "default_acquire_delay_ms")]
    pub acquire_delay_ms: u64,

    /// Delay before the surface reports loaded metadata
    #[serde(default = "default_ready_delay_ms")]
    pub ready_delay_ms: u64,

    /// Whether the surface ever reports loaded metadata
    #[serde(default = "default_ready_event")]
    pub ready_event: bool,

    /// Reject playback as an autoplay policy would
    #[serde(default)]
    pub reject_playback: bool,
}

impl KioskConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("kiosk.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let resolutions: Vec<Vec<u32>> = default_supported_resolutions()
            .into_iter()
            .map(|(w, h)| vec![w, h])
            .collect();

        let settings = Config::builder()
            .set_default("camera.facing", "user")?
            .set_default(
                "camera.resolution",
                vec![default_camera_resolution().0, default_camera_resolution().1],
            )?
            .set_default("playback.fallback_ms", default_fallback_ms())?
            .set_default("capture.jpeg_quality", default_jpeg_quality() as u64)?
            .set_default("capture.min_frame_bytes", default_min_frame_bytes() as u64)?
            .set_default("capture.min_ready_state", default_min_ready_state() as u64)?
            .set_default("events.bus_capacity", default_bus_capacity() as u64)?
            .set_default("events.notification_seconds", default_notification_seconds())?
            .set_default("simulation.supported_resolutions", resolutions)?
            .set_default("simulation.deny_permission", false)?
            .set_default("simulation.acquire_delay_ms", default_acquire_delay_ms())?
            .set_default("simulation.ready_delay_ms", default_ready_delay_ms())?
            .set_default("simulation.ready_event", default_ready_event())?
            .set_default("simulation.reject_playback", false)?
            .add_source(File::with_name(&path_str).required(false))
            .add_source(
                Environment::with_prefix("KIOSK")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: KioskConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.playback.fallback_ms == 0 {
            return Err(ConfigError::Message(
                "Playback fallback_ms must be greater than 0".to_string(),
            ));
        }

        if !(1..=100).contains(&self.capture.jpeg_quality) {
            return Err(ConfigError::Message(
                "Capture jpeg_quality must be between 1 and 100".to_string(),
            ));
        }

        if self.capture.min_frame_bytes == 0 {
            return Err(ConfigError::Message(
                "Capture min_frame_bytes must be greater than 0".to_string(),
            ));
        }

        if ReadyState::from_ordinal(self.capture.min_ready_state).is_none() {
            return Err(ConfigError::Message(
                "Capture min_ready_state must be between 0 and 4".to_string(),
            ));
        }

        if self.events.bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        if self.simulation.supported_resolutions.is_empty() {
            return Err(ConfigError::Message(
                "Simulated camera needs at least one supported resolution".to_string(),
            ));
        }

        Ok(())
    }
}

impl CameraConfig {
    /// Device constraints requested on every acquisition
    pub fn constraints(&self) -> Constraints {
        Constraints::new(self.facing, self.resolution.0, self.resolution.1)
    }
}

impl PlaybackConfig {
    pub fn fallback(&self) -> Duration {
        Duration::from_millis(self.fallback_ms)
    }
}

impl CaptureConfig {
    pub fn min_ready(&self) -> ReadyState {
        ReadyState::from_ordinal(self.min_ready_state).unwrap_or(ReadyState::HaveCurrentData)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: default_jpeg_quality(),
            min_frame_bytes: default_min_frame_bytes(),
            min_ready_state: default_min_ready_state(),
        }
    }
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                facing: default_camera_facing(),
                resolution: default_camera_resolution(),
            },
            playback: PlaybackConfig {
                fallback_ms: default_fallback_ms(),
            },
            capture: CaptureConfig::default(),
            events: EventsConfig {
                bus_capacity: default_bus_capacity(),
                notification_seconds: default_notification_seconds(),
            },
            simulation: SimulationConfig {
                supported_resolutions: default_supported_resolutions(),
                deny_permission: false,
                acquire_delay_ms: default_acquire_delay_ms(),
                ready_delay_ms: default_ready_delay_ms(),
                ready_event: default_ready_event(),
                reject_playback: false,
            },
        }
    }
}

// Default value functions
fn default_camera_facing() -> Facing {
    Facing::User
}
fn default_camera_resolution() -> (u32, u32) {
    (1280, 720)
}

fn default_fallback_ms() -> u64 {
    1000
}

fn default_jpeg_quality() -> u8 {
    85
}
fn default_min_frame_bytes() -> usize {
    100
}
fn default_min_ready_state() -> u8 {
    ReadyState::HaveCurrentData as u8
}

fn default_bus_capacity() -> usize {
    64
}
fn default_notification_seconds() -> u64 {
    5
}

fn default_supported_resolutions() -> Vec<(u32, u32)> {
    vec![(640, 480), (1280, 720), (1920, 1080)]
}
fn default_acquire_delay_ms() -> u64 {
    20
}
fn default_ready_delay_ms() -> u64 {
    50
}
fn default_ready_event() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = KioskConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.camera.resolution, (1280, 720));
        assert_eq!(config.camera.facing, Facing::User);
        assert_eq!(config.playback.fallback(), Duration::from_secs(1));
        assert_eq!(config.capture.jpeg_quality, 85);
        assert_eq!(config.capture.min_ready(), ReadyState::HaveCurrentData);
    }

    #[test]
    fn test_config_validation() {
        let mut config = KioskConfig::default();
        config.camera.resolution = (0, 720);
        assert!(config.validate().is_err());

        config.camera.resolution = (1280, 720);
        config.capture.jpeg_quality = 0;
        assert!(config.validate().is_err());

        config.capture.jpeg_quality = 101;
        assert!(config.validate().is_err());

        config.capture.jpeg_quality = 90;
        config.capture.min_ready_state = 7;
        assert!(config.validate().is_err());

        config.capture.min_ready_state = 2;
        config.playback.fallback_ms = 0;
        assert!(config.validate().is_err());

        config.playback.fallback_ms = 500;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[camera]
facing = "environment"
resolution = [640, 480]

[playback]
fallback_ms = 250

[capture]
jpeg_quality = 70
"#
        )
        .unwrap();

        let config = KioskConfig::load_from_file(file.path()).unwrap();

        assert_eq!(config.camera.facing, Facing::Environment);
        assert_eq!(config.camera.resolution, (640, 480));
        assert_eq!(config.playback.fallback_ms, 250);
        assert_eq!(config.capture.jpeg_quality, 70);
        assert_eq!(config.capture.min_frame_bytes, 100);
        assert_eq!(config.events.notification_seconds, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = KioskConfig::load_from_file(dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.camera.resolution, (1280, 720));
        assert_eq!(config.simulation.supported_resolutions.len(), 3);
        assert_eq!(config.simulation.ready_delay_ms, 50);
        assert!(config.simulation.ready_event);
    }

    #[test]
    fn test_constraints_from_camera_config() {
        let config = KioskConfig::default();
        let constraints = config.camera.constraints();

        assert_eq!(constraints.facing, Facing::User);
        assert_eq!(constraints.ideal_width, 1280);
        assert_eq!(constraints.ideal_height, 720);
    }

    #[test]
    fn test_capture_defaults_match_kiosk_defaults() {
        let capture = CaptureConfig::default();

        assert_eq!(capture, KioskConfig::default().capture);
        assert_eq!(capture.jpeg_quality, 85);
        assert_eq!(capture.min_frame_bytes, 100);
        assert_eq!(capture.min_ready(), ReadyState::HaveCurrentData);
    }
}
