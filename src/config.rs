use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CatwatchConfig {
    pub camera: CameraConfig,
    pub surface: SurfaceConfig,
    pub capture: CaptureConfig,
    pub detector: DetectorConfig,
    pub ui: UiConfig,
    pub system: SystemConfig,
}

/// Where camera frames come from
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CameraSource {
    /// V4L2 device through GStreamer
    Device,
    /// Synthetic moving pattern, no hardware needed
    TestPattern,
    /// Acquisition disabled
    None,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Frame source
    #[serde(default = "default_camera_source")]
    pub source: CameraSource,

    /// Camera device index (e.g., 0 for /dev/video0)
    #[serde(default = "default_camera_index")]
    pub index: u32,

    /// Camera resolution (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Frames per second
    #[serde(default = "default_camera_fps")]
    pub fps: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SurfaceConfig {
    /// Drawing surface width in pixels
    #[serde(default = "default_surface_width")]
    pub width: u32,

    /// Drawing surface height in pixels
    #[serde(default = "default_surface_height")]
    pub height: u32,

    /// Render loop ticks per second
    #[serde(default = "default_refresh_hz")]
    pub refresh_hz: u32,

    /// JPEG quality used when extracting the surface
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CaptureConfig {
    /// Seconds between captures while capturing
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DetectorConfig {
    /// Detection endpoint receiving the multipart upload
    #[serde(default = "default_detector_endpoint")]
    pub endpoint: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UiConfig {
    /// IP address to bind to
    #[serde(default = "default_ui_ip")]
    pub ip: String,

    /// Port to listen on
    #[serde(default = "default_ui_port")]
    pub port: u16,

    /// Frame rate of the surface MJPEG stream
    #[serde(default = "default_ui_stream_fps")]
    pub stream_fps: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl CaptureConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl CatwatchConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("catwatch.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.source", "device")?
            .set_default("camera.index", default_camera_index())?
            .set_default(
                "camera.resolution",
                vec![default_camera_resolution().0, default_camera_resolution().1],
            )?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("surface.width", default_surface_width())?
            .set_default("surface.height", default_surface_height())?
            .set_default("surface.refresh_hz", default_refresh_hz())?
            .set_default("surface.jpeg_quality", default_jpeg_quality() as u32)?
            .set_default("capture.interval_seconds", default_interval_seconds())?
            .set_default("detector.endpoint", default_detector_endpoint())?
            .set_default("ui.ip", default_ui_ip())?
            .set_default("ui.port", default_ui_port())?
            .set_default("ui.stream_fps", default_ui_stream_fps())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .add_source(File::with_name(&path_str).required(false))
            // CATWATCH_CAPTURE__INTERVAL_SECONDS=5 -> capture.interval_seconds
            .add_source(
                Environment::with_prefix("CATWATCH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: CatwatchConfig = settings.try_deserialize()?;

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

        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        if self.surface.width == 0 || self.surface.height == 0 {
            return Err(ConfigError::Message(
                "Surface size must be greater than 0".to_string(),
            ));
        }

        if self.surface.refresh_hz == 0 {
            return Err(ConfigError::Message(
                "Surface refresh_hz must be greater than 0".to_string(),
            ));
        }

        if !(1..=100).contains(&self.surface.jpeg_quality) {
            return Err(ConfigError::Message(
                "Surface jpeg_quality must be between 1 and 100".to_string(),
            ));
        }

        if self.capture.interval_seconds == 0 {
            return Err(ConfigError::Message(
                "Capture interval_seconds must be greater than 0".to_string(),
            ));
        }

        // ureq is built without TLS
        if !self.detector.endpoint.starts_with("http://") {
            return Err(ConfigError::Message(format!(
                "Detector endpoint must be an http:// URL, got '{}'",
                self.detector.endpoint
            )));
        }

        if self.ui.stream_fps == 0 {
            return Err(ConfigError::Message(
                "UI stream_fps must be greater than 0".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for CatwatchConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                source: default_camera_source(),
                index: default_camera_index(),
                resolution: default_camera_resolution(),
                fps: default_camera_fps(),
            },
            surface: SurfaceConfig {
                width: default_surface_width(),
                height: default_surface_height(),
                refresh_hz: default_refresh_hz(),
                jpeg_quality: default_jpeg_quality(),
            },
            capture: CaptureConfig {
                interval_seconds: default_interval_seconds(),
            },
            detector: DetectorConfig {
                endpoint: default_detector_endpoint(),
            },
            ui: UiConfig {
                ip: default_ui_ip(),
                port: default_ui_port(),
                stream_fps: default_ui_stream_fps(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
            },
        }
    }
}

// Default value functions
fn default_camera_source() -> CameraSource {
    CameraSource::Device
}
fn default_camera_index() -> u32 {
    0
}
fn default_camera_resolution() -> (u32, u32) {
    (640, 480)
}
fn default_camera_fps() -> u32 {
    30
}

fn default_surface_width() -> u32 {
    640
}
fn default_surface_height() -> u32 {
    480
}
fn default_refresh_hz() -> u32 {
    60
}
fn default_jpeg_quality() -> u8 {
    92
}

fn default_interval_seconds() -> u64 {
    10
}

fn default_detector_endpoint() -> String {
    "http://127.0.0.1:5000/detect".to_string()
}

fn default_ui_ip() -> String {
    "127.0.0.1".to_string()
}
fn default_ui_port() -> u16 {
    8080
}
fn default_ui_stream_fps() -> u32 {
    10
}

fn default_event_bus_capacity() -> usize {
    100
}
