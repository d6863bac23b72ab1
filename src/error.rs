use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatwatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),

    #[error("Detector error: {0}")]
    Detector(#[from] DetectorError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("UI error: {0}")]
    Ui(#[from] UiError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl CatwatchError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Camera acquisition disabled by configuration")]
    Disabled,

    #[error("Camera device {index} unavailable: {details}")]
    DeviceOpen { index: u32, details: String },

    #[error("Camera configuration failed: {details}")]
    Configuration { details: String },

    #[error("Camera stream error: {details}")]
    CaptureStream { details: String },
}

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("Failed to decode frame {frame_id}: {details}")]
    Decode { frame_id: u64, details: String },

    #[error("Frame {frame_id} has {actual} bytes, expected {expected}")]
    FrameSize {
        frame_id: u64,
        expected: usize,
        actual: usize,
    },

    #[error("JPEG encoding failed: {details}")]
    JpegEncoding { details: String },

    #[error("Surface worker task failed: {details}")]
    Worker { details: String },
}

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Transport failure: {details}")]
    Transport { details: String },

    #[error("Detection service returned HTTP {code}")]
    Status { code: u16, body: String },

    #[error("Failed to read response body: {0}")]
    Body(#[source] std::io::Error),

    #[error("Malformed response: {details}")]
    Malformed { details: String },
}

impl From<ureq::Error> for DetectorError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, response) => DetectorError::Status {
                code,
                body: response.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(transport) => DetectorError::Transport {
                details: transport.to_string(),
            },
        }
    }
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event bus channel closed")]
    ChannelClosed,
}

#[derive(Error, Debug)]
pub enum UiError {
    #[error("Failed to bind {address}: {source}")]
    BindFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("UI server failed: {details}")]
    ServerFailed { details: String },
}

pub type Result<T> = std::result::Result<T, CatwatchError>;
