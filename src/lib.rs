pub mod app;
pub mod camera;
pub mod capture;
pub mod config;
pub mod detection;
pub mod error;
pub mod events;
pub mod frame;
pub mod session;
pub mod surface;
pub mod ui;

pub use app::{CatwatchOrchestrator, ComponentState, ShutdownReason};
pub use camera::{CameraInterface, CameraInterfaceBuilder, TestPattern};
pub use capture::CaptureController;
pub use config::CatwatchConfig;
pub use detection::{
    Detection, DetectionResponse, DetectionService, HttpDetectionClient, IndicatorColor,
};
pub use error::{CatwatchError, Result};
pub use events::{CatwatchEvent, ControlAction, EventBus, EventFilter, EventReceiver};
pub use frame::{FrameData, FrameFormat, VideoSource};
pub use session::{CaptureState, Session, SessionSnapshot};
pub use surface::{DrawingSurface, RenderLoop};

#[cfg(feature = "ui")]
pub use ui::UiServer;
