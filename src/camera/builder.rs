use super::interface::CameraInterface;
use crate::config::CameraConfig;
use crate::error::{CameraError, CatwatchError, Result};

/// Checks camera settings before any device or pipeline is touched
pub struct CameraInterfaceBuilder {
    config: Option<CameraConfig>,
}

impl CameraInterfaceBuilder {
    pub fn new() -> Self {
        Self { config: None }
    }

    pub fn config(mut self, config: CameraConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub async fn build(self) -> Result<CameraInterface> {
        let config = self
            .config
            .ok_or_else(|| CatwatchError::system("Camera configuration must be specified"))?;

        let (width, height) = config.resolution;
        if width == 0 || height == 0 {
            return Err(CameraError::Configuration {
                details: format!("resolution {}x{} has an empty side", width, height),
            }
            .into());
        }
        if config.fps == 0 {
            return Err(CameraError::Configuration {
                details: "frame rate must be at least 1 fps".to_string(),
            }
            .into());
        }

        CameraInterface::new(config).await
    }
}

impl Default for CameraInterfaceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
