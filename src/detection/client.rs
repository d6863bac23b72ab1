use super::multipart::MultipartBody;
use super::record::DetectionResponse;
use crate::config::DetectorConfig;
use crate::error::DetectorError;
use async_trait::async_trait;
use tracing::{debug, trace};

/// Form field carrying the frame
pub const IMAGE_FIELD: &str = "image";
/// Filename announced for the frame
pub const IMAGE_FILENAME: &str = "image.jpg";

/// Remote object detector accepting one JPEG per call
#[async_trait]
pub trait DetectionService: Send + Sync {
    async fn detect(&self, jpeg: Vec<u8>) -> Result<DetectionResponse, DetectorError>;
}

/// HTTP client for the `/detect` endpoint.
///
/// One POST per call, no retries. The agent is built with ureq's defaults, so
/// there is no overall request timeout.
#[derive(Clone)]
pub struct HttpDetectionClient {
    agent: ureq::Agent,
    endpoint: String,
}

impl HttpDetectionClient {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
            endpoint: config.endpoint.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn post_blocking(
        agent: &ureq::Agent,
        endpoint: &str,
        form: &MultipartBody,
    ) -> Result<String, DetectorError> {
        let response = agent
            .post(endpoint)
            .set("Content-Type", &form.content_type())
            .send_bytes(form.as_bytes())?;

        trace!("Detection service replied with HTTP {}", response.status());

        response.into_string().map_err(DetectorError::Body)
    }
}

#[async_trait]
impl DetectionService for HttpDetectionClient {
    async fn detect(&self, jpeg: Vec<u8>) -> Result<DetectionResponse, DetectorError> {
        let form = MultipartBody::single_file(IMAGE_FIELD, IMAGE_FILENAME, "image/jpeg", &jpeg);
        debug!(
            "Uploading {} byte frame to {} ({} byte body)",
            jpeg.len(),
            self.endpoint,
            form.len()
        );

        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();
        let body = tokio::task::spawn_blocking(move || Self::post_blocking(&agent, &endpoint, &form))
            .await
            .map_err(|e| DetectorError::Transport {
                details: format!("upload task failed: {}", e),
            })??;

        DetectionResponse::from_json(&body)
    }
}
