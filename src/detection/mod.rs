mod client;
mod multipart;
mod record;

pub use client::{DetectionService, HttpDetectionClient, IMAGE_FIELD, IMAGE_FILENAME};
pub use multipart::MultipartBody;
pub use record::{Detection, DetectionResponse, IndicatorColor};
