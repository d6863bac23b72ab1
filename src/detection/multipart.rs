use uuid::Uuid;

/// A `multipart/form-data` body holding exactly one file part.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    boundary: String,
    bytes: Vec<u8>,
}

impl MultipartBody {
    /// Build a body with a single file field
    pub fn single_file(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        let boundary = format!("catwatch-{}", Uuid::new_v4().simple());
        Self::with_boundary(boundary, field, filename, content_type, data)
    }

    fn with_boundary(
        boundary: String,
        field: &str,
        filename: &str,
        content_type: &str,
        data: &[u8],
    ) -> Self {
        let header = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        );
        let trailer = format!("\r\n--{boundary}--\r\n");

        let mut bytes = Vec::with_capacity(header.len() + data.len() + trailer.len());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(data);
        bytes.extend_from_slice(trailer.as_bytes());

        Self { boundary, bytes }
    }

    /// Value for the request's `Content-Type` header
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
