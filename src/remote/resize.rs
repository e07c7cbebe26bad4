use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};

use crate::foundation::core::JobId;
use crate::foundation::error::{SlideError, SlideResult};

/// Capability: the remote image service that prepares a job's images.
///
/// Both calls deposit their results next to the job (resized images in the job's working
/// directory, or a collage in the output directory) and return the service's message.
pub trait ResizeService: Send + Sync {
    /// Upload raw images for resizing into the job directory.
    fn resize(&self, job: &JobId, images: &[Vec<u8>]) -> SlideResult<String>;
    /// Upload raw images to be combined into a single collage.
    fn collage(&self, job: &JobId, images: &[Vec<u8>]) -> SlideResult<String>;
}

/// [`ResizeService`] speaking multipart HTTP.
pub struct HttpResizeClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpResizeClient {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> SlideResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(SlideError::config("resize service url must be non-empty"));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SlideError::remote(format!("failed to build http client: {e}")))?;
        Ok(Self { base_url, client })
    }

    /// Full URL of a service route.
    pub fn endpoint(&self, route: &str) -> String {
        format!("{}/{}", self.base_url, route.trim_start_matches('/'))
    }

    fn post(&self, route: &str, job: &JobId, images: &[Vec<u8>]) -> SlideResult<String> {
        if images.is_empty() {
            return Err(SlideError::validation("no images to upload"));
        }
        let url = self.endpoint(route);
        tracing::info!(%url, job = %job, images = images.len(), "uploading images");

        let resp = self
            .client
            .post(&url)
            .multipart(build_form(job, images)?)
            .send()
            .map_err(|e| SlideError::remote(format!("POST {url} failed: {e}")))?;
        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| SlideError::remote(format!("reading response from {url} failed: {e}")))?;
        if !status.is_success() {
            return Err(SlideError::remote(format!(
                "POST {url} returned {status}: {}",
                body.trim()
            )));
        }
        tracing::debug!(%url, response = %body.trim(), "upload accepted");
        Ok(body)
    }
}

impl ResizeService for HttpResizeClient {
    fn resize(&self, job: &JobId, images: &[Vec<u8>]) -> SlideResult<String> {
        self.post("resize", job, images)
    }

    fn collage(&self, job: &JobId, images: &[Vec<u8>]) -> SlideResult<String> {
        self.post("collage", job, images)
    }
}

/// One `images` file part per image (`<i>.jpg`), then a `video_id` file part holding the id.
fn build_form(job: &JobId, images: &[Vec<u8>]) -> SlideResult<Form> {
    let mut form = Form::new();
    for (i, bytes) in images.iter().enumerate() {
        let part = Part::bytes(bytes.clone())
            .file_name(format!("{i}.jpg"))
            .mime_str("image/jpeg")
            .map_err(|e| SlideError::remote(format!("invalid image part: {e}")))?;
        form = form.part("images", part);
    }
    let id_part = Part::bytes(job.as_str().as_bytes().to_vec()).file_name(job.to_string());
    Ok(form.part("video_id", id_part))
}

#[cfg(test)]
#[path = "../../tests/unit/remote/resize.rs"]
mod tests;
