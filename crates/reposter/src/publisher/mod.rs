//! LinkedIn content API client.
//!
//! Resolves the acting member, uploads an optional image and creates the
//! post. Nothing here retries: a failed call ends the current attempt and the
//! next scheduled cycle starts over.

mod payload;

pub use payload::{person_urn, SharePost};

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use tempfile::TempPath;

use crate::error::{AgentError, Result};
use crate::finder::Candidate;
use payload::{Profile, RegisterUploadBody, RegisterUploadResponse};

/// Production API host.
pub const DEFAULT_API_BASE: &str = "https://api.linkedin.com";

const RESTLI_PROTOCOL_HEADER: &str = "X-Restli-Protocol-Version";
const RESTLI_PROTOCOL_VERSION: &str = "2.0.0";

/// Drop every code point outside the Basic Multilingual Plane.
///
/// Emoji and other astral characters have broken post creation before, so
/// they are removed rather than escaped.
pub fn sanitize_text(text: &str) -> String {
    text.chars().filter(|c| u32::from(*c) <= 0xFFFF).collect()
}

/// Text of the republished post.
pub fn compose_text(candidate: &Candidate) -> String {
    format!("{}\n\n(via {})", candidate.body_text, candidate.author)
}

/// Client for identity lookup, image upload and post creation.
#[derive(Debug, Clone)]
pub struct ContentPublisher {
    client: Client,
    api_base: String,
    temp_dir: Option<PathBuf>,
}

impl ContentPublisher {
    /// Create a publisher against `api_base`.
    pub fn new(api_base: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            temp_dir: None,
        })
    }

    /// Put downloaded images in `dir` instead of the system temp directory.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    /// Member id behind `token`.
    pub async fn resolve_identity(&self, token: &str) -> Result<String> {
        let response = self
            .client
            .get(self.endpoint("/v2/me"))
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body, "Identity lookup rejected");
            return Err(AgentError::Auth(format!("identity lookup returned {status}")));
        }

        let profile: Profile = response.json().await?;
        tracing::debug!(user_id = %profile.id, "Resolved identity");
        Ok(profile.id)
    }

    /// Fetch an image into a uniquely named temp file.
    ///
    /// Best effort: any failure is logged and yields `None`.
    pub async fn download_image(&self, url: &str) -> Option<TempPath> {
        match self.fetch_to_temp(url).await {
            Ok(Some(path)) => Some(path),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(url, error = %e, "Image download failed");
                None
            }
        }
    }

    async fn fetch_to_temp(&self, url: &str) -> anyhow::Result<Option<TempPath>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            tracing::warn!(url, %status, "Image download returned non-200");
            return Ok(None);
        }
        let bytes = response.bytes().await?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("repost-image-").suffix(".img");
        let mut file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(&bytes)?;
        file.flush()?;

        let path = file.into_temp_path();
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Downloaded image");
        Ok(Some(path))
    }

    /// Register an upload and PUT the image bytes.
    ///
    /// Takes ownership of the temp file and deletes it before returning,
    /// whatever the outcome.
    pub async fn upload_image(&self, image: TempPath, user_id: &str, token: &str) -> Option<String> {
        let result = self.try_upload(&image, user_id, token).await;

        let staged = image.display().to_string();
        if let Err(e) = image.close() {
            tracing::warn!(path = %staged, error = %e, "Failed to remove temp image");
        }

        match result {
            Ok(asset) => {
                tracing::info!(asset = %asset, "Uploaded image");
                Some(asset)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Image upload failed, posting without image");
                None
            }
        }
    }

    async fn try_upload(&self, image: &TempPath, user_id: &str, token: &str) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint("/v2/assets?action=registerUpload"))
            .bearer_auth(token)
            .header(RESTLI_PROTOCOL_HEADER, RESTLI_PROTOCOL_VERSION)
            .json(&RegisterUploadBody::image(user_id))
            .send()
            .await?;
        expect_ok_or_created("registerUpload", response.status())?;

        let registered: RegisterUploadResponse = response.json().await?;
        let upload_url = registered
            .value
            .upload_url()
            .ok_or(AgentError::MalformedResponse("registerUpload returned no upload URL"))?
            .to_string();

        let bytes = tokio::fs::read(image).await?;

        let response = self
            .client
            .put(&upload_url)
            .bearer_auth(token)
            .body(bytes)
            .send()
            .await?;
        expect_ok_or_created("image upload", response.status())?;

        Ok(registered.value.asset)
    }

    /// Create a public post. Returns true only when the API reports 201.
    ///
    /// Fails with [`AgentError::Auth`] when the token is rejected during the
    /// identity lookup.
    pub async fn publish(&self, text: &str, asset: Option<&str>, token: &str) -> Result<bool> {
        let user_id = self.resolve_identity(token).await?;
        let post = SharePost::new(&user_id, &sanitize_text(text), asset);

        let response = self
            .client
            .post(self.endpoint("/v2/ugcPosts"))
            .bearer_auth(token)
            .header(RESTLI_PROTOCOL_HEADER, RESTLI_PROTOCOL_VERSION)
            .json(&post)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::CREATED {
            tracing::info!(with_image = asset.is_some(), "Post created");
            return Ok(true);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(%status, body, "Post creation failed");
        Ok(false)
    }
}

fn expect_ok_or_created(operation: &'static str, status: StatusCode) -> Result<()> {
    if status == StatusCode::OK || status == StatusCode::CREATED {
        Ok(())
    } else {
        Err(AgentError::UnexpectedStatus {
            operation,
            status: status.as_u16(),
        })
    }
}
