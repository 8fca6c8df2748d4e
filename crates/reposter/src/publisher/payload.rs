//! Wire types for the LinkedIn content API.
//!
//! Field names are fixed by the platform and must not change.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const SHARE_CONTENT_KEY: &str = "com.linkedin.ugc.ShareContent";
pub const MEMBER_VISIBILITY_KEY: &str = "com.linkedin.ugc.MemberNetworkVisibility";
pub const UPLOAD_MECHANISM_KEY: &str = "com.linkedin.digitalmedia.uploading.MediaUploadHttpRequest";
pub const FEEDSHARE_IMAGE_RECIPE: &str = "urn:li:digitalmediaRecipe:feedshare-image";

/// URN of a member.
pub fn person_urn(user_id: &str) -> String {
    format!("urn:li:person:{user_id}")
}

/// Response from `GET /v2/me`.
#[derive(Debug, Deserialize)]
pub struct Profile {
    pub id: String,
}

/// Body of `POST /v2/assets?action=registerUpload`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUploadBody {
    pub register_upload_request: RegisterUploadRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUploadRequest {
    pub recipes: Vec<String>,
    pub owner: String,
    pub service_relationships: Vec<ServiceRelationship>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRelationship {
    pub relationship_type: String,
    pub identifier: String,
}

impl RegisterUploadBody {
    /// Image upload owned by `user_id`.
    pub fn image(user_id: &str) -> Self {
        Self {
            register_upload_request: RegisterUploadRequest {
                recipes: vec![FEEDSHARE_IMAGE_RECIPE.to_string()],
                owner: person_urn(user_id),
                service_relationships: vec![ServiceRelationship {
                    relationship_type: "OWNER".to_string(),
                    identifier: "urn:li:userGeneratedContent".to_string(),
                }],
            },
        }
    }
}

/// Response from the upload registration.
#[derive(Debug, Deserialize)]
pub struct RegisterUploadResponse {
    pub value: RegisteredUpload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUpload {
    pub upload_mechanism: HashMap<String, UploadMechanism>,
    pub asset: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMechanism {
    pub upload_url: String,
}

impl RegisteredUpload {
    /// URL the image bytes are PUT to.
    pub fn upload_url(&self) -> Option<&str> {
        self.upload_mechanism
            .get(UPLOAD_MECHANISM_KEY)
            .map(|m| m.upload_url.as_str())
    }
}

/// Body of `POST /v2/ugcPosts`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharePost {
    pub author: String,
    pub lifecycle_state: String,
    pub specific_content: HashMap<String, ShareContent>,
    pub visibility: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareContent {
    pub share_commentary: Text,
    pub share_media_category: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<ShareMedia>,
}

#[derive(Debug, Serialize)]
pub struct ShareMedia {
    pub status: String,
    pub description: Text,
    pub media: String,
    pub title: Text,
}

#[derive(Debug, Serialize)]
pub struct Text {
    pub text: String,
}

impl Text {
    fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl SharePost {
    /// Public post with `text` and, if given, one uploaded image.
    pub fn new(user_id: &str, text: &str, asset: Option<&str>) -> Self {
        let (category, media) = match asset {
            Some(asset) => (
                "IMAGE",
                vec![ShareMedia {
                    status: "READY".to_string(),
                    description: Text::new(""),
                    media: asset.to_string(),
                    title: Text::new(""),
                }],
            ),
            None => ("NONE", Vec::new()),
        };

        Self {
            author: person_urn(user_id),
            lifecycle_state: "PUBLISHED".to_string(),
            specific_content: HashMap::from([(
                SHARE_CONTENT_KEY.to_string(),
                ShareContent {
                    share_commentary: Text::new(text),
                    share_media_category: category.to_string(),
                    media,
                },
            )]),
            visibility: HashMap::from([(MEMBER_VISIBILITY_KEY.to_string(), "PUBLIC".to_string())]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_only_post_shape() {
        let post = SharePost::new("abc", "hello", None);
        assert_eq!(
            serde_json::to_value(&post).unwrap(),
            json!({
                "author": "urn:li:person:abc",
                "lifecycleState": "PUBLISHED",
                "specificContent": {
                    "com.linkedin.ugc.ShareContent": {
                        "shareCommentary": {"text": "hello"},
                        "shareMediaCategory": "NONE"
                    }
                },
                "visibility": {"com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC"}
            })
        );
    }

    #[test]
    fn test_image_post_shape() {
        let post = SharePost::new("abc", "hello", Some("urn:li:digitalmediaAsset:1"));
        let value = serde_json::to_value(&post).unwrap();
        let content = &value["specificContent"]["com.linkedin.ugc.ShareContent"];
        assert_eq!(content["shareMediaCategory"], "IMAGE");
        assert_eq!(
            content["media"],
            json!([{
                "status": "READY",
                "description": {"text": ""},
                "media": "urn:li:digitalmediaAsset:1",
                "title": {"text": ""}
            }])
        );
    }

    #[test]
    fn test_register_upload_shape() {
        let body = RegisterUploadBody::image("abc");
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "registerUploadRequest": {
                    "recipes": ["urn:li:digitalmediaRecipe:feedshare-image"],
                    "owner": "urn:li:person:abc",
                    "serviceRelationships": [{
                        "relationshipType": "OWNER",
                        "identifier": "urn:li:userGeneratedContent"
                    }]
                }
            })
        );
    }

    #[test]
    fn test_register_upload_response() {
        let raw = json!({
            "value": {
                "uploadMechanism": {
                    "com.linkedin.digitalmedia.uploading.MediaUploadHttpRequest": {
                        "headers": {},
                        "uploadUrl": "https://upload.example.com/xyz"
                    }
                },
                "mediaArtifact": "urn:li:digitalmediaMediaArtifact:1",
                "asset": "urn:li:digitalmediaAsset:1"
            }
        });
        let parsed: RegisterUploadResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.value.asset, "urn:li:digitalmediaAsset:1");
        assert_eq!(parsed.value.upload_url(), Some("https://upload.example.com/xyz"));
    }
}
