// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Vision model access: a REST client plus the per-request source that
//! prefers inline detections.

use crate::types::PhotoPayload;
use damage_locator_core::DamageDetection;
use damage_locator_processing::{VisionClient, VisionError};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Accepted response shapes from the vision endpoint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VisionResponse {
    Wrapped { damages: Vec<DamageDetection> },
    Bare(Vec<DamageDetection>),
}

impl VisionResponse {
    fn into_detections(self) -> Vec<DamageDetection> {
        match self {
            VisionResponse::Wrapped { damages } => damages,
            VisionResponse::Bare(damages) => damages,
        }
    }
}

/// Parse a vision endpoint response body.
pub fn parse_response(body: &[u8]) -> Result<Vec<DamageDetection>, VisionError> {
    serde_json::from_slice::<VisionResponse>(body)
        .map(VisionResponse::into_detections)
        .map_err(|e| VisionError::InvalidResponse(e.to_string()))
}

/// REST client for the vision model.
#[derive(Debug, Clone)]
pub struct HttpVisionClient {
    endpoint: String,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl HttpVisionClient {
    /// Create a new client for `endpoint`.
    pub fn new(endpoint: &str, api_key: Option<String>, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            http: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    fn auth_headers(&self) -> Result<HeaderMap, VisionError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &self.api_key {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", key))
                    .map_err(|e| VisionError::Transport(format!("Invalid API key header: {e}")))?,
            );
        }
        Ok(headers)
    }

    /// Send one base64 photo and return the damage found in it.
    pub async fn detect(&self, image_base64: &str) -> Result<Vec<DamageDetection>, VisionError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .headers(self.auth_headers()?)
            .json(&serde_json::json!({
                "image": image_base64,
                "mediaType": "image/jpeg",
            }))
            .send()
            .await
            .map_err(|e| VisionError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| VisionError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(VisionError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).chars().take(200).collect(),
            });
        }

        parse_response(&body)
    }
}

/// Vision source for one analyze request.
///
/// Photos that carry inline detections are answered locally; the rest go to
/// the configured endpoint with their base64 image.
pub struct RequestVision {
    photos: Vec<PhotoSource>,
    client: Option<Arc<HttpVisionClient>>,
}

enum PhotoSource {
    Inline(Vec<DamageDetection>),
    Image(String),
    Missing,
}

impl RequestVision {
    pub fn new(photos: &[PhotoPayload], client: Option<Arc<HttpVisionClient>>) -> Self {
        let photos = photos
            .iter()
            .map(|photo| match (&photo.detections, &photo.image) {
                (Some(detections), _) => PhotoSource::Inline(detections.clone()),
                (None, Some(image)) => PhotoSource::Image(image.clone()),
                (None, None) => PhotoSource::Missing,
            })
            .collect();
        Self { photos, client }
    }

    /// Whether any photo needs the remote endpoint.
    pub fn needs_remote(&self) -> bool {
        self.photos
            .iter()
            .any(|p| matches!(p, PhotoSource::Image(_)))
    }
}

impl VisionClient for RequestVision {
    async fn analyze_photo(&self, photo_index: usize) -> Result<Vec<DamageDetection>, VisionError> {
        match self.photos.get(photo_index) {
            Some(PhotoSource::Inline(detections)) => Ok(detections.clone()),
            Some(PhotoSource::Image(image)) => match &self.client {
                Some(client) => client.detect(image).await,
                None => Err(VisionError::Transport("no vision endpoint configured".into())),
            },
            Some(PhotoSource::Missing) | None => Err(VisionError::MissingPhoto(photo_index)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wrapped_and_bare_responses() {
        let wrapped = br#"{"damages": [{"type": "Crack", "description": "diagonal", "confidence": 0.8,
            "boundingBox": {"x": 0.1, "y": 0.2, "width": 0.3, "height": 0.1}}]}"#;
        let detections = parse_response(wrapped).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].damage_type, "Crack");
        assert!(detections[0].bounding_box.is_some());

        let bare = br#"[{"type": "stain", "confidence": 0.4}]"#;
        let detections = parse_response(bare).unwrap();
        assert_eq!(detections[0].description, "");
        assert!(detections[0].bounding_box.is_none());
    }

    #[test]
    fn test_parse_invalid_response() {
        assert!(matches!(
            parse_response(b"<html>rate limited</html>"),
            Err(VisionError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_inline_detections_answer_locally() {
        let photo = PhotoPayload {
            image_width: 640,
            image_height: 480,
            pose: None,
            intrinsics: None,
            depth: None,
            image: Some("aGVsbG8=".into()),
            detections: Some(Vec::new()),
        };
        let mut remote = photo.clone();
        remote.detections = None;

        let vision = RequestVision::new(&[photo, remote], None);
        assert!(vision.needs_remote());
        assert_eq!(vision.analyze_photo(0).await, Ok(Vec::new()));
        assert!(matches!(
            vision.analyze_photo(1).await,
            Err(VisionError::Transport(_))
        ));
        assert_eq!(vision.analyze_photo(2).await, Err(VisionError::MissingPhoto(2)));
    }
}
