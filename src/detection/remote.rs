//! リモート検出エンドポイント
//!
//! `POST /detect` に `{ "image": <Data URL> }` を送り、
//! `{ "detections": [...] }` を受け取る。2xx以外は失敗として次段へ回す。

use super::DetectionProvider;
use crate::scanner::LoadedImage;
use anyhow::{bail, Context};
use endo_lens_common::{DetectionSource, FallbackDetection};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct DetectRequest<'a> {
    image: &'a str,
}

#[derive(Deserialize)]
struct DetectResponse {
    #[serde(default)]
    detections: Vec<FallbackDetection>,
}

pub struct RemoteDetector {
    http: reqwest::Client,
    endpoint: String,
}

impl RemoteDetector {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    async fn request(&self, image: &LoadedImage) -> anyhow::Result<Vec<FallbackDetection>> {
        let data_url = image.to_jpeg_data_url()?;

        log::debug!("calling remote detector at {}", self.endpoint);
        let response = self
            .http
            .post(&self.endpoint)
            .json(&DetectRequest { image: &data_url })
            .send()
            .await
            .with_context(|| format!("remote detector unreachable: {}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            bail!("remote detector returned {}", status);
        }

        let body: DetectResponse = response
            .json()
            .await
            .context("remote detector returned malformed JSON")?;
        Ok(body.detections)
    }
}

impl DetectionProvider for RemoteDetector {
    fn source(&self) -> DetectionSource {
        DetectionSource::Remote
    }

    fn detect<'a>(&'a self, image: &'a LoadedImage) -> BoxFuture<'a, anyhow::Result<Vec<FallbackDetection>>> {
        self.request(image).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialize() {
        let json = serde_json::to_string(&DetectRequest { image: "data:image/jpeg;base64,AAAA" }).unwrap();
        assert_eq!(json, r#"{"image":"data:image/jpeg;base64,AAAA"}"#);
    }

    #[test]
    fn test_response_deserialize() {
        let json = r#"{"detections":[{"bbox":[0.1,0.2,0.3,0.4],"class":"Total Endodontic Failure","score":0.88}]}"#;
        let response: DetectResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.detections.len(), 1);
        assert_eq!(response.detections[0].class_name, "Total Endodontic Failure");
    }

    #[test]
    fn test_response_without_detections() {
        let response: DetectResponse = serde_json::from_str("{}").unwrap();
        assert!(response.detections.is_empty());
    }
}
