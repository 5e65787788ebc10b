// src/ingest/providers/huggingface.rs
use async_trait::async_trait;

use super::{classify_status, http_client, network_error, with_backoff, RetryPolicy};
use crate::ingest::types::{HfModel, RawSourceRecord, Source, SourceClient, SourceError, SourceQuery};

pub const HF_API: &str = "https://huggingface.co";

/// Model hub search, sorted by likes.
pub struct HuggingFaceClient {
    mode: Mode,
    retry: RetryPolicy,
}

enum Mode {
    Fixture(String),
    Http {
        base_url: String,
        client: reqwest::Client,
    },
}

impl HuggingFaceClient {
    pub fn new() -> Self {
        Self::with_base_url(HF_API)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            mode: Mode::Http {
                base_url: base_url.trim_end_matches('/').to_string(),
                client: http_client(),
            },
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn get_once(
        client: &reqwest::Client,
        base_url: &str,
        q: &SourceQuery,
    ) -> Result<String, SourceError> {
        let limit = q.limit.max(1).to_string();
        let resp = client
            .get(format!("{base_url}/api/models"))
            .query(&[
                ("search", q.query.as_str()),
                ("sort", "likes"),
                ("direction", "-1"),
                ("limit", limit.as_str()),
                ("full", "true"),
            ])
            .send()
            .await
            .map_err(network_error)?;
        if let Some(err) = classify_status(resp.status(), false) {
            return Err(err);
        }
        resp.text().await.map_err(network_error)
    }
}

impl Default for HuggingFaceClient {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn parse_models(body: &str, limit: usize) -> Result<Vec<RawSourceRecord>, SourceError> {
    let models: Vec<HfModel> =
        serde_json::from_str(body).map_err(|e| SourceError::Decode(format!("hf models: {e}")))?;
    Ok(models
        .into_iter()
        .take(limit)
        .map(RawSourceRecord::HuggingFace)
        .collect())
}

#[async_trait]
impl SourceClient for HuggingFaceClient {
    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<RawSourceRecord>, SourceError> {
        let body = match &self.mode {
            Mode::Fixture(s) => s.clone(),
            Mode::Http { base_url, client } => {
                with_backoff(&self.retry, Source::HuggingFace, move || {
                    Self::get_once(client, base_url, query)
                })
                .await?
            }
        };
        parse_models(&body, query.limit)
    }

    fn source(&self) -> Source {
        Source::HuggingFace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_parses_both_id_spellings() {
        let body = r#"[
          {"_id": "x1", "id": "amazon/chronos-t5-small", "likes": 120, "downloads": 5000,
           "createdAt": "2024-02-21T10:00:00.000Z", "pipeline_tag": "time-series-forecasting",
           "tags": ["transformers", "time series"]},
          {"modelId": "org/legacy", "likes": 2}
        ]"#;
        let out = parse_models(body, 10).unwrap();
        assert_eq!(out.len(), 2);
        let RawSourceRecord::HuggingFace(first) = &out[0] else {
            panic!("wrong variant");
        };
        assert_eq!(first.id.as_deref(), Some("amazon/chronos-t5-small"));
        assert_eq!(first.likes, Some(120));
        let RawSourceRecord::HuggingFace(second) = &out[1] else {
            panic!("wrong variant");
        };
        assert_eq!(second.model_id.as_deref(), Some("org/legacy"));
    }

    #[test]
    fn card_front_matter_yields_description() {
        let body = r#"[
          {"id": "org/tsm", "likes": 4, "createdAt": "2024-05-01T00:00:00.000Z",
           "cardData": {"license": "mit", "language": ["en"], "datasets": ["m4"],
                        "model_description": "Lag-Llama style probabilistic forecaster"}},
          {"id": "org/plain", "cardData": null}
        ]"#;
        let out = parse_models(body, 10).unwrap();
        let RawSourceRecord::HuggingFace(with_card) = &out[0] else {
            panic!("wrong variant");
        };
        assert_eq!(
            with_card.card_description(),
            Some("Lag-Llama style probabilistic forecaster")
        );
        let RawSourceRecord::HuggingFace(plain) = &out[1] else {
            panic!("wrong variant");
        };
        assert_eq!(plain.card_description(), None);
    }

    #[test]
    fn object_instead_of_list_is_decode_error() {
        assert!(matches!(
            parse_models(r#"{"error":"nope"}"#, 5),
            Err(SourceError::Decode(_))
        ));
    }
}
