//! Image attachment handling: optional object detection, then item
//! similarity lookup, then a product reply.

use std::sync::Arc;

use {
    marketbot_common::ProductMatch,
    marketbot_config::{BotConfig, RepliesConfig},
    marketbot_messenger::ReplyPayload,
    serde::Deserialize,
    tracing::{debug, info, warn},
};

use crate::{
    cards::ProductCards,
    error::{Error, Result},
    links::PublicUrl,
};

/// `ReturnCode` the detector uses for "no relevant object in the picture".
const NO_OBJECT_DETECTED: i64 = -99;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    Found,
    NothingFound,
}

/// The similarity service answers with a bare list or a wrapped one.
#[derive(Deserialize)]
#[serde(untagged)]
enum SimilarityResponse {
    List(Vec<ProductMatch>),
    Wrapped {
        #[serde(alias = "products", alias = "similarItems")]
        results: Vec<ProductMatch>,
    },
}

impl SimilarityResponse {
    fn into_products(self) -> Vec<ProductMatch> {
        match self {
            Self::List(products) | Self::Wrapped { results: products } => products,
        }
    }
}

pub struct ImagePipeline {
    http: reqwest::Client,
    detector: Option<String>,
    similarity: Option<String>,
    replies: RepliesConfig,
    links: Arc<PublicUrl>,
}

impl ImagePipeline {
    pub fn new(
        http: reqwest::Client,
        detector: Option<String>,
        similarity: Option<String>,
        replies: RepliesConfig,
        links: Arc<PublicUrl>,
    ) -> Self {
        Self {
            http,
            detector,
            similarity,
            replies,
            links,
        }
    }

    pub fn from_config(config: &BotConfig, http: reqwest::Client, links: Arc<PublicUrl>) -> Self {
        let detector = config
            .detector
            .enabled
            .then(|| config.detector.endpoint().map(str::to_string))
            .flatten();
        if config.detector.enabled && detector.is_none() {
            warn!(backend = %config.detector.backend, "detector enabled without endpoint, skipping detection");
        }
        Self::new(
            http,
            detector,
            config.similarity.endpoint(),
            config.replies.clone(),
            links,
        )
    }

    /// Build the reply for an image the user sent.
    pub async fn process(&self, image_url: &str) -> ReplyPayload {
        if let Some(endpoint) = &self.detector {
            match self.detect(endpoint, image_url).await {
                Ok(Detection::NothingFound) => {
                    info!(image_url, "no object detected");
                    return ReplyPayload::text(&self.replies.no_object_detected);
                },
                Ok(Detection::Found) => debug!(image_url, "object detected"),
                Err(e) => {
                    warn!(image_url, error = %e, "detector failed, continuing with similarity lookup");
                },
            }
        }

        match self.find_similar(image_url).await {
            Ok(products) => {
                info!(image_url, matches = products.len(), "similarity lookup done");
                self.cards().for_matches(products)
            },
            Err(e) => {
                warn!(image_url, error = %e, "similarity lookup failed");
                ReplyPayload::text(&self.replies.image_resolution_error)
            },
        }
    }

    pub fn cards(&self) -> ProductCards<'_> {
        ProductCards {
            replies: &self.replies,
            links: &self.links,
        }
    }

    /// Ask the detector whether the picture shows a relevant object.
    pub async fn detect(&self, endpoint: &str, image_url: &str) -> Result<Detection> {
        let resp = self
            .http
            .post(endpoint)
            .json(&serde_json::json!({ "ImageUrl": image_url }))
            .send()
            .await
            .map_err(|e| Error::transport("POST detector", e))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::transport("read detector response", e))?;
        if !status.is_success() {
            return Err(Error::Status {
                service: "detector",
                status: status.as_u16(),
                body,
            });
        }

        let return_code = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("ReturnCode").and_then(serde_json::Value::as_i64));
        Ok(if return_code == Some(NO_OBJECT_DETECTED) {
            Detection::NothingFound
        } else {
            Detection::Found
        })
    }

    /// Query the similarity service; order of the result is preserved.
    pub async fn find_similar(&self, image_url: &str) -> Result<Vec<ProductMatch>> {
        let endpoint = self.similarity.as_deref().ok_or(Error::Unavailable {
            service: "similarity service",
        })?;
        let resp = self
            .http
            .post(endpoint)
            .json(&serde_json::json!({ "url": image_url }))
            .send()
            .await
            .map_err(|e| Error::transport("POST similarity", e))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::transport("read similarity response", e))?;
        if !status.is_success() {
            return Err(Error::Status {
                service: "similarity service",
                status: status.as_u16(),
                body,
            });
        }
        let parsed: SimilarityResponse = serde_json::from_str(&body)?;
        Ok(parsed.into_products())
    }
}

#[cfg(test)]
mod tests {
    use {mockito::Matcher, serde_json::json};

    use super::*;

    fn pipeline(server: &mockito::Server, detector: bool) -> ImagePipeline {
        ImagePipeline::new(
            reqwest::Client::new(),
            detector.then(|| format!("{}/detect", server.url())),
            Some(format!("{}/SimilarItems", server.url())),
            RepliesConfig::default(),
            Arc::new(PublicUrl::new(Some("https://bot.example.com"))),
        )
    }

    fn products_body(ids: &[&str]) -> String {
        let list: Vec<_> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                json!({
                    "productid": id,
                    "name": format!("Shoe {id}"),
                    "price": 10 + i,
                    "priceCurrency": "EUR",
                    "inventoryLevel": 1,
                    "image": "https://img/x.jpg",
                    "score": 0.5,
                })
            })
            .collect();
        serde_json::to_string(&list).unwrap()
    }

    #[tokio::test]
    async fn detector_sentinel_stops_before_similarity() {
        let mut server = mockito::Server::new_async().await;
        let detect = server
            .mock("POST", "/detect")
            .match_body(Matcher::Json(json!({ "ImageUrl": "https://cdn/img.jpg" })))
            .with_status(200)
            .with_body(r#"{"ReturnCode":-99,"Message":"no shoe"}"#)
            .expect(1)
            .create_async()
            .await;
        let similar = server
            .mock("POST", "/SimilarItems")
            .expect(0)
            .create_async()
            .await;

        let reply = pipeline(&server, true).process("https://cdn/img.jpg").await;
        assert_eq!(
            reply.as_text(),
            Some(RepliesConfig::default().no_object_detected.as_str())
        );
        detect.assert_async().await;
        similar.assert_async().await;
    }

    #[tokio::test]
    async fn detector_hit_proceeds_to_similarity() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/detect")
            .with_status(200)
            .with_body(r#"{"ReturnCode":0}"#)
            .create_async()
            .await;
        let similar = server
            .mock("POST", "/SimilarItems")
            .match_body(Matcher::Json(json!({ "url": "https://cdn/img.jpg" })))
            .with_status(200)
            .with_body(products_body(&["P1"]))
            .expect(1)
            .create_async()
            .await;

        let reply = pipeline(&server, true).process("https://cdn/img.jpg").await;
        assert_eq!(reply.elements()[0].title, "P1(0.5)");
        similar.assert_async().await;
    }

    #[tokio::test]
    async fn detector_failure_does_not_drop_the_image() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/detect")
            .with_status(500)
            .create_async()
            .await;
        let similar = server
            .mock("POST", "/SimilarItems")
            .with_status(200)
            .with_body("[]")
            .expect(1)
            .create_async()
            .await;

        let reply = pipeline(&server, true).process("https://cdn/img.jpg").await;
        assert_eq!(
            reply.as_text(),
            Some(RepliesConfig::default().no_matched_product.as_str())
        );
        similar.assert_async().await;
    }

    #[tokio::test]
    async fn unreachable_detector_does_not_drop_the_image() {
        let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let dead_detector = format!("http://{}/detect", closed.local_addr().unwrap());
        drop(closed);

        let mut server = mockito::Server::new_async().await;
        let similar = server
            .mock("POST", "/SimilarItems")
            .match_body(Matcher::Json(json!({ "url": "https://cdn/img.jpg" })))
            .with_status(200)
            .with_body(products_body(&["P7"]))
            .expect(1)
            .create_async()
            .await;

        let pipeline = ImagePipeline::new(
            reqwest::Client::new(),
            Some(dead_detector.clone()),
            Some(format!("{}/SimilarItems", server.url())),
            RepliesConfig::default(),
            Arc::new(PublicUrl::new(Some("https://bot.example.com"))),
        );
        let err = pipeline
            .detect(&dead_detector, "https://cdn/img.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport { .. }));

        let reply = pipeline.process("https://cdn/img.jpg").await;
        assert_eq!(reply.elements()[0].title, "P7(0.5)");
        similar.assert_async().await;
    }

    #[tokio::test]
    async fn similarity_error_yields_resolution_reply() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/SimilarItems")
            .with_status(500)
            .with_body("Internal Server Error")
            .create_async()
            .await;

        let reply = pipeline(&server, false).process("https://cdn/big.jpg").await;
        assert_eq!(
            reply.as_text(),
            Some(RepliesConfig::default().image_resolution_error.as_str())
        );
    }

    #[tokio::test]
    async fn multiple_matches_become_a_list_in_service_order() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/SimilarItems")
            .with_status(200)
            .with_body(products_body(&["Z", "A", "M"]))
            .create_async()
            .await;

        let reply = pipeline(&server, false).process("https://cdn/img.jpg").await;
        let titles: Vec<_> = reply.elements().iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Shoe Z", "Shoe A", "Shoe M"]);
    }

    #[tokio::test]
    async fn wrapped_results_are_accepted() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/SimilarItems")
            .with_status(200)
            .with_body(format!(r#"{{"similarItems": {}}}"#, products_body(&["Q"])))
            .create_async()
            .await;

        let products = pipeline(&server, false)
            .find_similar("https://cdn/img.jpg")
            .await
            .unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].product_id, "Q");
    }

    #[tokio::test]
    async fn missing_similarity_endpoint_is_unavailable() {
        let pipeline = ImagePipeline::new(
            reqwest::Client::new(),
            None,
            None,
            RepliesConfig::default(),
            Arc::new(PublicUrl::default()),
        );
        let err = pipeline.find_similar("x").await.unwrap_err();
        assert!(matches!(err, Error::Unavailable { .. }));
    }
}
