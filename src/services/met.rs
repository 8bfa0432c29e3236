//! Metropolitan Museum of Art collection API client
//!
//! Free API, no authentication.
//! Base URL: https://collectionapi.metmuseum.org/public/collection/v1

use rand::seq::SliceRandom;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::artwork::ArtworkRecord;
use super::rate_limiter::RateLimitedClient;
use crate::error::{ArtbotError, Result};

const SERVICE: &str = "Met collection API";

/// Met collection API client
pub struct MetClient {
    client: RateLimitedClient,
    base_url: String,
    max_attempts: u32,
}

/// Search response: ids of every matching object
#[derive(Debug, Clone, Deserialize)]
pub struct MetSearchResponse {
    #[serde(default)]
    pub total: u64,
    #[serde(rename = "objectIDs")]
    pub object_ids: Option<Vec<u64>>,
}

/// Object detail record
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetObject {
    #[serde(rename = "objectID")]
    pub object_id: Option<u64>,
    pub primary_image: Option<String>,
    pub primary_image_small: Option<String>,
    #[serde(rename = "objectURL")]
    pub object_url: Option<String>,
    pub classification: Option<String>,
    pub title: Option<String>,
    pub object_date: Option<String>,
    pub artist_display_name: Option<String>,
}

impl MetObject {
    fn has_primary_image(&self) -> bool {
        self.primary_image
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }

    /// Map into an [ArtworkRecord]; `None` when the object has no image
    pub fn into_record(self) -> Option<ArtworkRecord> {
        if !self.has_primary_image() {
            return None;
        }
        let image_url = self
            .primary_image_small
            .filter(|url| !url.trim().is_empty())
            .or(self.primary_image)?;

        Some(ArtworkRecord {
            image_url,
            web_url: self.object_url.unwrap_or_default(),
            classification: self.classification.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            artist: ArtworkRecord::artist_or_unknown(self.artist_display_name),
            date: self.object_date.unwrap_or_default(),
        })
    }
}

impl MetClient {
    pub fn new(base_url: impl Into<String>, max_attempts: u32) -> Result<Self> {
        Ok(Self {
            client: RateLimitedClient::for_met()?,
            base_url: base_url.into(),
            max_attempts: max_attempts.max(1),
        })
    }

    /// Ids of objects the search endpoint reports as having images
    pub async fn search_with_images(&self) -> Result<Vec<u64>> {
        let url = format!("{}/public/collection/v1/search", self.base_url);
        let response = self
            .client
            .get_with_query(&url, &[("q", "hasImages=true"), ("hasImages", "true")])
            .await?;

        if !response.status().is_success() {
            return Err(ArtbotError::from_response(SERVICE, response).await);
        }

        let search: MetSearchResponse = response
            .json()
            .await
            .map_err(|e| ArtbotError::malformed(SERVICE, format!("search response: {e}")))?;

        let ids = search.object_ids.unwrap_or_default();
        if ids.is_empty() {
            return Err(ArtbotError::malformed(SERVICE, "search returned no object ids"));
        }

        debug!(total = search.total, count = ids.len(), "Met search returned object ids");
        Ok(ids)
    }

    /// Object detail; `Ok(None)` when the API does not know the id or the body does not decode
    pub async fn get_object(&self, object_id: u64) -> Result<Option<MetObject>> {
        let url = format!("{}/public/collection/v1/objects/{}", self.base_url, object_id);
        let response = self.client.get(&url).await?;

        if !response.status().is_success() {
            debug!(object_id, status = %response.status(), "Met object lookup failed");
            return Ok(None);
        }

        match response.json::<MetObject>().await {
            Ok(object) => Ok(Some(object)),
            Err(e) => {
                warn!(object_id, error = %e, "Failed to parse Met object");
                Ok(None)
            }
        }
    }

    /// Fetch a random object that has a primary image
    pub async fn fetch_random_artwork(&self) -> Result<ArtworkRecord> {
        let ids = self.search_with_images().await?;

        for attempt in 1..=self.max_attempts {
            let Some(object_id) = ids.choose(&mut rand::thread_rng()).copied() else {
                break;
            };

            if let Some(record) = self
                .get_object(object_id)
                .await?
                .and_then(MetObject::into_record)
            {
                info!(object_id, attempt, title = %record.title, "Selected Met artwork");
                return Ok(record);
            }

            debug!(object_id, attempt, "Met object has no primary image, sampling again");
        }

        Err(ArtbotError::NoImageBearingObject {
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn sunflowers() -> serde_json::Value {
        json!({
            "objectID": 436524,
            "primaryImage": "https://images.metmuseum.org/original/DT1502.jpg",
            "primaryImageSmall": "https://images.metmuseum.org/web-large/DT1502.jpg",
            "objectURL": "https://www.metmuseum.org/art/collection/search/436524",
            "classification": "Paintings",
            "title": "Sunflowers",
            "objectDate": "1887",
            "artistDisplayName": "Vincent van Gogh"
        })
    }

    async fn mount_search(server: &MockServer, ids: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/public/collection/v1/search"))
            .and(query_param("hasImages", "true"))
            .and(query_param("q", "hasImages=true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 1,
                "objectIDs": ids
            })))
            .mount(server)
            .await;
    }

    #[test]
    fn test_into_record_prefers_small_image() {
        let object: MetObject = serde_json::from_value(sunflowers()).unwrap();
        let record = object.into_record().unwrap();
        assert_eq!(record.image_url, "https://images.metmuseum.org/web-large/DT1502.jpg");
        assert_eq!(record.web_url, "https://www.metmuseum.org/art/collection/search/436524");
        assert_eq!(record.classification, "Paintings");
        assert_eq!(record.artist, "Vincent van Gogh");
        assert_eq!(record.date, "1887");
    }

    #[test]
    fn test_into_record_defaults() {
        let object: MetObject = serde_json::from_value(json!({
            "primaryImage": "https://images.metmuseum.org/original/1.jpg",
            "primaryImageSmall": "",
            "title": "Fragment"
        }))
        .unwrap();
        let record = object.into_record().unwrap();
        assert_eq!(record.image_url, "https://images.metmuseum.org/original/1.jpg");
        assert_eq!(record.artist, "Unknown");
        assert_eq!(record.classification, "");
    }

    #[test]
    fn test_into_record_requires_image() {
        let object: MetObject = serde_json::from_value(json!({
            "primaryImage": "",
            "title": "No picture"
        }))
        .unwrap();
        assert!(object.into_record().is_none());
    }

    #[tokio::test]
    async fn test_fetch_random_artwork() {
        let server = MockServer::start().await;
        mount_search(&server, json!([436524])).await;
        Mock::given(method("GET"))
            .and(path("/public/collection/v1/objects/436524"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sunflowers()))
            .mount(&server)
            .await;

        let client = MetClient::new(server.uri(), 5).unwrap();
        let record = client.fetch_random_artwork().await.unwrap();
        assert_eq!(record.title, "Sunflowers");
    }

    #[tokio::test]
    async fn test_sampling_is_bounded() {
        let server = MockServer::start().await;
        mount_search(&server, json!([1])).await;
        Mock::given(method("GET"))
            .and(path("/public/collection/v1/objects/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "objectID": 1,
                "primaryImage": ""
            })))
            .expect(3)
            .mount(&server)
            .await;

        let client = MetClient::new(server.uri(), 3).unwrap();
        let err = client.fetch_random_artwork().await.unwrap_err();
        assert!(matches!(err, ArtbotError::NoImageBearingObject { attempts: 3 }));
    }

    #[tokio::test]
    async fn test_unknown_object_is_a_miss() {
        let server = MockServer::start().await;
        mount_search(&server, json!([7])).await;
        Mock::given(method("GET"))
            .and(path("/public/collection/v1/objects/7"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "message": "Not a valid object"
            })))
            .mount(&server)
            .await;

        let client = MetClient::new(server.uri(), 2).unwrap();
        let err = client.fetch_random_artwork().await.unwrap_err();
        assert!(matches!(err, ArtbotError::NoImageBearingObject { attempts: 2 }));
    }

    #[tokio::test]
    async fn test_empty_search_is_malformed() {
        let server = MockServer::start().await;
        mount_search(&server, serde_json::Value::Null).await;

        let client = MetClient::new(server.uri(), 3).unwrap();
        let err = client.fetch_random_artwork().await.unwrap_err();
        assert!(matches!(err, ArtbotError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_search_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public/collection/v1/search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = MetClient::new(server.uri(), 3).unwrap();
        let err = client.fetch_random_artwork().await.unwrap_err();
        assert!(matches!(err, ArtbotError::UnexpectedStatus { status: 503, .. }));
    }
}
