//! Rijksmuseum collection API client
//!
//! Requires an API key. Base URL: https://www.rijksmuseum.nl/api/en
//!
//! A random artwork is one result from a random page with a page size of one.

use rand::Rng;
use serde::Deserialize;
use tracing::info;

use super::artwork::ArtworkRecord;
use super::rate_limiter::RateLimitedClient;
use crate::error::{ArtbotError, Result};

const SERVICE: &str = "Rijksmuseum API";

/// Rijksmuseum API client
pub struct RijksmuseumClient {
    client: RateLimitedClient,
    base_url: String,
    api_key: String,
    max_page: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RijksCollectionResponse {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub art_objects: Vec<RijksArtObject>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RijksArtObject {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub long_title: String,
    pub principal_or_first_maker: Option<String>,
    pub web_image: Option<RijksImage>,
    pub links: Option<RijksLinks>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RijksImage {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RijksLinks {
    pub web: Option<String>,
}

impl RijksArtObject {
    pub fn into_record(self) -> Result<ArtworkRecord> {
        let image_url = self
            .web_image
            .and_then(|image| image.url)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                ArtbotError::malformed(SERVICE, format!("{} has no webImage url", self.id))
            })?;

        Ok(ArtworkRecord {
            image_url,
            web_url: self.links.and_then(|links| links.web).unwrap_or_default(),
            classification: self.long_title,
            title: self.title,
            artist: ArtworkRecord::artist_or_unknown(self.principal_or_first_maker),
            date: self.id,
        })
    }
}

impl RijksmuseumClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        max_page: u32,
    ) -> Result<Self> {
        Ok(Self {
            client: RateLimitedClient::for_rijksmuseum()?,
            base_url: base_url.into(),
            api_key: api_key.into(),
            max_page: max_page.max(1),
        })
    }

    /// One image-bearing collection entry from the given page
    pub async fn get_collection_page(&self, page: u32) -> Result<RijksArtObject> {
        let url = format!("{}/api/en/collection", self.base_url);
        let page = page.to_string();
        let response = self
            .client
            .get_with_query(
                &url,
                &[
                    ("key", self.api_key.as_str()),
                    ("format", "json"),
                    ("imgonly", "True"),
                    ("ps", "1"),
                    ("p", page.as_str()),
                ],
            )
            .await?;

        if !response.status().is_success() {
            return Err(ArtbotError::from_response(SERVICE, response).await);
        }

        let collection: RijksCollectionResponse = response
            .json()
            .await
            .map_err(|e| ArtbotError::malformed(SERVICE, format!("collection response: {e}")))?;

        collection
            .art_objects
            .into_iter()
            .next()
            .ok_or_else(|| {
                ArtbotError::malformed(SERVICE, format!("page {page} has no art objects"))
            })
    }

    /// Fetch the artwork on a random collection page
    pub async fn fetch_random_artwork(&self) -> Result<ArtworkRecord> {
        let page = rand::thread_rng().gen_range(1..=self.max_page);
        let record = self.get_collection_page(page).await?.into_record()?;
        info!(page, title = %record.title, "Selected Rijksmuseum artwork");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn night_watch() -> serde_json::Value {
        json!({
            "id": "en-SK-C-5",
            "objectNumber": "SK-C-5",
            "title": "The Night Watch",
            "longTitle": "The Night Watch, Rembrandt van Rijn, 1642",
            "principalOrFirstMaker": "Rembrandt van Rijn",
            "webImage": { "url": "https://lh3.googleusercontent.com/night-watch" },
            "links": { "web": "http://www.rijksmuseum.nl/en/collection/SK-C-5" }
        })
    }

    #[test]
    fn test_into_record() {
        let object: RijksArtObject = serde_json::from_value(night_watch()).unwrap();
        let record = object.into_record().unwrap();
        assert_eq!(record.image_url, "https://lh3.googleusercontent.com/night-watch");
        assert_eq!(record.web_url, "http://www.rijksmuseum.nl/en/collection/SK-C-5");
        assert_eq!(record.classification, "The Night Watch, Rembrandt van Rijn, 1642");
        assert_eq!(record.title, "The Night Watch");
        assert_eq!(record.artist, "Rembrandt van Rijn");
        assert_eq!(record.date, "en-SK-C-5");
    }

    #[test]
    fn test_into_record_without_image() {
        let object: RijksArtObject = serde_json::from_value(json!({
            "id": "en-BK-1",
            "title": "Cabinet",
            "webImage": null
        }))
        .unwrap();
        assert!(matches!(
            object.into_record(),
            Err(ArtbotError::MalformedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_random_artwork() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/en/collection"))
            .and(query_param("key", "test-key"))
            .and(query_param("format", "json"))
            .and(query_param("imgonly", "True"))
            .and(query_param("ps", "1"))
            .and(query_param("p", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 1,
                "artObjects": [night_watch()]
            })))
            .expect(1)
            .mount(&server)
            .await;

        // max_page of 1 pins the random page
        let client = RijksmuseumClient::new(server.uri(), "test-key", 1).unwrap();
        let record = client.fetch_random_artwork().await.unwrap();
        assert_eq!(record.title, "The Night Watch");
    }

    #[tokio::test]
    async fn test_empty_page_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/en/collection"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 0,
                "artObjects": []
            })))
            .mount(&server)
            .await;

        let client = RijksmuseumClient::new(server.uri(), "test-key", 1).unwrap();
        let err = client.fetch_random_artwork().await.unwrap_err();
        assert!(matches!(err, ArtbotError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_bad_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/en/collection"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid key"))
            .mount(&server)
            .await;

        let client = RijksmuseumClient::new(server.uri(), "wrong", 1).unwrap();
        let err = client.fetch_random_artwork().await.unwrap_err();
        assert!(matches!(err, ArtbotError::UnexpectedStatus { status: 401, .. }));
    }
}
