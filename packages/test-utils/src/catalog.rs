//! Mock music catalog for provider and client tests
//!
//! Provides a [`MockCatalogServer`] that serves the catalog's JSON search and
//! lookup endpoints plus raw audio streams.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock catalog server
///
/// Wraps a [`wiremock::MockServer`] with helpers for the endpoints the
/// catalog client talks to:
///
/// - `GET /search?q=<query>`
/// - `GET /tracks/<id>`
/// - `GET /tracks/<id>/stream`
pub struct MockCatalogServer {
    server: MockServer,
    api_key: String,
}

impl MockCatalogServer {
    /// Start a new mock catalog with the default API key
    pub async fn start() -> Self {
        Self::start_with_api_key("test-catalog-key").await
    }

    /// Start a new mock catalog requiring a custom API key
    pub async fn start_with_api_key(api_key: &str) -> Self {
        let server = MockServer::start().await;
        Self {
            server,
            api_key: api_key.to_string(),
        }
    }

    /// Get the server URL
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Get the API key
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    /// Mount a search response for a specific query
    pub async fn mock_search(&self, query: &str, tracks: Vec<CatalogTrackFixture>) {
        let results: Vec<serde_json::Value> = tracks.iter().map(|t| t.to_json()).collect();

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", query))
            .and(header("Authorization", self.bearer().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": results })))
            .mount(&self.server)
            .await;
    }

    /// Mount a single-track metadata response
    pub async fn mock_track(&self, track: &CatalogTrackFixture) {
        self.track_mock(track).mount(&self.server).await;
    }

    /// Mount a single-track metadata response; expects exactly `times` lookups
    pub async fn mock_track_expecting(&self, track: &CatalogTrackFixture, times: u64) {
        self.track_mock(track).expect(times).mount(&self.server).await;
    }

    fn track_mock(&self, track: &CatalogTrackFixture) -> Mock {
        Mock::given(method("GET"))
            .and(path(format!("/tracks/{}", track.id)))
            .and(header("Authorization", self.bearer().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(track.to_json()))
    }

    /// Mount a 404 for a track lookup and its stream
    pub async fn mock_track_not_found(&self, id: &str) {
        Mock::given(method("GET"))
            .and(path_regex(format!("^/tracks/{}(/stream)?$", id)))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": "Track not found"
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount an audio stream for a track; expects exactly `times` downloads
    pub async fn mock_stream(&self, id: &str, body: Vec<u8>, times: u64) {
        self.mock_stream_delayed(id, body, Duration::ZERO, times).await;
    }

    /// Like [`mock_stream`](Self::mock_stream), answering only after `delay`
    pub async fn mock_stream_delayed(&self, id: &str, body: Vec<u8>, delay: Duration, times: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/tracks/{}/stream", id)))
            .and(header("Authorization", self.bearer().as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "audio/mpeg")
                    .set_body_bytes(body)
                    .set_delay(delay),
            )
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Mount a mock for authentication failure with a specific bad API key
    pub async fn mock_auth_failure(&self, bad_api_key: &str) {
        Mock::given(method("GET"))
            .and(header("Authorization", format!("Bearer {}", bad_api_key).as_str()))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "Unauthorized"
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount a server error on every endpoint
    pub async fn mock_server_error(&self, error_message: &str) {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": error_message
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount a mock for rate limiting on every endpoint
    pub async fn mock_rate_limit(&self) {
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("Retry-After", "60")
                    .set_body_json(json!({
                        "error": "Rate limit exceeded"
                    })),
            )
            .mount(&self.server)
            .await;
    }
}

/// Fixture for catalog track JSON
#[derive(Debug, Clone)]
pub struct CatalogTrackFixture {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub cover_url: Option<String>,
    pub duration: u32,
    pub format: String,
}

impl CatalogTrackFixture {
    /// Create a three-minute mp3 track fixture
    pub fn new(id: &str, title: &str, artist: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            album: format!("{} (Greatest Hits)", artist),
            cover_url: Some(format!("https://covers.example.com/{}.jpg", id)),
            duration: 180,
            format: "mp3".to_string(),
        }
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "id": self.id,
            "title": self.title,
            "artist": self.artist,
            "album": self.album,
            "cover_url": self.cover_url,
            "duration": self.duration,
            "format": self.format
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_catalog_server_starts() {
        let server = MockCatalogServer::start().await;
        assert!(!server.url().is_empty());
        assert_eq!(server.api_key(), "test-catalog-key");
    }

    #[tokio::test]
    async fn test_mock_catalog_search() {
        let server = MockCatalogServer::start().await;
        server
            .mock_search(
                "queen",
                vec![
                    CatalogTrackFixture::new("1", "Bohemian Rhapsody", "Queen"),
                    CatalogTrackFixture::new("2", "Under Pressure", "Queen"),
                ],
            )
            .await;

        let response = reqwest::Client::new()
            .get(format!("{}/search", server.url()))
            .query(&[("q", "queen")])
            .bearer_auth(server.api_key())
            .send()
            .await
            .unwrap();

        assert!(response.status().is_success());
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["results"].as_array().unwrap().len(), 2);
        assert_eq!(body["results"][0]["title"], "Bohemian Rhapsody");
    }

    #[tokio::test]
    async fn test_mock_catalog_stream_has_length() {
        let server = MockCatalogServer::start().await;
        server.mock_stream("7", vec![0u8; 1024], 1).await;

        let response = reqwest::Client::new()
            .get(format!("{}/tracks/7/stream", server.url()))
            .bearer_auth(server.api_key())
            .send()
            .await
            .unwrap();

        assert_eq!(response.content_length(), Some(1024));
    }

    #[tokio::test]
    async fn test_mock_catalog_not_found() {
        let server = MockCatalogServer::start().await;
        server.mock_track_not_found("missing").await;

        let response = reqwest::Client::new()
            .get(format!("{}/tracks/missing", server.url()))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 404);
    }
}
