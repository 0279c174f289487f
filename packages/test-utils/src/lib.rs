//! Shared test utilities for the musebot workspace
//!
//! Mock implementations of external services so the catalog client and the
//! daemon's provider layer can be tested without network access.
//!
//! # Mock Services
//!
//! - [`MockCatalogServer`] - Mock music catalog for search, lookup and download tests
//!
//! # Example
//!
//! ```rust,ignore
//! use musebot_test_utils::{MockCatalogServer, CatalogTrackFixture};
//!
//! #[tokio::test]
//! async fn test_with_catalog() {
//!     let catalog = MockCatalogServer::start().await;
//!     catalog
//!         .mock_search("abba", vec![CatalogTrackFixture::new("1", "Waterloo", "ABBA")])
//!         .await;
//!
//!     // Use catalog.url() to configure your client
//! }
//! ```

mod catalog;

pub use catalog::{CatalogTrackFixture, MockCatalogServer};
