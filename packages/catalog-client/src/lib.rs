//! Remote music catalog client for musebot
//!
//! This crate provides a client for the JSON catalog API musebot fetches
//! tracks from:
//! - Track search
//! - Track metadata lookup
//! - Streaming audio download with a known content length
//!
//! # Example
//!
//! ```rust,no_run
//! use musebot_catalog_client::CatalogClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = CatalogClient::new("https://catalog.example.com", None)?;
//!
//! let results = client.search("daft punk").await?;
//! for track in &results {
//!     println!("{} - {}", track.artist, track.title);
//! }
//!
//! let mut stream = client.open_stream(&results[0].id).await?;
//! while let Some(chunk) = stream.chunk().await? {
//!     println!("got {} of {} bytes", chunk.len(), stream.content_length());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Environment Variables
//!
//! - `CATALOG_URL`: catalog API base URL
//! - `CATALOG_API_KEY`: bearer token (optional)

mod client;
mod error;
mod models;

pub use client::{CatalogClient, TrackStream};
pub use error::{CatalogError, CatalogResult};
pub use models::CatalogTrack;
