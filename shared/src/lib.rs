//! Shared library for the musician site Lambda functions.
//!
//! This crate provides the catalog builder, document formatter, Google API
//! clients and common utilities used across all Lambda functions.

pub mod cache;
pub mod calendar;
pub mod catalog;
pub mod config;
pub mod contact;
pub mod cover_art;
pub mod drive;
pub mod error;
pub mod formatter;
pub mod http;
pub mod models;
pub mod secrets;

pub use cache::{Clock, ManualClock, SystemClock, TtlCache};
pub use calendar::{CalendarClient, ScheduleEvent};
pub use catalog::{extract_spotify_id, parse_album_metadata, AlbumMetadata, CatalogBuilder};
pub use config::Config;
pub use contact::{ContactRequest, ContactStore, ContactSubmission};
pub use cover_art::{CoverArtResolver, SpotifyCoverArt};
pub use drive::{DriveClient, DriveFile, GoogleDriveClient};
pub use error::{Error, Result};
pub use formatter::format_document;
pub use http::ApiResponse;
pub use models::{Catalog, CatalogItem, Category};
pub use secrets::resolve_google_api_key;
