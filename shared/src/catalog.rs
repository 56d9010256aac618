//! Music catalog assembly from the Drive folder tree.
//!
//! The root folder holds one sub-folder per [`Category`]; each of those holds
//! one folder per release containing a small metadata document:
//!
//! ```text
//! TITLE: Night Drive
//! ARTIST: The Band
//! YEAR: 2021
//! LINKS:
//! Spotify: https://open.spotify.com/album/4aMdysP9WyjqxeQjxLtzOQ
//! Apple Music: https://music.apple.com/album/123
//! ```
//!
//! Upcoming releases may also carry an image and an audio preview next to
//! the document.

use futures::future::join_all;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::cover_art::CoverArtResolver;
use crate::drive::{DriveClient, DriveFile, DOCUMENT_MIME_TYPE};
use crate::models::{Catalog, CatalogItem, Category};
use crate::Result;

/// Platforms recognised in the links section, in match priority order.
const LINK_PLATFORMS: [&str; 3] = ["spotify", "apple", "youtube"];

/// Fields parsed from a metadata document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumMetadata {
    pub title: String,
    pub artist: String,
    pub year: String,
    pub links: BTreeMap<String, String>,
}

/// Parse the line-prefix metadata format.
///
/// Once a `LINKS:` line is seen every following non-empty line is a link
/// candidate, stored verbatim under the first platform it mentions.
pub fn parse_album_metadata(text: &str) -> AlbumMetadata {
    let mut metadata = AlbumMetadata::default();
    let mut in_links = false;

    for raw_line in text.lines() {
        // Docs exports start with a byte-order mark.
        let line = raw_line.trim_start_matches('\u{feff}').trim();
        if line.is_empty() {
            continue;
        }

        if in_links {
            add_link(&mut metadata.links, line);
        } else if let Some(value) = line.strip_prefix("TITLE:") {
            metadata.title = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("ARTIST:") {
            metadata.artist = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("YEAR:") {
            metadata.year = value.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("LINKS:") {
            in_links = true;
            let rest = rest.trim();
            if !rest.is_empty() {
                add_link(&mut metadata.links, rest);
            }
        }
    }

    metadata
}

fn add_link(links: &mut BTreeMap<String, String>, line: &str) {
    let lower = line.to_lowercase();
    if let Some(platform) = LINK_PLATFORMS.iter().find(|p| lower.contains(*p)) {
        links.insert(platform.to_string(), line.to_string());
    }
}

/// Album id from a Spotify album URL (or a line containing one).
pub fn extract_spotify_id(url: &str) -> Option<String> {
    static ALBUM_ID: OnceLock<Regex> = OnceLock::new();
    let re = ALBUM_ID.get_or_init(|| Regex::new(r"album/([a-zA-Z0-9]+)").expect("valid album regex"));
    re.captures(url).map(|caps| caps[1].to_string())
}

/// Builds the categorised catalog and memoizes it per root folder.
pub struct CatalogBuilder {
    drive: Arc<dyn DriveClient>,
    cover_art: Arc<dyn CoverArtResolver>,
    cache: TtlCache<Catalog>,
    image_base_path: String,
}

impl CatalogBuilder {
    pub fn new(
        drive: Arc<dyn DriveClient>,
        cover_art: Arc<dyn CoverArtResolver>,
        cache: TtlCache<Catalog>,
        image_base_path: impl Into<String>,
    ) -> Self {
        Self {
            drive,
            cover_art,
            cache,
            image_base_path: image_base_path.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn cache(&self) -> &TtlCache<Catalog> {
        &self.cache
    }

    /// Assemble the catalog under `root_folder_id`.
    ///
    /// Failing to list the root or a category folder fails the whole call.
    /// A failure inside one release folder only drops that release.
    pub async fn build_catalog(&self, root_folder_id: &str) -> Result<Arc<Catalog>> {
        if let Some(cached) = self.cache.get(root_folder_id).await {
            debug!("Catalog cache hit for {}", root_folder_id);
            return Ok(cached);
        }

        let category_folders: Vec<(Category, DriveFile)> = self
            .drive
            .list_folders(root_folder_id)
            .await?
            .into_iter()
            .filter_map(|folder| Category::from_folder_name(&folder.name).map(|c| (c, folder)))
            .collect();

        let sections = join_all(
            category_folders
                .iter()
                .map(|(category, folder)| self.build_category(*category, &folder.id)),
        )
        .await;

        let mut catalog = Catalog::default();
        for ((category, _), items) in category_folders.iter().zip(sections) {
            catalog.section_mut(*category).extend(items?);
        }

        info!(
            "Built catalog for {}: {} original, {} featured, {} upcoming",
            root_folder_id,
            catalog.original.len(),
            catalog.featured.len(),
            catalog.upcoming.len()
        );

        Ok(self.cache.insert(root_folder_id, catalog).await)
    }

    async fn build_category(&self, category: Category, folder_id: &str) -> Result<Vec<CatalogItem>> {
        let item_folders = self.drive.list_folders(folder_id).await?;

        let results = join_all(
            item_folders
                .iter()
                .map(|folder| self.build_item_folder(category, folder)),
        )
        .await;

        let mut items = Vec::new();
        for (folder, result) in item_folders.iter().zip(results) {
            match result {
                Ok(folder_items) => items.extend(folder_items),
                Err(e) => warn!(
                    "Skipping {} folder {} ({}): {}",
                    category.as_str(),
                    folder.name,
                    folder.id,
                    e
                ),
            }
        }
        Ok(items)
    }

    async fn build_item_folder(&self, category: Category, folder: &DriveFile) -> Result<Vec<CatalogItem>> {
        match category {
            Category::Upcoming => self.build_upcoming(folder).await,
            Category::Original | Category::Featured => self.build_released(category, folder).await,
        }
    }

    /// Export and parse one metadata document. `None` drops the item: the
    /// export failed or the document has no title.
    async fn read_metadata(&self, document: &DriveFile) -> Option<AlbumMetadata> {
        let text = match self.drive.export_document_text(&document.id).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Skipping metadata document {} ({}): {}", document.name, document.id, e);
                return None;
            }
        };

        let metadata = parse_album_metadata(&text);
        if metadata.title.is_empty() {
            debug!("Metadata document {} has no title", document.id);
            return None;
        }
        Some(metadata)
    }

    async fn build_upcoming(&self, folder: &DriveFile) -> Result<Vec<CatalogItem>> {
        let files = self.drive.list_files(&folder.id, None).await?;

        let documents: Vec<&DriveFile> = files.iter().filter(|f| f.is_document()).collect();
        let cover_image_url = files
            .iter()
            .find(|f| f.is_image())
            .map(|image| format!("{}/{}", self.image_base_path, image.id));
        let audio_file_id = files.iter().find(|f| f.is_audio()).map(|audio| audio.id.clone());

        let mut items = Vec::new();
        for document in documents {
            let Some(metadata) = self.read_metadata(document).await else {
                continue;
            };

            items.push(CatalogItem {
                id: document.id.clone(),
                title: metadata.title,
                artist: metadata.artist,
                year: metadata.year,
                links: metadata.links,
                category: Category::Upcoming,
                cover_image_url: cover_image_url.clone(),
                spotify_id: None,
                audio_file_id: audio_file_id.clone(),
                created_time: document.created_time,
            });
        }
        Ok(items)
    }

    async fn build_released(&self, category: Category, folder: &DriveFile) -> Result<Vec<CatalogItem>> {
        let documents = self
            .drive
            .list_files(&folder.id, Some(DOCUMENT_MIME_TYPE))
            .await?;

        let mut items = Vec::new();
        for document in documents {
            let Some(metadata) = self.read_metadata(&document).await else {
                continue;
            };

            let spotify_link = metadata.links.get("spotify").map(String::as_str);
            let cover_image_url = self.cover_art.resolve(spotify_link).await;
            let spotify_id = spotify_link.and_then(extract_spotify_id);

            items.push(CatalogItem {
                id: document.id,
                title: metadata.title,
                artist: metadata.artist,
                year: metadata.year,
                links: metadata.links,
                category,
                cover_image_url,
                spotify_id,
                audio_file_id: None,
                created_time: document.created_time,
            });
        }
        Ok(items)
    }
}
