//! Shared data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level catalog section, fixed by the folder an item was found under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Original,
    Featured,
    Upcoming,
}

impl Category {
    /// Map a root sub-folder name to its category. Only exact names match.
    pub fn from_folder_name(name: &str) -> Option<Self> {
        match name {
            "original" => Some(Category::Original),
            "featured" => Some(Category::Featured),
            "upcoming" => Some(Category::Upcoming),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Original => "original",
            Category::Featured => "featured",
            Category::Upcoming => "upcoming",
        }
    }
}

/// One release shown on the music page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    /// Id of the metadata document the item came from
    pub id: String,
    pub title: String,
    pub artist: String,
    pub year: String,
    /// Platform name to link line
    pub links: BTreeMap<String, String>,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spotify_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_file_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,
}

/// The three catalog sections, each in folder listing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub original: Vec<CatalogItem>,
    pub featured: Vec<CatalogItem>,
    pub upcoming: Vec<CatalogItem>,
}

impl Catalog {
    pub fn section(&self, category: Category) -> &[CatalogItem] {
        match category {
            Category::Original => &self.original,
            Category::Featured => &self.featured,
            Category::Upcoming => &self.upcoming,
        }
    }

    pub fn section_mut(&mut self, category: Category) -> &mut Vec<CatalogItem> {
        match category {
            Category::Original => &mut self.original,
            Category::Featured => &mut self.featured,
            Category::Upcoming => &mut self.upcoming,
        }
    }

    pub fn len(&self) -> usize {
        self.original.len() + self.featured.len() + self.upcoming.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
