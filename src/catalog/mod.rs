//! The media catalog: where sounds live and where plays are counted.

pub mod library;

pub use library::{NewSound, SoundEdit, SoundLibrary};

use crate::error::CatalogError;
use crate::models::{Sound, SoundId};
use std::fmt;
use std::str::FromStr;

/// Storage the playback engine reads sounds from and reports plays to.
///
/// Play-count writes are fire-and-forget from the engine's point of view; a
/// failed write is logged and never affects playback.
pub trait MediaCatalog: Send + Sync {
    fn list_sounds(&self) -> Result<Vec<Sound>, CatalogError>;

    /// Add one to the stored play count of `id`
    fn increment_play_count(&self, id: SoundId) -> Result<(), CatalogError>;
}

/// Ordering for catalog listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Title,
    MostPlayed,
    Newest,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Title => "title",
            SortOrder::MostPlayed => "plays",
            SortOrder::Newest => "newest",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "title" | "name" => Ok(SortOrder::Title),
            "plays" | "most-played" | "popular" => Ok(SortOrder::MostPlayed),
            "newest" | "recent" => Ok(SortOrder::Newest),
            other => Err(format!("unknown sort order '{}' (expected title, plays or newest)", other)),
        }
    }
}

/// Search and ordering applied to a catalog listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoundQuery {
    pub search: Option<String>,
    pub order: SortOrder,
}

impl SoundQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.search = if text.trim().is_empty() { None } else { Some(text) };
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// Case-insensitive title match
    pub fn matches(&self, sound: &Sound) -> bool {
        match &self.search {
            Some(text) => sound
                .title
                .to_lowercase()
                .contains(text.trim().to_lowercase().as_str()),
            None => true,
        }
    }

    pub fn apply(&self, sounds: Vec<Sound>) -> Vec<Sound> {
        let mut matching: Vec<Sound> = sounds.into_iter().filter(|sound| self.matches(sound)).collect();

        match self.order {
            SortOrder::Title => matching.sort_by(|a, b| {
                a.title
                    .to_lowercase()
                    .cmp(&b.title.to_lowercase())
                    .then(a.id.cmp(&b.id))
            }),
            SortOrder::MostPlayed => {
                matching.sort_by(|a, b| b.play_count.cmp(&a.play_count).then(a.id.cmp(&b.id)))
            }
            // Ids are creation timestamps
            SortOrder::Newest => matching.sort_by(|a, b| b.id.cmp(&a.id)),
        }

        matching
    }
}
