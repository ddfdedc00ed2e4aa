use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A catalog entry, stored at `books/{slug}`.
///
/// `slug` doubles as the storage key: derived from the title once at
/// creation and immutable afterwards. Ratings are one vote per user id;
/// downloads are keyed by generated resource ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub slug: String,
    pub title: String,
    pub author: String,
    pub category: String,
    pub description: String,
    pub pubyear: u16,
    /// Reading week this book is scheduled for.
    pub week: String,
    pub cover_image: String,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub downloads: IndexMap<String, Download>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ratings: BTreeMap<String, u8>,
}

/// A downloadable resource attached to a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Download {
    /// Resource format: "pdf", "epub", "mobi", "audiobook", ...
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

/// Payload for creating a book. The slug is derived from the title, and
/// `created_at` defaults to the current time when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub category: String,
    pub description: String,
    pub pubyear: u16,
    pub week: String,
    pub cover_image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

/// Partial book update; only present fields are merged. The slug is the
/// storage key, not a field, so it cannot be patched by construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubyear: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
}

/// Derived rating aggregate. Never stored: always recomputable from the
/// full ratings map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingStats {
    pub votes: usize,
    pub total: u64,
    pub average: f64,
}

impl RatingStats {
    pub const EMPTY: RatingStats = RatingStats {
        votes: 0,
        total: 0,
        average: 0.0,
    };

    pub fn of(ratings: &BTreeMap<String, u8>) -> Self {
        let votes = ratings.len();
        let total: u64 = ratings.values().map(|r| u64::from(*r)).sum();
        let average = if votes == 0 {
            0.0
        } else {
            total as f64 / votes as f64
        };
        Self {
            votes,
            total,
            average,
        }
    }
}

impl Book {
    pub fn rating_stats(&self) -> RatingStats {
        RatingStats::of(&self.ratings)
    }
}

/// Incremental aggregate update used for optimistic display after the
/// viewer's own vote: replaces their previous contribution (if any) and
/// re-derives the average. Must agree with [`RatingStats::of`] over the
/// updated map, so the optimistic value converges once the subscription
/// re-delivers.
pub fn fold_rating(stats: RatingStats, previous_vote: Option<u8>, new_rating: u8) -> RatingStats {
    let votes = stats.votes + usize::from(previous_vote.is_none());
    let total = stats.total - u64::from(previous_vote.unwrap_or(0)) + u64::from(new_rating);
    let average = if votes == 0 {
        0.0
    } else {
        total as f64 / votes as f64
    };
    RatingStats {
        votes,
        total,
        average,
    }
}
