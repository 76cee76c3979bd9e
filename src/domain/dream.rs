//! Dream journal entry model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{DreamId, UserId};

/// A stored dream journal entry. Private to its owner; every read and
/// write path must be scoped by `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Dream {
    pub id: DreamId,
    pub user_id: UserId,
    pub title: String,
    pub content: String,
    /// The night the dream occurred, as reported by the user.
    pub date_dreamed: NaiveDate,
    pub mood: Option<String>,
    pub is_lucid: bool,
    pub tags: Vec<String>,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Dream {
    /// Join tags back into the comma-separated storage form.
    pub fn tags_to_storage(tags: &[String]) -> Option<String> {
        if tags.is_empty() {
            None
        } else {
            Some(tags.join(","))
        }
    }

    /// Split the comma-separated storage form into a tag list.
    pub fn tags_from_storage(raw: Option<&str>) -> Vec<String> {
        raw.map(|s| {
            s.split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default()
    }
}

/// Payload for creating a dream.
#[derive(Debug, Clone)]
pub struct NewDream {
    pub id: DreamId,
    pub user_id: UserId,
    pub title: String,
    pub content: String,
    pub date_dreamed: NaiveDate,
    pub mood: Option<String>,
    pub is_lucid: bool,
    pub tags: Vec<String>,
    pub is_private: bool,
}

/// Partial update for an existing dream. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateDream {
    pub title: Option<String>,
    pub content: Option<String>,
    pub date_dreamed: Option<NaiveDate>,
    pub mood: Option<Option<String>>,
    pub is_lucid: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub is_private: Option<bool>,
}

/// Per-mood entry count.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MoodCount {
    pub mood: String,
    pub count: i64,
}

/// Per-tag usage count.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TagCount {
    pub tag: String,
    pub count: i64,
}

/// Aggregate statistics over one user's journal.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DreamStats {
    pub total_dreams: i64,
    pub lucid_dreams: i64,
    pub lucid_percentage: f64,
    pub dreams_last_30_days: i64,
    pub moods: Vec<MoodCount>,
    pub top_tags: Vec<TagCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_storage_form() {
        let tags = vec!["flying".to_string(), "ocean".to_string()];
        let raw = Dream::tags_to_storage(&tags).unwrap();
        assert_eq!(raw, "flying,ocean");
        assert_eq!(Dream::tags_from_storage(Some(&raw)), tags);
    }

    #[test]
    fn tags_from_storage_trims_and_drops_empties() {
        let parsed = Dream::tags_from_storage(Some(" flying , , ocean "));
        assert_eq!(parsed, vec!["flying", "ocean"]);
        assert!(Dream::tags_from_storage(None).is_empty());
        assert!(Dream::tags_from_storage(Some("")).is_empty());
    }

    #[test]
    fn empty_tag_list_stores_as_null() {
        assert_eq!(Dream::tags_to_storage(&[]), None);
    }
}
