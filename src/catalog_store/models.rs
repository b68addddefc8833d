//! Catalog entities and write payloads.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Songbook {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    #[serde(rename = "songbook")]
    pub songbook_id: i64,
    pub name: String,
    pub order: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: i64,
    #[serde(rename = "category")]
    pub category_id: i64,
    pub category_name: String,
    pub title: String,
    pub melody: Option<String>,
    pub author: Option<String>,
    pub content: Option<String>,
    pub audio: Option<String>,
    pub order: Option<i64>,
    pub page_number: Option<i64>,
    pub negative_page_number: Option<i64>,
}

/// Payload of a song creation. Page numbers are taken as given and
/// normalized by the store.
#[derive(Clone, Debug, Default)]
pub struct NewSong {
    pub category_id: i64,
    pub title: String,
    pub melody: Option<String>,
    pub author: Option<String>,
    pub content: Option<String>,
    pub audio: Option<String>,
    pub order: Option<i64>,
    pub page_number: Option<i64>,
    pub negative_page_number: Option<i64>,
}

/// Partial song update.
///
/// Outer `None` leaves the stored value untouched, `Some(None)` clears it.
#[derive(Clone, Debug, Default)]
pub struct SongUpdate {
    pub category_id: Option<i64>,
    pub title: Option<String>,
    pub melody: Option<Option<String>>,
    pub author: Option<Option<String>>,
    pub content: Option<Option<String>>,
    pub audio: Option<Option<String>>,
    pub order: Option<i64>,
    pub page_number: Option<Option<i64>>,
    pub negative_page_number: Option<Option<i64>>,
}

impl SongUpdate {
    pub fn is_empty(&self) -> bool {
        self.category_id.is_none()
            && self.title.is_none()
            && self.melody.is_none()
            && self.author.is_none()
            && self.content.is_none()
            && self.audio.is_none()
            && self.order.is_none()
            && self.page_number.is_none()
            && self.negative_page_number.is_none()
    }
}

#[derive(Clone, Debug, Default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub order: Option<i64>,
}

/// Fields written by the bulk importer when a song is created or refreshed.
#[derive(Clone, Debug, Default)]
pub struct ImportedSong {
    pub melody: Option<String>,
    pub content: Option<String>,
    pub page_number: Option<i64>,
    pub negative_page_number: Option<i64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub songbooks: usize,
    pub categories: usize,
    pub songs: usize,
}

/// Deserializes a field that distinguishes "absent" from "null".
///
/// Use together with `#[serde(default)]`: a missing field stays `None`,
/// an explicit `null` becomes `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct MelodyPatch {
        #[serde(default, deserialize_with = "double_option")]
        melody: Option<Option<String>>,
    }

    #[test]
    fn double_option_distinguishes_missing_and_null() {
        let missing: MelodyPatch = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.melody, None);

        let null: MelodyPatch = serde_json::from_str(r#"{"melody": null}"#).unwrap();
        assert_eq!(null.melody, Some(None));

        let value: MelodyPatch = serde_json::from_str(r#"{"melody": "Greensleeves"}"#).unwrap();
        assert_eq!(value.melody, Some(Some("Greensleeves".to_string())));
    }

    #[test]
    fn song_serializes_with_category_name() {
        let song = Song {
            id: 3,
            category_id: 1,
            category_name: "Advent".to_string(),
            title: "Alpha".to_string(),
            melody: None,
            author: None,
            content: None,
            audio: None,
            order: Some(10),
            page_number: Some(4),
            negative_page_number: None,
        };
        let json = serde_json::to_value(&song).unwrap();
        assert_eq!(json["category"], 1);
        assert_eq!(json["category_name"], "Advent");
        assert_eq!(json["order"], 10);
        assert!(json["negative_page_number"].is_null());
    }
}
