//! Bulk import of song lists exported as JSON.
//!
//! The input is an array of loosely typed entries. Page numbers are read
//! with [`PageNumberPolicy::Lenient`], so a malformed page drops the value
//! and keeps the song.

use crate::catalog_store::{
    parse_page_value, CatalogStore, ImportedSong, PageNumberPolicy, UpsertOutcome,
};
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_SONGBOOK_NAME: &str = "Albins";
pub const IMPORT_SOURCE_ENV_VAR: &str = "SONGBOOK_IMPORT_SOURCE";
pub const DEFAULT_IMPORT_SOURCE: &str = "songs.json";

const PAGE_ALIASES: [&str; 3] = ["page_number", "page", "pageNumber"];
const FLIPPED_PAGE_ALIASES: [&str; 3] = [
    "negative_page_number",
    "flipped_page_number",
    "flippedPageNumber",
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl std::fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "created: {}, updated: {}, skipped: {}",
            self.created, self.updated, self.skipped
        )
    }
}

/// Explicit path first, then the environment variable, then `songs.json`.
pub fn resolve_source(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| {
            std::env::var(IMPORT_SOURCE_ENV_VAR)
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| PathBuf::from(DEFAULT_IMPORT_SOURCE))
}

pub fn load_entries(path: &Path) -> Result<Vec<Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read import source {:?}", path))?;
    let parsed: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse import source {:?}", path))?;
    match parsed {
        Value::Array(entries) => Ok(entries),
        other => bail!(
            "Import source must be a JSON array, found {}",
            json_kind(&other)
        ),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// `<p>` paragraphs, one per line of `text`.
pub fn text_to_content(text: &str) -> String {
    format!("<p>{}</p>", text.replace('\n', "</p><p>"))
}

/// First alias holding a non-null value. Zero counts as a value.
fn first_present<'a>(entry: &'a Value, aliases: &[&str]) -> Option<(&'a str, &'a Value)> {
    let object = entry.as_object()?;
    aliases.iter().find_map(|alias| {
        object
            .get_key_value(*alias)
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key.as_str(), value))
    })
}

fn lenient_page(entry: &Value, aliases: &[&str]) -> Option<i64> {
    let (field, value) = first_present(entry, aliases)?;
    parse_page_value(field, value, PageNumberPolicy::Lenient)
        .ok()
        .flatten()
}

/// Text fields take strings as they are and numbers in their JSON form,
/// so a title like `1812` survives. Other JSON types are ignored.
fn text_field(entry: &Value, field: &str) -> Option<String> {
    match entry.get(field)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        other => {
            warn!("Ignoring {} holding {}", field, json_kind(other));
            None
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Imports `entries` into the songbook called `songbook_name`, creating it
/// when needed. Songs are matched by title within their category.
pub fn import_songs(
    store: &dyn CatalogStore,
    songbook_name: &str,
    entries: &[Value],
) -> Result<ImportSummary> {
    let songbook = store
        .get_or_create_songbook(songbook_name)
        .with_context(|| format!("Could not open songbook '{}'", songbook_name))?;
    info!(
        "Importing {} entries into songbook '{}' ({})",
        entries.len(),
        songbook.name,
        songbook.id
    );

    let mut summary = ImportSummary::default();
    for (index, raw) in entries.iter().enumerate() {
        if !raw.is_object() {
            warn!("Skipping entry {}: expected an object, found {}", index, json_kind(raw));
            summary.skipped += 1;
            continue;
        }
        let (Some(category_name), Some(title)) = (
            non_blank(text_field(raw, "category")),
            non_blank(text_field(raw, "title")),
        ) else {
            warn!("Skipping entry {}: category and title are required", index);
            summary.skipped += 1;
            continue;
        };

        let category = store
            .get_or_create_category(songbook.id, &category_name)
            .with_context(|| format!("Could not open category '{}'", category_name))?;

        let fields = ImportedSong {
            melody: text_field(raw, "melody"),
            content: text_field(raw, "text").as_deref().map(text_to_content),
            page_number: lenient_page(raw, &PAGE_ALIASES),
            negative_page_number: lenient_page(raw, &FLIPPED_PAGE_ALIASES),
        };

        let (song, outcome) = store
            .upsert_song_by_title(category.id, &title, fields)
            .with_context(|| format!("Could not import song '{}' (entry {})", title, index))?;
        debug!("{:?} song {} '{}'", outcome, song.id, song.title);
        match outcome {
            UpsertOutcome::Created => summary.created += 1,
            UpsertOutcome::Updated => summary.updated += 1,
        }
    }

    info!("Import finished: {}", summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_store::SqliteCatalogStore;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_store() -> (SqliteCatalogStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteCatalogStore::new(temp_dir.path().join("catalog.db"), 1).unwrap();
        (store, temp_dir)
    }

    fn entries(value: Value) -> Vec<Value> {
        value.as_array().unwrap().clone()
    }

    #[test]
    fn content_wraps_lines_in_paragraphs() {
        assert_eq!(text_to_content("one\ntwo"), "<p>one</p><p>two</p>");
        assert_eq!(text_to_content(""), "<p></p>");
    }

    #[test]
    fn first_non_null_alias_wins() {
        let entry = json!({"page_number": null, "page": 0, "pageNumber": 9});
        assert_eq!(lenient_page(&entry, &PAGE_ALIASES), Some(0));

        let entry = json!({"flippedPageNumber": "7"});
        assert_eq!(lenient_page(&entry, &FLIPPED_PAGE_ALIASES), Some(7));

        let entry = json!({"page": "vii"});
        assert_eq!(lenient_page(&entry, &PAGE_ALIASES), None);
    }

    #[test]
    fn imports_and_normalizes_pages() {
        let (store, _dir) = create_store();
        let summary = import_songs(
            &store,
            DEFAULT_SONGBOOK_NAME,
            &entries(json!([
                {"category": "Advent", "title": "Alpha", "text": "a\nb", "page": -3, "flipped_page_number": 5},
                {"category": "Advent", "title": "Beta", "melody": "Greensleeves", "pageNumber": "bad"},
                {"category": "Summer", "title": "Gamma"},
            ])),
        )
        .unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                created: 3,
                updated: 0,
                skipped: 0
            }
        );

        let tree = store.get_songbook_tree().unwrap();
        assert_eq!(tree.name, "Albins");
        let names: Vec<_> = tree.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Advent", "Summer"]);

        let alpha = &tree.categories[0].songs[0];
        assert_eq!(alpha.title, "Alpha");
        assert_eq!(alpha.content.as_deref(), Some("<p>a</p><p>b</p>"));
        assert_eq!(alpha.page_number, Some(3));
        assert_eq!(alpha.negative_page_number, Some(-5));

        let beta = &tree.categories[0].songs[1];
        assert_eq!(beta.melody.as_deref(), Some("Greensleeves"));
        assert_eq!(beta.page_number, None);
    }

    #[test]
    fn reimport_updates_in_place() {
        let (store, _dir) = create_store();
        let first = entries(json!([{"category": "Advent", "title": "Alpha", "page": 1}]));
        import_songs(&store, DEFAULT_SONGBOOK_NAME, &first).unwrap();
        let original = store.list_songs(None).unwrap().remove(0);

        let second = entries(json!([{"category": "Advent", "title": "Alpha", "page": 2}]));
        let summary = import_songs(&store, DEFAULT_SONGBOOK_NAME, &second).unwrap();
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.created, 0);

        let songs = store.list_songs(None).unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].id, original.id);
        assert_eq!(songs[0].order, original.order);
        assert_eq!(songs[0].page_number, Some(2));
    }

    #[test]
    fn skips_incomplete_entries() {
        let (store, _dir) = create_store();
        let summary = import_songs(
            &store,
            "Other",
            &entries(json!([
                {"title": "No category"},
                {"category": "Advent"},
                {"category": "  ", "title": "Blank"},
                {"category": ["Advent"], "title": "Wrong type"},
                "not an object",
                {"category": "Advent", "title": "Kept"},
            ])),
        )
        .unwrap();
        assert_eq!(summary.skipped, 5);
        assert_eq!(summary.created, 1);
        assert_eq!(store.list_songbooks().unwrap()[0].name, "Other");
    }

    #[test]
    fn numeric_text_fields_are_kept() {
        let (store, _dir) = create_store();
        let summary = import_songs(
            &store,
            DEFAULT_SONGBOOK_NAME,
            &entries(json!([
                {"category": "Advent", "title": "Alpha", "melody": 5, "page": 3},
                {"category": "Advent", "title": 1812, "page": 4},
                {"category": 2024, "title": "Beta", "text": 7},
            ])),
        )
        .unwrap();
        assert_eq!(summary.created, 3);
        assert_eq!(summary.skipped, 0);

        let songs = store.list_songs(None).unwrap();
        let alpha = songs.iter().find(|s| s.title == "Alpha").unwrap();
        assert_eq!(alpha.melody.as_deref(), Some("5"));
        assert_eq!(alpha.page_number, Some(3));

        let overture = songs.iter().find(|s| s.title == "1812").unwrap();
        assert_eq!(overture.category_name, "Advent");
        assert_eq!(overture.page_number, Some(4));

        let beta = songs.iter().find(|s| s.title == "Beta").unwrap();
        assert_eq!(beta.category_name, "2024");
        assert_eq!(beta.content.as_deref(), Some("<p>7</p>"));
    }

    #[test]
    fn non_text_melody_is_dropped_and_song_kept() {
        let (store, _dir) = create_store();
        let summary = import_songs(
            &store,
            DEFAULT_SONGBOOK_NAME,
            &entries(json!([{"category": "Advent", "title": "Alpha", "melody": {"tune": 1}}])),
        )
        .unwrap();
        assert_eq!(summary.created, 1);
        let song = store.list_songs(None).unwrap().remove(0);
        assert_eq!(song.melody, None);
    }

    #[test]
    fn load_entries_requires_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("songs.json");

        std::fs::write(&path, r#"{"title": "Alpha"}"#).unwrap();
        let err = load_entries(&path).unwrap_err();
        assert!(err.to_string().contains("must be a JSON array"));

        std::fs::write(&path, r#"[{"title": "Alpha"}]"#).unwrap();
        assert_eq!(load_entries(&path).unwrap().len(), 1);
    }

    #[test]
    fn explicit_source_wins() {
        let path = resolve_source(Some(PathBuf::from("/tmp/explicit.json")));
        assert_eq!(path, PathBuf::from("/tmp/explicit.json"));
    }
}
