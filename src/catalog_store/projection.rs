//! Songbook -> categories -> songs tree assembly for the read path.

use super::error::{CatalogError, CatalogResult};
use super::models::{Category, Song, Songbook};
use serde::Serialize;
use std::collections::HashMap;

pub const SONGBOOK_NOT_FOUND: &str = "Songbook not found.";
pub const MULTIPLE_SONGBOOKS: &str =
    "Multiple songbooks found. Please ensure only one songbook exists.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SongbookTree {
    pub id: i64,
    pub name: String,
    pub categories: Vec<CategoryTree>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryTree {
    pub id: i64,
    pub name: String,
    pub order: Option<i64>,
    pub songs: Vec<Song>,
}

/// Sort key shared by every level: ascending order, unordered entries last,
/// ties broken by ascending id.
pub fn order_key(order: Option<i64>, id: i64) -> (bool, i64, i64) {
    (order.is_none(), order.unwrap_or_default(), id)
}

pub fn assemble(
    mut songbooks: Vec<Songbook>,
    categories: Vec<Category>,
    songs: Vec<Song>,
) -> Vec<SongbookTree> {
    let mut songs_by_category: HashMap<i64, Vec<Song>> = HashMap::new();
    for song in songs {
        songs_by_category.entry(song.category_id).or_default().push(song);
    }

    let mut categories_by_songbook: HashMap<i64, Vec<CategoryTree>> = HashMap::new();
    for category in categories {
        let mut songs = songs_by_category.remove(&category.id).unwrap_or_default();
        songs.sort_by_key(|s| order_key(s.order, s.id));
        categories_by_songbook
            .entry(category.songbook_id)
            .or_default()
            .push(CategoryTree {
                id: category.id,
                name: category.name,
                order: category.order,
                songs,
            });
    }

    songbooks.sort_by_key(|s| s.id);
    songbooks
        .into_iter()
        .map(|songbook| {
            let mut categories = categories_by_songbook
                .remove(&songbook.id)
                .unwrap_or_default();
            categories.sort_by_key(|c| order_key(c.order, c.id));
            SongbookTree {
                id: songbook.id,
                name: songbook.name,
                categories,
            }
        })
        .collect()
}

/// Picks the only element of `candidates`, reporting zero as NotFound and
/// more than one as Conflict.
pub fn select_singleton<T>(candidates: Vec<T>) -> CatalogResult<T> {
    let mut candidates = candidates.into_iter();
    match (candidates.next(), candidates.next()) {
        (None, _) => Err(CatalogError::NotFound(SONGBOOK_NOT_FOUND.to_string())),
        (Some(only), None) => Ok(only),
        (Some(_), Some(_)) => Err(CatalogError::Conflict(MULTIPLE_SONGBOOKS.to_string())),
    }
}
