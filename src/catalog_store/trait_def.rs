//! CatalogStore trait definition.

use super::error::CatalogResult;
use super::models::*;
use super::projection::SongbookTree;

/// Storage backend of the songbook catalog.
///
/// Writes that depend on sibling state (order assignment, reorders,
/// uniqueness checks) run the lookup and the write in one transaction.
pub trait CatalogStore: Send + Sync {
    // =========================================================================
    // Songbooks
    // =========================================================================

    fn create_songbook(&self, name: &str) -> CatalogResult<Songbook>;

    fn list_songbooks(&self) -> CatalogResult<Vec<Songbook>>;

    /// Returns `true` if a songbook was deleted. Categories and songs go with it.
    fn delete_songbook(&self, id: i64) -> CatalogResult<bool>;

    fn get_or_create_songbook(&self, name: &str) -> CatalogResult<Songbook>;

    // =========================================================================
    // Trees
    // =========================================================================

    /// The tree of the only songbook. NotFound when there is none, Conflict
    /// when there are several.
    fn get_songbook_tree(&self) -> CatalogResult<SongbookTree>;

    /// The tree of one songbook, whatever the number of songbooks.
    fn get_songbook_tree_by_id(&self, id: i64) -> CatalogResult<Option<SongbookTree>>;

    /// Every songbook with its own ordered subtree.
    fn list_songbook_trees(&self) -> CatalogResult<Vec<SongbookTree>>;

    // =========================================================================
    // Categories
    // =========================================================================

    /// Creates a category, assigning the next sibling order when `order` is None.
    /// Conflict if the songbook already has a category with this name.
    fn create_category(
        &self,
        songbook_id: i64,
        name: &str,
        order: Option<i64>,
    ) -> CatalogResult<Category>;

    fn get_category(&self, id: i64) -> CatalogResult<Option<Category>>;

    /// Categories ordered by `(order, id)`, optionally from one songbook only.
    fn list_categories(&self, songbook_id: Option<i64>) -> CatalogResult<Vec<Category>>;

    fn update_category(&self, id: i64, update: CategoryUpdate) -> CatalogResult<Category>;

    fn delete_category(&self, id: i64) -> CatalogResult<bool>;

    /// Renumbers the songbook's categories to 10, 20, 30... following `ids`,
    /// which must list every category of the songbook exactly once.
    fn reorder_categories(&self, songbook_id: i64, ids: &[i64]) -> CatalogResult<Vec<Category>>;

    fn get_or_create_category(&self, songbook_id: i64, name: &str) -> CatalogResult<Category>;

    // =========================================================================
    // Songs
    // =========================================================================

    fn create_song(&self, song: NewSong) -> CatalogResult<Song>;

    fn get_song(&self, id: i64) -> CatalogResult<Option<Song>>;

    fn list_songs(&self, category_id: Option<i64>) -> CatalogResult<Vec<Song>>;

    /// Applies the fields present in `update`. Page numbers are normalized
    /// again, the order only changes when explicitly given. An empty update
    /// returns the stored song without writing.
    fn update_song(&self, id: i64, update: SongUpdate) -> CatalogResult<Song>;

    fn delete_song(&self, id: i64) -> CatalogResult<bool>;

    fn reorder_songs(&self, category_id: i64, ids: &[i64]) -> CatalogResult<Vec<Song>>;

    /// Refreshes the first song titled `title` in the category, or creates it.
    fn upsert_song_by_title(
        &self,
        category_id: i64,
        title: &str,
        fields: ImportedSong,
    ) -> CatalogResult<(Song, UpsertOutcome)>;

    // =========================================================================
    // Counts (for metrics)
    // =========================================================================

    fn stats(&self) -> CatalogResult<CatalogStats>;
}
