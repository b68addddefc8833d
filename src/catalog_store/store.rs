//! SQLite-backed catalog store implementation.
//!
//! Reads are spread over a small pool of read-only connections, writes go
//! through a single connection. Every write that looks at sibling rows
//! (next order, name uniqueness, reorders) holds a `BEGIN IMMEDIATE`
//! transaction across the lookup and the write.

use super::error::{CatalogError, CatalogResult};
use super::models::*;
use super::ordering::{check_reorder, renumbered, resolve_order, validate_explicit_order};
use super::page_numbers::{flipped_page, front_page, PageNumbers};
use super::projection::{assemble, select_singleton, SongbookTree};
use super::schema::CATALOG_VERSIONED_SCHEMAS;
use super::trait_def::CatalogStore;
use crate::sqlite_persistence::open_versioned_db;
use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const SONG_COLUMNS: &str = "s.id, s.category_id, c.name, s.title, s.melody, s.author, s.content, \
     s.audio, s.sort_order, s.page_number, s.negative_page_number";

fn song_from_row(row: &Row) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        category_id: row.get(1)?,
        category_name: row.get(2)?,
        title: row.get(3)?,
        melody: row.get(4)?,
        author: row.get(5)?,
        content: row.get(6)?,
        audio: row.get(7)?,
        order: row.get(8)?,
        page_number: row.get(9)?,
        negative_page_number: row.get(10)?,
    })
}

fn category_from_row(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        songbook_id: row.get(1)?,
        name: row.get(2)?,
        order: row.get(3)?,
    })
}

fn songbook_from_row(row: &Row) -> rusqlite::Result<Songbook> {
    Ok(Songbook {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn required_text(field: &str, value: &str) -> CatalogResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::Validation(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

// =============================================================================
// Row queries shared by the read and write paths
// =============================================================================

fn query_songbook(conn: &Connection, id: i64) -> CatalogResult<Option<Songbook>> {
    Ok(conn
        .query_row(
            "SELECT id, name FROM songbook WHERE id = ?1",
            params![id],
            songbook_from_row,
        )
        .optional()?)
}

fn query_songbook_by_name(conn: &Connection, name: &str) -> CatalogResult<Option<Songbook>> {
    Ok(conn
        .query_row(
            "SELECT id, name FROM songbook WHERE name = ?1",
            params![name],
            songbook_from_row,
        )
        .optional()?)
}

fn query_songbooks(conn: &Connection, only: Option<i64>) -> CatalogResult<Vec<Songbook>> {
    let mut stmt =
        conn.prepare("SELECT id, name FROM songbook WHERE (?1 IS NULL OR id = ?1) ORDER BY id")?;
    let rows = stmt
        .query_map(params![only], songbook_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn require_songbook(conn: &Connection, id: i64) -> CatalogResult<Songbook> {
    query_songbook(conn, id)?
        .ok_or_else(|| CatalogError::NotFound(format!("Songbook {} not found.", id)))
}

fn query_category(conn: &Connection, id: i64) -> CatalogResult<Option<Category>> {
    Ok(conn
        .query_row(
            "SELECT id, songbook_id, name, sort_order FROM category WHERE id = ?1",
            params![id],
            category_from_row,
        )
        .optional()?)
}

fn query_category_by_name(
    conn: &Connection,
    songbook_id: i64,
    name: &str,
) -> CatalogResult<Option<Category>> {
    Ok(conn
        .query_row(
            "SELECT id, songbook_id, name, sort_order FROM category WHERE songbook_id = ?1 AND name = ?2",
            params![songbook_id, name],
            category_from_row,
        )
        .optional()?)
}

fn query_categories(conn: &Connection, songbook_id: Option<i64>) -> CatalogResult<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT id, songbook_id, name, sort_order FROM category \
         WHERE (?1 IS NULL OR songbook_id = ?1) \
         ORDER BY songbook_id, sort_order IS NULL, sort_order, id",
    )?;
    let rows = stmt
        .query_map(params![songbook_id], category_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn require_category(conn: &Connection, id: i64) -> CatalogResult<Category> {
    query_category(conn, id)?
        .ok_or_else(|| CatalogError::NotFound(format!("Category {} not found.", id)))
}

fn query_song(conn: &Connection, id: i64) -> CatalogResult<Option<Song>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {} FROM song s JOIN category c ON c.id = s.category_id WHERE s.id = ?1",
                SONG_COLUMNS
            ),
            params![id],
            song_from_row,
        )
        .optional()?)
}

fn query_songs(
    conn: &Connection,
    category_id: Option<i64>,
    songbook_id: Option<i64>,
) -> CatalogResult<Vec<Song>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM song s JOIN category c ON c.id = s.category_id \
         WHERE (?1 IS NULL OR s.category_id = ?1) AND (?2 IS NULL OR c.songbook_id = ?2) \
         ORDER BY c.songbook_id, c.sort_order IS NULL, c.sort_order, c.id, \
         s.sort_order IS NULL, s.sort_order, s.id",
        SONG_COLUMNS
    ))?;
    let rows = stmt
        .query_map(params![category_id, songbook_id], song_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn require_song(conn: &Connection, id: i64) -> CatalogResult<Song> {
    query_song(conn, id)?.ok_or_else(|| CatalogError::NotFound(format!("Song {} not found.", id)))
}

fn query_child_ids(conn: &Connection, sql: &str, parent_id: i64) -> CatalogResult<Vec<i64>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map(params![parent_id], |row| row.get(0))?
        .collect::<Result<Vec<i64>, _>>()?;
    Ok(ids)
}

fn max_order(conn: &Connection, sql: &str, parent_id: i64) -> CatalogResult<Option<i64>> {
    Ok(conn.query_row(sql, params![parent_id], |row| row.get(0))?)
}

fn count(conn: &Connection, table: &str) -> CatalogResult<usize> {
    let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
    Ok(n as usize)
}

fn load_trees(conn: &Connection, songbook_id: Option<i64>) -> CatalogResult<Vec<SongbookTree>> {
    let songbooks = query_songbooks(conn, songbook_id)?;
    let categories = query_categories(conn, songbook_id)?;
    let songs = query_songs(conn, None, songbook_id)?;
    Ok(assemble(songbooks, categories, songs))
}

// =============================================================================
// Inserts used inside write transactions
// =============================================================================

fn insert_category(
    conn: &Connection,
    songbook_id: i64,
    name: String,
    order: Option<i64>,
) -> CatalogResult<Category> {
    let last = max_order(
        conn,
        "SELECT MAX(sort_order) FROM category WHERE songbook_id = ?1",
        songbook_id,
    )?;
    let order = resolve_order(order, std::iter::once(last));
    conn.execute(
        "INSERT INTO category (songbook_id, name, sort_order) VALUES (?1, ?2, ?3)",
        params![songbook_id, name, order],
    )?;
    Ok(Category {
        id: conn.last_insert_rowid(),
        songbook_id,
        name,
        order: Some(order),
    })
}

/// Inserts an already validated song whose page numbers are normalized.
fn insert_song(conn: &Connection, category: Category, song: NewSong) -> CatalogResult<Song> {
    let last = max_order(
        conn,
        "SELECT MAX(sort_order) FROM song WHERE category_id = ?1",
        category.id,
    )?;
    let order = resolve_order(song.order, std::iter::once(last));
    conn.execute(
        "INSERT INTO song (category_id, title, melody, author, content, audio, sort_order, page_number, negative_page_number) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            category.id,
            song.title,
            song.melody,
            song.author,
            song.content,
            song.audio,
            order,
            song.page_number,
            song.negative_page_number,
        ],
    )?;
    Ok(Song {
        id: conn.last_insert_rowid(),
        category_id: category.id,
        category_name: category.name,
        title: song.title,
        melody: song.melody,
        author: song.author,
        content: song.content,
        audio: song.audio,
        order: Some(order),
        page_number: song.page_number,
        negative_page_number: song.negative_page_number,
    })
}

/// SQLite-backed songbook catalog store.
#[derive(Clone)]
pub struct SqliteCatalogStore {
    read_pool: Vec<Arc<Mutex<Connection>>>,
    write_conn: Arc<Mutex<Connection>>,
    read_index: Arc<AtomicUsize>,
}

impl SqliteCatalogStore {
    /// Opens (or creates) the catalog database at `db_path`.
    ///
    /// `read_pool_size` connections are opened for reads, at least one.
    pub fn new<P: AsRef<Path>>(db_path: P, read_pool_size: usize) -> anyhow::Result<Self> {
        let db_path = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open catalog database")?;

        open_versioned_db(&mut write_conn, CATALOG_VERSIONED_SCHEMAS, "catalog")?;
        write_conn.pragma_update(None, "journal_mode", "WAL")?;

        let mut read_pool = Vec::with_capacity(read_pool_size.max(1));
        for _ in 0..read_pool_size.max(1) {
            let read_conn = Connection::open_with_flags(
                db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .context("Failed to open catalog read connection")?;
            read_pool.push(Arc::new(Mutex::new(read_conn)));
        }

        let store = SqliteCatalogStore {
            read_pool,
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_index: Arc::new(AtomicUsize::new(0)),
        };

        let stats = store
            .stats()
            .map_err(|e| anyhow::anyhow!("Failed to count catalog rows: {}", e))?;
        info!(
            "Opened catalog: {} songbooks, {} categories, {} songs",
            stats.songbooks, stats.categories, stats.songs
        );

        Ok(store)
    }

    fn get_read_conn(&self) -> Arc<Mutex<Connection>> {
        let index = self.read_index.fetch_add(1, Ordering::SeqCst) % self.read_pool.len();
        self.read_pool[index].clone()
    }

    fn read<T>(&self, op: impl FnOnce(&Connection) -> CatalogResult<T>) -> CatalogResult<T> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        op(&conn)
    }

    fn write<T>(&self, op: impl FnOnce(&Connection) -> CatalogResult<T>) -> CatalogResult<T> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute("BEGIN IMMEDIATE", [])?;

        match op(&conn) {
            Ok(value) => match conn.execute("COMMIT", []) {
                Ok(_) => Ok(value),
                Err(e) => {
                    let _ = conn.execute("ROLLBACK", []);
                    Err(e.into())
                }
            },
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }

    fn reorder_children(
        conn: &Connection,
        ids_sql: &str,
        update_sql: &str,
        parent_id: i64,
        ids: &[i64],
    ) -> CatalogResult<()> {
        let current = query_child_ids(conn, ids_sql, parent_id)?;
        check_reorder(&current, ids)?;
        for (id, order) in ids.iter().zip(renumbered(ids.len())) {
            conn.execute(update_sql, params![order, id])?;
        }
        Ok(())
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn create_songbook(&self, name: &str) -> CatalogResult<Songbook> {
        let name = required_text("name", name)?;
        self.write(move |conn| {
            if query_songbook_by_name(conn, &name)?.is_some() {
                return Err(CatalogError::Conflict(format!(
                    "A songbook named '{}' already exists.",
                    name
                )));
            }
            conn.execute("INSERT INTO songbook (name) VALUES (?1)", params![name])?;
            let id = conn.last_insert_rowid();
            debug!("Created songbook {} '{}'", id, name);
            Ok(Songbook { id, name })
        })
    }

    fn list_songbooks(&self) -> CatalogResult<Vec<Songbook>> {
        self.read(|conn| query_songbooks(conn, None))
    }

    fn delete_songbook(&self, id: i64) -> CatalogResult<bool> {
        self.write(|conn| Ok(conn.execute("DELETE FROM songbook WHERE id = ?1", params![id])? > 0))
    }

    fn get_or_create_songbook(&self, name: &str) -> CatalogResult<Songbook> {
        let name = required_text("name", name)?;
        self.write(move |conn| {
            if let Some(existing) = query_songbook_by_name(conn, &name)? {
                return Ok(existing);
            }
            conn.execute("INSERT INTO songbook (name) VALUES (?1)", params![name])?;
            info!("Created songbook '{}'", name);
            Ok(Songbook {
                id: conn.last_insert_rowid(),
                name,
            })
        })
    }

    fn get_songbook_tree(&self) -> CatalogResult<SongbookTree> {
        self.read(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM songbook ORDER BY id LIMIT 2")?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<i64>, _>>()?;
            let id = select_singleton(ids)?;
            select_singleton(load_trees(conn, Some(id))?)
        })
    }

    fn get_songbook_tree_by_id(&self, id: i64) -> CatalogResult<Option<SongbookTree>> {
        self.read(|conn| Ok(load_trees(conn, Some(id))?.into_iter().next()))
    }

    fn list_songbook_trees(&self) -> CatalogResult<Vec<SongbookTree>> {
        self.read(|conn| load_trees(conn, None))
    }

    fn create_category(
        &self,
        songbook_id: i64,
        name: &str,
        order: Option<i64>,
    ) -> CatalogResult<Category> {
        let name = required_text("name", name)?;
        validate_explicit_order(order)?;
        self.write(move |conn| {
            let songbook = require_songbook(conn, songbook_id)?;
            if query_category_by_name(conn, songbook_id, &name)?.is_some() {
                return Err(CatalogError::Conflict(format!(
                    "Category '{}' already exists in songbook '{}'.",
                    name, songbook.name
                )));
            }
            insert_category(conn, songbook_id, name, order)
        })
    }

    fn get_category(&self, id: i64) -> CatalogResult<Option<Category>> {
        self.read(|conn| query_category(conn, id))
    }

    fn list_categories(&self, songbook_id: Option<i64>) -> CatalogResult<Vec<Category>> {
        self.read(|conn| query_categories(conn, songbook_id))
    }

    fn update_category(&self, id: i64, update: CategoryUpdate) -> CatalogResult<Category> {
        let name = update
            .name
            .as_deref()
            .map(|n| required_text("name", n))
            .transpose()?;
        validate_explicit_order(update.order)?;
        self.write(move |conn| {
            let mut category = require_category(conn, id)?;
            if let Some(name) = name {
                if name != category.name
                    && query_category_by_name(conn, category.songbook_id, &name)?.is_some()
                {
                    return Err(CatalogError::Conflict(format!(
                        "Category '{}' already exists in this songbook.",
                        name
                    )));
                }
                category.name = name;
            }
            if let Some(order) = update.order {
                category.order = Some(order);
            }
            conn.execute(
                "UPDATE category SET name = ?1, sort_order = ?2 WHERE id = ?3",
                params![category.name, category.order, id],
            )?;
            Ok(category)
        })
    }

    fn delete_category(&self, id: i64) -> CatalogResult<bool> {
        self.write(|conn| Ok(conn.execute("DELETE FROM category WHERE id = ?1", params![id])? > 0))
    }

    fn reorder_categories(&self, songbook_id: i64, ids: &[i64]) -> CatalogResult<Vec<Category>> {
        self.write(|conn| {
            require_songbook(conn, songbook_id)?;
            Self::reorder_children(
                conn,
                "SELECT id FROM category WHERE songbook_id = ?1",
                "UPDATE category SET sort_order = ?1 WHERE id = ?2",
                songbook_id,
                ids,
            )?;
            query_categories(conn, Some(songbook_id))
        })
    }

    fn get_or_create_category(&self, songbook_id: i64, name: &str) -> CatalogResult<Category> {
        let name = required_text("name", name)?;
        self.write(move |conn| {
            require_songbook(conn, songbook_id)?;
            if let Some(existing) = query_category_by_name(conn, songbook_id, &name)? {
                return Ok(existing);
            }
            let category = insert_category(conn, songbook_id, name, None)?;
            info!(
                "Created category '{}' with order {:?}",
                category.name, category.order
            );
            Ok(category)
        })
    }

    fn create_song(&self, song: NewSong) -> CatalogResult<Song> {
        validate_explicit_order(song.order)?;
        let pages = PageNumbers::normalized(song.page_number, song.negative_page_number);
        let song = NewSong {
            title: required_text("title", &song.title)?,
            page_number: pages.page_number,
            negative_page_number: pages.negative_page_number,
            ..song
        };
        self.write(move |conn| {
            let category = require_category(conn, song.category_id)?;
            insert_song(conn, category, song)
        })
    }

    fn get_song(&self, id: i64) -> CatalogResult<Option<Song>> {
        self.read(|conn| query_song(conn, id))
    }

    fn list_songs(&self, category_id: Option<i64>) -> CatalogResult<Vec<Song>> {
        self.read(|conn| query_songs(conn, category_id, None))
    }

    fn update_song(&self, id: i64, update: SongUpdate) -> CatalogResult<Song> {
        if update.is_empty() {
            return self.read(|conn| require_song(conn, id));
        }
        let title = update
            .title
            .as_deref()
            .map(|t| required_text("title", t))
            .transpose()?;
        validate_explicit_order(update.order)?;
        self.write(move |conn| {
            let mut song = require_song(conn, id)?;
            if let Some(category_id) = update.category_id {
                let category = require_category(conn, category_id)?;
                song.category_id = category.id;
                song.category_name = category.name;
            }
            if let Some(title) = title {
                song.title = title;
            }
            if let Some(melody) = update.melody {
                song.melody = melody;
            }
            if let Some(author) = update.author {
                song.author = author;
            }
            if let Some(content) = update.content {
                song.content = content;
            }
            if let Some(audio) = update.audio {
                song.audio = audio;
            }
            if let Some(order) = update.order {
                song.order = Some(order);
            }
            if let Some(page_number) = update.page_number {
                song.page_number = page_number.map(front_page);
            }
            if let Some(negative_page_number) = update.negative_page_number {
                song.negative_page_number = negative_page_number.map(flipped_page);
            }

            conn.execute(
                "UPDATE song SET category_id = ?1, title = ?2, melody = ?3, author = ?4, content = ?5, \
                 audio = ?6, sort_order = ?7, page_number = ?8, negative_page_number = ?9 WHERE id = ?10",
                params![
                    song.category_id,
                    song.title,
                    song.melody,
                    song.author,
                    song.content,
                    song.audio,
                    song.order,
                    song.page_number,
                    song.negative_page_number,
                    id,
                ],
            )?;
            Ok(song)
        })
    }

    fn delete_song(&self, id: i64) -> CatalogResult<bool> {
        self.write(|conn| Ok(conn.execute("DELETE FROM song WHERE id = ?1", params![id])? > 0))
    }

    fn reorder_songs(&self, category_id: i64, ids: &[i64]) -> CatalogResult<Vec<Song>> {
        self.write(|conn| {
            require_category(conn, category_id)?;
            Self::reorder_children(
                conn,
                "SELECT id FROM song WHERE category_id = ?1",
                "UPDATE song SET sort_order = ?1 WHERE id = ?2",
                category_id,
                ids,
            )?;
            query_songs(conn, Some(category_id), None)
        })
    }

    fn upsert_song_by_title(
        &self,
        category_id: i64,
        title: &str,
        fields: ImportedSong,
    ) -> CatalogResult<(Song, UpsertOutcome)> {
        let title = required_text("title", title)?;
        let pages = PageNumbers::normalized(fields.page_number, fields.negative_page_number);
        self.write(move |conn| {
            let category = require_category(conn, category_id)?;
            let existing: Option<i64> = conn
                .query_row(
                    "SELECT id FROM song WHERE category_id = ?1 AND title = ?2 ORDER BY id LIMIT 1",
                    params![category_id, title],
                    |row| row.get(0),
                )
                .optional()?;

            match existing {
                Some(id) => {
                    conn.execute(
                        "UPDATE song SET melody = ?1, content = ?2, page_number = ?3, negative_page_number = ?4 WHERE id = ?5",
                        params![
                            fields.melody,
                            fields.content,
                            pages.page_number,
                            pages.negative_page_number,
                            id
                        ],
                    )?;
                    Ok((require_song(conn, id)?, UpsertOutcome::Updated))
                }
                None => {
                    let song = NewSong {
                        category_id,
                        title,
                        melody: fields.melody,
                        content: fields.content,
                        page_number: pages.page_number,
                        negative_page_number: pages.negative_page_number,
                        ..Default::default()
                    };
                    Ok((insert_song(conn, category, song)?, UpsertOutcome::Created))
                }
            }
        })
    }

    fn stats(&self) -> CatalogResult<CatalogStats> {
        self.read(|conn| {
            Ok(CatalogStats {
                songbooks: count(conn, "songbook")?,
                categories: count(conn, "category")?,
                songs: count(conn, "song")?,
            })
        })
    }
}
