//! SQLite schema of the songbook catalog.
//!
//! Ownership is a strict tree: deleting a songbook removes its categories,
//! deleting a category removes its songs. `order` is a reserved word in SQL,
//! so sibling order lives in `sort_order`.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};

pub const SONGBOOK_TABLE: Table = Table {
    name: "songbook",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[&["name"]],
};

pub const CATEGORY_TABLE: Table = Table {
    name: "category",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "songbook_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "songbook",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("sort_order", &SqlType::Integer),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_category_songbook_id", "songbook_id")],
    unique_constraints: &[&["songbook_id", "name"]],
};

pub const SONG_TABLE: Table = Table {
    name: "song",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "category_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "category",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("melody", &SqlType::Text),
        sqlite_column!("author", &SqlType::Text),
        sqlite_column!("content", &SqlType::Text),
        sqlite_column!("audio", &SqlType::Text),
        sqlite_column!("sort_order", &SqlType::Integer),
        sqlite_column!("page_number", &SqlType::Integer),
        sqlite_column!("negative_page_number", &SqlType::Integer),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[
        ("idx_song_category_id", "category_id"),
        ("idx_song_title", "title"),
    ],
    unique_constraints: &[],
};

pub const CATALOG_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[SONGBOOK_TABLE, CATEGORY_TABLE, SONG_TABLE],
    migration: None,
}];
