//! Catalog endpoints: songbooks, categories and songs.
//!
//! Every route needs a session with `AccessCatalog`; writes also need
//! `EditCatalog`.

use super::error::{ApiError, ApiResult};
use super::metrics::{record_catalog_write, set_catalog_items};
use super::session::Session;
use super::state::ServerState;
use crate::catalog_store::{
    double_option, parse_page_value, CatalogResult, Category, CategoryUpdate, NewSong,
    PageNumberPolicy, Song, SongUpdate, Songbook, SongbookTree,
};
use crate::user::Permission;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Deserialize, Debug)]
struct CreateSongbookBody {
    pub name: String,
}

#[derive(Deserialize, Debug)]
struct CreateCategoryBody {
    #[serde(alias = "songbook_id")]
    pub songbook: i64,
    pub name: String,
    #[serde(default)]
    pub order: Option<i64>,
}

#[derive(Deserialize, Debug)]
struct UpdateCategoryBody {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
}

#[derive(Deserialize, Debug)]
struct OrderBody {
    pub ids: Vec<i64>,
}

#[derive(Deserialize, Debug)]
struct CategoriesQuery {
    pub songbook_id: Option<i64>,
}

#[derive(Deserialize, Debug)]
struct SongsQuery {
    pub category_id: Option<i64>,
}

#[derive(Deserialize, Debug)]
struct CreateSongBody {
    #[serde(alias = "category_id")]
    pub category: i64,
    pub title: String,
    #[serde(default)]
    pub melody: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub page_number: Option<Value>,
    #[serde(default)]
    pub negative_page_number: Option<Value>,
}

/// Partial song update. Absent fields are left alone, `null` clears.
#[derive(Deserialize, Debug, Default)]
struct UpdateSongBody {
    #[serde(default, alias = "category_id", deserialize_with = "double_option")]
    pub category: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub melody: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub author: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub content: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub audio: Option<Option<String>>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    pub page_number: Option<Option<Value>>,
    #[serde(default, deserialize_with = "double_option")]
    pub negative_page_number: Option<Option<Value>>,
}

fn page_value(
    field: &str,
    value: Option<Value>,
    policy: PageNumberPolicy,
) -> CatalogResult<Option<i64>> {
    match value {
        None => Ok(None),
        Some(value) => parse_page_value(field, &value, policy),
    }
}

/// A dropped malformed value leaves the stored page untouched.
fn page_update(
    field: &str,
    value: Option<Option<Value>>,
    policy: PageNumberPolicy,
) -> CatalogResult<Option<Option<i64>>> {
    match value {
        None => Ok(None),
        Some(None) => Ok(Some(None)),
        Some(Some(value)) => Ok(parse_page_value(field, &value, policy)?.map(Some)),
    }
}

impl CreateSongBody {
    fn into_new_song(self, policy: PageNumberPolicy) -> CatalogResult<NewSong> {
        Ok(NewSong {
            category_id: self.category,
            title: self.title,
            melody: self.melody,
            author: self.author,
            content: self.content,
            audio: self.audio,
            order: self.order,
            page_number: page_value("page_number", self.page_number, policy)?,
            negative_page_number: page_value(
                "negative_page_number",
                self.negative_page_number,
                policy,
            )?,
        })
    }
}

impl UpdateSongBody {
    fn into_song_update(self, policy: PageNumberPolicy) -> ApiResult<SongUpdate> {
        let category_id = match self.category {
            Some(None) => return Err(ApiError::bad_request("category cannot be null.")),
            other => other.flatten(),
        };
        let title = match self.title {
            Some(None) => return Err(ApiError::bad_request("title cannot be null.")),
            other => other.flatten(),
        };
        Ok(SongUpdate {
            category_id,
            title,
            melody: self.melody,
            author: self.author,
            content: self.content,
            audio: self.audio,
            order: self.order,
            page_number: page_update("page_number", self.page_number, policy)?,
            negative_page_number: page_update(
                "negative_page_number",
                self.negative_page_number,
                policy,
            )?,
        })
    }
}

/// Bookkeeping after a successful write.
fn record_write(state: &ServerState, entity: &str, operation: &str) {
    record_catalog_write(entity, operation);
    match state.catalog_store.stats() {
        Ok(stats) => set_catalog_items(&stats),
        Err(err) => warn!("Could not refresh catalog metrics: {}", err),
    }
}

fn deleted_or_not_found(deleted: bool, what: &str, id: i64) -> ApiResult<StatusCode> {
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("{} {} not found.", what, id)))
    }
}

// =============================================================================
// Songbooks
// =============================================================================

async fn get_songbook_tree(
    session: Session,
    State(state): State<ServerState>,
) -> ApiResult<Json<SongbookTree>> {
    session.require(Permission::AccessCatalog)?;
    Ok(Json(state.catalog_store.get_songbook_tree()?))
}

async fn list_songbooks(
    session: Session,
    State(state): State<ServerState>,
) -> ApiResult<Json<Vec<SongbookTree>>> {
    session.require(Permission::AccessCatalog)?;
    Ok(Json(state.catalog_store.list_songbook_trees()?))
}

async fn post_songbook(
    session: Session,
    State(state): State<ServerState>,
    Json(body): Json<CreateSongbookBody>,
) -> ApiResult<Response> {
    session.require(Permission::EditCatalog)?;
    let songbook: Songbook = state.catalog_store.create_songbook(&body.name)?;
    debug!("User {} created songbook {}", session.user_id, songbook.id);
    record_write(&state, "songbook", "create");
    Ok((StatusCode::CREATED, Json(songbook)).into_response())
}

async fn get_songbook(
    session: Session,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<SongbookTree>> {
    session.require(Permission::AccessCatalog)?;
    state
        .catalog_store
        .get_songbook_tree_by_id(id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Songbook {} not found.", id)))
}

async fn delete_songbook(
    session: Session,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    session.require(Permission::EditCatalog)?;
    let deleted = state.catalog_store.delete_songbook(id)?;
    if deleted {
        record_write(&state, "songbook", "delete");
    }
    deleted_or_not_found(deleted, "Songbook", id)
}

async fn put_categories_order(
    session: Session,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(body): Json<OrderBody>,
) -> ApiResult<Json<Vec<Category>>> {
    session.require(Permission::EditCatalog)?;
    let categories = state.catalog_store.reorder_categories(id, &body.ids)?;
    record_write(&state, "category", "reorder");
    Ok(Json(categories))
}

// =============================================================================
// Categories
// =============================================================================

async fn list_categories(
    session: Session,
    State(state): State<ServerState>,
    Query(query): Query<CategoriesQuery>,
) -> ApiResult<Json<Vec<Category>>> {
    session.require(Permission::AccessCatalog)?;
    Ok(Json(state.catalog_store.list_categories(query.songbook_id)?))
}

async fn post_category(
    session: Session,
    State(state): State<ServerState>,
    Json(body): Json<CreateCategoryBody>,
) -> ApiResult<Response> {
    session.require(Permission::EditCatalog)?;
    let category = state
        .catalog_store
        .create_category(body.songbook, &body.name, body.order)?;
    record_write(&state, "category", "create");
    Ok((StatusCode::CREATED, Json(category)).into_response())
}

async fn get_category(
    session: Session,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Category>> {
    session.require(Permission::AccessCatalog)?;
    state
        .catalog_store
        .get_category(id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Category {} not found.", id)))
}

async fn put_category(
    session: Session,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateCategoryBody>,
) -> ApiResult<Json<Category>> {
    session.require(Permission::EditCatalog)?;
    let category = state.catalog_store.update_category(
        id,
        CategoryUpdate {
            name: body.name,
            order: body.order,
        },
    )?;
    record_write(&state, "category", "update");
    Ok(Json(category))
}

async fn delete_category(
    session: Session,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    session.require(Permission::EditCatalog)?;
    let deleted = state.catalog_store.delete_category(id)?;
    if deleted {
        record_write(&state, "category", "delete");
    }
    deleted_or_not_found(deleted, "Category", id)
}

async fn put_songs_order(
    session: Session,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(body): Json<OrderBody>,
) -> ApiResult<Json<Vec<Song>>> {
    session.require(Permission::EditCatalog)?;
    let songs = state.catalog_store.reorder_songs(id, &body.ids)?;
    record_write(&state, "song", "reorder");
    Ok(Json(songs))
}

// =============================================================================
// Songs
// =============================================================================

async fn list_songs(
    session: Session,
    State(state): State<ServerState>,
    Query(query): Query<SongsQuery>,
) -> ApiResult<Json<Vec<Song>>> {
    session.require(Permission::AccessCatalog)?;
    Ok(Json(state.catalog_store.list_songs(query.category_id)?))
}

async fn post_song(
    session: Session,
    State(state): State<ServerState>,
    Json(body): Json<CreateSongBody>,
) -> ApiResult<Response> {
    session.require(Permission::EditCatalog)?;
    let new_song = body.into_new_song(state.config.page_number_policy)?;
    let song = state.catalog_store.create_song(new_song)?;
    record_write(&state, "song", "create");
    Ok((StatusCode::CREATED, Json(song)).into_response())
}

async fn get_song(
    session: Session,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Song>> {
    session.require(Permission::AccessCatalog)?;
    state
        .catalog_store
        .get_song(id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Song {} not found.", id)))
}

async fn update_song(
    session: Session,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateSongBody>,
) -> ApiResult<Json<Song>> {
    session.require(Permission::EditCatalog)?;
    let update = body.into_song_update(state.config.page_number_policy)?;
    let song = state.catalog_store.update_song(id, update)?;
    record_write(&state, "song", "update");
    Ok(Json(song))
}

async fn delete_song(
    session: Session,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    session.require(Permission::EditCatalog)?;
    let deleted = state.catalog_store.delete_song(id)?;
    if deleted {
        record_write(&state, "song", "delete");
    }
    deleted_or_not_found(deleted, "Song", id)
}

pub fn make_catalog_routes(state: ServerState) -> Router {
    Router::new()
        .route("/songbook", get(get_songbook_tree))
        .route("/songbooks", get(list_songbooks).post(post_songbook))
        .route("/songbooks/{id}", get(get_songbook).delete(delete_songbook))
        .route("/songbooks/{id}/categories/order", put(put_categories_order))
        .route("/categories", get(list_categories).post(post_category))
        .route(
            "/categories/{id}",
            get(get_category).put(put_category).delete(delete_category),
        )
        .route("/categories/{id}/songs/order", put(put_songs_order))
        .route("/songs", get(list_songs).post(post_song))
        .route(
            "/songs/{id}",
            get(get_song)
                .put(update_song)
                .patch(update_song)
                .delete(delete_song),
        )
        .with_state(state)
}
