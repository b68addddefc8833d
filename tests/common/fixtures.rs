//! Seed data for end-to-end tests

use super::constants::*;
use anyhow::Result;
use songbook_server::catalog_store::{CatalogStore, NewSong, SqliteCatalogStore};
use songbook_server::user::{SqliteUserStore, UserManager, UserRole};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Creates `catalog.db` in `dir` with one songbook, two categories and
/// three songs. Ids match the constants.
pub fn create_test_catalog(dir: &Path) -> Result<PathBuf> {
    let db_path = dir.join("catalog.db");
    let store = SqliteCatalogStore::new(&db_path, 1)?;

    let songbook = store.create_songbook(SONGBOOK_NAME)?;
    let advent = store.create_category(songbook.id, CATEGORY_ADVENT_NAME, None)?;
    let summer = store.create_category(songbook.id, CATEGORY_SUMMER_NAME, None)?;

    store.create_song(NewSong {
        category_id: advent.id,
        title: SONG_ALPHA_TITLE.to_string(),
        melody: Some("Greensleeves".to_string()),
        content: Some("<p>First verse</p>".to_string()),
        page_number: Some(3),
        ..Default::default()
    })?;
    store.create_song(NewSong {
        category_id: advent.id,
        title: SONG_BETA_TITLE.to_string(),
        negative_page_number: Some(4),
        ..Default::default()
    })?;
    store.create_song(NewSong {
        category_id: summer.id,
        title: SONG_GAMMA_TITLE.to_string(),
        ..Default::default()
    })?;

    Ok(db_path)
}

/// Creates `user.db` in `dir` with one user per role plus one without roles.
pub fn create_test_db_with_users(dir: &Path) -> Result<PathBuf> {
    let db_path = dir.join("user.db");
    let store = SqliteUserStore::new(&db_path)?;
    let user_manager = UserManager::new(Box::new(store), Duration::from_secs(3600));

    let users = [
        (TEST_USER, TEST_PASS, Some(UserRole::Regular)),
        (EDITOR_USER, EDITOR_PASS, Some(UserRole::Editor)),
        (ADMIN_USER, ADMIN_PASS, Some(UserRole::Admin)),
        (NO_ROLE_USER, NO_ROLE_PASS, None),
    ];
    for (handle, password, role) in users {
        let user_id = create_user_with_password_and_role(&user_manager, handle, password, role)?;
        eprintln!("Created test user {} with id {}", handle, user_id);
    }

    Ok(db_path)
}

/// Creates a user with the given credentials and role
pub fn create_user_with_password_and_role(
    user_manager: &UserManager,
    username: &str,
    password: &str,
    role: Option<UserRole>,
) -> Result<i64> {
    let user_id = user_manager.add_user(username)?;
    user_manager.set_password(username, password)?;
    if let Some(role) = role {
        user_manager.add_user_role(user_id, role)?;
    }
    Ok(user_id)
}
