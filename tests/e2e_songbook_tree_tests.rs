//! End-to-end tests for the nested songbook view

mod common;

use common::*;
use reqwest::StatusCode;
use serde_json::{json, Value};

fn category_names(tree: &Value) -> Vec<String> {
    tree["categories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect()
}

fn song_titles(category: &Value) -> Vec<String> {
    category["songs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_tree_nests_categories_and_songs_in_order() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.get_songbook_tree().await;
    assert_eq!(response.status(), StatusCode::OK);
    let tree: Value = response.json().await.unwrap();

    assert_eq!(tree["id"], SONGBOOK_ID);
    assert_eq!(tree["name"], SONGBOOK_NAME);
    assert_eq!(
        category_names(&tree),
        vec![CATEGORY_ADVENT_NAME, CATEGORY_SUMMER_NAME]
    );
    assert_eq!(
        song_titles(&tree["categories"][0]),
        vec![SONG_ALPHA_TITLE, SONG_BETA_TITLE]
    );
    assert_eq!(song_titles(&tree["categories"][1]), vec![SONG_GAMMA_TITLE]);

    let alpha = &tree["categories"][0]["songs"][0];
    assert_eq!(alpha["page_number"], 3);
    assert_eq!(alpha["melody"], "Greensleeves");
}

#[tokio::test]
async fn test_tree_follows_reordering() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_editor(server.base_url.clone()).await;

    let response = client
        .reorder_categories(SONGBOOK_ID, &[CATEGORY_SUMMER_ID, CATEGORY_ADVENT_ID])
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .patch_song(SONG_ALPHA_ID, json!({"order": 30}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let tree: Value = client.get_songbook_tree().await.json().await.unwrap();
    assert_eq!(
        category_names(&tree),
        vec![CATEGORY_SUMMER_NAME, CATEGORY_ADVENT_NAME]
    );
    assert_eq!(
        song_titles(&tree["categories"][1]),
        vec![SONG_BETA_TITLE, SONG_ALPHA_TITLE]
    );
}

#[tokio::test]
async fn test_tree_honours_explicit_category_order() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_editor(server.base_url.clone()).await;

    let response = client
        .create_category(json!({"songbook": SONGBOOK_ID, "name": "Autumn", "order": 1}))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let tree: Value = client.get_songbook_tree().await.json().await.unwrap();
    assert_eq!(
        category_names(&tree),
        vec!["Autumn", CATEGORY_ADVENT_NAME, CATEGORY_SUMMER_NAME]
    );
    let autumn = &tree["categories"][0];
    assert_eq!(autumn["songs"], json!([]));
}

#[tokio::test]
async fn test_tree_requires_a_single_songbook() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_editor(server.base_url.clone()).await;

    let response = client.create_songbook("Second").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let second: Value = response.json().await.unwrap();
    let second_id = second["id"].as_i64().unwrap();

    let response = client.get_songbook_tree().await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Single songbooks stay reachable by id
    let response = client.get_songbook(SONGBOOK_ID).await;
    assert_eq!(response.status(), StatusCode::OK);
    let tree: Value = response.json().await.unwrap();
    assert_eq!(category_names(&tree).len(), 2);

    let response = client.get_songbook(second_id).await;
    let tree: Value = response.json().await.unwrap();
    assert_eq!(tree["categories"], json!([]));

    let response = client.delete_songbook(SONGBOOK_ID).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let tree: Value = client.get_songbook_tree().await.json().await.unwrap();
    assert_eq!(tree["name"], "Second");

    assert_eq!(server.catalog_store.stats().unwrap().songs, 0);
}

#[tokio::test]
async fn test_tree_is_not_found_without_songbooks() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_admin(server.base_url.clone()).await;

    let response = client.delete_songbook(SONGBOOK_ID).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client.get_songbook_tree().await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client.delete_songbook(SONGBOOK_ID).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let songbooks: Vec<Value> = client.list_songbooks().await.json().await.unwrap();
    assert!(songbooks.is_empty());
}
