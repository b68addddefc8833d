//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per songbook server endpoint.
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    /// Creates a new unauthenticated client
    ///
    /// Use this for testing authentication flows.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true) // Automatically handle session cookies
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    async fn logged_in_as(base_url: String, handle: &str, password: &str) -> Self {
        let client = Self::new(base_url);

        let response = client.login(handle, password).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::OK,
            "Authentication of {} failed: {:?}",
            handle,
            response.text().await
        );

        client
    }

    /// Creates a client pre-authenticated as the read-only test user
    pub async fn authenticated(base_url: String) -> Self {
        Self::logged_in_as(base_url, TEST_USER, TEST_PASS).await
    }

    /// Creates a client pre-authenticated as a user allowed to edit the catalog
    pub async fn authenticated_editor(base_url: String) -> Self {
        Self::logged_in_as(base_url, EDITOR_USER, EDITOR_PASS).await
    }

    /// Creates a client pre-authenticated as an admin user
    pub async fn authenticated_admin(base_url: String) -> Self {
        Self::logged_in_as(base_url, ADMIN_USER, ADMIN_PASS).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    async fn send_json(&self, method: reqwest::Method, path: &str, body: Value) -> Response {
        self.client
            .request(method, self.url(path))
            .json(&body)
            .send()
            .await
            .expect("JSON request failed")
    }

    async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .send()
            .await
            .expect("DELETE request failed")
    }

    // ========================================================================
    // Server and Authentication Endpoints
    // ========================================================================

    /// GET /
    pub async fn home(&self) -> Response {
        self.get("/").await
    }

    /// POST /v1/auth/login
    pub async fn login(&self, handle: &str, password: &str) -> Response {
        self.send_json(
            reqwest::Method::POST,
            "/v1/auth/login",
            json!({ "user_handle": handle, "password": password }),
        )
        .await
    }

    /// GET /v1/auth/logout
    pub async fn logout(&self) -> Response {
        self.get("/v1/auth/logout").await
    }

    /// POST /v1/auth/anonymous-login
    pub async fn anonymous_login(&self) -> Response {
        self.client
            .post(self.url("/v1/auth/anonymous-login"))
            .send()
            .await
            .expect("Anonymous login request failed")
    }

    // ========================================================================
    // Songbook Endpoints
    // ========================================================================

    /// GET /v1/songbook
    pub async fn get_songbook_tree(&self) -> Response {
        self.get("/v1/songbook").await
    }

    /// GET /v1/songbooks
    pub async fn list_songbooks(&self) -> Response {
        self.get("/v1/songbooks").await
    }

    /// GET /v1/songbooks/{id}
    pub async fn get_songbook(&self, id: i64) -> Response {
        self.get(&format!("/v1/songbooks/{}", id)).await
    }

    /// POST /v1/songbooks
    pub async fn create_songbook(&self, name: &str) -> Response {
        self.send_json(reqwest::Method::POST, "/v1/songbooks", json!({ "name": name }))
            .await
    }

    /// DELETE /v1/songbooks/{id}
    pub async fn delete_songbook(&self, id: i64) -> Response {
        self.delete(&format!("/v1/songbooks/{}", id)).await
    }

    /// PUT /v1/songbooks/{id}/categories/order
    pub async fn reorder_categories(&self, songbook_id: i64, ids: &[i64]) -> Response {
        self.send_json(
            reqwest::Method::PUT,
            &format!("/v1/songbooks/{}/categories/order", songbook_id),
            json!({ "ids": ids }),
        )
        .await
    }

    // ========================================================================
    // Category Endpoints
    // ========================================================================

    /// GET /v1/categories[?songbook_id=]
    pub async fn list_categories(&self, songbook_id: Option<i64>) -> Response {
        match songbook_id {
            Some(id) => self.get(&format!("/v1/categories?songbook_id={}", id)).await,
            None => self.get("/v1/categories").await,
        }
    }

    /// GET /v1/categories/{id}
    pub async fn get_category(&self, id: i64) -> Response {
        self.get(&format!("/v1/categories/{}", id)).await
    }

    /// POST /v1/categories
    pub async fn create_category(&self, body: Value) -> Response {
        self.send_json(reqwest::Method::POST, "/v1/categories", body)
            .await
    }

    /// PUT /v1/categories/{id}
    pub async fn update_category(&self, id: i64, body: Value) -> Response {
        self.send_json(reqwest::Method::PUT, &format!("/v1/categories/{}", id), body)
            .await
    }

    /// DELETE /v1/categories/{id}
    pub async fn delete_category(&self, id: i64) -> Response {
        self.delete(&format!("/v1/categories/{}", id)).await
    }

    /// PUT /v1/categories/{id}/songs/order
    pub async fn reorder_songs(&self, category_id: i64, ids: &[i64]) -> Response {
        self.send_json(
            reqwest::Method::PUT,
            &format!("/v1/categories/{}/songs/order", category_id),
            json!({ "ids": ids }),
        )
        .await
    }

    // ========================================================================
    // Song Endpoints
    // ========================================================================

    /// GET /v1/songs[?category_id=]
    pub async fn list_songs(&self, category_id: Option<i64>) -> Response {
        match category_id {
            Some(id) => self.get(&format!("/v1/songs?category_id={}", id)).await,
            None => self.get("/v1/songs").await,
        }
    }

    /// GET /v1/songs/{id}
    pub async fn get_song(&self, id: i64) -> Response {
        self.get(&format!("/v1/songs/{}", id)).await
    }

    /// POST /v1/songs
    pub async fn create_song(&self, body: Value) -> Response {
        self.send_json(reqwest::Method::POST, "/v1/songs", body).await
    }

    /// PATCH /v1/songs/{id}
    pub async fn patch_song(&self, id: i64, body: Value) -> Response {
        self.send_json(reqwest::Method::PATCH, &format!("/v1/songs/{}", id), body)
            .await
    }

    /// PUT /v1/songs/{id}
    pub async fn put_song(&self, id: i64, body: Value) -> Response {
        self.send_json(reqwest::Method::PUT, &format!("/v1/songs/{}", id), body)
            .await
    }

    /// DELETE /v1/songs/{id}
    pub async fn delete_song(&self, id: i64) -> Response {
        self.delete(&format!("/v1/songs/{}", id)).await
    }
}
