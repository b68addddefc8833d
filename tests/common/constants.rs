//! Shared constants for end-to-end tests
//!
//! When seeded test data changes (user credentials, catalog IDs, etc.),
//! update only this file.

// ============================================================================
// Test User Credentials
// ============================================================================

/// Read-only test user handle (Regular role)
pub const TEST_USER: &str = "testuser";

/// Read-only test user password
pub const TEST_PASS: &str = "testpass123";

/// Editor test user handle
pub const EDITOR_USER: &str = "editor";

/// Editor test user password
pub const EDITOR_PASS: &str = "editorpass123";

/// Admin test user handle
pub const ADMIN_USER: &str = "admin";

/// Admin test user password
pub const ADMIN_PASS: &str = "adminpass123";

/// Test user without any role
pub const NO_ROLE_USER: &str = "norole";

pub const NO_ROLE_PASS: &str = "noropass123";

/// Service account used by anonymous logins
pub const SERVICE_ACCOUNT: &str = "anonymous";

// ============================================================================
// Seeded Catalog
// ============================================================================

pub const SONGBOOK_NAME: &str = "Albins";
pub const SONGBOOK_ID: i64 = 1;

/// Category "Advent", order 10
pub const CATEGORY_ADVENT_ID: i64 = 1;
pub const CATEGORY_ADVENT_NAME: &str = "Advent";

/// Category "Summer", order 20
pub const CATEGORY_SUMMER_ID: i64 = 2;
pub const CATEGORY_SUMMER_NAME: &str = "Summer";

/// "Alpha" in Advent, order 10, page 3
pub const SONG_ALPHA_ID: i64 = 1;

/// "Beta" in Advent, order 20, flipped page -4
pub const SONG_BETA_ID: i64 = 2;

/// "Gamma" in Summer, order 10
pub const SONG_GAMMA_ID: i64 = 3;

pub const SONG_ALPHA_TITLE: &str = "Alpha";
pub const SONG_BETA_TITLE: &str = "Beta";
pub const SONG_GAMMA_TITLE: &str = "Gamma";

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
