use super::auth::{AuthToken, AuthTokenValue, UsernamePasswordCredentials};
use super::permissions::UserRole;
use anyhow::Result;
use std::time::SystemTime;

pub trait UserAuthCredentialsStore: Send + Sync {
    /// Returns the user's password credentials given the user handle.
    /// Returns Ok(None) if the user does not exist or has no password.
    fn get_password_credentials(
        &self,
        user_handle: &str,
    ) -> Result<Option<UsernamePasswordCredentials>>;

    /// Inserts or replaces the password credentials of a user.
    fn set_password_credentials(&self, credentials: &UsernamePasswordCredentials) -> Result<()>;

    /// Records a login attempt against the user's password.
    fn record_password_attempt(&self, user_id: i64, succeeded: bool) -> Result<()>;
}

pub trait UserAuthTokenStore: Send + Sync {
    /// Returns a user's authentication token given an AuthTokenValue.
    /// Returns Ok(None) if the token does not exist.
    fn get_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Deletes an auth token given the token value.
    /// Returns Ok(None) if the token does not exist.
    fn delete_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Updates an auth token with the latest timestamp.
    fn update_user_auth_token_last_used_timestamp(&self, token: &AuthTokenValue) -> Result<()>;

    /// Adds a new auth token.
    fn add_user_auth_token(&self, token: &AuthToken) -> Result<()>;

    /// Deletes every token that expired before `now`.
    /// Returns the number of tokens that were deleted.
    fn prune_expired_auth_tokens(&self, now: SystemTime) -> Result<usize>;

    /// Like [`UserAuthTokenStore::prune_expired_auth_tokens`], restricted to
    /// the tokens of `user_id`.
    fn prune_expired_user_auth_tokens(&self, user_id: i64, now: SystemTime) -> Result<usize>;
}

pub trait UserStore: UserAuthTokenStore + UserAuthCredentialsStore + Send + Sync {
    /// Creates a new user and returns the user id.
    fn create_user(&self, user_handle: &str) -> Result<i64>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user_handle(&self, user_id: i64) -> Result<Option<String>>;

    /// Returns all users' handles, ordered by id.
    fn get_all_user_handles(&self) -> Result<Vec<String>>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user_id(&self, user_handle: &str) -> Result<Option<i64>>;

    /// Returns all roles assigned to a user.
    fn get_user_roles(&self, user_id: i64) -> Result<Vec<UserRole>>;

    /// Assigns a role to a user. Assigning a role twice is a no-op.
    fn add_user_role(&self, user_id: i64, role: UserRole) -> Result<()>;

    /// Removes a role from a user.
    fn remove_user_role(&self, user_id: i64, role: UserRole) -> Result<()>;
}
