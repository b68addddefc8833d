use super::{
    auth::{AuthToken, AuthTokenValue, UsernamePasswordCredentials},
    permissions::{permissions_of, Permission, UserRole},
    UserStore,
};
use anyhow::{bail, Context, Result};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

pub struct UserManager {
    user_store: Box<dyn UserStore>,
    token_lifetime: Duration,
}

impl UserManager {
    pub fn new(user_store: Box<dyn UserStore>, token_lifetime: Duration) -> Self {
        Self {
            user_store,
            token_lifetime,
        }
    }

    pub fn token_lifetime(&self) -> Duration {
        self.token_lifetime
    }

    pub fn add_user<T: AsRef<str>>(&self, user_handle: T) -> Result<i64> {
        let user_handle = user_handle.as_ref().trim();
        if user_handle.is_empty() {
            bail!("The user handle cannot be empty.")
        }
        if self.user_store.get_user_id(user_handle)?.is_some() {
            bail!("User handle already exists.");
        }
        self.user_store.create_user(user_handle)
    }

    pub fn get_user_id(&self, user_handle: &str) -> Result<Option<i64>> {
        self.user_store.get_user_id(user_handle)
    }

    pub fn get_user_handle(&self, user_id: i64) -> Result<Option<String>> {
        self.user_store.get_user_handle(user_id)
    }

    pub fn get_all_user_handles(&self) -> Result<Vec<String>> {
        self.user_store.get_all_user_handles()
    }

    /// Creates or replaces the password of the user.
    pub fn set_password(&self, user_handle: &str, password: &str) -> Result<()> {
        if password.is_empty() {
            bail!("The password cannot be empty.");
        }
        let user_id = self
            .user_store
            .get_user_id(user_handle)?
            .with_context(|| format!("User with handle {} not found.", user_handle))?;
        let credentials = UsernamePasswordCredentials::hashed(user_id, password)?;
        self.user_store.set_password_credentials(&credentials)
    }

    /// Verifies `password` and issues a new auth token.
    ///
    /// Returns Ok(None) when the user does not exist, has no password or the
    /// password does not match.
    pub fn login(&self, user_handle: &str, password: &str) -> Result<Option<AuthToken>> {
        let Some(credentials) = self.user_store.get_password_credentials(user_handle)? else {
            debug!("No password credentials for {}", user_handle);
            return Ok(None);
        };

        let matches = credentials.verify(password)?;
        self.user_store
            .record_password_attempt(credentials.user_id, matches)?;
        if !matches {
            debug!("Wrong password for {}", user_handle);
            return Ok(None);
        }

        self.generate_auth_token(credentials.user_id).map(Some)
    }

    pub fn generate_auth_token(&self, user_id: i64) -> Result<AuthToken> {
        let token = AuthToken::new(user_id, self.token_lifetime);
        self.user_store.add_user_auth_token(&token)?;
        Ok(token)
    }

    /// Looks up a token that is still valid. An expired token is deleted and
    /// reported as missing.
    pub fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let Some(token) = self.user_store.get_user_auth_token(value)? else {
            return Ok(None);
        };
        if token.is_expired_at(SystemTime::now()) {
            debug!("Auth token of user {} expired", token.user_id);
            self.user_store.delete_user_auth_token(value)?;
            return Ok(None);
        }
        Ok(Some(token))
    }

    pub fn update_auth_token_last_used(&self, value: &AuthTokenValue) -> Result<()> {
        self.user_store
            .update_user_auth_token_last_used_timestamp(value)
    }

    /// Deletes a token owned by `user_id`.
    pub fn delete_auth_token(&self, user_id: i64, token_value: &AuthTokenValue) -> Result<()> {
        let Some(token) = self.user_store.get_user_auth_token(token_value)? else {
            bail!("Did not find auth token");
        };
        if token.user_id != user_id {
            bail!(
                "Tried to delete an auth token of user {}, but the authenticated user is {}",
                token.user_id,
                user_id
            );
        }
        self.user_store.delete_user_auth_token(token_value)?;
        Ok(())
    }

    pub fn prune_expired_auth_tokens(&self) -> Result<usize> {
        self.user_store.prune_expired_auth_tokens(SystemTime::now())
    }

    pub fn prune_expired_auth_tokens_of(&self, user_id: i64) -> Result<usize> {
        self.user_store
            .prune_expired_user_auth_tokens(user_id, SystemTime::now())
    }

    /// Returns the id of the service account used for anonymous sessions,
    /// creating it with the Regular role when missing.
    pub fn get_or_create_service_account(&self, user_handle: &str) -> Result<i64> {
        if let Some(user_id) = self.user_store.get_user_id(user_handle)? {
            return Ok(user_id);
        }
        let user_id = self.add_user(user_handle)?;
        self.user_store.add_user_role(user_id, UserRole::Regular)?;
        info!("Created service account {} ({})", user_handle, user_id);
        Ok(user_id)
    }

    pub fn get_user_roles(&self, user_id: i64) -> Result<Vec<UserRole>> {
        self.user_store.get_user_roles(user_id)
    }

    pub fn add_user_role(&self, user_id: i64, role: UserRole) -> Result<()> {
        self.user_store.add_user_role(user_id, role)
    }

    pub fn remove_user_role(&self, user_id: i64, role: UserRole) -> Result<()> {
        self.user_store.remove_user_role(user_id, role)
    }

    pub fn get_user_permissions(&self, user_id: i64) -> Result<Vec<Permission>> {
        Ok(permissions_of(&self.user_store.get_user_roles(user_id)?))
    }
}
