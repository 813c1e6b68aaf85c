use std::sync::Arc;

use tracing::info;

use crate::auth;
use crate::error::{AppError, AppResult};
use crate::models::User;
use crate::oauth::GoogleProfile;
use crate::store::UserStore;

/// Signup, login and Google-login flows over the user store.
pub struct AccountService {
    store: Arc<dyn UserStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Register a password account. The email must not already be taken.
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> AppResult<User> {
        if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "name, email and password are required".into(),
            ));
        }

        let existing = self
            .store
            .find_by_email(email)
            .await
            .map_err(AppError::persistence)?;
        if existing.is_some() {
            return Err(AppError::DuplicateEmail);
        }

        let hash = auth::hash_password(password).map_err(AppError::persistence)?;
        let user = User::new_local(name.to_string(), email.to_string(), hash);

        self.store
            .insert_user(&user)
            .await
            .map_err(AppError::persistence)?;

        info!(user_id = %user.id, "registered new account");
        Ok(user)
    }

    /// Verify email + password. Accounts created through Google have no
    /// password hash and must log in through the OAuth flow.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<User> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AppError::Validation("email and password are required".into()));
        }

        let user = self
            .store
            .find_by_email(email)
            .await
            .map_err(AppError::persistence)?
            .ok_or(AppError::InvalidCredentials)?;

        let hash = user
            .password_hash
            .as_deref()
            .ok_or(AppError::GoogleOnlyAccount)?;

        let ok = auth::verify_password(password, hash).map_err(AppError::persistence)?;
        if !ok {
            return Err(AppError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Look up a Google account by provider id, creating it on first sight.
    pub async fn google_login(&self, profile: GoogleProfile) -> AppResult<User> {
        if let Some(user) = self
            .store
            .find_by_google_id(&profile.id)
            .await
            .map_err(AppError::persistence)?
        {
            return Ok(user);
        }

        let user = User::new_google(profile.id, profile.name, profile.email, profile.picture);
        self.store
            .insert_user(&user)
            .await
            .map_err(AppError::persistence)?;

        info!(user_id = %user.id, "created account from Google profile");
        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> AppResult<User> {
        self.store
            .find_by_id(id)
            .await
            .map_err(AppError::persistence)?
            .ok_or_else(|| AppError::NotFound("user not found".into()))
    }
}
