use super::Tracker;
use crate::store::Store;
use crate::validation::validate_email;
use crate::{Error, Result, User};
use chrono::Utc;
use uuid::Uuid;

impl<S: Store> Tracker<S> {
    /// Register a user; emails are stored lowercased and must be unique
    pub fn register_user(&self, email: &str) -> Result<User> {
        validate_email(email)?;
        let email = email.trim().to_lowercase();

        if self.store.get_user_by_email(&email)?.is_some() {
            return Err(Error::DuplicateEmail(email));
        }

        let user = User {
            id: Uuid::new_v4(),
            email,
            created_at: Utc::now(),
        };
        self.store.create_user(&user)?;

        tracing::info!("Registered user {}", user.id);
        Ok(user)
    }

    pub fn get_user(&self, id: Uuid) -> Result<User> {
        self.store
            .get_user(id)?
            .ok_or_else(|| Error::not_found("User", id))
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<User> {
        self.store
            .get_user_by_email(email)?
            .ok_or_else(|| Error::not_found("User", email.trim()))
    }
}
