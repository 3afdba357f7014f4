//! Collaborators the server is assembled from.
//!
//! Each trait is object safe so the server can hold `Arc<dyn ...>` and tests
//! can swap in their own implementations.

use crate::{Result, User};
use async_trait::async_trait;

/// Persistence for users, keyed by username.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts `user`.
    ///
    /// # Errors
    ///
    /// [`Error::UserAlreadyExists`](crate::Error::UserAlreadyExists) if the
    /// username is taken.
    async fn create(&self, user: User) -> Result<()>;

    /// Fetches a user.
    ///
    /// # Errors
    ///
    /// [`Error::UserNotFound`](crate::Error::UserNotFound) if it does not
    /// exist.
    async fn get(&self, username: &str) -> Result<User>;

    /// Replaces the stored record for `user.username`.
    async fn update(&self, user: User) -> Result<()>;

    /// Returns the total number of users and one page of them, newest first.
    async fn list(&self, offset: usize, limit: usize) -> Result<(u64, Vec<User>)>;

    /// Deletes a user. Deleting a user that does not exist is not an error.
    async fn delete(&self, username: &str) -> Result<()>;

    /// Number of stored users.
    async fn count(&self) -> Result<u64> {
        Ok(self.list(0, 0).await?.0)
    }
}

/// Turns a bearer token into the subject it was issued to.
pub trait TokenValidator: Send + Sync {
    /// # Errors
    ///
    /// [`Error::TokenInvalid`](crate::Error::TokenInvalid) if the token is
    /// malformed, forged or expired.
    fn validate(&self, token: &str) -> Result<String>;
}

/// Decides whether `subject` may perform `action` on `object`.
///
/// `object` is a request path and `action` an HTTP method.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, subject: &str, object: &str, action: &str) -> bool;
}
