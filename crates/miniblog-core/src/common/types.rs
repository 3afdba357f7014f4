//! Request and response bodies of the `/v1/users` API.
//!
//! All timestamps are unix seconds. Validation lives next to the types so the
//! server and any client agree on what a well-formed request is.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Shortest accepted username.
pub const USERNAME_MIN_LEN: usize = 3;
/// Longest accepted username.
pub const USERNAME_MAX_LEN: usize = 32;
/// Phone numbers are exactly this many ASCII digits.
pub const PHONE_LEN: usize = 11;

/// A stored user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub nickname: String,
    pub email: String,
    pub phone: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Body of `POST /v1/users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub nickname: String,
    pub email: String,
    pub phone: String,
}

impl CreateUserRequest {
    /// Checks every field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        validate_username(&self.username)?;
        validate_nickname(&self.nickname)?;
        validate_email(&self.email)?;
        validate_phone(&self.phone)
    }

    /// Builds the user this request describes, stamped with `now`.
    pub fn into_user(self, now: i64) -> User {
        User {
            username: self.username,
            nickname: self.nickname,
            email: self.email,
            phone: self.phone,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Body of `PUT /v1/users/{name}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl UpdateUserRequest {
    /// Checks the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if let Some(nickname) = &self.nickname {
            validate_nickname(nickname)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(phone) = &self.phone {
            validate_phone(phone)?;
        }
        Ok(())
    }

    /// Applies the present fields to `user` and bumps `updated_at`.
    pub fn apply(self, user: &mut User, now: i64) {
        if let Some(nickname) = self.nickname {
            user.nickname = nickname;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(phone) = self.phone {
            user.phone = phone;
        }
        user.updated_at = now;
    }
}

/// Query of `GET /v1/users`.
///
/// A missing or zero `limit` means "use the server default".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListUsersRequest {
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub limit: usize,
}

/// Body returned by `GET /v1/users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListUsersResponse {
    /// Number of users in the store, regardless of paging.
    pub total_count: u64,
    pub users: Vec<User>,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

/// Usernames are 3 to 32 ASCII letters, digits or underscores.
pub fn validate_username(username: &str) -> Result<()> {
    let len = username.len();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(Error::invalid(format!(
            "username must be {USERNAME_MIN_LEN} to {USERNAME_MAX_LEN} characters"
        )));
    }
    if !username
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_')
    {
        return Err(Error::invalid(
            "username may only contain letters, digits and underscores",
        ));
    }
    Ok(())
}

fn validate_nickname(nickname: &str) -> Result<()> {
    if nickname.trim().is_empty() {
        return Err(Error::invalid("nickname must not be empty"));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(Error::invalid("email is not a valid address")),
    }
}

fn validate_phone(phone: &str) -> Result<()> {
    if phone.len() != PHONE_LEN || !phone.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::invalid(format!("phone must be {PHONE_LEN} digits")));
    }
    Ok(())
}
