//! User service and its HTTP handlers.
//!
//! [`UserService`] wraps the store with the request-level policy: page size
//! limits, the shutdown gate and coalescing of concurrent reads. The axum
//! handlers below only translate between HTTP and the service.
//!
//! Reads of the same user that overlap in time share a single store lookup
//! through an [`AsyncGroup`]. Writes detach any lookup still in flight for the
//! user they modify, so a read that starts after a write never joins a lookup
//! that began before it.

use super::AppState;
use crate::server::telemetry::record_lookup;
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use miniblog_core::{
    CreateUserRequest, Error, ListUsersRequest, ListUsersResponse, Result, UpdateUserRequest,
    User, UserStore, validate_username,
};
use miniblog_sync::{AsyncGroup, CancellationToken};
use serde::Serialize;
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

/// Unix seconds.
fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs() as i64)
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    lookups: Arc<AsyncGroup<String, Result<User>>>,
    shutdown: CancellationToken,
    default_limit: usize,
    max_limit: usize,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, default_limit: usize, max_limit: usize) -> Self {
        Self {
            store,
            lookups: Arc::new(AsyncGroup::new()),
            shutdown: CancellationToken::new(),
            default_limit,
            max_limit,
        }
    }

    /// Makes every subsequent request fail with [`Error::ServiceShutdown`].
    pub fn begin_shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    fn ensure_serving(&self) -> Result<()> {
        if self.is_shutting_down() {
            return Err(Error::ServiceShutdown);
        }
        Ok(())
    }

    /// Resolves a requested page size against the configured bounds.
    pub const fn page_size(&self, requested: usize) -> usize {
        match requested {
            0 => self.default_limit,
            n if n > self.max_limit => self.max_limit,
            n => n,
        }
    }

    pub async fn create(&self, request: CreateUserRequest) -> Result<User> {
        self.ensure_serving()?;
        request.validate()?;

        let user = request.into_user(now());
        self.store.create(user.clone()).await?;
        tracing::info!(username = %user.username, "user created");
        Ok(user)
    }

    /// Fetches a user, joining a lookup for the same name that is already in
    /// flight.
    pub async fn get(&self, username: String) -> Result<User> {
        self.ensure_serving()?;

        let store = Arc::clone(&self.store);
        let flight = self
            .lookups
            .call(username.clone(), || async move { store.get(&username).await })
            .await;

        record_lookup(flight.shared);
        tracing::debug!(shared = flight.shared, waiters = flight.waiters, "user lookup");
        flight.value
    }

    pub async fn update(&self, username: String, request: UpdateUserRequest) -> Result<User> {
        self.ensure_serving()?;
        request.validate()?;

        let mut user = self.store.get(&username).await?;
        request.apply(&mut user, now());
        self.store.update(user.clone()).await?;
        self.lookups.forget(&username);
        Ok(user)
    }

    pub async fn delete(&self, username: String) -> Result<()> {
        self.ensure_serving()?;

        self.store.delete(&username).await?;
        self.lookups.forget(&username);
        tracing::info!(%username, "user deleted");
        Ok(())
    }

    pub async fn list(&self, request: ListUsersRequest) -> Result<ListUsersResponse> {
        self.ensure_serving()?;

        let (total_count, users) = self
            .store
            .list(request.offset, self.page_size(request.limit))
            .await?;
        Ok(ListUsersResponse { total_count, users })
    }
}

fn rejected(reason: impl ToString) -> Error {
    Error::invalid(reason.to_string())
}

fn logged(err: Error) -> Error {
    if let Error::Store { context } = &err {
        tracing::error!(%context, "store failure");
    }
    err
}

#[derive(Serialize)]
pub struct Health {
    status: &'static str,
}

pub async fn healthz(State(state): State<AppState>) -> Result<Json<Health>> {
    state.users.ensure_serving()?;
    Ok(Json(Health { status: "ok" }))
}

#[tracing::instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    body: core::result::Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(request) = body.map_err(|r| rejected(r.body_text()))?;
    let user = state.users.create(request).await.map_err(logged)?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    query: core::result::Result<Query<ListUsersRequest>, QueryRejection>,
) -> Result<Json<ListUsersResponse>> {
    let Query(request) = query.map_err(|r| rejected(r.body_text()))?;
    let page = state.users.list(request).await.map_err(logged)?;
    Ok(Json(page))
}

#[tracing::instrument(skip_all, fields(username))]
pub async fn get_user(
    State(state): State<AppState>,
    name: core::result::Result<Path<String>, PathRejection>,
) -> Result<Json<User>> {
    let Path(username) = name.map_err(|r| rejected(r.body_text()))?;
    tracing::Span::current().record("username", username.as_str());
    validate_username(&username)?;
    let user = state.users.get(username).await.map_err(logged)?;
    Ok(Json(user))
}

#[tracing::instrument(skip_all, fields(username))]
pub async fn update_user(
    State(state): State<AppState>,
    name: core::result::Result<Path<String>, PathRejection>,
    body: core::result::Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<User>> {
    let Path(username) = name.map_err(|r| rejected(r.body_text()))?;
    tracing::Span::current().record("username", username.as_str());
    let Json(request) = body.map_err(|r| rejected(r.body_text()))?;
    let user = state
        .users
        .update(username, request)
        .await
        .map_err(logged)?;
    Ok(Json(user))
}

#[tracing::instrument(skip_all, fields(username))]
pub async fn delete_user(
    State(state): State<AppState>,
    name: core::result::Result<Path<String>, PathRejection>,
) -> Result<StatusCode> {
    let Path(username) = name.map_err(|r| rejected(r.body_text()))?;
    tracing::Span::current().record("username", username.as_str());
    state.users.delete(username).await.map_err(logged)?;
    Ok(StatusCode::NO_CONTENT)
}
