//! Directory (user) service client trait, HTTP and in-memory implementations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{Credential, UserId};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{RemoteError, RemoteService, Result};
use crate::http::RemoteHttp;

/// A user as returned by the directory service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserRecord {
    /// Creates a record with only the identifier set.
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            first_name: None,
            last_name: None,
            email: None,
        }
    }
}

/// Trait for user lookups against the directory service.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Fetches a user by id.
    ///
    /// `Ok(None)` means the service answered successfully with an empty body.
    async fn get_user(
        &self,
        id: UserId,
        credential: Option<&Credential>,
    ) -> Result<Option<UserRecord>>;

    /// Returns true if the service reports itself healthy.
    async fn is_available(&self) -> bool;
}

#[async_trait]
impl<T: DirectoryClient + ?Sized> DirectoryClient for Arc<T> {
    async fn get_user(
        &self,
        id: UserId,
        credential: Option<&Credential>,
    ) -> Result<Option<UserRecord>> {
        (**self).get_user(id, credential).await
    }

    async fn is_available(&self) -> bool {
        (**self).is_available().await
    }
}

/// Directory client speaking HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpDirectoryClient {
    http: RemoteHttp,
}

impl HttpDirectoryClient {
    /// Creates a client for the service at `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> std::result::Result<Self, reqwest::Error> {
        Ok(Self {
            http: RemoteHttp::new(RemoteService::Directory, base_url, timeout)?,
        })
    }
}

#[async_trait]
impl DirectoryClient for HttpDirectoryClient {
    #[tracing::instrument(skip(self, credential), fields(user_id = %id))]
    async fn get_user(
        &self,
        id: UserId,
        credential: Option<&Credential>,
    ) -> Result<Option<UserRecord>> {
        let request = self
            .http
            .request(Method::GET, &format!("/api/v1/users/{id}"), credential);
        let response = self.http.send(request).await?;
        self.http.decode_optional(response).await
    }

    async fn is_available(&self) -> bool {
        self.http.probe().await
    }
}

/// A recorded directory lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryCall {
    pub user_id: UserId,
    pub credential: Option<Credential>,
}

#[derive(Debug, Default)]
struct InMemoryDirectoryState {
    users: HashMap<UserId, UserRecord>,
    calls: Vec<DirectoryCall>,
    failure: Option<RemoteError>,
    empty_body: bool,
    delay: Option<Duration>,
    down: bool,
}

/// In-memory directory service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    state: Arc<RwLock<InMemoryDirectoryState>>,
}

impl InMemoryDirectory {
    /// Creates a new empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user.
    pub async fn add_user(&self, user: UserRecord) {
        self.state.write().await.users.insert(user.id, user);
    }

    /// Makes every lookup fail with the given error.
    pub async fn set_failure(&self, failure: Option<RemoteError>) {
        self.state.write().await.failure = failure;
    }

    /// Makes every successful lookup answer with an empty body.
    pub async fn set_empty_body(&self, empty: bool) {
        self.state.write().await.empty_body = empty;
    }

    /// Delays every lookup by the given duration.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        self.state.write().await.delay = delay;
    }

    /// Marks the service as down for health probes.
    pub async fn set_down(&self, down: bool) {
        self.state.write().await.down = down;
    }

    /// Returns every lookup made so far.
    pub async fn calls(&self) -> Vec<DirectoryCall> {
        self.state.read().await.calls.clone()
    }

    /// Returns the number of lookups made so far.
    pub async fn call_count(&self) -> usize {
        self.state.read().await.calls.len()
    }
}

#[async_trait]
impl DirectoryClient for InMemoryDirectory {
    async fn get_user(
        &self,
        id: UserId,
        credential: Option<&Credential>,
    ) -> Result<Option<UserRecord>> {
        let delay = {
            let mut state = self.state.write().await;
            state.calls.push(DirectoryCall {
                user_id: id,
                credential: credential.cloned(),
            });
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.read().await;
        if let Some(failure) = &state.failure {
            return Err(failure.clone());
        }
        if state.empty_body {
            return Ok(None);
        }
        state.users.get(&id).cloned().map(Some).ok_or(RemoteError::NotFound)
    }

    async fn is_available(&self) -> bool {
        !self.state.read().await.down
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_known_and_unknown_users() {
        let directory = InMemoryDirectory::new();
        directory.add_user(UserRecord::new(UserId::new(7))).await;

        let found = directory.get_user(UserId::new(7), None).await.unwrap();
        assert_eq!(found.unwrap().id, UserId::new(7));

        let missing = directory.get_user(UserId::new(8), None).await;
        assert_eq!(missing, Err(RemoteError::NotFound));
        assert_eq!(directory.call_count().await, 2);
    }

    #[tokio::test]
    async fn test_records_forwarded_credential() {
        let directory = InMemoryDirectory::new();
        directory.add_user(UserRecord::new(UserId::new(1))).await;
        let credential = Credential::from_header("Bearer t0k3n").unwrap();

        directory
            .get_user(UserId::new(1), Some(&credential))
            .await
            .unwrap();
        directory.get_user(UserId::new(1), None).await.unwrap();

        let calls = directory.calls().await;
        assert_eq!(calls[0].credential, Some(credential));
        assert_eq!(calls[1].credential, None);
    }

    #[tokio::test]
    async fn test_failure_and_empty_body_hooks() {
        let directory = InMemoryDirectory::new();
        directory.add_user(UserRecord::new(UserId::new(1))).await;

        directory.set_empty_body(true).await;
        assert_eq!(directory.get_user(UserId::new(1), None).await, Ok(None));

        directory.set_failure(Some(RemoteError::Forbidden)).await;
        assert_eq!(
            directory.get_user(UserId::new(1), None).await,
            Err(RemoteError::Forbidden)
        );
    }

    #[test]
    fn test_user_record_uses_camel_case() {
        let json = r#"{"id":3,"firstName":"Ada","lastName":"Lovelace","email":"ada@example.com"}"#;
        let user: UserRecord = serde_json::from_str(json).unwrap();
        assert_eq!(user.first_name.as_deref(), Some("Ada"));
        assert_eq!(user.last_name.as_deref(), Some("Lovelace"));
    }
}
