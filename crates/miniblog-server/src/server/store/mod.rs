//! In-memory [`UserStore`].
//!
//! Users are kept in insertion order under a monotonically increasing row id,
//! which is what "newest first" listing sorts by. A secondary index maps
//! usernames to row ids.

use async_trait::async_trait;
use miniblog_core::{Error, Result, User, UserStore};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

#[derive(Default)]
struct Tables {
    next_row: u64,
    rows: BTreeMap<u64, User>,
    by_name: HashMap<String, u64>,
}

/// A [`UserStore`] that lives for the lifetime of the process.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: User) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.by_name.contains_key(&user.username) {
            return Err(Error::UserAlreadyExists);
        }

        let row = tables.next_row;
        tables.next_row += 1;
        tables.by_name.insert(user.username.clone(), row);
        tables.rows.insert(row, user);
        Ok(())
    }

    async fn get(&self, username: &str) -> Result<User> {
        let tables = self.tables.read();
        tables
            .by_name
            .get(username)
            .and_then(|row| tables.rows.get(row))
            .cloned()
            .ok_or(Error::UserNotFound)
    }

    async fn update(&self, user: User) -> Result<()> {
        let mut tables = self.tables.write();
        let row = *tables
            .by_name
            .get(&user.username)
            .ok_or(Error::UserNotFound)?;
        tables.rows.insert(row, user);
        Ok(())
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<(u64, Vec<User>)> {
        let tables = self.tables.read();
        let page = tables
            .rows
            .values()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok((tables.rows.len() as u64, page))
    }

    async fn delete(&self, username: &str) -> Result<()> {
        let mut tables = self.tables.write();
        if let Some(row) = tables.by_name.remove(username) {
            tables.rows.remove(&row);
        }
        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.tables.read().rows.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> User {
        User {
            username: name.to_string(),
            nickname: name.to_uppercase(),
            email: format!("{name}@example.com"),
            phone: "18888888888".to_string(),
            created_at: 1,
            updated_at: 1,
        }
    }

    #[tokio::test]
    async fn create_then_get() {
        let store = MemoryStore::new();
        store.create(user("alice")).await.unwrap();
        assert_eq!(store.get("alice").await.unwrap(), user("alice"));
        assert_eq!(store.get("bob").await, Err(Error::UserNotFound));
    }

    #[tokio::test]
    async fn duplicate_usernames_are_rejected() {
        let store = MemoryStore::new();
        store.create(user("alice")).await.unwrap();
        assert_eq!(
            store.create(user("alice")).await,
            Err(Error::UserAlreadyExists)
        );
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn list_is_newest_first_and_paged() {
        let store = MemoryStore::new();
        for name in ["u_one", "u_two", "u_three", "u_four"] {
            store.create(user(name)).await.unwrap();
        }

        let (total, page) = store.list(1, 2).await.unwrap();
        let names: Vec<_> = page.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(total, 4);
        assert_eq!(names, ["u_three", "u_two"]);

        let (total, page) = store.list(10, 2).await.unwrap();
        assert_eq!(total, 4);
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn update_replaces_the_record() {
        let store = MemoryStore::new();
        store.create(user("alice")).await.unwrap();

        let mut changed = user("alice");
        changed.nickname = "Al".to_string();
        store.update(changed.clone()).await.unwrap();

        assert_eq!(store.get("alice").await.unwrap(), changed);
        assert_eq!(store.update(user("ghost")).await, Err(Error::UserNotFound));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        store.create(user("alice")).await.unwrap();

        store.delete("alice").await.unwrap();
        store.delete("alice").await.unwrap();

        assert_eq!(store.get("alice").await, Err(Error::UserNotFound));
        assert_eq!(store.count().await.unwrap(), 0);
        // The name is free again.
        store.create(user("alice")).await.unwrap();
    }
}
