//! Process-owned stores: waste items behind the [`ItemStore`] trait and the
//! seeded staff accounts in [`CredentialStore`].
//!
//! Nothing here is durable. Items and users live for the lifetime of the
//! process and are rebuilt from the seed lists on restart.

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::{hash_password, verify_password};
use crate::models::{ItemPatch, ItemStatus, NewItem, Role, User, WasteItem};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Waste item collection in insertion order.
///
/// Handlers only see this trait, so a persistent backend can replace
/// [`InMemoryItemStore`] without touching them. Validation has already
/// happened by the time any of these are called.
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn list(&self) -> StoreResult<Vec<WasteItem>>;
    async fn get(&self, id: &str) -> StoreResult<Option<WasteItem>>;
    /// Assigns a fresh id, forces `pending` and stamps both timestamps.
    async fn create(&self, fields: NewItem) -> StoreResult<WasteItem>;
    /// `Ok(None)` when no item has this id.
    async fn update(&self, id: &str, patch: ItemPatch) -> StoreResult<Option<WasteItem>>;
    /// Removes the record outright and hands it back.
    async fn delete(&self, id: &str) -> StoreResult<Option<WasteItem>>;
    async fn len(&self) -> StoreResult<usize>;
}

/// `Vec` behind a tokio `RwLock`. Writers hold the write lock for the whole
/// lookup-and-mutate step, so concurrent updates are never lost.
#[derive(Default)]
pub struct InMemoryItemStore {
    items: RwLock<Vec<WasteItem>>,
}

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<WasteItem>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    /// The two sample records every fresh server starts with.
    pub fn seeded() -> Self {
        Self::with_items(seed_items())
    }
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    async fn list(&self) -> StoreResult<Vec<WasteItem>> {
        Ok(self.items.read().await.clone())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<WasteItem>> {
        Ok(self.items.read().await.iter().find(|i| i.id == id).cloned())
    }

    async fn create(&self, fields: NewItem) -> StoreResult<WasteItem> {
        let mut items = self.items.write().await;
        let mut id = Uuid::new_v4().to_string();
        // seed ids are not uuids, but never hand out one already in use
        while items.iter().any(|i| i.id == id) {
            id = Uuid::new_v4().to_string();
        }
        let item = WasteItem::new(id, fields);
        items.push(item.clone());
        Ok(item)
    }

    async fn update(&self, id: &str, patch: ItemPatch) -> StoreResult<Option<WasteItem>> {
        let mut items = self.items.write().await;
        Ok(items.iter_mut().find(|i| i.id == id).map(|item| {
            item.apply(patch);
            item.clone()
        }))
    }

    async fn delete(&self, id: &str) -> StoreResult<Option<WasteItem>> {
        let mut items = self.items.write().await;
        Ok(items
            .iter()
            .position(|i| i.id == id)
            .map(|index| items.remove(index)))
    }

    async fn len(&self) -> StoreResult<usize> {
        Ok(self.items.read().await.len())
    }
}

fn seed_items() -> Vec<WasteItem> {
    let now = Utc::now();
    vec![
        WasteItem {
            id: "1".to_string(),
            kind: "General Waste".to_string(),
            quantity: 500,
            unit: "kg".to_string(),
            location: "Manchester Office".to_string(),
            client_id: "CLIENT-001".to_string(),
            client_name: "TechCorp Ltd".to_string(),
            status: ItemStatus::Collected,
            collection_date: Some("2024-01-15".to_string()),
            created_at: now,
            updated_at: now,
        },
        WasteItem {
            id: "2".to_string(),
            kind: "Recycling".to_string(),
            quantity: 250,
            unit: "kg".to_string(),
            location: "Birmingham Warehouse".to_string(),
            client_id: "CLIENT-002".to_string(),
            client_name: "GreenBuild Solutions".to_string(),
            status: ItemStatus::Pending,
            collection_date: Some("2024-01-20".to_string()),
            created_at: now,
            updated_at: now,
        },
    ]
}

/// Fixed staff accounts, hashed once at start-up.
pub struct CredentialStore {
    users: Vec<User>,
    // verified against when the username is unknown, so both failure paths
    // pay for one bcrypt comparison at the same cost
    dummy_hash: String,
}

impl CredentialStore {
    pub fn new(users: Vec<User>, cost: u32) -> Result<Self, bcrypt::BcryptError> {
        let dummy_hash = hash_password(&Uuid::new_v4().to_string(), cost)?;
        Ok(Self { users, dummy_hash })
    }

    /// `admin`/`password123` and `manager`/`manager123`.
    pub fn seeded(cost: u32) -> Result<Self, bcrypt::BcryptError> {
        let users = vec![
            User {
                id: "1".to_string(),
                username: "admin".to_string(),
                password_hash: hash_password("password123", cost)?,
                role: Role::Admin,
                email: "admin@remwaste.co.uk".to_string(),
            },
            User {
                id: "2".to_string(),
                username: "manager".to_string(),
                password_hash: hash_password("manager123", cost)?,
                role: Role::Manager,
                email: "manager@remwaste.co.uk".to_string(),
            },
        ];
        Self::new(users, cost)
    }

    pub fn find(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|u| u.username == username)
    }

    /// Blocking: runs one bcrypt verification whether or not the user exists.
    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, bcrypt::BcryptError> {
        match self.find(username) {
            Some(user) => {
                let valid = verify_password(password, &user.password_hash)?;
                Ok(valid.then(|| user.clone()))
            }
            None => {
                verify_password(password, &self.dummy_hash)?;
                Ok(None)
            }
        }
    }
}
