//! In-process item repository
//!
//! Same semantics as the database backends, kept in a map. Used for local
//! runs (`DATA_SOURCE=memory`) and tests.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{item_exists, item_id_not_found, item_not_found, ItemRepository};
use crate::error::Result;
use crate::models::{Item, ItemCreateInput, ListQuery, OrderBy, UpdateItemInput};

#[derive(Debug, Default)]
struct Store {
    /// Items keyed by id
    items: HashMap<String, Item>,
    /// Insertion sequence per id, used to break ordering ties
    seq: HashMap<String, u64>,
    next_seq: u64,
}

impl Store {
    fn name_taken(&self, name: &str, account_id: &str, except_id: Option<&str>) -> bool {
        self.items.values().any(|item| {
            item.account_id == account_id
                && item.name == name
                && except_id.map_or(true, |id| item.id != id)
        })
    }
}

/// Item repository held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryItemRepository {
    store: RwLock<Store>,
}

impl InMemoryItemRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ItemRepository for InMemoryItemRepository {
    async fn get_by_name(&self, name: &str, account_id: &str) -> Result<Item> {
        let store = self.store.read().await;
        store
            .items
            .values()
            .find(|item| item.account_id == account_id && item.name == name)
            .cloned()
            .ok_or_else(|| item_not_found(name))
    }

    async fn get_by_id(&self, id: &str, account_id: &str) -> Result<Item> {
        let store = self.store.read().await;
        store
            .items
            .get(id)
            .filter(|item| item.account_id == account_id)
            .cloned()
            .ok_or_else(|| item_id_not_found(id))
    }

    async fn save(&self, input: &ItemCreateInput, account_id: &str) -> Result<Item> {
        let mut store = self.store.write().await;
        if store.name_taken(&input.name, account_id, None) {
            return Err(item_exists(&input.name));
        }

        let now = Utc::now();
        let item = Item {
            id: Uuid::new_v4().to_string(),
            name: input.name.clone(),
            value: input.value.clone(),
            version: 1,
            account_id: account_id.to_string(),
            created_at: now,
            updated_at: now,
        };

        let seq = store.next_seq;
        store.next_seq += 1;
        store.seq.insert(item.id.clone(), seq);
        store.items.insert(item.id.clone(), item.clone());

        Ok(item)
    }

    async fn update(&self, input: &UpdateItemInput, account_id: &str) -> Result<Item> {
        let mut store = self.store.write().await;
        if store.name_taken(&input.name, account_id, Some(&input.id)) {
            return Err(item_exists(&input.name));
        }

        let item = store
            .items
            .get_mut(&input.id)
            .filter(|item| item.account_id == account_id)
            .ok_or_else(|| item_id_not_found(&input.id))?;

        item.name = input.name.clone();
        item.value = input.value.clone();
        item.version += 1;
        item.updated_at = Utc::now();

        Ok(item.clone())
    }

    async fn list(&self, query: &ListQuery, account_id: &str) -> Result<Vec<Item>> {
        let store = self.store.read().await;
        let mut items: Vec<(u64, &Item)> = store
            .items
            .values()
            .filter(|item| item.account_id == account_id)
            .map(|item| (store.seq.get(&item.id).copied().unwrap_or_default(), item))
            .collect();

        items.sort_by(|(seq_a, a), (seq_b, b)| {
            let ordering = match query.order_by {
                OrderBy::Name => a.name.cmp(&b.name),
                OrderBy::CreatedAt => a.created_at.cmp(&b.created_at),
                OrderBy::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            };
            let ordering = if ordering == Ordering::Equal {
                seq_a.cmp(seq_b)
            } else {
                ordering
            };
            if query.sort.is_descending() {
                ordering.reverse()
            } else {
                ordering
            }
        });

        let limit = query.effective_limit().map_or(usize::MAX, |l| l as usize);
        Ok(items
            .into_iter()
            .take(limit)
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn delete(&self, id: &str, account_id: &str) -> Result<()> {
        let mut store = self.store.write().await;
        let owned = store
            .items
            .get(id)
            .is_some_and(|item| item.account_id == account_id);
        if owned {
            store.items.remove(id);
            store.seq.remove(id);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
