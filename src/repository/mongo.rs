//! MongoDB item repository.
//!
//! Items live in one collection with a unique compound index on
//! `(name, account_id)`. Ids are ObjectIds rendered as hex; an id that is not
//! valid hex cannot match any document.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Bson, DateTime as BsonDateTime, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{item_exists, item_id_not_found, item_not_found, ItemRepository};
use crate::error::{AppError, Result};
use crate::models::{Item, ItemCreateInput, ListQuery, UpdateItemInput};

const COLLECTION: &str = "items";
const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ItemDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    name: String,
    #[serde(default)]
    value: String,
    account_id: String,
    version: i64,
    created_at: BsonDateTime,
    updated_at: BsonDateTime,
}

fn to_chrono(value: BsonDateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(value.timestamp_millis()).unwrap_or_default()
}

impl From<ItemDocument> for Item {
    fn from(document: ItemDocument) -> Self {
        Item {
            id: document.id.to_hex(),
            name: document.name,
            value: document.value,
            version: document.version,
            account_id: document.account_id,
            created_at: to_chrono(document.created_at),
            updated_at: to_chrono(document.updated_at),
        }
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

fn sort_document(query: &ListQuery) -> Document {
    let field = query.order_by.field();
    let direction = if query.sort.is_descending() { -1 } else { 1 };
    doc! { field: direction }
}

#[derive(Debug, Clone)]
pub struct MongoItemRepository {
    database: Database,
    items: Collection<ItemDocument>,
}

impl MongoItemRepository {
    pub fn new(database: Database) -> Self {
        let items = database.collection::<ItemDocument>(COLLECTION);
        Self { database, items }
    }

    /// Connects to `uri`, selects `database` and ensures indexes exist.
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| AppError::internal(format!("Failed to connect to MongoDB: {}", e)))?;

        let repository = Self::new(client.database(database));
        repository.ensure_indexes().await?;

        info!(database = %database, "MongoDB connection established");
        Ok(repository)
    }

    /// Creates the per-tenant unique name index.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "name": 1, "account_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("uq_items_name_account".to_string())
                    .build(),
            )
            .build();

        self.items
            .create_index(index)
            .await
            .map_err(|e| AppError::internal(format!("Failed to create index: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl ItemRepository for MongoItemRepository {
    async fn get_by_name(&self, name: &str, account_id: &str) -> Result<Item> {
        let document = self
            .items
            .find_one(doc! { "name": name, "account_id": account_id })
            .await
            .map_err(|e| AppError::internal(format!("Failed to get item: {}", e)))?;

        document.map(Item::from).ok_or_else(|| item_not_found(name))
    }

    async fn get_by_id(&self, id: &str, account_id: &str) -> Result<Item> {
        let object_id = ObjectId::parse_str(id).map_err(|_| item_id_not_found(id))?;

        let document = self
            .items
            .find_one(doc! { "_id": object_id, "account_id": account_id })
            .await
            .map_err(|e| AppError::internal(format!("Failed to get item: {}", e)))?;

        document.map(Item::from).ok_or_else(|| item_id_not_found(id))
    }

    async fn save(&self, input: &ItemCreateInput, account_id: &str) -> Result<Item> {
        let now = BsonDateTime::now();
        let document = ItemDocument {
            id: ObjectId::new(),
            name: input.name.clone(),
            value: input.value.clone(),
            account_id: account_id.to_string(),
            version: 1,
            created_at: now,
            updated_at: now,
        };

        self.items.insert_one(&document).await.map_err(|e| {
            if is_duplicate_key(&e) {
                item_exists(&input.name)
            } else {
                AppError::internal(format!("Failed to create item: {}", e))
            }
        })?;

        Ok(Item::from(document))
    }

    async fn update(&self, input: &UpdateItemInput, account_id: &str) -> Result<Item> {
        let object_id =
            ObjectId::parse_str(&input.id).map_err(|_| item_id_not_found(&input.id))?;

        let updated = self
            .items
            .find_one_and_update(
                doc! { "_id": object_id, "account_id": account_id },
                doc! {
                    "$set": {
                        "name": &input.name,
                        "value": &input.value,
                        "updated_at": Bson::DateTime(BsonDateTime::now()),
                    },
                    "$inc": { "version": 1_i64 },
                },
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    item_exists(&input.name)
                } else {
                    AppError::internal(format!("Failed to update item: {}", e))
                }
            })?;

        updated
            .map(Item::from)
            .ok_or_else(|| item_id_not_found(&input.id))
    }

    async fn list(&self, query: &ListQuery, account_id: &str) -> Result<Vec<Item>> {
        let mut find = self
            .items
            .find(doc! { "account_id": account_id })
            .sort(sort_document(query));
        if let Some(limit) = query.effective_limit() {
            find = find.limit(i64::from(limit));
        }

        let cursor = find
            .await
            .map_err(|e| AppError::internal(format!("Failed to list items: {}", e)))?;

        let documents: Vec<ItemDocument> = cursor
            .try_collect()
            .await
            .map_err(|e| AppError::internal(format!("Failed to read items: {}", e)))?;

        Ok(documents.into_iter().map(Item::from).collect())
    }

    async fn delete(&self, id: &str, account_id: &str) -> Result<()> {
        let Ok(object_id) = ObjectId::parse_str(id) else {
            return Ok(());
        };

        self.items
            .delete_one(doc! { "_id": object_id, "account_id": account_id })
            .await
            .map_err(|e| AppError::internal(format!("Failed to delete item: {}", e)))?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| AppError::internal(format!("MongoDB ping failed: {}", e)))?;
        Ok(())
    }
}
