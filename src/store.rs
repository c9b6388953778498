use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, DateTime};
use thiserror::Error;

use crate::models::{Order, Product, ProfileUpdate, Shipment, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("a record with this key already exists")]
    Duplicate,
    #[error("database returned a non-ObjectId id: {0}")]
    UnexpectedId(String),
    #[error("could not encode document: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),
}

#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub owner: Option<String>,
    pub newest_first: bool,
}

impl ProductQuery {
    pub fn all() -> Self {
        ProductQuery::default()
    }

    pub fn newest() -> Self {
        ProductQuery { owner: None, newest_first: true }
    }

    pub fn owned_by(owner: &str) -> Self {
        ProductQuery { owner: Some(owner.to_string()), newest_first: false }
    }
}

/// Persistence seam for every collection the handlers touch.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// Fails with [`StoreError::Duplicate`] when the email is taken.
    async fn insert_user(&self, user: &User) -> Result<ObjectId, StoreError>;
    async fn update_profile(&self, email: &str, update: &ProfileUpdate) -> Result<bool, StoreError>;
    async fn assign_user_id(&self, email: &str, user_id: &str) -> Result<(), StoreError>;
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    async fn insert_product(&self, product: &Product) -> Result<ObjectId, StoreError>;
    async fn find_product(&self, id: ObjectId) -> Result<Option<Product>, StoreError>;
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError>;
    async fn delete_product(&self, id: ObjectId) -> Result<bool, StoreError>;
    /// Subtracts `units` from the stock, flooring at zero. Returns the new quantity,
    /// or `None` if the product no longer exists.
    async fn decrement_stock(&self, id: ObjectId, units: i64) -> Result<Option<i64>, StoreError>;

    async fn insert_order(&self, order: &Order) -> Result<ObjectId, StoreError>;
    async fn find_order(&self, id: ObjectId) -> Result<Option<Order>, StoreError>;
    /// Newest first. `buyer` restricts the listing to one account.
    async fn list_orders(&self, buyer: Option<&str>) -> Result<Vec<Order>, StoreError>;
    /// Moves a paid order to refunded. Returns false if it was already refunded or is gone.
    async fn mark_refunded(&self, id: ObjectId, refund_id: &str, at: DateTime) -> Result<bool, StoreError>;

    async fn insert_shipment(&self, shipment: &Shipment) -> Result<(), StoreError>;
}
