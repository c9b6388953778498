use async_trait::async_trait;
use futures::stream::StreamExt;
use log::{info, warn};
use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{
    ClientOptions, FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument, UpdateOptions,
};
use mongodb::{Client, Collection, Cursor, Database, IndexModel};
use serde::de::DeserializeOwned;

use crate::config::{AdminSeed, Config};
use crate::models::{AdminRecord, Category, Order, OrderStatus, Product, ProfileUpdate, Role, Shipment, User};
use crate::store::{ProductQuery, Store, StoreError};

const COLLECTIONS: [&str; 6] = ["users", "products", "orders", "categories", "shipments", "admin"];

pub async fn connect(config: &Config) -> Result<Database, mongodb::error::Error> {
    let client_options = ClientOptions::parse(&config.database_url).await?;
    let client = Client::with_options(client_options)?;

    let db = match &config.database_name {
        Some(name) => client.database(name),
        None => client.default_database().unwrap_or_else(|| client.database("KropKart")),
    };
    info!("Using database {}", db.name());
    Ok(db)
}

/// Creates any missing collection and the indexes the store relies on.
pub async fn init(db: &Database) -> Result<(), mongodb::error::Error> {
    let existing = db.list_collection_names(None).await?;
    for name in COLLECTIONS {
        if !existing.iter().any(|c| c == name) {
            db.create_collection(name, None).await?;
            info!("Created collection {}", name);
        }
    }

    let indexes: [(&str, Document, bool); 9] = [
        ("users", doc! {"email": 1}, true),
        ("users", doc! {"user_type": 1}, false),
        ("products", doc! {"category": 1}, false),
        ("products", doc! {"owner": 1}, false),
        ("orders", doc! {"user": 1}, false),
        ("orders", doc! {"status": 1}, false),
        ("categories", doc! {"name": 1}, true),
        ("shipments", doc! {"order_id": 1}, false),
        ("admin", doc! {"email": 1}, true),
    ];
    for (collection, keys, unique) in indexes {
        let model = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(unique).build())
            .build();
        db.collection::<Document>(collection).create_index(model, None).await?;
    }
    Ok(())
}

/// Registers the bootstrap administrator once, when no admin has been recorded yet.
/// `password` is the already hashed secret.
pub async fn seed_admin(db: &Database, seed: &AdminSeed, password: String) -> Result<(), StoreError> {
    let admins = db.collection::<AdminRecord>("admin");
    if admins.count_documents(doc! {}, None).await? > 0 {
        return Ok(());
    }

    let now = DateTime::now();
    let user = User {
        id: None,
        name: seed.name.clone(),
        email: seed.email.clone(),
        password,
        role: Role::Admin,
        user_id: None,
        phone: None,
        address: None,
        bank_details: None,
        payment_methods: None,
        wallet: 0,
        created_at: now,
    };
    match db.collection::<User>("users").insert_one(&user, None).await {
        Ok(_) => {}
        Err(e) if is_duplicate_key(&e) => info!("Admin account {} already registered", seed.email),
        Err(e) => return Err(e.into()),
    }
    admins
        .insert_one(AdminRecord { email: seed.email.clone(), name: seed.name.clone(), created_at: now }, None)
        .await?;
    info!("Seeded admin account {}", seed.email);
    Ok(())
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == 11000,
        _ => false,
    }
}

fn inserted_object_id(id: mongodb::bson::Bson) -> Result<ObjectId, StoreError> {
    id.as_object_id().ok_or_else(|| StoreError::UnexpectedId(id.to_string()))
}

async fn collect<T: DeserializeOwned + Unpin + Send + Sync>(mut cursor: Cursor<T>) -> Result<Vec<T>, StoreError> {
    let mut items = vec![];
    while let Some(result) = cursor.next().await {
        items.push(result?);
    }
    Ok(items)
}

#[derive(Clone)]
pub struct MongoStore {
    users: Collection<User>,
    products: Collection<Product>,
    orders: Collection<Order>,
    categories: Collection<Category>,
    shipments: Collection<Shipment>,
}

impl MongoStore {
    pub fn new(db: &Database) -> Self {
        MongoStore {
            users: db.collection("users"),
            products: db.collection("products"),
            orders: db.collection("orders"),
            categories: db.collection("categories"),
            shipments: db.collection("shipments"),
        }
    }

    async fn remember_category(&self, name: &str) {
        let options = UpdateOptions::builder().upsert(true).build();
        let result = self
            .categories
            .update_one(doc! {"name": name}, doc! {"$setOnInsert": {"name": name}}, options)
            .await;
        if let Err(e) = result {
            warn!("Could not record category {}: {}", name, e);
        }
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn find_user(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.find_one(doc! {"email": email}, None).await?)
    }

    async fn insert_user(&self, user: &User) -> Result<ObjectId, StoreError> {
        match self.users.insert_one(user, None).await {
            Ok(result) => inserted_object_id(result.inserted_id),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::Duplicate),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_profile(&self, email: &str, update: &ProfileUpdate) -> Result<bool, StoreError> {
        let fields = mongodb::bson::to_document(update)?;
        let result = self.users.update_one(doc! {"email": email}, doc! {"$set": fields}, None).await?;
        Ok(result.matched_count == 1)
    }

    async fn assign_user_id(&self, email: &str, user_id: &str) -> Result<(), StoreError> {
        self.users
            .update_one(doc! {"email": email}, doc! {"$set": {"user_id": user_id}}, None)
            .await?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        collect(self.users.find(doc! {}, None).await?).await
    }

    async fn insert_product(&self, product: &Product) -> Result<ObjectId, StoreError> {
        let result = self.products.insert_one(product, None).await?;
        self.remember_category(&product.category).await;
        inserted_object_id(result.inserted_id)
    }

    async fn find_product(&self, id: ObjectId) -> Result<Option<Product>, StoreError> {
        Ok(self.products.find_one(doc! {"_id": id}, None).await?)
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError> {
        let filter = match &query.owner {
            Some(owner) => doc! {"owner": owner},
            None => doc! {},
        };
        let options = query
            .newest_first
            .then(|| FindOptions::builder().sort(doc! {"created_at": -1}).build());
        collect(self.products.find(filter, options).await?).await
    }

    async fn delete_product(&self, id: ObjectId) -> Result<bool, StoreError> {
        let result = self.products.delete_one(doc! {"_id": id}, None).await?;
        Ok(result.deleted_count == 1)
    }

    async fn decrement_stock(&self, id: ObjectId, units: i64) -> Result<Option<i64>, StoreError> {
        let update = vec![doc! {
            "$set": {
                "quantity": {
                    "$max": [0, {"$subtract": [{"$ifNull": ["$quantity", 0]}, units]}]
                }
            }
        }];
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let product = self.products.find_one_and_update(doc! {"_id": id}, update, options).await?;
        Ok(product.map(|p| p.quantity))
    }

    async fn insert_order(&self, order: &Order) -> Result<ObjectId, StoreError> {
        let result = self.orders.insert_one(order, None).await?;
        inserted_object_id(result.inserted_id)
    }

    async fn find_order(&self, id: ObjectId) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.find_one(doc! {"_id": id}, None).await?)
    }

    async fn list_orders(&self, buyer: Option<&str>) -> Result<Vec<Order>, StoreError> {
        let filter = match buyer {
            Some(email) => doc! {"user": email},
            None => doc! {},
        };
        let options = FindOptions::builder().sort(doc! {"date": -1}).build();
        collect(self.orders.find(filter, options).await?).await
    }

    async fn mark_refunded(&self, id: ObjectId, refund_id: &str, at: DateTime) -> Result<bool, StoreError> {
        let status = mongodb::bson::to_bson(&OrderStatus::Refunded)?;
        let filter = doc! {"_id": id, "status": {"$ne": status.clone()}};
        let update = doc! {"$set": {"status": status, "refund_id": refund_id, "refunded_at": at}};
        let result = self.orders.update_one(filter, update, None).await?;
        Ok(result.modified_count == 1)
    }

    async fn insert_shipment(&self, shipment: &Shipment) -> Result<(), StoreError> {
        self.shipments.insert_one(shipment, None).await?;
        Ok(())
    }
}
