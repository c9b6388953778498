//! In-memory collaborators for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use mongodb::bson::{oid::ObjectId, DateTime};
use sha2::Sha256;

use crate::models::{Order, OrderStatus, Product, ProfileUpdate, Role, Shipment, User};
use crate::payment::{
    verify_checkout_signature, GatewayOrder, PaymentDetails, PaymentError, PaymentGateway, RefundReceipt,
    RefundRequest,
};
use crate::session::SessionKeys;
use crate::shipping::{ShipmentOrder, ShippingError, ShippingProvider};
use crate::state::AppState;
use crate::store::{ProductQuery, Store, StoreError};

pub const GATEWAY_SECRET: &str = "test_key_secret";
pub const WEBHOOK_SECRET: &str = "test_webhook_secret";
pub const SESSION_SECRET: &str = "test_session_secret";

pub fn sign(secret: &str, message: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

pub fn sample_user(email: &str, role: Role) -> User {
    User {
        id: None,
        name: "Test User".to_string(),
        email: email.to_string(),
        password: crate::session::hash_password("password").unwrap(),
        role,
        user_id: None,
        phone: None,
        address: None,
        bank_details: None,
        payment_methods: None,
        wallet: 0,
        created_at: DateTime::now(),
    }
}

pub fn sample_product(owner: &str, owner_type: Role, quantity: i64) -> Product {
    Product {
        id: None,
        name: "Organic Rice".to_string(),
        price: 100.0,
        adjusted_price: Some(110.0),
        category: "Grains".to_string(),
        description: "Premium basmati".to_string(),
        address: String::new(),
        image: String::new(),
        owner: owner.to_string(),
        owner_type,
        quality_score: 0.85,
        user_quality: String::new(),
        quantity,
        created_at: DateTime::now(),
    }
}

pub fn sample_order(buyer: &str) -> Order {
    Order {
        id: None,
        buyer: buyer.to_string(),
        product_id: ObjectId::new().to_hex(),
        product_name: "Organic Rice".to_string(),
        quantity: 1,
        amount: 11000,
        payment_method: "UPI".to_string(),
        delivery_address: "KropKart Hub".to_string(),
        pincode: "110001".to_string(),
        status: OrderStatus::Paid,
        delivery_status: "Processing".to_string(),
        shipment_id: None,
        payment_id: Some("pay_sample".to_string()),
        gateway_order_id: Some("order_sample".to_string()),
        refund_id: None,
        refunded_at: None,
        date: DateTime::now(),
    }
}

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    products: Mutex<Vec<Product>>,
    orders: Mutex<Vec<Order>>,
    shipments: Mutex<Vec<Shipment>>,
}

impl MemoryStore {
    pub fn add_user(&self, mut user: User) -> ObjectId {
        let id = ObjectId::new();
        user.id = Some(id);
        self.users.lock().unwrap().push(user);
        id
    }

    pub fn add_product(&self, mut product: Product) -> ObjectId {
        let id = ObjectId::new();
        product.id = Some(id);
        self.products.lock().unwrap().push(product);
        id
    }

    pub fn add_order(&self, mut order: Order) -> ObjectId {
        let id = ObjectId::new();
        order.id = Some(id);
        self.orders.lock().unwrap().push(order);
        id
    }

    pub fn users(&self) -> Vec<User> {
        self.users.lock().unwrap().clone()
    }

    pub fn user(&self, email: &str) -> Option<User> {
        self.users().into_iter().find(|u| u.email == email)
    }

    pub fn product(&self, id: ObjectId) -> Option<Product> {
        self.products.lock().unwrap().iter().find(|p| p.id == Some(id)).cloned()
    }

    pub fn products(&self) -> Vec<Product> {
        self.products.lock().unwrap().clone()
    }

    pub fn order(&self, id: ObjectId) -> Option<Order> {
        self.orders.lock().unwrap().iter().find(|o| o.id == Some(id)).cloned()
    }

    pub fn orders(&self) -> Vec<Order> {
        self.orders.lock().unwrap().clone()
    }

    pub fn shipments(&self) -> Vec<Shipment> {
        self.shipments.lock().unwrap().clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.user(email))
    }

    async fn insert_user(&self, user: &User) -> Result<ObjectId, StoreError> {
        if self.user(&user.email).is_some() {
            return Err(StoreError::Duplicate);
        }
        Ok(self.add_user(user.clone()))
    }

    async fn update_profile(&self, email: &str, update: &ProfileUpdate) -> Result<bool, StoreError> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.email == email) {
            Some(user) => {
                user.name = update.name.clone();
                user.phone = update.phone.clone();
                user.address = update.address.clone();
                user.bank_details = Some(update.bank_details.clone());
                user.payment_methods = Some(update.payment_methods.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn assign_user_id(&self, email: &str, user_id: &str) -> Result<(), StoreError> {
        if let Some(user) = self.users.lock().unwrap().iter_mut().find(|u| u.email == email) {
            user.user_id = Some(user_id.to_string());
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users())
    }

    async fn insert_product(&self, product: &Product) -> Result<ObjectId, StoreError> {
        Ok(self.add_product(product.clone()))
    }

    async fn find_product(&self, id: ObjectId) -> Result<Option<Product>, StoreError> {
        Ok(self.product(id))
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError> {
        let mut products: Vec<Product> = self
            .products()
            .into_iter()
            .filter(|p| query.owner.as_ref().map_or(true, |owner| &p.owner == owner))
            .collect();
        if query.newest_first {
            products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
        Ok(products)
    }

    async fn delete_product(&self, id: ObjectId) -> Result<bool, StoreError> {
        let mut products = self.products.lock().unwrap();
        let before = products.len();
        products.retain(|p| p.id != Some(id));
        Ok(products.len() != before)
    }

    async fn decrement_stock(&self, id: ObjectId, units: i64) -> Result<Option<i64>, StoreError> {
        let mut products = self.products.lock().unwrap();
        Ok(products.iter_mut().find(|p| p.id == Some(id)).map(|p| {
            p.quantity = (p.quantity - units).max(0);
            p.quantity
        }))
    }

    async fn insert_order(&self, order: &Order) -> Result<ObjectId, StoreError> {
        Ok(self.add_order(order.clone()))
    }

    async fn find_order(&self, id: ObjectId) -> Result<Option<Order>, StoreError> {
        Ok(self.order(id))
    }

    async fn list_orders(&self, buyer: Option<&str>) -> Result<Vec<Order>, StoreError> {
        let mut orders: Vec<Order> = self
            .orders()
            .into_iter()
            .filter(|o| buyer.map_or(true, |email| o.buyer == email))
            .collect();
        orders.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(orders)
    }

    async fn mark_refunded(&self, id: ObjectId, refund_id: &str, at: DateTime) -> Result<bool, StoreError> {
        let mut orders = self.orders.lock().unwrap();
        match orders.iter_mut().find(|o| o.id == Some(id) && o.status != OrderStatus::Refunded) {
            Some(order) => {
                order.status = OrderStatus::Refunded;
                order.refund_id = Some(refund_id.to_string());
                order.refunded_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_shipment(&self, shipment: &Shipment) -> Result<(), StoreError> {
        self.shipments.lock().unwrap().push(shipment.clone());
        Ok(())
    }
}

/// Gateway that checks signatures with [`GATEWAY_SECRET`] and records every call.
#[derive(Default)]
pub struct FakeGateway {
    method: Option<String>,
    amount: Option<i64>,
    fail_lookups: bool,
    fetches: AtomicUsize,
    refunds: Mutex<Vec<(String, i64)>>,
}

impl FakeGateway {
    pub fn with_method(method: &str) -> Self {
        FakeGateway { method: Some(method.to_string()), ..Default::default() }
    }

    pub fn with_amount(method: &str, amount: i64) -> Self {
        FakeGateway { method: Some(method.to_string()), amount: Some(amount), ..Default::default() }
    }

    pub fn failing_lookups() -> Self {
        FakeGateway { fail_lookups: true, ..Default::default() }
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn refunds(&self) -> Vec<(String, i64)> {
        self.refunds.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn key_id(&self) -> &str {
        "rzp_test_key"
    }

    fn verify_payment_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> Result<(), PaymentError> {
        if verify_checkout_signature(GATEWAY_SECRET, order_id, payment_id, signature) {
            Ok(())
        } else {
            Err(PaymentError::SignatureMismatch)
        }
    }

    async fn create_order(&self, amount: i64, receipt: &str) -> Result<GatewayOrder, PaymentError> {
        Ok(GatewayOrder {
            id: "order_test".to_string(),
            amount,
            currency: "INR".to_string(),
            receipt: Some(receipt.to_string()),
            status: Some("created".to_string()),
        })
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentDetails, PaymentError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups {
            return Err(PaymentError::Rejected { status: 500, body: "unavailable".to_string() });
        }
        Ok(PaymentDetails { id: payment_id.to_string(), method: self.method.clone(), amount: self.amount })
    }

    async fn refund(&self, payment_id: &str, request: &RefundRequest) -> Result<RefundReceipt, PaymentError> {
        let mut refunds = self.refunds.lock().unwrap();
        refunds.push((payment_id.to_string(), request.amount));
        Ok(RefundReceipt { id: format!("rfnd_{}", refunds.len()) })
    }
}

pub struct FakeShipping {
    shipment_id: Option<i64>,
    calls: AtomicUsize,
    last: Mutex<Option<ShipmentOrder>>,
}

impl FakeShipping {
    pub fn succeeding(shipment_id: i64) -> Self {
        FakeShipping { shipment_id: Some(shipment_id), calls: AtomicUsize::new(0), last: Mutex::new(None) }
    }

    pub fn failing() -> Self {
        FakeShipping { shipment_id: None, calls: AtomicUsize::new(0), last: Mutex::new(None) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_order(&self) -> Option<ShipmentOrder> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl ShippingProvider for FakeShipping {
    fn pickup_location(&self) -> &str {
        "Primary"
    }

    async fn create_shipment(&self, order: &ShipmentOrder) -> Result<Option<i64>, ShippingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(order.clone());
        match self.shipment_id {
            Some(id) => Ok(Some(id)),
            None => Err(ShippingError::Rejected { status: 422, body: "pincode not serviceable".to_string() }),
        }
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<FakeGateway>,
    pub keys: SessionKeys,
}

impl Harness {
    pub fn new() -> Self {
        Harness {
            store: Arc::new(MemoryStore::default()),
            gateway: Arc::new(FakeGateway::with_method("card")),
            keys: SessionKeys::new(SESSION_SECRET, 1),
        }
    }

    pub fn state(&self) -> AppState {
        AppState {
            store: self.store.clone(),
            payments: Some(self.gateway.clone()),
            shipping: None,
            webhook_secret: Some(WEBHOOK_SECRET.to_string()),
            sessions: self.keys.clone(),
            static_dir: std::env::temp_dir().join("kropkart-test-statics"),
        }
    }

    /// Registers an account directly in the store and returns a session token for it.
    pub fn login_as(&self, email: &str, role: Role) -> String {
        let user = sample_user(email, role);
        self.store.add_user(user.clone());
        self.keys.issue(&user).unwrap()
    }
}
