use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Citizen,
    Farmer,
    Business,
    Admin,
}

impl Role {
    /// Roles a visitor may pick on the registration form.
    pub fn from_signup(value: &str) -> Option<Role> {
        match value.trim().to_lowercase().as_str() {
            "" | "citizen" => Some(Role::Citizen),
            "farmer" => Some(Role::Farmer),
            "business" => Some(Role::Business),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Citizen => "citizen",
            Role::Farmer => "farmer",
            Role::Business => "business",
            Role::Admin => "admin",
        }
    }

    /// Prefix of the generated seller identifier, if the role gets one.
    pub fn id_prefix(&self) -> Option<&'static str> {
        match self {
            Role::Farmer => Some("FRM"),
            Role::Business => Some("BUS"),
            _ => None,
        }
    }

    pub fn can_list(&self) -> bool {
        matches!(self, Role::Farmer | Role::Business | Role::Admin)
    }

    pub fn capitalized(&self) -> &'static str {
        match self {
            Role::Citizen => "Citizen",
            Role::Farmer => "Farmer",
            Role::Business => "Business",
            Role::Admin => "Admin",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankDetails {
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub ifsc_code: Option<String>,
    pub upi_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "user_type")]
    pub role: Role,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub bank_details: Option<BankDetails>,
    #[serde(default)]
    pub payment_methods: Option<String>,
    #[serde(default)]
    pub wallet: i64,
    pub created_at: DateTime,
}

/// `$set` payload written by the profile form.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub bank_details: BankDetails,
    pub payment_methods: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminRecord {
    pub email: String,
    pub name: String,
    pub created_at: DateTime,
}

fn default_quality_score() -> f64 {
    0.8
}

fn default_category() -> String {
    "General".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub adjusted_price: Option<f64>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub image: String,
    pub owner: String,
    pub owner_type: Role,
    #[serde(default = "default_quality_score")]
    pub quality_score: f64,
    #[serde(default)]
    pub user_quality: String,
    #[serde(default)]
    pub quantity: i64,
    pub created_at: DateTime,
}

impl Product {
    pub fn effective_price(&self) -> f64 {
        self.adjusted_price.unwrap_or(self.price)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "paid")]
    Paid,
    #[serde(rename = "Refunded")]
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "user")]
    pub buyer: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub amount: i64,
    pub payment_method: String,
    pub delivery_address: String,
    pub pincode: String,
    pub status: OrderStatus,
    pub delivery_status: String,
    #[serde(default)]
    pub shipment_id: Option<i64>,
    #[serde(rename = "razorpay_payment_id", default)]
    pub payment_id: Option<String>,
    #[serde(rename = "razorpay_order_id", default)]
    pub gateway_order_id: Option<String>,
    #[serde(default)]
    pub refund_id: Option<String>,
    #[serde(default)]
    pub refunded_at: Option<DateTime>,
    pub date: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub order_id: String,
    pub shipment_id: i64,
    pub status: String,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
}

/// Session token payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // buyer/seller email
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub user_id: Option<String>,
    pub exp: usize,
}

#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub user_type: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileInput {
    #[serde(default)]
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub ifsc_code: Option<String>,
    pub upi_id: Option<String>,
    #[serde(default)]
    pub payment_methods: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderInput {
    #[serde(default)]
    pub amount: f64,
}

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyPaymentInput {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
    /// Minor currency units.
    #[serde(default)]
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct ChatInput {
    #[serde(default)]
    pub message: String,
}

/// Accepts raw hex ids as well as ids pasted in their `ObjectId('...')` debug form.
pub fn parse_object_id(raw: &str) -> Option<ObjectId> {
    let cleaned = raw
        .trim()
        .trim_start_matches("ObjectId('")
        .trim_end_matches("')")
        .trim();
    ObjectId::parse_str(cleaned).ok()
}
