use rand::Rng;
use serde::Serialize;

use crate::models::{BankDetails, Order, OrderStatus, Product, Role, User};
use crate::pricing::{display_rating, quality_label};

fn timestamp(value: &mongodb::bson::DateTime) -> String {
    value.try_to_rfc3339_string().unwrap_or_default()
}

#[derive(Debug, Serialize)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub adjusted_price: f64,
    pub category: String,
    pub description: String,
    pub address: String,
    pub image: String,
    pub owner: String,
    pub owner_type: Role,
    pub quantity: i64,
    pub quality_score: f64,
    pub quality_label: String,
    pub rating: f64,
    pub created_at: String,
}

impl ProductView {
    pub fn new<R: Rng + ?Sized>(product: Product, rng: &mut R) -> Self {
        let quality_label = if product.user_quality.trim().is_empty() {
            quality_label(product.quality_score).to_string()
        } else {
            product.user_quality.clone()
        };
        ProductView {
            id: product.id.map(|id| id.to_hex()).unwrap_or_default(),
            adjusted_price: product.effective_price(),
            rating: display_rating(product.quality_score, rng),
            quality_label,
            created_at: timestamp(&product.created_at),
            name: product.name,
            price: product.price,
            category: product.category,
            description: product.description,
            address: product.address,
            image: product.image,
            owner: product.owner,
            owner_type: product.owner_type,
            quantity: product.quantity,
            quality_score: product.quality_score,
        }
    }

    pub fn list(products: Vec<Product>) -> Vec<ProductView> {
        let mut rng = rand::thread_rng();
        products.into_iter().map(|p| ProductView::new(p, &mut rng)).collect()
    }
}

#[derive(Debug, Serialize)]
pub struct OrderView {
    pub id: String,
    pub user: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub amount: i64,
    pub payment_method: String,
    pub delivery_address: String,
    pub pincode: String,
    pub status: OrderStatus,
    pub delivery_status: String,
    pub shipment_id: Option<i64>,
    pub refund_id: Option<String>,
    pub date: String,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        OrderView {
            id: order.id.map(|id| id.to_hex()).unwrap_or_default(),
            user: order.buyer,
            product_id: order.product_id,
            product_name: order.product_name,
            quantity: order.quantity,
            amount: order.amount,
            payment_method: order.payment_method,
            delivery_address: order.delivery_address,
            pincode: order.pincode,
            status: order.status,
            delivery_status: order.delivery_status,
            shipment_id: order.shipment_id,
            refund_id: order.refund_id,
            date: timestamp(&order.date),
        }
    }
}

/// Account data safe to hand back to the owner (no password hash).
#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub name: String,
    pub email: String,
    pub user_type: Role,
    pub user_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub bank_details: Option<BankDetails>,
    pub payment_methods: Option<String>,
    pub wallet: i64,
}

impl From<User> for ProfileView {
    fn from(user: User) -> Self {
        ProfileView {
            name: user.name,
            email: user.email,
            user_type: user.role,
            user_id: user.user_id,
            phone: user.phone,
            address: user.address,
            bank_details: user.bank_details,
            payment_methods: user.payment_methods,
            wallet: user.wallet,
        }
    }
}
