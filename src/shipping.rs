//! Shiprocket adapter: one login at boot, then bearer-token order creation.

use async_trait::async_trait;
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::config::ShiprocketConfig;

#[derive(Debug, Error)]
pub enum ShippingError {
    #[error("shipping provider unreachable: {0}")]
    Http(#[from] reqwest::Error),
    #[error("shipping provider rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("shipping provider login returned no token")]
    MissingToken,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItem {
    pub name: String,
    pub sku: String,
    pub units: i64,
    pub selling_price: f64,
    pub discount: f64,
    pub tax: f64,
    pub hsn: u32,
}

/// Ad-hoc order payload. Billing doubles as shipping; city, state and phone are placeholders
/// because checkout only collects an address line and a pincode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipmentOrder {
    pub order_id: String,
    pub order_date: String,
    pub pickup_location: String,
    pub billing_customer_name: String,
    pub billing_last_name: String,
    pub billing_address: String,
    pub billing_city: String,
    pub billing_pincode: String,
    pub billing_state: String,
    pub billing_country: String,
    pub billing_email: String,
    pub billing_phone: String,
    pub shipping_is_billing: bool,
    pub order_items: Vec<OrderItem>,
    pub payment_method: String,
    pub shipping_charges: f64,
    pub gift_wrap_charges: f64,
    pub transaction_charges: f64,
    pub total_discount: f64,
    pub sub_total: f64,
    pub length: f64,
    pub breadth: f64,
    pub height: f64,
    pub weight: f64,
}

pub struct Consignment<'a> {
    pub reference: String,
    pub customer_name: &'a str,
    pub customer_email: &'a str,
    pub address: &'a str,
    pub pincode: &'a str,
    pub item_name: &'a str,
    pub sku: String,
    pub units: i64,
    pub unit_price: f64,
    /// Order total in major units.
    pub sub_total: f64,
}

impl ShipmentOrder {
    pub fn prepaid(pickup_location: &str, consignment: Consignment<'_>) -> Self {
        ShipmentOrder {
            order_id: consignment.reference,
            order_date: chrono::Local::now().format("%Y-%m-%d %H:%M").to_string(),
            pickup_location: pickup_location.to_string(),
            billing_customer_name: consignment.customer_name.to_string(),
            billing_last_name: " ".to_string(),
            billing_address: consignment.address.to_string(),
            billing_city: "Delivery City".to_string(),
            billing_pincode: consignment.pincode.to_string(),
            billing_state: "Delivery State".to_string(),
            billing_country: "India".to_string(),
            billing_email: consignment.customer_email.to_string(),
            billing_phone: "9999999999".to_string(),
            shipping_is_billing: true,
            order_items: vec![OrderItem {
                name: consignment.item_name.to_string(),
                sku: consignment.sku,
                units: consignment.units,
                selling_price: consignment.unit_price,
                discount: 0.0,
                tax: 0.0,
                hsn: 441122,
            }],
            payment_method: "Prepaid".to_string(),
            shipping_charges: 0.0,
            gift_wrap_charges: 0.0,
            transaction_charges: 0.0,
            total_discount: 0.0,
            sub_total: consignment.sub_total,
            length: 10.0,
            breadth: 10.0,
            height: 10.0,
            weight: consignment.units as f64,
        }
    }
}

#[async_trait]
pub trait ShippingProvider: Send + Sync {
    fn pickup_location(&self) -> &str;
    /// Returns the provider's shipment id, if it assigned one.
    async fn create_shipment(&self, order: &ShipmentOrder) -> Result<Option<i64>, ShippingError>;
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateOrderResponse {
    #[serde(default)]
    shipment_id: Option<i64>,
}

pub struct ShiprocketClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    pickup_location: String,
}

impl ShiprocketClient {
    pub async fn login(http: reqwest::Client, config: &ShiprocketConfig) -> Result<Self, ShippingError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let response = http
            .post(format!("{}/auth/login", base_url))
            .json(&json!({"email": config.email, "password": config.password}))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShippingError::Rejected { status: status.as_u16(), body });
        }
        let token = response
            .json::<LoginResponse>()
            .await?
            .token
            .ok_or(ShippingError::MissingToken)?;

        info!("Shiprocket authenticated");
        Ok(ShiprocketClient {
            http,
            base_url,
            token,
            pickup_location: config.pickup_location.clone(),
        })
    }

    /// Logs the outcome of the one-time login; shipping stays disabled if it fails.
    pub async fn connect(http: reqwest::Client, config: &ShiprocketConfig) -> Option<Self> {
        match Self::login(http, config).await {
            Ok(client) => Some(client),
            Err(e) => {
                error!("Shiprocket login failed, shipments disabled: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl ShippingProvider for ShiprocketClient {
    fn pickup_location(&self) -> &str {
        &self.pickup_location
    }

    async fn create_shipment(&self, order: &ShipmentOrder) -> Result<Option<i64>, ShippingError> {
        let response = self
            .http
            .post(format!("{}/orders/create/adhoc", self.base_url))
            .bearer_auth(&self.token)
            .json(order)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShippingError::Rejected { status: status.as_u16(), body });
        }
        Ok(response.json::<CreateOrderResponse>().await?.shipment_id)
    }
}
