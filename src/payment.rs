//! Razorpay REST adapter (orders, payments, refunds) and signature checks.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use std::collections::HashMap;
use thiserror::Error;

use crate::config::RazorpayConfig;

pub const CURRENCY: &str = "INR";

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment gateway unreachable: {0}")]
    Http(#[from] reqwest::Error),
    #[error("payment gateway rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("payment signature mismatch")]
    SignatureMismatch,
}

impl PaymentError {
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, PaymentError::Rejected { status: 401, .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentDetails {
    pub id: String,
    #[serde(default)]
    pub method: Option<String>,
    /// Captured amount in paise.
    #[serde(default)]
    pub amount: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundRequest {
    pub amount: i64,
    pub speed: String,
    pub notes: HashMap<String, String>,
}

impl RefundRequest {
    pub fn full(amount: i64, reason: &str) -> Self {
        let mut notes = HashMap::new();
        notes.insert("reason".to_string(), reason.to_string());
        RefundRequest { amount, speed: "normal".to_string(), notes }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefundReceipt {
    pub id: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Public key id handed to the browser checkout widget.
    fn key_id(&self) -> &str;
    fn verify_payment_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> Result<(), PaymentError>;
    async fn create_order(&self, amount: i64, receipt: &str) -> Result<GatewayOrder, PaymentError>;
    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentDetails, PaymentError>;
    async fn refund(&self, payment_id: &str, request: &RefundRequest) -> Result<RefundReceipt, PaymentError>;
}

/// Constant-time check of a hex encoded HMAC-SHA256 signature.
pub fn verify_hmac_hex(secret: &[u8], message: &[u8], signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret) else {
        return false;
    };
    mac.update(message);
    mac.verify_slice(&signature).is_ok()
}

/// Checkout signature: HMAC of `"{order_id}|{payment_id}"` keyed with the API secret.
pub fn verify_checkout_signature(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    let message = format!("{}|{}", order_id, payment_id);
    verify_hmac_hex(secret.as_bytes(), message.as_bytes(), signature)
}

/// Webhook signature: HMAC of the raw request body keyed with the webhook secret.
pub fn verify_webhook_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    verify_hmac_hex(secret.as_bytes(), body, signature)
}

/// Major units (rupees) to minor units (paise).
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub struct RazorpayClient {
    http: reqwest::Client,
    key_id: String,
    key_secret: String,
    base_url: String,
}

impl RazorpayClient {
    pub fn new(http: reqwest::Client, config: &RazorpayConfig) -> Self {
        RazorpayClient {
            http,
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Creates a one-rupee order to check the credentials. Returns `None` when the gateway
    /// rejects them; network trouble keeps the client, since it may recover.
    pub async fn probe(self) -> Option<Self> {
        let preview: String = self.key_id.chars().take(12).collect();
        match self.create_order(100, "startup-probe").await {
            Ok(_) => {
                info!("Razorpay authenticated (key {}...)", preview);
                Some(self)
            }
            Err(e) if e.is_auth_failure() => {
                error!("Razorpay authentication failed for key {}...: {}", preview, e);
                None
            }
            Err(e) => {
                warn!("Razorpay probe failed, keeping client: {}", e);
                Some(self)
            }
        }
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PaymentError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::Rejected { status: status.as_u16(), body });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn verify_payment_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> Result<(), PaymentError> {
        if verify_checkout_signature(&self.key_secret, order_id, payment_id, signature) {
            Ok(())
        } else {
            Err(PaymentError::SignatureMismatch)
        }
    }

    async fn create_order(&self, amount: i64, receipt: &str) -> Result<GatewayOrder, PaymentError> {
        let response = self
            .http
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&json!({
                "amount": amount,
                "currency": CURRENCY,
                "receipt": receipt,
                "payment_capture": 1,
            }))
            .send()
            .await?;
        Self::read(response).await
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentDetails, PaymentError> {
        let response = self
            .http
            .get(format!("{}/payments/{}", self.base_url, payment_id))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await?;
        Self::read(response).await
    }

    async fn refund(&self, payment_id: &str, request: &RefundRequest) -> Result<RefundReceipt, PaymentError> {
        let response = self
            .http
            .post(format!("{}/payments/{}/refund", self.base_url, payment_id))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(request)
            .send()
            .await?;
        Self::read(response).await
    }
}
