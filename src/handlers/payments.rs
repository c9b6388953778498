use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use log::{debug, error, info};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::models::{CreateOrderInput, VerifyPaymentInput};
use crate::payment::{to_minor_units, verify_webhook_signature};
use crate::session;
use crate::settlement::{Buyer, SettlementError};
use crate::state::AppState;

const SIGNATURE_HEADER: &str = "X-Razorpay-Signature";

pub async fn create_order(state: web::Data<AppState>, body: web::Json<CreateOrderInput>) -> HttpResponse {
    let Some(gateway) = state.payments.as_ref() else {
        return HttpResponse::InternalServerError().json(json!({"error": "Razorpay client not configured"}));
    };

    let amount = to_minor_units(body.amount);
    if amount <= 0 {
        return HttpResponse::BadRequest().json(json!({"error": "Invalid amount"}));
    }

    let receipt = format!("rcpt_{}", Uuid::new_v4().simple());
    info!("Creating gateway order for {} paise", amount);
    match gateway.create_order(amount, &receipt).await {
        Ok(order) => {
            info!("Gateway order created: {}", order.id);
            HttpResponse::Ok().json(order)
        }
        Err(e) => {
            error!("Error creating gateway order: {}", e);
            HttpResponse::InternalServerError().json(json!({"error": e.to_string()}))
        }
    }
}

pub async fn verify_payment(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<VerifyPaymentInput>,
) -> HttpResponse {
    let Some(claims) = session::current(&req) else {
        return HttpResponse::Unauthorized().json(json!({"status": "failed", "message": "Login required"}));
    };
    let buyer = Buyer { email: claims.sub, name: claims.name };

    match state.settlement().settle(&buyer, &body).await {
        Ok(settled) => HttpResponse::Ok().json(json!({
            "status": "success",
            "shipment_id": settled.shipment_id,
            "order_id": settled.order_id.to_hex(),
        })),
        Err(e) => {
            let status = match e {
                SettlementError::SignatureMismatch
                | SettlementError::InvalidQuantity
                | SettlementError::InvalidAmount => StatusCode::BAD_REQUEST,
                SettlementError::GatewayUnavailable | SettlementError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            error!("Payment verification failed for {}: {}", buyer.email, e);
            HttpResponse::build(status).json(json!({"status": "failed", "message": e.to_string()}))
        }
    }
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    event: String,
    #[serde(default)]
    payload: serde_json::Value,
}

pub async fn webhook(state: web::Data<AppState>, req: HttpRequest, body: web::Bytes) -> HttpResponse {
    let Some(secret) = state.webhook_secret.as_deref() else {
        error!("Webhook received but RAZORPAY_WEBHOOK_SECRET is not set");
        return HttpResponse::InternalServerError().json(json!({"status": "error"}));
    };

    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !verify_webhook_signature(secret, &body, signature) {
        return HttpResponse::BadRequest().json(json!({"status": "error", "message": "Invalid Signature"}));
    }

    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            error!("Unreadable webhook payload: {}", e);
            return HttpResponse::BadRequest().json(json!({"status": "error", "message": "Malformed payload"}));
        }
    };

    if event.event == "payment.captured" {
        let payment_id = event.payload["payment"]["entity"]["id"].as_str().unwrap_or("unknown");
        info!("Payment captured: {}", payment_id);
    } else {
        debug!("Ignoring webhook event {}", event.event);
    }
    HttpResponse::Ok().json(json!({"status": "ok"}))
}
