use std::collections::BTreeMap;

use actix_web::{web, HttpRequest, HttpResponse};
use log::error;
use serde_json::json;

use crate::error::AppError;
use crate::flash::Flash;
use crate::handlers::views::OrderView;
use crate::models::parse_object_id;
use crate::session;
use crate::settlement::{RefundError, RefundOutcome};
use crate::state::AppState;
use crate::store::ProductQuery;

const RECENT_ORDERS: usize = 50;

pub async fn overview(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, AppError> {
    session::require_admin(&req)?;

    let users = state.store.list_users().await?;
    let products = state.store.list_products(&ProductQuery::all()).await?;
    let orders = state.store.list_orders(None).await?;

    let total_revenue = orders.iter().fold(0i64, |total, o| total.saturating_add(o.amount));
    let mut user_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for user in &users {
        *user_counts.entry(user.role.as_str()).or_insert(0) += 1;
    }
    let total_orders = orders.len();
    let recent_orders: Vec<OrderView> = orders.into_iter().take(RECENT_ORDERS).map(OrderView::from).collect();

    Ok(HttpResponse::Ok().json(json!({
        "total_revenue": total_revenue,
        "total_users": users.len(),
        "total_products": products.len(),
        "total_orders": total_orders,
        "recent_orders": recent_orders,
        "user_counts": user_counts,
    })))
}

pub async fn refund_order(
    state: web::Data<AppState>,
    req: HttpRequest,
    order_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    session::require_admin(&req)?;

    let Some(id) = parse_object_id(&order_id) else {
        return Ok(Flash::error("/admin", "Order not found.").into_response());
    };

    let flash = match state.settlement().refund(id).await {
        Ok(RefundOutcome::Refunded { amount, .. }) => Flash::success(
            "/admin",
            format!("Refund of ₹{} processed successfully!", amount as f64 / 100.0),
        ),
        Ok(RefundOutcome::AlreadyRefunded) => Flash::info("/admin", "Order is already refunded."),
        Err(e) => {
            if matches!(e, RefundError::Gateway(_) | RefundError::Store(_)) {
                error!("Refund of order {} failed: {}", id, e);
            }
            Flash::error("/admin", e.to_string())
        }
    };
    Ok(flash.into_response())
}
