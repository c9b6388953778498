use actix_web::{web, HttpRequest, HttpResponse};
use log::{error, info};
use serde_json::json;

use crate::error::AppError;
use crate::flash::Flash;
use crate::handlers::views::{OrderView, ProfileView};
use crate::models::{BankDetails, Claims, ProfileInput, ProfileUpdate, Role};
use crate::session;
use crate::state::AppState;

fn require_profile_owner(req: &HttpRequest) -> Result<Claims, AppError> {
    let claims = session::require_login(req)?;
    if claims.role == Role::Admin {
        return Err(AppError::Forbidden {
            message: "Admins do not have a profile page.".to_string(),
            redirect: "/dashboard".to_string(),
        });
    }
    Ok(claims)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub async fn profile(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, AppError> {
    let claims = require_profile_owner(&req)?;
    let mut user = state
        .store
        .find_user(&claims.sub)
        .await?
        .ok_or_else(|| AppError::not_found("/login", "Account not found. Please log in again."))?;

    // accounts created before seller ids existed get one on first visit
    if user.user_id.is_none() {
        if let Some(new_id) = session::generate_user_id(user.role) {
            state.store.assign_user_id(&user.email, &new_id).await?;
            info!("Assigned {} to {}", new_id, user.email);
            user.user_id = Some(new_id);
        }
    }

    Ok(HttpResponse::Ok().json(json!({ "user": ProfileView::from(user) })))
}

pub async fn update_profile(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<ProfileInput>,
) -> Result<HttpResponse, AppError> {
    let claims = require_profile_owner(&req)?;
    let input = form.into_inner();
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::invalid("/profile", "Name cannot be empty."));
    }

    let update = ProfileUpdate {
        name,
        phone: non_empty(input.phone),
        address: non_empty(input.address),
        bank_details: BankDetails {
            bank_name: non_empty(input.bank_name),
            account_number: non_empty(input.account_number),
            ifsc_code: non_empty(input.ifsc_code),
            upi_id: non_empty(input.upi_id),
        },
        payment_methods: input.payment_methods.trim().to_string(),
    };
    if !state.store.update_profile(&claims.sub, &update).await? {
        return Err(AppError::not_found("/login", "Account not found. Please log in again."));
    }

    // the session token carries the display name, so hand out a fresh one
    let flash = Flash::success("/profile", "Profile updated successfully!");
    match state.store.find_user(&claims.sub).await? {
        Some(user) => match state.sessions.issue(&user) {
            Ok(token) => Ok(flash.with_cookie(session::session_cookie(token))),
            Err(e) => {
                error!("Failed to refresh session token: {}", e);
                Ok(flash.into_response())
            }
        },
        None => Ok(flash.into_response()),
    }
}

pub async fn my_orders(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, AppError> {
    let claims = session::require_login(&req)?;
    let orders: Vec<OrderView> = state
        .store
        .list_orders(Some(&claims.sub))
        .await?
        .into_iter()
        .map(OrderView::from)
        .collect();
    Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}
