use actix_web::{web, HttpRequest, HttpResponse};
use log::{error, info};
use mongodb::bson::DateTime;

use crate::error::AppError;
use crate::flash::{self, Flash};
use crate::models::{LoginInput, RegisterInput, Role, User};
use crate::session;
use crate::state::AppState;
use crate::store::StoreError;

pub async fn register(state: web::Data<AppState>, form: web::Form<RegisterInput>) -> Result<HttpResponse, AppError> {
    let input = form.into_inner();
    let email = input.email.trim().to_lowercase();
    let name = input.name.trim().to_string();
    if name.is_empty() || email.is_empty() || input.password.is_empty() {
        return Err(AppError::invalid("/register", "Name, email and password are required."));
    }
    let role = Role::from_signup(&input.user_type)
        .ok_or_else(|| AppError::invalid("/register", "Invalid account type."))?;

    if state.store.find_user(&email).await?.is_some() {
        return Ok(Flash::error("/register", "User already exists!").into_response());
    }

    let password = session::hash_password(&input.password).map_err(|e| {
        error!("Password hashing failed: {}", e);
        AppError::invalid("/register", "Registration failed. Please try again.")
    })?;

    let user_id = session::generate_user_id(role);
    let account = User {
        id: None,
        name,
        email,
        password,
        role,
        user_id: user_id.clone(),
        phone: None,
        address: None,
        bank_details: None,
        payment_methods: None,
        wallet: 0,
        created_at: DateTime::now(),
    };

    match state.store.insert_user(&account).await {
        Ok(_) => {}
        // lost a race with another registration for the same email
        Err(StoreError::Duplicate) => return Ok(Flash::error("/register", "User already exists!").into_response()),
        Err(e) => return Err(e.into()),
    }
    info!("Registered {} account {}", role.as_str(), account.email);

    let mut message = "Registration successful!".to_string();
    if let Some(id) = user_id {
        message.push_str(&format!(" Your {} ID is {}", role.capitalized(), id));
    }
    Ok(Flash::success("/login", message).into_response())
}

pub async fn login(state: web::Data<AppState>, form: web::Form<LoginInput>) -> Result<HttpResponse, AppError> {
    let email = form.email.trim().to_lowercase();
    let user = match state.store.find_user(&email).await? {
        Some(user) if session::verify_password(&user.password, &form.password) => user,
        _ => return Ok(Flash::error("/login", "Invalid credentials").into_response()),
    };

    let token = state.sessions.issue(&user).map_err(|e| {
        error!("Failed to encode session token: {}", e);
        AppError::invalid("/login", "Could not start a session. Please try again.")
    })?;
    Ok(Flash::success("/", format!("Welcome back, {}!", user.name)).with_cookie(session::session_cookie(token)))
}

pub async fn logout() -> HttpResponse {
    Flash::success("/", "Successfully logged out!").with_cookie(session::removal_cookie())
}

pub async fn dashboard(req: HttpRequest) -> HttpResponse {
    let location = match session::current(&req).map(|claims| claims.role) {
        None => "/login",
        Some(Role::Admin) => "/admin",
        Some(Role::Farmer) => "/landing",
        Some(Role::Business) => "/landingb",
        Some(Role::Citizen) => "/citizen",
    };
    flash::redirect(location)
}
