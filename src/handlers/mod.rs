use actix_web::web;

pub mod account;
pub mod admin;
pub mod assistant;
pub mod auth;
pub mod listings;
pub mod payments;
pub mod views;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(listings::index))
        .route("/register", web::post().to(auth::register))
        .route("/login", web::post().to(auth::login))
        .route("/logout", web::get().to(auth::logout))
        .route("/dashboard", web::get().to(auth::dashboard))
        .route("/landing", web::get().to(listings::farmer_listings))
        .route("/landingb", web::get().to(listings::business_listings))
        .route("/citizen", web::get().to(listings::citizen_marketplace))
        .route("/add_product", web::post().to(listings::add_product))
        .route("/delete_product/{product_id}", web::get().to(listings::delete_product))
        .route("/checkout/{product_id}", web::get().to(listings::checkout))
        .route("/create_order", web::post().to(payments::create_order))
        .route("/verify_payment", web::post().to(payments::verify_payment))
        .route("/webhook", web::post().to(payments::webhook))
        .route("/api/chat", web::post().to(assistant::chat))
        .route("/run-analysis", web::post().to(assistant::run_analysis))
        .route("/admin", web::get().to(admin::overview))
        .route("/admin/refund_order/{order_id}", web::get().to(admin::refund_order))
        .route("/profile", web::get().to(account::profile))
        .route("/profile", web::post().to(account::update_profile))
        .route("/my-orders", web::get().to(account::my_orders));
}
