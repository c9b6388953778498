use std::collections::HashMap;
use std::path::Path;

use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use futures::StreamExt;
use log::{info, warn};
use mongodb::bson::DateTime;
use serde_json::json;

use crate::error::AppError;
use crate::flash::Flash;
use crate::handlers::views::{ProductView, ProfileView};
use crate::models::{parse_object_id, Product, Role};
use crate::pricing::{analyze_quality, compute_adjusted_price};
use crate::session;
use crate::state::AppState;
use crate::store::ProductQuery;

const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
const LISTING_FORM: &str = "/add-listing";

async fn listing_response(state: &AppState, query: ProductQuery) -> Result<HttpResponse, AppError> {
    let products = state.store.list_products(&query).await?;
    Ok(HttpResponse::Ok().json(json!({ "products": ProductView::list(products) })))
}

pub async fn index(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    listing_response(&state, ProductQuery::newest()).await
}

pub async fn citizen_marketplace(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    listing_response(&state, ProductQuery::newest()).await
}

pub async fn farmer_listings(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, AppError> {
    let claims = session::require_login(&req)?;
    listing_response(&state, ProductQuery::owned_by(&claims.sub)).await
}

pub async fn business_listings(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, AppError> {
    session::require_login(&req)?;
    listing_response(&state, ProductQuery::all()).await
}

struct Upload {
    filename: String,
    content: Vec<u8>,
}

/// Keeps ASCII letters, digits, `.`, `-` and `_`; spaces become underscores.
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') => Some(c),
            _ => None,
        })
        .collect();
    cleaned.trim_start_matches(['.', '_']).to_string()
}

fn store_image(static_dir: &Path, filename: &str, content: &[u8]) -> std::io::Result<String> {
    let image_dir = static_dir.join("image");
    std::fs::create_dir_all(&image_dir)?;
    std::fs::write(image_dir.join(filename), content)?;
    Ok(format!("/statics/image/{}", filename))
}

async fn read_listing_form(mut payload: Multipart) -> Result<(HashMap<String, String>, Option<Upload>), AppError> {
    let upload_error = |e: actix_multipart::MultipartError| AppError::invalid(LISTING_FORM, format!("Upload Error: {}", e));

    let mut fields = HashMap::new();
    let mut image = None;
    while let Some(item) = payload.next().await {
        let mut field = item.map_err(upload_error)?;
        let disposition = field.content_disposition().clone();
        let name = disposition.get_name().unwrap_or_default().to_string();

        let mut content = Vec::new();
        while let Some(chunk) = field.next().await {
            content.extend_from_slice(&chunk.map_err(upload_error)?);
            if content.len() > MAX_IMAGE_BYTES {
                return Err(AppError::invalid(LISTING_FORM, "Image is too large (5 MB max)."));
            }
        }

        if name == "image" {
            if let Some(filename) = disposition.get_filename().filter(|f| !f.is_empty()) {
                if !content.is_empty() {
                    image = Some(Upload { filename: filename.to_string(), content });
                }
            }
        } else {
            fields.insert(name, String::from_utf8_lossy(&content).trim().to_string());
        }
    }
    Ok((fields, image))
}

pub async fn add_product(state: web::Data<AppState>, req: HttpRequest, payload: Multipart) -> Result<HttpResponse, AppError> {
    let claims = session::require_login(&req)?;
    if !claims.role.can_list() {
        return Err(AppError::forbidden("/dashboard", "Only farmers and businesses can list products!"));
    }

    let (fields, image) = read_listing_form(payload).await?;
    let field = |key: &str| fields.get(key).cloned().unwrap_or_default();

    let name = field("name");
    if name.is_empty() {
        return Err(AppError::invalid(LISTING_FORM, "Product name is required."));
    }
    // an absent price defaults to zero, a blank one is rejected
    let price_raw = fields.get("price").map(String::as_str).unwrap_or("0");
    let price = match price_raw.parse::<f64>() {
        Ok(price) if price.is_finite() && price >= 0.0 => price,
        _ => return Err(AppError::invalid(LISTING_FORM, "Invalid price provided. Please enter a numeric value.")),
    };
    let quantity_raw = field("quantity");
    let quantity = match (if quantity_raw.is_empty() { "0" } else { quantity_raw.as_str() }).parse::<i64>() {
        Ok(quantity) if quantity >= 0 => quantity,
        _ => return Err(AppError::invalid(LISTING_FORM, "Invalid quantity provided. Please enter a whole number.")),
    };
    let category = Some(field("category")).filter(|c| !c.is_empty()).unwrap_or_else(|| "General".to_string());
    let description = field("description");

    let mut image_url = String::new();
    if let Some(upload) = image {
        let now = chrono::Utc::now().timestamp();
        let original = match sanitize_filename(&upload.filename) {
            cleaned if cleaned.is_empty() => format!("product_{}.png", now),
            cleaned => cleaned,
        };
        let filename = format!("{}_{}", now, original);
        let dir = state.static_dir.clone();
        match web::block(move || store_image(&dir, &filename, &upload.content)).await {
            Ok(Ok(url)) => image_url = url,
            Ok(Err(e)) => warn!("Could not store product image: {}", e),
            Err(e) => warn!("Image storage task failed: {}", e),
        }
    }

    let quality_score = analyze_quality(&name, &description, &category, price);
    let product = Product {
        id: None,
        adjusted_price: Some(compute_adjusted_price(price, quality_score)),
        name,
        price,
        category,
        description,
        address: field("address"),
        image: image_url,
        owner: claims.sub.clone(),
        owner_type: claims.role,
        quality_score,
        user_quality: field("user_quality"),
        quantity,
        created_at: DateTime::now(),
    };
    let id = state.store.insert_product(&product).await?;
    info!("{} listed product {} ({})", claims.sub, product.name, id);

    Ok(Flash::success("/dashboard", "Product listed successfully with AI Quality Score!").into_response())
}

fn referrer(req: &HttpRequest) -> String {
    req.headers()
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("/")
        .to_string()
}

pub async fn delete_product(
    state: web::Data<AppState>,
    req: HttpRequest,
    product_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let claims = session::require_login(&req)?;
    let back = referrer(&req);

    let Some(id) = parse_object_id(&product_id) else {
        return Ok(Flash::error(back, "Invalid product reference.").into_response());
    };
    let Some(product) = state.store.find_product(id).await? else {
        return Ok(Flash::error("/", "Product not found!").into_response());
    };

    if claims.role != Role::Admin && product.owner != claims.sub {
        warn!("{} tried to delete product {} owned by {}", claims.sub, id, product.owner);
        return Ok(Flash::error(back, "Unauthorized to delete this product!").into_response());
    }
    state.store.delete_product(id).await?;
    info!("{} deleted product {}", claims.sub, id);
    Ok(Flash::success(back, "Product deleted successfully!").into_response())
}

pub async fn checkout(
    state: web::Data<AppState>,
    req: HttpRequest,
    product_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let claims = session::require_login(&req)?;
    let id = parse_object_id(&product_id)
        .ok_or_else(|| AppError::invalid("/citizen", "Invalid link format. Please go back to Marketplace."))?;
    let product = state
        .store
        .find_product(id)
        .await?
        .ok_or_else(|| AppError::not_found("/citizen", "This product is no longer available."))?;
    let buyer = state.store.find_user(&claims.sub).await?.map(ProfileView::from);

    Ok(HttpResponse::Ok().json(json!({
        "product": ProductView::new(product, &mut rand::thread_rng()),
        "user": buyer,
        "razorpay_key_id": state.payments.as_ref().map(|p| p.key_id().to_string()),
    })))
}
