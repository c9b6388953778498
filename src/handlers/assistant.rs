use actix_web::{web, HttpRequest, HttpResponse};
use rand::Rng;
use serde::Serialize;
use serde_json::json;

use crate::chat;
use crate::models::ChatInput;
use crate::session;

pub async fn chat(body: web::Json<ChatInput>) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "response": chat::reply(&body.message) }))
}

/// Simulated produce inspection shown on the seller dashboard.
#[derive(Debug, Serialize)]
pub struct Analysis {
    pub quality_score: u32,
    pub freshness: String,
    pub ripeness: &'static str,
    pub defects: &'static str,
    pub grade: &'static str,
    pub market_valuation: String,
}

impl Analysis {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let score: u32 = rng.gen_range(85..=98);
        let valuation: u32 = rng.gen_range(2000..=2500);
        Analysis {
            quality_score: score,
            freshness: format!("{}%", score),
            ripeness: if score > 90 { "Optimal" } else { "Good" },
            defects: if score > 92 { "None Detected" } else { "Minor surface marks" },
            grade: if score > 95 { "Grade A+" } else { "Grade A" },
            market_valuation: format!("₹{} / Quintal", valuation),
        }
    }
}

pub async fn run_analysis(req: HttpRequest) -> HttpResponse {
    if session::current(&req).is_none() {
        return HttpResponse::Unauthorized().json(json!({"error": "Unauthorized"}));
    }
    let analysis = Analysis::generate(&mut rand::thread_rng());
    HttpResponse::Ok().json(analysis)
}
