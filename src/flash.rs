use actix_web::cookie::Cookie;
use actix_web::http::header;
use actix_web::HttpResponse;
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Error,
}

/// A redirect carrying a one-shot message for the page the browser lands on.
#[derive(Debug, Clone)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
    pub location: String,
}

impl Flash {
    pub fn new(level: FlashLevel, location: impl Into<String>, message: impl Into<String>) -> Self {
        Flash { level, message: message.into(), location: location.into() }
    }

    pub fn success(location: impl Into<String>, message: impl Into<String>) -> Self {
        Flash::new(FlashLevel::Success, location, message)
    }

    pub fn info(location: impl Into<String>, message: impl Into<String>) -> Self {
        Flash::new(FlashLevel::Info, location, message)
    }

    pub fn error(location: impl Into<String>, message: impl Into<String>) -> Self {
        Flash::new(FlashLevel::Error, location, message)
    }

    pub fn into_response(self) -> HttpResponse {
        self.respond(None)
    }

    pub fn with_cookie(self, cookie: Cookie<'static>) -> HttpResponse {
        self.respond(Some(cookie))
    }

    fn respond(self, cookie: Option<Cookie<'static>>) -> HttpResponse {
        let mut builder = HttpResponse::SeeOther();
        builder.insert_header((header::LOCATION, self.location.clone()));
        if let Some(cookie) = cookie {
            builder.cookie(cookie);
        }
        builder.json(json!({
            "redirect": self.location,
            "flash": {"level": self.level, "message": self.message},
        }))
    }
}

/// Plain redirect without a message.
pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location.to_string()))
        .json(json!({ "redirect": location }))
}
