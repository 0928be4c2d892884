// Request logging, compression and CORS

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::{Compress, Logger};

pub fn setup_middleware() -> (Logger, Compress) {
    let logger = Logger::new(r#"%a "%r" %s %b %Dms"#);
    let compress = Compress::default();
    (logger, compress)
}

/// `allowed_origins` is a comma-separated list; `*` anywhere in it allows every origin.
pub fn setup_cors(allowed_origins: &str) -> Cors {
    let origins: Vec<&str> = allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .collect();

    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
        ])
        .supports_credentials()
        .max_age(3600);

    if origins.is_empty() || origins.contains(&"*") {
        return cors.allow_any_origin();
    }
    for origin in origins {
        cors = cors.allowed_origin(origin);
    }
    cors
}
