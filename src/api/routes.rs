// API route configuration

use actix_web::{web, HttpRequest};

use crate::api::handlers;
use crate::error::AppError;

fn json_error(err: actix_web::error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::validation("body", err.to_string()).into()
}

fn query_error(err: actix_web::error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::validation("query", err.to_string()).into()
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .route("/health", web::get().to(handlers::health_check))
        .route("/", web::get().to(handlers::root))
        .service(web::scope("/api").configure(api_routes));
}

/// Fixed segments (`all`, `trending`, `my-reviews`, `my-business`) are registered
/// before the `{id}` routes they would otherwise collide with.
fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::root))
        .route("/health", web::get().to(handlers::health_check))
        .route("/seed", web::post().to(handlers::seed))
        // Auth
        .route("/auth/register", web::post().to(handlers::register))
        .route("/auth/login", web::post().to(handlers::login))
        .route("/auth/me", web::get().to(handlers::me))
        // Categories
        .service(
            web::resource("/categories")
                .route(web::get().to(handlers::list_categories))
                .route(web::post().to(handlers::create_category)),
        )
        .route("/categories/all", web::get().to(handlers::all_categories))
        .route("/categories/{id}", web::get().to(handlers::get_category))
        // Items
        .service(
            web::resource("/items")
                .route(web::get().to(handlers::list_items))
                .route(web::post().to(handlers::create_item)),
        )
        .route("/items/trending", web::get().to(handlers::trending_items))
        .route("/items/{id}", web::get().to(handlers::get_item))
        // Variants
        .service(
            web::resource("/variants")
                .route(web::get().to(handlers::list_variants))
                .route(web::post().to(handlers::create_variant)),
        )
        .route("/variants/{id}", web::get().to(handlers::get_variant))
        // Reviews
        .service(
            web::resource("/reviews")
                .route(web::get().to(handlers::list_reviews))
                .route(web::post().to(handlers::create_review)),
        )
        .route("/reviews/my-reviews", web::get().to(handlers::my_reviews))
        .route("/reviews/{id}/helpful", web::post().to(handlers::mark_helpful))
        // Businesses
        .service(
            web::resource("/businesses")
                .route(web::get().to(handlers::list_businesses))
                .route(web::post().to(handlers::create_business)),
        )
        .route("/businesses/my-business", web::get().to(handlers::my_business))
        .route("/businesses/{id}", web::get().to(handlers::get_business))
        // Analytics
        .route("/analytics/overview", web::get().to(handlers::analytics_overview))
        .route("/analytics/items/{id}", web::get().to(handlers::item_analytics))
        // Search
        .route("/search", web::get().to(handlers::search))
        // Insights
        .route(
            "/ai/insights/variant/{id}",
            web::get().to(handlers::variant_insights),
        )
        .route("/ai/insights/{id}", web::get().to(handlers::item_insights))
        // Business management
        .route("/business/items", web::get().to(handlers::business_items))
        .service(
            web::resource("/business/items/{id}")
                .route(web::get().to(handlers::business_item))
                .route(web::put().to(handlers::update_business_item))
                .route(web::delete().to(handlers::delete_business_item)),
        )
        .route(
            "/business/items/{id}/variants",
            web::get().to(handlers::business_item_variants),
        )
        .service(
            web::resource("/business/variants/{id}")
                .route(web::put().to(handlers::update_business_variant))
                .route(web::delete().to(handlers::delete_business_variant)),
        );
}
