// HTTP request handlers for API endpoints

use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::access;
use crate::aggregation;
use crate::api::auth::{CurrentUser, MaybeUser};
use crate::api::models::*;
use crate::api::server::AppState;
use crate::catalog::{self, NewBusiness, NewCategory, NewItem, NewVariant};
use crate::error::{AppError, AppResult};
use crate::identity::Registration;
use crate::model::{ItemPatch, Role, VariantPatch};
use crate::reviews::{self, NewReview};
use crate::seed;
use crate::store::{ItemQuery, ReviewQuery};

/// Reviews fed to the insight generator per request.
const INSIGHT_REVIEW_LIMIT: i64 = 100;
const SEARCH_LIMIT: i64 = 50;

type State = web::Data<AppState>;

pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(RootResponse {
        message: "FeedbackVault API is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Health check endpoint
pub async fn health_check(state: State) -> HttpResponse {
    let database = match state.store.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::warn!(error = %e, "health check: store unreachable");
            "disconnected"
        }
    };
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        database: database.to_string(),
    })
}

// ---- auth ----

pub async fn register(state: State, payload: web::Json<RegisterRequest>) -> AppResult<HttpResponse> {
    let req = payload.into_inner();
    let role = req
        .user_type
        .parse::<Role>()
        .map_err(|e| AppError::validation("user_type", e))?;
    let auth = state
        .identity
        .register(
            state.store.as_ref(),
            Registration {
                email: req.email,
                password: req.password,
                name: req.name,
                role,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(auth))
}

pub async fn login(state: State, payload: web::Json<LoginRequest>) -> AppResult<HttpResponse> {
    let auth = state
        .identity
        .login(state.store.as_ref(), &payload.email, &payload.password)
        .await?;
    Ok(HttpResponse::Ok().json(auth))
}

pub async fn me(CurrentUser(user): CurrentUser) -> HttpResponse {
    HttpResponse::Ok().json(UserProfile::from(user))
}

// ---- categories ----

pub async fn create_category(
    state: State,
    _user: CurrentUser,
    payload: web::Json<NewCategory>,
) -> AppResult<HttpResponse> {
    let category = catalog::create_category(state.store.as_ref(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(category))
}

pub async fn list_categories(
    state: State,
    query: web::Query<CategoryListQuery>,
) -> AppResult<HttpResponse> {
    let categories = catalog::list_categories(state.store.as_ref(), query.parent_id).await?;
    Ok(HttpResponse::Ok().json(categories))
}

pub async fn all_categories(state: State) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(catalog::all_categories(state.store.as_ref()).await?))
}

pub async fn get_category(state: State, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let category = catalog::get_category(state.store.as_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(category))
}

// ---- items ----

pub async fn create_item(
    state: State,
    CurrentUser(user): CurrentUser,
    payload: web::Json<NewItem>,
) -> AppResult<HttpResponse> {
    let item = catalog::create_item(state.store.as_ref(), &user, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(item))
}

pub async fn list_items(state: State, query: web::Query<ItemListQuery>) -> AppResult<HttpResponse> {
    let items = catalog::list_items(state.store.as_ref(), query.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(items))
}

pub async fn trending_items(state: State, query: web::Query<LimitQuery>) -> AppResult<HttpResponse> {
    let items = catalog::trending_items(state.store.as_ref(), query.limit).await?;
    Ok(HttpResponse::Ok().json(items))
}

pub async fn get_item(state: State, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let item = catalog::get_item(state.store.as_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(item))
}

// ---- variants ----

pub async fn create_variant(
    state: State,
    CurrentUser(user): CurrentUser,
    payload: web::Json<NewVariant>,
) -> AppResult<HttpResponse> {
    let variant = catalog::create_variant(state.store.as_ref(), &user, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(variant))
}

pub async fn list_variants(
    state: State,
    query: web::Query<VariantListQuery>,
) -> AppResult<HttpResponse> {
    let variants = catalog::list_variants(state.store.as_ref(), query.item_id).await?;
    Ok(HttpResponse::Ok().json(variants))
}

pub async fn get_variant(state: State, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let variant = catalog::get_variant(state.store.as_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(variant))
}

// ---- reviews ----

pub async fn create_review(
    state: State,
    CurrentUser(user): CurrentUser,
    payload: web::Json<NewReview>,
) -> AppResult<HttpResponse> {
    let review = reviews::create_review(state.store.as_ref(), &user, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(review))
}

pub async fn list_reviews(
    state: State,
    query: web::Query<ReviewListQuery>,
) -> AppResult<HttpResponse> {
    let found = reviews::list_reviews(state.store.as_ref(), query.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(found))
}

pub async fn mark_helpful(
    state: State,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let review_id = path.into_inner();
    reviews::mark_helpful(state.store.as_ref(), review_id).await?;
    tracing::debug!(%review_id, user_id = %user.id, "review marked helpful");
    Ok(HttpResponse::Ok().json(MessageResponse::new("Marked as helpful")))
}

pub async fn my_reviews(state: State, CurrentUser(user): CurrentUser) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(reviews::my_reviews(state.store.as_ref(), &user).await?))
}

// ---- businesses ----

pub async fn create_business(
    state: State,
    CurrentUser(user): CurrentUser,
    payload: web::Json<NewBusiness>,
) -> AppResult<HttpResponse> {
    let business =
        catalog::create_business(state.store.as_ref(), &user, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(business))
}

pub async fn list_businesses(
    state: State,
    query: web::Query<BusinessListQuery>,
) -> AppResult<HttpResponse> {
    let businesses =
        catalog::list_businesses(state.store.as_ref(), query.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(businesses))
}

pub async fn get_business(state: State, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let business = catalog::get_business(state.store.as_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(business))
}

pub async fn my_business(state: State, CurrentUser(user): CurrentUser) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(catalog::my_business(state.store.as_ref(), &user).await?))
}

// ---- analytics ----

pub async fn analytics_overview(
    state: State,
    CurrentUser(user): CurrentUser,
) -> AppResult<HttpResponse> {
    access::require_business_owner(&user)?;
    let business_id = user
        .business_id
        .ok_or_else(|| AppError::Forbidden("No business associated with this account".into()))?;
    let overview = aggregation::analytics_overview(state.store.as_ref(), business_id).await?;
    Ok(HttpResponse::Ok().json(overview))
}

pub async fn item_analytics(
    state: State,
    _user: CurrentUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let analytics = aggregation::item_analytics(state.store.as_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(analytics))
}

// ---- search ----

pub async fn search(
    state: State,
    MaybeUser(viewer): MaybeUser,
    query: web::Query<SearchQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();
    tracing::debug!(q = %query.q, viewer = ?viewer.as_ref().map(|u| u.id), "search");
    let items = state
        .store
        .list_items(&ItemQuery {
            category_id: query.category_id,
            search: Some(query.q).filter(|q| !q.trim().is_empty()),
            min_rating: query.min_rating,
            limit: Some(SEARCH_LIMIT),
            ..Default::default()
        })
        .await?;
    Ok(HttpResponse::Ok().json(SearchResponse {
        count: items.len(),
        items,
    }))
}

// ---- insights ----

pub async fn item_insights(
    state: State,
    MaybeUser(viewer): MaybeUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let item = catalog::get_item(state.store.as_ref(), path.into_inner()).await?;
    let recent = state
        .store
        .list_reviews(&ReviewQuery::for_item(item.id).limit(INSIGHT_REVIEW_LIMIT))
        .await?;
    tracing::debug!(item_id = %item.id, reviews = recent.len(), viewer = ?viewer.as_ref().map(|u| u.id), "generating item insights");
    let report = state.insights.generate(&recent, &item.name).await;
    Ok(HttpResponse::Ok().json(report))
}

pub async fn variant_insights(
    state: State,
    MaybeUser(viewer): MaybeUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let variant = catalog::get_variant(state.store.as_ref(), path.into_inner()).await?;
    let recent = state
        .store
        .list_reviews(&ReviewQuery::for_variant(variant.id).limit(INSIGHT_REVIEW_LIMIT))
        .await?;
    tracing::debug!(variant_id = %variant.id, reviews = recent.len(), viewer = ?viewer.as_ref().map(|u| u.id), "generating variant insights");
    let report = state.insights.generate(&recent, &variant.name).await;
    Ok(HttpResponse::Ok().json(report))
}

// ---- business management ----

pub async fn business_items(state: State, CurrentUser(user): CurrentUser) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(catalog::business_items(state.store.as_ref(), &user).await?))
}

pub async fn business_item(
    state: State,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let item = access::owned_item(state.store.as_ref(), &user, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(item))
}

pub async fn update_business_item(
    state: State,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    payload: web::Json<ItemPatch>,
) -> AppResult<HttpResponse> {
    let item =
        catalog::update_owned_item(state.store.as_ref(), &user, path.into_inner(), &payload)
            .await?;
    Ok(HttpResponse::Ok().json(item))
}

pub async fn delete_business_item(
    state: State,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    catalog::delete_owned_item(state.store.as_ref(), &user, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Item deleted successfully")))
}

pub async fn business_item_variants(
    state: State,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let variants =
        catalog::owned_item_variants(state.store.as_ref(), &user, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(variants))
}

pub async fn update_business_variant(
    state: State,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    payload: web::Json<VariantPatch>,
) -> AppResult<HttpResponse> {
    let variant =
        catalog::update_owned_variant(state.store.as_ref(), &user, path.into_inner(), &payload)
            .await?;
    Ok(HttpResponse::Ok().json(variant))
}

pub async fn delete_business_variant(
    state: State,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    catalog::delete_owned_variant(state.store.as_ref(), &user, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Variant deleted successfully")))
}

// ---- seed ----

pub async fn seed(state: State) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(seed::seed(state.store.as_ref()).await?))
}
