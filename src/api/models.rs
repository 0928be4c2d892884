// API request/response models (DTOs)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Item, Role, User};
use crate::store::{BusinessQuery, ItemQuery, ReviewQuery, ReviewSort};

/// Error envelope. Successful responses are the bare resource.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ErrorDetail>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl ApiResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            details: None,
            meta: Some(Meta::now()),
        }
    }
}

/// Metadata included in error responses
#[derive(Debug, Serialize, Deserialize)]
pub struct Meta {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub version: String,
}

impl Meta {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: Uuid::new_v4().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

fn default_user_type() -> String {
    Role::Customer.as_str().to_string()
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    /// Parsed into a [`Role`] by the handler so unknown values surface as validation errors.
    #[serde(default = "default_user_type")]
    pub user_type: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `GET /auth/me`
#[derive(Debug, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub user_type: Role,
    pub business_id: Option<Uuid>,
    pub review_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            user_type: user.role,
            business_id: user.business_id,
            review_count: user.review_count,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CategoryListQuery {
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemListQuery {
    pub category_id: Option<Uuid>,
    pub business_id: Option<Uuid>,
    pub search: Option<String>,
    pub min_rating: Option<f64>,
    pub limit: Option<i64>,
}

impl From<ItemListQuery> for ItemQuery {
    fn from(q: ItemListQuery) -> Self {
        ItemQuery {
            category_id: q.category_id,
            business_id: q.business_id,
            search: q.search.filter(|s| !s.trim().is_empty()),
            min_rating: q.min_rating,
            limit: q.limit,
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct VariantListQuery {
    pub item_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewListQuery {
    pub variant_id: Option<Uuid>,
    pub item_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub min_rating: Option<i32>,
    #[serde(alias = "sort")]
    pub sort_by: Option<ReviewSort>,
    pub limit: Option<i64>,
}

impl From<ReviewListQuery> for ReviewQuery {
    fn from(q: ReviewListQuery) -> Self {
        ReviewQuery {
            variant_id: q.variant_id,
            item_id: q.item_id,
            user_id: q.user_id,
            min_rating: q.min_rating,
            sort: q.sort_by.unwrap_or_default(),
            limit: q.limit,
            ..Default::default()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct BusinessListQuery {
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
}

impl From<BusinessListQuery> for BusinessQuery {
    fn from(q: BusinessListQuery) -> Self {
        BusinessQuery {
            category_id: q.category_id,
            search: q.search.filter(|s| !s.trim().is_empty()),
            limit: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub category_id: Option<Uuid>,
    pub min_rating: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub items: Vec<Item>,
    pub count: usize,
}
