//! Review ledger: append-only reviews plus the aggregate refresh each insert triggers.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::aggregation;
use crate::catalog::page_limit;
use crate::error::{AppError, AppResult};
use crate::model::{Review, User};
use crate::store::{ReviewQuery, Store};

pub const REVIEW_LIST_LIMIT: i64 = 50;
pub const MY_REVIEWS_LIMIT: i64 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub variant_id: Uuid,
    pub overall_rating: i32,
    #[serde(default)]
    pub dimensional_ratings: BTreeMap<String, i32>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub short_review: Option<String>,
    pub full_review: Option<String>,
}

fn validate_rating(field: &str, value: i32) -> AppResult<()> {
    if (1..=5).contains(&value) {
        Ok(())
    } else {
        Err(AppError::validation(field, "rating must be between 1 and 5"))
    }
}

/// Persist a review, then refresh the variant, item and (if any) business aggregates
/// and bump the author's review count. The steps are not transactional; a later
/// review recomputes everything from scratch.
pub async fn create_review(store: &dyn Store, author: &User, input: NewReview) -> AppResult<Review> {
    validate_rating("overall_rating", input.overall_rating)?;
    for (dim, value) in &input.dimensional_ratings {
        validate_rating(&format!("dimensional_ratings.{dim}"), *value)?;
    }

    let variant = store
        .find_variant(input.variant_id)
        .await?
        .ok_or_else(|| AppError::not_found("Variant"))?;

    let review = Review {
        id: Uuid::new_v4(),
        user_id: author.id,
        user_name: author.name.clone(),
        variant_id: variant.id,
        item_id: variant.item_id,
        overall_rating: input.overall_rating,
        dimensional_ratings: input.dimensional_ratings,
        tags: input.tags,
        short_review: input.short_review,
        full_review: input.full_review,
        helpful_count: 0,
        verified: false,
        created_at: Utc::now(),
    };
    store.insert_review(&review).await?;

    aggregation::recompute_variant(store, review.variant_id).await?;
    aggregation::recompute_item(store, review.item_id).await?;
    match store.find_item(review.item_id).await? {
        Some(item) => {
            if let Some(business_id) = item.business_id {
                aggregation::recompute_business(store, business_id).await?;
            }
        }
        None => warn!(item_id = %review.item_id, "review points at a missing item"),
    }
    store.increment_user_review_count(author.id).await?;

    info!(
        review_id = %review.id,
        variant_id = %review.variant_id,
        item_id = %review.item_id,
        user_id = %author.id,
        rating = review.overall_rating,
        "review created"
    );
    Ok(review)
}

/// Every call adds one vote; votes are not tracked per user.
pub async fn mark_helpful(store: &dyn Store, review_id: Uuid) -> AppResult<()> {
    if store.increment_helpful(review_id).await? {
        Ok(())
    } else {
        Err(AppError::not_found("Review"))
    }
}

pub async fn list_reviews(store: &dyn Store, mut query: ReviewQuery) -> AppResult<Vec<Review>> {
    query.limit = Some(page_limit(query.limit, REVIEW_LIST_LIMIT)?);
    store.list_reviews(&query).await
}

pub async fn my_reviews(store: &dyn Store, user: &User) -> AppResult<Vec<Review>> {
    store
        .list_reviews(&ReviewQuery {
            user_id: Some(user.id),
            limit: Some(MY_REVIEWS_LIMIT),
            ..Default::default()
        })
        .await
}
