//! Denormalized rating aggregates and on-demand analytics.
//!
//! Aggregates are always recomputed from every review that currently points at
//! the entity; there is no incremental path. An entity with no reviews keeps
//! whatever aggregate it had before.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::model::{Item, Review, Variant};
use crate::store::{ItemQuery, ReviewQuery, Store};

const TOP_ITEMS: usize = 5;
const RECENT_REVIEWS: usize = 5;
const TOP_TAGS: usize = 10;
const ITEM_RECENT_REVIEWS: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingAggregate {
    pub avg_rating: f64,
    pub review_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantAggregate {
    pub rating: RatingAggregate,
    pub dimensional_ratings: BTreeMap<String, f64>,
}

/// Rounds to `places` decimals; exact ties go to the even neighbour.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round_ties_even() / factor
}

/// Unrounded mean of `overall_rating`; `None` for an empty set.
pub fn mean_overall(reviews: &[Review]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let total: i64 = reviews.iter().map(|r| r.overall_rating as i64).sum();
    Some(total as f64 / reviews.len() as f64)
}

pub fn rating_aggregate(reviews: &[Review]) -> Option<RatingAggregate> {
    mean_overall(reviews).map(|mean| RatingAggregate {
        avg_rating: round_to(mean, 2),
        review_count: reviews.len() as i64,
    })
}

/// Per-dimension mean. A review that omits a dimension does not count toward
/// that dimension's denominator.
pub fn dimensional_means(reviews: &[Review]) -> BTreeMap<String, f64> {
    let mut sums: BTreeMap<&str, (i64, i64)> = BTreeMap::new();
    for review in reviews {
        for (dim, value) in &review.dimensional_ratings {
            let entry = sums.entry(dim.as_str()).or_insert((0, 0));
            entry.0 += *value as i64;
            entry.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(dim, (total, count))| (dim.to_string(), total as f64 / count as f64))
        .collect()
}

/// Tag counts, most frequent first; ties keep first-seen order.
pub fn tag_frequency(reviews: &[Review]) -> Vec<(String, i64)> {
    let mut counts: IndexMap<&str, i64> = IndexMap::new();
    for review in reviews {
        for tag in &review.tags {
            *counts.entry(tag.as_str()).or_insert(0) += 1;
        }
    }
    let mut ranked: Vec<(String, i64)> = counts
        .into_iter()
        .map(|(tag, count)| (tag.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

/// Counts per star value, keys `"1"`..`"5"` always present.
pub fn rating_distribution(reviews: &[Review]) -> BTreeMap<String, i64> {
    let mut dist: BTreeMap<String, i64> = (1..=5).map(|star| (star.to_string(), 0)).collect();
    for review in reviews {
        *dist.entry(review.overall_rating.to_string()).or_insert(0) += 1;
    }
    dist
}

/// Highest `(avg_rating, review_count)` first.
pub fn top_items(items: &[Item], n: usize) -> Vec<&Item> {
    let mut ranked: Vec<&Item> = items.iter().collect();
    ranked.sort_by(|a, b| {
        b.avg_rating
            .partial_cmp(&a.avg_rating)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.review_count.cmp(&a.review_count))
    });
    ranked.truncate(n);
    ranked
}

fn most_recent(mut reviews: Vec<Review>, n: usize) -> Vec<Review> {
    reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    reviews.truncate(n);
    reviews
}

/// Recompute a variant's aggregate from all of its reviews and write it back.
pub async fn recompute_variant(
    store: &dyn Store,
    variant_id: Uuid,
) -> AppResult<Option<VariantAggregate>> {
    let reviews = store.list_reviews(&ReviewQuery::for_variant(variant_id)).await?;
    let Some(rating) = rating_aggregate(&reviews) else {
        debug!(%variant_id, "no reviews; variant aggregate left as is");
        return Ok(None);
    };
    let dimensional_ratings = dimensional_means(&reviews);
    store
        .set_variant_aggregate(variant_id, &rating, &dimensional_ratings)
        .await?;
    debug!(%variant_id, avg_rating = rating.avg_rating, review_count = rating.review_count, "variant aggregate updated");
    Ok(Some(VariantAggregate {
        rating,
        dimensional_ratings,
    }))
}

/// Recompute an item's aggregate over every review carrying its id.
pub async fn recompute_item(store: &dyn Store, item_id: Uuid) -> AppResult<Option<RatingAggregate>> {
    let reviews = store.list_reviews(&ReviewQuery::for_item(item_id)).await?;
    let Some(rating) = rating_aggregate(&reviews) else {
        return Ok(None);
    };
    store.set_item_aggregate(item_id, &rating).await?;
    debug!(%item_id, avg_rating = rating.avg_rating, review_count = rating.review_count, "item aggregate updated");
    Ok(Some(rating))
}

async fn business_items(store: &dyn Store, business_id: Uuid) -> AppResult<Vec<Item>> {
    store
        .list_items(&ItemQuery {
            business_id: Some(business_id),
            ..Default::default()
        })
        .await
}

/// Recompute a business aggregate across the reviews of all its items.
pub async fn recompute_business(
    store: &dyn Store,
    business_id: Uuid,
) -> AppResult<Option<RatingAggregate>> {
    let item_ids = business_items(store, business_id)
        .await?
        .into_iter()
        .map(|i| i.id)
        .collect();
    let reviews = store.list_reviews(&ReviewQuery::for_items(item_ids)).await?;
    let Some(rating) = rating_aggregate(&reviews) else {
        return Ok(None);
    };
    store.set_business_aggregate(business_id, &rating).await?;
    debug!(%business_id, avg_rating = rating.avg_rating, "business aggregate updated");
    Ok(Some(rating))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopItem {
    pub id: Uuid,
    pub name: String,
    pub rating: f64,
    pub reviews: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentReview {
    pub rating: i32,
    pub review: Option<String>,
    pub user: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsOverview {
    pub total_reviews: i64,
    pub avg_rating: f64,
    /// Change versus the previous period. No history is kept, so always 0.
    pub rating_trend: f64,
    pub top_items: Vec<TopItem>,
    pub recent_reviews: Vec<RecentReview>,
    pub dimensional_breakdown: BTreeMap<String, f64>,
    pub tag_frequency: IndexMap<String, i64>,
}

impl AnalyticsOverview {
    pub fn from_parts(items: &[Item], reviews: Vec<Review>) -> Self {
        let total_reviews = reviews.len() as i64;
        let avg_rating = mean_overall(&reviews).map_or(0.0, |m| round_to(m, 2));
        let dimensional_breakdown = dimensional_means(&reviews)
            .into_iter()
            .map(|(dim, mean)| (dim, round_to(mean, 2)))
            .collect();
        let tag_frequency = tag_frequency(&reviews).into_iter().take(TOP_TAGS).collect();
        let top_items = top_items(items, TOP_ITEMS)
            .into_iter()
            .map(|i| TopItem {
                id: i.id,
                name: i.name.clone(),
                rating: i.avg_rating,
                reviews: i.review_count,
            })
            .collect();
        let recent_reviews = most_recent(reviews, RECENT_REVIEWS)
            .into_iter()
            .map(|r| RecentReview {
                rating: r.overall_rating,
                review: r.short_review,
                user: r.user_name,
                date: r.created_at,
            })
            .collect();

        Self {
            total_reviews,
            avg_rating,
            rating_trend: 0.0,
            top_items,
            recent_reviews,
            dimensional_breakdown,
            tag_frequency,
        }
    }
}

pub async fn analytics_overview(store: &dyn Store, business_id: Uuid) -> AppResult<AnalyticsOverview> {
    let items = business_items(store, business_id).await?;
    let item_ids = items.iter().map(|i| i.id).collect();
    let reviews = store.list_reviews(&ReviewQuery::for_items(item_ids)).await?;
    Ok(AnalyticsOverview::from_parts(&items, reviews))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemAnalytics {
    pub item: Item,
    pub variants: Vec<Variant>,
    pub total_reviews: i64,
    pub rating_distribution: BTreeMap<String, i64>,
    pub recent_reviews: Vec<Review>,
}

pub async fn item_analytics(store: &dyn Store, item_id: Uuid) -> AppResult<ItemAnalytics> {
    let item = store
        .find_item(item_id)
        .await?
        .ok_or_else(|| AppError::not_found("Item"))?;
    let variants = store.list_variants(item_id, 100).await?;
    let reviews = store.list_reviews(&ReviewQuery::for_item(item_id)).await?;
    let rating_distribution = rating_distribution(&reviews);
    let total_reviews = reviews.len() as i64;
    Ok(ItemAnalytics {
        item,
        variants,
        total_reviews,
        rating_distribution,
        recent_reviews: most_recent(reviews, ITEM_RECENT_REVIEWS as usize),
    })
}
