//! Persistence seam. Handlers and services talk to a `dyn Store`; the concrete
//! backend (Postgres or in-process) is picked once at startup.

pub mod memory;
pub mod postgres;

use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::aggregation::RatingAggregate;
use crate::error::AppResult;
use crate::model::{Business, Category, Item, ItemPatch, Review, User, Variant, VariantPatch};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Which slice of the category tree to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryScope {
    Roots,
    ChildrenOf(Uuid),
    All,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ItemOrder {
    /// `avg_rating` descending.
    #[default]
    Rating,
    /// `(review_count, avg_rating)` descending.
    Trending,
}

#[derive(Debug, Clone, Default)]
pub struct ItemQuery {
    pub category_id: Option<Uuid>,
    pub business_id: Option<Uuid>,
    /// Case-insensitive substring over name, description and tags.
    pub search: Option<String>,
    pub min_rating: Option<f64>,
    pub order: ItemOrder,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewSort {
    #[default]
    Recent,
    Helpful,
    Rating,
}

impl FromStr for ReviewSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recent" => Ok(ReviewSort::Recent),
            "helpful" => Ok(ReviewSort::Helpful),
            "rating" => Ok(ReviewSort::Rating),
            other => Err(format!("unknown sort '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReviewQuery {
    pub variant_id: Option<Uuid>,
    pub item_id: Option<Uuid>,
    /// Restrict to reviews of any of these items. An empty list matches nothing.
    pub item_ids: Option<Vec<Uuid>>,
    pub user_id: Option<Uuid>,
    pub min_rating: Option<i32>,
    pub sort: ReviewSort,
    /// `None` returns every match.
    pub limit: Option<i64>,
}

impl ReviewQuery {
    pub fn for_variant(variant_id: Uuid) -> Self {
        Self {
            variant_id: Some(variant_id),
            ..Default::default()
        }
    }

    pub fn for_item(item_id: Uuid) -> Self {
        Self {
            item_id: Some(item_id),
            ..Default::default()
        }
    }

    pub fn for_items(item_ids: Vec<Uuid>) -> Self {
        Self {
            item_ids: Some(item_ids),
            ..Default::default()
        }
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct BusinessQuery {
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
    pub limit: Option<i64>,
}

/// Document-style access to every collection. Implementations must make
/// `increment_helpful` and `increment_user_review_count` atomic per record.
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> AppResult<()>;

    async fn insert_user(&self, user: &User) -> AppResult<()>;
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn increment_user_review_count(&self, id: Uuid) -> AppResult<()>;
    async fn set_user_business(&self, id: Uuid, business_id: Uuid) -> AppResult<()>;

    async fn insert_categories(&self, categories: &[Category]) -> AppResult<()>;
    async fn find_category(&self, id: Uuid) -> AppResult<Option<Category>>;
    async fn find_category_by_name(&self, name: &str) -> AppResult<Option<Category>>;
    async fn list_categories(&self, scope: CategoryScope, limit: i64) -> AppResult<Vec<Category>>;

    async fn insert_item(&self, item: &Item) -> AppResult<()>;
    async fn find_item(&self, id: Uuid) -> AppResult<Option<Item>>;
    async fn list_items(&self, query: &ItemQuery) -> AppResult<Vec<Item>>;
    async fn update_item(&self, id: Uuid, patch: &ItemPatch) -> AppResult<Option<Item>>;
    async fn set_item_aggregate(&self, id: Uuid, aggregate: &RatingAggregate) -> AppResult<()>;
    async fn delete_item(&self, id: Uuid) -> AppResult<bool>;

    async fn insert_variant(&self, variant: &Variant) -> AppResult<()>;
    async fn find_variant(&self, id: Uuid) -> AppResult<Option<Variant>>;
    async fn list_variants(&self, item_id: Uuid, limit: i64) -> AppResult<Vec<Variant>>;
    async fn update_variant(&self, id: Uuid, patch: &VariantPatch) -> AppResult<Option<Variant>>;
    async fn set_variant_aggregate(
        &self,
        id: Uuid,
        aggregate: &RatingAggregate,
        dimensional_ratings: &BTreeMap<String, f64>,
    ) -> AppResult<()>;
    async fn delete_variant(&self, id: Uuid) -> AppResult<bool>;
    async fn delete_variants_for_item(&self, item_id: Uuid) -> AppResult<u64>;

    async fn insert_review(&self, review: &Review) -> AppResult<()>;
    async fn list_reviews(&self, query: &ReviewQuery) -> AppResult<Vec<Review>>;
    /// Returns `false` when no review has this id.
    async fn increment_helpful(&self, id: Uuid) -> AppResult<bool>;
    async fn delete_reviews_for_item(&self, item_id: Uuid) -> AppResult<u64>;
    async fn delete_reviews_for_variant(&self, variant_id: Uuid) -> AppResult<u64>;

    async fn insert_business(&self, business: &Business) -> AppResult<()>;
    async fn find_business(&self, id: Uuid) -> AppResult<Option<Business>>;
    async fn list_businesses(&self, query: &BusinessQuery) -> AppResult<Vec<Business>>;
    async fn set_business_aggregate(
        &self,
        id: Uuid,
        aggregate: &RatingAggregate,
    ) -> AppResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_sort_parses_case_insensitively() {
        assert_eq!("Helpful".parse::<ReviewSort>(), Ok(ReviewSort::Helpful));
        assert_eq!("rating".parse::<ReviewSort>(), Ok(ReviewSort::Rating));
        assert_eq!(" recent ".parse::<ReviewSort>(), Ok(ReviewSort::Recent));
        assert!("oldest".parse::<ReviewSort>().is_err());
    }
}
