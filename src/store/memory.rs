use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BusinessQuery, CategoryScope, ItemOrder, ItemQuery, ReviewQuery, ReviewSort, Store};
use crate::aggregation::RatingAggregate;
use crate::error::{AppError, AppResult};
use crate::model::{Business, Category, Item, ItemPatch, Review, User, Variant, VariantPatch};

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    categories: Vec<Category>,
    items: Vec<Item>,
    variants: Vec<Variant>,
    reviews: Vec<Review>,
    businesses: Vec<Business>,
}

/// In-process store. Collections keep insertion order, like a document store
/// scanned without an index.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn item_matches(item: &Item, query: &ItemQuery) -> bool {
    if query.category_id.is_some_and(|c| c != item.category_id) {
        return false;
    }
    if query.business_id.is_some() && query.business_id != item.business_id {
        return false;
    }
    if query.min_rating.is_some_and(|min| item.avg_rating < min) {
        return false;
    }
    if let Some(search) = query.search.as_deref() {
        let needle = search.to_lowercase();
        let hit = contains_ci(&item.name, &needle)
            || item
                .description
                .as_deref()
                .is_some_and(|d| contains_ci(d, &needle))
            || item.tags.iter().any(|t| contains_ci(t, &needle));
        if !hit {
            return false;
        }
    }
    true
}

fn review_matches(review: &Review, query: &ReviewQuery) -> bool {
    if query.variant_id.is_some_and(|v| v != review.variant_id) {
        return false;
    }
    if query.item_id.is_some_and(|i| i != review.item_id) {
        return false;
    }
    if let Some(ids) = &query.item_ids {
        if !ids.contains(&review.item_id) {
            return false;
        }
    }
    if query.user_id.is_some_and(|u| u != review.user_id) {
        return false;
    }
    if query.min_rating.is_some_and(|min| review.overall_rating < min) {
        return false;
    }
    true
}

fn desc_f64(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

fn truncate<T>(mut rows: Vec<T>, limit: Option<i64>) -> Vec<T> {
    if let Some(limit) = limit {
        rows.truncate(limit.max(0) as usize);
    }
    rows
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("Email already registered".into()));
        }
        inner.users.push(user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn increment_user_review_count(&self, id: Uuid) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner.users.iter_mut().find(|u| u.id == id) {
            user.review_count += 1;
        }
        Ok(())
    }

    async fn set_user_business(&self, id: Uuid, business_id: Uuid) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner.users.iter_mut().find(|u| u.id == id) {
            user.business_id = Some(business_id);
        }
        Ok(())
    }

    async fn insert_categories(&self, categories: &[Category]) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.categories.extend_from_slice(categories);
        Ok(())
    }

    async fn find_category(&self, id: Uuid) -> AppResult<Option<Category>> {
        let inner = self.inner.read().await;
        Ok(inner.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn find_category_by_name(&self, name: &str) -> AppResult<Option<Category>> {
        let inner = self.inner.read().await;
        Ok(inner.categories.iter().find(|c| c.name == name).cloned())
    }

    async fn list_categories(&self, scope: CategoryScope, limit: i64) -> AppResult<Vec<Category>> {
        let inner = self.inner.read().await;
        let rows = inner
            .categories
            .iter()
            .filter(|c| match scope {
                CategoryScope::Roots => c.parent_id.is_none(),
                CategoryScope::ChildrenOf(parent) => c.parent_id == Some(parent),
                CategoryScope::All => true,
            })
            .cloned()
            .collect();
        Ok(truncate(rows, Some(limit)))
    }

    async fn insert_item(&self, item: &Item) -> AppResult<()> {
        self.inner.write().await.items.push(item.clone());
        Ok(())
    }

    async fn find_item(&self, id: Uuid) -> AppResult<Option<Item>> {
        let inner = self.inner.read().await;
        Ok(inner.items.iter().find(|i| i.id == id).cloned())
    }

    async fn list_items(&self, query: &ItemQuery) -> AppResult<Vec<Item>> {
        let inner = self.inner.read().await;
        let mut rows: Vec<Item> = inner
            .items
            .iter()
            .filter(|i| item_matches(i, query))
            .cloned()
            .collect();
        match query.order {
            ItemOrder::Rating => rows.sort_by(|a, b| desc_f64(a.avg_rating, b.avg_rating)),
            ItemOrder::Trending => rows.sort_by(|a, b| {
                b.review_count
                    .cmp(&a.review_count)
                    .then_with(|| desc_f64(a.avg_rating, b.avg_rating))
            }),
        }
        Ok(truncate(rows, query.limit))
    }

    async fn update_item(&self, id: Uuid, patch: &ItemPatch) -> AppResult<Option<Item>> {
        let mut inner = self.inner.write().await;
        Ok(inner.items.iter_mut().find(|i| i.id == id).map(|item| {
            patch.apply(item);
            item.clone()
        }))
    }

    async fn set_item_aggregate(&self, id: Uuid, aggregate: &RatingAggregate) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(item) = inner.items.iter_mut().find(|i| i.id == id) {
            item.avg_rating = aggregate.avg_rating;
            item.review_count = aggregate.review_count;
        }
        Ok(())
    }

    async fn delete_item(&self, id: Uuid) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.items.len();
        inner.items.retain(|i| i.id != id);
        Ok(inner.items.len() != before)
    }

    async fn insert_variant(&self, variant: &Variant) -> AppResult<()> {
        self.inner.write().await.variants.push(variant.clone());
        Ok(())
    }

    async fn find_variant(&self, id: Uuid) -> AppResult<Option<Variant>> {
        let inner = self.inner.read().await;
        Ok(inner.variants.iter().find(|v| v.id == id).cloned())
    }

    async fn list_variants(&self, item_id: Uuid, limit: i64) -> AppResult<Vec<Variant>> {
        let inner = self.inner.read().await;
        let rows = inner
            .variants
            .iter()
            .filter(|v| v.item_id == item_id)
            .cloned()
            .collect();
        Ok(truncate(rows, Some(limit)))
    }

    async fn update_variant(&self, id: Uuid, patch: &VariantPatch) -> AppResult<Option<Variant>> {
        let mut inner = self.inner.write().await;
        Ok(inner.variants.iter_mut().find(|v| v.id == id).map(|variant| {
            patch.apply(variant);
            variant.clone()
        }))
    }

    async fn set_variant_aggregate(
        &self,
        id: Uuid,
        aggregate: &RatingAggregate,
        dimensional_ratings: &BTreeMap<String, f64>,
    ) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(variant) = inner.variants.iter_mut().find(|v| v.id == id) {
            variant.avg_rating = aggregate.avg_rating;
            variant.review_count = aggregate.review_count;
            variant.dimensional_ratings = dimensional_ratings.clone();
        }
        Ok(())
    }

    async fn delete_variant(&self, id: Uuid) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.variants.len();
        inner.variants.retain(|v| v.id != id);
        Ok(inner.variants.len() != before)
    }

    async fn delete_variants_for_item(&self, item_id: Uuid) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.variants.len();
        inner.variants.retain(|v| v.item_id != item_id);
        Ok((before - inner.variants.len()) as u64)
    }

    async fn insert_review(&self, review: &Review) -> AppResult<()> {
        self.inner.write().await.reviews.push(review.clone());
        Ok(())
    }

    async fn list_reviews(&self, query: &ReviewQuery) -> AppResult<Vec<Review>> {
        let inner = self.inner.read().await;
        let mut rows: Vec<Review> = inner
            .reviews
            .iter()
            .filter(|r| review_matches(r, query))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            let primary = match query.sort {
                ReviewSort::Recent => Ordering::Equal,
                ReviewSort::Helpful => b.helpful_count.cmp(&a.helpful_count),
                ReviewSort::Rating => b.overall_rating.cmp(&a.overall_rating),
            };
            primary.then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(truncate(rows, query.limit))
    }

    async fn increment_helpful(&self, id: Uuid) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.reviews.iter_mut().find(|r| r.id == id) {
            Some(review) => {
                review.helpful_count += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_reviews_for_item(&self, item_id: Uuid) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.reviews.len();
        inner.reviews.retain(|r| r.item_id != item_id);
        Ok((before - inner.reviews.len()) as u64)
    }

    async fn delete_reviews_for_variant(&self, variant_id: Uuid) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.reviews.len();
        inner.reviews.retain(|r| r.variant_id != variant_id);
        Ok((before - inner.reviews.len()) as u64)
    }

    async fn insert_business(&self, business: &Business) -> AppResult<()> {
        self.inner.write().await.businesses.push(business.clone());
        Ok(())
    }

    async fn find_business(&self, id: Uuid) -> AppResult<Option<Business>> {
        let inner = self.inner.read().await;
        Ok(inner.businesses.iter().find(|b| b.id == id).cloned())
    }

    async fn list_businesses(&self, query: &BusinessQuery) -> AppResult<Vec<Business>> {
        let inner = self.inner.read().await;
        let needle = query.search.as_deref().map(str::to_lowercase);
        let rows = inner
            .businesses
            .iter()
            .filter(|b| query.category_id.map_or(true, |c| c == b.category_id))
            .filter(|b| needle.as_deref().map_or(true, |n| contains_ci(&b.name, n)))
            .cloned()
            .collect();
        Ok(truncate(rows, query.limit))
    }

    async fn set_business_aggregate(
        &self,
        id: Uuid,
        aggregate: &RatingAggregate,
    ) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(business) = inner.businesses.iter_mut().find(|b| b.id == id) {
            business.avg_rating = aggregate.avg_rating;
            business.review_count = aggregate.review_count;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn item(name: &str, tags: &[&str], avg: f64, count: i64) -> Item {
        Item {
            id: Uuid::new_v4(),
            name: name.into(),
            description: Some(format!("{name} from the tandoor")),
            category_id: Uuid::nil(),
            business_id: None,
            image_url: None,
            price_range: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            avg_rating: avg,
            review_count: count,
            created_at: Utc::now(),
        }
    }

    fn review(item_id: Uuid, rating: i32, helpful: i64, age_mins: i64) -> Review {
        Review {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            user_name: "Asha".into(),
            variant_id: Uuid::new_v4(),
            item_id,
            overall_rating: rating,
            dimensional_ratings: BTreeMap::new(),
            tags: vec![],
            short_review: None,
            full_review: None,
            helpful_count: helpful,
            verified: false,
            created_at: Utc::now() - Duration::minutes(age_mins),
        }
    }

    #[tokio::test]
    async fn search_is_case_insensitive_over_name_description_and_tags() {
        let store = MemoryStore::new();
        store.insert_item(&item("Butter Chicken", &["creamy"], 4.0, 3)).await.unwrap();
        store.insert_item(&item("Naan", &["Garlic-Bread"], 3.0, 9)).await.unwrap();

        let by_name = ItemQuery {
            search: Some("butter".into()),
            ..Default::default()
        };
        assert_eq!(store.list_items(&by_name).await.unwrap().len(), 1);

        let by_tag = ItemQuery {
            search: Some("garlic".into()),
            ..Default::default()
        };
        let hits = store.list_items(&by_tag).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Naan");

        let by_description = ItemQuery {
            search: Some("TANDOOR".into()),
            ..Default::default()
        };
        assert_eq!(store.list_items(&by_description).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn trending_orders_by_review_count_then_rating() {
        let store = MemoryStore::new();
        store.insert_item(&item("a", &[], 5.0, 1)).await.unwrap();
        store.insert_item(&item("b", &[], 3.0, 9)).await.unwrap();
        store.insert_item(&item("c", &[], 4.0, 9)).await.unwrap();

        let trending = ItemQuery {
            order: ItemOrder::Trending,
            ..Default::default()
        };
        let names: Vec<String> = store
            .list_items(&trending)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["c", "b", "a"]);

        let by_rating: Vec<String> = store
            .list_items(&ItemQuery::default())
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(by_rating, vec!["a", "c", "b"]);
    }

    #[tokio::test]
    async fn review_listing_sorts_filters_and_truncates() {
        let store = MemoryStore::new();
        let item_id = Uuid::new_v4();
        let old = review(item_id, 5, 0, 30);
        let mid = review(item_id, 2, 7, 20);
        let new = review(item_id, 4, 1, 10);
        for r in [&old, &mid, &new] {
            store.insert_review(r).await.unwrap();
        }
        store.insert_review(&review(Uuid::new_v4(), 1, 99, 0)).await.unwrap();

        let recent = store
            .list_reviews(&ReviewQuery::for_item(item_id))
            .await
            .unwrap();
        assert_eq!(
            recent.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![new.id, mid.id, old.id]
        );

        let helpful = ReviewQuery {
            sort: ReviewSort::Helpful,
            ..ReviewQuery::for_item(item_id)
        };
        assert_eq!(store.list_reviews(&helpful).await.unwrap()[0].id, mid.id);

        let rated = ReviewQuery {
            sort: ReviewSort::Rating,
            min_rating: Some(3),
            ..ReviewQuery::for_item(item_id)
        }
        .limit(1);
        let top = store.list_reviews(&rated).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].id, old.id);
    }

    #[tokio::test]
    async fn helpful_increment_reports_missing_reviews() {
        let store = MemoryStore::new();
        let r = review(Uuid::new_v4(), 4, 0, 0);
        store.insert_review(&r).await.unwrap();

        assert!(store.increment_helpful(r.id).await.unwrap());
        assert!(store.increment_helpful(r.id).await.unwrap());
        assert!(!store.increment_helpful(Uuid::new_v4()).await.unwrap());

        let stored = store.list_reviews(&ReviewQuery::default()).await.unwrap();
        assert_eq!(stored[0].helpful_count, 2);
    }

    #[tokio::test]
    async fn empty_item_id_list_matches_nothing() {
        let store = MemoryStore::new();
        store.insert_review(&review(Uuid::new_v4(), 4, 0, 0)).await.unwrap();
        let none = store
            .list_reviews(&ReviewQuery::for_items(vec![]))
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
