//! Categories, items, variants and businesses.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::access;
use crate::error::{AppError, AppResult};
use crate::model::{Business, Category, Item, ItemPatch, User, Variant, VariantPatch};
use crate::store::{BusinessQuery, CategoryScope, ItemOrder, ItemQuery, Store};

pub const DEFAULT_DIMENSIONS: [&str; 3] = ["quality", "value", "consistency"];

const CATEGORY_LIST_LIMIT: i64 = 100;
const CATEGORY_ALL_LIMIT: i64 = 500;
const VARIANT_LIST_LIMIT: i64 = 100;
const BUSINESS_LIST_LIMIT: i64 = 100;
pub const ITEM_LIST_LIMIT: i64 = 50;
pub const TRENDING_LIMIT: i64 = 10;

/// Resolves a caller-supplied page size; negative values are rejected.
pub fn page_limit(requested: Option<i64>, default: i64) -> AppResult<i64> {
    match requested {
        Some(limit) if limit < 0 => Err(AppError::validation("limit", "limit must not be negative")),
        Some(limit) => Ok(limit),
        None => Ok(default),
    }
}

fn required_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name", "name must not be empty"));
    }
    Ok(name.to_string())
}

fn default_dimensions() -> Vec<String> {
    DEFAULT_DIMENSIONS.iter().map(|d| d.to_string()).collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub image_url: Option<String>,
    #[serde(default = "default_dimensions")]
    pub dimension_fields: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewCategory {
    pub fn root(name: &str, description: &str, tags: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            description: Some(description.to_string()),
            parent_id: None,
            image_url: None,
            dimension_fields: default_dimensions(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Build a category record, resolving `level` from the parent.
pub async fn new_category(store: &dyn Store, input: NewCategory) -> AppResult<Category> {
    let level = match input.parent_id {
        Some(parent_id) => {
            let parent = store
                .find_category(parent_id)
                .await?
                .ok_or_else(|| AppError::not_found("Parent category"))?;
            parent.level + 1
        }
        None => 0,
    };
    Ok(Category {
        id: Uuid::new_v4(),
        name: required_name(&input.name)?,
        description: input.description,
        parent_id: input.parent_id,
        image_url: input.image_url,
        dimension_fields: input.dimension_fields,
        tags: input.tags,
        level,
        created_at: Utc::now(),
    })
}

pub async fn create_category(store: &dyn Store, input: NewCategory) -> AppResult<Category> {
    let category = new_category(store, input).await?;
    store.insert_categories(std::slice::from_ref(&category)).await?;
    info!(category_id = %category.id, level = category.level, "category created");
    Ok(category)
}

/// Children of `parent_id`, or the roots when absent.
pub async fn list_categories(store: &dyn Store, parent_id: Option<Uuid>) -> AppResult<Vec<Category>> {
    let scope = match parent_id {
        Some(id) => CategoryScope::ChildrenOf(id),
        None => CategoryScope::Roots,
    };
    store.list_categories(scope, CATEGORY_LIST_LIMIT).await
}

pub async fn all_categories(store: &dyn Store) -> AppResult<Vec<Category>> {
    store.list_categories(CategoryScope::All, CATEGORY_ALL_LIMIT).await
}

pub async fn get_category(store: &dyn Store, id: Uuid) -> AppResult<Category> {
    store
        .find_category(id)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub description: Option<String>,
    pub category_id: Uuid,
    pub business_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub price_range: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// The item's business defaults to the caller's; naming someone else's business is Forbidden.
pub async fn create_item(store: &dyn Store, caller: &User, input: NewItem) -> AppResult<Item> {
    let name = required_name(&input.name)?;
    get_category(store, input.category_id).await?;

    let business_id = match (input.business_id, caller.business_id) {
        (Some(requested), Some(own)) if requested != own => {
            return Err(AppError::Forbidden(
                "Items can only be added to your own business".into(),
            ))
        }
        (Some(_), None) => {
            return Err(AppError::Forbidden(
                "Items can only be added to your own business".into(),
            ))
        }
        (_, own) => own,
    };

    let item = Item {
        id: Uuid::new_v4(),
        name,
        description: input.description,
        category_id: input.category_id,
        business_id,
        image_url: input.image_url,
        price_range: input.price_range,
        tags: input.tags,
        avg_rating: 0.0,
        review_count: 0,
        created_at: Utc::now(),
    };
    store.insert_item(&item).await?;
    info!(item_id = %item.id, user_id = %caller.id, "item created");
    Ok(item)
}

pub async fn list_items(store: &dyn Store, mut query: ItemQuery) -> AppResult<Vec<Item>> {
    query.order = ItemOrder::Rating;
    query.limit = Some(page_limit(query.limit, ITEM_LIST_LIMIT)?);
    store.list_items(&query).await
}

pub async fn trending_items(store: &dyn Store, limit: Option<i64>) -> AppResult<Vec<Item>> {
    store
        .list_items(&ItemQuery {
            order: ItemOrder::Trending,
            limit: Some(page_limit(limit, TRENDING_LIMIT)?),
            ..Default::default()
        })
        .await
}

pub async fn get_item(store: &dyn Store, id: Uuid) -> AppResult<Item> {
    store
        .find_item(id)
        .await?
        .ok_or_else(|| AppError::not_found("Item"))
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewVariant {
    pub name: String,
    pub item_id: Uuid,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    pub price: Option<f64>,
}

pub async fn create_variant(store: &dyn Store, caller: &User, input: NewVariant) -> AppResult<Variant> {
    let name = required_name(&input.name)?;
    let item = get_item(store, input.item_id).await?;
    if item.business_id.is_some() {
        access::ensure_owns_item(caller, &item)?;
    }

    let variant = Variant {
        id: Uuid::new_v4(),
        name,
        item_id: item.id,
        attributes: input.attributes,
        price: input.price,
        avg_rating: 0.0,
        review_count: 0,
        dimensional_ratings: BTreeMap::new(),
        created_at: Utc::now(),
    };
    store.insert_variant(&variant).await?;
    info!(variant_id = %variant.id, item_id = %item.id, "variant created");
    Ok(variant)
}

pub async fn list_variants(store: &dyn Store, item_id: Uuid) -> AppResult<Vec<Variant>> {
    store.list_variants(item_id, VARIANT_LIST_LIMIT).await
}

pub async fn get_variant(store: &dyn Store, id: Uuid) -> AppResult<Variant> {
    store
        .find_variant(id)
        .await?
        .ok_or_else(|| AppError::not_found("Variant"))
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBusiness {
    pub name: String,
    pub description: Option<String>,
    pub category_id: Uuid,
    pub location: Option<String>,
    pub image_url: Option<String>,
}

/// One business per owner. Links the new business back onto the owner's account.
pub async fn create_business(store: &dyn Store, caller: &User, input: NewBusiness) -> AppResult<Business> {
    access::require_business_owner(caller)?;
    if caller.business_id.is_some() {
        return Err(AppError::Conflict("You already have a business".into()));
    }
    let name = required_name(&input.name)?;
    get_category(store, input.category_id).await?;

    let business = Business {
        id: Uuid::new_v4(),
        name,
        description: input.description,
        owner_id: caller.id,
        category_id: input.category_id,
        location: input.location,
        image_url: input.image_url,
        avg_rating: 0.0,
        review_count: 0,
        created_at: Utc::now(),
    };
    store.insert_business(&business).await?;
    store.set_user_business(caller.id, business.id).await?;
    info!(business_id = %business.id, owner_id = %caller.id, "business created");
    Ok(business)
}

pub async fn list_businesses(store: &dyn Store, mut query: BusinessQuery) -> AppResult<Vec<Business>> {
    query.limit = Some(page_limit(query.limit, BUSINESS_LIST_LIMIT)?.min(BUSINESS_LIST_LIMIT));
    store.list_businesses(&query).await
}

pub async fn get_business(store: &dyn Store, id: Uuid) -> AppResult<Business> {
    store
        .find_business(id)
        .await?
        .ok_or_else(|| AppError::not_found("Business"))
}

pub async fn my_business(store: &dyn Store, caller: &User) -> AppResult<Business> {
    get_business(store, access::require_business(caller)?).await
}

/// Items of the caller's own business.
pub async fn business_items(store: &dyn Store, caller: &User) -> AppResult<Vec<Item>> {
    let business_id = access::require_business(caller)?;
    store
        .list_items(&ItemQuery {
            business_id: Some(business_id),
            ..Default::default()
        })
        .await
}

pub async fn update_owned_item(
    store: &dyn Store,
    caller: &User,
    item_id: Uuid,
    patch: &ItemPatch,
) -> AppResult<Item> {
    let item = access::owned_item(store, caller, item_id).await?;
    if patch.is_empty() {
        return Ok(item);
    }
    if let Some(name) = &patch.name {
        required_name(name)?;
    }
    store
        .update_item(item_id, patch)
        .await?
        .ok_or_else(|| AppError::not_found("Item"))
}

/// Delete an owned item together with its variants and every review of it.
pub async fn delete_owned_item(store: &dyn Store, caller: &User, item_id: Uuid) -> AppResult<()> {
    access::owned_item(store, caller, item_id).await?;
    let reviews = store.delete_reviews_for_item(item_id).await?;
    let variants = store.delete_variants_for_item(item_id).await?;
    store.delete_item(item_id).await?;
    info!(%item_id, variants, reviews, "item deleted");
    Ok(())
}

pub async fn owned_item_variants(store: &dyn Store, caller: &User, item_id: Uuid) -> AppResult<Vec<Variant>> {
    access::owned_item(store, caller, item_id).await?;
    list_variants(store, item_id).await
}

pub async fn update_owned_variant(
    store: &dyn Store,
    caller: &User,
    variant_id: Uuid,
    patch: &VariantPatch,
) -> AppResult<Variant> {
    let variant = access::owned_variant(store, caller, variant_id).await?;
    if patch.is_empty() {
        return Ok(variant);
    }
    if let Some(name) = &patch.name {
        required_name(name)?;
    }
    store
        .update_variant(variant_id, patch)
        .await?
        .ok_or_else(|| AppError::not_found("Variant"))
}

pub async fn delete_owned_variant(store: &dyn Store, caller: &User, variant_id: Uuid) -> AppResult<()> {
    access::owned_variant(store, caller, variant_id).await?;
    let reviews = store.delete_reviews_for_variant(variant_id).await?;
    store.delete_variant(variant_id).await?;
    info!(%variant_id, reviews, "variant deleted");
    Ok(())
}
