use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Row};
use uuid::Uuid;

use super::{BusinessQuery, CategoryScope, ItemOrder, ItemQuery, ReviewQuery, ReviewSort, Store};
use crate::aggregation::RatingAggregate;
use crate::error::{AppError, AppResult};
use crate::model::{
    Business, Category, Item, ItemPatch, Review, Role, User, Variant, VariantPatch,
};
use crate::util::db::Db;

/// Postgres-backed store. Free-form maps live in JSONB, tag sets in TEXT[].
#[derive(Clone)]
pub struct PgStore {
    db: Db,
}

impl PgStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

/// ILIKE pattern matching `needle` literally anywhere in the column.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn user_from_row(r: &PgRow) -> AppResult<User> {
    let user_type: String = r.try_get("user_type")?;
    let role = user_type
        .parse::<Role>()
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
    Ok(User {
        id: r.try_get("id")?,
        email: r.try_get("email")?,
        password_hash: r.try_get("password_hash")?,
        name: r.try_get("name")?,
        role,
        business_id: r.try_get("business_id")?,
        review_count: r.try_get("review_count")?,
        created_at: r.try_get("created_at")?,
    })
}

fn category_from_row(r: &PgRow) -> AppResult<Category> {
    Ok(Category {
        id: r.try_get("id")?,
        name: r.try_get("name")?,
        description: r.try_get("description")?,
        parent_id: r.try_get("parent_id")?,
        image_url: r.try_get("image_url")?,
        dimension_fields: r.try_get("dimension_fields")?,
        tags: r.try_get("tags")?,
        level: r.try_get("level")?,
        created_at: r.try_get("created_at")?,
    })
}

fn item_from_row(r: &PgRow) -> AppResult<Item> {
    Ok(Item {
        id: r.try_get("id")?,
        name: r.try_get("name")?,
        description: r.try_get("description")?,
        category_id: r.try_get("category_id")?,
        business_id: r.try_get("business_id")?,
        image_url: r.try_get("image_url")?,
        price_range: r.try_get("price_range")?,
        tags: r.try_get("tags")?,
        avg_rating: r.try_get("avg_rating")?,
        review_count: r.try_get("review_count")?,
        created_at: r.try_get("created_at")?,
    })
}

fn variant_from_row(r: &PgRow) -> AppResult<Variant> {
    let attributes: Json<BTreeMap<String, String>> = r.try_get("attributes")?;
    let dimensional_ratings: Json<BTreeMap<String, f64>> = r.try_get("dimensional_ratings")?;
    Ok(Variant {
        id: r.try_get("id")?,
        name: r.try_get("name")?,
        item_id: r.try_get("item_id")?,
        attributes: attributes.0,
        price: r.try_get("price")?,
        avg_rating: r.try_get("avg_rating")?,
        review_count: r.try_get("review_count")?,
        dimensional_ratings: dimensional_ratings.0,
        created_at: r.try_get("created_at")?,
    })
}

fn review_from_row(r: &PgRow) -> AppResult<Review> {
    let dimensional_ratings: Json<BTreeMap<String, i32>> = r.try_get("dimensional_ratings")?;
    Ok(Review {
        id: r.try_get("id")?,
        user_id: r.try_get("user_id")?,
        user_name: r.try_get("user_name")?,
        variant_id: r.try_get("variant_id")?,
        item_id: r.try_get("item_id")?,
        overall_rating: r.try_get("overall_rating")?,
        dimensional_ratings: dimensional_ratings.0,
        tags: r.try_get("tags")?,
        short_review: r.try_get("short_review")?,
        full_review: r.try_get("full_review")?,
        helpful_count: r.try_get("helpful_count")?,
        verified: r.try_get("verified")?,
        created_at: r.try_get("created_at")?,
    })
}

fn business_from_row(r: &PgRow) -> AppResult<Business> {
    Ok(Business {
        id: r.try_get("id")?,
        name: r.try_get("name")?,
        description: r.try_get("description")?,
        owner_id: r.try_get("owner_id")?,
        category_id: r.try_get("category_id")?,
        location: r.try_get("location")?,
        image_url: r.try_get("image_url")?,
        avg_rating: r.try_get("avg_rating")?,
        review_count: r.try_get("review_count")?,
        created_at: r.try_get("created_at")?,
    })
}

fn collect<T>(rows: &[PgRow], map: fn(&PgRow) -> AppResult<T>) -> AppResult<Vec<T>> {
    rows.iter().map(map).collect()
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query_scalar::<_, bool>("SELECT true")
            .fetch_one(&self.db.pool)
            .await?;
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> AppResult<()> {
        let res = sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, name, user_type, business_id, review_count, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.business_id)
        .bind(user.review_count)
        .bind(user.created_at)
        .execute(&self.db.pool)
        .await;
        match res {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AppError::Conflict("Email already registered".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn increment_user_review_count(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE users SET review_count = review_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.db.pool)
            .await?;
        Ok(())
    }

    async fn set_user_business(&self, id: Uuid, business_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE users SET business_id = $2 WHERE id = $1")
            .bind(id)
            .bind(business_id)
            .execute(&self.db.pool)
            .await?;
        Ok(())
    }

    async fn insert_categories(&self, categories: &[Category]) -> AppResult<()> {
        if categories.is_empty() {
            return Ok(());
        }
        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO categories (id, name, description, parent_id, image_url, dimension_fields, tags, level, created_at) ",
        );
        qb.push_values(categories, |mut b, c| {
            b.push_bind(c.id)
                .push_bind(&c.name)
                .push_bind(&c.description)
                .push_bind(c.parent_id)
                .push_bind(&c.image_url)
                .push_bind(&c.dimension_fields)
                .push_bind(&c.tags)
                .push_bind(c.level)
                .push_bind(c.created_at);
        });
        qb.build().execute(&self.db.pool).await?;
        Ok(())
    }

    async fn find_category(&self, id: Uuid) -> AppResult<Option<Category>> {
        let row = sqlx::query("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn find_category_by_name(&self, name: &str) -> AppResult<Option<Category>> {
        let row = sqlx::query("SELECT * FROM categories WHERE name = $1 LIMIT 1")
            .bind(name)
            .fetch_optional(&self.db.pool)
            .await?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn list_categories(&self, scope: CategoryScope, limit: i64) -> AppResult<Vec<Category>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM categories");
        match scope {
            CategoryScope::Roots => {
                qb.push(" WHERE parent_id IS NULL");
            }
            CategoryScope::ChildrenOf(parent) => {
                qb.push(" WHERE parent_id = ").push_bind(parent);
            }
            CategoryScope::All => {}
        }
        qb.push(" ORDER BY created_at LIMIT ").push_bind(limit);
        let rows = qb.build().fetch_all(&self.db.pool).await?;
        collect(&rows, category_from_row)
    }

    async fn insert_item(&self, item: &Item) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO items (id, name, description, category_id, business_id, image_url, price_range, tags, avg_rating, review_count, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.category_id)
        .bind(item.business_id)
        .bind(&item.image_url)
        .bind(&item.price_range)
        .bind(&item.tags)
        .bind(item.avg_rating)
        .bind(item.review_count)
        .bind(item.created_at)
        .execute(&self.db.pool)
        .await?;
        Ok(())
    }

    async fn find_item(&self, id: Uuid) -> AppResult<Option<Item>> {
        let row = sqlx::query("SELECT * FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn list_items(&self, query: &ItemQuery) -> AppResult<Vec<Item>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM items WHERE TRUE");
        if let Some(category_id) = query.category_id {
            qb.push(" AND category_id = ").push_bind(category_id);
        }
        if let Some(business_id) = query.business_id {
            qb.push(" AND business_id = ").push_bind(business_id);
        }
        if let Some(min_rating) = query.min_rating {
            qb.push(" AND avg_rating >= ").push_bind(min_rating);
        }
        if let Some(search) = query.search.as_deref() {
            let pattern = like_pattern(search);
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR EXISTS (SELECT 1 FROM unnest(tags) AS t WHERE t ILIKE ")
                .push_bind(pattern)
                .push("))");
        }
        match query.order {
            ItemOrder::Rating => qb.push(" ORDER BY avg_rating DESC, created_at"),
            ItemOrder::Trending => qb.push(" ORDER BY review_count DESC, avg_rating DESC"),
        };
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }
        let rows = qb.build().fetch_all(&self.db.pool).await?;
        collect(&rows, item_from_row)
    }

    async fn update_item(&self, id: Uuid, patch: &ItemPatch) -> AppResult<Option<Item>> {
        let row = sqlx::query(
            r#"
            UPDATE items SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                image_url = COALESCE($4, image_url),
                price_range = COALESCE($5, price_range),
                tags = COALESCE($6, tags)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.description)
        .bind(&patch.image_url)
        .bind(&patch.price_range)
        .bind(&patch.tags)
        .fetch_optional(&self.db.pool)
        .await?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn set_item_aggregate(&self, id: Uuid, aggregate: &RatingAggregate) -> AppResult<()> {
        sqlx::query("UPDATE items SET avg_rating = $2, review_count = $3 WHERE id = $1")
            .bind(id)
            .bind(aggregate.avg_rating)
            .bind(aggregate.review_count)
            .execute(&self.db.pool)
            .await?;
        Ok(())
    }

    async fn delete_item(&self, id: Uuid) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.db.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn insert_variant(&self, variant: &Variant) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO variants (id, name, item_id, attributes, price, avg_rating, review_count, dimensional_ratings, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(variant.id)
        .bind(&variant.name)
        .bind(variant.item_id)
        .bind(Json(&variant.attributes))
        .bind(variant.price)
        .bind(variant.avg_rating)
        .bind(variant.review_count)
        .bind(Json(&variant.dimensional_ratings))
        .bind(variant.created_at)
        .execute(&self.db.pool)
        .await?;
        Ok(())
    }

    async fn find_variant(&self, id: Uuid) -> AppResult<Option<Variant>> {
        let row = sqlx::query("SELECT * FROM variants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await?;
        row.as_ref().map(variant_from_row).transpose()
    }

    async fn list_variants(&self, item_id: Uuid, limit: i64) -> AppResult<Vec<Variant>> {
        let rows = sqlx::query("SELECT * FROM variants WHERE item_id = $1 ORDER BY created_at LIMIT $2")
            .bind(item_id)
            .bind(limit)
            .fetch_all(&self.db.pool)
            .await?;
        collect(&rows, variant_from_row)
    }

    async fn update_variant(&self, id: Uuid, patch: &VariantPatch) -> AppResult<Option<Variant>> {
        let row = sqlx::query(
            r#"
            UPDATE variants SET
                name = COALESCE($2, name),
                attributes = COALESCE($3, attributes),
                price = COALESCE($4, price)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(patch.attributes.as_ref().map(Json))
        .bind(patch.price)
        .fetch_optional(&self.db.pool)
        .await?;
        row.as_ref().map(variant_from_row).transpose()
    }

    async fn set_variant_aggregate(
        &self,
        id: Uuid,
        aggregate: &RatingAggregate,
        dimensional_ratings: &BTreeMap<String, f64>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE variants SET avg_rating = $2, review_count = $3, dimensional_ratings = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(aggregate.avg_rating)
        .bind(aggregate.review_count)
        .bind(Json(dimensional_ratings))
        .execute(&self.db.pool)
        .await?;
        Ok(())
    }

    async fn delete_variant(&self, id: Uuid) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM variants WHERE id = $1")
            .bind(id)
            .execute(&self.db.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_variants_for_item(&self, item_id: Uuid) -> AppResult<u64> {
        let res = sqlx::query("DELETE FROM variants WHERE item_id = $1")
            .bind(item_id)
            .execute(&self.db.pool)
            .await?;
        Ok(res.rows_affected())
    }

    async fn insert_review(&self, review: &Review) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, user_id, user_name, variant_id, item_id, overall_rating, dimensional_ratings,
                                 tags, short_review, full_review, helpful_count, verified, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(review.id)
        .bind(review.user_id)
        .bind(&review.user_name)
        .bind(review.variant_id)
        .bind(review.item_id)
        .bind(review.overall_rating)
        .bind(Json(&review.dimensional_ratings))
        .bind(&review.tags)
        .bind(&review.short_review)
        .bind(&review.full_review)
        .bind(review.helpful_count)
        .bind(review.verified)
        .bind(review.created_at)
        .execute(&self.db.pool)
        .await?;
        Ok(())
    }

    async fn list_reviews(&self, query: &ReviewQuery) -> AppResult<Vec<Review>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM reviews WHERE TRUE");
        if let Some(variant_id) = query.variant_id {
            qb.push(" AND variant_id = ").push_bind(variant_id);
        }
        if let Some(item_id) = query.item_id {
            qb.push(" AND item_id = ").push_bind(item_id);
        }
        if let Some(item_ids) = &query.item_ids {
            qb.push(" AND item_id = ANY(").push_bind(item_ids.clone()).push(")");
        }
        if let Some(user_id) = query.user_id {
            qb.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(min_rating) = query.min_rating {
            qb.push(" AND overall_rating >= ").push_bind(min_rating);
        }
        qb.push(match query.sort {
            ReviewSort::Recent => " ORDER BY created_at DESC",
            ReviewSort::Helpful => " ORDER BY helpful_count DESC, created_at DESC",
            ReviewSort::Rating => " ORDER BY overall_rating DESC, created_at DESC",
        });
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }
        let rows = qb.build().fetch_all(&self.db.pool).await?;
        collect(&rows, review_from_row)
    }

    async fn increment_helpful(&self, id: Uuid) -> AppResult<bool> {
        let res = sqlx::query("UPDATE reviews SET helpful_count = helpful_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.db.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_reviews_for_item(&self, item_id: Uuid) -> AppResult<u64> {
        let res = sqlx::query("DELETE FROM reviews WHERE item_id = $1")
            .bind(item_id)
            .execute(&self.db.pool)
            .await?;
        Ok(res.rows_affected())
    }

    async fn delete_reviews_for_variant(&self, variant_id: Uuid) -> AppResult<u64> {
        let res = sqlx::query("DELETE FROM reviews WHERE variant_id = $1")
            .bind(variant_id)
            .execute(&self.db.pool)
            .await?;
        Ok(res.rows_affected())
    }

    async fn insert_business(&self, business: &Business) -> AppResult<()> {
        let res = sqlx::query(
            r#"
            INSERT INTO businesses (id, name, description, owner_id, category_id, location, image_url, avg_rating, review_count, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(business.id)
        .bind(&business.name)
        .bind(&business.description)
        .bind(business.owner_id)
        .bind(business.category_id)
        .bind(&business.location)
        .bind(&business.image_url)
        .bind(business.avg_rating)
        .bind(business.review_count)
        .bind(business.created_at)
        .execute(&self.db.pool)
        .await;
        match res {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Conflict(
                "A business already exists for this account".into(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_business(&self, id: Uuid) -> AppResult<Option<Business>> {
        let row = sqlx::query("SELECT * FROM businesses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await?;
        row.as_ref().map(business_from_row).transpose()
    }

    async fn list_businesses(&self, query: &BusinessQuery) -> AppResult<Vec<Business>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM businesses WHERE TRUE");
        if let Some(category_id) = query.category_id {
            qb.push(" AND category_id = ").push_bind(category_id);
        }
        if let Some(search) = query.search.as_deref() {
            qb.push(" AND name ILIKE ").push_bind(like_pattern(search));
        }
        qb.push(" ORDER BY created_at");
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }
        let rows = qb.build().fetch_all(&self.db.pool).await?;
        collect(&rows, business_from_row)
    }

    async fn set_business_aggregate(
        &self,
        id: Uuid,
        aggregate: &RatingAggregate,
    ) -> AppResult<()> {
        sqlx::query("UPDATE businesses SET avg_rating = $2, review_count = $3 WHERE id = $1")
            .bind(id)
            .bind(aggregate.avg_rating)
            .bind(aggregate.review_count)
            .execute(&self.db.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::{Duration, Utc};

    use super::*;
    use crate::catalog;
    use crate::util::env::env_opt;

    /// `None` when `DATABASE_URL` is unset; these tests then pass vacuously.
    async fn test_store() -> Option<PgStore> {
        let url = env_opt("DATABASE_URL")?;
        let db = Db::connect(&url, 2).await.expect("connect DATABASE_URL");
        db.run_migrations(&Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"))
            .await
            .expect("migrations");
        Some(PgStore::new(db))
    }

    fn item(category_id: Uuid, name: &str, avg_rating: f64, review_count: i64) -> Item {
        Item {
            id: Uuid::new_v4(),
            name: name.into(),
            description: Some("house special".into()),
            category_id,
            business_id: None,
            image_url: None,
            price_range: None,
            tags: vec!["spicy".into()],
            avg_rating,
            review_count,
            created_at: Utc::now(),
        }
    }

    fn variant(item_id: Uuid) -> Variant {
        Variant {
            id: Uuid::new_v4(),
            name: "Full plate".into(),
            item_id,
            attributes: BTreeMap::from([("size".to_string(), "full".to_string())]),
            price: Some(240.0),
            avg_rating: 0.0,
            review_count: 0,
            dimensional_ratings: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    fn review(variant: &Variant, rating: i32, helpful: i64, age_minutes: i64) -> Review {
        Review {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            user_name: "Kavya".into(),
            variant_id: variant.id,
            item_id: variant.item_id,
            overall_rating: rating,
            dimensional_ratings: BTreeMap::from([("taste".to_string(), rating)]),
            tags: vec![],
            short_review: None,
            full_review: None,
            helpful_count: helpful,
            verified: false,
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    async fn item_filters_and_ordering(store: &PgStore) {
        let category_id = Uuid::new_v4();
        let low = item(category_id, "Dal Makhani", 3.5, 40);
        let high = item(category_id, "Paneer 50%_Off", 4.8, 2);
        store.insert_item(&low).await.unwrap();
        store.insert_item(&high).await.unwrap();
        store.insert_item(&item(Uuid::new_v4(), "Elsewhere", 5.0, 1)).await.unwrap();

        let by_rating = store
            .list_items(&ItemQuery {
                category_id: Some(category_id),
                ..Default::default()
            })
            .await
            .unwrap();
        let names: Vec<&str> = by_rating.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Paneer 50%_Off", "Dal Makhani"]);

        let trending = store
            .list_items(&ItemQuery {
                category_id: Some(category_id),
                order: ItemOrder::Trending,
                limit: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(trending.len(), 1);
        assert_eq!(trending[0].id, low.id);

        let min_rated = store
            .list_items(&ItemQuery {
                category_id: Some(category_id),
                min_rating: Some(4.0),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(min_rated.len(), 1);
        assert_eq!(min_rated[0].id, high.id);

        let literal = store
            .list_items(&ItemQuery {
                category_id: Some(category_id),
                search: Some("50%_".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(literal.len(), 1);

        let by_tag = store
            .list_items(&ItemQuery {
                category_id: Some(category_id),
                search: Some("SPIC".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_tag.len(), 2);
    }

    async fn sorted_ids(store: &PgStore, variant_id: Uuid, sort: ReviewSort) -> Vec<Uuid> {
        let query = ReviewQuery {
            sort,
            ..ReviewQuery::for_variant(variant_id)
        };
        store
            .list_reviews(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect()
    }

    async fn review_sort_orders(store: &PgStore) {
        let v = variant(Uuid::new_v4());
        store.insert_variant(&v).await.unwrap();
        let old_best = review(&v, 5, 0, 30);
        let helpful = review(&v, 2, 9, 20);
        let newest = review(&v, 3, 1, 0);
        for r in [&old_best, &helpful, &newest] {
            store.insert_review(r).await.unwrap();
        }

        assert_eq!(sorted_ids(store, v.id, ReviewSort::Recent).await, vec![newest.id, helpful.id, old_best.id]);
        assert_eq!(sorted_ids(store, v.id, ReviewSort::Helpful).await, vec![helpful.id, newest.id, old_best.id]);
        assert_eq!(sorted_ids(store, v.id, ReviewSort::Rating).await, vec![old_best.id, newest.id, helpful.id]);

        let stored = store.list_reviews(&ReviewQuery::for_variant(v.id)).await.unwrap();
        assert_eq!(stored[0].dimensional_ratings.get("taste"), Some(&3));
    }

    async fn item_delete_cascades(store: &PgStore) {
        let business_id = Uuid::new_v4();
        let mut doomed = item(Uuid::new_v4(), "Biryani", 0.0, 0);
        doomed.business_id = Some(business_id);
        store.insert_item(&doomed).await.unwrap();
        let v = variant(doomed.id);
        store.insert_variant(&v).await.unwrap();
        store.insert_review(&review(&v, 4, 0, 0)).await.unwrap();

        let owner = User {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", Uuid::new_v4()),
            password_hash: String::new(),
            name: "Owner".into(),
            role: Role::BusinessOwner,
            business_id: Some(business_id),
            review_count: 0,
            created_at: Utc::now(),
        };
        catalog::delete_owned_item(store, &owner, doomed.id).await.unwrap();

        assert!(store.find_item(doomed.id).await.unwrap().is_none());
        assert!(store.find_variant(v.id).await.unwrap().is_none());
        assert!(store
            .list_reviews(&ReviewQuery::for_item(doomed.id))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn postgres_queries_against_live_database() {
        let Some(store) = test_store().await else {
            return;
        };
        item_filters_and_ordering(&store).await;
        review_sort_orders(&store).await;
        item_delete_cascades(&store).await;
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("tikka"), "%tikka%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\x"), "%c:\\\\x%");
    }
}
