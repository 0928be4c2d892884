//! Domain records persisted by the [`Store`](crate::store::Store).
//!
//! Aggregate fields (`avg_rating`, `review_count`, `dimensional_ratings`) are
//! denormalized caches owned by [`crate::aggregation`]; nothing else writes them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    BusinessOwner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::BusinessOwner => "business_owner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "customer" => Ok(Role::Customer),
            "business_owner" => Ok(Role::BusinessOwner),
            other => Err(format!("unknown user type '{other}'")),
        }
    }
}

/// Registered account. Never serialized directly: the password hash stays server-side.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub business_id: Option<Uuid>,
    pub review_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub dimension_fields: Vec<String>,
    pub tags: Vec<String>,
    pub level: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Uuid,
    pub business_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub price_range: Option<String>,
    pub tags: Vec<String>,
    pub avg_rating: f64,
    pub review_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Variant {
    pub id: Uuid,
    pub name: String,
    pub item_id: Uuid,
    pub attributes: BTreeMap<String, String>,
    pub price: Option<f64>,
    pub avg_rating: f64,
    pub review_count: i64,
    pub dimensional_ratings: BTreeMap<String, f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub variant_id: Uuid,
    pub item_id: Uuid,
    pub overall_rating: i32,
    pub dimensional_ratings: BTreeMap<String, i32>,
    pub tags: Vec<String>,
    pub short_review: Option<String>,
    pub full_review: Option<String>,
    pub helpful_count: i64,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Business {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub category_id: Uuid,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub avg_rating: f64,
    pub review_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Partial update of an item; `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price_range: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.image_url.is_none()
            && self.price_range.is_none()
            && self.tags.is_none()
    }

    pub fn apply(&self, item: &mut Item) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(description) = &self.description {
            item.description = Some(description.clone());
        }
        if let Some(image_url) = &self.image_url {
            item.image_url = Some(image_url.clone());
        }
        if let Some(price_range) = &self.price_range {
            item.price_range = Some(price_range.clone());
        }
        if let Some(tags) = &self.tags {
            item.tags = tags.clone();
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VariantPatch {
    pub name: Option<String>,
    pub attributes: Option<BTreeMap<String, String>>,
    pub price: Option<f64>,
}

impl VariantPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.attributes.is_none() && self.price.is_none()
    }

    pub fn apply(&self, variant: &mut Variant) {
        if let Some(name) = &self.name {
            variant.name = name.clone();
        }
        if let Some(attributes) = &self.attributes {
            variant.attributes = attributes.clone();
        }
        if let Some(price) = self.price {
            variant.price = Some(price);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_known_values_only() {
        assert_eq!("customer".parse::<Role>(), Ok(Role::Customer));
        assert_eq!("business_owner".parse::<Role>(), Ok(Role::BusinessOwner));
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn item_patch_only_touches_supplied_fields() {
        let mut item = Item {
            id: Uuid::new_v4(),
            name: "Paneer Tikka".into(),
            description: Some("smoky".into()),
            category_id: Uuid::new_v4(),
            business_id: None,
            image_url: None,
            price_range: Some("$$".into()),
            tags: vec!["spicy".into()],
            avg_rating: 4.5,
            review_count: 2,
            created_at: Utc::now(),
        };
        let patch = ItemPatch {
            name: Some("Paneer Tikka Masala".into()),
            tags: Some(vec![]),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        patch.apply(&mut item);
        assert_eq!(item.name, "Paneer Tikka Masala");
        assert_eq!(item.description.as_deref(), Some("smoky"));
        assert_eq!(item.price_range.as_deref(), Some("$$"));
        assert!(item.tags.is_empty());
        assert_eq!(item.avg_rating, 4.5);
    }
}
