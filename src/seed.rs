//! Starter category tree.

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AppResult;
use crate::model::Category;
use crate::store::Store;

/// Presence of this root category means the seed already ran.
pub const SENTINEL_CATEGORY: &str = "Restaurants";

const FOOD_DIMENSIONS: [&str; 5] = ["taste", "portion", "freshness", "value", "consistency"];

struct SeedCategory {
    name: &'static str,
    description: &'static str,
    image_url: &'static str,
    dimensions: &'static [&'static str],
    tags: &'static [&'static str],
}

const ROOTS: [SeedCategory; 3] = [
    SeedCategory {
        name: SENTINEL_CATEGORY,
        description: "Food and dining establishments",
        image_url: "https://images.pexels.com/photos/11065504/pexels-photo-11065504.jpeg",
        dimensions: &FOOD_DIMENSIONS,
        tags: &["fresh", "authentic", "spicy", "worth-price", "would-recommend"],
    },
    SeedCategory {
        name: "Electronics",
        description: "Tech products and gadgets",
        image_url: "https://images.pexels.com/photos/3496992/pexels-photo-3496992.jpeg",
        dimensions: &["quality", "performance", "value", "durability", "features"],
        tags: &["reliable", "fast", "premium", "worth-price", "would-recommend"],
    },
    SeedCategory {
        name: "Hotels",
        description: "Accommodation and hospitality",
        image_url: "https://images.pexels.com/photos/3434997/pexels-photo-3434997.jpeg",
        dimensions: &["cleanliness", "comfort", "service", "location", "value"],
        tags: &["clean", "comfortable", "friendly-staff", "great-location", "would-recommend"],
    },
];

/// Children of the sentinel root.
const RESTAURANT_CHILDREN: [SeedCategory; 2] = [
    SeedCategory {
        name: "Indian Cuisine",
        description: "Traditional Indian dishes",
        image_url: "https://images.pexels.com/photos/2474661/pexels-photo-2474661.jpeg",
        dimensions: &FOOD_DIMENSIONS,
        tags: &["spicy", "authentic", "vegetarian", "non-vegetarian"],
    },
    SeedCategory {
        name: "Italian Cuisine",
        description: "Italian and Mediterranean dishes",
        image_url: "https://images.pexels.com/photos/1279330/pexels-photo-1279330.jpeg",
        dimensions: &FOOD_DIMENSIONS,
        tags: &["authentic", "fresh-ingredients", "vegetarian", "seafood"],
    },
];

impl SeedCategory {
    fn build(&self, parent: Option<&Category>) -> Category {
        Category {
            id: Uuid::new_v4(),
            name: self.name.to_string(),
            description: Some(self.description.to_string()),
            parent_id: parent.map(|p| p.id),
            image_url: Some(self.image_url.to_string()),
            dimension_fields: self.dimensions.iter().map(|d| d.to_string()).collect(),
            tags: self.tags.iter().map(|t| t.to_string()).collect(),
            level: parent.map_or(0, |p| p.level + 1),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedOutcome {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<usize>,
}

/// Insert the starter tree unless the sentinel category already exists.
pub async fn seed(store: &dyn Store) -> AppResult<SeedOutcome> {
    if store.find_category_by_name(SENTINEL_CATEGORY).await?.is_some() {
        info!("seed skipped; categories already present");
        return Ok(SeedOutcome {
            message: "Data already seeded".into(),
            categories: None,
        });
    }

    let roots: Vec<Category> = ROOTS.iter().map(|c| c.build(None)).collect();
    store.insert_categories(&roots).await?;

    let restaurants = &roots[0];
    let children: Vec<Category> = RESTAURANT_CHILDREN
        .iter()
        .map(|c| c.build(Some(restaurants)))
        .collect();
    store.insert_categories(&children).await?;

    let total = roots.len() + children.len();
    info!(categories = total, "seed data inserted");
    Ok(SeedOutcome {
        message: "Data seeded successfully".into(),
        categories: Some(total),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CategoryScope, MemoryStore};

    #[tokio::test]
    async fn seeds_once() {
        let store = MemoryStore::new();
        let first = seed(&store).await.unwrap();
        assert_eq!(first.categories, Some(5));

        let second = seed(&store).await.unwrap();
        assert_eq!(second.message, "Data already seeded");
        assert_eq!(second.categories, None);

        let all = store.list_categories(CategoryScope::All, 500).await.unwrap();
        assert_eq!(all.len(), 5);

        let root = store
            .find_category_by_name(SENTINEL_CATEGORY)
            .await
            .unwrap()
            .unwrap();
        let children = store
            .list_categories(CategoryScope::ChildrenOf(root.id), 100)
            .await
            .unwrap();
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|c| c.level == 1));
    }
}
