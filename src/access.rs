//! Ownership rules: a business owns its items, an item owns its variants.

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::model::{Item, Role, User, Variant};
use crate::store::Store;

/// The caller's business id, or NotFound when the account has none.
pub fn require_business(user: &User) -> AppResult<Uuid> {
    user.business_id
        .ok_or_else(|| AppError::NotFound("No business associated with this account".into()))
}

pub fn require_business_owner(user: &User) -> AppResult<()> {
    if user.role == Role::BusinessOwner {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only business owners can perform this action".into(),
        ))
    }
}

pub fn owns_item(user: &User, item: &Item) -> bool {
    matches!((user.business_id, item.business_id), (Some(mine), Some(theirs)) if mine == theirs)
}

pub fn ensure_owns_item(user: &User, item: &Item) -> AppResult<()> {
    if owns_item(user, item) {
        Ok(())
    } else {
        Err(AppError::Forbidden("You don't own this item".into()))
    }
}

/// Load an item and check the caller owns it.
pub async fn owned_item(store: &dyn Store, user: &User, item_id: Uuid) -> AppResult<Item> {
    let item = store
        .find_item(item_id)
        .await?
        .ok_or_else(|| AppError::not_found("Item"))?;
    ensure_owns_item(user, &item)?;
    Ok(item)
}

/// Load a variant and check the caller owns its parent item.
pub async fn owned_variant(
    store: &dyn Store,
    user: &User,
    variant_id: Uuid,
) -> AppResult<Variant> {
    let variant = store
        .find_variant(variant_id)
        .await?
        .ok_or_else(|| AppError::not_found("Variant"))?;
    owned_item(store, user, variant.item_id).await?;
    Ok(variant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(business_id: Option<Uuid>) -> User {
        User {
            id: Uuid::new_v4(),
            email: "owner@example.com".into(),
            password_hash: String::new(),
            name: "Anil".into(),
            role: Role::BusinessOwner,
            business_id,
            review_count: 0,
            created_at: Utc::now(),
        }
    }

    fn item(business_id: Option<Uuid>) -> Item {
        Item {
            id: Uuid::new_v4(),
            name: "Samosa".into(),
            description: None,
            category_id: Uuid::new_v4(),
            business_id,
            image_url: None,
            price_range: None,
            tags: vec![],
            avg_rating: 0.0,
            review_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn ownership_requires_matching_business() {
        let biz = Uuid::new_v4();
        assert!(owns_item(&user(Some(biz)), &item(Some(biz))));
        assert!(!owns_item(&user(Some(biz)), &item(Some(Uuid::new_v4()))));
        assert!(!owns_item(&user(None), &item(None)));
        assert!(!owns_item(&user(Some(biz)), &item(None)));
        assert!(matches!(
            ensure_owns_item(&user(None), &item(Some(biz))),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn customers_are_not_business_owners() {
        let mut u = user(None);
        u.role = Role::Customer;
        assert!(matches!(require_business_owner(&u), Err(AppError::Forbidden(_))));
        assert!(matches!(require_business(&u), Err(AppError::NotFound(_))));
    }
}
