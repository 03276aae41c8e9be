//! Shared schema used by the unit tests.

use crate::schema::{AssociationSchema, EntitySchema, Schema};

/// `Item` belongs to an `Owner` and to a `Category` (composite key); `Owner` belongs to a
/// `Company`, which makes `owner.company.name` a two-hop path.
pub fn item_schema() -> Schema {
    Schema::from_entities([
        (
            "Item".to_string(),
            EntitySchema::new("items")
                .field("id")
                .field("name")
                .field("age")
                .field("created_at")
                .column("deleted", "deleted_at")
                .association("owner", AssociationSchema::new("Owner", ["id"], ["owner_id"]))
                .association(
                    "category",
                    AssociationSchema::new("Category", ["id", "tenant_id"], ["category_id", "tenant_id"]),
                ),
        ),
        (
            "Owner".to_string(),
            EntitySchema::new("owners")
                .field("id")
                .field("name")
                .field("city")
                .association("company", AssociationSchema::new("Company", ["id"], ["company_id"])),
        ),
        (
            "Category".to_string(),
            EntitySchema::new("categories").field("id").field("title"),
        ),
        (
            "Company".to_string(),
            EntitySchema::new("companies").field("id").field("name"),
        ),
    ])
    .expect("fixture schema is valid")
}
