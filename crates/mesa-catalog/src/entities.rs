//! Built-in restaurant entity definitions
//!
//! The entity set a restaurant backend works with: orders, menu data,
//! tables, CRM records, staff and inventory. Names are the logical entity
//! names callers pass to `resolve`; shapes are shared by every tenant.

use serde_json::json;

use mesa_core::schema::{FieldDefinition, FieldType, SchemaDefinition};
use mesa_core::Result;

use crate::catalog::SchemaCatalog;

pub const ORDER: &str = "Order";
pub const MENU_ITEM: &str = "MenuItem";
pub const MENU: &str = "Menu";
pub const TABLE: &str = "Table";
pub const CUSTOMER: &str = "Customer";
pub const CAMPAIGN: &str = "Campaign";
pub const REVIEW: &str = "Review";
pub const LOYALTY_SETTINGS: &str = "LoyaltySettings";
pub const STAFF: &str = "Staff";
pub const VARIATION: &str = "Variation";
pub const INVENTORY: &str = "Inventory";

fn order() -> SchemaDefinition {
    SchemaDefinition::new(ORDER)
        .field("order_number", FieldDefinition::new(FieldType::String))
        .field("table_number", FieldDefinition::new(FieldType::String))
        .field("items", FieldDefinition::new(FieldType::Array).required())
        .field(
            "status",
            FieldDefinition::new(FieldType::String)
                .one_of(vec![
                    json!("pending"),
                    json!("preparing"),
                    json!("ready"),
                    json!("served"),
                    json!("paid"),
                    json!("cancelled"),
                ])
                .with_default(json!("pending")),
        )
        .field(
            "total_amount",
            FieldDefinition::new(FieldType::Number).with_default(json!(0)),
        )
        .field("customer_name", FieldDefinition::new(FieldType::String))
        .field("customer_phone", FieldDefinition::new(FieldType::String))
        .field("notes", FieldDefinition::new(FieldType::String))
}

fn menu_item() -> SchemaDefinition {
    SchemaDefinition::new(MENU_ITEM)
        .field("name", FieldDefinition::new(FieldType::String).required())
        .field("category", FieldDefinition::new(FieldType::String))
        .field("price", FieldDefinition::new(FieldType::Number).required())
        .field("description", FieldDefinition::new(FieldType::String))
        .field("image_url", FieldDefinition::new(FieldType::String))
        .field("video_url", FieldDefinition::new(FieldType::String))
        .field(
            "time_to_prepare",
            FieldDefinition::new(FieldType::Number),
        )
        .field(
            "food_type",
            FieldDefinition::new(FieldType::String)
                .one_of(vec![json!("veg"), json!("non_veg"), json!("vegan")]),
        )
        .field(
            "addons",
            FieldDefinition::new(FieldType::Array).with_default(json!([])),
        )
        .field(
            "variations",
            FieldDefinition::new(FieldType::Array).with_default(json!([])),
        )
        .field(
            "available",
            FieldDefinition::new(FieldType::Boolean).with_default(json!(true)),
        )
}

fn menu() -> SchemaDefinition {
    SchemaDefinition::new(MENU)
        .field("name", FieldDefinition::new(FieldType::String).required())
        .field("description", FieldDefinition::new(FieldType::String))
        .field("category", FieldDefinition::new(FieldType::String))
        .field(
            "items",
            FieldDefinition::new(FieldType::Array).with_default(json!([])),
        )
        .field(
            "is_active",
            FieldDefinition::new(FieldType::Boolean).with_default(json!(true)),
        )
}

fn table() -> SchemaDefinition {
    SchemaDefinition::new(TABLE)
        .field(
            "table_number",
            FieldDefinition::new(FieldType::String).required(),
        )
        .field("capacity", FieldDefinition::new(FieldType::Number))
        .field("location", FieldDefinition::new(FieldType::String))
        .field(
            "status",
            FieldDefinition::new(FieldType::String)
                .one_of(vec![
                    json!("available"),
                    json!("occupied"),
                    json!("reserved"),
                ])
                .with_default(json!("available")),
        )
        .field(
            "is_active",
            FieldDefinition::new(FieldType::Boolean).with_default(json!(true)),
        )
}

fn customer() -> SchemaDefinition {
    SchemaDefinition::new(CUSTOMER)
        .field("name", FieldDefinition::new(FieldType::String).required())
        .field("phone", FieldDefinition::new(FieldType::String).required())
        .field("email", FieldDefinition::new(FieldType::String))
        .field("address", FieldDefinition::new(FieldType::String))
        .field(
            "total_orders",
            FieldDefinition::new(FieldType::Number).with_default(json!(0)),
        )
        .field(
            "total_spent",
            FieldDefinition::new(FieldType::Number).with_default(json!(0)),
        )
        .field(
            "loyalty_points",
            FieldDefinition::new(FieldType::Number).with_default(json!(0)),
        )
        .field(
            "redeemed_points",
            FieldDefinition::new(FieldType::Number).with_default(json!(0)),
        )
        .field("last_order_date", FieldDefinition::new(FieldType::Date))
}

fn campaign() -> SchemaDefinition {
    SchemaDefinition::new(CAMPAIGN)
        .field("name", FieldDefinition::new(FieldType::String).required())
        .field(
            "type",
            FieldDefinition::new(FieldType::String)
                .one_of(vec![json!("email"), json!("sms")])
                .required(),
        )
        .field("subject", FieldDefinition::new(FieldType::String))
        .field("message", FieldDefinition::new(FieldType::String).required())
        .field(
            "target_audience",
            FieldDefinition::new(FieldType::String)
                .one_of(vec![json!("all"), json!("vip"), json!("frequent")])
                .with_default(json!("all")),
        )
        .field(
            "min_spent",
            FieldDefinition::new(FieldType::Number).with_default(json!(0)),
        )
        .field(
            "min_orders",
            FieldDefinition::new(FieldType::Number).with_default(json!(0)),
        )
        .field(
            "status",
            FieldDefinition::new(FieldType::String)
                .one_of(vec![json!("draft"), json!("scheduled"), json!("sent")])
                .with_default(json!("draft")),
        )
        .field(
            "sent_count",
            FieldDefinition::new(FieldType::Number).with_default(json!(0)),
        )
        .field("sent_at", FieldDefinition::new(FieldType::Date))
}

fn review() -> SchemaDefinition {
    SchemaDefinition::new(REVIEW)
        .field(
            "customer_name",
            FieldDefinition::new(FieldType::String).required(),
        )
        .field("customer_id", FieldDefinition::new(FieldType::String))
        .field(
            "rating",
            FieldDefinition::new(FieldType::Number)
                .one_of(vec![json!(1), json!(2), json!(3), json!(4), json!(5)])
                .required(),
        )
        .field("comment", FieldDefinition::new(FieldType::String))
        .field("order_number", FieldDefinition::new(FieldType::String))
        .field(
            "status",
            FieldDefinition::new(FieldType::String)
                .one_of(vec![json!("pending"), json!("resolved")])
                .with_default(json!("pending")),
        )
}

fn loyalty_settings() -> SchemaDefinition {
    SchemaDefinition::new(LOYALTY_SETTINGS)
        .field(
            "points_per_rupee",
            FieldDefinition::new(FieldType::Number).with_default(json!(1)),
        )
        .field(
            "redeem_rate",
            FieldDefinition::new(FieldType::Number).with_default(json!(10)),
        )
}

fn staff() -> SchemaDefinition {
    SchemaDefinition::new(STAFF)
        .field("email", FieldDefinition::new(FieldType::String).required())
        .field("name", FieldDefinition::new(FieldType::String).required())
        .field(
            "role",
            FieldDefinition::new(FieldType::String)
                .one_of(vec![
                    json!("manager"),
                    json!("chef"),
                    json!("waiter"),
                    json!("cashier"),
                ])
                .required(),
        )
        .field(
            "permissions",
            FieldDefinition::new(FieldType::Array).with_default(json!([])),
        )
        .field("phone", FieldDefinition::new(FieldType::String))
        .field(
            "hourly_rate",
            FieldDefinition::new(FieldType::Number).with_default(json!(0)),
        )
        .field(
            "is_active",
            FieldDefinition::new(FieldType::Boolean).with_default(json!(true)),
        )
        .field(
            "shifts",
            FieldDefinition::new(FieldType::Array).with_default(json!([])),
        )
        .field("performance", FieldDefinition::new(FieldType::Object))
}

fn variation() -> SchemaDefinition {
    SchemaDefinition::new(VARIATION)
        .field("name", FieldDefinition::new(FieldType::String).required())
        .field("price", FieldDefinition::new(FieldType::Number).required())
        .field(
            "available",
            FieldDefinition::new(FieldType::Boolean).with_default(json!(true)),
        )
}

fn inventory() -> SchemaDefinition {
    SchemaDefinition::new(INVENTORY)
        .field("name", FieldDefinition::new(FieldType::String).required())
        .field("category", FieldDefinition::new(FieldType::String))
        .field(
            "current_stock",
            FieldDefinition::new(FieldType::Number).with_default(json!(0)),
        )
        .field(
            "min_stock",
            FieldDefinition::new(FieldType::Number).with_default(json!(0)),
        )
        .field("unit", FieldDefinition::new(FieldType::String))
        .field("cost_per_unit", FieldDefinition::new(FieldType::Number))
        .field("supplier", FieldDefinition::new(FieldType::String))
}

/// Build the catalog with every built-in restaurant entity registered.
///
/// # Errors
/// - `Error::Config` only if a definition above is registered twice, which
///   would be a bug in this module
pub fn default_catalog() -> Result<SchemaCatalog> {
    Ok(SchemaCatalog::builder()
        .register(order())?
        .register(menu_item())?
        .register(menu())?
        .register(table())?
        .register(customer())?
        .register(campaign())?
        .register(review())?
        .register(loyalty_settings())?
        .register(staff())?
        .register(variation())?
        .register(inventory())?
        .build())
}
