//! Handle caching and connection reuse across resolutions

mod common;

use common::{fields, tenant, CountingConnector};
use mesa_catalog::entities;
use mesa_core::document::Filter;
use mesa_data::{build_facade_with_connector, DataConfig, TenantDataFacade};
use serde_json::json;
use std::sync::Arc;

fn facade(connector: Arc<CountingConnector>) -> TenantDataFacade {
    build_facade_with_connector(connector, &DataConfig::default()).unwrap()
}

#[tokio::test]
async fn test_repeated_resolve_hits_cache() {
    let connector = CountingConnector::new();
    let facade = facade(connector.clone());

    let first = facade.resolve(&tenant("pizza-hut"), entities::ORDER).await.unwrap();
    let second = facade.resolve(&tenant("pizza-hut"), entities::ORDER).await.unwrap();

    // Same handle, no second connection.
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(connector.established(), 1);
}

#[tokio::test]
async fn test_entities_of_one_tenant_share_a_connection() {
    let connector = CountingConnector::new();
    let facade = facade(connector.clone());

    let t = tenant("pizza-hut");
    facade.orders(&t).await.unwrap();
    facade.menu_items(&t).await.unwrap();
    facade.tables(&t).await.unwrap();
    facade.customers(&t).await.unwrap();

    assert_eq!(connector.established(), 1);
    let stats = facade.stats();
    assert_eq!(stats.established, 1);
    assert_eq!(stats.reused, 3);
}

#[tokio::test]
async fn test_distinct_tenants_use_distinct_connections() {
    let connector = CountingConnector::new();
    let facade = facade(connector.clone());

    let pizza = facade.orders(&tenant("pizza-hut")).await.unwrap();
    let sushi = facade.orders(&tenant("sushi-bar")).await.unwrap();

    assert_eq!(connector.established(), 2);
    assert_eq!(pizza.tenant(), &tenant("pizza-hut"));
    assert_eq!(sushi.tenant(), &tenant("sushi-bar"));
}

#[tokio::test]
async fn test_handle_supports_full_document_lifecycle() {
    let connector = CountingConnector::new();
    let facade = facade(connector.clone());

    let customers = facade.customers(&tenant("pizza-hut")).await.unwrap();
    let doc = customers
        .insert(fields(json!({ "name": "Asha", "phone": "555-0101" })))
        .await
        .unwrap();

    let found = customers
        .find(&Filter::new().field_eq("phone", json!("555-0101")))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, doc.id);

    let updated = customers
        .update(doc.id, fields(json!({ "loyalty_points": 25 })))
        .await
        .unwrap();
    assert_eq!(updated.get("loyalty_points"), Some(&json!(25)));

    customers.delete(doc.id).await.unwrap();
    assert_eq!(customers.count(&Filter::new()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_schema_shared_across_tenants() {
    let connector = CountingConnector::new();
    let facade = facade(connector.clone());

    let a = facade.orders(&tenant("pizza-hut")).await.unwrap();
    let b = facade.orders(&tenant("sushi-bar")).await.unwrap();

    // Same definition object regardless of tenant.
    assert_eq!(a.schema().entity, b.schema().entity);
    assert_eq!(
        a.schema().fields.keys().collect::<Vec<_>>(),
        b.schema().fields.keys().collect::<Vec<_>>()
    );
}
