use serde_json::json;
use shopkit_data::{
    ChangesetGenerator, Criteria, Entity, EntityCollection, EntityFactory, EntityRef, FieldValue,
};
use shopkit_schema::{EntityDefinition, FieldSchema, FieldType, RelationKind, SchemaRegistry};
use shopkit_types::ApiContext;
use std::collections::BTreeMap;

fn make_registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    registry.add(
        "product",
        EntityDefinition::new("product")
            .with_field("id", FieldSchema::new(FieldType::Uuid).primary_key())
            .with_field("name", FieldSchema::new(FieldType::String))
            .with_field("stock", FieldSchema::new(FieldType::Int))
            .with_field("slotConfig", FieldSchema::new(FieldType::JsonObject))
            .with_field(
                "childCount",
                FieldSchema {
                    read_only: true,
                    ..FieldSchema::new(FieldType::Int)
                },
            )
            .with_field(
                "manufacturer",
                FieldSchema::association(RelationKind::ManyToOne, "product_manufacturer"),
            )
            .with_field(
                "categories",
                FieldSchema::association(RelationKind::ManyToMany, "category"),
            ),
    );
    registry.add(
        "category",
        EntityDefinition::new("category")
            .with_field("id", FieldSchema::new(FieldType::Uuid).primary_key())
            .with_field("name", FieldSchema::new(FieldType::String)),
    );
    registry.add(
        "product_manufacturer",
        EntityDefinition::new("product_manufacturer")
            .with_field("id", FieldSchema::new(FieldType::Uuid).primary_key())
            .with_field("name", FieldSchema::new(FieldType::String)),
    );
    registry
}

fn make_context() -> ApiContext {
    ApiContext::new("https://shop.example.com", "/api")
}

fn make_category(id: &str, name: &str) -> EntityRef {
    let mut data: BTreeMap<String, FieldValue> = BTreeMap::new();
    data.insert("id".to_string(), FieldValue::Value(json!(id)));
    data.insert("name".to_string(), FieldValue::Value(json!(name)));
    EntityRef::new(Entity::from_data(id, "category", data))
}

/// A product as the hydrator would deliver it: clean, with a populated
/// categories collection.
fn make_product(id: &str, categories: Vec<EntityRef>) -> EntityRef {
    let mut collection = EntityCollection::new(
        format!("/product/{id}/categories"),
        "category",
        make_context(),
        Criteria::new(),
    );
    for category in categories {
        collection.add(category);
    }

    let mut data: BTreeMap<String, FieldValue> = BTreeMap::new();
    data.insert("id".to_string(), FieldValue::Value(json!(id)));
    data.insert("name".to_string(), FieldValue::Value(json!("Shirt")));
    data.insert("stock".to_string(), FieldValue::Value(json!(5)));
    data.insert(
        "slotConfig".to_string(),
        FieldValue::Value(json!({ "layout": ["a", "b"] })),
    );
    data.insert("categories".to_string(), FieldValue::Collection(collection));
    EntityRef::new(Entity::from_data(id, "product", data))
}

// ── No changes ───────────────────────────────────────────────────

#[test]
fn unmutated_entity_yields_null_changes() {
    let product = make_product("p1", vec![make_category("c1", "Men")]);

    let changeset = ChangesetGenerator::new()
        .generate(&product, &make_registry())
        .unwrap();

    assert!(changeset.changes.is_none());
    assert!(changeset.deletion_queue.is_empty());
    assert!(changeset.is_empty());
}

#[test]
fn freshly_created_entity_yields_null_changes() {
    let product = EntityFactory::new()
        .create(&make_registry(), "product", None, &make_context())
        .unwrap();

    let changeset = ChangesetGenerator::new()
        .generate(&product, &make_registry())
        .unwrap();

    assert!(changeset.changes.is_none());
    assert!(changeset.deletion_queue.is_empty());
}

// ── Scalar & json diffs ──────────────────────────────────────────

#[test]
fn scalar_change_contains_exactly_that_field() {
    let product = make_product("p1", vec![]);
    product.set("name", "Jacket");

    let changeset = ChangesetGenerator::new()
        .generate(&product, &make_registry())
        .unwrap();

    let changes = changeset.changes.unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes.get("name"), Some(&json!("Jacket")));
}

#[test]
fn new_entity_change_includes_primary_key() {
    let product = EntityFactory::new()
        .create(
            &make_registry(),
            "product",
            Some("p9".to_string()),
            &make_context(),
        )
        .unwrap();
    product.set("name", "Jacket");

    let changes = ChangesetGenerator::new()
        .generate(&product, &make_registry())
        .unwrap()
        .changes
        .unwrap();

    assert_eq!(changes.len(), 2);
    assert_eq!(changes.get("name"), Some(&json!("Jacket")));
    assert_eq!(changes.get("id"), Some(&json!("p9")));
}

#[test]
fn setting_the_same_value_is_not_a_change() {
    let product = make_product("p1", vec![]);
    product.set("name", "Shirt");

    let changeset = ChangesetGenerator::new()
        .generate(&product, &make_registry())
        .unwrap();

    assert!(changeset.changes.is_none());
}

#[test]
fn json_fields_use_deep_equality() {
    let product = make_product("p1", vec![]);

    // Structurally identical value: no change.
    product.set("slotConfig", json!({ "layout": ["a", "b"] }));
    let changeset = ChangesetGenerator::new()
        .generate(&product, &make_registry())
        .unwrap();
    assert!(changeset.changes.is_none());

    // Nested difference: the whole value is sent.
    product.set("slotConfig", json!({ "layout": ["a", "c"] }));
    let changes = ChangesetGenerator::new()
        .generate(&product, &make_registry())
        .unwrap()
        .changes
        .unwrap();
    assert_eq!(
        changes.get("slotConfig"),
        Some(&json!({ "layout": ["a", "c"] }))
    );
}

#[test]
fn read_only_fields_are_never_diffed() {
    let product = make_product("p1", vec![]);
    product.set("childCount", 42i64);

    let changeset = ChangesetGenerator::new()
        .generate(&product, &make_registry())
        .unwrap();

    assert!(changeset.changes.is_none());
}

// ── To-one associations ──────────────────────────────────────────

#[test]
fn assigning_a_to_one_association_yields_its_reference() {
    let product = make_product("p1", vec![]);
    let manufacturer = EntityRef::new(Entity::from_data("m1", "product_manufacturer", {
        let mut data: BTreeMap<String, FieldValue> = BTreeMap::new();
        data.insert("id".to_string(), FieldValue::Value(json!("m1")));
        data
    }));

    product.set("manufacturer", manufacturer);

    let changes = ChangesetGenerator::new()
        .generate(&product, &make_registry())
        .unwrap()
        .changes
        .unwrap();

    assert_eq!(changes.get("manufacturer"), Some(&json!({ "id": "m1" })));
}

#[test]
fn unchanged_to_one_association_yields_nothing() {
    let manufacturer = EntityRef::new(Entity::from_data("m1", "product_manufacturer", {
        let mut data: BTreeMap<String, FieldValue> = BTreeMap::new();
        data.insert("id".to_string(), FieldValue::Value(json!("m1")));
        data
    }));
    let product = make_product("p1", vec![]);
    product.set("manufacturer", manufacturer);
    product.commit();

    let changeset = ChangesetGenerator::new()
        .generate(&product, &make_registry())
        .unwrap();

    assert!(changeset.changes.is_none());
}

#[test]
fn dirty_nested_to_one_association_yields_its_reference() {
    let manufacturer = EntityRef::new(Entity::from_data("m1", "product_manufacturer", {
        let mut data: BTreeMap<String, FieldValue> = BTreeMap::new();
        data.insert("id".to_string(), FieldValue::Value(json!("m1")));
        data.insert("name".to_string(), FieldValue::Value(json!("Acme")));
        data
    }));
    let product = make_product("p1", vec![]);
    product.set("manufacturer", manufacturer.clone());
    product.commit();

    manufacturer.set("name", "Acme GmbH");

    let changes = ChangesetGenerator::new()
        .generate(&product, &make_registry())
        .unwrap()
        .changes
        .unwrap();

    // Represented by the identifying reference, not the nested body.
    assert_eq!(changes.get("manufacturer"), Some(&json!({ "id": "m1" })));
}

// ── To-many associations ─────────────────────────────────────────

#[test]
fn added_member_contributes_its_primary_key() {
    let product = make_product("p1", vec![make_category("c1", "Men")]);
    let added = make_category("c2", "Women");
    product.with_collection("categories", |c| c.add(added));

    let changeset = ChangesetGenerator::new()
        .generate(&product, &make_registry())
        .unwrap();

    let changes = changeset.changes.unwrap();
    assert_eq!(changes.get("categories"), Some(&json!([{ "id": "c2" }])));
    assert!(changeset.deletion_queue.is_empty());
}

#[test]
fn added_new_member_carries_its_fields() {
    let product = make_product("p1", vec![]);
    let created = EntityFactory::new()
        .create(
            &make_registry(),
            "category",
            Some("c9".to_string()),
            &make_context(),
        )
        .unwrap();
    created.set("name", "Sale");
    product.with_collection("categories", |c| c.add(created));

    let changes = ChangesetGenerator::new()
        .generate(&product, &make_registry())
        .unwrap()
        .changes
        .unwrap();

    assert_eq!(
        changes.get("categories"),
        Some(&json!([{ "id": "c9", "name": "Sale" }]))
    );
}

#[test]
fn removed_member_queues_a_deletion() {
    let product = make_product("p1", vec![make_category("c1", "Men")]);
    product.with_collection("categories", |c| c.remove("c1"));

    let changeset = ChangesetGenerator::new()
        .generate(&product, &make_registry())
        .unwrap();

    assert!(changeset.changes.is_none());
    assert_eq!(changeset.deletion_queue.len(), 1);

    let deletion = &changeset.deletion_queue[0];
    assert_eq!(deletion.entity, "category");
    assert_eq!(deletion.route, "/product/p1/categories");
    assert_eq!(deletion.key, "c1");
    assert_eq!(deletion.primary.get("id"), Some(&json!("c1")));
}

#[test]
fn readding_a_removed_member_is_no_change() {
    let category = make_category("c1", "Men");
    let product = make_product("p1", vec![category.clone()]);

    product.with_collection("categories", |c| c.remove("c1"));
    product.with_collection("categories", |c| c.add(category));

    let changeset = ChangesetGenerator::new()
        .generate(&product, &make_registry())
        .unwrap();

    assert!(changeset.changes.is_none());
    assert!(changeset.deletion_queue.is_empty());
}

#[test]
fn kept_member_with_own_changes_contributes_an_entry() {
    let category = make_category("c1", "Men");
    let product = make_product("p1", vec![category.clone()]);

    category.set("name", "Menswear");

    let changes = ChangesetGenerator::new()
        .generate(&product, &make_registry())
        .unwrap()
        .changes
        .unwrap();

    assert_eq!(
        changes.get("categories"),
        Some(&json!([{ "id": "c1", "name": "Menswear" }]))
    );
}

// ── Cycles ───────────────────────────────────────────────────────

#[test]
fn cyclic_graph_generation_terminates() {
    let mut registry = make_registry();
    registry.add(
        "category",
        EntityDefinition::new("category")
            .with_field("id", FieldSchema::new(FieldType::Uuid).primary_key())
            .with_field("name", FieldSchema::new(FieldType::String))
            .with_field(
                "products",
                FieldSchema::association(RelationKind::ManyToMany, "product"),
            ),
    );

    let category = make_category("c1", "Men");
    let product = make_product("p1", vec![category.clone()]);

    let mut back_reference = EntityCollection::new(
        "/category/c1/products",
        "product",
        make_context(),
        Criteria::new(),
    );
    back_reference.add(product.clone());
    category.set("products", back_reference);
    category.commit();

    let changeset = ChangesetGenerator::new().generate(&product, &registry).unwrap();
    assert!(changeset.changes.is_none());
    assert!(changeset.deletion_queue.is_empty());
}

// ── Primary key data ─────────────────────────────────────────────

#[test]
fn primary_key_data_extracts_flagged_fields() {
    let product = make_product("p1", vec![]);
    let data = ChangesetGenerator::new()
        .get_primary_key_data(&product, &make_registry())
        .unwrap();

    assert_eq!(data.len(), 1);
    assert_eq!(data.get("id"), Some(&json!("p1")));
}

#[test]
fn primary_key_data_reads_the_draft() {
    let product = make_product("p1", vec![]);
    product.set("id", "p2");

    let data = ChangesetGenerator::new()
        .get_primary_key_data(&product, &make_registry())
        .unwrap();

    assert_eq!(data.get("id"), Some(&json!("p2")));
}

// ── Extensions ───────────────────────────────────────────────────

#[test]
fn extension_association_changes_nest_under_extensions() {
    let mut registry = make_registry();
    registry.add(
        "product",
        EntityDefinition::new("product")
            .with_field("id", FieldSchema::new(FieldType::Uuid).primary_key())
            .with_field("name", FieldSchema::new(FieldType::String))
            .with_field(
                "swagCustomFeeds",
                FieldSchema::association(RelationKind::OneToMany, "category").as_extension(),
            ),
    );

    let product = EntityFactory::new()
        .create(&registry, "product", Some("p1".to_string()), &make_context())
        .unwrap();
    let feed = make_category("c1", "Feed");

    product.with_extension_collection("swagCustomFeeds", |c| c.add(feed));

    let changes = ChangesetGenerator::new()
        .generate(&product, &registry)
        .unwrap()
        .changes
        .unwrap();

    let extensions = changes.get("extensions").unwrap();
    assert_eq!(
        extensions,
        &json!({ "swagCustomFeeds": [{ "id": "c1" }] })
    );
}

// ── Cross-cutting ────────────────────────────────────────────────

#[test]
fn generate_misses_schema_is_an_error() {
    let ghost = EntityRef::new(Entity::from_data("x1", "ghost", BTreeMap::new()));
    let err = ChangesetGenerator::new()
        .generate(&ghost, &make_registry())
        .unwrap_err();
    assert!(matches!(
        err,
        shopkit_schema::SchemaError::NotFound(name) if name == "ghost"
    ));
}

#[test]
fn commit_after_generate_clears_the_diff() {
    let product = make_product("p1", vec![]);
    product.set("name", "Jacket");
    product.set("stock", 9i64);

    let changeset = ChangesetGenerator::new()
        .generate(&product, &make_registry())
        .unwrap();
    assert_eq!(changeset.changes.as_ref().unwrap().len(), 2);

    product.commit();

    let changeset = ChangesetGenerator::new()
        .generate(&product, &make_registry())
        .unwrap();
    assert!(changeset.changes.is_none());
}
