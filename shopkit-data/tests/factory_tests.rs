use shopkit_data::EntityFactory;
use shopkit_schema::{
    EntityDefinition, FieldSchema, FieldType, RelationKind, SchemaError, SchemaRegistry,
};
use shopkit_types::ApiContext;

fn make_registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    registry.add(
        "product",
        EntityDefinition::new("product")
            .with_field("id", FieldSchema::new(FieldType::Uuid).primary_key())
            .with_field("name", FieldSchema::new(FieldType::String))
            .with_field(
                "manufacturer",
                FieldSchema::association(RelationKind::ManyToOne, "product_manufacturer"),
            )
            .with_field(
                "categories",
                FieldSchema::association(RelationKind::ManyToMany, "category"),
            )
            .with_field(
                "crossSellings",
                FieldSchema::association(RelationKind::OneToMany, "product_cross_selling"),
            )
            .with_field(
                "swagCustomFeeds",
                FieldSchema::association(RelationKind::OneToMany, "swag_custom_feed")
                    .as_extension(),
            ),
    );
    registry
}

fn make_context() -> ApiContext {
    ApiContext::new("https://shop.example.com", "/api")
}

// ── Creation ─────────────────────────────────────────────────────

#[test]
fn created_entity_is_new_and_clean() {
    let entity = EntityFactory::new()
        .create(&make_registry(), "product", None, &make_context())
        .unwrap();

    assert!(entity.is_new());
    assert!(!entity.is_dirty());
    assert_eq!(entity.entity_type(), "product");
}

#[test]
fn generated_id_is_simple_hex() {
    let entity = EntityFactory::new()
        .create(&make_registry(), "product", None, &make_context())
        .unwrap();

    let id = entity.id();
    assert_eq!(id.len(), 32);
    assert_eq!(entity.get_str("id"), Some(id));
}

#[test]
fn explicit_id_is_kept() {
    let entity = EntityFactory::new()
        .create(
            &make_registry(),
            "product",
            Some("abc123".to_string()),
            &make_context(),
        )
        .unwrap();

    assert_eq!(entity.id(), "abc123");
}

#[test]
fn unknown_entity_fails_with_not_found() {
    let err = EntityFactory::new()
        .create(&make_registry(), "ghost", None, &make_context())
        .unwrap_err();

    assert!(matches!(err, SchemaError::NotFound(name) if name == "ghost"));
}

// ── Association collections ──────────────────────────────────────

#[test]
fn to_many_associations_are_pre_populated() {
    let entity = EntityFactory::new()
        .create(
            &make_registry(),
            "product",
            Some("p1".to_string()),
            &make_context(),
        )
        .unwrap();

    let categories = entity.get("categories").unwrap();
    let categories = categories.as_collection().unwrap();
    assert!(categories.is_empty());
    assert_eq!(categories.source(), "/product/p1/categories");
    assert_eq!(categories.entity_type(), "category");
    assert_eq!(categories.criteria().page(), Some(1));
    assert_eq!(categories.criteria().limit(), Some(10));

    let cross = entity.get("crossSellings").unwrap();
    assert_eq!(
        cross.as_collection().unwrap().source(),
        "/product/p1/crossSellings"
    );
}

#[test]
fn to_one_associations_are_not_pre_populated() {
    let entity = EntityFactory::new()
        .create(&make_registry(), "product", None, &make_context())
        .unwrap();

    assert!(entity.get("manufacturer").is_none());
}

#[test]
fn extension_collections_live_under_extensions() {
    let entity = EntityFactory::new()
        .create(
            &make_registry(),
            "product",
            Some("p1".to_string()),
            &make_context(),
        )
        .unwrap();

    let extensions = entity.get("extensions").unwrap();
    let extensions = extensions.as_map().unwrap().clone();

    let feed = extensions.get("swagCustomFeeds").unwrap();
    let feed = feed.as_collection().unwrap();
    assert_eq!(feed.source(), "/product/p1/extensions/swagCustomFeeds");
    assert_eq!(feed.entity_type(), "swag_custom_feed");

    // Extension collections are not top-level fields.
    assert!(entity.get("swagCustomFeeds").is_none());
}

#[test]
fn underscored_names_become_dashed_routes() {
    let mut registry = make_registry();
    registry.add(
        "product_manufacturer",
        EntityDefinition::new("product_manufacturer")
            .with_field("id", FieldSchema::new(FieldType::Uuid).primary_key())
            .with_field(
                "products",
                FieldSchema::association(RelationKind::OneToMany, "product"),
            ),
    );

    let entity = EntityFactory::new()
        .create(
            &registry,
            "product_manufacturer",
            Some("m1".to_string()),
            &make_context(),
        )
        .unwrap();

    let products = entity.get("products").unwrap();
    assert_eq!(
        products.as_collection().unwrap().source(),
        "/product-manufacturer/m1/products"
    );
}
