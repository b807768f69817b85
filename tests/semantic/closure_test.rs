#[cfg(test)]
mod tests {
    use derivo::config::Limits;
    use derivo::model::{
        AssociationDefinition, Attribute, Catalog, DerivedDecl, Direction, EntityDefinition,
        FieldRef, OrderClause, Registry,
    };
    use derivo::semantic::closure::close_all;
    use derivo::semantic::{DependencyGraph, Edges};
    use derivo::{initialize_schema, initialize_schema_with, DeclarationError, SchemaError};
    use serde_json::json;

    fn decl(value: serde_json::Value) -> DerivedDecl {
        serde_json::from_value(value).unwrap()
    }

    fn attrs(names: &[&str]) -> Option<Vec<Attribute>> {
        Some(names.iter().map(|n| Attribute::field(*n)).collect())
    }

    fn task(fields: &[(&str, serde_json::Value)]) -> Registry {
        let mut entity = EntityDefinition::new("Task")
            .with_base("name")
            .with_base("x")
            .with_base("y");
        for (name, value) in fields {
            entity = entity.with_derived(*name, decl(value.clone()));
        }
        Registry::new().with_entity(entity)
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let registry = task(&[("F", json!({ "attributes": ["F"] }))]);
        let err = initialize_schema(&registry).unwrap_err();
        assert_eq!(
            err,
            SchemaError::CircularDependency {
                entity: "Task".into(),
                field: "F".into(),
                cycle: vec!["Task.F".into()],
            }
        );
    }

    #[test]
    fn test_long_cycle_is_detected() {
        let registry = task(&[
            ("A", json!({ "attributes": ["B"] })),
            ("B", json!({ "attributes": ["C"] })),
            ("C", json!({ "attributes": ["A"] })),
        ]);
        match initialize_schema(&registry).unwrap_err() {
            SchemaError::CircularDependency { entity, cycle, .. } => {
                assert_eq!(entity, "Task");
                let mut cycle = cycle;
                cycle.sort();
                assert_eq!(cycle, vec!["Task.A", "Task.B", "Task.C"]);
            }
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_order_reference_cycle_is_detected() {
        let registry = task(&[
            ("A", json!({ "order": ["B"] })),
            ("B", json!({ "order": ["A"] })),
        ]);
        let err = initialize_schema(&registry).unwrap_err();
        assert!(matches!(err, SchemaError::CircularDependency { .. }));
    }

    #[test]
    fn test_diamond_contributes_once() {
        let registry = task(&[
            ("C", json!({ "attributes": ["x"], "order": ["x"] })),
            ("A", json!({ "attributes": ["C", "y"] })),
            ("B", json!({ "attributes": ["C"] })),
            ("Top", json!({ "attributes": ["A", "B"] })),
        ]);
        let schema = initialize_schema(&registry).unwrap();

        let a = schema.requirements("Task", "A").unwrap();
        assert_eq!(a.attributes, attrs(&["y", "x"]));
        let b = schema.requirements("Task", "B").unwrap();
        assert_eq!(b.attributes, attrs(&["x"]));

        let top = schema.requirements("Task", "Top").unwrap();
        assert_eq!(top.attributes, attrs(&["y", "x"]));
        assert_eq!(top.order, vec![OrderClause::by("x", Direction::Asc)]);
    }

    #[test]
    fn test_closed_sets_hold_no_derived_attributes() {
        let registry = task(&[
            ("C", json!({ "attributes": ["x"] })),
            ("B", json!({ "attributes": ["C", "name"] })),
            ("A", json!({ "attributes": ["B"] })),
        ]);
        let schema = initialize_schema(&registry).unwrap();
        for (field, set) in schema.all_derived() {
            for name in set.field_names() {
                assert!(
                    !schema.is_derived(&field.entity, name),
                    "{} still references {}",
                    field,
                    name
                );
            }
        }
    }

    #[test]
    fn test_closure_is_idempotent() {
        let registry = task(&[
            ("C", json!({ "attributes": ["x"] })),
            ("B", json!({ "attributes": ["C", "name"], "order": [["y", "desc"]] })),
            ("A", json!({ "attributes": ["B"] })),
        ]);
        let schema = initialize_schema(&registry).unwrap();
        let mut derived = schema.all_derived().clone();

        let order = DependencyGraph::build(&registry, &derived, Edges::All)
            .processing_order()
            .unwrap();
        close_all(&registry, &order, &mut derived);
        assert_eq!(&derived, schema.all_derived());
    }

    #[test]
    fn test_order_substitution() {
        let registry = task(&[
            ("Label", json!({ "order": [["name", "DESC"]] })),
            ("Title", json!({ "order": [["Label"]] })),
        ]);
        let schema = initialize_schema(&registry).unwrap();
        let title = schema.requirements("Task", "Title").unwrap();
        assert_eq!(title.order, vec![OrderClause::by("name", Direction::Desc)]);
        let json = serde_json::to_value(&title.order).unwrap();
        assert_eq!(json, json!([["name", "DESC"]]));
    }

    #[test]
    fn test_descending_reference_keeps_inherited_direction() {
        let registry = task(&[
            ("Label", json!({ "order": [["name", "DESC"]] })),
            ("Title", json!({ "order": [["Label", "DESC"]] })),
        ]);
        let schema = initialize_schema(&registry).unwrap();
        let title = schema.requirements("Task", "Title").unwrap();
        assert_eq!(title.order, vec![OrderClause::by("name", Direction::Desc)]);
    }

    #[test]
    fn test_order_substitution_is_transitive_and_keeps_directions() {
        let registry = task(&[
            ("Label", json!({ "order": [["name", "DESC"], "x"] })),
            ("Title", json!({ "order": [["Label", "desc"]] })),
            ("Heading", json!({ "order": ["y", "Title"] })),
        ]);
        let schema = initialize_schema(&registry).unwrap();
        let heading = schema.requirements("Task", "Heading").unwrap();
        let rendered: Vec<String> = heading.order.iter().map(|o| o.to_string()).collect();
        assert_eq!(rendered, vec!["y ASC", "name DESC", "x ASC"]);
    }

    #[test]
    fn test_missing_order_clause() {
        let registry = task(&[
            ("Bare", json!({ "attributes": ["x"] })),
            ("Sorted", json!({ "order": ["Bare"] })),
        ]);
        let err = initialize_schema(&registry).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingOrderClause {
                entity: "Task".into(),
                field: "Bare".into(),
                referenced_by: "Task.Sorted".into(),
            }
        );
    }

    #[test]
    fn test_join_scoped_derived_fields_are_closed() {
        let registry = Registry::new()
            .with_entity(
                EntityDefinition::new("Person")
                    .with_base("first")
                    .with_base("last")
                    .with_derived(
                        "FullName",
                        decl(json!({ "attributes": ["first", "last"], "order": ["last"] })),
                    ),
            )
            .with_entity(
                EntityDefinition::new("Task")
                    .with_base("name")
                    .with_derived(
                        "Owner",
                        decl(json!({
                            "joins": [{ "target": "Person", "attributes": ["FullName"] }],
                            "order": [["Person", "FullName", "DESC"]]
                        })),
                    )
                    .with_association(AssociationDefinition::new("Person")),
            );
        let schema = initialize_schema(&registry).unwrap();
        let owner = schema.requirements("Task", "Owner").unwrap();

        insta::assert_snapshot!(
            owner.to_string(),
            @"[] +Person([first, last] order by last ASC) order by Person.last ASC"
        );
        assert_eq!(
            schema
                .requirements("Person", "FullName")
                .map(|s| s.attributes.clone()),
            Some(attrs(&["first", "last"]))
        );
        assert!(schema.requirements("Task", "name").is_none());
        assert!(schema.all_derived().contains_key(&FieldRef::new("Task", "Owner")));
    }

    #[test]
    fn test_join_depth_limit_applies_to_declarations() {
        let registry = Registry::new()
            .with_entity(EntityDefinition::new("Team").with_base("title"))
            .with_entity(
                EntityDefinition::new("Person")
                    .with_base("name")
                    .with_association(AssociationDefinition::new("Team")),
            )
            .with_entity(
                EntityDefinition::new("Task")
                    .with_base("name")
                    .with_derived(
                        "Deep",
                        decl(json!({ "joins": [{ "target": "Person", "joins": ["Team"] }] })),
                    )
                    .with_association(AssociationDefinition::new("Person")),
            );

        assert!(initialize_schema(&registry).is_ok());
        let err = initialize_schema_with(&registry, Limits { max_join_depth: 1 }).unwrap_err();
        assert!(matches!(
            err.declaration(),
            Some(DeclarationError::JoinDepthExceeded { limit: 1, .. })
        ));
    }
}
