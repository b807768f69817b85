#[cfg(test)]
mod tests {
    use derivo::config::Limits;
    use derivo::model::{
        AssociationDefinition, Attribute, DerivedDecl, EntityDefinition, JoinRef, OrderClause,
        OrderField, OrderPath, Registry,
    };
    use derivo::model::{Direction, FieldRef};
    use derivo::semantic::{register, register_all};
    use derivo::{DeclarationError, SchemaError};
    use serde_json::json;

    fn decl(value: serde_json::Value) -> DerivedDecl {
        serde_json::from_value(value).unwrap()
    }

    fn registry() -> Registry {
        Registry::new()
            .with_entity(EntityDefinition::new("Team").with_base("title"))
            .with_entity(
                EntityDefinition::new("Person")
                    .with_base("name")
                    .with_association(AssociationDefinition::new("Team")),
            )
            .with_entity(
                EntityDefinition::new("Task")
                    .with_base("name")
                    .with_base("PersonId")
                    .with_association(AssociationDefinition::new("Person"))
                    .with_association(AssociationDefinition::new("Person").with_alias("Owner")),
            )
    }

    fn register_task(value: serde_json::Value) -> Result<derivo::model::RequirementSet, SchemaError> {
        register(&registry(), "Task", "F", &decl(value), &Limits::default())
    }

    #[test]
    fn test_full_declaration_is_normalized() {
        let set = register_task(json!({
            "attributes": ["name", "name"],
            "joins": [
                "Person",
                { "model": "Person", "as": "Owner", "attributes": "name", "include": ["Team"] }
            ],
            "order": [
                "name",
                ["name", "Desc"],
                [{ "target": "Person", "as": "Owner" }, "Team", "title", "asc"],
                { "raw": "RANDOM()" }
            ]
        }))
        .unwrap();

        assert_eq!(set.attributes, Some(vec![Attribute::field("name")]));
        assert_eq!(set.joins.len(), 2);
        assert_eq!(set.joins[1].alias.as_deref(), Some("Owner"));
        assert_eq!(set.joins[1].requirements.joins[0].target, "Team");

        assert_eq!(
            set.order,
            vec![
                OrderClause::by("name", Direction::Asc),
                OrderClause::by("name", Direction::Desc),
                OrderClause::Path(OrderPath {
                    joins: vec![
                        JoinRef {
                            target: "Person".into(),
                            alias: Some("Owner".into()),
                        },
                        JoinRef::new("Team"),
                    ],
                    field: OrderField::Field("title".into()),
                    direction: Direction::Asc,
                }),
                OrderClause::Raw {
                    raw: "RANDOM()".into()
                },
            ]
        );
    }

    #[test]
    fn test_unknown_entity_in_join() {
        let err = register_task(json!({ "joins": ["Ghost"] })).unwrap_err();
        assert_eq!(
            err.declaration(),
            Some(&DeclarationError::UnknownEntity {
                name: "Ghost".into()
            })
        );
    }

    #[test]
    fn test_unknown_alias_is_invalid_association() {
        let err = register_task(json!({ "joins": [{ "target": "Person", "alias": "Boss" }] }))
            .unwrap_err();
        assert_eq!(
            err.declaration(),
            Some(&DeclarationError::InvalidAssociation {
                entity: "Task".into(),
                target: "Person".into(),
                alias: Some("Boss".into()),
            })
        );
    }

    #[test]
    fn test_malformed_join_object() {
        let err = register_task(json!({ "joins": [{ "to": "Person" }] })).unwrap_err();
        assert!(matches!(
            err.declaration(),
            Some(DeclarationError::InvalidJoin { .. })
        ));
    }

    #[test]
    fn test_unknown_field_in_nested_join() {
        let err = register_task(json!({
            "joins": [{ "target": "Person", "attributes": ["title"] }]
        }))
        .unwrap_err();
        assert_eq!(
            err.declaration(),
            Some(&DeclarationError::UnknownField {
                entity: "Person".into(),
                field: "title".into(),
            })
        );
    }

    #[test]
    fn test_unknown_direction_is_part_of_the_path() {
        let err = register_task(json!({ "order": [["Person", "name", "sideways"]] })).unwrap_err();
        // "sideways" is not a direction, so "name" becomes a join step
        assert_eq!(
            err.declaration(),
            Some(&DeclarationError::UnknownEntity {
                name: "name".into()
            })
        );
    }

    #[test]
    fn test_order_terminal_checked_on_resolved_parent() {
        let err = register_task(json!({ "order": [["Person", "Team", "name"]] })).unwrap_err();
        assert_eq!(
            err.declaration(),
            Some(&DeclarationError::UnknownField {
                entity: "Team".into(),
                field: "name".into(),
            })
        );
    }

    #[test]
    fn test_register_all_covers_every_entity() {
        let registry = Registry::new()
            .with_entity(
                EntityDefinition::new("Person")
                    .with_base("name")
                    .with_derived("Display", decl(json!({ "attributes": ["name"] }))),
            )
            .with_entity(
                EntityDefinition::new("Task")
                    .with_base("name")
                    .with_derived("Label", decl(json!({ "attributes": ["name"] }))),
            );
        let derived = register_all(&registry, &Limits::default()).unwrap();
        let keys: Vec<&FieldRef> = derived.keys().collect();
        assert_eq!(
            keys,
            vec![&FieldRef::new("Person", "Display"), &FieldRef::new("Task", "Label")]
        );
    }

    #[test]
    fn test_first_failure_aborts_registration() {
        let registry = Registry::new().with_entity(
            EntityDefinition::new("Task")
                .with_base("name")
                .with_derived("Good", decl(json!({ "attributes": ["name"] })))
                .with_derived("Bad", decl(json!({ "attributes": [7] }))),
        );
        let err = register_all(&registry, &Limits::default()).unwrap_err();
        assert!(matches!(err, SchemaError::Invalid { ref field, .. } if field == "Bad"));
    }
}
