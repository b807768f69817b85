#[cfg(test)]
mod tests {
    use derivo::model::loader::{
        load_registry, load_registry_from_str, load_registry_from_value, Format, LoadError,
    };
    use derivo::model::{AssociationKind, Catalog, FieldKind};
    use serde_json::json;
    use std::path::Path;

    #[test]
    fn test_load_demo_registry() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/tasks.toml");
        let registry = load_registry(&path).unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.field_kind("Task", "name"), Some(FieldKind::Base));
        assert_eq!(registry.field_kind("Task", "Label"), Some(FieldKind::Derived));
        assert_eq!(registry.field_kind("Task", "missing"), None);

        let reviewer = registry.association("Task", "Person", Some("Reviewer")).unwrap();
        assert_eq!(reviewer.kind, AssociationKind::BelongsTo);
        // the unaliased association wins when no alias is given
        let owner = registry.association("Task", "Person", None).unwrap();
        assert_eq!(owner.effective_alias(), "Person");
    }

    #[test]
    fn test_load_json() {
        let registry = load_registry_from_str(
            r#"{
                "entities": [
                    { "name": "Person", "fields": [{ "name": "name" }] },
                    {
                        "name": "Task",
                        "associations": [{ "target": "Person", "as": "Owner", "kind": "belongs_to" }],
                        "fields": [
                            { "name": "name" },
                            { "name": "Label", "derived": { "attributes": "name", "include": ["Person"] } }
                        ]
                    }
                ]
            }"#,
            Format::Json,
        )
        .unwrap();

        assert!(registry.is_derived("Task", "Label"));
        // the only association to Person is found without its alias
        assert!(registry.association("Task", "Person", None).is_some());
        assert!(registry.association("Task", "Person", Some("Person")).is_none());
    }

    #[test]
    fn test_duplicate_entity_rejected() {
        let err = load_registry_from_value(json!({
            "entities": [{ "name": "Task" }, { "name": "Task" }]
        }))
        .unwrap_err();
        assert!(matches!(err, LoadError::DuplicateEntity { name } if name == "Task"));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = load_registry_from_value(json!({
            "entities": [{ "name": "Task", "fields": [{ "name": "name" }, { "name": "name" }] }]
        }))
        .unwrap_err();
        assert!(matches!(err, LoadError::DuplicateField { .. }));
    }

    #[test]
    fn test_invalid_names_rejected() {
        let err = load_registry_from_value(json!({
            "entities": [{ "name": "Task", "fields": [{ "name": "two words" }] }]
        }))
        .unwrap_err();
        assert!(matches!(err, LoadError::InvalidName { kind: "field", .. }));
    }

    #[test]
    fn test_unsupported_extension() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml.bak");
        let err = load_registry(&path).unwrap_err();
        assert!(matches!(err, LoadError::FileNotFound { .. }));

        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("DESIGN.md");
        let err = load_registry(&path).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedExtension { extension } if extension == "md"));
    }
}
