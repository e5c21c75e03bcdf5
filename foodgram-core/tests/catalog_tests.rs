//! Tags, ingredient import and user registration.

mod common;

use common::{staff, user};
use foodgram_core::catalog::{
    create_tag, get_ingredient, get_tag, import_ingredients, list_ingredients, list_tags, TagInput,
};
use foodgram_core::pagination::Page;
use foodgram_core::users::{get_user, list_users, register_user, RegisterUser};
use foodgram_core::{Actor, CoreError, MemoryStore};
use std::io::Write;
use tempfile::NamedTempFile;

fn tag_input(name: &str, color: &str, slug: &str) -> TagInput {
    TagInput {
        name: name.to_string(),
        color: color.to_string(),
        slug: slug.to_string(),
    }
}

fn registration(username: &str, email: &str) -> RegisterUser {
    RegisterUser {
        email: email.to_string(),
        username: username.to_string(),
        first_name: "Ann".to_string(),
        last_name: "Cook".to_string(),
    }
}

#[test]
fn only_staff_create_tags() {
    let mut store = MemoryStore::new();
    let cook = user(&mut store, "cook");
    let admin = staff(&mut store, "admin");
    let input = tag_input("Breakfast", "#E26C2D", "breakfast");

    assert!(matches!(
        create_tag(&mut store, &cook, &input),
        Err(CoreError::Permission(_))
    ));
    assert!(matches!(
        create_tag(&mut store, &Actor::Anonymous, &input),
        Err(CoreError::Permission(_))
    ));

    let created = create_tag(&mut store, &admin, &input).unwrap();
    assert_eq!(created.slug, "breakfast");
    assert_eq!(get_tag(&mut store, created.id).unwrap(), created);
    assert_eq!(list_tags(&mut store).unwrap(), vec![created]);
}

#[test]
fn tag_fields_are_validated_and_unique() {
    let mut store = MemoryStore::new();
    let admin = staff(&mut store, "admin");

    let err = create_tag(&mut store, &admin, &tag_input("Lunch", "green", "lunch")).unwrap_err();
    assert!(matches!(err, CoreError::Validation { ref field, .. } if field == "color"));

    let err = create_tag(&mut store, &admin, &tag_input("Lunch", "#49B64E", "lunch time"))
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { ref field, .. } if field == "slug"));

    create_tag(&mut store, &admin, &tag_input("Lunch", "#49B64E", "lunch")).unwrap();
    let err = create_tag(&mut store, &admin, &tag_input("Midday", "#49B64E", "lunch")).unwrap_err();
    assert_eq!(
        err,
        CoreError::Conflict("A tag with this slug already exists".to_string())
    );

    assert!(matches!(get_tag(&mut store, 424242), Err(CoreError::NotFound(_))));
}

#[test]
fn import_reads_json_file_and_skips_existing_pairs() {
    let mut store = MemoryStore::new();
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[
            {{"name": "salt", "measurement_unit": "g"}},
            {{"name": "Sugar", "measurement_unit": "g"}},
            {{"name": "sugar", "measurement_unit": "tbsp"}}
        ]"#
    )
    .unwrap();

    let inserted = import_ingredients(&mut store, file.reopen().unwrap()).unwrap();
    assert_eq!(inserted, 3);
    let again = import_ingredients(&mut store, file.reopen().unwrap()).unwrap();
    assert_eq!(again, 0);

    let sugar = list_ingredients(&mut store, Some("SUG")).unwrap();
    assert_eq!(sugar.len(), 2);
    assert!(sugar.iter().all(|i| i.name.to_lowercase() == "sugar"));
    assert_eq!(list_ingredients(&mut store, None).unwrap().len(), 3);

    let first = &sugar[0];
    assert_eq!(get_ingredient(&mut store, first.id).unwrap(), first.clone());
    assert!(matches!(
        get_ingredient(&mut store, 424242),
        Err(CoreError::NotFound(_))
    ));
}

#[test]
fn malformed_import_is_rejected() {
    let mut store = MemoryStore::new();
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{{\"name\": \"salt\"").unwrap();

    let err = import_ingredients(&mut store, file.reopen().unwrap()).unwrap_err();
    assert!(matches!(err, CoreError::Validation { ref field, .. } if field == "file"));
    assert!(list_ingredients(&mut store, None).unwrap().is_empty());
}

#[test]
fn registration_rejects_taken_identities() {
    let mut store = MemoryStore::new();
    let profile = register_user(&mut store, &registration("ann", "ann@example.com")).unwrap();
    assert_eq!(profile.username, "ann");
    assert!(!profile.is_subscribed);

    let err = register_user(&mut store, &registration("ann2", "ann@example.com")).unwrap_err();
    assert_eq!(
        err,
        CoreError::Conflict("A user with this email already exists".to_string())
    );
    let err = register_user(&mut store, &registration("ann", "other@example.com")).unwrap_err();
    assert_eq!(
        err,
        CoreError::Conflict("A user with this username already exists".to_string())
    );
}

#[test]
fn users_list_by_username() {
    let mut store = MemoryStore::new();
    register_user(&mut store, &registration("zed", "zed@example.com")).unwrap();
    let amy = register_user(&mut store, &registration("amy", "amy@example.com")).unwrap();

    let listed = list_users(&mut store, &Actor::Anonymous, Page::default()).unwrap();
    assert_eq!(listed.pagination.total, 2);
    let names: Vec<&str> = listed.users.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, vec!["amy", "zed"]);

    assert_eq!(get_user(&mut store, &Actor::Anonymous, amy.id).unwrap(), amy);
    assert!(matches!(
        get_user(&mut store, &Actor::Anonymous, 424242),
        Err(CoreError::NotFound(_))
    ));
}
