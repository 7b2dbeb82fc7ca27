//! Failure-path coverage: every error kind a malformed archive or misused
//! handle can produce.

use std::collections::HashMap;

use anyhow::Result;
use serde_json::{json, Value};

use polyform_serializer::{
    load, register_type, save, AnyShared, ArchiveError, ByteStream, Polymorphic, Reflect, Unique,
    Variant, XmlElement,
};

#[derive(Reflect, Default, Debug, PartialEq)]
struct Instrument {
    d: f64,
}

#[derive(Variant, Debug, PartialEq)]
enum Alternatives {
    Count(i32),
    Level(f32),
    Label(String),
}

#[test]
fn saving_a_null_unique_handle_fails() {
    let handle: Unique<Instrument> = Unique::null();

    let mut json_node = Value::Null;
    assert!(matches!(
        save(&mut json_node, &handle),
        Err(ArchiveError::NullPointer(_))
    ));

    let mut stream = ByteStream::new();
    assert!(matches!(
        save(&mut stream, &handle),
        Err(ArchiveError::NullPointer(_))
    ));
}

#[test]
fn variant_tag_beyond_arity_fails() {
    let mut node = json!({ "Index": 9, "Value": 1 });
    let result: polyform_serializer::Result<Alternatives> = load(&mut node);
    assert!(matches!(
        result,
        Err(ArchiveError::InvalidIndex { tag: 9, arity: 3 })
    ));
}

#[test]
fn variant_without_a_tag_fails() {
    let mut node = json!({ "Value": 1 });
    let result: polyform_serializer::Result<Alternatives> = load(&mut node);
    assert!(matches!(result, Err(ArchiveError::InvalidVariant(_))));
}

#[test]
fn fixed_array_size_mismatch_fails() {
    let mut node = json!([1, 2, 3]);
    let result: polyform_serializer::Result<[i32; 5]> = load(&mut node);
    assert!(matches!(
        result,
        Err(ArchiveError::SizeMismatch {
            expected: 5,
            found: 3
        })
    ));
}

#[test]
fn fixed_array_size_mismatch_fails_in_xml() -> Result<()> {
    let mut node = XmlElement::new("root");
    save(&mut node, &[1i32, 2, 3])?;
    let result: polyform_serializer::Result<[i32; 5]> = load(&mut node);
    assert!(matches!(result, Err(ArchiveError::SizeMismatch { .. })));
    Ok(())
}

#[test]
fn odd_length_map_archive_fails() {
    let mut node = json!([1, 1, 2]);
    let result: polyform_serializer::Result<HashMap<i64, i32>> = load(&mut node);
    assert!(matches!(
        result,
        Err(ArchiveError::SizeMismatch {
            expected: 4,
            found: 3
        })
    ));
}

#[test]
fn tuple_size_mismatch_fails() {
    let mut node = json!([1]);
    let result: polyform_serializer::Result<(i32, i32)> = load(&mut node);
    assert!(matches!(
        result,
        Err(ArchiveError::SizeMismatch {
            expected: 2,
            found: 1
        })
    ));
}

#[test]
fn empty_optional_archive_fails() {
    let mut node = json!([]);
    let result: polyform_serializer::Result<Option<String>> = load(&mut node);
    assert!(matches!(result, Err(ArchiveError::SizeMismatch { .. })));
}

#[test]
fn recursion_beyond_the_depth_cap_fails() {
    #[derive(Reflect, Default, Debug)]
    struct Chain {
        next: Option<Box<Chain>>,
    }

    let mut chain = Chain::default();
    for _ in 0..1100 {
        chain = Chain {
            next: Some(Box::new(chain)),
        };
    }

    let mut node = Value::Null;
    assert!(matches!(
        save(&mut node, &chain),
        Err(ArchiveError::RecursionLimit(_))
    ));
}

#[test]
fn recursion_through_the_registry_also_hits_the_cap() {
    #[derive(Reflect, Polymorphic, Default, Debug)]
    struct DeepLink {
        inner: AnyShared,
    }

    static ONCE: std::sync::Once = std::sync::Once::new();
    ONCE.call_once(|| {
        register_type::<DeepLink>().expect("registration");
    });

    let mut handle = AnyShared::null();
    for _ in 0..1100 {
        handle = AnyShared::new(DeepLink { inner: handle });
    }

    // the registry callbacks must carry the caller's depth, not restart it
    let mut node = Value::Null;
    assert!(matches!(
        save(&mut node, &handle),
        Err(ArchiveError::RecursionLimit(_))
    ));
}

#[test]
fn loading_a_reflectable_without_class_fails() {
    let mut node = json!({ "d": 1.5 });
    let result: polyform_serializer::Result<Instrument> = load(&mut node);
    assert!(matches!(result, Err(ArchiveError::MissingField(_))));
}

#[test]
fn unregistered_erased_handle_fails_on_save_and_load() {
    #[derive(Reflect, Polymorphic, Default, Debug)]
    struct Unregistered {
        v: i32,
    }

    let handle = AnyShared::new(Unregistered { v: 1 });
    let mut node = Value::Null;
    assert!(matches!(
        save(&mut node, &handle),
        Err(ArchiveError::RegistryNotFound(_))
    ));

    let mut forged = json!({ "Class": "nobody::Nowhere" });
    let result: polyform_serializer::Result<AnyShared> = load(&mut forged);
    assert!(matches!(result, Err(ArchiveError::RegistryNotFound(_))));
}

#[test]
fn duplicate_registration_is_rejected() {
    #[derive(Reflect, Polymorphic, Default, Debug)]
    struct Registered {
        v: i32,
    }

    register_type::<Registered>().expect("first registration");
    assert!(matches!(
        register_type::<Registered>(),
        Err(ArchiveError::DuplicateRegistration(_))
    ));
}

#[test]
fn malformed_scalar_payload_fails_with_decode() {
    let mut node = json!("not a number");
    let result: polyform_serializer::Result<i32> = load(&mut node);
    assert!(matches!(result, Err(ArchiveError::Decode(_))));
}

#[test]
fn truncated_byte_stream_fails_with_decode() {
    let mut stream = ByteStream::from_bytes(vec![5, 0, 0, 0, 1]);
    let result: polyform_serializer::Result<Vec<i32>> = load(&mut stream);
    assert!(matches!(result, Err(ArchiveError::Decode(_))));
}
