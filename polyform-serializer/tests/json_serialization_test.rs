use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::Result;
use serde_json::{json, Value};

use polyform_serializer::{
    impl_string_scalar, io, load, register_type, save, AnyShared, ArchiveError, CanonicalString,
    Enumerated, Polymorphic, Reflect, Shared, Timestamp, Unique, Variant, CLASS_NAME, EMPTY_NAME,
};

#[derive(Reflect, Default, Debug, PartialEq)]
struct Instrument {
    d: f64,
}

#[derive(Reflect, Polymorphic, Default, Debug, PartialEq)]
struct NamedInstrument {
    #[reflect(base)]
    base: Instrument,
    n: String,
}

#[derive(Variant, Debug, PartialEq)]
enum Alternatives {
    Count(i32),
    Level(f32),
    Label(String),
}

#[derive(Enumerated, Debug, PartialEq)]
enum Side {
    Buy,
    Sell,
}

#[derive(Reflect, Default, Debug, PartialEq)]
#[reflect(initialize = "refresh")]
struct Window {
    start: f64,
    width: f64,
    #[reflect(skip)]
    end: f64,
}

impl Window {
    fn refresh(&mut self) -> polyform_serializer::Result<()> {
        self.end = self.start + self.width;
        Ok(())
    }
}

/// A tenor-like domain type whose whole archived form is one string.
#[derive(Debug, PartialEq, Clone, Default)]
struct Tenor {
    count: u32,
    unit: char,
}

impl CanonicalString for Tenor {
    fn to_canonical(&self) -> String {
        format!("{}{}", self.count, self.unit)
    }

    fn from_canonical(text: &str) -> polyform_serializer::Result<Self> {
        let unit = text
            .chars()
            .last()
            .filter(|c| c.is_ascii_alphabetic())
            .ok_or_else(|| ArchiveError::Decode(format!("bad tenor {text:?}")))?;
        let count = text[..text.len() - 1]
            .parse()
            .map_err(|_| ArchiveError::Decode(format!("bad tenor {text:?}")))?;
        Ok(Tenor { count, unit })
    }
}

impl_string_scalar!(Tenor);

fn register_fixtures() {
    static ONCE: std::sync::Once = std::sync::Once::new();
    ONCE.call_once(|| {
        register_type::<NamedInstrument>().expect("fixture registration");
    });
}

#[test]
fn string_round_trip() -> Result<()> {
    let mut buffer = Value::Null;
    save(&mut buffer, &"name".to_string())?;
    let back: String = load(&mut buffer)?;
    assert_eq!(back, "name");
    Ok(())
}

#[test]
fn pair_round_trip() -> Result<()> {
    let original = (1.0f32, 2.5f32);
    let mut buffer = Value::Null;
    save(&mut buffer, &original)?;
    let back: (f32, f32) = load(&mut buffer)?;
    assert_eq!(back, original);
    Ok(())
}

#[test]
fn vector_round_trip_with_expected_layout() -> Result<()> {
    let original: Vec<i32> = vec![1, 2, 4, 6, 8];
    let mut buffer = Value::Null;
    save(&mut buffer, &original)?;
    assert_eq!(buffer, json!([1, 2, 4, 6, 8]));

    let back: Vec<i32> = load(&mut buffer)?;
    assert_eq!(back, original);
    Ok(())
}

#[test]
fn set_round_trip() -> Result<()> {
    let original: BTreeSet<i32> = [1, 2, 3, 4, 5].into_iter().collect();
    let mut buffer = Value::Null;
    save(&mut buffer, &original)?;
    let back: BTreeSet<i32> = load(&mut buffer)?;
    assert_eq!(back, original);
    Ok(())
}

#[test]
fn array_round_trip() -> Result<()> {
    let original: [u32; 5] = [1, 2, 3, 4, 5];
    let mut buffer = Value::Null;
    save(&mut buffer, &original)?;
    let back: [u32; 5] = load(&mut buffer)?;
    assert_eq!(back, original);
    Ok(())
}

#[test]
fn map_round_trip_stores_flat_pairs() -> Result<()> {
    let mut original: BTreeMap<i64, i32> = BTreeMap::new();
    original.insert(1, 1);
    original.insert(2, 2);

    let mut buffer = Value::Null;
    save(&mut buffer, &original)?;
    assert_eq!(buffer, json!([1, 1, 2, 2]));

    let back: BTreeMap<i64, i32> = load(&mut buffer)?;
    assert_eq!(back, original);
    Ok(())
}

#[test]
fn unordered_map_round_trip() -> Result<()> {
    let mut original: HashMap<u64, f32> = HashMap::new();
    original.insert(1, 1.0);
    original.insert(2, 2.0);
    original.insert(3, 1.3);
    original.insert(4, 2.3);

    let mut buffer = Value::Null;
    save(&mut buffer, &original)?;
    let back: HashMap<u64, f32> = load(&mut buffer)?;
    assert_eq!(back, original);
    Ok(())
}

#[test]
fn unique_handle_round_trip() -> Result<()> {
    let original = Unique::new(Instrument { d: 5.6 });
    let mut buffer = Value::Null;
    save(&mut buffer, &original)?;
    let back: Unique<Instrument> = load(&mut buffer)?;
    assert_eq!(back.get().map(|i| i.d), Some(5.6));
    Ok(())
}

#[test]
fn shared_handle_round_trip() -> Result<()> {
    let original = Shared::new(Instrument { d: 6.7 });
    let mut buffer = Value::Null;
    save(&mut buffer, &original)?;
    let back: Shared<Instrument> = load(&mut buffer)?;
    assert_eq!(back.get().map(|i| i.d), Some(6.7));
    Ok(())
}

#[test]
fn null_shared_handle_round_trips_as_sentinel() -> Result<()> {
    let original: Shared<Instrument> = Shared::null();
    let mut buffer = Value::Null;
    save(&mut buffer, &original)?;
    assert_eq!(
        buffer.get(CLASS_NAME).and_then(Value::as_str),
        Some(EMPTY_NAME)
    );

    let back: Shared<Instrument> = load(&mut buffer)?;
    assert!(back.is_null());
    Ok(())
}

#[test]
fn derived_type_round_trips_through_a_file() -> Result<()> {
    register_fixtures();

    let original = AnyShared::new(NamedInstrument {
        base: Instrument { d: 6.7 },
        n: "me".to_string(),
    });
    let mut buffer = Value::Null;
    save(&mut buffer, &original)?;

    let class = buffer.get(CLASS_NAME).and_then(Value::as_str).unwrap();
    assert!(class.contains("NamedInstrument"));

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("named_instrument.json");
    io::write_json(&path, &buffer)?;
    let mut reread = io::read_json(&path)?;

    let loaded: AnyShared = load(&mut reread)?;
    let concrete = loaded
        .downcast::<NamedInstrument>()
        .expect("loaded handle downcasts to the concrete type");
    assert_eq!(concrete.base.d, 6.7);
    assert_eq!(concrete.n, "me");
    Ok(())
}

#[test]
fn null_any_shared_round_trips() -> Result<()> {
    register_fixtures();

    let mut buffer = Value::Null;
    save(&mut buffer, &AnyShared::null())?;
    let back: AnyShared = load(&mut buffer)?;
    assert!(back.is_null());
    Ok(())
}

#[test]
fn variant_round_trip_stores_index_and_value() -> Result<()> {
    let original = Alternatives::Level(6.5);
    let mut buffer = Value::Null;
    save(&mut buffer, &original)?;
    assert_eq!(buffer, json!({ "Index": 1, "Value": 6.5 }));

    let back: Alternatives = load(&mut buffer)?;
    assert_eq!(back, original);
    Ok(())
}

#[test]
fn optional_round_trip_layouts() -> Result<()> {
    let some = Some("Hello".to_string());
    let mut buffer = Value::Null;
    save(&mut buffer, &some)?;
    assert_eq!(buffer, json!([true, "Hello"]));
    let back: Option<String> = load(&mut buffer)?;
    assert_eq!(back, some);

    let none: Option<String> = None;
    let mut buffer = Value::Null;
    save(&mut buffer, &none)?;
    assert_eq!(buffer, json!([false]));
    let back: Option<String> = load(&mut buffer)?;
    assert_eq!(back, none);
    Ok(())
}

#[test]
fn enumeration_stores_canonical_name() -> Result<()> {
    let mut buffer = Value::Null;
    save(&mut buffer, &Side::Sell)?;
    assert_eq!(buffer, json!("Sell"));
    let back: Side = load(&mut buffer)?;
    assert_eq!(back, Side::Sell);
    Ok(())
}

#[test]
fn timestamp_stores_numeric_form() -> Result<()> {
    let original = Timestamp(1_734_257_400.0);
    let mut buffer = Value::Null;
    save(&mut buffer, &original)?;
    assert!(buffer.is_number());
    let back: Timestamp = load(&mut buffer)?;
    assert_eq!(back, original);
    Ok(())
}

#[test]
fn tenor_like_domain_type_stores_its_canonical_string() -> Result<()> {
    let original = Tenor {
        count: 6,
        unit: 'M',
    };
    let mut buffer = Value::Null;
    save(&mut buffer, &original)?;
    assert_eq!(buffer, json!("6M"));

    let back: Tenor = load(&mut buffer)?;
    assert_eq!(back, original);
    Ok(())
}

#[test]
fn initialize_recomputes_skipped_members() -> Result<()> {
    let mut original = Window {
        start: 10.0,
        width: 2.5,
        end: 0.0,
    };
    original.refresh().unwrap();

    let mut buffer = Value::Null;
    save(&mut buffer, &original)?;
    // the skipped member is absent from the archive
    assert!(buffer.get("end").is_none());
    assert!(buffer.get("start").is_some());

    let back: Window = load(&mut buffer)?;
    assert_eq!(back.end, 12.5);
    Ok(())
}

#[test]
fn descriptor_lists_parent_members_first() {
    let names: Vec<_> = NamedInstrument::descriptor()
        .members()
        .iter()
        .map(|member| member.name)
        .collect();
    assert_eq!(names, vec!["d", "n"]);
}

#[test]
fn polymorphic_reports_its_concrete_name() {
    let value = NamedInstrument::default();
    assert!(Polymorphic::type_name(&value).contains("NamedInstrument"));
}
