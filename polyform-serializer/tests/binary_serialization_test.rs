use std::collections::BTreeMap;

use anyhow::Result;

use polyform_serializer::{
    io, load, register_type, save, AnyShared, ByteStream, Enumerated, Polymorphic, Reflect,
    Shared, Timestamp, Unique, Variant,
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

fn register_fixtures() {
    static ONCE: std::sync::Once = std::sync::Once::new();
    ONCE.call_once(|| {
        register_type::<NamedInstrument>().expect("fixture registration");
    });
}

#[test]
fn vector_round_trip_with_count_prefix() -> Result<()> {
    let original: Vec<i32> = vec![1, 2, 4, 6, 8];
    let mut buffer = ByteStream::new();
    save(&mut buffer, &original)?;

    // u32 count followed by five i32 records
    assert_eq!(buffer.len(), 4 + 5 * 4);
    assert_eq!(&buffer.as_bytes()[..4], &5u32.to_le_bytes());

    let back: Vec<i32> = load(&mut buffer)?;
    assert_eq!(back, original);
    Ok(())
}

#[test]
fn map_round_trip_records_double_count() -> Result<()> {
    let mut original: BTreeMap<i64, i32> = BTreeMap::new();
    original.insert(1, 1);
    original.insert(2, 2);

    let mut buffer = ByteStream::new();
    save(&mut buffer, &original)?;
    assert_eq!(&buffer.as_bytes()[..4], &4u32.to_le_bytes());

    let back: BTreeMap<i64, i32> = load(&mut buffer)?;
    assert_eq!(back, original);
    Ok(())
}

#[test]
fn tuple_round_trip() -> Result<()> {
    let original = (7i32, "mid".to_string(), true);
    let mut buffer = ByteStream::new();
    save(&mut buffer, &original)?;
    let back: (i32, String, bool) = load(&mut buffer)?;
    assert_eq!(back, original);
    Ok(())
}

#[test]
fn variant_tag_is_a_single_byte() -> Result<()> {
    let original = Alternatives::Level(6.5);
    let mut buffer = ByteStream::new();
    save(&mut buffer, &original)?;

    // one tag byte followed by the f32 payload
    assert_eq!(buffer.len(), 1 + 4);
    assert_eq!(buffer.as_bytes()[0], 1);

    let back: Alternatives = load(&mut buffer)?;
    assert_eq!(back, original);
    Ok(())
}

#[test]
fn unit_emits_one_marker_byte() -> Result<()> {
    let mut buffer = ByteStream::new();
    save(&mut buffer, &())?;
    assert_eq!(buffer.len(), 1);
    load::<_, ()>(&mut buffer)?;
    Ok(())
}

#[test]
fn enumeration_stores_its_ordinal() -> Result<()> {
    let mut buffer = ByteStream::new();
    save(&mut buffer, &Side::Sell)?;
    assert_eq!(buffer.as_bytes(), &1u32.to_le_bytes());

    let back: Side = load(&mut buffer)?;
    assert_eq!(back, Side::Sell);
    Ok(())
}

#[test]
fn timestamp_stores_its_numeric_seconds() -> Result<()> {
    let original = Timestamp(1_734_258_600.5);
    let mut buffer = ByteStream::new();
    save(&mut buffer, &original)?;
    assert_eq!(buffer.as_bytes(), &1_734_258_600.5f64.to_le_bytes());

    let back: Timestamp = load(&mut buffer)?;
    assert_eq!(back, original);
    Ok(())
}

#[test]
fn optional_round_trip() -> Result<()> {
    let some = Some("Hello".to_string());
    let mut buffer = ByteStream::new();
    save(&mut buffer, &some)?;
    let back: Option<String> = load(&mut buffer)?;
    assert_eq!(back, some);

    let none: Option<String> = None;
    let mut buffer = ByteStream::new();
    save(&mut buffer, &none)?;
    let back: Option<String> = load(&mut buffer)?;
    assert_eq!(back, none);
    Ok(())
}

#[test]
fn unique_handle_round_trip() -> Result<()> {
    let original = Unique::new(Instrument { d: 5.6 });
    let mut buffer = ByteStream::new();
    save(&mut buffer, &original)?;
    let back: Unique<Instrument> = load(&mut buffer)?;
    assert_eq!(back.get().map(|i| i.d), Some(5.6));
    Ok(())
}

#[test]
fn shared_handle_round_trip() -> Result<()> {
    let original = Shared::new(Instrument { d: 6.7 });
    let mut buffer = ByteStream::new();
    save(&mut buffer, &original)?;
    let back: Shared<Instrument> = load(&mut buffer)?;
    assert_eq!(back.get().map(|i| i.d), Some(6.7));

    let null: Shared<Instrument> = Shared::null();
    let mut buffer = ByteStream::new();
    save(&mut buffer, &null)?;
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
    let mut buffer = ByteStream::new();
    save(&mut buffer, &original)?;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("named_instrument.bin");
    io::write_binary(&path, &buffer)?;
    let mut reread = io::read_binary(&path)?;

    let loaded: AnyShared = load(&mut reread)?;
    let concrete = loaded
        .downcast::<NamedInstrument>()
        .expect("loaded handle downcasts to the concrete type");
    assert_eq!(concrete.base.d, 6.7);
    assert_eq!(concrete.n, "me");
    Ok(())
}

#[test]
fn save_load_save_is_byte_identical() -> Result<()> {
    register_fixtures();

    let original = AnyShared::new(NamedInstrument {
        base: Instrument { d: 42.25 },
        n: "idempotent".to_string(),
    });
    let mut first = ByteStream::new();
    save(&mut first, &original)?;

    let mut replay = ByteStream::from_bytes(first.as_bytes().to_vec());
    let loaded: AnyShared = load(&mut replay)?;

    let mut second = ByteStream::new();
    save(&mut second, &loaded)?;
    assert_eq!(first.as_bytes(), second.as_bytes());
    Ok(())
}

#[test]
fn nested_aggregate_round_trip() -> Result<()> {
    #[derive(Reflect, Default, Debug, PartialEq)]
    struct Leg {
        id: String,
        notional: f64,
    }

    #[derive(Reflect, Default, Debug, PartialEq)]
    struct Trade {
        legs: Vec<Leg>,
        active: bool,
    }

    let original = Trade {
        legs: vec![
            Leg {
                id: "fixed".into(),
                notional: 10_000_000.0,
            },
            Leg {
                id: "floating".into(),
                notional: 10_000_000.0,
            },
        ],
        active: true,
    };

    let mut buffer = ByteStream::new();
    save(&mut buffer, &original)?;
    let back: Trade = load(&mut buffer)?;
    assert_eq!(back, original);
    Ok(())
}
