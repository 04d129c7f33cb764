//! Object parser tests against whole object sequences.

use strata_core::config::ParseOptions;
use strata_core::document::HealthReport;
use strata_core::model::{DeclaredLength, Decimal};
use strata_core::parser::{Item, PdfParser, Resolver, serialize_object};
use strata_core::{ByteCursor, IssueKind, ObjRef, Object, PdfError, Result};

fn parse_all(data: &[u8], options: &ParseOptions, health: &HealthReport) -> Result<Vec<Item>> {
    let mut cursor = ByteCursor::from_bytes(data.to_vec());
    let mut parser = PdfParser::new(&mut cursor, options).with_health(health);
    let mut out = Vec::new();
    while let Some((_, item)) = parser.next_item()? {
        out.push(item);
    }
    Ok(out)
}

fn lenient(data: &[u8]) -> (Vec<Item>, HealthReport) {
    let health = HealthReport::new();
    let items = parse_all(data, &ParseOptions::default(), &health).expect("parses");
    (items, health)
}

fn indirect(item: &Item) -> &strata_core::IndirectObject {
    match item {
        Item::Indirect(obj) => obj,
        other => panic!("expected indirect object, got {other:?}"),
    }
}

#[test]
fn test_scenario_a_indirect_string() {
    let (items, health) = lenient(b"12 0 obj (Bring) endobj");
    let obj = indirect(&items[0]);
    assert_eq!(obj.obj_ref(), ObjRef::new(12, 0));
    assert_eq!(obj.value(), &Object::String(b"Bring".to_vec()));
    assert!(health.is_empty());
}

#[test]
fn test_sequence_of_objects_with_streams() {
    let data = b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
3 0 obj\n<< /Length 5 /Filter [/FlateDecode /LZWDecode] /DecodeParms [null << /EarlyChange 0 >>] >>\nstream\r\nABCDE\r\nendstream\nendobj\n";
    let (items, health) = lenient(data);
    assert_eq!(items.len(), 2);

    let catalog = indirect(&items[0]).value().as_dict().unwrap();
    assert_eq!(catalog.get("Pages"), Some(&Object::Ref(ObjRef::new(2, 0))));

    let stream = indirect(&items[1]).stream().expect("stream");
    let desc = &stream.descriptor;
    assert_eq!(desc.length, 5);
    assert_eq!(desc.declared_length, DeclaredLength::Direct(5));
    assert_eq!(&data[desc.data_offset as usize..][..5], b"ABCDE");
    assert_eq!(desc.filters.len(), 2);
    assert_eq!(desc.filters[0].name, "FlateDecode");
    assert!(desc.filters[0].params.is_none());
    assert!(desc.filters[1].params.is_some());
    assert_eq!(stream.owner, Some(ObjRef::new(3, 0)));
    assert!(health.is_empty());
}

#[test]
fn test_wrong_length_is_recorded_and_fatal_when_strict() {
    let data = b"4 0 obj << /Length 100 >> stream\nshort\nendstream endobj";
    let (items, health) = lenient(data);
    let stream = indirect(&items[0]).stream().unwrap();
    assert_eq!(stream.descriptor.length, 5);
    assert!(health.contains(IssueKind::StreamLengthCorrected));

    let err = parse_all(data, &ParseOptions::strict(), &HealthReport::new()).unwrap_err();
    assert!(matches!(err, PdfError::StreamLength { declared: 100, .. }), "{err}");
}

/// Serves `/Length` values out of a table while checking the caller's
/// position survives.
struct LengthTable(Vec<(ObjRef, i64)>);

impl Resolver for LengthTable {
    fn resolve_in(&self, cursor: &mut ByteCursor, obj_ref: ObjRef) -> Result<Object> {
        let before = cursor.tell();
        {
            let mut win = cursor.window();
            win.seek(0);
            win.read(4)?;
        }
        assert_eq!(cursor.tell(), before);
        self.0
            .iter()
            .find(|(r, _)| *r == obj_ref)
            .map(|(_, n)| Object::Int(*n))
            .ok_or(PdfError::ObjectNotFound(obj_ref.obj_num, obj_ref.gen_num))
    }
}

#[test]
fn test_indirect_length_resolves_mid_parse() {
    let data = b"5 0 obj << /Length 9 0 R >> stream\nendstream inside\nendstream\nendobj\n6 0 obj 42 endobj";
    let options = ParseOptions::default();
    let table = LengthTable(vec![(ObjRef::new(9, 0), 16)]);
    let mut cursor = ByteCursor::from_bytes(&data[..]);
    let mut parser = PdfParser::new(&mut cursor, &options).with_resolver(&table);

    let (_, first) = parser.next_item().unwrap().unwrap();
    let stream = indirect(&first).stream().unwrap();
    assert_eq!(stream.descriptor.length, 16);
    assert_eq!(
        stream.descriptor.declared_length,
        DeclaredLength::Indirect(ObjRef::new(9, 0))
    );

    let (_, second) = parser.next_item().unwrap().unwrap();
    assert_eq!(indirect(&second).value(), &Object::Int(42));
}

#[test]
fn test_unresolvable_length_scans_for_endstream() {
    let data = b"5 0 obj << /Length 9 0 R >> stream\nabc\nendstream\nendobj";
    let (items, health) = lenient(data);
    assert_eq!(indirect(&items[0]).stream().unwrap().descriptor.length, 3);
    assert!(health.contains(IssueKind::StreamLengthCorrected));
}

#[test]
fn test_strict_failures() {
    let strict = ParseOptions::strict();
    let cases: [(&[u8], fn(&PdfError) -> bool); 4] = [
        (b"[1 2 >>", |e| {
            matches!(e, PdfError::MismatchedCollectionClose { .. })
        }),
        (b"<< /A 1 2 >>", |e| matches!(e, PdfError::InvalidDictionaryKey { .. })),
        (b"1 0 obj << /A 1", |e| matches!(e, PdfError::StreamExhausted { .. })),
        (b"/Bad#zz", |e| matches!(e, PdfError::InvalidHexToken { .. })),
    ];
    for (data, check) in cases {
        let err = parse_all(data, &strict, &HealthReport::new()).unwrap_err();
        assert!(check(&err), "{:?}: {err}", String::from_utf8_lossy(data));
    }
}

#[test]
fn test_lenient_recovery_is_recorded() {
    let (items, health) = lenient(b"1 0 obj << /A [1 2 >> /B 3 >> endobj 2 0 obj << /K");
    assert_eq!(items.len(), 2);
    assert!(health.contains(IssueKind::MismatchedClose));
    assert!(health.contains(IssueKind::UnterminatedObject));
}

#[test]
fn test_deep_nesting_is_capped() {
    let options = ParseOptions {
        max_nesting_depth: 4,
        ..ParseOptions::default()
    };
    let data = b"1 0 obj << /X [[[1 << /A [2] >>]]] /Y 2 >> endobj 2 0 obj 7 endobj";
    let health = HealthReport::new();
    let items = parse_all(data, &options, &health).unwrap();
    assert_eq!(items.len(), 2);
    let dict = indirect(&items[0]).value().as_dict().unwrap();
    assert_eq!(
        dict.get("X"),
        Some(&Object::Array(vec![Object::Array(vec![Object::Null])]))
    );
    assert_eq!(dict.get("Y"), Some(&Object::Int(2)));
    assert_eq!(indirect(&items[1]).value(), &Object::Int(7));
    assert_eq!(health.count(IssueKind::NestingTooDeep), 1);

    let strict = ParseOptions {
        strict: true,
        ..options
    };
    let err = parse_all(data, &strict, &HealthReport::new()).unwrap_err();
    assert!(matches!(err, PdfError::NestingTooDeep { limit: 4, .. }), "{err}");
}

#[test]
fn test_unclosed_deep_nesting_stops_at_endobj() {
    let mut data = b"1 0 obj << /X ".to_vec();
    data.extend(std::iter::repeat_n(b'[', 300_000));
    data.extend_from_slice(b" endobj 2 0 obj (after) endobj");
    let (items, health) = lenient(&data);
    assert_eq!(items.len(), 2);
    assert_eq!(indirect(&items[1]).value(), &Object::String(b"after".to_vec()));
    assert!(health.contains(IssueKind::NestingTooDeep));
    drop(items);
}

#[test]
fn test_endstream_search_respects_scan_distance() {
    let mut data = b"4 0 obj << /Length 100 >> stream
".to_vec();
    data.extend_from_slice(&[b'x'; 64]);
    data.extend_from_slice(b"\nendstream endobj");
    let options = ParseOptions {
        max_scan_distance: Some(8),
        ..ParseOptions::default()
    };

    let health = HealthReport::new();
    let items = parse_all(&data, &options, &health).unwrap();
    let stream = indirect(&items[0]).stream().unwrap();
    assert_eq!(stream.descriptor.length, 8);
    assert!(health.contains(IssueKind::ScanLimitReached));

    let strict = ParseOptions {
        strict: true,
        ..options
    };
    let err = parse_all(&data, &strict, &HealthReport::new()).unwrap_err();
    assert!(matches!(err, PdfError::ScanLimitExceeded { limit: 8, .. }), "{err}");
}

const ROUND_TRIP: &[&[u8]] = &[
    b"<< /Type /Page /MediaBox [0 0 612.5 792] /Rotate -90 /Parent 3 0 R >>",
    b"[(a\\(b\\)c) <00ff10> /N#23ame true false null -0.001 [[]] << >>]",
    b"<< /Nested << /Deeper << /Deepest [1 2 R 3 4 R 5] >> >> >>",
    b"(\\000\\377 octal)",
];

#[test]
fn test_serialized_objects_parse_back() {
    for source in ROUND_TRIP {
        let (items, _) = lenient(source);
        let Item::Object(original) = &items[0] else {
            panic!("expected a direct object");
        };
        let text = serialize_object(original);
        let (again, _) = lenient(&text);
        assert_eq!(again, items, "{}", String::from_utf8_lossy(&text));

        // Serialization is stable after one pass
        let Item::Object(reparsed) = &again[0] else {
            unreachable!()
        };
        assert_eq!(serialize_object(reparsed), text);
    }
}

#[test]
fn test_reals_stay_exact() {
    let (items, _) = lenient(b"[0.1 0.2 123456789012345678.000000001]");
    let Item::Object(Object::Array(values)) = &items[0] else {
        panic!("expected array");
    };
    assert_eq!(values[0], Object::Real(Decimal::new(1, 1)));
    assert_eq!(values[1], Object::Real(Decimal::new(2, 1)));
    assert_eq!(
        values[2].as_decimal().unwrap().to_string(),
        "123456789012345678.000000001"
    );
}
