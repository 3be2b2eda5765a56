use std::collections::BTreeMap;

use jast_core::{
    from_node, from_slice, from_str, parse_str, to_string, to_tree, to_vec, JastError, Kind, Tree,
};
use serde::{Deserialize, Serialize, Serializer};

#[derive(Serialize, Deserialize, Debug, PartialEq, Default)]
struct Record {
    #[serde(rename = "renamed")]
    name: String,
    #[serde(skip)]
    secret: String,
    #[serde(default, skip_serializing_if = "jast_core::is_zero")]
    count: u32,
    #[serde(with = "jast_core::stringify")]
    flag: bool,
    tags: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
enum Shape {
    Empty,
    Circle(f64),
    Pair(u8, u8),
    Rect { w: u32, h: u32 },
}

fn conversion_message(err: JastError) -> String {
    match err {
        JastError::Conversion(msg) => msg,
        other => panic!("expected a conversion error, got {other:?}"),
    }
}

// ============================================================================
// Field descriptors
// ============================================================================

#[test]
fn encode_applies_field_attributes() {
    let record = Record {
        name: "n".into(),
        secret: "hidden".into(),
        count: 0,
        flag: true,
        tags: vec!["a".into()],
    };
    assert_eq!(
        to_string(&record).unwrap(),
        r#"{"renamed":"n","flag":"true","tags":["a"]}"#
    );
}

#[test]
fn encode_keeps_non_zero_omittable_field() {
    let record = Record {
        count: 3,
        ..Record::default()
    };
    assert_eq!(
        to_string(&record).unwrap(),
        r#"{"renamed":"","count":3,"flag":"false","tags":[]}"#
    );
}

#[test]
fn decode_applies_field_attributes() {
    let record: Record =
        from_str(r#"{"renamed": "n", "secret": "x", "flag": "true", "tags": []}"#).unwrap();
    assert_eq!(
        record,
        Record {
            name: "n".into(),
            secret: String::new(),
            count: 0,
            flag: true,
            tags: vec![],
        }
    );
}

#[test]
fn decode_missing_required_field_fails() {
    let err = from_str::<Record>(r#"{"flag": "true", "tags": []}"#).unwrap_err();
    assert!(conversion_message(err).contains("renamed"));
}

#[test]
fn record_round_trip() {
    let record = Record {
        name: "web".into(),
        secret: String::new(),
        count: 7,
        flag: false,
        tags: vec!["x".into(), "y".into()],
    };
    let bytes = to_vec(&record).unwrap();
    let back: Record = from_slice(&bytes).unwrap();
    assert_eq!(back, record);
}

// ============================================================================
// Stringify
// ============================================================================

#[derive(Deserialize, Debug, PartialEq)]
struct Text {
    #[serde(with = "jast_core::stringify")]
    text: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Port {
    #[serde(with = "jast_core::stringify")]
    port: u16,
}

#[test]
fn stringify_reduces_scalars_to_text() {
    for (input, expected) in [
        (r#"{"text": true}"#, "true"),
        (r#"{"text": 5}"#, "5"),
        (r#"{"text": -1.5}"#, "-1.5"),
        (r#"{"text": null}"#, "null"),
        (r#"{"text": "plain"}"#, "plain"),
    ] {
        let decoded: Text = from_str(input).unwrap();
        assert_eq!(decoded.text, expected, "{input}");
    }
}

#[test]
fn stringify_parses_numbers_from_text_or_number_nodes() {
    assert_eq!(from_str::<Port>(r#"{"port": "8080"}"#).unwrap().port, 8080);
    assert_eq!(from_str::<Port>(r#"{"port": 8080}"#).unwrap().port, 8080);
    assert!(from_str::<Port>(r#"{"port": "eighty"}"#).is_err());
    assert!(from_str::<Port>(r#"{"port": [1]}"#).is_err());
}

#[test]
fn stringify_encodes_as_string_leaf() {
    let tree = to_tree(&Port { port: 443 }).unwrap();
    assert_eq!(tree.get("port").unwrap().kind(), Kind::String);
    assert_eq!(tree.to_string(), r#"{"port":"443"}"#);
}

// ============================================================================
// Scalars and type checks
// ============================================================================

#[test]
fn scalar_encoding() {
    assert_eq!(to_string(&5u8).unwrap(), "5");
    assert_eq!(to_string(&-2.5f64).unwrap(), "-2.5");
    assert_eq!(to_string(&"a\"b").unwrap(), r#""a\"b""#);
    assert_eq!(to_string(&'x').unwrap(), r#""x""#);
    assert_eq!(to_string(&()).unwrap(), "null");
    assert_eq!(to_string(&Option::<u8>::None).unwrap(), "null");
    assert_eq!(to_string(&Some(1u8)).unwrap(), "1");
}

#[test]
fn non_finite_numbers_fail_to_encode() {
    assert!(matches!(to_tree(&f64::NAN), Err(JastError::Conversion(_))));
    assert!(matches!(
        to_tree(&vec![1.0, f64::INFINITY]),
        Err(JastError::Conversion(_))
    ));
}

#[test]
fn integers_must_be_integral_and_in_range() {
    assert_eq!(from_str::<i32>("-5").unwrap(), -5);
    assert_eq!(from_str::<u64>("1e3").unwrap(), 1000);
    assert!(from_str::<u8>("300").is_err());
    assert!(from_str::<u32>("-1").is_err());
    assert!(from_str::<u32>("1.5").is_err());
}

#[test]
fn sixty_four_bit_bounds_are_exact() {
    assert!(from_str::<u64>("18446744073709551616").is_err());
    assert!(from_str::<i64>("9223372036854775808").is_err());
    assert_eq!(from_str::<i64>("-9223372036854775808").unwrap(), i64::MIN);
    assert_eq!(from_str::<u64>("18446744073709549568").unwrap(), 18446744073709549568);
    assert_eq!(from_str::<u8>("255").unwrap(), 255);
    assert!(from_str::<u8>("256").is_err());
    assert!(from_str::<i8>("-129").is_err());
}

#[test]
fn tuples_reject_trailing_elements() {
    assert_eq!(from_str::<(u8, u8)>("[1,2]").unwrap(), (1, 2));

    let msg = conversion_message(from_str::<(u8, u8)>("[1,2,3]").unwrap_err());
    assert!(msg.contains("1 trailing elements"), "{msg}");

    assert!(from_str::<Shape>(r#"{"Pair":[1,2,3]}"#).is_err());
    assert!(from_str::<[u8; 2]>("[1,2,3,4]").is_err());
    assert!(from_str::<(u8, u8)>("[1]").is_err());
}

#[test]
fn type_mismatch_names_both_kinds() {
    let msg = conversion_message(from_str::<Vec<u32>>(r#"{"a": 1}"#).unwrap_err());
    assert!(msg.contains("want Array got Object"), "{msg}");

    let msg = conversion_message(from_str::<bool>("\"yes\"").unwrap_err());
    assert!(msg.contains("want Bool got String"), "{msg}");
}

#[test]
fn options_decode_from_null() {
    assert_eq!(from_str::<Option<u8>>("null").unwrap(), None);
    assert_eq!(from_str::<Option<u8>>("4").unwrap(), Some(4));
    assert_eq!(
        from_str::<Vec<Option<bool>>>("[true, null]").unwrap(),
        vec![Some(true), None]
    );
}

#[test]
fn chars_need_exactly_one_character() {
    assert_eq!(from_str::<char>("\"x\"").unwrap(), 'x');
    assert!(from_str::<char>("\"xy\"").is_err());
}

// ============================================================================
// Bytes
// ============================================================================

struct Raw(&'static [u8]);

impl Serialize for Raw {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(self.0)
    }
}

#[test]
fn bytes_encode_as_a_string_leaf() {
    let tree = to_tree(&Raw(b"bytes")).unwrap();
    assert_eq!(tree.root().kind(), Kind::String);
    assert_eq!(tree.to_string(), r#""bytes""#);
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Blob {
    #[serde(with = "jast_core::bytes")]
    data: Vec<u8>,
    plain: Vec<u8>,
}

#[test]
fn bytes_field_round_trips_as_a_string() {
    let blob = Blob {
        data: b"hi".to_vec(),
        plain: b"hi".to_vec(),
    };
    let tree = to_tree(&blob).unwrap();
    assert_eq!(tree.get("data").unwrap().kind(), Kind::String);
    assert_eq!(tree.to_string(), r#"{"data":"hi","plain":[104,105]}"#);

    let back: Blob = from_node(tree.root()).unwrap();
    assert_eq!(back, blob);
}

#[test]
fn bytes_field_reads_the_serde_json_form() {
    let blob = Blob {
        data: vec![0, 255],
        plain: vec![],
    };
    let text = serde_json::to_string(&blob).unwrap();
    assert_eq!(text, r#"{"data":[0,255],"plain":[]}"#);
    assert_eq!(serde_json::from_str::<Blob>(&text).unwrap(), blob);
    assert!(from_str::<Blob>(&text).is_err());
}

// ============================================================================
// Maps and enums
// ============================================================================

#[test]
fn map_keys_from_integers() {
    let mut map = BTreeMap::new();
    map.insert(1u32, "a".to_string());
    map.insert(2u32, "b".to_string());
    let text = to_string(&map).unwrap();
    assert_eq!(text, r#"{"1":"a","2":"b"}"#);
    let back: BTreeMap<u32, String> = from_str(&text).unwrap();
    assert_eq!(back, map);
}

#[test]
fn composite_map_keys_are_rejected() {
    let mut map = BTreeMap::new();
    map.insert((1u8, 2u8), 3u8);
    assert!(matches!(to_tree(&map), Err(JastError::Conversion(_))));
}

#[test]
fn enum_representations() {
    let cases = [
        (Shape::Empty, r#""Empty""#),
        (Shape::Circle(1.5), r#"{"Circle":1.5}"#),
        (Shape::Pair(1, 2), r#"{"Pair":[1,2]}"#),
        (Shape::Rect { w: 2, h: 3 }, r#"{"Rect":{"w":2,"h":3}}"#),
    ];
    for (shape, text) in cases {
        assert_eq!(to_string(&shape).unwrap(), text);
        assert_eq!(from_str::<Shape>(text).unwrap(), shape);
    }
}

#[test]
fn unknown_enum_variant_is_an_error() {
    assert!(from_str::<Shape>(r#""Square""#).is_err());
    assert!(from_str::<Shape>(r#"{"Circle":1,"Empty":null}"#).is_err());
}

// ============================================================================
// Working with trees directly
// ============================================================================

#[derive(Deserialize)]
struct Borrowed<'a> {
    host: &'a str,
}

#[test]
fn decode_borrows_strings_from_the_tree() {
    let tree = parse_str(include_str!("fixtures/web_app.json")).unwrap();
    let node = tree.get("web-app.servlet.1.init-param").unwrap();
    let params: BTreeMap<&str, &str> = from_node(node).unwrap();
    assert_eq!(params["mailHost"], "mail1");

    let tree = parse_str(r#"{"host": "mail2"}"#).unwrap();
    let borrowed: Borrowed<'_> = from_node(tree.root()).unwrap();
    assert_eq!(borrowed.host, "mail2");
}

#[test]
fn decode_into_dynamic_value_matches_value() {
    let tree = parse_str(r#"{"a": 20, "b": [true, null, "x"]}"#).unwrap();
    let decoded: serde_json::Value = from_node(tree.root()).unwrap();
    assert_eq!(decoded, tree.root().value());
}

#[test]
fn encoded_tree_is_well_formed() {
    let record = Record {
        name: "n".into(),
        tags: vec!["a".into(), "b".into()],
        ..Record::default()
    };
    let tree = to_tree(&record).unwrap();
    tree.validate().unwrap();
    assert_eq!(tree.get("tags.1").unwrap().key(), "tags.1");
    assert_eq!(tree.root().total(), 6);
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Envelope {
    id: u32,
    body: Tree,
}

#[test]
fn tree_field_round_trips() {
    let envelope = Envelope {
        id: 7,
        body: parse_str(r#"{"a": [true, null], "n": 2.5, "k": 20, "s": "x"}"#).unwrap(),
    };
    let text = to_string(&envelope).unwrap();
    assert_eq!(
        text,
        r#"{"id":7,"body":{"a":[true,null],"n":2.5,"k":20,"s":"x"}}"#
    );
    assert_eq!(from_str::<Envelope>(&text).unwrap(), envelope);

    assert_eq!(serde_json::to_string(&envelope).unwrap(), text);
    assert_eq!(serde_json::from_str::<Envelope>(&text).unwrap(), envelope);
}

#[test]
fn node_serializes_its_subtree() {
    let tree = parse_str(include_str!("fixtures/web_app.json")).unwrap();
    let node = tree.get("web-app.servlet.0").unwrap();
    let value = serde_json::to_value(node).unwrap();
    assert_eq!(Tree::from_value(&value), node.copy());
    assert_eq!(to_tree(&node).unwrap(), node.copy());
}

#[test]
fn unresolved_nodes_do_not_serialize() {
    let outcome = jast_core::parse_partial("[1, nul]");
    assert!(serde_json::to_string(&outcome.tree).is_err());
    assert!(matches!(
        to_tree(&outcome.tree),
        Err(JastError::Conversion(_))
    ));
}
