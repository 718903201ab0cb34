//! Tests for value normalization

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::Arc;

use serde::ser::Error as _;
use serde::{Serialize, Serializer};
use sluice_core::normalize::{normalize, normalize_all, Field, Value, NIL};

#[derive(Serialize)]
struct Account
{
    id: u32,
    owner: String,
    #[serde(skip)]
    #[allow(dead_code)]
    secret: String,
    limit: Option<u64>,
}

#[derive(Serialize)]
struct Node
{
    name: &'static str,
    next: Option<Box<Node>>,
}

#[derive(Serialize)]
enum Shape
{
    Empty,
    Circle(f64),
    Rect
    {
        w: u32,
        h: u32,
    },
    Pair(i8, i8),
}

struct Broken;

impl Serialize for Broken
{
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error>
    {
        Err(S::Error::custom("cannot serialize Broken"))
    }
}

#[test]
fn test_absent_values_are_nil()
{
    let none: Option<u8> = None;
    assert_eq!(normalize(&none), Value::Nil);
    assert_eq!(normalize(&()), Value::Nil);
    assert_eq!(normalize(&none).to_string(), NIL);

    let nested: Option<Option<Box<u8>>> = Some(None);
    assert_eq!(normalize(&nested).to_string(), "<nil>");
}

#[test]
fn test_indirection_is_followed()
{
    let value = 42;
    let reference = &&value;
    assert_eq!(normalize(&reference), Value::Int(42));
    assert_eq!(normalize(&Box::new(Some(Arc::new(7u8)))), Value::UInt(7));
    assert_eq!(normalize(&Rc::new("shared")).to_string(), "shared");
}

#[test]
fn test_sequence_of_references()
{
    let (a, b) = (1, 2);
    let refs = vec![&a, &b];
    assert_eq!(normalize(&refs), Value::Seq(vec![Value::Int(1), Value::Int(2)]));
    assert_eq!(normalize(&refs).to_string(), "[1, 2]");

    let holes = vec![Some(1), None, Some(3)];
    assert_eq!(normalize(&holes).to_string(), "[1, <nil>, 3]");
}

#[test]
fn test_struct_fields_keep_declaration_order_and_skip_private()
{
    let account = Account {
        id: 9,
        owner: "ada".to_string(),
        secret: "hunter2".to_string(),
        limit: None,
    };
    let value = normalize(&account);
    assert_eq!(value.to_string(), "{id: 9, owner: ada, limit: <nil>}");
    assert!(!value.to_string().contains("hunter2"));
}

#[test]
fn test_recursive_structure()
{
    let list = Node {
        name: "a",
        next: Some(Box::new(Node {
            name: "b",
            next: None,
        })),
    };
    assert_eq!(normalize(&list).to_string(), "{name: a, next: {name: b, next: <nil>}}");
}

#[test]
fn test_map_keys_are_sorted()
{
    let mut map = HashMap::new();
    map.insert("zeta", 1);
    map.insert("alpha", 2);
    map.insert("mid", 3);
    assert_eq!(normalize(&map).to_string(), "{alpha: 2, mid: 3, zeta: 1}");
}

#[test]
fn test_numeric_map_keys_sort_by_magnitude()
{
    let map: HashMap<i32, &str> = [(10, "ten"), (-1, "minus one"), (2, "two")].into_iter().collect();
    assert_eq!(normalize(&map).to_string(), "{-1: minus one, 2: two, 10: ten}");
}

#[test]
fn test_map_values_are_normalized()
{
    let mut map = BTreeMap::new();
    map.insert("present", Some(Box::new(1)));
    map.insert("absent", None);
    assert_eq!(normalize(&map).to_string(), "{absent: <nil>, present: 1}");
}

#[test]
fn test_enum_variants()
{
    assert_eq!(normalize(&Shape::Empty), Value::Str("Empty".to_string()));
    assert_eq!(normalize(&Shape::Circle(1.5)).to_string(), "{Circle: 1.5}");
    assert_eq!(normalize(&Shape::Rect { w: 2, h: 3 }).to_string(), "{Rect: {w: 2, h: 3}}");
    assert_eq!(normalize(&Shape::Pair(-1, 1)).to_string(), "{Pair: [-1, 1]}");
}

#[test]
fn test_wide_integers()
{
    assert_eq!(normalize(&5i128), Value::Int(5));
    assert_eq!(normalize(&u128::MAX).to_string(), u128::MAX.to_string());
}

#[test]
fn test_serialize_failure_becomes_text()
{
    assert_eq!(normalize(&Broken).to_string(), "<error: cannot serialize Broken>");
}

#[test]
fn test_json_form_of_values()
{
    let mut map = HashMap::new();
    map.insert(2, None);
    map.insert(1, Some("one"));
    let json = serde_json::to_string(&normalize(&map)).unwrap();
    assert_eq!(json, r#"{"1":"one","2":"<nil>"}"#);

    let json = serde_json::to_string(&normalize(&vec![Some(true), None])).unwrap();
    assert_eq!(json, r#"[true,"<nil>"]"#);
}

#[test]
fn test_total_cmp_orders_mixed_numbers()
{
    use std::cmp::Ordering;

    assert_eq!(Value::Int(-1).total_cmp(&Value::UInt(0)), Ordering::Less);
    assert_eq!(Value::UInt(3).total_cmp(&Value::Float(2.5)), Ordering::Greater);
    assert_eq!(Value::Nil.total_cmp(&Value::Bool(false)), Ordering::Less);
    assert_eq!(Value::Str("a".into()).total_cmp(&Value::Int(1)), Ordering::Greater);
}

#[test]
fn test_heterogeneous_fields()
{
    let account = Account {
        id: 1,
        owner: "bob".to_string(),
        secret: String::new(),
        limit: Some(100),
    };
    let name = "svc";
    let fields: [&dyn Field; 3] = [&name, &account, &[1.0, 2.5]];
    let values = normalize_all(&fields);
    assert_eq!(values.len(), 3);
    assert_eq!(values[0].to_string(), "svc");
    assert_eq!(values[1].to_string(), "{id: 1, owner: bob, limit: 100}");
    assert_eq!(values[2].to_string(), "[1, 2.5]");
}
