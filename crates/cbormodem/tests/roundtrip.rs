#![allow(missing_docs)]

mod common;

use cbormodem::{Decoder, Encoder, Event, SizingEncoder};
use common::decoder;
use quickcheck::{Arbitrary, Gen, QuickCheck};

/// A small document model for property tests; doubles are generated
/// from integers so equality is exact.
#[derive(Clone, Debug, PartialEq)]
enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
}

fn arbitrary_at_depth(g: &mut Gen, depth: usize) -> Value {
    // Containers only near the top, so trees stay shallow.
    let choices = if depth >= 3 { 6 } else { 8 };
    match u8::arbitrary(g) % choices {
        0 => Value::Null,
        1 => Value::Bool(bool::arbitrary(g)),
        2 => Value::Int(i64::arbitrary(g)),
        3 => Value::Double(f64::from(i32::arbitrary(g)) / 2.0),
        4 => Value::Text(String::arbitrary(g)),
        5 => Value::Bytes(Vec::<u8>::arbitrary(g)),
        6 => {
            let len = usize::from(u8::arbitrary(g) % 4);
            Value::Array((0..len).map(|_| arbitrary_at_depth(g, depth + 1)).collect())
        }
        _ => {
            let len = usize::from(u8::arbitrary(g) % 4);
            Value::Object(
                (0..len)
                    .map(|_| (String::arbitrary(g), arbitrary_at_depth(g, depth + 1)))
                    .collect(),
            )
        }
    }
}

impl Arbitrary for Value {
    fn arbitrary(g: &mut Gen) -> Self {
        arbitrary_at_depth(g, 0)
    }
}

macro_rules! impl_encode_value {
    ($name:ident, $ty:ty) => {
        fn $name(enc: &mut $ty, value: &Value) -> cbormodem::Result<()> {
            match value {
                Value::Null => enc.write_null(),
                Value::Bool(b) => enc.write_bool(*b),
                Value::Int(i) => enc.write_i64(*i),
                Value::Double(d) => enc.write_f64(*d),
                Value::Text(s) => enc.write_string(s),
                Value::Bytes(b) => enc.write_binary(b),
                Value::Array(items) => {
                    enc.write_start_array()?;
                    for item in items {
                        $name(enc, item)?;
                    }
                    enc.write_end_array()
                }
                Value::Object(fields) => {
                    enc.write_start_object()?;
                    for (key, val) in fields {
                        enc.write_field_name(key)?;
                        $name(enc, val)?;
                    }
                    enc.write_end_object()
                }
            }
        }
    };
}

impl_encode_value!(encode_streamed, Encoder<Vec<u8>>);
impl_encode_value!(encode_sized, SizingEncoder<Vec<u8>>);

fn read_value(dec: &mut Decoder<&[u8]>, event: Event) -> Value {
    match event {
        Event::Null => Value::Null,
        Event::Bool(b) => Value::Bool(b),
        Event::Int => Value::Int(dec.get_long().unwrap()),
        Event::Float => Value::Double(dec.get_double().unwrap()),
        Event::Text => Value::Text(dec.get_text().unwrap()),
        Event::EmbeddedBinary => Value::Bytes(dec.get_binary().unwrap().to_vec()),
        Event::StartArray => {
            let mut items = Vec::new();
            loop {
                let ev = dec.next_token().unwrap().expect("unclosed array");
                if ev == Event::EndArray {
                    break;
                }
                items.push(read_value(dec, ev));
            }
            Value::Array(items)
        }
        Event::StartObject => {
            let mut fields = Vec::new();
            loop {
                let ev = dec.next_token().unwrap().expect("unclosed object");
                if ev == Event::EndObject {
                    break;
                }
                assert_eq!(ev, Event::FieldName);
                let key = dec.current_name().expect("field name").to_string();
                let ev = dec.next_token().unwrap().expect("field value");
                fields.push((key, read_value(dec, ev)));
            }
            Value::Object(fields)
        }
        Event::EndArray | Event::EndObject | Event::FieldName => {
            unreachable!("structural event with no opening")
        }
    }
}

fn read_roots(data: &[u8]) -> Vec<Value> {
    let mut dec = decoder(data);
    let mut roots = Vec::new();
    while let Some(ev) = dec.next_token().unwrap() {
        roots.push(read_value(&mut dec, ev));
    }
    roots
}

fn test_count() -> u64 {
    if is_ci::cached() {
        1_000
    } else {
        300
    }
}

#[test]
fn streamed_and_sized_encodings_both_round_trip() {
    fn prop(value: Value) -> bool {
        let mut enc = common::encoder();
        encode_streamed(&mut enc, &value).unwrap();
        let streamed = enc.finish().unwrap();

        let mut enc = SizingEncoder::new(Vec::new(), Default::default());
        encode_sized(&mut enc, &value).unwrap();
        let sized = enc.finish().unwrap();

        read_roots(&streamed) == vec![value.clone()] && read_roots(&sized) == vec![value]
    }

    QuickCheck::new()
        .tests(test_count())
        .quickcheck(prop as fn(Value) -> bool);
}

#[test]
fn interned_and_uninterned_names_agree() {
    fn prop(value: Value) -> bool {
        let mut enc = common::encoder();
        encode_streamed(&mut enc, &value).unwrap();
        let bytes = enc.finish().unwrap();

        let plain = cbormodem::DecoderOptions {
            intern_field_names: false,
            ..Default::default()
        };
        let interning = cbormodem::DecoderOptions::default();

        let mut a = Decoder::new(&bytes[..], plain);
        let mut b = Decoder::new(&bytes[..], interning);
        loop {
            let (ea, eb) = (a.next_token().unwrap(), b.next_token().unwrap());
            if ea != eb {
                return false;
            }
            match ea {
                None => return true,
                Some(Event::FieldName) => {
                    if a.current_name() != b.current_name() {
                        return false;
                    }
                }
                Some(Event::Text) => {
                    if a.get_text().unwrap() != b.get_text().unwrap() {
                        return false;
                    }
                }
                Some(Event::EmbeddedBinary) => {
                    if a.get_binary().unwrap() != b.get_binary().unwrap() {
                        return false;
                    }
                }
                Some(_) => {}
            }
        }
    }

    QuickCheck::new()
        .tests(test_count())
        .quickcheck(prop as fn(Value) -> bool);
}
