#![allow(missing_docs)]

mod common;

use cbormodem::{CborFactory, Decoder, Event};
use common::decoder;

/// Writes the RFC 7049 appendix-style image document used across the
/// suite. Works against both encoder flavors, which share their write
/// surface.
macro_rules! write_image_doc {
    ($enc:expr) => {{
        let enc = $enc;
        enc.write_start_object().unwrap();
        enc.write_field_name("Image").unwrap();
        enc.write_start_object().unwrap();
        enc.write_field_name("Width").unwrap();
        enc.write_i32(800).unwrap();
        enc.write_field_name("Height").unwrap();
        enc.write_i32(600).unwrap();
        enc.write_field_name("Title").unwrap();
        enc.write_string("View from 15th Floor").unwrap();
        enc.write_field_name("Thumbnail").unwrap();
        enc.write_start_object().unwrap();
        enc.write_field_name("Url").unwrap();
        enc.write_string("http://www.example.com/image/481989943").unwrap();
        enc.write_field_name("Height").unwrap();
        enc.write_i32(125).unwrap();
        enc.write_field_name("Width").unwrap();
        enc.write_string("100").unwrap();
        enc.write_end_object().unwrap();
        enc.write_field_name("IDs").unwrap();
        enc.write_start_array().unwrap();
        enc.write_i32(116).unwrap();
        enc.write_i32(943).unwrap();
        enc.write_i32(234).unwrap();
        enc.write_i32(38793).unwrap();
        enc.write_end_array().unwrap();
        enc.write_end_object().unwrap();
    }};
}

fn assert_image_doc(dec: &mut Decoder<&[u8]>) {
    use Event::*;

    assert_eq!(dec.next_token().unwrap(), Some(StartObject));

    assert_eq!(dec.next_token().unwrap(), Some(FieldName));
    assert_eq!(dec.current_name(), Some("Image"));
    assert_eq!(dec.next_token().unwrap(), Some(StartObject));
    assert_eq!(dec.current_name(), Some("Image"));

    assert_eq!(dec.next_token().unwrap(), Some(FieldName));
    assert_eq!(dec.current_name(), Some("Width"));
    assert_eq!(dec.next_token().unwrap(), Some(Int));
    assert_eq!(dec.get_int().unwrap(), 800);

    assert_eq!(dec.next_token().unwrap(), Some(FieldName));
    assert_eq!(dec.current_name(), Some("Height"));
    assert_eq!(dec.next_token().unwrap(), Some(Int));
    assert_eq!(dec.get_int().unwrap(), 600);

    assert_eq!(dec.next_token().unwrap(), Some(FieldName));
    assert_eq!(dec.current_name(), Some("Title"));
    assert_eq!(dec.next_token().unwrap(), Some(Text));
    assert_eq!(dec.get_text().unwrap(), "View from 15th Floor");
    assert_eq!(dec.get_text_length().unwrap(), 20);

    assert_eq!(dec.next_token().unwrap(), Some(FieldName));
    assert_eq!(dec.current_name(), Some("Thumbnail"));
    assert_eq!(dec.next_token().unwrap(), Some(StartObject));

    assert_eq!(dec.next_token().unwrap(), Some(FieldName));
    assert_eq!(dec.current_name(), Some("Url"));
    assert_eq!(dec.next_token().unwrap(), Some(Text));
    assert_eq!(
        dec.get_text().unwrap(),
        "http://www.example.com/image/481989943"
    );

    assert_eq!(dec.next_token().unwrap(), Some(FieldName));
    assert_eq!(dec.current_name(), Some("Height"));
    assert_eq!(dec.next_token().unwrap(), Some(Int));
    assert_eq!(dec.get_int().unwrap(), 125);

    assert_eq!(dec.next_token().unwrap(), Some(FieldName));
    assert_eq!(dec.current_name(), Some("Width"));
    assert_eq!(dec.next_token().unwrap(), Some(Text));
    assert_eq!(dec.get_text().unwrap(), "100");

    assert_eq!(dec.next_token().unwrap(), Some(EndObject));

    assert_eq!(dec.next_token().unwrap(), Some(FieldName));
    assert_eq!(dec.current_name(), Some("IDs"));
    assert_eq!(dec.next_token().unwrap(), Some(StartArray));
    assert_eq!(dec.current_name(), Some("IDs"));
    for expected in [116, 943, 234, 38793] {
        assert_eq!(dec.next_token().unwrap(), Some(Int));
        assert_eq!(dec.get_int().unwrap(), expected);
    }
    assert_eq!(dec.next_token().unwrap(), Some(EndArray));

    assert_eq!(dec.next_token().unwrap(), Some(EndObject));
    assert_eq!(dec.next_token().unwrap(), Some(EndObject));
    assert_eq!(dec.next_token().unwrap(), None);
}

#[test]
fn image_document_via_streaming_encoder() {
    let factory = CborFactory::new();
    let mut enc = factory.encoder(Vec::new());
    write_image_doc!(&mut enc);
    let bytes = enc.finish().unwrap();
    let mut dec = factory.decoder_for_slice(&bytes);
    assert_image_doc(&mut dec);
}

#[test]
fn image_document_via_sizer_matches() {
    let factory = CborFactory::new();

    let mut enc = factory.sizing_encoder(Vec::new());
    write_image_doc!(&mut enc);
    let sized = enc.finish().unwrap();

    // Definite-length output starts with a 1-pair map header, not the
    // indefinite opener.
    assert_eq!(sized[0], 0xA1);

    let mut dec = decoder(&sized);
    assert_image_doc(&mut dec);
}
