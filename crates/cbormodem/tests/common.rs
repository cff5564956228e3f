#![allow(missing_docs)]
#![allow(dead_code)]

use cbormodem::{Decoder, DecoderOptions, Encoder, EncoderOptions, Event};

/// Parses "A1 45 71" style hex strings into bytes.
pub fn hex(s: &str) -> Vec<u8> {
    let digits: Vec<u8> = s
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .map(|c| c.to_digit(16).unwrap() as u8)
        .collect();
    assert!(digits.len() % 2 == 0, "odd hex digit count in {s:?}");
    digits.chunks(2).map(|p| (p[0] << 4) | p[1]).collect()
}

pub fn decoder(data: &[u8]) -> Decoder<&[u8]> {
    Decoder::new(data, DecoderOptions::default())
}

pub fn encoder() -> Encoder<Vec<u8>> {
    Encoder::new(Vec::new(), EncoderOptions::default())
}

/// Collects the full event sequence of a document.
pub fn events_of(data: &[u8]) -> Vec<Event> {
    let mut dec = decoder(data);
    let mut events = Vec::new();
    while let Some(ev) = dec.next_token().unwrap() {
        events.push(ev);
    }
    events
}

#[test]
fn hex_helper_parses() {
    assert_eq!(hex("A1 45 ff"), vec![0xA1, 0x45, 0xFF]);
    assert_eq!(hex(""), Vec::<u8>::new());
}
