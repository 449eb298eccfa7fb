//! Prints the field structure of a protobuf-encoded file without a schema.
//!
//! Length-delimited values are shown as nested messages when they parse as
//! one, as text when they are printable UTF-8, and as bytes otherwise.

use std::fs;

use dynproto::DecodeError;
use dynproto::codec::wire::{
    WireType, decode_fixed32, decode_fixed64, decode_varint, decode_varlen, split_tag,
    zigzag_decode,
};

const MAX_DEPTH: usize = 16;

#[derive(Debug)]
enum Value<'a> {
    Varint(u64),
    Fixed32(u32),
    Fixed64(u64),
    Varlen(&'a [u8]),
}

#[derive(Debug)]
struct Entry<'a> {
    number: u64,
    value: Value<'a>,
}

fn parse(mut buf: &[u8]) -> Result<Vec<Entry<'_>>, DecodeError> {
    let mut entries = Vec::new();
    while !buf.is_empty() {
        let (tag, n) = decode_varint(buf)?;
        buf = &buf[n..];
        let (number, code) = split_tag(tag);
        if number == 0 {
            return Err(DecodeError::InvalidFieldNumber { number });
        }
        let (value, n) = match WireType::from_code(code)? {
            WireType::Varint => decode_varint(buf).map(|(v, n)| (Value::Varint(v), n))?,
            WireType::Fixed32 => decode_fixed32(buf).map(|(v, n)| (Value::Fixed32(v), n))?,
            WireType::Fixed64 => decode_fixed64(buf).map(|(v, n)| (Value::Fixed64(v), n))?,
            WireType::Varlen => decode_varlen(buf).map(|(v, n)| (Value::Varlen(v), n))?,
        };
        buf = &buf[n..];
        entries.push(Entry { number, value });
    }
    Ok(entries)
}

fn format_bytes(bytes: &[u8]) -> String {
    let preview: Vec<String> = bytes.iter().take(16).map(|b| format!("{:02x}", b)).collect();
    if bytes.len() > 16 {
        format!("BYTES[{}] {}...", bytes.len(), preview.join(" "))
    } else {
        format!("BYTES[{}] {}", bytes.len(), preview.join(" "))
    }
}

fn print_entries(entries: &[Entry<'_>], depth: usize) {
    let indent = "  ".repeat(depth);
    for entry in entries {
        match &entry.value {
            Value::Varint(v) => {
                println!(
                    "{}{}: varint {} (sint {})",
                    indent,
                    entry.number,
                    v,
                    zigzag_decode(*v)
                );
            }
            Value::Fixed32(v) => {
                println!(
                    "{}{}: fixed32 {} (float {})",
                    indent,
                    entry.number,
                    v,
                    f32::from_bits(*v)
                );
            }
            Value::Fixed64(v) => {
                println!(
                    "{}{}: fixed64 {} (double {})",
                    indent,
                    entry.number,
                    v,
                    f64::from_bits(*v)
                );
            }
            Value::Varlen(bytes) => print_varlen(entry.number, bytes, depth),
        }
    }
}

fn print_varlen(number: u64, bytes: &[u8], depth: usize) {
    let indent = "  ".repeat(depth);
    if let Ok(text) = std::str::from_utf8(bytes) {
        if text.chars().all(|c| !c.is_control()) {
            let preview: String = text.chars().take(80).collect();
            if text.chars().count() > 80 {
                println!("{}{}: \"{}...\"", indent, number, preview);
            } else {
                println!("{}{}: \"{}\"", indent, number, preview);
            }
            return;
        }
    }
    if depth < MAX_DEPTH && !bytes.is_empty() {
        if let Ok(nested) = parse(bytes) {
            println!("{}{}: {{", indent, number);
            print_entries(&nested, depth + 1);
            println!("{}}}", indent);
            return;
        }
    }
    println!("{}{}: {}", indent, number, format_bytes(bytes));
}

fn main() {
    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: dump_wire <file>");
        std::process::exit(2);
    };

    println!("Reading: {}", path);

    let data = fs::read(&path).expect("Failed to read file");
    println!("File size: {} bytes", data.len());

    let entries = parse(&data).expect("Failed to decode");
    println!("\n=== Fields ({}) ===", entries.len());
    print_entries(&entries, 0);
}
