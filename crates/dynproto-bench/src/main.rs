//! Benchmark comparing dynproto against prost on a synthetic product catalog.
//!
//! Both sides describe the same schema with the same field numbers, so the
//! encodings are expected to be byte-identical.

use std::collections::BTreeMap;
use std::time::Instant;

use dynproto::message;

// =============================================================================
// DYNPROTO SCHEMA
// =============================================================================

message! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Dimensions {
        pub width: f64 = 1,
        pub height: f64 = 2,
        pub depth: f64 = 3,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Product {
        pub id: u64 = 1,
        pub name: String = 2,
        pub price: f64 = 3,
        pub tags: Vec<String> = 4,
        pub attributes: BTreeMap<String, String> = 5,
        pub dimensions: Option<Dimensions> = 6,
        pub sku: Vec<u8> = 7,
        pub stock: i32 = 8,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Catalog {
        pub name: String = 1,
        pub products: Vec<Product> = 2,
    }
}

// =============================================================================
// PROST SCHEMA
// =============================================================================

mod pb {
    use std::collections::BTreeMap;

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Dimensions {
        #[prost(double, tag = "1")]
        pub width: f64,
        #[prost(double, tag = "2")]
        pub height: f64,
        #[prost(double, tag = "3")]
        pub depth: f64,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Product {
        #[prost(uint64, tag = "1")]
        pub id: u64,
        #[prost(string, tag = "2")]
        pub name: String,
        #[prost(double, tag = "3")]
        pub price: f64,
        #[prost(string, repeated, tag = "4")]
        pub tags: Vec<String>,
        #[prost(btree_map = "string, string", tag = "5")]
        pub attributes: BTreeMap<String, String>,
        #[prost(message, optional, tag = "6")]
        pub dimensions: Option<Dimensions>,
        #[prost(bytes = "vec", tag = "7")]
        pub sku: Vec<u8>,
        #[prost(int32, tag = "8")]
        pub stock: i32,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Catalog {
        #[prost(string, tag = "1")]
        pub name: String,
        #[prost(message, repeated, tag = "2")]
        pub products: Vec<Product>,
    }
}

// =============================================================================
// DATASET
// =============================================================================

const COLORS: &[&str] = &["red", "green", "blue", "black", "white"];
const MATERIALS: &[&str] = &["steel", "oak", "cotton", "glass"];

fn make_product(i: u64) -> Product {
    let mut attributes = BTreeMap::new();
    attributes.insert("color".to_string(), COLORS[i as usize % COLORS.len()].to_string());
    if i % 3 == 0 {
        attributes.insert(
            "material".to_string(),
            MATERIALS[i as usize % MATERIALS.len()].to_string(),
        );
    }

    Product {
        id: i + 1,
        name: format!("Product #{}", i + 1),
        price: 1.0 + (i % 500) as f64 * 0.25,
        tags: (0..i % 4).map(|t| format!("tag-{}", t)).collect(),
        attributes,
        dimensions: (i % 2 == 0).then(|| Dimensions {
            width: 10.0 + (i % 7) as f64,
            height: 5.0 + (i % 11) as f64,
            depth: 1.5,
        }),
        sku: (i as u32).to_be_bytes().to_vec(),
        // Negative stock exercises sign-extended varints.
        stock: (i % 200) as i32 - 20,
    }
}

fn to_prost(catalog: &Catalog) -> pb::Catalog {
    pb::Catalog {
        name: catalog.name.clone(),
        products: catalog
            .products
            .iter()
            .map(|p| pb::Product {
                id: p.id,
                name: p.name.clone(),
                price: p.price,
                tags: p.tags.clone(),
                attributes: p.attributes.clone(),
                dimensions: p.dimensions.as_ref().map(|d| pb::Dimensions {
                    width: d.width,
                    height: d.height,
                    depth: d.depth,
                }),
                sku: p.sku.clone(),
                stock: p.stock,
            })
            .collect(),
    }
}

fn throughput(bytes: usize, elapsed: std::time::Duration) -> f64 {
    (bytes as f64 / 1_000_000.0) / elapsed.as_secs_f64()
}

fn main() {
    let count: u64 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(5_000);

    println!("Generating {} products", count);

    let catalog = Catalog {
        name: "Synthetic Catalog".to_string(),
        products: (0..count).map(make_product).collect(),
    };
    let proto_catalog = to_prost(&catalog);

    // Codec synthesis happens once, on first use
    let build_start = Instant::now();
    dynproto::prepare::<Catalog>().expect("Failed to build codec");
    println!("Built codecs in {:?}", build_start.elapsed());

    // Benchmark encoding
    let encode_start = Instant::now();
    let encoded = dynproto::marshal(&catalog).expect("Failed to encode");
    let encode_time = encode_start.elapsed();

    let prost_encode_start = Instant::now();
    let prost_encoded = prost::Message::encode_to_vec(&proto_catalog);
    let prost_encode_time = prost_encode_start.elapsed();

    println!("\nEncode:");
    println!(
        "  dynproto: {} bytes in {:?} ({:.2} MB/s)",
        encoded.len(),
        encode_time,
        throughput(encoded.len(), encode_time)
    );
    println!(
        "  prost:    {} bytes in {:?} ({:.2} MB/s)",
        prost_encoded.len(),
        prost_encode_time,
        throughput(prost_encoded.len(), prost_encode_time)
    );
    println!("  Identical output: {}", encoded == prost_encoded);

    // Benchmark decoding - multiple iterations
    const DECODE_ITERS: u32 = 20;
    // Warmup
    for _ in 0..3 {
        let mut decoded = Catalog::default();
        dynproto::unmarshal(&encoded, &mut decoded).expect("Failed to decode");
    }
    let decode_start = Instant::now();
    let mut decoded = None;
    for _ in 0..DECODE_ITERS {
        let mut catalog = Catalog::default();
        dynproto::unmarshal(&encoded, &mut catalog).expect("Failed to decode");
        decoded = Some(catalog);
    }
    let decode_time = decode_start.elapsed() / DECODE_ITERS;

    let prost_decode_start = Instant::now();
    let mut prost_decoded = None;
    for _ in 0..DECODE_ITERS {
        prost_decoded = Some(
            <pb::Catalog as prost::Message>::decode(encoded.as_slice()).expect("Failed to decode"),
        );
    }
    let prost_decode_time = prost_decode_start.elapsed() / DECODE_ITERS;

    println!("\nDecode (avg of {} iterations):", DECODE_ITERS);
    println!(
        "  dynproto: {:?} ({:.2} MB/s)",
        decode_time,
        throughput(encoded.len(), decode_time)
    );
    println!(
        "  prost:    {:?} ({:.2} MB/s)",
        prost_decode_time,
        throughput(encoded.len(), prost_decode_time)
    );

    // Verify decode
    assert_eq!(decoded.as_ref(), Some(&catalog));
    assert_eq!(prost_decoded.as_ref(), Some(&proto_catalog));

    // Summary
    println!("\n=== Summary ===");
    println!("Products: {}", catalog.products.len());
    println!(
        "Encoded size: {} bytes ({:.1} KB)",
        encoded.len(),
        encoded.len() as f64 / 1024.0
    );
    println!(
        "Encode time vs prost: {:.2}x",
        encode_time.as_secs_f64() / prost_encode_time.as_secs_f64()
    );
    println!(
        "Decode time vs prost: {:.2}x",
        decode_time.as_secs_f64() / prost_decode_time.as_secs_f64()
    );
}
