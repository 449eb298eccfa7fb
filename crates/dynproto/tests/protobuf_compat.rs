//! Wire compatibility against prost-generated messages.

use std::collections::BTreeMap;

use dynproto::{Fixed64, Sfixed32, Sint32, marshal, message, unmarshal};
use proptest::prelude::*;

message! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Address {
        pub street: String = 1,
        pub zip: u32 = 2,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Person {
        pub id: u64 = 1,
        pub name: String = 2,
        pub age: i32 = 3,
        pub offset: Sint32 = 4,
        pub token: Fixed64 = 5,
        pub bias: Sfixed32 = 6,
        pub score: f32 = 7,
        pub active: bool = 8,
        pub avatar: Vec<u8> = 9,
        pub home: Option<Address> = 10,
        pub visits: Vec<u32> = 11,
        pub emails: Vec<String> = 12,
        pub previous: Vec<Address> = 13,
        pub notes: BTreeMap<String, String> = 14,
        pub limits: BTreeMap<u32, i64> = 15,
        pub nickname: Option<String> = 16,
    }

    /// A reader that knows two of Person's fields.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Badge {
        pub name: String = 2,
        pub token: Fixed64 = 5,
    }
}

mod pb {
    use std::collections::BTreeMap;

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Address {
        #[prost(string, tag = "1")]
        pub street: String,
        #[prost(uint32, tag = "2")]
        pub zip: u32,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Person {
        #[prost(uint64, tag = "1")]
        pub id: u64,
        #[prost(string, tag = "2")]
        pub name: String,
        #[prost(int32, tag = "3")]
        pub age: i32,
        #[prost(sint32, tag = "4")]
        pub offset: i32,
        #[prost(fixed64, tag = "5")]
        pub token: u64,
        #[prost(sfixed32, tag = "6")]
        pub bias: i32,
        #[prost(float, tag = "7")]
        pub score: f32,
        #[prost(bool, tag = "8")]
        pub active: bool,
        #[prost(bytes = "vec", tag = "9")]
        pub avatar: Vec<u8>,
        #[prost(message, optional, tag = "10")]
        pub home: Option<Address>,
        #[prost(uint32, repeated, packed = "false", tag = "11")]
        pub visits: Vec<u32>,
        #[prost(string, repeated, tag = "12")]
        pub emails: Vec<String>,
        #[prost(message, repeated, tag = "13")]
        pub previous: Vec<Address>,
        #[prost(btree_map = "string, string", tag = "14")]
        pub notes: BTreeMap<String, String>,
        #[prost(btree_map = "uint32, int64", tag = "15")]
        pub limits: BTreeMap<u32, i64>,
        #[prost(string, optional, tag = "16")]
        pub nickname: Option<String>,
    }

    /// Same field as `Person::visits`, in the packed form prost uses by default.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct PackedVisits {
        #[prost(uint32, repeated, tag = "11")]
        pub visits: Vec<u32>,
    }
}

fn to_pb_address(address: &Address) -> pb::Address {
    pb::Address {
        street: address.street.clone(),
        zip: address.zip,
    }
}

fn to_pb(person: &Person) -> pb::Person {
    pb::Person {
        id: person.id,
        name: person.name.clone(),
        age: person.age,
        offset: person.offset.0,
        token: person.token.0,
        bias: person.bias.0,
        score: person.score,
        active: person.active,
        avatar: person.avatar.clone(),
        home: person.home.as_ref().map(to_pb_address),
        visits: person.visits.clone(),
        emails: person.emails.clone(),
        previous: person.previous.iter().map(to_pb_address).collect(),
        notes: person.notes.clone(),
        limits: person.limits.clone(),
        nickname: person.nickname.clone(),
    }
}

fn address() -> impl Strategy<Value = Address> {
    ("[a-z ]{0,8}", any::<u32>()).prop_map(|(street, zip)| Address { street, zip })
}

fn person() -> impl Strategy<Value = Person> {
    let scalars = (
        any::<u64>(),
        ".{0,8}",
        any::<i32>(),
        any::<i32>(),
        any::<u64>(),
        any::<i32>(),
        -1.0e6f32..1.0e6,
        any::<bool>(),
        prop::collection::vec(any::<u8>(), 0..8),
    );
    let nested = (
        prop::option::of(address()),
        prop::collection::vec(any::<u32>(), 0..6),
        prop::collection::vec("[a-z@.]{0,6}", 0..3),
        prop::collection::vec(address(), 0..3),
        prop::collection::btree_map("[a-z]{0,3}", "[a-z]{0,3}", 0..3),
        prop::collection::btree_map(any::<u32>(), any::<i64>(), 0..3),
        prop::option::of("[a-z]{0,4}"),
    );
    (scalars, nested).prop_map(
        |(
            (id, name, age, offset, token, bias, score, active, avatar),
            (home, visits, emails, previous, notes, limits, nickname),
        )| Person {
            id,
            name,
            age,
            offset: Sint32(offset),
            token: Fixed64(token),
            bias: Sfixed32(bias),
            score,
            active,
            avatar,
            home,
            visits,
            emails,
            previous,
            notes,
            limits,
            nickname,
        },
    )
}

proptest! {
    #[test]
    fn prop_output_matches_prost(value in person()) {
        let ours = marshal(&value).unwrap();
        let theirs = prost::Message::encode_to_vec(&to_pb(&value));
        prop_assert_eq!(ours, theirs);
    }

    #[test]
    fn prop_decodes_prost_output(value in person()) {
        let bytes = prost::Message::encode_to_vec(&to_pb(&value));
        let mut decoded = Person::default();
        unmarshal(&bytes, &mut decoded).unwrap();
        prop_assert_eq!(decoded, value);
    }
}

#[test]
fn test_negative_int32_is_ten_bytes() {
    let value = Person {
        age: -1,
        ..Default::default()
    };
    let bytes = marshal(&value).unwrap();
    assert_eq!(bytes.len(), 1 + 10);
    assert_eq!(bytes, prost::Message::encode_to_vec(&to_pb(&value)));
}

#[test]
fn test_present_empty_message_and_string() {
    let value = Person {
        home: Some(Address::default()),
        nickname: Some(String::new()),
        ..Default::default()
    };
    let bytes = marshal(&value).unwrap();
    assert_eq!(bytes, vec![0x52, 0x00, 0x82, 0x01, 0x00]);

    let decoded: pb::Person = prost::Message::decode(bytes.as_slice()).unwrap();
    assert_eq!(decoded.home, Some(pb::Address::default()));
    assert_eq!(decoded.nickname, Some(String::new()));
}

#[test]
fn test_decodes_packed_scalars() {
    let packed = pb::PackedVisits {
        visits: vec![0, 1, 300, u32::MAX],
    };
    let bytes = prost::Message::encode_to_vec(&packed);
    assert_eq!(bytes[0], 0x5A);

    let mut decoded = Person::default();
    unmarshal(&bytes, &mut decoded).unwrap();
    assert_eq!(decoded.visits, packed.visits);
}

#[test]
fn test_zero_map_entries_match_prost() {
    let mut limits = BTreeMap::new();
    limits.insert(0u32, 0i64);
    limits.insert(5, -2);
    let value = Person {
        limits,
        ..Default::default()
    };
    let bytes = marshal(&value).unwrap();
    assert_eq!(&bytes[..3], &[0x7A, 0x00, 0x7A]);
    assert_eq!(bytes, prost::Message::encode_to_vec(&to_pb(&value)));
}

#[test]
fn test_skips_fields_it_does_not_know() {
    let value = pb::Person {
        id: 9,
        name: "kept".to_string(),
        token: 77,
        visits: vec![1, 2],
        home: Some(pb::Address {
            street: "main".to_string(),
            zip: 1,
        }),
        ..Default::default()
    };
    let bytes = prost::Message::encode_to_vec(&value);

    let mut decoded = Badge::default();
    unmarshal(&bytes, &mut decoded).unwrap();
    assert_eq!(
        decoded,
        Badge {
            name: "kept".to_string(),
            token: Fixed64(77),
        }
    );
}

#[test]
fn test_wire_type_mismatch_is_an_error() {
    // Field 1 is a varint in Person but a string in Address.
    let bytes = prost::Message::encode_to_vec(&pb::Person {
        id: 9,
        ..Default::default()
    });
    let mut decoded = Address::default();
    assert!(unmarshal(&bytes, &mut decoded).is_err());
}
