//! Fuzz target for peer directory merging
//!
//! # Strategy
//!
//! - Small key and URL alphabets so collisions are frequent
//! - Interleaved direct inserts and snapshot merges
//!
//! # Invariants
//!
//! - The first URL recorded for a key never changes
//! - Merging the same snapshot twice learns nothing the second time
//! - Every mapped URL is also listed
//! - The node's own URL stays first in the list

#![no_main]

use std::collections::{BTreeMap, HashMap};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sealpost_core::{NetworkNodes, PartyInfo};
use sealpost_crypto::PublicKey;

const OWN_URL: &str = "http://self";

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    AddNode { key: u8, url: u8 },
    AddUrl { url: u8 },
    Merge { from: u8, urls: Vec<u8>, keys: Vec<(u8, u8)> },
}

fn url(id: u8) -> String {
    format!("http://n{}", id % 8)
}

fn key(id: u8) -> PublicKey {
    PublicKey::from([id % 16; 32])
}

fuzz_target!(|ops: Vec<Op>| {
    let nodes = NetworkNodes::new(OWN_URL);
    let mut first_seen: HashMap<PublicKey, String> = HashMap::new();

    for op in ops {
        match op {
            Op::AddNode { key: k, url: u } => {
                first_seen.entry(key(k)).or_insert_with(|| url(u));
                nodes.add_node(key(k), &url(u));
            },
            Op::AddUrl { url: u } => {
                nodes.add_node_url(&url(u));
            },
            Op::Merge { from, urls, keys } => {
                let mut node_pks = BTreeMap::new();
                for (k, u) in keys {
                    node_pks.entry(key(k)).or_insert_with(|| url(u));
                }
                for (k, u) in &node_pks {
                    first_seen.entry(*k).or_insert_with(|| u.clone());
                }
                let info = PartyInfo {
                    url: url(from),
                    node_urls: urls.into_iter().map(url).collect(),
                    node_pks,
                };

                nodes.merge(&info);
                assert!(!nodes.merge(&info), "second merge of the same snapshot learned something");
            },
        }
    }

    let listed = nodes.node_urls();
    assert_eq!(listed.first().map(String::as_str), Some(OWN_URL));
    for (k, expected) in &first_seen {
        let mapped = nodes.url_for_recipient(k);
        assert_eq!(mapped.as_ref(), Some(expected), "first writer lost its mapping");
        assert!(listed.contains(expected));
    }
});
