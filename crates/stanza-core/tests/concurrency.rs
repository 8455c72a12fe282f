//! Envelopes shared across threads.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use stanza_core::{DefaultExtension, Envelope, Extension, ExtensionRef, SequentialIdGenerator};

const WRITERS: usize = 8;
const PER_WRITER: usize = 200;

fn tagged(writer: usize, n: usize) -> ExtensionRef {
    let mut ext = DefaultExtension::new("x", "urn:test").unwrap();
    ext.set_value("w", writer.to_string()).unwrap();
    ext.set_value("n", n.to_string()).unwrap();
    Arc::new(ext)
}

fn tag_of(ext: &ExtensionRef) -> (usize, usize) {
    // Parse back "<x xmlns=\"urn:test\"><w>W</w><n>N</n></x>".
    let xml = ext.to_xml();
    let field = |name: &str| -> usize {
        let open = format!("<{name}>");
        let start = xml.find(&open).unwrap() + open.len();
        let end = xml[start..].find('<').unwrap() + start;
        xml[start..end].parse().unwrap()
    };
    (field("w"), field("n"))
}

#[test]
fn concurrent_adds_lose_nothing() {
    let env = Arc::new(Envelope::new());

    let writers: Vec<_> = (0..WRITERS)
        .map(|w| {
            let env = Arc::clone(&env);
            thread::spawn(move || {
                for n in 0..PER_WRITER {
                    env.add_extension(tagged(w, n));
                }
            })
        })
        .collect();

    // Snapshots taken during the storm must be consistent prefixes per writer.
    let reader = {
        let env = Arc::clone(&env);
        thread::spawn(move || {
            for _ in 0..200 {
                let snap = env.extensions();
                let mut next = vec![0usize; WRITERS];
                for ext in &snap {
                    assert_eq!(ext.element_name(), "x");
                    let (w, n) = tag_of(ext);
                    assert_eq!(n, next[w], "writer {w} out of order in snapshot");
                    next[w] += 1;
                }
            }
        })
    };

    for h in writers {
        h.join().unwrap();
    }
    reader.join().unwrap();

    let all = env.extensions();
    assert_eq!(all.len(), WRITERS * PER_WRITER);
    let distinct: HashSet<_> = all.iter().map(tag_of).collect();
    assert_eq!(distinct.len(), WRITERS * PER_WRITER);
}

#[test]
fn concurrent_property_writes_and_reads() {
    let env = Arc::new(Envelope::new());

    let handles: Vec<_> = (0..WRITERS)
        .map(|w| {
            let env = Arc::clone(&env);
            thread::spawn(move || {
                for n in 0..PER_WRITER {
                    env.set_property(format!("k{w}"), n as i32);
                    let _ = env.property_names();
                    let _ = env.render_extensions_and_properties();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(env.property_names().len(), WRITERS);
    for w in 0..WRITERS {
        assert_eq!(
            env.property(&format!("k{w}")).unwrap().as_i32(),
            Some(PER_WRITER as i32 - 1)
        );
    }
}

#[test]
fn first_read_id_is_agreed_on() {
    let env = Arc::new(Envelope::with_id_generator(Arc::new(
        SequentialIdGenerator::with_prefix("race-"),
    )));

    let handles: Vec<_> = (0..WRITERS)
        .map(|_| {
            let env = Arc::clone(&env);
            thread::spawn(move || env.id().unwrap())
        })
        .collect();

    let ids: HashSet<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(ids.len(), 1);
    assert!(ids.contains("race-0"));
}

#[test]
fn distinct_envelopes_get_distinct_ids() {
    let handles: Vec<_> = (0..WRITERS)
        .map(|_| {
            thread::spawn(|| {
                (0..100)
                    .map(|_| Envelope::new().id().unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for h in handles {
        for id in h.join().unwrap() {
            assert!(seen.insert(id));
        }
    }
}
