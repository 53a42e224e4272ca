// src/engine/selector.rs

//! Selector index.
//!
//! Built once while signatures register, read-only afterwards. Layout is
//! `source → name → origin bucket → slots`, so a lookup borrows the event's
//! own strings and never allocates keys:
//!
//! ```text
//! "tracker" ─┬─ "security_file_open" ─ { any: [0, 3], host: [], container: [2] }
//!            ├─ "ptrace"             ─ { any: [1],    host: [], container: [] }
//!            └─ "*"                  ─ { any: [4],    host: [], container: [] }
//! ```

use std::collections::HashMap;

use shared::constants::{ORIGIN_CONTAINER, ORIGIN_HOST, SELECTOR_ANY};
use shared::{Event, Origin, SignatureEventSelector};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("selector for '{0}' doesn't declare an input source")]
    MissingSource(String),

    #[error("unknown origin '{0}'")]
    UnknownOrigin(String),
}

#[derive(Debug, Default)]
struct OriginBuckets {
    any: Vec<usize>,
    host: Vec<usize>,
    container: Vec<usize>,
}

impl OriginBuckets {
    fn bucket_mut(&mut self, origin: &str) -> Result<&mut Vec<usize>, SelectorError> {
        match origin {
            SELECTOR_ANY => Ok(&mut self.any),
            ORIGIN_HOST => Ok(&mut self.host),
            ORIGIN_CONTAINER => Ok(&mut self.container),
            other => Err(SelectorError::UnknownOrigin(other.to_string())),
        }
    }

    fn matching(&self, origin: Origin) -> impl Iterator<Item = &usize> {
        let scoped = match origin {
            Origin::Host => &self.host,
            Origin::Container => &self.container,
        };
        self.any.iter().chain(scoped.iter())
    }
}

#[derive(Debug, Default)]
pub struct SelectorIndex {
    sources: HashMap<String, HashMap<String, OriginBuckets>>,
    selectors: usize,
}

impl SelectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `slot` to `selector`. Empty name/origin subscribe to any.
    pub fn insert(&mut self, selector: &SignatureEventSelector, slot: usize) -> Result<(), SelectorError> {
        if selector.source.is_empty() {
            return Err(SelectorError::MissingSource(selector.name.clone()));
        }
        let sel = selector.normalized();
        let bucket = self
            .sources
            .entry(sel.source)
            .or_default()
            .entry(sel.name)
            .or_default()
            .bucket_mut(&sel.origin)?;
        if !bucket.contains(&slot) {
            bucket.push(slot);
            self.selectors += 1;
        }
        Ok(())
    }

    /// Fill `out` with every slot subscribed to `event`, each once, in slot
    /// order. `out` is cleared first so callers can reuse the buffer.
    pub fn lookup(&self, event: &Event, out: &mut Vec<usize>) {
        out.clear();
        let Some(by_name) = self.sources.get(&event.source) else {
            return;
        };
        let origin = event.resolved_origin();
        for name in [event.name.as_str(), SELECTOR_ANY] {
            if let Some(buckets) = by_name.get(name) {
                out.extend(buckets.matching(origin));
            }
        }
        out.sort_unstable();
        out.dedup();
    }

    /// Number of distinct (selector, slot) subscriptions.
    pub fn len(&self) -> usize {
        self.selectors
    }

    pub fn is_empty(&self) -> bool {
        self.selectors == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sel(source: &str, name: &str, origin: &str) -> SignatureEventSelector {
        SignatureEventSelector::new(source, name, origin)
    }

    fn lookup(index: &SelectorIndex, event: &Event) -> Vec<usize> {
        let mut out = Vec::new();
        index.lookup(event, &mut out);
        out
    }

    #[test]
    fn routes_by_source_name_and_origin() {
        let mut index = SelectorIndex::new();
        index.insert(&sel("tracker", "security_file_open", "*"), 0).unwrap();
        index.insert(&sel("tracker", "security_file_open", "container"), 1).unwrap();
        index.insert(&sel("tracker", "security_file_open", "host"), 2).unwrap();
        index.insert(&sel("tracker", "ptrace", ""), 3).unwrap();
        index.insert(&sel("other", "security_file_open", "*"), 4).unwrap();

        let host = Event::new("security_file_open").with_origin(Origin::Host);
        let container = Event::new("security_file_open").with_origin(Origin::Container);

        assert_eq!(lookup(&index, &host), vec![0, 2]);
        assert_eq!(lookup(&index, &container), vec![0, 1]);
        assert_eq!(lookup(&index, &Event::new("ptrace")), vec![3]);
        assert!(lookup(&index, &Event::new("execve")).is_empty());
        assert!(lookup(&index, &Event::new("ptrace").with_source("falco")).is_empty());
    }

    #[test]
    fn overlapping_selectors_deliver_once() {
        let mut index = SelectorIndex::new();
        index.insert(&sel("tracker", "openat", "*"), 7).unwrap();
        index.insert(&sel("tracker", "openat", "container"), 7).unwrap();
        index.insert(&sel("tracker", "*", "*"), 7).unwrap();
        index.insert(&sel("tracker", "openat", "*"), 7).unwrap();

        let ev = Event::new("openat").with_origin(Origin::Container);
        assert_eq!(lookup(&index, &ev), vec![7]);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn name_wildcard_sees_every_event_of_its_source() {
        let mut index = SelectorIndex::new();
        index.insert(&sel("tracker", "", "host"), 0).unwrap();
        assert_eq!(lookup(&index, &Event::new("anything")), vec![0]);
        assert!(lookup(&index, &Event::new("anything").with_origin(Origin::Container)).is_empty());
    }

    #[test]
    fn rejects_bad_selectors() {
        let mut index = SelectorIndex::new();
        assert_eq!(
            index.insert(&sel("", "ptrace", "*"), 0),
            Err(SelectorError::MissingSource("ptrace".into()))
        );
        assert_eq!(
            index.insert(&sel("tracker", "ptrace", "vm"), 0),
            Err(SelectorError::UnknownOrigin("vm".into()))
        );
        assert!(index.is_empty());
    }
}
