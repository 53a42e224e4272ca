// src/signatures/mod.rs

//! Bundled signatures and the registry the engine loads them from.
//!
//! Every entry is a zero-argument constructor. A constructor that fails is
//! logged and skipped; the remaining signatures still load.

mod cgroup_notify_on_release;
mod code_injection;
mod default_loader_modification;
mod docker_abuse;
mod hidden_file_created;
mod ld_preload;

use std::collections::BTreeMap;

use log::Level;
use shared::Property;

use crate::engine::{Signature, SignatureConstructor};
use crate::rules_log;

pub use cgroup_notify_on_release::CgroupNotifyOnRelease;
pub use code_injection::CodeInjection;
pub use default_loader_modification::DefaultLoaderModification;
pub use docker_abuse::DockerAbuse;
pub use hidden_file_created::HiddenFileCreated;
pub use ld_preload::LdPreload;

/// Every signature shipped with the binary, in load order.
pub const REGISTRY: &[SignatureConstructor] = &[
    CodeInjection::boxed,
    CgroupNotifyOnRelease::boxed,
    LdPreload::boxed,
    DefaultLoaderModification::boxed,
    HiddenFileCreated::boxed,
    DockerAbuse::boxed,
];

/// Construct the registry. With a non-empty `ids`, only signatures whose
/// metadata ID is listed are returned; unknown IDs are reported.
pub fn load(ids: &[String]) -> Vec<Box<dyn Signature>> {
    let mut loaded = Vec::with_capacity(REGISTRY.len());
    for ctor in REGISTRY {
        match ctor() {
            Ok(sig) => {
                if ids.is_empty() || ids.contains(&sig.metadata().id) {
                    loaded.push(sig);
                }
            }
            Err(e) => rules_log!(Level::Warn, "signatures", "failed to construct signature: {}", e),
        }
    }

    for id in ids {
        if !loaded.iter().any(|s| &s.metadata().id == id) {
            rules_log!(Level::Warn, "signatures", "unknown signature id '{}' in configuration", id);
        }
    }
    loaded
}

/// MITRE ATT&CK property set shared by the tracker signatures.
fn attack_properties(
    severity: i64,
    category: &str,
    technique: &str,
    id: &str,
    external_id: &str,
) -> BTreeMap<String, Property> {
    BTreeMap::from([
        ("Severity".to_string(), Property::Int(severity)),
        ("Category".to_string(), category.into()),
        ("Technique".to_string(), technique.into()),
        ("Kubernetes_Technique".to_string(), "".into()),
        ("id".to_string(), id.into()),
        ("external_id".to_string(), external_id.into()),
    ])
}

/// Signature initialised against a fresh sink, for rule-level unit tests.
#[cfg(test)]
pub(crate) fn armed<S: Signature>(mut sig: S) -> (S, crossbeam::channel::Receiver<shared::Finding>) {
    use crate::engine::{SignatureContext, sink};
    use crate::metrics::Stats;

    let (callback, rx) = sink::bounded(64, std::sync::Arc::new(Stats::default()));
    sig.init(SignatureContext { callback }).unwrap();
    (sig, rx)
}
