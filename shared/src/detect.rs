//! Detection vocabulary: what a signature subscribes to, how it describes
//! itself, and what it emits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::SELECTOR_ANY;
use crate::events::Event;

/// Scalar metadata value. The property map stays open: exporters and
/// compliance mappers add their own keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Property {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<&str> for Property {
    fn from(s: &str) -> Self {
        Property::Str(s.to_string())
    }
}

impl From<String> for Property {
    fn from(s: String) -> Self {
        Property::Str(s)
    }
}

impl From<i64> for Property {
    fn from(i: i64) -> Self {
        Property::Int(i)
    }
}

impl From<i32> for Property {
    fn from(i: i32) -> Self {
        Property::Int(i64::from(i))
    }
}

impl From<bool> for Property {
    fn from(b: bool) -> Self {
        Property::Bool(b)
    }
}

impl From<f64> for Property {
    fn from(f: f64) -> Self {
        Property::Float(f)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SignatureMetadata {
    pub id: String,
    pub version: String,
    pub name: String,
    pub event_name: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, Property>,
}

impl SignatureMetadata {
    /// `Severity` property, when it is an integer.
    pub fn severity(&self) -> Option<i64> {
        match self.properties.get("Severity") {
            Some(Property::Int(s)) => Some(*s),
            _ => None,
        }
    }
}

/// `(source, name, origin)` subscription. Empty name/origin mean "any".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SignatureEventSelector {
    pub source: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub origin: String,
}

impl SignatureEventSelector {
    pub fn new(source: &str, name: &str, origin: &str) -> Self {
        Self {
            source: source.to_string(),
            name: name.to_string(),
            origin: origin.to_string(),
        }
    }

    /// Same selector with empty name/origin replaced by the wildcard.
    pub fn normalized(&self) -> Self {
        let any = |s: &str| if s.is_empty() { SELECTOR_ANY.to_string() } else { s.to_string() };
        Self {
            source: self.source.clone(),
            name: any(&self.name),
            origin: any(&self.origin),
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        let sel = self.normalized();
        sel.source == event.source
            && (sel.name == SELECTOR_ANY || sel.name == event.name)
            && (sel.origin == SELECTOR_ANY || sel.origin == event.resolved_origin().as_str())
    }
}

/// One detection. Carries a snapshot of the signature's metadata and a copy
/// of the triggering event; never modified after it is emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub sig_metadata: SignatureMetadata,
    pub event: Event,
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
}

impl Finding {
    pub fn new(sig_metadata: SignatureMetadata, event: &Event) -> Self {
        Self {
            sig_metadata,
            event: event.clone(),
            data: BTreeMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Out-of-band control message delivered to signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    /// The named source closed its stream; no more events will follow.
    SourceComplete(String),
}
