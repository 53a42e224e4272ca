// src/signatures/hidden_file_created.rs

//! TRC-1015: an ELF binary written under a dot-path.

use shared::constants::SOURCE_TRACKER;
use shared::helpers::is_elf;
use shared::{Event, Finding, SignatureEventSelector, SignatureMetadata};

use super::attack_properties;
use crate::engine::{FindingSink, Signature, SignatureContext, SignatureError, emit};

const HIDDEN_PATH_PATTERN: &str = "/.";

#[derive(Default)]
pub struct HiddenFileCreated {
    cb: Option<FindingSink>,
}

impl HiddenFileCreated {
    pub fn boxed() -> Result<Box<dyn Signature>, SignatureError> {
        Ok(Box::new(Self::default()))
    }
}

impl Signature for HiddenFileCreated {
    fn init(&mut self, ctx: SignatureContext) -> Result<(), SignatureError> {
        self.cb = Some(ctx.callback);
        Ok(())
    }

    fn metadata(&self) -> SignatureMetadata {
        SignatureMetadata {
            id: "TRC-1015".into(),
            version: "1".into(),
            name: "Hidden executable creation detected".into(),
            event_name: "hidden_file_created".into(),
            description: "A hidden executable (ELF file) was created on disk. This activity could be legitimate; \
                          however, it could indicate that an adversary is trying to avoid detection by hiding \
                          their programs."
                .into(),
            tags: Vec::new(),
            properties: attack_properties(
                2,
                "defense-evasion",
                "Hidden Files and Directories",
                "attack-pattern--ec8fc7e2-b356-455c-8db5-2e37be158e7d",
                "T1564.001",
            ),
        }
    }

    fn selected_events(&self) -> Result<Vec<SignatureEventSelector>, SignatureError> {
        Ok(vec![SignatureEventSelector::new(SOURCE_TRACKER, "magic_write", "*")])
    }

    fn on_event(&mut self, event: &Event) -> Result<(), SignatureError> {
        if event.name != "magic_write" {
            return Ok(());
        }
        let bytes = event.get_bytes_argument("bytes")?;
        let pathname = event.get_str_argument("pathname")?;

        if is_elf(bytes) && pathname.contains(HIDDEN_PATH_PATTERN) {
            emit(&self.cb, Finding::new(self.metadata(), event))?;
        }
        Ok(())
    }
}
