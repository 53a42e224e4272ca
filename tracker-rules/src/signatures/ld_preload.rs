// src/signatures/ld_preload.rs

//! TRC-107: LD_PRELOAD style library injection.
//!
//! Three ways in:
//!   • a process exec'd with `LD_PRELOAD=` or `LD_LIBRARY_PATH=` in its env
//!   • `/etc/ld.so.preload` opened for writing
//!   • something renamed onto `/etc/ld.so.preload`

use shared::constants::SOURCE_TRACKER;
use shared::helpers::is_file_write;
use shared::{Event, Finding, SignatureEventSelector, SignatureMetadata};

use super::attack_properties;
use crate::engine::{FindingSink, Signature, SignatureContext, SignatureError, emit};

const PRELOAD_ENVS: [&str; 2] = ["LD_PRELOAD", "LD_LIBRARY_PATH"];
const PRELOAD_PATH: &str = "/etc/ld.so.preload";

#[derive(Default)]
pub struct LdPreload {
    cb: Option<FindingSink>,
}

impl LdPreload {
    pub fn boxed() -> Result<Box<dyn Signature>, SignatureError> {
        Ok(Box::new(Self::default()))
    }

    /// First env entry that sets a preload variable, with the variable name.
    fn preload_env(env: &[String]) -> Option<(&'static str, &str)> {
        env.iter().find_map(|entry| {
            PRELOAD_ENVS.iter().find_map(|var| {
                entry
                    .strip_prefix(var)
                    .is_some_and(|rest| rest.starts_with('='))
                    .then_some((*var, entry.as_str()))
            })
        })
    }
}

impl Signature for LdPreload {
    fn init(&mut self, ctx: SignatureContext) -> Result<(), SignatureError> {
        self.cb = Some(ctx.callback);
        Ok(())
    }

    fn metadata(&self) -> SignatureMetadata {
        SignatureMetadata {
            id: "TRC-107".into(),
            version: "1".into(),
            name: "LD_PRELOAD code injection detected".into(),
            event_name: "ld_preload".into(),
            description: "LD_PRELOAD usage was detected. LD_PRELOAD lets you load your library before any other \
                          library, allowing you to hook functions in a process. Adversaries may use this technique \
                          to change your applications' behavior or load their own programs."
                .into(),
            tags: Vec::new(),
            properties: attack_properties(
                2,
                "persistence",
                "Hijack Execution Flow",
                "attack-pattern--aedfca76-3b30-4866-b2aa-0f1d7fd1e4b6",
                "T1574",
            ),
        }
    }

    fn selected_events(&self) -> Result<Vec<SignatureEventSelector>, SignatureError> {
        Ok(["sched_process_exec", "security_file_open", "security_inode_rename"]
            .into_iter()
            .map(|name| SignatureEventSelector::new(SOURCE_TRACKER, name, "*"))
            .collect())
    }

    fn on_event(&mut self, event: &Event) -> Result<(), SignatureError> {
        match event.name.as_str() {
            "sched_process_exec" => {
                // exec events without an env are common; nothing to check
                let Ok(env) = event.get_str_slice_argument("env") else {
                    return Ok(());
                };
                if let Some((var, entry)) = Self::preload_env(env) {
                    emit(&self.cb, Finding::new(self.metadata(), event).with_data(var, entry))?;
                }
            }
            "security_file_open" => {
                let pathname = event.get_str_argument("pathname")?;
                let flags = event.get_str_argument("flags")?;
                if pathname.ends_with(PRELOAD_PATH) && is_file_write(flags) {
                    emit(&self.cb, Finding::new(self.metadata(), event))?;
                }
            }
            "security_inode_rename" => {
                let new_path = event.get_str_argument("new_path")?;
                if new_path.ends_with(PRELOAD_PATH) {
                    emit(&self.cb, Finding::new(self.metadata(), event))?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}
