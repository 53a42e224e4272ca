// src/signatures/default_loader_modification.rs

//! TRC-1012: the dynamic loader itself (`/lib*/ld*.so*`) opened for writing or
//! replaced by a rename.

use regex::Regex;
use shared::constants::SOURCE_TRACKER;
use shared::helpers::is_file_write;
use shared::{Event, Finding, SignatureEventSelector, SignatureMetadata};

use super::attack_properties;
use crate::engine::{FindingSink, Signature, SignatureContext, SignatureError, emit};

const DYNAMIC_LOADER_PATTERN: &str = r"^/(lib|usr/lib).*/ld.*\.so[^/]*";

#[derive(Default)]
pub struct DefaultLoaderModification {
    cb: Option<FindingSink>,
    loader: Option<Regex>,
}

impl DefaultLoaderModification {
    pub fn boxed() -> Result<Box<dyn Signature>, SignatureError> {
        Ok(Box::new(Self::default()))
    }
}

impl Signature for DefaultLoaderModification {
    fn init(&mut self, ctx: SignatureContext) -> Result<(), SignatureError> {
        self.loader = Some(Regex::new(DYNAMIC_LOADER_PATTERN)?);
        self.cb = Some(ctx.callback);
        Ok(())
    }

    fn metadata(&self) -> SignatureMetadata {
        SignatureMetadata {
            id: "TRC-1012".into(),
            version: "1".into(),
            name: "Default dynamic loader modification detected".into(),
            event_name: "default_loader_mod".into(),
            description: "The default dynamic loader has been modified. The dynamic loader is an executable file \
                          loaded to process memory and run before the executable to load dynamic libraries to the \
                          process. An attacker might use this technique to hijack the execution context of each \
                          new process and bypass defenses."
                .into(),
            tags: Vec::new(),
            properties: attack_properties(
                3,
                "defense-evasion",
                "Hijack Execution Flow",
                "attack-pattern--aedfca76-3b30-4866-b2aa-0f1d7fd1e4b6",
                "T1574",
            ),
        }
    }

    fn selected_events(&self) -> Result<Vec<SignatureEventSelector>, SignatureError> {
        Ok(vec![
            SignatureEventSelector::new(SOURCE_TRACKER, "security_file_open", "*"),
            SignatureEventSelector::new(SOURCE_TRACKER, "security_inode_rename", "*"),
        ])
    }

    fn on_event(&mut self, event: &Event) -> Result<(), SignatureError> {
        let loader = self.loader.as_ref().ok_or(SignatureError::NotInitialized)?;

        let path = match event.name.as_str() {
            "security_file_open" => {
                let flags = event.get_str_argument("flags")?;
                if !is_file_write(flags) {
                    return Ok(());
                }
                event.get_str_argument("pathname")?
            }
            "security_inode_rename" => event.get_str_argument("new_path")?,
            _ => return Ok(()),
        };

        if loader.is_match(path) {
            emit(&self.cb, Finding::new(self.metadata(), event))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signatures::armed;

    #[test]
    fn loader_paths() {
        let (mut sig, rx) = armed(DefaultLoaderModification::default());
        let open = |path: &str, flags: &str| {
            Event::new("security_file_open").with_arg("flags", flags).with_arg("pathname", path)
        };

        sig.on_event(&open("/lib/x86_64-linux-gnu/ld-linux-x86-64.so.2", "O_RDWR")).unwrap();
        sig.on_event(&open("/usr/lib64/ld-2.31.so", "O_WRONLY")).unwrap();
        sig.on_event(&open("/lib/x86_64-linux-gnu/ld-linux-x86-64.so.2", "O_RDONLY")).unwrap();
        sig.on_event(&open("/opt/lib/ld.so", "O_WRONLY")).unwrap();
        sig.on_event(&Event::new("security_inode_rename").with_arg("new_path", "/lib/ld-musl-x86_64.so.1")).unwrap();

        assert_eq!(rx.try_iter().count(), 3);
    }

    #[test]
    fn event_before_init_is_rejected() {
        let mut sig = DefaultLoaderModification::default();
        let ev = Event::new("security_inode_rename").with_arg("new_path", "/lib/ld.so");
        assert!(matches!(sig.on_event(&ev), Err(SignatureError::NotInitialized)));
    }
}
