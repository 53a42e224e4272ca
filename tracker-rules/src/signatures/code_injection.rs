// src/signatures/code_injection.rs

//! TRC-103: writes into another process' memory, either through
//! `ptrace(PTRACE_POKETEXT|PTRACE_POKEDATA)` or by opening `/proc/<pid>/mem`
//! for writing.

use regex::Regex;
use shared::constants::SOURCE_TRACKER;
use shared::helpers::is_file_write;
use shared::{Event, Finding, Property, SignatureEventSelector, SignatureMetadata};

use crate::engine::{FindingSink, Signature, SignatureContext, SignatureError, emit};

const PROC_MEM_PATTERN: &str = r"/proc/(?:\d.+|self)/mem";

pub struct CodeInjection {
    cb: Option<FindingSink>,
    proc_mem: Option<Regex>,
    metadata: SignatureMetadata,
}

impl CodeInjection {
    pub fn new() -> Self {
        Self {
            cb: None,
            proc_mem: None,
            metadata: SignatureMetadata {
                id: "TRC-103".into(),
                version: "1".into(),
                name: "Code injection".into(),
                event_name: "code_injection".into(),
                description: "Possible process injection detected during runtime".into(),
                tags: vec!["linux".into(), "container".into()],
                properties: [
                    ("Severity".to_string(), Property::Int(3)),
                    ("MITRE ATT&CK".to_string(), "Defense Evasion: Process Injection".into()),
                ]
                .into(),
            },
        }
    }

    pub fn boxed() -> Result<Box<dyn Signature>, SignatureError> {
        Ok(Box::new(Self::new()))
    }
}

impl Default for CodeInjection {
    fn default() -> Self {
        Self::new()
    }
}

impl Signature for CodeInjection {
    fn init(&mut self, ctx: SignatureContext) -> Result<(), SignatureError> {
        self.proc_mem = Some(Regex::new(PROC_MEM_PATTERN)?);
        self.cb = Some(ctx.callback);
        Ok(())
    }

    fn metadata(&self) -> SignatureMetadata {
        self.metadata.clone()
    }

    fn selected_events(&self) -> Result<Vec<SignatureEventSelector>, SignatureError> {
        Ok(["ptrace", "open", "openat"]
            .into_iter()
            .map(|name| SignatureEventSelector::new(SOURCE_TRACKER, name, "*"))
            .collect())
    }

    fn on_event(&mut self, event: &Event) -> Result<(), SignatureError> {
        match event.name.as_str() {
            "open" | "openat" => {
                let flags = event.get_str_argument("flags")?;
                if !is_file_write(flags) {
                    return Ok(());
                }
                let proc_mem = self.proc_mem.as_ref().ok_or(SignatureError::NotInitialized)?;
                let pathname = event.get_str_argument("pathname")?;
                if proc_mem.is_match(pathname) {
                    let finding = Finding::new(self.metadata.clone(), event)
                        .with_data("file flags", flags)
                        .with_data("file path", pathname);
                    emit(&self.cb, finding)?;
                }
            }
            "ptrace" => {
                let request = event.get_str_argument("request")?;
                if request == "PTRACE_POKETEXT" || request == "PTRACE_POKEDATA" {
                    let finding = Finding::new(self.metadata.clone(), event).with_data("ptrace request", request);
                    emit(&self.cb, finding)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signatures::armed;
    use shared::ArgError;

    #[test]
    fn poke_requests_are_injection() {
        let (mut sig, rx) = armed(CodeInjection::new());

        sig.on_event(&Event::new("ptrace").with_arg("request", "PTRACE_POKEDATA")).unwrap();
        sig.on_event(&Event::new("ptrace").with_arg("request", "PTRACE_ATTACH")).unwrap();

        let found: Vec<Finding> = rx.try_iter().collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].data["ptrace request"], "PTRACE_POKEDATA");
    }

    #[test]
    fn proc_mem_write_open() {
        let (mut sig, rx) = armed(CodeInjection::new());

        let open = |path: &str, flags: &str| Event::new("openat").with_arg("flags", flags).with_arg("pathname", path);
        sig.on_event(&open("/proc/self/mem", "O_RDWR")).unwrap();
        sig.on_event(&open("/proc/1234/mem", "O_WRONLY|O_CREAT")).unwrap();
        sig.on_event(&open("/proc/self/mem", "O_RDONLY")).unwrap();
        sig.on_event(&open("/proc/self/maps", "O_RDWR")).unwrap();

        let paths: Vec<_> = rx.try_iter().map(|f| f.data["file path"].clone()).collect();
        assert_eq!(paths, vec!["/proc/self/mem", "/proc/1234/mem"]);
    }

    #[test]
    fn missing_request_is_an_argument_error() {
        let (mut sig, _rx) = armed(CodeInjection::new());
        let err = sig.on_event(&Event::new("ptrace")).unwrap_err();
        assert!(matches!(err, SignatureError::Argument(ArgError::NotFound(_))));
    }

    #[test]
    fn proc_mem_open_before_init_is_rejected() {
        let mut sig = CodeInjection::new();
        let open = Event::new("openat").with_arg("flags", "O_RDWR").with_arg("pathname", "/proc/self/mem");
        assert!(matches!(sig.on_event(&open), Err(SignatureError::NotInitialized)));
    }
}
