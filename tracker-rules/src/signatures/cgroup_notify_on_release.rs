// src/signatures/cgroup_notify_on_release.rs

//! TRC-106: a container writing a cgroup `notify_on_release` file, the first
//! step of the release_agent container escape.

use std::path::Path;

use shared::constants::{ORIGIN_CONTAINER, SOURCE_TRACKER};
use shared::helpers::is_file_write;
use shared::{Event, Finding, SignatureEventSelector, SignatureMetadata};

use super::attack_properties;
use crate::engine::{FindingSink, Signature, SignatureContext, SignatureError, emit};

const NOTIFY_FILE_NAME: &str = "notify_on_release";

#[derive(Default)]
pub struct CgroupNotifyOnRelease {
    cb: Option<FindingSink>,
}

impl CgroupNotifyOnRelease {
    pub fn boxed() -> Result<Box<dyn Signature>, SignatureError> {
        Ok(Box::new(Self::default()))
    }
}

impl Signature for CgroupNotifyOnRelease {
    fn init(&mut self, ctx: SignatureContext) -> Result<(), SignatureError> {
        self.cb = Some(ctx.callback);
        Ok(())
    }

    fn metadata(&self) -> SignatureMetadata {
        SignatureMetadata {
            id: "TRC-106".into(),
            version: "1".into(),
            name: "Cgroups notify_on_release file modification".into(),
            event_name: "cgroup_notify_on_release".into(),
            description: "An attempt to modify Cgroup notify_on_release file was detected. Cgroups are a Linux \
                          kernel feature which limits the resource usage of a set of processes. Adversaries may \
                          use this feature for container escaping."
                .into(),
            tags: Vec::new(),
            properties: attack_properties(
                3,
                "privilege-escalation",
                "Escape to Host",
                "attack-pattern--4a5b7ade-8bb5-4853-84ed-23f262002665",
                "T1611",
            ),
        }
    }

    fn selected_events(&self) -> Result<Vec<SignatureEventSelector>, SignatureError> {
        Ok(vec![SignatureEventSelector::new(SOURCE_TRACKER, "security_file_open", ORIGIN_CONTAINER)])
    }

    fn on_event(&mut self, event: &Event) -> Result<(), SignatureError> {
        if event.name != "security_file_open" {
            return Ok(());
        }
        let pathname = event.get_str_argument("pathname")?;
        let flags = event.get_str_argument("flags")?;

        let basename = Path::new(pathname).file_name().and_then(|n| n.to_str());
        if basename == Some(NOTIFY_FILE_NAME) && is_file_write(flags) {
            emit(&self.cb, Finding::new(self.metadata(), event))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signatures::armed;

    fn open(path: &str, flags: &str) -> Event {
        Event::new("security_file_open").with_arg("pathname", path).with_arg("flags", flags)
    }

    #[test]
    fn write_to_notify_on_release() {
        let (mut sig, rx) = armed(CgroupNotifyOnRelease::default());
        sig.on_event(&open("/sys/fs/cgroup/rdma/x/notify_on_release", "O_WRONLY")).unwrap();
        sig.on_event(&open("/sys/fs/cgroup/rdma/x/notify_on_release", "O_RDONLY")).unwrap();
        sig.on_event(&open("/sys/fs/cgroup/rdma/x/release_agent", "O_WRONLY")).unwrap();
        assert_eq!(rx.try_iter().count(), 1);
    }
}
