// src/signatures/docker_abuse.rs

//! TRC-1019: a container talking to the Docker daemon socket, by writing to it
//! or by connecting to it as a Unix socket.

use shared::constants::{ORIGIN_CONTAINER, SOURCE_TRACKER};
use shared::helpers::{get_path_from_raw_addr, is_file_write, is_unix_family};
use shared::{Event, Finding, SignatureEventSelector, SignatureMetadata};

use super::attack_properties;
use crate::engine::{FindingSink, Signature, SignatureContext, SignatureError, emit};

const DOCKER_SOCK: &str = "docker.sock";

#[derive(Default)]
pub struct DockerAbuse {
    cb: Option<FindingSink>,
}

impl DockerAbuse {
    pub fn boxed() -> Result<Box<dyn Signature>, SignatureError> {
        Ok(Box::new(Self::default()))
    }
}

impl Signature for DockerAbuse {
    fn init(&mut self, ctx: SignatureContext) -> Result<(), SignatureError> {
        self.cb = Some(ctx.callback);
        Ok(())
    }

    fn metadata(&self) -> SignatureMetadata {
        SignatureMetadata {
            id: "TRC-1019".into(),
            version: "1".into(),
            name: "Docker socket abuse detected".into(),
            event_name: "docker_abuse".into(),
            description: "An attempt to abuse the Docker UNIX socket inside a container was detected. docker.sock \
                          is the UNIX socket that Docker uses as the entry point to the Docker API. Adversaries \
                          may attempt to abuse this socket to compromise the system."
                .into(),
            tags: Vec::new(),
            properties: attack_properties(
                2,
                "privilege-escalation",
                "Exploitation for Privilege Escalation",
                "attack-pattern--b21c3b2d-02e6-45b1-980b-e69051040839",
                "T1068",
            ),
        }
    }

    fn selected_events(&self) -> Result<Vec<SignatureEventSelector>, SignatureError> {
        Ok(vec![
            SignatureEventSelector::new(SOURCE_TRACKER, "security_file_open", ORIGIN_CONTAINER),
            SignatureEventSelector::new(SOURCE_TRACKER, "security_socket_connect", ORIGIN_CONTAINER),
        ])
    }

    fn on_event(&mut self, event: &Event) -> Result<(), SignatureError> {
        let path = match event.name.as_str() {
            "security_file_open" => {
                let pathname = event.get_str_argument("pathname")?;
                let flags = event.get_str_argument("flags")?;
                if !is_file_write(flags) {
                    return Ok(());
                }
                pathname
            }
            "security_socket_connect" => {
                let addr = event.get_raw_addr_argument("remote_addr")?;
                if !is_unix_family(addr)? {
                    return Ok(());
                }
                get_path_from_raw_addr(addr)?
            }
            _ => return Ok(()),
        };

        if path.ends_with(DOCKER_SOCK) {
            emit(&self.cb, Finding::new(self.metadata(), event))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signatures::armed;
    use std::collections::BTreeMap;

    fn connect(family: &str, path: &str) -> Event {
        let addr = BTreeMap::from([
            ("sa_family".to_string(), family.to_string()),
            ("sun_path".to_string(), path.to_string()),
        ]);
        Event::new("security_socket_connect").with_arg("remote_addr", addr)
    }

    #[test]
    fn unix_connect_to_docker_sock() {
        let (mut sig, rx) = armed(DockerAbuse::default());
        sig.on_event(&connect("AF_UNIX", "/var/run/docker.sock")).unwrap();
        sig.on_event(&connect("AF_UNIX", "/var/run/containerd.sock")).unwrap();
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn inet_connect_is_ignored() {
        let (mut sig, rx) = armed(DockerAbuse::default());
        let addr = BTreeMap::from([
            ("sa_family".to_string(), "AF_INET".to_string()),
            ("sin_addr".to_string(), "10.0.0.1".to_string()),
            ("sin_port".to_string(), "2375".to_string()),
        ]);
        sig.on_event(&Event::new("security_socket_connect").with_arg("remote_addr", addr)).unwrap();
        assert_eq!(rx.try_iter().count(), 0);
    }

    #[test]
    fn write_open_of_docker_sock() {
        let (mut sig, rx) = armed(DockerAbuse::default());
        let open = |flags: &str| {
            Event::new("security_file_open").with_arg("pathname", "/run/docker.sock").with_arg("flags", flags)
        };
        sig.on_event(&open("O_RDWR")).unwrap();
        sig.on_event(&open("O_RDONLY")).unwrap();
        assert_eq!(rx.try_iter().count(), 1);
    }
}
