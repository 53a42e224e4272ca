/// Source name stamped on every event produced by the kernel tracer.
pub const SOURCE_TRACKER: &str = "tracker";

/// Selector value that matches any event name or any origin.
pub const SELECTOR_ANY: &str = "*";

pub const ORIGIN_HOST: &str = "host";
pub const ORIGIN_CONTAINER: &str = "container";

/// `\x7fELF`
pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

pub const AF_UNIX: &str = "AF_UNIX";
pub const AF_INET: &str = "AF_INET";
pub const AF_INET6: &str = "AF_INET6";
