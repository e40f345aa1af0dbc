use std::time::Duration;

/// Directory where the kernel publishes device nodes.
pub const DEV_ROOT_PATH: &str = "/dev";

/// Directory where device-mapper entries appear.
pub const DEV_MAPPER_PATH: &str = "/dev/mapper";

/// Name prefix of NBD device nodes under /dev.
pub const NBD_DEV_PREFIX: &str = "nbd";

/// Delay between liveness probes while waiting for a binding process to
/// exit.
pub const TERMINATION_POLL_INTERVAL: Duration = Duration::from_millis(100);
