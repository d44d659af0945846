//! Command line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Default HTTP port for the server.
pub const DEFAULT_PORT: u16 = 48402;

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "signpost")]
#[command(about = "CAS + long-poll server for named JSON registers")]
pub struct Args {
    /// Directory holding one <name>.json file per register.
    #[arg(short = 'd', long, default_value = ".", env = "SIGNPOST_STATE_DIR")]
    pub state_dir: PathBuf,

    /// HTTP port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "SIGNPOST_PORT")]
    pub port: u16,

    /// Bind address for the HTTP server.
    #[arg(short, long, default_value = "0.0.0.0", env = "SIGNPOST_BIND")]
    pub bind: String,

    /// Upper bound on how long a poll may block, in seconds.
    /// Unset means a poll on a register that never changes blocks
    /// indefinitely, as in the original protocol.
    #[arg(long, env = "SIGNPOST_POLL_TIMEOUT_SECS")]
    pub poll_timeout_secs: Option<u64>,
}

impl Args {
    /// Poll bound as a duration, if configured.
    pub fn poll_timeout(&self) -> Option<Duration> {
        self.poll_timeout_secs.map(Duration::from_secs)
    }
}
