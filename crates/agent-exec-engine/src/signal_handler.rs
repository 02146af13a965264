//! Signal handling for graceful server shutdown.
//!
//! SIGINT and SIGTERM wake the server loop through a shared [`Notify`].

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tokio::sync::Notify;
use tracing::info;

pub struct SignalHandler {
    #[allow(dead_code)]
    handle: JoinHandle<()>,
}

impl SignalHandler {
    /// Notify `shutdown` once when SIGINT or SIGTERM arrives.
    pub fn setup(shutdown: Arc<Notify>) -> io::Result<Self> {
        let mut signals = Signals::new([SIGINT, SIGTERM])?;

        let handle = thread::Builder::new()
            .name("signal-handler".to_string())
            .spawn(move || {
                if let Some(sig) = signals.forever().next() {
                    info!(signal = sig, "received signal, shutting down");
                    shutdown.notify_one();
                }
            })?;

        Ok(Self { handle })
    }
}
