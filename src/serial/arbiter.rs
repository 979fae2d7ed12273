//! Port sharing between terminal sessions and uploads
//!
//! The serial device is the one genuinely contended resource: a live
//! terminal session may hold it open while an upload needs it. The
//! arbiter owns the per-port session state; an upload asks for the port,
//! which suspends the holding session and flags its interest to
//! reconnect, and the post-upload settle signal reconnects exactly the
//! flagged sessions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Connection state of one registered terminal session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SessionState {
    connected: bool,
    should_reconnect: bool,
}

/// Explicit ownership arbiter for serial ports.
///
/// Cheap to clone; all clones share state.
#[derive(Debug, Clone, Default)]
pub struct PortArbiter {
    sessions: Arc<Mutex<HashMap<String, SessionState>>>,
}

impl PortArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A terminal session opened the port.
    pub fn session_connected(&self, port: &str) {
        let mut sessions = self.sessions.lock().expect("arbiter lock");
        sessions.insert(
            port.to_string(),
            SessionState {
                connected: true,
                should_reconnect: false,
            },
        );
    }

    /// A terminal session closed the port on its own. A deliberate
    /// disconnect also withdraws any pending reconnect interest.
    pub fn session_disconnected(&self, port: &str) {
        let mut sessions = self.sessions.lock().expect("arbiter lock");
        if let Some(state) = sessions.get_mut(port) {
            state.connected = false;
            state.should_reconnect = false;
        }
    }

    /// The session is going away entirely (window closed).
    pub fn session_closed(&self, port: &str) {
        let mut sessions = self.sessions.lock().expect("arbiter lock");
        sessions.remove(port);
    }

    /// An upload is about to claim the port. Suspends a connected session
    /// and records its interest in reconnecting later. Returns whether a
    /// session was suspended.
    pub fn port_needed_for_upload(&self, port: &str) -> bool {
        let mut sessions = self.sessions.lock().expect("arbiter lock");
        match sessions.get_mut(port) {
            Some(state) if state.connected => {
                state.connected = false;
                state.should_reconnect = true;
                log::info!("Suspending terminal session on {} for upload", port);
                true
            }
            _ => false,
        }
    }

    /// The upload finished and the device has settled. Only sessions that
    /// were suspended for the upload come back. Returns whether a session
    /// reconnected.
    pub fn port_available_after_upload(&self, port: &str) -> bool {
        let mut sessions = self.sessions.lock().expect("arbiter lock");
        match sessions.get_mut(port) {
            Some(state) if state.should_reconnect => {
                state.connected = true;
                state.should_reconnect = false;
                log::info!("Reconnecting terminal session on {}", port);
                true
            }
            _ => false,
        }
    }

    /// Whether a session currently holds the port open.
    pub fn is_connected(&self, port: &str) -> bool {
        let sessions = self.sessions.lock().expect("arbiter lock");
        sessions.get(port).map(|s| s.connected).unwrap_or(false)
    }

    /// Whether a suspended session is waiting to reconnect.
    pub fn wants_reconnect(&self, port: &str) -> bool {
        let sessions = self.sessions.lock().expect("arbiter lock");
        sessions
            .get(port)
            .map(|s| s.should_reconnect)
            .unwrap_or(false)
    }
}
