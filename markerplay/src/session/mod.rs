//! Scan sessions.
//!
//! A [`Scanner`] wires catalog, tracking, playback and analytics together and
//! starts one [`ScanSession`] at a time.

mod error;
mod id;
mod scan;

pub use error::SessionError;
pub use id::{SessionId, SESSION_ID_LEN};
pub use scan::{ScanSession, Scanner};
