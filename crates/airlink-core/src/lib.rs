//! Airlink core crate.
//!
//! Shared vocabulary for the Airlink connectivity layer: the link state
//! machine types, the error taxonomy, configuration structures, and the
//! collaborator traits that the connection manager and the command modules
//! are written against.
//!
//! ## Architecture
//!
//! The connectivity layer treats everything outside the session logic as a
//! collaborator behind a trait:
//! - [`Transport`]: the pub/sub client (start, publish, asynchronous
//!   events and inbound messages)
//! - [`NetworkControl`]: the radio/association stack (connect, disconnect,
//!   status queries)
//! - [`CredentialStore`]: persistence of saved network credentials
//!
//! In-memory mock implementations of all three live in [`mock`] and are
//! used by the test suites and the demo example.

pub mod config;
pub mod error;
pub mod event;
pub mod mock;
pub mod state;
pub mod traits;

pub use config::{ManagerConfig, StateCallback, TransportConfig};
pub use error::{LinkError, Result};
pub use event::{InboundMessage, LinkEvent, TransportEvent};
pub use state::ConnectionState;
pub use traits::{
    CredentialStore, LinkStatus, NetworkControl, QoS, SavedNetwork, Transport, WifiMode,
};
