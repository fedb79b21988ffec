//! Connectivity lifecycle for a network-attached device.
//!
//! The platform supplies three collaborators: a [`WirelessLink`], a
//! [`BrokerSession`] and a [`Clock`]. The [`ConnectionManager`] owns them
//! and drives the link/session state machine from the caller's control loop.
//!
//! ```text
//! Disconnected < Broadcasting < LinkUp < SessionUp
//! ```
//!
//! States are ordered so callers can gate work with `>=`, e.g. "run the
//! protocol loop only when at least `LinkUp`".

#![deny(unsafe_code)]

/// Error types for connection management
pub mod error;

/// Minimum-interval gate for reconnect attempts
pub mod gate;

/// Wireless link collaborator
pub mod link;

/// The connection state machine
pub mod manager;

/// Round-robin profile failover
pub mod rotator;

/// Broker session collaborator and connect-request types
pub mod session;

/// Registered subscriptions and replay
pub mod subscriptions;

pub use error::Error;
pub use gate::RetryGate;
pub use link::WirelessLink;
pub use manager::{ConnectionManager, LinkCallback, MessageCallback, RetryCounters};
pub use rotator::ProfileRotator;
pub use session::{BrokerSession, ConnectOptions, CredentialForm, Message, QoS};
pub use subscriptions::{SubscriptionEntry, SubscriptionRegistry};

/// Re-exports of the collaborator traits
pub mod prelude {
    pub use super::{BrokerSession, Clock, WirelessLink};
    pub use crate::ota::OtaUpdater;
    pub use crate::storage::FileStorage;
}

/// Monotonic time source and cooperative scheduling hooks.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed point.
    fn now_ms(&self) -> u64;

    /// Block for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);

    /// Give other work on the control loop a chance to run.
    fn yield_now(&mut self) {}
}

/// Connectivity state, ordered from least to most connected.
#[derive(Debug, Default, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub enum ConnectionState {
    /// No link and no access point.
    #[default]
    Disconnected,
    /// The device is serving its own access point; client connectivity is off.
    Broadcasting,
    /// Associated with a network, no broker session.
    LinkUp,
    /// Associated with a network and holding a broker session.
    SessionUp,
}

impl core::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Broadcasting => "Broadcasting",
            ConnectionState::LinkUp => "LinkUp",
            ConnectionState::SessionUp => "SessionUp",
        };
        f.write_str(name)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConnectionState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            ConnectionState::Disconnected => defmt::write!(f, "Disconnected"),
            ConnectionState::Broadcasting => defmt::write!(f, "Broadcasting"),
            ConnectionState::LinkUp => defmt::write!(f, "LinkUp"),
            ConnectionState::SessionUp => defmt::write!(f, "SessionUp"),
        }
    }
}

/// Result of one [`ConnectionManager::tick`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LoopStatus {
    /// No SSID is configured; the manager does nothing.
    NoConfig,
    /// Current connectivity state.
    State(ConnectionState),
}

impl LoopStatus {
    /// The state, or `None` when unconfigured.
    pub fn state(self) -> Option<ConnectionState> {
        match self {
            LoopStatus::NoConfig => None,
            LoopStatus::State(state) => Some(state),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for LoopStatus {
    fn format(&self, f: defmt::Formatter) {
        match self {
            LoopStatus::NoConfig => defmt::write!(f, "NoConfig"),
            LoopStatus::State(state) => defmt::write!(f, "State({})", state),
        }
    }
}
