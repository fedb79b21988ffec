//! Broker session collaborator: the publish/subscribe client the manager
//! keeps alive on top of the wireless link.

use crate::profile::NetworkProfile;
use heapless::{String, Vec};

/// Quality of Service levels for broker messages.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum QoS {
    /// At most once delivery.
    AtMostOnce = 0,
    /// At least once delivery.
    #[default]
    AtLeastOnce = 1,
    /// Exactly once delivery.
    ExactlyOnce = 2,
}

impl TryFrom<u8> for QoS {
    type Error = u8;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(other),
        }
    }
}

impl core::fmt::Display for QoS {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for QoS {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=u8}", *self as u8)
    }
}

/// Broker username and password.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Credentials<'a> {
    /// Username sent in the connect request.
    pub username: &'a str,
    /// Password sent in the connect request, possibly empty.
    pub password: &'a str,
}

/// Message the broker publishes on the device's behalf when the session drops
/// without a clean disconnect.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct LastWill<'a> {
    /// Topic of the will message.
    pub topic: &'a str,
    /// Payload of the will message.
    pub message: &'a str,
    /// Delivery level of the will message.
    pub qos: QoS,
    /// Whether the broker retains the will message.
    pub retain: bool,
}

/// Which optional parts of the connect request are populated.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CredentialForm {
    /// Username, password and last will.
    UserAndWill,
    /// Last will only.
    WillOnly,
    /// Username and password only.
    UserOnly,
    /// Client id only.
    Anonymous,
}

/// Everything a broker connect request carries.
#[derive(Debug, Clone, Copy)]
pub struct ConnectOptions<'a> {
    /// Client identifier, unique per device.
    pub client_id: &'a str,
    /// Username and password, if any.
    pub credentials: Option<Credentials<'a>>,
    /// Last will, if any.
    pub will: Option<LastWill<'a>>,
}

impl<'a> ConnectOptions<'a> {
    /// Connect options derived from a profile.
    ///
    /// Credentials are used when the profile names a broker username; the
    /// will is used when both its topic and message are set.
    pub fn for_profile(profile: &'a NetworkProfile, client_id: &'a str) -> Self {
        Self {
            client_id,
            credentials: profile.broker_credentials(),
            will: profile.last_will(),
        }
    }

    /// The shape of this request.
    pub fn form(&self) -> CredentialForm {
        match (self.credentials.is_some(), self.will.is_some()) {
            (true, true) => CredentialForm::UserAndWill,
            (false, true) => CredentialForm::WillOnly,
            (true, false) => CredentialForm::UserOnly,
            (false, false) => CredentialForm::Anonymous,
        }
    }
}

/// A message delivered by the broker.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Message {
    /// Topic the message was published on.
    pub topic: String<256>,
    /// Raw payload.
    pub payload: Vec<u8, 1024>,
}

/// A publish/subscribe broker client.
///
/// Implementations wrap the platform's MQTT stack. The manager only uses the
/// methods below and treats every error as "session down".
pub trait BrokerSession {
    /// Associated error type
    type Error: core::fmt::Debug;

    /// Set the broker endpoint used by the next [`connect`](Self::connect).
    fn configure(&mut self, host: &str, port: u16);

    /// Open a session with the configured broker.
    fn connect(&mut self, options: &ConnectOptions<'_>) -> Result<(), Self::Error>;

    /// Close the session. Closing an already closed session is a no-op.
    fn disconnect(&mut self);

    /// `true` while the session is open.
    fn is_connected(&self) -> bool;

    /// Subscribe to a topic.
    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), Self::Error>;

    /// Unsubscribe from a topic.
    fn unsubscribe(&mut self, topic: &str) -> Result<(), Self::Error>;

    /// Publish a payload to a topic.
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error>;

    /// Service the session once, returning the next inbound message if any.
    fn pump(&mut self) -> Result<Option<Message>, Self::Error>;

    /// Check the broker's certificate against a pinned fingerprint.
    fn verify_trust(&mut self, _fingerprint: &str, _host: &str) -> bool {
        true
    }

    /// Switch between a plain and a TLS transport.
    fn use_secure_transport(&mut self, _secure: bool) {}
}
