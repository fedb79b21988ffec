//! Network profile: the identity of one wireless network plus the broker
//! credentials and last-will settings used on it.
//!
//! Text fields are fixed-capacity `heapless` strings. Optional fields are
//! considered unset when empty; which fields are set is derived once whenever
//! a field is assigned, so the connection logic reads presence flags instead
//! of re-inspecting strings.
//!
//! # Examples
//!
//! ```rust
//! use iotlink::profile::NetworkProfile;
//!
//! let profile = NetworkProfile::builder()
//!     .ssid("greenhouse")
//!     .broker("10.0.0.2")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(profile.ssid(), Some("greenhouse"));
//! assert_eq!(profile.password(), None);
//! assert_eq!(profile.broker_port(), 1883);
//! ```

use crate::network::session::{Credentials, LastWill, QoS};
use heapless::String;

/// Maximum length of every text field in a profile.
pub const MAX_FIELD_LEN: usize = 64;

/// Port used when a profile does not name one, or names port 0.
pub const DEFAULT_BROKER_PORT: u16 = 1883;

/// Fixed-capacity text used for profile fields.
pub type Text = String<MAX_FIELD_LEN>;

/// Errors raised while assigning profile fields.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The named field does not fit in [`MAX_FIELD_LEN`] bytes.
    FieldTooLong(&'static str),
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::FieldTooLong(field) => defmt::write!(f, "FieldTooLong({=str})", field),
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
struct Presence {
    ssid: bool,
    password: bool,
    broker: bool,
    broker_user: bool,
    broker_pass: bool,
    will_topic: bool,
    will_message: bool,
    ota_password: bool,
    hostname: bool,
}

/// One network's identity and broker credentials.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NetworkProfile {
    ssid: Text,
    password: Text,
    broker_host: Text,
    broker_port: u16,
    broker_user: Text,
    broker_pass: Text,
    will_topic: Text,
    will_message: Text,
    will_qos: QoS,
    will_retain: bool,
    ota_password: Text,
    hostname: Text,
    presence: Presence,
}

impl Default for NetworkProfile {
    fn default() -> Self {
        Self::blank()
    }
}

fn assign(slot: &mut Text, value: &str, field: &'static str) -> Result<(), Error> {
    *slot = Text::try_from(value).map_err(|_| Error::FieldTooLong(field))?;
    Ok(())
}

impl NetworkProfile {
    /// A profile with every text field empty, the default broker port, will
    /// QoS 1 and will retain on.
    pub fn blank() -> Self {
        Self {
            ssid: Text::new(),
            password: Text::new(),
            broker_host: Text::new(),
            broker_port: DEFAULT_BROKER_PORT,
            broker_user: Text::new(),
            broker_pass: Text::new(),
            will_topic: Text::new(),
            will_message: Text::new(),
            will_qos: QoS::AtLeastOnce,
            will_retain: true,
            ota_password: Text::new(),
            hostname: Text::new(),
            presence: Presence::default(),
        }
    }

    /// Start building a profile from [`NetworkProfile::blank`].
    pub fn builder() -> ProfileBuilder {
        ProfileBuilder {
            profile: Self::blank(),
            error: None,
        }
    }

    /// Recompute the presence flags from the current field contents and
    /// coerce a zero broker port to [`DEFAULT_BROKER_PORT`].
    ///
    /// Setters already keep the flags current; this is for callers that
    /// replaced the whole profile and want the invariant re-established
    /// explicitly.
    pub fn normalize(&mut self) {
        if self.broker_port == 0 {
            self.broker_port = DEFAULT_BROKER_PORT;
        }
        self.presence = Presence {
            ssid: !self.ssid.is_empty(),
            password: !self.password.is_empty(),
            broker: !self.broker_host.is_empty(),
            broker_user: !self.broker_user.is_empty(),
            broker_pass: !self.broker_pass.is_empty(),
            will_topic: !self.will_topic.is_empty(),
            will_message: !self.will_message.is_empty(),
            ota_password: !self.ota_password.is_empty(),
            hostname: !self.hostname.is_empty(),
        };
    }

    /// Network SSID, if one is configured.
    pub fn ssid(&self) -> Option<&str> {
        self.presence.ssid.then_some(self.ssid.as_str())
    }

    /// Network passphrase, `None` for open networks.
    pub fn password(&self) -> Option<&str> {
        self.presence.password.then_some(self.password.as_str())
    }

    /// Broker host name or address, `None` when no broker is used.
    pub fn broker_host(&self) -> Option<&str> {
        self.presence.broker.then_some(self.broker_host.as_str())
    }

    /// Broker TCP port, never zero.
    pub fn broker_port(&self) -> u16 {
        self.broker_port
    }

    /// Broker username and password, present when a username is configured.
    pub fn broker_credentials(&self) -> Option<Credentials<'_>> {
        self.presence.broker_user.then(|| Credentials {
            username: self.broker_user.as_str(),
            password: self.broker_pass.as_str(),
        })
    }

    /// Last will, present when both a topic and a message are configured.
    pub fn last_will(&self) -> Option<LastWill<'_>> {
        (self.presence.will_topic && self.presence.will_message).then(|| LastWill {
            topic: self.will_topic.as_str(),
            message: self.will_message.as_str(),
            qos: self.will_qos,
            retain: self.will_retain,
        })
    }

    /// Broker username as stored, possibly empty.
    pub fn broker_user(&self) -> &str {
        &self.broker_user
    }

    /// Broker password as stored, possibly empty.
    pub fn broker_pass(&self) -> &str {
        &self.broker_pass
    }

    /// Last-will topic as stored, possibly empty.
    pub fn will_topic(&self) -> &str {
        &self.will_topic
    }

    /// Last-will message as stored, possibly empty.
    pub fn will_message(&self) -> &str {
        &self.will_message
    }

    /// Last-will QoS.
    pub fn will_qos(&self) -> QoS {
        self.will_qos
    }

    /// Whether the broker retains the last will.
    pub fn will_retain(&self) -> bool {
        self.will_retain
    }

    /// OTA upload password, if configured.
    pub fn ota_password(&self) -> Option<&str> {
        self.presence.ota_password.then_some(self.ota_password.as_str())
    }

    /// Device hostname, if configured.
    pub fn hostname(&self) -> Option<&str> {
        self.presence.hostname.then_some(self.hostname.as_str())
    }

    /// `true` when an SSID is configured.
    pub fn has_ssid(&self) -> bool {
        self.presence.ssid
    }

    /// `true` when a broker host is configured.
    pub fn has_broker(&self) -> bool {
        self.presence.broker
    }

    /// Set the SSID. An empty string clears it.
    pub fn set_ssid(&mut self, ssid: &str) -> Result<(), Error> {
        assign(&mut self.ssid, ssid, "ssid")?;
        self.presence.ssid = !ssid.is_empty();
        Ok(())
    }

    /// Set the network passphrase. An empty string marks the network open.
    pub fn set_password(&mut self, password: &str) -> Result<(), Error> {
        assign(&mut self.password, password, "password")?;
        self.presence.password = !password.is_empty();
        Ok(())
    }

    /// Set the broker host. An empty string disables the broker session.
    pub fn set_broker_host(&mut self, host: &str) -> Result<(), Error> {
        assign(&mut self.broker_host, host, "brokerHost")?;
        self.presence.broker = !host.is_empty();
        Ok(())
    }

    /// Set the broker port; zero selects [`DEFAULT_BROKER_PORT`].
    pub fn set_broker_port(&mut self, port: u16) {
        self.broker_port = if port == 0 { DEFAULT_BROKER_PORT } else { port };
    }

    /// Set the broker username and password.
    pub fn set_broker_credentials(&mut self, user: &str, pass: &str) -> Result<(), Error> {
        assign(&mut self.broker_user, user, "brokerUser")?;
        assign(&mut self.broker_pass, pass, "brokerPass")?;
        self.presence.broker_user = !user.is_empty();
        self.presence.broker_pass = !pass.is_empty();
        Ok(())
    }

    /// Set the last-will topic and message.
    pub fn set_will(&mut self, topic: &str, message: &str) -> Result<(), Error> {
        assign(&mut self.will_topic, topic, "willTopic")?;
        assign(&mut self.will_message, message, "willMessage")?;
        self.presence.will_topic = !topic.is_empty();
        self.presence.will_message = !message.is_empty();
        Ok(())
    }

    /// Set the last-will QoS and retain flag.
    pub fn set_will_options(&mut self, qos: QoS, retain: bool) {
        self.will_qos = qos;
        self.will_retain = retain;
    }

    /// Set the OTA upload password.
    pub fn set_ota_password(&mut self, password: &str) -> Result<(), Error> {
        assign(&mut self.ota_password, password, "otaPassword")?;
        self.presence.ota_password = !password.is_empty();
        Ok(())
    }

    /// Set the device hostname.
    pub fn set_hostname(&mut self, hostname: &str) -> Result<(), Error> {
        assign(&mut self.hostname, hostname, "hostname")?;
        self.presence.hostname = !hostname.is_empty();
        Ok(())
    }
}

/// Builder for [`NetworkProfile`].
///
/// Each helper assigns one group of fields; the first field that does not
/// fit is reported by [`build`](ProfileBuilder::build).
#[derive(Debug, Clone)]
pub struct ProfileBuilder {
    profile: NetworkProfile,
    error: Option<Error>,
}

impl ProfileBuilder {
    fn apply(mut self, f: impl FnOnce(&mut NetworkProfile) -> Result<(), Error>) -> Self {
        if self.error.is_none() {
            if let Err(e) = f(&mut self.profile) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Network SSID.
    pub fn ssid(self, ssid: &str) -> Self {
        self.apply(|p| p.set_ssid(ssid))
    }

    /// Network passphrase.
    pub fn password(self, password: &str) -> Self {
        self.apply(|p| p.set_password(password))
    }

    /// Broker host on the default port.
    pub fn broker(self, host: &str) -> Self {
        self.apply(|p| p.set_broker_host(host))
    }

    /// Broker port.
    pub fn broker_port(self, port: u16) -> Self {
        self.apply(|p| {
            p.set_broker_port(port);
            Ok(())
        })
    }

    /// Broker username and password.
    pub fn credentials(self, user: &str, pass: &str) -> Self {
        self.apply(|p| p.set_broker_credentials(user, pass))
    }

    /// Last-will topic and message.
    pub fn will(self, topic: &str, message: &str) -> Self {
        self.apply(|p| p.set_will(topic, message))
    }

    /// Last-will QoS and retain flag.
    pub fn will_options(self, qos: QoS, retain: bool) -> Self {
        self.apply(|p| {
            p.set_will_options(qos, retain);
            Ok(())
        })
    }

    /// OTA upload password.
    pub fn ota_password(self, password: &str) -> Self {
        self.apply(|p| p.set_ota_password(password))
    }

    /// Device hostname.
    pub fn hostname(self, hostname: &str) -> Self {
        self.apply(|p| p.set_hostname(hostname))
    }

    /// Finish the profile.
    pub fn build(self) -> Result<NetworkProfile, Error> {
        match self.error {
            Some(e) => Err(e),
            None => {
                let mut profile = self.profile;
                profile.normalize();
                Ok(profile)
            }
        }
    }
}
