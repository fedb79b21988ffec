//! # Persisted network configuration
//!
//! The device's [`NetworkProfile`] is stored as one flat JSON object whose
//! values are all strings:
//!
//! ```json
//! {"ssid":"networkSSID","networkPass":"networkPass","mqttIP":"0.0.0.0",
//!  "mqttUSER":"user","mqttPASS":"pass","mqttPORT":"1883",
//!  "hostname":"NEW-DEVICE","OTA_Password":"otaPass",
//!  "willTopic":"defaultWillTopic","willMessage":"","willQoS":"1","willRetain":"1"}
//! ```
//!
//! Numbers are kept in decimal string form so the document decodes the same
//! way whatever codec wrote it. [`ConfigStore`] validates a stored document,
//! replaces a defective one with factory defaults and never leaves a
//! half-written document under the real file name.
//!
//! # Usage
//!
//! ```rust
//! use iotlink::config::{ConfigStore, Validation};
//! use iotlink::storage::MemoryStorage;
//!
//! let mut storage: MemoryStorage<4, 1024> = MemoryStorage::new();
//! let mut store = ConfigStore::new(&mut storage);
//!
//! // Nothing stored yet: the first load writes the defaults and fails.
//! assert!(store.load_network_config().is_err());
//! assert_eq!(store.validate(), Validation::Good);
//!
//! let profile = store.load_network_config().unwrap();
//! assert_eq!(profile.ssid(), Some("networkSSID"));
//! ```

#![deny(unsafe_code)]

/// Error types for configuration persistence
pub mod error;

pub use error::Error;

use crate::network::session::QoS;
use crate::profile::{DEFAULT_BROKER_PORT, NetworkProfile};
use crate::storage::FileStorage;
use core::fmt::Write as _;
use heapless::{FnvIndexMap, String};

/// File used when no other name is given.
pub const DEFAULT_FILENAME: &str = "/netConfig.json";

/// Largest stored document accepted, in bytes.
pub const MAX_DOCUMENT_SIZE: usize = 1024;

/// Maximum number of keys in a document.
pub const MAX_KEYS: usize = 32;

/// Maximum key length.
pub const MAX_KEY_LEN: usize = 32;

/// Maximum value length.
pub const MAX_VALUE_LEN: usize = 64;

/// Suffix of the temporary file a save writes before renaming.
pub const TEMP_SUFFIX: &str = ".tmp";

const MAX_FILENAME_LEN: usize = 64;

/// Document key.
pub type Key = String<MAX_KEY_LEN>;

/// Document value.
pub type Value = String<MAX_VALUE_LEN>;

/// Decoded form of a stored document.
pub type ConfigDocument = FnvIndexMap<Key, Value, MAX_KEYS>;

/// Key names of the network document.
pub mod keys {
    /// Network SSID.
    pub const SSID: &str = "ssid";
    /// Network passphrase.
    pub const NETWORK_PASS: &str = "networkPass";
    /// Broker host.
    pub const MQTT_IP: &str = "mqttIP";
    /// Broker username.
    pub const MQTT_USER: &str = "mqttUSER";
    /// Broker password.
    pub const MQTT_PASS: &str = "mqttPASS";
    /// Broker port, decimal.
    pub const MQTT_PORT: &str = "mqttPORT";
    /// Device hostname.
    pub const HOSTNAME: &str = "hostname";
    /// OTA upload password.
    pub const OTA_PASSWORD: &str = "OTA_Password";
    /// Last-will topic.
    pub const WILL_TOPIC: &str = "willTopic";
    /// Last-will message.
    pub const WILL_MESSAGE: &str = "willMessage";
    /// Last-will QoS, decimal 0-2.
    pub const WILL_QOS: &str = "willQoS";
    /// Last-will retain flag, decimal; non-zero means retain.
    pub const WILL_RETAIN: &str = "willRetain";

    /// Every key a complete network document carries.
    pub const REQUIRED: [&str; 12] = [
        SSID,
        NETWORK_PASS,
        MQTT_IP,
        MQTT_USER,
        MQTT_PASS,
        MQTT_PORT,
        HOSTNAME,
        OTA_PASSWORD,
        WILL_TOPIC,
        WILL_MESSAGE,
        WILL_QOS,
        WILL_RETAIN,
    ];
}

/// Verdict of [`ConfigStore::validate`], most severe first.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Validation {
    /// The document is missing or its bytes do not decode.
    CannotParse,
    /// The document decodes to an empty object.
    NoConfig,
    /// One or more required keys are missing.
    Incomplete,
    /// The stored document exceeds [`MAX_DOCUMENT_SIZE`].
    TooBig,
    /// Every required key is present.
    Good,
}

impl core::fmt::Display for Validation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Validation::CannotParse => "CannotParse",
            Validation::NoConfig => "NoConfig",
            Validation::Incomplete => "Incomplete",
            Validation::TooBig => "TooBig",
            Validation::Good => "Good",
        };
        f.write_str(name)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Validation {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Validation::CannotParse => defmt::write!(f, "CannotParse"),
            Validation::NoConfig => defmt::write!(f, "NoConfig"),
            Validation::Incomplete => defmt::write!(f, "Incomplete"),
            Validation::TooBig => defmt::write!(f, "TooBig"),
            Validation::Good => defmt::write!(f, "Good"),
        }
    }
}

/// Classify a decoded document.
pub fn classify(document: &ConfigDocument) -> Validation {
    if document.is_empty() {
        Validation::NoConfig
    } else if keys::REQUIRED.iter().all(|key| contains(document, key)) {
        Validation::Good
    } else {
        Validation::Incomplete
    }
}

fn contains(document: &ConfigDocument, key: &str) -> bool {
    document.iter().any(|(k, _)| k.as_str() == key)
}

fn lookup<'d>(document: &'d ConfigDocument, key: &str) -> &'d str {
    document
        .iter()
        .find(|(k, _)| k.as_str() == key)
        .map(|(_, v)| v.as_str())
        .unwrap_or("")
}

fn insert(document: &mut ConfigDocument, key: &str, value: &str) -> Result<(), Error> {
    let key = Key::try_from(key).map_err(|_| Error::KeyTooLong)?;
    let value = Value::try_from(value).map_err(|_| Error::ValueTooLong)?;
    document
        .insert(key, value)
        .map(|_| ())
        .map_err(|_| Error::DocumentFull)
}

fn number(value: impl core::fmt::Display) -> Value {
    let mut text = Value::new();
    // A u16 always fits.
    let _ = write!(text, "{}", value);
    text
}

/// The factory profile written when no usable document exists.
pub fn default_profile() -> NetworkProfile {
    let mut profile = NetworkProfile::blank();
    // Literals are all well within the field capacity.
    let _ = profile.set_ssid("networkSSID");
    let _ = profile.set_password("networkPass");
    let _ = profile.set_broker_host("0.0.0.0");
    let _ = profile.set_broker_credentials("user", "pass");
    let _ = profile.set_hostname("NEW-DEVICE");
    let _ = profile.set_ota_password("otaPass");
    let _ = profile.set_will("defaultWillTopic", "");
    profile.set_broker_port(DEFAULT_BROKER_PORT);
    profile.set_will_options(QoS::AtLeastOnce, true);
    profile
}

/// Encode a profile as a network document.
pub fn profile_to_document(profile: &NetworkProfile) -> Result<ConfigDocument, Error> {
    let mut document = ConfigDocument::new();
    insert(&mut document, keys::SSID, profile.ssid().unwrap_or(""))?;
    insert(&mut document, keys::NETWORK_PASS, profile.password().unwrap_or(""))?;
    insert(&mut document, keys::MQTT_IP, profile.broker_host().unwrap_or(""))?;
    insert(&mut document, keys::MQTT_USER, profile.broker_user())?;
    insert(&mut document, keys::MQTT_PASS, profile.broker_pass())?;
    insert(&mut document, keys::MQTT_PORT, &number(profile.broker_port()))?;
    insert(&mut document, keys::HOSTNAME, profile.hostname().unwrap_or(""))?;
    insert(&mut document, keys::OTA_PASSWORD, profile.ota_password().unwrap_or(""))?;
    insert(&mut document, keys::WILL_TOPIC, profile.will_topic())?;
    insert(&mut document, keys::WILL_MESSAGE, profile.will_message())?;
    insert(&mut document, keys::WILL_QOS, &number(profile.will_qos() as u8))?;
    insert(&mut document, keys::WILL_RETAIN, &number(u8::from(profile.will_retain())))?;
    Ok(document)
}

/// Decode a network document into a profile, coercing the numeric fields.
///
/// - `mqttPORT`: `0` or unparsable becomes 1883
/// - `willQoS`: anything outside 0-2 becomes QoS 0
/// - `willRetain`: non-zero means retain, unparsable means no retain
pub fn document_to_profile(document: &ConfigDocument) -> Result<NetworkProfile, Error> {
    let mut profile = NetworkProfile::blank();
    let field = |key: &str| lookup(document, key);

    profile
        .set_ssid(field(keys::SSID))
        .map_err(|_| Error::ValueTooLong)?;
    profile
        .set_password(field(keys::NETWORK_PASS))
        .map_err(|_| Error::ValueTooLong)?;
    profile
        .set_broker_host(field(keys::MQTT_IP))
        .map_err(|_| Error::ValueTooLong)?;
    profile
        .set_broker_credentials(field(keys::MQTT_USER), field(keys::MQTT_PASS))
        .map_err(|_| Error::ValueTooLong)?;
    profile
        .set_hostname(field(keys::HOSTNAME))
        .map_err(|_| Error::ValueTooLong)?;
    profile
        .set_ota_password(field(keys::OTA_PASSWORD))
        .map_err(|_| Error::ValueTooLong)?;
    profile
        .set_will(field(keys::WILL_TOPIC), field(keys::WILL_MESSAGE))
        .map_err(|_| Error::ValueTooLong)?;

    let port = field(keys::MQTT_PORT).trim().parse::<u16>().unwrap_or(0);
    profile.set_broker_port(port);

    let qos = field(keys::WILL_QOS)
        .trim()
        .parse::<u8>()
        .ok()
        .and_then(|level| QoS::try_from(level).ok())
        .unwrap_or(QoS::AtMostOnce);
    let retain = field(keys::WILL_RETAIN)
        .trim()
        .parse::<i32>()
        .map(|flag| flag != 0)
        .unwrap_or(false);
    profile.set_will_options(qos, retain);

    profile.normalize();
    Ok(profile)
}

/// Validates, loads, repairs and saves a configuration document.
///
/// The store borrows its storage only for its own lifetime; create one per
/// load or save.
#[derive(Debug)]
pub struct ConfigStore<'a, S: FileStorage> {
    storage: &'a mut S,
    filename: &'a str,
}

impl<'a, S: FileStorage> ConfigStore<'a, S> {
    /// A store for [`DEFAULT_FILENAME`].
    pub fn new(storage: &'a mut S) -> Self {
        Self::with_filename(storage, DEFAULT_FILENAME)
    }

    /// A store for `filename`.
    pub fn with_filename(storage: &'a mut S, filename: &'a str) -> Self {
        Self { storage, filename }
    }

    /// The document's file name.
    pub fn filename(&self) -> &str {
        self.filename
    }

    /// Judge the stored document without modifying it.
    pub fn validate(&mut self) -> Validation {
        match self.read_document() {
            Ok(document) => classify(&document),
            Err(verdict) => verdict,
        }
    }

    /// Load the stored profile.
    ///
    /// Any verdict other than [`Validation::Good`] replaces the document with
    /// [`default_profile`] and returns [`Error::Invalid`]; loading again
    /// then yields the defaults.
    pub fn load_network_config(&mut self) -> Result<NetworkProfile, Error> {
        let document = match self.read_document() {
            Ok(document) => document,
            Err(verdict) => return Err(self.regenerate(verdict)),
        };
        match classify(&document) {
            Validation::Good => document_to_profile(&document),
            verdict => Err(self.regenerate(verdict)),
        }
    }

    fn regenerate(&mut self, verdict: Validation) -> Error {
        warn!("config verdict {}, writing defaults", verdict);
        if self.create_config(&default_profile()).is_err() {
            error!("could not write default config");
        }
        Error::Invalid(verdict)
    }

    /// Replace the stored document with one describing `profile`.
    pub fn create_config(&mut self, profile: &NetworkProfile) -> Result<(), Error> {
        let document = profile_to_document(profile)?;
        self.save_document(&document)?;
        info!("config written");
        Ok(())
    }

    /// Set one key, creating the document if it is missing or unreadable.
    pub fn add_key(&mut self, key: &str, value: &str) -> Result<(), Error> {
        let mut document = self.read_document().unwrap_or_default();
        insert(&mut document, key, value)?;
        self.save_document(&document)
    }

    /// Read one key. A missing document or key yields `None`.
    pub fn load_key(&mut self, key: &str) -> Option<Value> {
        let document = self.read_document().ok()?;
        document
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, v)| v.clone())
    }

    /// Read and decode the stored document.
    pub fn load_document(&mut self) -> Result<ConfigDocument, Error> {
        self.read_document().map_err(Error::Invalid)
    }

    /// Replace the stored document.
    ///
    /// The document is written to `<filename>.tmp`, the old file is removed,
    /// then the temporary file is renamed into place.
    pub fn save_document(&mut self, document: &ConfigDocument) -> Result<(), Error> {
        let mut buf = [0u8; MAX_DOCUMENT_SIZE];
        let len = serde_json_core::to_slice(document, &mut buf).map_err(|_| Error::Encode)?;

        let mut temp: String<MAX_FILENAME_LEN> = String::new();
        temp.push_str(self.filename)
            .map_err(|_| Error::FileNameTooLong)?;
        temp.push_str(TEMP_SUFFIX)
            .map_err(|_| Error::FileNameTooLong)?;

        self.storage.write(&temp, &buf[..len]).map_err(|_| {
            error!("config write failed");
            Error::Storage
        })?;
        if self.storage.exists(self.filename) {
            self.storage
                .remove(self.filename)
                .map_err(|_| Error::Storage)?;
        }
        self.storage
            .rename(&temp, self.filename)
            .map_err(|_| Error::Storage)
    }

    fn read_document(&mut self) -> Result<ConfigDocument, Validation> {
        if !self.storage.exists(self.filename) {
            debug!("config file missing");
            return Err(Validation::CannotParse);
        }
        let size = self
            .storage
            .size(self.filename)
            .map_err(|_| Validation::CannotParse)?;
        if size > MAX_DOCUMENT_SIZE {
            return Err(Validation::TooBig);
        }
        let mut buf = [0u8; MAX_DOCUMENT_SIZE];
        let len = self
            .storage
            .read(self.filename, &mut buf)
            .map_err(|_| Validation::CannotParse)?;
        if len == 0 {
            return Ok(ConfigDocument::new());
        }
        // Escape sequences are decoded into the scratch buffer.
        let mut scratch = [0u8; MAX_VALUE_LEN];
        serde_json_core::from_slice_escaped::<ConfigDocument>(&buf[..len], &mut scratch)
            .map(|(document, _)| document)
            .map_err(|_| Validation::CannotParse)
    }
}
