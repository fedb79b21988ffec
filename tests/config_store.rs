mod common;

use common::{MockClock, MockLink, MockOta, MockSession};
use iotlink::config::{self, ConfigStore, DEFAULT_FILENAME, Error, Validation, keys};
use iotlink::network::{ConnectionManager, QoS};
use iotlink::profile::NetworkProfile;
use iotlink::storage::{FileStorage, MemoryStorage};

type Manager = ConnectionManager<MockLink, MockSession, MockOta, MockClock>;
type Storage = MemoryStorage<4, 2048>;

fn store_with(contents: &[u8]) -> Storage {
    let mut storage = Storage::new();
    storage.write(DEFAULT_FILENAME, contents).unwrap();
    storage
}

fn sample_profile() -> NetworkProfile {
    NetworkProfile::builder()
        .ssid("greenhouse")
        .password("tomatoes")
        .broker("192.168.1.10")
        .broker_port(8883)
        .credentials("grower", "basil")
        .will("greenhouse/status", "offline")
        .will_options(QoS::ExactlyOnce, false)
        .ota_password("ota-pass")
        .hostname("gh-controller")
        .build()
        .unwrap()
}

#[test]
fn test_create_then_load_round_trip() {
    let mut storage = Storage::new();
    let mut store = ConfigStore::new(&mut storage);
    store.create_config(&sample_profile()).unwrap();

    assert_eq!(store.validate(), Validation::Good);
    assert_eq!(store.load_network_config().unwrap(), sample_profile());
    assert!(!storage.exists("/netConfig.json.tmp"));
    assert_eq!(storage.len(), 1);
}

#[test]
fn test_round_trip_keeps_quotes_and_backslashes() {
    let profile = NetworkProfile::builder()
        .ssid("cafe \"upstairs\"")
        .password("pa\"ss\\word")
        .broker("10.0.0.2")
        .will("dev/status", "{\"online\":false}")
        .build()
        .unwrap();
    let mut storage = Storage::new();
    let mut store = ConfigStore::new(&mut storage);
    store.create_config(&profile).unwrap();
    assert_eq!(store.validate(), Validation::Good);

    let loaded = store.load_network_config().unwrap();
    assert_eq!(loaded.password(), Some("pa\"ss\\word"));
    assert_eq!(loaded, profile);

    // A second save of the loaded profile must not add escapes.
    store.create_config(&loaded).unwrap();
    assert_eq!(store.load_network_config().unwrap(), profile);
    assert_eq!(
        store.load_key(keys::NETWORK_PASS).as_deref(),
        Some("pa\"ss\\word")
    );
}

#[test]
fn test_missing_file_cannot_parse() {
    let mut storage = Storage::new();
    assert_eq!(ConfigStore::new(&mut storage).validate(), Validation::CannotParse);
}

#[test]
fn test_garbage_cannot_parse() {
    let mut storage = store_with(b"ssid=home;pass=secret");
    assert_eq!(ConfigStore::new(&mut storage).validate(), Validation::CannotParse);

    let mut storage = store_with(br#"{"ssid":5}"#);
    assert_eq!(ConfigStore::new(&mut storage).validate(), Validation::CannotParse);
}

#[test]
fn test_empty_document_is_no_config() {
    let mut storage = store_with(b"");
    assert_eq!(ConfigStore::new(&mut storage).validate(), Validation::NoConfig);

    let mut storage = store_with(b"{}");
    assert_eq!(ConfigStore::new(&mut storage).validate(), Validation::NoConfig);
}

#[test]
fn test_missing_key_is_incomplete() {
    let mut storage = Storage::new();
    let mut store = ConfigStore::new(&mut storage);
    store.create_config(&sample_profile()).unwrap();

    let stored = store.load_document().unwrap();
    let mut document = config::ConfigDocument::new();
    for (key, value) in stored.iter().filter(|(key, _)| key.as_str() != keys::MQTT_PORT) {
        document.insert(key.clone(), value.clone()).unwrap();
    }
    assert_eq!(document.len(), keys::REQUIRED.len() - 1);
    store.save_document(&document).unwrap();

    assert_eq!(store.validate(), Validation::Incomplete);
}

#[test]
fn test_oversized_document_is_too_big() {
    let mut padded = std::vec::Vec::from(&br#"{"ssid":""#[..]);
    padded.resize(config::MAX_DOCUMENT_SIZE + 10, b'a');
    padded.extend_from_slice(br#""}"#);

    let mut storage = store_with(&padded);
    assert_eq!(ConfigStore::new(&mut storage).validate(), Validation::TooBig);
}

#[test]
fn test_bad_verdict_regenerates_defaults() {
    let mut storage = store_with(b"{}");
    let mut store = ConfigStore::new(&mut storage);

    assert_eq!(
        store.load_network_config(),
        Err(Error::Invalid(Validation::NoConfig))
    );
    assert_eq!(store.validate(), Validation::Good);

    let profile = store.load_network_config().unwrap();
    assert_eq!(profile, config::default_profile());
    assert_eq!(profile.ssid(), Some("networkSSID"));
    assert_eq!(profile.broker_host(), Some("0.0.0.0"));
    assert_eq!(profile.broker_port(), 1883);
    assert_eq!(profile.hostname(), Some("NEW-DEVICE"));
    assert!(profile.last_will().is_none());
    assert!(profile.will_retain());
}

#[test]
fn test_regenerated_document_is_readable_as_keys() {
    let mut storage = Storage::new();
    let mut store = ConfigStore::new(&mut storage);
    assert!(store.load_network_config().is_err());

    assert_eq!(store.load_key(keys::MQTT_PORT).as_deref(), Some("1883"));
    assert_eq!(store.load_key(keys::WILL_QOS).as_deref(), Some("1"));
    assert_eq!(store.load_key(keys::WILL_RETAIN).as_deref(), Some("1"));
    assert_eq!(store.load_key(keys::WILL_MESSAGE).as_deref(), Some(""));
}

#[test]
fn test_add_key_creates_and_updates() {
    let mut storage = Storage::new();
    let mut store = ConfigStore::with_filename(&mut storage, "/extra.json");
    assert_eq!(store.load_key("interval"), None);

    store.add_key("interval", "30").unwrap();
    store.add_key("unit", "s").unwrap();
    store.add_key("interval", "60").unwrap();

    assert_eq!(store.load_key("interval").as_deref(), Some("60"));
    assert_eq!(store.load_key("unit").as_deref(), Some("s"));
    assert_eq!(store.load_key("missing"), None);
    assert_eq!(store.validate(), Validation::Incomplete);
    assert_eq!(store.filename(), "/extra.json");
}

#[test]
fn test_add_key_rejects_oversized_fields() {
    let mut storage = Storage::new();
    let mut store = ConfigStore::new(&mut storage);
    let long = "x".repeat(config::MAX_VALUE_LEN + 1);

    assert_eq!(store.add_key("note", &long), Err(Error::ValueTooLong));
    assert_eq!(store.add_key(&long, "1"), Err(Error::KeyTooLong));
}

#[test]
fn test_numeric_fields_are_coerced() {
    let mut storage = Storage::new();
    let mut store = ConfigStore::new(&mut storage);
    store.create_config(&sample_profile()).unwrap();

    store.add_key(keys::MQTT_PORT, "0").unwrap();
    store.add_key(keys::WILL_QOS, "7").unwrap();
    store.add_key(keys::WILL_RETAIN, "2").unwrap();
    let profile = store.load_network_config().unwrap();
    assert_eq!(profile.broker_port(), 1883);
    assert_eq!(profile.will_qos(), QoS::AtMostOnce);
    assert!(profile.will_retain());

    store.add_key(keys::MQTT_PORT, "not-a-port").unwrap();
    store.add_key(keys::WILL_RETAIN, "yes").unwrap();
    let profile = store.load_network_config().unwrap();
    assert_eq!(profile.broker_port(), 1883);
    assert!(!profile.will_retain());
}

#[test]
fn test_empty_values_mean_absent() {
    let mut storage = Storage::new();
    let mut store = ConfigStore::new(&mut storage);
    store.create_config(&sample_profile()).unwrap();
    store.add_key(keys::MQTT_IP, "").unwrap();
    store.add_key(keys::MQTT_USER, "").unwrap();

    let profile = store.load_network_config().unwrap();
    assert!(!profile.has_broker());
    assert!(profile.broker_credentials().is_none());
    assert_eq!(profile.ssid(), Some("greenhouse"));
}

#[test]
fn test_load_config_file_recovers_with_defaults() {
    let mut storage = store_with(b"not json");
    let profile = Manager::load_config_file(&mut storage, DEFAULT_FILENAME);
    assert_eq!(profile, config::default_profile());
}

#[test]
fn test_load_config_file_gives_blank_when_unwritable() {
    // Too small to hold the default document.
    let mut storage: MemoryStorage<4, 64> = MemoryStorage::new();
    let profile = Manager::load_config_file(&mut storage, DEFAULT_FILENAME);
    assert_eq!(profile, NetworkProfile::blank());
    assert!(!storage.exists(DEFAULT_FILENAME));
}

#[test]
fn test_save_config_file_overwrites() {
    let mut storage = Storage::new();
    Manager::save_config_file(&mut storage, &config::default_profile(), "/net.json").unwrap();
    Manager::save_config_file(&mut storage, &sample_profile(), "/net.json").unwrap();

    assert_eq!(
        Manager::load_config_file(&mut storage, "/net.json"),
        sample_profile()
    );
    assert_eq!(storage.len(), 1);
}
