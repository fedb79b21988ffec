//! The connection state machine.
//!
//! [`ConnectionManager`] owns the wireless link, the broker session, the OTA
//! updater and the clock. The caller drives it by calling
//! [`tick`](ConnectionManager::tick) on every iteration of its control loop;
//! every failure is a state transition or a rate-limited retry, never a panic.
//!
//! Retry policy:
//!
//! - reconnect attempts pass through a [`RetryGate`] (one per 500 ms)
//! - an association is started once and then polled; it is restarted only
//!   after [`ASSOCIATION_TIMEOUT_MS`] without a link, a hop or a
//!   [`update_network`](ConnectionManager::update_network)
//! - after [`LINK_HOP_THRESHOLD`] failed link attempts the counters reset
//!   and, when several profiles are configured, the next one is selected
//! - after [`SESSION_GIVEUP_THRESHOLD`] failed broker attempts the session
//!   counter resets and the device stays `LinkUp` until the next gated retry

use super::error::Error;
use super::gate::RetryGate;
use super::link::WirelessLink;
use super::rotator::ProfileRotator;
use super::session::{BrokerSession, ConnectOptions, QoS};
use super::subscriptions::SubscriptionRegistry;
use super::{Clock, ConnectionState, LoopStatus};
use crate::config::{self, ConfigStore};
use crate::ota::{self, OtaControl, OtaUpdater};
use crate::profile::{NetworkProfile, Text};
use crate::storage::FileStorage;
use core::fmt::Write as _;
use core::net::Ipv4Addr;
use heapless::String;
use serde::Serialize;

/// Failed link attempts before the counters reset and the next profile is tried.
pub const LINK_HOP_THRESHOLD: u32 = 20;

/// Failed broker attempts before the manager stops and waits at `LinkUp`.
pub const SESSION_GIVEUP_THRESHOLD: u32 = 5;

/// How long an association may stay pending before it is restarted.
pub const ASSOCIATION_TIMEOUT_MS: u64 = 5_000;

/// Longest time [`ConnectionManager::begin`] blocks for the initial bring-up.
pub const BRING_UP_TIMEOUT_MS: u64 = 2_000;

/// Granularity of the blocking waits.
pub const WAIT_STEP_MS: u32 = 10;

/// Maximum number of wait steps in any blocking wait.
pub const MAX_WAIT_STEPS: u32 = 200;

/// Load attempts made by [`ConnectionManager::load_config_file`].
pub const CONFIG_LOAD_ATTEMPTS: usize = 3;

/// Largest payload [`ConnectionManager::publish_json`] encodes.
pub const MAX_JSON_PAYLOAD: usize = 1024;

/// Called when the link comes up or goes down.
pub type LinkCallback = fn();

/// Called with the topic and payload of every inbound message.
pub type MessageCallback = fn(&str, &[u8]);

/// Consecutive failure counts.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct RetryCounters {
    /// Failed link attempts since the link was last up.
    pub link_attempts: u32,
    /// Failed broker attempts since the session was last up or abandoned.
    pub session_attempts: u32,
}

#[derive(Debug, Clone)]
struct AccessPoint {
    ssid: Text,
    address: Ipv4Addr,
}

/// Drives the link/session state machine over platform collaborators.
///
/// # Examples
///
/// ```rust,ignore
/// let mut manager = ConnectionManager::new(radio, mqtt, NoOta, clock);
/// manager.set_message_callback(on_message);
/// manager.add_subscription("greenhouse/vents");
///
/// if !manager.begin(profile) {
///     // no SSID: open a configuration access point instead
///     manager.broadcast_mode("greenhouse-setup", "setup-pass", Ipv4Addr::new(192, 168, 1, 1))?;
/// }
///
/// loop {
///     match manager.tick() {
///         LoopStatus::State(ConnectionState::SessionUp) => publish_readings(&mut manager),
///         _ => {}
///     }
/// }
/// ```
#[derive(Debug)]
pub struct ConnectionManager<L, B, O, C>
where
    L: WirelessLink,
    B: BrokerSession,
    O: OtaUpdater,
    C: Clock,
{
    link: L,
    session: B,
    ota: OtaControl<O>,
    clock: C,
    profiles: ProfileRotator,
    state: ConnectionState,
    counters: RetryCounters,
    gate: RetryGate,
    association_started: Option<u64>,
    subscriptions: SubscriptionRegistry,
    qos: QoS,
    client_id: String<32>,
    fingerprint: Option<String<64>>,
    secure: bool,
    hopping_allowed: bool,
    has_begun: bool,
    access_point: Option<AccessPoint>,
    on_link: Option<LinkCallback>,
    on_link_lost: Option<LinkCallback>,
    on_message: Option<MessageCallback>,
}

impl<L, B, O, C> ConnectionManager<L, B, O, C>
where
    L: WirelessLink,
    B: BrokerSession,
    O: OtaUpdater,
    C: Clock,
{
    /// Take ownership of the collaborators. Nothing is touched until
    /// [`begin`](Self::begin).
    pub fn new(link: L, session: B, ota: O, clock: C) -> Self {
        Self {
            link,
            session,
            ota: OtaControl::new(ota),
            clock,
            profiles: ProfileRotator::default(),
            state: ConnectionState::Disconnected,
            counters: RetryCounters::default(),
            gate: RetryGate::default(),
            association_started: None,
            subscriptions: SubscriptionRegistry::new(),
            qos: QoS::AtLeastOnce,
            client_id: String::new(),
            fingerprint: None,
            secure: false,
            hopping_allowed: true,
            has_begun: false,
            access_point: None,
            on_link: None,
            on_link_lost: None,
            on_message: None,
        }
    }

    /// Start with a single profile.
    ///
    /// Returns `false`, leaving the state `Disconnected`, when the profile has
    /// no SSID. Otherwise blocks for up to [`BRING_UP_TIMEOUT_MS`] while the
    /// link and session come up and returns `true`.
    pub fn begin(&mut self, profile: NetworkProfile) -> bool {
        self.profiles = ProfileRotator::single(profile);
        self.start()
    }

    /// Start with a list of candidate profiles, beginning at index `start`.
    ///
    /// Hopping is enabled when the list holds more than one profile.
    pub fn begin_with_profiles(&mut self, profiles: &[NetworkProfile], start: usize) -> bool {
        self.profiles = ProfileRotator::from_slice(profiles, start);
        self.hopping_allowed = true;
        self.start()
    }

    /// Start with the profile stored in `filename`.
    pub fn begin_from_file<S: FileStorage>(&mut self, storage: &mut S, filename: &str) -> bool {
        let profile = Self::load_config_file(storage, filename);
        self.begin(profile)
    }

    /// Load a profile, retrying up to [`CONFIG_LOAD_ATTEMPTS`] times.
    ///
    /// A defective document is replaced by the defaults on the first failed
    /// attempt, so a later attempt normally succeeds. If every attempt fails
    /// a blank profile is returned.
    pub fn load_config_file<S: FileStorage>(storage: &mut S, filename: &str) -> NetworkProfile {
        let mut store = ConfigStore::with_filename(storage, filename);
        for attempt in 1..=CONFIG_LOAD_ATTEMPTS {
            match store.load_network_config() {
                Ok(profile) => return profile,
                Err(_) => debug!("config load attempt {} failed", attempt),
            }
        }
        warn!("config unusable, starting unconfigured");
        NetworkProfile::blank()
    }

    /// Persist `profile` to `filename`.
    pub fn save_config_file<S: FileStorage>(
        storage: &mut S,
        profile: &NetworkProfile,
        filename: &str,
    ) -> Result<(), config::Error> {
        ConfigStore::with_filename(storage, filename).create_config(profile)
    }

    /// Re-run the start-up sequence against the active profile.
    pub fn start(&mut self) -> bool {
        self.profiles.current_mut().normalize();
        self.derive_client_id();

        if !self.profiles.current().has_ssid() {
            warn!("no ssid configured");
            self.state = ConnectionState::Disconnected;
            return false;
        }

        self.session.disconnect();
        self.link.disconnect_all();
        self.state = ConnectionState::Disconnected;
        self.counters = RetryCounters::default();
        self.access_point = None;

        if self.link.set_station_mode().is_err() {
            warn!("station mode rejected");
        }
        self.apply_ota_settings();
        self.connect_link();
        self.configure_session();
        self.session.use_secure_transport(self.secure);
        self.gate.arm();

        let started = self.clock.now_ms();
        for _ in 0..MAX_WAIT_STEPS {
            if !self.needs_reconnect()
                || self.clock.now_ms().saturating_sub(started) >= BRING_UP_TIMEOUT_MS
            {
                break;
            }
            self.reconnect();
            self.clock.delay_ms(WAIT_STEP_MS);
        }
        self.refresh_state();

        if self.state >= ConnectionState::Broadcasting {
            self.ota.begin_if_not_running();
        }
        self.has_begun = true;
        info!("started in state {}", self.state);
        true
    }

    /// Advance the state machine once. Never blocks.
    pub fn tick(&mut self) -> LoopStatus {
        if !self.profiles.current().has_ssid() {
            return LoopStatus::NoConfig;
        }

        if self.state != ConnectionState::Broadcasting {
            self.refresh_state();
            if self.needs_reconnect() {
                self.reconnect();
            }
        }

        if self.state >= ConnectionState::Broadcasting {
            if self.state == ConnectionState::SessionUp {
                self.pump_session();
            }
            if self.ota.is_enabled() {
                self.ota.service();
            }
        }

        LoopStatus::State(self.state)
    }

    /// Make one gated attempt to bring the link and session up.
    ///
    /// Does nothing while broadcasting, while the session is up or before
    /// the retry interval has elapsed.
    pub fn reconnect(&mut self) {
        if self.state == ConnectionState::Broadcasting {
            return;
        }
        self.refresh_state();
        if self.state == ConnectionState::SessionUp {
            return;
        }
        let now = self.clock.now_ms();
        if !self.gate.check(now) {
            return;
        }

        if !self.link.is_connected() {
            if self.association_due(now) {
                self.connect_link();
            }
            if !self.link.is_connected() {
                self.record_link_failure();
                self.gate.reset(now);
                return;
            }
        }

        if self.state < ConnectionState::LinkUp {
            info!("link up");
            if let Some(callback) = self.on_link {
                callback();
            }
        }
        self.state = ConnectionState::LinkUp;
        self.counters.link_attempts = 0;
        self.association_started = None;

        if self.profiles.current().has_broker() && !self.session.is_connected() {
            if !self.connect_session() {
                // Trust check failed: retry on the next interval.
                return;
            }
        }

        self.gate.reset(now);
    }

    /// `true` when no association is pending or the pending one timed out.
    fn association_due(&self, now: u64) -> bool {
        match self.association_started {
            Some(started) => now.saturating_sub(started) >= ASSOCIATION_TIMEOUT_MS,
            None => true,
        }
    }

    fn record_link_failure(&mut self) {
        self.counters.link_attempts += 1;
        debug!("link attempt {} failed", self.counters.link_attempts);
        if self.counters.link_attempts < LINK_HOP_THRESHOLD {
            return;
        }

        self.counters = RetryCounters::default();
        if self.hopping_enabled() {
            self.profiles.hop();
            info!("hopping to profile {}", self.profiles.index());
            self.update_network();
        } else {
            warn!("link down after {} attempts", LINK_HOP_THRESHOLD);
        }
    }

    /// Attempt a broker session. Returns `false` only when the session
    /// opened but failed trust verification.
    fn connect_session(&mut self) -> bool {
        self.session.disconnect();
        self.configure_session();

        let profile = self.profiles.current();
        let options = ConnectOptions::for_profile(profile, &self.client_id);
        if self.session.connect(&options).is_err() {
            self.counters.session_attempts += 1;
            debug!("broker attempt {} failed", self.counters.session_attempts);
            if self.counters.session_attempts >= SESSION_GIVEUP_THRESHOLD {
                warn!(
                    "broker unreachable after {} attempts, holding link",
                    SESSION_GIVEUP_THRESHOLD
                );
                self.counters.session_attempts = 0;
                self.state = ConnectionState::LinkUp;
            }
            return true;
        }

        if self.secure {
            if let Some(fingerprint) = &self.fingerprint {
                let host = profile.broker_host().unwrap_or("");
                if !self.session.verify_trust(fingerprint, host) {
                    warn!("broker certificate mismatch");
                    self.session.disconnect();
                    return false;
                }
            }
        }

        self.state = ConnectionState::SessionUp;
        self.counters.session_attempts = 0;
        let clock = &mut self.clock;
        let replayed = self
            .subscriptions
            .replay(&mut self.session, || clock.yield_now());
        info!("session up, {} topics replayed", replayed);
        true
    }

    /// Re-derive the state from the collaborators and fire the link
    /// callbacks on transitions. Never promotes to `SessionUp`.
    fn refresh_state(&mut self) {
        if self.state == ConnectionState::Broadcasting {
            return;
        }
        if self.link.is_connected() {
            self.association_started = None;
            if self.state < ConnectionState::LinkUp {
                info!("link up");
                if let Some(callback) = self.on_link {
                    callback();
                }
            }
            self.state = if self.state == ConnectionState::SessionUp && self.session.is_connected()
            {
                ConnectionState::SessionUp
            } else {
                ConnectionState::LinkUp
            };
        } else {
            if self.state >= ConnectionState::LinkUp {
                warn!("link lost");
                if let Some(callback) = self.on_link_lost {
                    callback();
                }
                // A session cannot outlive its link.
                self.session.disconnect();
                self.association_started = None;
            }
            self.state = ConnectionState::Disconnected;
        }
    }

    fn needs_reconnect(&self) -> bool {
        !self.link.is_connected()
            || (self.profiles.current().has_broker() && !self.session.is_connected())
    }

    fn hopping_enabled(&self) -> bool {
        self.hopping_allowed && self.profiles.len() > 1
    }

    fn pump_session(&mut self) {
        match self.session.pump() {
            Ok(Some(message)) => {
                if let Some(callback) = self.on_message {
                    callback(&message.topic, &message.payload);
                }
            }
            Ok(None) => {}
            Err(_) => debug!("session pump failed"),
        }
    }

    fn connect_link(&mut self) {
        let profile = self.profiles.current();
        if let Some(ssid) = profile.ssid() {
            if self.link.connect(ssid, profile.password()).is_err() {
                debug!("link connect request rejected");
            }
            self.association_started = Some(self.clock.now_ms());
        }
    }

    fn configure_session(&mut self) {
        let profile = self.profiles.current();
        if let Some(host) = profile.broker_host() {
            self.session.configure(host, profile.broker_port());
        }
    }

    fn apply_ota_settings(&mut self) {
        let profile = self.profiles.current();
        if let Some(password) = profile.ota_password() {
            self.ota.set_password(password);
        }
        if let Some(hostname) = profile.hostname() {
            self.ota.set_hostname(hostname);
        }
    }

    fn derive_client_id(&mut self) {
        let mac = self.link.mac_address();
        self.client_id.clear();
        // "device-" plus 17 characters always fits.
        let _ = write!(
            self.client_id,
            "device-{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
        );
    }

    fn teardown_link(&mut self) {
        self.link.disconnect_all();
        self.association_started = None;
        for _ in 0..MAX_WAIT_STEPS {
            if !self.link.is_connected() {
                break;
            }
            self.clock.delay_ms(WAIT_STEP_MS);
        }
    }

    /// Re-apply the active profile to the link and session without blocking.
    ///
    /// The link is dropped and re-associated; the next ticks bring the
    /// session back up.
    pub fn update_network(&mut self) {
        self.session.disconnect();
        self.link.disconnect_all();
        if self.link.set_station_mode().is_err() {
            warn!("station mode rejected");
        }
        self.connect_link();
        self.configure_session();
    }

    /// Serve an access point instead of joining a network.
    ///
    /// Any link and session are torn down first; if the device had a link
    /// the link-lost callback fires before the state becomes `Broadcasting`.
    pub fn broadcast_mode(
        &mut self,
        ssid: &str,
        password: &str,
        address: Ipv4Addr,
    ) -> Result<(), Error> {
        let ap_ssid = Text::try_from(ssid).map_err(|_| Error::FieldTooLong)?;
        let had_link = self.state >= ConnectionState::LinkUp;

        self.session.disconnect();
        self.teardown_link();
        if self.link.set_access_point_mode(ssid, password, address).is_err() {
            error!("access point mode rejected");
            self.state = ConnectionState::Disconnected;
            return Err(Error::LinkError);
        }

        if had_link {
            if let Some(callback) = self.on_link_lost {
                callback();
            }
        }
        self.state = ConnectionState::Broadcasting;
        self.access_point = Some(AccessPoint {
            ssid: ap_ssid,
            address,
        });
        info!("broadcasting");
        Ok(())
    }

    /// Stop the access point and start again with the active profile.
    pub fn disable_broadcast(&mut self) -> bool {
        self.teardown_link();
        self.access_point = None;
        self.state = ConnectionState::Disconnected;
        info!("broadcast disabled");
        self.start()
    }

    /// Stop OTA, drop the session and the link.
    pub fn end(&mut self) {
        self.ota.disable();
        self.session.disconnect();
        self.clock.delay_ms(2 * WAIT_STEP_MS);
        self.teardown_link();
        self.access_point = None;
        self.state = ConnectionState::Disconnected;
        info!("stopped");
    }

    /// Use a TLS transport to the broker and pin its certificate fingerprint.
    ///
    /// A live session is dropped so the next attempt is verified.
    pub fn use_secure_client(&mut self, fingerprint: &str) -> Result<(), Error> {
        let pinned = String::try_from(fingerprint).map_err(|_| Error::FieldTooLong)?;
        self.fingerprint = Some(pinned);
        self.secure = true;
        if self.state == ConnectionState::SessionUp {
            self.state = ConnectionState::LinkUp;
        }
        if self.has_begun {
            self.session.disconnect();
        }
        self.session.use_secure_transport(true);
        Ok(())
    }

    /// Allow or forbid hopping. Hopping also needs more than one profile.
    pub fn set_hopping(&mut self, allowed: bool) {
        self.hopping_allowed = allowed;
    }

    /// Subscribe once, without registering the topic for replay.
    pub fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), Error> {
        if self.state != ConnectionState::SessionUp {
            return Err(Error::NotConnected);
        }
        self.session
            .subscribe(topic, qos)
            .map_err(|_| Error::SessionError)
    }

    /// Unsubscribe without touching the registry.
    pub fn unsubscribe(&mut self, topic: &str) -> Result<(), Error> {
        self.session
            .unsubscribe(topic)
            .map_err(|_| Error::SessionError)
    }

    /// Publish a raw payload.
    pub fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Error> {
        self.session
            .publish(topic, payload, retain)
            .map_err(|_| Error::SessionError)
    }

    /// Publish `value` encoded as JSON.
    pub fn publish_json<T: Serialize>(
        &mut self,
        topic: &str,
        value: &T,
        retain: bool,
    ) -> Result<(), Error> {
        let mut buf = [0u8; MAX_JSON_PAYLOAD];
        let len = serde_json_core::to_slice(value, &mut buf).map_err(|_| Error::EncodeError)?;
        self.publish(topic, &buf[..len], retain)
    }

    /// Register a topic for replay and subscribe now if the session is up.
    ///
    /// Returns `false` when the registry is full or the topic does not fit.
    pub fn add_subscription(&mut self, topic: &str) -> bool {
        if !self.subscriptions.add(topic, self.qos) {
            return false;
        }
        if self.state == ConnectionState::SessionUp
            && self.session.subscribe(topic, self.qos).is_err()
        {
            debug!("immediate subscribe failed");
        }
        true
    }

    /// Unregister a topic and unsubscribe from it, whatever the state.
    pub fn remove_subscription(&mut self, topic: &str) -> bool {
        self.subscriptions.remove(topic, &mut self.session)
    }

    /// Registered subscriptions.
    pub fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.subscriptions
    }

    /// QoS used for registered subscriptions.
    pub fn qos(&self) -> QoS {
        self.qos
    }

    /// Change the QoS used for subscriptions registered from now on.
    pub fn set_qos(&mut self, qos: QoS) {
        self.qos = qos;
    }

    /// Current state.
    pub fn status(&self) -> ConnectionState {
        self.state
    }

    /// Device address: the access point's while broadcasting, else the
    /// station address.
    pub fn local_address(&self) -> Option<Ipv4Addr> {
        match &self.access_point {
            Some(ap) if self.state == ConnectionState::Broadcasting => Some(ap.address),
            _ => self.link.local_address(),
        }
    }

    /// SSID in use: the access point's while broadcasting, else the
    /// active profile's.
    pub fn ssid(&self) -> Option<&str> {
        match &self.access_point {
            Some(ap) if self.state == ConnectionState::Broadcasting => Some(ap.ssid.as_str()),
            _ => self.profiles.current().ssid(),
        }
    }

    /// Client identifier sent to the broker.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Consecutive failure counts.
    pub fn retry_counters(&self) -> RetryCounters {
        self.counters
    }

    /// Index of the active profile.
    pub fn active_profile_index(&self) -> usize {
        self.profiles.index()
    }

    /// The active profile.
    pub fn profile(&self) -> &NetworkProfile {
        self.profiles.current()
    }

    /// Mutable access to the active profile; call
    /// [`update_network`](Self::update_network) to apply edits.
    pub fn profile_mut(&mut self) -> &mut NetworkProfile {
        self.profiles.current_mut()
    }

    /// Called when the link comes up.
    pub fn set_link_callback(&mut self, callback: LinkCallback) {
        self.on_link = Some(callback);
    }

    /// Called when an established link goes down.
    pub fn set_link_lost_callback(&mut self, callback: LinkCallback) {
        self.on_link_lost = Some(callback);
    }

    /// Called for every inbound broker message.
    pub fn set_message_callback(&mut self, callback: MessageCallback) {
        self.on_message = Some(callback);
    }

    /// Allow OTA to start once connectivity allows.
    pub fn enable_ota(&mut self) {
        self.ota.enable();
    }

    /// Stop OTA and keep it stopped.
    pub fn disable_ota(&mut self) {
        self.ota.disable();
    }

    /// Set the OTA upload password.
    pub fn set_ota_password(&mut self, password: &str) {
        self.ota.set_password(password);
    }

    /// Set the hostname advertised for OTA.
    pub fn set_ota_hostname(&mut self, hostname: &str) {
        self.ota.set_hostname(hostname);
    }

    /// Set the OTA hostname with the firmware version appended.
    pub fn set_ota_hostname_with_version(&mut self, hostname: &str) -> Result<(), ota::Error> {
        self.ota.set_hostname_with_version(hostname)
    }

    /// `true` once the OTA updater has been started.
    pub fn ota_running(&self) -> bool {
        self.ota.is_running()
    }

    /// The wireless link.
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// The broker session.
    pub fn session_mut(&mut self) -> &mut B {
        &mut self.session
    }

    /// The OTA updater.
    pub fn ota_mut(&mut self) -> &mut O {
        self.ota.updater_mut()
    }

    /// The clock.
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }
}
