#![allow(dead_code)]

use core::net::Ipv4Addr;
use std::cell::Cell;
use std::rc::Rc;
use heapless::{String, Vec};
use iotlink::network::session::{ConnectOptions, CredentialForm, Message};
use iotlink::network::{BrokerSession, Clock, QoS, WirelessLink};
use iotlink::ota::OtaUpdater;

pub const MAC: [u8; 6] = [0x24, 0x0A, 0xC4, 0x01, 0xBE, 0xEF];

/// Milliseconds shared between a [`MockClock`] and the mocks that need time.
pub type Timeline = Rc<Cell<u64>>;

#[derive(Debug, Default)]
pub struct MockLink {
    /// Networks that accept an association.
    pub reachable: std::vec::Vec<std::string::String>,
    pub connected: bool,
    pub connects: std::vec::Vec<std::string::String>,
    pub station_mode: bool,
    pub access_point: Option<(std::string::String, Ipv4Addr)>,
    pub reject_access_point: bool,
    /// Time an association takes; zero associates inside `connect`.
    pub association_ms: u64,
    /// Network being joined and the time the association completes.
    pub associating: Option<(std::string::String, u64)>,
    pub timeline: Timeline,
}

impl MockLink {
    pub fn reaching(ssids: &[&str]) -> Self {
        Self {
            reachable: ssids.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    /// A radio that needs `association_ms` to join a network, timed by
    /// `clock`.
    pub fn slow(ssids: &[&str], association_ms: u64, clock: &MockClock) -> Self {
        Self {
            association_ms,
            timeline: clock.timeline(),
            ..Self::reaching(ssids)
        }
    }

    /// Simulate the access point dropping the device.
    pub fn drop_link(&mut self) {
        self.connected = false;
        self.associating = None;
    }

    fn associated(&self) -> bool {
        match &self.associating {
            Some((_, ready_at)) => self.timeline.get() >= *ready_at,
            None => false,
        }
    }
}

impl WirelessLink for MockLink {
    type Error = ();

    fn set_station_mode(&mut self) -> Result<(), ()> {
        self.station_mode = true;
        self.access_point = None;
        Ok(())
    }

    fn set_access_point_mode(
        &mut self,
        ssid: &str,
        _password: &str,
        address: Ipv4Addr,
    ) -> Result<(), ()> {
        if self.reject_access_point {
            return Err(());
        }
        self.station_mode = false;
        self.access_point = Some((ssid.to_string(), address));
        Ok(())
    }

    fn connect(&mut self, ssid: &str, _password: Option<&str>) -> Result<(), ()> {
        self.connects.push(ssid.to_string());
        let reachable = self.reachable.iter().any(|s| s == ssid);
        if self.association_ms == 0 {
            self.connected = reachable;
            return Ok(());
        }
        // A restart abandons the association in progress.
        self.connected = false;
        self.associating = reachable
            .then(|| (ssid.to_string(), self.timeline.get() + self.association_ms));
        Ok(())
    }

    fn disconnect_all(&mut self) {
        self.connected = false;
        self.associating = None;
    }

    fn is_connected(&self) -> bool {
        self.connected || self.associated()
    }

    fn local_address(&self) -> Option<Ipv4Addr> {
        self.is_connected().then(|| Ipv4Addr::new(192, 168, 4, 20))
    }

    fn mac_address(&self) -> [u8; 6] {
        MAC
    }
}

#[derive(Debug)]
pub struct MockSession {
    pub accept: bool,
    pub trust_ok: bool,
    pub connected: bool,
    pub endpoint: Option<(std::string::String, u16)>,
    pub secure: bool,
    pub connect_attempts: usize,
    pub forms: std::vec::Vec<CredentialForm>,
    pub client_ids: std::vec::Vec<std::string::String>,
    pub subscribed: std::vec::Vec<(std::string::String, QoS)>,
    pub unsubscribed: std::vec::Vec<std::string::String>,
    pub published: std::vec::Vec<(std::string::String, std::vec::Vec<u8>, bool)>,
    pub inbox: std::collections::VecDeque<Message>,
}

impl Default for MockSession {
    fn default() -> Self {
        Self {
            accept: true,
            trust_ok: true,
            connected: false,
            endpoint: None,
            secure: false,
            connect_attempts: 0,
            forms: std::vec::Vec::new(),
            client_ids: std::vec::Vec::new(),
            subscribed: std::vec::Vec::new(),
            unsubscribed: std::vec::Vec::new(),
            published: std::vec::Vec::new(),
            inbox: std::collections::VecDeque::new(),
        }
    }
}

impl MockSession {
    pub fn refusing() -> Self {
        Self {
            accept: false,
            ..Self::default()
        }
    }

    pub fn deliver(&mut self, topic: &str, payload: &[u8]) {
        let message = Message {
            topic: String::try_from(topic).unwrap(),
            payload: Vec::from_slice(payload).unwrap(),
        };
        self.inbox.push_back(message);
    }

    pub fn subscribed_topics(&self) -> std::vec::Vec<std::string::String> {
        let mut topics: std::vec::Vec<_> = self.subscribed.iter().map(|(t, _)| t.clone()).collect();
        topics.sort();
        topics
    }
}

impl BrokerSession for MockSession {
    type Error = ();

    fn configure(&mut self, host: &str, port: u16) {
        self.endpoint = Some((host.to_string(), port));
    }

    fn connect(&mut self, options: &ConnectOptions<'_>) -> Result<(), ()> {
        self.connect_attempts += 1;
        self.forms.push(options.form());
        self.client_ids.push(options.client_id.to_string());
        if self.accept {
            self.connected = true;
            Ok(())
        } else {
            Err(())
        }
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), ()> {
        if !self.connected {
            return Err(());
        }
        self.subscribed.push((topic.to_string(), qos));
        Ok(())
    }

    fn unsubscribe(&mut self, topic: &str) -> Result<(), ()> {
        self.unsubscribed.push(topic.to_string());
        if self.connected { Ok(()) } else { Err(()) }
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), ()> {
        if !self.connected {
            return Err(());
        }
        self.published
            .push((topic.to_string(), payload.to_vec(), retain));
        Ok(())
    }

    fn pump(&mut self) -> Result<Option<Message>, ()> {
        if !self.connected {
            return Err(());
        }
        Ok(self.inbox.pop_front())
    }

    fn verify_trust(&mut self, _fingerprint: &str, _host: &str) -> bool {
        self.trust_ok
    }

    fn use_secure_transport(&mut self, secure: bool) {
        self.secure = secure;
    }
}

/// Clock whose delays advance time instantly.
#[derive(Debug, Default)]
pub struct MockClock {
    now: Timeline,
    pub yields: usize,
}

impl MockClock {
    pub fn advance(&mut self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    /// A handle that follows this clock.
    pub fn timeline(&self) -> Timeline {
        Rc::clone(&self.now)
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }

    fn delay_ms(&mut self, ms: u32) {
        self.advance(u64::from(ms));
    }

    fn yield_now(&mut self) {
        self.yields += 1;
    }
}

#[derive(Debug, Default)]
pub struct MockOta {
    pub begins: usize,
    pub pumps: usize,
    pub stops: usize,
    pub password: Option<std::string::String>,
    pub hostname: Option<std::string::String>,
}

impl OtaUpdater for MockOta {
    type Error = ();

    fn begin(&mut self) -> Result<(), ()> {
        self.begins += 1;
        Ok(())
    }

    fn pump(&mut self) -> Result<(), ()> {
        self.pumps += 1;
        Ok(())
    }

    fn set_password(&mut self, password: &str) {
        self.password = Some(password.to_string());
    }

    fn set_hostname(&mut self, hostname: &str) {
        self.hostname = Some(hostname.to_string());
    }

    fn stop(&mut self) {
        self.stops += 1;
    }
}
