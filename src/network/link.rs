//! Wireless link collaborator.

use core::net::Ipv4Addr;

/// The device's wireless interface.
///
/// `connect` only starts an association; the manager polls
/// [`is_connected`](WirelessLink::is_connected) to learn the outcome.
pub trait WirelessLink {
    /// Associated error type
    type Error: core::fmt::Debug;

    /// Put the radio in station (client) mode.
    fn set_station_mode(&mut self) -> Result<(), Self::Error>;

    /// Put the radio in access-point mode, serving `ssid` at `address`.
    fn set_access_point_mode(
        &mut self,
        ssid: &str,
        password: &str,
        address: Ipv4Addr,
    ) -> Result<(), Self::Error>;

    /// Start associating with a network. `None` joins an open network.
    fn connect(&mut self, ssid: &str, password: Option<&str>) -> Result<(), Self::Error>;

    /// Drop any association and stop any access point.
    fn disconnect_all(&mut self);

    /// `true` while associated with a network.
    fn is_connected(&self) -> bool;

    /// Station address, when associated.
    fn local_address(&self) -> Option<Ipv4Addr>;

    /// Hardware address of the interface.
    fn mac_address(&self) -> [u8; 6];
}
