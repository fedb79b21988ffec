//! # Over-the-Air (OTA) Update Hook
//!
//! The firmware transfer itself belongs to the platform. This module defines
//! the [`OtaUpdater`] collaborator the connection manager drives and the
//! [`OtaControl`] bookkeeping around it:
//!
//! * `enabled`: whether the caller wants OTA at all.
//! * `running`: whether the updater has been started since the last stop.
//! * the upload password and the advertised hostname, applied before start.
//!
//! OTA is off until the caller enables it. Once enabled, the manager starts
//! the updater when connectivity reaches at least `Broadcasting` and pumps it
//! on every tick afterwards.

use heapless::String;

/// Maximum hostname length, including the version suffix.
pub const MAX_HOSTNAME_LEN: usize = 64;

/// Separator placed between a hostname and the firmware version.
pub const VERSION_SEPARATOR: &str = "----";

/// The platform's OTA service.
pub trait OtaUpdater {
    /// Associated error type
    type Error: core::fmt::Debug;

    /// Start listening for updates.
    fn begin(&mut self) -> Result<(), Self::Error>;

    /// Service pending update traffic.
    fn pump(&mut self) -> Result<(), Self::Error>;

    /// Password required to push an update.
    fn set_password(&mut self, password: &str);

    /// Hostname advertised to update tools.
    fn set_hostname(&mut self, hostname: &str);

    /// Stop listening for updates.
    fn stop(&mut self) {}
}

/// An updater that does nothing, for devices without OTA support.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOta;

impl OtaUpdater for NoOta {
    type Error = core::convert::Infallible;

    fn begin(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn pump(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_password(&mut self, _password: &str) {}

    fn set_hostname(&mut self, _hostname: &str) {}
}

/// Errors raised by OTA bookkeeping.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The hostname, with any version suffix, does not fit.
    HostnameTooLong,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::HostnameTooLong => defmt::write!(f, "HostnameTooLong"),
        }
    }
}

/// An [`OtaUpdater`] plus the enable/run state the manager tracks for it.
#[derive(Debug)]
pub struct OtaControl<O: OtaUpdater> {
    updater: O,
    enabled: bool,
    running: bool,
}

impl<O: OtaUpdater> OtaControl<O> {
    /// Wrap an updater. OTA starts disabled.
    pub fn new(updater: O) -> Self {
        Self {
            updater,
            enabled: false,
            running: false,
        }
    }

    /// Allow the updater to start on the next opportunity.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Stop the updater if it is running and keep it stopped.
    pub fn disable(&mut self) {
        self.enabled = false;
        if self.running {
            self.updater.stop();
            self.running = false;
            info!("OTA stopped");
        }
    }

    /// `true` if OTA is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// `true` if the updater has been started.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Start the updater if it is enabled and not yet running.
    pub fn begin_if_not_running(&mut self) {
        if !self.enabled || self.running {
            return;
        }
        match self.updater.begin() {
            Ok(()) => {
                self.running = true;
                info!("OTA listening");
            }
            Err(_) => warn!("OTA start failed"),
        }
    }

    /// Start if needed, then service the updater once.
    pub fn service(&mut self) {
        self.begin_if_not_running();
        if self.running && self.updater.pump().is_err() {
            debug!("OTA pump failed");
        }
    }

    /// Set the upload password.
    pub fn set_password(&mut self, password: &str) {
        self.updater.set_password(password);
    }

    /// Set the advertised hostname.
    pub fn set_hostname(&mut self, hostname: &str) {
        self.updater.set_hostname(hostname);
    }

    /// Set the advertised hostname as `<hostname>----<crate version>`.
    pub fn set_hostname_with_version(&mut self, hostname: &str) -> Result<(), Error> {
        let name = hostname_with_version(hostname)?;
        self.updater.set_hostname(&name);
        Ok(())
    }

    /// Stop the updater without changing whether OTA is enabled.
    pub fn stop(&mut self) {
        if self.running {
            self.updater.stop();
            self.running = false;
        }
    }

    /// The wrapped updater.
    pub fn updater(&self) -> &O {
        &self.updater
    }

    /// Mutable access to the wrapped updater.
    pub fn updater_mut(&mut self) -> &mut O {
        &mut self.updater
    }
}

/// Build `<hostname>----<crate version>`.
pub fn hostname_with_version(hostname: &str) -> Result<String<MAX_HOSTNAME_LEN>, Error> {
    let mut name: String<MAX_HOSTNAME_LEN> = String::new();
    name.push_str(hostname).map_err(|_| Error::HostnameTooLong)?;
    name.push_str(VERSION_SEPARATOR)
        .map_err(|_| Error::HostnameTooLong)?;
    name.push_str(env!("CARGO_PKG_VERSION"))
        .map_err(|_| Error::HostnameTooLong)?;
    Ok(name)
}
