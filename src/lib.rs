//! # iotlink - connectivity lifecycle for embedded devices
//!
//! A small fault-tolerant control loop that keeps a network-attached device
//! online: it brings up the wireless link, keeps a session with a
//! publish/subscribe broker alive, fails over between candidate networks and
//! persists the configuration that drives all of it. The crate is `no_std`
//! and allocation-free; every buffer is a fixed-size `heapless` container.
//!
//! ## Components
//!
//! - **[`profile::NetworkProfile`]**: identity and broker credentials of one network
//! - **[`network::ConnectionManager`]**: the link/session state machine, driven by `tick()`
//! - **[`network::ProfileRotator`]**: round-robin failover across several profiles
//! - **[`network::SubscriptionRegistry`]**: topics replayed after every new session
//! - **[`config::ConfigStore`]**: validates, repairs and persists the JSON configuration
//!
//! The radio, the broker client, the OTA updater, the flash filesystem and the
//! clock are collaborators supplied by the platform through the traits in
//! [`network`], [`storage`] and [`ota`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use iotlink::network::{ConnectionManager, LoopStatus};
//! use iotlink::profile::NetworkProfile;
//!
//! let profile = NetworkProfile::builder()
//!     .ssid("workshop")
//!     .password("hunter22")
//!     .broker("192.168.1.10")
//!     .build()?;
//!
//! let mut manager = ConnectionManager::new(radio, mqtt, ota, clock);
//! manager.add_subscription("workshop/lights");
//! manager.begin(profile);
//!
//! loop {
//!     if let LoopStatus::State(state) = manager.tick() {
//!         // react to state changes
//!     }
//! }
//! ```
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support and the directory-backed [`storage::DirStorage`]
//! - `defmt`: Route crate logging through defmt and derive `defmt::Format` for public enums
//! - `log`: Route crate logging through the `log` facade

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

#[macro_use]
mod fmt;

/// Device network profile data model.
pub mod profile;

/// Connection state machine, failover policy and the collaborator traits it drives.
///
/// Contains the wireless link and broker session interfaces together with the
/// [`ConnectionManager`](network::ConnectionManager) that owns them.
pub mod network;

/// Flat-namespace file storage used to persist configuration documents.
pub mod storage;

/// Persisted configuration: validation, repair and regeneration of the
/// device's network document.
pub mod config;

/// Over-the-air update collaborator and the enable/run bookkeeping around it.
pub mod ota;
