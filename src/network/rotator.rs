//! Round-robin failover across candidate network profiles.

use crate::profile::NetworkProfile;
use heapless::Vec;

/// Maximum number of candidate profiles.
pub const MAX_PROFILES: usize = 8;

/// An ordered list of candidate profiles with a cursor on the active one.
///
/// The list is never empty: a rotator built from no profiles holds a single
/// blank profile.
#[derive(Debug, Clone)]
pub struct ProfileRotator {
    profiles: Vec<NetworkProfile, MAX_PROFILES>,
    index: usize,
}

impl Default for ProfileRotator {
    fn default() -> Self {
        Self::single(NetworkProfile::blank())
    }
}

impl ProfileRotator {
    /// A rotator over exactly one profile.
    pub fn single(profile: NetworkProfile) -> Self {
        let mut profiles = Vec::new();
        // Capacity is at least one.
        let _ = profiles.push(profile);
        Self { profiles, index: 0 }
    }

    /// A rotator over up to [`MAX_PROFILES`] profiles, starting at `start`.
    ///
    /// Extra profiles are ignored; an out-of-range start wraps.
    pub fn from_slice(list: &[NetworkProfile], start: usize) -> Self {
        let mut profiles: Vec<NetworkProfile, MAX_PROFILES> = Vec::new();
        for profile in list.iter().take(MAX_PROFILES) {
            let _ = profiles.push(profile.clone());
        }
        if profiles.is_empty() {
            return Self::default();
        }
        let index = start % profiles.len();
        Self { profiles, index }
    }

    /// The active profile.
    pub fn current(&self) -> &NetworkProfile {
        &self.profiles[self.index]
    }

    /// Mutable access to the active profile.
    pub fn current_mut(&mut self) -> &mut NetworkProfile {
        &mut self.profiles[self.index]
    }

    /// Index of the active profile.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of profiles.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Advance to the next profile, wrapping after the last, and return it
    /// with its presence flags re-derived.
    pub fn hop(&mut self) -> &NetworkProfile {
        self.index = (self.index + 1) % self.profiles.len();
        let profile = &mut self.profiles[self.index];
        profile.normalize();
        profile
    }
}
