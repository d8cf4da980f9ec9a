// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stable numeric identifiers.
//!
//! Hosts, directories, and jobs are identified by numbers that survive
//! configuration reloads and reboots; array positions do not. Cross-table
//! references always carry one of these IDs next to the cached position so
//! the position can be re-resolved after a layout change.

/// Define a newtype ID wrapper around `u32` with hex round-trip.
///
/// Generates `new()`, `get()`, `to_hex()`, `from_hex()`, `Display` (hex),
/// and `From<u32>` implementations. The on-disk and wire form of every ID
/// is lowercase hex without a prefix.
#[macro_export]
macro_rules! define_numeric_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            pub const fn new(id: u32) -> Self {
                Self(id)
            }

            pub const fn get(self) -> u32 {
                self.0
            }

            /// Lowercase hex form, as written into file and message names.
            pub fn to_hex(self) -> String {
                format!("{:x}", self.0)
            }

            /// Parse the lowercase hex form.
            pub fn from_hex(s: &str) -> Option<Self> {
                u32::from_str_radix(s, 16).ok().map(Self)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:x}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(id: u32) -> Self {
                Self(id)
            }
        }
    };
}

define_numeric_id! {
    /// Stable identifier of one remote destination (an FSA slot).
    pub struct HostId;
}

define_numeric_id! {
    /// Stable identifier of one watched input directory (an FRA slot).
    pub struct DirId;
}

define_numeric_id! {
    /// Stable identifier of one job template in the job-ID catalog.
    pub struct JobId;
}

impl JobId {
    /// Sentinel for "no job assigned" in idle job slots.
    pub const NONE: JobId = JobId(u32::MAX);
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
