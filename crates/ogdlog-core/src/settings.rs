//! Settings bit flags controlling debug output and payload encoding

use serde::{Deserialize, Serialize};

/// Logger settings, stored as bit flags for compatibility with the legacy
/// `SettingsFlags` values used by other OGD clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogSettings(u8);

impl LogSettings {
    /// Verbose per-batch diagnostics
    pub const DEBUG: u8 = 0x01;
    /// Base64-encode the JSON payload before percent-encoding it
    pub const BASE64_ENCODE: u8 = 0x02;

    const ALL: u8 = Self::DEBUG | Self::BASE64_ENCODE;

    /// No flags set: plain JSON payloads, no debug output.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Build from raw bits; unknown bits are dropped.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, flag: u8) -> bool {
        self.0 & flag == flag
    }

    pub fn is_debug(self) -> bool {
        self.contains(Self::DEBUG)
    }

    pub fn base64_encode(self) -> bool {
        self.contains(Self::BASE64_ENCODE)
    }

    pub fn with_debug(self, debug: bool) -> Self {
        self.with_flag(Self::DEBUG, debug)
    }

    pub fn with_base64_encode(self, enabled: bool) -> Self {
        self.with_flag(Self::BASE64_ENCODE, enabled)
    }

    fn with_flag(self, flag: u8, enabled: bool) -> Self {
        if enabled {
            Self(self.0 | flag)
        } else {
            Self(self.0 & !flag)
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self(Self::BASE64_ENCODE)
    }
}
