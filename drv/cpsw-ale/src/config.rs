// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Board-level configuration for an ALE instance
use serde::Deserialize;

use crate::variant::Variant;
use crate::AleError;

pub const MIN_PORTS: u8 = 2;
pub const MAX_PORTS: u8 = 9;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AleConfig {
    /// Hardware variant, given by its device identity string
    #[serde(rename = "dev_id")]
    pub variant: Variant,
    /// Number of switch ports, including the host port
    pub ale_ports: u8,
    /// Policer count; 0 means read it from `STATUS` where available
    #[serde(default)]
    pub num_policers: u32,
    /// Aging interval in seconds; 0 disables aging
    #[serde(default)]
    pub ale_ageout: u32,
    /// Functional clock of the switch, in Hz
    pub bus_freq: u32,
}

impl AleConfig {
    pub fn new(
        dev_id: &str,
        ale_ports: u8,
        bus_freq: u32,
    ) -> Result<Self, AleError> {
        Ok(Self {
            variant: Variant::from_dev_id(dev_id)?,
            ale_ports,
            num_policers: 0,
            ale_ageout: 0,
            bus_freq,
        })
    }

    pub fn with_ageout(self, seconds: u32) -> Self {
        Self {
            ale_ageout: seconds,
            ..self
        }
    }

    pub fn with_policers(self, n: u32) -> Self {
        Self {
            num_policers: n,
            ..self
        }
    }
}
