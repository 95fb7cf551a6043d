// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Supported ALE hardware variants
//!
//! The variants differ in table size, in which optional registers exist and
//! in how a VLAN entry lays out its port masks. A variant is selected once,
//! from the device identity string, when the engine is created.

use bitflags::bitflags;
use serde::Deserialize;

use crate::registers::RegLayout;
use crate::{AleError, ConfigError};

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Features: u32 {
        /// `STATUS` reports table and policer sizes
        const STATUS_REG = 1 << 0;
        /// Aging is driven by the `AGING_TIMER` register
        const HW_AUTOAGING = 1 << 1;
    }
}

/// Fields of a VLAN entry whose presence and position depend on the variant
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VlanField {
    MemberList,
    UnregMcastMask,
    RegMcastMask,
    ForceUntaggedMask,
    UnregMcastIdx,
    RegMcastIdx,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldWidth {
    Fixed(u8),
    /// One bit per switch port
    PortMask,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EntryField {
    pub start: u8,
    pub width: FieldWidth,
}

const fn fixed(start: u8, bits: u8) -> Option<EntryField> {
    Some(EntryField {
        start,
        width: FieldWidth::Fixed(bits),
    })
}

const fn port_mask(start: u8) -> Option<EntryField> {
    Some(EntryField {
        start,
        width: FieldWidth::PortMask,
    })
}

/// VLAN entry layouts
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VlanLayout {
    /// dm814x, am3/am4/am5, k2hk: fixed 3-port masks stored inline
    Cpsw,
    /// k2e/k2l, am65 cpsw2g: flood masks live in the `VLAN_MASK_MUX`
    /// side table and the entry only stores their indices
    Nu,
    /// j721e/j7200 cpsw9g/5g, am64x cpsw3g: port-count wide inline masks
    K3Cpswxg,
}

impl VlanLayout {
    pub const fn field(self, f: VlanField) -> Option<EntryField> {
        use VlanField::*;
        match self {
            VlanLayout::Cpsw => match f {
                MemberList => fixed(0, 3),
                UnregMcastMask => fixed(8, 3),
                RegMcastMask => fixed(16, 3),
                ForceUntaggedMask => fixed(24, 3),
                UnregMcastIdx | RegMcastIdx => None,
            },
            VlanLayout::Nu => match f {
                MemberList => port_mask(0),
                UnregMcastIdx => fixed(20, 3),
                ForceUntaggedMask => port_mask(24),
                RegMcastIdx => fixed(44, 3),
                UnregMcastMask | RegMcastMask => None,
            },
            VlanLayout::K3Cpswxg => match f {
                MemberList => port_mask(0),
                UnregMcastMask => port_mask(12),
                ForceUntaggedMask => port_mask(24),
                RegMcastMask => port_mask(36),
                UnregMcastIdx | RegMcastIdx => None,
            },
        }
    }
}

/// Static description of one hardware variant
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VariantInfo {
    pub dev_id: &'static str,
    pub features: Features,
    /// Table size, or 0 if it must be read from `STATUS`
    pub table_entries: u32,
    pub reg_layout: RegLayout,
    /// NetCP NU switch: flood masks in the side table, separate per-port
    /// unknown-VLAN registers
    pub nu_switch: bool,
    pub vlan_layout: VlanLayout,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
pub enum Variant {
    /// am3/4/5, dra7, dm814x, 66ak2hk-gbe
    #[serde(rename = "cpsw")]
    Cpsw,
    #[serde(rename = "66ak2h-xgbe")]
    K2hXgbe,
    #[serde(rename = "66ak2el")]
    K2el,
    #[serde(rename = "66ak2g")]
    K2g,
    #[serde(rename = "am65x-cpsw2g")]
    Am65Cpsw2g,
    #[serde(rename = "j721e-cpswxg")]
    J721eCpswxg,
    #[serde(rename = "am64-cpswxg")]
    Am64Cpswxg,
}

impl Variant {
    pub const ALL: [Variant; 7] = [
        Variant::Cpsw,
        Variant::K2hXgbe,
        Variant::K2el,
        Variant::K2g,
        Variant::Am65Cpsw2g,
        Variant::J721eCpswxg,
        Variant::Am64Cpswxg,
    ];

    /// Selects a variant by device identity string
    pub fn from_dev_id(dev_id: &str) -> Result<Self, AleError> {
        Self::ALL
            .into_iter()
            .find(|v| v.info().dev_id == dev_id)
            .ok_or(ConfigError::UnknownDevice.into())
    }

    pub const fn info(self) -> VariantInfo {
        let nu = Features::STATUS_REG;
        let k3 = Features::STATUS_REG.union(Features::HW_AUTOAGING);
        match self {
            Variant::Cpsw => VariantInfo {
                dev_id: "cpsw",
                features: Features::empty(),
                table_entries: 1024,
                reg_layout: RegLayout::Cpsw,
                nu_switch: false,
                vlan_layout: VlanLayout::Cpsw,
            },
            Variant::K2hXgbe => VariantInfo {
                dev_id: "66ak2h-xgbe",
                features: Features::empty(),
                table_entries: 2048,
                reg_layout: RegLayout::Cpsw,
                nu_switch: false,
                vlan_layout: VlanLayout::Cpsw,
            },
            Variant::K2el => VariantInfo {
                dev_id: "66ak2el",
                features: nu,
                table_entries: 0,
                reg_layout: RegLayout::Nu,
                nu_switch: true,
                vlan_layout: VlanLayout::Nu,
            },
            Variant::K2g => VariantInfo {
                dev_id: "66ak2g",
                features: nu,
                table_entries: 64,
                reg_layout: RegLayout::Nu,
                nu_switch: true,
                vlan_layout: VlanLayout::Nu,
            },
            Variant::Am65Cpsw2g => VariantInfo {
                dev_id: "am65x-cpsw2g",
                features: k3,
                table_entries: 64,
                reg_layout: RegLayout::Nu,
                nu_switch: true,
                vlan_layout: VlanLayout::Nu,
            },
            Variant::J721eCpswxg => VariantInfo {
                dev_id: "j721e-cpswxg",
                features: k3,
                table_entries: 0,
                reg_layout: RegLayout::Nu,
                nu_switch: false,
                vlan_layout: VlanLayout::K3Cpswxg,
            },
            Variant::Am64Cpswxg => VariantInfo {
                dev_id: "am64-cpswxg",
                features: k3,
                table_entries: 512,
                reg_layout: RegLayout::Nu,
                nu_switch: false,
                vlan_layout: VlanLayout::K3Cpswxg,
            },
        }
    }
}

impl core::str::FromStr for Variant {
    type Err = AleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_dev_id(s)
    }
}
