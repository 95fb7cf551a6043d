// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ALE register map and named register fields

/// Identification and version register
pub const IDVER: u32 = 0x00;
/// Table/policer size register (status-register variants only)
pub const STATUS: u32 = 0x04;
/// Global control register
pub const CONTROL: u32 = 0x08;
/// Broadcast/multicast rate limit prescaler
pub const PRESCALE: u32 = 0x10;
/// Hardware aging timer (24-bit tick count)
pub const AGING_TIMER: u32 = 0x14;
/// Unknown VLAN handling register
pub const UNKNOWNVLAN: u32 = 0x18;
/// Table index / write-enable register
pub const TABLE_CONTROL: u32 = 0x20;
/// First of the three table data words
pub const TABLE: u32 = 0x34;
/// First per-port control register; ports are 4 bytes apart
pub const PORTCTL: u32 = 0x40;

// NetCP NU switch unknown-VLAN registers, one bit per port
pub const UNKNOWNVLAN_MEMBER: u32 = 0x90;
pub const UNKNOWNVLAN_UNREG_MCAST_FLOOD: u32 = 0x94;
pub const UNKNOWNVLAN_REG_MCAST_FLOOD: u32 = 0x98;
pub const UNKNOWNVLAN_FORCE_UNTAG_EGRESS: u32 = 0x9C;

/// Multicast flood mask side table on NU switches, indexed by the
/// `RegMcastIdx` / `UnregMcastIdx` fields of a VLAN entry.
pub const fn vlan_mask_mux(idx: u32) -> u32 {
    0xc0 + 4 * idx
}

pub const POLICER_PORT_OUI: u32 = 0x100;
pub const POLICER_DA_SA: u32 = 0x104;
pub const POLICER_VLAN: u32 = 0x108;
pub const POLICER_ETHERTYPE_IPSA: u32 = 0x10c;
pub const POLICER_IPDA: u32 = 0x110;
pub const POLICER_PIR: u32 = 0x118;
pub const POLICER_CIR: u32 = 0x11c;
pub const POLICER_TBL_CTL: u32 = 0x120;
pub const POLICER_CTL: u32 = 0x124;
pub const POLICER_TEST_CTL: u32 = 0x128;
pub const POLICER_HIT_STATUS: u32 = 0x12c;
pub const THREAD_DEF: u32 = 0x134;
pub const THREAD_CTL: u32 = 0x138;
pub const THREAD_VAL: u32 = 0x13c;

/// Set in `TABLE_CONTROL` together with the index to commit the data words
pub const TABLE_WRITE: u32 = 1 << 31;

pub const POLICER_TBL_WRITE_ENABLE: u32 = 1 << 31;
pub const POLICER_TBL_INDEX_MASK: u32 = 0x1f;

pub const AGING_TIMER_MASK: u32 = 0x00ff_ffff;

/// A contiguous bit range `[lsb, msb]` within one 32-bit register
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RegField {
    pub reg: u32,
    pub lsb: u8,
    pub msb: u8,
}

impl RegField {
    pub const fn new(reg: u32, lsb: u8, msb: u8) -> Self {
        Self { reg, lsb, msb }
    }

    pub const fn width(&self) -> u32 {
        (self.msb - self.lsb + 1) as u32
    }

    /// Mask of the field, in register position
    pub const fn mask(&self) -> u32 {
        (((1u64 << self.width()) - 1) as u32) << self.lsb
    }
}

/// Named register fields used by the version, status, policer and thread
/// blocks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Field {
    MinorVer,
    MajorVer,
    AleEntries,
    AlePolicers,

    PolPortMen,
    PolTrunkId,
    PolPortNum,
    PolPriMen,
    PolPriVal,
    PolOuiMen,
    PolOuiIndex,

    PolDstMen,
    PolDstIndex,
    PolSrcMen,
    PolSrcIndex,

    PolOvlanMen,
    PolOvlanIndex,
    PolIvlanMen,
    PolIvlanIndex,

    PolEthertypeMen,
    PolEthertypeIndex,
    PolIpsrcMen,
    PolIpsrcIndex,

    PolIpdstMen,
    PolIpdstIndex,

    PolEn,
    PolRedDropEn,
    PolYellowDropEn,
    PolYellowThresh,
    PolPolMatchMode,
    PolPriorityThreadEn,
    PolMacOnlyDefDis,

    PolTestClr,
    PolTestClrRed,
    PolTestClrYellow,
    PolTestClrSelected,
    PolTestEntry,

    PolStatusHit,
    PolStatusHitRed,
    PolStatusHitYellow,

    DefaultThreadEn,
    DefaultThreadVal,
    ThreadClassIndex,
    ThreadEnable,
    ThreadValue,
}

/// Which set of named register fields a variant implements
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegLayout {
    /// Plain CPSW: only the version register is described
    Cpsw,
    /// NetCP NU / K3 switches with status, policer and thread registers
    Nu,
}

impl RegLayout {
    /// Looks up a named field, returning `None` if this layout lacks it.
    pub const fn field(self, f: Field) -> Option<RegField> {
        use Field::*;
        let r = match self {
            RegLayout::Cpsw => match f {
                MinorVer => RegField::new(IDVER, 0, 7),
                MajorVer => RegField::new(IDVER, 8, 15),
                _ => return None,
            },
            RegLayout::Nu => match f {
                MinorVer => RegField::new(IDVER, 0, 7),
                MajorVer => RegField::new(IDVER, 8, 10),
                AleEntries => RegField::new(STATUS, 0, 7),
                AlePolicers => RegField::new(STATUS, 8, 15),

                PolPortMen => RegField::new(POLICER_PORT_OUI, 31, 31),
                PolTrunkId => RegField::new(POLICER_PORT_OUI, 30, 30),
                PolPortNum => RegField::new(POLICER_PORT_OUI, 25, 25),
                PolPriMen => RegField::new(POLICER_PORT_OUI, 19, 19),
                PolPriVal => RegField::new(POLICER_PORT_OUI, 16, 18),
                PolOuiMen => RegField::new(POLICER_PORT_OUI, 15, 15),
                PolOuiIndex => RegField::new(POLICER_PORT_OUI, 0, 5),

                PolDstMen => RegField::new(POLICER_DA_SA, 31, 31),
                PolDstIndex => RegField::new(POLICER_DA_SA, 16, 21),
                PolSrcMen => RegField::new(POLICER_DA_SA, 15, 15),
                PolSrcIndex => RegField::new(POLICER_DA_SA, 0, 5),

                PolOvlanMen => RegField::new(POLICER_VLAN, 31, 31),
                PolOvlanIndex => RegField::new(POLICER_VLAN, 16, 21),
                PolIvlanMen => RegField::new(POLICER_VLAN, 15, 15),
                PolIvlanIndex => RegField::new(POLICER_VLAN, 0, 5),

                PolEthertypeMen => {
                    RegField::new(POLICER_ETHERTYPE_IPSA, 31, 31)
                }
                PolEthertypeIndex => {
                    RegField::new(POLICER_ETHERTYPE_IPSA, 16, 21)
                }
                PolIpsrcMen => RegField::new(POLICER_ETHERTYPE_IPSA, 15, 15),
                PolIpsrcIndex => RegField::new(POLICER_ETHERTYPE_IPSA, 0, 5),

                PolIpdstMen => RegField::new(POLICER_IPDA, 31, 31),
                PolIpdstIndex => RegField::new(POLICER_IPDA, 16, 21),

                // POLICER_TBL_CTL has no named fields; its index and
                // write-enable bits must be written together.
                PolEn => RegField::new(POLICER_CTL, 31, 31),
                PolRedDropEn => RegField::new(POLICER_CTL, 29, 29),
                PolYellowDropEn => RegField::new(POLICER_CTL, 28, 28),
                PolYellowThresh => RegField::new(POLICER_CTL, 24, 26),
                PolPolMatchMode => RegField::new(POLICER_CTL, 22, 23),
                PolPriorityThreadEn => RegField::new(POLICER_CTL, 21, 21),
                PolMacOnlyDefDis => RegField::new(POLICER_CTL, 20, 20),

                PolTestClr => RegField::new(POLICER_TEST_CTL, 31, 31),
                PolTestClrRed => RegField::new(POLICER_TEST_CTL, 30, 30),
                PolTestClrYellow => RegField::new(POLICER_TEST_CTL, 29, 29),
                PolTestClrSelected => {
                    RegField::new(POLICER_TEST_CTL, 28, 28)
                }
                PolTestEntry => RegField::new(POLICER_TEST_CTL, 0, 4),

                PolStatusHit => RegField::new(POLICER_HIT_STATUS, 31, 31),
                PolStatusHitRed => RegField::new(POLICER_HIT_STATUS, 30, 30),
                PolStatusHitYellow => {
                    RegField::new(POLICER_HIT_STATUS, 29, 29)
                }

                DefaultThreadEn => RegField::new(THREAD_DEF, 15, 15),
                DefaultThreadVal => RegField::new(THREAD_DEF, 0, 5),
                ThreadClassIndex => RegField::new(THREAD_CTL, 0, 4),
                ThreadEnable => RegField::new(THREAD_VAL, 15, 15),
                ThreadValue => RegField::new(THREAD_VAL, 0, 5),
            },
        };
        Some(r)
    }
}
