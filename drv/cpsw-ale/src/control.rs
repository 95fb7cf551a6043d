// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Named control bits in the global and per-port control registers
//!
//! Each control is described by a register offset and bit position, plus a
//! stride applied per port. Controls with a zero stride are global and ignore
//! the port argument. NetCP NU switches move the unknown-VLAN controls into
//! separate registers; those replacements live in a per-handle overlay so
//! the base table stays immutable.

use enum_map::Enum;

use crate::registers::{
    CONTROL, PORTCTL, THREAD_DEF, UNKNOWNVLAN, UNKNOWNVLAN_FORCE_UNTAG_EGRESS,
    UNKNOWNVLAN_MEMBER, UNKNOWNVLAN_REG_MCAST_FLOOD,
    UNKNOWNVLAN_UNREG_MCAST_FLOOD,
};
use crate::{Ale, AleError, AleRw, Trace};

/// Granularity of the broadcast and multicast rate limiters, given one
/// prescaler tick per millisecond
pub const RATE_LIMIT_MIN_PPS: u32 = 1000;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Enum)]
pub enum Control {
    Enable,
    Clear,
    Ageout,
    P0UniFlood,
    VlanNolearn,
    NoPortVlan,
    OuiDeny,
    Bypass,
    RateLimitTx,
    VlanAware,
    AuthEnable,
    RateLimit,
    PortState,
    PortDropUntagged,
    PortDropUnknownVlan,
    PortNolearn,
    PortNoSaUpdate,
    PortMaconly,
    PortMaconlyCaf,
    PortMcastLimit,
    PortBcastLimit,
    PortUnknownVlanMember,
    PortUnknownMcastFlood,
    PortUnknownRegMcastFlood,
    PortUntaggedEgress,
    DefaultThreadId,
    DefaultThreadEnable,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ControlInfo {
    pub name: &'static str,
    pub offset: u32,
    pub port_offset: u32,
    pub shift: u32,
    pub port_shift: u32,
    pub bits: u32,
}

impl ControlInfo {
    const fn global(
        name: &'static str,
        offset: u32,
        shift: u32,
        bits: u32,
    ) -> Self {
        Self {
            name,
            offset,
            port_offset: 0,
            shift,
            port_shift: 0,
            bits,
        }
    }

    const fn port(name: &'static str, shift: u32, bits: u32) -> Self {
        Self {
            name,
            offset: PORTCTL,
            port_offset: 4,
            shift,
            port_shift: 0,
            bits,
        }
    }

    pub fn is_global(&self) -> bool {
        self.port_offset == 0 && self.port_shift == 0
    }

    pub fn mask(&self) -> u32 {
        ((1u64 << self.bits) - 1) as u32
    }
}

impl Control {
    /// Descriptor shared by every variant
    pub const fn base(self) -> ControlInfo {
        use Control::*;
        match self {
            Enable => ControlInfo::global("enable", CONTROL, 31, 1),
            Clear => ControlInfo::global("clear", CONTROL, 30, 1),
            Ageout => ControlInfo::global("ageout", CONTROL, 29, 1),
            P0UniFlood => {
                ControlInfo::global("port0_unicast_flood", CONTROL, 8, 1)
            }
            VlanNolearn => ControlInfo::global("vlan_nolearn", CONTROL, 7, 1),
            NoPortVlan => ControlInfo::global("no_port_vlan", CONTROL, 6, 1),
            OuiDeny => ControlInfo::global("oui_deny", CONTROL, 5, 1),
            Bypass => ControlInfo::global("bypass", CONTROL, 4, 1),
            RateLimitTx => ControlInfo::global("rate_limit_tx", CONTROL, 3, 1),
            VlanAware => ControlInfo::global("vlan_aware", CONTROL, 2, 1),
            AuthEnable => ControlInfo::global("auth_enable", CONTROL, 1, 1),
            RateLimit => ControlInfo::global("rate_limit", CONTROL, 0, 1),
            PortState => ControlInfo::port("port_state", 0, 2),
            PortDropUntagged => ControlInfo::port("drop_untagged", 2, 1),
            PortDropUnknownVlan => ControlInfo::port("drop_unknown", 3, 1),
            PortNolearn => ControlInfo::port("nolearn", 4, 1),
            PortNoSaUpdate => ControlInfo::port("no_source_update", 5, 1),
            PortMaconly => ControlInfo::port("mac_only_port_mode", 11, 1),
            PortMaconlyCaf => ControlInfo::port("mac_only_port_caf", 13, 1),
            PortMcastLimit => ControlInfo::port("mcast_limit", 16, 8),
            PortBcastLimit => ControlInfo::port("bcast_limit", 24, 8),
            PortUnknownVlanMember => {
                ControlInfo::global("unknown_vlan_member", UNKNOWNVLAN, 0, 6)
            }
            PortUnknownMcastFlood => {
                ControlInfo::global("unknown_mcast_flood", UNKNOWNVLAN, 8, 6)
            }
            PortUnknownRegMcastFlood => {
                ControlInfo::global("unknown_reg_flood", UNKNOWNVLAN, 16, 6)
            }
            PortUntaggedEgress => {
                ControlInfo::global("untagged_egress", UNKNOWNVLAN, 24, 6)
            }
            DefaultThreadId => {
                ControlInfo::global("default_thread_id", THREAD_DEF, 0, 6)
            }
            DefaultThreadEnable => ControlInfo::global(
                "default_thread_id_enable",
                THREAD_DEF,
                15,
                1,
            ),
        }
    }

    pub const fn name(self) -> &'static str {
        self.base().name
    }

    /// Looks up a control by its canonical name, e.g. `"vlan_aware"`
    pub fn from_name(name: &str) -> Option<Self> {
        (0..Self::LENGTH)
            .map(Self::from_usize)
            .find(|c| c.name() == name)
    }
}

/// Forwarding state of a port, as held in its `port_state` control
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PortState {
    Disabled = 0,
    Blocked = 1,
    Learn = 2,
    Forward = 3,
}

impl<R: AleRw> Ale<'_, R> {
    /// The NU switch keeps the unknown-VLAN masks in registers of their own,
    /// one bit per port starting at bit 0.
    pub(crate) fn apply_nu_control_overrides(&mut self) {
        let bits = u32::from(self.ports);
        for (c, offset) in [
            (Control::PortUnknownVlanMember, UNKNOWNVLAN_MEMBER),
            (Control::PortUnknownMcastFlood, UNKNOWNVLAN_UNREG_MCAST_FLOOD),
            (Control::PortUnknownRegMcastFlood, UNKNOWNVLAN_REG_MCAST_FLOOD),
            (Control::PortUntaggedEgress, UNKNOWNVLAN_FORCE_UNTAG_EGRESS),
        ] {
            self.controls[c] = Some(ControlInfo {
                offset,
                shift: 0,
                bits,
                ..c.base()
            });
        }
    }

    /// Descriptor in effect for `c` on this instance
    pub fn control_info(&self, c: Control) -> ControlInfo {
        self.controls[c].unwrap_or(c.base())
    }

    /// Resolves the register offset and shift of `info` for `port`
    fn control_location(
        &self,
        port: u8,
        info: &ControlInfo,
    ) -> Result<(u32, u32), AleError> {
        let port = if info.is_global() { 0 } else { port };
        if port >= self.ports {
            return Err(AleError::InvalidArgument);
        }
        let port = u32::from(port);
        Ok((
            info.offset + port * info.port_offset,
            info.shift + port * info.port_shift,
        ))
    }

    pub fn control_set(
        &mut self,
        port: u8,
        c: Control,
        value: u32,
    ) -> Result<(), AleError> {
        let info = self.control_info(c);
        let (offset, shift) = self.control_location(port, &info)?;
        let mask = info.mask();
        if value & !mask != 0 {
            return Err(AleError::InvalidArgument);
        }
        self.rw.modify(offset, |r| {
            *r = (*r & !(mask << shift)) | (value << shift)
        });
        Ok(())
    }

    pub fn control_get(&self, port: u8, c: Control) -> Result<u32, AleError> {
        let info = self.control_info(c);
        let (offset, shift) = self.control_location(port, &info)?;
        Ok((self.rw.read(offset) >> shift) & info.mask())
    }

    pub fn set_port_state(
        &mut self,
        port: u8,
        state: PortState,
    ) -> Result<(), AleError> {
        self.control_set(port, Control::PortState, state as u32)
    }

    /// Converts a packets-per-second limit into limiter units, rounding
    /// down. Rounding is traced; a nonzero limit below one unit is refused.
    fn rate_limit_units(&self, port: u8, pps: u32) -> Result<u32, AleError> {
        let val = pps / RATE_LIMIT_MIN_PPS;
        if pps != 0 && val == 0 {
            self.trace(Trace::RateLimitTooLow { port, pps });
            return Err(AleError::InvalidArgument);
        }
        if pps % RATE_LIMIT_MIN_PPS != 0 {
            self.trace(Trace::RateLimitRounded {
                port,
                requested: pps,
                programmed: val * RATE_LIMIT_MIN_PPS,
            });
        }
        Ok(val)
    }

    /// Limits received multicast on `port`; 0 disables the limiter
    pub fn rx_ratelimit_mc(
        &mut self,
        port: u8,
        pps: u32,
    ) -> Result<(), AleError> {
        let val = self.rate_limit_units(port, pps)?;
        self.control_set(port, Control::PortMcastLimit, val)
    }

    /// Limits received broadcast on `port`; 0 disables the limiter
    pub fn rx_ratelimit_bc(
        &mut self,
        port: u8,
        pps: u32,
    ) -> Result<(), AleError> {
        let val = self.rate_limit_units(port, pps)?;
        self.control_set(port, Control::PortBcastLimit, val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeAle;
    use crate::AleConfig;

    fn cpsw(hw: &FakeAle) -> Ale<'_, FakeAle> {
        Ale::new(hw, AleConfig::new("cpsw", 3, 0).unwrap()).unwrap()
    }

    #[test]
    fn names() {
        assert_eq!(
            Control::from_name("vlan_aware"),
            Some(Control::VlanAware)
        );
        assert_eq!(
            Control::from_name("default_thread_id_enable"),
            Some(Control::DefaultThreadEnable)
        );
        assert_eq!(Control::from_name("bogus"), None);
        assert_eq!(Control::PortNoSaUpdate.name(), "no_source_update");
        for i in 0..Control::LENGTH {
            let c = Control::from_usize(i);
            assert_eq!(Control::from_name(c.name()), Some(c));
        }
    }

    #[test]
    fn per_port_controls_use_stride() {
        let hw = FakeAle::new(1024);
        let mut ale = cpsw(&hw);

        ale.set_port_state(2, PortState::Forward).unwrap();
        ale.control_set(2, Control::PortMcastLimit, 0x12).unwrap();
        assert_eq!(hw.reg(PORTCTL + 8), 0x0012_0003);
        assert_eq!(ale.control_get(2, Control::PortState), Ok(3));
        assert_eq!(ale.control_get(1, Control::PortState), Ok(0));

        assert_eq!(
            ale.control_set(3, Control::PortState, 1),
            Err(AleError::InvalidArgument)
        );
        assert_eq!(
            ale.control_set(0, Control::PortState, 4),
            Err(AleError::InvalidArgument)
        );
    }

    #[test]
    fn global_controls_ignore_port() {
        let hw = FakeAle::new(1024);
        let mut ale = cpsw(&hw);
        hw.set_reg(CONTROL, 0);

        ale.control_set(200, Control::VlanAware, 1).unwrap();
        assert_eq!(hw.reg(CONTROL), 1 << 2);
        assert_eq!(ale.control_get(7, Control::VlanAware), Ok(1));

        ale.control_set(0, Control::VlanAware, 0).unwrap();
        assert_eq!(hw.reg(CONTROL), 0);
    }

    #[test]
    fn unknown_vlan_controls() {
        let hw = FakeAle::new(1024);
        let mut ale = cpsw(&hw);
        ale.control_set(0, Control::PortUnknownMcastFlood, 0x3f).unwrap();
        assert_eq!(hw.reg(UNKNOWNVLAN), 0x3f00);
        assert_eq!(
            ale.control_set(0, Control::PortUnknownMcastFlood, 0x40),
            Err(AleError::InvalidArgument)
        );

        let hw = FakeAle::new(64);
        let mut ale = Ale::new(
            &hw,
            AleConfig::new("66ak2g", 4, 0).unwrap().with_policers(8),
        )
        .unwrap();
        let info = ale.control_info(Control::PortUnknownMcastFlood);
        assert_eq!(info.offset, UNKNOWNVLAN_UNREG_MCAST_FLOOD);
        assert_eq!((info.shift, info.bits), (0, 4));
        assert_eq!(info.name, "unknown_mcast_flood");

        ale.control_set(0, Control::PortUnknownMcastFlood, 0xf).unwrap();
        assert_eq!(hw.reg(UNKNOWNVLAN_UNREG_MCAST_FLOOD), 0xf);
        assert_eq!(hw.reg(UNKNOWNVLAN), 0);
        assert_eq!(
            ale.control_set(0, Control::PortUnknownMcastFlood, 0x10),
            Err(AleError::InvalidArgument)
        );
        // Untouched by the overlay
        assert_eq!(
            ale.control_info(Control::PortMcastLimit),
            Control::PortMcastLimit.base()
        );
    }

    #[test]
    fn rate_limit_rounding() {
        let hw = FakeAle::new(1024);
        let mut ale = cpsw(&hw);

        ale.rx_ratelimit_mc(1, 1500).unwrap();
        assert_eq!(ale.control_get(1, Control::PortMcastLimit), Ok(1));
        assert_eq!(
            ale.last_trace(),
            Some(Trace::RateLimitRounded {
                port: 1,
                requested: 1500,
                programmed: 1000
            })
        );

        assert_eq!(
            ale.rx_ratelimit_bc(1, 500),
            Err(AleError::InvalidArgument)
        );
        assert_eq!(
            ale.last_trace(),
            Some(Trace::RateLimitTooLow { port: 1, pps: 500 })
        );

        ale.rx_ratelimit_bc(1, 20_000).unwrap();
        assert_eq!(ale.control_get(1, Control::PortBcastLimit), Ok(20));
        ale.rx_ratelimit_bc(1, 0).unwrap();
        assert_eq!(ale.control_get(1, Control::PortBcastLimit), Ok(0));
    }
}
