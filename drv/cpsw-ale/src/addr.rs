// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Unicast and multicast address entries

use bitflags::bitflags;

use crate::entry::{
    AleEntry, EntryType, MacAddress, McastState, UcastType, BROADCAST,
};
use crate::{Ale, AleError, AleRw, VLAN_N_VID};

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct AddrFlags: u32 {
        /// Unicast: drop packets from this address arriving on other ports
        const SECURE = 1 << 0;
        /// Unicast: drop packets to or from this address
        const BLOCKED = 1 << 1;
        /// Multicast: forward even when the port is not forwarding
        const SUPER = 1 << 2;
        /// The entry is keyed by VLAN as well as address
        const VLAN = 1 << 3;
    }
}

impl AddrFlags {
    /// VLAN id the entry is keyed by
    fn key_vid(self, vid: u16) -> u16 {
        if self.contains(AddrFlags::VLAN) {
            vid
        } else {
            0
        }
    }
}

pub(crate) fn check_vid(vid: u16) -> Result<(), AleError> {
    if usize::from(vid) < VLAN_N_VID {
        Ok(())
    } else {
        Err(AleError::InvalidArgument)
    }
}

/// Sets the type, VLAN id and address of an address entry
fn set_key(e: &mut AleEntry, addr: &MacAddress, flags: AddrFlags, vid: u16) {
    if flags.contains(AddrFlags::VLAN) {
        e.set_entry_type(EntryType::VlanAddress);
        e.set_vlan_id(vid);
    } else {
        e.set_entry_type(EntryType::Address);
    }
    e.set_addr(addr);
}

impl<R: AleRw> Ale<'_, R> {
    pub(crate) fn check_port(&self, port: u8) -> Result<(), AleError> {
        if port < self.ports {
            Ok(())
        } else {
            Err(AleError::InvalidArgument)
        }
    }

    pub(crate) fn check_mask(&self, mask: u32) -> Result<(), AleError> {
        if mask >> self.port_mask_bits == 0 {
            Ok(())
        } else {
            Err(AleError::InvalidArgument)
        }
    }

    /// Adds or replaces a static unicast entry pointing at `port`.
    pub fn add_ucast(
        &mut self,
        addr: &MacAddress,
        port: u8,
        flags: AddrFlags,
        vid: u16,
    ) -> Result<(), AleError> {
        self.check_port(port)?;
        check_vid(vid)?;

        let mut e = AleEntry::FREE;
        set_key(&mut e, addr, flags, vid);
        e.set_ucast_type(UcastType::Persistent);
        e.set_secure(flags.contains(AddrFlags::SECURE));
        e.set_blocked(flags.contains(AddrFlags::BLOCKED));
        e.set_port_num(u32::from(port), self.port_num_bits);

        let idx = self.alloc(self.match_address(addr, flags.key_vid(vid)))?;
        self.write_raw(idx, &e);
        Ok(())
    }

    pub fn del_ucast(
        &mut self,
        addr: &MacAddress,
        _port: u8,
        flags: AddrFlags,
        vid: u16,
    ) -> Result<(), AleError> {
        let idx = self
            .match_address(addr, flags.key_vid(vid))
            .ok_or(AleError::NotFound)?;
        self.write_raw(idx, &AleEntry::FREE);
        Ok(())
    }

    /// Adds `port_mask` to the members of a multicast entry, creating it if
    /// needed. Super and state are taken from this call.
    pub fn add_mcast(
        &mut self,
        addr: &MacAddress,
        port_mask: u32,
        flags: AddrFlags,
        vid: u16,
        state: McastState,
    ) -> Result<(), AleError> {
        self.check_mask(port_mask)?;
        check_vid(vid)?;

        let existing = self.match_address(addr, flags.key_vid(vid));
        let old = existing.map_or(AleEntry::FREE, |idx| self.read_raw(idx));

        let mut e = old;
        set_key(&mut e, addr, flags, vid);
        e.set_super(flags.contains(AddrFlags::SUPER));
        e.set_mcast_state(state);
        let mask = old.port_mask(self.port_mask_bits) | port_mask;
        e.set_port_mask(mask, self.port_mask_bits);

        let idx = self.alloc(existing)?;
        self.write_raw(idx, &e);
        Ok(())
    }

    /// Removes `port_mask` from a multicast entry, freeing it once no
    /// member is left. A `port_mask` of 0 deletes the entry outright.
    pub fn del_mcast(
        &mut self,
        addr: &MacAddress,
        port_mask: u32,
        flags: AddrFlags,
        vid: u16,
    ) -> Result<(), AleError> {
        let idx = self
            .match_address(addr, flags.key_vid(vid))
            .ok_or(AleError::NotFound)?;
        let mut e = self.read_raw(idx);

        let members = if port_mask != 0 {
            e.port_mask(self.port_mask_bits) & !port_mask
        } else {
            0
        };
        if members == 0 {
            e = AleEntry::FREE;
        } else {
            e.set_port_mask(members, self.port_mask_bits);
        }
        self.write_raw(idx, &e);
        Ok(())
    }

    /// Removes `port_mask` from every learned multicast entry, optionally
    /// only those in VLAN `vid`. Super entries and broadcast are kept.
    pub fn flush_mcast(
        &mut self,
        port_mask: u32,
        vid: Option<u16>,
    ) -> Result<(), AleError> {
        for idx in 0..self.entries {
            let mut e = self.read_raw(idx);
            if !e.entry_type().is_address() || !e.mcast() || e.super_() {
                continue;
            }
            if vid.is_some_and(|v| e.vlan_id() != v) {
                continue;
            }
            if e.addr() == BROADCAST {
                continue;
            }
            let mask = e.port_mask(self.port_mask_bits);
            if mask & port_mask == 0 {
                continue;
            }
            let remaining = mask & !port_mask;
            if remaining == 0 {
                e = AleEntry::FREE;
            } else {
                e.set_port_mask(remaining, self.port_mask_bits);
            }
            self.write_raw(idx, &e);
        }
        Ok(())
    }
}
