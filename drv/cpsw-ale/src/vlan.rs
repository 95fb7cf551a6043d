// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! VLAN entries
//!
//! A VLAN entry holds four port masks: members, ports that egress untagged,
//! and the flood masks for registered and unregistered multicast. On NU
//! switches the flood masks are not stored in the entry. Instead the entry
//! holds two small indices into the `VLAN_MASK_MUX` registers, which hold
//! the masks themselves.

use crate::addr::check_vid;
use crate::entry::{AleEntry, EntryType};
use crate::registers::vlan_mask_mux;
use crate::{Ale, AleError, AleRw, Trace, VlanField, PORT_HOST};

/// Side-table slot used for the unregistered-multicast flood mask
const NU_VLAN_UNREG_MCAST_IDX: u32 = 1;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct VlanMasks {
    pub members: u32,
    pub untag: u32,
    pub reg_mcast: u32,
    pub unreg_mcast: u32,
}

impl<R: AleRw> Ale<'_, R> {
    fn side_table(&self) -> bool {
        self.info.nu_switch
    }

    /// Side-table register indexed by the `f` field of `e`
    fn mask_mux(&self, e: &AleEntry, f: VlanField) -> Result<u32, AleError> {
        Ok(vlan_mask_mux(self.vlan_field(e, f)?))
    }

    fn entry_masks(&self, e: &AleEntry) -> Result<VlanMasks, AleError> {
        let (reg_mcast, unreg_mcast) = if self.side_table() {
            (
                self.rw.read(self.mask_mux(e, VlanField::RegMcastIdx)?),
                self.rw.read(self.mask_mux(e, VlanField::UnregMcastIdx)?),
            )
        } else {
            (
                self.vlan_field(e, VlanField::RegMcastMask)?,
                self.vlan_field(e, VlanField::UnregMcastMask)?,
            )
        };
        Ok(VlanMasks {
            members: self.vlan_field(e, VlanField::MemberList)?,
            untag: self.vlan_field(e, VlanField::ForceUntaggedMask)?,
            reg_mcast,
            unreg_mcast,
        })
    }

    /// Stores the flood masks for `e`, either in the entry or in the side
    /// table it points at.
    fn set_flood_masks(
        &self,
        e: &mut AleEntry,
        reg_mcast: u32,
        unreg_mcast: u32,
    ) -> Result<(), AleError> {
        if self.side_table() {
            self.rw
                .write(self.mask_mux(e, VlanField::RegMcastIdx)?, reg_mcast);
            self.rw.write(
                self.mask_mux(e, VlanField::UnregMcastIdx)?,
                unreg_mcast,
            );
        } else {
            self.set_vlan_field(e, VlanField::RegMcastMask, reg_mcast)?;
            self.set_vlan_field(e, VlanField::UnregMcastMask, unreg_mcast)?;
        }
        Ok(())
    }

    fn set_host_untag(&mut self, vid: u16, untagged: bool) {
        let (word, bit) = (usize::from(vid) / 32, u32::from(vid) % 32);
        if untagged {
            self.host_untag[word] |= 1 << bit;
        } else {
            self.host_untag[word] &= !(1 << bit);
        }
    }

    /// Checks whether VLAN `vid` egresses untagged on the host port
    pub fn host_untagged(&self, vid: u16) -> bool {
        let (word, bit) = (usize::from(vid) / 32, u32::from(vid) % 32);
        self.host_untag
            .get(word)
            .is_some_and(|w| w & (1 << bit) != 0)
    }

    fn set_untag(
        &mut self,
        e: &mut AleEntry,
        vid: u16,
        untag: u32,
    ) -> Result<(), AleError> {
        self.set_vlan_field(e, VlanField::ForceUntaggedMask, untag)?;
        self.set_host_untag(vid, untag & PORT_HOST != 0);
        Ok(())
    }

    /// Returns the masks of VLAN `vid`
    pub fn vlan_masks(&self, vid: u16) -> Result<VlanMasks, AleError> {
        let idx = self.match_vlan(vid).ok_or(AleError::NotFound)?;
        self.entry_masks(&self.read_raw(idx))
    }

    /// Creates VLAN `vid`, or overwrites all of its masks.
    pub fn add_vlan(
        &mut self,
        vid: u16,
        masks: VlanMasks,
    ) -> Result<(), AleError> {
        check_vid(vid)?;
        for m in [
            masks.members,
            masks.untag,
            masks.reg_mcast,
            masks.unreg_mcast,
        ] {
            self.check_mask(m)?;
        }

        let existing = self.match_vlan(vid);
        let mut e = existing.map_or(AleEntry::FREE, |idx| self.read_raw(idx));
        let idx = self.alloc(existing)?;

        e.set_entry_type(EntryType::Vlan);
        e.set_vlan_id(vid);
        self.set_untag(&mut e, vid, masks.untag)?;
        if self.side_table() {
            self.set_vlan_field(
                &mut e,
                VlanField::UnregMcastIdx,
                NU_VLAN_UNREG_MCAST_IDX,
            )?;
        }
        self.set_flood_masks(&mut e, masks.reg_mcast, masks.unreg_mcast)?;
        self.set_vlan_field(&mut e, VlanField::MemberList, masks.members)?;

        self.write_raw(idx, &e);
        Ok(())
    }

    /// Adds the ports in `masks.members` to VLAN `vid`, creating it if
    /// needed. For those ports the untag and flood settings are replaced by
    /// the ones in `masks`; other ports keep theirs.
    pub fn vlan_add_modify(
        &mut self,
        vid: u16,
        masks: VlanMasks,
    ) -> Result<(), AleError> {
        let old = match self.match_vlan(vid) {
            Some(idx) => self.entry_masks(&self.read_raw(idx))?,
            None => VlanMasks::default(),
        };
        let ports = masks.members;
        let merged = VlanMasks {
            members: old.members | ports,
            untag: (old.untag & !ports) | masks.untag,
            reg_mcast: (old.reg_mcast & !ports) | masks.reg_mcast,
            unreg_mcast: (old.unreg_mcast & !ports) | masks.unreg_mcast,
        };
        self.add_vlan(vid, merged).inspect_err(|_| {
            self.trace(Trace::VlanAddFailed(vid));
        })
    }

    /// Removes `port_mask` from every mask of `e`, freeing it when no member
    /// is left.
    fn vlan_remove_ports(
        &mut self,
        e: &mut AleEntry,
        vid: u16,
        port_mask: u32,
    ) -> Result<(), AleError> {
        let old = self.entry_masks(e)?;
        let members = old.members & !port_mask;
        if members == 0 {
            self.set_host_untag(vid, false);
            *e = AleEntry::FREE;
            return Ok(());
        }

        self.set_untag(e, vid, old.untag & members)?;
        self.set_flood_masks(
            e,
            old.reg_mcast & members,
            old.unreg_mcast & members,
        )?;
        self.set_vlan_field(e, VlanField::MemberList, members)
    }

    /// Removes `port_mask` from VLAN `vid`, including the host port if it
    /// is in the mask.
    pub fn vlan_del_modify(
        &mut self,
        vid: u16,
        port_mask: u32,
    ) -> Result<(), AleError> {
        let idx = self.match_vlan(vid).ok_or(AleError::NotFound)?;
        let mut e = self.read_raw(idx);
        self.vlan_remove_ports(&mut e, vid, port_mask)?;
        self.write_raw(idx, &e);
        Ok(())
    }

    /// Deletes VLAN `vid` when `port_mask` is 0 or covers every member.
    /// Otherwise only the ports in `port_mask` leave the VLAN, and the host
    /// port stays.
    pub fn del_vlan(
        &mut self,
        vid: u16,
        port_mask: u32,
    ) -> Result<(), AleError> {
        let idx = self.match_vlan(vid).ok_or(AleError::NotFound)?;
        let mut e = self.read_raw(idx);

        let members = self.vlan_field(&e, VlanField::MemberList)? & !port_mask;
        if port_mask == 0 || members == 0 {
            self.set_host_untag(vid, false);
            e = AleEntry::FREE;
        } else {
            self.vlan_remove_ports(&mut e, vid, port_mask & !PORT_HOST)?;
        }
        self.write_raw(idx, &e);
        Ok(())
    }

    /// Applies `f` to the unregistered-multicast flood mask of every VLAN,
    /// or only of those with `port` as a member.
    fn update_unreg_flood<F>(
        &mut self,
        port: Option<u8>,
        f: F,
    ) -> Result<(), AleError>
    where
        F: Fn(u32) -> u32,
    {
        for idx in 0..self.entries {
            let mut e = self.read_raw(idx);
            if e.entry_type() != EntryType::Vlan {
                continue;
            }
            if let Some(p) = port {
                let members = self.vlan_field(&e, VlanField::MemberList)?;
                if members & (1 << p) == 0 {
                    continue;
                }
            }
            if self.side_table() {
                let reg = self.mask_mux(&e, VlanField::UnregMcastIdx)?;
                self.rw.modify(reg, |m| *m = f(*m));
            } else {
                let m = self.vlan_field(&e, VlanField::UnregMcastMask)?;
                self.set_vlan_field(&mut e, VlanField::UnregMcastMask, f(m))?;
                self.write_raw(idx, &e);
            }
        }
        Ok(())
    }

    /// Adds (or removes) `mask` to the unregistered-multicast flood mask of
    /// every VLAN.
    pub fn set_unreg_mcast(
        &mut self,
        mask: u32,
        add: bool,
    ) -> Result<(), AleError> {
        self.update_unreg_flood(None, |m| {
            if add {
                m | mask
            } else {
                m & !mask
            }
        })
    }

    /// Floods unregistered multicast to the host in every VLAN, or in every
    /// VLAN that has `port` as a member.
    pub fn set_allmulti(
        &mut self,
        allmulti: bool,
        port: Option<u8>,
    ) -> Result<(), AleError> {
        if let Some(p) = port {
            self.check_port(p)?;
        }
        self.update_unreg_flood(port, |m| {
            if allmulti {
                m | PORT_HOST
            } else {
                m & !PORT_HOST
            }
        })
    }
}
