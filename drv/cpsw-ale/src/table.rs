// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Table access protocol, searches and slot allocation

use crate::entry::{
    AleEntry, EntryType, MacAddress, UcastType, ALE_ENTRY_WORDS,
};
use crate::registers::{TABLE, TABLE_CONTROL, TABLE_WRITE};
use crate::{Ale, AleError, AleRw, Trace};

impl<R: AleRw> Ale<'_, R> {
    /// Index must already be bounds-checked.
    pub(crate) fn read_raw(&self, idx: u32) -> AleEntry {
        self.rw.write(TABLE_CONTROL, idx);
        let mut e = AleEntry::FREE;
        for (i, w) in e.0.iter_mut().enumerate() {
            *w = self.rw.read(TABLE + 4 * i as u32);
        }
        e
    }

    /// Index must already be bounds-checked.
    pub(crate) fn write_raw(&mut self, idx: u32, e: &AleEntry) {
        for (i, w) in e.0.iter().enumerate() {
            self.rw.write(TABLE + 4 * i as u32, *w);
        }
        // The index and the write strobe have to land in the same access
        self.rw.write(TABLE_CONTROL, idx | TABLE_WRITE);
    }

    fn check_index(&self, idx: u32) -> Result<(), AleError> {
        if idx < self.entries {
            Ok(())
        } else {
            Err(AleError::InvalidArgument)
        }
    }

    pub fn read_entry(&self, idx: u32) -> Result<AleEntry, AleError> {
        self.check_index(idx)?;
        Ok(self.read_raw(idx))
    }

    pub fn write_entry(
        &mut self,
        idx: u32,
        e: &AleEntry,
    ) -> Result<(), AleError> {
        self.check_index(idx)?;
        self.write_raw(idx, e);
        Ok(())
    }

    /// Returns the first index whose entry satisfies `f`, reading every slot
    /// in ascending order until one does.
    fn scan<F>(&self, f: F) -> Option<u32>
    where
        F: Fn(&AleEntry) -> bool,
    {
        (0..self.entries).find(|&idx| f(&self.read_raw(idx)))
    }

    /// Finds the address entry for `addr` in VLAN `vid` (0 for entries
    /// without a VLAN).
    pub fn match_address(&self, addr: &MacAddress, vid: u16) -> Option<u32> {
        self.scan(|e| {
            e.entry_type().is_address()
                && e.vlan_id() == vid
                && e.addr() == *addr
        })
    }

    pub fn match_vlan(&self, vid: u16) -> Option<u32> {
        self.scan(|e| e.entry_type() == EntryType::Vlan && e.vlan_id() == vid)
    }

    pub fn match_free(&self) -> Option<u32> {
        self.scan(|e| e.entry_type() == EntryType::Free)
    }

    /// Finds a learned unicast entry that may be evicted
    pub fn find_ageable(&self) -> Option<u32> {
        self.scan(|e| {
            e.entry_type().is_address()
                && !e.mcast()
                && !matches!(
                    e.ucast_type(),
                    UcastType::Persistent | UcastType::Oui
                )
        })
    }

    /// Chooses the slot for an add: the entry's current slot if it has one,
    /// else a free slot, else an ageable victim.
    pub(crate) fn alloc(
        &self,
        existing: Option<u32>,
    ) -> Result<u32, AleError> {
        if let Some(idx) = existing.or_else(|| self.match_free()) {
            return Ok(idx);
        }
        match self.find_ageable() {
            Some(idx) => {
                self.trace(Trace::Evicted(idx));
                Ok(idx)
            }
            None => {
                self.trace(Trace::TableFull);
                Err(AleError::TableFull)
            }
        }
    }

    /// Copies the whole table into `buf`, e.g. across suspend.
    pub fn dump(&self, buf: &mut [AleEntry]) -> Result<(), AleError> {
        let buf = buf
            .get_mut(..self.entries as usize)
            .ok_or(AleError::InvalidArgument)?;
        for (idx, e) in buf.iter_mut().enumerate() {
            *e = self.read_raw(idx as u32);
        }
        Ok(())
    }

    /// Writes back a table previously saved with [`Ale::dump`].
    pub fn restore(&mut self, buf: &[AleEntry]) -> Result<(), AleError> {
        let buf = buf
            .get(..self.entries as usize)
            .ok_or(AleError::InvalidArgument)?;
        for (idx, e) in buf.iter().enumerate() {
            self.write_raw(idx as u32, e);
        }
        Ok(())
    }

    /// Same as [`Ale::dump`], as raw data-register words
    pub fn dump_words(&self, buf: &mut [u32]) -> Result<(), AleError> {
        let n = self.entries as usize * ALE_ENTRY_WORDS;
        let buf = buf.get_mut(..n).ok_or(AleError::InvalidArgument)?;
        for (idx, chunk) in buf.chunks_exact_mut(ALE_ENTRY_WORDS).enumerate() {
            chunk.copy_from_slice(&self.read_raw(idx as u32).0);
        }
        Ok(())
    }
}
