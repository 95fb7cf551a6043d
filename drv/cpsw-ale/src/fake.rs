// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Register-level model of the ALE for host tests
//!
//! Plain registers are a sparse map. The table and policer control
//! registers behave like the hardware: writing an index loads the selected
//! row into the data registers, and writing it with the write-enable bit
//! stores the data registers into the row.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::entry::{AleEntry, ALE_ENTRY_WORDS};
use crate::registers::*;
use crate::AleRw;

const POLICER_REGS: [u32; 6] = [
    POLICER_PORT_OUI,
    POLICER_DA_SA,
    POLICER_VLAN,
    POLICER_ETHERTYPE_IPSA,
    POLICER_IPDA,
    POLICER_CTL,
];

pub struct FakeAle {
    regs: RefCell<HashMap<u32, u32>>,
    table: RefCell<Vec<[u32; ALE_ENTRY_WORDS]>>,
    policers: RefCell<Vec<[u32; 6]>>,
    threads: RefCell<Vec<u32>>,
    log: RefCell<Vec<(u32, u32)>>,
}

impl FakeAle {
    pub fn new(entries: usize) -> Self {
        Self {
            regs: RefCell::new(HashMap::new()),
            table: RefCell::new(vec![[0; ALE_ENTRY_WORDS]; entries]),
            policers: RefCell::new(vec![[0; 6]; 32]),
            threads: RefCell::new(vec![0; 32]),
            log: RefCell::new(Vec::new()),
        }
    }

    pub fn reg(&self, reg: u32) -> u32 {
        self.regs.borrow().get(&reg).copied().unwrap_or(0)
    }

    pub fn set_reg(&self, reg: u32, value: u32) {
        self.regs.borrow_mut().insert(reg, value);
    }

    pub fn row(&self, idx: usize) -> AleEntry {
        AleEntry(self.table.borrow()[idx])
    }

    pub fn set_row(&self, idx: usize, e: AleEntry) {
        self.table.borrow_mut()[idx] = e.0;
    }

    /// Committed contents of policer `idx`, in `POLICER_REGS` order
    pub fn policer(&self, idx: usize) -> [u32; 6] {
        self.policers.borrow()[idx]
    }

    /// Committed `THREAD_VAL` of classifier `idx`
    pub fn thread(&self, idx: usize) -> u32 {
        self.threads.borrow()[idx]
    }

    /// Every write since the last call, in order
    pub fn take_writes(&self) -> Vec<(u32, u32)> {
        core::mem::take(&mut *self.log.borrow_mut())
    }
}

impl AleRw for FakeAle {
    fn read(&self, reg: u32) -> u32 {
        self.reg(reg)
    }

    fn write(&self, reg: u32, value: u32) {
        self.log.borrow_mut().push((reg, value));
        self.set_reg(reg, value);
        match reg {
            TABLE_CONTROL => {
                let idx = (value & !TABLE_WRITE) as usize;
                let mut table = self.table.borrow_mut();
                if value & TABLE_WRITE != 0 {
                    for (i, w) in table[idx].iter_mut().enumerate() {
                        *w = self.reg(TABLE + 4 * i as u32);
                    }
                } else {
                    for (i, w) in table[idx].iter().enumerate() {
                        self.set_reg(TABLE + 4 * i as u32, *w);
                    }
                }
            }
            POLICER_TBL_CTL => {
                let idx = (value & POLICER_TBL_INDEX_MASK) as usize;
                let mut policers = self.policers.borrow_mut();
                if value & POLICER_TBL_WRITE_ENABLE != 0 {
                    for (r, w) in POLICER_REGS.iter().zip(&mut policers[idx]) {
                        *w = self.reg(*r);
                    }
                } else {
                    for (r, w) in POLICER_REGS.iter().zip(&policers[idx]) {
                        self.set_reg(*r, *w);
                    }
                }
            }
            THREAD_VAL => {
                let idx = (self.reg(THREAD_CTL) & 0x1f) as usize;
                self.threads.borrow_mut()[idx] = value;
            }
            _ => (),
        }
    }
}
