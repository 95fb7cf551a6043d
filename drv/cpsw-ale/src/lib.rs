// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Driver for the TI CPSW Address Lookup Engine (ALE)
//!
//! The ALE is the forwarding table of the CPSW family of Ethernet switches.
//! In hardware it is nothing more than an indexed array of 96-bit entries,
//! reached through a table-control register and three data registers; there
//! is no search or insert logic. This crate layers MAC/VLAN keyed semantics
//! on top of it in software: lookups are linear scans, and every add picks a
//! slot using the same "existing, then free, then ageable" policy.
//!
//! The engine does no locking of its own. Every operation that modifies the
//! table takes `&mut Ale`, so holding the engine exclusively is what keeps a
//! read-modify-write sequence from being interleaved with another.

#![cfg_attr(not(test), no_std)]

use core::cell::RefCell;

use enum_map::EnumMap;
use heapless::HistoryBuffer;

mod addr;
mod aging;
pub mod config;
mod control;
pub mod entry;
mod policer;
pub mod registers;
mod table;
pub mod variant;
mod vlan;

#[cfg(test)]
mod fake;

pub use addr::AddrFlags;
pub use config::AleConfig;
pub use control::{Control, ControlInfo, PortState, RATE_LIMIT_MIN_PPS};
pub use entry::{AleEntry, EntryType, MacAddress, McastState, UcastType};
pub use policer::{PolicerMatch, PRI_THREAD_MAP};
pub use registers::{Field, RegField};
pub use variant::{Features, Variant, VariantInfo, VlanField};
pub use vlan::VlanMasks;

use aging::Aging;
use variant::FieldWidth;

/// Host port; bit 0 of every port mask
pub const PORT_HOST: u32 = 1 << 0;

/// Number of VLAN ids tracked by the host untag bitmap
pub const VLAN_N_VID: usize = 4096;

const TABLE_SIZE_MULTIPLIER: u32 = 1024;
const POLICER_SIZE_MULTIPLIER: u32 = 8;

/// This trait abstracts over the register block holding the ALE.
///
/// Implementations are expected to perform a single 32-bit access per call;
/// the table and policer protocols depend on the exact order of accesses.
pub trait AleRw {
    /// Reads the register at byte offset `reg`
    fn read(&self, reg: u32) -> u32;

    /// Writes the register at byte offset `reg`
    fn write(&self, reg: u32, value: u32);

    /// Performs a read-modify-write operation on a register
    fn modify<F>(&self, reg: u32, f: F)
    where
        F: FnOnce(&mut u32),
    {
        let mut data = self.read(reg);
        f(&mut data);
        self.write(reg, data)
    }

    fn read_field(&self, field: RegField) -> u32 {
        (self.read(field.reg) & field.mask()) >> field.lsb
    }

    /// Updates only the bits of `field`, truncating `value` to fit
    fn write_field(&self, field: RegField, value: u32) {
        let mask = field.mask();
        self.modify(field.reg, |r| {
            *r = (*r & !mask) | ((value << field.lsb) & mask)
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Device identity string matches no known variant
    UnknownDevice,
    /// `STATUS` reports an empty table
    NoTableEntries,
    /// `STATUS` reports no policers
    NoPolicers,
    BadPortCount(u8),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AleError {
    /// No entry has the requested key
    NotFound,
    /// No free or ageable slot is left
    TableFull,
    /// Port, VLAN id, mask or value out of range
    InvalidArgument,
    /// The field or register does not exist on this variant
    NotAllowed,
    Config(ConfigError),
}

impl From<ConfigError> for AleError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Trace {
    Init {
        major: u32,
        minor: u32,
        entries: u32,
        policers: u32,
    },
    VlanFieldNotAllowed(VlanField),
    RegFieldNotAllowed(Field),
    TableFull,
    Evicted(u32),
    VlanAddFailed(u16),
    RateLimitTooLow {
        port: u8,
        pps: u32,
    },
    RateLimitRounded {
        port: u8,
        requested: u32,
        programmed: u32,
    },
    AgingTimerClamped(u64),
    Ageout(u64),
}

const TRACE_DEPTH: usize = 16;

/// Top-level state for one ALE instance.
pub struct Ale<'a, R: AleRw> {
    rw: &'a R,
    variant: Variant,
    info: VariantInfo,
    entries: u32,
    policers: u32,
    ports: u8,
    port_mask_bits: u32,
    port_num_bits: u32,
    version: u32,
    bus_freq: u32,
    /// Variant-specific replacements for the base control descriptors
    controls: EnumMap<Control, Option<ControlInfo>>,
    /// VLAN ids whose entries force-untag egress on the host port
    host_untag: [u32; VLAN_N_VID / 32],
    aging: Aging,
    ringbuf: RefCell<HistoryBuffer<Trace, TRACE_DEPTH>>,
}

/// `ceil(log2(n))`, i.e. the number of bits needed to hold `0..n`
const fn order_base_2(n: u32) -> u32 {
    if n <= 1 {
        0
    } else {
        32 - (n - 1).leading_zeros()
    }
}

impl<'a, R: AleRw> Ale<'a, R> {
    /// Brings up the engine for the configured variant and clears the table.
    pub fn new(rw: &'a R, cfg: AleConfig) -> Result<Self, AleError> {
        if !(config::MIN_PORTS..=config::MAX_PORTS).contains(&cfg.ale_ports) {
            return Err(ConfigError::BadPortCount(cfg.ale_ports).into());
        }
        let info = cfg.variant.info();
        let mut ale = Self {
            rw,
            variant: cfg.variant,
            info,
            entries: info.table_entries,
            policers: cfg.num_policers,
            ports: cfg.ale_ports,
            port_mask_bits: u32::from(cfg.ale_ports),
            port_num_bits: order_base_2(u32::from(cfg.ale_ports)),
            version: 0,
            bus_freq: cfg.bus_freq,
            controls: EnumMap::default(),
            host_untag: [0; VLAN_N_VID / 32],
            aging: Aging::new(cfg.ale_ageout, info.features),
            ringbuf: RefCell::new(HistoryBuffer::new()),
        };

        let minor = ale.reg_field_read(Field::MinorVer)?;
        let major = ale.reg_field_read(Field::MajorVer)?;
        ale.version = major << 8 | minor;

        if info.features.contains(Features::STATUS_REG) {
            if ale.entries == 0 {
                let n = ale.reg_field_read(Field::AleEntries)?;
                if n == 0 {
                    return Err(ConfigError::NoTableEntries.into());
                }
                ale.entries = n * TABLE_SIZE_MULTIPLIER;
            }
            if ale.policers == 0 {
                let n = ale.reg_field_read(Field::AlePolicers)?;
                if n == 0 {
                    return Err(ConfigError::NoPolicers.into());
                }
                ale.policers = n * POLICER_SIZE_MULTIPLIER;
            }
        }
        ale.trace(Trace::Init {
            major,
            minor,
            entries: ale.entries,
            policers: ale.policers,
        });

        if info.nu_switch {
            ale.apply_nu_control_overrides();
        }

        ale.control_set(0, Control::Clear, 1)?;
        Ok(ale)
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Hardware revision as `major << 8 | minor`
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn num_entries(&self) -> u32 {
        self.entries
    }

    pub fn num_policers(&self) -> u32 {
        self.policers
    }

    pub fn ports(&self) -> u8 {
        self.ports
    }

    pub fn port_mask_bits(&self) -> u32 {
        self.port_mask_bits
    }

    pub fn port_num_bits(&self) -> u32 {
        self.port_num_bits
    }

    /// Most recent trace record, if any
    pub fn last_trace(&self) -> Option<Trace> {
        self.ringbuf.borrow().recent().copied()
    }

    /// Checks whether `t` is still in the trace history
    pub fn traced(&self, t: Trace) -> bool {
        self.ringbuf.borrow().as_slice().contains(&t)
    }

    fn trace(&self, t: Trace) {
        self.ringbuf.borrow_mut().write(t);
    }

    /// Enables the engine, rate limiting and aging. `now` is the owner's
    /// current time in milliseconds, used to arm the software aging timer.
    pub fn start(&mut self, now: u64) -> Result<(), AleError> {
        // One prescaler tick per millisecond, so a per-port limit of N
        // means N * 1000 packets per second (see `RATE_LIMIT_MIN_PPS`).
        self.rw
            .write(registers::PRESCALE, self.bus_freq / RATE_LIMIT_MIN_PPS);
        self.control_set(0, Control::RateLimit, 1)?;

        self.control_set(0, Control::Enable, 1)?;
        self.control_set(0, Control::Clear, 1)?;
        self.aging_start(now);
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), AleError> {
        self.aging_stop();
        self.control_set(0, Control::Clear, 1)?;
        self.control_set(0, Control::Enable, 0)
    }

    fn reg_field(&self, f: Field) -> Result<RegField, AleError> {
        self.info.reg_layout.field(f).ok_or_else(|| {
            self.trace(Trace::RegFieldNotAllowed(f));
            AleError::NotAllowed
        })
    }

    /// Reads a named register field
    pub fn reg_field_read(&self, f: Field) -> Result<u32, AleError> {
        Ok(self.rw.read_field(self.reg_field(f)?))
    }

    /// Writes a named register field, leaving the rest of the register alone
    pub fn reg_field_write(
        &self,
        f: Field,
        value: u32,
    ) -> Result<(), AleError> {
        self.rw.write_field(self.reg_field(f)?, value);
        Ok(())
    }

    fn vlan_field_pos(&self, f: VlanField) -> Result<(u32, u32), AleError> {
        let Some(fld) = self.info.vlan_layout.field(f) else {
            self.trace(Trace::VlanFieldNotAllowed(f));
            return Err(AleError::NotAllowed);
        };
        let bits = match fld.width {
            FieldWidth::Fixed(b) => u32::from(b),
            FieldWidth::PortMask => self.port_mask_bits,
        };
        Ok((u32::from(fld.start), bits))
    }

    /// Reads a VLAN entry field using this variant's layout
    pub fn vlan_field(
        &self,
        entry: &AleEntry,
        f: VlanField,
    ) -> Result<u32, AleError> {
        let (start, bits) = self.vlan_field_pos(f)?;
        Ok(entry.field(start, bits))
    }

    /// Writes a VLAN entry field using this variant's layout. If the field
    /// does not exist the entry is left unchanged.
    pub fn set_vlan_field(
        &self,
        entry: &mut AleEntry,
        f: VlanField,
        value: u32,
    ) -> Result<(), AleError> {
        let (start, bits) = self.vlan_field_pos(f)?;
        entry.set_field(start, bits, value);
        Ok(())
    }
}

impl<R: AleRw> Drop for Ale<'_, R> {
    fn drop(&mut self) {
        self.aging_stop();
    }
}
