// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bit-level encoding of ALE table entries
//!
//! An entry is 96 bits wide and is transferred through three 32-bit data
//! registers. Bit numbers count from the least significant bit of the whole
//! entry, but the words are stored most-significant first: word 0 holds bits
//! 95..64 and word 2 holds bits 31..0. Fields may straddle two words.

pub const ALE_ENTRY_WORDS: usize = 3;
pub const ALE_ENTRY_BITS: u32 = 32 * ALE_ENTRY_WORDS as u32;

pub type MacAddress = [u8; 6];

pub const BROADCAST: MacAddress = [0xff; 6];

const fn mask(bits: u32) -> u32 {
    if bits >= 32 {
        u32::MAX
    } else {
        (1 << bits) - 1
    }
}

/// Word holding bit `bit` of the entry
const fn word_index(bit: u32) -> usize {
    (ALE_ENTRY_WORDS - 1) - (bit / 32) as usize
}

/// Reads `bits` bits (at most 32) starting at entry bit `start`.
pub fn get_field(words: &[u32; ALE_ENTRY_WORDS], start: u32, bits: u32) -> u32 {
    debug_assert!(bits <= 32 && start + bits <= ALE_ENTRY_BITS);
    if bits == 0 {
        return 0;
    }
    let lo_word = start / 32;
    let hi_word = (start + bits - 1) / 32;

    let mut hi = 0;
    if lo_word != hi_word {
        // Upper part of the field starts at bit 0 of the next word
        hi = words[word_index(hi_word * 32)] << (hi_word * 32 - start);
    }
    let lo = words[word_index(start)] >> (start - lo_word * 32);
    (hi | lo) & mask(bits)
}

/// Writes `value`, truncated to `bits` bits (at most 32), starting at entry
/// bit `start`. Bits outside the field are left untouched.
pub fn set_field(
    words: &mut [u32; ALE_ENTRY_WORDS],
    start: u32,
    bits: u32,
    value: u32,
) {
    debug_assert!(bits <= 32 && start + bits <= ALE_ENTRY_BITS);
    if bits == 0 {
        return;
    }
    let value = value & mask(bits);
    let lo_word = start / 32;
    let hi_word = (start + bits - 1) / 32;

    if lo_word != hi_word {
        let hi_bits = start + bits - hi_word * 32;
        let w = &mut words[word_index(hi_word * 32)];
        *w &= !mask(hi_bits);
        *w |= value >> (hi_word * 32 - start);
    }
    let shift = start - lo_word * 32;
    let w = &mut words[word_index(start)];
    *w &= !(mask(bits) << shift);
    *w |= value << shift;
}

/// Entry kind, stored in bits 61..60
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EntryType {
    Free = 0,
    Address = 1,
    Vlan = 2,
    VlanAddress = 3,
}

impl EntryType {
    fn from_bits(v: u32) -> Self {
        match v & 0b11 {
            0 => Self::Free,
            1 => Self::Address,
            2 => Self::Vlan,
            _ => Self::VlanAddress,
        }
    }

    /// Address entries are the ones keyed by MAC
    pub fn is_address(self) -> bool {
        matches!(self, Self::Address | Self::VlanAddress)
    }
}

/// Unicast entry state; the hardware moves learned entries between
/// `Untouched` and `Touched` as it ages them.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UcastType {
    Persistent = 0,
    Untouched = 1,
    Oui = 2,
    Touched = 3,
}

impl UcastType {
    fn from_bits(v: u32) -> Self {
        match v & 0b11 {
            0 => Self::Persistent,
            1 => Self::Untouched,
            2 => Self::Oui,
            _ => Self::Touched,
        }
    }
}

/// Port states in which a multicast entry forwards
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum McastState {
    Forward = 0,
    BlockingLearningForward = 1,
    ForwardLearning = 2,
    Forward2 = 3,
}

impl McastState {
    fn from_bits(v: u32) -> Self {
        match v & 0b11 {
            0 => Self::Forward,
            1 => Self::BlockingLearningForward,
            2 => Self::ForwardLearning,
            _ => Self::Forward2,
        }
    }
}

const ENTRY_TYPE: (u32, u32) = (60, 2);
const VLAN_ID: (u32, u32) = (48, 12);
const MCAST_STATE: (u32, u32) = (62, 2);
const UCAST_TYPE: (u32, u32) = (62, 2);
const SUPER: (u32, u32) = (65, 1);
const BLOCKED: (u32, u32) = (65, 1);
const SECURE: (u32, u32) = (64, 1);
const MCAST: (u32, u32) = (40, 1);
// Variable width (port count dependent) fields
const PORT_MASK_START: u32 = 66;
const PORT_NUM_START: u32 = 66;

/// One ALE table entry, as the raw words moved through the data registers
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AleEntry(pub [u32; ALE_ENTRY_WORDS]);

impl AleEntry {
    pub const FREE: Self = Self([0; ALE_ENTRY_WORDS]);

    pub fn field(&self, start: u32, bits: u32) -> u32 {
        get_field(&self.0, start, bits)
    }

    pub fn set_field(&mut self, start: u32, bits: u32, value: u32) {
        set_field(&mut self.0, start, bits, value)
    }

    fn get(&self, (start, bits): (u32, u32)) -> u32 {
        self.field(start, bits)
    }

    fn set(&mut self, (start, bits): (u32, u32), value: u32) {
        self.set_field(start, bits, value)
    }

    pub fn entry_type(&self) -> EntryType {
        EntryType::from_bits(self.get(ENTRY_TYPE))
    }

    pub fn set_entry_type(&mut self, t: EntryType) {
        self.set(ENTRY_TYPE, t as u32)
    }

    pub fn vlan_id(&self) -> u16 {
        self.get(VLAN_ID) as u16
    }

    pub fn set_vlan_id(&mut self, vid: u16) {
        self.set(VLAN_ID, u32::from(vid))
    }

    /// The MAC address cannot be a single field: octet `i` sits at bit
    /// `40 - 8 * i`.
    pub fn addr(&self) -> MacAddress {
        let mut addr = [0; 6];
        for (i, b) in addr.iter_mut().enumerate() {
            *b = self.field(40 - 8 * i as u32, 8) as u8;
        }
        addr
    }

    pub fn set_addr(&mut self, addr: &MacAddress) {
        for (i, b) in addr.iter().enumerate() {
            self.set_field(40 - 8 * i as u32, 8, u32::from(*b));
        }
    }

    /// Group bit of the stored address
    pub fn mcast(&self) -> bool {
        self.get(MCAST) != 0
    }

    pub fn super_(&self) -> bool {
        self.get(SUPER) != 0
    }

    pub fn set_super(&mut self, v: bool) {
        self.set(SUPER, v as u32)
    }

    pub fn mcast_state(&self) -> McastState {
        McastState::from_bits(self.get(MCAST_STATE))
    }

    pub fn set_mcast_state(&mut self, s: McastState) {
        self.set(MCAST_STATE, s as u32)
    }

    pub fn ucast_type(&self) -> UcastType {
        UcastType::from_bits(self.get(UCAST_TYPE))
    }

    pub fn set_ucast_type(&mut self, t: UcastType) {
        self.set(UCAST_TYPE, t as u32)
    }

    pub fn secure(&self) -> bool {
        self.get(SECURE) != 0
    }

    pub fn set_secure(&mut self, v: bool) {
        self.set(SECURE, v as u32)
    }

    pub fn blocked(&self) -> bool {
        self.get(BLOCKED) != 0
    }

    pub fn set_blocked(&mut self, v: bool) {
        self.set(BLOCKED, v as u32)
    }

    pub fn port_mask(&self, bits: u32) -> u32 {
        self.field(PORT_MASK_START, bits)
    }

    pub fn set_port_mask(&mut self, mask: u32, bits: u32) {
        self.set_field(PORT_MASK_START, bits, mask)
    }

    pub fn port_num(&self, bits: u32) -> u32 {
        self.field(PORT_NUM_START, bits)
    }

    pub fn set_port_num(&mut self, port: u32, bits: u32) {
        self.set_field(PORT_NUM_START, bits, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn field_range() -> impl Strategy<Value = (u32, u32)> {
        (0u32..ALE_ENTRY_BITS).prop_flat_map(|start| {
            (Just(start), 1..=(ALE_ENTRY_BITS - start).min(32))
        })
    }

    proptest! {
        #[test]
        fn set_then_get(
            (start, bits) in field_range(),
            value: u32,
            background: [u32; 3],
        ) {
            let mut words = background;
            set_field(&mut words, start, bits, value);
            prop_assert_eq!(get_field(&words, start, bits), value & mask(bits));
        }

        #[test]
        fn set_leaves_other_bits_alone(
            (start, bits) in field_range(),
            value: u32,
            background: [u32; 3],
        ) {
            let mut words = background;
            set_field(&mut words, start, bits, value);
            let outside = |b: &u32| *b < start || *b >= start + bits;
            for b in (0..ALE_ENTRY_BITS).filter(outside) {
                prop_assert_eq!(
                    get_field(&words, b, 1),
                    get_field(&background, b, 1),
                    "bit {} changed", b
                );
            }
        }
    }

    #[test]
    fn word_order_is_most_significant_first() {
        let mut words = [0; 3];
        set_field(&mut words, 0, 32, 0x1234_5678);
        assert_eq!(words, [0, 0, 0x1234_5678]);

        let mut words = [0; 3];
        set_field(&mut words, 64, 4, 0xf);
        assert_eq!(words, [0xf, 0, 0]);
    }

    #[test]
    fn straddling_field() {
        let mut words = [0; 3];
        set_field(&mut words, 28, 8, 0xa5);
        assert_eq!(words, [0, 0x0000_000a, 0x5000_0000]);
        assert_eq!(get_field(&words, 28, 8), 0xa5);
        assert_eq!(get_field(&words, 0, 28), 0);
        assert_eq!(get_field(&words, 36, 28), 0);

        // Clearing it must not disturb neighbours
        let mut words = [u32::MAX; 3];
        set_field(&mut words, 28, 8, 0);
        assert_eq!(words, [u32::MAX, 0xffff_fff0, 0x0fff_ffff]);
    }

    #[test]
    fn value_is_truncated() {
        let mut words = [0; 3];
        set_field(&mut words, 60, 2, 0xff);
        assert_eq!(get_field(&words, 60, 2), 0b11);
        assert_eq!(get_field(&words, 62, 2), 0);
    }

    #[test]
    fn mac_address_and_group_bit() {
        let mut e = AleEntry::FREE;
        e.set_addr(&[0x01, 0x00, 0x5e, 0x00, 0x00, 0xfb]);
        assert_eq!(e.addr(), [0x01, 0x00, 0x5e, 0x00, 0x00, 0xfb]);
        assert!(e.mcast());
        // Octet 0 is the most significant byte of the 48-bit field
        assert_eq!(e.0, [0, 0x0000_0100, 0x5e00_00fb]);

        e.set_addr(&[0x02, 0, 0, 0, 0, 1]);
        assert!(!e.mcast());
    }

    #[test]
    fn typed_accessors() {
        let mut e = AleEntry::FREE;
        e.set_entry_type(EntryType::VlanAddress);
        e.set_vlan_id(0xabc);
        e.set_ucast_type(UcastType::Touched);
        e.set_secure(true);
        e.set_port_num(2, 2);

        assert_eq!(e.entry_type(), EntryType::VlanAddress);
        assert!(e.entry_type().is_address());
        assert_eq!(e.vlan_id(), 0xabc);
        assert_eq!(e.ucast_type(), UcastType::Touched);
        assert!(e.secure());
        assert!(!e.blocked());
        assert_eq!(e.port_num(2), 2);

        // Multicast fields alias the unicast ones
        assert_eq!(e.mcast_state(), McastState::Forward2);
    }
}
