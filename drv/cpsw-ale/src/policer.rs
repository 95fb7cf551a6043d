// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Policer and classifier table
//!
//! Policers are edited through a single window of registers: selecting an
//! index loads that policer into the window, field writes stage changes,
//! and writing the index again with the write-enable bit commits them. Each
//! policer doubles as a classifier that can steer matching traffic to a
//! receive thread.

use crate::registers::{
    POLICER_TBL_CTL, POLICER_TBL_INDEX_MASK, POLICER_TBL_WRITE_ENABLE,
};
use crate::{Ale, AleError, AleRw, Field};

/// Receive thread for each 802.1Q priority (BK, BE, EE, CA, VI, VO, IC, NC),
/// indexed by the number of receive channels minus one. Priority 0 gets a
/// higher thread than priority 1 wherever there is room for it.
pub const PRI_THREAD_MAP: [[u8; 8]; 8] = [
    [0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 1, 1, 1, 1],
    [0, 0, 0, 0, 1, 1, 2, 2],
    [0, 0, 1, 1, 2, 2, 3, 3],
    [0, 0, 1, 1, 2, 2, 3, 4],
    [1, 0, 2, 2, 3, 3, 4, 5],
    [1, 0, 2, 3, 4, 4, 5, 6],
    [1, 0, 2, 3, 4, 5, 6, 7],
];

/// Match criteria of one classifier. Fields left as `None` are not matched
/// on. Address, VLAN and ethertype criteria are indices of ALE table
/// entries holding the value to match.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PolicerMatch {
    pub port: Option<u8>,
    pub priority: Option<u8>,
    pub oui: Option<u8>,
    pub dst: Option<u8>,
    pub src: Option<u8>,
    pub ovlan: Option<u8>,
    pub ivlan: Option<u8>,
    pub ethertype: Option<u8>,
    pub ipsrc: Option<u8>,
    pub ipdst: Option<u8>,
}

impl PolicerMatch {
    /// (match enable, value, requested value) for every criterion
    fn fields(&self) -> [(Field, Field, Option<u8>); 10] {
        use Field::*;
        [
            (PolPortMen, PolPortNum, self.port),
            (PolPriMen, PolPriVal, self.priority),
            (PolOuiMen, PolOuiIndex, self.oui),
            (PolDstMen, PolDstIndex, self.dst),
            (PolSrcMen, PolSrcIndex, self.src),
            (PolOvlanMen, PolOvlanIndex, self.ovlan),
            (PolIvlanMen, PolIvlanIndex, self.ivlan),
            (PolEthertypeMen, PolEthertypeIndex, self.ethertype),
            (PolIpsrcMen, PolIpsrcIndex, self.ipsrc),
            (PolIpdstMen, PolIpdstIndex, self.ipdst),
        ]
    }
}

/// Enables cleared by a reset, besides the match enables
const ACTION_ENABLES: [Field; 4] = [
    Field::PolEn,
    Field::PolRedDropEn,
    Field::PolYellowDropEn,
    Field::PolPriorityThreadEn,
];

impl<R: AleRw> Ale<'_, R> {
    fn check_policer(&self, idx: u32) -> Result<(), AleError> {
        // Fails on variants without a policer block
        self.reg_field(Field::PolEn)?;
        if idx < self.policers {
            Ok(())
        } else {
            Err(AleError::InvalidArgument)
        }
    }

    /// Loads policer `idx` into the policer registers, replacing whatever
    /// was staged there
    pub fn policer_read_idx(&mut self, idx: u32) -> Result<(), AleError> {
        self.check_policer(idx)?;
        self.rw.write(POLICER_TBL_CTL, idx & POLICER_TBL_INDEX_MASK);
        Ok(())
    }

    /// Commits the policer registers to policer `idx`
    pub fn policer_write_idx(&mut self, idx: u32) -> Result<(), AleError> {
        self.check_policer(idx)?;
        self.rw.write(
            POLICER_TBL_CTL,
            (idx & POLICER_TBL_INDEX_MASK) | POLICER_TBL_WRITE_ENABLE,
        );
        Ok(())
    }

    /// Binds classifier `idx` to receive thread `thread`, or unbinds it
    pub fn policer_thread_idx_enable(
        &mut self,
        idx: u32,
        thread: u8,
        enable: bool,
    ) -> Result<(), AleError> {
        self.check_policer(idx)?;
        let width = self.reg_field(Field::ThreadValue)?.width();
        if u32::from(thread) >> width != 0 {
            return Err(AleError::InvalidArgument);
        }
        self.reg_field_write(Field::ThreadClassIndex, idx)?;
        self.reg_field_write(Field::ThreadValue, u32::from(thread))?;
        self.reg_field_write(Field::ThreadEnable, u32::from(enable))
    }

    /// Disables matching and actions on every policer, and unbinds every
    /// classifier from its thread.
    pub fn policer_reset(&mut self) -> Result<(), AleError> {
        self.reg_field(Field::PolEn)?;
        for idx in 0..self.policers {
            self.policer_read_idx(idx)?;
            for (men, _, _) in PolicerMatch::default().fields() {
                self.reg_field_write(men, 0)?;
            }
            for f in ACTION_ENABLES {
                self.reg_field_write(f, 0)?;
            }
            self.policer_write_idx(idx)?;
            self.policer_thread_idx_enable(idx, 0, false)?;
        }
        Ok(())
    }

    /// Replaces the match criteria of classifier `idx` and binds it to
    /// `thread`, or unbinds it if `thread` is `None`.
    pub fn policer_program(
        &mut self,
        idx: u32,
        m: &PolicerMatch,
        thread: Option<u8>,
    ) -> Result<(), AleError> {
        self.check_policer(idx)?;
        let fields = m.fields();
        for (_, val, v) in fields {
            if let Some(v) = v {
                if u32::from(v) >> self.reg_field(val)?.width() != 0 {
                    return Err(AleError::InvalidArgument);
                }
            }
        }

        self.policer_read_idx(idx)?;
        for (men, val, v) in fields {
            match v {
                Some(v) => {
                    self.reg_field_write(val, u32::from(v))?;
                    self.reg_field_write(men, 1)?;
                }
                None => self.reg_field_write(men, 0)?,
            }
        }
        self.policer_write_idx(idx)?;

        match thread {
            Some(t) => self.policer_thread_idx_enable(idx, t, true),
            None => self.policer_thread_idx_enable(idx, 0, false),
        }
    }

    /// Maps the eight user priorities onto `num_rx_ch` receive threads,
    /// using the first eight classifiers.
    pub fn classifier_setup_default(
        &mut self,
        num_rx_ch: usize,
    ) -> Result<(), AleError> {
        self.reg_field(Field::PolEn)?;
        let map = num_rx_ch
            .checked_sub(1)
            .and_then(|i| PRI_THREAD_MAP.get(i))
            .ok_or(AleError::InvalidArgument)?;
        if self.policers < 8 {
            return Err(AleError::InvalidArgument);
        }

        self.policer_reset()?;
        for (pri, &thread) in (0u8..).zip(map.iter()) {
            let m = PolicerMatch {
                priority: Some(pri),
                ..PolicerMatch::default()
            };
            self.policer_program(u32::from(pri), &m, Some(thread))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeAle;
    use crate::AleConfig;

    const PORT_OUI: usize = 0;
    const DA_SA: usize = 1;
    const CTL: usize = 5;

    const THREAD_ENABLE: u32 = 1 << 15;

    fn k2g(hw: &FakeAle, policers: u32) -> Ale<'_, FakeAle> {
        Ale::new(
            hw,
            AleConfig::new("66ak2g", 4, 0)
                .unwrap()
                .with_policers(policers),
        )
        .unwrap()
    }

    #[test]
    fn default_classifier() {
        let hw = FakeAle::new(64);
        let mut ale = k2g(&hw, 16);
        ale.classifier_setup_default(8).unwrap();

        for pri in 0..8 {
            let p = hw.policer(pri);
            assert_eq!(p[PORT_OUI], 1 << 19 | (pri as u32) << 16);
            assert_eq!(p[DA_SA], 0);
            assert_eq!(
                hw.thread(pri),
                THREAD_ENABLE | u32::from(PRI_THREAD_MAP[7][pri])
            );
        }
        assert_eq!(hw.thread(0), THREAD_ENABLE | 1);
        for idx in 8..16 {
            assert_eq!(hw.policer(idx), [0; 6]);
            assert_eq!(hw.thread(idx), 0);
        }

        ale.classifier_setup_default(2).unwrap();
        assert_eq!(hw.thread(3), THREAD_ENABLE);
        assert_eq!(hw.thread(4), THREAD_ENABLE | 1);
    }

    #[test]
    fn default_classifier_arguments() {
        let hw = FakeAle::new(64);
        let mut ale = k2g(&hw, 16);
        assert_eq!(
            ale.classifier_setup_default(0),
            Err(AleError::InvalidArgument)
        );
        assert_eq!(
            ale.classifier_setup_default(9),
            Err(AleError::InvalidArgument)
        );

        let hw = FakeAle::new(64);
        let mut ale = k2g(&hw, 4);
        assert_eq!(
            ale.classifier_setup_default(4),
            Err(AleError::InvalidArgument)
        );
    }

    #[test]
    fn reset_clears_enables_and_commits() {
        let hw = FakeAle::new(64);
        let mut ale = k2g(&hw, 8);
        let m = PolicerMatch {
            port: Some(1),
            dst: Some(0x21),
            src: Some(0x12),
            ..PolicerMatch::default()
        };
        ale.policer_program(3, &m, Some(5)).unwrap();
        ale.reg_field_write(Field::PolEn, 1).unwrap();
        ale.policer_write_idx(3).unwrap();

        let p = hw.policer(3);
        assert_eq!(p[PORT_OUI], 1 << 31 | 1 << 25);
        assert_eq!(p[DA_SA], 1 << 31 | 0x21 << 16 | 1 << 15 | 0x12);
        assert_eq!(p[CTL], 1 << 31);
        assert_eq!(hw.thread(3), THREAD_ENABLE | 5);

        ale.policer_reset().unwrap();
        let p = hw.policer(3);
        // Indices survive, enables do not
        assert_eq!(p[PORT_OUI], 1 << 25);
        assert_eq!(p[DA_SA], 0x21 << 16 | 0x12);
        assert_eq!(p[CTL], 0);
        assert_eq!(hw.thread(3), 0);
    }

    #[test]
    fn program_checks_widths() {
        let hw = FakeAle::new(64);
        let mut ale = k2g(&hw, 8);
        hw.take_writes();
        let m = PolicerMatch {
            dst: Some(0x40),
            ..PolicerMatch::default()
        };
        assert_eq!(
            ale.policer_program(0, &m, None),
            Err(AleError::InvalidArgument)
        );
        assert!(hw.take_writes().is_empty());

        assert_eq!(
            ale.policer_program(8, &PolicerMatch::default(), None),
            Err(AleError::InvalidArgument)
        );
        assert_eq!(
            ale.policer_thread_idx_enable(0, 64, true),
            Err(AleError::InvalidArgument)
        );
    }

    #[test]
    fn no_policers_on_cpsw() {
        let hw = FakeAle::new(1024);
        let mut ale = Ale::new(
            &hw,
            AleConfig::new("cpsw", 3, 0).unwrap().with_policers(8),
        )
        .unwrap();
        assert_eq!(ale.policer_reset(), Err(AleError::NotAllowed));
        assert_eq!(
            ale.classifier_setup_default(1),
            Err(AleError::NotAllowed)
        );
    }

    #[test]
    fn no_policers_on_default_cpsw() {
        let hw = FakeAle::new(1024);
        let mut ale =
            Ale::new(&hw, AleConfig::new("cpsw", 3, 0).unwrap()).unwrap();
        assert_eq!(ale.num_policers(), 0);
        assert_eq!(ale.policer_reset(), Err(AleError::NotAllowed));
        assert_eq!(
            ale.classifier_setup_default(1),
            Err(AleError::NotAllowed)
        );
        assert_eq!(
            ale.classifier_setup_default(0),
            Err(AleError::NotAllowed)
        );
        assert_eq!(ale.policer_read_idx(0), Err(AleError::NotAllowed));
        assert_eq!(
            ale.policer_program(0, &PolicerMatch::default(), None),
            Err(AleError::NotAllowed)
        );
    }
}
