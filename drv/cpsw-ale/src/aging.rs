// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Address aging
//!
//! Newer switches age entries on their own once `AGING_TIMER` holds a
//! nonzero period in clock ticks. Older ones only age when software pulses
//! the `ageout` control, so the owner of the engine is expected to call
//! [`Ale::handle_aging_timer`] whenever [`Ale::aging_deadline`] passes.

use crate::registers::{AGING_TIMER, AGING_TIMER_MASK};
use crate::{Ale, AleError, AleRw, Control, Features, Trace};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Aging {
    /// Configured with an ageout of 0
    Disabled,
    /// Deadline-driven `ageout` pulses, times in milliseconds
    Software { period: u64, deadline: Option<u64> },
    Hardware { ageout: u32, running: bool },
}

impl Aging {
    pub(crate) fn new(ageout: u32, features: Features) -> Self {
        if ageout == 0 {
            Aging::Disabled
        } else if features.contains(Features::HW_AUTOAGING) {
            Aging::Hardware {
                ageout,
                running: false,
            }
        } else {
            Aging::Software {
                period: u64::from(ageout) * 1000,
                deadline: None,
            }
        }
    }
}

impl<R: AleRw> Ale<'_, R> {
    pub(crate) fn aging_start(&mut self, now: u64) {
        match &mut self.aging {
            Aging::Disabled => (),
            Aging::Software { period, deadline } => {
                if deadline.is_none() {
                    *deadline = Some(now.saturating_add(*period));
                }
            }
            Aging::Hardware { ageout, running } => {
                let mut ticks = u64::from(self.bus_freq / 1_000_000)
                    * u64::from(*ageout);
                if ticks > u64::from(AGING_TIMER_MASK) {
                    self.ringbuf
                        .borrow_mut()
                        .write(Trace::AgingTimerClamped(ticks));
                    ticks = u64::from(AGING_TIMER_MASK);
                }
                self.rw.write(AGING_TIMER, ticks as u32);
                *running = true;
            }
        }
    }

    pub(crate) fn aging_stop(&mut self) {
        match &mut self.aging {
            Aging::Disabled => (),
            Aging::Software { deadline, .. } => *deadline = None,
            Aging::Hardware { running, .. } => {
                if *running {
                    self.rw.write(AGING_TIMER, 0);
                    *running = false;
                }
            }
        }
    }

    /// Time at which [`Ale::handle_aging_timer`] next has work to do, if
    /// software aging is running
    pub fn aging_deadline(&self) -> Option<u64> {
        match self.aging {
            Aging::Software { deadline, .. } => deadline,
            _ => None,
        }
    }

    /// Pulses `ageout` if the aging deadline has passed at time `now`, and
    /// re-arms one period later. Returns the next deadline.
    pub fn handle_aging_timer(
        &mut self,
        now: u64,
    ) -> Result<Option<u64>, AleError> {
        let Aging::Software { period, deadline } = self.aging else {
            return Ok(None);
        };
        match deadline {
            Some(d) if now >= d => {
                self.control_set(0, Control::Ageout, 1)?;
                self.trace(Trace::Ageout(now));
                let next = Some(now.saturating_add(period));
                self.aging = Aging::Software {
                    period,
                    deadline: next,
                };
                Ok(next)
            }
            d => Ok(d),
        }
    }
}
