//! Rebalance / reposition calendar timers.
//!
//! A timer has a set of scheduled calendar days. It fires on the first
//! trading session on or after each scheduled day, so a scheduled day that
//! falls on a holiday is carried forward to the next session, even when that
//! session is in the following week or month.
//!
//! The two timers are observed independently every session. When both fire
//! on the same session, the rebalance runs first.

use chrono::{Datelike, Days, NaiveDate, Weekday};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerRule {
    /// Every occurrence of the weekday.
    Weekly(Weekday),
    /// The `occurrence`-th (1-based) occurrence of the weekday in each month.
    MonthlyOccurrence { weekday: Weekday, occurrence: u32 },
}

impl TimerRule {
    pub fn is_scheduled(&self, day: NaiveDate) -> bool {
        match *self {
            TimerRule::Weekly(weekday) => day.weekday() == weekday,
            TimerRule::MonthlyOccurrence {
                weekday,
                occurrence,
            } => day.weekday() == weekday && (day.day() - 1) / 7 + 1 == occurrence,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CalendarTimer {
    rule: TimerRule,
    last_session: Option<NaiveDate>,
}

impl CalendarTimer {
    pub fn new(rule: TimerRule) -> Self {
        Self {
            rule,
            last_session: None,
        }
    }

    /// Observe a session. Sessions must arrive in strictly increasing date
    /// order; a repeated or earlier date never fires.
    pub fn check(&mut self, session: NaiveDate) -> bool {
        let fired = match self.last_session {
            Some(prev) if session <= prev => return false,
            Some(prev) => self.scheduled_between(prev, session),
            None => self.rule.is_scheduled(session),
        };
        self.last_session = Some(session);
        fired
    }

    /// Whether any day in (prev, session] is scheduled.
    fn scheduled_between(&self, prev: NaiveDate, session: NaiveDate) -> bool {
        let mut day = prev;
        while let Some(next) = day.checked_add_days(Days::new(1)) {
            if next > session {
                break;
            }
            if self.rule.is_scheduled(next) {
                return true;
            }
            day = next;
        }
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScheduledTriggers {
    pub rebalance: bool,
    pub reposition: bool,
}

#[derive(Debug, Clone)]
pub struct RebalanceScheduler {
    rebalance: CalendarTimer,
    reposition: CalendarTimer,
}

impl RebalanceScheduler {
    pub fn new(rebalance_weekday: Weekday, reposition_weekday: Weekday, occurrence: u32) -> Self {
        Self {
            rebalance: CalendarTimer::new(TimerRule::Weekly(rebalance_weekday)),
            reposition: CalendarTimer::new(TimerRule::MonthlyOccurrence {
                weekday: reposition_weekday,
                occurrence,
            }),
        }
    }

    pub fn advance(&mut self, session: NaiveDate) -> ScheduledTriggers {
        ScheduledTriggers {
            rebalance: self.rebalance.check(session),
            reposition: self.reposition.check(session),
        }
    }
}
