use std::sync::Arc;

use arc_swap::ArcSwap;
use bayreuth_meal_api::{MensaType, Snapshot, View};
use chrono::{NaiveDate, NaiveDateTime, Timelike};

/// number of week pages kept per mensa, starting with the current week
pub const WEEKS: usize = 3;

/// Snapshot slots of one mensa. Only the refresher stores, readers load.
pub struct MensaSlots {
    pub today: ArcSwap<Snapshot>,
    pub weeks: [ArcSwap<Snapshot>; WEEKS],
}

impl MensaSlots {
    pub fn new(mensa: MensaType, today: NaiveDate) -> Self {
        let placeholder = |view| ArcSwap::from_pointee(Snapshot::placeholder(mensa, view, today));
        Self {
            today: placeholder(View::Day),
            weeks: std::array::from_fn(|_| placeholder(View::Week)),
        }
    }

    pub fn weeks(&self) -> [Arc<Snapshot>; WEEKS] {
        std::array::from_fn(|i| self.weeks[i].load_full())
    }
}

/// Allows one weekly refresh per day, and only once the operator had
/// time to publish the new week.
#[derive(Debug, Clone)]
pub struct WeeklyGate {
    min_hour: u32,
    last: Option<NaiveDate>,
}

impl WeeklyGate {
    pub fn new(min_hour: u32) -> Self {
        Self { min_hour, last: None }
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.last != Some(now.date()) && now.hour() >= self.min_hour
    }

    pub fn mark(&mut self, day: NaiveDate) {
        self.last = Some(day);
    }
}

/// Outcome of one refresh tick, counted in successful fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refresh {
    pub today: usize,
    /// `None` if the weekly pages were not due
    pub weeks: Option<usize>,
}
