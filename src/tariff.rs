//! Billing tariff selection by time of day
//!
//! Heat demand seconds are attributed to a tariff based on the local
//! wall-clock hour. Windows are checked in priority order; the first match
//! wins and an implicit default tariff covers every hour no window claims.

use chrono::{DateTime, Local, Timelike};
use std::fmt;

/// Tariff identifier, used directly as a metric label value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TariffId(pub u32);

/// Default tariff, applied when no configured window matches
pub const TARIFF_DEFAULT: TariffId = TariffId(1);

/// Secondary (night) tariff
pub const TARIFF_NIGHT: TariffId = TariffId(2);

impl fmt::Display for TariffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A recurring daily tariff window `[from, to)` in local hours
///
/// A window with `from > to` wraps midnight, e.g. 22..7 covers the evening
/// of one day and the early morning of the next. A window with `from == to`
/// never matches; totality comes from the selector's default fallback, not
/// from a catch-all window in the list.
#[derive(Debug, Clone, Copy)]
pub struct TariffWindow {
    id: TariffId,
    from: u32,
    to: u32,
}

impl TariffWindow {
    /// Create a window for an arbitrary tariff
    pub fn new(id: TariffId, from: u32, to: u32) -> Self {
        Self { id, from, to }
    }

    /// Create a window for the night tariff
    pub fn night(from: u32, to: u32) -> Self {
        Self::new(TARIFF_NIGHT, from, to)
    }

    fn contains_hour(&self, hour: u32) -> bool {
        if self.from > self.to {
            // Wraps midnight: [from, 24) or [0, to)
            hour >= self.from || hour < self.to
        } else {
            self.from <= hour && hour < self.to
        }
    }
}

/// Injectable wall-clock source, fixed in tests
pub type TimeSource = Box<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// Classifies "now" into a tariff given a prioritized window list
pub struct TariffSelector {
    now: TimeSource,
    windows: Vec<TariffWindow>,
}

impl TariffSelector {
    /// Create a selector with an explicit time source
    pub fn new(now: TimeSource, windows: Vec<TariffWindow>) -> Self {
        Self { now, windows }
    }

    /// Create a selector driven by the system clock
    pub fn system(windows: Vec<TariffWindow>) -> Self {
        Self::new(Box::new(Local::now), windows)
    }

    /// Return the first matching tariff for the current hour, or the default
    pub fn select(&self) -> TariffId {
        let hour = (self.now)().hour();

        for window in &self.windows {
            if window.contains_hour(hour) {
                return window.id;
            }
        }

        TARIFF_DEFAULT
    }
}
