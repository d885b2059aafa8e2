//! Player profile — the consumer of engine-produced deltas
//!
//! The engine mutates the profile directly when an operation completes:
//! experience on construction/clearing, a resource refund on cancellation,
//! gems on obstacle clears. Nothing here is persisted; the host snapshots
//! the profile however it likes.

use ahash::AHashMap;

use crate::core::config::SpeedUpCosts;

/// Experience gained for an operation with the given configured duration
///
/// The grant depends on the duration the data tables configured for the
/// finished level, not on elapsed wall time, so speeding a job up yields
/// the same experience as waiting it out.
pub fn experience_for_duration(duration_secs: i64) -> i64 {
    if duration_secs <= 0 {
        return 0;
    }
    (duration_secs as f64).sqrt() as i64
}

/// Gem cost to skip the given remaining duration
///
/// Costs are anchored at one minute / hour / day / week and linearly
/// interpolated in between; anything at or below a minute costs the
/// one-minute anchor flat.
pub fn speed_up_gem_cost(remaining_secs: i64, costs: &SpeedUpCosts) -> i64 {
    const MINUTE: i64 = 60;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;
    const WEEK: i64 = 7 * DAY;

    if remaining_secs <= 0 {
        return 0;
    }
    if remaining_secs <= MINUTE {
        return costs.one_minute;
    }

    let (low_time, low_cost, high_time, high_cost) = if remaining_secs <= HOUR {
        (MINUTE, costs.one_minute, HOUR, costs.one_hour)
    } else if remaining_secs <= DAY {
        (HOUR, costs.one_hour, DAY, costs.one_day)
    } else {
        (DAY, costs.one_day, WEEK, costs.one_week)
    };

    let span = (high_time - low_time) as f64;
    let into = (remaining_secs - low_time) as f64;
    ((high_cost - low_cost) as f64 * into / span).round() as i64 + low_cost
}

/// Mutable profile of the player owning a village
#[derive(Debug, Clone, Default)]
pub struct PlayerProfile {
    exp_points: i64,
    exp_level: i32,
    gems: i64,
    resources: AHashMap<String, i64>,
    /// Experience needed to finish each level, indexed by `level - 1`.
    level_thresholds: Vec<i64>,
}

impl PlayerProfile {
    /// New profile at level 1 with no balances.
    pub fn new(level_thresholds: Vec<i64>) -> Self {
        Self {
            exp_points: 0,
            exp_level: 1,
            gems: 0,
            resources: AHashMap::new(),
            level_thresholds,
        }
    }

    pub fn exp_points(&self) -> i64 {
        self.exp_points
    }

    pub fn exp_level(&self) -> i32 {
        self.exp_level
    }

    pub fn gems(&self) -> i64 {
        self.gems
    }

    /// Current balance of a resource; unknown resources read as zero.
    pub fn balance(&self, resource: &str) -> i64 {
        self.resources.get(resource).copied().unwrap_or(0)
    }

    /// Grant experience points, advancing levels while thresholds are met
    ///
    /// Points spent on a level-up are subtracted, carrying the remainder
    /// into the next level.
    pub fn grant_experience(&mut self, points: i64) {
        if points <= 0 {
            return;
        }
        self.exp_points += points;

        while let Some(&needed) = self
            .level_thresholds
            .get((self.exp_level - 1).max(0) as usize)
        {
            if self.exp_points < needed {
                break;
            }
            self.exp_points -= needed;
            self.exp_level += 1;
            tracing::info!(level = self.exp_level, "player levelled up");
        }
    }

    /// Add to a resource balance.
    pub fn deposit(&mut self, resource: &str, amount: i64) {
        *self.resources.entry(resource.to_owned()).or_insert(0) += amount;
    }

    /// Subtract from a resource balance
    ///
    /// A spend is always applied, even when it drives the balance negative;
    /// an anomaly in the books is not worth crashing the simulation over,
    /// so it is logged and carried.
    pub fn spend(&mut self, resource: &str, amount: i64) {
        let balance = self.resources.entry(resource.to_owned()).or_insert(0);
        *balance -= amount;
        if *balance < 0 {
            tracing::warn!(resource, balance = *balance, "resource balance went negative");
        }
    }

    pub fn grant_gems(&mut self, amount: i64) {
        self.gems += amount;
    }
}
