//! Engine configuration with documented constants
//!
//! All tunable numbers are collected here with explanations of their purpose
//! and how they interact with each other.

/// Number of gem rewards in the obstacle clearing cycle.
pub const GEM_CYCLE_LEN: usize = 20;

/// Gem cost anchors for speeding up an operation
///
/// Costs between anchors are linearly interpolated over the remaining
/// duration, so a 30-minute job lands roughly halfway between the 1-minute
/// and 1-hour anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedUpCosts {
    /// Cost to skip up to one minute of remaining work.
    pub one_minute: i64,
    /// Cost to skip up to one hour.
    pub one_hour: i64,
    /// Cost to skip up to one day.
    pub one_day: i64,
    /// Cost to skip up to one week.
    pub one_week: i64,
}

impl Default for SpeedUpCosts {
    fn default() -> Self {
        Self {
            one_minute: 1,
            one_hour: 20,
            one_day: 260,
            one_week: 1000,
        }
    }
}

/// Configuration for a village engine instance
///
/// The grid dimensions and tick rate are effectively protocol constants;
/// they are kept here rather than hard-coded at call sites so tests can
/// shrink the world when convenient.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Width of the village grid; object X coordinates are clamped to
    /// `0..=village_width`.
    pub village_width: i32,

    /// Height of the village grid; object Y coordinates are clamped to
    /// `0..=village_height`.
    pub village_height: i32,

    /// Number of kind rows the object table provisions up front.
    ///
    /// Kinds beyond this count grow the table on demand; 8 covers the four
    /// live kinds plus their reserved neighbours.
    pub initial_kind_rows: usize,

    /// Fraction of the next level's build cost refunded when a construction
    /// is cancelled, rounded to the nearest whole unit.
    pub cancel_refund_ratio: f64,

    /// Gem reward cycle for obstacle clearing
    ///
    /// Indexed by a per-village counter that wraps at [`GEM_CYCLE_LEN`], so
    /// every villager sees the same reward rhythm regardless of which
    /// obstacles they clear.
    pub obstacle_gem_rewards: [i64; GEM_CYCLE_LEN],

    /// Anchors for the speed-up gem cost interpolation.
    pub speed_up_costs: SpeedUpCosts,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            village_width: 48,
            village_height: 48,
            initial_kind_rows: 8,
            cancel_refund_ratio: 0.5,
            obstacle_gem_rewards: [
                3, 0, 1, 2, 0, 1, 1, 0, 0, 1, 2, 0, 0, 1, 1, 0, 2, 0, 1, 5,
            ],
            speed_up_costs: SpeedUpCosts::default(),
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.village_width <= 0 || self.village_height <= 0 {
            return Err("village dimensions must be positive".into());
        }

        if self.initial_kind_rows == 0 {
            return Err("initial_kind_rows must be at least 1".into());
        }

        if !(0.0..=1.0).contains(&self.cancel_refund_ratio) {
            return Err(format!(
                "cancel_refund_ratio ({}) must be within 0.0..=1.0",
                self.cancel_refund_ratio
            ));
        }

        let costs = &self.speed_up_costs;
        if costs.one_minute > costs.one_hour
            || costs.one_hour > costs.one_day
            || costs.one_day > costs.one_week
        {
            return Err("speed-up cost anchors must be non-decreasing".into());
        }

        Ok(())
    }
}
