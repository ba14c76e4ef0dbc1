//! Quota data produced by the two quota sources.

/// Utilization for one rate-limit window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowUsage {
    pub utilization_pct: f64,
    /// ISO-8601 timestamp as sent by the server. Kept raw so a malformed
    /// value degrades to an empty label instead of dropping the window.
    pub resets_at: Option<String>,
}

/// Paid usage beyond the plan allowance, in dollars.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overage {
    pub enabled: bool,
    pub used_usd: f64,
    pub limit_usd: f64,
}

impl Overage {
    /// Not clamped: the server may report usage above the limit.
    pub fn remaining_usd(&self) -> f64 {
        self.limit_usd - self.used_usd
    }
}

/// Rolling (5h) and weekly windows from the usage endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageQuota {
    pub rolling_window: WindowUsage,
    pub weekly_window: WindowUsage,
    pub overage: Option<Overage>,
}

/// Values scraped from the external reporting tool. Each is optional on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpendReport {
    /// e.g. `$0.09`
    pub today: Option<String>,
    /// e.g. `$0.51 block (28m left)`
    pub block: Option<String>,
    /// e.g. `$0.13/hr`
    pub burn_rate: Option<String>,
}

impl SpendReport {
    pub fn is_empty(&self) -> bool {
        self.today.is_none() && self.block.is_none() && self.burn_rate.is_none()
    }
}

/// Output of whichever quota source is configured.
#[derive(Debug, Clone, PartialEq)]
pub enum QuotaReport {
    Limits(UsageQuota),
    Spend(SpendReport),
}
