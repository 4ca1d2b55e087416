mod allocation;
mod engine;
mod error;
mod interest;
mod scheduler;
mod summary;
mod types;
mod validate;

pub use allocation::{
    AllocationPolicy, BucketState, InterestFirstWaterfall, ProportionalByBalance, SplitContext,
    allocate_debt_month,
};
pub use engine::{compare_extra, simulate, simulate_with_policy};
pub use error::ConfigError;
pub use interest::{monthly_interest, round2};
pub use summary::summarize;
pub use types::{
    AllocationRule, Bucket, DEFAULT_MAX_MONTHS, DEFAULT_PRINCIPAL_CAP_RATE, DEFAULT_STALL_MONTHS,
    Debt, Forecast, ForecastHistory, ForecastOutcome, ForecastSummary, Money, MonthBucketResult,
    MonthDebtResult, MonthResult, PAID_OFF_THRESHOLD, PlanOptions, ScenarioComparison, Snowflake,
    Strategy,
};
pub use validate::{NormalizedDebt, normalize};
