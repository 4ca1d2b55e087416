use thiserror::Error;

use super::types::Money;

/// Input rejected before the first simulated month.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("debt `{debt_id}` declares buckets but the bucket list is empty")]
    EmptyBuckets { debt_id: String },

    #[error("buckets of debt `{debt_id}` sum to {actual}, expected {expected}")]
    BucketSumMismatch {
        debt_id: String,
        expected: Money,
        actual: Money,
    },

    #[error("{owner} has a negative {field}")]
    NegativeValue { owner: String, field: &'static str },

    #[error("{owner} has a {field} above {limit}")]
    OutOfRange {
        owner: String,
        field: &'static str,
        limit: Money,
    },

    #[error("duplicate {kind} id `{id}`")]
    DuplicateId { kind: &'static str, id: String },

    #[error("snowflake for month {month} targets unknown debt `{debt_id}`")]
    UnknownSnowflakeDebt { month: u32, debt_id: String },

    #[error("snowflake for month {month} is invalid: {reason}")]
    InvalidSnowflake { month: u32, reason: &'static str },

    #[error("max months must be greater than zero")]
    InvalidMonthCap,

    #[error("stall window must be greater than zero")]
    InvalidStallWindow,
}
