use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

pub type Money = Decimal;

/// Balances at or below this are treated as cleared.
pub const PAID_OFF_THRESHOLD: Money = dec!(0.01);

pub const DEFAULT_MAX_MONTHS: u32 = 600;
pub const DEFAULT_STALL_MONTHS: u32 = 12;
pub const DEFAULT_PRINCIPAL_CAP_RATE: Money = dec!(0.05);

/// Largest amount accepted for any balance or payment input.
pub const MAX_AMOUNT: Money = dec!(1000000000000);
/// Largest APR accepted, in percent.
pub const MAX_APR: Money = dec!(1000);

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Snowball,
    Avalanche,
    Custom,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllocationRule {
    #[default]
    InterestFirst,
    Proportional,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub balance: Money,
    pub apr: Money,
    #[serde(default)]
    pub payment_priority: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Debt {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub balance: Money,
    #[serde(default)]
    pub apr: Money,
    pub min_payment: Money,
    #[serde(default)]
    pub order_index: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buckets: Option<Vec<Bucket>>,
}

/// One-off payment for a single month. Without a `debt_id` it tops up that
/// month's extra budget; with one it goes straight to the named debt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snowflake {
    pub month: u32,
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debt_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanOptions {
    pub strategy: Strategy,
    pub extra_payment: Money,
    pub snowflakes: Vec<Snowflake>,
    pub max_months: u32,
    pub stall_months: u32,
    pub allocation: AllocationRule,
    pub principal_cap_rate: Money,
}

impl PlanOptions {
    pub fn new(strategy: Strategy, extra_payment: Money) -> Self {
        Self {
            strategy,
            extra_payment,
            ..Self::default()
        }
    }
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::Snowball,
            extra_payment: Money::ZERO,
            snowflakes: Vec::new(),
            max_months: DEFAULT_MAX_MONTHS,
            stall_months: DEFAULT_STALL_MONTHS,
            allocation: AllocationRule::InterestFirst,
            principal_cap_rate: DEFAULT_PRINCIPAL_CAP_RATE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthBucketResult {
    pub bucket_id: String,
    pub starting_balance: Money,
    pub interest_charged: Money,
    pub minimum_payment: Money,
    pub snowball_payment: Money,
    pub snowflake_payment: Money,
    pub ending_balance: Money,
    pub is_paid_off: bool,
}

impl MonthBucketResult {
    pub fn total_payment(&self) -> Money {
        self.minimum_payment + self.snowball_payment + self.snowflake_payment
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthDebtResult {
    pub debt_id: String,
    pub starting_balance: Money,
    pub interest_charged: Money,
    pub minimum_payment: Money,
    pub snowball_payment: Money,
    pub snowflake_payment: Money,
    pub ending_balance: Money,
    pub is_paid_off: bool,
    pub buckets: Vec<MonthBucketResult>,
}

impl MonthDebtResult {
    pub fn from_buckets(debt_id: String, buckets: Vec<MonthBucketResult>) -> Self {
        let sum = |field: fn(&MonthBucketResult) -> Money| -> Money {
            buckets.iter().map(field).sum()
        };
        Self {
            debt_id,
            starting_balance: sum(|b| b.starting_balance),
            interest_charged: sum(|b| b.interest_charged),
            minimum_payment: sum(|b| b.minimum_payment),
            snowball_payment: sum(|b| b.snowball_payment),
            snowflake_payment: sum(|b| b.snowflake_payment),
            ending_balance: sum(|b| b.ending_balance),
            is_paid_off: buckets.iter().all(|b| b.is_paid_off),
            buckets,
        }
    }

    pub fn total_payment(&self) -> Money {
        self.minimum_payment + self.snowball_payment + self.snowflake_payment
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthResult {
    pub month: u32,
    pub debts: Vec<MonthDebtResult>,
    pub snowball_target: Option<String>,
    pub extra_budget: Money,
    pub unallocated: Money,
    pub total_balance: Money,
}

impl MonthResult {
    pub fn debt(&self, debt_id: &str) -> Option<&MonthDebtResult> {
        self.debts.iter().find(|d| d.debt_id == debt_id)
    }
}

/// Month-by-month record of one run. Month `n` lives at index `n - 1`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct ForecastHistory {
    months: Vec<MonthResult>,
}

impl ForecastHistory {
    pub(crate) fn new(months: Vec<MonthResult>) -> Self {
        Self { months }
    }

    pub fn months(&self) -> &[MonthResult] {
        &self.months
    }

    pub fn month(&self, month: u32) -> Option<&MonthResult> {
        let index = usize::try_from(month).ok()?.checked_sub(1)?;
        self.months.get(index)
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub fn last(&self) -> Option<&MonthResult> {
        self.months.last()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ForecastOutcome {
    DebtFree,
    #[serde(rename_all = "camelCase")]
    Stalled {
        since_month: u32,
        debt_ids: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    MonthCapReached { max_months: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastSummary {
    pub total_months: u32,
    pub debt_free_month: Option<u32>,
    pub total_interest_paid: Money,
    pub total_paid: Money,
    pub interest_by_bucket: BTreeMap<String, Money>,
    pub interest_by_debt: BTreeMap<String, Money>,
    pub payoff_month_by_debt: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub outcome: ForecastOutcome,
    pub summary: ForecastSummary,
    pub history: ForecastHistory,
}

/// Baseline plan against the same plan with a larger monthly payment.
///
/// `months_saved` and `interest_saved` are only filled in when both runs end
/// debt free; a stalled or capped run has no payoff date to compare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioComparison {
    pub additional_payment: Money,
    pub baseline_outcome: ForecastOutcome,
    pub accelerated_outcome: ForecastOutcome,
    pub baseline: ForecastSummary,
    pub accelerated: ForecastSummary,
    pub months_saved: Option<i64>,
    pub interest_saved: Option<Money>,
}
