use std::collections::BTreeMap;

use super::types::{ForecastHistory, ForecastOutcome, ForecastSummary, Money};

/// Reduces a finished history to headline figures without re-running anything.
pub fn summarize(history: &ForecastHistory, outcome: &ForecastOutcome) -> ForecastSummary {
    let total_months = history.len() as u32;
    let mut total_interest_paid = Money::ZERO;
    let mut total_paid = Money::ZERO;
    let mut interest_by_bucket: BTreeMap<String, Money> = BTreeMap::new();
    let mut interest_by_debt: BTreeMap<String, Money> = BTreeMap::new();
    let mut payoff_month_by_debt: BTreeMap<String, u32> = BTreeMap::new();

    for month in history.months() {
        for debt in &month.debts {
            total_interest_paid += debt.interest_charged;
            total_paid += debt.total_payment();
            *interest_by_debt.entry(debt.debt_id.clone()).or_default() += debt.interest_charged;
            if debt.is_paid_off {
                payoff_month_by_debt
                    .entry(debt.debt_id.clone())
                    .or_insert(month.month);
            }
            for bucket in &debt.buckets {
                *interest_by_bucket.entry(bucket.bucket_id.clone()).or_default() +=
                    bucket.interest_charged;
            }
        }
    }

    let debt_free_month = match outcome {
        ForecastOutcome::DebtFree => Some(total_months),
        _ => None,
    };

    ForecastSummary {
        total_months,
        debt_free_month,
        total_interest_paid,
        total_paid,
        interest_by_bucket,
        interest_by_debt,
        payoff_month_by_debt,
    }
}
