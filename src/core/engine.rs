use rust_decimal_macros::dec;
use tracing::{debug, info, warn};

use super::allocation::{
    AllocationPolicy, PaymentKind, allocate_minimum, apply_to_priority_bucket, has_outstanding,
    idle_rows,
};
use super::error::ConfigError;
use super::scheduler::{DebtState, SnowballScheduler};
use super::summary::summarize;
use super::types::{
    Debt, Forecast, ForecastHistory, ForecastOutcome, MonthBucketResult, MonthDebtResult,
    MAX_AMOUNT, MonthResult, Money, PlanOptions, ScenarioComparison,
};
use super::validate::{normalize, validate_options};

/// Projects a payoff schedule using the allocation rule named in `options`.
///
/// The caller's debts are only borrowed; every run works on its own copy,
/// so concurrent or repeated calls never see each other's state.
pub fn simulate(debts: &[Debt], options: &PlanOptions) -> Result<Forecast, ConfigError> {
    let policy = options.allocation.policy(options.principal_cap_rate);
    simulate_with_policy(debts, options, policy.as_ref())
}

/// Same as [`simulate`] with an explicit minimum-payment allocation rule.
pub fn simulate_with_policy(
    debts: &[Debt],
    options: &PlanOptions,
    policy: &dyn AllocationPolicy,
) -> Result<Forecast, ConfigError> {
    let normalized = normalize(debts)?;
    validate_options(options, &normalized)?;

    let mut states: Vec<DebtState> = normalized.iter().map(|d| d.to_state()).collect();
    let mut scheduler = SnowballScheduler::new(options.strategy);
    let mut stall = StallTracker::new(&states, options.stall_months);
    let mut months = Vec::new();
    let mut outcome = ForecastOutcome::MonthCapReached {
        max_months: options.max_months,
    };

    if all_paid_off(&states) {
        outcome = ForecastOutcome::DebtFree;
    } else {
        for month in 1..=options.max_months {
            months.push(run_month(month, &mut states, &mut scheduler, options, policy));

            if all_paid_off(&states) {
                outcome = ForecastOutcome::DebtFree;
                break;
            }
            let snowflakes_pending = options.snowflakes.iter().any(|f| f.month > month);
            if let Some(stalled) = stall.observe(month, &states, snowflakes_pending) {
                outcome = stalled;
                break;
            }
        }
    }

    let history = ForecastHistory::new(months);
    let summary = summarize(&history, &outcome);
    match &outcome {
        ForecastOutcome::DebtFree => info!(
            months = summary.total_months,
            interest = %summary.total_interest_paid,
            policy = policy.name(),
            "forecast reached debt free"
        ),
        ForecastOutcome::Stalled {
            since_month,
            debt_ids,
        } => warn!(
            since_month,
            debts = ?debt_ids,
            "forecast stalled: payments no longer reduce the outstanding balance"
        ),
        ForecastOutcome::MonthCapReached { max_months } => warn!(
            max_months,
            remaining = %history.last().map(|m| m.total_balance).unwrap_or_default(),
            "forecast hit the month cap before clearing every debt"
        ),
    }

    Ok(Forecast {
        outcome,
        summary,
        history,
    })
}

/// Runs the plan as given and again with `additional` on top of the extra
/// payment, then reports what the larger payment saves.
pub fn compare_extra(
    debts: &[Debt],
    options: &PlanOptions,
    additional: Money,
) -> Result<ScenarioComparison, ConfigError> {
    if additional < Money::ZERO {
        return Err(ConfigError::NegativeValue {
            owner: "comparison".to_string(),
            field: "additional payment",
        });
    }
    let within_range = additional
        .checked_add(options.extra_payment)
        .is_some_and(|total| total <= MAX_AMOUNT);
    if !within_range {
        return Err(ConfigError::OutOfRange {
            owner: "comparison".to_string(),
            field: "extra payment",
            limit: MAX_AMOUNT,
        });
    }

    let accelerated_options = PlanOptions {
        extra_payment: options.extra_payment + additional,
        ..options.clone()
    };
    let baseline = simulate(debts, options)?;
    let accelerated = simulate(debts, &accelerated_options)?;

    let both_debt_free = baseline.outcome == ForecastOutcome::DebtFree
        && accelerated.outcome == ForecastOutcome::DebtFree;
    let (months_saved, interest_saved) = if both_debt_free {
        (
            Some(
                i64::from(baseline.summary.total_months)
                    - i64::from(accelerated.summary.total_months),
            ),
            Some(baseline.summary.total_interest_paid - accelerated.summary.total_interest_paid),
        )
    } else {
        (None, None)
    };

    Ok(ScenarioComparison {
        additional_payment: additional,
        baseline_outcome: baseline.outcome,
        accelerated_outcome: accelerated.outcome,
        baseline: baseline.summary,
        accelerated: accelerated.summary,
        months_saved,
        interest_saved,
    })
}

fn all_paid_off(states: &[DebtState]) -> bool {
    states.iter().all(DebtState::is_paid_off)
}

fn total_balance(states: &[DebtState]) -> Money {
    states.iter().map(DebtState::balance).sum()
}

fn run_month(
    month: u32,
    states: &mut [DebtState],
    scheduler: &mut SnowballScheduler,
    options: &PlanOptions,
    policy: &dyn AllocationPolicy,
) -> MonthResult {
    let order = scheduler.order(states);
    let focus = order.first().copied();
    let was_unpaid: Vec<bool> = states.iter().map(|d| !d.is_paid_off()).collect();

    let mut unallocated = Money::ZERO;
    let mut rows: Vec<Vec<MonthBucketResult>> = Vec::with_capacity(states.len());
    for (idx, debt) in states.iter().enumerate() {
        if !was_unpaid[idx] {
            rows.push(idle_rows(&debt.buckets));
            continue;
        }
        let pass = allocate_minimum(&debt.buckets, debt.min_payment, focus == Some(idx), policy);
        unallocated += pass.unspent_minimum;
        rows.push(pass.rows);
    }

    let mut extra_budget = scheduler.extra_budget(options.extra_payment);
    for flake in options.snowflakes.iter().filter(|f| f.month == month) {
        let applied = match &flake.debt_id {
            None => Money::ZERO,
            Some(debt_id) => states
                .iter()
                .position(|d| &d.id == debt_id)
                .map(|idx| {
                    apply_to_priority_bucket(
                        &mut rows[idx],
                        &states[idx].buckets,
                        flake.amount,
                        PaymentKind::Snowflake,
                    )
                })
                .unwrap_or(Money::ZERO),
        };
        extra_budget += flake.amount - applied;
    }

    let target = order.iter().copied().find(|&idx| has_outstanding(&rows[idx]));
    let mut remaining = extra_budget;
    if let Some(idx) = target {
        remaining -= apply_to_priority_bucket(
            &mut rows[idx],
            &states[idx].buckets,
            remaining,
            PaymentKind::Snowball,
        );
    }
    unallocated += remaining;

    let mut debts = Vec::with_capacity(states.len());
    for ((idx, debt), debt_rows) in states.iter_mut().enumerate().zip(rows) {
        for (bucket, row) in debt.buckets.iter_mut().zip(&debt_rows) {
            debug_assert!(
                row.total_payment() <= row.starting_balance + row.interest_charged,
                "bucket {} overpaid in month {month}",
                row.bucket_id
            );
            bucket.balance = row.ending_balance;
        }
        if was_unpaid[idx] && debt.is_paid_off() {
            debug!(month, debt = %debt.id, freed = %debt.min_payment, "debt cleared");
            scheduler.release(debt.min_payment);
        }
        debts.push(MonthDebtResult::from_buckets(debt.id.clone(), debt_rows));
    }

    let snowball_target = target.map(|idx| states[idx].id.clone());
    debug!(
        month,
        target = ?snowball_target,
        extra = %extra_budget,
        unallocated = %unallocated,
        "month simulated"
    );

    MonthResult {
        month,
        debts,
        snowball_target,
        extra_budget,
        unallocated,
        total_balance: total_balance(states),
    }
}

/// Past this total a growing balance is stopped before decimal arithmetic
/// can overflow. Inputs are capped at `MAX_AMOUNT`, far below it.
const RUNAWAY_BALANCE: Money = dec!(1000000000000000000);

/// Watches the total outstanding balance for runs that stop making progress.
struct StallTracker {
    window: u32,
    best_total: Money,
    best_month: u32,
    best_balances: Vec<Money>,
}

impl StallTracker {
    fn new(states: &[DebtState], window: u32) -> Self {
        Self {
            window,
            best_total: total_balance(states),
            best_month: 0,
            best_balances: states.iter().map(DebtState::balance).collect(),
        }
    }

    /// A scheduled snowflake may still bring the balance down, so the window
    /// alone never ends the run while one is pending. A balance past
    /// `RUNAWAY_BALANCE` ends it regardless.
    fn observe(
        &mut self,
        month: u32,
        states: &[DebtState],
        snowflakes_pending: bool,
    ) -> Option<ForecastOutcome> {
        let total = total_balance(states);
        if total < self.best_total {
            self.best_total = total;
            self.best_month = month;
            self.best_balances = states.iter().map(DebtState::balance).collect();
            return None;
        }
        let window_elapsed = month - self.best_month >= self.window;
        if total <= RUNAWAY_BALANCE && (!window_elapsed || snowflakes_pending) {
            return None;
        }

        let debt_ids = states
            .iter()
            .zip(&self.best_balances)
            .filter(|(debt, best)| !debt.is_paid_off() && debt.balance() >= **best)
            .map(|(debt, _)| debt.id.clone())
            .collect();
        Some(ForecastOutcome::Stalled {
            since_month: self.best_month + 1,
            debt_ids,
        })
    }
}
