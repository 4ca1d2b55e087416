use super::interest::{monthly_interest, round2};
use super::types::{AllocationRule, MonthBucketResult, Money, PAID_OFF_THRESHOLD};

/// Working copy of one bucket for the duration of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketState {
    pub id: String,
    pub apr: Money,
    pub priority: i32,
    pub balance: Money,
}

impl BucketState {
    pub fn is_paid_off(&self) -> bool {
        self.balance <= PAID_OFF_THRESHOLD
    }
}

/// What a policy sees when splitting a debt's minimum payment.
#[derive(Debug, Clone, Copy)]
pub struct SplitContext<'a> {
    pub starting: &'a [Money],
    pub interest: &'a [Money],
    /// Starting balance plus this month's interest.
    pub accrued: &'a [Money],
    /// Bucket indices, lowest payment priority first.
    pub priority_order: &'a [usize],
    /// Bucket expected to receive this month's extra payment, if any.
    pub focus: Option<usize>,
}

/// Rule for spreading a debt's minimum payment across its buckets.
///
/// Implementations return one amount per bucket. The allocator clamps each
/// amount to `0..=accrued[i]`, so a policy can never push a bucket negative.
pub trait AllocationPolicy: Send + Sync {
    fn name(&self) -> &'static str;
    fn split_minimum(&self, ctx: &SplitContext<'_>, budget: Money) -> Vec<Money>;
}

/// Weights the minimum by each bucket's share of the debt's starting balance.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProportionalByBalance;

impl AllocationPolicy for ProportionalByBalance {
    fn name(&self) -> &'static str {
        "proportional"
    }

    fn split_minimum(&self, ctx: &SplitContext<'_>, budget: Money) -> Vec<Money> {
        let debt_starting: Money = ctx.starting.iter().sum();
        if debt_starting <= Money::ZERO {
            return vec![Money::ZERO; ctx.starting.len()];
        }

        ctx.starting
            .iter()
            .zip(ctx.accrued)
            .map(|(&starting, &accrued)| round2(budget * starting / debt_starting).min(accrued))
            .collect()
    }
}

/// Covers interest first, then pays principal down the priority list with a
/// per-bucket cap, leaving the focus bucket to the extra payment.
///
/// Pass 1 pays each bucket's interest. Pass 2 pays principal on every
/// non-focus bucket up to `round2(starting * principal_cap_rate)`. Pass 3
/// spends any residue on all buckets in priority order.
#[derive(Debug, Clone, Copy)]
pub struct InterestFirstWaterfall {
    pub principal_cap_rate: Money,
}

impl AllocationPolicy for InterestFirstWaterfall {
    fn name(&self) -> &'static str {
        "interest-first"
    }

    fn split_minimum(&self, ctx: &SplitContext<'_>, budget: Money) -> Vec<Money> {
        let mut allocated = vec![Money::ZERO; ctx.starting.len()];
        let mut remaining = budget;

        let mut pay = |idx: usize, limit: Money, allocated: &mut [Money]| {
            let room = ctx.accrued[idx] - allocated[idx];
            let take = remaining.min(limit).min(room).max(Money::ZERO);
            allocated[idx] += take;
            remaining -= take;
        };

        for &idx in ctx.priority_order {
            pay(idx, ctx.interest[idx], &mut allocated);
        }

        for &idx in ctx.priority_order {
            if Some(idx) == ctx.focus {
                continue;
            }
            let cap = round2(ctx.starting[idx] * self.principal_cap_rate);
            pay(idx, cap, &mut allocated);
        }

        for &idx in ctx.priority_order {
            pay(idx, ctx.accrued[idx], &mut allocated);
        }

        allocated
    }
}

impl AllocationRule {
    pub fn policy(self, principal_cap_rate: Money) -> Box<dyn AllocationPolicy> {
        match self {
            AllocationRule::InterestFirst => Box::new(InterestFirstWaterfall { principal_cap_rate }),
            AllocationRule::Proportional => Box::new(ProportionalByBalance),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PaymentKind {
    Snowball,
    Snowflake,
}

/// One debt's buckets after interest and minimum payment.
#[derive(Debug, Clone)]
pub struct MinimumPass {
    pub rows: Vec<MonthBucketResult>,
    pub unspent_minimum: Money,
}

pub fn priority_order(buckets: &[BucketState]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..buckets.len()).collect();
    order.sort_by_key(|&idx| (buckets[idx].priority, idx));
    order
}

/// Accrues interest on every bucket and spreads `min_payment` across them.
///
/// With `targeted` set, the lowest-priority bucket still carrying a balance is
/// handed to the policy as the focus bucket.
pub fn allocate_minimum(
    buckets: &[BucketState],
    min_payment: Money,
    targeted: bool,
    policy: &dyn AllocationPolicy,
) -> MinimumPass {
    let starting: Vec<Money> = buckets.iter().map(|b| b.balance).collect();
    let interest: Vec<Money> = buckets
        .iter()
        .map(|b| monthly_interest(b.balance, b.apr))
        .collect();
    let accrued: Vec<Money> = starting.iter().zip(&interest).map(|(s, i)| s + i).collect();
    let order = priority_order(buckets);
    let focus = if targeted {
        order.iter().copied().find(|&idx| !buckets[idx].is_paid_off())
    } else {
        None
    };

    let ctx = SplitContext {
        starting: &starting,
        interest: &interest,
        accrued: &accrued,
        priority_order: &order,
        focus,
    };
    let split = policy.split_minimum(&ctx, min_payment);
    debug_assert_eq!(split.len(), buckets.len(), "{} returned a short split", policy.name());

    let mut spent = Money::ZERO;
    let rows = buckets
        .iter()
        .enumerate()
        .map(|(idx, bucket)| {
            let minimum = split
                .get(idx)
                .copied()
                .unwrap_or(Money::ZERO)
                .min(accrued[idx])
                .max(Money::ZERO);
            spent += minimum;
            let ending = accrued[idx] - minimum;
            MonthBucketResult {
                bucket_id: bucket.id.clone(),
                starting_balance: starting[idx],
                interest_charged: interest[idx],
                minimum_payment: minimum,
                snowball_payment: Money::ZERO,
                snowflake_payment: Money::ZERO,
                ending_balance: ending,
                is_paid_off: ending <= PAID_OFF_THRESHOLD,
            }
        })
        .collect();

    MinimumPass {
        rows,
        unspent_minimum: (min_payment - spent).max(Money::ZERO),
    }
}

/// Row for a debt that was already cleared: balances carry over untouched.
pub fn idle_rows(buckets: &[BucketState]) -> Vec<MonthBucketResult> {
    buckets
        .iter()
        .map(|bucket| MonthBucketResult {
            bucket_id: bucket.id.clone(),
            starting_balance: bucket.balance,
            interest_charged: Money::ZERO,
            minimum_payment: Money::ZERO,
            snowball_payment: Money::ZERO,
            snowflake_payment: Money::ZERO,
            ending_balance: bucket.balance,
            is_paid_off: true,
        })
        .collect()
}

/// Sends `amount` to the single lowest-priority bucket still owing money.
/// Whatever exceeds that bucket's balance is not cascaded; the applied
/// amount is returned so the caller can account for the rest.
pub fn apply_to_priority_bucket(
    rows: &mut [MonthBucketResult],
    buckets: &[BucketState],
    amount: Money,
    kind: PaymentKind,
) -> Money {
    if amount <= Money::ZERO {
        return Money::ZERO;
    }

    let Some(idx) = priority_order(buckets)
        .into_iter()
        .find(|&idx| rows[idx].ending_balance > PAID_OFF_THRESHOLD)
    else {
        return Money::ZERO;
    };

    let row = &mut rows[idx];
    let applied = amount.min(row.ending_balance);
    match kind {
        PaymentKind::Snowball => row.snowball_payment += applied,
        PaymentKind::Snowflake => row.snowflake_payment += applied,
    }
    row.ending_balance -= applied;
    row.is_paid_off = row.ending_balance <= PAID_OFF_THRESHOLD;
    applied
}

pub fn has_outstanding(rows: &[MonthBucketResult]) -> bool {
    rows.iter().any(|row| row.ending_balance > PAID_OFF_THRESHOLD)
}

/// Full month for one debt on its own: interest, minimum split, then the
/// optional extra payment to the priority bucket.
pub fn allocate_debt_month(
    buckets: &[BucketState],
    min_payment: Money,
    extra: Option<Money>,
    policy: &dyn AllocationPolicy,
) -> Vec<MonthBucketResult> {
    let mut pass = allocate_minimum(buckets, min_payment, extra.is_some(), policy);
    if let Some(extra) = extra {
        apply_to_priority_bucket(&mut pass.rows, buckets, extra, PaymentKind::Snowball);
    }
    pass.rows
}
