use std::cmp::Ordering;

use super::allocation::BucketState;
use super::types::{Money, Strategy};

/// Working copy of one debt for the duration of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct DebtState {
    pub id: String,
    pub min_payment: Money,
    pub order_index: i32,
    pub buckets: Vec<BucketState>,
}

impl DebtState {
    pub fn balance(&self) -> Money {
        self.buckets.iter().map(|b| b.balance).sum()
    }

    pub fn is_paid_off(&self) -> bool {
        self.buckets.iter().all(BucketState::is_paid_off)
    }

    /// Balance-weighted APR across the buckets still carrying a balance.
    pub fn weighted_apr(&self) -> Money {
        let balance = self.balance();
        if balance <= Money::ZERO {
            return Money::ZERO;
        }
        let weighted: Money = self.buckets.iter().map(|b| b.balance * b.apr).sum();
        weighted / balance
    }
}

/// Orders debts each month and owns the pool of freed minimum payments.
#[derive(Debug, Clone)]
pub struct SnowballScheduler {
    strategy: Strategy,
    pool: Money,
}

impl SnowballScheduler {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            pool: Money::ZERO,
        }
    }

    pub fn pool(&self) -> Money {
        self.pool
    }

    /// Indices of unpaid debts in payoff order. Ties fall back to
    /// `order_index`, then to input position.
    pub fn order(&self, debts: &[DebtState]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..debts.len())
            .filter(|&idx| !debts[idx].is_paid_off())
            .collect();
        order.sort_by(|&a, &b| {
            let (left, right) = (&debts[a], &debts[b]);
            let primary = match self.strategy {
                Strategy::Snowball => left.balance().cmp(&right.balance()),
                Strategy::Avalanche => right.weighted_apr().cmp(&left.weighted_apr()),
                Strategy::Custom => Ordering::Equal,
            };
            primary
                .then(left.order_index.cmp(&right.order_index))
                .then(a.cmp(&b))
        });
        order
    }

    /// This month's extra budget: the recurring surplus plus everything freed
    /// by debts cleared in earlier months.
    pub fn extra_budget(&self, extra_payment: Money) -> Money {
        extra_payment + self.pool
    }

    /// Frees a cleared debt's minimum for use from next month onward.
    pub fn release(&mut self, min_payment: Money) {
        self.pool += min_payment;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn debt(id: &str, balance: Money, apr: Money, order_index: i32) -> DebtState {
        DebtState {
            id: id.to_string(),
            min_payment: dec!(25),
            order_index,
            buckets: vec![BucketState {
                id: id.to_string(),
                apr,
                priority: 0,
                balance,
            }],
        }
    }

    fn ids(debts: &[DebtState], order: &[usize]) -> Vec<String> {
        order.iter().map(|&idx| debts[idx].id.clone()).collect()
    }

    fn sample() -> Vec<DebtState> {
        vec![
            debt("card", dec!(1200), dec!(19.9), 2),
            debt("loan", dec!(3000), dec!(7.5), 0),
            debt("store", dec!(450), dec!(29.0), 1),
        ]
    }

    #[test]
    fn snowball_orders_by_smallest_balance() {
        let debts = sample();
        let order = SnowballScheduler::new(Strategy::Snowball).order(&debts);
        assert_eq!(ids(&debts, &order), ["store", "card", "loan"]);
    }

    #[test]
    fn avalanche_orders_by_highest_rate() {
        let debts = sample();
        let order = SnowballScheduler::new(Strategy::Avalanche).order(&debts);
        assert_eq!(ids(&debts, &order), ["store", "card", "loan"]);
    }

    #[test]
    fn custom_follows_order_index() {
        let debts = sample();
        let order = SnowballScheduler::new(Strategy::Custom).order(&debts);
        assert_eq!(ids(&debts, &order), ["loan", "store", "card"]);
    }

    #[test]
    fn ties_break_on_order_index_then_position() {
        let debts = vec![
            debt("late", dec!(500), dec!(10), 5),
            debt("early", dec!(500), dec!(10), 1),
            debt("twin", dec!(500), dec!(10), 1),
        ];
        for strategy in [Strategy::Snowball, Strategy::Avalanche, Strategy::Custom] {
            let order = SnowballScheduler::new(strategy).order(&debts);
            assert_eq!(ids(&debts, &order), ["early", "twin", "late"]);
        }
    }

    #[test]
    fn paid_debts_drop_out_of_the_ordering() {
        let mut debts = sample();
        debts[2].buckets[0].balance = dec!(0.01);
        let order = SnowballScheduler::new(Strategy::Snowball).order(&debts);
        assert_eq!(ids(&debts, &order), ["card", "loan"]);
    }

    #[test]
    fn avalanche_weights_apr_by_bucket_balance() {
        let mut mixed = debt("mixed", dec!(0), dec!(0), 0);
        mixed.buckets = vec![
            BucketState {
                id: "cash".to_string(),
                apr: dec!(30),
                priority: 1,
                balance: dec!(100),
            },
            BucketState {
                id: "transfer".to_string(),
                apr: dec!(0),
                priority: 2,
                balance: dec!(900),
            },
        ];
        assert_eq!(mixed.weighted_apr(), dec!(3));

        let debts = vec![mixed, debt("flat", dec!(1000), dec!(5), 1)];
        let order = SnowballScheduler::new(Strategy::Avalanche).order(&debts);
        assert_eq!(ids(&debts, &order), ["flat", "mixed"]);
    }

    #[test]
    fn released_minimums_accumulate_into_the_extra_budget() {
        let mut scheduler = SnowballScheduler::new(Strategy::Snowball);
        assert_eq!(scheduler.extra_budget(dec!(50)), dec!(50));
        scheduler.release(dec!(25));
        scheduler.release(dec!(40));
        assert_eq!(scheduler.pool(), dec!(65));
        assert_eq!(scheduler.extra_budget(dec!(50)), dec!(115));
    }
}
