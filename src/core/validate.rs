use std::collections::BTreeSet;

use rust_decimal_macros::dec;

use super::allocation::BucketState;
use super::error::ConfigError;
use super::scheduler::DebtState;
use super::types::{Bucket, Debt, MAX_AMOUNT, MAX_APR, Money, PlanOptions};

const BUCKET_SUM_TOLERANCE: Money = dec!(0.01);

/// A debt resolved once into its allocation shape.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedDebt {
    /// No buckets: the debt is its own single bucket.
    Simple(Debt),
    /// The debt with its `buckets` field moved out into the second slot.
    Composite(Debt, Vec<Bucket>),
}

impl NormalizedDebt {
    pub fn debt(&self) -> &Debt {
        match self {
            NormalizedDebt::Simple(debt) | NormalizedDebt::Composite(debt, _) => debt,
        }
    }

    /// Fresh working state, copied field by field from the input.
    pub fn to_state(&self) -> DebtState {
        let buckets = match self {
            NormalizedDebt::Simple(debt) => vec![BucketState {
                id: debt.id.clone(),
                apr: debt.apr,
                priority: 0,
                balance: debt.balance,
            }],
            NormalizedDebt::Composite(_, buckets) => buckets
                .iter()
                .map(|bucket| BucketState {
                    id: bucket.id.clone(),
                    apr: bucket.apr,
                    priority: bucket.payment_priority,
                    balance: bucket.balance,
                })
                .collect(),
        };
        let debt = self.debt();
        DebtState {
            id: debt.id.clone(),
            min_payment: debt.min_payment,
            order_index: debt.order_index,
            buckets,
        }
    }
}

pub fn normalize(debts: &[Debt]) -> Result<Vec<NormalizedDebt>, ConfigError> {
    let mut debt_ids = BTreeSet::new();
    let mut bucket_ids = BTreeSet::new();
    debts
        .iter()
        .map(|debt| normalize_debt(debt, &mut debt_ids, &mut bucket_ids))
        .collect()
}

fn normalize_debt(
    debt: &Debt,
    debt_ids: &mut BTreeSet<String>,
    bucket_ids: &mut BTreeSet<String>,
) -> Result<NormalizedDebt, ConfigError> {
    if !debt_ids.insert(debt.id.clone()) {
        return Err(ConfigError::DuplicateId {
            kind: "debt",
            id: debt.id.clone(),
        });
    }

    let owner = format!("debt `{}`", debt.id);
    in_range(&owner, "balance", debt.balance, MAX_AMOUNT)?;
    in_range(&owner, "apr", debt.apr, MAX_APR)?;
    in_range(&owner, "minimum payment", debt.min_payment, MAX_AMOUNT)?;

    let Some(buckets) = &debt.buckets else {
        claim_bucket_id(bucket_ids, &debt.id)?;
        return Ok(NormalizedDebt::Simple(debt.clone()));
    };

    if buckets.is_empty() {
        return Err(ConfigError::EmptyBuckets {
            debt_id: debt.id.clone(),
        });
    }

    for bucket in buckets {
        claim_bucket_id(bucket_ids, &bucket.id)?;
        let owner = format!("bucket `{}`", bucket.id);
        in_range(&owner, "balance", bucket.balance, MAX_AMOUNT)?;
        in_range(&owner, "apr", bucket.apr, MAX_APR)?;
    }

    let actual: Money = buckets.iter().map(|b| b.balance).sum();
    if (actual - debt.balance).abs() > BUCKET_SUM_TOLERANCE {
        return Err(ConfigError::BucketSumMismatch {
            debt_id: debt.id.clone(),
            expected: debt.balance,
            actual,
        });
    }

    let parent = Debt {
        buckets: None,
        ..debt.clone()
    };
    Ok(NormalizedDebt::Composite(parent, buckets.clone()))
}

fn claim_bucket_id(bucket_ids: &mut BTreeSet<String>, id: &str) -> Result<(), ConfigError> {
    if bucket_ids.insert(id.to_string()) {
        Ok(())
    } else {
        Err(ConfigError::DuplicateId {
            kind: "bucket",
            id: id.to_string(),
        })
    }
}

fn non_negative(owner: &str, field: &'static str, value: Money) -> Result<(), ConfigError> {
    if value < Money::ZERO {
        return Err(ConfigError::NegativeValue {
            owner: owner.to_string(),
            field,
        });
    }
    Ok(())
}

fn in_range(owner: &str, field: &'static str, value: Money, limit: Money) -> Result<(), ConfigError> {
    non_negative(owner, field, value)?;
    if value > limit {
        return Err(ConfigError::OutOfRange {
            owner: owner.to_string(),
            field,
            limit,
        });
    }
    Ok(())
}

pub fn validate_options(options: &PlanOptions, debts: &[NormalizedDebt]) -> Result<(), ConfigError> {
    if options.max_months == 0 {
        return Err(ConfigError::InvalidMonthCap);
    }
    if options.stall_months == 0 {
        return Err(ConfigError::InvalidStallWindow);
    }
    in_range("plan", "extra payment", options.extra_payment, MAX_AMOUNT)?;
    in_range("plan", "principal cap rate", options.principal_cap_rate, Money::ONE)?;

    for flake in &options.snowflakes {
        if flake.month == 0 {
            return Err(ConfigError::InvalidSnowflake {
                month: flake.month,
                reason: "months are numbered from 1",
            });
        }
        if flake.amount < Money::ZERO {
            return Err(ConfigError::InvalidSnowflake {
                month: flake.month,
                reason: "amount is negative",
            });
        }
        if flake.amount > MAX_AMOUNT {
            return Err(ConfigError::InvalidSnowflake {
                month: flake.month,
                reason: "amount is too large",
            });
        }
        if let Some(debt_id) = &flake.debt_id {
            if !debts.iter().any(|d| &d.debt().id == debt_id) {
                return Err(ConfigError::UnknownSnowflakeDebt {
                    month: flake.month,
                    debt_id: debt_id.clone(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Snowflake;

    fn simple(id: &str, balance: Money) -> Debt {
        Debt {
            id: id.to_string(),
            name: id.to_string(),
            balance,
            apr: dec!(19.9),
            min_payment: dec!(25),
            order_index: 0,
            buckets: None,
        }
    }

    fn bucket(id: &str, balance: Money) -> Bucket {
        Bucket {
            id: id.to_string(),
            name: id.to_string(),
            balance,
            apr: dec!(20),
            payment_priority: 1,
        }
    }

    #[test]
    fn simple_debt_becomes_one_bucket_named_after_the_debt() {
        let normalized = normalize(&[simple("card", dec!(300))]).expect("valid debt");
        assert!(matches!(normalized[0], NormalizedDebt::Simple(_)));

        let state = normalized[0].to_state();
        assert_eq!(state.buckets.len(), 1);
        assert_eq!(state.buckets[0].id, "card");
        assert_eq!(state.buckets[0].balance, dec!(300));
        assert_eq!(state.buckets[0].apr, dec!(19.9));
    }

    #[test]
    fn composite_debt_moves_buckets_out_of_the_parent() {
        let mut debt = simple("card", dec!(300));
        debt.buckets = Some(vec![bucket("purchase", dec!(200)), bucket("cash", dec!(100))]);

        let normalized = normalize(&[debt]).expect("valid debt");
        match &normalized[0] {
            NormalizedDebt::Composite(parent, buckets) => {
                assert!(parent.buckets.is_none());
                assert_eq!(buckets.len(), 2);
            }
            other => panic!("expected composite, got {other:?}"),
        }
    }

    #[test]
    fn empty_bucket_list_is_rejected() {
        let mut debt = simple("card", dec!(300));
        debt.buckets = Some(Vec::new());
        assert_eq!(
            normalize(&[debt]),
            Err(ConfigError::EmptyBuckets {
                debt_id: "card".to_string()
            })
        );
    }

    #[test]
    fn bucket_sum_must_match_within_a_penny() {
        let mut debt = simple("card", dec!(300));
        debt.buckets = Some(vec![bucket("purchase", dec!(200)), bucket("cash", dec!(100.01))]);
        assert!(normalize(std::slice::from_ref(&debt)).is_ok());

        debt.buckets = Some(vec![bucket("purchase", dec!(200)), bucket("cash", dec!(100.02))]);
        assert_eq!(
            normalize(&[debt]),
            Err(ConfigError::BucketSumMismatch {
                debt_id: "card".to_string(),
                expected: dec!(300),
                actual: dec!(300.02),
            })
        );
    }

    #[test]
    fn negative_inputs_are_rejected() {
        let mut debt = simple("card", dec!(300));
        debt.min_payment = dec!(-1);
        let err = normalize(&[debt]).expect_err("negative minimum");
        assert_eq!(err.to_string(), "debt `card` has a negative minimum payment");

        let mut debt = simple("card", dec!(300));
        debt.buckets = Some(vec![bucket("purchase", dec!(350)), bucket("cash", dec!(-50))]);
        assert!(matches!(
            normalize(&[debt]),
            Err(ConfigError::NegativeValue { field: "balance", .. })
        ));
    }

    #[test]
    fn amounts_beyond_the_supported_range_are_rejected() {
        let huge: Money = "70000000000000000000000000000".parse().expect("decimal");
        let err = normalize(&[simple("card", huge)]).expect_err("balance too large");
        assert_eq!(
            err,
            ConfigError::OutOfRange {
                owner: "debt `card`".to_string(),
                field: "balance",
                limit: MAX_AMOUNT,
            }
        );

        let mut debt = simple("card", dec!(300));
        debt.apr = dec!(1000.01);
        assert!(matches!(
            normalize(&[debt]),
            Err(ConfigError::OutOfRange { field: "apr", .. })
        ));

        let mut debt = simple("card", MAX_AMOUNT + dec!(1));
        debt.buckets = Some(vec![bucket("purchase", MAX_AMOUNT), bucket("cash", dec!(1))]);
        assert!(matches!(
            normalize(&[debt]),
            Err(ConfigError::OutOfRange { field: "balance", .. })
        ));

        assert!(normalize(&[simple("card", MAX_AMOUNT)]).is_ok());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = normalize(&[simple("card", dec!(1)), simple("card", dec!(2))]).expect_err("dup");
        assert!(matches!(err, ConfigError::DuplicateId { kind: "debt", .. }));

        let mut composite = simple("loan", dec!(10));
        composite.buckets = Some(vec![bucket("card", dec!(10))]);
        let err = normalize(&[simple("card", dec!(1)), composite]).expect_err("dup bucket");
        assert!(matches!(err, ConfigError::DuplicateId { kind: "bucket", .. }));
    }

    #[test]
    fn options_reject_bad_snowflakes_and_caps() {
        let debts = normalize(&[simple("card", dec!(300))]).expect("valid debt");

        let mut options = PlanOptions::default();
        options.snowflakes = vec![Snowflake {
            month: 3,
            amount: dec!(50),
            debt_id: Some("mortgage".to_string()),
        }];
        assert!(matches!(
            validate_options(&options, &debts),
            Err(ConfigError::UnknownSnowflakeDebt { month: 3, .. })
        ));

        options.snowflakes = vec![Snowflake {
            month: 0,
            amount: dec!(50),
            debt_id: None,
        }];
        assert!(matches!(
            validate_options(&options, &debts),
            Err(ConfigError::InvalidSnowflake { month: 0, .. })
        ));

        let options = PlanOptions {
            max_months: 0,
            ..PlanOptions::default()
        };
        assert_eq!(validate_options(&options, &debts), Err(ConfigError::InvalidMonthCap));

        let options = PlanOptions {
            extra_payment: dec!(-5),
            ..PlanOptions::default()
        };
        assert!(validate_options(&options, &debts).is_err());

        let options = PlanOptions {
            principal_cap_rate: dec!(1.5),
            ..PlanOptions::default()
        };
        assert!(matches!(
            validate_options(&options, &debts),
            Err(ConfigError::OutOfRange { field: "principal cap rate", .. })
        ));
    }
}
