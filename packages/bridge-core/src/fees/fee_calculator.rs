use ethers::types::U256;
use serde::Serialize;

use crate::models::model::{FeeData, Gas, Token};

impl Gas {
    pub fn gas_limit(&self) -> U256 {
        match *self {
            Gas::Eip1559 { gas_limit, .. } | Gas::Legacy { gas_limit, .. } => gas_limit,
        }
    }

    /// Fee paid in the native asset: gas limit × (max fee per gas | gas price).
    pub fn fee(&self) -> U256 {
        match *self {
            Gas::Eip1559 {
                gas_limit,
                max_fee_per_gas,
            } => gas_limit.saturating_mul(max_fee_per_gas),
            Gas::Legacy {
                gas_limit,
                gas_price,
            } => gas_limit.saturating_mul(gas_price),
        }
    }
}

/// Pads an estimated gas limit by `buffer_percent`.
pub fn with_gas_buffer(estimate: U256, buffer_percent: u64) -> U256 {
    estimate.saturating_mul(U256::from(100 + buffer_percent)) / U256::from(100)
}

/// Chooses the fee-market shape from what the chain reports: EIP-1559 when a
/// max fee per gas is present, legacy otherwise.
pub fn gas_from_fee_data(gas_limit: U256, fee_data: &FeeData) -> Option<Gas> {
    match (fee_data.max_fee_per_gas, fee_data.gas_price) {
        (Some(max_fee_per_gas), _) => Some(Gas::Eip1559 {
            gas_limit,
            max_fee_per_gas,
        }),
        (None, Some(gas_price)) => Some(Gas::Legacy {
            gas_limit,
            gas_price,
        }),
        (None, None) => None,
    }
}

/// How much of a requested native-asset amount can actually be submitted
/// once the fee is reserved from the same balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum MaxTransferable {
    /// Amount plus fee fit in the balance.
    Sufficient { amount: U256 },
    /// The whole balance was requested; the fee is deducted from it.
    ReducedByFee { amount: U256 },
    /// The fee takes the entire balance.
    ConsumedByFee,
    /// Balance does not cover amount plus fee.
    InsufficientBalance { shortfall: U256 },
}

impl MaxTransferable {
    pub fn is_fee_insufficient(&self) -> bool {
        !matches!(self, Self::Sufficient { .. })
    }

    pub fn amount(&self) -> Option<U256> {
        match *self {
            Self::Sufficient { amount } | Self::ReducedByFee { amount } => Some(amount),
            Self::ConsumedByFee | Self::InsufficientBalance { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&'static str> {
        match self {
            Self::Sufficient { .. } => None,
            Self::ReducedByFee { .. } => {
                Some("The amount has been reduced to cover the transaction fee")
            }
            Self::ConsumedByFee => Some("The entire balance is needed to pay the transaction fee"),
            Self::InsufficientBalance { .. } => {
                Some("Insufficient balance to cover the amount and the transaction fee")
            }
        }
    }
}

/// Fee-aware maximum for a deposit of `amount` given `balance` and `fee`.
///
/// For ERC-20 tokens the fee is paid in the native asset, so only the plain
/// balance check applies.
pub fn max_transferable_amount(
    token: &Token,
    balance: U256,
    amount: U256,
    fee: U256,
) -> MaxTransferable {
    if !token.is_native() {
        return if amount <= balance {
            MaxTransferable::Sufficient { amount }
        } else {
            MaxTransferable::InsufficientBalance {
                shortfall: amount - balance,
            }
        };
    }

    let required = amount.saturating_add(fee);
    if required <= balance {
        return MaxTransferable::Sufficient { amount };
    }

    if amount >= balance {
        // A - (A + F - B) collapses to B - F here.
        if balance > fee {
            MaxTransferable::ReducedByFee {
                amount: balance - fee,
            }
        } else if balance == fee {
            MaxTransferable::ConsumedByFee
        } else {
            MaxTransferable::InsufficientBalance {
                shortfall: fee - balance,
            }
        }
    } else {
        MaxTransferable::InsufficientBalance {
            shortfall: required - balance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{eth_token, usdc};

    fn u(n: u64) -> U256 {
        U256::from(n)
    }

    #[test]
    fn test_fee_for_both_markets() {
        let legacy = Gas::Legacy {
            gas_limit: u(21_000),
            gas_price: u(10),
        };
        let eip1559 = Gas::Eip1559 {
            gas_limit: u(21_000),
            max_fee_per_gas: u(30),
        };

        assert_eq!(legacy.fee(), u(210_000));
        assert_eq!(eip1559.fee(), u(630_000));
        assert_eq!(eip1559.gas_limit(), u(21_000));
    }

    #[test]
    fn test_gas_from_fee_data_prefers_eip1559() {
        let both = FeeData {
            gas_price: Some(u(5)),
            max_fee_per_gas: Some(u(7)),
            max_priority_fee_per_gas: Some(u(1)),
        };
        let legacy_only = FeeData {
            gas_price: Some(u(5)),
            ..Default::default()
        };

        assert_eq!(
            gas_from_fee_data(u(100), &both),
            Some(Gas::Eip1559 {
                gas_limit: u(100),
                max_fee_per_gas: u(7)
            })
        );
        assert_eq!(
            gas_from_fee_data(u(100), &legacy_only),
            Some(Gas::Legacy {
                gas_limit: u(100),
                gas_price: u(5)
            })
        );
        assert_eq!(gas_from_fee_data(u(100), &FeeData::default()), None);
    }

    #[test]
    fn test_gas_buffer() {
        assert_eq!(with_gas_buffer(u(100_000), 20), u(120_000));
        assert_eq!(with_gas_buffer(u(100_000), 0), u(100_000));
    }

    #[test]
    fn test_whole_balance_is_reduced_by_fee() {
        let result = max_transferable_amount(&eth_token(), u(100), u(100), u(5));

        assert_eq!(result, MaxTransferable::ReducedByFee { amount: u(95) });
        assert!(result.is_fee_insufficient());
        assert_eq!(result.amount(), Some(u(95)));
    }

    #[test]
    fn test_amount_plus_fee_exactly_balance() {
        let result = max_transferable_amount(&eth_token(), u(100), u(95), u(5));

        assert_eq!(result, MaxTransferable::Sufficient { amount: u(95) });
        assert!(!result.is_fee_insufficient());
        assert!(result.message().is_none());
    }

    #[test]
    fn test_amount_plus_fee_exceeds_balance() {
        let result = max_transferable_amount(&eth_token(), u(100), u(95), u(10));

        assert_eq!(result, MaxTransferable::InsufficientBalance { shortfall: u(5) });
        assert!(result.is_fee_insufficient());
        assert_eq!(result.amount(), None);
    }

    #[test]
    fn test_fee_consumes_entire_balance() {
        let result = max_transferable_amount(&eth_token(), u(5), u(5), u(5));

        assert_eq!(result, MaxTransferable::ConsumedByFee);
        assert_ne!(
            result.message(),
            MaxTransferable::InsufficientBalance { shortfall: u(1) }.message()
        );
    }

    #[test]
    fn test_fee_exceeds_balance() {
        let result = max_transferable_amount(&eth_token(), u(3), u(3), u(5));
        assert_eq!(result, MaxTransferable::InsufficientBalance { shortfall: u(2) });
    }

    #[test]
    fn test_erc20_ignores_native_fee() {
        assert_eq!(
            max_transferable_amount(&usdc(), u(100), u(100), u(5)),
            MaxTransferable::Sufficient { amount: u(100) }
        );
        assert_eq!(
            max_transferable_amount(&usdc(), u(100), u(120), u(5)),
            MaxTransferable::InsufficientBalance { shortfall: u(20) }
        );
    }
}
