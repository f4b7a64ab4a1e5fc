//! Bet recording — stake and return for each roulette outcome.
//!
//! Straight-up numbers pay 35:1, so a hit returns 36 chips (winnings plus the
//! chip itself). The zero side bet pays the same way.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::MAX_AMOUNT;
use crate::types::{BancaError, NewBet, OutcomeKind, Result};

/// Chips returned by a winning straight-up bet.
pub const STRAIGHT_UP_RETURN: Decimal = dec!(36);

/// Form input for one bet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetInput {
    pub outcome: OutcomeKind,
    #[serde(default)]
    pub chip_value: Decimal,
    #[serde(default)]
    pub numbers_covered: u32,
    #[serde(default)]
    pub zero_stake: Decimal,
}

/// Staked and returned amounts for a validated input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetAmounts {
    pub staked: Decimal,
    pub returned: Decimal,
}

impl BetInput {
    /// Validate and price the bet.
    pub fn amounts(&self) -> Result<BetAmounts> {
        if self.chip_value < Decimal::ZERO || self.zero_stake < Decimal::ZERO {
            return Err(BancaError::validation("Os valores não podem ser negativos."));
        }
        if self.chip_value > MAX_AMOUNT || self.zero_stake > MAX_AMOUNT {
            return Err(BancaError::validation("Valor acima do limite permitido."));
        }

        let numbers_stake = self.chip_value * Decimal::from(self.numbers_covered);

        let amounts = match self.outcome {
            OutcomeKind::WinOnNumber => {
                if self.chip_value <= Decimal::ZERO || self.numbers_covered == 0 {
                    return Err(BancaError::validation(
                        "Informe o valor da ficha e a quantidade de números.",
                    ));
                }
                BetAmounts {
                    staked: numbers_stake + self.zero_stake,
                    returned: self.chip_value * STRAIGHT_UP_RETURN,
                }
            }
            OutcomeKind::WinOnZero => BetAmounts {
                staked: self.zero_stake,
                returned: self.zero_stake * STRAIGHT_UP_RETURN,
            },
            OutcomeKind::Loss => BetAmounts {
                staked: numbers_stake + self.zero_stake,
                returned: Decimal::ZERO,
            },
        };

        if amounts.staked <= Decimal::ZERO {
            return Err(BancaError::validation("Valor apostado inválido."));
        }
        Ok(amounts)
    }

    /// Build the record to persist for `bankroll_id`.
    pub fn to_new_bet(&self, bankroll_id: &str, timestamp: DateTime<Utc>) -> Result<NewBet> {
        let amounts = self.amounts()?;
        Ok(NewBet {
            bankroll_id: bankroll_id.to_string(),
            amount_staked: amounts.staked,
            amount_returned: amounts.returned,
            outcome: self.outcome,
            timestamp,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn input(outcome: OutcomeKind, chip: Decimal, numbers: u32, zero: Decimal) -> BetInput {
        BetInput {
            outcome,
            chip_value: chip,
            numbers_covered: numbers,
            zero_stake: zero,
        }
    }

    #[test]
    fn test_win_on_number() {
        let a = input(OutcomeKind::WinOnNumber, dec!(1), 10, dec!(5)).amounts().unwrap();
        assert_eq!(a.staked, dec!(15));
        assert_eq!(a.returned, dec!(36));
    }

    #[test]
    fn test_loss_same_inputs() {
        let a = input(OutcomeKind::Loss, dec!(1), 10, dec!(5)).amounts().unwrap();
        assert_eq!(a.staked, dec!(15));
        assert_eq!(a.returned, Decimal::ZERO);
    }

    #[test]
    fn test_win_on_zero() {
        let a = input(OutcomeKind::WinOnZero, dec!(1), 10, dec!(5)).amounts().unwrap();
        assert_eq!(a.staked, dec!(5));
        assert_eq!(a.returned, dec!(180));
    }

    #[test]
    fn test_win_on_number_requires_chip() {
        let err = input(OutcomeKind::WinOnNumber, Decimal::ZERO, 10, dec!(5))
            .amounts()
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_win_on_number_requires_numbers() {
        let err = input(OutcomeKind::WinOnNumber, dec!(2), 0, dec!(5)).amounts().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_win_on_zero_without_zero_stake_fails() {
        let err = input(OutcomeKind::WinOnZero, dec!(1), 10, Decimal::ZERO)
            .amounts()
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_loss_with_nothing_staked_fails() {
        let err = input(OutcomeKind::Loss, Decimal::ZERO, 0, Decimal::ZERO)
            .amounts()
            .unwrap_err();
        assert_eq!(err.to_string(), "Valor apostado inválido.");
    }

    #[test]
    fn test_negative_values_rejected() {
        assert!(input(OutcomeKind::Loss, dec!(-1), 3, dec!(5)).amounts().is_err());
        assert!(input(OutcomeKind::WinOnZero, dec!(1), 3, dec!(-5)).amounts().is_err());
    }

    #[test]
    fn test_amounts_above_limit_rejected() {
        let err = input(OutcomeKind::WinOnNumber, Decimal::MAX, 1, Decimal::ZERO)
            .amounts()
            .unwrap_err();
        assert!(err.is_validation());
        assert!(input(OutcomeKind::WinOnZero, dec!(1), 0, MAX_AMOUNT + dec!(1)).amounts().is_err());

        let top = input(OutcomeKind::WinOnNumber, MAX_AMOUNT, u32::MAX, MAX_AMOUNT)
            .amounts()
            .unwrap();
        assert_eq!(top.returned, MAX_AMOUNT * STRAIGHT_UP_RETURN);
    }

    #[test]
    fn test_fractional_chip() {
        let a = input(OutcomeKind::WinOnNumber, dec!(0.5), 12, dec!(1)).amounts().unwrap();
        assert_eq!(a.staked, dec!(7));
        assert_eq!(a.returned, dec!(18));
    }

    #[test]
    fn test_to_new_bet() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 10, 14, 30, 0).unwrap();
        let bet = input(OutcomeKind::Loss, dec!(2), 5, Decimal::ZERO)
            .to_new_bet("b1", ts)
            .unwrap();
        assert_eq!(bet.bankroll_id, "b1");
        assert_eq!(bet.amount_staked, dec!(10));
        assert_eq!(bet.outcome, OutcomeKind::Loss);
        assert_eq!(bet.timestamp, ts);
    }

    #[test]
    fn test_input_deserializes_with_defaults() {
        let parsed: BetInput =
            serde_json::from_str(r#"{"outcome":"win_on_zero","zero_stake":2}"#).unwrap();
        assert_eq!(parsed.chip_value, Decimal::ZERO);
        assert_eq!(parsed.numbers_covered, 0);
        assert_eq!(parsed.amounts().unwrap().returned, dec!(72));
    }
}
