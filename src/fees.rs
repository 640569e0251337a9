// SPDX-License-Identifier: AGPL-3.0-or-later

//! Fee and funding calculators.
//!
//! Pure arithmetic over engine-reported quotes; no I/O. Amounts are integer
//! smallest-unit values. A zero amount is rejected outright — there is no
//! meaningful fee for an amount of nothing.

use crate::engine::{Direction, Offer, TakerFeeSchedule, COIN};
use crate::error::CoreError;

/// Taker fee for a trade amount under the given schedule:
/// `max(amount * fee_per_coin / COIN, min_fee)`.
pub fn required_taker_fee(amount: u64, schedule: TakerFeeSchedule) -> Result<u64, CoreError> {
    if amount == 0 {
        return Err(CoreError::validation(
            "Cannot compute a taker fee for a zero amount",
        ));
    }
    let scaled = u128::from(amount) * u128::from(schedule.fee_per_coin) / u128::from(COIN);
    let scaled = u64::try_from(scaled).map_err(|_| amount_overflow())?;
    Ok(scaled.max(schedule.min_fee))
}

fn amount_overflow() -> CoreError {
    CoreError::AmountTooHigh("Amount is too large for the funds calculation".to_string())
}

/// Whether the fee-token balance covers the taker fee when paid in the fee
/// token. A zero amount always reports false.
pub fn fee_token_covers_taker_fee(
    amount: u64,
    token_schedule: TakerFeeSchedule,
    token_balance: u64,
) -> bool {
    match required_taker_fee(amount, token_schedule) {
        Ok(fee) => token_balance >= fee,
        Err(_) => false,
    }
}

/// Decide the taker-fee currency: base coin when the user prefers it, or
/// when the fee-token balance cannot cover the fee.
pub fn taker_fee_in_base_coin(
    prefer_base_coin: bool,
    amount: u64,
    token_schedule: TakerFeeSchedule,
    token_balance: u64,
) -> bool {
    prefer_base_coin || !fee_token_covers_taker_fee(amount, token_schedule, token_balance)
}

/// Funds that must be spendable to take an offer: the taker-side security
/// deposit plus two mining fees (deposit tx and payout tx), plus the trade
/// amount when the taker is the seller of the coin (a BUY offer). The taker
/// fee is paid from fee-specific balance and is not part of this number.
pub fn funds_needed_to_take_offer(
    offer: &Offer,
    amount: u64,
    tx_fee_estimate: u64,
) -> Result<u64, CoreError> {
    if amount == 0 {
        return Err(CoreError::validation(
            "Cannot compute funds needed for a zero amount",
        ));
    }
    let base = tx_fee_estimate
        .checked_mul(2)
        .and_then(|fees| offer.taker_security_deposit().checked_add(fees))
        .ok_or_else(amount_overflow)?;
    if offer.is_buy_offer() {
        base.checked_add(amount).ok_or_else(amount_overflow)
    } else {
        Ok(base)
    }
}

/// Funds reserved when making an offer: the maker-side security deposit,
/// plus the trade amount when selling the coin.
pub fn funds_needed_to_make_offer(
    direction: Direction,
    amount: u64,
    buyer_security_deposit: u64,
    seller_security_deposit: u64,
) -> Result<u64, CoreError> {
    if amount == 0 {
        return Err(CoreError::validation(
            "Cannot compute funds needed for a zero amount",
        ));
    }
    match direction {
        Direction::Buy => Ok(buyer_security_deposit),
        Direction::Sell => seller_security_deposit
            .checked_add(amount)
            .ok_or_else(amount_overflow),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PriceSpec;

    fn offer(direction: Direction, amount: u64, buyer_deposit: u64, seller_deposit: u64) -> Offer {
        Offer {
            id: "offer-1".into(),
            direction,
            amount,
            min_amount: amount,
            price: PriceSpec::Fixed(4_500_000),
            currency_code: "EUR".into(),
            maker_node_address: "maker.onion:9999".into(),
            buyer_security_deposit: buyer_deposit,
            seller_security_deposit: seller_deposit,
        }
    }

    #[test]
    fn taker_fee_respects_the_minimum() {
        let schedule = TakerFeeSchedule {
            fee_per_coin: 200_000,
            min_fee: 5_000,
        };
        // 0.001 coin * 200k/coin = 200, below the 5000 floor.
        assert_eq!(required_taker_fee(100_000, schedule).unwrap(), 5_000);
        // 1 coin pays the full rate.
        assert_eq!(required_taker_fee(COIN, schedule).unwrap(), 200_000);
    }

    #[test]
    fn taker_fee_is_monotonically_non_decreasing() {
        let schedule = TakerFeeSchedule {
            fee_per_coin: 200_000,
            min_fee: 5_000,
        };
        let mut previous = 0;
        for amount in (1..=COIN).step_by((COIN / 40) as usize) {
            let fee = required_taker_fee(amount, schedule).unwrap();
            assert!(fee >= previous, "fee dropped at amount {amount}");
            assert!(fee >= schedule.min_fee);
            previous = fee;
        }
    }

    #[test]
    fn zero_amount_is_rejected() {
        let schedule = TakerFeeSchedule {
            fee_per_coin: 200_000,
            min_fee: 5_000,
        };
        assert!(matches!(
            required_taker_fee(0, schedule),
            Err(CoreError::ValidationFailed(_))
        ));
        assert!(matches!(
            funds_needed_to_take_offer(&offer(Direction::Sell, 100, 20, 20), 0, 5),
            Err(CoreError::ValidationFailed(_))
        ));
        assert!(matches!(
            funds_needed_to_make_offer(Direction::Buy, 0, 20, 20),
            Err(CoreError::ValidationFailed(_))
        ));
    }

    #[test]
    fn taking_a_sell_offer_needs_deposit_plus_two_tx_fees() {
        // Taker is the buyer: deposit 20 + 5 + 5, amount not added.
        let sell = offer(Direction::Sell, 100, 20, 90);
        assert_eq!(funds_needed_to_take_offer(&sell, 100, 5).unwrap(), 30);
    }

    #[test]
    fn taking_a_buy_offer_adds_the_trade_amount() {
        // Taker is the seller: deposit 20 + 5 + 5 + amount 100.
        let buy = offer(Direction::Buy, 100, 90, 20);
        assert_eq!(funds_needed_to_take_offer(&buy, 100, 5).unwrap(), 130);
    }

    #[test]
    fn oversized_amounts_report_amount_too_high_instead_of_wrapping() {
        let steep = TakerFeeSchedule {
            fee_per_coin: 200_000 * COIN,
            min_fee: 5_000,
        };
        assert!(matches!(
            required_taker_fee(u64::MAX, steep),
            Err(CoreError::AmountTooHigh(_))
        ));

        let buy = offer(Direction::Buy, u64::MAX, 90, 20);
        assert!(matches!(
            funds_needed_to_take_offer(&buy, u64::MAX, 5),
            Err(CoreError::AmountTooHigh(_))
        ));
        assert!(matches!(
            funds_needed_to_take_offer(&offer(Direction::Sell, 100, 20, 20), 100, u64::MAX),
            Err(CoreError::AmountTooHigh(_))
        ));
        assert!(matches!(
            funds_needed_to_make_offer(Direction::Sell, u64::MAX, 70, 20),
            Err(CoreError::AmountTooHigh(_))
        ));
    }

    #[test]
    fn making_a_sell_offer_reserves_deposit_plus_amount() {
        assert_eq!(
            funds_needed_to_make_offer(Direction::Sell, 100, 70, 20).unwrap(),
            120
        );
        assert_eq!(
            funds_needed_to_make_offer(Direction::Buy, 100, 70, 20).unwrap(),
            70
        );
    }

    #[test]
    fn fee_currency_decision_prefers_base_or_falls_back() {
        let token = TakerFeeSchedule {
            fee_per_coin: 100_000,
            min_fee: 3_000,
        };
        // Preference wins outright.
        assert!(taker_fee_in_base_coin(true, COIN, token, u64::MAX));
        // No preference and the token balance covers the fee.
        assert!(!taker_fee_in_base_coin(false, COIN, token, 100_000));
        // No preference but the token balance falls short.
        assert!(taker_fee_in_base_coin(false, COIN, token, 99_999));
        // Zero amount cannot be priced in the token.
        assert!(taker_fee_in_base_coin(false, 0, token, u64::MAX));
    }
}
