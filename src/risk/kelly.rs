//! Kelly stake sizing (spec §3 ValueBet, §4.6): `0.25 * ((b*p - q) / b)`,
//! clamped to `[0, 10]` percent of bankroll. Pure function, grounded on the
//! teacher's `risk::kelly::compute_kelly` shape but with the spec's exact
//! fractional-Kelly constant and cap rather than the teacher's contract-price
//! payout ratio.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const FRACTIONAL_MULTIPLIER: Decimal = dec!(0.25);
const MAX_STAKE_PERCENT: Decimal = dec!(10);

/// `bookmaker_odds` is decimal odds (> 1.0), `true_probability` in `(0, 1)`.
/// Negative Kelly (no edge) clamps to zero rather than going short.
pub fn kelly_stake(bookmaker_odds: Decimal, true_probability: Decimal) -> Decimal {
    let b = bookmaker_odds - Decimal::ONE;
    if b <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let p = true_probability;
    let q = Decimal::ONE - p;
    let raw = (b * p - q) / b;
    let fractional = raw * FRACTIONAL_MULTIPLIER * Decimal::ONE_HUNDRED;
    fractional.clamp(Decimal::ZERO, MAX_STAKE_PERCENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_edge_gives_zero_stake() {
        // Fair odds for p=0.5 is 2.0; no edge, no bet.
        let stake = kelly_stake(dec!(2.0), dec!(0.5));
        assert_eq!(stake, Decimal::ZERO);
    }

    #[test]
    fn strong_edge_gives_positive_stake_within_cap() {
        let stake = kelly_stake(dec!(3.0), dec!(0.5));
        assert!(stake > Decimal::ZERO);
        assert!(stake <= MAX_STAKE_PERCENT);
    }

    #[test]
    fn extreme_edge_is_capped_at_ten_percent() {
        let stake = kelly_stake(dec!(10.0), dec!(0.9));
        assert_eq!(stake, MAX_STAKE_PERCENT);
    }

    #[test]
    fn negative_edge_clamps_to_zero_not_negative() {
        let stake = kelly_stake(dec!(1.5), dec!(0.2));
        assert_eq!(stake, Decimal::ZERO);
    }
}
