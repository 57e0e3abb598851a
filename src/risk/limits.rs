//! Position and stake limit checks, grounded on the teacher's
//! `risk::limits::check_risk_limits` shape: a single pure function returning
//! an `Allowed`/`Blocked` enum, evaluated before a bet or trade is recorded.

use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy)]
pub enum RiskCheck {
    Allowed,
    Blocked(&'static str),
}

impl RiskCheck {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RiskCheck::Allowed)
    }
}

/// Evaluated by the value-bet pipeline and by bet recording before persisting
/// a stake against a user's settings (spec §3 Settings: `risk_per_trade`,
/// `max_open_positions`).
pub fn check_risk(
    proposed_stake_percent: Decimal,
    risk_per_trade_limit: Decimal,
    open_positions: i32,
    max_open_positions: i32,
    bankroll: Decimal,
) -> RiskCheck {
    if bankroll <= Decimal::ZERO {
        return RiskCheck::Blocked("bankroll depleted");
    }
    if open_positions >= max_open_positions {
        return RiskCheck::Blocked("max open positions reached");
    }
    if proposed_stake_percent > risk_per_trade_limit {
        return RiskCheck::Blocked("stake exceeds per-trade risk limit");
    }
    if proposed_stake_percent <= Decimal::ZERO {
        return RiskCheck::Blocked("stake too small");
    }
    RiskCheck::Allowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn normal_conditions_allowed() {
        let check = check_risk(dec!(2), dec!(5), 3, 10, dec!(1000));
        assert!(check.is_allowed());
    }

    #[test]
    fn max_positions_blocks() {
        let check = check_risk(dec!(2), dec!(5), 10, 10, dec!(1000));
        assert!(!check.is_allowed());
    }

    #[test]
    fn stake_over_limit_blocks() {
        let check = check_risk(dec!(8), dec!(5), 0, 10, dec!(1000));
        assert!(!check.is_allowed());
    }

    #[test]
    fn depleted_bankroll_blocks() {
        let check = check_risk(dec!(2), dec!(5), 0, 10, dec!(0));
        assert!(!check.is_allowed());
    }
}
