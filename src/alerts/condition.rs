//! Condition evaluation (spec §4.7 step 3): pure function from
//! `(previous, current, target)` to a trigger decision.

use crate::domain::AlertCondition;

const EPSILON: f64 = 1e-4;

pub fn evaluate(condition: AlertCondition, previous: Option<f64>, current: f64, target: f64) -> bool {
    match condition {
        AlertCondition::Above => current > target,
        AlertCondition::Below => current < target,
        AlertCondition::Equals => (current - target).abs() < EPSILON,
        AlertCondition::PercentUp => match previous {
            Some(prev) if prev != 0.0 => ((current - prev) / prev) * 100.0 >= target,
            _ => false,
        },
        AlertCondition::PercentDown => match previous {
            Some(prev) if prev != 0.0 => ((prev - current) / prev) * 100.0 >= target,
            _ => false,
        },
        AlertCondition::Crosses => match previous {
            Some(prev) => (prev < target && current >= target) || (prev > target && current <= target),
            None => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_up_scenario_from_spec() {
        // Alert{symbol: AAPL, condition: percent_up, target: 5.0, previous: 100.00}
        // close=105.01 triggers; a second tick with close=105.50 (previous now
        // 105.01) does not re-trigger.
        assert!(evaluate(AlertCondition::PercentUp, Some(100.0), 105.01, 5.0));
        assert!(!evaluate(AlertCondition::PercentUp, Some(105.01), 105.50, 5.0));
    }

    #[test]
    fn crosses_scenario_from_spec() {
        assert!(evaluate(AlertCondition::Crosses, Some(148.0), 151.0, 150.0));
        assert!(evaluate(AlertCondition::Crosses, Some(151.0), 149.0, 150.0));
    }

    #[test]
    fn crosses_with_equal_previous_and_current_never_triggers() {
        assert!(!evaluate(AlertCondition::Crosses, Some(150.0), 150.0, 150.0));
    }

    #[test]
    fn equals_respects_epsilon() {
        assert!(evaluate(AlertCondition::Equals, None, 100.00005, 100.0));
        assert!(!evaluate(AlertCondition::Equals, None, 100.01, 100.0));
    }

    #[test]
    fn percent_change_with_zero_previous_never_triggers() {
        assert!(!evaluate(AlertCondition::PercentUp, Some(0.0), 10.0, 5.0));
        assert!(!evaluate(AlertCondition::PercentDown, Some(0.0), -10.0, 5.0));
    }
}
