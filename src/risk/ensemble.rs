//! True-probability ensemble (spec §4.6 ValueBetCalculator, §9 decision on
//! ensemble wiring). Each model implements the teacher's `PricingModel` shape:
//! a pure, deterministic, `Send + Sync` function from inputs to a probability.

use serde::{Deserialize, Serialize};
use statrs::distribution::{Discrete, Poisson};

/// Per-model inputs for one outcome of one match. Stack-allocated, `Copy`.
#[derive(Debug, Clone, Copy)]
pub struct EnsembleInput {
    pub home_elo: f64,
    pub away_elo: f64,
    pub home_goals_avg: f64,
    pub away_goals_avg: f64,
    pub home_xg: f64,
    pub away_xg: f64,
    pub home_win_rate: f64,
    pub prior_alpha: f64,
    pub prior_beta: f64,
}

/// A probability model over one outcome. `probability()` must never panic and
/// must return a value in `[0, 1]`.
pub trait ProbabilityModel: Send + Sync {
    fn name(&self) -> &'static str;
    fn probability(&self, input: &EnsembleInput) -> f64;
}

/// ELO rating with a fixed home-advantage bonus.
pub struct EloModel {
    pub home_advantage: f64,
}

impl Default for EloModel {
    fn default() -> Self {
        Self { home_advantage: 100.0 }
    }
}

impl ProbabilityModel for EloModel {
    fn name(&self) -> &'static str {
        "elo"
    }

    fn probability(&self, input: &EnsembleInput) -> f64 {
        let diff = (input.home_elo + self.home_advantage) - input.away_elo;
        (1.0 / (1.0 + 10f64.powf(-diff / 400.0))).clamp(0.0, 1.0)
    }
}

/// Poisson goal model: probability home scores more than away, given each
/// side's average goals as a Poisson rate, truncated at 10 goals per side.
pub struct PoissonModel;

impl ProbabilityModel for PoissonModel {
    fn name(&self) -> &'static str {
        "poisson"
    }

    fn probability(&self, input: &EnsembleInput) -> f64 {
        let lambda_home = input.home_goals_avg.max(0.01);
        let lambda_away = input.away_goals_avg.max(0.01);
        let mut p_home_win = 0.0;
        for h in 0..=10u64 {
            let p_h = poisson_pmf(lambda_home, h);
            for a in 0..h {
                p_home_win += p_h * poisson_pmf(lambda_away, a);
            }
        }
        p_home_win.clamp(0.0, 1.0)
    }
}

fn poisson_pmf(lambda: f64, k: u64) -> f64 {
    match Poisson::new(lambda) {
        Ok(dist) => dist.pmf(k),
        Err(_) => {
            // lambda is clamped to >= 0.01 by the caller; structurally unreachable.
            tracing::error!(lambda, "invalid poisson rate, falling back to zero mass");
            0.0
        }
    }
}

/// Expected-goals model: treats `xg - opponent_xg` as a logistic signal.
pub struct XgModel;

impl ProbabilityModel for XgModel {
    fn name(&self) -> &'static str {
        "xg"
    }

    fn probability(&self, input: &EnsembleInput) -> f64 {
        let diff = input.home_xg - input.away_xg;
        (1.0 / (1.0 + (-diff * 1.5).exp())).clamp(0.0, 1.0)
    }
}

/// Plain historical-form model: win rate blended toward 0.5 by a small prior.
pub struct StatisticalModel;

impl ProbabilityModel for StatisticalModel {
    fn name(&self) -> &'static str {
        "statistical"
    }

    fn probability(&self, input: &EnsembleInput) -> f64 {
        let form = input.home_win_rate.clamp(0.0, 1.0);
        (0.8 * form + 0.2 * 0.5).clamp(0.0, 1.0)
    }
}

/// Beta-posterior shrinkage model (spec §9 Bayesian-wiring decision), grounded
/// on the teacher's `risk::kelly` Beta-posterior mean.
pub struct BayesianModel;

impl ProbabilityModel for BayesianModel {
    fn name(&self) -> &'static str {
        "bayesian"
    }

    fn probability(&self, input: &EnsembleInput) -> f64 {
        let alpha = input.prior_alpha.max(0.5);
        let beta = input.prior_beta.max(0.5);
        (alpha / (alpha + beta)).clamp(0.0, 1.0)
    }
}

/// Ensemble mixing weights (spec §9 decision: statistical 0.3, Poisson 0.2,
/// xG 0.2, ELO 0.2, Bayesian 0.1). Exposed on `AppConfig` so they are already
/// the "configurable defaults" spec §9 asks for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EnsembleWeights {
    pub statistical: f64,
    pub poisson: f64,
    pub xg: f64,
    pub elo: f64,
    pub bayesian: f64,
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        Self {
            statistical: 0.3,
            poisson: 0.2,
            xg: 0.2,
            elo: 0.2,
            bayesian: 0.1,
        }
    }
}

/// Combines all five models' outputs into one true-probability estimate.
pub fn combine(input: &EnsembleInput, weights: &EnsembleWeights) -> f64 {
    let statistical = StatisticalModel.probability(input);
    let poisson = PoissonModel.probability(input);
    let xg = XgModel.probability(input);
    let elo = EloModel::default().probability(input);
    let bayesian = BayesianModel.probability(input);

    (weights.statistical * statistical
        + weights.poisson * poisson
        + weights.xg * xg
        + weights.elo * elo
        + weights.bayesian * bayesian)
        .clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balanced_input() -> EnsembleInput {
        EnsembleInput {
            home_elo: 1500.0,
            away_elo: 1500.0,
            home_goals_avg: 1.3,
            away_goals_avg: 1.3,
            home_xg: 1.3,
            away_xg: 1.3,
            home_win_rate: 0.5,
            prior_alpha: 1.0,
            prior_beta: 1.0,
        }
    }

    #[test]
    fn balanced_teams_give_elo_favoring_home() {
        let p = EloModel::default().probability(&balanced_input());
        assert!(p > 0.5, "home advantage should tilt probability above 0.5, got {p}");
    }

    #[test]
    fn elo_matches_the_worked_home_advantage_example() {
        // Base rating 1800 + 100 home advantage = 1900 effective, vs 1600 away.
        let mut input = balanced_input();
        input.home_elo = 1800.0;
        input.away_elo = 1600.0;
        let p = EloModel::default().probability(&input);
        assert!((p - 0.849).abs() < 1e-3, "expected ~0.849 with home_advantage=100, got {p}");
    }

    #[test]
    fn stronger_home_team_increases_elo_probability() {
        let mut input = balanced_input();
        input.home_elo = 1800.0;
        let p = EloModel::default().probability(&input);
        assert!(p > 0.8, "big elo gap should dominate, got {p}");
    }

    #[test]
    fn combine_stays_within_unit_interval() {
        let weights = EnsembleWeights::default();
        let p = combine(&balanced_input(), &weights);
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn weights_sum_to_one() {
        let w = EnsembleWeights::default();
        let sum = w.statistical + w.poisson + w.xg + w.elo + w.bayesian;
        assert!((sum - 1.0).abs() < 1e-9);
    }
}
