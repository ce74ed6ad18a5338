//! A single interactive game: pick a box, draw, optionally buy more, guess.

use super::grid::BoxGrid;
use crate::inference::{Decision, InferenceEngine, InferenceError};
use crate::model::payoff::{DEFAULT_BONUSES, base_cost, gross_payoffs, implied_probabilities};
use crate::model::{HypothesisSpace, Observation};
use crate::sim::sampling::draw_success;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound on the initial number of draws.
pub const MAX_OBSERVATIONS: u32 = 50;

/// Prices and prizes for a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundConfig {
    pub observations: u32,
    pub observation_price: f64,
    pub extra_observation_price: f64,
    pub payoffs: Vec<f64>,
    /// Belief used for the advisory posterior and recommendation.
    pub prior: Vec<f64>,
}

impl RoundConfig {
    /// Five draws at 1.00, extras at 0.50, bonuses 5/10/25 over cost, implied prior.
    pub fn classic() -> Self {
        let observations = 5;
        let observation_price = 1.0;
        let cost = base_cost(observation_price, observations);
        let payoffs = gross_payoffs(&DEFAULT_BONUSES, cost);
        let prior = implied_probabilities(&payoffs, cost);
        Self {
            observations,
            observation_price,
            extra_observation_price: 0.5,
            payoffs,
            prior,
        }
    }

    pub fn base_cost(&self) -> f64 {
        base_cost(self.observation_price, self.observations)
    }

    fn validate(&self, space: &HypothesisSpace) -> Result<(), RoundError> {
        if !(1..=MAX_OBSERVATIONS).contains(&self.observations) {
            return Err(RoundError::InvalidConfig {
                field: "observations",
                message: format!("must be between 1 and {MAX_OBSERVATIONS}"),
            });
        }
        for (field, price) in [
            ("observation_price", self.observation_price),
            ("extra_observation_price", self.extra_observation_price),
        ] {
            if !price.is_finite() || price < 0.0 {
                return Err(RoundError::InvalidConfig {
                    field,
                    message: "prices must be non-negative".to_string(),
                });
            }
        }
        space.check_payoffs(&self.payoffs)?;
        space.check_weights("prior", &self.prior)?;
        Ok(())
    }
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self::classic()
    }
}

/// Settlement of a finished round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundOutcome {
    pub box_position: usize,
    pub true_index: usize,
    pub guessed_index: usize,
    pub draws: u32,
    pub total_cost: f64,
    pub prize: f64,
    pub net: f64,
}

impl RoundOutcome {
    pub fn correct(&self) -> bool {
        self.true_index == self.guessed_index
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoundPhase {
    Selecting,
    Deciding,
    Settled(RoundOutcome),
}

impl RoundPhase {
    pub const fn label(&self) -> &'static str {
        match self {
            RoundPhase::Selecting => "selecting",
            RoundPhase::Deciding => "deciding",
            RoundPhase::Settled(_) => "settled",
        }
    }
}

/// Advice for the player at the decision point.
#[derive(Debug, Clone, PartialEq)]
pub enum Recommendation {
    Guess(Decision),
    BuyExtra {
        net_expected_value: f64,
        net_if_guessing_now: f64,
    },
}

#[derive(Debug, Clone, Copy)]
struct HiddenBox {
    position: usize,
    index: usize,
}

/// Caller-owned state of one round. Nothing here is global.
#[derive(Debug, Clone)]
pub struct RoundState {
    engine: InferenceEngine,
    config: RoundConfig,
    phase: RoundPhase,
    hidden: Option<HiddenBox>,
    draws: Vec<bool>,
    total_cost: f64,
}

impl RoundState {
    pub fn new(space: HypothesisSpace, config: RoundConfig) -> Result<Self, RoundError> {
        config.validate(&space)?;
        Ok(Self {
            engine: InferenceEngine::new(space),
            config,
            phase: RoundPhase::Selecting,
            hidden: None,
            draws: Vec::new(),
            total_cost: 0.0,
        })
    }

    pub fn phase(&self) -> &RoundPhase {
        &self.phase
    }

    pub fn config(&self) -> &RoundConfig {
        &self.config
    }

    pub fn draws(&self) -> &[bool] {
        &self.draws
    }

    pub fn observation(&self) -> Observation {
        Observation::from_outcomes(&self.draws)
    }

    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    /// Opens the box at `position` and makes the configured initial draws.
    pub fn select_box<R: Rng + ?Sized>(
        &mut self,
        grid: &BoxGrid,
        position: usize,
        rng: &mut R,
    ) -> Result<Observation, RoundError> {
        self.expect_phase("select a box", matches!(self.phase, RoundPhase::Selecting))?;
        let index = grid
            .hypothesis_at(position)
            .ok_or(RoundError::UnknownBox {
                position,
                boxes: grid.len(),
            })?;
        let theta = self
            .engine
            .space()
            .value(index)
            .ok_or(RoundError::UnknownHypothesis { index })?;

        self.hidden = Some(HiddenBox { position, index });
        self.draws = (0..self.config.observations)
            .map(|_| draw_success(theta, rng))
            .collect();
        self.total_cost = self.config.base_cost();
        self.phase = RoundPhase::Deciding;
        Ok(self.observation())
    }

    /// Buys and draws one more ball; may be repeated.
    pub fn buy_extra<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<bool, RoundError> {
        let hidden = self.hidden_box("buy a draw")?;
        let theta = self.engine.space().values()[hidden.index];
        let success = draw_success(theta, rng);
        self.draws.push(success);
        self.total_cost += self.config.extra_observation_price;
        Ok(success)
    }

    /// Belief over the hypotheses given every draw so far.
    pub fn posterior(&self) -> Result<Vec<f64>, RoundError> {
        self.hidden_box("inspect the posterior")?;
        Ok(self
            .engine
            .compute_posterior(&self.config.prior, self.observation())?)
    }

    /// EV-optimal next step under the configured prior.
    pub fn recommendation(&self) -> Result<Recommendation, RoundError> {
        let posterior = self.posterior()?;
        let now = self.engine.best_decision(&posterior, &self.config.payoffs)?;
        let net_now = now.expected - self.total_cost;
        let option = self.engine.evaluate_extra_observation(
            &posterior,
            &self.config.payoffs,
            self.total_cost,
            self.config.extra_observation_price,
        )?;
        if option.net_expected_value > net_now {
            Ok(Recommendation::BuyExtra {
                net_expected_value: option.net_expected_value,
                net_if_guessing_now: net_now,
            })
        } else {
            Ok(Recommendation::Guess(now))
        }
    }

    /// Settles the round with a guess.
    pub fn guess(&mut self, hypothesis_index: usize) -> Result<RoundOutcome, RoundError> {
        let hidden = self.hidden_box("guess")?;
        if hypothesis_index >= self.engine.space().len() {
            return Err(RoundError::UnknownHypothesis {
                index: hypothesis_index,
            });
        }
        let prize = if hypothesis_index == hidden.index {
            self.config.payoffs[hidden.index]
        } else {
            0.0
        };
        let outcome = RoundOutcome {
            box_position: hidden.position,
            true_index: hidden.index,
            guessed_index: hypothesis_index,
            draws: self.draws.len() as u32,
            total_cost: self.total_cost,
            prize,
            net: prize - self.total_cost,
        };
        self.phase = RoundPhase::Settled(outcome.clone());
        Ok(outcome)
    }

    /// Starts a fresh round with the same configuration.
    pub fn reset(&mut self) {
        self.phase = RoundPhase::Selecting;
        self.hidden = None;
        self.draws.clear();
        self.total_cost = 0.0;
    }

    fn hidden_box(&self, action: &'static str) -> Result<HiddenBox, RoundError> {
        self.expect_phase(action, matches!(self.phase, RoundPhase::Deciding))?;
        self.hidden.ok_or(RoundError::WrongPhase {
            action,
            phase: self.phase.label(),
        })
    }

    fn expect_phase(&self, action: &'static str, ok: bool) -> Result<(), RoundError> {
        if ok {
            Ok(())
        } else {
            Err(RoundError::WrongPhase {
                action,
                phase: self.phase.label(),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoundError {
    InvalidConfig {
        field: &'static str,
        message: String,
    },
    WrongPhase {
        action: &'static str,
        phase: &'static str,
    },
    UnknownBox {
        position: usize,
        boxes: usize,
    },
    UnknownHypothesis {
        index: usize,
    },
    Inference(InferenceError),
}

impl fmt::Display for RoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundError::InvalidConfig { field, message } => write!(f, "{field}: {message}"),
            RoundError::WrongPhase { action, phase } => {
                write!(f, "cannot {action} while the round is {phase}")
            }
            RoundError::UnknownBox { position, boxes } => {
                write!(f, "box {position} does not exist ({boxes} boxes)")
            }
            RoundError::UnknownHypothesis { index } => {
                write!(f, "hypothesis {index} is not in the hypothesis space")
            }
            RoundError::Inference(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for RoundError {}

impl From<InferenceError> for RoundError {
    fn from(err: InferenceError) -> Self {
        RoundError::Inference(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::grid::DEFAULT_BOX_COUNT;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn classic_round() -> RoundState {
        RoundState::new(HypothesisSpace::standard(), RoundConfig::classic()).unwrap()
    }

    #[test]
    fn classic_config_matches_default_schedule() {
        let config = RoundConfig::classic();
        assert_eq!(config.payoffs, vec![10.0, 15.0, 30.0]);
        assert!((config.base_cost() - 5.0).abs() < 1e-12);
        assert!((config.prior.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_out_of_range_observations_and_negative_prices() {
        let mut config = RoundConfig::classic();
        config.observations = 51;
        assert!(matches!(
            RoundState::new(HypothesisSpace::standard(), config),
            Err(RoundError::InvalidConfig {
                field: "observations",
                ..
            })
        ));

        let mut config = RoundConfig::classic();
        config.extra_observation_price = -0.5;
        assert!(matches!(
            RoundState::new(HypothesisSpace::standard(), config),
            Err(RoundError::InvalidConfig {
                field: "extra_observation_price",
                ..
            })
        ));
    }

    #[test]
    fn full_round_charges_draws_and_pays_correct_guess() {
        let mut rng = SmallRng::seed_from_u64(21);
        let grid = BoxGrid::build(&RoundConfig::classic().prior, DEFAULT_BOX_COUNT, &mut rng);
        let mut round = classic_round();

        let obs = round.select_box(&grid, 42, &mut rng).unwrap();
        assert_eq!(obs.draws(), 5);
        assert_eq!(round.phase(), &RoundPhase::Deciding);
        assert!((round.total_cost() - 5.0).abs() < 1e-12);

        round.buy_extra(&mut rng).unwrap();
        round.buy_extra(&mut rng).unwrap();
        assert_eq!(round.draws().len(), 7);
        assert!((round.total_cost() - 6.0).abs() < 1e-12);

        let truth = grid.hypothesis_at(42).unwrap();
        let outcome = round.guess(truth).unwrap();
        assert!(outcome.correct());
        assert_eq!(outcome.prize, [10.0, 15.0, 30.0][truth]);
        assert!((outcome.net - (outcome.prize - 6.0)).abs() < 1e-12);
        assert!(matches!(round.phase(), RoundPhase::Settled(_)));
    }

    #[test]
    fn wrong_guess_loses_the_cost() {
        let mut rng = SmallRng::seed_from_u64(4);
        let grid = BoxGrid::build(&[0.0, 1.0, 0.0], 10, &mut rng);
        let mut round = classic_round();
        round.select_box(&grid, 0, &mut rng).unwrap();
        let outcome = round.guess(0).unwrap();
        assert!(!outcome.correct());
        assert_eq!(outcome.prize, 0.0);
        assert!((outcome.net + 5.0).abs() < 1e-12);
    }

    #[test]
    fn actions_out_of_phase_are_rejected() {
        let mut rng = SmallRng::seed_from_u64(8);
        let grid = BoxGrid::build(&[1.0, 1.0, 1.0], 9, &mut rng);
        let mut round = classic_round();

        assert!(matches!(
            round.guess(0),
            Err(RoundError::WrongPhase {
                phase: "selecting",
                ..
            })
        ));
        assert!(round.buy_extra(&mut rng).is_err());
        assert!(matches!(
            round.select_box(&grid, 9, &mut rng),
            Err(RoundError::UnknownBox {
                position: 9,
                boxes: 9
            })
        ));

        round.select_box(&grid, 3, &mut rng).unwrap();
        assert!(round.select_box(&grid, 4, &mut rng).is_err());
        assert!(matches!(
            round.guess(3),
            Err(RoundError::UnknownHypothesis { index: 3 })
        ));
        round.guess(1).unwrap();
        assert!(round.buy_extra(&mut rng).is_err());

        round.reset();
        assert_eq!(round.phase(), &RoundPhase::Selecting);
        assert!(round.draws().is_empty());
    }

    #[test]
    fn recommendation_guesses_when_box_is_revealed() {
        let mut rng = SmallRng::seed_from_u64(2);
        let grid = BoxGrid::build(&[0.0, 0.0, 1.0], 5, &mut rng);
        let config = RoundConfig {
            prior: vec![0.0, 0.0, 1.0],
            ..RoundConfig::classic()
        };
        let mut round = RoundState::new(HypothesisSpace::standard(), config).unwrap();
        round.select_box(&grid, 0, &mut rng).unwrap();
        match round.recommendation().unwrap() {
            Recommendation::Guess(decision) => assert_eq!(decision.index, 2),
            other => panic!("expected a guess, got {other:?}"),
        }
        let posterior = round.posterior().unwrap();
        assert_eq!(posterior, vec![0.0, 0.0, 1.0]);
    }
}
