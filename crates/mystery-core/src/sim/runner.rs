use super::policy::{DecisionPolicy, PolicyContext};
use super::result::{SimulationRun, TrialOutcome};
use super::sampling::{draw_success, draw_successes, sample_index};
use super::SimulationError;
use crate::inference::{InferenceEngine, InferenceError, is_degenerate, normalize};
use crate::model::{HypothesisSpace, Observation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{Level, event};

/// Parameters of a batch of simulated games.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialPlan {
    pub trials: usize,
    /// Distribution the true box is drawn from.
    pub sampling_prior: Vec<f64>,
    /// Prior the policy believes in.
    pub betting_prior: Vec<f64>,
    pub payoffs: Vec<f64>,
    /// Draws made before any decision.
    pub observations: u32,
    /// Cost of the initial draws.
    pub base_cost: f64,
    /// Price of one extra draw.
    pub extra_cost: f64,
}

/// Plays repeated games against a hidden box and scores a policy.
#[derive(Debug, Clone, Default)]
pub struct PolicySimulator {
    engine: InferenceEngine,
}

impl PolicySimulator {
    pub fn new(space: HypothesisSpace) -> Self {
        Self {
            engine: InferenceEngine::new(space),
        }
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    /// Runs `plan.trials` games. Input is validated before the first draw.
    pub fn run_trials<R: Rng + ?Sized>(
        &self,
        plan: &TrialPlan,
        policy: &dyn DecisionPolicy,
        rng: &mut R,
    ) -> Result<SimulationRun, SimulationError> {
        if plan.trials < 1 {
            return Err(SimulationError::InvalidTrialCount {
                requested: plan.trials,
            });
        }
        let sampling_prior = self.validate(plan)?;

        let mut run = SimulationRun::with_capacity(plan.trials);
        for _ in 0..plan.trials {
            let outcome = self.run_trial(plan, &sampling_prior, policy, rng)?;
            let result = run.record(outcome);
            event!(
                target: "mystery_core::sim",
                Level::TRACE,
                policy = policy.kind().label(),
                trial = result.trial as u64,
                true_index = result.true_index as u64,
                guessed_index = result.guessed_index as u64,
                extra = result.extra_draw.is_some(),
                net = result.net
            );
        }

        event!(
            target: "mystery_core::sim",
            Level::DEBUG,
            policy = policy.kind().label(),
            trials = run.len() as u64,
            correct = run.correct_count() as u64,
            extra_purchases = run.extra_purchases() as u64,
            final_cumulative = run.final_cumulative(),
            final_average = run.final_average()
        );

        Ok(run)
    }

    /// Checks the plan and returns the normalized sampling prior.
    fn validate(&self, plan: &TrialPlan) -> Result<Vec<f64>, InferenceError> {
        let space = self.engine.space();
        space.check_weights("sampling_prior", &plan.sampling_prior)?;
        if plan.sampling_prior.iter().sum::<f64>() <= 0.0 {
            return Err(InferenceError::ZeroMass {
                field: "sampling_prior",
            });
        }
        space.check_weights("betting_prior", &plan.betting_prior)?;
        space.check_payoffs(&plan.payoffs)?;
        for (field, value) in [("base_cost", plan.base_cost), ("extra_cost", plan.extra_cost)] {
            if !value.is_finite() {
                return Err(InferenceError::InvalidWeight {
                    field,
                    index: 0,
                    value,
                });
            }
        }
        Ok(normalize(&plan.sampling_prior))
    }

    fn run_trial<R: Rng + ?Sized>(
        &self,
        plan: &TrialPlan,
        sampling_prior: &[f64],
        policy: &dyn DecisionPolicy,
        rng: &mut R,
    ) -> Result<TrialOutcome, InferenceError> {
        let true_index = sample_index(sampling_prior, rng);
        let theta = self.engine.space().values()[true_index];
        let successes = draw_successes(plan.observations, theta, rng);
        let observation = Observation::new(plan.observations, successes)?;

        let mut posterior = self
            .engine
            .compute_posterior(&plan.betting_prior, observation)?;
        if is_degenerate(&posterior) {
            event!(
                target: "mystery_core::sim",
                Level::TRACE,
                successes,
                "posterior carries no mass; continuing with zero vector"
            );
        }

        let mut total_cost = plan.base_cost;
        let extra_plan = policy.plan_extra_observation(&PolicyContext {
            engine: &self.engine,
            posterior: &posterior,
            payoffs: &plan.payoffs,
            committed_cost: plan.base_cost,
            extra_cost: plan.extra_cost,
        })?;

        let mut extra_draw = None;
        if extra_plan.is_purchase() {
            let success = draw_success(theta, rng);
            total_cost += plan.extra_cost;
            extra_draw = Some(success);
            if let Some(updated) = extra_plan.resolve(success) {
                posterior = updated;
            }
        }

        let guessed_index = policy.choose(&PolicyContext {
            engine: &self.engine,
            posterior: &posterior,
            payoffs: &plan.payoffs,
            committed_cost: total_cost,
            extra_cost: plan.extra_cost,
        })?;

        let net = if guessed_index == true_index {
            plan.payoffs[guessed_index] - total_cost
        } else {
            -total_cost
        };

        Ok(TrialOutcome {
            true_index,
            guessed_index,
            successes,
            extra_draw,
            total_cost,
            net,
        })
    }
}
