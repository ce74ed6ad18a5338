use serde::Serialize;

/// Record of a single simulated game. Never mutated after it is pushed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialResult {
    /// One-based trial number.
    pub trial: usize,
    pub true_index: usize,
    pub guessed_index: usize,
    /// Reds among the initial draws.
    pub successes: u32,
    /// Outcome of the purchased extra draw, if one was bought.
    pub extra_draw: Option<bool>,
    pub total_cost: f64,
    pub net: f64,
    pub correct: bool,
    pub cumulative_net: f64,
    pub average_net: f64,
}

/// Unaggregated outcome handed from the runner to [`SimulationRun::record`].
pub(crate) struct TrialOutcome {
    pub true_index: usize,
    pub guessed_index: usize,
    pub successes: u32,
    pub extra_draw: Option<bool>,
    pub total_cost: f64,
    pub net: f64,
}

/// Ordered trial results of one `run_trials` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimulationRun {
    trials: Vec<TrialResult>,
    correct_count: usize,
}

impl SimulationRun {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            trials: Vec::with_capacity(capacity),
            correct_count: 0,
        }
    }

    pub(crate) fn record(&mut self, outcome: TrialOutcome) -> &TrialResult {
        let trial = self.trials.len() + 1;
        let cumulative_net = self.final_cumulative() + outcome.net;
        let correct = outcome.guessed_index == outcome.true_index;
        if correct {
            self.correct_count += 1;
        }
        self.trials.push(TrialResult {
            trial,
            true_index: outcome.true_index,
            guessed_index: outcome.guessed_index,
            successes: outcome.successes,
            extra_draw: outcome.extra_draw,
            total_cost: outcome.total_cost,
            net: outcome.net,
            correct,
            cumulative_net,
            average_net: cumulative_net / trial as f64,
        });
        &self.trials[trial - 1]
    }

    pub fn trials(&self) -> &[TrialResult] {
        &self.trials
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn correct_count(&self) -> usize {
        self.correct_count
    }

    pub fn per_trial_cumulative(&self) -> Vec<f64> {
        self.trials.iter().map(|t| t.cumulative_net).collect()
    }

    pub fn per_trial_average(&self) -> Vec<f64> {
        self.trials.iter().map(|t| t.average_net).collect()
    }

    pub fn per_trial_net(&self) -> Vec<f64> {
        self.trials.iter().map(|t| t.net).collect()
    }

    pub fn final_cumulative(&self) -> f64 {
        self.trials.last().map_or(0.0, |t| t.cumulative_net)
    }

    pub fn final_average(&self) -> f64 {
        self.trials.last().map_or(0.0, |t| t.average_net)
    }

    pub fn correct_rate(&self) -> f64 {
        if self.trials.is_empty() {
            0.0
        } else {
            self.correct_count as f64 / self.trials.len() as f64
        }
    }

    pub fn extra_purchases(&self) -> usize {
        self.trials.iter().filter(|t| t.extra_draw.is_some()).count()
    }
}
