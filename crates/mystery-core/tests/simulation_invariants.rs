use mystery_core::game::{BoxGrid, RoundConfig, RoundState, Tally};
use mystery_core::inference::InferenceEngine;
use mystery_core::model::HypothesisSpace;
use mystery_core::model::payoff::{base_cost, gross_payoffs, implied_probabilities};
use mystery_core::sim::{PolicyKind, PolicySimulator, SimulationError, TrialPlan};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Forwards to a seeded generator and counts every call.
struct CountingRng {
    inner: StdRng,
    calls: usize,
}

impl CountingRng {
    fn new(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
            calls: 0,
        }
    }
}

impl RngCore for CountingRng {
    fn next_u32(&mut self) -> u32 {
        self.calls += 1;
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.calls += 1;
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.calls += 1;
        self.inner.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.calls += 1;
        self.inner.try_fill_bytes(dest)
    }
}

fn classic_plan(trials: usize) -> TrialPlan {
    let cost = base_cost(1.0, 5);
    let payoffs = gross_payoffs(&[5.0, 10.0, 25.0], cost);
    let implied = implied_probabilities(&payoffs, cost);
    TrialPlan {
        trials,
        sampling_prior: implied.clone(),
        betting_prior: implied,
        payoffs,
        observations: 5,
        base_cost: cost,
        extra_cost: 0.5,
    }
}

#[test]
fn thousand_trials_keep_running_totals_consistent() {
    let sim = PolicySimulator::default();
    let mut rng = StdRng::seed_from_u64(2024);
    for kind in PolicyKind::ALL {
        let policy = kind.spawn();
        let run = sim
            .run_trials(&classic_plan(1000), policy.as_ref(), &mut rng)
            .unwrap();
        assert_eq!(run.len(), 1000);

        let mut running = 0.0;
        for (i, trial) in run.trials().iter().enumerate() {
            running += trial.net;
            assert_eq!(trial.trial, i + 1);
            assert_eq!(trial.cumulative_net, running);
            assert_eq!(trial.average_net, trial.cumulative_net / (i + 1) as f64);
            assert_eq!(trial.correct, trial.true_index == trial.guessed_index);
        }
        assert_eq!(run.final_cumulative(), running);
        assert_eq!(
            run.correct_count(),
            run.trials().iter().filter(|t| t.correct).count()
        );
    }
}

#[test]
fn zero_trials_fail_before_any_draw() {
    let sim = PolicySimulator::default();
    let mut rng = CountingRng::new(9);
    let policy = PolicyKind::EvOptimal.spawn();
    let err = sim
        .run_trials(&classic_plan(0), policy.as_ref(), &mut rng)
        .unwrap_err();
    assert_eq!(err, SimulationError::InvalidTrialCount { requested: 0 });
    assert_eq!(rng.calls, 0);
}

#[test]
fn invalid_plan_fails_before_any_draw() {
    let sim = PolicySimulator::default();
    let mut rng = CountingRng::new(9);
    let mut plan = classic_plan(10);
    plan.payoffs.pop();
    let policy = PolicyKind::AlwaysExtraMap.spawn();
    assert!(matches!(
        sim.run_trials(&plan, policy.as_ref(), &mut rng),
        Err(SimulationError::Inference(_))
    ));
    assert_eq!(rng.calls, 0);
}

#[test]
fn same_seed_reproduces_the_same_run() {
    let sim = PolicySimulator::default();
    let policy = PolicyKind::EvOptimal.spawn();
    let first = sim
        .run_trials(&classic_plan(250), policy.as_ref(), &mut StdRng::seed_from_u64(77))
        .unwrap();
    let second = sim
        .run_trials(&classic_plan(250), policy.as_ref(), &mut StdRng::seed_from_u64(77))
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn ev_policy_beats_always_extra_map_on_skewed_payoffs() {
    let sim = PolicySimulator::default();
    let plan = TrialPlan {
        trials: 5000,
        sampling_prior: vec![0.5, 0.3, 0.2],
        betting_prior: vec![0.5, 0.3, 0.2],
        payoffs: vec![1.0, 1.0, 100.0],
        observations: 5,
        base_cost: 5.0,
        extra_cost: 0.5,
    };
    let ev = sim
        .run_trials(
            &plan,
            PolicyKind::EvOptimal.spawn().as_ref(),
            &mut StdRng::seed_from_u64(11),
        )
        .unwrap();
    let map = sim
        .run_trials(
            &plan,
            PolicyKind::AlwaysExtraMap.spawn().as_ref(),
            &mut StdRng::seed_from_u64(12),
        )
        .unwrap();
    assert!(
        ev.final_average() >= map.final_average(),
        "ev {} < map {}",
        ev.final_average(),
        map.final_average()
    );
    assert_eq!(map.extra_purchases(), plan.trials);
}

#[test]
fn ev_policy_beats_always_extra_map_on_classic_game() {
    let sim = PolicySimulator::default();
    let plan = classic_plan(20_000);
    let ev = sim
        .run_trials(
            &plan,
            PolicyKind::EvOptimal.spawn().as_ref(),
            &mut StdRng::seed_from_u64(31),
        )
        .unwrap();
    let map = sim
        .run_trials(
            &plan,
            PolicyKind::AlwaysExtraMap.spawn().as_ref(),
            &mut StdRng::seed_from_u64(32),
        )
        .unwrap();
    assert!(
        ev.final_average() > map.final_average(),
        "ev {} <= map {}",
        ev.final_average(),
        map.final_average()
    );
}

#[test]
fn long_observation_runs_complete() {
    let sim = PolicySimulator::default();
    let mut plan = classic_plan(20);
    plan.observations = 1100;
    for kind in PolicyKind::ALL {
        let run = sim
            .run_trials(&plan, kind.spawn().as_ref(), &mut StdRng::seed_from_u64(8))
            .unwrap();
        assert_eq!(run.len(), 20);
        // With this many draws the true box is never mistaken.
        assert_eq!(run.correct_count(), 20);
    }
}

#[test]
fn plan_and_run_serialize_for_reports() {
    let plan: TrialPlan = serde_json::from_str(
        r#"{"trials":3,"sampling_prior":[0.5,0.3,0.2],"betting_prior":[0.5,0.3,0.2],
            "payoffs":[10.0,15.0,30.0],"observations":5,"base_cost":5.0,"extra_cost":0.5}"#,
    )
    .unwrap();
    let run = PolicySimulator::default()
        .run_trials(
            &plan,
            PolicyKind::EvOptimal.spawn().as_ref(),
            &mut StdRng::seed_from_u64(3),
        )
        .unwrap();
    let value = serde_json::to_value(&run).unwrap();
    let rows = value["trials"].as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2]["trial"], 3);
    assert!(rows[0].get("cumulative_net").is_some());
}

#[test]
fn interactive_rounds_feed_the_tally() {
    let config = RoundConfig::classic();
    let mut rng = StdRng::seed_from_u64(5);
    let grid = BoxGrid::build(&config.prior, 100, &mut rng);
    assert_eq!(grid.counts(3), vec![50, 33, 17]);

    let engine = InferenceEngine::default();
    let mut round = RoundState::new(HypothesisSpace::standard(), config).unwrap();
    let mut tally = Tally::new();
    let mut expected_net = 0.0;
    for position in [0, 17, 99] {
        round.select_box(&grid, position, &mut rng).unwrap();
        let posterior = round.posterior().unwrap();
        let pick = engine.most_likely(&posterior).unwrap();
        let outcome = round.guess(pick.index).unwrap();
        expected_net += outcome.net;
        tally.record(&outcome);
        round.reset();
    }
    assert_eq!(tally.rounds(), 3);
    assert!((tally.net() - expected_net).abs() < 1e-9);
}
