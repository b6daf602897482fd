use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use vireg_mdp::{
    Action, EstimatorConfig, ExplorationMode, MdpBuilder, MdpEstimator, MdpSpec, ModelError,
    State, Trajectory, TrajectorySampler, action_marginal, compile_yaml, export_yaml, load_yaml,
    state_action_pairs,
};

const VALID_MDP_YAML: &str = r#"
version: 1
states: [s0, s1, s2]
actions: [stay, go]
transitions:
  - state: s0
    action: stay
    outcomes:
      - next: s0
        prob: 1.0
        reward: 1.0
  - state: s0
    action: go
    outcomes:
      - next: s1
        prob: 0.7
        reward: 0.0
      - next: s2
        prob: 0.3
        reward: -0.2
  - state: s1
    action: stay
    outcomes:
      - next: s1
        prob: 1.0
        reward: 0.0
  - state: s1
    action: go
    outcomes:
      - next: s2
        prob: 1.0
        reward: 2.0
  - state: s2
    action: stay
    outcomes:
      - next: s2
        prob: 1.0
        reward: 0.0
  - state: s2
    action: go
    outcomes:
      - next: s0
        prob: 0.5
        reward: 0.0
      - next: s2
        prob: 0.5
        reward: 0.0
"#;

#[test]
fn yaml_parse_and_compile_success() {
    let spec: MdpSpec = serde_yaml::from_str(VALID_MDP_YAML).expect("valid yaml");
    let mdp = spec.compile().expect("compile should succeed");

    assert_eq!(mdp.num_states(), 3);
    assert_eq!(mdp.num_actions(), 2);
    assert_eq!(spec.state_key("s1"), Some(State::from(1)));
    assert_eq!(spec.action_key("go"), Some(Action::from(1)));
    assert_eq!(
        mdp.transition_probability(State::from(0), State::from(1), Action::from(1)),
        0.7
    );
    assert_eq!(
        mdp.expected_reward(State::from(0), State::from(2), Action::from(1)),
        -0.2
    );
}

#[test]
fn validation_fails_for_probability_sum() {
    let yaml = r#"
states: [s0]
actions: [a0]
transitions:
  - state: s0
    action: a0
    outcomes:
      - next: s0
        prob: 0.9
        reward: 1.0
"#;

    let spec: MdpSpec = serde_yaml::from_str(yaml).expect("valid syntax");
    let err = spec.compile().expect_err("compile should fail");

    assert!(matches!(err, ModelError::ProbabilitySum { state: 0, action: 0, .. }));
}

#[test]
fn validation_fails_for_unknown_state_reference() {
    let yaml = r#"
states: [s0]
actions: [a0]
transitions:
  - state: s0
    action: a0
    outcomes:
      - next: missing
        prob: 1.0
        reward: 1.0
"#;

    let spec: MdpSpec = serde_yaml::from_str(yaml).expect("valid syntax");
    let err = spec.compile().expect_err("compile should fail");

    assert!(matches!(err, ModelError::UnknownStateId { .. }));
}

#[test]
fn validation_fails_for_missing_pair() {
    let yaml = r#"
states: [s0]
actions: [a0, a1]
transitions:
  - state: s0
    action: a0
    outcomes:
      - next: s0
        prob: 1.0
        reward: 1.0
"#;

    let spec: MdpSpec = serde_yaml::from_str(yaml).expect("valid syntax");
    let err = spec.validate().expect_err("a1 has no row");

    assert!(matches!(err, ModelError::MissingTransition { ref action, .. } if action == "a1"));
}

#[test]
fn exported_spec_compiles_to_the_same_model() {
    let spec: MdpSpec = serde_yaml::from_str(VALID_MDP_YAML).expect("valid yaml");
    let mdp = spec.compile().expect("compile should succeed");

    let yaml = serde_yaml::to_string(&MdpSpec::from_mdp(&mdp)).expect("serializable");
    let reparsed: MdpSpec = serde_yaml::from_str(&yaml).expect("valid yaml");
    let copy = reparsed.compile().expect("compile should succeed");

    assert_eq!(copy.transition_table(), mdp.transition_table());
}

#[test]
fn sampling_is_deterministic_for_fixed_seed() {
    let spec: MdpSpec = serde_yaml::from_str(VALID_MDP_YAML).expect("valid yaml");
    let mdp = spec.compile().expect("compile should succeed");

    let mut sampler_a = TrajectorySampler::new(&mdp, 42);
    let mut sampler_b = TrajectorySampler::new(&mdp, 42);

    let a = sampler_a.rollout(20).expect("valid rollout");
    let b = sampler_b.rollout(20).expect("valid rollout");

    assert_eq!(a.states(), b.states());
    assert_eq!(a.actions(), b.actions());
    assert_eq!(a.len(), 20);
}

#[test]
fn uniform_support_sampling_flattens_skewed_rows() {
    let mut builder = MdpBuilder::new(2, 1);
    builder
        .outcome(0, 0, 0, 0.95, 0.0)
        .and_then(|b| b.outcome(0, 0, 1, 0.05, 0.0))
        .and_then(|b| b.deterministic(1, 0, 1, 0.0))
        .expect("valid outcomes");
    let mdp = builder.build().expect("valid model");

    let mut sampler = TrajectorySampler::new(&mdp, 9).with_mode(ExplorationMode::UniformSupport);
    let trials = 4000;
    let ones = (0..trials)
        .filter(|_| {
            let (next, _) = sampler.step(State::from(0), Action::from(0)).expect("valid pair");
            next == State::from(1)
        })
        .count();
    let freq = ones as f64 / trials as f64;

    assert!((freq - 0.5).abs() < 0.05, "frequency was {freq}");
}

#[test]
fn exact_sampling_matches_stored_probabilities() {
    let spec: MdpSpec = serde_yaml::from_str(VALID_MDP_YAML).expect("valid yaml");
    let mdp = spec.compile().expect("compile should succeed");
    let (s0, go) = (State::from(0), Action::from(1));

    let trials = 10_000;
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    let mut counts = [0usize; 3];
    for _ in 0..trials {
        counts[mdp.sample_transition(s0, go, &mut rng).index()] += 1;
    }
    assert_eq!(counts[0], 0);
    assert!((counts[1] as f64 / trials as f64 - 0.7).abs() < 0.03, "counts were {counts:?}");
    assert!((counts[2] as f64 / trials as f64 - 0.3).abs() < 0.03, "counts were {counts:?}");

    let mut sampler = TrajectorySampler::new(&mdp, 17);
    let to_s1 = (0..trials)
        .filter(|_| {
            let (next, _) = sampler.step(s0, go).expect("valid pair");
            next == State::from(1)
        })
        .count();
    assert!((to_s1 as f64 / trials as f64 - 0.7).abs() < 0.03, "frequency was {to_s1}");
}

#[test]
fn exhaustive_uniform_data_reproduces_relative_frequencies() {
    // Hand-built data: each pair observed 4 times with a fixed next-state pattern.
    let pattern = [0usize, 1, 1, 2];
    let mut data = Vec::new();
    for (s, a) in state_action_pairs(3, 2) {
        for (i, next) in pattern.iter().enumerate() {
            let mut trajectory = Trajectory::new(3, 2);
            trajectory.initialize(s).expect("valid start");
            let reward = (s.index() + a.index() + i) as f64;
            trajectory
                .step(a, reward, State::from((next + s.index()) % 3))
                .expect("valid step");
            data.push(trajectory);
        }
    }

    let mdp = MdpEstimator::default().estimate(3, 2, &data).expect("valid estimate");

    for (s, a) in state_action_pairs(3, 2) {
        let row = mdp.transition_row(s, a);
        let expected = [0.25, 0.5, 0.25];
        for offset in 0..3 {
            assert_eq!(row[(offset + s.index()) % 3], expected[offset]);
        }
        let mean_reward = (s.index() + a.index()) as f64 + 1.5;
        assert!(mdp.reward_row(s, a).iter().all(|r| (r - mean_reward).abs() < 1e-12));
    }
}

#[test]
fn full_blend_returns_the_action_marginal() {
    let mut builder = MdpBuilder::new(3, 2);
    for s in 0..3 {
        builder
            .outcome(s, 0, 0, 0.6, 1.0)
            .and_then(|b| b.outcome(s, 0, 1, 0.4, 1.0))
            .and_then(|b| b.outcome(s, 1, 2, 0.9, 0.0))
            .and_then(|b| b.outcome(s, 1, 1, 0.1, 0.0))
            .expect("valid outcomes");
    }
    let truth = builder.build().expect("valid model");
    let data = TrajectorySampler::new(&truth, 5)
        .exhaustive_probes(3)
        .expect("valid probes");

    let raw = MdpEstimator::default().estimate(3, 2, &data).expect("raw estimate");
    let blended = MdpEstimator::new(EstimatorConfig::with_blend(1.0))
        .and_then(|e| e.estimate(3, 2, &data))
        .expect("blended estimate");
    let marginal = action_marginal(raw.transition_table());

    for (s, a) in state_action_pairs(3, 2) {
        for (p, m) in blended.transition_row(s, a).iter().zip(marginal.row(s, a)) {
            assert!((p - m).abs() < 1e-12);
        }
        let mean: Vec<f64> = (0..3)
            .map(|next| {
                (raw.transition_row(s, Action::from(0))[next]
                    + raw.transition_row(s, Action::from(1))[next])
                    / 2.0
            })
            .collect();
        for (m, expected) in marginal.row(s, a).iter().zip(&mean) {
            assert!((m - expected).abs() < 1e-12);
        }
    }
}

proptest! {
    #[test]
    fn estimated_rows_are_distributions(
        blend in 0.0f64..=1.0,
        steps in proptest::collection::vec((0usize..2, 0usize..4, -3.0f64..3.0), 1..40),
    ) {
        let mut trajectory = Trajectory::new(4, 2);
        trajectory.initialize(State::from(0)).expect("valid start");
        for (action, next, reward) in &steps {
            trajectory.step(Action::from(*action), *reward, State::from(*next)).expect("in range");
        }

        let estimator = MdpEstimator::new(EstimatorConfig::with_blend(blend)).expect("valid blend");
        let mdp = estimator.estimate(4, 2, &[trajectory]).expect("valid estimate");

        for (s, a) in state_action_pairs(4, 2) {
            let sum: f64 = mdp.transition_row(s, a).iter().sum();
            prop_assert!((sum - 1.0).abs() < 1e-9);
            prop_assert!(mdp.transition_row(s, a).iter().all(|p| *p >= 0.0));
        }
    }
}

#[test]
fn bundled_chain_model_compiles_from_disk() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/models/two_state_chain.yaml");
    let mdp = compile_yaml(path).expect("bundled model should compile");

    assert_eq!(mdp.num_states(), 2);
    assert_eq!(mdp.num_actions(), 2);
    assert_eq!(mdp.reward_noise(), 0.0);
    assert_eq!(mdp.transition_row(State::from(0), Action::from(0)), &[1.0, 0.0]);
    assert_eq!(mdp.expected_reward(State::from(0), State::from(0), Action::from(0)), 1.0);
}

#[test]
fn exported_model_file_reads_back() {
    let spec: MdpSpec = serde_yaml::from_str(VALID_MDP_YAML).expect("valid yaml");
    let mdp = spec.compile().expect("compile should succeed");
    let path = std::env::temp_dir().join(format!("vireg-export-{}.yaml", std::process::id()));

    export_yaml(&path, &mdp).expect("temp dir is writable");
    let reread = load_yaml(&path).expect("exported file parses");
    let reloaded = compile_yaml(&path).expect("exported file compiles");
    std::fs::remove_file(&path).expect("temp file exists");

    assert_eq!(reread.states, vec!["s0", "s1", "s2"]);
    assert_eq!(reloaded.transition_table(), mdp.transition_table());
    assert_eq!(reloaded.reward_table(), mdp.reward_table());
}

#[test]
fn file_errors_name_the_path() {
    let path = std::env::temp_dir().join("vireg-no-such-model.yaml");
    let err = compile_yaml(&path).expect_err("file does not exist");

    assert!(matches!(&err, ModelError::Io { path: p, .. } if *p == path));
    assert!(err.to_string().contains("vireg-no-such-model.yaml"));
}
