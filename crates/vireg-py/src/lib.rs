#![allow(unsafe_op_in_unsafe_fn)]

use std::cell::RefCell;

use ::vireg_core::{
    EpsilonMixing, Operator, Policy, PolicyEvaluation, Solution, SolverConfig, SolverConfigError,
    SolverError, solve,
};
use ::vireg_mdp::{
    Action, EstimatorConfig, ExplorationMode, Mdp, MdpEstimator, MdpSpec, ModelError, State,
    Trajectory, TrajectorySampler, compile_yaml,
};
use pyo3::exceptions::{PyKeyError, PyValueError};
use pyo3::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn model_err_to_py(err: ModelError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn solver_err_to_py(err: SolverError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn config_err_to_py(err: SolverConfigError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn parse_state(mdp: &Mdp, index: usize) -> PyResult<State> {
    if index >= mdp.num_states() {
        return Err(PyKeyError::new_err(format!("unknown state: {index}")));
    }
    Ok(State::from(index))
}

fn parse_action(mdp: &Mdp, index: usize) -> PyResult<Action> {
    if index >= mdp.num_actions() {
        return Err(PyKeyError::new_err(format!("unknown action: {index}")));
    }
    Ok(Action::from(index))
}

fn parse_mode(value: &str) -> PyResult<ExplorationMode> {
    match value {
        "exact" => Ok(ExplorationMode::Exact),
        "uniform_support" => Ok(ExplorationMode::UniformSupport),
        _ => Err(PyValueError::new_err(
            "invalid mode; expected one of: exact, uniform_support",
        )),
    }
}

fn parse_mixing(value: &str) -> PyResult<EpsilonMixing> {
    match value {
        "sampled" => Ok(EpsilonMixing::Sampled),
        "expected" => Ok(EpsilonMixing::Expected),
        _ => Err(PyValueError::new_err(
            "invalid mixing; expected one of: sampled, expected",
        )),
    }
}

#[pyclass(name = "Mdp", module = "vireg.mdp")]
#[derive(Clone)]
/// Mdp()
/// --
///
/// Immutable, validated MDP over dense state and action ids.
///
/// Build one with `compile_yaml_file`, `compile_yaml_str`, or `estimate`.
pub struct PyMdp {
    inner: Mdp,
}

#[pymethods]
impl PyMdp {
    /// num_states($self, /)
    /// --
    ///
    /// Return the number of states.
    #[pyo3(text_signature = "($self, /)")]
    fn num_states(&self) -> usize {
        self.inner.num_states()
    }

    /// num_actions($self, /)
    /// --
    ///
    /// Return the number of actions.
    #[pyo3(text_signature = "($self, /)")]
    fn num_actions(&self) -> usize {
        self.inner.num_actions()
    }

    /// reward_noise($self, /)
    /// --
    ///
    /// Return the standard deviation of Gaussian reward noise (0 when noise-free).
    #[pyo3(text_signature = "($self, /)")]
    fn reward_noise(&self) -> f64 {
        self.inner.reward_noise()
    }

    /// transition_probability($self, state, next_state, action, /)
    /// --
    ///
    /// Return `T(state, action, next_state)`.
    ///
    /// Raises:
    ///     KeyError: If any id is out of range.
    #[pyo3(text_signature = "($self, state, next_state, action, /)")]
    fn transition_probability(&self, state: usize, next_state: usize, action: usize) -> PyResult<f64> {
        let from = parse_state(&self.inner, state)?;
        let to = parse_state(&self.inner, next_state)?;
        let action = parse_action(&self.inner, action)?;
        Ok(self.inner.transition_probability(from, to, action))
    }

    /// expected_reward($self, state, next_state, action, /)
    /// --
    ///
    /// Return the noise-free reward `R(state, action, next_state)`.
    ///
    /// Raises:
    ///     KeyError: If any id is out of range.
    #[pyo3(text_signature = "($self, state, next_state, action, /)")]
    fn expected_reward(&self, state: usize, next_state: usize, action: usize) -> PyResult<f64> {
        let from = parse_state(&self.inner, state)?;
        let to = parse_state(&self.inner, next_state)?;
        let action = parse_action(&self.inner, action)?;
        Ok(self.inner.expected_reward(from, to, action))
    }

    /// transition_row($self, state, action, /)
    /// --
    ///
    /// Return the next-state distribution of `(state, action)` as a list.
    ///
    /// Raises:
    ///     KeyError: If any id is out of range.
    #[pyo3(text_signature = "($self, state, action, /)")]
    fn transition_row(&self, state: usize, action: usize) -> PyResult<Vec<f64>> {
        let state = parse_state(&self.inner, state)?;
        let action = parse_action(&self.inner, action)?;
        Ok(self.inner.transition_row(state, action).to_vec())
    }

    /// with_reward_noise($self, noise, /)
    /// --
    ///
    /// Return a copy that adds zero-mean Gaussian noise with std `noise` to sampled rewards.
    ///
    /// Raises:
    ///     ValueError: If `noise` is negative or not finite.
    #[pyo3(text_signature = "($self, noise, /)")]
    fn with_reward_noise(&self, noise: f64) -> PyResult<PyMdp> {
        let inner = self
            .inner
            .clone()
            .with_reward_noise(noise)
            .map_err(model_err_to_py)?;
        Ok(PyMdp { inner })
    }

    /// to_yaml($self, /)
    /// --
    ///
    /// Serialize the model to the YAML file format, naming states `s{i}` and actions `a{i}`.
    #[pyo3(text_signature = "($self, /)")]
    fn to_yaml(&self) -> PyResult<String> {
        serde_yaml::to_string(&MdpSpec::from_mdp(&self.inner))
            .map_err(|err| model_err_to_py(ModelError::Yaml(err)))
    }
}

#[pyclass(name = "Trajectory", module = "vireg.mdp")]
#[derive(Clone)]
/// Trajectory(num_states, num_actions, /)
/// --
///
/// One episode of `(state, action, reward, next_state)` steps with per-pair counts.
pub struct PyTrajectory {
    inner: Trajectory,
}

#[pymethods]
impl PyTrajectory {
    #[new]
    #[pyo3(text_signature = "(num_states, num_actions, /)")]
    fn new(num_states: usize, num_actions: usize) -> Self {
        Self {
            inner: Trajectory::new(num_states, num_actions),
        }
    }

    /// initialize($self, state, /)
    /// --
    ///
    /// Set the start state.
    ///
    /// Raises:
    ///     ValueError: If already initialized or `state` is out of range.
    #[pyo3(text_signature = "($self, state, /)")]
    fn initialize(&mut self, state: usize) -> PyResult<()> {
        self.inner
            .initialize(State::from(state))
            .map_err(model_err_to_py)
    }

    /// step($self, action, reward, next_state, /)
    /// --
    ///
    /// Record one step from the current state.
    ///
    /// Raises:
    ///     ValueError: If not initialized or an id is out of range.
    #[pyo3(text_signature = "($self, action, reward, next_state, /)")]
    fn step(&mut self, action: usize, reward: f64, next_state: usize) -> PyResult<()> {
        self.inner
            .step(Action::from(action), reward, State::from(next_state))
            .map_err(model_err_to_py)
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    /// states($self, /)
    /// --
    ///
    /// Return the visited states, starting with the initial state.
    #[pyo3(text_signature = "($self, /)")]
    fn states(&self) -> Vec<usize> {
        self.inner.states().iter().map(|s| s.index()).collect()
    }

    /// actions($self, /)
    /// --
    ///
    /// Return the actions taken, one per step.
    #[pyo3(text_signature = "($self, /)")]
    fn actions(&self) -> Vec<usize> {
        self.inner.actions().iter().map(|a| a.index()).collect()
    }

    /// rewards($self, /)
    /// --
    ///
    /// Return the observed rewards, one per step.
    #[pyo3(text_signature = "($self, /)")]
    fn rewards(&self) -> Vec<f64> {
        self.inner.rewards().to_vec()
    }

    /// visit_count($self, state, action, /)
    /// --
    ///
    /// Return how often `action` was taken in `state`.
    ///
    /// Raises:
    ///     KeyError: If any id is out of range.
    #[pyo3(text_signature = "($self, state, action, /)")]
    fn visit_count(&self, state: usize, action: usize) -> PyResult<u64> {
        let (state, action) = (State::from(state), Action::from(action));
        let visits = self.inner.visit_counts();
        if !visits.contains(state, action) {
            return Err(PyKeyError::new_err(format!(
                "unknown pair: ({}, {})",
                state.index(),
                action.index()
            )));
        }
        Ok(visits.get(state, action))
    }

    /// transition_count($self, state, action, next_state, /)
    /// --
    ///
    /// Return how often `(state, action)` led to `next_state`.
    ///
    /// Raises:
    ///     KeyError: If any id is out of range.
    #[pyo3(text_signature = "($self, state, action, next_state, /)")]
    fn transition_count(&self, state: usize, action: usize, next_state: usize) -> PyResult<u64> {
        let (state, action, next) = (State::from(state), Action::from(action), State::from(next_state));
        let counts = self.inner.transition_counts();
        if !counts.contains(state, action, next) {
            return Err(PyKeyError::new_err(format!(
                "unknown transition: ({}, {}, {})",
                state.index(),
                action.index(),
                next.index()
            )));
        }
        Ok(counts.get(state, action, next))
    }
}

#[pyclass(name = "TrajectorySampler", module = "vireg.mdp")]
/// TrajectorySampler(mdp, seed, mode='exact', /)
/// --
///
/// Seeded data collector over an `Mdp`.
///
/// `mode` is `'exact'` to sample the stored distribution or `'uniform_support'` to sample
/// uniformly among reachable next states.
pub struct PyTrajectorySampler {
    inner: RefCell<TrajectorySampler<Mdp>>,
}

impl PyTrajectorySampler {
    fn check_pair(&self, state: usize, action: usize) -> PyResult<(State, Action)> {
        let sampler = self.inner.borrow();
        Ok((
            parse_state(sampler.mdp(), state)?,
            parse_action(sampler.mdp(), action)?,
        ))
    }
}

#[pymethods]
impl PyTrajectorySampler {
    #[new]
    #[pyo3(signature = (mdp, seed, mode="exact"))]
    #[pyo3(text_signature = "(mdp, seed, mode='exact', /)")]
    fn new(mdp: PyRef<'_, PyMdp>, seed: u64, mode: &str) -> PyResult<Self> {
        let sampler = TrajectorySampler::new(mdp.inner.clone(), seed).with_mode(parse_mode(mode)?);
        Ok(Self {
            inner: RefCell::new(sampler),
        })
    }

    /// step($self, state, action, /)
    /// --
    ///
    /// Sample one transition.
    ///
    /// Returns:
    ///     tuple[int, float]: `(next_state, reward)`.
    ///
    /// Raises:
    ///     KeyError: If any id is out of range.
    #[pyo3(text_signature = "($self, state, action, /)")]
    fn step(&self, state: usize, action: usize) -> PyResult<(usize, f64)> {
        let (state, action) = self.check_pair(state, action)?;
        let (next, reward) = self
            .inner
            .borrow_mut()
            .step(state, action)
            .map_err(model_err_to_py)?;
        Ok((next.index(), reward))
    }

    /// rollout($self, length, /)
    /// --
    ///
    /// Roll out `length` random actions from a random start state.
    #[pyo3(text_signature = "($self, length, /)")]
    fn rollout(&self, length: usize) -> PyResult<PyTrajectory> {
        let inner = self
            .inner
            .borrow_mut()
            .rollout(length)
            .map_err(model_err_to_py)?;
        Ok(PyTrajectory { inner })
    }

    /// rollouts($self, length, count, /)
    /// --
    ///
    /// Collect `count` independent rollouts.
    #[pyo3(text_signature = "($self, length, count, /)")]
    fn rollouts(&self, length: usize, count: usize) -> PyResult<Vec<PyTrajectory>> {
        let data = self
            .inner
            .borrow_mut()
            .rollouts(length, count)
            .map_err(model_err_to_py)?;
        Ok(data.into_iter().map(|inner| PyTrajectory { inner }).collect())
    }

    /// probe($self, state, action, /)
    /// --
    ///
    /// Single-step trajectory taking `action` in `state`.
    ///
    /// Raises:
    ///     KeyError: If any id is out of range.
    #[pyo3(text_signature = "($self, state, action, /)")]
    fn probe(&self, state: usize, action: usize) -> PyResult<PyTrajectory> {
        let (state, action) = self.check_pair(state, action)?;
        let inner = self
            .inner
            .borrow_mut()
            .probe(state, action)
            .map_err(model_err_to_py)?;
        Ok(PyTrajectory { inner })
    }

    /// exhaustive_probes($self, per_pair, /)
    /// --
    ///
    /// `per_pair` single-step probes of every `(state, action)` pair.
    #[pyo3(text_signature = "($self, per_pair, /)")]
    fn exhaustive_probes(&self, per_pair: usize) -> PyResult<Vec<PyTrajectory>> {
        let data = self
            .inner
            .borrow_mut()
            .exhaustive_probes(per_pair)
            .map_err(model_err_to_py)?;
        Ok(data.into_iter().map(|inner| PyTrajectory { inner }).collect())
    }
}

#[pyfunction]
#[pyo3(text_signature = "(path, /)")]
/// compile_yaml_file(path, /)
/// --
///
/// Load and compile an MDP from a YAML file path.
///
/// Raises:
///     ValueError: If file loading, YAML parsing, or MDP validation fails.
fn compile_yaml_file(path: &str) -> PyResult<PyMdp> {
    let mdp = compile_yaml(path).map_err(model_err_to_py)?;
    Ok(PyMdp { inner: mdp })
}

#[pyfunction]
#[pyo3(text_signature = "(yaml, /)")]
/// compile_yaml_str(yaml, /)
/// --
///
/// Compile an MDP directly from a YAML string.
///
/// Raises:
///     ValueError: If YAML parsing or MDP validation fails.
fn compile_yaml_str(yaml: &str) -> PyResult<PyMdp> {
    let spec: MdpSpec =
        serde_yaml::from_str(yaml).map_err(|err| model_err_to_py(ModelError::Yaml(err)))?;
    let mdp = spec.compile().map_err(model_err_to_py)?;
    Ok(PyMdp { inner: mdp })
}

#[pyfunction]
#[pyo3(signature = (trajectories, num_states, num_actions, blend=0.0, unseen_reward=0.5))]
#[pyo3(text_signature = "(trajectories, num_states, num_actions, blend=0.0, unseen_reward=0.5, /)")]
/// estimate(trajectories, num_states, num_actions, blend=0.0, unseen_reward=0.5, /)
/// --
///
/// Estimate an MDP from trajectories by maximum likelihood.
///
/// `blend` mixes every row with the per-state action marginal; unseen pairs get a uniform
/// row and `unseen_reward`.
///
/// Raises:
///     ValueError: If `blend` is outside [0, 1] or a trajectory is larger than the model.
fn estimate(
    trajectories: Vec<PyTrajectory>,
    num_states: usize,
    num_actions: usize,
    blend: f64,
    unseen_reward: f64,
) -> PyResult<PyMdp> {
    let estimator = MdpEstimator::new(EstimatorConfig {
        blend,
        unseen_reward,
    })
    .map_err(model_err_to_py)?;
    let data: Vec<Trajectory> = trajectories.into_iter().map(|t| t.inner).collect();
    let mdp = estimator
        .estimate(num_states, num_actions, &data)
        .map_err(model_err_to_py)?;
    Ok(PyMdp { inner: mdp })
}

#[pyclass(name = "SolverConfig", module = "vireg.solve")]
#[derive(Clone)]
/// SolverConfig(gamma=0.99, tolerance=0.0001, max_sweeps=10000, beta=None, /)
/// --
///
/// Value iteration settings. `beta=None` selects the hard max, otherwise the Boltzmann
/// operator with inverse temperature `beta`.
pub struct PySolverConfig {
    inner: SolverConfig,
}

#[pymethods]
impl PySolverConfig {
    #[new]
    #[pyo3(signature = (gamma=0.99, tolerance=1e-4, max_sweeps=10_000, beta=None))]
    #[pyo3(text_signature = "(gamma=0.99, tolerance=0.0001, max_sweeps=10000, beta=None, /)")]
    fn new(gamma: f64, tolerance: f64, max_sweeps: usize, beta: Option<f64>) -> PyResult<Self> {
        let operator = match beta {
            Some(beta) => Operator::Boltzmann { beta },
            None => Operator::HardMax,
        };
        let inner = SolverConfig {
            gamma,
            tolerance,
            max_sweeps,
            operator,
        };
        inner.validate().map_err(config_err_to_py)?;
        Ok(Self { inner })
    }

    /// from_yaml(yaml, /)
    /// --
    ///
    /// Parse a config from YAML text.
    ///
    /// Raises:
    ///     ValueError: If parsing or validation fails.
    #[staticmethod]
    #[pyo3(text_signature = "(yaml, /)")]
    fn from_yaml(yaml: &str) -> PyResult<Self> {
        let inner = SolverConfig::from_yaml_str(yaml).map_err(config_err_to_py)?;
        Ok(Self { inner })
    }

    #[getter]
    fn gamma(&self) -> f64 {
        self.inner.gamma
    }

    #[getter]
    fn tolerance(&self) -> f64 {
        self.inner.tolerance
    }

    #[getter]
    fn max_sweeps(&self) -> usize {
        self.inner.max_sweeps
    }

    #[getter]
    fn beta(&self) -> Option<f64> {
        match self.inner.operator {
            Operator::HardMax => None,
            Operator::Boltzmann { beta } => Some(beta),
        }
    }
}

#[pyclass(name = "Solution", module = "vireg.solve")]
/// Solution()
/// --
///
/// Values, Q-values, and policies from a finished value iteration run.
pub struct PySolution {
    inner: Solution,
}

#[pymethods]
impl PySolution {
    #[getter]
    fn sweeps(&self) -> usize {
        self.inner.report.sweeps
    }

    #[getter]
    fn converged(&self) -> bool {
        self.inner.report.converged
    }

    #[getter]
    fn final_delta(&self) -> f64 {
        self.inner.report.final_delta
    }

    #[getter]
    fn values(&self) -> Vec<f64> {
        self.inner.values.as_slice().to_vec()
    }

    #[getter]
    fn policy(&self) -> Vec<usize> {
        self.inner.policy.as_slice().iter().map(|a| a.index()).collect()
    }

    /// q($self, /)
    /// --
    ///
    /// Return Q as a list of per-state rows.
    #[pyo3(text_signature = "($self, /)")]
    fn q(&self) -> Vec<Vec<f64>> {
        (0..self.inner.q.num_states())
            .map(|s| self.inner.q.row(State::from(s)).to_vec())
            .collect()
    }

    /// action_probabilities($self, /)
    /// --
    ///
    /// Return the per-state Boltzmann action distribution as a list of rows.
    #[pyo3(text_signature = "($self, /)")]
    fn action_probabilities(&self) -> Vec<Vec<f64>> {
        let policy = &self.inner.stochastic_policy;
        (0..policy.num_states())
            .map(|s| policy.distribution(State::from(s)).to_vec())
            .collect()
    }

    /// to_json($self, /)
    /// --
    ///
    /// Serialize a snapshot of the solution to pretty JSON.
    #[pyo3(text_signature = "($self, /)")]
    fn to_json(&self) -> PyResult<String> {
        self.inner
            .to_json()
            .map_err(|err| PyValueError::new_err(err.to_string()))
    }
}

#[pyfunction]
#[pyo3(signature = (mdp, config, seed=0))]
#[pyo3(text_signature = "(mdp, config, seed=0, /)")]
/// value_iteration(mdp, config, seed=0, /)
/// --
///
/// Solve `mdp` and extract the greedy and Boltzmann policies.
///
/// `seed` drives tie-breaking and reward noise.
fn value_iteration(
    mdp: PyRef<'_, PyMdp>,
    config: PyRef<'_, PySolverConfig>,
    seed: u64,
) -> PyResult<PySolution> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let solution = solve(&mdp.inner, config.inner, &mut rng).map_err(solver_err_to_py)?;
    Ok(PySolution { inner: solution })
}

#[pyfunction]
#[pyo3(signature = (mdp, policy, config, epsilon=0.0, mixing="sampled", seed=0))]
#[pyo3(text_signature = "(mdp, policy, config, epsilon=0.0, mixing='sampled', seed=0, /)")]
/// evaluate_policy(mdp, policy, config, epsilon=0.0, mixing='sampled', seed=0, /)
/// --
///
/// Evaluate a deterministic policy (one action per state) with epsilon-greedy exploration.
///
/// Returns:
///     tuple[list[float], int, bool]: `(values, sweeps, converged)`.
///
/// Raises:
///     ValueError: If the policy does not fit the model or `epsilon` is outside [0, 1].
fn evaluate_policy(
    mdp: PyRef<'_, PyMdp>,
    policy: Vec<usize>,
    config: PyRef<'_, PySolverConfig>,
    epsilon: f64,
    mixing: &str,
    seed: u64,
) -> PyResult<(Vec<f64>, usize, bool)> {
    let policy = Policy::from_actions(policy.into_iter().map(Action::from).collect());
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut evaluation = PolicyEvaluation::new(&mdp.inner, config.inner)
        .and_then(|e| e.with_epsilon(epsilon))
        .map_err(solver_err_to_py)?
        .with_mixing(parse_mixing(mixing)?);

    let report = evaluation
        .evaluate(&policy, &mut rng)
        .map_err(solver_err_to_py)?;
    Ok((
        evaluation.values().as_slice().to_vec(),
        report.sweeps,
        report.converged,
    ))
}

#[pymodule]
fn vireg(py: Python<'_>, module: &Bound<'_, PyModule>) -> PyResult<()> {
    let mdp_mod = PyModule::new_bound(py, "mdp")?;
    mdp_mod.add_class::<PyMdp>()?;
    mdp_mod.add_class::<PyTrajectory>()?;
    mdp_mod.add_class::<PyTrajectorySampler>()?;
    mdp_mod.add_function(wrap_pyfunction!(compile_yaml_file, &mdp_mod)?)?;
    mdp_mod.add_function(wrap_pyfunction!(compile_yaml_str, &mdp_mod)?)?;
    mdp_mod.add_function(wrap_pyfunction!(estimate, &mdp_mod)?)?;

    let solve_mod = PyModule::new_bound(py, "solve")?;
    solve_mod.add_class::<PySolverConfig>()?;
    solve_mod.add_class::<PySolution>()?;
    solve_mod.add_function(wrap_pyfunction!(value_iteration, &solve_mod)?)?;
    solve_mod.add_function(wrap_pyfunction!(evaluate_policy, &solve_mod)?)?;

    module.add_submodule(&mdp_mod)?;
    module.add_submodule(&solve_mod)?;

    let sys_modules = py.import_bound("sys")?.getattr("modules")?;
    sys_modules.set_item("vireg.mdp", &mdp_mod)?;
    sys_modules.set_item("vireg.solve", &solve_mod)?;

    Ok(())
}
