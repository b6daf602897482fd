mod property_solver_tests;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use vireg_mdp::{Mdp, MdpBuilder};

pub(super) fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// State 0: action 0 loops with reward 1, action 1 moves to the absorbing state 1.
pub(super) fn two_state_chain() -> Mdp {
    let mut builder = MdpBuilder::new(2, 2);
    builder
        .deterministic(0, 0, 0, 1.0)
        .and_then(|b| b.deterministic(0, 1, 1, 0.0))
        .and_then(|b| b.deterministic(1, 0, 1, 0.0))
        .and_then(|b| b.deterministic(1, 1, 1, 0.0))
        .expect("ids are in range");
    builder.build().expect("chain is a valid model")
}
