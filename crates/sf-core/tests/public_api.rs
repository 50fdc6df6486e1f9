//! Items downstream crates import from the crate root.

use std::time::Duration;

use sf_core::{AccumulatingTimer, CancelToken, EquationId, Timer};

#[test]
fn stage_timers_are_reachable_from_root() {
    let stage = Timer::start("select");
    let evals = AccumulatingTimer::new();
    evals.record(Duration::from_millis(5));
    assert_eq!(evals.count(), 1);
    assert!(stage.stop() >= 0.0);
}

#[test]
fn cancel_token_and_ids_are_reachable_from_root() {
    let token = CancelToken::new();
    token.cancel();
    assert!(token.is_cancelled());
    assert_eq!(EquationId::new(14).artifact_name(), "eq_14");
}
