//! Uniform-cost forward search over symbolic states (Dijkstra's algorithm on the state graph).

use std::collections::HashMap;
use std::time::Instant;

use env_param::EnvParam;
use tracing::{debug, instrument, trace};

use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::expr::CompiledExpr;
use crate::plan::{FailureReason, Plan, PlanEntry, PlannerOutcome, PlannerResult, Stats};
use crate::pq::IndexedPriorityQueue;
use crate::state::State;

/// Default bound on search iterations, overridable per `Planner` via [`Planner::with_max_iterations`]
/// or globally via the `YAPPLA_MAX_ITERATIONS` environment variable.
pub static YAPPLA_MAX_ITERATIONS: EnvParam<u64> = EnvParam::new("YAPPLA_MAX_ITERATIONS", "10000");

#[derive(Debug, Clone)]
struct BackPointer {
    prev: Option<State>,
    action: Option<String>,
}

/// Drives a uniform-cost search over a [`Domain`] from an initial [`State`] to a state satisfying
/// a goal expression.
#[derive(Debug, Clone)]
pub struct Planner {
    domain: Option<Domain>,
    max_iterations: u64,
    /// When `true`, an `UnboundVariable` error during search is propagated as `Err` from
    /// `plan`. When `false` (the default), it is instead reported as `PlannerOutcome::Failure`
    /// carrying `FailureReason::EvaluationError`. See `SPEC_FULL.md` §4.6.
    strict: bool,
}

impl Default for Planner {
    fn default() -> Self {
        Planner {
            domain: None,
            max_iterations: YAPPLA_MAX_ITERATIONS.get(),
            strict: false,
        }
    }
}

impl Planner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn set_domain(&mut self, domain: Domain) {
        self.domain = Some(domain);
    }

    /// Runs uniform-cost search from `initial_state` towards `goal`.
    ///
    /// `goal` is compiled once at the start of the call; a malformed goal expression is a fatal
    /// `Err(Error::InvalidExpression)`, not a `PlannerResult::Failure`. Likewise a precondition
    /// that fails to compile would already have been rejected by [`crate::Action`]'s constructor,
    /// so it can never surface here.
    #[instrument(skip(self, initial_state), fields(max_iterations = self.max_iterations, strict = self.strict))]
    pub fn plan(&self, initial_state: State, goal: &str) -> Result<PlannerResult> {
        let domain = self.domain.as_ref().ok_or(Error::NoDomain)?;
        let goal_expr = CompiledExpr::compile(goal)?;
        let started = Instant::now();

        let mut open: IndexedPriorityQueue<State> = IndexedPriorityQueue::new();
        let mut closed: HashMap<State, i64> = HashMap::new();
        let mut back_pointers: HashMap<State, BackPointer> = HashMap::new();

        open.decrease_key(initial_state.clone(), 0);
        back_pointers.insert(initial_state.clone(), BackPointer { prev: None, action: None });

        let mut iterations: u64 = 0;
        loop {
            if self.max_iterations == 0 {
                return Ok(self.failure(FailureReason::IterationLimitExceeded, started, iterations));
            }

            let Some((state, g)) = open.pop() else {
                return Ok(self.failure(FailureReason::OpenExhausted, started, iterations));
            };
            closed.insert(state.clone(), g);

            let goal_reached = match goal_expr.eval_bool(&state) {
                Ok(b) => b,
                Err(e) => return self.handle_eval_error(e, started, iterations),
            };
            if goal_reached {
                let plan = reconstruct_plan(&back_pointers, &state);
                let outcome = if plan.len() <= 1 { PlannerOutcome::AlreadyAtGoal } else { PlannerOutcome::Success };
                debug!(iterations, plan_len = plan.len(), "goal reached");
                return Ok(PlannerResult::new(outcome, Some(plan), self.stats(started, iterations)));
            }

            for action in domain.actions() {
                let applicable = match action.applicable(&state) {
                    Ok(b) => b,
                    Err(e) => return self.handle_eval_error(e, started, iterations),
                };
                if !applicable {
                    continue;
                }
                for (_, successor) in action.possible_outcomes(&state) {
                    if closed.contains_key(&successor) {
                        continue;
                    }
                    let g_new = g + action.cost();
                    let improved = open.decrease_key(successor.clone(), g_new);
                    if improved {
                        trace!(action = action.name(), cost = g_new, "discovered or improved successor");
                        back_pointers.insert(
                            successor,
                            BackPointer { prev: Some(state.clone()), action: Some(action.name().to_string()) },
                        );
                    }
                }
            }

            iterations += 1;
            if iterations >= self.max_iterations {
                return Ok(self.failure(FailureReason::IterationLimitExceeded, started, iterations));
            }
        }
    }

    fn handle_eval_error(&self, e: Error, started: Instant, iterations: u64) -> Result<PlannerResult> {
        if self.strict {
            return Err(e);
        }
        Ok(self.failure(FailureReason::EvaluationError(e.to_string()), started, iterations))
    }

    fn failure(&self, reason: FailureReason, started: Instant, iterations: u64) -> PlannerResult {
        PlannerResult::new(PlannerOutcome::Failure(reason), None, self.stats(started, iterations))
    }

    fn stats(&self, started: Instant, iterations: u64) -> Stats {
        Stats { elapsed_seconds: started.elapsed().as_secs_f64(), iterations }
    }
}

/// Walks the back-pointer table from `goal_state` to the initial state (whose entry has
/// `prev: None`), then reverses the walk into a forward plan.
fn reconstruct_plan(back_pointers: &HashMap<State, BackPointer>, goal_state: &State) -> Plan {
    let mut steps = Vec::new();
    let mut current = goal_state.clone();
    loop {
        let bp = back_pointers
            .get(&current)
            .expect("every enqueued state has a back-pointer entry");
        match &bp.prev {
            None => {
                steps.push(PlanEntry { state: current.clone(), action: None });
                break;
            }
            Some(prev) => {
                steps.push(PlanEntry {
                    state: current.clone(),
                    action: bp.action.clone(),
                });
                current = prev.clone();
            }
        }
    }
    steps.reverse();
    Plan::new(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::value::Value;
    use std::collections::BTreeMap;

    fn effects(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn feet_and_shoes_domain() -> Domain {
        let mut d = Domain::new();
        d.add_action(
            Action::deterministic(
                "put_left_sock",
                "left_foot == 'has_nothing'",
                effects(&[("left_foot", Value::Str("has_sock".into()))]),
                10.0,
            )
            .unwrap(),
        );
        d.add_action(
            Action::deterministic(
                "put_right_sock",
                "right_foot == 'has_nothing'",
                effects(&[("right_foot", Value::Str("has_sock".into()))]),
                10.0,
            )
            .unwrap(),
        );
        d.add_action(
            Action::deterministic(
                "put_left_shoe",
                "left_foot == 'has_sock'",
                effects(&[("left_foot", Value::Str("has_shoe".into()))]),
                10.0,
            )
            .unwrap(),
        );
        d.add_action(
            Action::deterministic(
                "put_right_shoe",
                "right_foot == 'has_sock'",
                effects(&[("right_foot", Value::Str("has_shoe".into()))]),
                10.0,
            )
            .unwrap(),
        );
        d
    }

    #[test]
    fn feet_and_shoes_finds_a_five_entry_plan_at_cost_forty() {
        let mut planner = Planner::new();
        planner.set_domain(feet_and_shoes_domain());
        let initial = State::from([
            ("left_foot", Value::Str("has_nothing".into())),
            ("right_foot", Value::Str("has_nothing".into())),
        ]);
        let result = planner
            .plan(initial, "left_foot == 'has_shoe' and right_foot == 'has_shoe'")
            .unwrap();

        assert_eq!(result.outcome, PlannerOutcome::Success);
        let plan = result.plan.unwrap();
        assert_eq!(plan.len(), 5);
        let total_cost: i64 = plan.actions().count() as i64 * 10;
        assert_eq!(total_cost, 40);
    }

    #[test]
    fn already_at_goal_yields_single_entry_plan() {
        let mut planner = Planner::new();
        planner.set_domain(Domain::new());
        let initial = State::from([("x", Value::Str("done".into()))]);
        let result = planner.plan(initial, "x == 'done'").unwrap();
        assert_eq!(result.outcome, PlannerOutcome::AlreadyAtGoal);
        assert_eq!(result.plan.unwrap().len(), 1);
    }

    #[test]
    fn empty_domain_non_satisfying_initial_state_fails() {
        let mut planner = Planner::new();
        planner.set_domain(Domain::new());
        let initial = State::from([("x", Value::Str("not_done".into()))]);
        let result = planner.plan(initial, "x == 'done'").unwrap();
        assert!(matches!(result.outcome, PlannerOutcome::Failure(FailureReason::OpenExhausted)));
    }

    #[test]
    fn unreachable_goal_fails() {
        let mut d = Domain::new();
        d.add_action(
            Action::deterministic("go", "x == 'b'", effects(&[("x", Value::Str("c".into()))]), 1).unwrap(),
        );
        let mut planner = Planner::new();
        planner.set_domain(d);
        let initial = State::from([("x", Value::Str("a".into()))]);
        let result = planner.plan(initial, "x == 'c'").unwrap();
        assert!(matches!(result.outcome, PlannerOutcome::Failure(FailureReason::OpenExhausted)));
    }

    #[test]
    fn cheaper_action_is_preferred() {
        let mut d = Domain::new();
        d.add_action(
            Action::deterministic("cheap", "True", effects(&[("p", Value::Str("target".into()))]), 1).unwrap(),
        );
        d.add_action(
            Action::deterministic("expensive", "True", effects(&[("p", Value::Str("target".into()))]), 100)
                .unwrap(),
        );
        let mut planner = Planner::new();
        planner.set_domain(d);
        let initial = State::from([("p", Value::Int(0))]);
        let result = planner.plan(initial, "p == 'target'").unwrap();
        let plan = result.plan.unwrap();
        assert_eq!(plan.actions().collect::<Vec<_>>(), vec!["cheap"]);
    }

    #[test]
    fn decrease_key_finds_the_cheaper_predecessor() {
        // Two routes to `mid`: expensive (discovered first, via `start`) and cheap (via
        // `shortcut`, discovered only after `mid` is already open at a higher cost).
        let mut d = Domain::new();
        d.add_action(
            Action::deterministic("to_mid_expensive", "at == 'start'", effects(&[("at", Value::Str("mid".into()))]), 50)
                .unwrap(),
        );
        d.add_action(
            Action::deterministic("to_shortcut", "at == 'start'", effects(&[("at", Value::Str("shortcut".into()))]), 1)
                .unwrap(),
        );
        d.add_action(
            Action::deterministic("shortcut_to_mid", "at == 'shortcut'", effects(&[("at", Value::Str("mid".into()))]), 1)
                .unwrap(),
        );
        d.add_action(
            Action::deterministic("finish", "at == 'mid'", effects(&[("at", Value::Str("end".into()))]), 1).unwrap(),
        );
        let mut planner = Planner::new();
        planner.set_domain(d);
        let initial = State::from([("at", Value::Str("start".into()))]);
        let result = planner.plan(initial, "at == 'end'").unwrap();
        let plan = result.plan.unwrap();
        assert_eq!(
            plan.actions().collect::<Vec<_>>(),
            vec!["to_shortcut", "shortcut_to_mid", "finish"]
        );
    }

    #[test]
    fn non_deterministic_outcome_is_reachable() {
        use crate::action::Outcome;
        let mut d = Domain::new();
        d.add_action(
            Action::non_deterministic(
                "flip",
                "True",
                vec![
                    Outcome::new("heads", effects(&[("x", Value::Str("a".into()))]), 0.5),
                    Outcome::new("tails", effects(&[("x", Value::Str("b".into()))]), 0.5),
                ],
                1,
            )
            .unwrap(),
        );
        let mut planner = Planner::new();
        planner.set_domain(d);
        let initial = State::from([("x", Value::Str("unset".into()))]);
        let result = planner.plan(initial, "x == 'b'").unwrap();
        assert_eq!(result.outcome, PlannerOutcome::Success);
        assert_eq!(result.plan.unwrap().len(), 2);
    }

    #[test]
    fn zero_max_iterations_fails_immediately() {
        let mut planner = Planner::new().with_max_iterations(0);
        let mut d = Domain::new();
        d.add_action(Action::deterministic("go", "True", effects(&[("x", Value::Int(1))]), 1).unwrap());
        planner.set_domain(d);
        let initial = State::from([("x", Value::Int(0))]);
        let result = planner.plan(initial, "x == 1").unwrap();
        assert!(matches!(result.outcome, PlannerOutcome::Failure(FailureReason::IterationLimitExceeded)));
        assert_eq!(result.stats.iterations, 0);
    }

    #[test]
    fn non_strict_unbound_variable_is_a_failure_outcome() {
        let mut planner = Planner::new();
        planner.set_domain(Domain::new());
        let initial = State::from([("x", Value::Int(0))]);
        let result = planner.plan(initial, "missing == 1").unwrap();
        assert!(matches!(
            result.outcome,
            PlannerOutcome::Failure(FailureReason::EvaluationError(_))
        ));
    }

    #[test]
    fn strict_unbound_variable_is_an_error() {
        let mut planner = Planner::new().with_strict(true);
        planner.set_domain(Domain::new());
        let initial = State::from([("x", Value::Int(0))]);
        let err = planner.plan(initial, "missing == 1").unwrap_err();
        assert_eq!(err, Error::UnboundVariable("missing".to_string()));
    }

    #[test]
    fn plan_without_domain_is_an_error() {
        let planner = Planner::new();
        let initial = State::from([("x", Value::Int(0))]);
        let err = planner.plan(initial, "x == 1").unwrap_err();
        assert_eq!(err, Error::NoDomain);
    }
}
