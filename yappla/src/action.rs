//! Grounded, named actions: a precondition plus one or more possible outcomes.

use std::collections::BTreeMap;

use env_param::EnvParam;

use crate::error::Result;
use crate::expr::CompiledExpr;
use crate::state::State;
use crate::value::Value;

/// Default cost used by [`Action::deterministic_with_default_cost`], mirroring the reference
/// implementation's `cost: int = 10` constructor default. Overridable per call site by using
/// [`Action::deterministic`]/[`Action::non_deterministic`] directly, or globally via the
/// `YAPPLA_DEFAULT_ACTION_COST` environment variable.
pub static YAPPLA_DEFAULT_ACTION_COST: EnvParam<i64> = EnvParam::new("YAPPLA_DEFAULT_ACTION_COST", "10");

/// A single possible outcome of applying an action: the state-variable assignments it writes,
/// and its relative likelihood weight (for display only; this crate does not do probabilistic
/// planning). Cost belongs to the [`Action`], not the outcome: the search charges
/// `action.cost()` uniformly for every outcome of a non-deterministic action.
#[derive(Debug, Clone)]
pub struct Outcome {
    name: String,
    effects: BTreeMap<String, Value>,
    weight: f64,
}

impl Outcome {
    pub fn new(name: impl Into<String>, effects: BTreeMap<String, Value>, weight: f64) -> Self {
        Outcome { name: name.into(), effects, weight }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn effects(&self) -> &BTreeMap<String, Value> {
        &self.effects
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Applies this outcome's effects on top of `state`. A `"?"`/[`Value::Unknown`] effect value
    /// means "this variable's new value is undetermined": it overwrites whatever was there
    /// before with `Unknown`, rather than leaving the old value in place, matching the reference
    /// implementation's merge semantics for `"?"` writes.
    pub fn apply(&self, state: &State) -> State {
        state.with_overrides(&self.effects)
    }
}

/// A named, grounded action: applicable in states where its precondition holds, producing one of
/// its `outcomes` when applied.
#[derive(Debug, Clone)]
pub struct Action {
    name: String,
    precondition: CompiledExpr,
    outcomes: Vec<Outcome>,
    cost: i64,
}

impl Action {
    /// Builds a deterministic action: a single outcome at weight `1.0`.
    pub fn deterministic(
        name: impl Into<String>,
        precondition: &str,
        effects: BTreeMap<String, Value>,
        cost: i64,
    ) -> Result<Self> {
        let name = name.into();
        let outcome = Outcome::new(format!("{name}::outcome"), effects, 1.0);
        Ok(Action {
            precondition: CompiledExpr::compile(precondition)?,
            name,
            outcomes: vec![outcome],
            cost,
        })
    }

    /// Builds a deterministic action using [`YAPPLA_DEFAULT_ACTION_COST`] for the cost,
    /// mirroring the reference implementation's `cost: int = 10` default parameter.
    pub fn deterministic_with_default_cost(
        name: impl Into<String>,
        precondition: &str,
        effects: BTreeMap<String, Value>,
    ) -> Result<Self> {
        Self::deterministic(name, precondition, effects, YAPPLA_DEFAULT_ACTION_COST.get())
    }

    /// Builds an action with several named, weighted outcomes, all charged `cost` uniformly.
    /// `outcomes` must be non-empty; the planner treats every outcome as a distinct successor
    /// edge.
    pub fn non_deterministic(
        name: impl Into<String>,
        precondition: &str,
        outcomes: Vec<Outcome>,
        cost: i64,
    ) -> Result<Self> {
        Ok(Action {
            name: name.into(),
            precondition: CompiledExpr::compile(precondition)?,
            outcomes,
            cost,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn precondition(&self) -> &CompiledExpr {
        &self.precondition
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn cost(&self) -> i64 {
        self.cost
    }

    /// Whether this action's precondition holds in `state`.
    pub fn applicable(&self, state: &State) -> Result<bool> {
        self.precondition.eval_bool(state)
    }

    /// The states reachable by applying this action in `state`, one per outcome. Callers are
    /// expected to have already checked [`Action::applicable`]; this does not re-check the
    /// precondition.
    pub fn possible_outcomes(&self, state: &State) -> impl Iterator<Item = (&Outcome, State)> + '_ {
        let state = state.clone();
        self.outcomes.iter().map(move |o| (o, o.apply(&state)))
    }

    /// Applies this action to `state` and returns the single resulting state, merging across
    /// outcomes when there is more than one: a variable that every outcome assigns the same
    /// value keeps that value, and a variable the outcomes disagree on is set to
    /// [`Value::Unknown`]. This is the only place [`Value::Unknown`] is ever produced; the core
    /// search never calls this method, working instead with the concrete per-outcome states
    /// from [`Action::possible_outcomes`].
    pub fn apply(&self, state: &State) -> State {
        let mut outcomes = self.possible_outcomes(state).map(|(_, s)| s);
        let first = outcomes.next().expect("an action has at least one outcome");
        let Some(second) = outcomes.next() else {
            return first;
        };
        let rest: Vec<State> = std::iter::once(second).chain(outcomes).collect();

        let mut merged = first.clone();
        for (key, value) in first.iter() {
            let agrees = rest.iter().all(|s| s.get(key) == Some(value));
            if !agrees {
                merged.set(key.to_string(), Value::Unknown);
            }
        }
        merged
    }
}
