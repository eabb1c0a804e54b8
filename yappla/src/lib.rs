//! YAPPLA: a small classical planner doing uniform-cost forward search over symbolic states.
//!
//! ```
//! use std::collections::BTreeMap;
//! use yappla::{Action, Domain, Planner, State, Value};
//!
//! let mut domain = Domain::new();
//! domain.add_action(
//!     Action::deterministic(
//!         "put_left_sock",
//!         "left_foot == 'has_nothing'",
//!         BTreeMap::from([("left_foot".to_string(), Value::Str("has_sock".to_string()))]),
//!         10,
//!     )
//!     .unwrap(),
//! );
//!
//! let mut planner = Planner::new();
//! planner.set_domain(domain);
//! let initial = State::from([("left_foot", Value::Str("has_nothing".to_string()))]);
//! let result = planner.plan(initial, "left_foot == 'has_sock'").unwrap();
//! assert!(result.outcome.is_success());
//! ```

mod action;
mod domain;
mod error;
mod expr;
mod plan;
mod planner;
mod pq;
mod state;
mod value;

pub use action::{Action, Outcome, YAPPLA_DEFAULT_ACTION_COST};
pub use domain::Domain;
pub use error::{Error, Result};
pub use expr::CompiledExpr;
pub use plan::{FailureReason, Plan, PlanEntry, PlannerOutcome, PlannerResult, Stats};
pub use planner::{Planner, YAPPLA_MAX_ITERATIONS};
pub use state::State;
pub use value::Value;
