//! Builds the classic socks-then-shoes domain directly in Rust and solves it with `yappla`.
//!
//! This binary is a usage example, not a format or CLI surface the library commits to: there is
//! no file format for domains, only the programmatic `Domain`/`Action`/`Planner` API.

use std::collections::BTreeMap;
use std::fmt::Formatter;

use anyhow::Result;
use clap::Parser;
use yappla::{Action, Domain, Planner, PlannerOutcome, State, Value};

#[derive(Debug, Parser)]
#[command(name = "feet-and-shoes", rename_all = "kebab-case")]
struct Opt {
    /// Upper bound on search iterations before giving up.
    #[arg(long, default_value_t = 10_000)]
    max_iterations: u64,

    /// Abort with an error instead of a FAILURE outcome if evaluation hits an unbound variable.
    #[arg(long)]
    strict: bool,

    /// Print each action's precondition and effects as the plan is executed.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let opt = Opt::parse();

    tracing_subscriber::fmt()
        .with_max_level(if opt.verbose { tracing::Level::DEBUG } else { tracing::Level::WARN })
        .with_target(false)
        .init();

    let start_time = std::time::Instant::now();

    let domain = feet_and_shoes_domain()?;
    let mut planner = Planner::new()
        .with_max_iterations(opt.max_iterations)
        .with_strict(opt.strict);
    planner.set_domain(domain);

    let initial = State::from([
        ("left_foot", Value::Str("has_nothing".to_string())),
        ("right_foot", Value::Str("has_nothing".to_string())),
    ]);
    let goal = "left_foot == 'has_shoe' and right_foot == 'has_shoe'";

    let result = planner.plan(initial, goal)?;
    let runtime = start_time.elapsed();

    let summary = match result.outcome {
        PlannerOutcome::Success | PlannerOutcome::AlreadyAtGoal => {
            let plan = result.plan.as_ref().expect("success implies a plan");
            println!("Got plan: {} steps", plan.len());
            println!("=============");
            println!("{}", plan.pretty_str());
            Summary { solved: true, steps: Some(plan.len()), iterations: result.stats.iterations, runtime }
        }
        PlannerOutcome::Failure(reason) => {
            println!("No plan found: {reason}");
            Summary { solved: false, steps: None, iterations: result.stats.iterations, runtime }
        }
        PlannerOutcome::Invalid => unreachable!("plan() never returns Invalid"),
    };

    println!("{summary}");
    Ok(())
}

fn feet_and_shoes_domain() -> Result<Domain> {
    let mut domain = Domain::new();
    for (name, side, from, to) in [
        ("put_left_sock", "left_foot", "has_nothing", "has_sock"),
        ("put_right_sock", "right_foot", "has_nothing", "has_sock"),
        ("put_left_shoe", "left_foot", "has_sock", "has_shoe"),
        ("put_right_shoe", "right_foot", "has_sock", "has_shoe"),
    ] {
        let mut effects = BTreeMap::new();
        effects.insert(side.to_string(), Value::Str(to.to_string()));
        domain.add_action(Action::deterministic(
            name,
            &format!("{side} == '{from}'"),
            effects,
            10,
        )?);
    }
    Ok(domain)
}

struct Summary {
    solved: bool,
    steps: Option<usize>,
    iterations: u64,
    runtime: std::time::Duration,
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[summary] solved:{} steps:{} iterations:{} runtime:{}ms",
            self.solved,
            self.steps.map_or_else(|| "_".to_string(), |s| s.to_string()),
            self.iterations,
            self.runtime.as_millis()
        )
    }
}
