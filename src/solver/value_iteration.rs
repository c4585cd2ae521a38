use log::{debug, info};

use crate::Real;
use crate::config::SolverConfig;
use crate::error::SolveError;
use crate::learning::value::ValueFunction;
use crate::mdp::{Mdp, check_model};
use crate::solver::{Solution, greedy_action, greedy_policy};

/// Bellman optimality backups over `states` until the largest change in a
/// sweep drops below `theta`.
///
/// Each sweep reads only the previous sweep's table, so the result does not
/// depend on the order of `states`. Terminal states keep the value 0.
pub fn value_iteration<M: Mdp>(
    model: &M,
    states: &[M::State],
    config: &SolverConfig,
) -> Result<Solution<M::State, M::Action>, SolveError> {
    check_model(model, states)?;

    let mut values: ValueFunction<M::State> = states.iter().map(|s| (s.clone(), 0.0)).collect();
    let mut delta = Real::INFINITY;

    for sweep in 1..=config.max_iterations {
        let next = sweep_values(model, states, &values, config.gamma)?;
        delta = next.max_difference(&values);
        values = next;
        debug!("value iteration sweep {sweep}: delta {delta:e}");

        if delta < config.theta {
            info!(
                "value iteration converged after {sweep} sweeps over {} states",
                states.len()
            );
            let policy = greedy_policy(model, states, &values, config.gamma);
            return Ok(Solution {
                values,
                policy,
                iterations: sweep,
            });
        }
    }

    Err(SolveError::NotConverged {
        iterations: config.max_iterations,
        delta,
    })
}

fn sweep_values<M: Mdp>(
    model: &M,
    states: &[M::State],
    values: &ValueFunction<M::State>,
    gamma: Real,
) -> Result<ValueFunction<M::State>, SolveError> {
    states
        .iter()
        .map(|state| {
            if model.is_terminal(state) {
                return Ok((state.clone(), 0.0));
            }
            let (_, best) = greedy_action(model, values, state, gamma).ok_or_else(|| {
                SolveError::NoLegalActions {
                    state: format!("{state:?}"),
                }
            })?;
            Ok((state.clone(), best))
        })
        .collect()
}
