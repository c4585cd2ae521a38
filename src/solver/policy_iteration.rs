use log::{debug, info};

use crate::Real;
use crate::config::SolverConfig;
use crate::error::SolveError;
use crate::learning::policy::PolicyMap;
use crate::learning::value::ValueFunction;
use crate::mdp::{Mdp, check_model};
use crate::solver::{Solution, greedy_action, q_value};

/// Alternates policy evaluation and greedy improvement until no state
/// changes its action.
///
/// The initial policy takes the first legal action everywhere. That policy
/// may never terminate when `gamma` is 1, so an evaluation that runs out of
/// `max_evaluation_sweeps` hands its truncated values to the improvement
/// step instead of failing. The result is only accepted once an evaluation
/// has converged and the policy is stable under it. Running out of
/// `max_iterations` improvement rounds fails with
/// [`SolveError::NotConverged`].
pub fn policy_iteration<M: Mdp>(
    model: &M,
    states: &[M::State],
    config: &SolverConfig,
) -> Result<Solution<M::State, M::Action>, SolveError> {
    check_model(model, states)?;

    let mut policy: PolicyMap<M::State, M::Action> = states
        .iter()
        .filter(|state| !model.is_terminal(state))
        .filter_map(|state| {
            let first = model.legal_actions(state).into_iter().next()?;
            Some((state.clone(), first))
        })
        .collect();
    let mut values: ValueFunction<M::State> = states.iter().map(|s| (s.clone(), 0.0)).collect();
    let mut delta = Real::INFINITY;

    for round in 1..=config.max_iterations {
        let (evaluated, last_sweep) =
            evaluate_sweeps(model, states, &policy, values.clone(), config)?;
        let evaluated_fully = last_sweep < config.theta;
        if !evaluated_fully {
            debug!(
                "policy iteration round {round}: evaluation stopped after {} sweeps at change {last_sweep:e}",
                config.max_evaluation_sweeps
            );
        }
        delta = evaluated.max_difference(&values);
        values = evaluated;

        let stable = improve(model, states, &values, config.gamma, config.theta, &mut policy);
        debug!("policy iteration round {round}: value change {delta:e}, stable {stable}");
        if stable && evaluated_fully {
            info!(
                "policy iteration converged after {round} rounds over {} states",
                states.len()
            );
            return Ok(Solution {
                values,
                policy,
                iterations: round,
            });
        }
    }

    Err(SolveError::NotConverged {
        iterations: config.max_iterations,
        delta,
    })
}

/// Expectation backups under `policy`, starting from `values`, until the
/// largest change in a sweep drops below `theta`.
///
/// Fails with [`SolveError::NotConverged`] after `max_evaluation_sweeps`.
pub fn evaluate<M: Mdp>(
    model: &M,
    states: &[M::State],
    policy: &PolicyMap<M::State, M::Action>,
    values: ValueFunction<M::State>,
    config: &SolverConfig,
) -> Result<ValueFunction<M::State>, SolveError> {
    let (values, delta) = evaluate_sweeps(model, states, policy, values, config)?;
    if delta < config.theta {
        Ok(values)
    } else {
        Err(SolveError::NotConverged {
            iterations: config.max_evaluation_sweeps,
            delta,
        })
    }
}

/// At most `max_evaluation_sweeps` backups under `policy`. Returns the values
/// and the change made by the last sweep.
fn evaluate_sweeps<M: Mdp>(
    model: &M,
    states: &[M::State],
    policy: &PolicyMap<M::State, M::Action>,
    mut values: ValueFunction<M::State>,
    config: &SolverConfig,
) -> Result<(ValueFunction<M::State>, Real), SolveError> {
    let mut delta = Real::INFINITY;
    for _ in 0..config.max_evaluation_sweeps {
        let next = states
            .iter()
            .map(|state| {
                if model.is_terminal(state) {
                    return Ok((state.clone(), 0.0));
                }
                let action = policy.get(state).ok_or_else(|| SolveError::NoLegalActions {
                    state: format!("{state:?}"),
                })?;
                Ok((state.clone(), q_value(model, &values, state, action, config.gamma)))
            })
            .collect::<Result<ValueFunction<M::State>, SolveError>>()?;
        delta = next.max_difference(&values);
        values = next;
        if delta < config.theta {
            break;
        }
    }
    Ok((values, delta))
}

/// Makes `policy` greedy with respect to `values` and reports whether every
/// state kept its action.
///
/// A state switches only when the greedy action beats its current action by
/// more than `tolerance`, so evaluation noise between equally good actions
/// cannot make the loop cycle.
pub fn improve<M: Mdp>(
    model: &M,
    states: &[M::State],
    values: &ValueFunction<M::State>,
    gamma: Real,
    tolerance: Real,
    policy: &mut PolicyMap<M::State, M::Action>,
) -> bool {
    let mut stable = true;
    for state in states.iter().filter(|state| !model.is_terminal(state)) {
        let Some((best, best_q)) = greedy_action(model, values, state, gamma) else {
            continue;
        };
        let keep = match policy.get(state) {
            Some(current) if current == best => true,
            Some(current) => best_q - q_value(model, values, state, current, gamma) <= tolerance,
            None => false,
        };
        if !keep {
            policy.insert(state.clone(), best);
            stable = false;
        }
    }
    stable
}
