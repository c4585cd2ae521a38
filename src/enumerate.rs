use std::collections::HashSet;
use std::hash::Hash;

/// Every state reachable from `initial` by repeatedly applying `expand`.
///
/// Uses an explicit stack, so deep state graphs cannot overflow the call
/// stack. Each state is expanded once, which also makes cycles safe.
pub fn reachable<S, I, F>(initial: S, mut expand: F) -> HashSet<S>
where
    S: Clone + Eq + Hash,
    I: IntoIterator<Item = S>,
    F: FnMut(&S) -> I,
{
    let mut visited = HashSet::new();
    let mut stack = vec![initial];
    while let Some(state) = stack.pop() {
        if visited.contains(&state) {
            continue;
        }
        for next in expand(&state) {
            if !visited.contains(&next) {
                stack.push(next);
            }
        }
        visited.insert(state);
    }
    visited
}
