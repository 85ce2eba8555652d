use crate::Architecture;

/// Indices into the configured model list for one iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolePair {
    /// Model that critiques the current answer
    pub critic: usize,
    /// Model that produces the next (or seed) answer
    pub generator: usize,
}

/// Resolve which configured model plays which role at a given iteration.
///
/// Pure function over the architecture; callers validate model counts up
/// front, so the returned indices are always in range.
///
/// - `Single`: the one model plays both roles every iteration.
/// - `Dual`: fixed roles, never rotated - models[0] generates, models[1]
///   critiques.
/// - `MultiRotation`: the model at `iteration_index % n` both critiques the
///   current answer and produces the improved one; the next pass moves to
///   the next model in the cycle. Iteration index 0 (the seed) lands on
///   models[0].
pub fn resolve_roles(
    architecture: Architecture,
    model_count: usize,
    iteration_index: usize,
) -> RolePair {
    match architecture {
        Architecture::Single => RolePair {
            critic: 0,
            generator: 0,
        },
        Architecture::Dual => RolePair {
            critic: 1,
            generator: 0,
        },
        Architecture::MultiRotation => {
            let index = iteration_index % model_count;
            RolePair {
                critic: index,
                generator: index,
            }
        }
    }
}
