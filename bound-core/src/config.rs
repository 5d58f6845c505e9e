#![forbid(unsafe_code)]

/// Knobs shared by the type engine and the constraint engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckConfig {
    /// Upper bound on beta/projection/unfolding steps per inference.
    pub max_reduction_steps: usize,
    /// Upper bound on constraints produced while eliminating one variable.
    pub max_fm_constraints: usize,
    /// Install the model primitive contracts (`ArrGet`, `opAddNat`, ...).
    pub builtin_contracts: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            max_reduction_steps: 10_000,
            max_fm_constraints: 4_096,
            builtin_contracts: true,
        }
    }
}
