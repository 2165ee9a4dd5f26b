use crate::consts::SUBSTITUTION_MAX_PASSES;

/// Configuration for a constant substitution run
#[derive(Debug, Clone)]
pub struct SubstitutionConfig {
    /// Restore the value-holder table to its initial snapshot after each
    /// fixpoint pass instead of clearing it. Used when specializing a
    /// constructor clone under a pre-seeded table, so the seeded argument
    /// bindings survive every pass without leaking anything else.
    pub restore_bindings: bool,

    /// Maximum number of fixpoint passes before the run is aborted with
    /// a non-convergence error.
    pub max_passes: usize,
}

impl Default for SubstitutionConfig {
    fn default() -> Self {
        Self {
            restore_bindings: false,
            max_passes: SUBSTITUTION_MAX_PASSES,
        }
    }
}
