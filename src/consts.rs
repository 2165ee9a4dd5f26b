// Global safety caps to prevent pathological or infinite loops

use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;

// Substitution: maximum fixpoint passes over one program unit.
// Realistic inputs stabilize within tens of passes; anything beyond this
// is a defect or a pathologically large input.
pub const SUBSTITUTION_MAX_PASSES: usize = 100;

// Substitution: maximum nesting depth for constructor specialization
// (a constructor instantiating further objects with constant arguments)
pub const SPECIALIZATION_MAX_DEPTH: usize = 16;

// Member names that read an array's statically known length
pub static ARRAY_LENGTH_MEMBERS: Lazy<FxHashSet<&'static str>> =
    Lazy::new(|| ["Length", "LongLength"].into_iter().collect());
