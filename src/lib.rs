//! Silicon Compiler front end (silc)
//!
//! Constant-value propagation and substitution for hardware synthesis:
//! takes a decompiled, statically-typed program tree and resolves as many
//! values as possible at compile time, so the generated device needs
//! fewer registers, comparators, and arithmetic units.
//!
//! ## Architecture
//!
//! - **ast**: the typed program tree, its visitor, and the canonical
//!   printer used for fixpoint detection
//! - **registry**: the type-declaration lookup table resolving member
//!   references to their declaring entities
//! - **subst**: the substitution engine — value-holder and array-size
//!   tables, the literal evaluator, and the four passes driven to a
//!   fixed point
//!
//! ## Flow
//!
//! ```text
//! Decompiled tree → {marking → constructor specialization →
//!     global holders → substitution} … repeated until stable
//!   → rewritten tree + array-size table
//! ```
//!
//! The engine mutates the tree in place and is conservative: it only
//! removes the need to store a value, never changes semantics, and leaves
//! a holder non-constant whenever observations disagree.

pub mod ast;
pub mod config;
pub mod consts;
pub mod error;
pub mod registry;
pub mod subst;

pub use config::SubstitutionConfig;
pub use error::{Error, Result};
pub use registry::TypeRegistry;
pub use subst::{ArraySizeTable, ConstantSubstitution, HolderName};

use ast::SyntaxTree;

/// Run constant substitution over a tree with a caller-supplied
/// declaration table. The tree is rewritten in place; the returned
/// array-size table is consumed by the downstream hardware-description
/// generator.
pub fn substitute_constants(
    tree: &mut SyntaxTree,
    registry: &TypeRegistry,
    config: &SubstitutionConfig,
) -> Result<ArraySizeTable> {
    let mut engine = ConstantSubstitution::new(registry, config.clone());
    engine.process(tree)?;
    Ok(engine.into_array_sizes())
}

/// Convenience entry point deriving the declaration table from the tree
/// itself
pub fn substitute(
    tree: &mut SyntaxTree,
    config: &SubstitutionConfig,
) -> Result<ArraySizeTable> {
    let registry = TypeRegistry::build(tree);
    substitute_constants(tree, &registry, config)
}
