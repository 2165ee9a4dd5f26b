//! Scoped table of statically known values
//!
//! Maps a value holder's identity (local, parameter, member, return slot,
//! or access path) to the literal currently believed constant for it,
//! keyed by the scope the binding is valid in. Absence of a constant is a
//! first-class binding: once a holder is marked non-constant in a scope,
//! substitution for it is suppressed there for the rest of the pass.

use crate::ast::{Expr, Literal, NodeId, ScopeId};
use crate::registry::{normalize_member_name, TypeRegistry};
use rustc_hash::FxHashMap;
use std::fmt;

/// Fully-qualified identity of a value holder
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HolderName(String);

impl HolderName {
    /// Local variable or parameter of a method
    pub fn local(class: &str, method: &str, name: &str) -> Self {
        Self(format!("{}.{}().{}", class, method, name))
    }

    /// Field or property, normalized so a property and its backing field
    /// share one identity
    pub fn member(class: &str, name: &str) -> Self {
        Self(format!("{}.{}", class, normalize_member_name(name)))
    }

    /// Conceptual return slot of a method
    pub fn return_slot(class: &str, method: &str) -> Self {
        Self(format!("{}.{}().<return>", class, method))
    }

    /// Extend an access path by one segment
    pub fn join(&self, segment: &str) -> Self {
        Self(format!("{}.{}", self.0, normalize_member_name(segment)))
    }

    pub fn raw(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for HolderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Naming context of the node currently being visited
#[derive(Debug, Clone, Copy)]
pub struct NameScope<'a> {
    pub class: &'a str,
    /// Enclosing method or constructor name; `None` at class level
    /// (field and property initializers)
    pub method: Option<&'a str>,
}

impl<'a> NameScope<'a> {
    pub fn new(class: &'a str, method: Option<&'a str>) -> Self {
        Self { class, method }
    }
}

/// Access-path identity of an expression, if it denotes a value holder.
/// `this.F` resolves to the member identity `Class.F`; a plain identifier
/// resolves to a local of the enclosing method, or to a member of the
/// enclosing class when no such local is in scope.
pub fn holder_path(
    expr: &Expr,
    scope: &NameScope<'_>,
    locals: &FxHashMap<String, crate::ast::TypeRef>,
) -> Option<HolderName> {
    match expr {
        Expr::Identifier(identifier) => {
            if locals.contains_key(&identifier.name) {
                let method = scope.method?;
                Some(HolderName::local(scope.class, method, &identifier.name))
            } else {
                Some(HolderName::member(scope.class, &identifier.name))
            }
        }
        Expr::ThisRef(_) => Some(HolderName::raw(scope.class)),
        Expr::MemberAccess(member_access) => {
            let base = holder_path(&member_access.target, scope, locals)?;
            Some(base.join(&member_access.member))
        }
        Expr::Parenthesized(inner) => holder_path(inner, scope, locals),
        _ => None,
    }
}

/// Declaring-entity identity of a member access: the member name qualified
/// by the class that declares it, resolved through static types
pub fn member_identity(
    target: &Expr,
    member: &str,
    scope: &NameScope<'_>,
    registry: &TypeRegistry,
    locals: &FxHashMap<String, crate::ast::TypeRef>,
) -> Option<HolderName> {
    let target_type = registry.static_type_of(target, scope.class, locals)?;
    if target_type.is_array() {
        return None;
    }
    registry
        .member(&target_type.name, member)
        .map(|_| HolderName::member(&target_type.name, member))
}

/// Scoped map from value holders to statically known literals
#[derive(Debug, Clone, Default)]
pub struct ConstantTable {
    bindings: FxHashMap<HolderName, FxHashMap<ScopeId, Option<Literal>>>,
    node_values: FxHashMap<NodeId, Literal>,
}

impl ConstantTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a candidate constant for a holder in a scope. A second write
    /// to the same holder and scope replaces the earlier value; a binding
    /// already marked non-constant stays non-constant.
    pub fn record_candidate(&mut self, holder: HolderName, scope: ScopeId, value: Literal) {
        let scopes = self.bindings.entry(holder).or_default();
        match scopes.get(&scope) {
            Some(None) => {}
            _ => {
                scopes.insert(scope, Some(value));
            }
        }
    }

    /// Record a candidate under the globally-consistent rule: if a
    /// different literal was already bound for that scope, the binding
    /// becomes non-constant instead of being overwritten.
    pub fn record_exclusive(&mut self, holder: HolderName, scope: ScopeId, value: Literal) {
        let scopes = self.bindings.entry(holder).or_default();
        match scopes.get(&scope) {
            Some(None) => {}
            Some(Some(existing)) if *existing != value => {
                scopes.insert(scope, None);
            }
            Some(Some(_)) => {}
            None => {
                scopes.insert(scope, Some(value));
            }
        }
    }

    /// Mark a holder non-constant in a scope, permanently suppressing
    /// substitution for it there
    pub fn record_non_constant(&mut self, holder: HolderName, scope: ScopeId) {
        self.bindings.entry(holder).or_default().insert(scope, None);
    }

    /// Resolve a holder against the live scope stack, innermost first, so
    /// the closest enclosing scope wins. A successful resolution consumes
    /// the binding: the value must be re-discovered by the next pass if it
    /// is still derivable after rewriting, which is what lets propagation
    /// chain through multiple hops.
    pub fn resolve(&mut self, holder: &HolderName, scope_stack: &[ScopeId]) -> Option<Literal> {
        let scopes = self.bindings.get_mut(holder)?;
        for scope in scope_stack.iter().rev() {
            match scopes.get(scope) {
                Some(Some(_)) => {
                    return scopes.remove(scope).flatten();
                }
                Some(None) => return None,
                None => {}
            }
        }
        None
    }

    /// Whether the holder is bound (constant or not) in any of the scopes
    pub fn is_bound(&self, holder: &HolderName, scope_stack: &[ScopeId]) -> bool {
        match self.bindings.get(holder) {
            Some(scopes) => scope_stack.iter().any(|s| scopes.contains_key(s)),
            None => false,
        }
    }

    /// Record the folded value of a binary or unary operation node
    pub fn record_node_value(&mut self, id: NodeId, value: Literal) {
        if id != NodeId::UNSET {
            self.node_values.insert(id, value);
        }
    }

    /// Take the folded value pending for an operation node, if any
    pub fn take_node_value(&mut self, id: NodeId) -> Option<Literal> {
        self.node_values.remove(&id)
    }

    /// Peek at the folded value pending for an operation node
    pub fn node_value(&self, id: NodeId) -> Option<&Literal> {
        self.node_values.get(&id)
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
        self.node_values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holder() -> HolderName {
        HolderName::local("C", "m", "x")
    }

    #[test]
    fn resolution_picks_closest_enclosing_scope() {
        let mut table = ConstantTable::new();
        table.record_candidate(holder(), ScopeId(1), Literal::Int(1));
        table.record_candidate(holder(), ScopeId(2), Literal::Int(2));

        let stack = [ScopeId(0), ScopeId(1), ScopeId(2)];
        assert_eq!(table.resolve(&holder(), &stack), Some(Literal::Int(2)));
    }

    #[test]
    fn resolution_consumes_the_binding() {
        let mut table = ConstantTable::new();
        table.record_candidate(holder(), ScopeId(1), Literal::Int(7));

        let stack = [ScopeId(0), ScopeId(1)];
        assert_eq!(table.resolve(&holder(), &stack), Some(Literal::Int(7)));
        assert_eq!(table.resolve(&holder(), &stack), None);
    }

    #[test]
    fn resolution_fails_outside_recorded_scopes() {
        let mut table = ConstantTable::new();
        table.record_candidate(holder(), ScopeId(5), Literal::Int(7));

        let stack = [ScopeId(0), ScopeId(1)];
        assert_eq!(table.resolve(&holder(), &stack), None);
    }

    #[test]
    fn exclusive_disagreement_becomes_non_constant() {
        let mut table = ConstantTable::new();
        table.record_exclusive(holder(), ScopeId::ROOT, Literal::Int(5));
        table.record_exclusive(holder(), ScopeId::ROOT, Literal::Int(6));

        assert_eq!(table.resolve(&holder(), &[ScopeId::ROOT]), None);

        // Agreement would have kept the binding alive
        let mut agreeing = ConstantTable::new();
        agreeing.record_exclusive(holder(), ScopeId::ROOT, Literal::Int(5));
        agreeing.record_exclusive(holder(), ScopeId::ROOT, Literal::Int(5));
        assert_eq!(
            agreeing.resolve(&holder(), &[ScopeId::ROOT]),
            Some(Literal::Int(5))
        );
    }

    #[test]
    fn non_constant_suppresses_later_candidates() {
        let mut table = ConstantTable::new();
        table.record_non_constant(holder(), ScopeId(1));
        table.record_candidate(holder(), ScopeId(1), Literal::Int(3));

        assert_eq!(table.resolve(&holder(), &[ScopeId(0), ScopeId(1)]), None);
    }

    #[test]
    fn inner_non_constant_shadows_outer_candidate() {
        let mut table = ConstantTable::new();
        table.record_candidate(holder(), ScopeId(1), Literal::Int(3));
        table.record_non_constant(holder(), ScopeId(2));

        assert_eq!(
            table.resolve(&holder(), &[ScopeId(0), ScopeId(1), ScopeId(2)]),
            None
        );
    }

    #[test]
    fn property_and_backing_field_share_identity() {
        assert_eq!(
            HolderName::member("C", "<Size>k__BackingField"),
            HolderName::member("C", "Size")
        );
    }
}
