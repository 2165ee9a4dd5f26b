//! Per-instance constructor specialization
//!
//! When an object is instantiated with constant arguments, the matching
//! constructor declaration is cloned, the clone's parameters are seeded
//! with the call's literals in a fresh isolated table, and the full
//! fixpoint is run over the clone alone. The creation site's assignment
//! target then maps to the specialized clone, so later reads of that
//! specific instance's members resolve against the clone's results
//! without contaminating other instances of the same type.

use crate::ast::{
    AssignOp, Block, ClassMember, ConstructorDecl, Expr, Literal, ScopeId, Stmt,
    SyntaxTree,
};
use crate::config::SubstitutionConfig;
use crate::consts::SPECIALIZATION_MAX_DEPTH;
use crate::error::{Error, Result};
use crate::registry::{normalize_member_name, TypeRegistry};
use rustc_hash::FxHashMap;

use super::table::{holder_path, ConstantTable, HolderName};
use super::{ConstantSubstitution, WalkCtx};

/// A constructor clone specialized for one creation site
#[derive(Debug, Clone)]
pub struct SpecializedConstructor {
    /// The substituted clone body, for inspection and diagnostics
    pub constructor: ConstructorDecl,
    /// Member values the clone assigns unconditionally
    members: FxHashMap<String, Literal>,
    /// The argument literals the clone was seeded with
    seed: Vec<Option<Literal>>,
}

/// Map from a creation site's assignment target to its specialized clone.
/// An entry of `None` records a conflict: the holder saw creations with
/// disagreeing arguments and is no longer resolvable per instance.
#[derive(Debug, Clone, Default)]
pub struct SpecializationMap {
    entries: FxHashMap<HolderName, Option<SpecializedConstructor>>,
}

impl SpecializationMap {
    /// Member value of the instance held by `target`, if its creation
    /// site was specialized and the clone pinned the member to a literal
    pub fn member_value(&self, target: &HolderName, member: &str) -> Option<&Literal> {
        match self.entries.get(target)? {
            Some(specialized) => {
                specialized.members.get(normalize_member_name(member))
            }
            None => None,
        }
    }

    pub fn get(&self, target: &HolderName) -> Option<&SpecializedConstructor> {
        self.entries.get(target)?.as_ref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct ConstructorSpecializer<'a> {
    registry: &'a TypeRegistry,
    map: &'a mut SpecializationMap,
    config: &'a SubstitutionConfig,
    depth: usize,
    updates: usize,
}

impl<'a> ConstructorSpecializer<'a> {
    pub fn new(
        registry: &'a TypeRegistry,
        map: &'a mut SpecializationMap,
        config: &'a SubstitutionConfig,
        depth: usize,
    ) -> Self {
        Self { registry, map, config, depth, updates: 0 }
    }

    pub fn run_tree(&mut self, tree: &mut SyntaxTree) -> Result<usize> {
        for class in &tree.classes {
            let class_name = class.name.clone();
            for member in &class.members {
                match member {
                    ClassMember::Method(method) => {
                        if let Some(ref body) = method.body {
                            let mut ctx = WalkCtx::in_method(
                                &class_name,
                                &method.name,
                                &method.parameters,
                            );
                            self.walk_block(body, &mut ctx)?;
                        }
                    }
                    ClassMember::Constructor(constructor) => {
                        let mut ctx = WalkCtx::in_method(
                            &class_name,
                            &constructor.name,
                            &constructor.parameters,
                        );
                        self.walk_block(&constructor.body, &mut ctx)?;
                    }
                    ClassMember::Field(_) | ClassMember::Property(_) => {}
                }
            }
        }
        Ok(self.updates)
    }

    pub fn run_constructor(
        &mut self,
        class: &str,
        constructor: &mut ConstructorDecl,
    ) -> Result<usize> {
        let name = constructor.name.clone();
        let mut ctx = WalkCtx::in_method(class, &name, &constructor.parameters);
        self.walk_block(&constructor.body, &mut ctx)?;
        Ok(self.updates)
    }

    fn walk_block(&mut self, block: &Block, ctx: &mut WalkCtx<'_>) -> Result<()> {
        for stmt in &block.statements {
            self.walk_stmt(stmt, ctx)?;
        }
        Ok(())
    }

    fn walk_stmt(&mut self, stmt: &Stmt, ctx: &mut WalkCtx<'_>) -> Result<()> {
        match stmt {
            Stmt::Expression(expr_stmt) => {
                if let Expr::Assignment(assignment) = &expr_stmt.expr {
                    if assignment.operator == AssignOp::Assign {
                        if let Expr::ObjectCreation(creation) = &*assignment.value {
                            let holder = holder_path(
                                &assignment.target,
                                &ctx.name_scope(),
                                &ctx.locals,
                            );
                            if let Some(holder) = holder {
                                self.specialize_site(holder, creation)?;
                            }
                        }
                    }
                }
            }
            Stmt::Declaration(var_decl) => {
                for var in &var_decl.variables {
                    if let Some(Expr::ObjectCreation(creation)) = var.initializer.as_ref()
                    {
                        if let Some(method) = ctx.method {
                            let holder =
                                HolderName::local(ctx.class, method, &var.name);
                            self.specialize_site(holder, creation)?;
                        }
                    }
                    ctx.locals
                        .insert(var.name.clone(), var_decl.type_ref.clone());
                }
            }
            Stmt::If(if_stmt) => {
                self.walk_stmt(&if_stmt.then_branch, ctx)?;
                if let Some(ref else_branch) = if_stmt.else_branch {
                    self.walk_stmt(else_branch, ctx)?;
                }
            }
            Stmt::While(while_stmt) => self.walk_stmt(&while_stmt.body, ctx)?,
            Stmt::For(for_stmt) => {
                for init in &for_stmt.init {
                    self.walk_stmt(init, ctx)?;
                }
                self.walk_stmt(&for_stmt.body, ctx)?;
            }
            Stmt::Block(block) => self.walk_block(block, ctx)?,
            Stmt::Return(_) | Stmt::Empty => {}
        }
        Ok(())
    }

    fn specialize_site(
        &mut self,
        holder: HolderName,
        creation: &crate::ast::ObjectCreationExpr,
    ) -> Result<()> {
        let class = creation.target_type.name.clone();
        let declaration = match self
            .registry
            .constructor(&class, creation.arguments.len())
        {
            Some(declaration) => declaration.clone(),
            None => return Ok(()),
        };

        let seed: Vec<Option<Literal>> = creation
            .arguments
            .iter()
            .map(|arg| arg.as_literal().cloned())
            .collect();

        match self.map.entries.get(&holder) {
            // A conflicting creation site already killed this holder
            Some(None) => return Ok(()),
            Some(Some(existing)) => {
                if existing.seed == seed {
                    return Ok(());
                }
                if !seed_upgrades(&existing.seed, &seed) {
                    self.map.entries.insert(holder, None);
                    self.updates += 1;
                    return Ok(());
                }
                // Arguments resolved further since the last pass;
                // re-specialize with the richer seed
            }
            None => {}
        }

        if self.depth >= SPECIALIZATION_MAX_DEPTH {
            return Err(Error::non_convergence(
                format!("{}.{}()", class, class),
                SPECIALIZATION_MAX_DEPTH,
            ));
        }

        let mut clone = declaration;
        let mut seeded = ConstantTable::new();
        for (parameter, argument) in clone.parameters.iter().zip(seed.iter()) {
            let parameter_holder = HolderName::local(&class, &class, &parameter.name);
            match argument {
                Some(literal) => seeded.record_exclusive(
                    parameter_holder,
                    ScopeId::ROOT,
                    literal.clone(),
                ),
                None => seeded.record_non_constant(parameter_holder, ScopeId::ROOT),
            }
        }

        tracing::debug!(target_holder = %holder, class = %class, "specializing constructor");
        ConstantSubstitution::specialize_constructor(
            self.registry,
            &class,
            &mut clone,
            seeded,
            self.config,
            self.depth + 1,
        )?;

        let members = harvest_member_values(&clone);
        self.map.entries.insert(
            holder,
            Some(SpecializedConstructor { constructor: clone, members, seed }),
        );
        self.updates += 1;
        Ok(())
    }
}

/// Whether a new seed strictly refines an old one: every argument that was
/// already a literal keeps its value, and at least one unresolved argument
/// became literal
fn seed_upgrades(old: &[Option<Literal>], new: &[Option<Literal>]) -> bool {
    if old.len() != new.len() {
        return false;
    }
    old.iter().zip(new.iter()).all(|(o, n)| match (o, n) {
        (Some(a), Some(b)) => a == b,
        (None, _) => true,
        (Some(_), None) => false,
    })
}

/// Member literals the specialized clone assigns unconditionally at the
/// top level of its body. Conditional writes stay unharvested; when the
/// condition itself was constant, the fixpoint has already folded the
/// taken branch into the top level.
fn harvest_member_values(constructor: &ConstructorDecl) -> FxHashMap<String, Literal> {
    let mut shadowed: rustc_hash::FxHashSet<&str> = constructor
        .parameters
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    for stmt in &constructor.body.statements {
        if let Stmt::Declaration(var_decl) = stmt {
            for var in &var_decl.variables {
                shadowed.insert(var.name.as_str());
            }
        }
    }

    let mut members = FxHashMap::default();
    for stmt in &constructor.body.statements {
        let Stmt::Expression(expr_stmt) = stmt else { continue };
        let Expr::Assignment(assignment) = &expr_stmt.expr else { continue };
        if assignment.operator != AssignOp::Assign {
            continue;
        }
        let Some(literal) = assignment.value.as_literal() else { continue };
        let member = match &*assignment.target {
            Expr::MemberAccess(member_access) => {
                if matches!(*member_access.target, Expr::ThisRef(_)) {
                    Some(member_access.member.as_str())
                } else {
                    None
                }
            }
            Expr::Identifier(identifier)
                if !shadowed.contains(identifier.name.as_str()) =>
            {
                Some(identifier.name.as_str())
            }
            _ => None,
        };
        if let Some(member) = member {
            // Sequential execution: a later write replaces an earlier one
            members.insert(
                normalize_member_name(member).to_string(),
                literal.clone(),
            );
        }
    }
    members
}
