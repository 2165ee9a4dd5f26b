//! In-place rewriting of resolved constants
//!
//! Depth-first walk that performs the actual substitution: reads of value
//! holders are replaced by their resolved literals, folded operations are
//! replaced whole, conditionals with a known condition are spliced away,
//! and array creations with an unresolved length pick the length up from
//! the side table. Assignments are visited after their own sub-expressions
//! so a fresh write only affects subsequent reads, and scope-exit rules
//! are enforced: a write inside a conditional or loop invalidates the
//! holder for every enclosing scope, and nothing is substituted inside a
//! loop body at all, since hardware generation cannot assume a particular
//! iteration count.

use crate::ast::{
    AssignOp, AssignmentExpr, Block, ClassMember, ConstructorDecl, Expr, Literal,
    MethodDecl, Stmt, SyntaxTree,
};
use crate::error::Result;
use crate::registry::TypeRegistry;

use super::array_size::ArraySizeTable;
use super::ctor_map::SpecializationMap;
use super::table::{holder_path, member_identity, ConstantTable, HolderName};
use super::WalkCtx;

pub struct SubstitutionPass<'a> {
    registry: &'a TypeRegistry,
    table: &'a mut ConstantTable,
    sizes: &'a mut ArraySizeTable,
    specializations: &'a SpecializationMap,
    updates: usize,
}

impl<'a> SubstitutionPass<'a> {
    pub fn new(
        registry: &'a TypeRegistry,
        table: &'a mut ConstantTable,
        sizes: &'a mut ArraySizeTable,
        specializations: &'a SpecializationMap,
    ) -> Self {
        Self { registry, table, sizes, specializations, updates: 0 }
    }

    pub fn run_tree(&mut self, tree: &mut SyntaxTree) -> Result<usize> {
        for class in &mut tree.classes {
            let class_name = class.name.clone();
            for member in &mut class.members {
                match member {
                    ClassMember::Field(field) => {
                        if let Some(ref mut initializer) = field.initializer {
                            let mut ctx = WalkCtx::at_class_level(&class_name);
                            self.walk_expr(initializer, &mut ctx)?;
                        }
                    }
                    ClassMember::Property(property) => {
                        if let Some(ref mut initializer) = property.initializer {
                            let mut ctx = WalkCtx::at_class_level(&class_name);
                            self.walk_expr(initializer, &mut ctx)?;
                        }
                    }
                    ClassMember::Method(method) => {
                        self.run_method(&class_name, method)?;
                    }
                    ClassMember::Constructor(constructor) => {
                        self.run_constructor(&class_name, constructor)?;
                    }
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
        ctx.in_constructor = true;
        self.walk_block(&mut constructor.body, &mut ctx)?;
        Ok(self.updates)
    }

    fn run_method(&mut self, class: &str, method: &mut MethodDecl) -> Result<()> {
        let name = method.name.clone();
        let mut ctx = WalkCtx::in_method(class, &name, &method.parameters);
        if let Some(ref mut body) = method.body {
            self.walk_block(body, &mut ctx)?;
        }
        Ok(())
    }

    fn walk_block(&mut self, block: &mut Block, ctx: &mut WalkCtx<'_>) -> Result<()> {
        ctx.scopes.push(block.scope_id);
        let mut i = 0;
        while i < block.statements.len() {
            self.walk_stmt(&mut block.statements[i], ctx)?;

            // A conditional whose condition is now known collapses into
            // the taken branch, spliced into this block; the removal is
            // itself a source of further propagation on the next pass
            if is_foldable_if(&block.statements[i]) {
                let statements = take_branch(&mut block.statements[i]);
                let spliced = statements.len();
                block.statements.splice(i..=i, statements);
                self.updates += 1;
                i += spliced;
                continue;
            }
            i += 1;
        }
        ctx.scopes.pop();
        Ok(())
    }

    fn walk_stmt(&mut self, stmt: &mut Stmt, ctx: &mut WalkCtx<'_>) -> Result<()> {
        match stmt {
            Stmt::Expression(expr_stmt) => {
                // A call in statement position is executed for its
                // effects; only calls in read position are substituted
                if let Expr::Invocation(invocation) = &mut expr_stmt.expr {
                    if let Some(ref mut target) = invocation.target {
                        self.walk_expr(target, ctx)?;
                    }
                    for arg in &mut invocation.arguments {
                        self.walk_expr(arg, ctx)?;
                    }
                } else {
                    self.walk_expr(&mut expr_stmt.expr, ctx)?;
                }
            }
            Stmt::Declaration(var_decl) => {
                let declared = var_decl.type_ref.clone();
                for var in &mut var_decl.variables {
                    if let Some(ref mut initializer) = var.initializer {
                        self.walk_expr(initializer, ctx)?;
                        if let Some(method) = ctx.method {
                            let holder =
                                HolderName::local(ctx.class, method, &var.name);
                            self.backfill_array_length(&holder, initializer);
                            self.note_write(holder, Some(&var.name), initializer, ctx);
                        }
                    }
                    ctx.locals.insert(var.name.clone(), declared.clone());
                }
            }
            Stmt::If(if_stmt) => {
                self.walk_expr(&mut if_stmt.condition, ctx)?;
                ctx.conditional_depth += 1;
                self.walk_stmt(&mut if_stmt.then_branch, ctx)?;
                if let Some(ref mut else_branch) = if_stmt.else_branch {
                    self.walk_stmt(else_branch, ctx)?;
                }
                ctx.conditional_depth -= 1;
            }
            Stmt::While(while_stmt) => {
                ctx.loop_depth += 1;
                self.walk_expr(&mut while_stmt.condition, ctx)?;
                self.walk_stmt(&mut while_stmt.body, ctx)?;
                ctx.loop_depth -= 1;
            }
            Stmt::For(for_stmt) => {
                ctx.loop_depth += 1;
                for init in &mut for_stmt.init {
                    self.walk_stmt(init, ctx)?;
                }
                if let Some(ref mut condition) = for_stmt.condition {
                    self.walk_expr(condition, ctx)?;
                }
                for update in &mut for_stmt.update {
                    self.walk_expr(update, ctx)?;
                }
                self.walk_stmt(&mut for_stmt.body, ctx)?;
                ctx.loop_depth -= 1;
            }
            Stmt::Return(return_stmt) => {
                if let Some(ref mut value) = return_stmt.value {
                    self.walk_expr(value, ctx)?;
                }
            }
            Stmt::Block(block) => self.walk_block(block, ctx)?,
            Stmt::Empty => {}
        }
        Ok(())
    }

    fn walk_expr(&mut self, expr: &mut Expr, ctx: &mut WalkCtx<'_>) -> Result<()> {
        match expr {
            Expr::Identifier(_) => {
                self.try_resolve_read(expr, ctx);
            }
            Expr::MemberAccess(member_access) => {
                self.walk_expr(&mut member_access.target, ctx)?;
                self.try_resolve_read(expr, ctx);
            }
            Expr::Invocation(invocation) => {
                if let Some(ref mut target) = invocation.target {
                    self.walk_expr(target, ctx)?;
                }
                for arg in &mut invocation.arguments {
                    self.walk_expr(arg, ctx)?;
                }
                self.try_resolve_read(expr, ctx);
            }
            Expr::Binary(binary) => {
                self.walk_expr(&mut binary.left, ctx)?;
                self.walk_expr(&mut binary.right, ctx)?;
                if let Some(folded) = self.table.take_node_value(binary.id) {
                    *expr = Expr::literal(folded);
                    self.updates += 1;
                }
            }
            Expr::Unary(unary) => {
                if unary.operator.is_mutating() {
                    // The operand is written through, never substituted
                    ctx.mutating_depth += 1;
                    self.walk_expr(&mut unary.operand, ctx)?;
                    ctx.mutating_depth -= 1;
                    self.invalidate_written(&unary.operand, ctx);
                } else {
                    self.walk_expr(&mut unary.operand, ctx)?;
                    if let Some(folded) = self.table.take_node_value(unary.id) {
                        *expr = Expr::literal(folded);
                        self.updates += 1;
                    }
                }
            }
            Expr::Assignment(assignment) => {
                self.walk_assignment(assignment, ctx)?;
            }
            Expr::Cast(cast) => self.walk_expr(&mut cast.expr, ctx)?,
            Expr::ObjectCreation(creation) => {
                for arg in &mut creation.arguments {
                    self.walk_expr(arg, ctx)?;
                }
            }
            Expr::ArrayCreation(creation) => {
                self.walk_expr(&mut creation.length, ctx)?;
            }
            Expr::IndexAccess(index_access) => {
                self.walk_expr(&mut index_access.array, ctx)?;
                self.walk_expr(&mut index_access.index, ctx)?;
            }
            Expr::Parenthesized(inner) => self.walk_expr(inner, ctx)?,
            Expr::Literal(_) | Expr::ThisRef(_) => {}
        }
        Ok(())
    }

    fn walk_assignment(
        &mut self,
        assignment: &mut AssignmentExpr,
        ctx: &mut WalkCtx<'_>,
    ) -> Result<()> {
        // The left side is a write target, not a read; only index
        // expressions buried in it are read positions
        if let Expr::IndexAccess(index_access) = assignment.target.as_mut() {
            self.walk_expr(&mut index_access.index, ctx)?;
        }
        self.walk_expr(&mut assignment.value, ctx)?;

        let target_name = match assignment.target.as_ref() {
            Expr::Identifier(identifier) => Some(identifier.name.clone()),
            _ => None,
        };
        let holder = match assignment.target.as_ref() {
            Expr::IndexAccess(_) => None,
            target => holder_path(target, &ctx.name_scope(), &ctx.locals),
        };
        let Some(holder) = holder else { return Ok(()) };

        if assignment.operator == AssignOp::Assign {
            self.backfill_array_length(&holder, &mut assignment.value);
            self.note_write(holder, target_name.as_deref(), &assignment.value, ctx);
        } else {
            // A compound assignment writes a value that is not the
            // literal on its right side; the holder is no longer known
            self.table
                .record_non_constant(holder.clone(), ctx.current_scope());
            if target_name.is_some() && ctx.in_branch() {
                for scope in ctx.scopes.iter().skip(1) {
                    self.table.record_non_constant(holder.clone(), *scope);
                }
            }
        }
        Ok(())
    }

    /// Bookkeeping shared by assignments and declarations, applied after
    /// the value side has been rewritten
    fn note_write(
        &mut self,
        holder: HolderName,
        target_name: Option<&str>,
        value: &Expr,
        ctx: &WalkCtx<'_>,
    ) {
        // A literal write refreshes the candidate binding in the
        // innermost enclosing scope
        if let Some(literal) = value.as_literal() {
            self.table
                .record_candidate(holder.clone(), ctx.current_scope(), literal.clone());
        } else if !is_accumulate_pattern(target_name, value) {
            // A non-literal write that is not a simple
            // accumulate-by-constant invalidates the holder here
            self.table
                .record_non_constant(holder.clone(), ctx.current_scope());
        }

        // A write under a conditional or loop cannot be assumed to have
        // happened; the holder becomes non-constant in every enclosing
        // scope of this method
        if target_name.is_some() && ctx.in_branch() {
            for scope in ctx.scopes.iter().skip(1) {
                self.table.record_non_constant(holder.clone(), *scope);
            }
        }
    }

    /// A mutating unary operator writes its operand without a literal
    fn invalidate_written(&mut self, operand: &Expr, ctx: &WalkCtx<'_>) {
        let Some(holder) = holder_path(operand, &ctx.name_scope(), &ctx.locals) else {
            return;
        };
        self.table
            .record_non_constant(holder.clone(), ctx.current_scope());
        if ctx.in_branch() {
            for scope in ctx.scopes.iter().skip(1) {
                self.table.record_non_constant(holder.clone(), *scope);
            }
        }
    }

    /// An array creation whose length did not resolve picks the length up
    /// from the side table when the assignment target's shape is known
    fn backfill_array_length(&mut self, holder: &HolderName, value: &mut Expr) {
        if let Expr::ArrayCreation(creation) = value {
            if !creation.length.is_literal() {
                if let Some(length) = self.sizes.get(holder) {
                    creation.length = Box::new(Expr::literal(Literal::Int(length as i32)));
                    self.updates += 1;
                }
            }
        }
    }

    /// Replace an identifier, member access, or invocation in read
    /// position with its resolved constant, if one is bound. Reads inside
    /// loops are never substituted.
    fn try_resolve_read(&mut self, expr: &mut Expr, ctx: &mut WalkCtx<'_>) {
        if ctx.loop_depth > 0 || ctx.mutating_depth > 0 {
            return;
        }
        let resolved = match expr {
            Expr::Identifier(_) => {
                let holder = holder_path(expr, &ctx.name_scope(), &ctx.locals);
                holder.and_then(|h| self.table.resolve(&h, &ctx.scopes))
            }
            Expr::MemberAccess(member_access) => {
                self.resolve_member_read(member_access, ctx)
            }
            Expr::Invocation(invocation) => {
                let callee = match invocation.target {
                    Some(ref target) => self
                        .registry
                        .static_type_of(target, ctx.class, &ctx.locals)
                        .filter(|t| !t.is_array())
                        .map(|t| t.name),
                    None => Some(ctx.class.to_string()),
                };
                callee.and_then(|class| {
                    let slot = HolderName::return_slot(&class, &invocation.method);
                    self.table.resolve(&slot, &ctx.scopes)
                })
            }
            _ => None,
        };
        if let Some(literal) = resolved {
            *expr = Expr::literal(literal);
            self.updates += 1;
        }
    }

    /// Member reads resolve through the access path, then through the
    /// declaring entity, and finally through the constructor clone mapped
    /// to the enclosing object's creation site
    fn resolve_member_read(
        &mut self,
        member_access: &crate::ast::MemberAccessExpr,
        ctx: &WalkCtx<'_>,
    ) -> Option<Literal> {
        if let Some(path) = holder_path(
            &Expr::MemberAccess(member_access.clone()),
            &ctx.name_scope(),
            &ctx.locals,
        ) {
            if let Some(literal) = self.table.resolve(&path, &ctx.scopes) {
                return Some(literal);
            }
        }

        if let Some(identity) = member_identity(
            &member_access.target,
            &member_access.member,
            &ctx.name_scope(),
            self.registry,
            &ctx.locals,
        ) {
            if let Some(literal) = self.table.resolve(&identity, &ctx.scopes) {
                return Some(literal);
            }
        }

        // Walk up the access chain to the enclosing object whose creation
        // site was specialized for this particular instance
        let target_path =
            holder_path(&member_access.target, &ctx.name_scope(), &ctx.locals)?;
        self.specializations
            .member_value(&target_path, &member_access.member)
            .cloned()
    }
}

/// Whether the value is a self-referencing operation with a literal, the
/// simple accumulate-by-constant shape that keeps its holder derivable
fn is_accumulate_pattern(target_name: Option<&str>, value: &Expr) -> bool {
    let Some(target_name) = target_name else { return false };
    let Expr::Binary(binary) = value else { return false };
    let refers_to_target = |e: &Expr| match e {
        Expr::Identifier(identifier) => identifier.name == target_name,
        _ => false,
    };
    (refers_to_target(&binary.left) && binary.right.is_literal())
        || (refers_to_target(&binary.right) && binary.left.is_literal())
}

fn is_foldable_if(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::If(if_stmt) => {
            matches!(if_stmt.condition.as_literal(), Some(Literal::Bool(_)))
        }
        _ => false,
    }
}

/// Consume a conditional with a known condition, returning the statements
/// of the taken branch with nested block contents inlined
fn take_branch(stmt: &mut Stmt) -> Vec<Stmt> {
    let owned = std::mem::replace(stmt, Stmt::Empty);
    let Stmt::If(if_stmt) = owned else { return Vec::new() };
    let taken = match if_stmt.condition.as_literal() {
        Some(Literal::Bool(true)) => Some(*if_stmt.then_branch),
        Some(Literal::Bool(false)) => if_stmt.else_branch.map(|b| *b),
        _ => None,
    };
    match taken {
        Some(Stmt::Block(block)) => block.statements,
        Some(Stmt::Empty) | None => Vec::new(),
        Some(other) => vec![other],
    }
}
