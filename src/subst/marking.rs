//! Discovery of locally foldable expressions
//!
//! Depth-first walk that reacts to literals by parent shape: parenthesized
//! literals are unwrapped, casts of literals are folded in place, literal
//! assignments become candidate bindings in the innermost enclosing scope,
//! and literal-with-literal operations are recorded against the operation
//! node so the substitution pass can replace the whole expression. Array
//! lengths are discovered at creation sites and propagated through
//! assignment, argument passing, and return positions.

use crate::ast::{
    AssignOp, Block, ClassMember, ConstructorDecl, Expr, Literal, MethodDecl,
    PrimitiveKind, Stmt, SyntaxTree, TypeRef,
};
use crate::consts::ARRAY_LENGTH_MEMBERS;
use crate::error::Result;
use crate::registry::TypeRegistry;

use super::array_size::ArraySizeTable;
use super::eval;
use super::table::{holder_path, ConstantTable, HolderName};
use super::WalkCtx;

pub struct MarkingPass<'a> {
    registry: &'a TypeRegistry,
    table: &'a mut ConstantTable,
    sizes: &'a mut ArraySizeTable,
    updates: usize,
}

impl<'a> MarkingPass<'a> {
    pub fn new(
        registry: &'a TypeRegistry,
        table: &'a mut ConstantTable,
        sizes: &'a mut ArraySizeTable,
    ) -> Self {
        Self { registry, table, sizes, updates: 0 }
    }

    /// Walk a whole tree; returns the number of tree mutations performed
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

    /// Walk a single constructor declaration (used for specialized clones)
    pub fn run_constructor(
        &mut self,
        class: &str,
        constructor: &mut ConstructorDecl,
    ) -> Result<usize> {
        let name = constructor.name.clone();
        let mut ctx = WalkCtx::in_method(class, &name, &constructor.parameters);
        self.walk_block(&mut constructor.body, &mut ctx)?;
        Ok(self.updates)
    }

    fn run_method(&mut self, class: &str, method: &mut MethodDecl) -> Result<()> {
        let name = method.name.clone();
        let mut ctx = WalkCtx::in_method(class, &name, &method.parameters);
        for parameter in &mut method.parameters {
            if let Some(ref mut default_value) = parameter.default_value {
                self.walk_expr(default_value, &mut ctx)?;
            }
        }
        if let Some(ref mut body) = method.body {
            self.walk_block(body, &mut ctx)?;
        }
        Ok(())
    }

    fn walk_block(&mut self, block: &mut Block, ctx: &mut WalkCtx<'_>) -> Result<()> {
        ctx.scopes.push(block.scope_id);
        for stmt in &mut block.statements {
            self.walk_stmt(stmt, ctx)?;
        }
        ctx.scopes.pop();
        Ok(())
    }

    fn walk_stmt(&mut self, stmt: &mut Stmt, ctx: &mut WalkCtx<'_>) -> Result<()> {
        match stmt {
            Stmt::Expression(expr_stmt) => self.walk_expr(&mut expr_stmt.expr, ctx)?,
            Stmt::Declaration(var_decl) => {
                let declared = var_decl.type_ref.clone();
                for var in &mut var_decl.variables {
                    if let Some(ref mut initializer) = var.initializer {
                        self.walk_expr(initializer, ctx)?;
                        if let Some(method) = ctx.method {
                            let holder =
                                HolderName::local(ctx.class, method, &var.name);
                            self.note_written(holder, &declared, initializer, ctx);
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
                    // Returned arrays carry their known length out through
                    // the method's return slot
                    if let Some(method) = ctx.method {
                        let slot = HolderName::return_slot(ctx.class, method);
                        self.propagate_size_into(slot, value, ctx);
                    }
                }
            }
            Stmt::Block(block) => self.walk_block(block, ctx)?,
            Stmt::Empty => {}
        }
        Ok(())
    }

    fn walk_expr(&mut self, expr: &mut Expr, ctx: &mut WalkCtx<'_>) -> Result<()> {
        match expr {
            Expr::Parenthesized(inner) => {
                self.walk_expr(inner, ctx)?;
                if inner.is_literal() {
                    let unwrapped = std::mem::replace(
                        inner.as_mut(),
                        Expr::literal(Literal::Null),
                    );
                    *expr = unwrapped;
                    self.updates += 1;
                }
            }
            Expr::Cast(cast) => {
                self.walk_expr(&mut cast.expr, ctx)?;
                if let Some(kind) = cast.target_type.primitive_kind() {
                    if let Some(value) = cast.expr.as_literal() {
                        let folded = eval::eval_cast(kind, value)?;
                        *expr = Expr::literal(folded);
                        self.updates += 1;
                    }
                }
            }
            Expr::Binary(binary) => {
                self.walk_expr(&mut binary.left, ctx)?;
                self.walk_expr(&mut binary.right, ctx)?;
                if let (Some(left), Some(right)) =
                    (binary.left.as_literal(), binary.right.as_literal())
                {
                    let folded = eval::eval_binary(binary.operator, left, right)?;
                    self.table.record_node_value(binary.id, folded);
                }
            }
            Expr::Unary(unary) => {
                self.walk_expr(&mut unary.operand, ctx)?;
                if !unary.operator.is_mutating() {
                    if let Some(operand) = unary.operand.as_literal() {
                        let folded = eval::eval_unary(unary.operator, operand)?;
                        self.table.record_node_value(unary.id, folded);
                    }
                }
            }
            Expr::Assignment(assignment) => {
                self.walk_expr(&mut assignment.target, ctx)?;
                self.walk_expr(&mut assignment.value, ctx)?;
                if assignment.operator == AssignOp::Assign {
                    self.note_assignment(assignment, ctx);
                }
            }
            Expr::Invocation(invocation) => {
                if let Some(ref mut target) = invocation.target {
                    self.walk_expr(target, ctx)?;
                }
                for arg in &mut invocation.arguments {
                    self.walk_expr(arg, ctx)?;
                }
                self.propagate_argument_sizes(invocation, ctx);
            }
            Expr::ObjectCreation(creation) => {
                for arg in &mut creation.arguments {
                    self.walk_expr(arg, ctx)?;
                }
                self.propagate_creation_argument_sizes(creation, ctx);
            }
            Expr::ArrayCreation(creation) => {
                self.walk_expr(&mut creation.length, ctx)?;
            }
            Expr::MemberAccess(member_access) => {
                self.walk_expr(&mut member_access.target, ctx)?;
                if ARRAY_LENGTH_MEMBERS.contains(member_access.member.as_str()) {
                    let source =
                        holder_path(&member_access.target, &ctx.name_scope(), &ctx.locals);
                    if let Some(source) = source {
                        if let Some(length) = self.sizes.get(&source) {
                            let value = if member_access.member == "LongLength" {
                                Literal::Long(length as i64)
                            } else {
                                Literal::Int(length as i32)
                            };
                            self.table.record_candidate(
                                source.join(&member_access.member),
                                ctx.current_scope(),
                                value,
                            );
                        }
                    }
                }
            }
            Expr::IndexAccess(index_access) => {
                self.walk_expr(&mut index_access.array, ctx)?;
                self.walk_expr(&mut index_access.index, ctx)?;
            }
            Expr::Literal(_) | Expr::Identifier(_) | Expr::ThisRef(_) => {}
        }
        Ok(())
    }

    /// Candidate and array-size bookkeeping for a plain assignment
    fn note_assignment(
        &mut self,
        assignment: &crate::ast::AssignmentExpr,
        ctx: &mut WalkCtx<'_>,
    ) {
        if matches!(*assignment.target, Expr::IndexAccess(_)) {
            return;
        }
        let holder = match holder_path(&assignment.target, &ctx.name_scope(), &ctx.locals) {
            Some(holder) => holder,
            None => return,
        };
        let declared = self
            .registry
            .static_type_of(&assignment.target, ctx.class, &ctx.locals);
        let declared = match declared {
            Some(declared) => declared,
            None => return,
        };
        self.note_written(holder, &declared, &assignment.value, ctx);
    }

    /// Shared bookkeeping for declarations and assignments: record literal
    /// candidates and track array shapes flowing into the written holder
    fn note_written(
        &mut self,
        holder: HolderName,
        declared: &TypeRef,
        value: &Expr,
        ctx: &mut WalkCtx<'_>,
    ) {
        if let Some(literal) = value.as_literal() {
            if bool_numeric_mismatch(declared.primitive_kind(), literal) {
                // A re-derived condition value cannot keep its old binding
                self.table
                    .record_non_constant(holder, ctx.current_scope());
            } else {
                self.table
                    .record_candidate(holder, ctx.current_scope(), literal.clone());
            }
            return;
        }

        // The written value came out of a binary fold this walk already
        // evaluated; a shape mismatch with the declared type means the
        // holder must be re-derived rather than substituted
        if let Expr::Binary(binary) = value {
            if let Some(folded) = self.table.node_value(binary.id) {
                if bool_numeric_mismatch(declared.primitive_kind(), folded) {
                    self.table
                        .record_non_constant(holder.clone(), ctx.current_scope());
                }
            }
        }

        if declared.is_array() {
            match value {
                Expr::ArrayCreation(creation) => {
                    if let Some(length) = creation.length.as_literal() {
                        if let Some(length) = literal_length(length) {
                            if self.sizes.record(holder, length) {
                                self.updates += 1;
                            }
                        }
                    }
                    // A creation with an unresolved length is left alone:
                    // the substitution pass may later fill the length in
                    // from this holder's known size
                }
                other => {
                    self.propagate_size_into(holder, other, ctx);
                }
            }
        }
    }

    /// Copy a known array length from `value`'s holder (or return slot)
    /// into `destination`; an array-typed source with no known length
    /// invalidates the destination
    fn propagate_size_into(
        &mut self,
        destination: HolderName,
        value: &Expr,
        ctx: &WalkCtx<'_>,
    ) {
        let changed = match value {
            Expr::ArrayCreation(creation) => match creation.length.as_literal() {
                Some(length) => match literal_length(length) {
                    Some(length) => self.sizes.record(destination, length),
                    None => false,
                },
                None => false,
            },
            Expr::Invocation(invocation) => {
                let callee = self.invocation_callee(invocation, ctx);
                match callee {
                    Some(class) => {
                        let slot = HolderName::return_slot(&class, &invocation.method);
                        match self.sizes.get(&slot) {
                            Some(length) => self.sizes.record(destination, length),
                            None => self.sizes.invalidate(destination),
                        }
                    }
                    None => self.sizes.invalidate(destination),
                }
            }
            other => match holder_path(other, &ctx.name_scope(), &ctx.locals) {
                Some(source) => match self.sizes.get(&source) {
                    Some(length) => self.sizes.record(destination, length),
                    None => self.sizes.invalidate(destination),
                },
                None => self.sizes.invalidate(destination),
            },
        };
        if changed {
            self.updates += 1;
        }
    }

    /// Class whose method an invocation targets, as far as static types
    /// resolve it
    fn invocation_callee(
        &self,
        invocation: &crate::ast::InvocationExpr,
        ctx: &WalkCtx<'_>,
    ) -> Option<String> {
        match invocation.target {
            Some(ref target) => self
                .registry
                .static_type_of(target, ctx.class, &ctx.locals)
                .filter(|t| !t.is_array())
                .map(|t| t.name),
            None => Some(ctx.class.to_string()),
        }
    }

    /// Arrays passed as arguments carry their known length into the
    /// callee's parameters
    fn propagate_argument_sizes(
        &mut self,
        invocation: &crate::ast::InvocationExpr,
        ctx: &WalkCtx<'_>,
    ) {
        let callee = match self.invocation_callee(invocation, ctx) {
            Some(callee) => callee,
            None => return,
        };
        let info = match self.registry.method(&callee, &invocation.method) {
            Some(info) => info.clone(),
            None => return,
        };
        for (arg, (param_name, param_type)) in
            invocation.arguments.iter().zip(info.parameters.iter())
        {
            if param_type.is_array() {
                let destination =
                    HolderName::local(&callee, &invocation.method, param_name);
                self.propagate_size_into(destination, arg, ctx);
            }
        }
    }

    fn propagate_creation_argument_sizes(
        &mut self,
        creation: &crate::ast::ObjectCreationExpr,
        ctx: &WalkCtx<'_>,
    ) {
        let class = creation.target_type.name.clone();
        let ctor = match self
            .registry
            .constructor(&class, creation.arguments.len())
        {
            Some(ctor) => ctor,
            None => return,
        };
        let params: Vec<(String, TypeRef)> = ctor
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.type_ref.clone()))
            .collect();
        for (arg, (param_name, param_type)) in
            creation.arguments.iter().zip(params.iter())
        {
            if param_type.is_array() {
                let destination = HolderName::local(&class, &class, param_name);
                self.propagate_size_into(destination, arg, ctx);
            }
        }
    }
}

/// Whether a declared type and a candidate value disagree on being boolean
fn bool_numeric_mismatch(declared: Option<PrimitiveKind>, value: &Literal) -> bool {
    match declared {
        Some(PrimitiveKind::Bool) => !value.is_bool(),
        Some(_) => value.is_bool(),
        None => false,
    }
}

/// Array length from a creation's literal length argument
fn literal_length(literal: &Literal) -> Option<u64> {
    match literal {
        Literal::Int(v) if *v >= 0 => Some(*v as u64),
        Literal::Long(v) if *v >= 0 => Some(*v as u64),
        Literal::UInt(v) => Some(*v as u64),
        Literal::ULong(v) => Some(*v),
        Literal::Short(v) if *v >= 0 => Some(*v as u64),
        Literal::UShort(v) => Some(*v as u64),
        Literal::Byte(v) => Some(*v as u64),
        Literal::SByte(v) if *v >= 0 => Some(*v as u64),
        _ => None,
    }
}
