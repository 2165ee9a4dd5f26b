//! Discovery of globally-valid constants
//!
//! Parameters, fields, properties, and method return slots are observed
//! from many call and use sites, so a constant is retained for them only
//! if every observation program-wide agrees. A single non-literal
//! observation permanently marks the holder non-constant: a global holder
//! cannot be "maybe constant". Writes performed during construction do
//! not kill a member, and read-only members are never killed by writes,
//! since their value is fixed once the constructor has run.

use crate::ast::{
    AssignOp, Block, ClassMember, ConstructorDecl, Expr, MethodDecl, Parameter,
    ScopeId, Stmt, SyntaxTree,
};
use crate::error::Result;
use crate::registry::TypeRegistry;

use super::table::{member_identity, ConstantTable, HolderName};
use super::WalkCtx;

pub struct GlobalHolderPass<'a> {
    registry: &'a TypeRegistry,
    table: &'a mut ConstantTable,
    root: ScopeId,
}

impl<'a> GlobalHolderPass<'a> {
    pub fn new(
        registry: &'a TypeRegistry,
        table: &'a mut ConstantTable,
        root: ScopeId,
    ) -> Self {
        Self { registry, table, root }
    }

    pub fn run_tree(&mut self, tree: &mut SyntaxTree) -> Result<usize> {
        for class in &tree.classes {
            let class_name = class.name.as_str();
            for member in &class.members {
                match member {
                    ClassMember::Field(field) => {
                        let holder = HolderName::member(class_name, &field.name);
                        self.note_initializer(holder, field.initializer.as_ref());
                    }
                    ClassMember::Property(property) => {
                        let holder = HolderName::member(class_name, &property.name);
                        self.note_initializer(holder, property.initializer.as_ref());
                    }
                    ClassMember::Method(method) => {
                        self.run_method(class_name, method)?;
                    }
                    ClassMember::Constructor(constructor) => {
                        let mut ctx = WalkCtx::in_method(
                            class_name,
                            &constructor.name,
                            &constructor.parameters,
                        );
                        ctx.in_constructor = true;
                        self.note_parameter_defaults(
                            class_name,
                            &constructor.name,
                            &constructor.parameters,
                        );
                        self.walk_block(&constructor.body, &mut ctx)?;
                    }
                }
            }
        }
        Ok(0)
    }

    pub fn run_constructor(
        &mut self,
        class: &str,
        constructor: &mut ConstructorDecl,
    ) -> Result<usize> {
        let mut ctx = WalkCtx::in_method(class, &constructor.name, &constructor.parameters);
        ctx.in_constructor = true;
        self.walk_block(&constructor.body, &mut ctx)?;
        Ok(0)
    }

    fn run_method(&mut self, class: &str, method: &MethodDecl) -> Result<()> {
        self.note_parameter_defaults(class, &method.name, &method.parameters);
        let mut ctx = WalkCtx::in_method(class, &method.name, &method.parameters);
        if let Some(ref body) = method.body {
            self.walk_block(body, &mut ctx)?;
        }
        Ok(())
    }

    /// A member initializer runs as part of construction: a literal is an
    /// exclusive observation, a non-literal one does not kill the member
    fn note_initializer(&mut self, holder: HolderName, initializer: Option<&Expr>) {
        if let Some(initializer) = initializer {
            if let Some(literal) = initializer.as_literal() {
                self.table
                    .record_exclusive(holder, self.root, literal.clone());
            }
        }
    }

    fn note_parameter_defaults(
        &mut self,
        class: &str,
        method: &str,
        parameters: &[Parameter],
    ) {
        for parameter in parameters {
            if let Some(ref default_value) = parameter.default_value {
                let holder = HolderName::local(class, method, &parameter.name);
                match default_value.as_literal() {
                    Some(literal) => {
                        self.table
                            .record_exclusive(holder, self.root, literal.clone())
                    }
                    None => self.table.record_non_constant(holder, self.root),
                }
            }
        }
    }

    fn walk_block(&mut self, block: &Block, ctx: &mut WalkCtx<'_>) -> Result<()> {
        for stmt in &block.statements {
            self.walk_stmt(stmt, ctx)?;
        }
        Ok(())
    }

    fn walk_stmt(&mut self, stmt: &Stmt, ctx: &mut WalkCtx<'_>) -> Result<()> {
        match stmt {
            Stmt::Expression(expr_stmt) => self.walk_expr(&expr_stmt.expr, ctx)?,
            Stmt::Declaration(var_decl) => {
                for var in &var_decl.variables {
                    if let Some(ref initializer) = var.initializer {
                        self.walk_expr(initializer, ctx)?;
                    }
                    ctx.locals
                        .insert(var.name.clone(), var_decl.type_ref.clone());
                }
            }
            Stmt::If(if_stmt) => {
                self.walk_expr(&if_stmt.condition, ctx)?;
                self.walk_stmt(&if_stmt.then_branch, ctx)?;
                if let Some(ref else_branch) = if_stmt.else_branch {
                    self.walk_stmt(else_branch, ctx)?;
                }
            }
            Stmt::While(while_stmt) => {
                self.walk_expr(&while_stmt.condition, ctx)?;
                self.walk_stmt(&while_stmt.body, ctx)?;
            }
            Stmt::For(for_stmt) => {
                for init in &for_stmt.init {
                    self.walk_stmt(init, ctx)?;
                }
                if let Some(ref condition) = for_stmt.condition {
                    self.walk_expr(condition, ctx)?;
                }
                for update in &for_stmt.update {
                    self.walk_expr(update, ctx)?;
                }
                self.walk_stmt(&for_stmt.body, ctx)?;
            }
            Stmt::Return(return_stmt) => {
                if let Some(ref value) = return_stmt.value {
                    self.walk_expr(value, ctx)?;
                    if let Some(method) = ctx.method {
                        let slot = HolderName::return_slot(ctx.class, method);
                        match value.as_literal() {
                            Some(literal) => self
                                .table
                                .record_exclusive(slot, self.root, literal.clone()),
                            None => self.table.record_non_constant(slot, self.root),
                        }
                    }
                }
            }
            Stmt::Block(block) => self.walk_block(block, ctx)?,
            Stmt::Empty => {}
        }
        Ok(())
    }

    fn walk_expr(&mut self, expr: &Expr, ctx: &mut WalkCtx<'_>) -> Result<()> {
        match expr {
            Expr::Assignment(assignment) => {
                self.walk_expr(&assignment.target, ctx)?;
                self.walk_expr(&assignment.value, ctx)?;
                self.note_member_write(assignment, ctx);
            }
            Expr::Invocation(invocation) => {
                if let Some(ref target) = invocation.target {
                    self.walk_expr(target, ctx)?;
                }
                for arg in &invocation.arguments {
                    self.walk_expr(arg, ctx)?;
                }
                self.note_invocation_arguments(invocation, ctx);
            }
            Expr::ObjectCreation(creation) => {
                for arg in &creation.arguments {
                    self.walk_expr(arg, ctx)?;
                }
                self.note_creation_arguments(creation);
            }
            Expr::Unary(unary) => {
                self.walk_expr(&unary.operand, ctx)?;
                if unary.operator.is_mutating() {
                    // An increment is a non-literal write to its operand
                    if let Some(holder) = self.member_target(&unary.operand, ctx) {
                        self.kill_member(holder, &unary.operand, ctx);
                    }
                }
            }
            Expr::Binary(binary) => {
                self.walk_expr(&binary.left, ctx)?;
                self.walk_expr(&binary.right, ctx)?;
            }
            Expr::Cast(cast) => self.walk_expr(&cast.expr, ctx)?,
            Expr::MemberAccess(member_access) => {
                self.walk_expr(&member_access.target, ctx)?
            }
            Expr::IndexAccess(index_access) => {
                self.walk_expr(&index_access.array, ctx)?;
                self.walk_expr(&index_access.index, ctx)?;
            }
            Expr::ArrayCreation(creation) => self.walk_expr(&creation.length, ctx)?,
            Expr::Parenthesized(inner) => self.walk_expr(inner, ctx)?,
            Expr::Literal(_) | Expr::Identifier(_) | Expr::ThisRef(_) => {}
        }
        Ok(())
    }

    /// Identity of a field or property the expression writes to, if any
    fn member_target(&self, target: &Expr, ctx: &WalkCtx<'_>) -> Option<HolderName> {
        match target {
            Expr::MemberAccess(member_access) => member_identity(
                &member_access.target,
                &member_access.member,
                &ctx.name_scope(),
                self.registry,
                &ctx.locals,
            ),
            Expr::Identifier(identifier) if !ctx.locals.contains_key(&identifier.name) => {
                self.registry
                    .member(ctx.class, &identifier.name)
                    .map(|_| HolderName::member(ctx.class, &identifier.name))
            }
            Expr::Parenthesized(inner) => self.member_target(inner, ctx),
            _ => None,
        }
    }

    fn note_member_write(
        &mut self,
        assignment: &crate::ast::AssignmentExpr,
        ctx: &WalkCtx<'_>,
    ) {
        let holder = match self.member_target(&assignment.target, ctx) {
            Some(holder) => holder,
            None => return,
        };
        if assignment.operator == AssignOp::Assign {
            if let Some(literal) = assignment.value.as_literal() {
                self.table
                    .record_exclusive(holder, self.root, literal.clone());
                return;
            }
        }
        self.kill_member(holder, &assignment.target, ctx);
    }

    /// Mark a member non-constant for a write that is not a literal,
    /// unless the write happens during construction or the member is
    /// read-only
    fn kill_member(&mut self, holder: HolderName, target: &Expr, ctx: &WalkCtx<'_>) {
        if ctx.in_constructor {
            return;
        }
        if self.is_read_only(target, ctx) {
            return;
        }
        self.table.record_non_constant(holder, self.root);
    }

    fn is_read_only(&self, target: &Expr, ctx: &WalkCtx<'_>) -> bool {
        match target {
            Expr::MemberAccess(member_access) => {
                let target_type = self.registry.static_type_of(
                    &member_access.target,
                    ctx.class,
                    &ctx.locals,
                );
                match target_type {
                    Some(target_type) if !target_type.is_array() => self
                        .registry
                        .member(&target_type.name, &member_access.member)
                        .map(|m| m.read_only)
                        .unwrap_or(false),
                    _ => false,
                }
            }
            Expr::Identifier(identifier) => self
                .registry
                .member(ctx.class, &identifier.name)
                .map(|m| m.read_only)
                .unwrap_or(false),
            Expr::Parenthesized(inner) => self.is_read_only(inner, ctx),
            _ => false,
        }
    }

    fn note_invocation_arguments(
        &mut self,
        invocation: &crate::ast::InvocationExpr,
        ctx: &WalkCtx<'_>,
    ) {
        let callee = match invocation.target {
            Some(ref target) => {
                match self
                    .registry
                    .static_type_of(target, ctx.class, &ctx.locals)
                    .filter(|t| !t.is_array())
                {
                    Some(target_type) => target_type.name,
                    None => return,
                }
            }
            None => ctx.class.to_string(),
        };
        let info = match self.registry.method(&callee, &invocation.method) {
            Some(info) => info.clone(),
            None => return,
        };
        for (arg, (param_name, _)) in
            invocation.arguments.iter().zip(info.parameters.iter())
        {
            let holder = HolderName::local(&callee, &invocation.method, param_name);
            match arg.as_literal() {
                Some(literal) => {
                    self.table
                        .record_exclusive(holder, self.root, literal.clone())
                }
                None => self.table.record_non_constant(holder, self.root),
            }
        }
    }

    fn note_creation_arguments(&mut self, creation: &crate::ast::ObjectCreationExpr) {
        let class = creation.target_type.name.as_str();
        let ctor = match self
            .registry
            .constructor(class, creation.arguments.len())
        {
            Some(ctor) => ctor,
            None => return,
        };
        let params: Vec<String> =
            ctor.parameters.iter().map(|p| p.name.clone()).collect();
        for (arg, param_name) in creation.arguments.iter().zip(params.iter()) {
            let holder = HolderName::local(class, class, param_name);
            match arg.as_literal() {
                Some(literal) => {
                    self.table
                        .record_exclusive(holder, self.root, literal.clone())
                }
                None => self.table.record_non_constant(holder, self.root),
            }
        }
    }
}
