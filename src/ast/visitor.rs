use super::*;

/// AST visitor trait for traversing and processing tree nodes
///
/// Default method bodies perform a plain depth-first walk and return
/// `Output::default()`, so a visitor only overrides the nodes it cares
/// about.
pub trait AstVisitor {
    type Output: Default;

    // Root
    fn visit_tree(&mut self, tree: &SyntaxTree) -> Self::Output {
        for class in &tree.classes {
            self.visit_class_decl(class);
        }
        Self::Output::default()
    }

    // Type declarations and members
    fn visit_class_decl(&mut self, class: &ClassDecl) -> Self::Output {
        for member in &class.members {
            match member {
                ClassMember::Field(f) => self.visit_field_decl(f),
                ClassMember::Property(p) => self.visit_property_decl(p),
                ClassMember::Method(m) => self.visit_method_decl(m),
                ClassMember::Constructor(c) => self.visit_constructor_decl(c),
            };
        }
        Self::Output::default()
    }

    fn visit_field_decl(&mut self, field: &FieldDecl) -> Self::Output {
        if let Some(ref initializer) = field.initializer {
            self.visit_expr(initializer);
        }
        Self::Output::default()
    }

    fn visit_property_decl(&mut self, property: &PropertyDecl) -> Self::Output {
        if let Some(ref initializer) = property.initializer {
            self.visit_expr(initializer);
        }
        Self::Output::default()
    }

    fn visit_method_decl(&mut self, method: &MethodDecl) -> Self::Output {
        for parameter in &method.parameters {
            self.visit_parameter(parameter);
        }
        if let Some(ref body) = method.body {
            self.visit_block(body);
        }
        Self::Output::default()
    }

    fn visit_constructor_decl(&mut self, constructor: &ConstructorDecl) -> Self::Output {
        for parameter in &constructor.parameters {
            self.visit_parameter(parameter);
        }
        self.visit_block(&constructor.body);
        Self::Output::default()
    }

    fn visit_parameter(&mut self, parameter: &Parameter) -> Self::Output {
        if let Some(ref default_value) = parameter.default_value {
            self.visit_expr(default_value);
        }
        Self::Output::default()
    }

    // Statements
    fn visit_block(&mut self, block: &Block) -> Self::Output {
        for stmt in &block.statements {
            self.visit_stmt(stmt);
        }
        Self::Output::default()
    }

    fn visit_stmt(&mut self, stmt: &Stmt) -> Self::Output {
        match stmt {
            Stmt::Expression(expr_stmt) => {
                self.visit_expr(&expr_stmt.expr);
            }
            Stmt::Declaration(var_decl) => {
                for var in &var_decl.variables {
                    if let Some(ref initializer) = var.initializer {
                        self.visit_expr(initializer);
                    }
                }
            }
            Stmt::If(if_stmt) => {
                self.visit_expr(&if_stmt.condition);
                self.visit_stmt(&if_stmt.then_branch);
                if let Some(ref else_branch) = if_stmt.else_branch {
                    self.visit_stmt(else_branch);
                }
            }
            Stmt::While(while_stmt) => {
                self.visit_expr(&while_stmt.condition);
                self.visit_stmt(&while_stmt.body);
            }
            Stmt::For(for_stmt) => {
                for init in &for_stmt.init {
                    self.visit_stmt(init);
                }
                if let Some(ref condition) = for_stmt.condition {
                    self.visit_expr(condition);
                }
                for update in &for_stmt.update {
                    self.visit_expr(update);
                }
                self.visit_stmt(&for_stmt.body);
            }
            Stmt::Return(return_stmt) => {
                if let Some(ref value) = return_stmt.value {
                    self.visit_expr(value);
                }
            }
            Stmt::Block(block) => {
                self.visit_block(block);
            }
            Stmt::Empty => {}
        }
        Self::Output::default()
    }

    // Expressions
    fn visit_expr(&mut self, expr: &Expr) -> Self::Output {
        match expr {
            Expr::Literal(literal) => self.visit_literal_expr(literal),
            Expr::Identifier(identifier) => self.visit_identifier_expr(identifier),
            Expr::ThisRef(this_ref) => self.visit_this_ref_expr(this_ref),
            Expr::Binary(binary) => self.visit_binary_expr(binary),
            Expr::Unary(unary) => self.visit_unary_expr(unary),
            Expr::Assignment(assignment) => self.visit_assignment_expr(assignment),
            Expr::Invocation(invocation) => self.visit_invocation_expr(invocation),
            Expr::MemberAccess(member_access) => self.visit_member_access_expr(member_access),
            Expr::IndexAccess(index_access) => self.visit_index_access_expr(index_access),
            Expr::Cast(cast) => self.visit_cast_expr(cast),
            Expr::ObjectCreation(creation) => self.visit_object_creation_expr(creation),
            Expr::ArrayCreation(creation) => self.visit_array_creation_expr(creation),
            Expr::Parenthesized(inner) => self.visit_expr(inner),
        }
    }

    fn visit_literal_expr(&mut self, _literal: &LiteralExpr) -> Self::Output {
        Self::Output::default()
    }

    fn visit_identifier_expr(&mut self, _identifier: &IdentifierExpr) -> Self::Output {
        Self::Output::default()
    }

    fn visit_this_ref_expr(&mut self, _this_ref: &ThisRefExpr) -> Self::Output {
        Self::Output::default()
    }

    fn visit_binary_expr(&mut self, binary: &BinaryExpr) -> Self::Output {
        self.visit_expr(&binary.left);
        self.visit_expr(&binary.right);
        Self::Output::default()
    }

    fn visit_unary_expr(&mut self, unary: &UnaryExpr) -> Self::Output {
        self.visit_expr(&unary.operand);
        Self::Output::default()
    }

    fn visit_assignment_expr(&mut self, assignment: &AssignmentExpr) -> Self::Output {
        self.visit_expr(&assignment.target);
        self.visit_expr(&assignment.value);
        Self::Output::default()
    }

    fn visit_invocation_expr(&mut self, invocation: &InvocationExpr) -> Self::Output {
        if let Some(ref target) = invocation.target {
            self.visit_expr(target);
        }
        for arg in &invocation.arguments {
            self.visit_expr(arg);
        }
        Self::Output::default()
    }

    fn visit_member_access_expr(&mut self, member_access: &MemberAccessExpr) -> Self::Output {
        self.visit_expr(&member_access.target);
        Self::Output::default()
    }

    fn visit_index_access_expr(&mut self, index_access: &IndexAccessExpr) -> Self::Output {
        self.visit_expr(&index_access.array);
        self.visit_expr(&index_access.index);
        Self::Output::default()
    }

    fn visit_cast_expr(&mut self, cast: &CastExpr) -> Self::Output {
        self.visit_expr(&cast.expr);
        Self::Output::default()
    }

    fn visit_object_creation_expr(&mut self, creation: &ObjectCreationExpr) -> Self::Output {
        for arg in &creation.arguments {
            self.visit_expr(arg);
        }
        Self::Output::default()
    }

    fn visit_array_creation_expr(&mut self, creation: &ArrayCreationExpr) -> Self::Output {
        self.visit_expr(&creation.length);
        Self::Output::default()
    }
}
