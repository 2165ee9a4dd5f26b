use super::nodes::*;
use super::visitor::AstVisitor;
use super::SyntaxTree;
use std::fmt;

/// AST printer producing the canonical textual form of a tree
///
/// The output doubles as a debugging aid and as the comparison key for
/// fixpoint detection: two passes over a tree produced the same result
/// exactly when they produce the same printed form.
pub struct AstPrinter {
    indent_level: usize,
    output: String,
}

impl AstPrinter {
    pub fn new() -> Self {
        Self {
            indent_level: 0,
            output: String::new(),
        }
    }

    pub fn print(&mut self, tree: &SyntaxTree) -> String {
        self.output.clear();
        self.visit_tree(tree);
        self.output.clone()
    }

    /// Print a single constructor declaration (used when a specialized
    /// clone is iterated on its own)
    pub fn print_constructor(&mut self, constructor: &ConstructorDecl) -> String {
        self.output.clear();
        self.visit_constructor_decl(constructor);
        self.output.clone()
    }

    fn indent(&mut self) {
        self.indent_level += 2;
    }

    fn dedent(&mut self) {
        if self.indent_level >= 2 {
            self.indent_level -= 2;
        }
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent_level {
            self.output.push(' ');
        }
    }

    fn writeln(&mut self, s: &str) {
        self.write_indent();
        self.output.push_str(s);
        self.output.push('\n');
    }

    fn modifiers_prefix(modifiers: &[Modifier]) -> String {
        let mut prefix = String::new();
        for modifier in modifiers {
            let word = match modifier {
                Modifier::Public => "public",
                Modifier::Internal => "internal",
                Modifier::Protected => "protected",
                Modifier::Private => "private",
                Modifier::Static => "static",
                Modifier::Abstract => "abstract",
                Modifier::ReadOnly => "readonly",
            };
            prefix.push_str(word);
            prefix.push(' ');
        }
        prefix
    }

    fn parameters_list(parameters: &[Parameter]) -> String {
        let mut list = String::new();
        for (i, parameter) in parameters.iter().enumerate() {
            if i > 0 {
                list.push_str(", ");
            }
            list.push_str(&format!("{} {}", parameter.type_ref, parameter.name));
            if let Some(ref default_value) = parameter.default_value {
                list.push_str(&format!(" = {}", default_value));
            }
        }
        list
    }

    fn print_branch(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(block) => self.visit_block(block),
            other => {
                self.indent();
                self.visit_stmt(other);
                self.dedent();
            }
        }
    }
}

impl Default for AstPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl AstVisitor for AstPrinter {
    type Output = ();

    fn visit_class_decl(&mut self, class: &ClassDecl) {
        self.write_indent();
        self.output.push_str(&Self::modifiers_prefix(&class.modifiers));
        self.output.push_str("class ");
        self.output.push_str(&class.name);
        self.output.push_str(" {\n");
        self.indent();

        for member in &class.members {
            match member {
                ClassMember::Field(f) => self.visit_field_decl(f),
                ClassMember::Property(p) => self.visit_property_decl(p),
                ClassMember::Method(m) => self.visit_method_decl(m),
                ClassMember::Constructor(c) => self.visit_constructor_decl(c),
            }
        }

        self.dedent();
        self.writeln("}");
    }

    fn visit_field_decl(&mut self, field: &FieldDecl) {
        let mut line = Self::modifiers_prefix(&field.modifiers);
        line.push_str(&format!("{} {}", field.type_ref, field.name));
        if let Some(ref initializer) = field.initializer {
            line.push_str(&format!(" = {}", initializer));
        }
        line.push(';');
        self.writeln(&line);
    }

    fn visit_property_decl(&mut self, property: &PropertyDecl) {
        let mut line = Self::modifiers_prefix(&property.modifiers);
        line.push_str(&format!("{} {}", property.type_ref, property.name));
        if property.has_setter {
            line.push_str(" { get; set; }");
        } else {
            line.push_str(" { get; }");
        }
        if let Some(ref initializer) = property.initializer {
            line.push_str(&format!(" = {};", initializer));
        }
        self.writeln(&line);
    }

    fn visit_method_decl(&mut self, method: &MethodDecl) {
        let mut line = Self::modifiers_prefix(&method.modifiers);
        match method.return_type {
            Some(ref return_type) => line.push_str(&format!("{} ", return_type)),
            None => line.push_str("void "),
        }
        line.push_str(&format!(
            "{}({})",
            method.name,
            Self::parameters_list(&method.parameters)
        ));

        match method.body {
            Some(ref body) => {
                line.push_str(" {");
                self.writeln(&line);
                self.indent();
                for stmt in &body.statements {
                    self.visit_stmt(stmt);
                }
                self.dedent();
                self.writeln("}");
            }
            None => {
                line.push(';');
                self.writeln(&line);
            }
        }
    }

    fn visit_constructor_decl(&mut self, constructor: &ConstructorDecl) {
        let mut line = Self::modifiers_prefix(&constructor.modifiers);
        line.push_str(&format!(
            "{}({}) {{",
            constructor.name,
            Self::parameters_list(&constructor.parameters)
        ));
        self.writeln(&line);
        self.indent();
        for stmt in &constructor.body.statements {
            self.visit_stmt(stmt);
        }
        self.dedent();
        self.writeln("}");
    }

    fn visit_block(&mut self, block: &Block) {
        self.writeln("{");
        self.indent();
        for stmt in &block.statements {
            self.visit_stmt(stmt);
        }
        self.dedent();
        self.writeln("}");
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr_stmt) => {
                let line = format!("{};", expr_stmt.expr);
                self.writeln(&line);
            }
            Stmt::Declaration(var_decl) => {
                let mut line = format!("{} ", var_decl.type_ref);
                for (i, var) in var_decl.variables.iter().enumerate() {
                    if i > 0 {
                        line.push_str(", ");
                    }
                    line.push_str(&var.name);
                    if let Some(ref initializer) = var.initializer {
                        line.push_str(&format!(" = {}", initializer));
                    }
                }
                line.push(';');
                self.writeln(&line);
            }
            Stmt::If(if_stmt) => {
                let line = format!("if ({})", if_stmt.condition);
                self.writeln(&line);
                self.print_branch(&if_stmt.then_branch);
                if let Some(ref else_branch) = if_stmt.else_branch {
                    self.writeln("else");
                    self.print_branch(else_branch);
                }
            }
            Stmt::While(while_stmt) => {
                let line = format!("while ({})", while_stmt.condition);
                self.writeln(&line);
                self.print_branch(&while_stmt.body);
            }
            Stmt::For(for_stmt) => {
                self.writeln("for (..)");
                self.indent();
                for init in &for_stmt.init {
                    self.visit_stmt(init);
                }
                if let Some(ref condition) = for_stmt.condition {
                    let line = format!("<cond> {}", condition);
                    self.writeln(&line);
                }
                for update in &for_stmt.update {
                    let line = format!("<update> {}", update);
                    self.writeln(&line);
                }
                self.dedent();
                self.print_branch(&for_stmt.body);
            }
            Stmt::Return(return_stmt) => match return_stmt.value {
                Some(ref value) => {
                    let line = format!("return {};", value);
                    self.writeln(&line);
                }
                None => self.writeln("return;"),
            },
            Stmt::Block(block) => self.visit_block(block),
            Stmt::Empty => self.writeln(";"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(literal) => write!(f, "{}", literal.value),
            Expr::Identifier(identifier) => write!(f, "{}", identifier.name),
            Expr::ThisRef(_) => write!(f, "this"),
            Expr::Binary(binary) => write!(
                f,
                "{} {} {}",
                binary.left,
                binary.operator.symbol(),
                binary.right
            ),
            Expr::Unary(unary) => match unary.operator {
                UnaryOp::Plus => write!(f, "+{}", unary.operand),
                UnaryOp::Minus => write!(f, "-{}", unary.operand),
                UnaryOp::Not => write!(f, "!{}", unary.operand),
                UnaryOp::BitNot => write!(f, "~{}", unary.operand),
                UnaryOp::PreInc => write!(f, "++{}", unary.operand),
                UnaryOp::PreDec => write!(f, "--{}", unary.operand),
                UnaryOp::PostInc => write!(f, "{}++", unary.operand),
                UnaryOp::PostDec => write!(f, "{}--", unary.operand),
            },
            Expr::Assignment(assignment) => write!(
                f,
                "{} {} {}",
                assignment.target,
                assignment.operator.symbol(),
                assignment.value
            ),
            Expr::Invocation(invocation) => {
                if let Some(ref target) = invocation.target {
                    write!(f, "{}.", target)?;
                }
                write!(f, "{}(", invocation.method)?;
                for (i, arg) in invocation.arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::MemberAccess(member_access) => {
                write!(f, "{}.{}", member_access.target, member_access.member)
            }
            Expr::IndexAccess(index_access) => {
                write!(f, "{}[{}]", index_access.array, index_access.index)
            }
            Expr::Cast(cast) => write!(f, "({}){}", cast.target_type, cast.expr),
            Expr::ObjectCreation(creation) => {
                write!(f, "new {}(", creation.target_type)?;
                for (i, arg) in creation.arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::ArrayCreation(creation) => {
                write!(f, "new {}[{}]", creation.element_type, creation.length)
            }
            Expr::Parenthesized(inner) => write!(f, "({})", inner),
        }
    }
}
