// Common test utilities: builders for decompiled trees and finders for
// inspecting the rewritten result

#![allow(dead_code)]

use silc::ast::*;

pub fn ty(name: &str) -> TypeRef {
    TypeRef::new(name)
}

pub fn array_ty(name: &str) -> TypeRef {
    TypeRef::array(name, 1)
}

pub fn int(value: i32) -> Expr {
    Expr::literal(Literal::Int(value))
}

pub fn boolean(value: bool) -> Expr {
    Expr::literal(Literal::Bool(value))
}

pub fn lit(value: Literal) -> Expr {
    Expr::literal(value)
}

pub fn ident(name: &str) -> Expr {
    Expr::Identifier(IdentifierExpr { name: name.to_string(), span: Span::synthetic() })
}

pub fn this() -> Expr {
    Expr::ThisRef(ThisRefExpr { span: Span::synthetic() })
}

pub fn binary(left: Expr, operator: BinaryOp, right: Expr) -> Expr {
    Expr::Binary(BinaryExpr {
        id: NodeId::UNSET,
        left: Box::new(left),
        operator,
        right: Box::new(right),
        span: Span::synthetic(),
    })
}

pub fn unary(operator: UnaryOp, operand: Expr) -> Expr {
    Expr::Unary(UnaryExpr {
        id: NodeId::UNSET,
        operator,
        operand: Box::new(operand),
        span: Span::synthetic(),
    })
}

pub fn cast(target: &str, expr: Expr) -> Expr {
    Expr::Cast(CastExpr {
        target_type: ty(target),
        expr: Box::new(expr),
        span: Span::synthetic(),
    })
}

pub fn member(target: Expr, name: &str) -> Expr {
    Expr::MemberAccess(MemberAccessExpr {
        target: Box::new(target),
        member: name.to_string(),
        span: Span::synthetic(),
    })
}

pub fn call(target: Option<Expr>, method: &str, arguments: Vec<Expr>) -> Expr {
    Expr::Invocation(InvocationExpr {
        target: target.map(Box::new),
        method: method.to_string(),
        arguments,
        span: Span::synthetic(),
    })
}

pub fn new_object(class: &str, arguments: Vec<Expr>) -> Expr {
    Expr::ObjectCreation(ObjectCreationExpr {
        target_type: ty(class),
        arguments,
        span: Span::synthetic(),
    })
}

pub fn new_array(element: &str, length: Expr) -> Expr {
    Expr::ArrayCreation(ArrayCreationExpr {
        element_type: ty(element),
        length: Box::new(length),
        span: Span::synthetic(),
    })
}

pub fn assign(target: Expr, value: Expr) -> Stmt {
    Stmt::Expression(ExprStmt {
        expr: Expr::Assignment(AssignmentExpr {
            target: Box::new(target),
            operator: AssignOp::Assign,
            value: Box::new(value),
            span: Span::synthetic(),
        }),
        span: Span::synthetic(),
    })
}

pub fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::Expression(ExprStmt { expr, span: Span::synthetic() })
}

pub fn var_decl(type_ref: TypeRef, name: &str, initializer: Option<Expr>) -> Stmt {
    Stmt::Declaration(VarDeclStmt {
        type_ref,
        variables: vec![VariableDeclarator {
            name: name.to_string(),
            initializer,
            span: Span::synthetic(),
        }],
        span: Span::synthetic(),
    })
}

pub fn if_stmt(condition: Expr, then_stmts: Vec<Stmt>, else_stmts: Option<Vec<Stmt>>) -> Stmt {
    Stmt::If(IfStmt {
        condition,
        then_branch: Box::new(Stmt::Block(Block::new(then_stmts))),
        else_branch: else_stmts.map(|stmts| Box::new(Stmt::Block(Block::new(stmts)))),
        span: Span::synthetic(),
    })
}

pub fn while_stmt(condition: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::While(WhileStmt {
        condition,
        body: Box::new(Stmt::Block(Block::new(body))),
        span: Span::synthetic(),
    })
}

pub fn ret(value: Option<Expr>) -> Stmt {
    Stmt::Return(ReturnStmt { value, span: Span::synthetic() })
}

pub fn param(type_ref: TypeRef, name: &str) -> Parameter {
    Parameter {
        type_ref,
        name: name.to_string(),
        default_value: None,
        span: Span::synthetic(),
    }
}

pub fn method(
    name: &str,
    return_type: Option<TypeRef>,
    parameters: Vec<Parameter>,
    body: Vec<Stmt>,
) -> ClassMember {
    ClassMember::Method(MethodDecl {
        modifiers: vec![Modifier::Public],
        return_type,
        name: name.to_string(),
        parameters,
        body: Some(Block::new(body)),
        span: Span::synthetic(),
    })
}

pub fn ctor(class: &str, parameters: Vec<Parameter>, body: Vec<Stmt>) -> ClassMember {
    ClassMember::Constructor(ConstructorDecl {
        modifiers: vec![Modifier::Public],
        name: class.to_string(),
        parameters,
        body: Block::new(body),
        span: Span::synthetic(),
    })
}

pub fn field(type_ref: TypeRef, name: &str) -> ClassMember {
    ClassMember::Field(FieldDecl {
        modifiers: vec![Modifier::Private],
        type_ref,
        name: name.to_string(),
        initializer: None,
        span: Span::synthetic(),
    })
}

pub fn readonly_field(type_ref: TypeRef, name: &str) -> ClassMember {
    ClassMember::Field(FieldDecl {
        modifiers: vec![Modifier::Private, Modifier::ReadOnly],
        type_ref,
        name: name.to_string(),
        initializer: None,
        span: Span::synthetic(),
    })
}

pub fn class(name: &str, members: Vec<ClassMember>) -> ClassDecl {
    ClassDecl {
        modifiers: vec![Modifier::Public],
        name: name.to_string(),
        members,
        span: Span::synthetic(),
    }
}

pub fn tree(classes: Vec<ClassDecl>) -> SyntaxTree {
    SyntaxTree::new(classes)
}

// Finders

pub fn method_body<'a>(tree: &'a SyntaxTree, class: &str, name: &str) -> &'a Block {
    for c in &tree.classes {
        if c.name != class {
            continue;
        }
        for member in &c.members {
            if let ClassMember::Method(m) = member {
                if m.name == name {
                    if let Some(ref body) = m.body {
                        return body;
                    }
                }
            }
        }
    }
    panic!("no method {}.{} with a body", class, name);
}

pub fn ctor_body<'a>(tree: &'a SyntaxTree, class: &str) -> &'a Block {
    for c in &tree.classes {
        if c.name != class {
            continue;
        }
        for member in &c.members {
            if let ClassMember::Constructor(ctor) = member {
                return &ctor.body;
            }
        }
    }
    panic!("no constructor on {}", class);
}

/// Initializer of the first declarator named `name`, searching nested
/// statements depth-first
pub fn decl_init<'a>(block: &'a Block, name: &str) -> &'a Expr {
    fn search<'a>(stmts: &'a [Stmt], name: &str) -> Option<&'a Expr> {
        for stmt in stmts {
            match stmt {
                Stmt::Declaration(var_decl) => {
                    for var in &var_decl.variables {
                        if var.name == name {
                            if let Some(ref init) = var.initializer {
                                return Some(init);
                            }
                        }
                    }
                }
                Stmt::Block(block) => {
                    if let Some(found) = search(&block.statements, name) {
                        return Some(found);
                    }
                }
                Stmt::If(if_stmt) => {
                    let branches =
                        std::iter::once(&*if_stmt.then_branch).chain(
                            if_stmt.else_branch.as_deref(),
                        );
                    for branch in branches {
                        if let Some(found) = search(std::slice::from_ref(branch), name) {
                            return Some(found);
                        }
                    }
                }
                Stmt::While(while_stmt) => {
                    if let Some(found) =
                        search(std::slice::from_ref(&while_stmt.body), name)
                    {
                        return Some(found);
                    }
                }
                _ => {}
            }
        }
        None
    }
    search(&block.statements, name)
        .unwrap_or_else(|| panic!("no initialized declaration of {}", name))
}

/// Value of the first assignment whose printed target equals `target`
pub fn assignment_value<'a>(block: &'a Block, target: &str) -> &'a Expr {
    fn search<'a>(stmts: &'a [Stmt], target: &str) -> Option<&'a Expr> {
        for stmt in stmts {
            match stmt {
                Stmt::Expression(expr_stmt) => {
                    if let Expr::Assignment(assignment) = &expr_stmt.expr {
                        if format!("{}", assignment.target) == target {
                            return Some(&assignment.value);
                        }
                    }
                }
                Stmt::Block(block) => {
                    if let Some(found) = search(&block.statements, target) {
                        return Some(found);
                    }
                }
                Stmt::If(if_stmt) => {
                    let branches =
                        std::iter::once(&*if_stmt.then_branch).chain(
                            if_stmt.else_branch.as_deref(),
                        );
                    for branch in branches {
                        if let Some(found) =
                            search(std::slice::from_ref(branch), target)
                        {
                            return Some(found);
                        }
                    }
                }
                _ => {}
            }
        }
        None
    }
    search(&block.statements, target)
        .unwrap_or_else(|| panic!("no assignment to {}", target))
}

pub fn as_int(expr: &Expr) -> Option<i32> {
    match expr.as_literal() {
        Some(Literal::Int(v)) => Some(*v),
        _ => None,
    }
}
