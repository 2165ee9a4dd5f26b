mod common;

use common::*;
use silc::ast::{BinaryOp, Expr, Literal, Stmt};
use silc::{substitute, SubstitutionConfig};

fn run(tree: &mut silc::ast::SyntaxTree) {
    substitute(tree, &SubstitutionConfig::default()).expect("substitution failed");
}

#[test]
fn literal_arithmetic_chains_through_locals() {
    let mut program = tree(vec![class(
        "C",
        vec![method(
            "m",
            None,
            vec![],
            vec![
                var_decl(ty("int"), "x", Some(binary(int(2), BinaryOp::Add, int(3)))),
                var_decl(ty("int"), "y", Some(ident("x"))),
            ],
        )],
    )]);
    run(&mut program);

    let body = method_body(&program, "C", "m");
    assert_eq!(as_int(decl_init(body, "x")), Some(5));
    assert_eq!(as_int(decl_init(body, "y")), Some(5));
}

#[test]
fn cast_of_literal_folds_with_source_width_rules() {
    let mut program = tree(vec![class(
        "C",
        vec![method(
            "m",
            None,
            vec![],
            vec![var_decl(
                ty("int"),
                "x",
                Some(binary(
                    cast("byte", int(300)),
                    BinaryOp::Add,
                    int(1),
                )),
            )],
        )],
    )]);
    run(&mut program);

    // (byte)300 truncates to 44, then promotes back to int
    let body = method_body(&program, "C", "m");
    assert_eq!(as_int(decl_init(body, "x")), Some(45));
}

#[test]
fn reassignment_inside_conditional_blocks_folding() {
    let mut program = tree(vec![class(
        "C",
        vec![method(
            "m",
            None,
            vec![param(ty("bool"), "cond")],
            vec![
                var_decl(ty("int"), "x", Some(int(1))),
                if_stmt(ident("cond"), vec![assign(ident("x"), int(2))], None),
                var_decl(ty("int"), "y", Some(ident("x"))),
            ],
        )],
    )]);
    run(&mut program);

    // x is no longer known once any branch may have reassigned it
    let body = method_body(&program, "C", "m");
    assert!(matches!(decl_init(body, "y"), Expr::Identifier(id) if id.name == "x"));
}

#[test]
fn reassignment_in_straight_line_code_still_folds() {
    let mut program = tree(vec![class(
        "C",
        vec![method(
            "m",
            None,
            vec![],
            vec![
                var_decl(ty("int"), "x", Some(int(1))),
                assign(ident("x"), binary(ident("x"), BinaryOp::Add, int(1))),
                var_decl(ty("int"), "y", Some(ident("x"))),
            ],
        )],
    )]);
    run(&mut program);

    // x = x + 1 is the accumulate shape: the read consumes the old
    // binding, the next pass folds 1 + 1, and y picks up 2
    let body = method_body(&program, "C", "m");
    assert_eq!(as_int(assignment_value(body, "x")), Some(2));
    assert_eq!(as_int(decl_init(body, "y")), Some(2));
}

#[test]
fn agreeing_call_sites_keep_the_parameter_constant() {
    let mut program = tree(vec![class(
        "C",
        vec![
            method(
                "f",
                Some(ty("int")),
                vec![param(ty("int"), "p")],
                vec![ret(Some(ident("p")))],
            ),
            method(
                "m",
                None,
                vec![],
                vec![
                    var_decl(ty("int"), "a", Some(call(None, "f", vec![int(5)]))),
                    var_decl(ty("int"), "b", Some(call(None, "f", vec![int(5)]))),
                ],
            ),
        ],
    )]);
    run(&mut program);

    let f_body = method_body(&program, "C", "f");
    match &f_body.statements[0] {
        Stmt::Return(ret_stmt) => {
            assert_eq!(as_int(ret_stmt.value.as_ref().unwrap()), Some(5));
        }
        other => panic!("expected return, found {:?}", other),
    }
    let m_body = method_body(&program, "C", "m");
    assert_eq!(as_int(decl_init(m_body, "a")), Some(5));
    assert_eq!(as_int(decl_init(m_body, "b")), Some(5));
}

#[test]
fn disagreeing_call_sites_kill_the_parameter() {
    let mut program = tree(vec![class(
        "C",
        vec![
            method(
                "f",
                Some(ty("int")),
                vec![param(ty("int"), "p")],
                vec![ret(Some(ident("p")))],
            ),
            method(
                "m",
                None,
                vec![],
                vec![
                    var_decl(ty("int"), "a", Some(call(None, "f", vec![int(5)]))),
                    var_decl(ty("int"), "b", Some(call(None, "f", vec![int(6)]))),
                ],
            ),
        ],
    )]);
    run(&mut program);

    // One differing observation permanently invalidates the holder
    let f_body = method_body(&program, "C", "f");
    match &f_body.statements[0] {
        Stmt::Return(ret_stmt) => {
            assert!(matches!(
                ret_stmt.value.as_ref().unwrap(),
                Expr::Identifier(id) if id.name == "p"
            ));
        }
        other => panic!("expected return, found {:?}", other),
    }
    let m_body = method_body(&program, "C", "m");
    assert!(as_int(decl_init(m_body, "a")).is_none());
    assert!(as_int(decl_init(m_body, "b")).is_none());
}

#[test]
fn constant_method_returns_substitute_at_call_sites() {
    let mut program = tree(vec![class(
        "C",
        vec![
            method("seven", Some(ty("int")), vec![], vec![ret(Some(int(7)))]),
            method(
                "m",
                None,
                vec![],
                vec![var_decl(
                    ty("int"),
                    "x",
                    Some(call(None, "seven", vec![])),
                )],
            ),
        ],
    )]);
    run(&mut program);

    let body = method_body(&program, "C", "m");
    assert_eq!(as_int(decl_init(body, "x")), Some(7));
}

#[test]
fn constructor_specialization_resolves_members_per_instance() {
    let mut program = tree(vec![
        class(
            "C",
            vec![
                readonly_field(ty("int"), "F"),
                ctor(
                    "C",
                    vec![param(ty("int"), "f")],
                    vec![assign(member(this(), "F"), ident("f"))],
                ),
            ],
        ),
        class(
            "D",
            vec![method(
                "m",
                None,
                vec![],
                vec![
                    var_decl(ty("C"), "a", Some(new_object("C", vec![int(1)]))),
                    var_decl(ty("C"), "b", Some(new_object("C", vec![int(2)]))),
                    var_decl(ty("int"), "x", Some(member(ident("a"), "F"))),
                    var_decl(ty("int"), "y", Some(member(ident("b"), "F"))),
                ],
            )],
        ),
    ]);
    run(&mut program);

    // Each instance resolves through its own specialized constructor
    // clone; the cross-instance disagreement rule does not apply
    let body = method_body(&program, "D", "m");
    assert_eq!(as_int(decl_init(body, "x")), Some(1));
    assert_eq!(as_int(decl_init(body, "y")), Some(2));

    // The shared constructor declaration itself stays unspecialized
    let shared = ctor_body(&program, "C");
    assert!(matches!(
        assignment_value(shared, "this.F"),
        Expr::Identifier(id) if id.name == "f"
    ));
}

#[test]
fn known_conditions_splice_the_taken_branch() {
    let mut program = tree(vec![class(
        "C",
        vec![method(
            "m",
            None,
            vec![],
            vec![
                var_decl(ty("int"), "x", None),
                if_stmt(
                    boolean(true),
                    vec![assign(ident("x"), int(1))],
                    Some(vec![assign(ident("x"), int(2))]),
                ),
            ],
        )],
    )]);
    run(&mut program);

    let body = method_body(&program, "C", "m");
    assert_eq!(body.statements.len(), 2);
    assert!(!body
        .statements
        .iter()
        .any(|stmt| matches!(stmt, Stmt::If(_))));
    assert_eq!(as_int(assignment_value(body, "x")), Some(1));
}

#[test]
fn derived_conditions_fold_and_splice() {
    let mut program = tree(vec![class(
        "C",
        vec![method(
            "m",
            None,
            vec![],
            vec![
                var_decl(ty("int"), "x", Some(int(3))),
                if_stmt(
                    binary(ident("x"), BinaryOp::Eq, int(3)),
                    vec![var_decl(ty("int"), "y", Some(int(10)))],
                    Some(vec![var_decl(ty("int"), "y", Some(int(20)))]),
                ),
            ],
        )],
    )]);
    run(&mut program);

    let body = method_body(&program, "C", "m");
    assert!(!body
        .statements
        .iter()
        .any(|stmt| matches!(stmt, Stmt::If(_))));
    assert_eq!(as_int(decl_init(body, "y")), Some(10));
}

#[test]
fn reads_inside_loops_are_never_substituted() {
    let mut program = tree(vec![class(
        "C",
        vec![method(
            "m",
            None,
            vec![param(ty("bool"), "go")],
            vec![
                var_decl(ty("int"), "x", Some(int(1))),
                while_stmt(
                    ident("go"),
                    vec![var_decl(ty("int"), "y", Some(ident("x")))],
                ),
            ],
        )],
    )]);
    run(&mut program);

    let body = method_body(&program, "C", "m");
    assert!(matches!(decl_init(body, "y"), Expr::Identifier(id) if id.name == "x"));
}

#[test]
fn literal_string_concatenation_folds() {
    let mut program = tree(vec![class(
        "C",
        vec![method(
            "m",
            None,
            vec![],
            vec![var_decl(
                ty("string"),
                "s",
                Some(binary(
                    lit(Literal::Str("ab".into())),
                    BinaryOp::Add,
                    lit(Literal::Str("cd".into())),
                )),
            )],
        )],
    )]);
    run(&mut program);

    let body = method_body(&program, "C", "m");
    assert_eq!(
        decl_init(body, "s").as_literal(),
        Some(&Literal::Str("abcd".into()))
    );
}
