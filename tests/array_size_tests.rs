mod common;

use common::*;
use silc::ast::Expr;
use silc::{substitute, SubstitutionConfig};

fn run(tree: &mut silc::ast::SyntaxTree) -> silc::ArraySizeTable {
    substitute(tree, &SubstitutionConfig::default()).expect("substitution failed")
}

#[test]
fn array_length_reads_fold_to_the_creation_length() {
    let mut program = tree(vec![class(
        "C",
        vec![method(
            "m",
            None,
            vec![],
            vec![
                var_decl(array_ty("int"), "arr", Some(new_array("int", int(3)))),
                var_decl(ty("int"), "n", Some(member(ident("arr"), "Length"))),
            ],
        )],
    )]);
    let sizes = run(&mut program);

    let body = method_body(&program, "C", "m");
    assert_eq!(as_int(decl_init(body, "n")), Some(3));
    assert!(!sizes.is_empty());
}

#[test]
fn reassignment_from_unknown_array_blocks_length_folding() {
    let mut program = tree(vec![class(
        "C",
        vec![method(
            "m",
            None,
            vec![param(array_ty("int"), "other")],
            vec![
                var_decl(array_ty("int"), "arr", Some(new_array("int", int(3)))),
                assign(ident("arr"), ident("other")),
                var_decl(ty("int"), "n", Some(member(ident("arr"), "Length"))),
            ],
        )],
    )]);
    run(&mut program);

    let body = method_body(&program, "C", "m");
    assert!(as_int(decl_init(body, "n")).is_none());
}

#[test]
fn lengths_propagate_through_parameter_passing() {
    let mut program = tree(vec![class(
        "C",
        vec![
            method(
                "callee",
                None,
                vec![param(array_ty("int"), "data")],
                vec![var_decl(
                    ty("int"),
                    "n",
                    Some(member(ident("data"), "Length")),
                )],
            ),
            method(
                "m",
                None,
                vec![],
                vec![expr_stmt(call(
                    None,
                    "callee",
                    vec![new_array("int", int(4))],
                ))],
            ),
        ],
    )]);
    run(&mut program);

    let body = method_body(&program, "C", "callee");
    assert_eq!(as_int(decl_init(body, "n")), Some(4));
}

#[test]
fn lengths_propagate_through_returns() {
    let mut program = tree(vec![class(
        "C",
        vec![
            method(
                "make",
                Some(array_ty("int")),
                vec![],
                vec![ret(Some(new_array("int", int(8))))],
            ),
            method(
                "m",
                None,
                vec![],
                vec![
                    var_decl(array_ty("int"), "arr", Some(call(None, "make", vec![]))),
                    var_decl(ty("int"), "n", Some(member(ident("arr"), "Length"))),
                ],
            ),
        ],
    )]);
    run(&mut program);

    let body = method_body(&program, "C", "m");
    assert_eq!(as_int(decl_init(body, "n")), Some(8));
}

#[test]
fn unresolved_creation_length_is_backfilled_from_the_side_table() {
    let mut program = tree(vec![class(
        "C",
        vec![method(
            "m",
            None,
            vec![param(ty("int"), "n")],
            vec![
                var_decl(array_ty("int"), "a", Some(new_array("int", int(3)))),
                var_decl(array_ty("int"), "b", Some(new_array("int", ident("n")))),
                assign(ident("b"), ident("a")),
            ],
        )],
    )]);
    run(&mut program);

    let body = method_body(&program, "C", "m");
    match decl_init(body, "b") {
        Expr::ArrayCreation(creation) => {
            assert_eq!(as_int(&creation.length), Some(3));
        }
        other => panic!("expected array creation, found {:?}", other),
    }
}
