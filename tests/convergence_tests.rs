mod common;

use common::*;
use silc::ast::{AstPrinter, BinaryOp};
use silc::{substitute, Error, SubstitutionConfig};

/// A chain that needs several passes: each hop becomes foldable only
/// after the previous one has been rewritten
fn propagation_chain() -> silc::ast::SyntaxTree {
    tree(vec![class(
        "C",
        vec![method(
            "m",
            None,
            vec![],
            vec![
                var_decl(ty("int"), "a", Some(binary(int(1), BinaryOp::Add, int(1)))),
                var_decl(ty("int"), "b", Some(binary(ident("a"), BinaryOp::Add, int(1)))),
                var_decl(ty("int"), "c", Some(binary(ident("b"), BinaryOp::Add, int(1)))),
            ],
        )],
    )])
}

#[test]
fn substitution_is_idempotent() {
    let mut program = propagation_chain();
    substitute(&mut program, &SubstitutionConfig::default()).expect("first run failed");
    let first = AstPrinter::new().print(&program);

    substitute(&mut program, &SubstitutionConfig::default()).expect("second run failed");
    let second = AstPrinter::new().print(&program);

    // A stable tree has no further foldable nodes
    assert_eq!(first, second);
}

#[test]
fn chain_fully_resolves_under_the_default_pass_cap() {
    let mut program = propagation_chain();
    substitute(&mut program, &SubstitutionConfig::default()).expect("substitution failed");

    let body = method_body(&program, "C", "m");
    assert_eq!(as_int(decl_init(body, "a")), Some(2));
    assert_eq!(as_int(decl_init(body, "b")), Some(3));
    assert_eq!(as_int(decl_init(body, "c")), Some(4));
}

#[test]
fn exhausting_the_pass_cap_reports_non_convergence() {
    let mut program = propagation_chain();
    let config = SubstitutionConfig { restore_bindings: false, max_passes: 2 };

    let err = substitute(&mut program, &config).expect_err("expected non-convergence");
    match err {
        Error::NonConvergence { unit, passes } => {
            assert_eq!(unit, "C");
            assert_eq!(passes, 2);
        }
        other => panic!("expected NonConvergence, found {}", other),
    }
}

#[test]
fn a_single_pass_never_suffices_for_a_stability_proof() {
    // Even an already-stable tree needs one pass to rewrite and one to
    // confirm stability
    let mut program = tree(vec![class(
        "C",
        vec![method(
            "m",
            None,
            vec![],
            vec![var_decl(ty("int"), "x", Some(int(1)))],
        )],
    )]);
    let config = SubstitutionConfig { restore_bindings: false, max_passes: 1 };

    assert!(matches!(
        substitute(&mut program, &config),
        Err(Error::NonConvergence { .. })
    ));
}
