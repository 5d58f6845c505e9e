use bound_ast::{Stmt, Term};
use bound_parse::{parse_source, parse_source_with_recovery, parse_term};

#[test]
fn assume_and_define_statements_parse() {
    let src = r#"
// Natural numbers
assume opAddNat: (Nat, Nat) -> Nat;
define x3 = opAddNat (1, 2);
define x4: Nat = (lambda y: Nat. y) 1;
"#;
    let program = parse_source(src).expect("program should parse");
    assert_eq!(program.stmts.len(), 3);
    assert!(matches!(&program.stmts[0], Stmt::Assume(s) if s.name.node == "opAddNat"));
    match &program.stmts[2] {
        Stmt::Define(d) => {
            assert_eq!(d.ty.as_deref(), Some(&Term::Var("Nat".into())));
            assert_eq!(
                d.value,
                Term::app(
                    Term::lambda("y", Term::var("Nat"), Term::var("y")),
                    Term::lit(1)
                )
            );
        }
        other => panic!("unexpected statement: {other:?}"),
    }
}

#[test]
fn application_is_left_associative() {
    let t = parse_term("f x y").unwrap();
    assert_eq!(
        t,
        Term::app(Term::app(Term::var("f"), Term::var("x")), Term::var("y"))
    );
}

#[test]
fn tupled_application_keeps_the_pair_argument() {
    let t = parse_term("f (a, b)").unwrap();
    assert_eq!(t, Term::app(Term::var("f"), Term::pair(Term::var("a"), Term::var("b"))));
}

#[test]
fn triples_nest_to_the_right() {
    let t = parse_term("(a, b, c)").unwrap();
    assert_eq!(
        t,
        Term::pair(Term::var("a"), Term::pair(Term::var("b"), Term::var("c")))
    );
}

#[test]
fn arrows_are_right_associative_pi_types() {
    let t = parse_term("Nat -> Nat -> *").unwrap();
    assert_eq!(
        t,
        Term::arrow(Term::var("Nat"), Term::arrow(Term::var("Nat"), Term::star()))
    );
}

#[test]
fn projection_binds_tighter_than_application() {
    let t = parse_term("type[1] i").unwrap();
    assert_eq!(
        t,
        Term::app(Term::proj(Term::var("type"), 1), Term::var("i"))
    );
}

#[test]
fn projection_index_out_of_range_is_rejected() {
    let err = parse_term("p[2]").unwrap_err();
    assert!(err.message.contains("0 or 1"), "unexpected: {}", err.message);
}

#[test]
fn missing_terminator_reports_line() {
    let src = "assume a: Nat;\ndefine b = a\ndefine c = a;\n";
    let err = parse_source(src).expect_err("expected syntax error");
    assert_eq!(err.line, 3);
    assert!(err.message.contains("`;`"), "unexpected: {}", err.message);
}

#[test]
fn unbalanced_parens_are_rejected() {
    let err = parse_source("define a = (1, 2;\n").expect_err("expected syntax error");
    assert_eq!(err.line, 1);
}

#[test]
fn unknown_token_is_a_syntax_error() {
    let err = parse_source("define a = 1 + 2;\n").expect_err("expected syntax error");
    assert!(err.message.contains("unexpected token"));
}

#[test]
fn recovery_keeps_statements_after_an_error() {
    let src = "define a = 1;\ndefine b = ;\ndefine c = a;\n";
    let (program, errors) = parse_source_with_recovery(src).expect("lexes");
    assert_eq!(errors.len(), 1);
    let names: Vec<&str> = program.stmts.iter().map(|s| s.name().node.as_str()).collect();
    assert_eq!(names, vec!["a", "c"]);
}

#[test]
fn recovery_skips_statement_missing_its_terminator() {
    let src = "define a = 1\ndefine c = 2;\n";
    let (program, errors) = parse_source_with_recovery(src).expect("lexes");
    assert_eq!(errors.len(), 1);
    let names: Vec<&str> = program.stmts.iter().map(|s| s.name().node.as_str()).collect();
    assert_eq!(names, vec!["c"]);
}

#[test]
fn glued_anonymous_binders_parse_like_arrows() {
    let glued = parse_source("assume ArrT: pi_:(Nat, Nat -> *). *;").expect("glued binder parses");
    let arrow = parse_source("assume ArrT: (Nat, Nat -> *) -> *;").unwrap();
    match (&glued.stmts[0], &arrow.stmts[0]) {
        (Stmt::Assume(g), Stmt::Assume(a)) => assert_eq!(g.ty, a.ty),
        other => panic!("unexpected statements: {other:?}"),
    }

    let t = parse_term("lambda_:Nat. 3").unwrap();
    assert_eq!(t, Term::lambda("_", Term::var("Nat"), Term::lit(3)));
}
