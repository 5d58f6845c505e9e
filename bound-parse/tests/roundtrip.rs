use bound_ast::{Program, Stmt, Term, TermRef};
use bound_parse::{format_program, format_term, parse_source, parse_term};
use proptest::prelude::*;

// Spans differ after reprinting; compare names and terms only.
fn shape(program: &Program) -> Vec<(String, Option<TermRef>, TermRef)> {
    program
        .stmts
        .iter()
        .map(|s| match s {
            Stmt::Assume(a) => (a.name.node.clone(), None, a.ty.clone()),
            Stmt::Define(d) => (d.name.node.clone(), d.ty.clone(), d.value.clone()),
        })
        .collect()
}

const ARRAYS: &str = r#"
define Nat = Nat;
assume Float: *;
assume opFloatPlus: (Float, Float) -> Float;
assume cFloatZero: Float;

// Arrays
assume ArrT: pi _:(Nat, Nat -> *). *;
assume ArrGet: pi type: (Nat, Nat -> *). ArrT type -> pi i:Nat. type[1] i;
define UArrT = lambda lt: (Nat, *). ArrT (lt[0], lambda _:Nat. lt[1]);
define MatrixType = lambda n:Nat. lambda m:Nat. UArrT (n, UArrT (m, Float));

assume reduce: pi t:*. pi op: ((t, t) -> t). pi startval:t. pi len:Nat. pi values:(Nat -> t). t;
define sum = reduce Float opFloatPlus cFloatZero;

assume testarray1: ArrT (15, lambda _:Nat. Float);
define a1 = ArrGet (15, lambda _:Nat. Float) testarray1 0;
define a4 = (lambda n:Nat. ArrGet (n, lambda _:Nat. Float) testarray1 16) 20;
"#;

#[test]
fn array_program_round_trips() {
    let first = parse_source(ARRAYS).expect("parse");
    let printed = format_program(&first);
    let second = parse_source(&printed).expect("reparse");
    assert_eq!(shape(&first), shape(&second));
    assert_eq!(printed, format_program(&second));
}

#[test]
fn printer_uses_arrow_sugar_for_anonymous_binders() {
    let t = parse_term("pi _:(Nat, Nat -> *). *").unwrap();
    assert_eq!(format_term(&t), "(Nat, Nat -> *) -> *");
}

fn arb_term() -> impl Strategy<Value = TermRef> {
    let leaf = prop_oneof![
        prop::sample::select(vec!["x", "y", "f", "Nat"]).prop_map(Term::var),
        (0u64..50).prop_map(Term::lit),
        Just(Term::star()),
    ];
    leaf.prop_recursive(4, 32, 3, |inner| {
        let binder = prop::sample::select(vec!["x", "y", "_"]);
        prop_oneof![
            (binder.clone(), inner.clone(), inner.clone())
                .prop_map(|(p, d, b)| Term::lambda(p, d, b)),
            (binder, inner.clone(), inner.clone()).prop_map(|(p, d, c)| Term::pi(p, d, c)),
            (inner.clone(), inner.clone()).prop_map(|(f, a)| Term::app(f, a)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Term::pair(a, b)),
            (inner, 0u8..2).prop_map(|(p, i)| Term::proj(p, i)),
        ]
    })
}

proptest! {
    #[test]
    fn printed_terms_reparse_to_the_same_tree(term in arb_term()) {
        let printed = format_term(&term);
        let reparsed = parse_term(&printed).expect("printed term must parse");
        prop_assert_eq!(reparsed, term);
    }
}
