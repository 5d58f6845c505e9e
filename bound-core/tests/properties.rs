use bound_ast::{Stmt, Term, TermRef};
use bound_core::{subst, Context, Elaborator};
use proptest::prelude::*;

const PRELUDE: &str = "\
assume Vec: Nat -> *;
assume zeros: pi n: Nat. Vec n;
assume add: Nat -> Nat -> Nat;
assume swap: (Nat, *) -> (*, Nat);
";

fn prelude() -> Elaborator {
    let program = bound_parse::parse_source(PRELUDE).expect("parse");
    let mut elab = Elaborator::default();
    for stmt in &program.stmts {
        if let Stmt::Assume(s) = stmt {
            elab.assume(&s.name.node, &s.ty).expect("assume");
        }
    }
    elab
}

// Bodies mentioning the bound `x: Nat`.
fn arb_body() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "x",
        "zeros x",
        "(x, zeros x)",
        "add x (add 1 x)",
        "(lambda y: Nat. (y, x)) x",
        "swap (x, Nat)",
        "(zeros x, Vec)[0]",
    ])
}

proptest! {
    #[test]
    fn inference_is_deterministic(body in arb_body(), n in 0u64..1_000) {
        let elab = prelude();
        let src = format!("(lambda x: Nat. {body}) {n}");
        let term = bound_parse::parse_term(&src).unwrap();
        let ctx = Context::new();
        let term = elab.elaborate(&term, &ctx).unwrap();
        let first = elab.infer(&term, &ctx).unwrap();
        let second = elab.infer(&term, &ctx).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn application_types_match_substituted_body_types(body in arb_body(), n in 0u64..1_000) {
        let elab = prelude();
        let ctx = Context::new();
        let body = bound_parse::parse_term(body).unwrap();
        let inner = ctx.extended("x", Term::nat());
        let body = elab.elaborate(&body, &inner).unwrap();
        let body_ty = elab.infer(&body, &inner).unwrap();

        let arg: TermRef = Term::lit(n);
        let app = Term::app(Term::lambda("x", Term::nat(), body), arg.clone());
        let app_ty = elab.infer(&app, &ctx).unwrap();
        let expected = subst(&body_ty, "x", &arg);
        prop_assert!(elab.checker().conv(&app_ty, &expected).unwrap());
    }
}
