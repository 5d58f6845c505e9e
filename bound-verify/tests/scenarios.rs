use bound_core::CheckConfig;
use bound_verify::{
    check_program, AxiomRegistry, ErrorStage, ProgramReport, StatementKind, StatementOutcome,
    Verdict,
};

const PRELUDE: &str = "\
assume Float: *;
assume ArrT: pi_:(Nat, Nat -> *). *;
assume ArrGet: pi type: (Nat, Nat -> *). ArrT type -> pi i: Nat. type[1] i;
assume arr: pi n: Nat. ArrT (n, lambda _: Nat. Float);
assume intakeLower10: Nat -> Nat;
assume opAddNat: (Nat, Nat) -> Nat;
";

fn check(body: &str) -> ProgramReport {
    check_with(body, &AxiomRegistry::with_builtin_contracts())
}

fn check_with(body: &str, registry: &AxiomRegistry) -> ProgramReport {
    let src = format!("{PRELUDE}{body}");
    let program = bound_parse::parse_source(&src).expect("parse");
    check_program(&program, registry, &CheckConfig::default())
}

fn verdict(report: &ProgramReport, name: &str) -> Verdict {
    match report.get(name) {
        Some(StatementOutcome::Checked(r)) => {
            r.verdict.clone().expect("definitions carry a verdict")
        }
        Some(StatementOutcome::Failed(e)) => panic!("`{name}` failed: {}", e.message),
        None => panic!("no statement named `{name}`"),
    }
}

fn witness(report: &ProgramReport, name: &str) -> (String, i64) {
    match verdict(report, name) {
        Verdict::Violated(Some(w)) => (w.name, w.value),
        other => panic!("expected a violation with witness for `{name}`, got {other:?}"),
    }
}

#[test]
fn in_bounds_read_is_satisfied() {
    let report = check(
        "assume testarray1: ArrT (15, lambda _: Nat. Float);\n\
         define a1 = ArrGet (15, lambda _: Nat. Float) testarray1 0;\n",
    );
    assert_eq!(verdict(&report, "a1"), Verdict::Satisfied);
    assert!(report.is_ok());
}

#[test]
fn out_of_bounds_read_is_violated_with_the_index_as_witness() {
    let report = check(
        "assume testarray1: ArrT (15, lambda _: Nat. Float);\n\
         define a2 = ArrGet (15, lambda _: Nat. Float) testarray1 16;\n",
    );
    assert_eq!(witness(&report, "a2"), ("index".to_string(), 16));
    assert!(!report.is_ok());
    assert_eq!(report.violations().count(), 1);
}

#[test]
fn unresolved_length_is_unknown_until_applied() {
    let report = check(
        "define a3 = lambda n: Nat. ArrGet (n, lambda _: Nat. Float) (arr n) 16;\n\
         define a4 = (lambda n: Nat. ArrGet (n, lambda _: Nat. Float) (arr n) 16) 20;\n\
         define a5 = a3 20;\n\
         define a6 = a3 10;\n",
    );
    assert_eq!(verdict(&report, "a3"), Verdict::Unknown);
    assert_eq!(verdict(&report, "a4"), Verdict::Satisfied);
    assert_eq!(verdict(&report, "a5"), Verdict::Satisfied);
    assert_eq!(witness(&report, "a6"), ("n".to_string(), 10));
}

#[test]
fn definitions_are_instantiated_freshly_per_use() {
    // Both uses of `a3` are independent: one short array must not taint the other.
    let report = check(
        "define a3 = lambda n: Nat. ArrGet (n, lambda _: Nat. Float) (arr n) 16;\n\
         define both = (a3 20, a3 30);\n\
         define mixed = (a3 20, a3 3);\n",
    );
    assert_eq!(verdict(&report, "both"), Verdict::Satisfied);
    assert_eq!(witness(&report, "mixed"), ("n".to_string(), 3));
}

#[test]
fn bounded_intake_checks_its_argument() {
    let report = check(
        "define i1 = intakeLower10 0;\n\
         define i2 = intakeLower10 12;\n\
         define i3 = intakeLower10 (intakeLower10 4);\n\
         define i4 = lambda x: Nat. intakeLower10 x;\n",
    );
    assert_eq!(verdict(&report, "i1"), Verdict::Satisfied);
    assert_eq!(witness(&report, "i2"), ("a".to_string(), 12));
    assert_eq!(verdict(&report, "i3"), Verdict::Satisfied);
    assert_eq!(verdict(&report, "i4"), Verdict::Unknown);
}

#[test]
fn sums_flow_into_bounded_intake() {
    let report = check(
        "define s1 = intakeLower10 (opAddNat (3, 4));\n\
         define s2 = intakeLower10 (opAddNat (6, 5));\n",
    );
    assert_eq!(verdict(&report, "s1"), Verdict::Satisfied);
    assert_eq!(witness(&report, "s2"), ("b".to_string(), 5));
}

#[test]
fn reduce_bounds_the_index_it_passes_on() {
    let reduce = "\
assume opFloatPlus: (Float, Float) -> Float;
assume cFloatZero: Float;
assume reduce: pi t: *. pi op: ((t, t) -> t). pi startval: t. pi len: Nat. pi values: (Nat -> t). t;
define sum10 = reduce Float opFloatPlus cFloatZero 10 \
    (lambda j: Nat. ArrGet (10, lambda _: Nat. Float) (arr 10) j);
define sum11 = reduce Float opFloatPlus cFloatZero 11 \
    (lambda j: Nat. ArrGet (10, lambda _: Nat. Float) (arr 10) j);
";
    let report = check(reduce);
    assert_eq!(verdict(&report, "sum10"), Verdict::Satisfied);
    assert_eq!(verdict(&report, "sum11"), Verdict::Unknown);
}

#[test]
fn function_parameters_are_fresh_at_each_call() {
    let body = "define twice = lambda f: Nat -> Nat. (f 3, f 4);\n\
                define limited = twice intakeLower10;\n";
    for registry in [AxiomRegistry::new(), AxiomRegistry::with_builtin_contracts()] {
        let report = check_with(body, &registry);
        assert_eq!(verdict(&report, "twice"), Verdict::Satisfied, "{registry:?}");
        let limited = verdict(&report, "limited");
        assert!(!matches!(limited, Verdict::Violated(_)), "{registry:?}: {limited}");
    }
    let report = check(body);
    assert_eq!(verdict(&report, "limited"), Verdict::Unknown);
}

#[test]
fn unregistered_axioms_are_always_satisfied() {
    let report = check(
        "assume g: Nat -> Nat;\n\
         define u = g 1000;\n\
         define w = lambda k: Nat. g (g k);\n",
    );
    assert_eq!(verdict(&report, "u"), Verdict::Satisfied);
    assert_eq!(verdict(&report, "w"), Verdict::Satisfied);
}

#[test]
fn without_builtins_nothing_is_violated() {
    let report = check_with(
        "assume testarray1: ArrT (15, lambda _: Nat. Float);\n\
         define a2 = ArrGet (15, lambda _: Nat. Float) testarray1 16;\n",
        &AxiomRegistry::new(),
    );
    assert_eq!(verdict(&report, "a2"), Verdict::Satisfied);
}

#[test]
fn failing_statements_are_isolated() {
    let report = check(
        "define bad = 3 4;\n\
         define fine = intakeLower10 1;\n\
         define uses_bad = bad;\n",
    );
    match report.get("bad") {
        Some(StatementOutcome::Failed(e)) => {
            assert_eq!(e.stage, ErrorStage::Type);
            assert!(e.message.contains("not a function"));
        }
        other => panic!("expected `bad` to fail, got {other:?}"),
    }
    assert_eq!(verdict(&report, "fine"), Verdict::Satisfied);
    match report.get("uses_bad") {
        Some(StatementOutcome::Failed(e)) => assert!(e.message.contains("unbound name")),
        other => panic!("expected `uses_bad` to fail, got {other:?}"),
    }
    assert_eq!(report.errors().count(), 2);
}

#[test]
fn violations_do_not_stop_later_statements() {
    let report = check(
        "define over = intakeLower10 99;\n\
         define under = intakeLower10 9;\n",
    );
    assert!(matches!(verdict(&report, "over"), Verdict::Violated(_)));
    assert_eq!(verdict(&report, "under"), Verdict::Satisfied);
}

#[test]
fn assumptions_report_types_without_verdicts() {
    let report = check("");
    let Some(StatementOutcome::Checked(r)) = report.get("intakeLower10") else {
        panic!("intakeLower10 should be assumed");
    };
    assert_eq!(r.kind, StatementKind::Assume);
    assert_eq!(r.ty, "Nat -> Nat");
    assert!(r.verdict.is_none());
    let tree = &r.descriptor.tree;
    assert_eq!(tree.to_string(), format!("<{0}, {0}>", tree.component(0)));
}

#[test]
fn checking_is_deterministic() {
    let body = "define a3 = lambda n: Nat. ArrGet (n, lambda _: Nat. Float) (arr n) 16;\n\
                define a6 = a3 10;\n";
    let first = serde_json::to_string(&check(body)).unwrap();
    let second = serde_json::to_string(&check(body)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn reports_serialize_with_statuses_and_verdicts() {
    let report = check(
        "define ok = intakeLower10 1;\n\
         define over = intakeLower10 11;\n\
         define broken = missing;\n",
    );
    let json = serde_json::to_value(&report).unwrap();
    let statements = json["statements"].as_array().unwrap();
    let by_name = |name: &str| {
        statements
            .iter()
            .find(|s| s["name"] == name)
            .cloned()
            .unwrap()
    };
    assert_eq!(by_name("ok")["status"], "checked");
    assert_eq!(by_name("ok")["verdict"], "satisfied");
    assert_eq!(by_name("over")["verdict"]["violated"]["name"], "a");
    assert_eq!(by_name("over")["verdict"]["violated"]["value"], 11);
    assert_eq!(by_name("broken")["status"], "failed");
    assert_eq!(by_name("broken")["stage"], "type");
}
