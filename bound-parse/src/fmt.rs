#![forbid(unsafe_code)]

use bound_ast::{Program, Stmt, Term};

pub fn format_program(program: &Program) -> String {
    let mut out = String::new();
    for stmt in &program.stmts {
        fmt_stmt(&mut out, stmt);
        out.push('\n');
    }
    out
}

pub fn format_term(term: &Term) -> String {
    term.to_string()
}

fn fmt_stmt(out: &mut String, stmt: &Stmt) {
    match stmt {
        Stmt::Assume(s) => {
            out.push_str("assume ");
            out.push_str(&s.name.node);
            out.push_str(": ");
            out.push_str(&format_term(&s.ty));
        }
        Stmt::Define(s) => {
            out.push_str("define ");
            out.push_str(&s.name.node);
            if let Some(ty) = &s.ty {
                out.push_str(": ");
                out.push_str(&format_term(ty));
            }
            out.push_str(" = ");
            out.push_str(&format_term(&s.value));
        }
    }
    out.push(';');
}
