#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bound_ast::{Program, Stmt};
use bound_core::{CheckConfig, Elaborator};
use bound_parse::ParseError;
use bound_verify::{AxiomRegistry, ProgramReport, StatementOutcome};
use clap::{ArgAction, Args, Parser, Subcommand};
use miette::{IntoDiagnostic, NamedSource};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;
mod report;

use report::display_path;

/// Environment variable holding a `tracing` filter; overrides `-v`.
const LOG_ENV: &str = "BOUND_LOG";

#[derive(Parser, Debug)]
#[command(
    name = "bound",
    version,
    about = "Refinement checker for a dependently typed lambda calculus with array bounds"
)]
struct Cli {
    /// Increase log verbosity (repeatable: -v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Type-check a program and check every definition against the axiom contracts
    Check {
        /// Input program
        path: PathBuf,

        /// Print a machine-readable JSON report instead of text
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Do not install the builtin contracts (`ArrGet`, `opAddNat`, ...)
        #[arg(long, default_value_t = false)]
        no_builtins: bool,

        #[command(flatten)]
        settings: ConfigArgs,

        /// Decide emptiness with Z3 instead of Fourier-Motzkin
        #[cfg(feature = "z3")]
        #[arg(long, default_value_t = false)]
        z3: bool,
    },

    /// Print the canonical form of a program
    Fmt {
        /// Input program
        path: PathBuf,

        /// Check formatting (exits non-zero if changes are needed)
        #[arg(long, default_value_t = false)]
        check: bool,
    },

    /// Print `name : type` for every statement
    Types {
        /// Input program
        path: PathBuf,

        #[command(flatten)]
        settings: ConfigArgs,
    },
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Config file. Defaults to the nearest `bound.toml` above the input.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override `max_reduction_steps`
    #[arg(long)]
    max_reduction_steps: Option<usize>,
}

impl ConfigArgs {
    /// The config file for `input` with command-line overrides applied.
    fn resolve(&self, input: &Path) -> miette::Result<(Option<PathBuf>, CheckConfig)> {
        let resolved = config::resolve_config(self.config.as_deref(), input)?;
        if let Some(p) = &resolved.config_path {
            info!(config = %display_path(p), "loaded config");
        }
        let mut check = resolved.check;
        if let Some(steps) = self.max_reduction_steps {
            check.max_reduction_steps = steps;
        }
        Ok((resolved.config_path, check))
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> miette::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.cmd {
        Cmd::Check {
            path,
            json,
            no_builtins,
            settings,
            #[cfg(feature = "z3")]
            z3,
        } => {
            let (config_path, mut check) = settings.resolve(&path)?;
            if no_builtins {
                check.builtin_contracts = false;
            }

            let (source, program, syntax_errors) = load_program_recovering(&path)?;
            let registry = AxiomRegistry::for_config(&check);
            debug!(contracts = ?registry.names(), "registry ready");

            #[cfg(feature = "z3")]
            let report = if z3 {
                let oracle = bound_verify::Z3Oracle::new();
                bound_verify::check_program_with(&program, &registry, &check, &oracle)
            } else {
                bound_verify::check_program(&program, &registry, &check)
            };
            #[cfg(not(feature = "z3"))]
            let report = bound_verify::check_program(&program, &registry, &check);

            if json {
                let doc = report::CheckReport::new(
                    &path,
                    config_path.as_deref(),
                    &program,
                    &syntax_errors,
                    &report,
                );
                println!("{}", serde_json::to_string_pretty(&doc).into_diagnostic()?);
            } else {
                print_report(&report, &source);
            }
            Ok(exit_code(report.is_ok() && syntax_errors.is_empty()))
        }

        Cmd::Fmt { path, check } => {
            let (source, program) = load_program(&path)?;
            let formatted = bound_parse::format_program(&program);
            if check {
                if formatted != *source.inner() {
                    return Err(miette::miette!("{} is not formatted", display_path(&path)));
                }
                return Ok(ExitCode::SUCCESS);
            }
            print!("{formatted}");
            Ok(ExitCode::SUCCESS)
        }

        Cmd::Types { path, settings } => {
            let (_, check) = settings.resolve(&path)?;
            let (source, program, syntax_errors) = load_program_recovering(&path)?;
            let typed = print_types(&program, check, &source);
            Ok(exit_code(typed && syntax_errors.is_empty()))
        }
    }
}

fn exit_code(ok: bool) -> ExitCode {
    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn read_source(path: &Path) -> miette::Result<NamedSource<String>> {
    let src = fs::read_to_string(path)
        .into_diagnostic()
        .map_err(|e| miette::miette!("failed to read {}: {e}", display_path(path)))?;
    Ok(NamedSource::new(display_path(path), src))
}

fn load_program(path: &Path) -> miette::Result<(NamedSource<String>, Program)> {
    let source = read_source(path)?;
    let program = bound_parse::parse_source(source.inner())
        .map_err(|e| miette::Report::new(e).with_source_code(source.clone()))?;
    Ok((source, program))
}

/// Keeps every statement that parsed. Each syntax error is rendered to
/// stderr and returned; a lex error still rejects the whole file.
fn load_program_recovering(
    path: &Path,
) -> miette::Result<(NamedSource<String>, Program, Vec<ParseError>)> {
    let source = read_source(path)?;
    let (program, errors) = bound_parse::parse_source_with_recovery(source.inner())
        .map_err(|e| miette::Report::new(e).with_source_code(source.clone()))?;
    for e in &errors {
        let diag = miette::Report::new(e.clone()).with_source_code(source.clone());
        eprintln!("{diag:?}");
    }
    if !errors.is_empty() {
        debug!(
            errors = errors.len(),
            statements = program.stmts.len(),
            "recovered from syntax errors"
        );
    }
    Ok((source, program, errors))
}

fn print_report(report: &ProgramReport, source: &NamedSource<String>) {
    for outcome in &report.statements {
        match outcome {
            StatementOutcome::Checked(r) => match &r.verdict {
                Some(verdict) => println!("{} : {}  [{verdict}]", r.name, r.ty),
                None => println!("{} : {}", r.name, r.ty),
            },
            StatementOutcome::Failed(e) => {
                println!("{} : <error>", e.name);
                let diag = miette::Report::new(e.clone()).with_source_code(source.clone());
                eprintln!("{diag:?}");
            }
        }
    }
}

/// Elaborates without contracts. Returns `false` if any statement failed.
fn print_types(program: &Program, config: CheckConfig, source: &NamedSource<String>) -> bool {
    let mut elab = Elaborator::new(config);
    let mut ok = true;
    for stmt in &program.stmts {
        let name = stmt.name().node.as_str();
        let ty = match stmt {
            Stmt::Assume(s) => elab.assume(name, &s.ty).map(|ax| ax.ty.clone()),
            Stmt::Define(s) => elab
                .define(name, s.ty.as_ref(), &s.value)
                .map(|def| def.ty.clone()),
        };
        match ty {
            Ok(ty) => println!("{name} : {ty}"),
            Err(e) => {
                ok = false;
                println!("{name} : <error>");
                let diag = miette::Report::new(e).with_source_code(source.clone());
                eprintln!("{diag:?}");
            }
        }
    }
    ok
}
