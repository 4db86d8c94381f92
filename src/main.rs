use std::{
    collections::BTreeMap,
    fs,
    io::{self, Write},
    path::PathBuf,
    process::exit,
};

use argh::FromArgs;
use minipar::{
    backend::{generate, listing},
    error::Error,
    frontend::{
        self,
        analyzer::{check_channels, SymbolTable},
        print_tree, tokenize,
    },
    runtime::{Interpreter, Options},
};
use ron::ser::PrettyConfig;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// CLI options
#[derive(FromArgs)]
struct Opts {
    #[argh(subcommand)]
    cmd: Cmd,
}

/// Command
#[derive(FromArgs)]
#[argh(subcommand)]
enum Cmd {
    Run(RunCmd),
    Compile(CompileCmd),
    Check(CheckCmd),
}

/// Run a program
#[derive(FromArgs)]
#[argh(subcommand, name = "run")]
struct RunCmd {
    #[argh(positional)]
    source: PathBuf,
    #[argh(option, description = "stop after this many instructions")]
    max_steps: Option<usize>,
    #[argh(switch, description = "recompute 'resultado' after each receive")]
    legacy_calculator: bool,
    #[argh(switch, description = "show the final integer variables")]
    env: bool,
}

/// Compile a program
#[derive(FromArgs)]
#[argh(subcommand, name = "compile")]
struct CompileCmd {
    #[argh(positional)]
    source: PathBuf,
    #[argh(switch, description = "show token output")]
    tokens: bool,
    #[argh(switch, description = "show AST output")]
    ast: bool,
    #[argh(switch, description = "show the AST as an indented tree")]
    tree: bool,
    #[argh(switch, description = "show three-address code (default)")]
    tac: bool,
}

/// Show the symbol table and channel arities of a program
#[derive(FromArgs)]
#[argh(subcommand, name = "check")]
struct CheckCmd {
    #[argh(positional)]
    source: PathBuf,
}

fn print_ron<T: Serialize>(value: &T) -> Result<(), Error> {
    println!(
        "{}",
        ron::ser::to_string_pretty(
            value,
            PrettyConfig::default()
                .struct_names(true)
                .indentor("  ")
                .compact_arrays(true)
        )?
    );

    Ok(())
}

fn cmd(opts: Opts) -> Result<(), Error> {
    match opts.cmd {
        Cmd::Run(RunCmd {
            source,
            max_steps,
            legacy_calculator,
            env,
        }) => {
            let source = fs::read_to_string(source)?;
            let (program, diagnostics) = frontend::parse_with_diagnostics(&source)?;

            for diagnostic in diagnostics {
                eprintln!("warning: {diagnostic} at {}", diagnostic.span);
            }

            let instructions = generate(&program);
            let options = Options {
                max_steps,
                legacy_calculator,
            };

            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut out = io::stdout().lock();
            let mut interpreter = Interpreter::new(options).with_input(&mut input);

            interpreter.run(&instructions, &mut out)?;

            if env {
                for (name, value) in interpreter.int_env().into_iter().collect::<BTreeMap<_, _>>() {
                    writeln!(out, "{name} = {value}")?;
                }
            }
        }
        Cmd::Compile(CompileCmd {
            source,
            tokens,
            ast,
            tree,
            tac,
        }) => {
            let source = fs::read_to_string(source)?;

            if tokens {
                print_ron(&tokenize(&source)?)?;
            }

            let program = frontend::parse(&source)?;

            if ast {
                print_ron(&program)?;
            }

            if tree {
                print!("{}", print_tree(&program));
            }

            if tac || !(tokens || ast || tree) {
                print!("{}", listing(&generate(&program)));
            }
        }
        Cmd::Check(CheckCmd { source }) => {
            let source = fs::read_to_string(source)?;
            let program = frontend::parse(&source)?;

            println!("symbols:");
            print!("{}", SymbolTable::build(&program));

            println!("\nchannels:");
            let reports = check_channels(&program);

            if reports.is_empty() {
                println!("<none>");
            }

            for report in reports {
                println!("{report}");
            }
        }
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let opts = argh::from_env();

    if let Err(e) = cmd(opts) {
        eprintln!("{e} at {}", e.span());
        exit(1);
    }
}
