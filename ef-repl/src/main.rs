//! Interactive/one-shot front end for the solver core (SPEC_FULL.md §6.2's
//! text-goal surface), grounded on `chalk-repl/src/main.rs`'s `Args`/
//! `readline_loop`/`process`/`help` split, with `clap`'s derive API and
//! `anyhow` standing in for the teacher's `docopt`/`failure` pair.

use std::process::exit;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ef_driver::{Cancellation, NumberFormat, SolverOptions};
use ef_integration::render_outcome;
use rustyline::error::ReadlineError;
use rustyline::Editor;

/// exists/forall bit-vector solver REPL and one-shot evaluator.
#[derive(Debug, Parser)]
#[command(name = "efi", version, about)]
struct Args {
    /// Goal to evaluate (may be given more than once). With no goal,
    /// starts an interactive session.
    #[arg(long = "goal")]
    goals: Vec<String>,

    /// Caps CEGIS iterations; hitting it reports `unknown`.
    #[arg(long = "max-iterations")]
    max_iterations: Option<u32>,

    /// Disables the synthesizer's symbolic search, using only the
    /// concrete `ite`-chain fallback model.
    #[arg(long = "no-synth")]
    no_synth: bool,

    /// Bottom-up enumeration depth passed to the synthesizer.
    #[arg(long = "synth-level", default_value_t = 4)]
    synth_level: u32,

    /// Number base for rendered model values.
    #[arg(long = "format", value_enum, default_value_t = CliNumberFormat::Bin)]
    format: CliNumberFormat,

    /// Render a `sat` model as a line-oriented BTOR dump instead of
    /// SMT-LIB2's `(model ...)` block.
    #[arg(long = "btor")]
    btor: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliNumberFormat {
    Bin,
    Dec,
    Hex,
}

impl From<CliNumberFormat> for NumberFormat {
    fn from(f: CliNumberFormat) -> NumberFormat {
        match f {
            CliNumberFormat::Bin => NumberFormat::Bin,
            CliNumberFormat::Dec => NumberFormat::Dec,
            CliNumberFormat::Hex => NumberFormat::Hex,
        }
    }
}

impl Args {
    fn solver_options(&self) -> SolverOptions {
        SolverOptions::builder()
            .max_iterations(self.max_iterations)
            .synth_enabled(!self.no_synth)
            .synth_level(self.synth_level)
            .number_format(self.format.into())
            .build()
    }
}

/// Mutable session state a `set` command can adjust between goals, separate
/// from the immutable `Args` the process was launched with.
struct Session {
    options: SolverOptions,
    btor: bool,
}

impl Session {
    fn from_args(args: &Args) -> Session {
        Session {
            options: args.solver_options(),
            btor: args.btor,
        }
    }

    fn run_goal(&self, text: &str) -> Result<()> {
        let cancel = Cancellation::new();
        let outcome = ef_integration::solve_text(text, self.options, &cancel)
            .with_context(|| format!("evaluating goal `{}`", text))?;
        print!("{}", render_outcome(&outcome, self.options.number_format, self.btor));
        Ok(())
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let mut session = Session::from_args(&args);

    if args.goals.is_empty() {
        let mut rl: Editor<()> = Editor::new().context("initializing the line editor")?;
        readline_loop(&mut rl, "?- ", |_, line| {
            if let Err(e) = process(&mut session, line) {
                eprintln!("error: {:#}", e);
            }
        })
    } else {
        for goal in &args.goals {
            if let Err(e) = session.run_goal(goal) {
                eprintln!("error: {:#}", e);
                exit(1);
            }
        }
        Ok(())
    }
}

/// Reads input lines with `prompt` until EOF, handing each to `f`. Mirrors
/// the teacher's helper of the same name and contract.
fn readline_loop<F>(rl: &mut Editor<()>, prompt: &str, mut f: F) -> Result<()>
where
    F: FnMut(&mut Editor<()>, &str),
{
    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                f(rl, &line);
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Dispatches one REPL line: `help`, `set <option> <value>`, `options`, or a
/// bare goal. Unlike the teacher's `process` there is no `program`/`load`
/// step — a goal here is already a self-contained closed formula, with no
/// separate trait/impl program to load first.
fn process(session: &mut Session, command: &str) -> Result<()> {
    let command = command.trim();
    if command.is_empty() {
        return Ok(());
    } else if command == "help" || command == "h" {
        help();
    } else if command == "options" {
        print_options(session);
    } else if let Some(rest) = command.strip_prefix("set ") {
        set_option(session, rest)?;
    } else {
        session.run_goal(command)?;
    }
    Ok(())
}

fn set_option(session: &mut Session, rest: &str) -> Result<()> {
    let mut parts = rest.split_whitespace();
    let (name, value) = match (parts.next(), parts.next()) {
        (Some(n), Some(v)) => (n, v),
        _ => bail!("usage: set <option> <value>; type 'help' to see available options"),
    };
    match name {
        "max-iterations" => {
            session.options.max_iterations = if value == "none" {
                None
            } else {
                Some(value.parse().context("max-iterations takes a number or `none`")?)
            };
        }
        "synth" => session.options.synth_enabled = parse_bool(value)?,
        "dual-solver" => session.options.dual_solver = parse_bool(value)?,
        "synth-level" => session.options.synth_level = value.parse().context("synth-level takes a number")?,
        "format" => {
            session.options.number_format = match value {
                "bin" => NumberFormat::Bin,
                "dec" => NumberFormat::Dec,
                "hex" => NumberFormat::Hex,
                other => bail!("unknown format `{}`; expected bin, dec, or hex", other),
            }
        }
        "btor" => session.btor = parse_bool(value)?,
        other => bail!("unknown option `{}`; type 'help' to see available options", other),
    }
    Ok(())
}

fn parse_bool(value: &str) -> Result<bool> {
    match value {
        "on" | "true" => Ok(true),
        "off" | "false" => Ok(false),
        other => bail!("expected on/off, found `{}`", other),
    }
}

fn print_options(session: &Session) {
    let o = &session.options;
    println!("max-iterations: {}", o.max_iterations.map_or("none".to_string(), |n| n.to_string()));
    println!("synth:          {}", if o.synth_enabled { "on" } else { "off" });
    println!("dual-solver:    {}", if o.dual_solver { "on" } else { "off" });
    println!("synth-level:    {}", o.synth_level);
    println!("format:         {:?}", o.number_format);
    println!("btor:           {}", if session.btor { "on" } else { "off" });
}

fn help() {
    println!("Commands:");
    println!("  help                    print this output");
    println!("  options                 print the current solver options");
    println!("  set <option> <value>    adjust an option (max-iterations, synth, dual-solver, synth-level, format, btor)");
    println!("  <goal>                  parse and solve <goal>, e.g. (forall (x 4) (exists (y 4) (= x y)))");
}

fn main() {
    tracing_subscriber::fmt::init();
    exit(match run() {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {:#}", e);
            1
        }
    });
}
