//! The `exprc` binary: orchestrates the whole pipeline end to end. Parses
//! a source file, lowers it to IR, checks for dead code, schedules and
//! allocates a datapath, and prints the resulting Verilog. Every
//! `ExprcResult::Err` along the way is reported as `Error: {msg}` on
//! stderr with exit code 1; success exits 0.

mod cmdline;
mod deadcode;
mod dump;

use exprc_backend::VerilogBackend;
use exprc_frontend::parse_program;
use exprc_ir::{Dfg, Translator};
use exprc_opt::{Allocator, Scheduler};
use exprc_utils::ExprcResult;

fn main() {
    env_logger::init();
    let args: cmdline::Args = argh::from_env();

    if let Err(err) = run(&args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run(args: &cmdline::Args) -> ExprcResult<()> {
    let source = std::fs::read_to_string(&args.file)?;
    let program = parse_program(&source)?;

    let ir = Translator::translate(&program)?;
    let dfg = Dfg::build(&ir)?;
    deadcode::check(&ir, &dfg)?;

    let schedule = Scheduler::schedule(&ir, &dfg);
    if args.debug {
        dump::dump(&ir, &dfg, &schedule);
    }

    let datapath = Allocator::allocate(&ir, &schedule);
    let verilog = VerilogBackend::emit(&schedule, &datapath);
    println!("{verilog}");

    Ok(())
}
