//! Command-line surface: `exprc [-d|--debug] <file>`.

use argh::FromArgs;

/// compiles a tiny arithmetic assignment language into synchronous RTL
/// Verilog
#[derive(FromArgs)]
pub struct Args {
    /// print IR, DFG, and schedule dumps before the Verilog
    #[argh(switch, short = 'd')]
    pub debug: bool,

    /// path to the source program
    #[argh(positional)]
    pub file: String,
}
