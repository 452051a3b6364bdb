//! Verilog emission. Renders a scheduled, allocated [`exprc_opt::Datapath`]
//! as a synthesizable Verilog-2001 module: a combinational/register
//! datapath plus a Moore FSM controller.
pub mod verilog;

pub use verilog::VerilogBackend;
