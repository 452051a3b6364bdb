//! End-to-end tests exercising the real `exprc` binary across the
//! compiler's main usage scenarios.

use std::io::Write as _;
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn compile(source: &str) -> Output {
    compile_with(&[], source)
}

fn compile_with(extra_args: &[&str], source: &str) -> Output {
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    let mut path = std::env::temp_dir();
    path.push(format!("exprc_cli_test_{}_{n}.exc", std::process::id()));
    {
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(source.as_bytes()).unwrap();
    }

    let output = Command::new(env!("CARGO_BIN_EXE_exprc"))
        .args(extra_args)
        .arg(&path)
        .output()
        .expect("failed to run exprc");

    std::fs::remove_file(&path).ok();
    output
}

#[test]
fn three_op_example_compiles_to_verilog() {
    let output = compile("C = A + B;\nF = A + D;\nout G = C * F;\n");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let verilog = String::from_utf8_lossy(&output.stdout);
    assert!(verilog.contains("module exprc("));
    assert!(verilog.contains("endmodule"));
    assert!(verilog.contains("assign G = mul0_out;"));
}

#[test]
fn sequential_chain_reuses_one_adder() {
    let output = compile("out Y = ((A + B) + C) + D;\n");
    assert!(output.status.success());
    let verilog = String::from_utf8_lossy(&output.stdout);
    assert_eq!(verilog.matches("wire [7:0] add0_out").count(), 1);
}

#[test]
fn implicit_input_declaration_compiles() {
    let output = compile("out Z = A;\n");
    assert!(output.status.success());
    let verilog = String::from_utf8_lossy(&output.stdout);
    assert!(verilog.contains("assign Z = A;"));
}

#[test]
fn redefinition_is_a_compile_error() {
    let output = compile("A = B + C;\nA = D + E;\nout Y = A;\n");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.trim(), "Error: variable A defined more than once");
}

#[test]
fn dead_code_is_a_compile_error() {
    let output = compile("X = A + B;\nout Y = C;\n");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.trim(), "Error: variable X is not used");
}

#[test]
fn missing_semicolon_is_a_parse_error() {
    let output = compile("out Y = A + B\n");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("Error:"));
}

#[test]
fn missing_file_is_reported_as_an_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_exprc"))
        .arg("/no/such/file.exc")
        .output()
        .expect("failed to run exprc");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("Error:"));
}

#[test]
fn debug_flag_prints_dumps_before_the_verilog() {
    let output = compile_with(&["-d"], "out Z = A;\n");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("-- instructions --"));
    assert!(stdout.contains("-- def/use --"));
    assert!(stdout.contains("-- schedule --"));
    let dump_pos = stdout.find("-- schedule --").unwrap();
    let verilog_pos = stdout.find("module exprc(").unwrap();
    assert!(dump_pos < verilog_pos, "dumps must print before the Verilog");
}
