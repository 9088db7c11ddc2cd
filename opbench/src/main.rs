use std::process::ExitCode;

fn main() -> ExitCode {
    opbench::run()
}
