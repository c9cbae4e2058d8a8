use std::process::ExitCode;

fn main() -> ExitCode {
    enquiry_cli::run()
}
