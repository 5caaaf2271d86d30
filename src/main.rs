//! Gatekeeper command line entry point

use std::process::ExitCode;

use gatekeeper::common::LoggingContext;
use gatekeeper::Bootstrap;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut stdout = std::io::stdout();

    match Bootstrap::new().run(&args, &mut stdout) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            if LoggingContext::is_installed() {
                log::error!("ERROR: {}", err);
                log::logger().flush();
            } else {
                eprintln!("ERROR: {}", err);
            }
            ExitCode::FAILURE
        }
    }
}
