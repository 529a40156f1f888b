use std::process::ExitCode;

use clap::Parser;

use halftone::cli;

fn main() -> ExitCode {
    halftone::logger::init();
    let args = cli::CliArgs::parse();
    cli::run(args)
}
