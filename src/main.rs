use clap::Parser;
use qtbacktest::adapters::tracing_sink::init_tracing;
use qtbacktest::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    if let Err(e) = init_tracing("info") {
        eprintln!("warning: {e}");
    }
    run(Cli::parse())
}
