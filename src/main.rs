use clap::Parser;
use playbook::cli::{Cli, run};
use playbook::logging::init_tracing;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run(cli)
}
