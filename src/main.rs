use std::process::ExitCode;

fn main() -> anyhow::Result<ExitCode> {
    specguard::cli::run_cli()
}
