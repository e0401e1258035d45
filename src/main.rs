use clap::Parser;
use std::process::ExitCode;
use walcman_updater::cli;
use walcman_updater::core::user_friendly_error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    if !cli.is_worker() {
        colored::control::set_virtual_terminal(true).ok();
    }

    match cli.execute().await {
        Ok(code) => code,
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            ExitCode::FAILURE
        }
    }
}
