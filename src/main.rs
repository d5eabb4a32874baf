// src/main.rs

use pldump::{cli, logging, run};

#[tokio::main]
async fn main() {
    let args = match cli::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // clap renders its own usage/help output; --help and --version
            // land here too and exit cleanly.
            let _ = err.print();
            std::process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    if let Err(err) = run_main(args).await {
        eprintln!("pldump error: {err}");
        std::process::exit(err.exit_code());
    }
}

async fn run_main(args: cli::CliArgs) -> pldump::errors::Result<()> {
    logging::init_logging(args.log_level)?;
    run(args).await
}
