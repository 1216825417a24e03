use clap::Parser;
use log::{debug, warn};

mod args;
mod forecast;

fn main() {
    let args = args::Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
    debug!("args: {:?}", args);

    let res = forecast::run_command(&args);
    if let Err(e) = res {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured: {}", e);
        if e.is_retryable() {
            eprintln!("The input could not be read, trying again may help.");
        }
        std::process::exit(1);
    }
}
