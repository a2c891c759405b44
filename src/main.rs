use env_logger::Env;

mod cli;
mod config;
mod output;
mod prelude;
mod snapshot;

fn main() {
    env_logger::Builder::from_env(Env::new().filter_or("PROCFOREST_LOG", "info"))
        .format_timestamp(None)
        .init();

    if let Err(err) = cli::run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}
