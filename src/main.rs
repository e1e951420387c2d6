use clap::Parser;
use twig::cli::commands::Cli;
use twig::cli::handlers;

fn main() {
    twig::logging::init();
    let cli = Cli::parse();

    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
