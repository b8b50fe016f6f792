use clap::Parser;

mod cli;
mod session;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = cli::Args::parse();

    match session::run(&args) {
        Ok(result) => {
            session::print_summary(&result);
        }
        Err(e) => {
            eprintln!("Review failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
