//! Power tuner CLI entry point.

fn main() {
    if let Err(e) = power_tuner_cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
