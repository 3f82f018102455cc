//! `ritual` binary

use ritual_cli::output::print_error;

fn main() {
    if let Err(e) = ritual_cli::run() {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}
