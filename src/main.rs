use std::env;
use std::process;

use w16sim::cli::{self, ParsedArgs};

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    let config = match cli::parse_args(&args) {
        Ok(ParsedArgs::Help) => {
            print!("{}", cli::HELP_BANNER);
            process::exit(0);
        }
        Ok(ParsedArgs::Run(config)) => config,
        Err(err) => {
            println!("{}", err);
            process::exit(1);
        }
    };

    if let Err(err) = w16sim::run(config) {
        println!("{}", err);
        process::exit(1);
    }
}
