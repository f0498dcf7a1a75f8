mod app;
mod arguments;
mod error;

use std::io::{self, Write};
use std::process;

use error::GitishError;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(&args) {
        eprintln!("{}: {}", arguments::PROGRAM, e);
        process::exit(e.exit_code());
    }
}

fn run(args: &[String]) -> Result<(), GitishError> {
    let cli = arguments::build_cli()?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    app::run(&cli, args, &mut out)?;
    out.flush()?;
    Ok(())
}
