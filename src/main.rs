//! photosweep - duplicate finder and backup reconciler
//!
//! Entry point for the photosweep CLI application.

use photosweep::{
    cli::Cli,
    error::{ExitCode, StructuredError},
    logging::init_logging,
};

fn main() {
    let cli = Cli::parse_normalized();
    init_logging(cli.verbose, cli.quiet);

    match photosweep::run_app(cli) {
        Ok(code) => std::process::exit(code.as_i32()),
        Err(err) => {
            let exit_code = ExitCode::for_error(&err);
            let structured = StructuredError::new(&err, exit_code);
            log::debug!("{:?}", structured);
            eprintln!("[{}] Error: {}", structured.code, structured.message);
            std::process::exit(exit_code.as_i32());
        }
    }
}
