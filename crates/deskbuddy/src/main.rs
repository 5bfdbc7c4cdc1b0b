mod runtime;

use std::error::Error;

fn main() {
    if let Err(err) = runtime::run_from_args() {
        eprintln!("error: {err}");
        let mut source = err.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
        std::process::exit(1);
    }
}
