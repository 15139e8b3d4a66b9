use trendline::cli::run;
use trendline::status::StatusError;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();
    // Colour output on Windows consoles; other platforms need nothing
    let _ = enable_ansi_support::enable_ansi_support();

    if let Err(e) = run() {
        // No usable history is an expected outcome, not a failure of the ledger
        if let Some(StatusError::NoFinishedBuilds) = e.downcast_ref::<StatusError>() {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }

        // Check if this is an internal error (database corruption, etc.)
        let error_str: String = e.to_string();
        if error_str.contains("database") || error_str.contains("constraint") ||
           error_str.contains("corruption") || error_str.contains("SQLite") ||
           error_str.contains("Failed to") {
            eprintln!("Internal error: {}", e);
            let mut source = e.source();
            if source.is_some() {
                eprintln!("\nCaused by:");
                let mut indent = 1;
                while let Some(err) = source {
                    eprintln!("{:indent$}  {}", "", err);
                    source = err.source();
                    indent += 1;
                }
            }
            std::process::exit(2);
        } else {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
