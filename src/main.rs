use clap::Parser;
use tether::cli::{Cli, Command, SyncArgs};
use tether::config::Config;
use tether::report;
use tether::source::http::HttpSource;
use tether::sync;

fn load_config(args: &SyncArgs) -> Config {
    Config::from_sync_args(args).unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(2);
    })
}

fn open_source(config: &Config) -> HttpSource {
    HttpSource::new(config).unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(2);
    })
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Pull(args) => {
            let config = load_config(&args);
            let source = open_source(&config);

            match sync::run(&config, &source) {
                Ok(result) => {
                    let had_failures = !result.failed.is_empty();
                    report::print_pull(&result, &config);
                    if had_failures {
                        std::process::exit(1);
                    }
                }
                Err(e) => {
                    eprintln!("pull failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Status(args) => {
            let config = load_config(&args);
            let source = open_source(&config);

            match sync::preview(&config, &source) {
                Ok(result) => report::print_status(&result, &config),
                Err(e) => {
                    eprintln!("status failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Watch(args) => {
            let interval = humantime::parse_duration(&args.interval).unwrap_or_else(|e| {
                eprintln!("invalid interval '{}': {e}", args.interval);
                std::process::exit(2);
            });

            let config = load_config(&args.sync);
            let source = open_source(&config);

            loop {
                let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");

                match sync::run(&config, &source) {
                    Ok(result) => {
                        println!(
                            "[{stamp}] pulled version {} ({} applied, {} failed)",
                            result.latest_version,
                            result.applied.len(),
                            result.failed.len()
                        );
                        if config.verbose {
                            report::print_pull(&result, &config);
                        }
                    }
                    // a failed pass is retried on the next tick
                    Err(e) => eprintln!("[{stamp}] pull failed: {e}"),
                }

                std::thread::sleep(interval);
            }
        }
    }
}
