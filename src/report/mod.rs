pub mod json;
pub mod table;

use crate::config::Config;
use crate::sync::{PullResult, StatusResult};
use crate::util::format_bytes;

pub fn print_pull(result: &PullResult, config: &Config) {
    if config.json_output {
        println!("{}", json::render_pull(result));
    } else {
        print!("{}", table::render_pull(result));
        print_pass_info(result, config.verbose);
    }
}

pub fn print_status(result: &StatusResult, config: &Config) {
    if config.json_output {
        println!("{}", json::render_status(result));
    } else {
        print!("{}", table::render_status(result));
    }
}

fn print_pass_info(result: &PullResult, verbose: bool) {
    if let Some(duration_ms) = result.duration_ms {
        let duration_sec = duration_ms as f64 / 1000.0;
        println!("\npass completed in {duration_sec:.2}s");

        if verbose {
            if let Some(peak_bytes) = result.peak_memory_bytes {
                println!("peak memory: {}", format_bytes(peak_bytes as u64));
            }
        }
    }
}
