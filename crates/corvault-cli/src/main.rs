//! CLI for corvault-exporter — Seagate Corvault statistics for Prometheus.

mod commands;

use clap::{Parser, Subcommand};

use commands::ArrayArgs;

#[derive(Parser)]
#[command(name = "corvault-exporter")]
#[command(about = "corvault-exporter — Seagate Corvault controller and disk statistics for Prometheus")]
#[command(version = corvault_core::VERSION)]
struct Cli {
    /// Log filter (error, warn, info, debug, trace). RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve /metrics, collecting from the array on every scrape
    Serve {
        #[command(flatten)]
        array: ArrayArgs,

        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:9700")]
        listen: String,

        /// Scrape answer when collection fails: fail (503) or stale (last good snapshot)
        #[arg(long, default_value = "fail", value_parser = ["fail", "stale"])]
        on_error: String,
    },

    /// Collect once from the array and print the result
    Collect {
        #[command(flatten)]
        array: ArrayArgs,

        /// Output format
        #[arg(long, default_value = "prometheus", value_parser = ["prometheus", "json"])]
        format: String,
    },

    /// Run the pipeline over captured CLI output files instead of a live array
    Replay {
        /// File holding `show controller-statistics` output
        #[arg(long)]
        controller: String,

        /// File holding `show disk-statistics` output
        #[arg(long)]
        disk: String,

        /// Value for the `host` label
        #[arg(long, default_value = "replay")]
        label_host: String,

        /// Banner lines to skip before the JSON payload
        #[arg(long, default_value_t = corvault_core::DEFAULT_HEADER_LINES)]
        header_lines: usize,

        /// Output format
        #[arg(long, default_value = "prometheus", value_parser = ["prometheus", "json"])]
        format: String,
    },
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    match cli.command {
        Commands::Serve {
            array,
            listen,
            on_error,
        } => commands::serve::run(&array, &listen, &on_error),
        Commands::Collect { array, format } => commands::collect::run(&array, &format),
        Commands::Replay {
            controller,
            disk,
            label_host,
            header_lines,
            format,
        } => commands::replay::run(&controller, &disk, &label_host, header_lines, &format),
    }
}
