use std::net::SocketAddr;

use corvault_server::ErrorPolicy;

use super::ArrayArgs;

pub fn run(array: &ArrayArgs, listen: &str, on_error: &str) {
    let listen: SocketAddr = match listen.parse() {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("Invalid --listen address '{listen}': {e}");
            std::process::exit(2);
        }
    };
    let policy = match on_error {
        "stale" => ErrorPolicy::Stale,
        _ => ErrorPolicy::Fail,
    };

    log::info!(
        "corvault-exporter v{} collecting from {}:{} as {}",
        corvault_core::VERSION,
        array.host,
        array.ssh_port,
        array.username
    );
    log::info!(
        "skipping {} banner lines; on collection failure: {on_error}",
        array.header_lines
    );

    let rt = super::runtime();
    if let Err(e) = rt.block_on(corvault_server::run_server(
        array.source(),
        array.pipeline(),
        listen,
        policy,
    )) {
        log::error!("server error: {e}");
        std::process::exit(1);
    }
}
