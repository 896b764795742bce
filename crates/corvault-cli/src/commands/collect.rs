use super::ArrayArgs;

pub fn run(array: &ArrayArgs, format: &str) {
    let source = array.source();
    let pipeline = array.pipeline();

    let rt = super::runtime();
    match rt.block_on(corvault_server::collect_once(&source, &pipeline)) {
        Ok(snapshot) => {
            log::info!(
                "collected {} observations from {}",
                snapshot.observation_count(),
                array.host
            );
            super::print_snapshot(&snapshot, format);
        }
        Err(e) => {
            eprintln!("Collection failed ({}): {e}", e.kind());
            std::process::exit(1);
        }
    }
}
