//! Offline pipeline run over captured `show ...-statistics` output.
//!
//! Useful after a firmware update: capture both commands with
//! `ssh monitor@array 'set cli-parameters json; show disk-statistics' > disk.txt`
//! and check whether the banner length still matches.

use std::path::Path;

use corvault_core::{CollectError, CommandOutput, Pipeline, Snapshot};

pub fn run(controller: &str, disk: &str, label_host: &str, header_lines: usize, format: &str) {
    let load = |path: &str| match load_output(Path::new(path)) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("Failed to read captured output {path}: {e}");
            std::process::exit(1);
        }
    };
    let controller_out = load(controller);
    let disk_out = load(disk);

    match replay(&controller_out, &disk_out, label_host, header_lines) {
        Ok(snapshot) => super::print_snapshot(&snapshot, format),
        Err(e) => {
            eprintln!("Replay failed ({}): {e}", e.kind());
            if let CollectError::SchemaDrift { .. } = e {
                eprintln!("Try a different --header-lines value.");
            }
            std::process::exit(1);
        }
    }
}

fn load_output(path: &Path) -> std::io::Result<CommandOutput> {
    let text = std::fs::read_to_string(path)?;
    log::debug!("read {} bytes from {}", text.len(), path.display());
    Ok(CommandOutput::from_stdout(&text))
}

fn replay(
    controller: &CommandOutput,
    disk: &CommandOutput,
    label_host: &str,
    header_lines: usize,
) -> Result<Snapshot, CollectError> {
    Pipeline::new(label_host, header_lines).collect(controller, disk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_output_splits_lines() {
        let file = write_temp("banner\r\n{\r\n}\r\n");
        let output = load_output(file.path()).unwrap();
        assert_eq!(output.exit_status, 0);
        assert_eq!(output.stdout, vec!["banner", "{", "}"]);
    }

    #[test]
    fn test_load_output_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_output(&dir.path().join("absent.txt")).is_err());
    }

    #[test]
    fn test_replay_files() {
        let controller = write_temp(
            "banner\n{\"controller-statistics\":[{\"durable-id\":\"controller_a\",\"cpu-load\":\"3\",\
             \"bytes-per-second-numeric\":\"0\",\"iops\":\"0\",\"number-of-reads\":\"0\",\
             \"number-of-writes\":\"0\",\"read-cache-hits\":\"0\",\"read-cache-misses\":\"0\",\
             \"write-cache-hits\":\"0\",\"write-cache-misses\":\"0\",\"write-cache-used\":\"0\"}]}\n\
             # show controller-statistics\n",
        );
        let disk = write_temp("banner\n{\"disk-statistics\":[]}\n");
        let snapshot = replay(
            &load_output(controller.path()).unwrap(),
            &load_output(disk.path()).unwrap(),
            "lab",
            1,
        )
        .unwrap();
        assert_eq!(snapshot.observation_count(), 10);
        let cpu = &snapshot.get("seagate_corvault_controller_cpuload").unwrap().observations[0];
        assert_eq!(cpu.labels.host, "lab");
        assert_eq!(cpu.value, 3.0);
    }

    #[test]
    fn test_replay_wrong_header_count() {
        let controller = write_temp("banner\nsecond banner\n{\"controller-statistics\":[]}\n");
        let disk = write_temp("banner\nsecond banner\n{\"disk-statistics\":[]}\n");
        let err = replay(
            &load_output(controller.path()).unwrap(),
            &load_output(disk.path()).unwrap(),
            "lab",
            1,
        )
        .unwrap_err();
        assert!(matches!(err, CollectError::SchemaDrift { header_lines: 1, .. }));
    }
}
