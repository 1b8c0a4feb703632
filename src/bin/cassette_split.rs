//! Splits a monolithic cassette YAML file into per-port cassette files.
//!
//! The output directory has the layout of a recording session
//! (`store.cassette.yaml`, `discovery.cassette.yaml`), so it can be loaded
//! with `CassetteConfig::from_session_dir`.
//!
//! Usage: `cassette_split <input.yaml> <output_dir>`

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::{env, fs, process};

use chrono::Utc;
use claim_migrator::cassette::format::{Cassette, Interaction};

/// A per-port cassette that links back to the original recording session.
#[derive(serde::Serialize)]
struct PerPortCassette {
    name: String,
    recorded_at: chrono::DateTime<Utc>,
    cluster: String,
    source_session: String,
    interactions: Vec<Interaction>,
}

fn split_cassette(input: &str, output_dir: &str) -> Result<(), String> {
    let input_path = PathBuf::from(input);
    let output_path = PathBuf::from(output_dir);

    let cassette = Cassette::load(&input_path)?;

    fs::create_dir_all(&output_path)
        .map_err(|e| format!("Failed to create {}: {e}", output_path.display()))?;

    let mut by_port: BTreeMap<String, Vec<Interaction>> = BTreeMap::new();
    for interaction in &cassette.interactions {
        by_port.entry(interaction.port.clone()).or_default().push(interaction.clone());
    }

    for (port_name, interactions) in &by_port {
        let renumbered: Vec<Interaction> = interactions
            .iter()
            .enumerate()
            .map(|(i, orig)| Interaction {
                seq: i as u64,
                port: orig.port.clone(),
                method: orig.method.clone(),
                input: orig.input.clone(),
                output: orig.output.clone(),
            })
            .collect();

        let per_port = PerPortCassette {
            name: format!("{}-{}", cassette.name, port_name),
            recorded_at: cassette.recorded_at,
            cluster: cassette.cluster.clone(),
            source_session: cassette.name.clone(),
            interactions: renumbered,
        };

        let file_path = output_path.join(format!("{port_name}.cassette.yaml"));
        let yaml = serde_yaml::to_string(&per_port)
            .map_err(|e| format!("Failed to serialize cassette for port {port_name}: {e}"))?;
        fs::write(&file_path, yaml)
            .map_err(|e| format!("Failed to write {}: {e}", file_path.display()))?;

        println!("Wrote {}", file_path.display());
    }

    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: cassette_split <input.yaml> <output_dir>");
        process::exit(1);
    }

    if let Err(e) = split_cassette(&args[1], &args[2]) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim_migrator::cassette::config::CassetteConfig;
    use serde_json::json;

    fn interaction(seq: u64, port: &str, method: &str) -> Interaction {
        Interaction {
            seq,
            port: port.into(),
            method: method.into(),
            input: json!({}),
            output: json!({"Ok": null}),
        }
    }

    fn write_monolithic_fixture(path: &std::path::Path) {
        let cassette = Cassette {
            name: "test-session".into(),
            recorded_at: chrono::Utc::now(),
            cluster: "https://kind:6443".into(),
            interactions: vec![
                interaction(0, "store", "get"),
                interaction(1, "discovery", "server_resources"),
                interaction(2, "store", "create"),
                interaction(3, "store", "delete"),
            ],
        };
        let yaml = serde_yaml::to_string(&cassette).unwrap();
        std::fs::write(path, yaml).unwrap();
    }

    #[test]
    fn split_creates_per_port_files_with_correct_contents() {
        let dir = std::env::temp_dir().join("claim_migrator_cassette_split_test");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let input = dir.join("monolithic.yaml");
        let output = dir.join("split_output");

        write_monolithic_fixture(&input);
        split_cassette(input.to_str().unwrap(), output.to_str().unwrap()).unwrap();

        let store_path = output.join("store.cassette.yaml");
        assert!(store_path.exists(), "store cassette should exist");
        let store: serde_yaml::Value =
            serde_yaml::from_str(&fs::read_to_string(&store_path).unwrap()).unwrap();
        let store_interactions = store["interactions"].as_sequence().unwrap();
        assert_eq!(store_interactions.len(), 3);
        assert_eq!(store_interactions[0]["seq"].as_u64().unwrap(), 0);
        assert_eq!(store_interactions[2]["seq"].as_u64().unwrap(), 2);
        assert_eq!(store["source_session"].as_str().unwrap(), "test-session");
        assert_eq!(store["cluster"].as_str().unwrap(), "https://kind:6443");

        let config = CassetteConfig::from_session_dir(&output);
        let mut replayers = config.load_all().unwrap();
        let discovery = replayers.discovery.as_mut().unwrap();
        assert_eq!(discovery.next_interaction("discovery", "server_resources").seq, 0);
        let store = replayers.store.as_mut().unwrap();
        assert_eq!(store.next_interaction("store", "delete").seq, 2);

        let _ = fs::remove_dir_all(&dir);
    }
}
