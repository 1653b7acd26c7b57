//! Runs every fixture under `fixtures/`. The same files are run, with
//! per-case output, by `cargo run -p dev-test-runner`.
use std::path::PathBuf;

use json_vgen::fixture::Fixture;

fn fixture_files() -> Vec<PathBuf> {
    let pattern = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/*.json");
    let mut files: Vec<PathBuf> = glob::glob(pattern)
        .expect("valid glob")
        .filter_map(Result::ok)
        .collect();
    files.sort();
    files
}

#[test]
fn fixtures_are_present() {
    assert!(fixture_files().len() >= 5, "expected the fixture directory to be populated");
}

#[test]
fn every_fixture_passes() {
    let mut failures = Vec::new();
    for path in fixture_files() {
        let name = path.display().to_string();
        let fixture = match Fixture::load(&path) {
            Ok(fixture) => fixture,
            Err(error) => {
                failures.push(format!("{name}: {error}"));
                continue;
            }
        };
        match fixture.run() {
            Ok(outcomes) => {
                for outcome in outcomes.into_iter().filter(|o| !o.passed()) {
                    failures.push(format!("{name} :: {}\n    {}", outcome.name, outcome.failures.join("\n    ")));
                }
            }
            Err(error) => failures.push(format!("{name}: {error}")),
        }
    }
    assert!(failures.is_empty(), "fixture failures:\n{}", failures.join("\n"));
}
