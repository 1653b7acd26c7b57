//! Runs fixture files (`fixtures/*.json` by default) and reports each case.
//!
//! ```text
//! cargo run -p dev-test-runner -- [PATTERN...] [--filter REGEX]
//! ```
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use json_vgen::fixture::Fixture;
use regex::Regex;

/// run fixture files and report every case
#[derive(Parser, Debug)]
#[command(name = "dev-test-runner")]
struct Settings {
    /// fixture files or quoted glob patterns (`fixtures/*.json` if omitted)
    patterns: Vec<String>,

    /// only run fixtures whose path matches this regex
    #[arg(long, short)]
    filter: Option<String>,
}

impl Settings {
    fn patterns(&self) -> Vec<String> {
        if self.patterns.is_empty() {
            return vec![concat!(env!("CARGO_MANIFEST_DIR"), "/../fixtures/*.json").to_string()];
        }
        self.patterns.clone()
    }

    fn filter(&self) -> anyhow::Result<Option<Regex>> {
        self.filter
            .as_deref()
            .map(|raw| Regex::new(raw).with_context(|| format!("invalid --filter regex {raw:?}")))
            .transpose()
    }
}

fn run(settings: &Settings) -> anyhow::Result<bool> {
    let filter = settings.filter()?;
    let mut passed = 0usize;
    let mut failed = 0usize;

    for pattern in settings.patterns() {
        for entry in glob::glob(&pattern)? {
            let path = entry?;
            let name = path.display().to_string();
            if filter.as_ref().is_some_and(|rx| !rx.is_match(&name)) {
                continue;
            }
            let fixture = match Fixture::load(&path) {
                Ok(f) => f,
                Err(error) => {
                    println!("{} {name}: {error}", "ERROR".red().bold());
                    failed += 1;
                    continue;
                }
            };
            match fixture.run() {
                Ok(outcomes) if outcomes.is_empty() => {
                    println!("{} {name} (compile error as expected)", "ok".green());
                    passed += 1;
                }
                Ok(outcomes) => {
                    for outcome in outcomes {
                        if outcome.passed() {
                            println!("{} {name} :: {}", "ok".green(), outcome.name);
                            passed += 1;
                        } else {
                            println!("{} {name} :: {}", "FAIL".red().bold(), outcome.name);
                            for failure in &outcome.failures {
                                println!("      {failure}");
                            }
                            failed += 1;
                        }
                    }
                }
                Err(error) => {
                    println!("{} {name}: {error}", "FAIL".red().bold());
                    failed += 1;
                }
            }
        }
    }

    println!();
    println!("{passed} passed, {failed} failed");
    Ok(failed == 0)
}

fn main() -> ExitCode {
    let settings = Settings::parse();
    match run(&settings) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_and_filter_parse() {
        let settings = Settings::try_parse_from(["dev-test-runner", "a/*.json", "b.json", "-f", "union"]).unwrap();
        assert_eq!(settings.patterns(), vec!["a/*.json", "b.json"]);
        assert!(settings.filter().unwrap().unwrap().is_match("fixtures/subfieldunion.json"));
    }

    #[test]
    fn defaults_to_the_fixture_directory() {
        let settings = Settings::try_parse_from(["dev-test-runner"]).unwrap();
        assert!(settings.patterns()[0].ends_with("/../fixtures/*.json"));
        assert!(settings.filter().unwrap().is_none());
    }

    #[test]
    fn bad_filter_is_an_error() {
        let settings = Settings::try_parse_from(["dev-test-runner", "--filter", "("]).unwrap();
        assert!(settings.filter().is_err());
    }
}
