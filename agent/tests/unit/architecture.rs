//! Structural tests for layer boundary enforcement.
//!
//! These tests scan source files to verify that the domain / application /
//! infra boundaries hold.

use std::path::{Path, PathBuf};

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

/// Track brace depth and return whether a line is inside a `#[cfg(test)]` block.
struct CfgTestTracker {
    in_test_block: bool,
    brace_depth: i32,
    test_block_start_depth: i32,
}

impl CfgTestTracker {
    fn new() -> Self {
        Self {
            in_test_block: false,
            brace_depth: 0,
            test_block_start_depth: 0,
        }
    }

    fn process_line(&mut self, line: &str) -> bool {
        if line.trim().contains("#[cfg(test)]") {
            self.in_test_block = true;
            self.test_block_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_test_block && self.brace_depth <= self.test_block_start_depth {
                        self.in_test_block = false;
                    }
                }
                _ => {}
            }
        }
        self.in_test_block
    }
}

fn src_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src")
}

/// Non-test, non-comment lines of every file under `dir` containing any of
/// `needles`, formatted as `path:line: text`.
fn find_in_production_code(dir: &Path, needles: &[&str]) -> Vec<String> {
    let mut violations = Vec::new();
    for file in collect_rs_files(dir) {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let rel = file
            .strip_prefix(env!("CARGO_MANIFEST_DIR"))
            .unwrap_or(&file)
            .display()
            .to_string();
        let mut tracker = CfgTestTracker::new();
        for (i, line) in content.lines().enumerate() {
            let in_test = tracker.process_line(line);
            let trimmed = line.trim();
            if in_test || trimmed.starts_with("//") {
                continue;
            }
            if needles.iter().any(|n| line.contains(n)) {
                violations.push(format!("{rel}:{}: {trimmed}", i + 1));
            }
        }
    }
    violations
}

#[test]
fn domain_is_free_of_io_and_outer_layers() {
    let violations = find_in_production_code(
        &src_dir().join("domain"),
        &[
            "crate::application",
            "crate::infra",
            "crate::commands",
            "tokio",
            "std::fs",
            "std::process",
            "std::net",
        ],
    );
    assert!(
        violations.is_empty(),
        "domain/ must stay pure:\n{}",
        violations.join("\n")
    );
}

#[test]
fn application_does_not_import_infra_or_commands() {
    let violations = find_in_production_code(
        &src_dir().join("application"),
        &["crate::infra", "crate::commands", "crate::app::"],
    );
    assert!(
        violations.is_empty(),
        "application/ must depend only on domain/ and its ports:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_does_not_import_commands() {
    let violations =
        find_in_production_code(&src_dir().join("infra"), &["crate::commands", "crate::cli"]);
    assert!(
        violations.is_empty(),
        "infra/ must not import from commands/ or cli:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_print_macros_outside_tests() {
    let violations = find_in_production_code(&src_dir().join("infra"), &["println!", "eprintln!"]);
    assert!(
        violations.is_empty(),
        "infra/ logs through tracing, not print macros:\n{}",
        violations.join("\n")
    );
}

#[test]
fn services_never_construct_process_runners() {
    let violations = find_in_production_code(
        &src_dir().join("application"),
        &["TokioCommandRunner", "DockerCli", "GitCli", "HttpControlPlane"],
    );
    assert!(
        violations.is_empty(),
        "services receive adapters through ports:\n{}",
        violations.join("\n")
    );
}

#[test]
fn no_module_level_dead_code_allows_in_layers() {
    let mut violations = Vec::new();
    for layer in ["domain", "application", "infra", "commands"] {
        violations.extend(find_in_production_code(
            &src_dir().join(layer),
            &["#![allow(dead_code)]"],
        ));
    }
    assert!(
        violations.is_empty(),
        "module-level dead_code suppression found:\n{}",
        violations.join("\n")
    );
}
