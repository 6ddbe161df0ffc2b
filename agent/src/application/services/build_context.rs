//! Build context synthesis for trees that ship without a Dockerfile.
//!
//! Probes the checked-out tree, picks a template from `domain::recipe` and
//! writes the Dockerfile plus any python prerequisites it needs. Writes are
//! not rolled back if a later one fails.

use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::recipe::{
    AppKind, DEFAULT_PYTHON_APP, DEFAULT_PYTHON_ENTRY, DEFAULT_REQUIREMENTS, DOCKERFILE,
    NODE_MANIFEST, PYTHON_ENTRY_CANDIDATES, PYTHON_REQUIREMENTS, Recipe,
};

/// What the synthesizer decided and which files it created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesis {
    pub recipe: Recipe,
    pub written: Vec<String>,
}

/// `true` when the tree already carries its own build recipe.
#[must_use]
pub fn has_recipe(root: &Path) -> bool {
    root.join(DOCKERFILE).is_file()
}

/// Write a Dockerfile for the tree at `root`, exposing `port`.
///
/// # Errors
///
/// Returns an error if the tree cannot be read or a file cannot be written.
pub fn synthesize(root: &Path, kind: AppKind, port: u16) -> Result<Synthesis> {
    let mut written = Vec::new();
    let recipe = match kind {
        AppKind::Node => Recipe::Node,
        AppKind::Php => Recipe::Php,
        AppKind::Python => python_recipe(root, &mut written)?,
        AppKind::Auto if root.join(NODE_MANIFEST).is_file() => Recipe::Node,
        AppKind::Auto if root.join(PYTHON_REQUIREMENTS).is_file() => {
            python_recipe(root, &mut written)?
        }
        AppKind::Auto => Recipe::Static,
    };

    write_file(root, DOCKERFILE, &recipe.render(port), &mut written)?;
    tracing::info!(
        root = %root.display(),
        declared = kind.as_str(),
        recipe = recipe.name(),
        port,
        "build recipe synthesized"
    );
    Ok(Synthesis { recipe, written })
}

fn python_recipe(root: &Path, written: &mut Vec<String>) -> Result<Recipe> {
    if !root.join(PYTHON_REQUIREMENTS).is_file() {
        write_file(root, PYTHON_REQUIREMENTS, DEFAULT_REQUIREMENTS, written)?;
    }
    let entry = python_entry(root, written)?;
    Ok(Recipe::Python { entry })
}

/// Conventional entry point, else the first `*.py` by name, else a generated
/// placeholder app.
fn python_entry(root: &Path, written: &mut Vec<String>) -> Result<String> {
    if let Some(found) = PYTHON_ENTRY_CANDIDATES
        .iter()
        .find(|name| root.join(name).is_file())
    {
        return Ok((*found).to_string());
    }

    let mut sources: Vec<String> = std::fs::read_dir(root)
        .with_context(|| format!("reading {}", root.display()))?
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.ends_with(".py"))
        .collect();
    sources.sort();
    if let Some(first) = sources.into_iter().next() {
        return Ok(first);
    }

    tracing::warn!(root = %root.display(), "no python entry point found, generating one");
    write_file(root, DEFAULT_PYTHON_ENTRY, DEFAULT_PYTHON_APP, written)?;
    Ok(DEFAULT_PYTHON_ENTRY.to_string())
}

fn write_file(root: &Path, name: &str, content: &str, written: &mut Vec<String>) -> Result<()> {
    let path = root.join(name);
    std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
    written.push(name.to_string());
    Ok(())
}
