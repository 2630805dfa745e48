use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Layout of the local installer tree: `<root>/<category>/<program>/`, each
/// program folder holding one or more installer files. A missing root reads
/// as an empty library rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerLibrary {
    root: PathBuf,
}

impl InstallerLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn program_dir(&self, category: &str, program: &str) -> PathBuf {
        self.root.join(category).join(program)
    }

    /// Category folder names in sorted order.
    pub fn categories(&self) -> Result<Vec<String>> {
        list_subdirectories(&self.root)
    }

    /// Program folder names under one category, in sorted order.
    pub fn programs_in(&self, category: &str) -> Result<Vec<String>> {
        list_subdirectories(&self.root.join(category))
    }

    /// Every (category, program) pair in the tree, sorted by category then
    /// program name.
    pub fn programs(&self) -> Result<Vec<(String, String)>> {
        let mut pairs = Vec::new();
        for category in self.categories()? {
            for program in self.programs_in(&category)? {
                pairs.push((category.clone(), program));
            }
        }
        Ok(pairs)
    }

    /// Finds which category folder holds `program`, scanning in sorted
    /// category order so duplicated program names resolve deterministically.
    pub fn category_of(&self, program: &str) -> Result<Option<String>> {
        for category in self.categories()? {
            if self
                .programs_in(&category)?
                .iter()
                .any(|candidate| candidate == program)
            {
                return Ok(Some(category));
            }
        }
        Ok(None)
    }
}

fn list_subdirectories(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(ToOwned::to_owned) else {
            continue;
        };
        names.push(name);
    }

    names.sort();
    Ok(names)
}
