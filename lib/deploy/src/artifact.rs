//! Compiled contract artifacts, as laid out by the zkSync hardhat plugin.
//!
//! Every contract lives in `<root>/<source path>/<ContractName>.json`. The
//! artifact lists the bytecode of every contract it may deploy at runtime
//! under `factoryDeps`, keyed by bytecode hash and naming the dependency as
//! `<source path>:<ContractName>`.
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    io,
    path::{Path, PathBuf},
};

use alloy::primitives::{Bytes, B256};
use alloy_json_abi::JsonAbi;
use serde::Deserialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::{
    bytecode::hash_bytecode,
    error::{Error, Result},
};

const ARTIFACT_EXTENSION: &str = "json";

/// A compiled contract.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Name of the contract.
    pub contract_name: String,
    /// Path of the source file that defines it.
    #[serde(default)]
    pub source_name: String,
    /// Interface.
    pub abi: JsonAbi,
    /// Deployable bytecode.
    pub bytecode: Bytes,
    /// Contracts deployable at runtime, bytecode hash to `source:Name`.
    #[serde(default)]
    pub factory_deps: BTreeMap<String, String>,
}

impl Artifact {
    /// Versioned hash of [`Artifact::bytecode`].
    ///
    /// # Errors
    ///
    /// May fail if the bytecode violates the rollup's bytecode format.
    pub fn bytecode_hash(&self) -> Result<B256> {
        Ok(hash_bytecode(&self.bytecode)?)
    }

    /// `source:Name` identifier of the contract.
    #[must_use]
    pub fn fully_qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }
}

/// A directory of compiled artifacts, searched by contract name.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// A store rooted at `root`. The directory isn't read until an artifact
    /// is requested.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loads the artifact of the contract called `name`.
    ///
    /// `name` is either a bare contract name or a fully qualified
    /// `source:Name`, which disambiguates contracts sharing a name.
    ///
    /// # Errors
    ///
    /// * [`Error::ArtifactNotFound`] if no artifact matches.
    /// * [`Error::InvalidArtifact`] if several do, or the match can't be
    ///   parsed.
    pub fn load(&self, name: &str) -> Result<Artifact> {
        let (source, contract) = match name.rsplit_once(':') {
            Some((source, contract)) => (Some(source), contract),
            None => (None, name),
        };

        let file_name = format!("{contract}.{ARTIFACT_EXTENSION}");
        let mut matches = Vec::new();
        for path in self.find(&file_name)? {
            let artifact = read_artifact(contract, &path)?;
            if source.map_or(true, |source| artifact.source_name == source) {
                matches.push(artifact);
            }
        }

        match matches.len() {
            0 => Err(Error::ArtifactNotFound {
                name: name.to_owned(),
                dir: self.root.clone(),
            }),
            1 => Ok(matches.remove(0)),
            n => Err(Error::InvalidArtifact {
                name: name.to_owned(),
                reason: format!(
                    "{n} artifacts share this name, use `source:{contract}`"
                ),
            }),
        }
    }

    /// Bytecodes of every contract `artifact` may deploy, its dependencies'
    /// dependencies included. Each bytecode is listed once, in discovery
    /// order.
    ///
    /// # Errors
    ///
    /// May fail if a dependency can't be loaded.
    pub fn factory_deps(&self, artifact: &Artifact) -> Result<Vec<Bytes>> {
        let mut visited = BTreeSet::from([artifact.fully_qualified_name()]);
        let mut pending: Vec<String> =
            artifact.factory_deps.values().cloned().collect();
        let mut deps = Vec::new();

        while let Some(name) = pending.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }

            let dependency = self.load(&name)?;
            debug!(
                parent = %artifact.contract_name,
                dependency = %name,
                "resolved factory dependency"
            );
            pending.extend(
                dependency
                    .factory_deps
                    .values()
                    .filter(|name| !visited.contains(*name))
                    .cloned(),
            );
            if !deps.contains(&dependency.bytecode) {
                deps.push(dependency.bytecode);
            }
        }

        Ok(deps)
    }

    /// Paths of every file called `file_name` under the root. Symbolic
    /// links are not followed.
    fn find(&self, file_name: &str) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for entry in WalkDir::new(&self.root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if is_not_found(&e) => continue,
                Err(e) => {
                    return Err(Error::Config(format!(
                        "can't read artifact directory {}: {e}",
                        self.root.display()
                    )))
                }
            };

            if !entry.file_type().is_dir() && entry.file_name() == file_name {
                found.push(entry.into_path());
            }
        }

        found.sort();
        Ok(found)
    }
}

fn is_not_found(err: &walkdir::Error) -> bool {
    err.io_error().map(io::Error::kind) == Some(io::ErrorKind::NotFound)
}

fn read_artifact(name: &str, path: &Path) -> Result<Artifact> {
    let invalid = |reason: String| Error::InvalidArtifact {
        name: name.to_owned(),
        reason: format!("{}: {reason}", path.display()),
    };

    let content = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))
}
