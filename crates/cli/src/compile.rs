//! External Solidity compiler invocation.

use argus_utils::errors::LoadError;
use indexmap::IndexMap;
use serde::Deserialize;
use std::process::Command;

#[derive(Debug, Deserialize)]
struct CombinedJson {
    #[serde(default)]
    contracts: IndexMap<String, Artifact>,
}

#[derive(Debug, Deserialize)]
struct Artifact {
    #[serde(rename = "bin-runtime", default)]
    bin_runtime: String,
}

/// Compiles one source file with the configured compiler binary and returns
/// `(contract name, runtime bytecode)`. Any compiler failure is fatal to the
/// whole run; there are no partial results.
pub fn compile_solidity(path: &str, solc: &str) -> Result<(String, Vec<u8>), LoadError> {
    tracing::debug!("invoking {solc} on {path}");
    let output = Command::new(solc)
        .args(["--combined-json", "bin-runtime", path])
        .output()
        .map_err(|e| LoadError::CompilerSpawn {
            binary: solc.to_string(),
            source: e,
        })?;

    if !output.status.success() {
        return Err(LoadError::Compiler {
            path: path.to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let artifact: CombinedJson =
        serde_json::from_slice(&output.stdout).map_err(|e| LoadError::Compiler {
            path: path.to_string(),
            message: format!("unreadable compiler output: {e}"),
        })?;
    pick_contract(&artifact, path)
}

/// The deployable unit of a file is the last contract the compiler emitted
/// with non-empty runtime code.
fn pick_contract(artifact: &CombinedJson, path: &str) -> Result<(String, Vec<u8>), LoadError> {
    let mut picked = None;
    for (key, entry) in &artifact.contracts {
        if !entry.bin_runtime.is_empty() {
            picked = Some((key.as_str(), entry));
        }
    }
    let (key, entry) = picked.ok_or_else(|| LoadError::EmptyArtifact {
        path: path.to_string(),
    })?;

    // Keys look like "contracts/Token.sol:Token"; keep the contract name.
    let name = key.rsplit(':').next().unwrap_or(key).to_string();
    let code = hex::decode(&entry.bin_runtime).map_err(|e| LoadError::Compiler {
        path: path.to_string(),
        message: format!("bad runtime hex for {name}: {e}"),
    })?;
    Ok((name, code))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(json: &str) -> CombinedJson {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn picks_last_contract_with_runtime_code() {
        let combined = artifact(
            r#"{"contracts": {
                "a.sol:Interface": {"bin-runtime": ""},
                "a.sol:Base": {"bin-runtime": "6001"},
                "a.sol:Token": {"bin-runtime": "600a600b"}
            }, "version": "0.8.24"}"#,
        );
        let (name, code) = pick_contract(&combined, "a.sol").unwrap();
        assert_eq!(name, "Token");
        assert_eq!(code, vec![0x60, 0x0a, 0x60, 0x0b]);
    }

    #[test]
    fn fails_when_nothing_is_deployable() {
        let combined = artifact(r#"{"contracts": {"a.sol:I": {"bin-runtime": ""}}}"#);
        assert!(matches!(
            pick_contract(&combined, "a.sol"),
            Err(LoadError::EmptyArtifact { .. })
        ));
    }
}
