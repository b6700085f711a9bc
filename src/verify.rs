//! Offline verification of a published release.
//!
//! Re-reads `releases/latest.json` and checks every artifact it lists
//! against the bytes on disk and the `.sha256` sidecar.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::artifact::{read_manifest, sha256_file, Manifest};
use crate::error::{Error, Result};

/// Verify the release described by `<out_dir>/releases/latest.json`.
pub fn verify_release(out_dir: &Path) -> Result<Manifest> {
    let manifest = read_manifest(out_dir)?;
    if manifest.artifacts.is_empty() {
        return Err(Error::Verify("manifest lists no artifacts".to_string()));
    }

    for artifact in &manifest.artifacts {
        let path = resolve(out_dir, &artifact.path)?;

        let size = fs::metadata(&path)
            .map_err(|e| Error::io(format!("Failed to stat {:?}", path), e))?
            .len();
        if size != artifact.bytes {
            return Err(Error::Verify(format!(
                "{} is {} bytes, manifest says {}",
                artifact.path, size, artifact.bytes
            )));
        }

        let actual = sha256_file(&path)?;
        if actual != artifact.sha256 {
            return Err(Error::ChecksumMismatch {
                path,
                expected: artifact.sha256.clone(),
                actual,
            });
        }

        check_sidecar(&path, &actual)?;
    }

    Ok(manifest)
}

/// Resolve a manifest path, refusing anything that leaves `out_dir`.
fn resolve(out_dir: &Path, rel: &str) -> Result<PathBuf> {
    let rel_path = Path::new(rel);
    if !rel_path
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return Err(Error::Verify(format!("unsafe artifact path '{}'", rel)));
    }
    Ok(out_dir.join(rel_path))
}

/// The sidecar must read `<digest>  <file name>`.
fn check_sidecar(path: &Path, digest: &str) -> Result<()> {
    let mut sidecar = path.as_os_str().to_owned();
    sidecar.push(".sha256");
    let sidecar = PathBuf::from(sidecar);

    let content = fs::read_to_string(&sidecar)
        .map_err(|e| Error::io(format!("Failed to read {:?}", sidecar), e))?;
    let (recorded, name) = content
        .trim_end_matches('\n')
        .split_once("  ")
        .ok_or_else(|| Error::Verify(format!("malformed checksum file {:?}", sidecar)))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if name != file_name {
        return Err(Error::Verify(format!(
            "checksum file {:?} names '{}', expected '{}'",
            sidecar, name, file_name
        )));
    }
    if recorded != digest {
        return Err(Error::ChecksumMismatch {
            path: sidecar,
            expected: recorded.to_string(),
            actual: digest.to_string(),
        });
    }
    Ok(())
}
