//! Release artifact writer: gzip CSV, checksum sidecar and manifest.
//!
//! Layout under the output directory:
//!
//! ```text
//! releases/<version>/countrydb.csv.gz
//! releases/<version>/countrydb.csv.gz.sha256
//! releases/latest.json
//! ```
//!
//! Every file is written to a temporary file in its target directory and
//! renamed into place. `latest.json` is written last, so its presence means
//! the release completed.

use chrono::{DateTime, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::record::PrefixRecord;
use crate::utils::{format_bytes, format_count};

/// Name recorded in the manifest.
pub const DATABASE_NAME: &str = "deflect-geoip-country";

/// File name of the compressed database.
pub const ARTIFACT_NAME: &str = "countrydb.csv.gz";

/// Artifact type recorded in the manifest.
pub const ARTIFACT_TYPE: &str = "countrydb.csv.gz";

/// File name of the manifest inside `releases/`.
pub const MANIFEST_NAME: &str = "latest.json";

/// First line of the CSV.
pub const CSV_HEADER: &str = "prefix,country";

const RELEASES_DIR: &str = "releases";

/// Read buffer for checksumming files (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// `latest.json` contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub sources: Vec<String>,
    pub artifacts: Vec<Artifact>,
}

/// One published file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(rename = "type")]
    pub kind: String,
    /// Path relative to the output directory, always `/`-separated.
    pub path: String,
    pub sha256: String,
    pub bytes: u64,
}

/// Writer that hashes and counts everything passing through it.
pub struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
    bytes: u64,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            bytes: 0,
        }
    }

    /// Return the inner writer, the lowercase hex digest and the byte count.
    pub fn finish(self) -> (W, String, u64) {
        (self.inner, format!("{:x}", self.hasher.finalize()), self.bytes)
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.bytes += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Encode `records` as gzip CSV into `writer` in a single pass.
///
/// Returns the SHA-256 (hex) and size of the compressed stream. The gzip
/// header carries no timestamp or file name, so identical records always
/// produce identical bytes.
pub fn write_csv_gz<W: Write>(writer: W, records: &[PrefixRecord]) -> io::Result<(W, String, u64)> {
    let mut gz = GzEncoder::new(HashingWriter::new(writer), Compression::default());
    writeln!(gz, "{}", CSV_HEADER)?;
    for record in records {
        writeln!(gz, "{}", record)?;
    }
    let mut hashing = gz.finish()?;
    hashing.flush()?;
    Ok(hashing.finish())
}

/// Contents of the `.sha256` sidecar.
pub fn checksum_line(sha256: &str) -> String {
    format!("{}  {}\n", sha256, ARTIFACT_NAME)
}

/// SHA-256 of a file on disk, lowercase hex.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .map_err(|e| Error::io(format!("Failed to open {:?}", path), e))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let n = file
            .read(&mut buffer)
            .map_err(|e| Error::io(format!("Failed to read {:?}", path), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Write `contents` to `path` via a temporary file and rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = parent_dir(path);
    let mut temp = NamedTempFile::new_in(dir)
        .map_err(|e| Error::io(format!("Failed to create temporary file in {:?}", dir), e))?;
    temp.write_all(contents)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| Error::io(format!("Failed to write {:?}", path), e))?;
    persist(temp, path)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn persist(temp: NamedTempFile, path: &Path) -> Result<()> {
    temp.persist(path)
        .map_err(|e| Error::io(format!("Failed to persist {:?}", path), e.error))?;
    set_public_mode(path)
}

#[cfg(unix)]
fn set_public_mode(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o644))
        .map_err(|e| Error::io(format!("Failed to set permissions on {:?}", path), e))
}

#[cfg(not(unix))]
fn set_public_mode(_path: &Path) -> Result<()> {
    Ok(())
}

/// Writes releases under one output directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    out_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn releases_dir(&self) -> PathBuf {
        self.out_dir.join(RELEASES_DIR)
    }

    pub fn release_dir(&self, version: &str) -> PathBuf {
        self.releases_dir().join(version)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.releases_dir().join(MANIFEST_NAME)
    }

    /// Manifest path of the artifact, relative to the output directory.
    pub fn artifact_rel_path(version: &str) -> String {
        format!("{}/{}/{}", RELEASES_DIR, version, ARTIFACT_NAME)
    }

    /// Write the database, its checksum file and then the manifest.
    ///
    /// `records` must already be sorted and `sources` already in manifest
    /// order; both are written as given.
    pub fn write_release(
        &self,
        version: &str,
        records: &[PrefixRecord],
        sources: Vec<String>,
        generated_at: DateTime<Utc>,
    ) -> Result<Manifest> {
        let release_dir = self.release_dir(version);
        fs::create_dir_all(&release_dir)
            .map_err(|e| Error::io(format!("Failed to create {:?}", release_dir), e))?;

        let gz_path = release_dir.join(ARTIFACT_NAME);
        let (sha256, bytes) = self.write_database(&gz_path, records)?;
        info!(
            "Wrote {} ({} records, {})",
            gz_path.display(),
            format_count(records.len()),
            format_bytes(bytes)
        );

        let sidecar = release_dir.join(format!("{}.sha256", ARTIFACT_NAME));
        write_atomic(&sidecar, checksum_line(&sha256).as_bytes())?;
        debug!("Wrote {}", sidecar.display());

        let manifest = Manifest {
            name: DATABASE_NAME.to_string(),
            version: version.to_string(),
            generated_at,
            sources,
            artifacts: vec![Artifact {
                kind: ARTIFACT_TYPE.to_string(),
                path: Self::artifact_rel_path(version),
                sha256,
                bytes,
            }],
        };

        let manifest_path = self.manifest_path();
        let mut json = serde_json::to_vec_pretty(&manifest)?;
        json.push(b'\n');
        write_atomic(&manifest_path, &json)?;
        info!("Wrote {}", manifest_path.display());

        Ok(manifest)
    }

    fn write_database(&self, path: &Path, records: &[PrefixRecord]) -> Result<(String, u64)> {
        let dir = parent_dir(path);
        let mut temp = NamedTempFile::new_in(dir)
            .map_err(|e| Error::io(format!("Failed to create temporary file in {:?}", dir), e))?;

        let (_, sha256, bytes) = write_csv_gz(BufWriter::new(temp.as_file_mut()), records)
            .map_err(|e| Error::io(format!("Failed to write {:?}", path), e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| Error::io(format!("Failed to sync {:?}", path), e))?;

        persist(temp, path)?;
        Ok((sha256, bytes))
    }
}

/// Read `latest.json` from an output directory.
pub fn read_manifest(out_dir: &Path) -> Result<Manifest> {
    let path = ArtifactWriter::new(out_dir).manifest_path();
    let content = fs::read(&path)
        .map_err(|e| Error::io(format!("Failed to read manifest {:?}", path), e))?;
    Ok(serde_json::from_slice(&content)?)
}
