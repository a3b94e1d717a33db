use std::fmt::Write as _;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use md5::Md5;
use sha2::{Digest, Sha256};

/// Plugin binaries shipped next to the installer, with their MD5 digests.
const BUNDLED_FILES: [(&str, &str); 4] = [
    (
        "obs-plugins/64bit/libcrypto-1_1-x64.dll",
        "2aeb5ce32a1d60a588054e599bb14736",
    ),
    (
        "obs-plugins/64bit/libssl-1_1-x64.dll",
        "29d9a6d1e9ba7c691d778a4c0810b116",
    ),
    (
        "obs-plugins/64bit/obs-webrtc.dll",
        "cca4f3eb9cd76e9bbaea393c6bbf332e",
    ),
    (
        "obs-plugins/64bit/websocketclient.dll",
        "aad616ebeeddb30be4222ad2dff7287c",
    ),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DigestKind {
    Md5,
    Sha256,
}

impl DigestKind {
    /// Pick the algorithm from the length of an expected hex digest.
    pub fn for_expected(expected: &str) -> Option<Self> {
        match expected.trim().len() {
            32 => Some(DigestKind::Md5),
            64 => Some(DigestKind::Sha256),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestEntry {
    pub path: String,
    pub checksum: String,
}

impl ManifestEntry {
    pub fn new(path: impl Into<String>, checksum: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            checksum: checksum.into(),
        }
    }

    pub fn source(&self, package_dir: &Path) -> PathBuf {
        package_dir.join(&self.path)
    }

    pub fn file_name(&self) -> Option<&str> {
        Path::new(&self.path).file_name().and_then(|name| name.to_str())
    }

    /// The package file must exist as a regular file and match its digest.
    pub fn verify(&self, package_dir: &Path) -> Result<(), ManifestError> {
        let source = self.source(package_dir);
        if !source.is_file() {
            warn!("package: {} is missing", source.display());
            return Err(ManifestError::Missing {
                path: self.path.clone(),
            });
        }
        verify_checksum(&source, &self.checksum).map_err(|detail| {
            warn!("package: {} failed verification: {}", self.path, detail);
            ManifestError::Mismatch {
                path: self.path.clone(),
                detail,
            }
        })?;
        debug!("package: {} verified", self.path);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    Missing { path: String },
    Mismatch { path: String, detail: String },
}

impl ManifestError {
    pub fn path(&self) -> &str {
        match self {
            ManifestError::Missing { path } | ManifestError::Mismatch { path, .. } => path,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    pub fn bundled() -> Self {
        Self::new(
            BUNDLED_FILES
                .iter()
                .map(|(path, checksum)| ManifestEntry::new(*path, *checksum))
                .collect(),
        )
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }
}

/// Hash a file and return the lowercase hex digest.
pub fn file_digest(path: &Path, kind: DigestKind) -> Result<String, String> {
    match kind {
        DigestKind::Md5 => hash_file::<Md5>(path),
        DigestKind::Sha256 => hash_file::<Sha256>(path),
    }
}

pub fn verify_checksum(path: &Path, expected: &str) -> Result<(), String> {
    let expected = expected.trim().to_lowercase();
    let kind = DigestKind::for_expected(&expected)
        .ok_or_else(|| format!("unsupported checksum format: {expected}"))?;
    let actual = file_digest(path, kind)?;
    if actual != expected {
        return Err(format!(
            "checksum mismatch: expected {expected}, got {actual}"
        ));
    }
    Ok(())
}

fn hash_file<D: Digest>(path: &Path) -> Result<String, String> {
    let mut file = fs::File::open(path).map_err(|e| format!("checksum open error: {e}"))?;
    let mut hasher = D::new();
    let mut buf = [0u8; 8192];
    loop {
        let read = file
            .read(&mut buf)
            .map_err(|e| format!("checksum read error: {e}"))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hasher
        .finalize()
        .iter()
        .fold(String::new(), |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_MD5: &str = "5d41402abc4b2a76b9719d911017c592";
    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    fn write_package(dir: &Path, rel: &str, contents: &[u8]) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn digests_known_content() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("hello.txt");
        fs::write(&path, "hello").unwrap();

        assert_eq!(file_digest(&path, DigestKind::Md5).unwrap(), HELLO_MD5);
        assert_eq!(file_digest(&path, DigestKind::Sha256).unwrap(), HELLO_SHA256);
    }

    #[test]
    fn verify_picks_algorithm_from_length() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("hello.txt");
        fs::write(&path, "hello").unwrap();

        assert!(verify_checksum(&path, HELLO_MD5).is_ok());
        assert!(verify_checksum(&path, &HELLO_MD5.to_uppercase()).is_ok());
        assert!(verify_checksum(&path, HELLO_SHA256).is_ok());
        assert!(verify_checksum(&path, "abc").is_err());
    }

    #[test]
    fn verify_reports_mismatch_and_missing_files() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("hello.txt");
        fs::write(&path, "hello!").unwrap();

        let err = verify_checksum(&path, HELLO_MD5).unwrap_err();
        assert!(err.contains("checksum mismatch"));

        let err = verify_checksum(&tmp.path().join("absent.bin"), HELLO_MD5).unwrap_err();
        assert!(err.contains("checksum open error"));
    }

    #[test]
    fn bundled_manifest_lists_plugin_binaries() {
        let manifest = Manifest::bundled();
        assert_eq!(manifest.entries().len(), 4);
        let names: Vec<_> = manifest
            .entries()
            .iter()
            .filter_map(ManifestEntry::file_name)
            .collect();
        assert_eq!(
            names,
            [
                "libcrypto-1_1-x64.dll",
                "libssl-1_1-x64.dll",
                "obs-webrtc.dll",
                "websocketclient.dll"
            ]
        );
    }

    #[test]
    fn entry_verification_rejects_corrupt_file() {
        let tmp = tempfile::tempdir().unwrap();
        write_package(tmp.path(), "plugins/b.dll", b"tampered");
        let entry = ManifestEntry::new("plugins/b.dll", HELLO_MD5);

        let err = entry.verify(tmp.path()).unwrap_err();
        assert!(matches!(err, ManifestError::Mismatch { .. }));
        assert_eq!(err.path(), "plugins/b.dll");
    }

    #[test]
    fn entry_verification_rejects_missing_or_directory_paths() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("plugins").join("dir.dll")).unwrap();

        let missing = ManifestEntry::new("plugins/missing.dll", HELLO_MD5);
        assert_eq!(
            missing.verify(tmp.path()).unwrap_err(),
            ManifestError::Missing {
                path: "plugins/missing.dll".into()
            }
        );
        let directory = ManifestEntry::new("plugins/dir.dll", HELLO_MD5);
        assert!(matches!(
            directory.verify(tmp.path()),
            Err(ManifestError::Missing { .. })
        ));
    }

    #[test]
    fn entry_verification_accepts_intact_file() {
        let tmp = tempfile::tempdir().unwrap();
        write_package(tmp.path(), "plugins/a.dll", b"hello");
        let entry = ManifestEntry::new("plugins/a.dll", HELLO_SHA256);
        assert!(entry.verify(tmp.path()).is_ok());
        assert_eq!(entry.source(tmp.path()), tmp.path().join("plugins/a.dll"));
    }
}
