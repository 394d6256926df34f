use super::config::ResultsConfig;
use crate::core::identity::RunIdentity;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Error)]
pub enum DirectoryCreateError {
    #[error("Failed to create directory '{path}': {source}", path = path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error(
        "Output directory '{path}' already exists; refusing to mix results of different runs",
        path = path.display()
    )]
    AlreadyExists { path: PathBuf },

    #[error("'{path}' exists but is not a directory", path = path.display())]
    NotADirectory { path: PathBuf },
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Output directory '{path}' does not exist", path = path.display())]
    MissingDirectory { path: PathBuf },

    #[error("Failed to write archive '{path}': {source}", path = path.display())]
    Io { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    None,
    #[default]
    Gzip,
    Zstd,
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Zstd => "zstd",
        })
    }
}

impl FromStr for Compression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "gzip" | "gz" => Ok(Compression::Gzip),
            "zstd" | "zst" => Ok(Compression::Zstd),
            other => Err(format!(
                "Unknown compression '{}'. Expected 'none', 'gzip' or 'zstd'.",
                other
            )),
        }
    }
}

/// Owns the results root: one output directory and one `<identity>.tar` per sweep point.
#[derive(Debug, Clone)]
pub struct ResultArchiver {
    root: PathBuf,
    compression: Compression,
    cleanup: bool,
    reuse_existing: bool,
}

impl ResultArchiver {
    pub fn new(config: &ResultsConfig) -> Self {
        Self {
            root: config.root.clone(),
            compression: config.compression,
            cleanup: config.cleanup,
            reuse_existing: config.reuse_existing,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn output_dir(&self, identity: &RunIdentity) -> PathBuf {
        self.root.join(identity.as_str())
    }

    pub fn archive_path(&self, identity: &RunIdentity) -> PathBuf {
        self.root.join(identity.archive_file_name())
    }

    pub fn prepare_root(&self) -> Result<(), DirectoryCreateError> {
        fs::create_dir_all(&self.root).map_err(|e| DirectoryCreateError::Io {
            path: self.root.clone(),
            source: e,
        })?;
        if !self.root.is_dir() {
            return Err(DirectoryCreateError::NotADirectory {
                path: self.root.clone(),
            });
        }
        debug!("Results root ready at {:?}.", &self.root);
        Ok(())
    }

    /// Creates the output directory for a run. Creation fails if the directory already
    /// exists, unless the archiver was configured to reuse existing directories.
    pub fn create_output_dir(
        &self,
        identity: &RunIdentity,
    ) -> Result<PathBuf, DirectoryCreateError> {
        let path = self.output_dir(identity);
        match fs::create_dir(&path) {
            Ok(()) => Ok(path),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                if !path.is_dir() {
                    Err(DirectoryCreateError::NotADirectory { path })
                } else if self.reuse_existing {
                    debug!("Reusing existing output directory {:?}.", &path);
                    Ok(path)
                } else {
                    Err(DirectoryCreateError::AlreadyExists { path })
                }
            }
            Err(e) => Err(DirectoryCreateError::Io { path, source: e }),
        }
    }

    /// Seals a run's output directory into `<root>/<identity>.tar`, with entries rooted
    /// at `<identity>/`. The archive only appears under its final name once complete.
    pub fn archive(&self, identity: &RunIdentity) -> Result<PathBuf, ArchiveError> {
        let source_dir = self.output_dir(identity);
        let archive_path = self.archive_path(identity);
        if !source_dir.is_dir() {
            return Err(ArchiveError::MissingDirectory { path: source_dir });
        }

        let io_err = |source: io::Error| ArchiveError::Io {
            path: archive_path.clone(),
            source,
        };

        let temp = NamedTempFile::new_in(&self.root).map_err(io_err)?;
        let writer = BufWriter::new(temp.as_file());
        match self.compression {
            Compression::None => {
                let mut writer = append_run_dir(writer, identity, &source_dir).map_err(io_err)?;
                writer.flush().map_err(io_err)?;
            }
            Compression::Gzip => {
                let encoder = flate2::write::GzEncoder::new(writer, flate2::Compression::default());
                let encoder = append_run_dir(encoder, identity, &source_dir).map_err(io_err)?;
                encoder.finish().map_err(io_err)?.flush().map_err(io_err)?;
            }
            Compression::Zstd => {
                let encoder =
                    zstd::stream::write::Encoder::new(writer, ZSTD_LEVEL).map_err(io_err)?;
                let encoder = append_run_dir(encoder, identity, &source_dir).map_err(io_err)?;
                encoder.finish().map_err(io_err)?.flush().map_err(io_err)?;
            }
        }
        temp.as_file().sync_all().map_err(io_err)?;
        temp.persist(&archive_path).map_err(|e| io_err(e.error))?;

        info!(
            "Archived {} to {:?} ({} compression).",
            identity, &archive_path, self.compression
        );
        Ok(archive_path)
    }

    /// Removes a run's raw output directory if cleanup is enabled. Returns whether
    /// anything was removed.
    pub fn cleanup(&self, identity: &RunIdentity) -> io::Result<bool> {
        if !self.cleanup {
            return Ok(false);
        }
        let path = self.output_dir(identity);
        fs::remove_dir_all(&path)?;
        debug!("Removed raw output directory {:?}.", &path);
        Ok(true)
    }
}

fn append_run_dir<W: Write>(writer: W, identity: &RunIdentity, dir: &Path) -> io::Result<W> {
    let mut builder = tar::Builder::new(writer);
    builder.follow_symlinks(false);
    builder.append_dir_all(identity.as_str(), dir)?;
    builder.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::combination::CombinationName;
    use std::io::Read;
    use tempfile::{TempDir, tempdir};

    fn identity() -> RunIdentity {
        RunIdentity::new("DL_UPandLowSep", CombinationName::CuPlane, 20, 55.14).unwrap()
    }

    fn archiver(root: &Path, compression: Compression) -> ResultArchiver {
        ResultArchiver::new(&ResultsConfig {
            root: root.to_path_buf(),
            compression,
            cleanup: false,
            reuse_existing: false,
        })
    }

    fn populated_run(compression: Compression) -> (TempDir, ResultArchiver, RunIdentity) {
        let dir = tempdir().unwrap();
        let archiver = archiver(&dir.path().join("sim_results"), compression);
        archiver.prepare_root().unwrap();
        let id = identity();
        let out = archiver.create_output_dir(&id).unwrap();
        fs::write(out.join("throughput.csv"), "t,bps\n0,100\n").unwrap();
        fs::create_dir(out.join("pcap")).unwrap();
        fs::write(out.join("pcap").join("node0.pcap"), [0u8, 1, 2, 3]).unwrap();
        (dir, archiver, id)
    }

    fn entry_paths<R: Read>(reader: R) -> Vec<String> {
        let mut archive = tar::Archive::new(reader);
        archive
            .entries()
            .unwrap()
            .map(|entry| entry.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    fn assert_rooted_at_identity(paths: &[String], id: &RunIdentity) {
        assert!(!paths.is_empty());
        for path in paths {
            assert!(path.starts_with(id.as_str()), "entry {path} is not rooted");
        }
        let file = format!("{}/throughput.csv", id);
        let nested = format!("{}/pcap/node0.pcap", id);
        assert!(paths.contains(&file));
        assert!(paths.contains(&nested));
    }

    #[test]
    fn prepare_root_creates_missing_directories() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("a").join("b");
        archiver(&root, Compression::None).prepare_root().unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn prepare_root_rejects_a_file_in_the_way() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("results");
        fs::write(&root, "").unwrap();
        let result = archiver(&root, Compression::None).prepare_root();
        assert!(result.is_err());
    }

    #[test]
    fn output_dir_collision_is_an_error() {
        let dir = tempdir().unwrap();
        let archiver = archiver(dir.path(), Compression::None);
        let id = identity();
        archiver.create_output_dir(&id).unwrap();
        let second = archiver.create_output_dir(&id);
        assert!(matches!(
            second,
            Err(DirectoryCreateError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn output_dir_collision_is_allowed_when_reusing() {
        let dir = tempdir().unwrap();
        let archiver = ResultArchiver::new(&ResultsConfig {
            root: dir.path().to_path_buf(),
            compression: Compression::None,
            cleanup: false,
            reuse_existing: true,
        });
        let id = identity();
        let first = archiver.create_output_dir(&id).unwrap();
        let second = archiver.create_output_dir(&id).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn uncompressed_archive_is_rooted_at_identity() {
        let (_dir, archiver, id) = populated_run(Compression::None);
        let path = archiver.archive(&id).unwrap();
        assert_eq!(path, archiver.root().join(format!("{}.tar", id)));

        let paths = entry_paths(File::open(&path).unwrap());
        assert_rooted_at_identity(&paths, &id);
    }

    #[test]
    fn gzip_archive_is_rooted_at_identity() {
        let (_dir, archiver, id) = populated_run(Compression::Gzip);
        let path = archiver.archive(&id).unwrap();
        let paths = entry_paths(flate2::read::GzDecoder::new(File::open(&path).unwrap()));
        assert_rooted_at_identity(&paths, &id);
    }

    #[test]
    fn zstd_archive_is_rooted_at_identity() {
        let (_dir, archiver, id) = populated_run(Compression::Zstd);
        let path = archiver.archive(&id).unwrap();
        let decoder = zstd::stream::read::Decoder::new(File::open(&path).unwrap()).unwrap();
        let paths = entry_paths(decoder);
        assert_rooted_at_identity(&paths, &id);
    }

    #[test]
    fn archive_preserves_raw_directory_by_default() {
        let (_dir, archiver, id) = populated_run(Compression::Gzip);
        archiver.archive(&id).unwrap();
        assert!(!archiver.cleanup(&id).unwrap());
        assert!(archiver.output_dir(&id).is_dir());
    }

    #[test]
    fn cleanup_removes_raw_directory_when_enabled() {
        let dir = tempdir().unwrap();
        let archiver = ResultArchiver::new(&ResultsConfig {
            root: dir.path().to_path_buf(),
            compression: Compression::Gzip,
            cleanup: true,
            reuse_existing: false,
        });
        let id = identity();
        archiver.create_output_dir(&id).unwrap();
        archiver.archive(&id).unwrap();
        assert!(archiver.cleanup(&id).unwrap());
        assert!(!archiver.output_dir(&id).exists());
        assert!(archiver.archive_path(&id).is_file());
    }

    #[test]
    fn archiving_a_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let archiver = archiver(dir.path(), Compression::None);
        let result = archiver.archive(&identity());
        assert!(matches!(result, Err(ArchiveError::MissingDirectory { .. })));
        assert!(!archiver.archive_path(&identity()).exists());
    }

    #[test]
    fn compression_parses_from_text() {
        assert_eq!("gzip".parse::<Compression>(), Ok(Compression::Gzip));
        assert_eq!("ZSTD".parse::<Compression>(), Ok(Compression::Zstd));
        assert_eq!("none".parse::<Compression>(), Ok(Compression::None));
        assert!("lz4".parse::<Compression>().is_err());
        assert_eq!(Compression::default().to_string(), "gzip");
    }
}
