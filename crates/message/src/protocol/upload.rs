//! Uploaded files, as described by the hosting environment.
//!
//! An [`UploadedFile`] is built from the descriptor of a single form field.
//! Whether a temporary file is a genuine upload, and how it is moved, is
//! decided by an [`UploadStore`]; [`LocalUploadStore`] trusts a fixed set of
//! paths and moves files on the local filesystem.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ensure;
use crate::environment::Environment;
use crate::protocol::{InvalidArgument, MessageError, RuntimeFailure, Stream};

/// Error code reported for an upload, numbered like PHP's `UPLOAD_ERR_*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum UploadError {
    #[default]
    Ok = 0,
    /// Larger than the host-wide size limit
    ExceedsSizeLimitIni = 1,
    /// Larger than the size limit of the form
    ExceedsSizeLimitForm = 2,
    Partial = 3,
    NoFile = 4,
    MissingTmpDir = 6,
    WriteFailure = 7,
    ExtensionBlocked = 8,
}

impl UploadError {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_ok(self) -> bool {
        self == UploadError::Ok
    }
}

impl TryFrom<u8> for UploadError {
    type Error = InvalidArgument;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        let error = match code {
            0 => UploadError::Ok,
            1 => UploadError::ExceedsSizeLimitIni,
            2 => UploadError::ExceedsSizeLimitForm,
            3 => UploadError::Partial,
            4 => UploadError::NoFile,
            6 => UploadError::MissingTmpDir,
            7 => UploadError::WriteFailure,
            8 => UploadError::ExtensionBlocked,
            _ => return Err(InvalidArgument::UploadError(code)),
        };
        Ok(error)
    }
}

impl From<UploadError> for u8 {
    fn from(error: UploadError) -> Self {
        error.code()
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = match self {
            UploadError::Ok => "the file uploaded successfully",
            UploadError::ExceedsSizeLimitIni => "the file exceeds the upload size limit of the host",
            UploadError::ExceedsSizeLimitForm => "the file exceeds the upload size limit of the form",
            UploadError::Partial => "the file was only partially uploaded",
            UploadError::NoFile => "no file was uploaded",
            UploadError::MissingTmpDir => "missing a temporary folder",
            UploadError::WriteFailure => "failed to write the file to disk",
            UploadError::ExtensionBlocked => "an extension stopped the upload",
        };
        f.write_str(description)
    }
}

/// What the host knows about one uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadDescriptor {
    /// File name reported by the client
    pub name: String,
    /// Media type reported by the client
    #[serde(rename = "type")]
    pub media_type: String,
    pub tmp_name: PathBuf,
    pub size: Option<u64>,
    pub error: UploadError,
}

/// The descriptors of a form field, a field may carry several files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UploadEntry {
    Single(UploadDescriptor),
    Multiple(Vec<UploadDescriptor>),
}

impl From<UploadDescriptor> for UploadEntry {
    fn from(descriptor: UploadDescriptor) -> Self {
        UploadEntry::Single(descriptor)
    }
}

/// Decides whether a path is a genuine upload and moves it.
#[cfg_attr(test, mockall::automock)]
pub trait UploadStore {
    fn is_uploaded_file(&self, path: &Path) -> bool;

    /// Moves `from` to `to`, `from` must no longer exist afterwards.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file could not be moved.
    fn move_uploaded_file(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// Filesystem store trusting the temporary paths the host vouched for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalUploadStore {
    uploaded: HashSet<PathBuf>,
}

impl LocalUploadStore {
    pub fn new<I, P>(uploaded: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self { uploaded: uploaded.into_iter().map(Into::into).collect() }
    }

    pub fn from_environment(env: &Environment) -> Self {
        Self { uploaded: env.uploaded_paths.clone() }
    }
}

impl UploadStore for LocalUploadStore {
    fn is_uploaded_file(&self, path: &Path) -> bool {
        self.uploaded.contains(path) && path.is_file()
    }

    fn move_uploaded_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        match fs::rename(from, to) {
            Err(e) if e.kind() == ErrorKind::CrossesDevices => {
                debug!(from = %from.display(), to = %to.display(), "rename crosses devices, copying instead");
                fs::copy(from, to)?;
                fs::remove_file(from)
            }
            result => result,
        }
    }
}

/// A file uploaded through a form field.
///
/// Only a successful upload fills in the file details. For a field carrying
/// several files the last successful one is used, while [`UploadedFile::error`]
/// reports the error of the last file.
#[derive(Debug)]
pub struct UploadedFile<S = LocalUploadStore> {
    client_filename: Option<String>,
    client_media_type: Option<String>,
    tmp_name: Option<PathBuf>,
    size: Option<u64>,
    error: UploadError,
    moved: bool,
    store: S,
}

impl UploadedFile<LocalUploadStore> {
    /// Looks up `field` in the upload table of `env`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeFailure::UnknownUpload`] if the field is not in the table.
    pub fn from_environment(env: &Environment, field: &str) -> Result<Self, MessageError> {
        let entry = env.uploads.get(field).ok_or_else(|| RuntimeFailure::unknown_upload(field))?;
        Ok(Self::new(entry.clone(), LocalUploadStore::from_environment(env)))
    }
}

impl<S: UploadStore> UploadedFile<S> {
    pub fn new<E: Into<UploadEntry>>(entry: E, store: S) -> Self {
        let mut file = Self {
            client_filename: None,
            client_media_type: None,
            tmp_name: None,
            size: None,
            error: UploadError::Ok,
            moved: false,
            store,
        };

        let descriptors = match entry.into() {
            UploadEntry::Single(descriptor) => vec![descriptor],
            UploadEntry::Multiple(descriptors) => descriptors,
        };
        for descriptor in descriptors {
            if descriptor.error.is_ok() {
                file.client_filename = Some(basename(&descriptor.name).to_owned());
                file.client_media_type = Some(descriptor.media_type);
                file.tmp_name = Some(descriptor.tmp_name);
                file.size = descriptor.size;
            }
            file.error = descriptor.error;
        }
        file
    }

    /// Opens a stream over the temporary file.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeFailure::AlreadyMoved`] after [`UploadedFile::move_to`],
    /// or [`RuntimeFailure::NoUploadedFile`] if no file was uploaded successfully.
    pub fn stream(&self) -> Result<Stream, MessageError> {
        ensure!(!self.moved, RuntimeFailure::AlreadyMoved);
        let tmp_name = self.tmp_name.as_ref().ok_or(RuntimeFailure::NoUploadedFile)?;
        Stream::open(tmp_name)
    }

    /// Moves the file into `target_dir`, named after the client filename.
    ///
    /// Returns the new location of the file. A file can be moved only once.
    ///
    /// # Errors
    ///
    /// - [`InvalidArgument::TargetDirectory`] if `target_dir` is not an existing directory
    /// - [`RuntimeFailure::AlreadyMoved`] on any call after a successful move
    /// - [`RuntimeFailure::NotUploaded`] if the store does not vouch for the file
    /// - [`RuntimeFailure::Io`] if the store fails to move the file
    pub fn move_to<P: AsRef<Path>>(&mut self, target_dir: P) -> Result<PathBuf, MessageError> {
        let target_dir = target_dir.as_ref();
        ensure!(target_dir.is_dir(), InvalidArgument::target_directory(target_dir));
        ensure!(!self.moved, RuntimeFailure::AlreadyMoved);

        let tmp_name = self.tmp_name.as_deref().ok_or(RuntimeFailure::NoUploadedFile)?;
        if !self.store.is_uploaded_file(tmp_name) {
            warn!(path = %tmp_name.display(), "refused to move a file that was not uploaded");
            return Err(RuntimeFailure::NotUploaded(tmp_name.to_path_buf()).into());
        }

        let file_name = match self.client_filename.as_deref() {
            Some(name) if !name.is_empty() => Path::new(name),
            _ => Path::new(tmp_name.file_name().unwrap_or_default()),
        };
        let target = target_dir.join(file_name);
        self.store.move_uploaded_file(tmp_name, &target).map_err(RuntimeFailure::io)?;

        info!(from = %tmp_name.display(), to = %target.display(), "moved uploaded file");
        self.moved = true;
        Ok(target)
    }

    /// Size reported by the host, `None` if unknown.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn error(&self) -> UploadError {
        self.error
    }

    /// Base name of the file name sent by the client, do not trust it.
    pub fn client_filename(&self) -> Option<&str> {
        self.client_filename.as_deref()
    }

    /// Media type sent by the client, do not trust it.
    pub fn client_media_type(&self) -> Option<&str> {
        self.client_media_type.as_deref()
    }

    /// The client media type, `None` if it is absent or malformed.
    pub fn media_type(&self) -> Option<mime::Mime> {
        self.client_media_type.as_deref()?.parse().ok()
    }

    pub fn is_moved(&self) -> bool {
        self.moved
    }
}

/// The last path segment of `name`, empty when that segment is `.` or `..`.
fn basename(name: &str) -> &str {
    match name.rsplit(['/', '\\']).next().unwrap_or(name) {
        "." | ".." => "",
        segment => segment,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use mockall::predicate::{always, eq};
    use tempfile::TempDir;

    use super::*;

    fn descriptor(tmp_name: &Path, error: UploadError) -> UploadDescriptor {
        UploadDescriptor {
            name: "foo.txt".to_owned(),
            media_type: "text/plain".to_owned(),
            tmp_name: tmp_name.to_path_buf(),
            size: Some(100),
            error,
        }
    }

    fn uploaded(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("php7a3b");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_descriptor_fields() {
        let file = UploadedFile::new(descriptor(Path::new("/tmp/foobar"), UploadError::Ok), MockUploadStore::new());

        assert_eq!(file.size(), Some(100));
        assert_eq!(file.error(), UploadError::Ok);
        assert_eq!(file.client_filename(), Some("foo.txt"));
        assert_eq!(file.client_media_type(), Some("text/plain"));
        assert_eq!(file.media_type(), Some(mime::TEXT_PLAIN));
        assert!(!file.is_moved());
    }

    #[test]
    fn test_failed_upload_keeps_only_error() {
        let file = UploadedFile::new(descriptor(Path::new("/tmp/foobar"), UploadError::NoFile), MockUploadStore::new());

        assert_eq!(file.error(), UploadError::NoFile);
        assert_eq!(file.error().code(), 4);
        assert_eq!(file.client_filename(), None);
        assert_eq!(file.size(), None);
        assert!(matches!(file.stream().unwrap_err(), MessageError::Runtime { source: RuntimeFailure::NoUploadedFile }));
    }

    #[test]
    fn test_last_successful_upload_wins() {
        let entry = UploadEntry::Multiple(vec![
            UploadDescriptor { name: "a.txt".to_owned(), ..descriptor(Path::new("/tmp/a"), UploadError::Ok) },
            UploadDescriptor { name: "b.txt".to_owned(), ..descriptor(Path::new("/tmp/b"), UploadError::Ok) },
            UploadDescriptor { name: "c.txt".to_owned(), ..descriptor(Path::new("/tmp/c"), UploadError::Partial) },
        ]);
        let file = UploadedFile::new(entry, MockUploadStore::new());

        assert_eq!(file.client_filename(), Some("b.txt"));
        assert_eq!(file.error(), UploadError::Partial);
    }

    #[test]
    fn test_client_filename_is_basename() {
        let entry = UploadDescriptor { name: "../../etc/passwd".to_owned(), ..descriptor(Path::new("/tmp/a"), UploadError::Ok) };
        let file = UploadedFile::new(entry, MockUploadStore::new());
        assert_eq!(file.client_filename(), Some("passwd"));

        assert_eq!(basename("C:\\Users\\me\\report.pdf"), "report.pdf");
    }

    #[test]
    fn test_dot_segments_fall_back_to_tmp_name() {
        let dir = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let tmp_name = uploaded(&dir, "hello");

        for name in ["x/..", "..", ".", "a\\.."] {
            let mut store = MockUploadStore::new();
            store.expect_is_uploaded_file().return_const(true);
            store.expect_move_uploaded_file().with(eq(tmp_name.clone()), eq(target.path().join("php7a3b"))).times(1).returning(|_, _| Ok(()));

            let entry = UploadDescriptor { name: name.to_owned(), ..descriptor(&tmp_name, UploadError::Ok) };
            let mut file = UploadedFile::new(entry, store);

            assert_eq!(file.client_filename(), Some(""), "{name:?}");
            assert_eq!(file.move_to(target.path()).unwrap(), target.path().join("php7a3b"), "{name:?}");
        }
    }

    #[test]
    fn test_stream() {
        let dir = TempDir::new().unwrap();
        let tmp_name = uploaded(&dir, "The MIT License (MIT)\n");
        let file = UploadedFile::new(descriptor(&tmp_name, UploadError::Ok), MockUploadStore::new());

        assert_eq!(file.stream().unwrap().read(21).unwrap(), "The MIT License (MIT)");
    }

    #[test]
    fn test_move_once() {
        let dir = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let tmp_name = uploaded(&dir, "hello");

        let mut store = MockUploadStore::new();
        store.expect_is_uploaded_file().with(eq(tmp_name.clone())).times(1).return_const(true);
        store.expect_move_uploaded_file().with(eq(tmp_name.clone()), eq(target.path().join("foo.txt"))).times(1).returning(|_, _| Ok(()));

        let mut file = UploadedFile::new(descriptor(&tmp_name, UploadError::Ok), store);
        assert_eq!(file.move_to(target.path()).unwrap(), target.path().join("foo.txt"));
        assert!(file.is_moved());

        assert!(matches!(file.move_to(target.path()).unwrap_err(), MessageError::Runtime { source: RuntimeFailure::AlreadyMoved }));
        assert!(matches!(file.stream().unwrap_err(), MessageError::Runtime { source: RuntimeFailure::AlreadyMoved }));
    }

    #[test]
    fn test_move_to_missing_directory() {
        let dir = TempDir::new().unwrap();
        let mut store = MockUploadStore::new();
        store.expect_is_uploaded_file().never();

        let mut file = UploadedFile::new(descriptor(Path::new("/tmp/foobar"), UploadError::Ok), store);
        let err = file.move_to(dir.path().join("missing")).unwrap_err();

        assert!(matches!(err, MessageError::InvalidArgument { source: InvalidArgument::TargetDirectory(_) }));
        assert!(!file.is_moved());
    }

    #[test]
    fn test_move_rejects_non_upload() {
        let target = TempDir::new().unwrap();
        let mut store = MockUploadStore::new();
        store.expect_is_uploaded_file().return_const(false);
        store.expect_move_uploaded_file().never();

        let mut file = UploadedFile::new(descriptor(Path::new("/etc/passwd"), UploadError::Ok), store);
        let err = file.move_to(target.path()).unwrap_err();

        assert!(matches!(err, MessageError::Runtime { source: RuntimeFailure::NotUploaded(_) }));
        assert!(!file.is_moved());
    }

    #[test]
    fn test_failed_move_can_be_retried() {
        let target = TempDir::new().unwrap();
        let mut store = MockUploadStore::new();
        store.expect_is_uploaded_file().return_const(true);
        store.expect_move_uploaded_file().with(always(), always()).times(1).returning(|_, _| Err(io::Error::from(ErrorKind::PermissionDenied)));

        let mut file = UploadedFile::new(descriptor(Path::new("/tmp/foobar"), UploadError::Ok), store);

        assert!(matches!(file.move_to(target.path()).unwrap_err(), MessageError::Runtime { source: RuntimeFailure::Io { .. } }));
        assert!(!file.is_moved());
    }

    #[test]
    fn test_local_store_moves_file() {
        let dir = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let tmp_name = uploaded(&dir, "hello");

        let mut file = UploadedFile::new(descriptor(&tmp_name, UploadError::Ok), LocalUploadStore::new([&tmp_name]));
        let moved = file.move_to(target.path()).unwrap();

        assert_eq!(fs::read_to_string(moved).unwrap(), "hello");
        assert!(!tmp_name.exists());
    }

    #[test]
    fn test_local_store_requires_vouched_path() {
        let dir = TempDir::new().unwrap();
        let tmp_name = uploaded(&dir, "hello");

        assert!(LocalUploadStore::new([&tmp_name]).is_uploaded_file(&tmp_name));
        assert!(!LocalUploadStore::default().is_uploaded_file(&tmp_name));
        assert!(!LocalUploadStore::new([dir.path().join("missing")]).is_uploaded_file(&dir.path().join("missing")));
    }

    #[test]
    fn test_from_environment() {
        let dir = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let tmp_name = uploaded(&dir, "hello");
        let env = Environment::new().with_upload("avatar", descriptor(&tmp_name, UploadError::Ok));

        let mut file = UploadedFile::from_environment(&env, "avatar").unwrap();
        assert_eq!(file.client_filename(), Some("foo.txt"));
        assert_eq!(file.move_to(target.path()).unwrap(), target.path().join("foo.txt"));

        let err = UploadedFile::from_environment(&env, "missing").unwrap_err();
        assert!(matches!(err, MessageError::Runtime { source: RuntimeFailure::UnknownUpload { ref field } } if field == "missing"));
    }

    #[test]
    fn test_upload_error_codes() {
        assert_eq!(UploadError::try_from(6), Ok(UploadError::MissingTmpDir));
        assert_eq!(UploadError::try_from(5), Err(InvalidArgument::UploadError(5)));
        assert_eq!(u8::from(UploadError::ExtensionBlocked), 8);
        assert_eq!(UploadError::default(), UploadError::Ok);
    }

    #[test]
    fn test_deserialize_entries() {
        let single: UploadEntry = serde_json::from_str(r#"{"name": "a.txt", "type": "text/plain", "tmp_name": "/tmp/a", "size": 3, "error": 0}"#).unwrap();
        assert!(matches!(single, UploadEntry::Single(UploadDescriptor { size: Some(3), error: UploadError::Ok, .. })));

        let multiple: UploadEntry = serde_json::from_str(r#"[{"name": "a.txt", "error": 0}, {"error": 4}]"#).unwrap();
        let UploadEntry::Multiple(descriptors) = multiple else {
            panic!("expected several descriptors");
        };
        assert_eq!(descriptors[1].error, UploadError::NoFile);

        assert!(serde_json::from_str::<UploadDescriptor>(r#"{"error": 5}"#).is_err());
    }
}
