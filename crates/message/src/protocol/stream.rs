//! Byte stream over a file or an in-memory buffer.
//!
//! A [`Stream`] exclusively owns its [`Resource`]. Messages only hold a shared
//! reference to a stream (see [`Body`](crate::protocol::Body)), so every
//! operation takes `&self` and the resource sits behind a lock.
//!
//! Capabilities are probed from the resource itself: a file is opened
//! read-write if the permissions allow it, and falls back to read-only, then
//! write-only. Seekability is whatever the OS reports for the handle.
//!
//! Once a stream is closed or detached every operation fails with
//! [`RuntimeFailure::Detached`] instead of silently doing nothing.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::ensure;
use crate::protocol::{MessageError, RuntimeFailure};

const READ_CHUNK: usize = 8 * 1024;

/// Origin of a [`Stream::seek`] offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Whence {
    /// From the start of the stream
    #[default]
    Set,
    /// From the current position
    Current,
    /// From the end of the stream
    End,
}

/// How the underlying resource was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadWrite,
    ReadOnly,
    WriteOnly,
}

impl AccessMode {
    pub fn is_readable(self) -> bool {
        matches!(self, AccessMode::ReadWrite | AccessMode::ReadOnly)
    }

    pub fn is_writable(self) -> bool {
        matches!(self, AccessMode::ReadWrite | AccessMode::WriteOnly)
    }

    /// fopen-style mode string
    pub fn as_str(self) -> &'static str {
        match self {
            AccessMode::ReadWrite => "r+",
            AccessMode::ReadOnly => "r",
            AccessMode::WriteOnly => "w",
        }
    }
}

/// The resource a [`Stream`] owns.
#[derive(Debug)]
pub enum Resource {
    File(File),
    Memory(Cursor<Vec<u8>>),
}

impl Read for Resource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Resource::File(file) => file.read(buf),
            Resource::Memory(cursor) => cursor.read(buf),
        }
    }
}

impl Write for Resource {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Resource::File(file) => file.write(buf),
            Resource::Memory(cursor) => cursor.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Resource::File(file) => file.flush(),
            Resource::Memory(cursor) => cursor.flush(),
        }
    }
}

impl Seek for Resource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Resource::File(file) => file.seek(pos),
            Resource::Memory(cursor) => cursor.seek(pos),
        }
    }
}

/// Snapshot of the stream metadata, keyed like `stream_get_meta_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamMetadata {
    pub timed_out: bool,
    pub blocked: bool,
    pub eof: bool,
    pub wrapper_type: &'static str,
    pub stream_type: &'static str,
    pub mode: &'static str,
    pub unread_bytes: u64,
    pub seekable: bool,
    pub uri: String,
}

/// A single metadata entry, see [`Stream::metadata_value`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataValue {
    Bool(bool),
    Int(u64),
    Str(String),
}

impl StreamMetadata {
    /// Looks up an entry by its key, e.g. `"seekable"` or `"uri"`.
    pub fn get(&self, key: &str) -> Option<MetadataValue> {
        let value = match key {
            "timed_out" => MetadataValue::Bool(self.timed_out),
            "blocked" => MetadataValue::Bool(self.blocked),
            "eof" => MetadataValue::Bool(self.eof),
            "wrapper_type" => MetadataValue::Str(self.wrapper_type.to_owned()),
            "stream_type" => MetadataValue::Str(self.stream_type.to_owned()),
            "mode" => MetadataValue::Str(self.mode.to_owned()),
            "unread_bytes" => MetadataValue::Int(self.unread_bytes),
            "seekable" => MetadataValue::Bool(self.seekable),
            "uri" => MetadataValue::Str(self.uri.clone()),
            _ => return None,
        };
        Some(value)
    }
}

struct StreamState {
    resource: Option<Resource>,
    contents: Option<Bytes>,
    eof: bool,
}

/// Readable, writable and seekable view over a [`Resource`].
pub struct Stream {
    state: Mutex<StreamState>,
    mode: AccessMode,
    seekable: bool,
    uri: String,
}

impl Stream {
    /// Opens the file at `path` with the widest access its permissions allow.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeFailure::Io`] if the file can be opened in no mode at all.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MessageError> {
        let path = path.as_ref();
        let (mut file, mode) = open_widest(path).map_err(RuntimeFailure::io)?;
        let seekable = file.stream_position().is_ok();

        debug!(path = %path.display(), mode = mode.as_str(), seekable, "opened stream");
        Ok(Self::with_resource(Resource::File(file), mode, seekable, path.to_string_lossy().into_owned()))
    }

    /// Wraps an already opened file, e.g. one end of a pipe.
    ///
    /// `mode` must describe how `file` was opened; seekability is probed.
    pub fn from_file<S: Into<String>>(mut file: File, mode: AccessMode, uri: S) -> Self {
        let seekable = file.stream_position().is_ok();
        Self::with_resource(Resource::File(file), mode, seekable, uri.into())
    }

    /// Creates an empty, read-write, in-memory stream.
    pub fn memory() -> Self {
        Self::from_bytes(Vec::new())
    }

    /// Creates a read-write, in-memory stream positioned at the start of `content`.
    pub fn from_bytes<B: Into<Vec<u8>>>(content: B) -> Self {
        Self::with_resource(Resource::Memory(Cursor::new(content.into())), AccessMode::ReadWrite, true, "memory".to_owned())
    }

    fn with_resource(resource: Resource, mode: AccessMode, seekable: bool, uri: String) -> Self {
        Self { state: Mutex::new(StreamState { resource: Some(resource), contents: None, eof: false }), mode, seekable, uri }
    }

    fn lock(&self) -> Result<MutexGuard<'_, StreamState>, RuntimeFailure> {
        self.state.lock().map_err(|_| RuntimeFailure::Poisoned)
    }

    /// Runs `f` against the live resource.
    fn with_live<T, F>(&self, f: F) -> Result<T, MessageError>
    where
        F: FnOnce(&mut Resource, &mut StreamState) -> Result<T, MessageError>,
    {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let mut resource = state.resource.take().ok_or(RuntimeFailure::Detached)?;
        let result = f(&mut resource, state);
        state.resource = Some(resource);
        result
    }

    fn is_live(&self) -> bool {
        self.lock().is_ok_and(|state| state.resource.is_some())
    }

    /// The location the stream was opened from, `memory` for in-memory streams.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// False once the stream is detached.
    pub fn is_readable(&self) -> bool {
        self.mode.is_readable() && self.is_live()
    }

    /// False once the stream is detached.
    pub fn is_writable(&self) -> bool {
        self.mode.is_writable() && self.is_live()
    }

    /// False once the stream is detached.
    pub fn is_seekable(&self) -> bool {
        self.seekable && self.is_live()
    }

    /// Reads up to `length` bytes from the current position.
    ///
    /// Fewer bytes are returned only at the end of the stream, which also sets [`Stream::eof`].
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeFailure`] if the stream is detached, not readable, or the read fails.
    pub fn read(&self, length: usize) -> Result<Bytes, MessageError> {
        self.with_live(|resource, state| {
            ensure!(self.mode.is_readable(), RuntimeFailure::NotReadable);

            // `length` is an upper bound, the buffer grows with what is actually read
            let mut buf = Vec::with_capacity(length.min(READ_CHUNK));
            Read::take(&mut *resource, length as u64).read_to_end(&mut buf).map_err(RuntimeFailure::io)?;
            if buf.len() < length {
                state.eof = true;
            }
            Ok(Bytes::from(buf))
        })
    }

    /// Writes all of `data` at the current position and returns its length.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeFailure`] if the stream is detached, not writable, or the write fails.
    pub fn write(&self, data: &[u8]) -> Result<usize, MessageError> {
        self.with_live(|resource, _| {
            ensure!(self.mode.is_writable(), RuntimeFailure::NotWritable);

            resource.write_all(data).map_err(RuntimeFailure::io)?;
            resource.flush().map_err(RuntimeFailure::io)?;
            Ok(data.len())
        })
    }

    /// Moves the position to `offset` relative to `whence`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeFailure`] if the stream is detached, not seekable, or the
    /// target position is before the start of the stream.
    pub fn seek(&self, offset: i64, whence: Whence) -> Result<(), MessageError> {
        self.with_live(|resource, state| {
            ensure!(self.seekable, RuntimeFailure::NotSeekable);

            let pos = match whence {
                Whence::Set => SeekFrom::Start(
                    u64::try_from(offset)
                        .map_err(|_| RuntimeFailure::io(io::Error::new(ErrorKind::InvalidInput, "negative seek offset")))?,
                ),
                Whence::Current => SeekFrom::Current(offset),
                Whence::End => SeekFrom::End(offset),
            };
            resource.seek(pos).map_err(RuntimeFailure::io)?;
            state.eof = false;
            Ok(())
        })
    }

    /// The current position.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeFailure::Position`] if the position cannot be determined.
    pub fn tell(&self) -> Result<u64, MessageError> {
        self.with_live(|resource, _| Ok(resource.stream_position().map_err(|_| RuntimeFailure::Position)?))
    }

    /// Seeks to the start and verifies the position is reported as 0.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeFailure::Rewind`] if the position is anything else afterwards.
    pub fn rewind(&self) -> Result<(), MessageError> {
        self.seek(0, Whence::Set)?;
        let position = self.tell()?;
        ensure!(position == 0, RuntimeFailure::Rewind { position });
        Ok(())
    }

    /// Whether a read has reached the end of the stream.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeFailure::Detached`] once the stream is detached.
    pub fn eof(&self) -> Result<bool, MessageError> {
        self.with_live(|_, state| Ok(state.eof))
    }

    /// Reads everything from the current position to the end.
    ///
    /// The result is memoized: the stream is read at most once and later calls
    /// return the same bytes regardless of the position or later writes.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeFailure`] if the stream is detached, not readable, or the read fails.
    pub fn contents(&self) -> Result<Bytes, MessageError> {
        self.with_live(|resource, state| {
            if let Some(contents) = &state.contents {
                return Ok(contents.clone());
            }
            ensure!(self.mode.is_readable(), RuntimeFailure::NotReadable);

            let mut buf = Vec::new();
            resource.read_to_end(&mut buf).map_err(RuntimeFailure::io)?;
            state.eof = true;

            let contents = Bytes::from(buf);
            state.contents = Some(contents.clone());
            Ok(contents)
        })
    }

    /// Byte length of the resource if it is known.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeFailure::Detached`] once the stream is detached.
    pub fn size(&self) -> Result<Option<u64>, MessageError> {
        self.with_live(|resource, _| {
            let size = match resource {
                Resource::File(file) => file.metadata().ok().map(|metadata| metadata.len()),
                Resource::Memory(cursor) => Some(cursor.get_ref().len() as u64),
            };
            Ok(size)
        })
    }

    /// All metadata of the stream.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeFailure::Detached`] once the stream is detached.
    pub fn metadata(&self) -> Result<StreamMetadata, MessageError> {
        self.with_live(|resource, state| {
            let (wrapper_type, stream_type) = match resource {
                Resource::File(_) => ("plainfile", "STDIO"),
                Resource::Memory(_) => ("memory", "MEMORY"),
            };
            Ok(StreamMetadata {
                timed_out: false,
                blocked: true,
                eof: state.eof,
                wrapper_type,
                stream_type,
                mode: self.mode.as_str(),
                unread_bytes: 0,
                seekable: self.seekable,
                uri: self.uri.clone(),
            })
        })
    }

    /// A single metadata entry, `None` for an unknown key.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeFailure::Detached`] once the stream is detached.
    pub fn metadata_value(&self, key: &str) -> Result<Option<MetadataValue>, MessageError> {
        Ok(self.metadata()?.get(key))
    }

    /// Separates the resource from the stream, leaving the stream unusable.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeFailure::Detached`] if the stream was already detached.
    pub fn detach(&self) -> Result<Resource, MessageError> {
        let resource = self.lock()?.resource.take().ok_or(RuntimeFailure::Detached)?;
        debug!(uri = %self.uri, "detached stream");
        Ok(resource)
    }

    /// Closes the resource.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeFailure::Detached`] if the stream was already closed.
    pub fn close(&self) -> Result<(), MessageError> {
        let resource = self.detach()?;
        drop(resource);
        debug!(uri = %self.uri, "closed stream");
        Ok(())
    }
}

/// Tries read-write, then read-only, then write-only.
fn open_widest(path: &Path) -> io::Result<(File, AccessMode)> {
    let denied = |e: &io::Error| matches!(e.kind(), ErrorKind::PermissionDenied | ErrorKind::ReadOnlyFilesystem);

    match OpenOptions::new().read(true).write(true).open(path) {
        Ok(file) => return Ok((file, AccessMode::ReadWrite)),
        Err(e) if !denied(&e) => return Err(e),
        Err(_) => {}
    }

    match File::open(path) {
        Ok(file) => return Ok((file, AccessMode::ReadOnly)),
        Err(e) if !denied(&e) => return Err(e),
        Err(_) => {}
    }

    OpenOptions::new().write(true).open(path).map(|file| (file, AccessMode::WriteOnly))
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("uri", &self.uri)
            .field("mode", &self.mode.as_str())
            .field("seekable", &self.seekable)
            .field("detached", &!self.is_live())
            .finish()
    }
}
