//! Fixtures shared by the micro-message benchmarks.

/// A named benchmark input.
#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    file: TestFile,
}

impl TestCase {
    pub fn new(name: &'static str, file: TestFile) -> Self {
        Self { name, file }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn file(&self) -> &TestFile {
        &self.file
    }

    /// Total bytes of all non-empty lines, used as the criterion throughput.
    pub fn throughput_bytes(&self) -> u64 {
        self.file.lines().map(str::len).sum::<usize>() as u64
    }
}

/// A fixture file holding one input per line.
#[derive(Debug, Copy, Clone)]
pub struct TestFile {
    content: &'static str,
}

impl TestFile {
    pub const fn new(content: &'static str) -> Self {
        Self { content }
    }

    /// The non-empty lines of the file.
    pub fn lines(&self) -> impl Iterator<Item = &'static str> {
        self.content.lines().filter(|line| !line.is_empty())
    }
}
