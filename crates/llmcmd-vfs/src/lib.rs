//! Virtual file system: allow-listed, text-only, size-capped file access
//! plus a scratch temp-file namespace.

use llmcmd_core::EngineError;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Default per-file read cap.
pub const DEFAULT_SIZE_CAP_BYTES: u64 = 10 * 1024 * 1024;
/// Bytes sniffed from the head of a file to decide if it looks binary.
const SNIFF_WINDOW: usize = 512;
/// Above this fraction of non-printable bytes in the sniff window, the file
/// is rejected as binary.
const NON_PRINTABLE_RATIO_THRESHOLD: f64 = 0.30;

/// File open mode: six POSIX-style combinations of read/write/append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    Append,
    ReadWrite,
    WriteRead,
    AppendRead,
}

impl OpenMode {
    fn is_read_primary(self) -> bool {
        matches!(self, OpenMode::Read | OpenMode::ReadWrite)
    }

    fn is_write_mode(self) -> bool {
        matches!(
            self,
            OpenMode::Write | OpenMode::Append | OpenMode::WriteRead | OpenMode::AppendRead
        )
    }

    fn to_open_options(self) -> OpenOptions {
        let mut opts = OpenOptions::new();
        match self {
            OpenMode::Read => {
                opts.read(true);
            }
            OpenMode::Write => {
                opts.write(true).create(true).truncate(true);
            }
            OpenMode::Append => {
                opts.append(true).create(true);
            }
            OpenMode::ReadWrite => {
                opts.read(true).write(true);
            }
            OpenMode::WriteRead => {
                opts.read(true).write(true).create(true).truncate(true);
            }
            OpenMode::AppendRead => {
                opts.read(true).append(true).create(true);
            }
        }
        opts
    }
}

/// An open VFS file. Wraps a [`std::fs::File`]; reads are only possible if
/// the mode permitted it, enforced at the type level by [`Vfs::open`] having
/// already sniffed and rewound the file.
#[derive(Debug)]
pub struct VfsHandle {
    file: File,
    pub name: String,
}

impl Read for VfsHandle {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for VfsHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

/// Session-scoped virtual file system: an allow-list of readable/writable
/// names plus a private temp namespace, rooted under `root_dir`.
pub struct Vfs {
    root_dir: PathBuf,
    input_allow: HashSet<String>,
    output_allow: HashSet<String>,
    size_cap_bytes: u64,
    temp_counter: Mutex<u64>,
    temp_names: Mutex<HashSet<String>>,
}

impl Vfs {
    pub fn new(
        root_dir: impl Into<PathBuf>,
        input_allow: impl IntoIterator<Item = String>,
        output_allow: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            root_dir: root_dir.into(),
            input_allow: input_allow.into_iter().collect(),
            output_allow: output_allow.into_iter().collect(),
            size_cap_bytes: DEFAULT_SIZE_CAP_BYTES,
            temp_counter: Mutex::new(0),
            temp_names: Mutex::new(HashSet::new()),
        }
    }

    /// Override the read size cap.
    pub fn with_size_cap(mut self, cap_bytes: u64) -> Self {
        self.size_cap_bytes = cap_bytes;
        self
    }

    /// Derive a child session's VFS whose allow-lists are a subset of this
    /// one's (invariant V5).
    pub fn child(&self, input_allow: HashSet<String>, output_allow: HashSet<String>) -> Self {
        debug_assert!(input_allow.is_subset(&self.input_allow));
        debug_assert!(output_allow.is_subset(&self.output_allow));
        Self {
            root_dir: self.root_dir.clone(),
            input_allow: input_allow.intersection(&self.input_allow).cloned().collect(),
            output_allow: output_allow
                .intersection(&self.output_allow)
                .cloned()
                .collect(),
            size_cap_bytes: self.size_cap_bytes,
            temp_counter: Mutex::new(0),
            temp_names: Mutex::new(HashSet::new()),
        }
    }

    fn is_temp(&self, name: &str) -> bool {
        self.temp_names.lock().unwrap().contains(name)
    }

    /// Cheap membership check against the input allow-list/temp namespace,
    /// without touching the filesystem. Lets a caller decide whether a bare
    /// positional argument names an openable input before attempting
    /// `open`, e.g. `spawn{cmd:"cat", args:["hello.txt"]}`.
    pub fn is_input_allowed(&self, name: &str) -> bool {
        self.input_allow.contains(name) || self.is_temp(name)
    }

    fn resolve(&self, name: &str) -> PathBuf {
        self.root_dir.join(name)
    }

    /// Open a file by allow-listed name. Enforces, in order: allow-list,
    /// size cap (read modes), binary sniff (read modes), writability.
    pub fn open(&self, name: &str, mode: OpenMode) -> Result<VfsHandle, EngineError> {
        let in_input_list = self.input_allow.contains(name) || self.is_temp(name);
        let in_output_list = self.output_allow.contains(name) || self.is_temp(name);

        if mode.is_read_primary() && !in_input_list {
            return Err(EngineError::Permission(name.to_string()));
        }
        if mode.is_write_mode() && !in_output_list {
            return Err(EngineError::Permission(name.to_string()));
        }

        let path = self.resolve(name);

        if mode.is_read_primary() {
            if let Ok(meta) = std::fs::metadata(&path) {
                if meta.len() > self.size_cap_bytes {
                    return Err(EngineError::Size {
                        name: name.to_string(),
                        cap_bytes: self.size_cap_bytes,
                    });
                }
            }
        }

        let mut file = mode
            .to_open_options()
            .open(&path)
            .map_err(|e| EngineError::InvalidArgs(format!("cannot open '{name}': {e}")))?;

        if mode.is_read_primary() {
            sniff_binary(&mut file, name)?;
        }

        Ok(VfsHandle {
            file,
            name: name.to_string(),
        })
    }

    /// Create a fresh file in the temp namespace. The returned name is
    /// implicitly allow-listed for both read and write for the rest of the
    /// session.
    pub fn create_temp(&self, pattern: &str) -> Result<(VfsHandle, String), EngineError> {
        let mut counter = self.temp_counter.lock().unwrap();
        *counter += 1;
        let name = format!(".llmcmd-tmp-{pattern}-{}", *counter);
        drop(counter);

        self.temp_names.lock().unwrap().insert(name.clone());

        let path = self.resolve(&name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| EngineError::InvalidArgs(format!("cannot create temp file: {e}")))?;

        debug!(name = %name, "created VFS temp file");
        Ok((
            VfsHandle {
                file,
                name: name.clone(),
            },
            name,
        ))
    }

    /// Remove a file. Allowed for temp-namespace files and output-allow-listed
    /// files only.
    pub fn remove_file(&self, name: &str) -> Result<(), EngineError> {
        if !self.is_temp(name) && !self.output_allow.contains(name) {
            return Err(EngineError::Permission(name.to_string()));
        }
        let path = self.resolve(name);
        std::fs::remove_file(&path)
            .map_err(|e| EngineError::InvalidArgs(format!("cannot remove '{name}': {e}")))?;
        self.temp_names.lock().unwrap().remove(name);
        Ok(())
    }

    /// List every name currently reachable: input allow-list, output
    /// allow-list, and live temp files.
    pub fn list_files(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .input_allow
            .iter()
            .chain(self.output_allow.iter())
            .chain(self.temp_names.lock().unwrap().iter())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }
}

/// Read the sniff window from `file`, classify it, and rewind to the start
/// so the caller's subsequent reads see the whole file (invariant V4: a
/// rejected handle delivers no bytes).
fn sniff_binary(file: &mut File, name: &str) -> Result<(), EngineError> {
    let mut buf = [0u8; SNIFF_WINDOW];
    let n = file
        .read(&mut buf)
        .map_err(|e| EngineError::InvalidArgs(format!("cannot sniff '{name}': {e}")))?;
    file.seek(SeekFrom::Start(0))
        .map_err(|e| EngineError::InvalidArgs(format!("cannot rewind '{name}': {e}")))?;

    if n == 0 {
        return Ok(());
    }

    let window = &buf[..n];
    let nul_count = window.iter().filter(|&&b| b == 0).count();
    if nul_count > 0 {
        return Err(EngineError::Binary(name.to_string()));
    }

    let non_printable = window
        .iter()
        .filter(|&&b| b != b'\n' && b != b'\r' && b != b'\t' && !(0x20..=0x7e).contains(&b))
        .count();
    let ratio = non_printable as f64 / window.len() as f64;
    if ratio > NON_PRINTABLE_RATIO_THRESHOLD {
        return Err(EngineError::Binary(name.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn vfs_with(dir: &tempfile::TempDir, inputs: &[&str], outputs: &[&str]) -> Vfs {
        Vfs::new(
            dir.path(),
            inputs.iter().map(|s| s.to_string()),
            outputs.iter().map(|s| s.to_string()),
        )
    }

    #[test]
    fn open_rejects_names_outside_allow_list() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("secret.txt"), b"hi").unwrap();
        let vfs = vfs_with(&dir, &[], &[]);
        let err = vfs.open("secret.txt", OpenMode::Read).unwrap_err();
        assert!(matches!(err, EngineError::Permission(_)));
    }

    #[test]
    fn open_allows_listed_read() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), b"hi\n").unwrap();
        let vfs = vfs_with(&dir, &["hello.txt"], &[]);
        let mut handle = vfs.open("hello.txt", OpenMode::Read).unwrap();
        let mut contents = String::new();
        handle.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "hi\n");
    }

    #[test]
    fn open_rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("big.txt"), vec![b'a'; 4096]).unwrap();
        let vfs = vfs_with(&dir, &["big.txt"], &[]).with_size_cap(1024);
        let err = vfs.open("big.txt", OpenMode::Read).unwrap_err();
        assert!(matches!(err, EngineError::Size { .. }));
    }

    #[test]
    fn open_rejects_binary_with_nul_byte() {
        let dir = tempfile::tempdir().unwrap();
        let mut data = vec![b'a'; 100];
        data[50] = 0;
        std::fs::write(dir.path().join("bin.dat"), &data).unwrap();
        let vfs = vfs_with(&dir, &["bin.dat"], &[]);
        let err = vfs.open("bin.dat", OpenMode::Read).unwrap_err();
        assert!(matches!(err, EngineError::Binary(_)));
    }

    #[test]
    fn open_rejects_high_non_printable_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let data: Vec<u8> = (0..200u32).map(|i| (i % 31) as u8).collect();
        std::fs::write(dir.path().join("noisy.dat"), &data).unwrap();
        let vfs = vfs_with(&dir, &["noisy.dat"], &[]);
        let err = vfs.open("noisy.dat", OpenMode::Read).unwrap_err();
        assert!(matches!(err, EngineError::Binary(_)));
    }

    #[test]
    fn rejected_binary_handle_delivers_no_bytes() {
        // V4: verify no handle escapes a Binary rejection by construction --
        // `open` returns Err, never a handle, on that path.
        let dir = tempfile::tempdir().unwrap();
        let mut data = vec![0u8; 10];
        data[0] = 0;
        std::fs::write(dir.path().join("bin.dat"), &data).unwrap();
        let vfs = vfs_with(&dir, &["bin.dat"], &[]);
        assert!(vfs.open("bin.dat", OpenMode::Read).is_err());
    }

    #[test]
    fn write_mode_requires_output_allow_list() {
        let dir = tempfile::tempdir().unwrap();
        let vfs = vfs_with(&dir, &[], &[]);
        let err = vfs.open("out.txt", OpenMode::Write).unwrap_err();
        assert!(matches!(err, EngineError::Permission(_)));
    }

    #[test]
    fn write_mode_succeeds_when_allow_listed() {
        let dir = tempfile::tempdir().unwrap();
        let vfs = vfs_with(&dir, &[], &["out.txt"]);
        let mut handle = vfs.open("out.txt", OpenMode::Write).unwrap();
        handle.write_all(b"hello").unwrap();
        handle.flush().unwrap();
        let contents = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(contents, "hello");
    }

    #[test]
    fn temp_file_is_implicitly_allow_listed() {
        let dir = tempfile::tempdir().unwrap();
        let vfs = vfs_with(&dir, &[], &[]);
        let (mut handle, name) = vfs.create_temp("scratch").unwrap();
        handle.write_all(b"data").unwrap();
        handle.flush().unwrap();

        let mut reopened = vfs.open(&name, OpenMode::Read).unwrap();
        let mut contents = String::new();
        reopened.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "data");
    }

    #[test]
    fn remove_file_requires_permission() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("keep.txt"), b"x").unwrap();
        let vfs = vfs_with(&dir, &["keep.txt"], &[]);
        let err = vfs.remove_file("keep.txt").unwrap_err();
        assert!(matches!(err, EngineError::Permission(_)));
    }

    #[test]
    fn remove_temp_file_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let vfs = vfs_with(&dir, &[], &[]);
        let (_handle, name) = vfs.create_temp("scratch").unwrap();
        vfs.remove_file(&name).unwrap();
        assert!(!dir.path().join(&name).exists());
    }

    #[test]
    fn list_files_includes_allow_lists_and_temps() {
        let dir = tempfile::tempdir().unwrap();
        let vfs = vfs_with(&dir, &["a.txt"], &["b.txt"]);
        let (_h, temp_name) = vfs.create_temp("x").unwrap();
        let files = vfs.list_files();
        assert!(files.contains(&"a.txt".to_string()));
        assert!(files.contains(&"b.txt".to_string()));
        assert!(files.contains(&temp_name));
    }

    #[test]
    fn child_allow_list_is_subset_of_parent() {
        let dir = tempfile::tempdir().unwrap();
        let parent = vfs_with(&dir, &["a.txt", "b.txt"], &["out.txt"]);
        let child = parent.child(
            ["a.txt".to_string()].into_iter().collect(),
            ["out.txt".to_string()].into_iter().collect(),
        );
        assert_eq!(child.input_allow, ["a.txt".to_string()].into_iter().collect());
        assert!(child.input_allow.is_subset(&parent.input_allow));
    }
}
