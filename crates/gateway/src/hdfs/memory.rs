//! In-memory [`RemoteFs`] used by tests.
//!
//! Paths are absolute, `/`-separated strings. `list` renders the same text the
//! `hdfs dfs -ls` command prints and runs it through the listing formatter, so
//! handlers see exactly what they would see from the CLI adapter.
//!
//! Two switches simulate a misbehaving cluster:
//! - [`MemoryFs::set_fail_commands`]: operations other than existence tests fail.
//! - [`MemoryFs::set_ignore_writes`]: mutations report success but change nothing.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use protocol::{entry_name, parse_listing, DirectoryEntry};

use super::{HdfsResult, RemoteFs};
use crate::process::CommandError;

/// Timestamp shown for every entry.
const MODIFIED: &str = "2024-01-01 00:00";

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Vec<u8>),
}

/// In-memory remote filesystem.
pub struct MemoryFs {
    nodes: Mutex<BTreeMap<String, Node>>,
    fail_commands: AtomicBool,
    ignore_writes: AtomicBool,
    safe_mode: AtomicBool,
    invocations: AtomicUsize,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

/// Collapse repeated and trailing separators. The empty path is the root.
fn normalize(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    format!("/{}", parts.join("/"))
}

fn parent_of(path: &str) -> Option<String> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(idx) => Some(path[..idx].to_string()),
        None => None,
    }
}

fn child_of(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Whether `path` is `root` or lies beneath it.
fn is_within(path: &str, root: &str) -> bool {
    path == root || root == "/" || path.starts_with(&format!("{root}/"))
}

fn render_line(path: &str, node: &Node) -> String {
    match node {
        Node::Dir => format!("drwxr-xr-x   - hdfs supergroup          0 {MODIFIED} {path}"),
        Node::File(data) => format!(
            "-rw-r--r--   1 hdfs supergroup {:>10} {MODIFIED} {path}",
            data.len()
        ),
    }
}

impl MemoryFs {
    /// An empty filesystem containing only `/`.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir);
        Self {
            nodes: Mutex::new(nodes),
            fail_commands: AtomicBool::new(false),
            ignore_writes: AtomicBool::new(false),
            safe_mode: AtomicBool::new(true),
            invocations: AtomicUsize::new(0),
        }
    }

    /// Seed a directory (and its parents).
    pub fn with_dir(self, path: &str) -> Self {
        let path = normalize(path);
        Self::create_dirs(&mut self.lock(), &path);
        self
    }

    /// Seed a file, creating parent directories.
    pub fn with_file(self, path: &str, data: impl Into<Vec<u8>>) -> Self {
        let path = normalize(path);
        {
            let mut nodes = self.lock();
            if let Some(parent) = parent_of(&path) {
                Self::create_dirs(&mut nodes, &parent);
            }
            nodes.insert(path, Node::File(data.into()));
        }
        self
    }

    /// Make every operation except existence tests fail.
    pub fn set_fail_commands(&self, fail: bool) {
        self.fail_commands.store(fail, Ordering::SeqCst);
    }

    /// Make mutations succeed without changing anything.
    pub fn set_ignore_writes(&self, ignore: bool) {
        self.ignore_writes.store(ignore, Ordering::SeqCst);
    }

    /// Number of trait calls made so far.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub fn in_safe_mode(&self) -> bool {
        self.safe_mode.load(Ordering::SeqCst)
    }

    /// Contents of a file, if `path` is one.
    pub fn read_file(&self, path: &str) -> Option<Vec<u8>> {
        match self.lock().get(&normalize(path)) {
            Some(Node::File(data)) => Some(data.clone()),
            _ => None,
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lock().contains_key(&normalize(path))
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Node>> {
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn create_dirs(nodes: &mut BTreeMap<String, Node>, path: &str) {
        let mut current = String::from("/");
        for part in path.split('/').filter(|p| !p.is_empty()) {
            current = child_of(&current, part);
            nodes.entry(current.clone()).or_insert(Node::Dir);
        }
    }

    /// Count the call and apply the failure switch.
    fn begin(&self, command: &str) -> HdfsResult<()> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if self.fail_commands.load(Ordering::SeqCst) {
            return Err(CommandError::failed(command, "injected failure"));
        }
        Ok(())
    }

    fn writes_ignored(&self) -> bool {
        self.ignore_writes.load(Ordering::SeqCst)
    }

    /// Resolve the target of a copy into `remote`: an existing directory
    /// receives the source under its own name.
    fn copy_target(
        nodes: &BTreeMap<String, Node>,
        remote: &str,
        name: &str,
        command: &str,
    ) -> HdfsResult<String> {
        let remote = normalize(remote);
        if matches!(nodes.get(&remote), Some(Node::Dir)) {
            return Ok(child_of(&remote, name));
        }
        match parent_of(&remote).and_then(|p| nodes.get(&p).cloned()) {
            Some(Node::Dir) => Ok(remote),
            _ => Err(CommandError::failed(
                command,
                format!("`{remote}': No such file or directory"),
            )),
        }
    }

    /// Copy a local file or directory tree into `nodes` at `target`.
    fn copy_in(nodes: &mut BTreeMap<String, Node>, local: &Path, target: &str) -> HdfsResult<()> {
        if local.is_dir() {
            nodes.insert(target.to_string(), Node::Dir);
            for entry in fs::read_dir(local)? {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().into_owned();
                Self::copy_in(nodes, &entry.path(), &child_of(target, &name))?;
            }
        } else {
            nodes.insert(target.to_string(), Node::File(fs::read(local)?));
        }
        Ok(())
    }

    /// Write the subtree rooted at `remote` to `local`.
    fn copy_out(nodes: &BTreeMap<String, Node>, remote: &str, local: &Path) -> HdfsResult<()> {
        match nodes.get(remote) {
            Some(Node::File(data)) => fs::write(local, data)?,
            Some(Node::Dir) => {
                fs::create_dir_all(local)?;
                let prefix = child_of(remote, "");
                let children: Vec<&String> = nodes
                    .keys()
                    .filter(|k| {
                        k.as_str() != remote
                            && k.starts_with(&prefix)
                            && !k[prefix.len()..].contains('/')
                    })
                    .collect();
                for child in children {
                    Self::copy_out(nodes, child, &local.join(entry_name(child)))?;
                }
            }
            None => {
                return Err(CommandError::failed(
                    "get",
                    format!("`{remote}': No such file or directory"),
                ))
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RemoteFs for MemoryFs {
    async fn exists(&self, path: &str) -> HdfsResult<bool> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(self.contains(path))
    }

    async fn is_dir(&self, path: &str) -> HdfsResult<bool> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(matches!(self.lock().get(&normalize(path)), Some(Node::Dir)))
    }

    async fn list(&self, path: &str) -> HdfsResult<Vec<DirectoryEntry>> {
        self.begin("ls")?;
        let path = normalize(path);
        let nodes = self.lock();

        let output = match nodes.get(&path) {
            None => {
                return Err(CommandError::failed(
                    "ls",
                    format!("`{path}': No such file or directory"),
                ))
            }
            // Listing a file prints only its own line, with no summary.
            Some(file @ Node::File(_)) => render_line(&path, file),
            Some(Node::Dir) => {
                let lines: Vec<String> = nodes
                    .iter()
                    .filter(|(k, _)| parent_of(k).as_deref() == Some(path.as_str()))
                    .map(|(k, node)| render_line(k, node))
                    .collect();
                format!("Found {} items\n{}\n", lines.len(), lines.join("\n"))
            }
        };

        Ok(parse_listing(&output))
    }

    async fn mkdir(&self, path: &str) -> HdfsResult<()> {
        self.begin("mkdir")?;
        if self.writes_ignored() {
            return Ok(());
        }
        let path = normalize(path);
        let mut nodes = self.lock();

        let mut current = String::from("/");
        for part in path.split('/').filter(|p| !p.is_empty()) {
            current = child_of(&current, part);
            if let Some(Node::File(_)) = nodes.get(&current) {
                return Err(CommandError::failed(
                    "mkdir",
                    format!("`{current}': Is not a directory"),
                ));
            }
        }
        Self::create_dirs(&mut nodes, &path);
        Ok(())
    }

    async fn remove(&self, path: &str) -> HdfsResult<()> {
        self.begin("rm")?;
        if self.writes_ignored() {
            return Ok(());
        }
        let path = normalize(path);
        let mut nodes = self.lock();

        if !nodes.contains_key(&path) {
            return Err(CommandError::failed(
                "rm",
                format!("`{path}': No such file or directory"),
            ));
        }
        nodes.retain(|k, _| !is_within(k, &path) || k == "/");
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> HdfsResult<()> {
        self.begin("mv")?;
        if self.writes_ignored() {
            return Ok(());
        }
        let from = normalize(from);
        let mut nodes = self.lock();

        if !nodes.contains_key(&from) || from == "/" {
            return Err(CommandError::failed(
                "mv",
                format!("`{from}': No such file or directory"),
            ));
        }
        let target = Self::copy_target(&nodes, to, entry_name(&from), "mv")?;
        if is_within(&target, &from) {
            return Err(CommandError::failed(
                "mv",
                format!("`{from}' to `{target}': is a subdirectory of itself"),
            ));
        }

        let moved: Vec<(String, Node)> = nodes
            .iter()
            .filter(|(k, _)| is_within(k, &from))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (key, node) in moved {
            nodes.remove(&key);
            let suffix = &key[from.len()..];
            nodes.insert(format!("{target}{suffix}"), node);
        }
        Ok(())
    }

    async fn put(&self, local: &Path, remote: &str) -> HdfsResult<()> {
        self.begin("put")?;
        if self.writes_ignored() {
            return Ok(());
        }
        let name = local
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut nodes = self.lock();

        let target = Self::copy_target(&nodes, remote, &name, "put")?;
        Self::copy_in(&mut nodes, local, &target)
    }

    async fn get(&self, remote: &str, local: &Path) -> HdfsResult<()> {
        self.begin("get")?;
        let nodes = self.lock();
        Self::copy_out(&nodes, &normalize(remote), local)
    }

    async fn leave_safe_mode(&self) -> HdfsResult<()> {
        self.begin("dfsadmin -safemode leave")?;
        self.safe_mode.store(false, Ordering::SeqCst);
        Ok(())
    }
}
