//! JSON Lines file implementation of `AuditStorage`.
//!
//! One sealed entry per line, in append order, exactly as `AuditEntry`
//! serializes (camelCase, integrity block included). The file is the only
//! source of truth; on open it is scanned once to rebuild the id index and
//! the cached tail.
//!
//! Appends are written, flushed, and synced before returning. A write that
//! fails part-way is truncated back to the previous end of file so no
//! partial line survives; if that truncation fails too, the store refuses
//! every later append.

use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::{stream, StreamExt};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader, Lines};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use chainseal_contracts::{
    entry::AuditEntry,
    error::{LedgerError, LedgerResult},
};
use chainseal_core::traits::{AuditStorage, EntryStream};

/// Byte range of one stored line, newline excluded.
#[derive(Debug, Clone, Copy)]
struct LineSpan {
    offset: u64,
    len: usize,
}

struct FileState {
    writer: File,
    /// Current end of file.
    end: u64,
    index: HashMap<String, LineSpan>,
    last: Option<AuditEntry>,
    count: u64,
    /// Set when a failed append could not be rolled back.
    failed: Option<String>,
}

/// An append-only entry store backed by a JSON Lines file.
pub struct JsonlFileStorage {
    path: PathBuf,
    state: Mutex<FileState>,
}

impl JsonlFileStorage {
    /// Open `path`, creating it (and its parent directory) if missing.
    ///
    /// Returns `LedgerError::Storage` if the file cannot be opened or an
    /// existing line does not decode as an `AuditEntry`.
    pub async fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                LedgerError::storage(format!("failed to create '{}': {e}", parent.display()))
            })?;
        }

        let mut writer = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| LedgerError::storage(format!("failed to open '{}': {e}", path.display())))?;

        let contents = fs::read_to_string(&path)
            .await
            .map_err(|e| LedgerError::storage(format!("failed to read '{}': {e}", path.display())))?;

        let mut index = HashMap::new();
        let mut last = None;
        let mut count: u64 = 0;
        let mut offset: u64 = 0;
        for raw in contents.split_inclusive('\n') {
            let line = raw.trim_end_matches(['\n', '\r']);
            if !line.trim().is_empty() {
                let entry = decode_line(line)?;
                index.insert(
                    entry.id.clone(),
                    LineSpan {
                        offset,
                        len: line.len(),
                    },
                );
                last = Some(entry);
                count += 1;
            }
            offset += raw.len() as u64;
        }

        // Terminate a final line left without its newline so the next
        // append starts on a line of its own.
        if !contents.is_empty() && !contents.ends_with('\n') {
            warn!(path = %path.display(), "audit log file missing final newline; repairing");
            write_line(&mut writer, b"\n").await.map_err(|e| {
                LedgerError::storage(format!("failed to repair '{}': {e}", path.display()))
            })?;
            offset += 1;
        }

        info!(path = %path.display(), entries = count, "opened audit log file");
        Ok(Self {
            path,
            state: Mutex::new(FileState {
                writer,
                end: offset,
                index,
                last,
                count,
                failed: None,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditStorage for JsonlFileStorage {
    async fn append(&self, entry: &AuditEntry) -> LedgerResult<()> {
        let mut state = self.state.lock().await;
        if let Some(reason) = &state.failed {
            return Err(LedgerError::Storage {
                reason: format!("audit log file unusable after an unrecovered write: {reason}"),
            });
        }
        if state.index.contains_key(&entry.id) {
            return Err(LedgerError::Storage {
                reason: format!("entry id '{}' already stored", entry.id),
            });
        }

        let json = serde_json::to_string(entry)
            .map_err(|e| LedgerError::storage(format!("failed to encode entry: {e}")))?;
        let mut line = json.into_bytes();
        let len = line.len();
        line.push(b'\n');

        let offset = state.end;
        if let Err(e) = write_line(&mut state.writer, &line).await {
            warn!(entry_id = %entry.id, error = %e, "append failed; truncating partial write");
            if let Err(truncate_err) = state.writer.set_len(offset).await {
                error!(
                    path = %self.path.display(),
                    error = %truncate_err,
                    "failed to truncate after failed append; refusing further writes"
                );
                state.failed = Some(format!(
                    "append failed ({e}) and truncation failed ({truncate_err})"
                ));
            }
            return Err(LedgerError::storage(format!(
                "failed to append to '{}': {e}",
                self.path.display()
            )));
        }

        state.end = offset + line.len() as u64;
        state.index.insert(entry.id.clone(), LineSpan { offset, len });
        state.last = Some(entry.clone());
        state.count += 1;

        debug!(entry_id = %entry.id, offset, "entry appended to audit log file");
        Ok(())
    }

    async fn get_last(&self) -> LedgerResult<Option<AuditEntry>> {
        Ok(self.state.lock().await.last.clone())
    }

    /// Stream the file line by line from the start.
    fn iterate(&self) -> EntryStream<'_> {
        stream::unfold(ReadCursor::Unopened(self.path.clone()), next_entry).boxed()
    }

    async fn count(&self) -> LedgerResult<u64> {
        Ok(self.state.lock().await.count)
    }

    async fn get_by_id(&self, id: &str) -> LedgerResult<Option<AuditEntry>> {
        let Some(span) = self.state.lock().await.index.get(id).copied() else {
            return Ok(None);
        };

        let mut file = File::open(&self.path)
            .await
            .map_err(|e| LedgerError::storage(format!("failed to open '{}': {e}", self.path.display())))?;
        file.seek(SeekFrom::Start(span.offset))
            .await
            .map_err(LedgerError::storage)?;
        let mut buf = vec![0u8; span.len];
        file.read_exact(&mut buf).await.map_err(LedgerError::storage)?;

        let line = String::from_utf8(buf).map_err(LedgerError::storage)?;
        decode_line(&line).map(Some)
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

async fn write_line(writer: &mut File, line: &[u8]) -> std::io::Result<()> {
    writer.write_all(line).await?;
    writer.flush().await?;
    writer.sync_data().await
}

fn decode_line(line: &str) -> LedgerResult<AuditEntry> {
    serde_json::from_str(line)
        .map_err(|e| LedgerError::storage(format!("undecodable audit log line: {e}")))
}

enum ReadCursor {
    Unopened(PathBuf),
    Reading(Lines<BufReader<File>>),
    Done,
}

async fn next_entry(cursor: ReadCursor) -> Option<(LedgerResult<AuditEntry>, ReadCursor)> {
    let mut lines = match cursor {
        ReadCursor::Unopened(path) => match File::open(&path).await {
            Ok(file) => BufReader::new(file).lines(),
            Err(e) => {
                let err = LedgerError::storage(format!("failed to open '{}': {e}", path.display()));
                return Some((Err(err), ReadCursor::Done));
            }
        },
        ReadCursor::Reading(lines) => lines,
        ReadCursor::Done => return None,
    };

    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => return Some((decode_line(&line), ReadCursor::Reading(lines))),
            Ok(None) => return None,
            Err(e) => return Some((Err(LedgerError::storage(e)), ReadCursor::Done)),
        }
    }
}
