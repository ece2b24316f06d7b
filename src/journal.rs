use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::model::Event;

/// Bytes of framing around each payload: length prefix + CRC.
const FRAME_OVERHEAD: u64 = 8;

/// Returns the number of bytes written.
fn encode_record(writer: &mut impl Write, event: &Event) -> io::Result<u64> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = payload.len() as u32;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc32fast::hash(&payload).to_le_bytes())?;
    Ok(FRAME_OVERHEAD + u64::from(len))
}

/// Result of reading a journal from disk.
#[derive(Debug, Default)]
pub struct Replay {
    pub events: Vec<Event>,
    /// Byte offset just past the last intact record.
    pub valid_len: u64,
    /// True if bytes after `valid_len` were ignored.
    pub torn_tail: bool,
}

/// Append-only store journal.
///
/// Record format: `[u32 len][bincode Event][u32 crc32]`, little endian. A
/// record cut short by a crash, or whose CRC does not match, ends the replay;
/// `open` truncates the file back to the last intact record so new appends
/// stay readable. [`Journal::rollback`] cuts back to the last commit.
pub struct Journal {
    writer: BufWriter<File>,
    path: PathBuf,
    /// File length as of the last successful commit.
    committed_len: u64,
    /// Bytes appended since then.
    pending: u64,
}

impl Journal {
    /// Replay `path` (if it exists) and open it for appending.
    pub fn open(path: &Path) -> io::Result<(Self, Vec<Event>)> {
        let replay = Self::read_all(path)?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        if replay.torn_tail {
            tracing::warn!(
                "journal {}: discarding torn tail after {} bytes",
                path.display(),
                replay.valid_len
            );
            file.set_len(replay.valid_len)?;
        }
        let journal = Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            committed_len: replay.valid_len,
            pending: 0,
        };
        Ok((journal, replay.events))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Buffer one record. Nothing is durable until [`Journal::commit`].
    pub fn append_buffered(&mut self, event: &Event) -> io::Result<()> {
        self.pending += encode_record(&mut self.writer, event)?;
        Ok(())
    }

    pub fn commit(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.committed_len += self.pending;
        self.pending = 0;
        Ok(())
    }

    /// Drop everything appended since the last commit, buffered or already
    /// flushed, and truncate the file back to the committed length.
    pub fn rollback(&mut self) -> io::Result<()> {
        let file = self.writer.get_ref().try_clone()?;
        let stale = std::mem::replace(&mut self.writer, BufWriter::new(file));
        let (_, discarded) = stale.into_parts();
        let discarded = discarded.map_or(0, |buf| buf.len());
        let file = self.writer.get_ref();
        file.set_len(self.committed_len)?;
        file.sync_data()?;
        tracing::warn!(
            "journal {}: rolled back {} uncommitted bytes ({discarded} never written)",
            self.path.display(),
            self.pending
        );
        self.pending = 0;
        Ok(())
    }

    pub fn read_all(path: &Path) -> io::Result<Replay> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Replay::default()),
            Err(e) => return Err(e),
        };
        let total_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);
        let mut replay = Replay::default();

        loop {
            let mut len_buf = [0u8; 4];
            match reader.read_exact(&mut len_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }
            let len = u32::from_le_bytes(len_buf) as u64;
            if replay.valid_len + FRAME_OVERHEAD + len > total_len {
                break;
            }

            let mut payload = vec![0u8; len as usize];
            reader.read_exact(&mut payload)?;
            let mut crc_buf = [0u8; 4];
            reader.read_exact(&mut crc_buf)?;
            if u32::from_le_bytes(crc_buf) != crc32fast::hash(&payload) {
                break;
            }
            match bincode::deserialize::<Event>(&payload) {
                Ok(event) => replay.events.push(event),
                Err(_) => break,
            }
            replay.valid_len += FRAME_OVERHEAD + len;
        }

        replay.torn_tail = replay.valid_len < total_len;
        Ok(replay)
    }
}
