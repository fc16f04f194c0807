use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use rkyv::{AlignedVec, Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use rkyv::Deserialize;

use crate::error::{CatalogError, CatalogResult};
use crate::model::Ship;

// Frames larger than this are treated as corruption rather than allocated.
const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// One mutation in the catalog log.
#[derive(Archive, RkyvDeserialize, RkyvSerialize, Debug, Clone, PartialEq)]
#[archive(check_bytes)]
pub enum LogEntry {
    Put(Ship),
    Remove(u64),
    /// Ids up to and including this value have been handed out. Written first
    /// by compaction so removed ids are never reissued.
    IdFloor(u64),
}

// Length prefix in front of every frame.
const FRAME_HEADER_LEN: u64 = 4;

/// Append-only log file. Frame format: [Length u32 LE][rkyv bytes].
#[derive(Debug)]
pub struct Segment {
    pub file_path: PathBuf,
    file: File,
    strict: bool,
    current_offset: u64,
    sealed: bool,
}

/// Result of replaying a segment from the start.
#[derive(Debug)]
pub struct Replay {
    pub entries: Vec<LogEntry>,
    /// End of the last complete frame. Anything past it is a torn tail.
    pub valid_end: u64,
}

impl Segment {
    /// Opens (or creates) the segment at `path`. With `strict`, every append is
    /// fsynced before it is acknowledged.
    pub fn new(path: &Path, strict: bool) -> io::Result<Self> {
        let file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)?;

        let current_offset = file.metadata()?.len();

        Ok(Self {
            file_path: path.to_path_buf(),
           file,
           strict,
           current_offset,
           sealed: false,
        })
    }

    pub fn len(&self) -> u64 {
        self.current_offset
    }

    pub fn is_empty(&self) -> bool {
        self.current_offset == 0
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Refuses every later append. Used when the file behind this handle can
    /// no longer be trusted to be the live segment.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Cuts the file back to `len` bytes so later appends follow the last good frame.
    pub fn truncate(&mut self, len: u64) -> CatalogResult<()> {
        self.file.set_len(len)?;
        self.file.sync_all()?;
        self.current_offset = len;
        Ok(())
    }

    pub fn append(&mut self, entry: &LogEntry) -> CatalogResult<u64> {
        if self.sealed {
            return Err(CatalogError::SegmentSealed(self.file_path.display().to_string()));
        }

        let bytes = rkyv::to_bytes::<_, 1024>(entry)
        .map_err(|e| CatalogError::Corrupt(e.to_string()))?;

        let start = self.current_offset;

        let mut frame = Vec::with_capacity(FRAME_HEADER_LEN as usize + bytes.len());
        frame.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        frame.extend_from_slice(&bytes);
        self.file.write_all(&frame)?;

        if self.strict {
            self.file.sync_data()?;
        }

        self.current_offset += frame.len() as u64;
        Ok(start)
    }

    #[cfg(test)]
    fn read(&self, offset: u64) -> CatalogResult<LogEntry> {
        let mut file = self.file.try_clone()?;
        file.seek(SeekFrom::Start(offset))?;
        read_frame(&mut file)?
        .map(|(entry, _)| entry)
        .ok_or_else(|| CatalogError::Corrupt(format!("no entry at offset {}", offset)))
    }

    /// Every entry in file order. A torn final frame (crash mid-append) ends the
    /// scan; `valid_end` tells the caller where the good frames stop.
    pub fn scan(&self) -> CatalogResult<Replay> {
        let mut file = self.file.try_clone()?;
        file.seek(SeekFrom::Start(0))?;
        let mut reader = BufReader::new(file);

        let mut entries = Vec::new();
        let mut valid_end = 0;
        loop {
            match read_frame(&mut reader) {
                Ok(Some((entry, frame_len))) => {
                    entries.push(entry);
                    valid_end += frame_len;
                }
                Ok(None) => break,
                Err(CatalogError::Storage(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                    tracing::warn!(
                        path = %self.file_path.display(),
                        recovered = entries.len(),
                        valid_end,
                        "Truncated frame at end of segment"
                    );
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(Replay { entries, valid_end })
    }

    pub fn sync(&self) -> io::Result<()> {
        self.file.sync_all()
    }
}

/// The entry and its on-disk size, or `Ok(None)` on a clean end of file.
fn read_frame<R: Read>(reader: &mut R) -> CatalogResult<Option<(LogEntry, u64)>> {
    let mut len_buf = [0u8; 4];
    match reader.read(&mut len_buf[..1])? {
        0 => return Ok(None),
        _ => reader.read_exact(&mut len_buf[1..])?,
    }
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(CatalogError::Corrupt(format!("frame length {} exceeds limit", len)));
    }

    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;

    let mut aligned = AlignedVec::with_capacity(len);
    aligned.extend_from_slice(&bytes);

    let archived = rkyv::check_archived_root::<LogEntry>(&aligned)
    .map_err(|e| CatalogError::Corrupt(e.to_string()))?;
    let entry: LogEntry = archived
    .deserialize(&mut rkyv::Infallible)
    .map_err(|_| CatalogError::Corrupt("undecodable log entry".into()))?;

    Ok(Some((entry, FRAME_HEADER_LEN + len as u64)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ShipType;
    use tempfile::TempDir;

    fn ship(id: u64) -> Ship {
        Ship {
            id,
            name: format!("Ship-{}", id),
            planet: "Kepler".into(),
            ship_type: ShipType::Merchant,
            prod_date: 1_000,
            is_used: true,
            speed: 0.25,
            crew_size: 40,
            rating: 1.5,
        }
    }

    #[test]
    fn test_append_then_read_at_offset() {
        let dir = TempDir::new().unwrap();
        let mut seg = Segment::new(&dir.path().join("log.dat"), false).unwrap();

        let first = seg.append(&LogEntry::Put(ship(1))).unwrap();
        let second = seg.append(&LogEntry::Remove(1)).unwrap();

        assert_eq!(first, 0);
        assert!(second > first);
        assert_eq!(seg.read(first).unwrap(), LogEntry::Put(ship(1)));
        assert_eq!(seg.read(second).unwrap(), LogEntry::Remove(1));
    }

    #[test]
    fn test_scan_after_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.dat");
        {
            let mut seg = Segment::new(&path, true).unwrap();
            seg.append(&LogEntry::Put(ship(1))).unwrap();
            seg.append(&LogEntry::Put(ship(2))).unwrap();
            seg.append(&LogEntry::Remove(1)).unwrap();
        }
        let seg = Segment::new(&path, true).unwrap();
        let replay = seg.scan().unwrap();
        assert_eq!(
            replay.entries,
            vec![LogEntry::Put(ship(1)), LogEntry::Put(ship(2)), LogEntry::Remove(1)]
        );
        assert_eq!(replay.valid_end, seg.len());
    }

    #[test]
    fn test_torn_tail_is_dropped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.dat");
        {
            let mut seg = Segment::new(&path, false).unwrap();
            seg.append(&LogEntry::Put(ship(1))).unwrap();
        }
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&200u32.to_le_bytes()).unwrap();
            f.write_all(&[1, 2, 3]).unwrap();
        }
        let mut seg = Segment::new(&path, false).unwrap();
        let replay = seg.scan().unwrap();
        assert_eq!(replay.entries, vec![LogEntry::Put(ship(1))]);
        assert_eq!(replay.valid_end + 7, seg.len());

        seg.truncate(replay.valid_end).unwrap();
        let next = seg.append(&LogEntry::Put(ship(2))).unwrap();
        assert_eq!(next, replay.valid_end);

        let seg = Segment::new(&path, false).unwrap();
        assert_eq!(
            seg.scan().unwrap().entries,
            vec![LogEntry::Put(ship(1)), LogEntry::Put(ship(2))]
        );
    }

    #[test]
    fn test_sealed_segment_refuses_appends() {
        let dir = TempDir::new().unwrap();
        let mut seg = Segment::new(&dir.path().join("log.dat"), false).unwrap();
        seg.append(&LogEntry::Put(ship(1))).unwrap();

        seg.seal();
        assert!(seg.is_sealed());
        assert!(matches!(
            seg.append(&LogEntry::Remove(1)),
            Err(CatalogError::SegmentSealed(_))
        ));
        assert_eq!(seg.scan().unwrap().entries.len(), 1);
    }
}
