use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serde_json::Deserializer;
use tracing::{debug, info, instrument};

use super::{CatalogEngine, Insert};
use crate::movie::{Key, Movie};
use crate::{CatalogError, Result};

// the size threshold (in bytes) of stale entries that will trigger a log compaction
const COMPACTION_THRESHOLD: u64 = 1024 * 1024;

/// A log-structured catalog engine.
///
/// Every change to the catalog is appended as a JSON entry to a "command log" in the data
/// directory. Logs are named after their generation number (`1.log`, `2.log`, ...) and a new
/// generation is started every time the catalog is opened. An in-memory index maps each key
/// to the position of its latest entry.
///
/// Once the size of "stale" entries hits the compaction threshold, live entries are copied
/// into a new log and the older logs are deleted.
///
/// All clones share one log behind a mutex, which is held for exactly one engine call.
#[derive(Debug, Clone)]
pub struct LogCatalog {
    log: Arc<Mutex<MovieLog>>,
}

impl LogCatalog {
    /// Opens the catalog whose logs are kept in `dir`, replaying existing logs into the index.
    /// If `dir` does not exist it will be created.
    #[instrument]
    pub fn open(dir: &Path) -> Result<Self> {
        Self::open_with_threshold(dir, COMPACTION_THRESHOLD)
    }

    /// same as [`LogCatalog::open`], compacting once `threshold` bytes of entries are stale
    pub fn open_with_threshold(dir: &Path, threshold: u64) -> Result<Self> {
        let log = MovieLog::open(dir, threshold)?;
        Ok(LogCatalog {
            log: Arc::new(Mutex::new(log)),
        })
    }

    /// compacts the logs now, whatever the amount of stale data
    pub fn compact(&self) -> Result<()> {
        self.lock()?.compact()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MovieLog>> {
        self.log.lock().map_err(|_| CatalogError::LockPoisoned)
    }
}

impl CatalogEngine for LogCatalog {
    fn insert(&self, movie: Movie) -> Result<Insert> {
        let mut log = self.lock()?;
        if log.index.contains_key(&movie.key) {
            return Ok(Insert::Duplicate);
        }
        log.append(LogEntry::Put(movie))?;
        Ok(Insert::Inserted)
    }

    fn update_genre(&self, key: Key, genre: &str) -> Result<bool> {
        let mut log = self.lock()?;
        match log.read(key)? {
            Some(mut movie) => {
                movie.genre = genre.to_string();
                log.append(LogEntry::Put(movie))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(&self, key: Key) -> Result<bool> {
        let mut log = self.lock()?;
        if !log.index.contains_key(&key) {
            return Ok(false);
        }
        log.append(LogEntry::Remove { key })?;
        Ok(true)
    }

    fn get(&self, key: Key) -> Result<Option<Movie>> {
        self.lock()?.read(key)
    }

    fn list_all(&self) -> Result<Vec<Movie>> {
        let mut log = self.lock()?;
        let keys: Vec<Key> = log.index.keys().copied().collect();
        let mut movies = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(movie) = log.read(key)? {
                movies.push(movie);
            }
        }
        Ok(movies)
    }
}

/// The entries recorded in the logs
#[derive(Serialize, Deserialize, Debug)]
enum LogEntry {
    Put(Movie),
    Remove { key: Key },
}

impl LogEntry {
    fn key(&self) -> Key {
        match self {
            LogEntry::Put(movie) => movie.key,
            LogEntry::Remove { key } => *key,
        }
    }
}

#[derive(Debug)]
struct MovieLog {
    // directory containing the log files
    dir: PathBuf,

    // generation of the log that new entries are appended to
    current_gen: u64,

    // maps generation numbers to a reader over that log file
    readers: HashMap<u64, BufReaderWithPos<File>>,

    // writer of the current log
    writer: BufWriterWithPos<File>,

    // maps keys to the position of their latest `Put` entry
    index: BTreeMap<Key, EntryPos>,

    // bytes of entries that a compaction would drop
    stale: u64,

    threshold: u64,
}

impl MovieLog {
    fn open(dir: &Path, threshold: u64) -> Result<MovieLog> {
        fs::create_dir_all(dir)?;

        let gens = log_gens(dir)?;
        debug!(?gens);

        let mut readers = HashMap::new();
        let mut index = BTreeMap::new();
        let mut stale = 0_u64;

        for &gen in &gens {
            let mut reader = BufReaderWithPos::new(File::open(log_path(dir, gen))?)?;
            stale += replay(gen, &mut reader, &mut index)?;
            readers.insert(gen, reader);
        }

        let current_gen = gens.last().copied().unwrap_or(0) + 1;
        let writer = new_log_file(dir, current_gen, &mut readers)?;
        info!(movies = index.len(), current_gen, stale, "opened log catalog");

        Ok(MovieLog {
            dir: dir.to_path_buf(),
            current_gen,
            readers,
            writer,
            index,
            stale,
            threshold,
        })
    }

    /// appends `entry` to the current log and points the index at it
    fn append(&mut self, entry: LogEntry) -> Result<()> {
        let start = self.writer.pos;
        serde_json::to_writer(&mut self.writer, &entry)?;
        self.writer.flush()?;
        let end = self.writer.pos;

        let key = entry.key();
        let replaced = match entry {
            LogEntry::Put(_) => self.index.insert(key, (self.current_gen, start..end).into()),
            LogEntry::Remove { .. } => {
                // the remove entry itself is dropped by the next compaction
                self.stale += end - start;
                self.index.remove(&key)
            }
        };
        if let Some(old) = replaced {
            self.stale += old.len;
        }

        if self.stale > self.threshold {
            self.compact()?;
        }
        Ok(())
    }

    fn read(&mut self, key: Key) -> Result<Option<Movie>> {
        let pos = match self.index.get(&key) {
            Some(pos) => *pos,
            None => return Ok(None),
        };
        let reader = self
            .readers
            .get_mut(&pos.gen)
            .ok_or(CatalogError::CorruptLog { key, gen: pos.gen })?;
        reader.seek(SeekFrom::Start(pos.pos))?;
        match serde_json::from_reader(reader.take(pos.len))? {
            LogEntry::Put(movie) if movie.key == key => Ok(Some(movie)),
            _ => Err(CatalogError::CorruptLog { key, gen: pos.gen }),
        }
    }

    /// Copies live entries into a fresh log generation and deletes the older logs.
    fn compact(&mut self) -> Result<()> {
        // current_gen + 1 receives the compacted entries, current_gen + 2 new appends
        let compaction_gen = self.current_gen + 1;
        self.current_gen += 2;
        self.writer = new_log_file(&self.dir, self.current_gen, &mut self.readers)?;
        let mut compaction_writer = new_log_file(&self.dir, compaction_gen, &mut self.readers)?;

        let mut new_pos = 0;
        for pos in self.index.values_mut() {
            let reader = self
                .readers
                .get_mut(&pos.gen)
                .ok_or_else(|| CatalogError::StringErr(format!("missing reader for log {}", pos.gen)))?;
            if reader.pos != pos.pos {
                reader.seek(SeekFrom::Start(pos.pos))?;
            }
            let mut entry_reader = reader.take(pos.len);
            let len = io::copy(&mut entry_reader, &mut compaction_writer)?;
            *pos = (compaction_gen, new_pos..new_pos + len).into();
            new_pos += len;
        }
        compaction_writer.flush()?;

        let stale_gens: Vec<u64> = self
            .readers
            .keys()
            .filter(|&&gen| gen < compaction_gen)
            .copied()
            .collect();
        for gen in stale_gens {
            self.readers.remove(&gen);
            fs::remove_file(log_path(&self.dir, gen))?;
        }
        info!(compaction_gen, reclaimed = self.stale, "compacted catalog logs");
        self.stale = 0;
        Ok(())
    }
}

/// Replays the log read by `reader` into `index`.
/// Returns the number of bytes in that log that a compaction could drop.
fn replay(
    gen: u64,
    reader: &mut BufReaderWithPos<File>,
    index: &mut BTreeMap<Key, EntryPos>,
) -> Result<u64> {
    let mut pos = reader.seek(SeekFrom::Start(0))?;
    let mut stale = 0_u64;
    let mut stream = Deserializer::from_reader(reader).into_iter::<LogEntry>();

    while let Some(entry) = stream.next() {
        let end = stream.byte_offset() as u64;
        let len = end - pos;
        match entry? {
            LogEntry::Put(movie) => {
                if let Some(old) = index.insert(movie.key, EntryPos::new(gen, pos, len)) {
                    stale += old.len;
                }
            }
            LogEntry::Remove { key } => {
                if let Some(old) = index.remove(&key) {
                    stale += old.len;
                }
                stale += len;
            }
        }
        pos = end;
    }
    Ok(stale)
}

fn log_path(dir: &Path, gen: u64) -> PathBuf {
    dir.join(format!("{}.log", gen))
}

/// Creates the log file for `gen` and registers a reader for it.
/// Returns a writer appending to the new log.
fn new_log_file(
    dir: &Path,
    gen: u64,
    readers: &mut HashMap<u64, BufReaderWithPos<File>>,
) -> Result<BufWriterWithPos<File>> {
    let path = log_path(dir, gen);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    let len = file.metadata()?.len();
    let writer = BufWriterWithPos::new(file, len);
    readers.insert(gen, BufReaderWithPos::new(File::open(&path)?)?);
    Ok(writer)
}

/// The generation numbers of the `.log` files in `dir`, ascending.
/// Files whose stem is not an integer are not logs of this engine and are skipped.
fn log_gens(dir: &Path) -> Result<Vec<u64>> {
    let mut gens: Vec<u64> = fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().map_or(false, |ext| ext == "log"))
        .filter_map(|path| {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<u64>().ok())
        })
        .collect();
    gens.sort_unstable();
    Ok(gens)
}

/// Where an entry sits within the logs
#[derive(Debug, Copy, Clone)]
struct EntryPos {
    gen: u64,
    pos: u64,
    len: u64,
}

impl EntryPos {
    fn new(gen: u64, pos: u64, len: u64) -> Self {
        EntryPos { gen, pos, len }
    }
}

impl From<(u64, Range<u64>)> for EntryPos {
    fn from((gen, range): (u64, Range<u64>)) -> Self {
        EntryPos::new(gen, range.start, range.end - range.start)
    }
}

/// a buffered reader that tracks its seek position
#[derive(Debug)]
struct BufReaderWithPos<R: Read + Seek> {
    reader: BufReader<R>,
    pos: u64,
}

impl<R: Read + Seek> BufReaderWithPos<R> {
    fn new(mut inner: R) -> Result<Self> {
        let pos = inner.seek(SeekFrom::Current(0))?;
        Ok(BufReaderWithPos {
            reader: BufReader::new(inner),
            pos,
        })
    }
}

impl<R: Read + Seek> Read for BufReaderWithPos<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = self.reader.read(buf)?;
        self.pos += len as u64;
        Ok(len)
    }
}

impl<R: Read + Seek> Seek for BufReaderWithPos<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.pos = self.reader.seek(pos)?;
        Ok(self.pos)
    }
}

/// a buffered writer appending to a log, tracking the offset the next byte lands at
#[derive(Debug)]
struct BufWriterWithPos<W: Write> {
    writer: BufWriter<W>,
    pos: u64,
}

impl<W: Write> BufWriterWithPos<W> {
    /// `pos` is the length of the log `inner` appends to
    fn new(inner: W, pos: u64) -> Self {
        BufWriterWithPos {
            writer: BufWriter::new(inner),
            pos,
        }
    }
}

impl<W: Write> Write for BufWriterWithPos<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let len = self.writer.write(buf)?;
        self.pos += len as u64;
        Ok(len)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
