//! Module that uses text files as input to the mapper phase.
//! This module implements only an iterator yielding single lines;
//! using the iterators from formats::util, the necessary key/value
//! iterator can be implemented.

use std::fs;
use std::io;
use std::io::{BufRead, Read};
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{MRError, Result};

type LinesIterator<Src> = io::Lines<io::BufReader<Src>>;

/// Lines of a file or a directory, whichever `new_from_path()` found.
pub type LineSource = Box<dyn Iterator<Item = io::Result<String>> + Send>;

pub struct LinesReader<Src: Read> {
    src: LinesIterator<Src>,
}

impl<Src: Read> LinesReader<Src> {
    pub fn new(src: Src) -> LinesReader<Src> {
        LinesReader { src: io::BufReader::new(src).lines() }
    }
}

/// Returns a LinesReader reading from the given file.
pub fn new_from_file(path: &Path) -> Result<LinesReader<fs::File>> {
    fs::OpenOptions::new()
        .read(true)
        .open(path)
        .map(LinesReader::new)
        .map_err(|e| open_error(path, e))
}

/// Returns a LinesReader reading from all regular files in the given directory, in name order.
/// Files whose names start with '.' or '_' (markers, hidden and temporary files) are skipped.
/// (This needs to use dynamic dispatch internally, because otherwise
/// the type would need to represent the number of files that are used; the overhead however
/// is low compared to disk accesses).
pub fn new_from_dir(path: &Path) -> Result<LinesReader<Box<dyn Read + Send>>> {
    let mut names: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(path).map_err(|e| open_error(path, e))? {
        let entry = entry.map_err(|e| open_error(path, e))?;
        let hidden = entry.file_name().to_string_lossy().starts_with(['.', '_']);
        if !hidden && entry.file_type()?.is_file() {
            names.push(entry.path());
        }
    }
    names.sort();

    let mut reader: Box<dyn Read + Send> = Box::new(io::empty());
    for name in names {
        let f = fs::File::open(&name).map_err(|e| open_error(&name, e))?;
        debug!("reading input file {}", name.display());
        reader = Box::new(reader.chain(EnsureNewline::new(f)));
    }
    Ok(LinesReader::new(reader))
}

/// Reads a single file or all files of a directory, see `new_from_dir()`.
pub fn new_from_path(path: &Path) -> Result<LineSource> {
    if path.is_dir() {
        Ok(Box::new(new_from_dir(path)?))
    } else {
        Ok(Box::new(new_from_file(path)?))
    }
}

fn open_error(path: &Path, e: io::Error) -> MRError {
    MRError::Open {
        path: path.to_path_buf(),
        source: e,
    }
}

/// Iterate over the lines from a LinesReader.
impl<Src: Read> Iterator for LinesReader<Src> {
    type Item = io::Result<String>;
    fn next(&mut self) -> Option<Self::Item> {
        self.src.next()
    }
}

/// Appends a '\n' to a source that does not end in one, so that the last line of one file
/// is not glued to the first line of the next file.
struct EnsureNewline<R: Read> {
    inner: R,
    last: Option<u8>,
    done: bool,
}

impl<R: Read> EnsureNewline<R> {
    fn new(inner: R) -> EnsureNewline<R> {
        EnsureNewline {
            inner: inner,
            last: None,
            done: false,
        }
    }
}

impl<R: Read> Read for EnsureNewline<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.done || buf.is_empty() {
            return Ok(0);
        }
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.last = Some(buf[n - 1]);
            return Ok(n);
        }
        self.done = true;
        match self.last {
            Some(b) if b != b'\n' => {
                buf[0] = b'\n';
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}
