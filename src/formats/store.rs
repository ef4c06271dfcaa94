//! Write-once record stores: the output file of a stage.
//!
//! A store is written to a hidden temporary file next to its final location and only renamed
//! into place by `commit()`. Readers therefore either see a complete store or none at all.
//! Dropping a `StoreWriter` without committing removes the temporary file.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{MRError, Result};

pub struct StoreWriter {
    path: PathBuf,
    tmp_path: PathBuf,
    file: Option<BufWriter<fs::File>>,
}

fn tmp_path_for(path: &Path) -> Result<PathBuf> {
    let name = path.file_name()
        .ok_or_else(|| MRError::Config(format!("not a file path: {}", path.display())))?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(name);
    tmp_name.push(".tmp");
    Ok(path.with_file_name(tmp_name))
}

impl StoreWriter {
    /// Opens a new store destined for `path`. An existing file at `path` is only replaced once
    /// the new store is committed.
    pub fn create(path: &Path) -> Result<StoreWriter> {
        let tmp_path = tmp_path_for(path)?;
        let f = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)
            .map_err(|e| MRError::Open {
                path: tmp_path.clone(),
                source: e,
            })?;
        Ok(StoreWriter {
            path: path.to_path_buf(),
            tmp_path: tmp_path,
            file: Some(BufWriter::new(f)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes the store and moves it to its final location.
    pub fn commit(mut self) -> Result<PathBuf> {
        if let Some(f) = self.file.take() {
            let f = f.into_inner().map_err(|e| e.into_error())?;
            f.sync_all()?;
        }
        if let Err(e) = fs::rename(&self.tmp_path, &self.path) {
            let _ = fs::remove_file(&self.tmp_path);
            return Err(e.into());
        }
        debug!("committed store {}", self.path.display());
        Ok(self.path.clone())
    }

    fn writer(&mut self) -> io::Result<&mut BufWriter<fs::File>> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "store already committed"))
    }
}

impl Write for StoreWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer()?.write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        self.writer()?.flush()
    }
}

impl Drop for StoreWriter {
    fn drop(&mut self) {
        // Still holding the file means commit() never ran.
        if self.file.take().is_some() {
            if let Err(e) = fs::remove_file(&self.tmp_path) {
                warn!("could not remove aborted store {}: {}", self.tmp_path.display(), e);
            }
        }
    }
}
