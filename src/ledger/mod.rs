use std::{
    fs::{self, File, OpenOptions},
    io::{BufRead, BufReader, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};

use crate::{declare::PriceRecord, logging};

/// The append-only price-db file.
///
/// The file is opened once (create if absent, read + append) and stays open until the
/// value is dropped, whichever way the run ends.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    file: File,
}

impl Ledger {
    /// Opens `file_name` inside `dir`, creating the directory and the file as needed.
    pub fn open(dir: &Path, file_name: &str) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|why| {
            anyhow!(
                "Failed to create the directory {} because {:?}",
                dir.display(),
                why
            )
        })?;

        let path = dir.join(file_name);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|why| anyhow!("Failed to open {} because {:?}", path.display(), why))?;

        Ok(Ledger { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The last record in the file, or the all-empty record when there is none.
    pub fn last_record(&mut self) -> Result<PriceRecord> {
        self.file
            .seek(SeekFrom::Start(0))
            .map_err(|why| anyhow!("Failed to seek {} because {:?}", self.path.display(), why))?;

        read_last_record(BufReader::new(&self.file))
            .map_err(|why| anyhow!("Failed to read {} because {:?}", self.path.display(), why))
    }

    /// Appends the record as one line.
    pub fn append(&mut self, record: &PriceRecord) -> Result<()> {
        writeln!(self.file, "{}", record.encode())
            .and_then(|_| self.file.flush())
            .and_then(|_| self.file.sync_data())
            .map_err(|why| {
                anyhow!(
                    "Failed to append to {} because {:?}",
                    self.path.display(),
                    why
                )
            })
    }
}

/// Scans every line and decodes the last non-empty one.
///
/// Earlier lines are only split, never decoded, so stray bytes in the history do not
/// matter. A last line that does not have the expected
/// shape decodes to the all-empty record, the same as an empty ledger; that case is
/// logged so the operator can tell the two apart.
pub fn read_last_record<R: BufRead>(reader: R) -> Result<PriceRecord> {
    let mut last = Vec::new();

    for line in reader.split(b'\n') {
        let mut line = line?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if !line.is_empty() {
            last = line;
        }
    }

    // 只有最後一行需要是合法的 UTF-8
    let last = String::from_utf8(last)
        .map_err(|why| anyhow!("The last price-db line is not valid UTF-8 because {:?}", why))?;

    let record = PriceRecord::decode(&last);
    if !last.is_empty() && record.is_sentinel() {
        logging::warn_file_async(format!(
            "The last price-db line {:?} is malformed, treating the price as unknown",
            last
        ));
    }

    Ok(record)
}
