//! Transparent gzip handling for annotation and sequence inputs.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

use crate::error::Error;

/// Gzip files start with the magic bytes 0x1f 0x8b.
pub fn is_gzip(path: &Path) -> Result<bool, Error> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 2];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == [0x1f, 0x8b]),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Open a text file for buffered reading, decompressing gzip input.
pub fn open_text(path: &Path) -> Result<Box<dyn BufRead>, Error> {
    let gz = is_gzip(path)?;
    let file = File::open(path)?;
    if gz {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Write a gzip-compressed copy of `src` to `dst`.
pub fn gzip_copy(src: &Path, dst: &Path) -> Result<(), Error> {
    let mut reader = BufReader::new(File::open(src)?);
    let mut encoder = GzEncoder::new(BufWriter::new(File::create(dst)?), Compression::default());
    io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?.flush()?;
    Ok(())
}
