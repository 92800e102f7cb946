//! Stdin/stdout and file plumbing for the NDJSON front-end.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};

/// Opens `path` for buffered reading, or stdin when `path` is `"-"`.
pub fn open_input(path: &str) -> io::Result<Box<dyn BufRead>> {
    if path == "-" {
        Ok(Box::new(BufReader::new(io::stdin())))
    } else {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}

/// Opens `path` for buffered writing, or stdout when `path` is absent or `"-"`.
pub fn open_output(path: Option<&str>) -> io::Result<Box<dyn Write>> {
    match path {
        None | Some("-") => Ok(Box::new(BufWriter::new(io::stdout()))),
        Some(path) => Ok(Box::new(BufWriter::new(File::create(path)?))),
    }
}
