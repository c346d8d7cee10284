// src/core/pipeline/seqio.rs

//! Hand-rolled, streaming FASTA/FASTQ reader with transparent gzip support.
//!
//! No corpus example parses FASTA directly, so the byte-by-byte streaming
//! style here is borrowed in spirit from
//! `spineldb::core::protocol::resp_frame` (hand-parse a wire format line by
//! line rather than pulling in a combinator library). Gzip transparency
//! uses `flate2::read::GzDecoder` the same "wrap the reader" way
//! `libretto-archive` unwraps a `.tar.gz` stream.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::core::errors::{AntError, AntResult};

#[derive(Debug, Clone)]
pub struct SeqRecord {
    pub name: String,
    pub sequence: Vec<u8>,
}

enum Format {
    Fasta,
    Fastq,
}

/// A single-pass reader over one FASTA or FASTQ file, transparently
/// gunzipped if its name ends in `.gz`. Format is auto-detected from the
/// first byte ('>' or '@').
pub struct SeqReader {
    reader: Box<dyn BufRead>,
    format: Format,
    pending_header: Option<String>,
}

impl SeqReader {
    pub fn open(path: &Path) -> AntResult<Self> {
        let file = File::open(path)?;
        let is_gz = path.extension().and_then(|e| e.to_str()) == Some("gz");
        let raw: Box<dyn Read> = if is_gz {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        let mut reader: Box<dyn BufRead> = Box::new(BufReader::new(raw));

        let format = {
            let buf = reader.fill_buf()?;
            match buf.first() {
                Some(b'>') => Format::Fasta,
                Some(b'@') => Format::Fastq,
                Some(other) => {
                    return Err(AntError::SequenceDecodeError(format!(
                        "{}: unrecognised record start byte {other:#x}",
                        path.display()
                    )));
                }
                None => {
                    return Err(AntError::SequenceDecodeError(format!(
                        "{}: empty sequence file",
                        path.display()
                    )));
                }
            }
        };

        Ok(Self {
            reader,
            format,
            pending_header: None,
        })
    }

    fn read_line_trimmed(&mut self) -> AntResult<Option<String>> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line)?;
        if n == 0 {
            return Ok(None);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }

    /// Reads the next record, or `Ok(None)` at end of file.
    pub fn next_record(&mut self) -> AntResult<Option<SeqRecord>> {
        match self.format {
            Format::Fasta => self.next_fasta(),
            Format::Fastq => self.next_fastq(),
        }
    }

    fn next_fasta(&mut self) -> AntResult<Option<SeqRecord>> {
        let header = match self.pending_header.take() {
            Some(h) => h,
            None => match self.read_line_trimmed()? {
                Some(h) => h,
                None => return Ok(None),
            },
        };
        if !header.starts_with('>') {
            return Err(AntError::SequenceDecodeError(format!(
                "expected FASTA header, got {header:?}"
            )));
        }
        let name = header[1..]
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string();

        let mut sequence = Vec::new();
        loop {
            match self.read_line_trimmed()? {
                Some(line) if line.starts_with('>') => {
                    self.pending_header = Some(line);
                    break;
                }
                Some(line) => sequence.extend(line.bytes()),
                None => break,
            }
        }
        Ok(Some(SeqRecord { name, sequence }))
    }

    fn next_fastq(&mut self) -> AntResult<Option<SeqRecord>> {
        let header = match self.read_line_trimmed()? {
            Some(h) => h,
            None => return Ok(None),
        };
        if !header.starts_with('@') {
            return Err(AntError::SequenceDecodeError(format!(
                "expected FASTQ header, got {header:?}"
            )));
        }
        let name = header[1..]
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string();

        let sequence = self
            .read_line_trimmed()?
            .ok_or_else(|| {
                AntError::SequenceDecodeError("truncated FASTQ record: missing sequence line".into())
            })?
            .into_bytes();

        let plus = self.read_line_trimmed()?.ok_or_else(|| {
            AntError::SequenceDecodeError("truncated FASTQ record: missing '+' line".into())
        })?;
        if !plus.starts_with('+') {
            return Err(AntError::SequenceDecodeError(format!(
                "expected FASTQ '+' separator, got {plus:?}"
            )));
        }

        let _quality = self.read_line_trimmed()?.ok_or_else(|| {
            AntError::SequenceDecodeError("truncated FASTQ record: missing quality line".into())
        })?;

        Ok(Some(SeqRecord { name, sequence }))
    }
}

impl Iterator for SeqReader {
    type Item = AntResult<SeqRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
