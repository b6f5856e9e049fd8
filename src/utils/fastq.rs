use std::io::{self, BufRead, Write};
use std::path::Path;
use crate::config::defs::PipelineError;
use crate::utils::file::{open_reader, FileReader};


/// One four-line read. Lines are kept as raw bytes with surrounding
/// whitespace removed; neither the `@` marker nor the `+` line is checked.
#[derive(Debug, Clone, PartialEq)]
pub struct FastqRecord {
    pub identifier: Vec<u8>,
    pub sequence: Vec<u8>,
    pub separator: Vec<u8>,
    pub quality: Vec<u8>,
}

impl FastqRecord {
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for line in [&self.identifier, &self.sequence, &self.separator, &self.quality] {
            writer.write_all(line)?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }
}


/// Lazy record iterator reading exactly four lines per record.
///
/// Iteration ends at end of input or at an empty identifier line. A trailing
/// group of one to three lines yields a single `MalformedRecord` error, after
/// which the iterator is exhausted.
pub struct FastqRecords<R: BufRead> {
    reader: R,
    line_number: usize,
    buf: Vec<u8>,
    done: bool,
}

impl<R: BufRead> FastqRecords<R> {
    pub fn new(reader: R) -> Self {
        FastqRecords {
            reader,
            line_number: 0,
            buf: Vec::new(),
            done: false,
        }
    }

    /// Next line with whitespace trimmed, or None at end of input.
    fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        self.buf.clear();
        let n = self.reader.read_until(b'\n', &mut self.buf)?;
        if n == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        Ok(Some(self.buf.trim_ascii().to_vec()))
    }

    fn read_record(&mut self) -> Result<Option<FastqRecord>, PipelineError> {
        let identifier = match self.next_line()? {
            Some(line) if !line.is_empty() => line,
            _ => return Ok(None),
        };
        let start = self.line_number;

        let mut rest: [Vec<u8>; 3] = Default::default();
        for (read, slot) in rest.iter_mut().enumerate() {
            match self.next_line()? {
                Some(line) => *slot = line,
                None => {
                    return Err(PipelineError::MalformedRecord {
                        line: start,
                        lines_read: read + 1,
                    });
                }
            }
        }
        let [sequence, separator, quality] = rest;

        Ok(Some(FastqRecord {
            identifier,
            sequence,
            separator,
            quality,
        }))
    }
}

impl<R: BufRead> Iterator for FastqRecords<R> {
    type Item = Result<FastqRecord, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Opens a sequence file (plain or gzipped) as a record iterator.
pub fn fastq_records(path: &Path) -> Result<FastqRecords<io::BufReader<FileReader>>, PipelineError> {
    Ok(FastqRecords::new(open_reader(path)?))
}
