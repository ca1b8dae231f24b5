//! Minimal TAP version 13 producer.

use serde::Serialize;
use std::io::{self, Write};

/// Streams TAP lines to a writer, numbering test points as they are emitted
pub struct TapWriter<W: Write> {
    out: W,
    count: usize,
}

impl<W: Write> TapWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, count: 0 }
    }

    pub fn header(&mut self) -> io::Result<()> {
        writeln!(self.out, "TAP version 13")
    }

    /// Emit `ok`/`not ok` for the next test point
    pub fn ok(&mut self, passed: bool, description: &str) -> io::Result<()> {
        self.count += 1;
        let status = if passed { "ok" } else { "not ok" };
        writeln!(self.out, "{} {} - {}", status, self.count, description)
    }

    /// Emit `count` skipped test points
    pub fn skip(&mut self, count: usize, reason: &str) -> io::Result<()> {
        for _ in 0..count {
            self.count += 1;
            writeln!(self.out, "ok {} # SKIP {}", self.count, reason)?;
        }
        Ok(())
    }

    /// Emit a YAML diagnostic block attached to the previous test point
    pub fn yaml<T: Serialize>(&mut self, diagnostic: &T) -> io::Result<()> {
        let body = serde_yaml::to_string(diagnostic)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(self.out, "  ---")?;
        for line in body.lines().filter(|l| *l != "---") {
            writeln!(self.out, "  {}", line)?;
        }
        writeln!(self.out, "  ...")
    }

    /// Plan line covering every test point emitted so far
    pub fn auto_plan(&mut self) -> io::Result<()> {
        writeln!(self.out, "1..{}", self.count)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
