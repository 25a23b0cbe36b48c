//! Line-prefixing writer.

use std::io::{self, Write};

/// Writes `prefix` at the start of every line passed through to `inner`.
///
/// A line split across several writes is prefixed once.
#[derive(Debug)]
pub struct PrefixWriter<W> {
    inner: W,
    prefix: Vec<u8>,
    at_line_start: bool,
}

impl<W: Write> PrefixWriter<W> {
    /// Wraps `inner`.
    pub fn new(prefix: impl Into<Vec<u8>>, inner: W) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
            at_line_start: true,
        }
    }

    /// Wraps `inner` with a single tab.
    pub fn tab(inner: W) -> Self {
        Self::new(&b"\t"[..], inner)
    }

    /// Unwraps the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for PrefixWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        for line in buf.split_inclusive(|&b| b == b'\n') {
            if self.at_line_start {
                self.inner.write_all(&self.prefix)?;
            }
            self.inner.write_all(line)?;
            self.at_line_start = line.ends_with(b"\n");
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefixed(writes: &[&str]) -> String {
        let mut w = PrefixWriter::tab(Vec::new());
        for s in writes {
            w.write_all(s.as_bytes()).unwrap();
        }
        String::from_utf8(w.into_inner()).unwrap()
    }

    #[test]
    fn test_single_line() {
        assert_eq!(prefixed(&["hello\n"]), "\thello\n");
    }

    #[test]
    fn test_multiple_lines_in_one_write() {
        assert_eq!(prefixed(&["a\nb\nc"]), "\ta\n\tb\n\tc");
    }

    #[test]
    fn test_line_split_across_writes() {
        assert_eq!(prefixed(&["par", "tial\n", "next\n"]), "\tpartial\n\tnext\n");
    }

    #[test]
    fn test_no_prefix_after_trailing_newline() {
        assert_eq!(prefixed(&["done\n"]), "\tdone\n");
        assert_eq!(prefixed(&["\n\n"]), "\t\n\t\n");
    }

    #[test]
    fn test_empty_write() {
        assert_eq!(prefixed(&[""]), "");
    }
}
