use std::io::{self, Write};

/// Destination for bytes produced by `Write` instructions.
///
/// In line-buffered mode bytes collect in memory until a newline arrives or
/// [`OutputSink::flush`] is called.
#[derive(Debug)]
pub struct OutputSink<W> {
    writer: W,
    buffer: Vec<u8>,
}

impl<W: Write> OutputSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buffer: vec![],
        }
    }

    pub fn write_unbuffered(&mut self, byte: u8) -> io::Result<()> {
        self.writer.write_all(&[byte])?;
        self.writer.flush()
    }

    pub fn write_line_buffered(&mut self, byte: u8) -> io::Result<()> {
        self.buffer.push(byte);
        if byte == b'\n' {
            self.flush()?;
        }
        Ok(())
    }

    /// Bytes waiting for a newline.
    #[cfg(test)]
    fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Writes out anything pending. Does nothing when the buffer is empty.
    pub fn flush(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let result = self.writer.write_all(&self.buffer);
        self.buffer.clear();
        result?;
        self.writer.flush()
    }

    pub fn discard(&mut self) {
        self.buffer.clear();
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(mut self) -> io::Result<W> {
        self.flush()?;
        Ok(self.writer)
    }
}

#[test]
fn test_line_buffering() -> anyhow::Result<()> {
    let mut sink = OutputSink::new(vec![]);
    sink.write_line_buffered(b'h')?;
    sink.write_line_buffered(b'i')?;
    assert!(sink.get_ref().is_empty());
    sink.write_line_buffered(b'\n')?;
    assert_eq!(sink.get_ref(), b"hi\n");
    assert!(sink.pending().is_empty());
    sink.write_line_buffered(b'!')?;
    assert_eq!(sink.into_inner()?, b"hi\n!");
    Ok(())
}

#[test]
fn test_unbuffered() -> anyhow::Result<()> {
    let mut sink = OutputSink::new(vec![]);
    sink.write_unbuffered(b'a')?;
    assert_eq!(sink.get_ref(), b"a");
    Ok(())
}

#[test]
fn test_flush_twice_writes_once() -> anyhow::Result<()> {
    let mut sink = OutputSink::new(vec![]);
    sink.write_line_buffered(b'x')?;
    sink.flush()?;
    sink.flush()?;
    assert_eq!(sink.get_ref(), b"x");
    Ok(())
}
