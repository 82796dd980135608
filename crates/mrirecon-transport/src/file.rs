use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{read_exact_from, write_all_to, Transport};

type Reader = Box<dyn Read + Send>;
type Writer = Box<dyn Write + Send>;

/// File and pipe binding with independent input and output ends.
///
/// Either end may be absent. Reading from a transport without an input end,
/// or writing to one without an output end, fails with
/// [`TransportError::NotOpen`].
pub struct FileTransport {
    input: Option<Reader>,
    output: Option<Writer>,
}

impl FileTransport {
    /// Open `path` for reading only.
    pub fn open_input(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TransportError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(?path, "opened input stream file");
        Ok(Self::from_parts(Some(Box::new(BufReader::new(file))), None))
    }

    /// Create or truncate `path` for writing only.
    pub fn open_output(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|source| TransportError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(?path, "opened output stream file");
        Ok(Self::from_parts(None, Some(Box::new(BufWriter::new(file)))))
    }

    /// Build from arbitrary ends, e.g. stdin/stdout or in-memory buffers.
    pub fn from_parts(input: Option<Reader>, output: Option<Writer>) -> Self {
        Self { input, output }
    }

    /// Standard input and output of this process.
    pub fn stdio() -> Self {
        Self::from_parts(
            Some(Box::new(std::io::stdin())),
            Some(Box::new(std::io::stdout())),
        )
    }

    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }

    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    /// Close the input end.
    pub fn close_input(&mut self) {
        self.input = None;
    }

    /// Flush and close the output end.
    pub fn close_output(&mut self) -> Result<()> {
        if let Some(mut output) = self.output.take() {
            output.flush()?;
        }
        Ok(())
    }
}

impl Transport for FileTransport {
    fn write_exact(&mut self, buf: &[u8]) -> Result<()> {
        let output = self.output.as_mut().ok_or(TransportError::NotOpen("output"))?;
        write_all_to(output, buf)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let input = self.input.as_mut().ok_or(TransportError::NotOpen("input"))?;
        read_exact_from(input, buf)
    }
}

impl Drop for FileTransport {
    fn drop(&mut self) {
        if let Err(err) = self.close_output() {
            debug!(error = %err, "failed to flush output stream on drop");
        }
    }
}

impl std::fmt::Debug for FileTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTransport")
            .field("input", &self.has_input())
            .field("output", &self.has_output())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "mrirecon-transport-file-{}-{name}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("stream.bin")
    }

    #[test]
    fn output_then_input_roundtrip() {
        let path = temp_path("roundtrip");
        {
            let mut out = FileTransport::open_output(&path).unwrap();
            out.write_exact(&[1, 2, 3]).unwrap();
            out.write_exact(&[4]).unwrap();
        }

        let mut input = FileTransport::open_input(&path).unwrap();
        let mut buf = [0u8; 4];
        input.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);

        let err = input.read_exact(&mut buf).unwrap_err();
        assert!(err.is_closed());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn missing_ends_are_not_open() {
        let mut transport = FileTransport::from_parts(Some(Box::new(Cursor::new(vec![0u8]))), None);
        assert!(matches!(
            transport.write_exact(b"x"),
            Err(TransportError::NotOpen("output"))
        ));

        transport.close_input();
        let mut buf = [0u8; 1];
        assert!(matches!(
            transport.read_exact(&mut buf),
            Err(TransportError::NotOpen("input"))
        ));
    }

    #[test]
    fn open_missing_file_fails() {
        let path = std::env::temp_dir().join("mrirecon-transport-does-not-exist/none.bin");
        let err = FileTransport::open_input(&path).unwrap_err();
        assert!(matches!(err, TransportError::Open { .. }));
    }
}
