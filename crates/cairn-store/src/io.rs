//! Buffered whole-stream reads
//!
//! Shared by the cache (local files) and the fetcher (response bodies).

use std::io::{self, Read};

/// Read a stream to the end using `buffer_size`-sized chunks
///
/// A `buffer_size` of zero is treated as one byte.
///
/// # Errors
/// Propagates any read error other than `Interrupted`
pub fn read_fully<R: Read>(mut reader: R, buffer_size: usize) -> io::Result<Vec<u8>> {
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut out = Vec::new();

    loop {
        match reader.read(&mut buffer) {
            Ok(0) => return Ok(out),
            Ok(n) => out.extend_from_slice(&buffer[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_everything_with_small_buffer() {
        let data: Vec<u8> = (0..=255).collect();
        let out = read_fully(&data[..], 7).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn zero_buffer_size_still_progresses() {
        let out = read_fully(&b"abc"[..], 0).unwrap();
        assert_eq!(out, b"abc");
    }

    #[test]
    fn empty_stream() {
        let out = read_fully(io::empty(), 2048).unwrap();
        assert!(out.is_empty());
    }
}
