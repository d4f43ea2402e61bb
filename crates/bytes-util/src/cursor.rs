use std::io;

use bytes::Bytes;

/// A helper trait to extract [`Bytes`] from a [`io::Cursor`] without copying
/// the underlying buffer.
pub trait BytesCursorExt {
    /// Extracts the next `size` bytes from the cursor, advancing it.
    ///
    /// Returns an [`io::ErrorKind::UnexpectedEof`] error if fewer than `size`
    /// bytes remain.
    fn extract_bytes(&mut self, size: usize) -> io::Result<Bytes>;

    /// Extracts everything from the current position to the end of the
    /// buffer, leaving the cursor at the end.
    fn extract_remaining(&mut self) -> Bytes;
}

impl BytesCursorExt for io::Cursor<Bytes> {
    fn extract_bytes(&mut self, size: usize) -> io::Result<Bytes> {
        let position = self.position() as usize;
        let end = position
            .checked_add(size)
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;

        if end > self.get_ref().len() {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }

        let bytes = self.get_ref().slice(position..end);
        self.set_position(end as u64);

        Ok(bytes)
    }

    fn extract_remaining(&mut self) -> Bytes {
        let position = (self.position() as usize).min(self.get_ref().len());
        let bytes = self.get_ref().slice(position..);
        self.set_position(self.get_ref().len() as u64);

        bytes
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use bytes::Bytes;

    use super::BytesCursorExt;

    #[test]
    fn extract_bytes() {
        let mut cursor = io::Cursor::new(Bytes::from_static(b"hello world"));

        assert_eq!(cursor.extract_bytes(5).unwrap(), Bytes::from_static(b"hello"));
        assert_eq!(cursor.position(), 5);
        assert_eq!(cursor.extract_bytes(0).unwrap(), Bytes::new());
        assert_eq!(cursor.extract_bytes(6).unwrap(), Bytes::from_static(b" world"));

        let err = cursor.extract_bytes(1).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn extract_bytes_past_end() {
        let mut cursor = io::Cursor::new(Bytes::from_static(b"abc"));

        let err = cursor.extract_bytes(4).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        // the cursor must not move on failure
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn extract_remaining() {
        let mut cursor = io::Cursor::new(Bytes::from_static(b"hello world"));
        cursor.set_position(6);

        assert_eq!(cursor.extract_remaining(), Bytes::from_static(b"world"));
        assert_eq!(cursor.extract_remaining(), Bytes::new());
    }
}
