//! Splits a concatenated MJPEG byte stream into single JPEG images.

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Accumulates bytes and yields every complete `SOI .. EOI` image.
///
/// Bytes before the first start-of-image marker are discarded.
#[derive(Debug, Default)]
pub struct JpegSplitter {
    buffer: Vec<u8>,
}

fn find(haystack: &[u8], needle: &[u8; 2]) -> Option<usize> {
    haystack.windows(2).position(|w| w == needle)
}

impl JpegSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes held waiting for the rest of an image.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Take the next complete image, if one has fully arrived.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        let Some(start) = find(&self.buffer, &SOI) else {
            // Keep a trailing 0xFF, it may be the first half of a marker
            let keep = usize::from(self.buffer.last() == Some(&0xFF));
            let drop = self.buffer.len() - keep;
            self.buffer.drain(..drop);
            return None;
        };
        if start > 0 {
            self.buffer.drain(..start);
        }

        let end = find(&self.buffer[SOI.len()..], &EOI)? + SOI.len() + EOI.len();
        Some(self.buffer.drain(..end).collect())
    }
}
