use std::io::{self, Cursor, Read, Seek, SeekFrom};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::sensor::{Resolution, SensorLocation};

/// Metadata describing a captured still.
///
/// Serializable so the consumer of a handoff can forward it alongside the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureMetadata {
    pub id: String,
    pub captured_at: String,
    pub sensor_location: SensorLocation,
    /// Rotation baked into the encoded image by the device, in degrees.
    pub encode_orientation: i32,
    pub resolution: Resolution,
    pub byte_len: usize,
    pub checksum: String,
}

impl CaptureMetadata {
    pub fn new(
        data: &[u8],
        sensor_location: SensorLocation,
        encode_orientation: i32,
        resolution: Resolution,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            captured_at: chrono::Utc::now().to_rfc3339(),
            sensor_location,
            encode_orientation,
            resolution,
            byte_len: data.len(),
            checksum: sha256_hex(data),
        }
    }
}

/// An encoded still image produced by one capture sequence.
///
/// The byte stream is positioned at offset 0 when handed off. Consumers read
/// it through `Read`; `rewind` makes it readable again (e.g. preview first,
/// then save).
#[derive(Debug, Clone)]
pub struct CapturedImage {
    stream: Cursor<Vec<u8>>,
    metadata: CaptureMetadata,
}

impl CapturedImage {
    /// Wrap a filled capture buffer, resetting its position to the start.
    pub fn from_stream(stream: Cursor<Vec<u8>>, metadata: CaptureMetadata) -> Self {
        let mut stream = stream;
        stream.set_position(0);
        Self { stream, metadata }
    }

    pub fn metadata(&self) -> &CaptureMetadata {
        &self.metadata
    }

    /// The encoded bytes, independent of the read position.
    pub fn bytes(&self) -> &[u8] {
        self.stream.get_ref()
    }

    pub fn len(&self) -> usize {
        self.stream.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stream.get_ref().is_empty()
    }

    /// Current read offset.
    pub fn position(&self) -> u64 {
        self.stream.position()
    }

    pub fn rewind(&mut self) {
        self.stream.set_position(0);
    }

    /// Release the buffer to the consumer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.stream.into_inner()
    }

    /// Whether the bytes still match the checksum taken at capture time.
    pub fn verify_checksum(&self) -> bool {
        sha256_hex(self.bytes()) == self.metadata.checksum
    }
}

impl Read for CapturedImage {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Seek for CapturedImage {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.stream.seek(pos)
    }
}

fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data).iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_from(bytes: &[u8]) -> CapturedImage {
        let mut stream = Cursor::new(Vec::new());
        std::io::Write::write_all(&mut stream, bytes).unwrap();
        let metadata = CaptureMetadata::new(bytes, SensorLocation::Back, 90, Resolution::VGA);
        CapturedImage::from_stream(stream, metadata)
    }

    #[test]
    fn handed_off_at_offset_zero() {
        let mut image = image_from(&[0xFF, 0xD8, 0xFF, 0xD9]);
        assert_eq!(image.position(), 0);

        let mut out = Vec::new();
        image.read_to_end(&mut out).unwrap();
        assert_eq!(out, vec![0xFF, 0xD8, 0xFF, 0xD9]);
        assert_eq!(image.position(), 4);
    }

    #[test]
    fn rewind_allows_second_read() {
        let mut image = image_from(b"jpeg");
        let mut first = String::new();
        image.read_to_string(&mut first).unwrap();

        image.rewind();
        let mut second = String::new();
        image.read_to_string(&mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn consumer_takes_the_whole_buffer() {
        let mut image = image_from(b"still");
        let mut head = [0u8; 2];
        image.read_exact(&mut head).unwrap();

        // Ownership of every byte passes on regardless of read position.
        let bytes = image.into_bytes();
        assert_eq!(bytes, b"still".to_vec());
        assert_eq!(sha256_hex(&bytes), image_from(b"still").metadata().checksum);
    }

    #[test]
    fn metadata_describes_bytes() {
        let image = image_from(b"abc");
        let metadata = image.metadata();

        assert_eq!(metadata.byte_len, 3);
        assert_eq!(
            metadata.checksum,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(metadata.encode_orientation, 90);
        assert!(image.verify_checksum());
    }

    #[test]
    fn metadata_serializes_to_json() {
        let image = image_from(b"abc");
        let json = serde_json::to_string(image.metadata()).unwrap();
        assert!(json.contains("\"sensor_location\":\"back\""));

        let parsed: CaptureMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(&parsed, image.metadata());
    }
}
