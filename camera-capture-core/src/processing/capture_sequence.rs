use std::io::Cursor;

/// One frame of a capture sequence and the buffer it is encoded into.
#[derive(Debug, Default)]
pub struct CaptureFrame {
    pub stream: Cursor<Vec<u8>>,
}

/// A capture pipeline producing `frame_count` stills into in-memory buffers.
///
/// The coordinator only ever builds single-frame sequences.
#[derive(Debug)]
pub struct CaptureSequence {
    frames: Vec<CaptureFrame>,
}

impl CaptureSequence {
    pub fn new(frame_count: usize) -> Self {
        Self {
            frames: (0..frame_count).map(|_| CaptureFrame::default()).collect(),
        }
    }

    pub fn single_frame() -> Self {
        Self::new(1)
    }

    pub fn frames(&self) -> &[CaptureFrame] {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut [CaptureFrame] {
        &mut self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Take the first frame's buffer, consuming the sequence.
    pub fn into_first_stream(self) -> Option<Cursor<Vec<u8>>> {
        self.frames.into_iter().next().map(|frame| frame.stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn single_frame_targets_empty_buffer() {
        let sequence = CaptureSequence::single_frame();
        assert_eq!(sequence.len(), 1);
        assert!(sequence.frames()[0].stream.get_ref().is_empty());
    }

    #[test]
    fn first_stream_keeps_written_bytes() {
        let mut sequence = CaptureSequence::single_frame();
        sequence.frames_mut()[0].stream.write_all(b"frame").unwrap();

        let stream = sequence.into_first_stream().unwrap();
        assert_eq!(stream.get_ref().as_slice(), b"frame");
        assert_eq!(stream.position(), 5);
    }

    #[test]
    fn empty_sequence_has_no_stream() {
        assert!(CaptureSequence::new(0).into_first_stream().is_none());
    }
}
