/*!
    Encoded packet type.
*/

/**
    One encoded data unit read from a demuxer.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    /// Index of the stream this packet belongs to.
    pub stream_index: usize,
    /// Encoded payload.
    pub data: Vec<u8>,
    /// Presentation timestamp in the stream's time base.
    pub pts: Option<i64>,
    /// Decode timestamp in the stream's time base.
    pub dts: Option<i64>,
    /// Duration in the stream's time base (0 if unknown).
    pub duration: i64,
    /// Whether this packet starts a keyframe.
    pub is_keyframe: bool,
}

impl Packet {
    pub fn new(stream_index: usize, data: Vec<u8>) -> Self {
        Self {
            stream_index,
            data,
            pts: None,
            dts: None,
            duration: 0,
            is_keyframe: false,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
