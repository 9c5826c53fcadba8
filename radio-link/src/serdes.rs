use shared::comms_hal::MAX_PACKET_SIZE;

// Frame format:
// [u8; tag length]: network tag, e.g. "DC="
// [u8; n]: ASCII payload
// u8: '\n'
// Anything after the first terminator is ignored.

pub const FRAME_TERMINATOR: u8 = b'\n';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    PacketTooLong,
    EmbeddedTerminator,
    ForeignHeader,
    MissingTerminator,
    NotUtf8,
}

pub fn frame_len(tag: &str, payload: &str) -> usize {
    tag.len() + payload.len() + 1
}

pub fn serialize_frame(tag: &str, payload: &str, buffer: &mut [u8]) -> Result<usize, FrameError> {
    let size = frame_len(tag, payload);

    if size > MAX_PACKET_SIZE || size > buffer.len() {
        return Err(FrameError::PacketTooLong);
    }

    if payload.as_bytes().contains(&FRAME_TERMINATOR) {
        return Err(FrameError::EmbeddedTerminator);
    }

    let mut buf_ptr = 0;

    buffer[buf_ptr..(buf_ptr + tag.len())].copy_from_slice(tag.as_bytes());
    buf_ptr += tag.len();

    buffer[buf_ptr..(buf_ptr + payload.len())].copy_from_slice(payload.as_bytes());
    buf_ptr += payload.len();

    buffer[buf_ptr] = FRAME_TERMINATOR;
    buf_ptr += 1;

    Ok(buf_ptr)
}

/// Returns the payload between the tag and the first terminator.
pub fn deserialize_frame<'a>(tag: &str, buffer: &'a [u8]) -> Result<&'a str, FrameError> {
    if buffer.len() > MAX_PACKET_SIZE {
        return Err(FrameError::PacketTooLong);
    }

    let body = buffer
        .strip_prefix(tag.as_bytes())
        .ok_or(FrameError::ForeignHeader)?;

    let end = body
        .iter()
        .position(|byte| *byte == FRAME_TERMINATOR)
        .ok_or(FrameError::MissingTerminator)?;

    core::str::from_utf8(&body[..end]).map_err(|_| FrameError::NotUtf8)
}
