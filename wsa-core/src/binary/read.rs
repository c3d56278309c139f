use byteorder::{BigEndian, ByteOrder};
use wsa_types::{WsaError, WsaResult};

fn take<'a>(
    buf: &'a [u8],
    off: &mut usize,
    len: usize,
) -> WsaResult<&'a [u8]> {
    let end = *off + len;

    if end > buf.len() {
        return Err(WsaError::FrameIncomplete {
            expected: end,
            received: buf.len(),
        });
    }

    let slice = &buf[*off..end];
    *off = end;
    Ok(slice)
}

pub fn read_u32_be(
    buf: &[u8],
    off: &mut usize,
) -> WsaResult<u32> {
    Ok(BigEndian::read_u32(take(buf, off, 4)?))
}

pub fn read_i32_be(
    buf: &[u8],
    off: &mut usize,
) -> WsaResult<i32> {
    Ok(BigEndian::read_i32(take(buf, off, 4)?))
}

pub fn read_u64_be(
    buf: &[u8],
    off: &mut usize,
) -> WsaResult<u64> {
    Ok(BigEndian::read_u64(take(buf, off, 8)?))
}

pub fn read_i64_be(
    buf: &[u8],
    off: &mut usize,
) -> WsaResult<i64> {
    Ok(BigEndian::read_i64(take(buf, off, 8)?))
}

pub fn read_i16_be(
    buf: &[u8],
    off: &mut usize,
) -> WsaResult<i16> {
    Ok(BigEndian::read_i16(take(buf, off, 2)?))
}
