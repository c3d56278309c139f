use byteorder::{BigEndian, WriteBytesExt};

// Запись в Vec<u8> не может завершиться ошибкой ввода/вывода.

pub fn write_u32_be(
    buf: &mut Vec<u8>,
    val: u32,
) {
    let _ = buf.write_u32::<BigEndian>(val);
}

pub fn write_i32_be(
    buf: &mut Vec<u8>,
    val: i32,
) {
    let _ = buf.write_i32::<BigEndian>(val);
}

pub fn write_u64_be(
    buf: &mut Vec<u8>,
    val: u64,
) {
    let _ = buf.write_u64::<BigEndian>(val);
}

pub fn write_i64_be(
    buf: &mut Vec<u8>,
    val: i64,
) {
    let _ = buf.write_i64::<BigEndian>(val);
}

pub fn write_i16_be(
    buf: &mut Vec<u8>,
    val: i16,
) {
    let _ = buf.write_i16::<BigEndian>(val);
}
