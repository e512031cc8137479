use encoding_rs::WINDOWS_1252;
use nom::combinator::{flat_map, map};
use nom::{IResult, Parser, bytes, number};

/// Parse signed byte
pub fn parse_i8(i: &[u8]) -> IResult<&[u8], i8> {
    number::complete::le_i8(i)
}

/// Parse unsigned byte
pub fn parse_u8(i: &[u8]) -> IResult<&[u8], u8> {
    number::complete::le_u8(i)
}

/// Parse signed 32
pub fn parse_int(i: &[u8]) -> IResult<&[u8], i32> {
    number::complete::le_i32(i)
}

/// Parse bool
pub fn parse_bool(i: &[u8]) -> IResult<&[u8], bool> {
    map(number::complete::le_u8, |b| b != 0).parse(i)
}

/// Parse signed short
pub fn parse_short(i: &[u8]) -> IResult<&[u8], i16> {
    number::complete::le_i16(i)
}

/// Parse little-endian float
pub fn parse_f32(i: &[u8]) -> IResult<&[u8], f32> {
    number::complete::le_f32(i)
}

/// Parse little-endian double
pub fn parse_f64(i: &[u8]) -> IResult<&[u8], f64> {
    number::complete::le_f64(i)
}

/// Skip `n` bytes.
pub fn skip(i: &[u8], n: usize) -> IResult<&[u8], ()> {
    log::debug!("skip: {n}");
    map(bytes::complete::take(n), |_| ()).parse(i)
}

/// Materialize properly encoded String
fn make_string(i: &[u8]) -> String {
    let (cow, encoding_used, had_errors) = WINDOWS_1252.decode(i);
    if had_errors {
        log::debug!("Error parsing string with {encoding_used:?}");
        match std::str::from_utf8(i) {
            Ok(s) => s.to_string(),
            Err(e) => {
                log::debug!("Error UTF-8 string parsing:{e}");
                String::new()
            }
        }
    } else {
        cow.to_string()
    }
}

/// Parse string of length `len`.
fn parse_string(len: usize) -> impl FnMut(&[u8]) -> IResult<&[u8], String> {
    parse_string_field(len, len)
}

/// Parse string field of length `string_len` with total size to consume `field_size`
fn parse_string_field(
    field_size: usize,
    string_len: usize,
) -> impl FnMut(&[u8]) -> IResult<&[u8], String> {
    move |i: &[u8]| {
        log::debug!("Parsing string field: field_size={field_size}, string_len={string_len}");
        let (rest, field) = bytes::complete::take(field_size)(i)?;
        let string = make_string(&field[..std::cmp::min(string_len, field_size)]);
        Ok((rest, string))
    }
}

/// Size of string encoded as Int.
/// [i32 string_len][string_len bytes]
pub fn parse_int_sized_string(i: &[u8]) -> IResult<&[u8], String> {
    flat_map(parse_int, |len| parse_string(len as usize)).parse(i)
}

/// Byte-prefixed string inside a fixed field of `size` bytes.
/// [u8 string_len][size bytes field]
pub fn parse_byte_size_string(size: usize) -> impl FnMut(&[u8]) -> IResult<&[u8], String> {
    move |i: &[u8]| {
        let (i, length) = parse_u8(i)?;
        log::debug!("Parsing byte sized string of length {length} for field size {size}");
        parse_string_field(size, length as usize)(i)
    }
}

/// Like [`parse_byte_size_string`] but also yields the raw bytes after the
/// declared string length, so fixed-width fields round-trip verbatim.
pub fn parse_padded_byte_size_string(
    size: usize,
) -> impl FnMut(&[u8]) -> IResult<&[u8], (String, Vec<u8>)> {
    move |i: &[u8]| {
        let (i, length) = parse_u8(i)?;
        let (rest, field) = bytes::complete::take(size)(i)?;
        let string_len = std::cmp::min(length as usize, size);
        let string = make_string(&field[..string_len]);
        let padding = field[string_len..].to_vec();
        Ok((rest, (string, padding)))
    }
}

/// Size of string encoded as Int, but the size is also encoded as a byte.
/// [i32 string_len + 1][u8 string_len][string_len bytes]
pub fn parse_int_byte_sized_string(i: &[u8]) -> IResult<&[u8], String> {
    flat_map(parse_int, |len| {
        flat_map(parse_u8, move |str_len| {
            log::debug!("Parsing int byte sized string int_len={len} u8_len={str_len}");
            parse_string_field((len as usize).saturating_sub(1), str_len as usize)
        })
    })
    .parse(i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_byte_size_string() {
        let data: Vec<u8> = vec![
            0x18, 0x46, 0x49, 0x43, 0x48, 0x49, 0x45, 0x52, 0x20, 0x47, 0x55, 0x49, 0x54, 0x41,
            0x52, 0x20, 0x50, 0x52, 0x4f, 0x20, 0x76, 0x33, 0x2e, 0x30, 0x30, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00,
        ];
        let (_rest, res) = parse_byte_size_string(30)(&data).unwrap();
        assert_eq!(res, "FICHIER GUITAR PRO v3.00");
    }

    #[test]
    fn test_read_padded_string_keeps_padding() {
        let data: Vec<u8> = vec![0x02, b'h', b'i', 0xAA, 0xBB];
        let (rest, (text, padding)) = parse_padded_byte_size_string(4)(&data).unwrap();
        assert!(rest.is_empty());
        assert_eq!(text, "hi");
        assert_eq!(padding, vec![0xAA, 0xBB]);
    }

    #[test]
    fn test_read_int_byte_sized_string() {
        let data: Vec<u8> = vec![0x05, 0x00, 0x00, 0x00, 0x04, b't', b'e', b's', b't'];
        let (rest, res) = parse_int_byte_sized_string(&data).unwrap();
        assert!(rest.is_empty());
        assert_eq!(res, "test");
    }

    #[test]
    fn test_read_int_byte_sized_string_empty() {
        let data: Vec<u8> = vec![0x01, 0x00, 0x00, 0x00, 0x00];
        let (rest, res) = parse_int_byte_sized_string(&data).unwrap();
        assert!(rest.is_empty());
        assert_eq!(res, "");
    }

    #[test]
    fn test_read_int_sized_string() {
        let data: Vec<u8> = vec![0x03, 0x00, 0x00, 0x00, b'a', b'b', b'c'];
        let (rest, res) = parse_int_sized_string(&data).unwrap();
        assert!(rest.is_empty());
        assert_eq!(res, "abc");
    }

    #[test]
    fn test_windows_1252_decoding() {
        // 0xE9 is 'é' in windows-1252
        let data: Vec<u8> = vec![0x04, 0x00, 0x00, 0x00, 0x03, 0x63, 0x61, 0xE9];
        let (_rest, res) = parse_int_byte_sized_string(&data).unwrap();
        assert_eq!(res, "caé");
    }
}
