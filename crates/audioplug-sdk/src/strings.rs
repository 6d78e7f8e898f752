//! Helpers for the fixed-size, nul-terminated strings used by the ABI.

use audioplug_sys::cty::c_char;

/// Copies `src` into `dst`, truncating on a UTF-8 boundary so the result is
/// always nul terminated.
pub fn write_c_string(dst: &mut [c_char], src: &str) {
    if dst.is_empty() {
        return;
    }
    let mut end = src.len().min(dst.len() - 1);
    while !src.is_char_boundary(end) {
        end -= 1;
    }
    for (slot, byte) in dst.iter_mut().zip(src.as_bytes()[..end].iter()) {
        *slot = *byte as c_char;
    }
    for slot in dst[end..].iter_mut() {
        *slot = 0;
    }
}

/// Reads a nul-terminated string out of a fixed-size buffer. A buffer without
/// terminator is read in full.
pub fn read_c_string(src: &[c_char]) -> String {
    let bytes: Vec<u8> = src
        .iter()
        .take_while(|c| **c != 0)
        .map(|c| *c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub const fn empty<const N: usize>() -> [c_char; N] {
    [0; N]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundary() {
        let mut buf = [0 as c_char; 4];
        write_c_string(&mut buf, "aé€");
        // 'a' + 'é' take three bytes; the euro sign does not fit.
        assert_eq!(read_c_string(&buf), "aé");
        assert_eq!(buf[3], 0);
    }

    #[test]
    fn unterminated_buffer_is_read_in_full() {
        let buf = [b'x' as c_char; 3];
        assert_eq!(read_c_string(&buf), "xxx");
    }
}
