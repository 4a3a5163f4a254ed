//! String conversion utilities for VST3 structures.
//!
//! VST3 info structs carry fixed-size UTF-16 buffers.

use vst3::Steinberg::Vst::TChar;

/// Copy a Rust string to a wide string (UTF-16) buffer.
///
/// Truncates if the string is too long, ensuring null-termination.
pub fn copy_wstring(src: &str, dst: &mut [TChar]) {
    if dst.is_empty() {
        return;
    }

    let mut len = 0;
    for (src_char, dst_char) in src.encode_utf16().zip(dst.iter_mut()) {
        *dst_char = src_char as TChar;
        len += 1;
    }

    // Add null-terminator
    if len < dst.len() {
        dst[len] = 0;
    } else if let Some(last) = dst.last_mut() {
        *last = 0;
    }
}

/// Read a null-terminated wide string buffer back into a Rust string.
pub fn wstring_to_string(src: &[TChar]) -> String {
    let len = src.iter().position(|&c| c == 0).unwrap_or(src.len());
    let units: Vec<u16> = src[..len].iter().map(|&c| c as u16).collect();
    String::from_utf16_lossy(&units)
}
