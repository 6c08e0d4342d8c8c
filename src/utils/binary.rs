/// Bytes inspected when sniffing for binary content.
const SAMPLE_SIZE: usize = 8192;

/// Heuristic binary detection on the head of a file.
///
/// Text with a UTF-16 byte-order mark is not binary even though it is full
/// of NUL bytes; the decoder handles it.
pub fn is_binary(content: &[u8]) -> bool {
    if content.starts_with(&[0xFF, 0xFE]) || content.starts_with(&[0xFE, 0xFF]) {
        return false;
    }

    let sample = &content[..content.len().min(SAMPLE_SIZE)];

    let nul_count = memchr::memchr_iter(0, sample).count();
    if nul_count > sample.len() / 10 {
        return true;
    }

    // High proportion of control bytes
    let non_text = sample
        .iter()
        .filter(|&&b| b < 0x20 && b != b'\n' && b != b'\r' && b != b'\t')
        .count();
    non_text > sample.len() / 8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_not_binary() {
        assert!(!is_binary(b"fn main() {\n    println!(\"hi\");\n}\n"));
        assert!(!is_binary(b""));
    }

    #[test]
    fn test_nul_heavy_is_binary() {
        let mut data = vec![0u8; 64];
        data.extend_from_slice(b"ELF");
        assert!(is_binary(&data));
    }

    #[test]
    fn test_utf16_bom_is_text() {
        let mut data = vec![0xFF, 0xFE];
        for c in "hello".encode_utf16() {
            data.extend_from_slice(&c.to_le_bytes());
        }
        assert!(!is_binary(&data));
    }
}
