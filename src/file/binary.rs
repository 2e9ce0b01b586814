use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Bytes inspected when sniffing a file
const SNIFF_LEN: usize = 8192;

/// Fraction of control bytes above which a sample counts as binary
const CONTROL_RATIO_LIMIT: f64 = 0.30;

/// Sniff the head of a file for binary content.
///
/// Unreadable files are reported as text; the indexer surfaces the read
/// error itself when it loads the file.
pub fn is_binary_file(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };

    let mut buffer = [0u8; SNIFF_LEN];
    match file.read(&mut buffer) {
        Ok(n) => looks_binary(&buffer[..n]),
        Err(_) => false,
    }
}

/// Heuristic over a byte sample: any NUL byte, or a high share of control
/// bytes in a sample that is not valid UTF-8.
pub fn looks_binary(sample: &[u8]) -> bool {
    if sample.is_empty() {
        return false;
    }
    if sample.contains(&0) {
        return true;
    }

    let control = sample
        .iter()
        .filter(|&&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0C))
        .count();
    let ratio = control as f64 / sample.len() as f64;
    if ratio > CONTROL_RATIO_LIMIT {
        return true;
    }

    // A truncated sample may cut a multi-byte character in half
    match std::str::from_utf8(sample) {
        Ok(_) => false,
        Err(e) => e.error_len().is_some(),
    }
}
