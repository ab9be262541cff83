//! Lossless JPEG metadata stripping.
//!
//! Walks the marker segments up to the start of scan and drops the ones a
//! decoder never needs: comments and every `APPn` block except JFIF, ICC
//! profiles and the Adobe color transform marker. Entropy-coded data is
//! copied untouched.

use super::OptimizeError;

const SOI: u8 = 0xD8;
const SOS: u8 = 0xDA;
const COM: u8 = 0xFE;
const APP0: u8 = 0xE0;
const APP2: u8 = 0xE2;
const APP14: u8 = 0xEE;

/// APPn segments kept, by marker and payload prefix.
const KEPT_APP_SEGMENTS: &[(u8, &[u8])] = &[
    (APP0, b"JFIF\0"),
    (APP2, b"ICC_PROFILE\0"),
    (APP14, b"Adobe"),
];

fn is_standalone(marker: u8) -> bool {
    marker == 0x01 || (0xD0..=0xD7).contains(&marker)
}

fn keep_segment(marker: u8, payload: &[u8]) -> bool {
    match marker {
        COM => false,
        0xE0..=0xEF => KEPT_APP_SEGMENTS
            .iter()
            .any(|(m, prefix)| *m == marker && payload.starts_with(prefix)),
        _ => true,
    }
}

pub(super) fn strip_metadata(data: &[u8]) -> Result<Vec<u8>, OptimizeError> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != SOI {
        return Err(OptimizeError::Jpeg("missing start of image"));
    }

    let mut out = Vec::with_capacity(data.len());
    out.extend_from_slice(&data[..2]);
    let mut pos = 2;

    loop {
        if pos >= data.len() || data[pos] != 0xFF {
            return Err(OptimizeError::Jpeg("expected marker"));
        }
        // Fill bytes before a marker
        while pos < data.len() && data[pos] == 0xFF {
            pos += 1;
        }
        let Some(&marker) = data.get(pos) else {
            return Err(OptimizeError::Jpeg("truncated marker"));
        };
        let start = pos - 1;
        pos += 1;

        if is_standalone(marker) {
            out.extend_from_slice(&data[start..pos]);
            continue;
        }

        if pos + 2 > data.len() {
            return Err(OptimizeError::Jpeg("truncated segment length"));
        }
        let length = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
        if length < 2 || pos + length > data.len() {
            return Err(OptimizeError::Jpeg("segment overruns file"));
        }
        let end = pos + length;

        if marker == SOS {
            out.extend_from_slice(&data[start..]);
            return Ok(out);
        }

        if keep_segment(marker, &data[pos + 2..end]) {
            out.extend_from_slice(&data[start..end]);
        }
        pos = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0xFF, marker];
        bytes.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    fn jpeg(segments: &[Vec<u8>]) -> Vec<u8> {
        let mut bytes = vec![0xFF, SOI];
        for s in segments {
            bytes.extend_from_slice(s);
        }
        bytes.extend_from_slice(&segment(SOS, &[1, 2, 3]));
        bytes.extend_from_slice(&[0x12, 0xFF, 0x00, 0x34, 0xFF, 0xD9]);
        bytes
    }

    #[test]
    fn drops_exif_and_comments() {
        let jfif = segment(APP0, b"JFIF\0\x01\x01");
        let dqt = segment(0xDB, &[0; 8]);
        let input = jpeg(&[
            jfif.clone(),
            segment(0xE1, b"Exif\0\0camera"),
            segment(COM, b"made with love"),
            dqt.clone(),
        ]);

        let out = strip_metadata(&input).unwrap();

        assert_eq!(out, jpeg(&[jfif, dqt]));
    }

    #[test]
    fn keeps_color_information() {
        let icc = segment(APP2, b"ICC_PROFILE\0\x01\x01data");
        let adobe = segment(APP14, b"Adobe\0\x64");
        let input = jpeg(&[icc, adobe]);

        assert_eq!(strip_metadata(&input).unwrap(), input);
    }

    #[test]
    fn rejects_truncated_files() {
        assert!(strip_metadata(b"\xFF\xD8\xFF\xE1\x00\x10Exif").is_err());
        assert!(strip_metadata(b"GIF89a").is_err());
    }
}
