use std::io::Cursor;

use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::{AnimationDecoder, Frame};

/// Application extension carrying the loop count.
const NETSCAPE: &[u8] = b"NETSCAPE2.0";

/// Re-encode every frame of a GIF, keeping frame delays and the loop count.
///
/// Palette quantization may change pixels; the original bytes are returned
/// unless every re-encoded frame decodes to the same image.
pub(super) fn reencode(bytes: &[u8]) -> Result<Vec<u8>, image::ImageError> {
    let frames = decode(bytes)?;

    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(&mut out, 10);
        if let Some(repeat) = loop_count(bytes) {
            encoder.set_repeat(repeat)?;
        }
        encoder.encode_frames(frames.clone())?;
    }

    if same_frames(&frames, &decode(&out)?) {
        Ok(out)
    } else {
        tracing::debug!("GIF re-encode changed pixels, keeping original");
        Ok(bytes.to_vec())
    }
}

fn decode(bytes: &[u8]) -> Result<Vec<Frame>, image::ImageError> {
    GifDecoder::new(Cursor::new(bytes))?.into_frames().collect_frames()
}

fn same_frames(a: &[Frame], b: &[Frame]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| x.delay() == y.delay() && x.buffer() == y.buffer())
}

/// Loop count from the NETSCAPE extension; `None` plays once.
fn loop_count(bytes: &[u8]) -> Option<Repeat> {
    let at = bytes.windows(NETSCAPE.len()).position(|w| w == NETSCAPE)?;
    // Sub-block: size 3, id 1, little-endian count
    match bytes.get(at + NETSCAPE.len()..at + NETSCAPE.len() + 4)? {
        [3, 1, lo, hi] => match u16::from_le_bytes([*lo, *hi]) {
            0 => Some(Repeat::Infinite),
            n => Some(Repeat::Finite(n)),
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Delay, Frame, Rgba, RgbaImage};

    fn animation() -> Vec<u8> {
        encode(None)
    }

    fn encode(repeat: Option<Repeat>) -> Vec<u8> {
        let frames = [Rgba([255, 0, 0, 255]), Rgba([0, 0, 255, 255])]
            .into_iter()
            .map(|color| {
                Frame::from_parts(
                    RgbaImage::from_pixel(8, 8, color),
                    0,
                    0,
                    Delay::from_numer_denom_ms(100, 1),
                )
            });

        let mut out = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut out);
            if let Some(repeat) = repeat {
                encoder.set_repeat(repeat).unwrap();
            }
            encoder.encode_frames(frames).unwrap();
        }
        out
    }

    #[test]
    fn keeps_every_frame() {
        let out = reencode(&animation()).unwrap();

        let decoder = GifDecoder::new(Cursor::new(out)).unwrap();
        let frames = decoder.into_frames().collect_frames().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].buffer().get_pixel(0, 0), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn keeps_the_loop_count() {
        assert_eq!(loop_count(&reencode(&animation()).unwrap()), None);
        assert_eq!(
            loop_count(&reencode(&encode(Some(Repeat::Finite(3)))).unwrap()),
            Some(Repeat::Finite(3))
        );
        assert_eq!(
            loop_count(&reencode(&encode(Some(Repeat::Infinite))).unwrap()),
            Some(Repeat::Infinite)
        );
    }

    #[test]
    fn frames_survive_unchanged() {
        let original = animation();

        let out = reencode(&original).unwrap();

        assert!(same_frames(&decode(&original).unwrap(), &decode(&out).unwrap()));
    }
}
