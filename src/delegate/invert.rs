//! The colour-inverting sandbox

use std::io::Cursor;

use image::{ImageError, ImageFormat};

use super::{Payload, Sandbox};

/// Decodes an image, inverts its colour channels and re-encodes it as PNG.
/// Alpha is left untouched.
///
/// Failures are reported back as [`Payload::Text`] so the caller sees a
/// protocol mismatch instead of a hung request.
#[derive(Debug, Default, Clone, Copy)]
pub struct InvertColors;

impl InvertColors {
    pub fn invert(bytes: &[u8]) -> Result<Vec<u8>, ImageError> {
        let mut img = image::load_from_memory(bytes)?;
        img.invert();
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }
}

impl Sandbox for InvertColors {
    fn handle(&mut self, payload: Payload) -> Payload {
        match payload {
            Payload::Bytes(bytes) => match Self::invert(&bytes) {
                Ok(inverted) => Payload::Bytes(inverted),
                Err(e) => Payload::Text(e.to_string()),
            },
            other => Payload::Text(format!("expected image bytes, got {}", other.kind())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn png(pixel: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(2, 1, Rgba(pixel));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn inverts_colour_and_keeps_alpha() {
        let out = InvertColors::invert(&png([10, 200, 0, 128])).unwrap();
        let img = image::load_from_memory(&out).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (2, 1));
        assert_eq!(img.get_pixel(1, 0), &Rgba([245, 55, 255, 128]));
    }

    #[test]
    fn garbage_is_reported_as_text() {
        let reply = InvertColors.handle(Payload::Bytes(b"not an image".to_vec()));
        assert!(matches!(reply, Payload::Text(_)));
    }

    #[test]
    fn non_bytes_request_is_reported_as_text() {
        let reply = InvertColors.handle(Payload::Empty);
        assert_eq!(
            reply,
            Payload::Text("expected image bytes, got nothing".into())
        );
    }

    #[tokio::test]
    async fn round_trips_through_a_channel() {
        let channel =
            super::super::DelegationChannel::spawn(InvertColors, std::time::Duration::from_secs(5))
                .unwrap();
        let out = channel.transform(png([0, 0, 0, 255])).await.unwrap();
        let img = image::load_from_memory(&out).unwrap().to_rgba8();
        assert_eq!(img.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
    }
}
