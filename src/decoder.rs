//! Image decoding with ordered codec fallback
//!
//! Decoders in the wild disagree about what they accept: content sniffing at
//! offset zero rejects buffers with a junk prefix that still hold a valid
//! image, and a format-specific parser handles files whose magic bytes the
//! sniffer misreads. The decoder here runs an ordered list of strategies over
//! the same byte buffer; the first success wins and all failures are
//! aggregated into the final error so the caller can see every attempt.

use crate::error::{Result, SegmentationError};
use image::{ImageFormat, RgbImage};

/// A single decode attempt over an encoded byte buffer
///
/// Implementations return a canonical 3-channel RGB image; grayscale and
/// palette-mode sources are expanded to RGB before returning.
pub trait DecodeStrategy: Send + Sync {
    /// Strategy name used in aggregated error messages
    fn name(&self) -> &'static str;

    /// Attempt to decode the buffer into a canonical RGB image
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError::Decode` when this strategy cannot parse
    /// the buffer.
    fn decode(&self, bytes: &[u8]) -> Result<RgbImage>;
}

/// Primary path: decode with format detection from content
struct ContentSniffDecoder;

impl DecodeStrategy for ContentSniffDecoder {
    fn name(&self) -> &'static str {
        "content-sniff"
    }

    fn decode(&self, bytes: &[u8]) -> Result<RgbImage> {
        image::load_from_memory(bytes)
            .map(|dynamic| dynamic.to_rgb8())
            .map_err(|e| SegmentationError::decode(e.to_string()))
    }
}

/// Secondary path: scan for a known codec signature inside the buffer and
/// decode from that offset, tolerating leading junk (multipart leftovers,
/// BOMs, stray header bytes) that content sniffing at offset zero rejects
struct SignatureScanDecoder;

impl SignatureScanDecoder {
    const SIGNATURES: &'static [(&'static [u8], ImageFormat)] = &[
        (b"\x89PNG\r\n\x1a\n", ImageFormat::Png),
        (&[0xFF, 0xD8, 0xFF], ImageFormat::Jpeg),
        (b"BM", ImageFormat::Bmp),
    ];
}

impl DecodeStrategy for SignatureScanDecoder {
    fn name(&self) -> &'static str {
        "signature-scan"
    }

    fn decode(&self, bytes: &[u8]) -> Result<RgbImage> {
        // Earliest signature wins when more than one matches
        let mut found: Option<(usize, ImageFormat)> = None;
        for (signature, format) in Self::SIGNATURES {
            if let Some(offset) = bytes
                .windows(signature.len())
                .position(|window| window == *signature)
            {
                if found.map_or(true, |(best, _)| offset < best) {
                    found = Some((offset, *format));
                }
            }
        }

        let (offset, format) = found
            .ok_or_else(|| SegmentationError::decode("no known codec signature in buffer"))?;
        image::load_from_memory_with_format(&bytes[offset..], format)
            .map(|dynamic| dynamic.to_rgb8())
            .map_err(|e| {
                SegmentationError::decode(format!("{format:?} at offset {offset}: {e}"))
            })
    }
}

/// Final path: force each supported format parser in turn, tolerating
/// containers whose magic bytes the sniffing paths reject
struct FormatProbeDecoder {
    formats: &'static [ImageFormat],
}

impl FormatProbeDecoder {
    const fn new() -> Self {
        Self {
            formats: &[ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Bmp],
        }
    }
}

impl DecodeStrategy for FormatProbeDecoder {
    fn name(&self) -> &'static str {
        "format-probe"
    }

    fn decode(&self, bytes: &[u8]) -> Result<RgbImage> {
        let mut failures = Vec::with_capacity(self.formats.len());
        for format in self.formats {
            match image::load_from_memory_with_format(bytes, *format) {
                Ok(dynamic) => return Ok(dynamic.to_rgb8()),
                Err(e) => failures.push(format!("{format:?}: {e}")),
            }
        }
        Err(SegmentationError::decode(failures.join(", ")))
    }
}

/// Ordered decoder chain producing canonical RGB images
pub struct ImageDecoder {
    strategies: Vec<Box<dyn DecodeStrategy>>,
}

impl ImageDecoder {
    /// Create the default chain: content sniffing, signature scanning, then
    /// per-format probing
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategies: vec![
                Box::new(ContentSniffDecoder),
                Box::new(SignatureScanDecoder),
                Box::new(FormatProbeDecoder::new()),
            ],
        }
    }

    /// Create a chain from explicit strategies (first one wins)
    #[must_use]
    pub fn with_strategies(strategies: Vec<Box<dyn DecodeStrategy>>) -> Self {
        Self { strategies }
    }

    /// Decode encoded bytes into a canonical RGB image
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError::Decode` when the buffer is empty or every
    /// strategy fails; the message lists each strategy's failure. Returns
    /// `SegmentationError::EmptyImage` for a decodable image with zero area.
    pub fn decode(&self, bytes: &[u8]) -> Result<RgbImage> {
        if bytes.is_empty() {
            return Err(SegmentationError::decode("empty input buffer"));
        }

        let mut failures = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            match strategy.decode(bytes) {
                Ok(image) => {
                    if image.width() == 0 || image.height() == 0 {
                        return Err(SegmentationError::EmptyImage);
                    }
                    log::debug!(
                        "decoded {} bytes via '{}' strategy: {}x{}",
                        bytes.len(),
                        strategy.name(),
                        image.width(),
                        image.height()
                    );
                    return Ok(image);
                },
                Err(e) => {
                    log::debug!("decode strategy '{}' failed: {e}", strategy.name());
                    failures.push(format!("{}: {e}", strategy.name()));
                },
            }
        }

        Err(SegmentationError::decode(format!(
            "all {} decode strategies failed [{}]",
            self.strategies.len(),
            failures.join("; ")
        )))
    }
}

impl Default for ImageDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(color));
        let mut buffer = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_decodes_valid_png() {
        let decoder = ImageDecoder::new();
        let decoded = decoder.decode(&png_bytes(10, 6, [255, 0, 0])).unwrap();
        assert_eq!(decoded.dimensions(), (10, 6));
        assert_eq!(decoded.get_pixel(0, 0), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_grayscale_converted_to_rgb() {
        let gray = image::GrayImage::from_pixel(4, 4, image::Luma([200]));
        let mut buffer = Vec::new();
        DynamicImage::ImageLuma8(gray)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();

        let decoded = ImageDecoder::new().decode(&buffer).unwrap();
        assert_eq!(decoded.get_pixel(0, 0), &Rgb([200, 200, 200]));
    }

    #[test]
    fn test_empty_buffer_rejected() {
        let err = ImageDecoder::new().decode(&[]).unwrap_err();
        assert!(matches!(err, SegmentationError::Decode(_)));
        assert!(err.to_string().contains("empty input buffer"));
    }

    #[test]
    fn test_truncated_png_aggregates_all_failures() {
        // Valid signature, truncated body
        let bytes = png_bytes(10, 10, [0, 255, 0]);
        let truncated = &bytes[..bytes.len() / 2];

        let err = ImageDecoder::new().decode(truncated).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("content-sniff"));
        assert!(msg.contains("signature-scan"));
        assert!(msg.contains("format-probe"));
    }

    #[test]
    fn test_junk_prefix_recovered_by_signature_scan() {
        let mut bytes = b"--boundary\r\nContent-Type: image/png\r\n\r\n".to_vec();
        bytes.extend(png_bytes(6, 4, [0, 0, 255]));

        // Sniffing at offset zero fails on the prefix
        let err = ContentSniffDecoder.decode(&bytes).unwrap_err();
        assert!(matches!(err, SegmentationError::Decode(_)));

        let decoded = ImageDecoder::new().decode(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (6, 4));
        assert_eq!(decoded.get_pixel(0, 0), &Rgb([0, 0, 255]));
    }

    #[test]
    fn test_signature_scan_rejects_unsigned_buffer() {
        let err = SignatureScanDecoder.decode(b"plain text payload").unwrap_err();
        assert!(err.to_string().contains("no known codec signature"));
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let err = ImageDecoder::new().decode(&[0xde, 0xad, 0xbe, 0xef]).unwrap_err();
        assert!(matches!(err, SegmentationError::Decode(_)));
    }
}
