//! Label command encoding: packed bitmap → self-contained ZPL block.
//!
//! Each page becomes one `^XA … ^XZ` block carrying a single `^GF` graphic
//! field anchored at the label origin:
//!
//! ```text
//! ^XA
//! ^PW812
//! ^LL1218
//! ^FO0,0^GFA,124236,124236,102,<payload>^FS
//! ^XZ
//! ```
//!
//! ## Payload compression
//!
//! The payload is the bitmap as ASCII hex, optionally shrunk with the ZPL
//! run-length scheme. Per row of `2 × bytes_per_row` hex digits:
//!
//! | Token | Meaning |
//! |-------|---------|
//! | `G`…`Y` | repeat the next digit 1…19 times |
//! | `g`…`z` | repeat the next digit 20, 40 … 400 times (additive with `G`…`Y`) |
//! | `,` | fill the rest of the row with `0` |
//! | `!` | fill the rest of the row with `F` |
//! | `:` | repeat the previous row |
//!
//! A corrupt payload prints as garbage with no error on the printer side, so
//! [`decompress`] is provided and the encoder is property-tested against it.

use crate::config::Compression;
use crate::error::Pdf2ZplError;
use crate::output::LabelCommand;
use crate::pipeline::monochrome::MonochromeBitmap;
use thiserror::Error;
use tracing::debug;

/// Default upper bound on the uncompressed `^GF` byte count.
///
/// Large enough for a 4 × 6 in label at 600 dpi (1.08 MB); printers with less
/// graphics memory should lower it via the config.
pub const DEFAULT_MAX_FIELD_BYTES: usize = 4 * 1024 * 1024;

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Errors from [`decompress`] and [`GraphicField::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("unexpected character {ch:?} at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("run at offset {offset} overflows the {row_chars}-digit row")]
    RowOverrun { offset: usize, row_chars: usize },

    #[error("':' at offset {offset} has no complete previous row to repeat")]
    NothingToRepeat { offset: usize },

    #[error("repeat count at offset {offset} is not followed by a hex digit")]
    DanglingCount { offset: usize },

    #[error("payload decodes to {actual} bytes, header declares {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("no ^GFA field found")]
    MissingField,
}

/// Serialises monochrome bitmaps into ZPL label commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZplEncoder {
    compression: Compression,
    max_field_bytes: usize,
    copies: u32,
}

impl Default for ZplEncoder {
    fn default() -> Self {
        Self::new(Compression::default())
    }
}

impl ZplEncoder {
    pub fn new(compression: Compression) -> Self {
        Self {
            compression,
            max_field_bytes: DEFAULT_MAX_FIELD_BYTES,
            copies: 1,
        }
    }

    pub fn max_field_bytes(mut self, n: usize) -> Self {
        self.max_field_bytes = n;
        self
    }

    pub fn copies(mut self, n: u32) -> Self {
        self.copies = n.max(1);
        self
    }

    /// Encode one page. `page_num` is 1-indexed and only used for reporting.
    ///
    /// Bitmaps over the field limit fail with
    /// [`Pdf2ZplError::EncodingOverflow`]; splitting a page across several
    /// fields is not supported.
    pub fn encode(
        &self,
        bitmap: &MonochromeBitmap,
        page_num: usize,
    ) -> Result<LabelCommand, Pdf2ZplError> {
        let (width, height) = (bitmap.width(), bitmap.height());
        if width == 0 || height == 0 {
            return Err(Pdf2ZplError::invalid_geometry(format!(
                "cannot encode an empty {width}×{height} bitmap"
            )));
        }

        let bytes_per_row = bitmap.bytes_per_row();
        let total_bytes = bitmap.total_bytes();
        if total_bytes > self.max_field_bytes {
            return Err(Pdf2ZplError::EncodingOverflow {
                page: page_num,
                total_bytes,
                limit: self.max_field_bytes,
            });
        }

        let payload = encode_payload(bitmap.as_bytes(), bytes_per_row, self.compression);
        debug!(
            "Page {}: {} bytes → {} payload chars ({:?})",
            page_num,
            total_bytes,
            payload.len(),
            self.compression
        );

        let mut zpl = String::with_capacity(payload.len() + 96);
        zpl.push_str("^XA\n");
        zpl.push_str(&format!("^PW{width}\n^LL{height}\n"));
        zpl.push_str(&format!(
            "^FO0,0^GFA,{total_bytes},{total_bytes},{bytes_per_row},"
        ));
        zpl.push_str(&payload);
        zpl.push_str("^FS\n");
        if self.copies > 1 {
            zpl.push_str(&format!("^PQ{}\n", self.copies));
        }
        zpl.push_str("^XZ\n");

        Ok(LabelCommand {
            page_num,
            width,
            height,
            bytes_per_row,
            total_bytes,
            zpl,
        })
    }
}

/// Render packed rows as a `^GF` payload.
pub fn encode_payload(data: &[u8], bytes_per_row: usize, compression: Compression) -> String {
    match compression {
        Compression::Hex => {
            let mut out = String::with_capacity(data.len() * 2);
            push_hex(data, &mut out);
            out
        }
        Compression::Zpl => compress(data, bytes_per_row),
    }
}

/// ZPL run-length compression of packed rows.
pub fn compress(data: &[u8], bytes_per_row: usize) -> String {
    let mut out = String::new();
    if bytes_per_row == 0 {
        return out;
    }

    let mut prev: Option<&[u8]> = None;
    let mut hex = String::with_capacity(bytes_per_row * 2);
    for row in data.chunks(bytes_per_row) {
        if prev == Some(row) {
            out.push(':');
            continue;
        }
        hex.clear();
        push_hex(row, &mut hex);
        compress_row(hex.as_bytes(), &mut out);
        prev = Some(row);
    }
    out
}

fn push_hex(bytes: &[u8], out: &mut String) {
    for &b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0F) as usize] as char);
    }
}

fn compress_row(hex: &[u8], out: &mut String) {
    let (body, fill) = split_trailing_fill(hex);

    let mut i = 0;
    while i < body.len() {
        let digit = body[i];
        let run = body[i..].iter().take_while(|&&c| c == digit).count();
        if run > 1 {
            push_count(run, out);
        }
        out.push(digit as char);
        i += run;
    }

    if let Some(marker) = fill {
        out.push(marker);
    }
}

/// Split off a trailing run of `0` or `F` that a `,` / `!` can replace.
fn split_trailing_fill(hex: &[u8]) -> (&[u8], Option<char>) {
    let Some(&last) = hex.last() else {
        return (hex, None);
    };
    let marker = match last {
        b'0' => ',',
        b'F' => '!',
        _ => return (hex, None),
    };
    let start = hex.iter().rposition(|&c| c != last).map_or(0, |p| p + 1);
    (&hex[..start], Some(marker))
}

fn push_count(mut n: usize, out: &mut String) {
    while n >= 400 {
        out.push('z');
        n -= 400;
    }
    if n >= 20 {
        out.push((b'g' + (n / 20 - 1) as u8) as char);
        n %= 20;
    }
    if n > 0 {
        out.push((b'G' + (n - 1) as u8) as char);
    }
}

/// Decode a `^GF` ASCII payload (plain hex or ZPL-compressed) back to bytes.
pub fn decompress(
    payload: &str,
    bytes_per_row: usize,
    total_bytes: usize,
) -> Result<Vec<u8>, PayloadError> {
    let row_chars = bytes_per_row * 2;
    let mut out: Vec<u8> = Vec::with_capacity(total_bytes);
    let mut row: Vec<u8> = Vec::with_capacity(row_chars);
    let mut prev: Option<Vec<u8>> = None;
    let mut count = 0usize;
    let mut count_at = 0usize;

    for (offset, ch) in payload.char_indices() {
        match ch {
            'G'..='Y' => {
                if count == 0 {
                    count_at = offset;
                }
                count += ch as usize - 'G' as usize + 1;
            }
            'g'..='z' => {
                if count == 0 {
                    count_at = offset;
                }
                count += (ch as usize - 'g' as usize + 1) * 20;
            }
            '0'..='9' | 'A'..='F' | 'a'..='f' => {
                let n = count.max(1);
                count = 0;
                if row.len() + n > row_chars {
                    return Err(PayloadError::RowOverrun { offset, row_chars });
                }
                let nibble = ch.to_digit(16).unwrap_or_default() as u8;
                row.resize(row.len() + n, nibble);
                if row.len() == row_chars {
                    prev = Some(finish_row(&mut row, &mut out));
                }
            }
            ',' | '!' => {
                if count != 0 {
                    return Err(PayloadError::DanglingCount { offset: count_at });
                }
                if row_chars == 0 {
                    return Err(PayloadError::UnexpectedChar { ch, offset });
                }
                let nibble = if ch == ',' { 0x0 } else { 0xF };
                row.resize(row_chars, nibble);
                prev = Some(finish_row(&mut row, &mut out));
            }
            ':' => {
                if count != 0 {
                    return Err(PayloadError::DanglingCount { offset: count_at });
                }
                match (&prev, row.is_empty()) {
                    (Some(p), true) => out.extend_from_slice(p),
                    _ => return Err(PayloadError::NothingToRepeat { offset }),
                }
            }
            c if c.is_ascii_whitespace() => {}
            other => return Err(PayloadError::UnexpectedChar { ch: other, offset }),
        }
        if out.len() > total_bytes {
            return Err(PayloadError::LengthMismatch {
                expected: total_bytes,
                actual: out.len(),
            });
        }
    }

    if count != 0 {
        return Err(PayloadError::DanglingCount { offset: count_at });
    }
    if !row.is_empty() || out.len() != total_bytes {
        return Err(PayloadError::LengthMismatch {
            expected: total_bytes,
            actual: out.len() + row.len() / 2,
        });
    }
    Ok(out)
}

fn finish_row(row: &mut Vec<u8>, out: &mut Vec<u8>) -> Vec<u8> {
    let bytes: Vec<u8> = row.chunks_exact(2).map(|p| (p[0] << 4) | p[1]).collect();
    out.extend_from_slice(&bytes);
    row.clear();
    bytes
}

/// The `^GFA` field of a label command, borrowed from the command text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphicField<'a> {
    pub binary_bytes: usize,
    pub total_bytes: usize,
    pub bytes_per_row: usize,
    pub payload: &'a str,
}

impl<'a> GraphicField<'a> {
    /// Locate and parse the first `^GFA,b,c,d,data^FS` in `zpl`.
    pub fn parse(zpl: &'a str) -> Result<Self, PayloadError> {
        let start = zpl.find("^GFA,").ok_or(PayloadError::MissingField)? + "^GFA,".len();
        let rest = &zpl[start..];
        let end = rest.find('^').unwrap_or(rest.len());
        let mut parts = rest[..end].splitn(4, ',');

        let mut number = || -> Result<usize, PayloadError> {
            parts
                .next()
                .and_then(|s| s.trim().parse().ok())
                .ok_or(PayloadError::MissingField)
        };
        let binary_bytes = number()?;
        let total_bytes = number()?;
        let bytes_per_row = number()?;
        let payload = parts.next().ok_or(PayloadError::MissingField)?;

        Ok(Self {
            binary_bytes,
            total_bytes,
            bytes_per_row,
            payload,
        })
    }

    pub fn decode(&self) -> Result<Vec<u8>, PayloadError> {
        decompress(self.payload, self.bytes_per_row, self.total_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bitmap(width: u32, height: u32, f: impl Fn(u32, u32) -> bool) -> MonochromeBitmap {
        let mut bm = MonochromeBitmap::new(width, height);
        for y in 0..height {
            for x in 0..width {
                if f(x, y) {
                    bm.set(x, y, true);
                }
            }
        }
        bm
    }

    fn round_trip(bm: &MonochromeBitmap, compression: Compression) {
        let cmd = ZplEncoder::new(compression).encode(bm, 1).unwrap();
        let field = GraphicField::parse(&cmd.zpl).unwrap();
        assert_eq!(field.total_bytes, bm.total_bytes());
        assert_eq!(field.bytes_per_row, bm.bytes_per_row());
        assert_eq!(field.decode().unwrap(), bm.as_bytes());
    }

    #[test]
    fn count_tokens() {
        let mut s = String::new();
        push_count(1, &mut s);
        assert_eq!(s, "G");
        s.clear();
        push_count(19, &mut s);
        assert_eq!(s, "Y");
        s.clear();
        push_count(20, &mut s);
        assert_eq!(s, "g");
        s.clear();
        push_count(47, &mut s);
        assert_eq!(s, "hM");
        s.clear();
        push_count(400, &mut s);
        assert_eq!(s, "z");
        s.clear();
        push_count(821, &mut s);
        assert_eq!(s, "zzgG");
    }

    #[test]
    fn blank_rows_collapse() {
        // 16 px wide, 3 rows of white: ",::"
        assert_eq!(compress(&[0; 6], 2), ",::");
        // 3 rows of black: "!::"
        assert_eq!(compress(&[0xFF; 6], 2), "!::");
    }

    #[test]
    fn runs_inside_a_row() {
        assert_eq!(compress(&[0xAA, 0xAA, 0x51], 3), "JA51");
        assert_eq!(compress(&[0x12, 0x00, 0x00], 3), "12,");
        assert_eq!(compress(&[0x80, 0xFF], 2), "80!");
    }

    #[test]
    fn hex_payload_is_plain() {
        assert_eq!(encode_payload(&[0x0F, 0xA0], 2, Compression::Hex), "0FA0");
    }

    #[test]
    fn command_block_shape() {
        let bm = bitmap(10, 2, |x, _| x == 0);
        let cmd = ZplEncoder::default().encode(&bm, 7).unwrap();
        assert_eq!(cmd.page_num, 7);
        assert_eq!(cmd.bytes_per_row, 2);
        assert_eq!(cmd.total_bytes, 4);
        assert_eq!(
            cmd.zpl,
            "^XA\n^PW10\n^LL2\n^FO0,0^GFA,4,4,2,8,:^FS\n^XZ\n"
        );
    }

    #[test]
    fn copies_emit_print_quantity() {
        let bm = bitmap(8, 1, |_, _| false);
        let cmd = ZplEncoder::default().copies(3).encode(&bm, 1).unwrap();
        assert!(cmd.zpl.contains("^PQ3\n^XZ"));
        let single = ZplEncoder::default().encode(&bm, 1).unwrap();
        assert!(!single.zpl.contains("^PQ"));
    }

    #[test]
    fn overflow_is_reported() {
        let bm = MonochromeBitmap::new(800, 100); // 10 000 bytes
        let err = ZplEncoder::default()
            .max_field_bytes(9_999)
            .encode(&bm, 4)
            .unwrap_err();
        match err {
            Pdf2ZplError::EncodingOverflow {
                page,
                total_bytes,
                limit,
            } => {
                assert_eq!((page, total_bytes, limit), (4, 10_000, 9_999));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(ZplEncoder::default()
            .max_field_bytes(10_000)
            .encode(&bm, 4)
            .is_ok());
    }

    #[test]
    fn empty_bitmap_is_invalid_geometry() {
        let err = ZplEncoder::default()
            .encode(&MonochromeBitmap::new(0, 5), 1)
            .unwrap_err();
        assert!(matches!(err, Pdf2ZplError::InvalidGeometry { .. }));
    }

    #[test]
    fn encoding_is_idempotent() {
        let bm = bitmap(123, 45, |x, y| (x * y) % 7 == 0);
        let enc = ZplEncoder::default();
        assert_eq!(enc.encode(&bm, 1).unwrap(), enc.encode(&bm, 1).unwrap());
    }

    #[test]
    fn round_trip_small_sizes() {
        for (w, h) in [(1, 1), (7, 1), (8, 1), (9, 3), (16, 16), (17, 5), (64, 2)] {
            for compression in [Compression::Zpl, Compression::Hex] {
                round_trip(&bitmap(w, h, |x, y| (x + 3 * y) % 5 < 2), compression);
                round_trip(&bitmap(w, h, |_, _| true), compression);
                round_trip(&bitmap(w, h, |_, _| false), compression);
            }
        }
    }

    #[test]
    fn round_trip_long_runs() {
        // Runs longer than 400 digits need several 'z' tokens.
        let bm = bitmap(4000, 3, |x, y| y == 1 && x >= 1000);
        round_trip(&bm, Compression::Zpl);
    }

    #[test]
    fn round_trip_large_synthetic_page() {
        // 4000×6000: bands, diagonals and repeated rows.
        let bm = bitmap(4000, 6000, |x, y| {
            ((y / 40) % 3 == 0 && (x / 25) % 2 == 0) || (x + y) % 97 == 0
        });
        round_trip(&bm, Compression::Zpl);
    }

    #[test]
    fn decompress_rejects_garbage() {
        assert_eq!(
            decompress("0G", 1, 1),
            Err(PayloadError::DanglingCount { offset: 1 })
        );
        assert!(matches!(
            decompress(":", 1, 1),
            Err(PayloadError::NothingToRepeat { .. })
        ));
        assert!(matches!(
            decompress("KA", 1, 1),
            Err(PayloadError::RowOverrun { .. })
        ));
        assert!(matches!(
            decompress("0?", 1, 1),
            Err(PayloadError::UnexpectedChar { ch: '?', .. })
        ));
        assert!(matches!(
            decompress(",", 1, 2),
            Err(PayloadError::LengthMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn decompress_accepts_lowercase_and_whitespace() {
        assert_eq!(decompress("ff\n0a", 1, 2).unwrap(), vec![0xFF, 0x0A]);
    }

    #[test]
    fn parse_missing_field() {
        assert_eq!(
            GraphicField::parse("^XA^XZ"),
            Err(PayloadError::MissingField)
        );
    }

    proptest! {
        #[test]
        fn compressed_payload_is_lossless(
            width in 1u32..200,
            rows in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..25), 1..40),
            dup in any::<bool>(),
        ) {
            let bpr = (width as usize).div_ceil(8);
            // Bias towards runs: collapse random bytes into a few values.
            let mut data = Vec::new();
            for (i, r) in rows.iter().enumerate() {
                let mut row: Vec<u8> = (0..bpr)
                    .map(|j| match r.get(j % r.len().max(1)).copied().unwrap_or(0) % 4 {
                        0 => 0x00,
                        1 => 0xFF,
                        2 => 0xAA,
                        _ => r.get(j % r.len().max(1)).copied().unwrap_or(0),
                    })
                    .collect();
                if dup && i % 2 == 1 {
                    row = data[data.len() - bpr..].to_vec();
                }
                data.extend(row);
            }
            let height = rows.len() as u32;
            let bm = MonochromeBitmap::from_packed(width, height, data).unwrap();

            for compression in [Compression::Zpl, Compression::Hex] {
                let payload = encode_payload(bm.as_bytes(), bpr, compression);
                let decoded = decompress(&payload, bpr, bm.total_bytes()).unwrap();
                prop_assert_eq!(decoded.as_slice(), bm.as_bytes());
            }
        }
    }
}
