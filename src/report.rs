// SPDX-License-Identifier: MIT

//! Reading bit fields out of a HID report.

use std::ops::Range;

/// A value extracted from the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BitField {
    /// The bits in the report this value was read from
    pub bits: Range<usize>,
    /// The raw value, at most the low 32 bits of the field
    pub raw: u32,
    /// The value, sign-extended if read as signed
    pub value: i32,
}

/// Reads fields out of the report bytes.
///
/// Reads past the end of the report are clamped, missing bytes read as zero.
/// The reader keeps track of how far into the report the fields reach.
#[derive(Debug, Clone)]
pub(crate) struct ReportReader<'a> {
    report: &'a [u8],
    /// The end of the furthest field read or skipped
    bit_pos: usize,
    truncated: bool,
}

impl<'a> ReportReader<'a> {
    pub fn new(report: &'a [u8]) -> Self {
        ReportReader {
            report,
            bit_pos: 0,
            truncated: false,
        }
    }

    pub fn bit_position(&self) -> usize {
        self.bit_pos
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Mark the given bits as consumed without reading them.
    pub fn skip(&mut self, bits: &Range<usize>) {
        self.bit_pos = self.bit_pos.max(bits.end);
        if !self.truncated && bits.end > self.report.len().saturating_mul(8) {
            tracing::debug!(
                "report of {} bytes is shorter than its fields, {} bits needed",
                self.report.len(),
                bits.end
            );
            self.truncated = true;
        }
    }

    /// Read the given bits, little endian. Fields wider than 32 bits
    /// only return their low 32 bits.
    pub fn read(&mut self, bits: Range<usize>, signed: bool) -> BitField {
        self.skip(&bits);
        let start = bits.start;
        let width = bits.len().min(32);
        if width == 0 {
            return BitField {
                bits,
                raw: 0,
                value: 0,
            };
        }

        let len = self.report.len();
        let pos_start = (start / 8).min(len);
        let pos_end = (start.saturating_add(width - 1) / 8).min(len);
        let bytes = (pos_start..=pos_end)
            .enumerate()
            .fold(0u64, |acc, (i, idx)| {
                let byte = self.report.get(idx).copied().unwrap_or(0);
                acc | (byte as u64) << (8 * i)
            });
        let raw = ((bytes >> (start % 8)) & ((1u64 << width) - 1)) as u32;

        let value = if signed && raw & (1 << (width - 1)) != 0 {
            (raw as i64 - (1i64 << width)) as i32
        } else {
            raw as i32
        };

        BitField { bits, raw, value }
    }
}
