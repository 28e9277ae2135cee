// SPDX-License-Identifier: MIT

//! Extracting the fields of a report.
//!
//! [ReportParser] drives a [DescriptorUsages] walk restricted to the
//! report at hand and reads every field it yields out of the report.
//! The walk is a small state machine: it scans items until an
//! Input/Output/Feature item with fields is found, hands out one field
//! per Report Count while usages are available, and is complete once the
//! descriptor is exhausted or an error occurs. The parser always holds
//! the next field, bits without a field are skipped as soon as they are
//! reached.

use std::iter::FusedIterator;
use std::ops::Range;

use crate::fields::{DescriptorUsage, DescriptorUsages, Step};
use crate::report::ReportReader;
use crate::types::*;
use crate::{ParserError, ReportType, Result};

/// A single data field extracted from a HID report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub usage_page: UsagePage,
    /// For variable fields this is the usage declared in the report descriptor,
    /// for array fields it is the value in the report (e.g. the key code).
    pub usage_id: UsageId,
    /// The value of a variable field, or `1` for an array field.
    pub value: i32,
    /// The bits in the report this field was read from, including the
    /// Report ID prefix byte in the count.
    pub bits: Range<usize>,
    pub report_id: Option<ReportId>,
}

impl Field {
    /// The usage of this field as defined in the HID Usage Tables,
    /// if it is a known usage.
    #[cfg(feature = "hut")]
    pub fn hut_usage(&self) -> Option<hut::Usage> {
        hut::Usage::new_from_page_and_id(self.usage_page.0, self.usage_id.0).ok()
    }
}

impl From<&Field> for (u16, u16, i32) {
    fn from(f: &Field) -> (u16, u16, i32) {
        (f.usage_page.0, f.usage_id.0, f.value)
    }
}

impl From<Field> for (u16, u16, i32) {
    fn from(f: Field) -> (u16, u16, i32) {
        <(u16, u16, i32)>::from(&f)
    }
}

/// Walks a report descriptor and a report of the given [ReportType],
/// one field at a time.
///
/// ```
/// # use hidfields::*;
/// # fn func(descriptor: &[u8], report: &[u8]) {
/// let parser = ReportParser::new(descriptor, ReportType::Input, report);
/// for field in parser {
///     let (usage_page, usage_id, value): (u16, u16, i32) = field.into();
///     println!("{usage_page:04x}:{usage_id:04x} {value}");
/// }
/// # }
/// ```
///
/// Parsing stops at the first malformed item in the descriptor or at the
/// first Input/Output/Feature item without any usage. Fields produced until
/// then remain valid, the reason is available via [ReportParser::error].
#[derive(Debug, Clone)]
pub struct ReportParser<'a> {
    usages: DescriptorUsages<'a>,
    reader: ReportReader<'a>,
    /// The field [ReportParser::get_field] returns next
    next: Option<DescriptorUsage>,
}

impl<'a> ReportParser<'a> {
    pub fn new(descriptor: &'a [u8], report_type: ReportType, report: &'a [u8]) -> Self {
        let mut parser = ReportParser {
            usages: DescriptorUsages::for_report(descriptor, report_type, report),
            reader: ReportReader::new(report),
            next: None,
        };
        parser.scan_fields();
        parser
    }

    /// True if [ReportParser::get_field] will return another field.
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }

    /// The error that ended parsing early, if any.
    pub fn error(&self) -> Option<&ParserError> {
        self.usages.error()
    }

    /// The current position in the report in bits.
    pub fn bit_position(&self) -> usize {
        self.reader.bit_position()
    }

    /// True if the report is shorter than the fields read so far.
    pub fn is_truncated(&self) -> bool {
        self.reader.is_truncated()
    }

    /// Return the next field. Once all fields are consumed this returns
    /// [ParserError::NoMoreFields] without changing any state.
    pub fn get_field(&mut self) -> Result<Field> {
        let Some(usage) = self.next.take() else {
            return Err(ParserError::NoMoreFields);
        };

        let bits = with_prefix(usage.report_id, &usage.bits);
        let extracted = self.reader.read(bits, usage.is_signed());
        let (usage_id, value) = if usage.flags.is_variable() {
            (usage.usage_id, extracted.value)
        } else {
            (UsageId(extracted.raw as u16), 1)
        };
        let field = Field {
            usage_page: usage.usage_page,
            usage_id,
            value,
            bits: extracted.bits,
            report_id: usage.report_id,
        };

        self.scan_fields();
        Ok(field)
    }

    /// Skip ahead to the next field, consuming the bits of everything
    /// in between.
    fn scan_fields(&mut self) {
        while let Some(step) = self.usages.next_step() {
            match step {
                Step::Field(usage) => {
                    self.next = Some(usage);
                    return;
                }
                Step::Skip { report_id, bits } => {
                    self.reader.skip(&with_prefix(report_id, &bits));
                }
            }
        }
    }
}

/// Bits in the report data shifted past the Report ID prefix byte, if any.
fn with_prefix(report_id: Option<ReportId>, bits: &Range<usize>) -> Range<usize> {
    let offset = if report_id.is_some() { 8 } else { 0 };
    bits.start.saturating_add(offset)..bits.end.saturating_add(offset)
}

impl Iterator for ReportParser<'_> {
    type Item = Field;

    fn next(&mut self) -> Option<Field> {
        self.get_field().ok()
    }
}

impl FusedIterator for ReportParser<'_> {}
