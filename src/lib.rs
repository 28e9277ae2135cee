// SPDX-License-Identifier: MIT

//! A parser for HID Reports, driven by the HID Report Descriptor of the device.
//!
//! The HID Report Descriptor describes the layout of every report the device
//! sends or accepts. This crate walks the descriptor and the raw report bytes
//! side by side and produces one [Field] per data field in the report, i.e. a
//! `(usage page, usage, value)` triple. Constant (padding) fields are skipped.
//!
//! ```
//! use hidfields::{ReportParser, ReportType};
//!
//! // A 3-button mouse with relative X/Y axes
//! let descriptor: &[u8] = &[
//!     0x05, 0x01, 0x09, 0x02, 0xA1, 0x01, 0x09, 0x01, 0xA0, 0x05, 0x09, 0x19, 0x01, 0x29,
//!     0x03, 0x14, 0x25, 0x01, 0x75, 0x01, 0x95, 0x03, 0x81, 0x02, 0x75, 0x05, 0x95, 0x01,
//!     0x81, 0x01, 0x05, 0x01, 0x09, 0x30, 0x09, 0x31, 0x15, 0x81, 0x25, 0x7F, 0x75, 0x08,
//!     0x95, 0x02, 0x81, 0x06, 0xC0, 0xC0,
//! ];
//! let report: &[u8] = &[0x03, 0xFE, 0xFD];
//!
//! let mut parser = ReportParser::new(descriptor, ReportType::Input, report);
//! while parser.has_more() {
//!     let field = parser.get_field().unwrap();
//!     println!("{:04x}:{:04x} = {}", field.usage_page.0, field.usage_id.0, field.value);
//! }
//! ```
//!
//! Neither the descriptor nor the report is trusted. The parser never reads
//! out of bounds and never allocates, a malformed descriptor ends the parse
//! early with an error available from [ReportParser::error].
//!
//! [DescriptorUsages] walks the descriptor alone and lists the usage and
//! bit position of every field, e.g. to find the Caps Lock LED before
//! building an Output report. The [query] functions answer questions about
//! the descriptor as a whole, e.g. the expected size of a report.
//!
//! In this document and unless stated otherwise, a reference to "Section a.b.c" refers to the
//! [HID Device Class Definition for HID 1.11](https://www.usb.org/document-library/device-class-definition-hid-111).

use thiserror::Error;

mod fields;
mod globals;
pub mod hid;
mod parser;
pub mod query;
mod report;
pub mod types;
mod usage;

use hid::{MainDataItem, MainItem};

pub use fields::{DescriptorUsage, DescriptorUsages};
pub use parser::{Field, ReportParser};
pub use query::{
    report_id_declared, report_id_valid, report_size_for_id, validate_report, ReportIdStatus,
    NO_REPORT_ID,
};
pub use types::*;

/// The type of report to parse, see Section 7.2.1. Only the
/// Main items of that type create fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportType {
    Input,
    Output,
    Feature,
}

impl ReportType {
    /// Returns the data item flags if the given Main item is of this report type.
    pub(crate) fn data_item(&self, item: &MainItem) -> Option<MainDataItem> {
        match (self, item) {
            (ReportType::Input, MainItem::Input(i))
            | (ReportType::Output, MainItem::Output(i))
            | (ReportType::Feature, MainItem::Feature(i)) => Some(*i),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParserError {
    #[error("Malformed report descriptor: item at offset {offset} exceeds the descriptor")]
    MalformedDescriptor { offset: usize },
    #[error("No usage for the main item at offset {offset}")]
    UnresolvedUsages { offset: usize },
    #[error("No more fields in this report")]
    NoMoreFields,
    #[error("Report ID {id} is not declared in the report descriptor")]
    InvalidReportId { id: u16 },
    #[error("Report too short: expected {expected} bytes, got {actual}")]
    ReportTooShort { expected: usize, actual: usize },
    #[error("Report size mismatch: expected {expected} bytes, got {actual}")]
    ReportSizeMismatch { expected: usize, actual: usize },
}

pub(crate) type Result<T> = std::result::Result<T, ParserError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::{DescriptorItem, ItemType};

    #[test]
    fn report_type_filter() {
        let input = DescriptorItem::try_from([0x81, 0x02].as_slice()).unwrap();
        let ItemType::Main(main) = input.item_type() else {
            panic!("Wrong item type");
        };
        assert!(ReportType::Input.data_item(&main).is_some());
        assert!(ReportType::Output.data_item(&main).is_none());
        assert!(ReportType::Feature.data_item(&main).is_none());

        let feature = DescriptorItem::try_from([0xB1, 0x03].as_slice()).unwrap();
        let ItemType::Main(main) = feature.item_type() else {
            panic!("Wrong item type");
        };
        let flags = ReportType::Feature.data_item(&main).unwrap();
        assert!(flags.is_constant());
        assert!(ReportType::Input.data_item(&main).is_none());

        let collection = DescriptorItem::try_from([0xA1, 0x01].as_slice()).unwrap();
        let ItemType::Main(main) = collection.item_type() else {
            panic!("Wrong item type");
        };
        assert!(ReportType::Input.data_item(&main).is_none());
    }

    #[test]
    fn error_messages() {
        let e = ParserError::MalformedDescriptor { offset: 7 };
        assert_eq!(
            format!("{e}"),
            "Malformed report descriptor: item at offset 7 exceeds the descriptor"
        );
        let e = ParserError::ReportTooShort {
            expected: 3,
            actual: 2,
        };
        assert_eq!(format!("{e}"), "Report too short: expected 3 bytes, got 2");
    }
}
