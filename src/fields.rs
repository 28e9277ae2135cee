// SPDX-License-Identifier: MIT

//! The fields of a report as declared by the report descriptor.
//!
//! [DescriptorUsages] walks the descriptor alone and yields the usage and
//! the bit position of every field of one [ReportType], across all Report
//! IDs. This is enough to build an Output report or to find the field of a
//! given usage without any report at hand. [crate::ReportParser] uses the same
//! walk to extract the values from a report.

use std::iter::FusedIterator;
use std::ops::Range;

use crate::globals::Globals;
use crate::hid::{DescriptorItem, ItemType, MainDataItem};
use crate::query::report_bits;
use crate::types::*;
use crate::usage::UsageResolver;
use crate::{ParserError, ReportType};

/// A single field of a report as declared in the report descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorUsage {
    pub usage_page: UsagePage,
    /// For variable fields this is the usage of the field. For array fields
    /// this is the first usage of the array, the actual usage is the value
    /// in the report.
    pub usage_id: UsageId,
    pub report_id: Option<ReportId>,
    /// The bits of this field, counted from the start of the report data.
    /// The Report ID prefix byte is not included.
    pub bits: Range<usize>,
    pub logical_minimum: LogicalMinimum,
    /// The flags of the Input, Output or Feature item of this field
    pub flags: MainDataItem,
}

impl DescriptorUsage {
    /// Values of this field are signed if the Logical Minimum is negative.
    /// Array fields are never signed.
    pub fn is_signed(&self) -> bool {
        self.flags.is_variable() && self.logical_minimum.is_signed()
    }
}

/// One step of the walk: a field or bits without a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Step {
    Field(DescriptorUsage),
    /// Constant fields and fields without a usage
    Skip {
        report_id: Option<ReportId>,
        bits: Range<usize>,
    },
}

#[derive(Debug, Clone, Copy)]
enum Selection<'a> {
    All,
    /// Only the fields that are part of this report
    Report(&'a [u8]),
}

impl Selection<'_> {
    fn accepts(&self, report_id: Option<ReportId>) -> bool {
        match (self, report_id) {
            (_, None) | (Selection::All, _) => true,
            (Selection::Report(report), Some(id)) => id.matches(report),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ScanForItem,
    UsagesAvailable,
    Complete,
}

/// Iterator over the fields of one [ReportType] declared in a report
/// descriptor.
///
/// ```
/// # use hidfields::*;
/// // Find the Caps Lock LED of a keyboard
/// # fn func(descriptor: &[u8]) {
/// let caps_lock = DescriptorUsages::new(descriptor, ReportType::Output)
///     .find(|f| f.usage_page == UsagePage(0x08) && f.usage_id == UsageId(0x02));
/// if let Some(led) = caps_lock {
///     println!("Caps Lock is bit {} of report {:?}", led.bits.start, led.report_id);
/// }
/// # }
/// ```
///
/// The walk stops at the first malformed item or at the first
/// Input/Output/Feature item without any usage, see
/// [DescriptorUsages::error].
#[derive(Debug, Clone)]
pub struct DescriptorUsages<'a> {
    descriptor: &'a [u8],
    report_type: ReportType,
    selection: Selection<'a>,
    /// Offset of the next item, or of the current Main item while
    /// its fields are handed out.
    descriptor_pos: usize,
    /// Offset of the first item not yet scanned for usages
    usage_pos: usize,
    globals: Globals,
    usages: UsageResolver,
    /// Bit position in the report data of the current Report ID
    bit_pos: usize,
    main_item: MainDataItem,
    main_item_size: usize,
    required_usages: usize,
    /// The first usage of an array, taken at the start of the Main item
    array_usage: ExtendedUsage,
    /// Orphan bits after the field just handed out
    pending: Option<Step>,
    state: State,
    error: Option<ParserError>,
}

impl<'a> DescriptorUsages<'a> {
    pub fn new(descriptor: &'a [u8], report_type: ReportType) -> Self {
        DescriptorUsages::with_selection(descriptor, report_type, Selection::All)
    }

    /// Walk only the fields of the given report. Fields of any other
    /// Report ID are skipped before their usages are looked at.
    pub(crate) fn for_report(
        descriptor: &'a [u8],
        report_type: ReportType,
        report: &'a [u8],
    ) -> Self {
        DescriptorUsages::with_selection(descriptor, report_type, Selection::Report(report))
    }

    fn with_selection(
        descriptor: &'a [u8],
        report_type: ReportType,
        selection: Selection<'a>,
    ) -> Self {
        DescriptorUsages {
            descriptor,
            report_type,
            selection,
            descriptor_pos: 0,
            usage_pos: 0,
            globals: Globals::default(),
            usages: UsageResolver::default(),
            bit_pos: 0,
            main_item: MainDataItem::default(),
            main_item_size: 0,
            required_usages: 0,
            array_usage: ExtendedUsage::default(),
            pending: None,
            state: State::ScanForItem,
            error: None,
        }
    }

    /// The error that ended the walk early, if any.
    pub fn error(&self) -> Option<&ParserError> {
        self.error.as_ref()
    }

    pub(crate) fn next_step(&mut self) -> Option<Step> {
        if let Some(step) = self.pending.take() {
            return Some(step);
        }
        loop {
            match self.state {
                State::Complete => return None,
                State::UsagesAvailable => return Some(self.next_field()),
                State::ScanForItem => {
                    if let Some(step) = self.scan_item() {
                        return Some(step);
                    }
                }
            }
        }
    }

    /// Process the item at the current position.
    fn scan_item(&mut self) -> Option<Step> {
        if self.descriptor_pos >= self.descriptor.len() {
            self.state = State::Complete;
            return None;
        }
        let item = match DescriptorItem::decode(self.descriptor, self.descriptor_pos) {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!("{e}");
                self.error = Some(e);
                self.state = State::Complete;
                return None;
            }
        };
        match item.item_type() {
            ItemType::Global(global) => {
                if self.globals.update(&global) {
                    // a Report ID may be split over several blocks
                    let id = self.globals.report_id.0;
                    let before = &self.descriptor[..self.descriptor_pos];
                    self.bit_pos = report_bits(id, self.report_type, before).unwrap_or(0);
                }
            }
            ItemType::Main(main) => {
                let step = self
                    .report_type
                    .data_item(&main)
                    .and_then(|data_item| self.start_main_item(&item, data_item));
                if self.state == State::ScanForItem {
                    self.end_main_item(item.size());
                }
                return step;
            }
            ItemType::Local(_) | ItemType::Long { .. } | ItemType::Reserved { .. } => {}
        }
        self.descriptor_pos += item.size();
        None
    }

    fn start_main_item(&mut self, item: &DescriptorItem, data_item: MainDataItem) -> Option<Step> {
        let report_id = self.globals.report_id();
        if !self.selection.accepts(report_id) {
            tracing::trace!("skipping fields of Report ID {}", self.globals.report_id);
            return None;
        }
        if data_item.is_constant() {
            let bits = self.consume_bits(self.globals.item_bits());
            return Some(Step::Skip { report_id, bits });
        }
        if self.globals.report_count.0 == 0 {
            return None;
        }

        self.main_item = data_item;
        self.main_item_size = item.size();
        self.required_usages = self.globals.report_count.0;
        self.usage_pos = self
            .usages
            .scan(self.descriptor, self.usage_pos, self.descriptor_pos);

        if self.usages.available() == 0 {
            let e = ParserError::UnresolvedUsages {
                offset: item.offset(),
            };
            tracing::debug!("{e}");
            self.error = Some(e);
            self.state = State::Complete;
        } else {
            self.array_usage = self.usages.current();
            self.state = State::UsagesAvailable;
        }
        None
    }

    fn next_field(&mut self) -> Step {
        let size = self.globals.report_size.0;
        let bits = self.consume_bits(size);
        self.required_usages -= 1;

        let usage = if self.main_item.is_variable() {
            self.usages.next_usage()
        } else {
            if self.required_usages == 0 {
                self.usages.clear();
            }
            self.array_usage
        };
        let report_id = self.globals.report_id();
        let field = DescriptorUsage {
            usage_page: usage.usage_page(),
            usage_id: usage.usage_id(),
            report_id,
            bits,
            logical_minimum: self.globals.logical_minimum,
            flags: self.main_item,
        };

        if self.required_usages > 0 && self.usages.available() == 0 {
            self.usage_pos = self
                .usages
                .scan(self.descriptor, self.usage_pos, self.descriptor_pos);
            if self.usages.available() == 0 {
                tracing::debug!(
                    "skipping {} fields without usage at offset {}",
                    self.required_usages,
                    self.descriptor_pos
                );
                let bits = self.consume_bits(size.saturating_mul(self.required_usages));
                self.pending = Some(Step::Skip { report_id, bits });
                self.required_usages = 0;
            }
        }

        if self.required_usages == 0 {
            self.end_main_item(self.main_item_size);
        }

        Step::Field(field)
    }

    /// Move past the Main item at the current position, the usages
    /// for the next Main item start after it.
    fn end_main_item(&mut self, item_size: usize) {
        self.descriptor_pos += item_size;
        self.usage_pos = self.descriptor_pos;
        self.usages.reset(self.globals.usage_page);
        self.required_usages = 0;
        self.state = State::ScanForItem;
    }

    fn consume_bits(&mut self, nbits: usize) -> Range<usize> {
        let start = self.bit_pos;
        self.bit_pos = self.bit_pos.saturating_add(nbits);
        start..self.bit_pos
    }
}

impl Iterator for DescriptorUsages<'_> {
    type Item = DescriptorUsage;

    fn next(&mut self) -> Option<DescriptorUsage> {
        loop {
            if let Step::Field(usage) = self.next_step()? {
                return Some(usage);
            }
        }
    }
}

impl FusedIterator for DescriptorUsages<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    type Usage = (u16, u16, Option<u16>, Range<usize>);

    fn usages(descriptor: &[u8], report_type: ReportType) -> Vec<Usage> {
        DescriptorUsages::new(descriptor, report_type)
            .map(|u| (u.usage_page.0, u.usage_id.0, u.report_id.map(|id| id.0), u.bits))
            .collect()
    }

    #[test]
    fn variable_fields() {
        // Usage Page (Button), Usage Min (1), Usage Max (3), Report Size (1),
        // Report Count (3), Input (Data,Var,Abs), Report Size (5), Report Count (1),
        // Input (Const), Usage Page (Generic Desktop), Usage (X), Logical Min (-127),
        // Report Size (8), Input (Data,Var,Rel)
        let descriptor = [
            0x05, 0x09, 0x19, 0x01, 0x29, 0x03, 0x75, 0x01, 0x95, 0x03, 0x81, 0x02, 0x75, 0x05,
            0x95, 0x01, 0x81, 0x01, 0x05, 0x01, 0x09, 0x30, 0x15, 0x81, 0x75, 0x08, 0x81, 0x06,
        ];
        assert_eq!(
            usages(&descriptor, ReportType::Input),
            vec![
                (0x9, 1, None, 0..1),
                (0x9, 2, None, 1..2),
                (0x9, 3, None, 2..3),
                (0x1, 0x30, None, 8..16),
            ]
        );

        let x = DescriptorUsages::new(&descriptor, ReportType::Input).last().unwrap();
        assert!(x.is_signed());
        assert!(x.flags.is_relative());
        assert!(usages(&descriptor, ReportType::Output).is_empty());
    }

    #[test]
    fn all_report_ids() {
        // Report ID (1), Usage Page (Generic Desktop), Usage (X), Report Size (8),
        // Report Count (1), Input, Report ID (2), Usage (Y), Input
        let descriptor = [
            0x85, 0x01, 0x05, 0x01, 0x09, 0x30, 0x75, 0x08, 0x95, 0x01, 0x81, 0x02, 0x85, 0x02,
            0x09, 0x31, 0x81, 0x02,
        ];
        // every Report ID starts at bit 0
        assert_eq!(
            usages(&descriptor, ReportType::Input),
            vec![(0x1, 0x30, Some(1), 0..8), (0x1, 0x31, Some(2), 0..8)]
        );
    }

    #[test]
    fn split_report_id() {
        // Report ID (1), Usage (X), Input, Report ID (2), Usage (Y), Input,
        // Report ID (1), Usage (Wheel), Input
        let descriptor = [
            0x85, 0x01, 0x05, 0x01, 0x09, 0x30, 0x75, 0x08, 0x95, 0x01, 0x81, 0x02, 0x85, 0x02,
            0x09, 0x31, 0x81, 0x02, 0x85, 0x01, 0x09, 0x38, 0x81, 0x02,
        ];
        assert_eq!(
            usages(&descriptor, ReportType::Input),
            vec![
                (0x1, 0x30, Some(1), 0..8),
                (0x1, 0x31, Some(2), 0..8),
                (0x1, 0x38, Some(1), 8..16),
            ]
        );
    }

    #[test]
    fn array_fields() {
        // Usage Page (Keyboard), Usage Min (0), Usage Max (101), Report Size (8),
        // Report Count (2), Input (Data,Arr,Abs)
        let descriptor = [0x05, 0x07, 0x19, 0x00, 0x29, 0x65, 0x75, 0x08, 0x95, 0x02, 0x81, 0x00];
        let fields: Vec<DescriptorUsage> =
            DescriptorUsages::new(&descriptor, ReportType::Input).collect();
        assert_eq!(fields.len(), 2);
        assert!(fields.iter().all(|f| f.flags.is_array() && !f.is_signed()));
        assert!(fields.iter().all(|f| f.usage_id == UsageId(0)));
        assert_eq!(fields[1].bits, 8..16);
    }

    #[test]
    fn orphan_bits() {
        // Usage Page (Button), Usage (1), Report Size (1), Report Count (4), Input,
        // Usage (2), Report Count (1), Input
        let descriptor = [
            0x05, 0x09, 0x09, 0x01, 0x75, 0x01, 0x95, 0x04, 0x81, 0x02, 0x09, 0x02, 0x95, 0x01,
            0x81, 0x02,
        ];
        let mut walk = DescriptorUsages::new(&descriptor, ReportType::Input);
        let mut steps = Vec::new();
        while let Some(step) = walk.next_step() {
            steps.push(step);
        }
        assert_eq!(steps.len(), 3);
        assert!(matches!(&steps[0], Step::Field(f) if f.bits == (0..1)));
        assert_eq!(
            steps[1],
            Step::Skip {
                report_id: None,
                bits: 1..4
            }
        );
        assert!(matches!(
            &steps[2],
            Step::Field(f) if f.usage_id == UsageId(2) && f.bits == (4..5)
        ));
    }

    #[test]
    fn selected_report() {
        // Report ID (1), Input without usages, Report ID (2), Usage (X), Input
        let descriptor = [
            0x85, 0x01, 0x75, 0x08, 0x95, 0x01, 0x81, 0x02, 0x85, 0x02, 0x05, 0x01, 0x09, 0x30,
            0x81, 0x02,
        ];
        let mut all = DescriptorUsages::new(&descriptor, ReportType::Input);
        assert_eq!(all.next(), None);
        assert_eq!(all.error(), Some(&ParserError::UnresolvedUsages { offset: 6 }));

        // fields of other reports are skipped before their usages are needed
        let report = [0x02, 0x10];
        let mut selected = DescriptorUsages::for_report(&descriptor, ReportType::Input, &report);
        let x = selected.next().unwrap();
        assert_eq!(x.report_id, Some(ReportId(2)));
        assert_eq!(x.bits, 0..8);
        assert_eq!(selected.next(), None);
        assert_eq!(selected.error(), None);
    }

    #[test]
    fn malformed() {
        // Usage (X), Report Size (8), Report Count (1), Input, Report Count (2 bytes, truncated)
        let descriptor = [0x09, 0x30, 0x75, 0x08, 0x95, 0x01, 0x81, 0x02, 0x96, 0x01];
        let mut walk = DescriptorUsages::new(&descriptor, ReportType::Input);
        assert!(walk.next().is_some());
        assert!(walk.next().is_none());
        assert!(walk.next().is_none());
        assert_eq!(walk.error(), Some(&ParserError::MalformedDescriptor { offset: 8 }));
    }
}
