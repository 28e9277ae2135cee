// SPDX-License-Identifier: MIT

//! The global item state table, see Section 6.2.2.7.

use crate::hid::GlobalItem;
use crate::types::*;

/// The currently active global values. Only the values that affect
/// how a report is split into fields are tracked.
///
/// Push and Pop are recognized but the state table is not stacked,
/// a Pop does not restore the values at the time of the Push.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Globals {
    pub usage_page: UsagePage,
    pub logical_minimum: LogicalMinimum,
    pub logical_maximum: LogicalMaximum,
    pub report_size: ReportSize,
    pub report_count: ReportCount,
    pub report_id: ReportId,
}

impl Globals {
    /// Apply the given global item. Returns true if the Report ID changed,
    /// i.e. a new report begins.
    pub fn update(&mut self, item: &GlobalItem) -> bool {
        match item {
            GlobalItem::UsagePage(usage_page) => self.usage_page = *usage_page,
            GlobalItem::LogicalMinimum(minimum) => self.logical_minimum = *minimum,
            GlobalItem::LogicalMaximum(maximum) => self.logical_maximum = *maximum,
            GlobalItem::ReportSize(size) => self.report_size = *size,
            GlobalItem::ReportCount(count) => self.report_count = *count,
            GlobalItem::ReportId(id) => {
                let changed = self.report_id != *id;
                self.report_id = *id;
                return changed;
            }
            GlobalItem::Push | GlobalItem::Pop => {
                tracing::debug!("ignoring {item:?}, the global state table is not stacked");
            }
            GlobalItem::PhysicalMinimum(_)
            | GlobalItem::PhysicalMaximum(_)
            | GlobalItem::UnitExponent(_)
            | GlobalItem::Unit(_)
            | GlobalItem::Reserved { .. } => {}
        }
        false
    }

    /// The number of bits taken up by the next Main item.
    pub fn item_bits(&self) -> usize {
        self.report_size.0.saturating_mul(self.report_count.0)
    }

    /// The Report ID unless it is the "no Report ID" value 0.
    pub fn report_id(&self) -> Option<ReportId> {
        match self.report_id {
            ReportId(0) => None,
            id => Some(id),
        }
    }
}
