// SPDX-License-Identifier: MIT

//! Queries over a whole report descriptor.
//!
//! These do not need a report, they answer questions like "how long is
//! the Input report with Report ID 2" that a device needs to answer to
//! validate a report before parsing it.

use crate::globals::Globals;
use crate::hid::{DescriptorItems, GlobalItem, ItemType};
use crate::{ParserError, ReportType, Result};

/// The Report ID value meaning "no Report ID". HID reserves Report ID 0,
/// a descriptor without Report ID items uses this value throughout.
pub const NO_REPORT_ID: u16 = 0;

/// Classification of a Report ID against a report descriptor,
/// see [report_id_valid].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportIdStatus {
    /// The Report ID is declared, or the descriptor has no Report IDs
    /// and [NO_REPORT_ID] was given.
    Valid,
    /// The descriptor declares Report IDs but not this one, or the
    /// descriptor is malformed.
    Invalid,
    /// The Report ID does not fit the descriptor's use of Report IDs:
    /// [NO_REPORT_ID] for a descriptor that declares Report IDs or a
    /// Report ID for a descriptor that declares none.
    Undeclared,
}

/// The size in bytes of the report of the given type and Report ID,
/// excluding the Report ID prefix byte. Use [NO_REPORT_ID] for a descriptor
/// without Report IDs.
///
/// The fields of a Report ID may be declared in several blocks, the
/// whole descriptor is taken into account.
///
/// Returns 0 if there is no such report or the descriptor is malformed.
pub fn report_size_for_id(report_id: u16, report_type: ReportType, descriptor: &[u8]) -> usize {
    report_bits(report_id, report_type, descriptor).map_or(0, |bits| bits.div_ceil(8))
}

/// The number of bits the Main items of the given type and Report ID
/// declare, or `None` if the descriptor is malformed.
pub(crate) fn report_bits(
    report_id: u16,
    report_type: ReportType,
    descriptor: &[u8],
) -> Option<usize> {
    let mut globals = Globals::default();
    let mut total_bits: usize = 0;

    for item in DescriptorItems::new(descriptor) {
        let item = item.ok()?;
        match item.item_type() {
            ItemType::Global(global) => {
                globals.update(&global);
            }
            ItemType::Main(main) => {
                if globals.report_id.0 == report_id && report_type.data_item(&main).is_some() {
                    total_bits = total_bits.saturating_add(globals.item_bits());
                }
            }
            _ => {}
        }
    }

    Some(total_bits)
}

/// Classify the given Report ID, see [ReportIdStatus].
///
/// ```
/// # use hidfields::*;
/// // Usage Page (Generic Desktop), Report ID (1)
/// let descriptor = [0x05, 0x01, 0x85, 0x01];
/// assert_eq!(report_id_valid(1, &descriptor), ReportIdStatus::Valid);
/// assert_eq!(report_id_valid(2, &descriptor), ReportIdStatus::Invalid);
/// assert_eq!(report_id_valid(NO_REPORT_ID, &descriptor), ReportIdStatus::Undeclared);
/// ```
pub fn report_id_valid(report_id: u16, descriptor: &[u8]) -> ReportIdStatus {
    let mut declared = false;
    for item in DescriptorItems::new(descriptor) {
        match item {
            Ok(item) => {
                if let ItemType::Global(GlobalItem::ReportId(id)) = item.item_type() {
                    if id.0 == report_id {
                        return ReportIdStatus::Valid;
                    }
                    declared = true;
                }
            }
            Err(_) => return ReportIdStatus::Invalid,
        }
    }

    match (report_id == NO_REPORT_ID, declared) {
        (true, false) => ReportIdStatus::Valid,
        (false, true) => ReportIdStatus::Invalid,
        _ => ReportIdStatus::Undeclared,
    }
}

/// True if the descriptor contains at least one Report ID item, i.e. all
/// reports are prefixed with their Report ID.
pub fn report_id_declared(descriptor: &[u8]) -> bool {
    DescriptorItems::new(descriptor)
        .map_while(|item| item.ok())
        .any(|item| matches!(item.item_type(), ItemType::Global(GlobalItem::ReportId(_))))
}

/// Check that a report (including its Report ID prefix byte, if any) has
/// the size the descriptor declares for it, e.g. before handling a
/// SET_REPORT request.
pub fn validate_report(report_type: ReportType, descriptor: &[u8], report: &[u8]) -> Result<()> {
    let (report_id, payload) = if report_id_declared(descriptor) {
        let Some((id, payload)) = report.split_first() else {
            return Err(ParserError::ReportTooShort {
                expected: 1,
                actual: 0,
            });
        };
        let id = u16::from(*id);
        if report_id_valid(id, descriptor) == ReportIdStatus::Invalid {
            return Err(ParserError::InvalidReportId { id });
        }
        (id, payload)
    } else {
        (NO_REPORT_ID, report)
    };

    let expected = report_size_for_id(report_id, report_type, descriptor);
    let actual = payload.len();
    if expected > 0 && actual < expected {
        return Err(ParserError::ReportTooShort { expected, actual });
    }
    if expected == 0 || actual != expected {
        return Err(ParserError::ReportSizeMismatch { expected, actual });
    }

    tracing::trace!(report_id, expected, "valid {report_type:?} report");
    Ok(())
}
