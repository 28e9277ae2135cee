// SPDX-License-Identifier: MIT

use hidfields::hid::{DescriptorItems, GlobalItem, ItemType};
use hidfields::{report_size_for_id, DescriptorUsages, ReportParser, ReportType, NO_REPORT_ID};

/// Walk every report the descriptor declares with an all-zero report of
/// the declared size and check the parser consumes exactly that size.
/// The fields listed from the descriptor alone must fit the same size.
fn check_report_descriptor(bytes: &[u8], filename: &str) {
    let mut ids: Vec<u16> = DescriptorItems::new(bytes)
        .map_while(|item| item.ok())
        .filter_map(|item| match item.item_type() {
            ItemType::Global(GlobalItem::ReportId(id)) => Some(id.0),
            _ => None,
        })
        .collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        ids.push(NO_REPORT_ID);
    }

    for report_type in [ReportType::Input, ReportType::Output, ReportType::Feature] {
        for id in &ids {
            let size = report_size_for_id(*id, report_type, bytes);
            let mut report = vec![0u8; size];
            if *id != NO_REPORT_ID {
                report.insert(0, *id as u8);
            }
            let prefix_bits = if *id != NO_REPORT_ID { 8 } else { 0 };

            let mut parser = ReportParser::new(bytes, report_type, &report);
            let nfields = parser.by_ref().count();
            assert!(!parser.has_more());

            if parser.error().is_none() {
                assert!(nfields <= size * 8, "{filename}: too many fields");
                let bits = parser.bit_position().saturating_sub(prefix_bits);
                assert_eq!(
                    bits.div_ceil(8),
                    size,
                    "{filename}: {report_type:?} report {id} size mismatch"
                );
                assert!(!parser.is_truncated(), "{filename}: truncated");
            }
        }

        let mut walk = DescriptorUsages::new(bytes, report_type);
        let usages: Vec<_> = walk.by_ref().collect();
        if walk.error().is_some() {
            continue;
        }
        for usage in usages {
            let id = usage.report_id.map_or(NO_REPORT_ID, |id| id.0);
            let size = report_size_for_id(id, report_type, bytes);
            assert!(
                usage.bits.end <= size * 8,
                "{filename}: {report_type:?} field {:?} past report {id}",
                usage.bits
            );
        }
    }
}

include!(concat!(env!("OUT_DIR"), "/test-report-descriptors.rs"));
