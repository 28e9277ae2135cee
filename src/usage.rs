// SPDX-License-Identifier: MIT

//! Resolving the Usages that belong to a Main item.
//!
//! Local items only apply to the next Main item. Rather than collecting them
//! into a list, the local items between the previous Main item and the
//! current one are rescanned whenever the current set of usages runs out.

use crate::hid::{DescriptorItem, GlobalItem, ItemType, LocalItem};
use crate::types::*;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct UsageResolver {
    /// The Usage Page as seen while scanning, not necessarily the
    /// global Usage Page at the time of the Main item.
    usage_page: UsagePage,
    usage_minimum: ExtendedUsage,
    usage_maximum: ExtendedUsage,
    available_usages: u32,
    have_usage_minimum: bool,
    have_usage_maximum: bool,
}

impl UsageResolver {
    pub fn new(usage_page: UsagePage) -> Self {
        UsageResolver {
            usage_page,
            ..Default::default()
        }
    }

    /// Start over for the next Main item.
    pub fn reset(&mut self, usage_page: UsagePage) {
        *self = UsageResolver::new(usage_page);
    }

    pub fn available(&self) -> u32 {
        self.available_usages
    }

    /// The next usage to be handed out.
    pub fn current(&self) -> ExtendedUsage {
        self.usage_minimum
    }

    /// Drop any remaining usages.
    pub fn clear(&mut self) {
        self.available_usages = 0;
    }

    /// Hand out the current usage and move on to the next one in the range.
    pub fn next_usage(&mut self) -> ExtendedUsage {
        let usage = self.usage_minimum;
        self.usage_minimum = ExtendedUsage(usage.0.wrapping_add(1));
        self.available_usages = self.available_usages.saturating_sub(1);
        usage
    }

    /// Scan the items in `descriptor[start..end]` until at least one usage
    /// is available. Returns the offset of the first item not yet scanned.
    pub fn scan(&mut self, descriptor: &[u8], start: usize, end: usize) -> usize {
        let mut pos = start;
        while self.available_usages == 0 && pos < end {
            let Ok(item) = DescriptorItem::decode(descriptor, pos) else {
                break;
            };
            match item.item_type() {
                ItemType::Global(GlobalItem::UsagePage(usage_page)) => {
                    self.usage_page = usage_page;
                }
                ItemType::Local(LocalItem::Usage(usage)) => {
                    self.usage_minimum = usage.extended(self.usage_page);
                    self.available_usages = 1;
                }
                ItemType::Local(LocalItem::UsageMinimum(usage)) => {
                    self.usage_minimum = usage.extended(self.usage_page);
                    self.have_usage_minimum = true;
                }
                ItemType::Local(LocalItem::UsageMaximum(usage)) => {
                    self.usage_maximum = usage.extended(self.usage_page);
                    self.have_usage_maximum = true;
                }
                _ => {}
            }
            if self.have_usage_minimum && self.have_usage_maximum {
                self.available_usages = self
                    .usage_maximum
                    .0
                    .checked_sub(self.usage_minimum.0)
                    .map_or(0, |n| n.saturating_add(1));
                if self.available_usages == 0 {
                    tracing::debug!(
                        "Usage Maximum {:#x} below Usage Minimum {:#x}",
                        self.usage_maximum.0,
                        self.usage_minimum.0
                    );
                }
                self.have_usage_minimum = false;
                self.have_usage_maximum = false;
            }
            pos += item.size();
        }
        pos
    }
}
