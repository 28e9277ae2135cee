// SPDX-License-Identifier: MIT

//! A wrapper around the HID Core items. This module handles splitting
//! a report descriptor byte stream into its individual components.
//! Interpretation of the resulting [DescriptorItem]s is left to
//! the caller, see [crate::ReportParser] for the interpreter.
//!
//! In this document and unless stated otherwise, a reference to "Section a.b.c" refers to the
//! [HID Device Class Definition for HID 1.11](https://www.usb.org/document-library/device-class-definition-hid-111).
//!
//! # Itemizing HID Report Descriptors
//!
//! Entry point is usually [`DescriptorItems::new(bytes)`](DescriptorItems::new), an
//! iterator that does not allocate:
//!
//! ```
//! # use hidfields::hid::*;
//! # fn parse(bytes: &[u8]) {
//! for item in DescriptorItems::new(bytes) {
//!     let Ok(item) = item else {
//!         break;
//!     };
//!     println!("Item at offset {:02x}", item.offset());
//!     match item.item_type() {
//!         ItemType::Main(mi) => match mi {
//!             MainItem::Output(o) => println!("This is an output item"),
//!             _ => {},
//!         }
//!         _ => {}
//!     }
//! }
//! # }
//! ```
//!
//! Descriptors come from the device and are untrusted. An item that claims more
//! data bytes than the descriptor has left is reported as
//! [ParserError::MalformedDescriptor], nothing is ever read out of bounds.

use crate::types::*;
use crate::{ParserError, Result};

/// Convenience function to be extract a single bit as bool from a value
fn bit(bits: u32, bit: u8) -> bool {
    debug_assert!(bit < 32);
    bits & (1 << bit) != 0
}

/// Represents one value extracted from a set of (LE) bytes.
///
/// Only the first four bytes are accumulated, a long item may
/// carry more than that.
pub(crate) struct HidValue {
    value: u32,
    nbytes: usize,
}

impl HidValue {
    /// The length of the value in bytes, required to
    /// determine if the actual value may be signed
    pub(crate) fn len(&self) -> usize {
        self.nbytes
    }
}

impl From<&[u8]> for HidValue {
    fn from(bytes: &[u8]) -> HidValue {
        let value = bytes
            .iter()
            .take(4)
            .enumerate()
            .fold(0u32, |acc, (i, b)| acc | (*b as u32) << (8 * i));
        HidValue {
            value,
            nbytes: bytes.len().min(4),
        }
    }
}

impl From<&HidValue> for u32 {
    fn from(v: &HidValue) -> u32 {
        v.value
    }
}

impl From<&HidValue> for u16 {
    fn from(v: &HidValue) -> u16 {
        (v.value & 0xFFFF) as u16
    }
}

impl From<&HidValue> for usize {
    fn from(v: &HidValue) -> usize {
        v.value as usize
    }
}

impl From<&HidValue> for i32 {
    /// Sign-extends relative to the number of bytes the value was read from.
    fn from(v: &HidValue) -> i32 {
        match v.len() {
            0 => 0,
            n => {
                let shift = 32 - 8 * n as u32;
                ((v.value << shift) as i32) >> shift
            }
        }
    }
}

/// The type of a HID item may be one of [MainItem], [GlobalItem], or [LocalItem].
/// These items comprise the report descriptor and how the report descriptor should
/// be compiled.
///
/// The special types [ItemType::Long] and [ItemType::Reserved] are primarily placeholders
/// and unlikely to be seen in the wild. They are skipped by the parser.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemType {
    Main(MainItem),
    Global(GlobalItem),
    Local(LocalItem),
    /// A long item (Section 6.2.2.3) with its 8-bit long item tag.
    Long { tag: u8 },
    /// A short item with the reserved item type 3.
    Reserved { tag: u8 },
}

/// See Section 6.2.2.4, a main item defines or groups data fields.
///
/// > Main items are used to either define or group certain types of data fields within a
/// > Report descriptor. There are two types of Main items: data and non-data. Data-
/// > type Main items are used to create a field within a report and include Input,
/// > Output, and Feature. Other items do not create fields and are subsequently
/// > referred to as non-data Main items.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MainItem {
    Input(MainDataItem),
    Output(MainDataItem),
    Feature(MainDataItem),
    /// See Section 6.2.2.6, the collection type is not interpreted.
    Collection { kind: u8 },
    EndCollection,
    Reserved { tag: u8 },
}

impl MainItem {
    fn new(tag: u8, value: &HidValue) -> MainItem {
        match tag {
            0x8 => MainItem::Input(MainDataItem::from(value)),
            0x9 => MainItem::Output(MainDataItem::from(value)),
            0xB => MainItem::Feature(MainDataItem::from(value)),
            0xA => MainItem::Collection {
                kind: (u32::from(value) & 0xFF) as u8,
            },
            0xC => MainItem::EndCollection,
            tag => MainItem::Reserved { tag },
        }
    }

    /// The data item flags if this is an Input, Output or Feature item.
    pub fn data_item(&self) -> Option<&MainDataItem> {
        match self {
            MainItem::Input(i) | MainItem::Output(i) | MainItem::Feature(i) => Some(i),
            _ => None,
        }
    }
}

/// From Section 6.2.2.4.
/// > [Input](MainItem::Input), [Output](MainItem::Output), and [Feature](MainItem::Feature)
/// > items are used to create data fields within a report.
///
/// All three share the same flag layout, the volatile bit is reserved
/// for Input items.
///
/// These properties come in pairs (bit set or unset in the HID report descriptor item),
/// for readability in the caller, a function is provided for each state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MainDataItem {
    /// This item is constant if `true` (and thus can usually be ignored).
    /// If false, the item refers to a data field.
    is_constant: bool,
    /// Array or single variable
    is_variable: bool,
    /// Absolute or relative
    is_relative: bool,
    /// Data wraps around after exceeding minimum or maximum
    wraps: bool,
    /// Raw data from the devise has been processed on the device and is no longer linear
    is_nonlinear: bool,
    /// Control has a preferred state or not
    has_no_preferred_state: bool,
    /// Control has a neutral state where it does not send meaningful data
    has_null_state: bool,
    /// Output and Feature only
    is_volatile: bool,
    /// Indicates whether the field emits a fixed size stream of bytes
    is_buffered_bytes: bool,
}

impl From<&HidValue> for MainDataItem {
    fn from(value: &HidValue) -> MainDataItem {
        let data = u32::from(value);
        MainDataItem {
            is_constant: bit(data, 0),
            is_variable: bit(data, 1),
            is_relative: bit(data, 2),
            wraps: bit(data, 3),
            is_nonlinear: bit(data, 4),
            has_no_preferred_state: bit(data, 5),
            has_null_state: bit(data, 6),
            is_volatile: bit(data, 7),
            is_buffered_bytes: bit(data, 8),
        }
    }
}

impl MainDataItem {
    /// True if the data is constant and never changes. Constant fields
    /// are padding and produce no output.
    ///
    /// Mutually exclusive with [MainDataItem::is_data].
    pub fn is_constant(&self) -> bool {
        self.is_constant
    }

    /// True if the field carries data.
    pub fn is_data(&self) -> bool {
        !self.is_constant
    }

    /// True if the data is a variable field, i.e. each field has its own usage.
    ///
    /// Mutually exclusive with [MainDataItem::is_array].
    pub fn is_variable(&self) -> bool {
        self.is_variable
    }

    /// True if the data is an array field, i.e. each field contains
    /// a usage index (e.g. a pressed key).
    pub fn is_array(&self) -> bool {
        !self.is_variable
    }

    /// True if the data is relative compared to a previous report
    pub fn is_relative(&self) -> bool {
        self.is_relative
    }

    pub fn is_absolute(&self) -> bool {
        !self.is_relative
    }

    /// True if the data wraps around at the logical
    /// minimum/maximum (e.g. a dial that can spin at 360 degrees).
    pub fn wraps(&self) -> bool {
        self.wraps
    }

    pub fn is_nonlinear(&self) -> bool {
        self.is_nonlinear
    }

    pub fn has_no_preferred_state(&self) -> bool {
        self.has_no_preferred_state
    }

    /// True if the control has a null state where it does not send
    /// data (e.g. a joystick in neutral state)
    pub fn has_null_state(&self) -> bool {
        self.has_null_state
    }

    pub fn is_volatile(&self) -> bool {
        self.is_volatile
    }

    /// True if the control emits a fixed size stream of bytes.
    pub fn is_buffered_bytes(&self) -> bool {
        self.is_buffered_bytes
    }
}

/// See Section 6.2.2.7, a global item applies to all subsequently identified items.
///
/// > Global items describe rather than define data from a control. A new Main item
/// > assumes the characteristics of the item state table. Global items can change the
/// > state table. As a result Global item tags apply to all subsequently defined items
/// > unless overridden by another Global item.
///
/// Logical and Physical Minimum/Maximum are sign-extended from the item's
/// data size, all other values are unsigned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GlobalItem {
    UsagePage(UsagePage),
    LogicalMinimum(LogicalMinimum),
    LogicalMaximum(LogicalMaximum),
    PhysicalMinimum(PhysicalMinimum),
    PhysicalMaximum(PhysicalMaximum),
    UnitExponent(UnitExponent),
    Unit(Unit),
    ReportSize(ReportSize),
    ReportId(ReportId),
    ReportCount(ReportCount),
    Push,
    Pop,
    Reserved { tag: u8 },
}

impl GlobalItem {
    fn new(tag: u8, value: &HidValue) -> GlobalItem {
        match tag {
            0x0 => GlobalItem::UsagePage(UsagePage(value.into())),
            0x1 => GlobalItem::LogicalMinimum(LogicalMinimum(value.into())),
            0x2 => GlobalItem::LogicalMaximum(LogicalMaximum(value.into())),
            0x3 => GlobalItem::PhysicalMinimum(PhysicalMinimum(value.into())),
            0x4 => GlobalItem::PhysicalMaximum(PhysicalMaximum(value.into())),
            0x5 => GlobalItem::UnitExponent(UnitExponent(value.into())),
            0x6 => GlobalItem::Unit(Unit(value.into())),
            0x7 => GlobalItem::ReportSize(ReportSize(value.into())),
            0x8 => GlobalItem::ReportId(ReportId(value.into())),
            0x9 => GlobalItem::ReportCount(ReportCount(value.into())),
            0xA => GlobalItem::Push,
            0xB => GlobalItem::Pop,
            tag => GlobalItem::Reserved { tag },
        }
    }

    fn is_signed(tag: u8) -> bool {
        (0x1..=0x4).contains(&tag)
    }
}

/// A Usage, Usage Minimum or Usage Maximum as found in a local item.
///
/// A usage with a data size of 1 or 2 bytes carries only the Usage ID, the Usage
/// Page comes from the current [GlobalItem::UsagePage]. With 4 bytes the
/// upper 16 bits are the Usage Page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalUsage {
    pub usage_page: Option<UsagePage>,
    pub usage_id: UsageId,
}

impl LocalUsage {
    /// Combine with the given page unless this usage brings its own.
    pub fn extended(&self, usage_page: UsagePage) -> ExtendedUsage {
        ExtendedUsage::new(self.usage_page.unwrap_or(usage_page), self.usage_id)
    }
}

impl From<&HidValue> for LocalUsage {
    fn from(value: &HidValue) -> LocalUsage {
        let v = u32::from(value);
        let usage_page = if value.len() > 2 {
            Some(UsagePage((v >> 16) as u16))
        } else {
            None
        };
        LocalUsage {
            usage_page,
            usage_id: UsageId((v & 0xFFFF) as u16),
        }
    }
}

/// See Section 6.2.2.8, a local item applies to the current [MainItem].
///
/// > Local item tags define characteristics of controls. These items do not carry over to
/// > the next Main item. If a Main item defines more than one control, it may be
/// > preceded by several similar Local item tags. For example, an Input item may
/// > have several Usage tags associated with it, one for each control.
///
/// Only the usage items affect how a report is parsed. Designator, string
/// and delimiter items are kept as their tag and value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalItem {
    Usage(LocalUsage),
    UsageMinimum(LocalUsage),
    UsageMaximum(LocalUsage),
    Other { tag: u8, value: u32 },
}

impl LocalItem {
    fn new(tag: u8, value: &HidValue) -> LocalItem {
        match tag {
            0x0 => LocalItem::Usage(value.into()),
            0x1 => LocalItem::UsageMinimum(value.into()),
            0x2 => LocalItem::UsageMaximum(value.into()),
            tag => LocalItem::Other {
                tag,
                value: u32::from(value),
            },
        }
    }
}

/// A single decoded item of a report descriptor, see Section 6.2.2.2 (short
/// items) and Section 6.2.2.3 (long items).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DescriptorItem {
    offset: usize,
    header: u8,
    item_type: ItemType,
    data_size: usize,
    size: usize,
    data: u32,
    value: i32,
}

impl DescriptorItem {
    /// Decode the item starting at `offset` in the given report descriptor.
    pub fn decode(descriptor: &[u8], offset: usize) -> Result<DescriptorItem> {
        let malformed = ParserError::MalformedDescriptor { offset };
        let header = *descriptor.get(offset).ok_or(malformed.clone())?;

        let size_code = header & 0b11;
        let itype = (header & 0b1100) >> 2;
        let tag = (header & 0b11110000) >> 4;
        let is_long = size_code == 2 && itype == 3 && tag == 0xF;

        let (header_size, data_size, tag) = if is_long {
            let data_size = *descriptor.get(offset + 1).ok_or(malformed.clone())?;
            let tag = *descriptor.get(offset + 2).ok_or(malformed.clone())?;
            (3, data_size as usize, tag)
        } else {
            let data_size = match size_code {
                0 => 0,
                1 => 1,
                2 => 2,
                _ => 4,
            };
            (1, data_size, tag)
        };

        let size = header_size + data_size;
        if descriptor.len() - offset < size {
            return Err(malformed);
        }
        let bytes = &descriptor[offset + header_size..offset + size];
        let value = HidValue::from(bytes);

        let item_type = match itype {
            _ if is_long => ItemType::Long { tag },
            0 => ItemType::Main(MainItem::new(tag, &value)),
            1 => ItemType::Global(GlobalItem::new(tag, &value)),
            2 => ItemType::Local(LocalItem::new(tag, &value)),
            _ => ItemType::Reserved { tag },
        };

        let data = u32::from(&value);
        let value = if itype == 1 && GlobalItem::is_signed(tag) {
            i32::from(&value)
        } else {
            data as i32
        };

        tracing::trace!(offset, header, data_size, ?item_type, "descriptor item");

        Ok(DescriptorItem {
            offset,
            header,
            item_type,
            data_size,
            size,
            data,
            value,
        })
    }

    /// The offset of this item in the Report Descriptor it was extracted from.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The header byte of this item. For long items this is the constant 0xFE.
    pub fn header(&self) -> u8 {
        self.header
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    /// The number of data bytes, excluding the header.
    pub fn data_size(&self) -> usize {
        self.data_size
    }

    /// The length of this item in bytes, inclusive of the header bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The unsigned little-endian data of this item (first 4 bytes only).
    pub fn data(&self) -> u32 {
        self.data
    }

    /// The data of this item as signed value. Only Logical and Physical
    /// Minimum/Maximum are sign-extended, for all other items this is
    /// [DescriptorItem::data] reinterpreted as `i32`.
    pub fn value(&self) -> i32 {
        self.value
    }

    /// Returns true if this item is a Long Item (Section 6.2.2.3).
    pub fn is_long_item(&self) -> bool {
        matches!(self.item_type, ItemType::Long { .. })
    }
}

impl TryFrom<&[u8]> for DescriptorItem {
    type Error = ParserError;

    /// Decode the first item in the given bytes.
    fn try_from(bytes: &[u8]) -> Result<DescriptorItem> {
        DescriptorItem::decode(bytes, 0)
    }
}

/// Iterator over the items of a report descriptor. Iteration stops
/// after the first malformed item.
#[derive(Debug, Clone)]
pub struct DescriptorItems<'a> {
    bytes: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> DescriptorItems<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        DescriptorItems {
            bytes,
            offset: 0,
            failed: false,
        }
    }
}

impl Iterator for DescriptorItems<'_> {
    type Item = Result<DescriptorItem>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.bytes.len() {
            return None;
        }
        match DescriptorItem::decode(self.bytes, self.offset) {
            Ok(item) => {
                self.offset += item.size();
                Some(Ok(item))
            }
            Err(e) => {
                tracing::warn!("{e}");
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
