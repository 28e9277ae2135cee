// SPDX-License-Identifier: MIT

//! A collection of standalone HID types that exist for type safety only.
//! These are all simple wrappers around their underlying integer data type.
//!
//! In this document and unless stated otherwise, a reference to "Section a.b.c" refers to the
//! [HID Device Class Definition for HID 1.11](https://www.usb.org/document-library/device-class-definition-hid-111).

/// Creates a `From<Foo> for u32` and `From<u32> for Foo` implementation for the given `Foo` type.
/// Use like this: `impl_from(Foo, Foo, u32)`.
macro_rules! impl_from {
    ($tipo:ty, $tipo_expr:expr, $to:ty) => {
        impl From<$tipo> for $to {
            fn from(f: $tipo) -> $to {
                f.0
            }
        }
        impl From<&$tipo> for $to {
            fn from(f: &$tipo) -> $to {
                f.0
            }
        }
        impl From<$to> for $tipo {
            fn from(f: $to) -> Self {
                $tipo_expr(f)
            }
        }
    };
}

/// Creates a `impl Display for Foo` that just converts into the underlying number.
/// Use like this: `impl_fmt(Foo, u32)`.
macro_rules! impl_fmt {
    ($tipo:ty, $to:ty) => {
        impl std::fmt::Display for $tipo {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let v: $to = self.into();
                write!(f, "{v}")
            }
        }
    };
}

// ---------- GLOBAL ITEMS ---------------------

/// The Usage Page of a field, see Section 6.2.2.7.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct UsagePage(pub u16);

impl_from!(UsagePage, UsagePage, u16);
impl_fmt!(UsagePage, u16);

#[cfg(feature = "hut")]
impl From<&hut::UsagePage> for UsagePage {
    fn from(up: &hut::UsagePage) -> UsagePage {
        use hut::AsUsagePage;
        UsagePage(up.usage_page_value())
    }
}

#[cfg(feature = "hut")]
impl From<hut::UsagePage> for UsagePage {
    fn from(up: hut::UsagePage) -> UsagePage {
        UsagePage::from(&up)
    }
}

/// A negative Logical Minimum makes all fields of the next Main item signed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogicalMinimum(pub i32);

impl_from!(LogicalMinimum, LogicalMinimum, i32);
impl_fmt!(LogicalMinimum, i32);

impl LogicalMinimum {
    pub fn is_signed(&self) -> bool {
        self.0 < 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogicalMaximum(pub i32);

impl_from!(LogicalMaximum, LogicalMaximum, i32);
impl_fmt!(LogicalMaximum, i32);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhysicalMinimum(pub i32);

impl_from!(PhysicalMinimum, PhysicalMinimum, i32);
impl_fmt!(PhysicalMinimum, i32);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhysicalMaximum(pub i32);

impl_from!(PhysicalMaximum, PhysicalMaximum, i32);
impl_fmt!(PhysicalMaximum, i32);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Unit(pub u32);

impl_from!(Unit, Unit, u32);
impl_fmt!(Unit, u32);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitExponent(pub u32);

impl_from!(UnitExponent, UnitExponent, u32);
impl_fmt!(UnitExponent, u32);

/// The size of a single field in bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSize(pub usize);

impl_from!(ReportSize, ReportSize, usize);
impl_fmt!(ReportSize, usize);

/// A Report ID as declared in the report descriptor. HID reserves the
/// value 0, a report descriptor that declares no Report ID item has
/// reports without the ID prefix byte.
///
/// Valid Report IDs fit into the one-byte report prefix, the item itself
/// may carry a wider value that then never matches any report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ReportId(pub u16);

impl_from!(ReportId, ReportId, u16);
impl_fmt!(ReportId, u16);

impl ReportId {
    /// True if the first byte of the report is this Report ID.
    pub fn matches(&self, report: &[u8]) -> bool {
        report.first().is_some_and(|b| u16::from(*b) == self.0)
    }
}

/// The number of fields created by the next Main item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportCount(pub usize);

impl_from!(ReportCount, ReportCount, usize);
impl_fmt!(ReportCount, usize);

// ----------------- LOCAL ITEMS --------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct UsageId(pub u16);

impl_from!(UsageId, UsageId, u16);
impl_fmt!(UsageId, u16);

/// An extended usage, i.e. the Usage Page in the upper 16 bits
/// and the Usage ID in the lower 16 bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtendedUsage(pub u32);

impl_from!(ExtendedUsage, ExtendedUsage, u32);
impl_fmt!(ExtendedUsage, u32);

impl ExtendedUsage {
    pub fn new(usage_page: UsagePage, usage_id: UsageId) -> Self {
        ExtendedUsage(((usage_page.0 as u32) << 16) | usage_id.0 as u32)
    }

    pub fn usage_page(&self) -> UsagePage {
        UsagePage((self.0 >> 16) as u16)
    }

    pub fn usage_id(&self) -> UsageId {
        UsageId((self.0 & 0xFFFF) as u16)
    }
}
