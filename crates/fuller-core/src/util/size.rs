/// Memory size representation supporting common units.
///
/// Provides a convenient way to specify buffer and mapping sizes in bytes,
/// kilobytes, megabytes, or gigabytes. All units use binary (base-2)
/// multipliers (1 KB = 1024 bytes).
///
/// # Examples
///
/// ```
/// use fuller_core::util::Size;
///
/// let mapping = Size::MB(64);
/// assert_eq!(mapping.bytes(), 64 * 1024 * 1024);
///
/// let row = Size::KB(8);
/// assert_eq!(row.bytes(), 8192);
/// ```
#[derive(Clone, Copy, Debug)]
pub enum Size {
    /// Size in bytes
    B(usize),
    /// Size in kilobytes (1 KB = 1024 bytes)
    KB(usize),
    /// Size in megabytes (1 MB = 1024 KB)
    MB(usize),
    /// Size in gigabytes (1 GB = 1024 MB)
    GB(usize),
}

impl Size {
    /// Converts this size to bytes.
    pub const fn bytes(&self) -> usize {
        match self {
            Size::B(bytes) => *bytes,
            Size::KB(kb) => *kb * (1 << 10),
            Size::MB(mb) => *mb * (1 << 20),
            Size::GB(gb) => *gb * (1 << 30),
        }
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Size::B(bytes) => write!(f, "{} B", bytes),
            Size::KB(kb) => write!(f, "{} KB", kb),
            Size::MB(mb) => write!(f, "{} MB", mb),
            Size::GB(gb) => write!(f, "{} GB", gb),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::util::Size;

    #[test]
    fn size_conversions() {
        assert_eq!(Size::B(523).bytes(), 523);
        assert_eq!(Size::KB(4).bytes(), 4096);
        assert_eq!(Size::MB(12).bytes(), 12 * (1 << 20));
        assert_eq!(Size::GB(1).bytes(), 1 << 30);
    }
}
