use std::fmt;

use crate::{
    file::{Parser, Writer},
    Result,
};

/// A 128-bit globally unique identifier carried as four unsigned 32-bit words.
///
/// Export rows carry one of these per object; this crate treats the value as
/// opaque and copies it through verbatim.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash)]
pub struct FGuid {
    /// First word
    pub a: u32,
    /// Second word
    pub b: u32,
    /// Third word
    pub c: u32,
    /// Fourth word
    pub d: u32,
}

impl FGuid {
    /// The all-zero identifier
    #[must_use]
    pub fn zero() -> Self {
        FGuid::default()
    }

    /// Returns true if all four words are zero
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == FGuid::default()
    }

    /// Read a guid from the current parser position
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length
    pub fn read(parser: &mut Parser) -> Result<Self> {
        Ok(FGuid {
            a: parser.read_le::<u32>()?,
            b: parser.read_le::<u32>()?,
            c: parser.read_le::<u32>()?,
            d: parser.read_le::<u32>()?,
        })
    }

    /// Write the guid at the current writer position
    ///
    /// # Errors
    /// Propagates stream failures from the writer
    pub fn write(&self, writer: &mut Writer) -> Result<()> {
        writer.write_le::<u32>(self.a)?;
        writer.write_le::<u32>(self.b)?;
        writer.write_le::<u32>(self.c)?;
        writer.write_le::<u32>(self.d)
    }
}

impl fmt::Display for FGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08X}-{:08X}-{:08X}-{:08X}",
            self.a, self.b, self.c, self.d
        )
    }
}
