// Numeral rendering and the printf style formatter used by `CharacterDisplayPCF8574T::printf`.

use core::fmt;
use embedded_hal::i2c;

use crate::CharacterDisplayError;

/// Digits for every supported radix, most significant last.
const DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// A u32 in base 8 needs 11 digits.
const NUMERAL_BUFFER_SIZE: usize = 32;

/// Number base for `Numeral`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Radix {
    Octal,
    Decimal,
    Hexadecimal,
}

impl Radix {
    pub fn base(&self) -> u32 {
        match self {
            Radix::Octal => 8,
            Radix::Decimal => 10,
            Radix::Hexadecimal => 16,
        }
    }
}

/// Minimal width text for an unsigned value: no leading zeros, uppercase hex digits, and
/// `"0"` for zero.
pub struct Numeral {
    buffer: [u8; NUMERAL_BUFFER_SIZE],
    start: usize,
}

impl Numeral {
    pub fn new(value: u32, radix: Radix) -> Self {
        let base = radix.base();
        let mut buffer = [0u8; NUMERAL_BUFFER_SIZE];
        let mut start = NUMERAL_BUFFER_SIZE;
        let mut remaining = value;
        loop {
            start -= 1;
            buffer[start] = DIGITS[(remaining % base) as usize];
            remaining /= base;
            if remaining == 0 {
                break;
            }
        }
        Self { buffer, start }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[self.start..]
    }

    pub fn as_str(&self) -> &str {
        // only ASCII digits are ever written
        core::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }
}

impl fmt::Display for Numeral {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One argument for `printf`. `%c` takes `Char` or the low byte of an integer, `%d` takes
/// `Int` (signed) or `Uint`, `%o` and `%x` take either integer as its 32-bit pattern, and `%s`
/// takes `Str`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintfArg<'a> {
    Char(u8),
    Int(i32),
    Uint(u32),
    Str(&'a str),
}

impl PrintfArg<'_> {
    fn as_bits(&self) -> Option<u32> {
        match *self {
            PrintfArg::Char(c) => Some(c as u32),
            PrintfArg::Int(v) => Some(v as u32),
            PrintfArg::Uint(v) => Some(v),
            PrintfArg::Str(_) => None,
        }
    }
}

/// Expands `format` against `args`, handing every resulting character byte to `emit`.
///
/// An unknown conversion prints nothing but still uses up one argument so later conversions
/// stay aligned with their arguments. A `%` at the very end is dropped.
pub(crate) fn printf<I2C, F>(
    format: &str,
    args: &[PrintfArg],
    mut emit: F,
) -> Result<(), CharacterDisplayError<I2C>>
where
    I2C: i2c::I2c,
    F: FnMut(u8) -> Result<(), CharacterDisplayError<I2C>>,
{
    let mut args = args.iter();
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            emit(c as u8)?;
            continue;
        }
        let Some(conversion) = chars.next() else {
            break;
        };
        if !matches!(conversion, 'c' | 'd' | 'o' | 's' | 'x') {
            #[cfg(feature = "defmt")]
            defmt::warn!("Unknown printf conversion, skipping one argument");
            args.next();
            continue;
        }
        let arg = args
            .next()
            .ok_or(CharacterDisplayError::MissingFormatArgument)?;
        match (conversion, *arg) {
            ('s', PrintfArg::Str(s)) => {
                for c in s.chars() {
                    emit(c as u8)?;
                }
            }
            ('s', _) | (_, PrintfArg::Str(_)) => {
                return Err(CharacterDisplayError::FormatArgumentMismatch)
            }
            ('c', arg) => {
                let bits = arg
                    .as_bits()
                    .ok_or(CharacterDisplayError::FormatArgumentMismatch)?;
                emit(bits as u8)?;
            }
            ('d', PrintfArg::Int(v)) => {
                if v < 0 {
                    emit(b'-')?;
                }
                emit_numeral(&mut emit, Numeral::new(v.unsigned_abs(), Radix::Decimal))?;
            }
            (conversion, arg) => {
                let bits = arg
                    .as_bits()
                    .ok_or(CharacterDisplayError::FormatArgumentMismatch)?;
                let radix = match conversion {
                    'o' => Radix::Octal,
                    'x' => Radix::Hexadecimal,
                    _ => Radix::Decimal,
                };
                emit_numeral(&mut emit, Numeral::new(bits, radix))?;
            }
        }
    }
    Ok(())
}

fn emit_numeral<I2C, F>(emit: &mut F, numeral: Numeral) -> Result<(), CharacterDisplayError<I2C>>
where
    I2C: i2c::I2c,
    F: FnMut(u8) -> Result<(), CharacterDisplayError<I2C>>,
{
    for &digit in numeral.as_bytes() {
        emit(digit)?;
    }
    Ok(())
}
