//! This Rust `embedded-hal`-based library drives a [HD44780](https://en.wikipedia.org/wiki/Hitachi_HD44780_LCD_controller)
//! compatible character display through a **PCF8574-based I2C adapter** in an embedded, `no_std` environment. These adapters are
//! ubiquitous on eBay and AliExpress and have no clear branding. The supported wiring is the common one: display data pins D4-D7 on
//! P4-P7 of the PCF8574, RS on P0, RW on P1, E on P2 and the backlight transistor on P3. The display is driven in 4-bit mode.
//!
//! Key features include:
//! - Convenient high-level API for controlling the display
//! - Support for custom characters
//! - Backlight control
//! - A small `printf` style formatter with `%c`, `%d`, `%o`, `%x` and `%s` conversions
//! - `core::fmt::Write` implementation for easy use with the `write!` macro
//! - Compatible with the `embedded-hal` traits v1.0 and later
//! - Bounded waiting on I2C buses that report completion asynchronously
//! - Optional support for the `defmt` and `ufmt` logging frameworks
//!
//! ## Usage
//! Add this to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! hd44780-pcf8574 = { version = "0.1", features = ["defmt"] }
//! ```
//! The `features = ["defmt"]` line is optional and enables the `defmt` feature, which allows the library's errors to be used with the `defmt` logging
//! framework and emits debug traces. Another optional feature is `features = ["ufmt"]`, which enables the `ufmt` feature, allowing the `uwriteln!`
//! and `uwrite!` macros to be used.
//!
//! Create the display:
//! ```rust
//! use hd44780_pcf8574::{CharacterDisplayPCF8574T, LcdDisplayType};
//!
//! // board setup
//! let i2c = ...; // I2C peripheral
//! let delay = ...; // DelayNs implementation
//!
//! let mut lcd = CharacterDisplayPCF8574T::new(i2c, LcdDisplayType::Lcd16x2, delay);
//! ```
//! Adapters strapped to another address, single row displays using the 5x10 font, or HALs whose I2C writes complete in the
//! background are configured through `DeviceSetupConfig`:
//! ```rust
//! use hd44780_pcf8574::{CharacterDisplayPCF8574T, DeviceSetupConfig};
//!
//! let config = DeviceSetupConfig::new(i2c, 0x3F, 1, delay)
//!     .large_font(true)
//!     .with_bus_status(|| i2c_dma_idle())
//!     .ready_poll_limit(50);
//! let mut lcd = CharacterDisplayPCF8574T::from_config(config);
//! ```
//!
//! Initialize the display:
//! ```rust
//! if let Err(e) = lcd.init() {
//!    panic!("Error initializing LCD: {}", e);
//! }
//! ```
//! Use the display:
//! ```rust
//! use hd44780_pcf8574::PrintfArg;
//!
//! lcd.backlight(true)?.clear()?.home()?;
//! lcd.print("Hello, world!")?;
//! lcd.set_cursor(0, 1)?
//!     .printf("T=%d C %x", &[PrintfArg::Int(-4), PrintfArg::Uint(0xBEEF)])?;
//! // can also use the `core::fmt::write!` macro
//! use core::fmt::Write;
//!
//! write!(lcd, "Hello, world!")?;
//! ```
//! The optional `ufmt` feature enables the `ufmt` crate, which allows the `uwriteln!` and `uwrite!` macros to be used with the display:
//! ```rust
//! use ufmt::uwriteln;
//!
//! uwriteln!(lcd, "Hello, world!")?;
//! ```
//!
//! Each method for controlling the LCD returns a `Result` that wraps the display object in `Ok()`, allowing for easy chaining
//! of commands. For example:
//! ```rust
//! lcd.backlight(true)?.clear()?.home()?.print("Hello, world!")?;
//! ```
//!
#![no_std]
#![allow(non_upper_case_globals)]
use core::fmt::{Debug, Display};

use embedded_hal::{delay::DelayNs, i2c};

mod driver;
mod format;

pub use driver::{BlockingBus, BusStatusTrait};
pub use format::{Numeral, PrintfArg, Radix};

use driver::hd44780::HD44780;

/// I2C address of a PCF8574T with A0-A2 pulled high, the factory setting of most backpacks.
pub const DEFAULT_I2C_ADDRESS: u8 = 0x27;

/// Number of ready polls, 1 ms apart, before a busy bus is reported as `BusTimeout`.
pub const DEFAULT_READY_POLL_LIMIT: u32 = 100;

/// The DDRAM row table has four entries.
const MAX_ROWS: u8 = 4;

/// Errors that can occur when using the LCD backpack
pub enum CharacterDisplayError<I2C>
where
    I2C: i2c::I2c,
{
    /// I2C error returned from the underlying I2C implementation
    I2cError(I2C::Error),
    /// The bus did not report ready within the configured number of polls
    BusTimeout,
    /// A `printf` conversion had no argument left
    MissingFormatArgument,
    /// A `printf` argument does not fit its conversion
    FormatArgumentMismatch,
    /// Formatting error
    FormattingError(core::fmt::Error),
}

impl<I2C> Debug for CharacterDisplayError<I2C>
where
    I2C: i2c::I2c,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CharacterDisplayError::I2cError(e) => f.debug_tuple("I2cError").field(e).finish(),
            CharacterDisplayError::FormattingError(e) => {
                f.debug_tuple("FormattingError").field(e).finish()
            }
            other => {
                let msg: &'static str = From::from(other);
                f.write_str(msg)
            }
        }
    }
}

impl<I2C> From<core::fmt::Error> for CharacterDisplayError<I2C>
where
    I2C: i2c::I2c,
{
    fn from(err: core::fmt::Error) -> Self {
        CharacterDisplayError::FormattingError(err)
    }
}

impl<I2C> From<&CharacterDisplayError<I2C>> for &'static str
where
    I2C: i2c::I2c,
{
    fn from(err: &CharacterDisplayError<I2C>) -> Self {
        match err {
            CharacterDisplayError::I2cError(_) => "I2C error",
            CharacterDisplayError::BusTimeout => "I2C bus timeout",
            CharacterDisplayError::MissingFormatArgument => "Missing format argument",
            CharacterDisplayError::FormatArgumentMismatch => "Format argument mismatch",
            CharacterDisplayError::FormattingError(_) => "Formatting error",
        }
    }
}

#[cfg(feature = "defmt")]
impl<I2C> defmt::Format for CharacterDisplayError<I2C>
where
    I2C: i2c::I2c,
{
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

#[cfg(feature = "ufmt")]
impl<I2C> ufmt::uDisplay for CharacterDisplayError<I2C>
where
    I2C: i2c::I2c,
{
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let msg: &'static str = From::from(self);
        ufmt::uwrite!(w, "{}", msg)
    }
}

impl<I2C> Display for CharacterDisplayError<I2C>
where
    I2C: i2c::I2c,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        write!(f, "{}", msg)
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
/// The type of LCD display. Used by the convenience constructors to pick the row count.
pub enum LcdDisplayType {
    /// 16x1 display
    Lcd16x1,
    /// 16x2 display
    Lcd16x2,
    /// 20x2 display
    Lcd20x2,
    /// 20x4 display
    Lcd20x4,
    /// 16x4 display
    Lcd16x4,
    /// 8x2 display
    Lcd8x2,
    /// 40x2 display
    Lcd40x2,
}

impl From<&LcdDisplayType> for &'static str {
    fn from(display_type: &LcdDisplayType) -> Self {
        match display_type {
            LcdDisplayType::Lcd16x1 => "16x1",
            LcdDisplayType::Lcd16x2 => "16x2",
            LcdDisplayType::Lcd20x2 => "20x2",
            LcdDisplayType::Lcd20x4 => "20x4",
            LcdDisplayType::Lcd16x4 => "16x4",
            LcdDisplayType::Lcd8x2 => "8x2",
            LcdDisplayType::Lcd40x2 => "40x2",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for LcdDisplayType {
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

#[cfg(feature = "ufmt")]
impl ufmt::uDisplay for LcdDisplayType {
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let msg: &'static str = From::from(self);
        ufmt::uwrite!(w, "{}", msg)
    }
}

impl Display for LcdDisplayType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        write!(f, "{}", msg)
    }
}

impl LcdDisplayType {
    /// Get the number of rows for the display type
    pub const fn rows(&self) -> u8 {
        match self {
            LcdDisplayType::Lcd16x1 => 1,
            LcdDisplayType::Lcd16x2 => 2,
            LcdDisplayType::Lcd20x2 => 2,
            LcdDisplayType::Lcd20x4 => 4,
            LcdDisplayType::Lcd16x4 => 4,
            LcdDisplayType::Lcd8x2 => 2,
            LcdDisplayType::Lcd40x2 => 2,
        }
    }

    /// Get the number of columns for the display type
    pub const fn cols(&self) -> u8 {
        match self {
            LcdDisplayType::Lcd16x1 => 16,
            LcdDisplayType::Lcd16x2 => 16,
            LcdDisplayType::Lcd20x2 => 20,
            LcdDisplayType::Lcd20x4 => 20,
            LcdDisplayType::Lcd16x4 => 16,
            LcdDisplayType::Lcd8x2 => 8,
            LcdDisplayType::Lcd40x2 => 40,
        }
    }
}

/// Everything the driver needs to reach the display. Fixed once the display object is built.
pub struct DeviceSetupConfig<I2C, DELAY, BUS = BlockingBus>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
    BUS: BusStatusTrait,
{
    i2c: I2C,
    address: u8,
    rows: u8,
    large_font: bool,
    delay: DELAY,
    bus: BUS,
    ready_poll_limit: u32,
}

impl<I2C, DELAY> DeviceSetupConfig<I2C, DELAY, BlockingBus>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    /// Configuration for a display with `rows` lines at `address`. Row counts outside 1 to 4
    /// are clamped into that range.
    pub fn new(i2c: I2C, address: u8, rows: u8, delay: DELAY) -> Self {
        Self {
            i2c,
            address,
            rows: rows.clamp(1, MAX_ROWS),
            large_font: false,
            delay,
            bus: BlockingBus,
            ready_poll_limit: DEFAULT_READY_POLL_LIMIT,
        }
    }
}

impl<I2C, DELAY, BUS> DeviceSetupConfig<I2C, DELAY, BUS>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
    BUS: BusStatusTrait,
{
    /// Select the 5x10 dot font. Only single row displays have it; ignored otherwise.
    pub fn large_font(mut self, large_font: bool) -> Self {
        self.large_font = large_font;
        self
    }

    pub fn ready_poll_limit(mut self, polls: u32) -> Self {
        self.ready_poll_limit = polls;
        self
    }

    /// Replace the bus status source. Needed when the HAL returns from `write` before the bytes
    /// are on the wire.
    pub fn with_bus_status<B: BusStatusTrait>(self, bus: B) -> DeviceSetupConfig<I2C, DELAY, B> {
        DeviceSetupConfig {
            i2c: self.i2c,
            address: self.address,
            rows: self.rows,
            large_font: self.large_font,
            delay: self.delay,
            bus,
            ready_poll_limit: self.ready_poll_limit,
        }
    }

    pub fn rows(&self) -> u8 {
        self.rows
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn uses_large_font(&self) -> bool {
        self.large_font
    }
}

/// HD44780 based character display using a generic PCF8574T I2C adapter.
pub struct CharacterDisplayPCF8574T<I2C, DELAY, BUS = BlockingBus>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
    BUS: BusStatusTrait,
{
    config: DeviceSetupConfig<I2C, DELAY, BUS>,
    driver: HD44780,
}

impl<I2C, DELAY> CharacterDisplayPCF8574T<I2C, DELAY, BlockingBus>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    /// Create a new character display object with the default I2C address for the adapter.
    pub fn new(i2c: I2C, lcd_type: LcdDisplayType, delay: DELAY) -> Self {
        Self::new_with_address(i2c, DEFAULT_I2C_ADDRESS, lcd_type, delay)
    }

    /// Create a new character display object with a specific I2C address for the adapter.
    pub fn new_with_address(i2c: I2C, address: u8, lcd_type: LcdDisplayType, delay: DELAY) -> Self {
        Self::from_config(DeviceSetupConfig::new(i2c, address, lcd_type.rows(), delay))
    }
}

impl<I2C, DELAY, BUS> CharacterDisplayPCF8574T<I2C, DELAY, BUS>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
    BUS: BusStatusTrait,
{
    pub fn from_config(config: DeviceSetupConfig<I2C, DELAY, BUS>) -> Self {
        Self {
            config,
            driver: HD44780::default(),
        }
    }

    /// Initialize the display. This must be called before using the display. Calling it again
    /// repeats the whole power-on sequence.
    pub fn init(&mut self) -> Result<(), CharacterDisplayError<I2C>> {
        self.driver.init(&mut self.config)
    }

    /// returns a reference to the I2C peripheral. mostly needed for testing
    #[cfg(test)]
    fn i2c(&mut self) -> &mut I2C {
        &mut self.config.i2c
    }

    pub fn rows(&self) -> u8 {
        self.config.rows
    }

    pub fn address(&self) -> u8 {
        self.config.address
    }

    /// Function set flags sent during `init`.
    pub fn display_function(&self) -> u8 {
        self.driver.display_function()
    }

    /// Display, cursor and blink flags.
    pub fn display_control(&self) -> u8 {
        self.driver.display_control()
    }

    /// Entry direction and autoscroll flags.
    pub fn display_mode(&self) -> u8 {
        self.driver.display_mode()
    }

    pub fn backlight_enabled(&self) -> bool {
        self.driver.backlight_enabled()
    }

    /// The byte the PCF8574T was last asked to drive.
    pub fn register_image(&self) -> u8 {
        self.driver.register_image()
    }

    //--------------------------------------------------------------------------------------------------
    // high level commands, for the user!
    //--------------------------------------------------------------------------------------------------

    /// Clear the display
    pub fn clear(&mut self) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.driver.clear(&mut self.config)?;
        Ok(self)
    }

    /// Set the cursor to the home position.
    pub fn home(&mut self) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.driver.home(&mut self.config)?;
        Ok(self)
    }

    /// Set the cursor position at specified column and row. Columns and rows are zero-indexed.
    /// Rows past the last row of the display select the last row.
    pub fn set_cursor(
        &mut self,
        col: u8,
        row: u8,
    ) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.driver.set_cursor(&mut self.config, col, row)?;
        Ok(self)
    }

    /// Set the cursor visibility.
    pub fn show_cursor(
        &mut self,
        show_cursor: bool,
    ) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.driver.show_cursor(&mut self.config, show_cursor)?;
        Ok(self)
    }

    /// Set the cursor blinking.
    pub fn blink_cursor(
        &mut self,
        blink_cursor: bool,
    ) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.driver.blink_cursor(&mut self.config, blink_cursor)?;
        Ok(self)
    }

    /// Set the display visibility. Display RAM is kept while the display is hidden.
    pub fn show_display(
        &mut self,
        show_display: bool,
    ) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.driver.show_display(&mut self.config, show_display)?;
        Ok(self)
    }

    /// Scroll the display to the left.
    pub fn scroll_display_left(&mut self) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.driver.scroll_display_left(&mut self.config)?;
        Ok(self)
    }

    /// Scroll the display to the right.
    pub fn scroll_display_right(&mut self) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.driver.scroll_display_right(&mut self.config)?;
        Ok(self)
    }

    /// Set the text flow direction to left to right.
    pub fn left_to_right(&mut self) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.driver.left_to_right(&mut self.config)?;
        Ok(self)
    }

    /// Set the text flow direction to right to left.
    pub fn right_to_left(&mut self) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.driver.right_to_left(&mut self.config)?;
        Ok(self)
    }

    /// Set the auto scroll mode.
    pub fn autoscroll(
        &mut self,
        autoscroll: bool,
    ) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.driver.autoscroll(&mut self.config, autoscroll)?;
        Ok(self)
    }

    /// Create a new custom character in slot `location` (0 to 7). Call `set_cursor`, `home` or
    /// `clear` afterwards before printing text.
    pub fn create_char(
        &mut self,
        location: u8,
        charmap: [u8; 8],
    ) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.driver
            .create_char(&mut self.config, location, charmap)?;
        Ok(self)
    }

    /// Prints a string to the LCD at the current cursor position.
    pub fn print(&mut self, text: &str) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.driver.print(&mut self.config, text)?;
        Ok(self)
    }

    /// Writes one character code to the LCD. Codes 0 to 7 show the custom characters.
    pub fn write_byte(&mut self, value: u8) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.driver.write_data(&mut self.config, value)?;
        Ok(self)
    }

    /// Prints `format` with `%c`, `%d`, `%o`, `%x` and `%s` replaced by `args` in order.
    /// Characters already expanded stay on the display when an error is returned.
    pub fn printf(
        &mut self,
        format: &str,
        args: &[PrintfArg],
    ) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        let Self { config, driver } = &mut *self;
        format::printf(format, args, |byte| driver.write_data(config, byte))?;
        Ok(self)
    }

    /// Turn the backlight on or off
    pub fn backlight(&mut self, on: bool) -> Result<&mut Self, CharacterDisplayError<I2C>> {
        self.driver.backlight(&mut self.config, on)?;
        Ok(self)
    }
}

/// Implement the `core::fmt::Write` trait for the LCD backpack, allowing it to be used with the `write!` macro.
/// This is a convenience method for printing to the display.
impl<I2C, DELAY, BUS> core::fmt::Write for CharacterDisplayPCF8574T<I2C, DELAY, BUS>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
    BUS: BusStatusTrait,
{
    fn write_str(&mut self, s: &str) -> Result<(), core::fmt::Error> {
        if let Err(_e) = self.print(s) {
            return Err(core::fmt::Error);
        }
        Ok(())
    }
}

#[cfg(feature = "ufmt")]
/// Implement the `ufmt::uWrite` trait for the LCD backpack, allowing it to be used with the `uwriteln!` and `uwrite!` macros.
/// This is a convenience method for printing to the display.
impl<I2C, DELAY, BUS> ufmt::uWrite for CharacterDisplayPCF8574T<I2C, DELAY, BUS>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
    BUS: BusStatusTrait,
{
    fn write_str(&mut self, s: &str) -> Result<(), CharacterDisplayError<I2C>> {
        self.print(s)?;
        Ok(())
    }

    type Error = CharacterDisplayError<I2C>;
}
