use embedded_hal::{delay::DelayNs, i2c};

use super::{
    HD44780, LCD_CMD_DISPLAYCONTROL, LCD_CMD_ENTRYMODESET, LCD_CMD_FUNCTIONSET, LCD_FLAG_1LINE,
    LCD_FLAG_2LINE, LCD_FLAG_4BITMODE, LCD_FLAG_5x10_DOTS, LCD_FLAG_5x8_DOTS,
    LCD_FLAG_BLINKOFF, LCD_FLAG_CURSOROFF, LCD_FLAG_DISPLAYON, LCD_FLAG_ENTRYLEFT,
    LCD_FLAG_ENTRYSHIFTDECREMENT,
};
use crate::{driver::BusStatusTrait, CharacterDisplayError, DeviceSetupConfig};

// datasheet figure 24, rounded up to whole milliseconds
const POWER_ON_DELAY_MS: u32 = 50;
const EXPANDER_RESET_DELAY_MS: u32 = 500;
const SELECT_DELAY_MS: u32 = 5;
const LAST_SELECT_DELAY_MS: u32 = 1;

const SELECT_8BIT_NIBBLE: u8 = 0x03;
const COMMIT_4BIT_NIBBLE: u8 = 0x02;
const SELECT_ATTEMPTS: usize = 3;

/// Function set flags for a display with `rows` lines. The 5x10 font only exists on single
/// line displays, so `large_font` is ignored otherwise.
pub(super) fn function_flags(rows: u8, large_font: bool) -> u8 {
    let lines = if rows > 1 { LCD_FLAG_2LINE } else { LCD_FLAG_1LINE };
    let font = if large_font && rows == 1 {
        LCD_FLAG_5x10_DOTS
    } else {
        LCD_FLAG_5x8_DOTS
    };
    LCD_FLAG_4BITMODE | lines | font
}

impl HD44780 {
    /// Brings the controller from an unknown state into 4-bit mode, then configures lines and
    /// font, turns the display on with cursor and blink off, clears it, sets left to right
    /// entry and homes the cursor.
    ///
    /// Transmit failures while escaping to 4-bit mode do not stop the sequence. The first one
    /// is returned once the sequence has finished. A bus that never becomes ready stops it
    /// immediately.
    pub fn init<I2C, DELAY, BUS>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY, BUS>,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
        BUS: BusStatusTrait,
    {
        #[cfg(feature = "defmt")]
        defmt::debug!("Initializing HD44780 at address {=u8:#x}", config.address);

        self.adapter.reset();
        self.display_control = 0;
        self.display_mode = 0;
        self.display_function = function_flags(config.rows, config.large_font);

        let mut first_error: Option<CharacterDisplayError<I2C>> = None;

        config.delay.delay_ms(POWER_ON_DELAY_MS);
        // pull RS and RW low, backlight off
        if let Err(e) = self.adapter.write_raw(config, self.adapter.bits()) {
            first_error.get_or_insert(e);
        }
        config.delay.delay_ms(EXPANDER_RESET_DELAY_MS);

        #[cfg(feature = "defmt")]
        defmt::debug!("Selecting 4-bit interface");
        for attempt in 0..SELECT_ATTEMPTS {
            if let Err(e) = self.adapter.write_nibble_pulse(config, SELECT_8BIT_NIBBLE) {
                first_error.get_or_insert(e);
            }
            self.adapter.wait_until_ready(config)?;
            if attempt == SELECT_ATTEMPTS - 1 {
                config.delay.delay_ms(LAST_SELECT_DELAY_MS);
            } else {
                config.delay.delay_ms(SELECT_DELAY_MS);
            }
        }

        if let Err(e) = self.adapter.write_nibble_pulse(config, COMMIT_4BIT_NIBBLE) {
            first_error.get_or_insert(e);
        }
        self.adapter.wait_until_ready(config)?;

        #[cfg(feature = "defmt")]
        defmt::debug!("Configuring HD44780 function {=u8:#x}", self.display_function);
        self.send_command(config, LCD_CMD_FUNCTIONSET | self.display_function)?;

        self.display_control = LCD_FLAG_DISPLAYON | LCD_FLAG_CURSOROFF | LCD_FLAG_BLINKOFF;
        self.send_command(config, LCD_CMD_DISPLAYCONTROL | self.display_control)?;

        self.clear(config)?;

        self.display_mode = LCD_FLAG_ENTRYLEFT | LCD_FLAG_ENTRYSHIFTDECREMENT;
        self.send_command(config, LCD_CMD_ENTRYMODESET | self.display_mode)?;

        self.home(config)?;

        match first_error {
            Some(e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("HD44780 initialization finished with a transmit failure");
                Err(e)
            }
            None => Ok(()),
        }
    }
}
