// HD44780 Support
// `HD44780` owns the controller mode flags and turns each display feature into one instruction.
// Instructions and data reach the controller through `PCF8574TAdapter`, which multiplexes every
// byte onto the expander's 4 data lines. The power-on sequence lives in the `init` submodule.
//

pub mod adapter;
mod init;

use embedded_hal::{delay::DelayNs, i2c};

use crate::{
    driver::{hd44780::adapter::PCF8574TAdapter, BusStatusTrait},
    CharacterDisplayError, DeviceSetupConfig,
};

// commands
const LCD_CMD_CLEARDISPLAY: u8 = 0x01; //  Clear display, set cursor position to zero
const LCD_CMD_RETURNHOME: u8 = 0x02; //  Set cursor position to zero
const LCD_CMD_ENTRYMODESET: u8 = 0x04; //  Sets the entry mode
const LCD_CMD_DISPLAYCONTROL: u8 = 0x08; //  Controls the display; does stuff like turning it off and on
const LCD_CMD_CURSORSHIFT: u8 = 0x10; //  Lets you move the cursor
const LCD_CMD_FUNCTIONSET: u8 = 0x20; //  Used to send the function to set to the display
const LCD_CMD_SETCGRAMADDR: u8 = 0x40; //  Used to set the CGRAM (character generator RAM) with characters
const LCD_CMD_SETDDRAMADDR: u8 = 0x80; //  Used to set the DDRAM (Display Data RAM)

// flags for display entry mode
const LCD_FLAG_ENTRYLEFT: u8 = 0x02; //  Used to set text to flow from left to right
const LCD_FLAG_ENTRYSHIFTINCREMENT: u8 = 0x01; //  Used to 'right justify' text from the cursor
const LCD_FLAG_ENTRYSHIFTDECREMENT: u8 = 0x00; //  Used to 'left justify' text from the cursor

// flags for display on/off control
const LCD_FLAG_DISPLAYON: u8 = 0x04; //  Turns the display on
const LCD_FLAG_CURSORON: u8 = 0x02; //  Turns the cursor on
const LCD_FLAG_CURSOROFF: u8 = 0x00; //  Turns the cursor off
const LCD_FLAG_BLINKON: u8 = 0x01; //  Turns on the blinking cursor
const LCD_FLAG_BLINKOFF: u8 = 0x00; //  Turns off the blinking cursor

// flags for display/cursor shift
const LCD_FLAG_DISPLAYMOVE: u8 = 0x08; //  Flag for moving the display
const LCD_FLAG_MOVERIGHT: u8 = 0x04; //  Flag for moving right
const LCD_FLAG_MOVELEFT: u8 = 0x00; //  Flag for moving left

// flags for function set
const LCD_FLAG_4BITMODE: u8 = 0x00; //  LCD 4 bit mode
const LCD_FLAG_2LINE: u8 = 0x08; //  LCD 2 line mode
const LCD_FLAG_1LINE: u8 = 0x00; //  LCD 1 line mode
const LCD_FLAG_5x10_DOTS: u8 = 0x04; //  10 pixel high font mode
const LCD_FLAG_5x8_DOTS: u8 = 0x00; //  8 pixel high font mode

/// DDRAM address of the first column of each row
const ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

/// Clear and home take ~1.52 ms on the controller and signal nothing when done.
const LONG_INSTRUCTION_DELAY_MS: u32 = 2;

pub struct HD44780 {
    display_function: u8,
    display_control: u8,
    display_mode: u8,
    adapter: PCF8574TAdapter,
}

impl Default for HD44780 {
    fn default() -> Self {
        Self {
            display_function: 0,
            display_control: 0,
            display_mode: 0,
            adapter: PCF8574TAdapter::default(),
        }
    }
}

impl HD44780 {
    pub fn display_function(&self) -> u8 {
        self.display_function
    }

    pub fn display_control(&self) -> u8 {
        self.display_control
    }

    pub fn display_mode(&self) -> u8 {
        self.display_mode
    }

    pub fn backlight_enabled(&self) -> bool {
        self.adapter.backlight()
    }

    pub fn register_image(&self) -> u8 {
        self.adapter.bits()
    }

    fn send_command<I2C, DELAY, BUS>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY, BUS>,
        command: u8,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
        BUS: BusStatusTrait,
    {
        self.adapter.send(config, false, command)
    }

    /// Writes one byte to DDRAM or CGRAM, whichever was addressed last.
    pub fn write_data<I2C, DELAY, BUS>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY, BUS>,
        value: u8,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
        BUS: BusStatusTrait,
    {
        self.adapter.send(config, true, value)
    }

    pub fn clear<I2C, DELAY, BUS>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY, BUS>,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
        BUS: BusStatusTrait,
    {
        self.send_command(config, LCD_CMD_CLEARDISPLAY)?;
        config.delay.delay_ms(LONG_INSTRUCTION_DELAY_MS);
        Ok(())
    }

    pub fn home<I2C, DELAY, BUS>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY, BUS>,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
        BUS: BusStatusTrait,
    {
        self.send_command(config, LCD_CMD_RETURNHOME)?;
        config.delay.delay_ms(LONG_INSTRUCTION_DELAY_MS);
        Ok(())
    }

    /// Set the cursor position at specified column and row. Columns and rows are zero-indexed.
    /// A row past the last configured row selects the last row. The DDRAM address is kept to
    /// 7 bits so a large column can never change the instruction.
    pub fn set_cursor<I2C, DELAY, BUS>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY, BUS>,
        col: u8,
        row: u8,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
        BUS: BusStatusTrait,
    {
        let row = if row >= config.rows {
            #[cfg(feature = "defmt")]
            defmt::warn!("Row {} out of range, using row {}", row, config.rows - 1);
            config.rows - 1
        } else {
            row
        };
        let address = col.wrapping_add(ROW_OFFSETS[row as usize]) & 0x7F;
        self.send_command(config, LCD_CMD_SETDDRAMADDR | address)
    }

    pub fn show_cursor<I2C, DELAY, BUS>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY, BUS>,
        show_cursor: bool,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
        BUS: BusStatusTrait,
    {
        if show_cursor {
            self.display_control |= LCD_FLAG_CURSORON;
        } else {
            self.display_control &= !LCD_FLAG_CURSORON;
        }
        self.send_command(config, LCD_CMD_DISPLAYCONTROL | self.display_control)
    }

    pub fn blink_cursor<I2C, DELAY, BUS>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY, BUS>,
        blink_cursor: bool,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
        BUS: BusStatusTrait,
    {
        if blink_cursor {
            self.display_control |= LCD_FLAG_BLINKON;
        } else {
            self.display_control &= !LCD_FLAG_BLINKON;
        }
        self.send_command(config, LCD_CMD_DISPLAYCONTROL | self.display_control)
    }

    pub fn show_display<I2C, DELAY, BUS>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY, BUS>,
        show_display: bool,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
        BUS: BusStatusTrait,
    {
        if show_display {
            self.display_control |= LCD_FLAG_DISPLAYON;
        } else {
            self.display_control &= !LCD_FLAG_DISPLAYON;
        }
        self.send_command(config, LCD_CMD_DISPLAYCONTROL | self.display_control)
    }

    pub fn scroll_display_left<I2C, DELAY, BUS>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY, BUS>,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
        BUS: BusStatusTrait,
    {
        self.send_command(
            config,
            LCD_CMD_CURSORSHIFT | LCD_FLAG_DISPLAYMOVE | LCD_FLAG_MOVELEFT,
        )
    }

    pub fn scroll_display_right<I2C, DELAY, BUS>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY, BUS>,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
        BUS: BusStatusTrait,
    {
        self.send_command(
            config,
            LCD_CMD_CURSORSHIFT | LCD_FLAG_DISPLAYMOVE | LCD_FLAG_MOVERIGHT,
        )
    }

    pub fn left_to_right<I2C, DELAY, BUS>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY, BUS>,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
        BUS: BusStatusTrait,
    {
        self.display_mode |= LCD_FLAG_ENTRYLEFT;
        self.send_command(config, LCD_CMD_ENTRYMODESET | self.display_mode)
    }

    pub fn right_to_left<I2C, DELAY, BUS>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY, BUS>,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
        BUS: BusStatusTrait,
    {
        self.display_mode &= !LCD_FLAG_ENTRYLEFT;
        self.send_command(config, LCD_CMD_ENTRYMODESET | self.display_mode)
    }

    pub fn autoscroll<I2C, DELAY, BUS>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY, BUS>,
        autoscroll: bool,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
        BUS: BusStatusTrait,
    {
        if autoscroll {
            self.display_mode |= LCD_FLAG_ENTRYSHIFTINCREMENT;
        } else {
            self.display_mode &= !LCD_FLAG_ENTRYSHIFTINCREMENT;
        }
        self.send_command(config, LCD_CMD_ENTRYMODESET | self.display_mode)
    }

    /// Programs one of the 8 CGRAM glyph slots. Only the low 3 bits of `location` are used.
    /// The controller is left addressing CGRAM, so a cursor or clear instruction must follow
    /// before printing text again.
    pub fn create_char<I2C, DELAY, BUS>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY, BUS>,
        location: u8,
        charmap: [u8; 8],
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
        BUS: BusStatusTrait,
    {
        self.send_command(config, LCD_CMD_SETCGRAMADDR | ((location & 0x7) << 3))?;
        for &charmap_byte in charmap.iter() {
            self.write_data(config, charmap_byte)?;
        }
        Ok(())
    }

    pub fn print<I2C, DELAY, BUS>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY, BUS>,
        text: &str,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
        BUS: BusStatusTrait,
    {
        #[cfg(feature = "defmt")]
        defmt::debug!("Printing: {}", text);
        for c in text.chars() {
            self.write_data(config, c as u8)?;
        }
        Ok(())
    }

    pub fn backlight<I2C, DELAY, BUS>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY, BUS>,
        on: bool,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
        BUS: BusStatusTrait,
    {
        #[cfg(feature = "defmt")]
        defmt::debug!("Backlight {}", on);
        self.adapter.set_backlight(config, on)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use embedded_hal_mock::eh1::{
        delay::NoopDelay,
        i2c::{Mock as I2cMock, Transaction as I2cTransaction},
    };

    /// the four expander bytes for `value`, backlight off
    fn frame(rs: bool, value: u8) -> std::vec::Vec<u8> {
        let rs = rs as u8;
        std::vec![
            (value & 0xF0) | 0b0100 | rs,
            (value & 0xF0) | rs,
            (value << 4) | 0b0100 | rs,
            (value << 4) | rs,
        ]
    }

    fn config(
        expected: &[I2cTransaction],
        rows: u8,
    ) -> DeviceSetupConfig<I2cMock, NoopDelay> {
        DeviceSetupConfig::new(I2cMock::new(expected), 0x27, rows, NoopDelay)
    }

    #[test]
    fn test_set_cursor_row_offsets() {
        let mut config = config(
            &[
                I2cTransaction::write(0x27, frame(false, 0x80)), // (0,0)
                I2cTransaction::write(0x27, frame(false, 0xC0)), // (0,1)
                I2cTransaction::write(0x27, frame(false, 0x94)), // (0,2)
                I2cTransaction::write(0x27, frame(false, 0xD4 + 19)), // (19,3)
            ],
            4,
        );
        let mut driver = HD44780::default();

        assert!(driver.set_cursor(&mut config, 0, 0).is_ok());
        assert!(driver.set_cursor(&mut config, 0, 1).is_ok());
        assert!(driver.set_cursor(&mut config, 0, 2).is_ok());
        assert!(driver.set_cursor(&mut config, 19, 3).is_ok());
        config.i2c.done();
    }

    #[test]
    fn test_set_cursor_clamps_row() {
        // a row equal to the row count is clamped too, not only rows past it
        let mut config = config(
            &[
                I2cTransaction::write(0x27, frame(false, 0xC5)), // (5,2) on 2 rows -> (5,1)
                I2cTransaction::write(0x27, frame(false, 0xC0)), // (0,200) on 2 rows -> (0,1)
            ],
            2,
        );
        let mut driver = HD44780::default();

        assert!(driver.set_cursor(&mut config, 5, 2).is_ok());
        assert!(driver.set_cursor(&mut config, 0, 200).is_ok());
        config.i2c.done();
    }

    #[test]
    fn test_set_cursor_single_row_display() {
        let mut config = config(&[I2cTransaction::write(0x27, frame(false, 0x83))], 1);
        let mut driver = HD44780::default();

        assert!(driver.set_cursor(&mut config, 3, 1).is_ok());
        config.i2c.done();
    }

    #[test]
    fn test_set_cursor_masks_column() {
        // column 0x50 on row 1: 0x40 + 0x50 = 0x90, kept to 7 bits -> 0x10
        let mut config = config(&[I2cTransaction::write(0x27, frame(false, 0x90))], 2);
        let mut driver = HD44780::default();

        assert!(driver.set_cursor(&mut config, 0x50, 1).is_ok());
        config.i2c.done();
    }

    #[test]
    fn test_display_control_toggles() {
        let mut config = config(
            &[
                I2cTransaction::write(0x27, frame(false, 0x0C)), // display on
                I2cTransaction::write(0x27, frame(false, 0x0E)), // cursor on
                I2cTransaction::write(0x27, frame(false, 0x0F)), // blink on
                I2cTransaction::write(0x27, frame(false, 0x0B)), // display off
                I2cTransaction::write(0x27, frame(false, 0x09)), // cursor off
                I2cTransaction::write(0x27, frame(false, 0x08)), // blink off
            ],
            2,
        );
        let mut driver = HD44780::default();

        assert!(driver.show_display(&mut config, true).is_ok());
        assert!(driver.show_cursor(&mut config, true).is_ok());
        assert!(driver.blink_cursor(&mut config, true).is_ok());
        assert_eq!(driver.display_control(), 0x07);
        assert!(driver.show_display(&mut config, false).is_ok());
        assert!(driver.show_cursor(&mut config, false).is_ok());
        assert!(driver.blink_cursor(&mut config, false).is_ok());
        assert_eq!(driver.display_control(), 0x00);
        config.i2c.done();
    }

    #[test]
    fn test_hiding_twice_is_idempotent() {
        let mut config = config(
            &[
                I2cTransaction::write(0x27, frame(false, 0x0F)),
                I2cTransaction::write(0x27, frame(false, 0x0B)),
                I2cTransaction::write(0x27, frame(false, 0x0B)),
                I2cTransaction::write(0x27, frame(false, 0x09)),
                I2cTransaction::write(0x27, frame(false, 0x09)),
                I2cTransaction::write(0x27, frame(false, 0x08)),
                I2cTransaction::write(0x27, frame(false, 0x08)),
            ],
            2,
        );
        let mut driver = HD44780::default();
        driver.display_control = LCD_FLAG_DISPLAYON | LCD_FLAG_CURSORON;
        assert!(driver.blink_cursor(&mut config, true).is_ok());

        assert!(driver.show_display(&mut config, false).is_ok());
        let once = driver.display_control();
        assert!(driver.show_display(&mut config, false).is_ok());
        assert_eq!(driver.display_control(), once);

        assert!(driver.show_cursor(&mut config, false).is_ok());
        let once = driver.display_control();
        assert!(driver.show_cursor(&mut config, false).is_ok());
        assert_eq!(driver.display_control(), once);

        assert!(driver.blink_cursor(&mut config, false).is_ok());
        let once = driver.display_control();
        assert!(driver.blink_cursor(&mut config, false).is_ok());
        assert_eq!(driver.display_control(), once);
        config.i2c.done();
    }

    #[test]
    fn test_entry_mode_changes() {
        let mut config = config(
            &[
                I2cTransaction::write(0x27, frame(false, 0x04)), // right to left
                I2cTransaction::write(0x27, frame(false, 0x05)), // autoscroll on
                I2cTransaction::write(0x27, frame(false, 0x07)), // left to right
                I2cTransaction::write(0x27, frame(false, 0x06)), // autoscroll off
            ],
            2,
        );
        let mut driver = HD44780::default();
        driver.display_mode = LCD_FLAG_ENTRYLEFT | LCD_FLAG_ENTRYSHIFTDECREMENT;

        assert!(driver.right_to_left(&mut config).is_ok());
        assert!(driver.autoscroll(&mut config, true).is_ok());
        assert!(driver.left_to_right(&mut config).is_ok());
        assert!(driver.autoscroll(&mut config, false).is_ok());
        assert_eq!(driver.display_mode(), 0x02);
        config.i2c.done();
    }

    #[test]
    fn test_scroll_display() {
        let mut config = config(
            &[
                I2cTransaction::write(0x27, frame(false, 0x18)),
                I2cTransaction::write(0x27, frame(false, 0x1C)),
            ],
            2,
        );
        let mut driver = HD44780::default();

        assert!(driver.scroll_display_left(&mut config).is_ok());
        assert!(driver.scroll_display_right(&mut config).is_ok());
        // shifting the display leaves the mode flags alone
        assert_eq!(driver.display_control(), 0);
        assert_eq!(driver.display_mode(), 0);
        config.i2c.done();
    }

    #[test]
    fn test_create_char() {
        let charmap = [0x00, 0x0A, 0x1F, 0x1F, 0x0E, 0x04, 0x00, 0x00];
        let mut expected = std::vec![
            // slot 9 is masked to slot 1 -> CGRAM address 0x08
            I2cTransaction::write(0x27, frame(false, 0x48)),
        ];
        for byte in charmap {
            expected.push(I2cTransaction::write(0x27, frame(true, byte)));
        }
        let mut config = config(&expected, 2);
        let mut driver = HD44780::default();

        assert!(driver.create_char(&mut config, 9, charmap).is_ok());
        config.i2c.done();
    }

    #[test]
    fn test_print() {
        let mut config = config(
            &[
                I2cTransaction::write(0x27, std::vec![0b0110_0101, 0b0110_0001, 0b1000_0101, 0b1000_0001]), // 'h' 0x68
                I2cTransaction::write(0x27, std::vec![0b0110_0101, 0b0110_0001, 0b0101_0101, 0b0101_0001]), // 'e' 0x65
                I2cTransaction::write(0x27, std::vec![0b0110_0101, 0b0110_0001, 0b1100_0101, 0b1100_0001]), // 'l' 0x6C
                I2cTransaction::write(0x27, std::vec![0b0110_0101, 0b0110_0001, 0b1100_0101, 0b1100_0001]), // 'l' 0x6C
                I2cTransaction::write(0x27, std::vec![0b0110_0101, 0b0110_0001, 0b1111_0101, 0b1111_0001]), // 'o' 0x6F
            ],
            2,
        );
        let mut driver = HD44780::default();

        assert!(driver.print(&mut config, "hello").is_ok());
        config.i2c.done();
    }

    #[test]
    fn test_backlight_independent_of_mode_flags() {
        let mut config = config(
            &[
                I2cTransaction::write(0x27, std::vec![0b0000_1000]),
                // backlight bit rides along on the next instruction
                I2cTransaction::write(0x27, std::vec![0b0000_1100, 0b0000_1000, 0b1100_1100, 0b1100_1000]),
                I2cTransaction::write(0x27, std::vec![0b1100_0000]),
            ],
            2,
        );
        let mut driver = HD44780::default();
        driver.display_function = LCD_FLAG_2LINE;
        driver.display_mode = LCD_FLAG_ENTRYLEFT;

        assert!(driver.backlight(&mut config, true).is_ok());
        assert!(driver.backlight_enabled());
        assert_eq!(driver.display_function(), LCD_FLAG_2LINE);
        assert_eq!(driver.display_control(), 0);
        assert_eq!(driver.display_mode(), LCD_FLAG_ENTRYLEFT);

        assert!(driver.show_display(&mut config, true).is_ok());
        assert!(driver.backlight_enabled());
        assert_eq!(driver.register_image() & 0b0000_1000, 0b0000_1000);

        assert!(driver.backlight(&mut config, false).is_ok());
        assert_eq!(driver.display_control(), LCD_FLAG_DISPLAYON);
        config.i2c.done();
    }
}
