use bitfield::bitfield;
use embedded_hal::{delay::DelayNs, i2c};

use crate::{driver::BusStatusTrait, CharacterDisplayError, DeviceSetupConfig};

// Output port layout of the PCF8574T on the common 4-bit LCD backpacks
bitfield! {
    pub struct PCF8574TBitField(u8);
    impl Debug;
    impl BitAnd;
    pub rs, set_rs: 0, 0;
    pub rw, set_rw: 1, 1;
    pub enable, set_enable: 2, 2;
    pub backlight, set_backlight: 3, 3;
    pub data, set_data: 7, 4;
}

impl Clone for PCF8574TBitField {
    fn clone(&self) -> Self {
        *self
    }
}

impl Copy for PCF8574TBitField {}

/// Transport between the HD44780 instruction layer and the PCF8574T expander. Holds the image of
/// the expander output register, which is the only record of what the expander is currently
/// driving onto the LCD pins. Every transaction starts from this image, changes only the fields it
/// needs and strobes enable.
pub struct PCF8574TAdapter {
    bits: PCF8574TBitField,
    backlight: bool,
}

impl Default for PCF8574TAdapter {
    fn default() -> Self {
        Self {
            bits: PCF8574TBitField(0),
            backlight: false,
        }
    }
}

impl PCF8574TAdapter {
    /// Returns the last composed expander byte.
    pub fn bits(&self) -> u8 {
        self.bits.0
    }

    /// Returns the last applied backlight setting.
    pub fn backlight(&self) -> bool {
        self.backlight
    }

    /// Forget everything about the expander outputs. Used at the start of initialization.
    pub fn reset(&mut self) {
        self.bits = PCF8574TBitField(0);
        self.backlight = false;
    }

    /// Writes one byte to the expander without any nibble framing.
    pub fn write_raw<I2C, DELAY, BUS>(
        &self,
        config: &mut DeviceSetupConfig<I2C, DELAY, BUS>,
        value: u8,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
        BUS: BusStatusTrait,
    {
        config
            .i2c
            .write(config.address, &[value])
            .map_err(CharacterDisplayError::I2cError)
    }

    /// Presents `nibble` on the data lines and pulses enable high then low, as a single 2 byte
    /// write. RS stays low. Only used while the controller may still be in 8-bit mode, where one
    /// enable pulse is one complete instruction.
    pub fn write_nibble_pulse<I2C, DELAY, BUS>(
        &self,
        config: &mut DeviceSetupConfig<I2C, DELAY, BUS>,
        nibble: u8,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
        BUS: BusStatusTrait,
    {
        let mut frame = PCF8574TBitField(0);
        frame.set_backlight(self.backlight as u8);
        frame.set_data(nibble & 0x0F);
        frame.set_enable(1);
        let strobe = frame.0;
        frame.set_enable(0);
        config
            .i2c
            .write(config.address, &[strobe, frame.0])
            .map_err(CharacterDisplayError::I2cError)
    }

    /// Composes the four expander bytes that transfer `value` in 4-bit mode:
    /// high nibble with enable high, high nibble with enable low, then the same for the low
    /// nibble. The controller latches on each falling edge of enable. The register image is
    /// left holding the final byte.
    pub fn compose_frame(&mut self, rs_setting: bool, value: u8) -> [u8; 4] {
        self.bits.set_backlight(self.backlight as u8);
        self.bits.set_rs(rs_setting as u8);
        self.bits.set_rw(0);

        self.bits.set_enable(1);
        self.bits.set_data(value >> 4);
        let high_strobe = self.bits.0;
        self.bits.set_enable(0);
        let high_latch = self.bits.0;

        self.bits.set_data(value & 0x0F);
        self.bits.set_enable(1);
        let low_strobe = self.bits.0;
        self.bits.set_enable(0);
        let low_latch = self.bits.0;

        [high_strobe, high_latch, low_strobe, low_latch]
    }

    /// Sends one instruction (`rs_setting == false`) or data byte (`rs_setting == true`) to the
    /// HD44780 as one 4 byte bus write, then waits for the bus to go idle.
    pub fn send<I2C, DELAY, BUS>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY, BUS>,
        rs_setting: bool,
        value: u8,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
        BUS: BusStatusTrait,
    {
        let frame = self.compose_frame(rs_setting, value);
        config
            .i2c
            .write(config.address, &frame)
            .map_err(CharacterDisplayError::I2cError)?;
        self.wait_until_ready(config)
    }

    /// Updates the backlight and writes the whole register image so the change is visible
    /// immediately. The data lines keep whatever nibble was last latched.
    pub fn set_backlight<I2C, DELAY, BUS>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY, BUS>,
        on: bool,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
        BUS: BusStatusTrait,
    {
        self.backlight = on;
        self.bits.set_backlight(on as u8);
        self.write_raw(config, self.bits.0)
    }

    /// Polls the bus status with a 1 ms pause between polls. Gives up with `BusTimeout` after
    /// `ready_poll_limit` pauses.
    pub fn wait_until_ready<I2C, DELAY, BUS>(
        &self,
        config: &mut DeviceSetupConfig<I2C, DELAY, BUS>,
    ) -> Result<(), CharacterDisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
        BUS: BusStatusTrait,
    {
        let mut polls: u32 = 0;
        while !config.bus.is_ready() {
            if polls >= config.ready_poll_limit {
                #[cfg(feature = "defmt")]
                defmt::warn!("I2C bus still busy after {} polls", polls);
                return Err(CharacterDisplayError::BusTimeout);
            }
            config.delay.delay_ms(1);
            polls += 1;
        }
        Ok(())
    }
}
