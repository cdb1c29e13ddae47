// Copyright (C) 2025 Paul Hampson
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License version 3 as  published by the
// Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::interface::AsyncStrainGaugeInterface;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::digital::Wait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Hx711Gain {
    Gain128,
    Gain64,
    Gain32ChannelB,
}

impl Hx711Gain {
    /// Total clock pulses per read. Pulses after the 24 data bits select the gain of the next
    /// conversion.
    fn tick_count(&self) -> usize {
        match self {
            Hx711Gain::Gain128 => 25,
            Hx711Gain::Gain64 => 27,
            Hx711Gain::Gain32ChannelB => 26,
        }
    }

    pub fn factor(&self) -> u8 {
        match self {
            Hx711Gain::Gain128 => 128,
            Hx711Gain::Gain64 => 64,
            Hx711Gain::Gain32ChannelB => 32,
        }
    }
}

impl TryFrom<u8> for Hx711Gain {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            128 => Ok(Hx711Gain::Gain128),
            64 => Ok(Hx711Gain::Gain64),
            32 => Ok(Hx711Gain::Gain32ChannelB),
            other => Err(other),
        }
    }
}

// PD_SCK held high for more than 60us powers the HX711 down
const POWER_MODE_CHANGE_DELAY_US: u32 = 60;
const CLK_HALF_PERIOD_US: u32 = 1;
const VALID_DATA_BITS: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<OutPinE, InPinE> {
    OutPin(OutPinE),
    InPin(InPinE),
}

/// Drop the gain selection bits and sign extend the 24 bit two's complement conversion result.
fn decode_reading(shifted_in: u32, clocks: usize) -> i32 {
    let data = (shifted_in >> (clocks - VALID_DATA_BITS)) & ((1 << VALID_DATA_BITS) - 1);
    ((data << 8) as i32) >> 8
}

pub struct Hx711Async<CLK, DATA, DELAY> {
    clock_pin: CLK,
    data_pin: DATA,
    delay: DELAY,
    gain: Hx711Gain,
    powered_up: bool,
    /// Set while a conversion is being clocked out or the link is being reset. Still set on
    /// entry means the previous read was dropped part way and the chip is out of step with the
    /// driver.
    shift_interrupted: bool,
}

/// Returns PD_SCK to low when a read is dropped mid-pulse. Left high for more than 60us the
/// HX711 would power itself down behind the driver's back.
struct ClockLowOnDrop<'a, CLK: OutputPin>(&'a mut CLK);

impl<CLK: OutputPin> Drop for ClockLowOnDrop<'_, CLK> {
    fn drop(&mut self) {
        let _ = self.0.set_low();
    }
}

impl<CLK, DATA, DELAY> Hx711Async<CLK, DATA, DELAY> {
    /// The HX711 comes out of power up at gain 128, so that is where the driver starts too.
    pub fn new(clock_pin: CLK, data_pin: DATA, delay: DELAY) -> Self {
        Self {
            clock_pin,
            data_pin,
            delay,
            gain: Hx711Gain::Gain128,
            powered_up: false,
            shift_interrupted: false,
        }
    }
}

impl<CLK, DATA, DELAY, ClkE, DataE> Hx711Async<CLK, DATA, DELAY>
where
    CLK: OutputPin<Error = ClkE>,
    DATA: Wait<Error = DataE> + InputPin<Error = DataE>,
    DELAY: DelayNs,
{
    async fn shift_in(&mut self) -> Result<i32, Error<ClkE, DataE>> {
        // DOUT goes low when conversion is ready
        self.data_pin.wait_for_low().await.map_err(Error::InPin)?;
        self.shift_interrupted = true;

        let clocks = self.gain.tick_count();
        let mut data: u32 = 0;
        let mut clock = ClockLowOnDrop(&mut self.clock_pin);
        for _ in 0..clocks {
            clock.0.set_high().map_err(Error::OutPin)?;
            self.delay.delay_us(CLK_HALF_PERIOD_US).await;
            clock.0.set_low().map_err(Error::OutPin)?;
            data <<= 1;
            if self.data_pin.is_high().map_err(Error::InPin)? {
                data |= 0x1;
            }
            self.delay.delay_us(CLK_HALF_PERIOD_US).await;
        }
        drop(clock);

        self.shift_interrupted = false;
        Ok(decode_reading(data, clocks))
    }

    /// Power cycles the chip, which clears its shift register and drops it back to gain 128,
    /// then reselects the configured gain.
    async fn reset_link(&mut self) -> Result<(), Error<ClkE, DataE>> {
        self.shift_interrupted = true;
        self.power_down().await?;
        self.power_up().await?;
        self.shift_interrupted = false;
        if self.gain != Hx711Gain::Gain128 {
            let _ = self.shift_in().await?;
        }
        Ok(())
    }
}

impl<CLK, DATA, DELAY, ClkE, DataE> AsyncStrainGaugeInterface for Hx711Async<CLK, DATA, DELAY>
where
    CLK: OutputPin<Error = ClkE>,
    DATA: Wait<Error = DataE> + InputPin<Error = DataE>,
    DELAY: DelayNs,
{
    type Error = Error<ClkE, DataE>;

    async fn initialize(&mut self) -> Result<(), Self::Error> {
        self.power_up().await
    }

    async fn set_gain(&mut self, gain: Hx711Gain) -> Result<(), Self::Error> {
        if gain == self.gain {
            return Ok(());
        }
        self.gain = gain;
        // the reading in flight was converted at the old gain, clock it out with the new
        // selection pulses and throw it away
        let _ = self.get_next_reading().await?;
        Ok(())
    }

    fn is_ready(&mut self) -> Result<bool, Self::Error> {
        if self.shift_interrupted {
            // DOUT is not telling us anything, the next read resets the link
            return Ok(true);
        }
        if !self.powered_up {
            return Ok(false);
        }
        self.data_pin.is_low().map_err(Error::InPin)
    }

    async fn get_next_reading(&mut self) -> Result<i32, Self::Error> {
        if !self.powered_up || self.shift_interrupted {
            self.reset_link().await?;
        }
        self.shift_in().await
    }

    async fn power_down(&mut self) -> Result<(), Self::Error> {
        self.clock_pin.set_low().map_err(Error::OutPin)?;
        self.clock_pin.set_high().map_err(Error::OutPin)?;
        self.delay.delay_us(POWER_MODE_CHANGE_DELAY_US).await;
        self.powered_up = false;
        Ok(())
    }

    async fn power_up(&mut self) -> Result<(), Self::Error> {
        self.clock_pin.set_low().map_err(Error::OutPin)?;
        self.delay.delay_us(POWER_MODE_CHANGE_DELAY_US).await;
        self.powered_up = true;
        Ok(())
    }
}
