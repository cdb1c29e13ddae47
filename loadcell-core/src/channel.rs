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
use crate::interface::hx711async::Hx711Gain;
use micromath::statistics::StdDev;

/// Number of conversions averaged when capturing the zero offset.
pub const TARE_SAMPLES: usize = 10;

/// Platform line number of a pin wired to the amplifier. Only used to identify the channel in
/// logs, the core never touches the hardware through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinId(pub u8);

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelConfig {
    pub label: &'static str,
    pub data_pin: PinId,
    pub clock_pin: PinId,
    pub gain: Hx711Gain,
    /// Raw counts per physical unit. Determined per load cell, never portable between sensors.
    pub scale_factor: f32,
    /// Raw conversions averaged for each reported weight.
    pub sample_count: usize,
}

impl ChannelConfig {
    pub const fn new(label: &'static str, data_pin: PinId, clock_pin: PinId) -> Self {
        Self {
            label,
            data_pin,
            clock_pin,
            gain: Hx711Gain::Gain128,
            scale_factor: 1.0,
            sample_count: 1,
        }
    }

    pub const fn with_gain(mut self, gain: Hx711Gain) -> Self {
        self.gain = gain;
        self
    }

    pub const fn with_scale_factor(mut self, scale_factor: f32) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    pub const fn with_sample_count(mut self, sample_count: usize) -> Self {
        self.sample_count = sample_count;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelError<StrainGaugeE> {
    StrainGaugeReadingError(StrainGaugeE),
    /// The amplifier did not deliver a conversion within the time the caller allowed.
    SensorTimeout,
}

/// One load cell behind one amplifier: its fixed configuration plus the zero offset captured at
/// tare time.
pub struct ScaleChannel<StrainGauge> {
    config: ChannelConfig,
    strain_gauge: StrainGauge,
    zero_offset: f64,
    tare_noise: f32,
}

impl<StrainGauge> ScaleChannel<StrainGauge> {
    #[cfg(test)]
    pub(crate) fn strain_gauge_mut(&mut self) -> &mut StrainGauge {
        &mut self.strain_gauge
    }
}

impl<StrainGauge, StrainGaugeE> ScaleChannel<StrainGauge>
where
    StrainGauge: AsyncStrainGaugeInterface<Error = StrainGaugeE>,
{
    /// Powers the gauge up and applies the configured gain. Must happen once before any reading.
    pub async fn new(
        config: ChannelConfig,
        mut strain_gauge: StrainGauge,
    ) -> Result<Self, ChannelError<StrainGaugeE>> {
        strain_gauge
            .initialize()
            .await
            .map_err(ChannelError::StrainGaugeReadingError)?;
        strain_gauge
            .set_gain(config.gain)
            .await
            .map_err(ChannelError::StrainGaugeReadingError)?;

        debug!(
            "Channel {} initialised on data pin {}, clock pin {}, gain {}",
            config.label,
            config.data_pin.0,
            config.clock_pin.0,
            config.gain.factor()
        );

        Ok(Self {
            config,
            strain_gauge,
            zero_offset: 0.0,
            tare_noise: 0.0,
        })
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn label(&self) -> &'static str {
        self.config.label
    }

    /// No validation takes place, a wrong factor silently gives wrong weights.
    pub fn set_scale_factor(&mut self, scale_factor: f32) {
        self.config.scale_factor = scale_factor;
    }

    pub fn scale_factor(&self) -> f32 {
        self.config.scale_factor
    }

    pub fn zero_offset(&self) -> f64 {
        self.zero_offset
    }

    /// Standard deviation in raw counts of the conversions seen by the last tare.
    pub fn tare_noise(&self) -> f32 {
        self.tare_noise
    }

    /// Reports a pin failure as not ready, the caller then skips this channel for the pass.
    pub fn is_ready(&mut self) -> bool {
        match self.strain_gauge.is_ready() {
            Ok(ready) => ready,
            Err(_) => {
                warn!("Channel {}: unable to sample DOUT", self.config.label);
                false
            }
        }
    }

    async fn get_raw_reading(&mut self) -> Result<i32, ChannelError<StrainGaugeE>> {
        let reading = self
            .strain_gauge
            .get_next_reading()
            .await
            .map_err(ChannelError::StrainGaugeReadingError)?;
        trace!("Channel {} raw reading = {}", self.config.label, reading);
        Ok(reading)
    }

    /// Arithmetic mean of `count` raw conversions, at least one is always taken.
    pub async fn read_raw_average(
        &mut self,
        count: usize,
    ) -> Result<f64, ChannelError<StrainGaugeE>> {
        let count = count.max(1);
        let mut sum: i64 = 0;
        for _ in 0..count {
            sum += self.get_raw_reading().await? as i64;
        }
        Ok(sum as f64 / count as f64)
    }

    /// Captures the unloaded reading as the new zero offset. Blocks until `TARE_SAMPLES`
    /// conversions have been taken.
    pub async fn tare(&mut self) -> Result<(), ChannelError<StrainGaugeE>> {
        let mut measurements = [0i32; TARE_SAMPLES];
        for measurement in measurements.iter_mut() {
            *measurement = self.get_raw_reading().await?;
        }

        let sum: i64 = measurements.iter().map(|m| *m as i64).sum();
        self.zero_offset = sum as f64 / TARE_SAMPLES as f64;

        // relative to the first sample so the f32 maths keeps its precision
        let first = measurements[0];
        let deviations = measurements.map(|m| (m - first) as f32);
        self.tare_noise = deviations.as_slice().stddev();

        debug!(
            "Channel {} tare offset = {}, noise = {} counts",
            self.config.label, self.zero_offset, self.tare_noise
        );
        Ok(())
    }

    /// Weight in calibrated units: `(mean(raw) - zero_offset) / scale_factor`. The offset is
    /// removed once from the mean, not from each sample.
    pub async fn read_weight(
        &mut self,
        sample_count: usize,
    ) -> Result<f32, ChannelError<StrainGaugeE>> {
        let mean = self.read_raw_average(sample_count).await?;
        let tared = mean - self.zero_offset;
        trace!("Channel {} tared reading = {}", self.config.label, tared);
        Ok((tared / self.config.scale_factor as f64) as f32)
    }
}
