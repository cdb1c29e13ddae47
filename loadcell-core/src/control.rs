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

use crate::channel::{ChannelError, ScaleChannel};
use crate::interface::AsyncStrainGaugeInterface;
use crate::report::{format_reading, Reading, ReportFormat};
use crate::sink::ReportSink;
use core::future::Future;

/// Bounds how long a blocking weight read may take. `None` means the read was abandoned.
pub trait ReadGuard {
    async fn guard<F: Future>(&mut self, read: F) -> Option<F::Output>;
}

/// Waits as long as the amplifier needs, a sensor that never becomes ready stalls the loop.
pub struct Unbounded;

impl ReadGuard for Unbounded {
    async fn guard<F: Future>(&mut self, read: F) -> Option<F::Output> {
        Some(read.await)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PassSummary {
    pub reported: usize,
    pub not_ready: usize,
    pub timed_out: usize,
    pub failed: usize,
}

impl PassSummary {
    fn record(&mut self, reading: &Reading) {
        match reading {
            Reading::Weight(_) => self.reported += 1,
            Reading::NotReady => self.not_ready += 1,
            Reading::TimedOut => self.timed_out += 1,
        }
    }
}

/// Readiness check then, if ready, a read of the configured number of samples.
pub async fn poll_channel<G, E, RG>(
    channel: &mut ScaleChannel<G>,
    guard: &mut RG,
) -> Result<Reading, ChannelError<E>>
where
    G: AsyncStrainGaugeInterface<Error = E>,
    RG: ReadGuard,
{
    if !channel.is_ready() {
        return Ok(Reading::NotReady);
    }

    let sample_count = channel.config().sample_count;
    match guard.guard(channel.read_weight(sample_count)).await {
        Some(weight) => weight.map(Reading::Weight),
        None => Err(ChannelError::SensorTimeout),
    }
}

/// One control loop pass: every channel in order gets exactly one line in `sink`. A channel
/// whose driver fails gets no line and is counted in the summary. Only sink errors end the pass
/// early.
pub async fn report_pass<G, E, S, RG>(
    channels: &mut [ScaleChannel<G>],
    format: &ReportFormat,
    sink: &mut S,
    guard: &mut RG,
) -> Result<PassSummary, S::Error>
where
    G: AsyncStrainGaugeInterface<Error = E>,
    S: ReportSink,
    RG: ReadGuard,
{
    let mut summary = PassSummary::default();

    for channel in channels.iter_mut() {
        let label = channel.label();
        let reading = match poll_channel(channel, guard).await {
            Ok(reading) => reading,
            Err(ChannelError::SensorTimeout) => {
                warn!("Channel {} timed out waiting for a conversion", label);
                Reading::TimedOut
            }
            Err(ChannelError::StrainGaugeReadingError(_)) => {
                warn!("Channel {} read failed", label);
                summary.failed += 1;
                continue;
            }
        };

        summary.record(&reading);
        sink.write_line(&format_reading(label, reading, format)).await?;
    }

    Ok(summary)
}
