#![cfg_attr(not(test), no_std)]
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

//! Platform independent pieces of the load-cell read-out: the HX711 driver, the per-sensor
//! scale channel, the control loop pass and the text line protocol spoken over the serial link.

#[macro_use]
mod fmt;

pub mod channel;
pub mod control;
pub mod interface;
pub mod report;
pub mod sink;

pub use channel::{ChannelConfig, ChannelError, PinId, ScaleChannel};
pub use interface::hx711async::{Hx711Async, Hx711Gain};
pub use interface::AsyncStrainGaugeInterface;
