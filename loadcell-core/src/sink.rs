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

use embedded_io_async::Write;

const LINE_ENDING: &[u8] = b"\r\n";

/// Destination for report lines.
pub trait ReportSink {
    type Error;

    async fn write_line(&mut self, line: &str) -> Result<(), Self::Error>;
}

/// Terminates each line with CRLF and pushes it into a byte stream such as a UART.
pub struct SerialLineWriter<W> {
    writer: W,
}

impl<W> SerialLineWriter<W>
where
    W: Write,
{
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W> ReportSink for SerialLineWriter<W>
where
    W: Write,
{
    type Error = W::Error;

    async fn write_line(&mut self, line: &str) -> Result<(), Self::Error> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(LINE_ENDING).await
    }
}
