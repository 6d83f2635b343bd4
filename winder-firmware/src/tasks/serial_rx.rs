//! Operator UART receive task
//!
//! Assembles request lines and hands them to the motion task.

use core::fmt::Write;

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embedded_io_async::Read;

use winder_protocol::LineParser;

use crate::channels::{Reply, LINE_CHANNEL, REPLY_CHANNEL};

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 64;

/// Serial RX task - receives request lines from the operator
#[embassy_executor::task]
pub async fn serial_rx_task(mut rx: BufferedUartRx) {
    info!("Serial RX task started");

    let mut parser = LineParser::new();
    let mut buf = [0u8; RX_BUF_SIZE];

    loop {
        match rx.read(&mut buf).await {
            Ok(n) if n > 0 => {
                trace!("RX: {} bytes", n);

                for &byte in &buf[..n] {
                    match parser.feed(byte) {
                        Ok(Some(line)) => LINE_CHANNEL.send(line).await,
                        Ok(None) => {}
                        Err(e) => {
                            warn!("Line dropped: {:?}", e);
                            let mut reply = Reply::new();
                            // Always fits
                            let _ = writeln!(reply, "ERR {}", e.as_token());
                            REPLY_CHANNEL.send(reply).await;
                        }
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("UART read error: {:?}", e);
            }
        }
    }
}
