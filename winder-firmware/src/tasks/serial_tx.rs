//! Operator UART transmit task

use defmt::*;
use embassy_rp::uart::BufferedUartTx;
use embedded_io_async::Write;

use crate::channels::REPLY_CHANNEL;

/// Serial TX task - writes replies in order
#[embassy_executor::task]
pub async fn serial_tx_task(mut tx: BufferedUartTx) {
    info!("Serial TX task started");

    loop {
        let reply = REPLY_CHANNEL.receive().await;
        if let Err(e) = tx.write_all(reply.as_bytes()).await {
            warn!("Failed to send reply: {:?}", e);
        }
    }
}
