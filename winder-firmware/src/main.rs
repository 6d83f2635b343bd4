//! kbWinder - Guitar Pickup Coil Winder Firmware
//!
//! Main firmware binary for RP2040-based boards. Drives the winder (bobbin)
//! and traverse (wire guide) steppers from the board-agnostic motion core
//! and exposes the operator line protocol on UART0.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use winder_core::persist;
use winder_core::Winder;

use crate::board::{DriverPins, HomeSwitch, Steppers};
use crate::storage::FlashSettings;

mod board;
mod channels;
mod storage;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("kbWinder firmware {} starting...", env!("CARGO_PKG_VERSION"));

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Restore saved settings; anything missing keeps factory defaults
    let mut storage = FlashSettings::new(p.FLASH);
    let mut winder = Winder::default();
    let restored = persist::restore(&mut storage, &mut winder);
    match restored.machine {
        Ok(()) => info!("Machine config loaded"),
        Err(e) => warn!("Machine config not loaded ({}), using defaults", e.as_token()),
    }
    match restored.preset {
        Ok(()) => info!("Preset 0 loaded: {}", winder.preset().name.as_str()),
        Err(e) => warn!("Preset 0 not loaded ({}), using defaults", e.as_token()),
    }

    // Drivers start disabled; the engine enables them when a task runs
    let steppers = Steppers {
        winder: DriverPins::new(
            Output::new(p.PIN_11, Level::Low),
            Output::new(p.PIN_10, Level::Low),
            Output::new(p.PIN_12, Level::High),
        ),
        traverse: DriverPins::new(
            Output::new(p.PIN_6, Level::Low),
            Output::new(p.PIN_5, Level::Low),
            Output::new(p.PIN_7, Level::High),
        ),
    };
    let home = HomeSwitch::new(Input::new(p.PIN_4, Pull::Up));
    info!("Stepper pins initialized");

    // Operator UART (115200 baud default)
    let uart_config = UartConfig::default();
    let tx_buf = TX_BUF.init([0u8; 256]);
    let rx_buf = RX_BUF.init([0u8; 256]);
    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();
    info!("UART initialized for operator commands");

    spawner.spawn(tasks::serial_rx_task(rx)).unwrap();
    spawner.spawn(tasks::serial_tx_task(tx)).unwrap();
    spawner
        .spawn(tasks::motion_task(winder, storage, steppers, home))
        .unwrap();

    info!("All tasks spawned");
}
