//! ESP-AT co-processor on USART2.
//!
//! Network credentials are baked in at build time from `RIG_WIFI_SSID` and
//! `RIG_WIFI_PASSWORD`. A build without them still boots; the join is then
//! rejected, logged, and the mission flies without camera control.

use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_stm32::peripherals::{PA2, PA3, USART2};
use embassy_stm32::usart::{BufferedUart, Config as UartConfig, DataBits, Parity, StopBits};
use mission_core::link::modem::{AtModem, Credentials};
use static_cell::StaticCell;

use super::EmbassyClock;

const ESP_AT_BAUD: u32 = 115_200;
const UART_BUFFER_SIZE: usize = 1_024;

pub const CREDENTIALS: Credentials<'static> = Credentials {
    ssid: match option_env!("RIG_WIFI_SSID") {
        Some(ssid) => ssid,
        None => "",
    },
    password: match option_env!("RIG_WIFI_PASSWORD") {
        Some(password) => password,
        None => "",
    },
};

pub type Radio = AtModem<'static, BufferedUart<'static>, EmbassyClock>;

embassy_stm32::bind_interrupts!(struct UartIrqs {
    USART2_LPUART2 => embassy_stm32::usart::BufferedInterruptHandler<hal::peripherals::USART2>;
});

pub fn radio(
    usart: Peri<'static, USART2>,
    tx_pin: Peri<'static, PA2>,
    rx_pin: Peri<'static, PA3>,
    clock: EmbassyClock,
) -> Radio {
    static TX_BUFFER: StaticCell<[u8; UART_BUFFER_SIZE]> = StaticCell::new();
    static RX_BUFFER: StaticCell<[u8; UART_BUFFER_SIZE]> = StaticCell::new();

    let mut config = UartConfig::default();
    config.baudrate = ESP_AT_BAUD;
    config.data_bits = DataBits::DataBits8;
    config.stop_bits = StopBits::STOP1;
    config.parity = Parity::ParityNone;

    let uart = BufferedUart::new(
        usart,
        rx_pin,
        tx_pin,
        TX_BUFFER.init([0; UART_BUFFER_SIZE]),
        RX_BUFFER.init([0; UART_BUFFER_SIZE]),
        UartIrqs,
        config,
    )
    .expect("failed to initialize ESP-AT UART");

    if CREDENTIALS.ssid.is_empty() {
        defmt::warn!("wifi: built without RIG_WIFI_SSID");
    }
    AtModem::new(uart, clock, CREDENTIALS)
}
