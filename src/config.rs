//! Transport configuration types.
//!
//! An HCI stack describes its physical link with a [`TransportConfig`]. The
//! H4 transport accepts only the UART variant and copies the relevant fields
//! into the serial driver's [`UartConfig`](crate::driver::UartConfig).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default initial baud rate for a UART link.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Hardware flow control mode of the serial line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowControl {
    /// No flow control.
    #[default]
    None,
    /// RTS/CTS hardware flow control.
    RtsCts,
}

/// Settings for a UART-attached controller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UartTransportConfig {
    /// Baud rate used to open the link.
    pub baud_rate_init: u32,
    /// Baud rate the upper layer switches to once the controller is set up.
    /// Not applied by the transport itself.
    pub baud_rate_main: u32,
    /// Flow control mode.
    pub flow_control: FlowControl,
    /// Platform device identifier, for example `/dev/ttyUSB0`.
    pub device_name: Option<String>,
}

impl Default for UartTransportConfig {
    fn default() -> Self {
        Self {
            baud_rate_init: DEFAULT_BAUD_RATE,
            baud_rate_main: DEFAULT_BAUD_RATE,
            flow_control: FlowControl::None,
            device_name: None,
        }
    }
}

/// Settings for a USB-attached controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsbTransportConfig {
    /// USB vendor identifier.
    pub vendor_id: u16,
    /// USB product identifier.
    pub product_id: u16,
}

/// Physical link description handed to a transport's `init`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum TransportConfig {
    /// Serial link.
    Uart(UartTransportConfig),
    /// USB link.
    Usb(UsbTransportConfig),
}

impl TransportConfig {
    /// A UART configuration with the given initial baud rate and defaults
    /// for everything else.
    ///
    /// # Examples
    ///
    /// ```
    /// use h4frame::TransportConfig;
    ///
    /// let config = TransportConfig::uart(921_600);
    /// assert_eq!(config.kind(), "uart");
    /// ```
    #[must_use]
    pub fn uart(baud_rate_init: u32) -> Self {
        Self::Uart(UartTransportConfig {
            baud_rate_init,
            ..UartTransportConfig::default()
        })
    }

    /// Short name of the link kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Uart(_) => "uart",
            Self::Usb(_) => "usb",
        }
    }
}

/// Reasons a transport rejects its configuration.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No configuration was supplied.
    #[error("no transport config supplied")]
    Missing,
    /// The configuration describes a link this transport cannot drive.
    #[error("transport config of kind `{kind}` is not a uart config")]
    NotUart {
        /// Kind of the rejected configuration.
        kind: &'static str,
    },
}
