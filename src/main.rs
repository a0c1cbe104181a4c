//! Monitor binary for an H4 serial link.
//!
//! Opens the device, wires it into an [`H4Transport`], optionally resets the
//! controller, and logs every packet until interrupted.

mod cli;

use clap::Parser;
use h4frame::{
    FlowControl,
    H4Transport,
    HciTransport,
    OutgoingPacket,
    PacketType,
    StreamDriver,
    TRANSPORT_PACKET_SENT,
    TransportConfig,
    UartTransportConfig,
    handler_fn,
};
use tokio::fs::OpenOptions;

/// Opcode of HCI_Reset (OGF 0x03, OCF 0x0003).
const HCI_RESET_OPCODE: u16 = 0x0c03;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    // Separate handles let a blocked read coexist with a pending write.
    let reader = OpenOptions::new().read(true).open(&cli.device).await?;
    let writer = OpenOptions::new().write(true).open(&cli.device).await?;

    let config = TransportConfig::Uart(UartTransportConfig {
        baud_rate_init: cli.baud,
        baud_rate_main: cli.baud,
        flow_control: if cli.flow_control {
            FlowControl::RtsCts
        } else {
            FlowControl::None
        },
        device_name: Some(cli.device.display().to_string()),
    });

    let mut transport = H4Transport::new(StreamDriver::new(reader, writer));
    transport.init(Some(&config))?;
    transport.register_packet_handler(Box::new(handler_fn(log_packet)));
    transport.open()?;

    if cli.reset {
        transport.send_packet(OutgoingPacket::with_header(
            PacketType::Command,
            HCI_RESET_OPCODE,
            &[],
        )?)?;
    }

    tokio::select! {
        () = transport.run() => {}
        signal = tokio::signal::ctrl_c() => signal?,
    }

    transport.close()?;
    Ok(())
}

fn log_packet(packet_type: PacketType, bytes: &[u8]) {
    if packet_type == PacketType::Event && bytes.first() == Some(&TRANSPORT_PACKET_SENT) {
        tracing::info!("packet sent");
        return;
    }
    tracing::info!(%packet_type, len = bytes.len(), bytes = ?bytes, "packet received");
}
