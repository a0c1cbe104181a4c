//! Command line interface for the `h4frame` monitor binary.

use std::path::PathBuf;

use clap::Parser;

/// Command line arguments for the `h4frame` binary.
#[derive(Debug, Parser)]
#[command(
    name = "h4frame",
    version,
    about = "Log HCI packets exchanged with a controller over an H4 serial link"
)]
pub struct Cli {
    /// Serial device carrying the H4 stream.
    #[arg(short, long)]
    pub device: PathBuf,
    /// Line speed the device is already configured for.
    #[arg(short, long, default_value_t = 115_200)]
    pub baud: u32,
    /// The line uses RTS/CTS flow control.
    #[arg(long)]
    pub flow_control: bool,
    /// Send an HCI Reset command once the link is open.
    #[arg(long)]
    pub reset: bool,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Cli;

    #[test]
    fn parses_device_and_defaults() {
        let cli = Cli::parse_from(["h4frame", "--device", "/dev/ttyUSB0"]);
        assert_eq!(cli.device.to_str(), Some("/dev/ttyUSB0"));
        assert_eq!(cli.baud, 115_200);
        assert!(!cli.flow_control);
        assert!(!cli.reset);
    }

    #[test]
    fn parses_link_options() {
        let cli = Cli::parse_from([
            "h4frame",
            "-d",
            "/dev/ttyACM1",
            "-b",
            "1000000",
            "--flow-control",
            "--reset",
        ]);
        assert_eq!(cli.baud, 1_000_000);
        assert!(cli.flow_control);
        assert!(cli.reset);
    }
}
