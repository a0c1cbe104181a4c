//! Lifecycle tests for `H4Transport`: configuration, open/close, handler
//! registration and baud rate changes.

use h4frame::{
    ConfigError,
    DriverError,
    FlowControl,
    H4Transport,
    HciTransport,
    PacketType,
    TransportConfig,
    TransportError,
    UartTransportConfig,
    UsbTransportConfig,
};
use h4frame_testing::{MockDriver, RecordingHandler, feed_stream};
use rstest::{fixture, rstest};

#[fixture]
fn uart_config() -> TransportConfig {
    TransportConfig::Uart(UartTransportConfig {
        baud_rate_init: 115_200,
        baud_rate_main: 3_000_000,
        flow_control: FlowControl::RtsCts,
        device_name: Some("/dev/ttyUSB0".to_owned()),
    })
}

#[rstest]
fn init_copies_uart_settings_into_the_driver(uart_config: TransportConfig) {
    let mut transport = H4Transport::new(MockDriver::default());
    transport.init(Some(&uart_config)).expect("uart config accepted");

    let driver_config = transport.driver().config().expect("driver configured");
    assert_eq!(driver_config.baud_rate, 115_200);
    assert_eq!(driver_config.flow_control, FlowControl::RtsCts);
    assert_eq!(driver_config.device_name.as_deref(), Some("/dev/ttyUSB0"));
    assert_eq!(transport.uart_config(), Some(driver_config));
    assert_eq!(transport.name(), "H4");
}

#[test]
fn init_without_config_is_rejected() {
    let mut transport = H4Transport::new(MockDriver::default());
    let err = transport.init(None).expect_err("missing config");

    assert!(matches!(err, TransportError::Config(ConfigError::Missing)));
    assert!(transport.driver().config().is_none());
    assert!(matches!(transport.open(), Err(TransportError::NotInitialised)));
}

#[test]
fn init_with_usb_config_is_rejected() {
    let mut transport = H4Transport::new(MockDriver::default());
    let usb = TransportConfig::Usb(UsbTransportConfig::default());
    let err = transport.init(Some(&usb)).expect_err("not a uart config");

    assert!(matches!(
        err,
        TransportError::Config(ConfigError::NotUart { kind: "usb" })
    ));
    assert!(transport.driver().config().is_none());
}

#[rstest]
fn open_issues_the_first_type_read(uart_config: TransportConfig) {
    let mut transport = H4Transport::new(MockDriver::default());
    transport.init(Some(&uart_config)).expect("init");
    assert!(transport.driver().read_requests().is_empty());

    transport.open().expect("open");
    assert!(transport.is_open());
    assert!(transport.driver().is_open());
    assert_eq!(transport.driver().read_requests(), &[1]);
}

#[rstest]
fn second_open_keeps_a_single_read_outstanding(uart_config: TransportConfig) {
    let mut transport = H4Transport::new(MockDriver::default());
    let handler = RecordingHandler::default();
    transport.init(Some(&uart_config)).expect("init");
    transport.register_packet_handler(Box::new(handler.clone()));
    transport.open().expect("open");
    feed_stream(&mut transport, &[0x04]);

    assert!(matches!(transport.open(), Err(TransportError::AlreadyOpen)));
    assert_eq!(transport.driver().read_requests(), &[1, 2]);

    feed_stream(&mut transport, &[0x0e, 0x01, 0x00]);
    assert_eq!(handler.packets(), vec![(PacketType::Event, vec![0x0e, 0x01, 0x00])]);
}

#[rstest]
fn failed_open_has_no_side_effects(uart_config: TransportConfig) {
    let mut transport = H4Transport::new(MockDriver::failing_open(-5));
    transport.init(Some(&uart_config)).expect("init");

    let err = transport.open().expect_err("driver refuses to open");
    assert!(matches!(err, TransportError::Driver(DriverError::Status(-5))));
    assert!(!transport.is_open());
    assert!(transport.driver().read_requests().is_empty());
}

#[rstest]
fn close_returns_the_driver_status(uart_config: TransportConfig) {
    let mut transport = H4Transport::new(MockDriver::default());
    transport.init(Some(&uart_config)).expect("init");
    transport.open().expect("open");
    transport.close().expect("close");
    assert!(!transport.is_open());
    assert!(!transport.driver().is_open());

    let mut failing = H4Transport::new(MockDriver::failing_close(7));
    failing.init(Some(&uart_config)).expect("init");
    failing.open().expect("open");
    assert!(matches!(
        failing.close(),
        Err(TransportError::Driver(DriverError::Status(7)))
    ));
}

#[rstest]
fn reopening_restarts_at_a_type_byte(uart_config: TransportConfig) {
    let mut transport = H4Transport::new(MockDriver::default());
    transport.init(Some(&uart_config)).expect("init");
    transport.open().expect("open");
    feed_stream(&mut transport, &[0x02, 0x01, 0x00]);
    assert_eq!(transport.driver().last_read_request(), Some(4));

    transport.close().expect("close");
    transport.open().expect("reopen");
    assert_eq!(transport.driver().last_read_request(), Some(1));
    assert_eq!(transport.reassembler().read_cursor(), 0);
}

#[rstest]
fn baud_rate_changes_are_forwarded(uart_config: TransportConfig) {
    let mut transport = H4Transport::new(MockDriver::default());
    transport.init(Some(&uart_config)).expect("init");
    transport.set_baud_rate(3_000_000).expect("baud rate applied");
    assert_eq!(transport.driver().baud_rates(), &[3_000_000]);

    let mut failing = H4Transport::new(MockDriver::failing_baud_rate(-1));
    failing.init(Some(&uart_config)).expect("init");
    assert!(matches!(
        failing.set_baud_rate(921_600),
        Err(TransportError::Driver(DriverError::Status(-1)))
    ));
}

#[rstest]
fn packets_before_registration_are_dropped(uart_config: TransportConfig) {
    let mut transport = H4Transport::new(MockDriver::default());
    transport.init(Some(&uart_config)).expect("init");
    transport.open().expect("open");

    feed_stream(&mut transport, &[0x04, 0x0e, 0x01, 0x00]);

    let handler = RecordingHandler::default();
    transport.register_packet_handler(Box::new(handler.clone()));
    feed_stream(&mut transport, &[0x04, 0x0f, 0x01, 0x00]);

    assert_eq!(
        handler.packets(),
        vec![(PacketType::Event, vec![0x0f, 0x01, 0x00])]
    );
}

#[rstest]
fn registering_a_handler_replaces_the_previous_one(uart_config: TransportConfig) {
    let mut transport = H4Transport::new(MockDriver::default());
    let first = RecordingHandler::default();
    let second = RecordingHandler::default();
    transport.init(Some(&uart_config)).expect("init");
    transport.register_packet_handler(Box::new(first.clone()));
    transport.open().expect("open");

    feed_stream(&mut transport, &[0x03, 0x01, 0x00, 0x01, 0xaa]);
    transport.register_packet_handler(Box::new(second.clone()));
    feed_stream(&mut transport, &[0x03, 0x01, 0x00, 0x01, 0xbb]);

    assert_eq!(first.packets().len(), 1);
    assert_eq!(
        second.packets(),
        vec![(PacketType::ScoData, vec![0x01, 0x00, 0x01, 0xbb])]
    );
}
