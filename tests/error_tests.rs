use std::error::Error;
use std::fmt::Debug;
use std::iter;
use std::time::Duration;

use flapper::core::{frame, AnimationStyle, Message, Tag};
use flapper::{Display, DisplayConfig, Link, SerialLink};
use flapper_testing::{Behavior, VirtualDisplay, VirtualLink};

mod mock_serial_port;
use crate::mock_serial_port::{MockSerialPort, SerialFailure};

#[test]
fn format_errors() {
    // Core
    print_error("Empty frame", frame::decode(&[0x00]));
    print_error("Bad stuffing", frame::decode(&[0x09, 0x01, 0x01, 0x01, 0x01, 0x00]));
    let mut corrupt = Message::RequestState.to_frame(Tag(1));
    corrupt[1] ^= 0x01;
    print_error("Wrong checksum", Message::from_host_frame(&corrupt));
    print_error("Bad protobuf", Message::from_device_frame(&frame::encode(&[0xFF, 0xFF])));
    print_error("Unknown style", "SIDEWAYS".parse::<AnimationStyle>());

    // Serial
    print_error(
        "Serial config failure",
        SerialLink::try_new(MockSerialPort::new(vec![], SerialFailure::WriteSettings), 230_400),
    );
    print_error("Serial open failure", SerialLink::open("/dev/flapper-does-not-exist", 230_400));
    let mut link = SerialLink::try_new(MockSerialPort::new(vec![], SerialFailure::ControlLines), 230_400).unwrap();
    print_error("Serial reset failure", link.hard_reset());

    // Flapper
    let config = DisplayConfig {
        device: "/dev/flapper-does-not-exist".into(),
        ..DisplayConfig::default()
    };
    print_error("Display open failure", Display::open(&config));

    let link = VirtualLink::new(VirtualDisplay::new(4));
    let display = Display::with_link(Box::new(link), DisplayConfig::default()).unwrap();
    print_error("Display unknown style", display.set_anim_style("sideways"));

    let link = VirtualLink::new(VirtualDisplay::with_behavior(4, Behavior::Silent));
    let config = DisplayConfig {
        retry_timeout: Duration::from_millis(10),
        ..DisplayConfig::default()
    };
    let display = Display::with_link(Box::new(link.clone()), config.clone()).unwrap();
    link.fail_reads();
    print_error("Display link failure", display.init());

    let display = Display::with_link(Box::new(VirtualLink::new(VirtualDisplay::new(4))), config).unwrap();
    display.close();
    print_error("Display closed", display.set_text("hello"));
}

fn print_error<V: Debug, E: Error + 'static>(title: &'static str, result: Result<V, E>) {
    println!("** {} **", title);
    let e = result.unwrap_err();
    let headings = iter::once("Error").chain(iter::repeat("Caused by"));
    let chain = iter::successors(Some(&e as &dyn Error), |&error| error.source());
    for (heading, error) in headings.zip(chain) {
        println!("{}: {}", heading, error);
    }
    println!();
}
