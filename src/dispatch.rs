use std::io::{self, BufRead, BufReader};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use log::{debug, info, warn};

use crate::core::frame::DELIMITER;
use crate::core::{Charset, DisplayState, Link, Message, Tag};
use crate::errors::DisplayError;
use crate::snapshot::StateCell;

/// Longest frame the reader will buffer while waiting for a delimiter.
///
/// A full status report for a large display is well under this; anything longer
/// is line noise or a baud rate mismatch.
pub(crate) const MAX_FRAME_LEN: usize = 4096;

/// The reader lane: carves the incoming byte stream into frames and decodes them.
///
/// Frames that fail to decode are logged and dropped, as are runs of bytes longer
/// than [`MAX_FRAME_LEN`] without a delimiter. Returns `Ok` once asked to stop
/// (by dropping the shutdown sender) or once nobody is listening for messages, and
/// an error if the link reaches end of stream or fails. Either way, returning drops
/// `inbound`, which winds down the dispatcher and, through it, the command channel.
pub(crate) fn read_frames(link: Box<dyn Link>, inbound: Sender<Message>, shutdown: Receiver<()>) -> Result<(), DisplayError> {
    let mut reader = BufReader::new(link);
    let mut frame = Vec::new();
    loop {
        if let Err(TryRecvError::Disconnected) = shutdown.try_recv() {
            return Ok(());
        }

        let (used, complete) = match reader.fill_buf() {
            Ok([]) => {
                return Err(DisplayError::Link {
                    source: io::ErrorKind::UnexpectedEof.into(),
                })
            }
            Ok(available) => append_chunk(&mut frame, available),
            // A partial frame stays in the buffer and is completed by the next read.
            Err(ref e) if is_transient(e) => continue,
            Err(source) => return Err(DisplayError::Link { source }),
        };
        reader.consume(used);
        if !complete {
            continue;
        }

        match Message::from_device_frame(&frame) {
            Ok(message) => {
                debug!("Received {}", message);
                if inbound.send(message).is_err() {
                    return Ok(());
                }
            }
            Err(e) => warn!("Discarding frame of {} bytes: {}", frame.len(), e),
        }
        frame.clear();
    }
}

/// Moves bytes from `available` onto `frame`, up to and including the first delimiter.
///
/// Returns how many bytes were taken and whether `frame` is now complete. An
/// overlong partial frame is discarded.
fn append_chunk(frame: &mut Vec<u8>, available: &[u8]) -> (usize, bool) {
    let (used, complete) = match available.iter().position(|&b| b == DELIMITER) {
        Some(end) => (end + 1, true),
        None => (available.len(), false),
    };
    frame.extend_from_slice(&available[..used]);

    if !complete && frame.len() > MAX_FRAME_LEN {
        warn!("Discarding {} bytes received without a frame delimiter", frame.len());
        frame.clear();
    }
    (used, complete)
}

fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

/// The dispatcher lane: applies decoded messages in arrival order.
///
/// This is the only writer of the display state. Runs until the reader lane ends.
pub(crate) fn dispatch(inbound: Receiver<Message>, state: Arc<StateCell>, acks: Sender<Tag>, charset: Charset) {
    for message in inbound.iter() {
        match message {
            Message::StatusReport(status) => {
                let update = DisplayState::new(status, &charset);
                debug!("Display shows {:?}", update.text());
                state.store(update);
            }
            Message::Log(line) => info!("Display: {}", line),
            Message::Ack(tag) => {
                // Nobody waiting means the command channel already stopped.
                let _ = acks.send(tag);
            }
            other => info!("Ignoring {}", other),
        }
    }
    debug!("Dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{bounded, unbounded};
    use std::thread;

    use crate::core::{ModuleStatus, Status};
    use flapper_testing::{VirtualDisplay, VirtualLink};

    #[test]
    fn status_replaces_state_and_acks_forwarded() {
        let (inbound, inbound_rx) = unbounded();
        let (acks, acks_rx) = unbounded();
        let state = Arc::new(StateCell::default());

        let status = Status {
            modules: vec![ModuleStatus::at_flap(1), ModuleStatus::at_flap(2), ModuleStatus::at_flap(3)],
            ..Status::default()
        };
        inbound.send(Message::Log("booted".into())).unwrap();
        inbound.send(Message::StatusReport(status)).unwrap();
        inbound.send(Message::Ack(Tag(4))).unwrap();
        inbound.send(Message::Unknown).unwrap();
        drop(inbound);

        dispatch(inbound_rx, Arc::clone(&state), acks, Charset::default());
        assert_eq!("abc", state.load().text());
        assert_eq!(vec![Tag(4)], acks_rx.try_iter().collect::<Vec<_>>());
    }

    #[test]
    fn corrupt_frames_skipped() {
        let link = VirtualLink::new(VirtualDisplay::new(1));
        let mut corrupt = Message::Log("lost".into()).to_frame(Tag(0));
        corrupt[1] ^= 0x40;
        link.inject(corrupt);
        link.inject(vec![0x00]);
        link.inject(Message::Log("kept".into()).to_frame(Tag(0)));

        let (inbound, inbound_rx) = unbounded();
        let (shutdown, shutdown_rx) = bounded::<()>(0);
        let reader = {
            let link = link.clone();
            thread::spawn(move || read_frames(Box::new(link), inbound, shutdown_rx))
        };

        assert_eq!(Message::Log("kept".into()), inbound_rx.recv().unwrap());
        drop(shutdown);
        assert!(reader.join().unwrap().is_ok());
    }

    #[test]
    fn frame_split_across_reads() {
        let link = VirtualLink::new(VirtualDisplay::new(1));
        let frame = Message::Ack(Tag(3)).to_frame(Tag(0));
        let (head, tail) = frame.split_at(3);
        link.inject(head.to_vec());

        let (inbound, inbound_rx) = unbounded();
        let (_shutdown, shutdown_rx) = bounded::<()>(0);
        let reader = {
            let link = link.clone();
            thread::spawn(move || read_frames(Box::new(link), inbound, shutdown_rx))
        };

        thread::sleep(std::time::Duration::from_millis(60));
        link.inject(tail.to_vec());
        assert_eq!(Message::Ack(Tag(3)), inbound_rx.recv().unwrap());

        link.disconnect();
        assert!(matches!(reader.join().unwrap(), Err(DisplayError::Link { .. })));
    }

    #[test]
    fn overlong_noise_discarded() {
        let mut frame = Vec::new();
        let noise = vec![0x01; 1500];
        for _ in 0..10 {
            assert_eq!((1500, false), append_chunk(&mut frame, &noise));
            assert!(frame.len() <= MAX_FRAME_LEN);
        }

        let ack = Message::Ack(Tag(2)).to_frame(Tag(2));
        let mut chunk = vec![0x00];
        chunk.extend_from_slice(&ack);
        assert_eq!((1, true), append_chunk(&mut frame, &chunk));
        frame.clear();
        assert_eq!((ack.len(), true), append_chunk(&mut frame, &chunk[1..]));
        assert_eq!(Message::Ack(Tag(2)), Message::from_device_frame(&frame).unwrap());
    }

    #[test]
    fn reads_past_noise() {
        let link = VirtualLink::new(VirtualDisplay::new(1));
        link.inject(vec![0x01; 3 * MAX_FRAME_LEN]);
        link.inject(vec![0x00]);
        link.inject(Message::Log("kept".into()).to_frame(Tag(0)));

        let (inbound, inbound_rx) = unbounded();
        let (shutdown, shutdown_rx) = bounded::<()>(0);
        let reader = {
            let link = link.clone();
            thread::spawn(move || read_frames(Box::new(link), inbound, shutdown_rx))
        };

        assert_eq!(Message::Log("kept".into()), inbound_rx.recv().unwrap());
        drop(shutdown);
        assert!(reader.join().unwrap().is_ok());
    }

    #[test]
    fn read_failure_ends_lane() {
        let link = VirtualLink::new(VirtualDisplay::new(1));
        link.fail_reads();
        let (inbound, inbound_rx) = unbounded();
        let (_shutdown, shutdown_rx) = bounded::<()>(0);

        let result = read_frames(Box::new(link), inbound, shutdown_rx);
        assert!(matches!(result, Err(DisplayError::Link { .. })));
        assert!(inbound_rx.recv().is_err());
    }
}
