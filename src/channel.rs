use std::time::{Duration, Instant};

use crossbeam_channel::{at, select, Receiver, Sender};
use log::{debug, info, warn};

use crate::core::{Link, Message, Tag};
use crate::errors::DisplayError;

/// A command waiting to be delivered, with the slot its outcome is reported to.
#[derive(Debug)]
pub(crate) struct Request {
    pub(crate) message: Message,
    pub(crate) reply: Sender<Result<(), DisplayError>>,
}

/// The writer lane: delivers queued commands one at a time, resending each until acknowledged.
///
/// Each command gets the next [`Tag`]. Its frame is written and then written again,
/// byte for byte, every time `retry_timeout` passes without an ack for that tag.
/// Acks for any other tag are ignored, as are acks that arrive while nothing is
/// in flight. The tag advances once a command completes, whether it succeeded or
/// its write failed.
///
/// The lane ends when the shutdown sender is dropped or the ack source disconnects,
/// even while idle. The command in flight and everything still queued then fail
/// with [`DisplayError::Closed`].
pub(crate) struct CommandChannel {
    link: Box<dyn Link>,
    requests: Receiver<Request>,
    acks: Receiver<Tag>,
    shutdown: Receiver<()>,
    retry_timeout: Duration,
    tag: Tag,
}

impl CommandChannel {
    pub(crate) fn new(
        link: Box<dyn Link>,
        requests: Receiver<Request>,
        acks: Receiver<Tag>,
        shutdown: Receiver<()>,
        retry_timeout: Duration,
        first_tag: Tag,
    ) -> Self {
        CommandChannel {
            link,
            requests,
            acks,
            shutdown,
            retry_timeout,
            tag: first_tag,
        }
    }

    pub(crate) fn run(mut self) {
        info!("Command channel started at tag [{}]", self.tag);
        loop {
            let request = select! {
                recv(self.requests) -> request => match request {
                    Ok(request) => request,
                    Err(_) => break,
                },
                recv(self.acks) -> ack => match ack {
                    Ok(acked) => {
                        debug!("Ignoring ack [{}] with nothing pending", acked);
                        continue;
                    }
                    Err(_) => {
                        info!("Ack source gone, stopping command channel");
                        break;
                    }
                },
                recv(self.shutdown) -> _ => break,
            };

            let outcome = self.deliver(&request.message);
            let closed = matches!(outcome, Err(DisplayError::Closed));
            let _ = request.reply.send(outcome);
            if closed {
                break;
            }
            self.tag = self.tag.next();
        }

        let mut abandoned = 0;
        for request in self.requests.try_iter() {
            let _ = request.reply.send(Err(DisplayError::Closed));
            abandoned += 1;
        }
        info!("Command channel stopped, {} queued commands abandoned", abandoned);
    }

    fn deliver(&mut self, message: &Message) -> Result<(), DisplayError> {
        let tag = self.tag;
        let stale = self.acks.try_iter().count();
        if stale > 0 {
            debug!("Discarded {} acks that arrived before [{}] was sent", stale, tag);
        }

        let frame = message.to_frame(tag);
        debug!("Sending [{}] {}", tag, message);
        self.write(&frame)?;

        let mut deadline = Instant::now() + self.retry_timeout;
        loop {
            select! {
                recv(self.acks) -> ack => match ack {
                    Ok(acked) if acked == tag => {
                        debug!("Acknowledged [{}]", tag);
                        return Ok(());
                    }
                    Ok(acked) => debug!("Ignoring ack [{}] while waiting for [{}]", acked, tag),
                    Err(_) => return Err(DisplayError::Closed),
                },
                recv(self.shutdown) -> _ => return Err(DisplayError::Closed),
                recv(at(deadline)) -> _ => {
                    warn!("No ack for [{}] after {:?}, resending", tag, self.retry_timeout);
                    self.write(&frame)?;
                    deadline = Instant::now() + self.retry_timeout;
                }
            }
        }
    }

    fn write(&mut self, frame: &[u8]) -> Result<(), DisplayError> {
        self.link
            .write_all(frame)
            .and_then(|()| self.link.flush())
            .map_err(|source| DisplayError::Write { source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{bounded, unbounded};
    use std::io::{self, Write};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;

    /// Records every write, or fails them while broken.
    #[derive(Debug, Clone, Default)]
    struct RecordingLink {
        written: Arc<Mutex<Vec<Vec<u8>>>>,
        broken: Arc<AtomicBool>,
    }

    impl io::Read for RecordingLink {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::ErrorKind::TimedOut.into())
        }
    }

    impl Write for RecordingLink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "Dummy write error"));
            }
            self.written.lock().unwrap().push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Link for RecordingLink {
        fn try_clone(&self) -> io::Result<Box<dyn Link>> {
            Ok(Box::new(self.clone()))
        }
    }

    struct Harness {
        requests: Sender<Request>,
        acks: Sender<Tag>,
        shutdown: Sender<()>,
        lane: thread::JoinHandle<()>,
    }

    fn start(link: RecordingLink, first_tag: Tag) -> Harness {
        let (requests, request_rx) = unbounded();
        let (acks, ack_rx) = unbounded();
        let (shutdown, shutdown_rx) = bounded(0);
        let channel = CommandChannel::new(
            Box::new(link),
            request_rx,
            ack_rx,
            shutdown_rx,
            Duration::from_millis(20),
            first_tag,
        );
        let lane = thread::spawn(move || channel.run());
        Harness {
            requests,
            acks,
            shutdown,
            lane,
        }
    }

    fn wait_for_writes(written: &Mutex<Vec<Vec<u8>>>, count: usize) {
        while written.lock().unwrap().len() < count {
            thread::yield_now();
        }
    }

    fn submit(harness: &Harness, message: Message) -> Receiver<Result<(), DisplayError>> {
        let (reply, outcome) = bounded(1);
        harness.requests.send(Request { message, reply }).unwrap();
        outcome
    }

    #[test]
    fn write_failure_fails_request_and_advances_tag() {
        let link = RecordingLink::default();
        let broken = Arc::clone(&link.broken);
        let written = Arc::clone(&link.written);
        broken.store(true, Ordering::SeqCst);
        let harness = start(link, Tag(10));

        let outcome = submit(&harness, Message::RequestState).recv().unwrap();
        assert!(matches!(outcome, Err(DisplayError::Write { .. })));
        broken.store(false, Ordering::SeqCst);

        // The channel keeps running; the next command is acked under the following tag.
        let pending = submit(&harness, Message::RequestState);
        wait_for_writes(&written, 1);
        harness.acks.send(Tag(10)).unwrap();
        harness.acks.send(Tag(11)).unwrap();
        assert!(pending.recv().unwrap().is_ok());

        drop(harness.shutdown);
        harness.lane.join().unwrap();
    }

    #[test]
    fn shutdown_fails_pending_and_queued() {
        let link = RecordingLink::default();
        let written = Arc::clone(&link.written);
        let harness = start(link, Tag(0));

        let first = submit(&harness, Message::RequestState);
        let second = submit(&harness, Message::RequestState);
        wait_for_writes(&written, 1);

        drop(harness.shutdown);
        harness.lane.join().unwrap();
        assert!(matches!(first.recv().unwrap(), Err(DisplayError::Closed)));
        assert!(matches!(second.recv().unwrap(), Err(DisplayError::Closed)));
    }

    #[test]
    fn disconnected_acks_close_channel() {
        let harness = start(RecordingLink::default(), Tag(0));
        let pending = submit(&harness, Message::RequestState);
        drop(harness.acks);
        assert!(matches!(pending.recv().unwrap(), Err(DisplayError::Closed)));
        harness.lane.join().unwrap();
    }

    #[test]
    fn idle_acks_discarded() {
        let link = RecordingLink::default();
        let written = Arc::clone(&link.written);
        let harness = start(link, Tag(5));

        // Matches the next tag, but nothing has been sent yet.
        harness.acks.send(Tag(5)).unwrap();
        thread::sleep(Duration::from_millis(30));

        let pending = submit(&harness, Message::RequestState);
        wait_for_writes(&written, 3);
        assert!(pending.try_recv().is_err());

        harness.acks.send(Tag(5)).unwrap();
        assert!(pending.recv().unwrap().is_ok());
        drop(harness.shutdown);
        harness.lane.join().unwrap();
    }

    #[test]
    fn disconnected_acks_stop_idle_channel() {
        let harness = start(RecordingLink::default(), Tag(0));
        drop(harness.acks);
        harness.lane.join().unwrap();

        let (reply, _outcome) = bounded(1);
        let request = Request {
            message: Message::RequestState,
            reply,
        };
        assert!(harness.requests.send(request).is_err());
    }
}
