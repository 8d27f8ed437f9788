use std::time::{Duration, Instant};

use crossbeam_channel::{after, never, select, unbounded, Receiver, Sender};
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;

use crate::display::Display;
use crate::errors::DisplayError;

/// Something that drives the display with low-priority content while nobody else is using it.
///
/// [`run`](IdlePolicy::run) is handed a live display and is expected to block, showing
/// content as it sees fit, until `cancel` is disconnected (its sender dropped). The other
/// methods may be called from any thread while `run` is waiting; they must not block.
pub trait IdlePolicy: Send + Sync {
    /// Turns the policy on or off. While off, nothing is shown.
    fn enable(&self, enabled: bool);

    /// Signals that the display was just used for something else, restarting the idle wait.
    fn reset(&self);

    /// Drives `display` until `cancel` is disconnected.
    fn run(&self, cancel: &Receiver<()>, display: &Display);

    /// A human-readable name for the policy.
    fn name(&self) -> &str;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Signal {
    Enable(bool),
    Reset,
}

/// Cycles through a fixed list of messages once the display has been idle for a while.
///
/// After `idle_delay` passes without a [`reset`](IdlePolicy::reset), the next message is
/// shown, and then another every `update_interval` until the next reset. Messages are
/// [shortened](shorten) before being shown.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use std::thread;
/// use std::time::Duration;
/// use flapper::{Display, DisplayConfig, IdlePolicy, MessageCycler};
///
/// # fn main() -> Result<(), flapper::DisplayError> {
/// #
/// let display = Arc::new(Display::open(&DisplayConfig::default())?);
/// let idle = Arc::new(MessageCycler::new(
///     vec!["good morning".into(), "4.6 - 120 km NE of Hualien City, Taiwan".into()],
///     Duration::from_secs(600),
///     Duration::from_secs(120),
/// ));
///
/// let (stop, cancel) = crossbeam_channel::bounded::<()>(0);
/// let runner = {
///     let (display, idle) = (Arc::clone(&display), Arc::clone(&idle));
///     thread::spawn(move || idle.run(&cancel, &display))
/// };
///
/// // Whenever something else shows text:
/// display.set_text("hello")?;
/// idle.reset();
///
/// drop(stop);
/// runner.join().unwrap();
/// #
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct MessageCycler {
    messages: Vec<String>,
    idle_delay: Duration,
    update_interval: Duration,
    signals: Sender<Signal>,
    signals_rx: Receiver<Signal>,
}

impl MessageCycler {
    /// Creates a new `MessageCycler` showing `messages` in order, over and over.
    pub fn new(messages: Vec<String>, idle_delay: Duration, update_interval: Duration) -> Self {
        let (signals, signals_rx) = unbounded();
        MessageCycler {
            messages,
            idle_delay,
            update_interval,
            signals,
            signals_rx,
        }
    }

    fn show(&self, display: &Display, index: usize) -> Result<(), DisplayError> {
        match self.messages.get(index % self.messages.len().max(1)) {
            Some(message) => display.set_text(&shorten(message)),
            None => Ok(()),
        }
    }
}

impl IdlePolicy for MessageCycler {
    fn enable(&self, enabled: bool) {
        let _ = self.signals.send(Signal::Enable(enabled));
    }

    fn reset(&self) {
        let _ = self.signals.send(Signal::Reset);
    }

    fn run(&self, cancel: &Receiver<()>, display: &Display) {
        info!("{} running", self.name());
        let mut showing = false;
        let mut enabled = true;
        let mut next = 0;

        loop {
            let delay = if showing { self.update_interval } else { self.idle_delay };
            let timer: Receiver<Instant> = if enabled { after(delay) } else { never() };

            debug!("{} waiting {:?} (enabled: {})", self.name(), delay, enabled);
            select! {
                recv(timer) -> _ => {
                    match self.show(display, next) {
                        Ok(()) => {}
                        Err(DisplayError::Closed) => break,
                        Err(e) => warn!("{} failed to show message: {}", self.name(), e),
                    }
                    next = next.wrapping_add(1);
                    showing = true;
                }
                recv(self.signals_rx) -> signal => match signal {
                    Ok(Signal::Reset) => showing = false,
                    Ok(Signal::Enable(on)) => enabled = on,
                    Err(_) => break,
                },
                recv(cancel) -> _ => break,
            }
        }
        info!("{} stopped", self.name());
    }

    fn name(&self) -> &str {
        "Message Cycler"
    }
}

const ABBREVIATIONS: [(&str, &str); 5] = [
    ("North", "N"),
    ("South", "S"),
    ("East", "E"),
    ("West", "W"),
    ("Islands", "Is."),
];

/// Shortens place descriptions so more of them fits on the display.
///
/// Drops relative distances such as `"150 km NE of "` and abbreviates compass
/// directions and a few common words.
///
/// # Examples
///
/// ```
/// use flapper::shorten;
///
/// assert_eq!("5.1 N Mariana Is.", shorten("5.1 150 km NE of North Mariana Islands"));
/// ```
pub fn shorten(description: &str) -> String {
    lazy_static! {
        static ref DISTANCE: Regex = Regex::new(r"\d+ km [NSEW]+ of ").unwrap(); // Regex is valid so safe to unwrap.
    }

    let trimmed = DISTANCE.replace_all(description, "");
    trimmed
        .split(' ')
        .map(|word| {
            ABBREVIATIONS
                .iter()
                .find(|&&(long, _)| long == word)
                .map_or(word, |&(_, short)| short)
        })
        .collect::<Vec<_>>()
        .join(" ")
}
