use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, error, info, warn};
use rand::Rng;

use crate::channel::{CommandChannel, Request};
use crate::config::DisplayConfig;
use crate::core::{text, AnimationStyle, Charset, DisplayState, Grid, Link, Message, Settings, Status, Tag};
use crate::dispatch;
use crate::errors::DisplayError;
use crate::serial::SerialLink;
use crate::snapshot::StateCell;

/// A split-flap display attached to a controller over some [`Link`].
///
/// Opening a display starts three background lanes: a reader that decodes frames from
/// the link, a dispatcher that applies status reports and routes acknowledgments, and
/// a command channel that delivers commands one at a time, resending each until the
/// controller acknowledges it. Commands block the calling thread until acknowledged,
/// so with an unresponsive controller they block until the display is closed.
///
/// If the link fails, the lanes wind down on their own: pending and later commands
/// fail with [`DisplayError::Closed`], [`is_closed`](Display::is_closed) turns true,
/// and [`last_error`](Display::last_error) reports what went wrong.
///
/// `Display` is `Sync`; share it between threads with an `Arc`.
///
/// # Examples
///
/// ```no_run
/// use flapper::{Display, DisplayConfig};
///
/// # fn main() -> Result<(), flapper::DisplayError> {
/// #
/// let display = Display::open(&DisplayConfig::default())?;
/// display.init()?;
/// display.set_anim_style("LEFT_TO_RIGHT")?;
/// display.set_start_delay(50)?;
/// display.set_text("hello world")?;
/// println!("Showing {:?}", display.text());
/// #
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct Display {
    lanes: Mutex<Option<Lanes>>,
    control: Mutex<Box<dyn Link>>,
    state: Arc<StateCell>,
    health: Arc<Health>,
    desired: Mutex<Option<Settings>>,
    charset: Charset,
    grid: Grid,
}

/// Whether any lane has stopped on its own, and why.
#[derive(Debug, Default)]
struct Health {
    stopped: AtomicBool,
    failure: Mutex<Option<Arc<DisplayError>>>,
}

impl Health {
    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn fail(&self, error: DisplayError) {
        let mut failure = lock(&self.failure);
        if failure.is_none() {
            *failure = Some(Arc::new(error));
        }
        drop(failure);
        self.stop();
    }
}

#[derive(Debug)]
struct Lanes {
    requests: Sender<Request>,
    shutdown: Sender<()>,
    handles: Vec<JoinHandle<()>>,
}

impl Display {
    /// Opens the serial device named in `config` and starts talking to the controller.
    ///
    /// Does not wait for the controller to respond; call [`init`](Display::init) for that.
    ///
    /// # Errors
    ///
    /// Returns [`DisplayError::Connect`] if the serial device can't be opened or configured.
    pub fn open(config: &DisplayConfig) -> Result<Self, DisplayError> {
        info!("Connecting to display on {}", config.device);
        let link = SerialLink::open(&config.device, config.baud_rate)?;
        Display::with_link(Box::new(link), config.clone())
    }

    /// Starts talking to a controller over an arbitrary link.
    ///
    /// # Errors
    ///
    /// Returns [`DisplayError::Link`] if the link can't be cloned for the lanes or a lane
    /// can't be started.
    ///
    /// # Examples
    ///
    /// ```
    /// use flapper::{Display, DisplayConfig};
    /// use flapper_testing::{VirtualDisplay, VirtualLink};
    ///
    /// # fn main() -> Result<(), flapper::DisplayError> {
    /// #
    /// let link = VirtualLink::new(VirtualDisplay::new(24));
    /// let display = Display::with_link(Box::new(link), DisplayConfig::default())?;
    /// display.init()?;
    /// assert_eq!(Some(24), display.module_count());
    /// #
    /// # Ok(()) }
    /// ```
    pub fn with_link(link: Box<dyn Link>, config: DisplayConfig) -> Result<Self, DisplayError> {
        let reader_link = link.try_clone().map_err(|source| DisplayError::Link { source })?;
        let writer_link = link.try_clone().map_err(|source| DisplayError::Link { source })?;

        let charset = Charset::new(&config.charset);
        let state = Arc::new(StateCell::default());
        let health = Arc::new(Health::default());
        let first_tag = config
            .first_tag
            .unwrap_or_else(|| Tag::new(rand::thread_rng().gen_range(0..Tag::COUNT)));

        let (requests, request_rx) = unbounded();
        let (inbound, inbound_rx) = unbounded();
        let (acks, ack_rx) = unbounded();
        let (shutdown, shutdown_rx) = bounded::<()>(0);

        let mut handles = Vec::with_capacity(3);
        let reader_shutdown = shutdown_rx.clone();
        let reader_health = Arc::clone(&health);
        handles.push(spawn("flapper-reader", move || {
            info!("Reader started");
            match dispatch::read_frames(reader_link, inbound, reader_shutdown) {
                Ok(()) => {
                    info!("Reader stopped");
                    reader_health.stop();
                }
                Err(e) => {
                    error!("Reader stopped: {}", print_chain(&e));
                    reader_health.fail(e);
                }
            }
        })?);

        let dispatch_state = Arc::clone(&state);
        let dispatch_charset = charset.clone();
        let dispatch_health = Arc::clone(&health);
        handles.push(spawn("flapper-dispatch", move || {
            dispatch::dispatch(inbound_rx, dispatch_state, acks, dispatch_charset);
            dispatch_health.stop();
        })?);

        let channel = CommandChannel::new(writer_link, request_rx, ack_rx, shutdown_rx, config.retry_timeout, first_tag);
        let writer_health = Arc::clone(&health);
        handles.push(spawn("flapper-writer", move || {
            channel.run();
            writer_health.stop();
        })?);

        Ok(Display {
            lanes: Mutex::new(Some(Lanes {
                requests,
                shutdown,
                handles,
            })),
            control: Mutex::new(link),
            state,
            health,
            desired: Mutex::new(None),
            charset,
            grid: config.grid,
        })
    }

    /// Asks the controller for its current state and waits for the request to be acknowledged.
    ///
    /// Should be called after opening; until the first status report arrives the
    /// module count is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`DisplayError::Closed`] if the display is closed first, or
    /// [`DisplayError::Write`] if the request can't be written.
    pub fn init(&self) -> Result<(), DisplayError> {
        info!("Initializing display");
        self.request_state()
    }

    /// Asks the controller to send a fresh status report.
    ///
    /// # Errors
    ///
    /// Same as [`init`](Display::init).
    pub fn request_state(&self) -> Result<(), DisplayError> {
        self.request(Message::RequestState)
    }

    /// Shows `text`, shaped to the grid by [`prepare_text`](Display::prepare_text).
    ///
    /// Returns once the controller has acknowledged the command, not once the flaps stop moving.
    ///
    /// # Errors
    ///
    /// Same as [`init`](Display::init).
    pub fn set_text(&self, text: &str) -> Result<(), DisplayError> {
        let shaped = self.prepare_text(text);
        let modules = self.module_count().unwrap_or_else(|| self.grid.cells());
        info!("Setting text {:?}", shaped);
        self.request(Message::SetText(self.charset.flap_indices(&shaped, modules)))
    }

    /// Sets how many modules may move at once (0 for no limit).
    ///
    /// # Errors
    ///
    /// Same as [`init`](Display::init).
    pub fn set_max_moving(&self, max_moving: u32) -> Result<(), DisplayError> {
        self.update_settings(|settings| settings.max_moving = max_moving)
    }

    /// Sets whether modules that already show the right character still go through a full rotation.
    ///
    /// # Errors
    ///
    /// Same as [`init`](Display::init).
    pub fn set_force_rotation(&self, on: bool) -> Result<(), DisplayError> {
        self.update_settings(|settings| settings.force_full_rotation = on)
    }

    /// Sets the delay between starting one module and the next, in milliseconds.
    ///
    /// # Errors
    ///
    /// Same as [`init`](Display::init).
    pub fn set_start_delay(&self, millis: u32) -> Result<(), DisplayError> {
        self.update_settings(|settings| settings.start_delay_millis = millis)
    }

    /// Sets the animation style by its protocol name, such as `"RIGHT_TO_LEFT"`.
    ///
    /// # Errors
    ///
    /// Returns [`DisplayError::UnknownAnimationStyle`] without contacting the controller if
    /// `name` isn't a known style; otherwise the same as [`init`](Display::init).
    pub fn set_anim_style(&self, name: &str) -> Result<(), DisplayError> {
        let style: AnimationStyle = name.parse()?;
        self.update_settings(|settings| settings.animation_style = style)
    }

    /// Returns the text the display currently shows, one character per module.
    pub fn text(&self) -> String {
        self.state.load().text().to_owned()
    }

    /// Returns the settings most recently reported by the controller.
    ///
    /// The setters build on the settings last requested until the controller reports
    /// them back, so a quick series of setters doesn't undo itself. After that (or after
    /// a [`hard_reset`](Display::hard_reset)) they build on what this returns.
    pub fn settings(&self) -> Settings {
        *self.state.load().settings()
    }

    /// Returns the most recent status report.
    pub fn status(&self) -> Status {
        self.state.load().status().clone()
    }

    /// Returns the whole current state as one consistent snapshot.
    pub fn state(&self) -> Arc<DisplayState> {
        self.state.load()
    }

    /// Returns the number of modules, or `None` before the first status report.
    pub fn module_count(&self) -> Option<usize> {
        self.state.load().module_count()
    }

    /// Returns exactly what [`set_text`](Display::set_text) would show for `text`.
    pub fn prepare_text(&self, text: &str) -> String {
        text::prepare(text, self.grid, &self.charset)
    }

    /// Power-cycles the controller through the link's control lines.
    ///
    ///
    /// Settings requested before the reset are forgotten; the next setter starts from
    /// whatever the controller reports afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`DisplayError::Link`] if the link doesn't support resets or the reset fails.
    pub fn hard_reset(&self) -> Result<(), DisplayError> {
        lock(&self.control)
            .hard_reset()
            .map_err(|source| DisplayError::Link { source })?;
        *lock(&self.desired) = None;
        Ok(())
    }

    /// Stops all lanes, failing any commands still pending with [`DisplayError::Closed`].
    ///
    /// Blocks until the lanes have finished. Closing more than once is harmless.
    pub fn close(&self) {
        let lanes = match lock(&self.lanes).take() {
            Some(lanes) => lanes,
            None => return,
        };
        info!("Closing display");

        drop(lanes.shutdown);
        drop(lanes.requests);
        for handle in lanes.handles {
            let name = handle.thread().name().unwrap_or("lane").to_owned();
            if handle.join().is_err() {
                warn!("{} panicked", name);
            }
        }
    }

    /// Returns whether the display can no longer accept commands, either because
    /// [`close`](Display::close) was called or because a lane stopped on its own.
    pub fn is_closed(&self) -> bool {
        self.health.stopped.load(Ordering::SeqCst) || lock(&self.lanes).is_none()
    }

    /// Returns the error that brought the lanes down, if the link failed.
    ///
    /// # Examples
    ///
    /// ```
    /// use flapper::{Display, DisplayConfig, DisplayError};
    /// use flapper_testing::{VirtualDisplay, VirtualLink};
    ///
    /// let link = VirtualLink::new(VirtualDisplay::new(4));
    /// let display = Display::with_link(Box::new(link.clone()), DisplayConfig::default()).unwrap();
    /// link.disconnect();
    /// while !display.is_closed() {
    ///     std::thread::yield_now();
    /// }
    /// assert!(matches!(display.last_error().as_deref(), Some(DisplayError::Link { .. })));
    /// ```
    pub fn last_error(&self) -> Option<Arc<DisplayError>> {
        lock(&self.health.failure).clone()
    }

    fn update_settings<F: FnOnce(&mut Settings)>(&self, change: F) -> Result<(), DisplayError> {
        let (settings, outcome) = {
            let mut desired = lock(&self.desired);
            let mut settings = (*desired).unwrap_or_else(|| self.settings());
            change(&mut settings);
            *desired = Some(settings);
            (settings, self.submit(Message::SetConfig(settings))?)
        };
        debug!("Requested settings [{}]", settings);

        let result = wait(outcome);
        let mut desired = lock(&self.desired);
        // Once the controller reports what was asked for, its reports are authoritative again.
        if *desired == Some(settings) && (result.is_err() || self.settings() == settings) {
            *desired = None;
        }
        result
    }

    fn request(&self, message: Message) -> Result<(), DisplayError> {
        wait(self.submit(message)?)
    }

    fn submit(&self, message: Message) -> Result<Receiver<Result<(), DisplayError>>, DisplayError> {
        if self.health.stopped.load(Ordering::SeqCst) {
            return Err(DisplayError::Closed);
        }
        let requests = match *lock(&self.lanes) {
            Some(ref lanes) => lanes.requests.clone(),
            None => return Err(DisplayError::Closed),
        };
        let (reply, outcome) = bounded(1);
        requests
            .send(Request { message, reply })
            .map_err(|_| DisplayError::Closed)?;
        Ok(outcome)
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        self.close();
    }
}

fn wait(outcome: Receiver<Result<(), DisplayError>>) -> Result<(), DisplayError> {
    outcome.recv().unwrap_or(Err(DisplayError::Closed))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn spawn<F: FnOnce() + Send + 'static>(name: &str, lane: F) -> Result<JoinHandle<()>, DisplayError> {
    thread::Builder::new()
        .name(name.to_owned())
        .spawn(lane)
        .map_err(|source| DisplayError::Link { source })
}

fn print_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
