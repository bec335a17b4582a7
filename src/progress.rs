// src/progress.rs

//! Progress notifications for refresh and assembly
//!
//! Long-running operations report what they are doing through a
//! [`ProgressObserver`]. Front-ends pick an implementation:
//! - `CliProgress`: indicatif spinner for the terminal
//! - `LogProgress`: logs events through tracing
//! - `ChannelProgress`: forwards events over an mpsc channel (GUI, tests)
//! - `CallbackProgress`: calls a closure
//! - `SilentProgress`: no-op for scripted/quiet modes
//!
//! # Example
//!
//! ```ignore
//! use rombuilder::progress::{ChannelProgress, ProgressEvent};
//!
//! let (observer, events) = ChannelProgress::channel();
//! worker.start(Arc::new(observer));
//! for event in events {
//!     println!("{event}");
//! }
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Events emitted while refreshing definitions from the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshEvent {
    /// Requesting the source listing
    Listing,
    /// Started processing a source; `index` counts sources seen so far
    SourceStarted { name: String, index: usize },
    /// A source's recipe was added under `archive`
    SourceAdded { name: String, archive: String, count: usize },
    /// A source was skipped (no recipe, unreachable, malformed)
    SourceSkipped { name: String, reason: String },
    /// Cancellation was observed; nothing is persisted
    Cancelled,
    /// Refresh completed with `count` definitions
    Finished { count: usize },
}

/// Events emitted while assembling a ROM image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyEvent {
    /// One input was appended to the output image
    InputAdded {
        index: usize,
        total: usize,
        input: String,
        bytes: u64,
    },
}

/// Any progress notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Refresh(RefreshEvent),
    Assembly(AssemblyEvent),
}

impl From<RefreshEvent> for ProgressEvent {
    fn from(event: RefreshEvent) -> Self {
        Self::Refresh(event)
    }
}

impl From<AssemblyEvent> for ProgressEvent {
    fn from(event: AssemblyEvent) -> Self {
        Self::Assembly(event)
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refresh(RefreshEvent::Listing) => write!(f, "Retrieving list of sources"),
            Self::Refresh(RefreshEvent::SourceStarted { name, .. }) => write!(f, "Adding: {}", name),
            Self::Refresh(RefreshEvent::SourceAdded { name, archive, .. }) => {
                write!(f, "Added {} from {}", archive, name)
            }
            Self::Refresh(RefreshEvent::SourceSkipped { name, reason }) => {
                write!(f, "Skipped {}: {}", name, reason)
            }
            Self::Refresh(RefreshEvent::Cancelled) => write!(f, "Definition refresh cancelled"),
            Self::Refresh(RefreshEvent::Finished { count }) => {
                write!(f, "ROM definitions found: {}", count)
            }
            Self::Assembly(AssemblyEvent::InputAdded {
                index,
                total,
                input,
                bytes,
            }) => write!(f, "[{}/{}] added '{}' ({} bytes)", index, total, input, bytes),
        }
    }
}

/// Receiver of progress notifications
///
/// Implementations must be thread-safe: the refresh worker notifies from its
/// own thread.
pub trait ProgressObserver: Send + Sync {
    fn notify(&self, event: ProgressEvent);
}

/// No-op observer
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressObserver for SilentProgress {
    fn notify(&self, _event: ProgressEvent) {}
}

/// Logs every event through tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn notify(&self, event: ProgressEvent) {
        match &event {
            ProgressEvent::Refresh(RefreshEvent::SourceSkipped { .. }) => warn!("{}", event),
            ProgressEvent::Assembly(_) => debug!("{}", event),
            _ => info!("{}", event),
        }
    }
}

/// Calls a user-provided function for every event
pub struct CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressObserver for CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn notify(&self, event: ProgressEvent) {
        (self.callback)(event);
    }
}

/// Forwards events over a channel
///
/// A dropped receiver is ignored; the operation keeps running.
pub struct ChannelProgress {
    sender: Sender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn channel() -> (Self, Receiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }
}

impl ProgressObserver for ChannelProgress {
    fn notify(&self, event: ProgressEvent) {
        let _ = self.sender.send(event);
    }
}

/// Terminal spinner showing the current refresh step
pub struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{elapsed}] {pos} sources {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }
}

impl Default for CliProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for CliProgress {
    fn notify(&self, event: ProgressEvent) {
        match &event {
            ProgressEvent::Refresh(RefreshEvent::SourceStarted { index, .. }) => {
                self.bar.set_position(*index as u64);
                self.bar.set_message(event.to_string());
            }
            ProgressEvent::Refresh(RefreshEvent::SourceSkipped { .. }) => {
                self.bar.println(event.to_string());
            }
            ProgressEvent::Refresh(RefreshEvent::Finished { .. }) => {
                self.bar.finish_with_message(event.to_string());
            }
            ProgressEvent::Refresh(RefreshEvent::Cancelled) => {
                self.bar.abandon_with_message(event.to_string());
            }
            _ => self.bar.set_message(event.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_channel_progress() {
        let (observer, events) = ChannelProgress::channel();

        observer.notify(RefreshEvent::Listing.into());
        observer.notify(RefreshEvent::Finished { count: 3 }.into());

        let captured: Vec<_> = events.try_iter().collect();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured[1], ProgressEvent::Refresh(RefreshEvent::Finished { count: 3 }));
    }

    #[test]
    fn test_channel_progress_survives_dropped_receiver() {
        let (observer, events) = ChannelProgress::channel();
        drop(events);
        observer.notify(RefreshEvent::Cancelled.into());
    }

    #[test]
    fn test_callback_progress() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = events.clone();

        let progress = CallbackProgress::new(move |event| {
            events_clone.lock().unwrap().push(event);
        });

        progress.notify(
            AssemblyEvent::InputAdded {
                index: 1,
                total: 2,
                input: "a.bin".to_string(),
                bytes: 2,
            }
            .into(),
        );

        let captured = events.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].to_string(), "[1/2] added 'a.bin' (2 bytes)");
    }

    #[test]
    fn test_event_display() {
        let event: ProgressEvent = RefreshEvent::SourceStarted {
            name: "Arcade-Foo_MiSTer".to_string(),
            index: 4,
        }
        .into();
        assert_eq!(event.to_string(), "Adding: Arcade-Foo_MiSTer");

        let event: ProgressEvent = RefreshEvent::Finished { count: 12 }.into();
        assert_eq!(event.to_string(), "ROM definitions found: 12");
    }

    #[test]
    fn test_silent_and_log_accept_everything() {
        SilentProgress.notify(RefreshEvent::Listing.into());
        LogProgress.notify(
            RefreshEvent::SourceSkipped {
                name: "x".to_string(),
                reason: "no recipe".to_string(),
            }
            .into(),
        );
    }
}
