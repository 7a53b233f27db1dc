//! One-shot, re-armable change notification.
//!
//! A [`ChangeMonitor`] owns a handle on the watched node and one
//! [`WaitableSignal`]. [`ChangeMonitor::queue_single_event`] arms a platform
//! subscription that sets the signal on the next matching change; once the
//! caller has observed the signal it calls `queue_single_event` again to
//! watch for the next one. Changes between two arms are not queued.

use hivekit_platform::WaitableSignal;
use hivekit_types::{EventFlag, NotifyFilter};

use crate::error::{During, StoreError, StoreResult};
use crate::handle::StoreHandle;

const ACTIVATE_MONITORING: &str = "Activate registry monitoring";

/// Whether a subscription is outstanding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MonitorState {
    /// The next `queue_single_event` subscribes.
    #[default]
    Idle,
    /// A subscription is outstanding and is reused until it fires.
    Armed,
}

/// The notification filter for a set of event flags.
pub(crate) fn notify_filter(events: &[EventFlag]) -> StoreResult<NotifyFilter> {
    let filter = events
        .iter()
        .fold(NotifyFilter::empty(), |acc, event| acc | event.filter_bits());
    if filter.is_empty() {
        return Err(StoreError::Configuration(
            "at least one event flag is required to monitor a key".into(),
        ));
    }
    Ok(filter)
}

/// Watches one node for changes.
#[derive(Debug)]
pub struct ChangeMonitor {
    handle: StoreHandle,
    events: Vec<EventFlag>,
    recursive: bool,
    signal: WaitableSignal,
    state: MonitorState,
    /// Signal fire count when the current subscription was issued.
    armed_at: u64,
}

impl ChangeMonitor {
    pub(crate) fn new(handle: StoreHandle, events: Vec<EventFlag>, recursive: bool) -> Self {
        Self {
            handle,
            events,
            recursive,
            signal: WaitableSignal::new(),
            state: MonitorState::Idle,
            armed_at: 0,
        }
    }

    /// Arm the monitor and return the signal to wait on.
    ///
    /// While a subscription is outstanding this returns the same signal
    /// without subscribing again. Once the subscription has fired, the next
    /// call subscribes anew, even if the caller reset the signal meanwhile.
    pub fn queue_single_event(&mut self) -> StoreResult<WaitableSignal> {
        if self.state() == MonitorState::Armed {
            return Ok(self.signal.clone());
        }

        self.state = MonitorState::Idle;
        let filter = notify_filter(&self.events)?;
        // Read before subscribing so a fire racing the call is still seen.
        let fired = self.signal.fire_count();
        self.handle
            .platform()
            .notify_change(self.handle.raw(), filter, self.recursive, &self.signal)
            .during(ACTIVATE_MONITORING)?;
        self.state = MonitorState::Armed;
        self.armed_at = fired;
        Ok(self.signal.clone())
    }

    /// `Armed` only while the issued subscription has not fired.
    pub fn state(&self) -> MonitorState {
        match self.state {
            MonitorState::Armed if self.signal.fire_count() == self.armed_at => MonitorState::Armed,
            _ => MonitorState::Idle,
        }
    }

    pub fn events(&self) -> &[EventFlag] {
        &self.events
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// The node being watched.
    pub fn handle(&self) -> &StoreHandle {
        &self.handle
    }
}
