//! Outward event channels and the legacy-name compatibility layer.
//!
//! Each channel keeps an explicit listener registry so the adapter can ask
//! "does anyone observe this?" before it registers a forwarder on the widget.
//! Three of the five event kinds kept their old names as deprecated aliases;
//! [`DualChannel`] pairs the current channel with its alias so emission and
//! the deprecation warning iterate the pairing instead of duplicating code.

use std::{cell::RefCell, fmt};

use tracing::warn;

use crate::widget::{GeocodeResult, LoadingEvent};

type Listener<T> = Box<dyn Fn(&T)>;

/// A single outward event channel with an explicit listener registry.
///
/// Single-threaded by design: handlers run to completion before the next
/// event is processed, so no locking is involved.
pub struct EventChannel<T> {
    name: &'static str,
    listeners: RefCell<Vec<Listener<T>>>,
}

impl<T> EventChannel<T> {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            listeners: RefCell::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn subscribe(&self, listener: impl Fn(&T) + 'static) {
        self.listeners.borrow_mut().push(Box::new(listener));
    }

    #[must_use]
    pub fn has_listeners(&self) -> bool {
        !self.listeners.borrow().is_empty()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Deliver a payload to every registered listener, in subscription order.
    pub fn emit(&self, payload: &T) {
        for listener in self.listeners.borrow().iter() {
            listener(payload);
        }
    }
}

impl<T> fmt::Debug for EventChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("name", &self.name)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// A current-name channel paired with its deprecated legacy alias.
///
/// Both carry identical payloads; one upstream event yields one emission on
/// each channel within the same logical delivery.
#[derive(Debug)]
pub struct DualChannel<T> {
    pub current: EventChannel<T>,
    pub legacy: EventChannel<T>,
}

impl<T> DualChannel<T> {
    #[must_use]
    pub fn new(current: &'static str, legacy: &'static str) -> Self {
        Self {
            current: EventChannel::new(current),
            legacy: EventChannel::new(legacy),
        }
    }

    /// True when either name has at least one subscriber.
    #[must_use]
    pub fn has_listeners(&self) -> bool {
        self.current.has_listeners() || self.legacy.has_listeners()
    }

    pub fn emit(&self, payload: &T) {
        self.current.emit(payload);
        self.legacy.emit(payload);
    }

    /// Emit one deprecation diagnostic when the legacy alias is observed.
    /// Called at forwarder-registration time, never per event.
    pub fn warn_if_legacy_subscribed(&self, component: &str) {
        if self.legacy.has_listeners() {
            warn_deprecated(component, self.legacy.name(), self.current.name());
        }
    }
}

/// Current channel name paired with its single deprecated alias. Loading and
/// clear were never renamed and have no alias.
pub const LEGACY_ALIASES: &[(&str, &str)] = &[
    ("geocoderResults", "results"),
    ("geocoderResult", "result"),
    ("geocoderError", "error"),
];

/// Look up the deprecated alias of a current channel name.
#[must_use]
pub fn legacy_alias_of(current: &str) -> Option<&'static str> {
    LEGACY_ALIASES
        .iter()
        .find(|(name, _)| *name == current)
        .map(|(_, legacy)| *legacy)
}

/// Emit one deprecation diagnostic naming the replacement channel.
pub fn warn_deprecated(component: &str, old_name: &str, new_name: &str) {
    warn!("Component {component}: `{old_name}` is deprecated, use `{new_name}` instead");
}

/// The adapter's outward event surface.
#[derive(Debug)]
pub struct GeocoderOutputs {
    pub clear: EventChannel<()>,
    pub loading: EventChannel<LoadingEvent>,
    pub results: DualChannel<Vec<GeocodeResult>>,
    pub result: DualChannel<GeocodeResult>,
    pub error: DualChannel<serde_json::Value>,
}

impl GeocoderOutputs {
    #[must_use]
    pub fn new() -> Self {
        Self {
            clear: EventChannel::new("clear"),
            loading: EventChannel::new("loading"),
            results: DualChannel::new("geocoderResults", "results"),
            result: DualChannel::new("geocoderResult", "result"),
            error: DualChannel::new("geocoderError", "error"),
        }
    }
}

impl Default for GeocoderOutputs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    #[test]
    fn subscribe_then_emit_delivers_in_order() {
        let channel = EventChannel::<u32>::new("numbers");
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        channel.subscribe(move |n| sink.borrow_mut().push(*n));
        let sink = Rc::clone(&seen);
        channel.subscribe(move |n| sink.borrow_mut().push(n * 10));

        channel.emit(&7);
        assert_eq!(*seen.borrow(), vec![7, 70]);
        assert_eq!(channel.listener_count(), 2);
    }

    #[test]
    fn has_listeners_reflects_registry() {
        let channel = EventChannel::<()>::new("clear");
        assert!(!channel.has_listeners());
        channel.subscribe(|()| {});
        assert!(channel.has_listeners());
    }

    #[test]
    fn dual_channel_emits_identical_payload_on_both_names() {
        let dual = DualChannel::<String>::new("geocoderError", "error");
        let current_seen = Rc::new(RefCell::new(Vec::new()));
        let legacy_seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&current_seen);
        dual.current.subscribe(move |s: &String| sink.borrow_mut().push(s.clone()));
        let sink = Rc::clone(&legacy_seen);
        dual.legacy.subscribe(move |s: &String| sink.borrow_mut().push(s.clone()));

        dual.emit(&"boom".to_owned());
        assert_eq!(*current_seen.borrow(), vec!["boom".to_owned()]);
        assert_eq!(*legacy_seen.borrow(), vec!["boom".to_owned()]);
    }

    #[test]
    fn dual_channel_listener_check_covers_either_name() {
        let dual = DualChannel::<u8>::new("geocoderResult", "result");
        assert!(!dual.has_listeners());
        dual.legacy.subscribe(|_| {});
        assert!(dual.has_listeners());
    }

    #[test]
    fn outputs_channel_names_match_alias_table() {
        let outputs = GeocoderOutputs::new();
        assert_eq!(
            legacy_alias_of(outputs.results.current.name()),
            Some(outputs.results.legacy.name())
        );
        assert_eq!(
            legacy_alias_of(outputs.result.current.name()),
            Some(outputs.result.legacy.name())
        );
        assert_eq!(
            legacy_alias_of(outputs.error.current.name()),
            Some(outputs.error.legacy.name())
        );
        assert_eq!(legacy_alias_of(outputs.loading.name()), None);
        assert_eq!(legacy_alias_of(outputs.clear.name()), None);
    }
}
