//! Map lifecycle, control placement and host scheduling collaborators.
//!
//! [`MapService`] carries the two lifecycle notification streams the adapter
//! subscribes to (map-created, map-loaded) and the placement operation that
//! puts a control on screen. [`ControlSlot`] is the single registration slot
//! in the host hierarchy; occupying it twice is the one fatal condition in
//! this crate. [`ChangeDispatcher`] re-enters the host's change-detection
//! domain around forwarded emissions so externally sourced events stay
//! visible to the host's update batching.

use std::{cell::RefCell, fmt};

use tracing::debug;

pub use error::SlotError;

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum SlotError {
        #[error("control slot is already occupied by `{0}`")]
        Occupied(String),
    }
}

/// Opaque handle to a live map instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapHandle {
    label: String,
}

impl MapHandle {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Screen corner a control is placed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ControlPosition {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ControlPosition {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
        }
    }
}

/// Re-enters the host framework's change-detection domain.
///
/// The widget's native emitter runs outside that domain, so every forwarded
/// emission is wrapped in [`ChangeDispatcher::run`] before outward listeners
/// are notified. This is about update visibility, not thread safety.
pub trait ChangeDispatcher {
    fn run(&self, f: &mut dyn FnMut());
}

/// Dispatcher for hosts without an update-batching domain; runs work in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineDispatcher;

impl ChangeDispatcher for InlineDispatcher {
    fn run(&self, f: &mut dyn FnMut()) {
        f();
    }
}

/// The single mutable registration slot in the host hierarchy.
///
/// One control instance may register per slot, exactly once, for the lifetime
/// of the map attachment.
#[derive(Debug, Default)]
pub struct ControlSlot {
    occupant: RefCell<Option<String>>,
}

impl ControlSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the slot without claiming it. Used as the attachment guard
    /// before any widget is constructed.
    pub fn ensure_vacant(&self) -> Result<(), SlotError> {
        match self.occupant.borrow().as_ref() {
            Some(existing) => Err(SlotError::Occupied(existing.clone())),
            None => Ok(()),
        }
    }

    /// Claim the slot for `name`.
    pub fn register(&self, name: &str) -> Result<(), SlotError> {
        let mut occupant = self.occupant.borrow_mut();
        if let Some(existing) = occupant.as_ref() {
            return Err(SlotError::Occupied(existing.clone()));
        }
        *occupant = Some(name.to_owned());
        Ok(())
    }

    #[must_use]
    pub fn occupant(&self) -> Option<String> {
        self.occupant.borrow().clone()
    }

    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.occupant.borrow().is_some()
    }
}

type CreatedListener = Box<dyn FnOnce(&mut MapService, &MapHandle) -> crate::error::Result<()>>;
type LoadedListener = Box<dyn FnMut(&mut MapService)>;

/// Lifecycle notifications for one map instance plus control placement.
///
/// Map-created fires once; map-loaded may fire again (style reloads). Late
/// subscribers are replayed the notification they missed, so attachment order
/// relative to the map's own lifecycle does not matter.
#[derive(Default)]
pub struct MapService {
    map: Option<MapHandle>,
    loaded: bool,
    created_listeners: Vec<CreatedListener>,
    loaded_listeners: Vec<LoadedListener>,
    placements: Vec<(String, ControlPosition)>,
}

impl MapService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn map(&self) -> Option<&MapHandle> {
        self.map.as_ref()
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Subscribe to the map-created notification. Runs immediately when the
    /// map already exists; fatal listener errors propagate to the caller.
    pub fn on_created<F>(&mut self, listener: F) -> crate::error::Result<()>
    where
        F: FnOnce(&mut Self, &MapHandle) -> crate::error::Result<()> + 'static,
    {
        if let Some(map) = self.map.clone() {
            listener(self, &map)
        } else {
            self.created_listeners.push(Box::new(listener));
            Ok(())
        }
    }

    /// Subscribe to the map-loaded notification. Replayed immediately when
    /// the map already finished loading, and kept for later firings.
    pub fn on_loaded<F>(&mut self, mut listener: F)
    where
        F: FnMut(&mut Self) + 'static,
    {
        if self.loaded {
            listener(self);
        }
        self.loaded_listeners.push(Box::new(listener));
    }

    /// Fire the map-created notification. A fatal attachment error from any
    /// listener aborts delivery and propagates to the host.
    pub fn notify_created(&mut self, map: MapHandle) -> crate::error::Result<()> {
        debug!(map = %map.label(), "map created");
        self.map = Some(map.clone());
        let listeners = std::mem::take(&mut self.created_listeners);
        for listener in listeners {
            listener(self, &map)?;
        }
        Ok(())
    }

    /// Fire the map-loaded notification.
    pub fn notify_loaded(&mut self) {
        debug!("map loaded");
        self.loaded = true;
        let mut listeners = std::mem::take(&mut self.loaded_listeners);
        for listener in &mut listeners {
            listener(self);
        }
        // Listeners registered while firing go after the existing ones.
        listeners.append(&mut self.loaded_listeners);
        self.loaded_listeners = listeners;
    }

    /// Place a registered control at a screen position.
    pub fn add_control(&mut self, name: &str, position: ControlPosition) {
        debug!(control = name, position = position.name(), "placing control");
        self.placements.push((name.to_owned(), position));
    }

    #[must_use]
    pub fn controls(&self) -> &[(String, ControlPosition)] {
        &self.placements
    }
}

impl fmt::Debug for MapService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapService")
            .field("map", &self.map)
            .field("loaded", &self.loaded)
            .field("created_listeners", &self.created_listeners.len())
            .field("loaded_listeners", &self.loaded_listeners.len())
            .field("placements", &self.placements)
            .finish()
    }
}
