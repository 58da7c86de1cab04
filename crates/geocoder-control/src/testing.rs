//! Test doubles for the widget and dispatcher boundaries.
//!
//! The real geocoder widget library and the host's change-detection domain
//! live outside this crate, so the test suites exercise the adapter against
//! these recording fakes instead: the widget captures its constructor
//! options, event registrations and live-update calls, and lets a test fire
//! native events by hand.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use crate::{
    map::ChangeDispatcher,
    widget::{
        GeocoderWidget, LngLat, WidgetEvent, WidgetEventHandler, WidgetEventKind, WidgetFactory,
        WidgetOptions,
    },
};

/// Widget fake that records everything the adapter does to it.
#[derive(Default)]
pub struct RecordingWidget {
    options: WidgetOptions,
    handlers: Vec<(WidgetEventKind, WidgetEventHandler)>,
    queries: Vec<String>,
    proximity_updates: Vec<LngLat>,
}

impl RecordingWidget {
    #[must_use]
    pub fn new(options: WidgetOptions) -> Self {
        Self {
            options,
            handlers: Vec::new(),
            queries: Vec::new(),
            proximity_updates: Vec::new(),
        }
    }

    /// The constructor options the adapter passed in.
    #[must_use]
    pub fn options(&self) -> &WidgetOptions {
        &self.options
    }

    /// How many times `on` was called.
    #[must_use]
    pub fn registration_count(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn registered_kinds(&self) -> Vec<WidgetEventKind> {
        self.handlers.iter().map(|(kind, _)| *kind).collect()
    }

    #[must_use]
    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    #[must_use]
    pub fn proximity_updates(&self) -> &[LngLat] {
        &self.proximity_updates
    }

    /// Fire a native event into every handler registered for its kind.
    pub fn fire(&mut self, event: &WidgetEvent) {
        let kind = event.kind();
        for (registered, handler) in &mut self.handlers {
            if *registered == kind {
                handler(event);
            }
        }
    }
}

impl GeocoderWidget for RecordingWidget {
    fn on(&mut self, kind: WidgetEventKind, handler: WidgetEventHandler) {
        self.handlers.push((kind, handler));
    }

    fn set_proximity(&mut self, proximity: LngLat) {
        self.proximity_updates.push(proximity);
    }

    fn query(&mut self, text: &str) {
        self.queries.push(text.to_owned());
    }
}

/// Factory fake handing out [`RecordingWidget`]s and keeping a handle to each.
#[derive(Default)]
pub struct RecordingFactory {
    created: RefCell<Vec<Rc<RefCell<RecordingWidget>>>>,
}

impl RecordingFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn created_count(&self) -> usize {
        self.created.borrow().len()
    }

    /// The most recently constructed widget, if any.
    #[must_use]
    pub fn last(&self) -> Option<Rc<RefCell<RecordingWidget>>> {
        self.created.borrow().last().map(Rc::clone)
    }
}

impl WidgetFactory for RecordingFactory {
    fn create(&self, options: WidgetOptions) -> Rc<RefCell<dyn GeocoderWidget>> {
        let widget = Rc::new(RefCell::new(RecordingWidget::new(options)));
        self.created.borrow_mut().push(Rc::clone(&widget));
        widget
    }
}

/// Dispatcher fake that counts re-entries while running work in place.
#[derive(Debug, Default)]
pub struct CountingDispatcher {
    runs: Cell<usize>,
}

impl CountingDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many forwarded emissions were re-entered through this dispatcher.
    #[must_use]
    pub fn runs(&self) -> usize {
        self.runs.get()
    }
}

impl ChangeDispatcher for CountingDispatcher {
    fn run(&self, f: &mut dyn FnMut()) {
        self.runs.set(self.runs.get() + 1);
        f();
    }
}
