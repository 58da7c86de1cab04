//! The geocoder control adapter.
//!
//! Exposes the external geocoder search-box widget as a declarative control
//! on a map: at the map-created notification it builds the sanitized
//! constructor options from the current configuration, instantiates the
//! widget, registers event forwarders for every observed outward channel,
//! claims the control slot and requests placement. Afterwards it pushes the
//! two live-updatable bindings (proximity, search query) into the running
//! widget as host updates arrive.
//!
//! The widget's emitter runs outside the host's change-detection domain, so
//! each forwarded emission is re-entered through the injected
//! [`ChangeDispatcher`] before outward listeners see it.

use std::{cell::RefCell, rc::Rc};

use tracing::{debug, info, instrument};

use crate::{
    config::{ConfigChanges, GeocoderControlConfig},
    error::GeocoderControlError,
    events::GeocoderOutputs,
    map::{ChangeDispatcher, ControlPosition, ControlSlot, MapHandle, MapService, SlotError},
    widget::{
        GeocoderWidget, ResultId, WidgetEvent, WidgetEventKind, WidgetFactory,
        build_widget_options,
    },
};

/// Name this control registers under in the slot and on the map.
pub const CONTROL_NAME: &str = "GeocoderControl";

/// Everything the adapter needs from its host, injected at construction.
pub struct ControlDeps {
    pub widget_factory: Rc<dyn WidgetFactory>,
    pub slot: Rc<ControlSlot>,
    pub dispatcher: Rc<dyn ChangeDispatcher>,
    /// Process-wide credential used when the configuration supplies none.
    pub default_access_token: Option<String>,
}

/// Adapter wiring one geocoder widget onto one map attachment.
pub struct GeocoderControl {
    inner: Rc<RefCell<Inner>>,
}

struct Inner {
    config: GeocoderControlConfig,
    deps: ControlDeps,
    outputs: Rc<GeocoderOutputs>,
    widget: Option<Rc<RefCell<dyn GeocoderWidget>>>,
    pending_query: Option<String>,
    last_result_id: Rc<RefCell<Option<ResultId>>>,
}

impl GeocoderControl {
    #[must_use]
    pub fn new(deps: ControlDeps, config: GeocoderControlConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                config,
                deps,
                outputs: Rc::new(GeocoderOutputs::new()),
                widget: None,
                pending_query: None,
                last_result_id: Rc::new(RefCell::new(None)),
            })),
        }
    }

    /// The outward event surface. Subscribe before [`attach`](Self::attach):
    /// forwarders are only registered for channels observed at attachment.
    #[must_use]
    pub fn outputs(&self) -> Rc<GeocoderOutputs> {
        Rc::clone(&self.inner.borrow().outputs)
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.inner.borrow().widget.is_some()
    }

    /// Subscribe to the map lifecycle. The attachment procedure runs when the
    /// map-created notification fires (immediately when the map already
    /// exists); a second control in the same slot is a fatal error.
    pub fn attach(
        &self,
        map_service: &mut MapService,
        position: ControlPosition,
    ) -> crate::error::Result<()> {
        let inner = Rc::clone(&self.inner);
        map_service.on_created(move |service, map| {
            Inner::handle_map_created(&inner, service, map, position)
                .map_err(GeocoderControlError::from)
        })
    }

    /// React to one host configuration update. A no-op before attachment.
    pub fn apply_changes(&self, changes: &ConfigChanges) {
        Inner::handle_changes(&self.inner, changes);
    }
}

impl Inner {
    #[instrument(
        name = "Attach geocoder control",
        level = "info",
        skip_all,
        fields(map = %map.label())
    )]
    fn handle_map_created(
        inner: &Rc<RefCell<Self>>,
        service: &mut MapService,
        map: &MapHandle,
        position: ControlPosition,
    ) -> Result<(), SlotError> {
        let mut this = inner.borrow_mut();

        // One control per slot; checked before any widget work happens.
        this.deps.slot.ensure_vacant()?;

        let options = build_widget_options(&this.config, this.deps.default_access_token.as_deref());
        debug!(option_count = options.len(), "constructing geocoder widget");
        let widget = this.deps.widget_factory.create(options);

        this.register_forwarders(&widget);

        this.deps.slot.register(CONTROL_NAME)?;
        service.add_control(CONTROL_NAME, position);

        this.pending_query = this.config.search_input.clone();
        let defer_initial_query = this.pending_query.is_some();
        this.widget = Some(widget);
        drop(this);

        if defer_initial_query {
            // The initial query waits for the map-loaded notification and is
            // issued exactly once, however often that notification fires.
            let inner = Rc::clone(inner);
            service.on_loaded(move |_| {
                let mut this = inner.borrow_mut();
                let Some(query) = this.pending_query.take() else {
                    return;
                };
                let Some(widget) = this.widget.clone() else {
                    return;
                };
                drop(this);
                debug!(query = %query, "issuing deferred initial query");
                widget.borrow_mut().query(&query);
            });
        }

        info!("geocoder control attached");
        Ok(())
    }

    /// Register a forwarder on the widget for every event kind with at least
    /// one observed outward channel. Kinds nobody listens to get no
    /// registration at all.
    fn register_forwarders(&self, widget: &Rc<RefCell<dyn GeocoderWidget>>) {
        let mut widget = widget.borrow_mut();

        if self.outputs.results.has_listeners() {
            self.outputs.results.warn_if_legacy_subscribed(CONTROL_NAME);
            let outputs = Rc::clone(&self.outputs);
            let dispatcher = Rc::clone(&self.deps.dispatcher);
            widget.on(
                WidgetEventKind::Results,
                Box::new(move |event| {
                    if let WidgetEvent::Results(results) = event {
                        dispatcher.run(&mut || outputs.results.emit(results));
                    }
                }),
            );
        }

        if self.outputs.result.has_listeners() {
            self.outputs.result.warn_if_legacy_subscribed(CONTROL_NAME);
            let outputs = Rc::clone(&self.outputs);
            let dispatcher = Rc::clone(&self.deps.dispatcher);
            let last_result_id = Rc::clone(&self.last_result_id);
            widget.on(
                WidgetEventKind::Result,
                Box::new(move |event| {
                    if let WidgetEvent::Result(result) = event {
                        // The upstream widget sometimes reports the same
                        // selection twice; forward the first occurrence only.
                        let mut last = last_result_id.borrow_mut();
                        if last.as_ref() == Some(&result.id) {
                            debug!(id = ?result.id, "suppressed duplicate result emission");
                            return;
                        }
                        *last = Some(result.id.clone());
                        drop(last);
                        dispatcher.run(&mut || outputs.result.emit(result));
                    }
                }),
            );
        }

        if self.outputs.error.has_listeners() {
            self.outputs.error.warn_if_legacy_subscribed(CONTROL_NAME);
            let outputs = Rc::clone(&self.outputs);
            let dispatcher = Rc::clone(&self.deps.dispatcher);
            widget.on(
                WidgetEventKind::Error,
                Box::new(move |event| {
                    if let WidgetEvent::Error(payload) = event {
                        dispatcher.run(&mut || outputs.error.emit(payload));
                    }
                }),
            );
        }

        if self.outputs.loading.has_listeners() {
            let outputs = Rc::clone(&self.outputs);
            let dispatcher = Rc::clone(&self.deps.dispatcher);
            widget.on(
                WidgetEventKind::Loading,
                Box::new(move |event| {
                    if let WidgetEvent::Loading(payload) = event {
                        dispatcher.run(&mut || outputs.loading.emit(payload));
                    }
                }),
            );
        }

        if self.outputs.clear.has_listeners() {
            let outputs = Rc::clone(&self.outputs);
            let dispatcher = Rc::clone(&self.deps.dispatcher);
            widget.on(
                WidgetEventKind::Clear,
                Box::new(move |event| {
                    if matches!(event, WidgetEvent::Clear) {
                        dispatcher.run(&mut || outputs.clear.emit(&()));
                    }
                }),
            );
        }
    }

    fn handle_changes(inner: &Rc<RefCell<Self>>, changes: &ConfigChanges) {
        let mut guard = inner.borrow_mut();
        let this = &mut *guard;

        // Mirror the live-updatable bindings into the stored configuration so
        // a later attachment snapshots the current values.
        if let Some(change) = &changes.proximity {
            this.config.proximity = Some(change.value);
        }
        if let Some(change) = &changes.search_input {
            this.config.search_input = Some(change.value.clone());
        }

        let Some(widget) = this.widget.clone() else {
            return;
        };

        if let Some(change) = &changes.proximity {
            // The update carrying the initial proximity value is skipped; the
            // widget only hears about later moves.
            if change.is_first_change {
                debug!("skipping initial proximity change");
            } else {
                debug!(lng = change.value.lng, lat = change.value.lat, "forwarding proximity");
                widget.borrow_mut().set_proximity(change.value);
            }
        }

        // Unlike proximity, the search query forwards on every change, the
        // first one included.
        if let Some(change) = &changes.search_input {
            debug!(query = %change.value, "forwarding search input");
            widget.borrow_mut().query(&change.value);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde_json::json;

    use super::*;
    use crate::{
        testing::{CountingDispatcher, RecordingFactory, RecordingWidget},
        widget::{GeocodeResult, LngLat, LoadingEvent, keys},
    };

    struct Fixture {
        control: GeocoderControl,
        factory: Rc<RecordingFactory>,
        dispatcher: Rc<CountingDispatcher>,
        slot: Rc<ControlSlot>,
        service: MapService,
    }

    fn fixture(config: GeocoderControlConfig) -> Fixture {
        let factory = Rc::new(RecordingFactory::new());
        let dispatcher = Rc::new(CountingDispatcher::new());
        let slot = Rc::new(ControlSlot::new());
        let control = GeocoderControl::new(
            ControlDeps {
                widget_factory: Rc::clone(&factory) as Rc<dyn WidgetFactory>,
                slot: Rc::clone(&slot),
                dispatcher: Rc::clone(&dispatcher) as Rc<dyn ChangeDispatcher>,
                default_access_token: None,
            },
            config,
        );
        Fixture {
            control,
            factory,
            dispatcher,
            slot,
            service: MapService::new(),
        }
    }

    fn attach(fx: &mut Fixture) -> Rc<RefCell<RecordingWidget>> {
        fx.control
            .attach(&mut fx.service, ControlPosition::TopRight)
            .expect("attach should register cleanly");
        fx.service
            .notify_created(MapHandle::new("main"))
            .expect("attachment should succeed");
        fx.factory.last().expect("widget should be constructed")
    }

    #[test]
    fn attachment_waits_for_map_created() {
        let mut fx = fixture(GeocoderControlConfig::default());
        fx.control
            .attach(&mut fx.service, ControlPosition::TopRight)
            .unwrap();
        assert!(!fx.control.is_attached());
        assert_eq!(fx.factory.created_count(), 0);

        fx.service.notify_created(MapHandle::new("main")).unwrap();
        assert!(fx.control.is_attached());
        assert_eq!(fx.factory.created_count(), 1);
        assert_eq!(fx.slot.occupant().as_deref(), Some(CONTROL_NAME));
        assert_eq!(
            fx.service.controls(),
            &[(CONTROL_NAME.to_owned(), ControlPosition::TopRight)]
        );
    }

    #[test]
    fn occupied_slot_fails_before_widget_construction() {
        let mut fx = fixture(GeocoderControlConfig::default());
        fx.slot.register("OtherControl").unwrap();

        fx.control
            .attach(&mut fx.service, ControlPosition::TopRight)
            .unwrap();
        let err = fx.service.notify_created(MapHandle::new("main"));

        assert!(err.is_err(), "double attachment must be fatal");
        assert_eq!(fx.factory.created_count(), 0, "no widget may be built");
        assert!(!fx.control.is_attached());
    }

    #[test]
    fn forwarder_count_matches_observed_channels() {
        let mut fx = fixture(GeocoderControlConfig::default());
        let outputs = fx.control.outputs();
        outputs.clear.subscribe(|()| {});
        outputs.result.legacy.subscribe(|_| {});

        let widget = attach(&mut fx);
        let widget = widget.borrow();
        assert_eq!(widget.registration_count(), 2);
        let kinds = widget.registered_kinds();
        assert!(kinds.contains(&WidgetEventKind::Clear));
        assert!(kinds.contains(&WidgetEventKind::Result));
    }

    #[test]
    fn no_forwarders_without_subscribers() {
        let mut fx = fixture(GeocoderControlConfig::default());
        let widget = attach(&mut fx);
        assert_eq!(widget.borrow().registration_count(), 0);
    }

    #[test]
    fn duplicate_result_is_suppressed_per_id() {
        let mut fx = fixture(GeocoderControlConfig::default());
        let outputs = fx.control.outputs();

        let legacy_seen = Rc::new(RefCell::new(Vec::new()));
        let current_seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&legacy_seen);
        outputs
            .result
            .legacy
            .subscribe(move |r: &GeocodeResult| sink.borrow_mut().push(r.place_name.clone()));
        let sink = Rc::clone(&current_seen);
        outputs
            .result
            .current
            .subscribe(move |r: &GeocodeResult| sink.borrow_mut().push(r.place_name.clone()));

        let widget = attach(&mut fx);
        let x = WidgetEvent::Result(GeocodeResult::new("X", "Berlin"));
        widget.borrow_mut().fire(&x);
        widget.borrow_mut().fire(&x);
        widget
            .borrow_mut()
            .fire(&WidgetEvent::Result(GeocodeResult::new("Y", "Hamburg")));

        assert_eq!(*legacy_seen.borrow(), vec!["Berlin".to_owned(), "Hamburg".to_owned()]);
        assert_eq!(*current_seen.borrow(), vec!["Berlin".to_owned(), "Hamburg".to_owned()]);
    }

    #[test]
    fn legacy_only_subscriber_still_gets_result() {
        let mut fx = fixture(GeocoderControlConfig::default());
        let outputs = fx.control.outputs();

        let seen = Rc::new(RefCell::new(0u32));
        let sink = Rc::clone(&seen);
        outputs.result.legacy.subscribe(move |_| *sink.borrow_mut() += 1);

        let widget = attach(&mut fx);
        widget
            .borrow_mut()
            .fire(&WidgetEvent::Result(GeocodeResult::new("X", "Berlin")));

        assert_eq!(*seen.borrow(), 1);
        assert!(!outputs.result.current.has_listeners());
    }

    #[test]
    fn results_dual_emission_carries_identical_payload() {
        let mut fx = fixture(GeocoderControlConfig::default());
        let outputs = fx.control.outputs();

        let current_seen = Rc::new(RefCell::new(Vec::new()));
        let legacy_seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&current_seen);
        outputs
            .results
            .current
            .subscribe(move |r: &Vec<GeocodeResult>| sink.borrow_mut().push(r.clone()));
        let sink = Rc::clone(&legacy_seen);
        outputs
            .results
            .legacy
            .subscribe(move |r: &Vec<GeocodeResult>| sink.borrow_mut().push(r.clone()));

        let widget = attach(&mut fx);
        let payload = vec![
            GeocodeResult::new("1", "Berlin"),
            GeocodeResult::new("2", "Bern"),
        ];
        widget.borrow_mut().fire(&WidgetEvent::Results(payload.clone()));

        assert_eq!(current_seen.borrow().as_slice(), &[payload.clone()]);
        assert_eq!(legacy_seen.borrow().as_slice(), &[payload]);
        // One logical event, one dispatcher re-entry.
        assert_eq!(fx.dispatcher.runs(), 1);
    }

    #[test]
    fn error_payload_is_forwarded_verbatim() {
        let mut fx = fixture(GeocoderControlConfig::default());
        let outputs = fx.control.outputs();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        outputs
            .error
            .current
            .subscribe(move |e: &serde_json::Value| sink.borrow_mut().push(e.clone()));

        let widget = attach(&mut fx);
        let payload = json!({"message": "rate limited", "status": 429});
        widget.borrow_mut().fire(&WidgetEvent::Error(payload.clone()));

        assert_eq!(seen.borrow().as_slice(), &[payload]);
    }

    #[test]
    fn loading_and_clear_forward_on_current_names() {
        let mut fx = fixture(GeocoderControlConfig::default());
        let outputs = fx.control.outputs();

        let loads = Rc::new(RefCell::new(Vec::new()));
        let clears = Rc::new(RefCell::new(0u32));
        let sink = Rc::clone(&loads);
        outputs
            .loading
            .subscribe(move |l: &LoadingEvent| sink.borrow_mut().push(l.query.clone()));
        let sink = Rc::clone(&clears);
        outputs.clear.subscribe(move |()| *sink.borrow_mut() += 1);

        let widget = attach(&mut fx);
        widget.borrow_mut().fire(&WidgetEvent::Loading(LoadingEvent {
            query: "Berl".into(),
        }));
        widget.borrow_mut().fire(&WidgetEvent::Clear);

        assert_eq!(*loads.borrow(), vec!["Berl".to_owned()]);
        assert_eq!(*clears.borrow(), 1);
        assert_eq!(fx.dispatcher.runs(), 2);
    }

    #[test]
    fn initial_query_waits_for_map_loaded_and_fires_once() {
        let mut fx = fixture(
            GeocoderControlConfig::builder()
                .search_input("Alexanderplatz")
                .build(),
        );
        let widget = attach(&mut fx);
        assert!(widget.borrow().queries().is_empty(), "query must wait for load");

        fx.service.notify_loaded();
        fx.service.notify_loaded();
        assert_eq!(widget.borrow().queries(), &["Alexanderplatz".to_owned()]);
    }

    #[test]
    fn no_loaded_subscription_without_initial_query() {
        let mut fx = fixture(GeocoderControlConfig::default());
        let widget = attach(&mut fx);
        fx.service.notify_loaded();
        assert!(widget.borrow().queries().is_empty());
    }

    #[test]
    fn proximity_skips_first_change_only() {
        let mut fx = fixture(GeocoderControlConfig::default());
        let widget = attach(&mut fx);

        fx.control
            .apply_changes(&ConfigChanges::new().with_proximity(LngLat::new(1.0, 2.0), true));
        assert!(widget.borrow().proximity_updates().is_empty());

        fx.control
            .apply_changes(&ConfigChanges::new().with_proximity(LngLat::new(3.0, 4.0), false));
        assert_eq!(widget.borrow().proximity_updates(), &[LngLat::new(3.0, 4.0)]);
    }

    #[test]
    fn search_input_forwards_even_on_first_change() {
        let mut fx = fixture(GeocoderControlConfig::default());
        let widget = attach(&mut fx);

        fx.control
            .apply_changes(&ConfigChanges::new().with_search_input("Berlin", true));
        assert_eq!(widget.borrow().queries(), &["Berlin".to_owned()]);

        fx.control
            .apply_changes(&ConfigChanges::new().with_search_input("Hamburg", false));
        assert_eq!(
            widget.borrow().queries(),
            &["Berlin".to_owned(), "Hamburg".to_owned()]
        );
    }

    #[test]
    fn changes_before_attachment_do_not_reach_a_widget() {
        let mut fx = fixture(GeocoderControlConfig::default());
        fx.control
            .apply_changes(&ConfigChanges::new().with_proximity(LngLat::new(1.0, 2.0), false));
        fx.control
            .apply_changes(&ConfigChanges::new().with_search_input("Berlin", false));

        assert_eq!(fx.factory.created_count(), 0);
        let widget = attach(&mut fx);
        // Stored bindings survive, but nothing was forwarded pre-attachment.
        assert!(widget.borrow().proximity_updates().is_empty());
    }

    #[test]
    fn default_token_reaches_widget_options() {
        let factory = Rc::new(RecordingFactory::new());
        let control = GeocoderControl::new(
            ControlDeps {
                widget_factory: Rc::clone(&factory) as Rc<dyn WidgetFactory>,
                slot: Rc::new(ControlSlot::new()),
                dispatcher: Rc::new(crate::map::InlineDispatcher),
                default_access_token: Some("pk.default".into()),
            },
            GeocoderControlConfig::default(),
        );
        let mut service = MapService::new();
        control.attach(&mut service, ControlPosition::default()).unwrap();
        service.notify_created(MapHandle::new("main")).unwrap();

        let widget = factory.last().unwrap();
        let widget = widget.borrow();
        assert_eq!(
            widget
                .options()
                .get(keys::ACCESS_TOKEN)
                .and_then(crate::widget::OptionValue::as_text),
            Some("pk.default")
        );
    }
}
