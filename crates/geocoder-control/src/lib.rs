//! Geocoder Control - Declarative Geocoder Search-Box Adapter
//!
//! This crate exposes a third-party geocoding search-box widget as a
//! declarative control on a map host. The adapter translates the host's
//! configuration bindings into the widget's native constructor options,
//! attaches the widget when the map-created notification fires, and
//! republishes the widget's internal events on typed outward channels,
//! including deprecated legacy-name aliases kept for backward compatibility.
//!
//! It deliberately implements no geocoding, ranking or map rendering of its
//! own: the widget and the map are external collaborators behind the
//! [`WidgetFactory`] and [`MapService`] seams.
//!
//! # Quick Start
//!
//! ```rust
//! use std::rc::Rc;
//!
//! use geocoder_control::{
//!     ControlDeps, ControlPosition, ControlSlot, GeocoderControl, GeocoderControlConfig,
//!     InlineDispatcher, MapHandle, MapService, testing::RecordingFactory,
//! };
//!
//! let deps = ControlDeps {
//!     widget_factory: Rc::new(RecordingFactory::new()),
//!     slot: Rc::new(ControlSlot::new()),
//!     dispatcher: Rc::new(InlineDispatcher),
//!     default_access_token: Some("pk.default".into()),
//! };
//! let config = GeocoderControlConfig::builder()
//!     .placeholder("Search places")
//!     .limit(5)
//!     .search_input("Berlin")
//!     .build();
//!
//! let control = GeocoderControl::new(deps, config);
//! control.outputs().clear.subscribe(|()| println!("search box cleared"));
//!
//! let mut map = MapService::new();
//! control.attach(&mut map, ControlPosition::TopRight)?;
//! map.notify_created(MapHandle::new("main"))?;
//! map.notify_loaded(); // the deferred initial query fires here, once
//! # Ok::<(), geocoder_control::error::GeocoderControlError>(())
//! ```
//!
//! # Event surface
//!
//! Five widget event kinds are forwarded: `geocoderResults` (deprecated alias
//! `results`), `geocoderResult` (alias `result`), `geocoderError` (alias
//! `error`), `loading` and `clear`. Subscribe before attaching: forwarders
//! are only registered for channels that have listeners at attachment time.

use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod config;
mod control;
pub mod error;
mod events;
mod map;
pub mod testing;
mod widget;

pub use config::{
    ConfigChange, ConfigChanges, GeocoderControlConfig, GeocoderControlConfigBuilder,
    LocalGeocoder, MapLibraryHandle, MarkerHandle, MarkerOption, ResultFilter,
};
pub use control::{CONTROL_NAME, ControlDeps, GeocoderControl};
pub use events::{
    DualChannel, EventChannel, GeocoderOutputs, LEGACY_ALIASES, legacy_alias_of, warn_deprecated,
};
pub use map::{
    ChangeDispatcher, ControlPosition, ControlSlot, InlineDispatcher, MapHandle, MapService,
    SlotError,
};
pub use widget::{
    GeocodeResult, GeocoderWidget, LngLat, LoadingEvent, OptionValue, ResultId, WidgetEvent,
    WidgetEventHandler, WidgetEventKind, WidgetFactory, WidgetOptions, build_widget_options, keys,
};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for the geocoder control adapter.
///
/// Sets up structured logging with configurable levels and filtering. Call
/// this once at the start of your application to see attachment, forwarding
/// and deprecation diagnostics.
///
/// # Examples
///
/// ```rust
/// use geocoder_control::init_logging;
/// use tracing::Level;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), geocoder_control::error::GeocoderControlError>(())
/// ```
pub fn init_logging(
    level: impl Into<LevelFilter>,
) -> Result<&'static (), error::GeocoderControlError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?;

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .init();
        Ok(())
    })
}
