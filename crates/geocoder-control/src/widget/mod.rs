//! Boundary types for the external geocoder search-box widget.
//!
//! The widget itself (query execution, suggestion ranking, network calls) is
//! owned by the external geocoder library; this module only models what the
//! adapter hands it and what it hands back. Construction goes through
//! [`WidgetFactory`] so the real library and test doubles plug in the same
//! way, and [`WidgetOptions`] captures the constructor snapshot with the
//! invariant that a key is present if and only if its value was resolved,
//! because the upstream constructor distinguishes "absent" from "explicitly
//! falsy".

use std::{cell::RefCell, collections::BTreeMap, fmt, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::config::{
    GeocoderControlConfig, LocalGeocoder, MapLibraryHandle, MarkerOption, ResultFilter,
};

/// A longitude/latitude coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    #[must_use]
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

/// Identifier carried by a geocode result.
///
/// The upstream widget reports either a string or a numeric id depending on
/// the data source, so both are accepted. Equality on the id is what drives
/// the duplicate-emission suppression in the adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultId {
    Text(String),
    Number(f64),
}

impl From<&str> for ResultId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for ResultId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for ResultId {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// A single candidate reported by the widget.
///
/// Beyond the identifier and display name the payload is free-form: whatever
/// else the geocoding backend attaches travels along in `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub id: ResultId,
    pub place_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<LngLat>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl GeocodeResult {
    pub fn new(id: impl Into<ResultId>, place_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            place_name: place_name.into(),
            center: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// Payload of the widget's loading notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadingEvent {
    pub query: String,
}

/// The five event kinds the widget's native emitter produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetEventKind {
    Results,
    Result,
    Error,
    Loading,
    Clear,
}

impl WidgetEventKind {
    pub const ALL: [Self; 5] = [
        Self::Results,
        Self::Result,
        Self::Error,
        Self::Loading,
        Self::Clear,
    ];

    /// The widget's native event name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Results => "results",
            Self::Result => "result",
            Self::Error => "error",
            Self::Loading => "loading",
            Self::Clear => "clear",
        }
    }
}

/// A widget-native event with its payload.
#[derive(Debug, Clone)]
pub enum WidgetEvent {
    Results(Vec<GeocodeResult>),
    Result(GeocodeResult),
    Error(serde_json::Value),
    Loading(LoadingEvent),
    Clear,
}

impl WidgetEvent {
    #[must_use]
    pub const fn kind(&self) -> WidgetEventKind {
        match self {
            Self::Results(_) => WidgetEventKind::Results,
            Self::Result(_) => WidgetEventKind::Result,
            Self::Error(_) => WidgetEventKind::Error,
            Self::Loading(_) => WidgetEventKind::Loading,
            Self::Clear => WidgetEventKind::Clear,
        }
    }
}

/// Constructor option keys, named as the upstream widget expects them.
pub mod keys {
    pub const COUNTRIES: &str = "countries";
    pub const PLACEHOLDER: &str = "placeholder";
    pub const ZOOM: &str = "zoom";
    pub const BBOX: &str = "bbox";
    pub const TYPES: &str = "types";
    pub const FLY_TO: &str = "flyTo";
    pub const MIN_LENGTH: &str = "minLength";
    pub const LIMIT: &str = "limit";
    pub const LANGUAGE: &str = "language";
    pub const ACCESS_TOKEN: &str = "accessToken";
    pub const FILTER: &str = "filter";
    pub const LOCAL_GEOCODER: &str = "localGeocoder";
    pub const MAP_LIBRARY: &str = "mapboxgl";
    pub const MARKER: &str = "marker";
}

/// One resolved constructor option value.
#[derive(Clone)]
pub enum OptionValue {
    Bool(bool),
    Float(f64),
    Uint(u32),
    Text(String),
    Bbox([f64; 4]),
    Filter(ResultFilter),
    LocalGeocoder(LocalGeocoder),
    MapLibrary(MapLibraryHandle),
    Marker(MarkerOption),
}

impl fmt::Debug for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "Bool({v})"),
            Self::Float(v) => write!(f, "Float({v})"),
            Self::Uint(v) => write!(f, "Uint({v})"),
            Self::Text(v) => write!(f, "Text({v:?})"),
            Self::Bbox(v) => write!(f, "Bbox({v:?})"),
            Self::Filter(_) => f.write_str("Filter(..)"),
            Self::LocalGeocoder(_) => f.write_str("LocalGeocoder(..)"),
            Self::MapLibrary(v) => write!(f, "MapLibrary({v:?})"),
            Self::Marker(v) => write!(f, "Marker({v:?})"),
        }
    }
}

impl OptionValue {
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_uint(&self) -> Option<u32> {
        match self {
            Self::Uint(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_marker(&self) -> Option<&MarkerOption> {
        match self {
            Self::Marker(v) => Some(v),
            _ => None,
        }
    }
}

/// Sanitized constructor options handed to the widget.
///
/// Invariant: every key present here carries a resolved value. Keys whose
/// configuration was unset are never inserted, so the widget constructor
/// never sees an "absent" placeholder.
#[derive(Debug, Clone, Default)]
pub struct WidgetOptions {
    entries: BTreeMap<&'static str, OptionValue>,
}

impl WidgetOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &'static str, value: OptionValue) {
        self.entries.insert(key, value);
    }

    /// Insert only when the value resolved to something.
    pub fn insert_opt(&mut self, key: &'static str, value: Option<OptionValue>) {
        if let Some(value) = value {
            self.entries.insert(key, value);
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

/// Build the constructor snapshot from the current configuration.
///
/// The access credential prefers the per-instance value and falls back to the
/// process-wide default; when neither exists the key is simply absent. The
/// marker flag always has a resolved value (it defaults to disabled), so it
/// is always present. Proximity and the search query are not constructor
/// options; they reach the widget through the live-update path.
#[must_use]
pub fn build_widget_options(
    config: &GeocoderControlConfig,
    default_access_token: Option<&str>,
) -> WidgetOptions {
    let mut options = WidgetOptions::new();

    options.insert_opt(
        keys::COUNTRIES,
        config.countries.clone().map(OptionValue::Text),
    );
    options.insert_opt(
        keys::PLACEHOLDER,
        config.placeholder.clone().map(OptionValue::Text),
    );
    options.insert_opt(keys::ZOOM, config.zoom.map(OptionValue::Float));
    options.insert_opt(keys::BBOX, config.bbox.map(OptionValue::Bbox));
    options.insert_opt(keys::TYPES, config.types.clone().map(OptionValue::Text));
    options.insert_opt(keys::FLY_TO, config.fly_to.map(OptionValue::Bool));
    options.insert_opt(keys::MIN_LENGTH, config.min_length.map(OptionValue::Uint));
    options.insert_opt(keys::LIMIT, config.limit.map(OptionValue::Uint));
    options.insert_opt(
        keys::LANGUAGE,
        config.language.clone().map(OptionValue::Text),
    );

    let access_token = config
        .access_token
        .clone()
        .or_else(|| default_access_token.map(str::to_owned));
    options.insert_opt(keys::ACCESS_TOKEN, access_token.map(OptionValue::Text));

    options.insert_opt(keys::FILTER, config.filter.clone().map(OptionValue::Filter));
    options.insert_opt(
        keys::LOCAL_GEOCODER,
        config.local_geocoder.clone().map(OptionValue::LocalGeocoder),
    );
    options.insert_opt(
        keys::MAP_LIBRARY,
        config.map_library.clone().map(OptionValue::MapLibrary),
    );
    options.insert(keys::MARKER, OptionValue::Marker(config.marker.clone()));

    options
}

/// Handler registered on the widget's native event emitter.
pub type WidgetEventHandler = Box<dyn FnMut(&WidgetEvent)>;

/// The external geocoder widget, as seen by the adapter.
pub trait GeocoderWidget {
    /// Register a handler on the widget's native event emitter.
    fn on(&mut self, kind: WidgetEventKind, handler: WidgetEventHandler);

    /// Push a new proximity bias into the running widget.
    fn set_proximity(&mut self, proximity: LngLat);

    /// Issue a search query.
    fn query(&mut self, text: &str);
}

/// Constructs the widget at attachment time.
pub trait WidgetFactory {
    fn create(&self, options: WidgetOptions) -> Rc<RefCell<dyn GeocoderWidget>>;
}
