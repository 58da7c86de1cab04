//! Inbound configuration surface for the geocoder control.
//!
//! [`GeocoderControlConfig`] mirrors the host's declarative bindings: every
//! field is optional except the marker flag, which defaults to disabled.
//! [`ConfigChanges`] models one host update notification for the two bindings
//! that support live updates after attachment (proximity and search query).

use std::{fmt, rc::Rc};

use crate::widget::{GeocodeResult, LngLat};

/// Predicate applied to each candidate result before it is surfaced.
#[derive(Clone)]
pub struct ResultFilter(Rc<dyn Fn(&GeocodeResult) -> bool>);

impl ResultFilter {
    pub fn new(filter: impl Fn(&GeocodeResult) -> bool + 'static) -> Self {
        Self(Rc::new(filter))
    }

    #[must_use]
    pub fn matches(&self, result: &GeocodeResult) -> bool {
        (self.0)(result)
    }
}

impl fmt::Debug for ResultFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResultFilter(..)")
    }
}

/// Supplements the remote geocoder with locally produced candidates.
#[derive(Clone)]
pub struct LocalGeocoder(Rc<dyn Fn(&str) -> Vec<GeocodeResult>>);

impl LocalGeocoder {
    pub fn new(geocoder: impl Fn(&str) -> Vec<GeocodeResult> + 'static) -> Self {
        Self(Rc::new(geocoder))
    }

    #[must_use]
    pub fn candidates(&self, query: &str) -> Vec<GeocodeResult> {
        (self.0)(query)
    }
}

impl fmt::Debug for LocalGeocoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LocalGeocoder(..)")
    }
}

/// Opaque handle to the map rendering library, passed through to the widget
/// so it can drive fly-to animations and marker placement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapLibraryHandle {
    name: String,
}

impl MapLibraryHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A pre-built marker supplied by the host instead of the widget's default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerHandle {
    label: String,
}

impl MarkerHandle {
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

/// Marker behaviour on result selection: off, the widget's default marker, or
/// a host-supplied one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MarkerOption {
    #[default]
    Disabled,
    Enabled,
    Custom(MarkerHandle),
}

/// Snapshot of the host's declarative bindings.
#[derive(Debug, Clone, Default)]
pub struct GeocoderControlConfig {
    pub countries: Option<String>,
    pub placeholder: Option<String>,
    pub zoom: Option<f64>,
    pub bbox: Option<[f64; 4]>,
    pub types: Option<String>,
    pub fly_to: Option<bool>,
    pub min_length: Option<u32>,
    pub limit: Option<u32>,
    pub language: Option<String>,
    pub access_token: Option<String>,
    pub filter: Option<ResultFilter>,
    pub local_geocoder: Option<LocalGeocoder>,
    pub map_library: Option<MapLibraryHandle>,
    pub marker: MarkerOption,
    /// Live-updatable after attachment.
    pub proximity: Option<LngLat>,
    /// Live-updatable after attachment.
    pub search_input: Option<String>,
}

impl GeocoderControlConfig {
    #[must_use]
    pub fn builder() -> GeocoderControlConfigBuilder {
        GeocoderControlConfigBuilder::new()
    }
}

/// Builder for control configurations with ergonomic defaults.
#[derive(Debug, Clone, Default)]
pub struct GeocoderControlConfigBuilder {
    config: GeocoderControlConfig,
}

impl GeocoderControlConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: GeocoderControlConfig::default(),
        }
    }

    pub fn countries(mut self, countries: impl Into<String>) -> Self {
        self.config.countries = Some(countries.into());
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.config.placeholder = Some(placeholder.into());
        self
    }

    #[must_use]
    pub fn zoom(mut self, zoom: f64) -> Self {
        self.config.zoom = Some(zoom);
        self
    }

    #[must_use]
    pub fn bbox(mut self, bbox: [f64; 4]) -> Self {
        self.config.bbox = Some(bbox);
        self
    }

    pub fn types(mut self, types: impl Into<String>) -> Self {
        self.config.types = Some(types.into());
        self
    }

    #[must_use]
    pub fn fly_to(mut self, fly_to: bool) -> Self {
        self.config.fly_to = Some(fly_to);
        self
    }

    #[must_use]
    pub fn min_length(mut self, min_length: u32) -> Self {
        self.config.min_length = Some(min_length);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.config.limit = Some(limit);
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = Some(language.into());
        self
    }

    pub fn access_token(mut self, access_token: impl Into<String>) -> Self {
        self.config.access_token = Some(access_token.into());
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: ResultFilter) -> Self {
        self.config.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn local_geocoder(mut self, local_geocoder: LocalGeocoder) -> Self {
        self.config.local_geocoder = Some(local_geocoder);
        self
    }

    #[must_use]
    pub fn map_library(mut self, map_library: MapLibraryHandle) -> Self {
        self.config.map_library = Some(map_library);
        self
    }

    #[must_use]
    pub fn marker(mut self, marker: MarkerOption) -> Self {
        self.config.marker = marker;
        self
    }

    #[must_use]
    pub fn proximity(mut self, proximity: LngLat) -> Self {
        self.config.proximity = Some(proximity);
        self
    }

    pub fn search_input(mut self, search_input: impl Into<String>) -> Self {
        self.config.search_input = Some(search_input.into());
        self
    }

    #[must_use]
    pub fn build(self) -> GeocoderControlConfig {
        self.config
    }
}

/// One changed binding inside a host update notification.
#[derive(Debug, Clone)]
pub struct ConfigChange<T> {
    pub value: T,
    /// True when this update supplied the binding's initial value.
    pub is_first_change: bool,
}

impl<T> ConfigChange<T> {
    pub fn new(value: T, is_first_change: bool) -> Self {
        Self {
            value,
            is_first_change,
        }
    }
}

/// The change set delivered by one host update, restricted to the bindings
/// that support live updates.
#[derive(Debug, Clone, Default)]
pub struct ConfigChanges {
    pub proximity: Option<ConfigChange<LngLat>>,
    pub search_input: Option<ConfigChange<String>>,
}

impl ConfigChanges {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_proximity(mut self, value: LngLat, is_first_change: bool) -> Self {
        self.proximity = Some(ConfigChange::new(value, is_first_change));
        self
    }

    pub fn with_search_input(mut self, value: impl Into<String>, is_first_change: bool) -> Self {
        self.search_input = Some(ConfigChange::new(value.into(), is_first_change));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proximity.is_none() && self.search_input.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GeocoderControlConfig::default();
        assert!(config.countries.is_none());
        assert!(config.access_token.is_none());
        assert!(config.search_input.is_none());
        assert_eq!(config.marker, MarkerOption::Disabled);
    }

    #[test]
    fn test_method_chaining() {
        let config = GeocoderControlConfig::builder()
            .countries("de")
            .placeholder("Wo?")
            .zoom(14.0)
            .fly_to(false)
            .min_length(2)
            .limit(3)
            .marker(MarkerOption::Custom(MarkerHandle::new("pin")))
            .proximity(LngLat::new(13.4, 52.5))
            .build();

        assert_eq!(config.countries.as_deref(), Some("de"));
        assert_eq!(config.placeholder.as_deref(), Some("Wo?"));
        assert_eq!(config.zoom, Some(14.0));
        assert_eq!(config.fly_to, Some(false));
        assert_eq!(config.min_length, Some(2));
        assert_eq!(config.limit, Some(3));
        assert_eq!(config.marker, MarkerOption::Custom(MarkerHandle::new("pin")));
        assert_eq!(config.proximity, Some(LngLat::new(13.4, 52.5)));
    }

    #[test]
    fn test_filter_predicate_runs() {
        let filter = ResultFilter::new(|result| result.place_name.starts_with("B"));
        assert!(filter.matches(&GeocodeResult::new("1", "Berlin")));
        assert!(!filter.matches(&GeocodeResult::new("2", "Hamburg")));
    }

    #[test]
    fn test_local_geocoder_produces_candidates() {
        let local = LocalGeocoder::new(|query| vec![GeocodeResult::new("local.1", query)]);
        let candidates = local.candidates("Kreuzberg");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].place_name, "Kreuzberg");
    }

    #[test]
    fn test_opaque_handles() {
        assert_eq!(MapLibraryHandle::new("mapbox-gl").name(), "mapbox-gl");
        assert_eq!(MarkerHandle::new("pin").label(), "pin");
    }

    #[test]
    fn test_change_set_builder() {
        let changes = ConfigChanges::new()
            .with_proximity(LngLat::new(1.0, 2.0), true)
            .with_search_input("Berlin", false);

        assert!(!changes.is_empty());
        assert!(changes.proximity.as_ref().unwrap().is_first_change);
        assert!(!changes.search_input.as_ref().unwrap().is_first_change);
        assert!(ConfigChanges::new().is_empty());
    }
}
