//! Best-effort network enrichment: place names for export file names, place
//! search and point elevations. Failures fall back to placeholder values.

use crate::export::{slugify, DEFAULT_LOCATION};
use crate::{Error, Result};

use geo::Coord;
use serde::Deserialize;

use std::collections::HashMap;
use std::time::Duration;

const NOMINATIM: &str = "https://nominatim.openstreetmap.org";
const OPEN_ELEVATION: &str = "https://api.open-elevation.com/api/v1/lookup";

/// Address fields tried in order when naming a place
const PLACE_FIELDS: [&str; 6] = ["city", "town", "village", "municipality", "county", "state"];

#[derive(Clone, Debug, PartialEq)]
pub struct Place {
    pub name: String,
    pub lon_lat: Coord,
}

pub trait LocationService {
    /// name of the place around (lon, lat)
    fn reverse_geocode(&self, lon_lat: Coord) -> Result<String>;

    fn search(&self, query: &str) -> Result<Vec<Place>>;

    /// meters above sea level
    fn elevation(&self, lon_lat: Coord) -> Result<f64>;
}

/// File name slug for the place at `lon_lat`, "location" when the lookup fails
pub fn location_slug(service: &dyn LocationService, lon_lat: Coord) -> String {
    match service.reverse_geocode(lon_lat) {
        Ok(name) => slugify(&name),
        Err(e) => {
            log::warn!("Reverse geocoding failed, using \"{DEFAULT_LOCATION}\": {e}");
            DEFAULT_LOCATION.to_string()
        }
    }
}

pub fn search_places(service: &dyn LocationService, query: &str) -> Vec<Place> {
    if query.trim().is_empty() {
        return vec![];
    }
    service.search(query).unwrap_or_else(|e| {
        log::warn!("Place search failed: {e}");
        vec![]
    })
}

pub fn elevation_or_zero(service: &dyn LocationService, lon_lat: Coord) -> f64 {
    service.elevation(lon_lat).unwrap_or_else(|e| {
        log::warn!("Elevation lookup failed: {e}");
        0.
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestId(u64);

/// Keeps only the answer to the most recent request. Answers to older
/// requests that arrive late are dropped.
#[derive(Debug)]
pub struct LatestRequest<T> {
    issued: u64,
    value: Option<T>,
}

impl<T> Default for LatestRequest<T> {
    fn default() -> Self {
        LatestRequest {
            issued: 0,
            value: None,
        }
    }
}

impl<T> LatestRequest<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> RequestId {
        self.issued += 1;
        RequestId(self.issued)
    }

    /// Stores `value` if `id` is the latest request, returns whether it was kept
    pub fn complete(&mut self, id: RequestId, value: T) -> bool {
        if id.0 != self.issued {
            log::debug!("Dropping stale response {} (latest is {})", id.0, self.issued);
            return false;
        }
        self.value = Some(value);
        true
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }
}

#[derive(Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    address: HashMap<String, String>,
}

#[derive(Deserialize)]
struct SearchResult {
    display_name: String,
    lat: String,
    lon: String,
}

#[derive(Deserialize)]
struct ElevationResponse {
    results: Vec<ElevationResult>,
}

#[derive(Deserialize)]
struct ElevationResult {
    elevation: f64,
}

/// Nominatim for names and search, Open-Elevation for heights
pub struct HttpLocationService {
    agent: ureq::Agent,
    geocoder_url: String,
    elevation_url: String,
}

impl Default for HttpLocationService {
    fn default() -> Self {
        HttpLocationService::new(NOMINATIM, OPEN_ELEVATION)
    }
}

fn lookup_error(e: impl std::fmt::Display) -> Error {
    Error::Lookup(e.to_string())
}

impl HttpLocationService {
    pub fn new(geocoder_url: &str, elevation_url: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("topoma/", env!("CARGO_PKG_VERSION")))
            .build();
        HttpLocationService {
            agent,
            geocoder_url: geocoder_url.trim_end_matches('/').to_string(),
            elevation_url: elevation_url.to_string(),
        }
    }
}

impl LocationService for HttpLocationService {
    fn reverse_geocode(&self, lon_lat: Coord) -> Result<String> {
        let response: ReverseResponse = self
            .agent
            .get(&format!("{}/reverse", self.geocoder_url))
            .query("format", "jsonv2")
            .query("zoom", "10")
            .query("lat", &lon_lat.y.to_string())
            .query("lon", &lon_lat.x.to_string())
            .call()
            .map_err(lookup_error)?
            .into_json()
            .map_err(lookup_error)?;

        PLACE_FIELDS
            .iter()
            .find_map(|field| response.address.get(*field).cloned())
            .or(response.name)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::Lookup(format!("no place name at {lon_lat:?}")))
    }

    fn search(&self, query: &str) -> Result<Vec<Place>> {
        let results: Vec<SearchResult> = self
            .agent
            .get(&format!("{}/search", self.geocoder_url))
            .query("format", "jsonv2")
            .query("limit", "10")
            .query("q", query)
            .call()
            .map_err(lookup_error)?
            .into_json()
            .map_err(lookup_error)?;

        Ok(results
            .into_iter()
            .filter_map(|r| {
                let lon_lat = Coord {
                    x: r.lon.parse().ok()?,
                    y: r.lat.parse().ok()?,
                };
                Some(Place {
                    name: r.display_name,
                    lon_lat,
                })
            })
            .collect())
    }

    fn elevation(&self, lon_lat: Coord) -> Result<f64> {
        let response: ElevationResponse = self
            .agent
            .get(&self.elevation_url)
            .query("locations", &format!("{},{}", lon_lat.y, lon_lat.x))
            .call()
            .map_err(lookup_error)?
            .into_json()
            .map_err(lookup_error)?;

        response
            .results
            .first()
            .map(|r| r.elevation)
            .ok_or_else(|| Error::Lookup("empty elevation response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Offline;

    impl LocationService for Offline {
        fn reverse_geocode(&self, _: Coord) -> Result<String> {
            Err(Error::Lookup("offline".to_string()))
        }

        fn search(&self, _: &str) -> Result<Vec<Place>> {
            Err(Error::Lookup("offline".to_string()))
        }

        fn elevation(&self, _: Coord) -> Result<f64> {
            Err(Error::Lookup("offline".to_string()))
        }
    }

    struct Fixed;

    impl LocationService for Fixed {
        fn reverse_geocode(&self, _: Coord) -> Result<String> {
            Ok("Salé".to_string())
        }

        fn search(&self, query: &str) -> Result<Vec<Place>> {
            Ok(vec![Place {
                name: query.to_string(),
                lon_lat: Coord { x: -6.8, y: 34. },
            }])
        }

        fn elevation(&self, _: Coord) -> Result<f64> {
            Ok(52.)
        }
    }

    #[test]
    fn test_failures_degrade_to_defaults() {
        let here = Coord { x: -6.8, y: 34. };
        assert_eq!(location_slug(&Offline, here), "location");
        assert!(search_places(&Offline, "Rabat").is_empty());
        assert_eq!(elevation_or_zero(&Offline, here), 0.);
    }

    #[test]
    fn test_successful_lookups() {
        let here = Coord { x: -6.8, y: 34. };
        assert_eq!(location_slug(&Fixed, here), "sale");
        assert_eq!(search_places(&Fixed, "Rabat").len(), 1);
        assert!(search_places(&Fixed, "  ").is_empty());
        assert_eq!(elevation_or_zero(&Fixed, here), 52.);
    }

    #[test]
    fn test_stale_response_is_dropped() {
        let mut latest = LatestRequest::new();
        let first = latest.begin();
        let second = latest.begin();

        assert!(latest.complete(second, "Kenitra"));
        assert!(!latest.complete(first, "Rabat"));
        assert_eq!(latest.value(), Some(&"Kenitra"));

        let third = latest.begin();
        assert!(latest.complete(third, "Temara"));
        assert_eq!(latest.value(), Some(&"Temara"));
    }
}
