//! Application state and its transitions
//!
//! All front-end state lives in one [`AppState`] value that only changes
//! through [`AppState::apply`]. Failures record a user-facing message and
//! leave previously loaded data in place.

use chrono::NaiveDate;

use crate::HydrocastError;
use crate::lookup::{GaugeReport, LookupReport};
use crate::models::{SavedLocation, UserId, WeatherReport};
use crate::trend::{Trend, TrendParams};

/// Something that happened and may change the state
#[derive(Debug)]
pub enum Event {
    SignedIn(UserId),
    SignedOut,
    LookupStarted { query: String },
    LookupCompleted(LookupReport),
    WeatherLoaded(WeatherReport),
    GaugeLoaded(Option<GaugeReport>),
    /// A fetch failed; the previous weather and gauge data stay visible
    LookupFailed(HydrocastError),
    SavedLocationsChanged(Vec<SavedLocation>),
    SavedLocationSelected(String),
    StoreFailed(HydrocastError),
    ErrorDismissed,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    pub user: Option<UserId>,
    pub query: Option<String>,
    pub loading: bool,
    pub weather: Option<WeatherReport>,
    pub gauge: Option<GaugeReport>,
    pub saved: Vec<SavedLocation>,
    pub selected: Option<String>,
    pub error: Option<String>,
    pub trend_params: TrendParams,
}

impl AppState {
    #[must_use]
    pub fn new(trend_params: TrendParams) -> Self {
        Self {
            trend_params,
            ..Self::default()
        }
    }

    pub fn apply(&mut self, event: Event) {
        match event {
            Event::SignedIn(user) => {
                if self.user.as_ref() != Some(&user) {
                    self.saved.clear();
                    self.selected = None;
                }
                self.user = Some(user);
                self.error = None;
            }
            Event::SignedOut => {
                self.user = None;
                self.saved.clear();
                self.selected = None;
            }
            Event::LookupStarted { query } => {
                self.query = Some(query);
                self.loading = true;
                self.error = None;
            }
            Event::LookupCompleted(report) => {
                self.weather = Some(report.weather);
                self.gauge = report.gauge;
                self.loading = false;
            }
            Event::WeatherLoaded(report) => {
                self.weather = Some(report);
                self.loading = false;
            }
            Event::GaugeLoaded(gauge) => {
                self.gauge = gauge;
                self.loading = false;
            }
            Event::LookupFailed(err) | Event::StoreFailed(err) => {
                self.error = Some(err.user_message());
                self.loading = false;
            }
            Event::SavedLocationsChanged(locations) => {
                if let Some(id) = &self.selected {
                    if !locations.iter().any(|l| &l.id == id) {
                        self.selected = None;
                    }
                }
                self.saved = locations;
            }
            Event::SavedLocationSelected(id) => {
                if self.saved.iter().any(|l| l.id == id) {
                    self.selected = Some(id);
                } else {
                    self.error = Some(format!("No saved location with id {id}"));
                }
            }
            Event::ErrorDismissed => self.error = None,
        }
    }

    #[must_use]
    pub fn selected_location(&self) -> Option<&SavedLocation> {
        let id = self.selected.as_ref()?;
        self.saved.iter().find(|l| &l.id == id)
    }

    /// Trend of the current gauge data; recomputed on every call
    #[must_use]
    pub fn trend(&self, today: NaiveDate) -> Option<Trend> {
        self.gauge.as_ref()?.trend(today, &self.trend_params)
    }
}
