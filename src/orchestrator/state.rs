use serde::Serialize;
use tokio::sync::watch;

use crate::error::{AdvisoryError, ErrorKind};
use crate::forecast::{DayForecast, Forecast};
use crate::location::ResolvedLocation;
use crate::planting::PlantingWindow;

/// The published result of one successful request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall_today: f64,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub forecast: Vec<DayForecast>,
    pub planting_window: PlantingWindow,
}

impl WeatherReport {
    pub fn new(
        location: ResolvedLocation,
        forecast: Forecast,
        planting_window: PlantingWindow,
    ) -> Self {
        Self {
            temperature: forecast.current.temperature,
            humidity: forecast.current.humidity,
            rainfall_today: forecast.current.precipitation_today,
            location: location.display_name,
            latitude: location.latitude,
            longitude: location.longitude,
            forecast: forecast.daily,
            planting_window,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RequestState {
    #[default]
    Idle,
    Loading,
    Success(WeatherReport),
    Failure { kind: ErrorKind, message: String },
}

impl RequestState {
    pub fn failure(err: &AdvisoryError) -> Self {
        Self::Failure {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn report(&self) -> Option<&WeatherReport> {
        match self {
            Self::Success(report) => Some(report),
            _ => None,
        }
    }
}

/// Request state tagged with the generation that produced it
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StateSnapshot {
    pub generation: u64,
    pub state: RequestState,
}

/// Flat `{data, loading, error}` shape consumed by the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherView {
    pub data: Option<WeatherReport>,
    pub loading: bool,
    pub error: Option<String>,
}

impl From<&RequestState> for WeatherView {
    fn from(state: &RequestState) -> Self {
        match state {
            RequestState::Idle => Self {
                data: None,
                loading: false,
                error: None,
            },
            RequestState::Loading => Self {
                data: None,
                loading: true,
                error: None,
            },
            RequestState::Success(report) => Self {
                data: Some(report.clone()),
                loading: false,
                error: None,
            },
            RequestState::Failure { message, .. } => Self {
                data: None,
                loading: false,
                error: Some(message.clone()),
            },
        }
    }
}

/// Read-only handle on the orchestrator's state
#[derive(Debug, Clone)]
pub struct WeatherWatcher {
    rx: watch::Receiver<StateSnapshot>,
}

impl WeatherWatcher {
    pub(crate) fn new(rx: watch::Receiver<StateSnapshot>) -> Self {
        Self { rx }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.rx.borrow().clone()
    }

    pub fn view(&self) -> WeatherView {
        WeatherView::from(&self.rx.borrow().state)
    }

    /// Wait for the next published change. Returns false once the
    /// orchestrator is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Wait until the current generation leaves `Loading`
    pub async fn settled(&mut self) -> StateSnapshot {
        let settled = self
            .rx
            .wait_for(|snapshot| !snapshot.state.is_loading())
            .await
            .map(|snapshot| snapshot.clone());

        match settled {
            Ok(snapshot) => snapshot,
            Err(_) => self.rx.borrow().clone(),
        }
    }
}
