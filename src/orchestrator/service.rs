use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};

use super::state::*;
use crate::error::{log_error, AdvisoryError, ErrorKind};
use crate::forecast::{Forecast, ForecastProvider};
use crate::location::{LocationQuery, LocationResolver};
use crate::planting::PlantingWindowAdvisor;

/// Handle for one accepted query
#[derive(Debug)]
pub struct RequestTicket {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl RequestTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the request's work to finish, whether or not its result
    /// was published
    pub async fn finished(self) -> Result<(), JoinError> {
        match self.handle {
            Some(handle) => handle.await,
            None => Ok(()),
        }
    }
}

/// Runs location resolution, forecast retrieval and planting evaluation,
/// publishing one `RequestState` at a time.
///
/// Every accepted query bumps the generation. Results are only written if
/// their generation is still current, and the check happens under the same
/// lock as the write, so the last accepted query always wins.
pub struct WeatherOrchestrator {
    resolver: Arc<LocationResolver>,
    forecast: Arc<dyn ForecastProvider>,
    advisor: Arc<PlantingWindowAdvisor>,
    state: Arc<watch::Sender<StateSnapshot>>,
}

impl WeatherOrchestrator {
    pub fn new(
        resolver: LocationResolver,
        forecast: Arc<dyn ForecastProvider>,
        advisor: PlantingWindowAdvisor,
    ) -> Self {
        let (state, _) = watch::channel(StateSnapshot::default());

        Self {
            resolver: Arc::new(resolver),
            forecast,
            advisor: Arc::new(advisor),
            state: Arc::new(state),
        }
    }

    pub fn subscribe(&self) -> WeatherWatcher {
        WeatherWatcher::new(self.state.subscribe())
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.state.borrow().clone()
    }

    /// Start a new request, superseding any in flight.
    ///
    /// Must be called from within a tokio runtime.
    pub fn accept(&self, query: LocationQuery) -> RequestTicket {
        metrics::counter!("sowcast_queries_accepted_total").increment(1);

        if let Err(err) = query.validate() {
            let generation = self.advance(RequestState::failure(&err));
            log_error(&err);
            metrics::counter!("sowcast_failures_total", "code" => err.code()).increment(1);
            return RequestTicket {
                generation,
                handle: None,
            };
        }

        let generation = self.advance(RequestState::Loading);
        tracing::debug!(generation, query = ?query, "Accepted weather query");

        let task = RequestTask {
            generation,
            resolver: Arc::clone(&self.resolver),
            forecast: Arc::clone(&self.forecast),
            advisor: Arc::clone(&self.advisor),
            state: Arc::clone(&self.state),
        };

        RequestTicket {
            generation,
            handle: Some(tokio::spawn(task.run(query))),
        }
    }

    /// Open a new generation with the given state
    fn advance(&self, state: RequestState) -> u64 {
        let mut generation = 0;
        self.state.send_modify(|snapshot| {
            snapshot.generation += 1;
            snapshot.state = state;
            generation = snapshot.generation;
        });
        generation
    }
}

/// The unit of work spawned for one generation
struct RequestTask {
    generation: u64,
    resolver: Arc<LocationResolver>,
    forecast: Arc<dyn ForecastProvider>,
    advisor: Arc<PlantingWindowAdvisor>,
    state: Arc<watch::Sender<StateSnapshot>>,
}

impl RequestTask {
    async fn run(self, query: LocationQuery) {
        let outcome = self.execute(&query).await;
        self.commit(outcome);
    }

    async fn execute(&self, query: &LocationQuery) -> Result<WeatherReport, AdvisoryError> {
        let (location, forecast) = match query {
            // No coordinates without the forward lookup, so it must finish first
            LocationQuery::PlaceName(name) => {
                let location = self.resolver.resolve_place(name).await?;
                let forecast = self.fetch(location.latitude, location.longitude).await?;
                (location, forecast)
            }
            LocationQuery::Coordinates {
                latitude,
                longitude,
            } => {
                let (location, forecast) = tokio::join!(
                    self.resolver.resolve_coordinates(*latitude, *longitude),
                    self.fetch(*latitude, *longitude),
                );
                (location, forecast?)
            }
        };

        let planting_window = self.advisor.evaluate(&forecast.daily);
        Ok(WeatherReport::new(location, forecast, planting_window))
    }

    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<Forecast, AdvisoryError> {
        self.forecast
            .fetch(latitude, longitude)
            .await
            .map_err(|e| AdvisoryError::UpstreamFailure(e.to_string()))
    }

    fn commit(self, outcome: Result<WeatherReport, AdvisoryError>) {
        let generation = self.generation;
        let (next, failure) = match outcome {
            Ok(report) => (RequestState::Success(report), None),
            Err(err) => (RequestState::failure(&err), Some(err)),
        };

        let committed = self.state.send_if_modified(|snapshot| {
            if snapshot.generation != generation {
                return false;
            }
            snapshot.state = next;
            true
        });

        if !committed {
            tracing::debug!(
                generation,
                code = ErrorKind::StaleResult.code(),
                "Discarded result of superseded request"
            );
            metrics::counter!("sowcast_stale_results_total").increment(1);
            return;
        }

        match failure {
            Some(err) => {
                log_error(&err);
                metrics::counter!("sowcast_failures_total", "code" => err.code()).increment(1);
            }
            None => {
                tracing::info!(generation, "Weather report published");
                metrics::counter!("sowcast_reports_published_total").increment(1);
            }
        }
    }
}
