//! Weather forecast features served through the mediator

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Days, Local, NaiveDate};
use futures::{stream, StreamExt};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use cqbus::{
    ItemStream, MediatorError, MediatorResult, Notification, NotificationHandler, Publisher,
    Request, RequestHandler, StreamRequest, StreamRequestHandler, SyncNotificationHandler, Unit,
};

const SUMMARIES: [&str; 10] = [
    "Freezing", "Bracing", "Chilly", "Cool", "Mild", "Warm", "Balmy", "Hot", "Sweltering", "Scorching",
];

/// One day's forecast
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherForecast {
    pub date: NaiveDate,
    pub temperature_c: i32,
    pub summary: String,
}

impl WeatherForecast {
    pub fn temperature_f(&self) -> i32 {
        32 + (self.temperature_c as f64 / 0.5556) as i32
    }
}

/// Known forecast summaries, shared by every handler
#[derive(Clone)]
pub struct WeatherService {
    summaries: Arc<RwLock<Vec<String>>>,
}

impl WeatherService {
    pub fn new() -> Self {
        Self {
            summaries: Arc::new(RwLock::new(SUMMARIES.iter().map(|s| s.to_string()).collect())),
        }
    }

    pub async fn forecasts(&self) -> Vec<WeatherForecast> {
        let summaries = self.summaries.read().await;
        summaries
            .iter()
            .enumerate()
            .map(|(day, summary)| forecast(day, summary))
            .collect()
    }

    /// Forecasts whose summary contains `name`, dated from today onwards
    pub async fn forecasts_containing(&self, name: &str) -> Vec<WeatherForecast> {
        let summaries = self.summaries.read().await;
        summaries
            .iter()
            .filter(|summary| summary.contains(name))
            .enumerate()
            .map(|(day, summary)| forecast(day, summary))
            .collect()
    }

    pub async fn add(&self, summary: impl Into<String>) {
        self.summaries.write().await.push(summary.into());
    }
}

impl Default for WeatherService {
    fn default() -> Self {
        Self::new()
    }
}

fn forecast(day: usize, summary: &str) -> WeatherForecast {
    let today = Local::now().date_naive();
    WeatherForecast {
        date: today.checked_add_days(Days::new(day as u64)).unwrap_or(today),
        // -20..55, stable for a given day and summary
        temperature_c: ((day * 37 + summary.len() * 11) % 75) as i32 - 20,
        summary: summary.to_string(),
    }
}

/// All forecasts
#[derive(Debug)]
pub struct GetWeatherQuery;

impl Request for GetWeatherQuery {
    type Response = Vec<WeatherForecast>;
}

#[derive(Clone)]
pub struct GetWeatherHandler {
    pub service: WeatherService,
}

#[async_trait]
impl RequestHandler<GetWeatherQuery> for GetWeatherHandler {
    async fn handle(
        &self,
        _request: &GetWeatherQuery,
        _token: CancellationToken,
    ) -> MediatorResult<Vec<WeatherForecast>> {
        Ok(self.service.forecasts().await)
    }
}

/// Forecasts whose summary contains a name
#[derive(Debug)]
pub struct GetWeatherByNameQuery {
    pub name: String,
}

impl Request for GetWeatherByNameQuery {
    type Response = Vec<WeatherForecast>;
}

#[derive(Clone)]
pub struct GetWeatherByNameHandler {
    pub service: WeatherService,
}

#[async_trait]
impl RequestHandler<GetWeatherByNameQuery> for GetWeatherByNameHandler {
    async fn handle(
        &self,
        request: &GetWeatherByNameQuery,
        _token: CancellationToken,
    ) -> MediatorResult<Vec<WeatherForecast>> {
        if request.name.trim().is_empty() {
            return Err(MediatorError::Validation("name must not be empty".to_string()));
        }
        Ok(self.service.forecasts_containing(&request.name).await)
    }
}

/// Add a forecast summary and announce it
#[derive(Debug)]
pub struct AddWeatherCommand {
    pub name: String,
}

impl Request for AddWeatherCommand {
    type Response = Unit;
}

/// Raised after a forecast summary was added
#[derive(Debug, Clone)]
pub struct AddWeatherEvent {
    pub new_weather: String,
}

impl Notification for AddWeatherEvent {}

/// Publisher handed to handlers once the mediator is built
pub type PublisherSlot = Arc<OnceCell<Arc<dyn Publisher>>>;

#[derive(Clone)]
pub struct AddWeatherHandler {
    pub service: WeatherService,
    pub publisher: PublisherSlot,
}

#[async_trait]
impl RequestHandler<AddWeatherCommand> for AddWeatherHandler {
    async fn handle(&self, request: &AddWeatherCommand, token: CancellationToken) -> MediatorResult<Unit> {
        let publisher = self
            .publisher
            .get()
            .ok_or_else(|| MediatorError::Config("publisher is not wired yet".to_string()))?;

        self.service.add(request.name.clone()).await;
        publisher
            .publish(
                AddWeatherEvent {
                    new_weather: format!("{}Event", request.name),
                },
                token,
            )
            .await?;

        Ok(Unit::VALUE)
    }
}

/// Logs every added forecast
#[derive(Clone)]
pub struct AddWeatherLogger;

impl SyncNotificationHandler<AddWeatherEvent> for AddWeatherLogger {
    fn handle_sync(&self, notification: &AddWeatherEvent) -> MediatorResult<()> {
        tracing::info!("Executed event {}", notification.new_weather);
        Ok(())
    }
}

/// Counts added forecasts
#[derive(Clone, Default)]
pub struct AddWeatherCounter {
    pub count: Arc<AtomicUsize>,
}

impl SyncNotificationHandler<AddWeatherEvent> for AddWeatherCounter {
    fn handle_sync(&self, _notification: &AddWeatherEvent) -> MediatorResult<()> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Keeps a journal of added forecasts
#[derive(Clone, Default)]
pub struct AddWeatherJournal {
    pub entries: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl NotificationHandler<AddWeatherEvent> for AddWeatherJournal {
    async fn handle(&self, notification: &AddWeatherEvent, _token: CancellationToken) -> MediatorResult<()> {
        self.entries.lock().await.push(notification.new_weather.clone());
        Ok(())
    }
}

/// Forecast updates for a name, one per delay
#[derive(Debug)]
pub struct UpdateWeatherStreamRequest {
    pub name: String,
}

impl StreamRequest for UpdateWeatherStreamRequest {
    type Item = WeatherForecast;
}

#[derive(Clone)]
pub struct UpdateWeatherHandler {
    pub service: WeatherService,
    pub delay: Duration,
}

impl StreamRequestHandler<UpdateWeatherStreamRequest> for UpdateWeatherHandler {
    fn handle(
        &self,
        request: Arc<UpdateWeatherStreamRequest>,
        token: CancellationToken,
    ) -> ItemStream<WeatherForecast> {
        let service = self.service.clone();
        let delay = self.delay;

        stream::once(async move { service.forecasts_containing(&request.name).await })
            .flat_map(stream::iter)
            .then(move |forecast| {
                let token = token.clone();
                async move {
                    tokio::select! {
                        _ = token.cancelled() => Err(MediatorError::Cancelled),
                        _ = tokio::time::sleep(delay) => Ok(forecast),
                    }
                }
            })
            .boxed()
    }
}
