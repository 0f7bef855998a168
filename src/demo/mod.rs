//! Weather demo - a small feature set wired through the mediator

pub mod behaviors;
pub mod weather;

use std::sync::Arc;
use std::time::Duration;

use cqbus::{Mediator, MediatorBuilder, MediatorConfig, MediatorResult, Publisher};

use behaviors::{LoggingBehavior, StreamLoggingBehavior, StreamUnhandledErrorBehavior, UnhandledErrorBehavior};
use weather::*;

/// Handles to the demo's shared state
pub struct Demo {
    pub mediator: Mediator,
    pub service: WeatherService,
    pub added: AddWeatherCounter,
    pub journal: AddWeatherJournal,
}

/// Build a mediator serving every weather feature
pub fn build(config: MediatorConfig, stream_delay: Duration) -> MediatorResult<Demo> {
    let service = WeatherService::new();
    let publisher: PublisherSlot = Arc::default();
    let added = AddWeatherCounter::default();
    let journal = AddWeatherJournal::default();

    let mediator = MediatorBuilder::new(config)
        .open_behavior(LoggingBehavior)
        .open_behavior(UnhandledErrorBehavior)
        .open_stream_behavior(StreamLoggingBehavior)
        .open_stream_behavior(StreamUnhandledErrorBehavior)
        .request_handler::<GetWeatherQuery, _>(GetWeatherHandler {
            service: service.clone(),
        })
        .request_handler::<GetWeatherByNameQuery, _>(GetWeatherByNameHandler {
            service: service.clone(),
        })
        .request_handler::<AddWeatherCommand, _>(AddWeatherHandler {
            service: service.clone(),
            publisher: publisher.clone(),
        })
        .notification_handler::<AddWeatherEvent, _>(AddWeatherLogger)
        .notification_handler::<AddWeatherEvent, _>(added.clone())
        .notification_handler::<AddWeatherEvent, _>(journal.clone())
        .stream_handler::<UpdateWeatherStreamRequest, _>(UpdateWeatherHandler {
            service: service.clone(),
            delay: stream_delay,
        })
        .build()?;

    let capability: Arc<dyn Publisher> = Arc::new(mediator.clone());
    // fresh slot, never set before
    let _ = publisher.set(capability);

    Ok(Demo {
        mediator,
        service,
        added,
        journal,
    })
}
