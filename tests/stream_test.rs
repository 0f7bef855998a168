//! Stream request integration tests
//! Run with: cargo test --test stream_test

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use futures::stream::{self, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;

use cqbus::{
    BoxedStreamRequest, HandlerKind, ItemStream, MediatorBuilder, MediatorError, StreamNext,
    StreamPipelineBehavior, StreamRequest, StreamRequestHandler,
};

static INIT: Once = Once::new();

fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

#[derive(Debug)]
struct Range(u64);

impl StreamRequest for Range {
    type Item = u64;
}

/// Sets its flag when dropped
struct Guard(Arc<AtomicBool>);

impl Drop for Guard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
struct RangeHandler {
    pulled: Arc<AtomicUsize>,
    released: Arc<AtomicBool>,
}

impl StreamRequestHandler<Range> for RangeHandler {
    fn handle(&self, request: Arc<Range>, _token: CancellationToken) -> ItemStream<u64> {
        let pulled = self.pulled.clone();
        let guard = Guard(self.released.clone());
        stream::iter(0..request.0)
            .map(move |n| {
                let _held = &guard;
                pulled.fetch_add(1, Ordering::SeqCst);
                Ok(n)
            })
            .boxed()
    }
}

#[derive(Clone)]
struct AddOne;

impl StreamPipelineBehavior<Range> for AddOne {
    fn handle(&self, _request: Arc<Range>, next: StreamNext<Range>, token: CancellationToken) -> ItemStream<u64> {
        next.run(token).map_ok(|n| n + 1).boxed()
    }
}

#[derive(Clone)]
struct TimesTen;

impl StreamPipelineBehavior<Range> for TimesTen {
    fn handle(&self, _request: Arc<Range>, next: StreamNext<Range>, token: CancellationToken) -> ItemStream<u64> {
        next.run(token).map_ok(|n| n * 10).boxed()
    }
}

#[derive(Clone)]
struct OddOnly;

impl StreamPipelineBehavior<Range> for OddOnly {
    fn handle(&self, _request: Arc<Range>, next: StreamNext<Range>, token: CancellationToken) -> ItemStream<u64> {
        next.run(token)
            .try_filter(|n| futures::future::ready(n % 2 == 1))
            .boxed()
    }
}

#[derive(Clone)]
struct Canned;

impl StreamPipelineBehavior<Range> for Canned {
    fn handle(&self, _request: Arc<Range>, _next: StreamNext<Range>, _token: CancellationToken) -> ItemStream<u64> {
        stream::iter([7, 7]).map(Ok).boxed()
    }
}

async fn collect(stream: ItemStream<u64>) -> Vec<u64> {
    stream.try_collect().await.unwrap()
}

#[tokio::test]
async fn test_range_streams_in_order() {
    ensure_init();
    let mediator = MediatorBuilder::default()
        .stream_handler::<Range, _>(RangeHandler::default())
        .build()
        .unwrap();

    let items = collect(mediator.create_stream(Range(3), CancellationToken::new()).unwrap()).await;

    assert_eq!(items, vec![0, 1, 2]);
}

#[tokio::test]
async fn test_outer_behavior_transforms_inner_output() {
    ensure_init();
    let add_then_mul = MediatorBuilder::default()
        .stream_handler::<Range, _>(RangeHandler::default())
        .stream_behavior::<Range, _>(AddOne)
        .stream_behavior::<Range, _>(TimesTen)
        .build()
        .unwrap();
    let mul_then_add = MediatorBuilder::default()
        .stream_handler::<Range, _>(RangeHandler::default())
        .stream_behavior::<Range, _>(TimesTen)
        .stream_behavior::<Range, _>(AddOne)
        .build()
        .unwrap();

    let first = collect(add_then_mul.create_stream(Range(3), CancellationToken::new()).unwrap()).await;
    let second = collect(mul_then_add.create_stream(Range(3), CancellationToken::new()).unwrap()).await;

    assert_eq!(first, vec![1, 11, 21]);
    assert_eq!(second, vec![10, 20, 30]);
}

#[tokio::test]
async fn test_behaviors_filter_and_short_circuit() {
    ensure_init();
    let handler = RangeHandler::default();
    let filtered = MediatorBuilder::default()
        .stream_handler::<Range, _>(RangeHandler::default())
        .stream_behavior::<Range, _>(OddOnly)
        .build()
        .unwrap();
    let canned = MediatorBuilder::default()
        .stream_handler::<Range, _>(handler.clone())
        .stream_behavior::<Range, _>(Canned)
        .build()
        .unwrap();

    let odd = collect(filtered.create_stream(Range(6), CancellationToken::new()).unwrap()).await;
    let sevens = collect(canned.create_stream(Range(6), CancellationToken::new()).unwrap()).await;

    assert_eq!(odd, vec![1, 3, 5]);
    assert_eq!(sevens, vec![7, 7]);
    assert_eq!(handler.pulled.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancellation_after_nth_item() {
    ensure_init();
    let mediator = MediatorBuilder::default()
        .stream_handler::<Range, _>(RangeHandler::default())
        .stream_behavior::<Range, _>(AddOne)
        .build()
        .unwrap();
    let token = CancellationToken::new();
    let mut items = mediator.create_stream(Range(100), token.clone()).unwrap();

    for expected in 1..=3 {
        assert_eq!(items.next().await.unwrap().unwrap(), expected);
    }
    token.cancel();

    assert!(matches!(items.next().await, Some(Err(MediatorError::Cancelled))));
    assert!(items.next().await.is_none());
}

#[tokio::test]
async fn test_pull_on_cancelled_token_produces_nothing() {
    ensure_init();
    let handler = RangeHandler::default();
    let mediator = MediatorBuilder::default()
        .stream_handler::<Range, _>(handler.clone())
        .build()
        .unwrap();
    let token = CancellationToken::new();
    token.cancel();

    let mut items = mediator.create_stream(Range(3), token).unwrap();

    assert!(items.next().await.unwrap().unwrap_err().is_cancelled());
    assert_eq!(handler.pulled.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_dropping_stream_early_releases_handler() {
    ensure_init();
    let handler = RangeHandler::default();
    let mediator = MediatorBuilder::default()
        .stream_handler::<Range, _>(handler.clone())
        .stream_behavior::<Range, _>(AddOne)
        .build()
        .unwrap();

    let mut items = mediator.create_stream(Range(1_000), CancellationToken::new()).unwrap();
    items.next().await.unwrap().unwrap();
    items.next().await.unwrap().unwrap();
    assert!(!handler.released.load(Ordering::SeqCst));

    drop(items);

    assert!(handler.released.load(Ordering::SeqCst));
    assert_eq!(handler.pulled.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_stream_lookup_errors() {
    ensure_init();
    let mediator = MediatorBuilder::default()
        .stream_handler::<Range, _>(RangeHandler::default())
        .build()
        .unwrap();

    let absent = mediator
        .create_stream_dyn::<u64>(None, CancellationToken::new())
        .err()
        .unwrap();
    assert!(matches!(absent, MediatorError::Validation(_)));

    let mistyped: BoxedStreamRequest<String> = Box::new(MistypedRange);
    let missing = mediator
        .create_stream_dyn(Some(mistyped), CancellationToken::new())
        .err()
        .unwrap();
    assert!(matches!(missing, MediatorError::NotFound { kind: HandlerKind::Stream, .. }));
}

#[derive(Debug)]
struct MistypedRange;

impl StreamRequest for MistypedRange {
    type Item = String;
}
