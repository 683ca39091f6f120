//! Behavioural tests for [`IsochroneCache`].

use geo::{Coord, Polygon};
use reachscore_core::test_support::{ManualClock, MemoryIsochroneStore, StubRoutingEngine};
use reachscore_core::{
    DEFAULT_ISOCHRONE_TTL, IsochroneCache, IsochroneError, ReachabilityQuery, RoutingError,
    TravelMode, is_empty_polygon,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;

/// Outcomes of every request made in a scenario, in order.
type Responses = RefCell<Vec<Result<Polygon<f64>, IsochroneError>>>;

#[fixture]
fn routing() -> RefCell<StubRoutingEngine> {
    RefCell::new(StubRoutingEngine::with_points(Vec::new()))
}

#[fixture]
fn store() -> MemoryIsochroneStore {
    MemoryIsochroneStore::default()
}

#[fixture]
fn clock() -> ManualClock {
    ManualClock::default()
}

#[fixture]
fn responses() -> Responses {
    RefCell::new(Vec::new())
}

fn request(
    routing: &RefCell<StubRoutingEngine>,
    store: &MemoryIsochroneStore,
    clock: &ManualClock,
    responses: &Responses,
    seconds: u32,
) {
    let query = ReachabilityQuery::new(Coord { x: 7.6261, y: 51.9607 }, TravelMode::Walk, seconds)
        .expect("valid query");
    let engine = routing.borrow();
    let cache = IsochroneCache::new(store, &*engine).with_clock(clock);
    responses.borrow_mut().push(cache.get_or_compute(&query));
}

// --- Given steps ---

#[given("a routing engine returning a triangle of reachable points")]
fn triangle_engine(#[from(routing)] routing: &RefCell<StubRoutingEngine>) {
    *routing.borrow_mut() = StubRoutingEngine::with_points(vec![
        Coord { x: 7.62, y: 51.96 },
        Coord { x: 7.64, y: 51.96 },
        Coord { x: 7.63, y: 51.97 },
    ]);
}

#[given("a routing engine without data for the origin")]
fn engine_without_data(#[from(routing)] routing: &RefCell<StubRoutingEngine>) {
    *routing.borrow_mut() = StubRoutingEngine::with_error(RoutingError::DataUnavailable {
        message: "Could not find a matching segment for coordinate 0".to_owned(),
    });
}

#[given("a routing engine that times out")]
fn engine_timing_out(#[from(routing)] routing: &RefCell<StubRoutingEngine>) {
    *routing.borrow_mut() = StubRoutingEngine::with_error(RoutingError::Timeout {
        url: "http://osrm.test/table/v1/walking".to_owned(),
        timeout_secs: 30,
    });
}

// --- When steps ---

#[when("I request a 15 minute walk isochrone")]
fn request_fifteen_minutes(
    #[from(routing)] routing: &RefCell<StubRoutingEngine>,
    #[from(store)] store: &MemoryIsochroneStore,
    #[from(clock)] clock: &ManualClock,
    #[from(responses)] responses: &Responses,
) {
    request(routing, store, clock, responses, 900);
}

#[when("I request a 30 second walk isochrone")]
fn request_thirty_seconds(
    #[from(routing)] routing: &RefCell<StubRoutingEngine>,
    #[from(store)] store: &MemoryIsochroneStore,
    #[from(clock)] clock: &ManualClock,
    #[from(responses)] responses: &Responses,
) {
    request(routing, store, clock, responses, 30);
}

#[when("a day passes")]
fn a_day_passes(#[from(clock)] clock: &ManualClock) {
    clock.advance(DEFAULT_ISOCHRONE_TTL);
}

// --- Then steps ---

#[then("the routing engine was called once")]
fn called_once(#[from(routing)] routing: &RefCell<StubRoutingEngine>) {
    assert_eq!(routing.borrow().calls(), 1);
}

#[then("the routing engine was called twice")]
fn called_twice(#[from(routing)] routing: &RefCell<StubRoutingEngine>) {
    assert_eq!(routing.borrow().calls(), 2);
}

#[then("the routing engine was not called")]
fn not_called(#[from(routing)] routing: &RefCell<StubRoutingEngine>) {
    assert_eq!(routing.borrow().calls(), 0);
}

#[then("both responses are identical")]
fn responses_identical(#[from(responses)] responses: &Responses) {
    let borrowed = responses.borrow();
    let polygons: Vec<_> = borrowed
        .iter()
        .map(|response| response.as_ref().expect("expected Ok response"))
        .collect();
    assert_eq!(polygons.len(), 2);
    assert_eq!(polygons.first(), polygons.last());
}

#[then("the isochrone is empty")]
fn isochrone_empty(#[from(responses)] responses: &Responses) {
    let borrowed = responses.borrow();
    let polygon = borrowed
        .last()
        .expect("a request was made")
        .as_ref()
        .expect("expected Ok response");
    assert!(is_empty_polygon(polygon), "expected empty polygon, got {polygon:?}");
}

#[then("a routing error is returned")]
fn routing_error(#[from(responses)] responses: &Responses) {
    let borrowed = responses.borrow();
    let last = borrowed.last().expect("a request was made");
    assert!(
        matches!(last, Err(IsochroneError::Routing(RoutingError::Timeout { .. }))),
        "expected routing timeout, got {last:?}"
    );
}

#[then("the store holds one isochrone")]
fn store_holds_one(#[from(store)] store: &MemoryIsochroneStore) {
    assert_eq!(store.len(), 1);
}

#[then("the store holds no isochrones")]
fn store_holds_none(#[from(store)] store: &MemoryIsochroneStore) {
    assert!(store.is_empty());
}

// --- Scenario registrations ---

macro_rules! register_scenario {
    ($fn_name:ident, $title:literal) => {
        #[scenario(path = "tests/features/isochrone_cache.feature", name = $title)]
        fn $fn_name(
            routing: RefCell<StubRoutingEngine>,
            store: MemoryIsochroneStore,
            clock: ManualClock,
            responses: Responses,
        ) {
            let _ = (routing, store, clock, responses);
        }
    };
}

register_scenario!(
    cached_isochrone_served_without_routing,
    "a cached isochrone is served without routing"
);
register_scenario!(
    expired_isochrone_recomputed,
    "an expired isochrone is recomputed in place"
);
register_scenario!(
    sub_minute_budget_is_empty,
    "a sub-minute budget yields an empty isochrone"
);
register_scenario!(
    missing_data_is_empty,
    "missing routing data yields an empty isochrone"
);
register_scenario!(
    routing_timeouts_reported,
    "routing timeouts are reported"
);
