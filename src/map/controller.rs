use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Tz;
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;
use tokio::time::Instant;

use super::surface::{MapContainer, MapError, MapOptions, MapSurface, MarkerStyle};
use crate::api::public::map::{EventPin, MapSearchQuery};
use crate::core::config::DEFAULT_TIMEZONE;
use crate::geo::{DistanceFilter, Point};
use crate::time_window::{self, TimeCategory, TimeFilter};

/// Anything that can answer a viewport search, normally the HTTP client.
#[async_trait]
pub trait PinSource: Send + Sync + 'static {
    async fn search_pins(&self, query: &MapSearchQuery) -> anyhow::Result<Vec<EventPin>>;
}

#[derive(Debug, Clone)]
pub struct MapConfig {
    /// Quiet period after the last move-end before querying
    pub debounce: Duration,
    /// Server origin the client half talks to
    pub api_base_url: String,
    pub timezone: Tz,
    pub center: Point,
    pub zoom: f64,
    pub time_filter: TimeFilter,
    pub distance: Option<DistanceFilter>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            api_base_url: "http://127.0.0.1:2222".to_string(),
            timezone: DEFAULT_TIMEZONE,
            // Charlotte
            center: Point {
                lat: 35.2271,
                lng: -80.8431,
            },
            zoom: 12.0,
            time_filter: TimeFilter::Today,
            distance: Some(DistanceFilter::default()),
        }
    }
}

impl MapConfig {
    fn options(&self) -> MapOptions {
        MapOptions {
            center: self.center,
            zoom: self.zoom,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewStatus {
    /// Nothing requested yet
    Idle,
    Loading,
    Ready,
    /// Last query failed, markers are from an earlier response
    Stale,
    /// Viewport bounds could not be turned into a query
    InvalidViewport,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSummary {
    pub pin_id: String,
    /// Sequence number of the request whose response created the marker
    pub seq: u64,
    pub category: TimeCategory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapSnapshot {
    pub markers: Vec<MarkerSummary>,
    pub issued_seq: u64,
    pub applied_seq: u64,
    pub status: ViewStatus,
    pub time_filter: TimeFilter,
    pub distance: Option<DistanceFilter>,
}

enum Command {
    Loaded,
    MoveEnded,
    SetTimeFilter(TimeFilter),
    SetDistanceFilter(Option<DistanceFilter>),
    Snapshot(oneshot::Sender<MapSnapshot>),
    Shutdown(oneshot::Sender<()>),
}

struct QueryOutcome {
    seq: u64,
    result: anyhow::Result<Vec<EventPin>>,
}

struct Marker<H> {
    pin_id: String,
    seq: u64,
    category: TimeCategory,
    handle: H,
}

/// Handle the host UI uses to drive the controller. Dropping every clone
/// tears the map down.
#[derive(Clone)]
pub struct MapHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl MapHandle {
    fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            tracing::debug!("Map controller already stopped");
        }
    }

    /// Forward the map's `load` event.
    pub fn loaded(&self) {
        self.send(Command::Loaded);
    }

    /// Forward the map's `moveend` event. Debounced.
    pub fn move_ended(&self) {
        self.send(Command::MoveEnded);
    }

    /// Queries right away, a filter change is deliberate.
    pub fn set_time_filter(&self, filter: TimeFilter) {
        self.send(Command::SetTimeFilter(filter));
    }

    /// Queries right away. `None` searches the whole viewport.
    pub fn set_distance_filter(&self, distance: Option<DistanceFilter>) {
        self.send(Command::SetDistanceFilter(distance));
    }

    pub async fn snapshot(&self) -> Option<MapSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot(reply));
        rx.await.ok()
    }

    /// Clear markers, release the map, and wait for the controller to stop.
    pub async fn shutdown(self) {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Shutdown(reply));
        let _ = rx.await;
    }
}

/// Mount the map in `container` and start its controller task. Must be
/// called from within a tokio runtime.
pub fn initialize<C, P>(container: C, source: P, config: MapConfig) -> Result<MapHandle, MapError>
where
    C: MapContainer,
    P: PinSource,
{
    let surface = container.mount(&config.options()).map_err(|err| {
        tracing::error!("Failed to create map: {}", err);
        err
    })?;

    let (tx, commands) = mpsc::unbounded_channel();
    let (results_tx, results) = mpsc::unbounded_channel();
    let controller = Controller::new(surface, Arc::new(source), config, results_tx);
    tokio::spawn(controller.run(commands, results));

    Ok(MapHandle { tx })
}

struct Controller<S: MapSurface, P> {
    surface: S,
    source: Arc<P>,
    config: MapConfig,
    time_filter: TimeFilter,
    distance: Option<DistanceFilter>,
    markers: Vec<Marker<S::Marker>>,
    issued_seq: u64,
    applied_seq: u64,
    in_flight: Option<AbortHandle>,
    status: ViewStatus,
    results_tx: mpsc::UnboundedSender<QueryOutcome>,
}

impl<S: MapSurface, P: PinSource> Controller<S, P> {
    fn new(
        surface: S,
        source: Arc<P>,
        config: MapConfig,
        results_tx: mpsc::UnboundedSender<QueryOutcome>,
    ) -> Self {
        Self {
            surface,
            source,
            time_filter: config.time_filter,
            distance: config.distance,
            config,
            markers: Vec::new(),
            issued_seq: 0,
            applied_seq: 0,
            in_flight: None,
            status: ViewStatus::Idle,
            results_tx,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut results: mpsc::UnboundedReceiver<QueryOutcome>,
    ) {
        let debounce = tokio::time::sleep(Duration::ZERO);
        tokio::pin!(debounce);
        let mut armed = false;
        let mut shutdown_ack = None;

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    match command {
                        Command::Loaded => self.issue(),
                        Command::MoveEnded => {
                            debounce.as_mut().reset(Instant::now() + self.config.debounce);
                            armed = true;
                        }
                        Command::SetTimeFilter(filter) => {
                            self.time_filter = filter;
                            armed = false;
                            self.issue();
                        }
                        Command::SetDistanceFilter(distance) => {
                            self.distance = distance;
                            armed = false;
                            self.issue();
                        }
                        Command::Snapshot(reply) => {
                            let _ = reply.send(self.snapshot());
                        }
                        Command::Shutdown(reply) => {
                            shutdown_ack = Some(reply);
                            break;
                        }
                    }
                }
                () = &mut debounce, if armed => {
                    armed = false;
                    self.issue();
                }
                Some(outcome) = results.recv() => self.apply(outcome),
            }
        }

        self.teardown();
        if let Some(ack) = shutdown_ack {
            let _ = ack.send(());
        }
    }

    /// Start a query for the current viewport and filters. Supersedes
    /// whatever is in flight.
    fn issue(&mut self) {
        let Some(raw) = self.surface.bounds() else {
            tracing::debug!("Map has no bounds yet, skipping search");
            return;
        };

        self.issued_seq += 1;
        let seq = self.issued_seq;
        if let Some(previous) = self.in_flight.take() {
            previous.abort();
        }

        let bounds = match raw.normalize() {
            Ok(bounds) => bounds,
            Err(err) => {
                tracing::warn!("Not searching invalid viewport {:?}: {}", raw, err);
                self.clear_markers();
                self.status = ViewStatus::InvalidViewport;
                return;
            }
        };

        let query = MapSearchQuery::for_viewport(
            bounds,
            self.time_filter,
            self.distance,
            self.config.timezone,
        );
        tracing::debug!("Issuing map search #{}: {:?}", seq, query);

        let source = Arc::clone(&self.source);
        let results_tx = self.results_tx.clone();
        let task = tokio::spawn(async move {
            let result = source.search_pins(&query).await;
            let _ = results_tx.send(QueryOutcome { seq, result });
        });
        self.in_flight = Some(task.abort_handle());
        self.status = ViewStatus::Loading;
    }

    fn apply(&mut self, outcome: QueryOutcome) {
        let QueryOutcome { seq, result } = outcome;
        if seq != self.issued_seq {
            tracing::debug!(
                "Discarding map search #{}, #{} is newer",
                seq,
                self.issued_seq
            );
            return;
        }
        self.in_flight = None;

        let pins = match result {
            Ok(pins) => pins,
            Err(err) => {
                tracing::warn!(
                    "Map search #{} failed, keeping {} markers: {:#}",
                    seq,
                    self.markers.len(),
                    err
                );
                self.status = ViewStatus::Stale;
                return;
            }
        };

        self.clear_markers();
        let now = Utc::now();
        for pin in pins {
            if !pin.is_valid() {
                tracing::warn!("Skipping pin {} with invalid coordinates", pin.id);
                continue;
            }
            let category = time_window::classify(pin.starts_at, now, self.config.timezone);
            let style = MarkerStyle::for_category(category);
            let handle = self.surface.add_marker(&pin, &style);
            self.markers.push(Marker {
                pin_id: pin.id,
                seq,
                category,
                handle,
            });
        }
        self.applied_seq = seq;
        self.status = ViewStatus::Ready;
        tracing::debug!("Rendered {} markers from search #{}", self.markers.len(), seq);
    }

    fn clear_markers(&mut self) {
        for marker in self.markers.drain(..) {
            self.surface.remove_marker(marker.handle);
        }
    }

    fn snapshot(&self) -> MapSnapshot {
        MapSnapshot {
            markers: self
                .markers
                .iter()
                .map(|m| MarkerSummary {
                    pin_id: m.pin_id.clone(),
                    seq: m.seq,
                    category: m.category,
                })
                .collect(),
            issued_seq: self.issued_seq,
            applied_seq: self.applied_seq,
            status: self.status,
            time_filter: self.time_filter,
            distance: self.distance,
        }
    }

    fn teardown(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
        self.clear_markers();
        self.surface.release();
        tracing::debug!("Map controller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::surface::RawBounds;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct SurfaceState {
        bounds: Option<RawBounds>,
        live: HashMap<u64, String>,
        next_id: u64,
        released: bool,
    }

    #[derive(Clone, Default)]
    struct FakeSurface(Arc<Mutex<SurfaceState>>);

    impl FakeSurface {
        fn set_bounds(&self, west: f64, south: f64, east: f64, north: f64) {
            self.0.lock().unwrap().bounds = Some(RawBounds {
                west,
                south,
                east,
                north,
            });
        }

        fn live_pins(&self) -> Vec<String> {
            let mut pins: Vec<String> = self.0.lock().unwrap().live.values().cloned().collect();
            pins.sort();
            pins
        }
    }

    impl MapSurface for FakeSurface {
        type Marker = u64;

        fn bounds(&self) -> Option<RawBounds> {
            self.0.lock().unwrap().bounds
        }

        fn add_marker(&mut self, pin: &EventPin, _style: &MarkerStyle) -> u64 {
            let mut state = self.0.lock().unwrap();
            state.next_id += 1;
            let id = state.next_id;
            state.live.insert(id, pin.id.clone());
            id
        }

        fn remove_marker(&mut self, marker: u64) {
            self.0.lock().unwrap().live.remove(&marker);
        }

        fn release(&mut self) {
            self.0.lock().unwrap().released = true;
        }
    }

    struct FakeContainer(Option<FakeSurface>);

    impl MapContainer for FakeContainer {
        type Surface = FakeSurface;

        fn mount(self, _options: &MapOptions) -> Result<FakeSurface, MapError> {
            self.0
                .ok_or_else(|| MapError::ContainerUnavailable("#map".to_string()))
        }
    }

    type Reply = (Duration, Result<Vec<&'static str>, &'static str>);

    /// Answers the n-th query with the n-th scripted reply after its delay.
    struct ScriptedSource {
        script: Vec<Reply>,
        queries: Arc<Mutex<Vec<MapSearchQuery>>>,
    }

    #[async_trait]
    impl PinSource for ScriptedSource {
        async fn search_pins(&self, query: &MapSearchQuery) -> anyhow::Result<Vec<EventPin>> {
            let n = {
                let mut queries = self.queries.lock().unwrap();
                queries.push(query.clone());
                queries.len() - 1
            };
            let (delay, reply) = self
                .script
                .get(n)
                .cloned()
                .unwrap_or((Duration::ZERO, Ok(vec![])));
            tokio::time::sleep(delay).await;
            match reply {
                Ok(ids) => Ok(ids.into_iter().map(pin).collect()),
                Err(msg) => Err(anyhow::anyhow!(msg)),
            }
        }
    }

    fn pin(id: &str) -> EventPin {
        EventPin {
            id: id.to_string(),
            title: format!("Event {}", id),
            description: None,
            starts_at: Utc::now() + chrono::Duration::days(30),
            ends_at: None,
            address: None,
            latitude: 35.2,
            longitude: -80.8,
            vendor_id: None,
            vendor_name: None,
            vendor_slug: None,
        }
    }

    fn start(script: Vec<Reply>) -> (MapHandle, FakeSurface, Arc<Mutex<Vec<MapSearchQuery>>>) {
        let surface = FakeSurface::default();
        surface.set_bounds(-81.0, 35.0, -80.5, 35.5);
        let queries = Arc::new(Mutex::new(vec![]));
        let source = ScriptedSource {
            script,
            queries: Arc::clone(&queries),
        };
        let handle = initialize(
            FakeContainer(Some(surface.clone())),
            source,
            MapConfig::default(),
        )
        .unwrap();
        (handle, surface, queries)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn it_queries_once_after_rapid_moves_with_the_last_bounds() {
        let (handle, surface, queries) = start(vec![(Duration::ZERO, Ok(vec!["a", "b"]))]);

        for i in 0..5 {
            let offset = i as f64 * 0.1;
            surface.set_bounds(-81.0 + offset, 35.0, -80.5 + offset, 35.5);
            handle.move_ended();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(queries.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(400)).await;

        let sent = queries.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        let offset = 4.0 * 0.1;
        assert_eq!(sent[0].min_lng, Some(-81.0 + offset));
        assert_eq!(sent[0].max_lng, Some(-80.5 + offset));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.status, ViewStatus::Ready);
        assert_eq!(snapshot.markers.len(), 2);
        assert_eq!(surface.live_pins(), vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn it_queries_immediately_on_filter_changes() {
        let (handle, _surface, queries) = start(vec![]);

        handle.set_time_filter(TimeFilter::Weekend);
        settle().await;
        handle.set_distance_filter(Some(DistanceFilter::miles(20.0).unwrap()));
        settle().await;

        let sent = queries.lock().unwrap().clone();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].when, Some(TimeFilter::Weekend));
        assert_eq!(sent[1].radius, Some(20.0));
        assert_eq!(sent[1].when, Some(TimeFilter::Weekend));
    }

    #[tokio::test(start_paused = true)]
    async fn it_renders_the_latest_request_when_responses_arrive_out_of_order() {
        let (handle, surface, queries) = start(vec![
            (Duration::from_millis(500), Ok(vec!["stale"])),
            (Duration::from_millis(10), Ok(vec!["fresh"])),
        ]);

        handle.set_time_filter(TimeFilter::Weekend);
        settle().await;
        handle.set_time_filter(TimeFilter::ThisMonth);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(queries.lock().unwrap().len(), 2);
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.issued_seq, 2);
        assert_eq!(snapshot.applied_seq, 2);
        assert_eq!(surface.live_pins(), vec!["fresh"]);
        assert!(snapshot.markers.iter().all(|m| m.seq == 2));
    }

    #[tokio::test]
    async fn it_discards_results_from_superseded_requests() {
        let surface = FakeSurface::default();
        surface.set_bounds(-81.0, 35.0, -80.5, 35.5);
        let (results_tx, _results) = mpsc::unbounded_channel();
        let source = ScriptedSource {
            script: vec![],
            queries: Arc::new(Mutex::new(vec![])),
        };
        let mut controller = Controller::new(
            surface.clone(),
            Arc::new(source),
            MapConfig::default(),
            results_tx,
        );

        controller.issue();
        controller.issue();
        controller.apply(QueryOutcome {
            seq: 2,
            result: Ok(vec![pin("new")]),
        });
        controller.apply(QueryOutcome {
            seq: 1,
            result: Ok(vec![pin("old")]),
        });

        assert_eq!(surface.live_pins(), vec!["new"]);
        assert_eq!(controller.snapshot().applied_seq, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn it_keeps_markers_when_a_query_fails() {
        let (handle, surface, _queries) = start(vec![
            (Duration::ZERO, Ok(vec!["a", "b"])),
            (Duration::ZERO, Err("backend down")),
        ]);

        handle.loaded();
        settle().await;
        handle.set_time_filter(TimeFilter::Weekend);
        settle().await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.status, ViewStatus::Stale);
        assert_eq!(snapshot.applied_seq, 1);
        assert_eq!(surface.live_pins(), vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn it_rejects_invalid_bounds_before_dispatch() {
        let (handle, surface, queries) = start(vec![(Duration::ZERO, Ok(vec!["a"]))]);
        handle.loaded();
        settle().await;
        assert_eq!(surface.live_pins(), vec!["a"]);

        surface.set_bounds(f64::NAN, 35.0, -80.5, 35.5);
        handle.move_ended();
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(queries.lock().unwrap().len(), 1);
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.status, ViewStatus::InvalidViewport);
        assert!(surface.live_pins().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn it_skips_pins_with_invalid_coordinates() {
        let (handle, surface, _queries) = start(vec![(Duration::ZERO, Ok(vec!["ok"]))]);
        handle.loaded();
        settle().await;
        assert_eq!(surface.live_pins(), vec!["ok"]);

        let (results_tx, _results) = mpsc::unbounded_channel();
        let mut controller = Controller::new(
            surface.clone(),
            Arc::new(ScriptedSource {
                script: vec![],
                queries: Arc::new(Mutex::new(vec![])),
            }),
            MapConfig::default(),
            results_tx,
        );
        controller.issued_seq = 1;
        let mut bad = pin("bad");
        bad.latitude = f64::NAN;
        controller.apply(QueryOutcome {
            seq: 1,
            result: Ok(vec![bad, pin("good")]),
        });
        assert_eq!(controller.snapshot().markers.len(), 1);
        assert_eq!(controller.snapshot().markers[0].pin_id, "good");
    }

    #[tokio::test(start_paused = true)]
    async fn it_releases_the_map_on_shutdown() {
        let (handle, surface, _queries) = start(vec![(Duration::ZERO, Ok(vec!["a"]))]);
        handle.loaded();
        settle().await;

        handle.shutdown().await;
        assert!(surface.live_pins().is_empty());
        assert!(surface.0.lock().unwrap().released);
    }

    #[tokio::test]
    async fn it_fails_when_the_container_is_unavailable() {
        let source = ScriptedSource {
            script: vec![],
            queries: Arc::new(Mutex::new(vec![])),
        };
        let result = initialize(FakeContainer(None), source, MapConfig::default());
        assert!(matches!(result, Err(MapError::ContainerUnavailable(_))));
    }
}
