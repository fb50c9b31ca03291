//! The application controller.
//!
//! One engine task owns the connection, the command pipeline, and the
//! ordered container of object controllers; everything else talks to it
//! over channels. All socket I/O, timers, frame dispatch, model mutation,
//! and event emission happen on this task, so no lock is ever taken: a
//! matched frame runs to completion — model write, state-change event,
//! group derivation — before the loop is yielded back to.
//!
//! Refresh walks the container in insertion order. Each child controller
//! contributes its queries; per-child progress is folded into the
//! aggregate as `(completed_children * 100 + child_percent) / children`,
//! and exactly one `DidRefresh` follows the final completion, after the
//! group-state derivation pass has run.

use std::collections::{BTreeSet, VecDeque};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use hlx_model::AmplifierModel;
use hlx_proto::{
    Error, FrameMatch, Identifier, Kind, Request, Response, ResponsePattern, VersionSet,
};

use crate::connection::{Connection, ConnectionState};
use crate::controller::equalizer_presets::EqualizerPresetsController;
use crate::controller::favorites::FavoritesController;
use crate::controller::front_panel::FrontPanelController;
use crate::controller::groups::{DerivedGroupState, GroupsController};
use crate::controller::infrared::InfraredController;
use crate::controller::network::NetworkController;
use crate::controller::sources::SourcesController;
use crate::controller::zones::ZonesController;
use crate::controller::ControllerKind;
use crate::event::{ClientEvent, ConnectionEvent, EventSink, StateChange};
use crate::exchange::{CommandManager, Exchange, Waiter};
use crate::handle::HlxClient;

/// Client construction options.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Address families resolution may use.
    pub versions: VersionSet,
    /// Default per-exchange deadline.
    pub exchange_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            versions: VersionSet::ANY,
            exchange_timeout: Duration::from_secs(5),
        }
    }
}

pub(crate) enum EngineCommand {
    Connect {
        url: String,
        deadline: Duration,
        reply: oneshot::Sender<Result<(), Error>>,
    },
    Disconnect {
        reply: oneshot::Sender<Result<(), Error>>,
    },
    Submit {
        request: Request,
        reply: oneshot::Sender<Result<Response, Error>>,
    },
    Refresh {
        timeout: Duration,
        reply: oneshot::Sender<Result<(), Error>>,
    },
    Snapshot {
        reply: oneshot::Sender<AmplifierModel>,
    },
    State {
        reply: oneshot::Sender<(ConnectionState, Option<hlx_proto::ControlUrl>)>,
    },
    Shutdown,
}

struct RefreshState {
    current: usize,
    remaining: VecDeque<Request>,
    total: usize,
    done: usize,
    completed_children: usize,
    timeout: Duration,
    reply: oneshot::Sender<Result<(), Error>>,
}

pub struct ApplicationController {
    cmd_rx: mpsc::Receiver<EngineCommand>,
    events: EventSink,
    connection: Connection,
    commands: CommandManager,
    container: Vec<(ControllerKind, bool)>,
    zones: ZonesController,
    sources: SourcesController,
    groups: GroupsController,
    favorites: FavoritesController,
    presets: EqualizerPresetsController,
    infrared: InfraredController,
    network: NetworkController,
    front_panel: FrontPanelController,
    refresh: Option<RefreshState>,
    deriving: bool,
}

impl ApplicationController {
    /// Build the engine, its command handle, and the event stream. Spawn
    /// [`ApplicationController::run`] to bring it to life.
    pub fn new(
        options: ClientOptions,
    ) -> (
        ApplicationController,
        HlxClient,
        mpsc::UnboundedReceiver<ClientEvent>,
    ) {
        let (events, event_rx) = EventSink::new();
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let engine = ApplicationController {
            cmd_rx,
            events: events.clone(),
            connection: Connection::new(options.versions, events),
            commands: CommandManager::new(options.exchange_timeout),
            container: ControllerKind::ORDER.iter().map(|k| (*k, false)).collect(),
            zones: ZonesController::new(),
            sources: SourcesController::new(),
            groups: GroupsController::new(),
            favorites: FavoritesController::new(),
            presets: EqualizerPresetsController::new(),
            infrared: InfraredController::new(),
            network: NetworkController::new(),
            front_panel: FrontPanelController::new(),
            refresh: None,
            deriving: false,
        };
        (engine, HlxClient::new(cmd_tx), event_rx)
    }

    /// Drive the engine until the handle is dropped or shut down.
    pub async fn run(mut self) {
        loop {
            let deadline = self.commands.deadline();
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        None => break,
                        Some(cmd) => {
                            if !self.handle_command(cmd).await {
                                break;
                            }
                        }
                    }
                }
                result = self.connection.read_chunk(), if self.connection.is_connected() => {
                    self.handle_read(result).await;
                }
                () = sleep_until(far_deadline(deadline)), if deadline.is_some() => {
                    self.handle_exchange_timeout().await;
                }
            }
        }
        let _ = self.connection.disconnect(None);
    }

    async fn handle_command(&mut self, command: EngineCommand) -> bool {
        match command {
            EngineCommand::Connect {
                url,
                deadline,
                reply,
            } => {
                let result = self.connection.connect(&url, deadline).await;
                let _ = reply.send(result);
            }
            EngineCommand::Disconnect { reply } => {
                self.fail_exchanges(Error::Closed);
                let result = self.connection.disconnect(None);
                let _ = reply.send(result);
            }
            EngineCommand::Submit { request, reply } => {
                if self.connection.is_connected() {
                    self.commands.enqueue(Exchange {
                        request,
                        waiter: Waiter::Caller(reply),
                        timeout: None,
                    });
                    self.pump().await;
                } else {
                    let _ = reply.send(Err(Error::NotInitialized));
                }
            }
            EngineCommand::Refresh { timeout, reply } => {
                self.start_refresh(timeout, reply).await;
            }
            EngineCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            EngineCommand::State { reply } => {
                let _ = reply.send((self.connection.state(), self.connection.url().cloned()));
            }
            EngineCommand::Shutdown => return false,
        }
        true
    }

    // ------------------------------------------------------------------
    // Inbound path
    // ------------------------------------------------------------------

    async fn handle_read(&mut self, result: Result<usize, Error>) {
        match result {
            Ok(0) => self.fail_connection(Error::Closed).await,
            Ok(_) => loop {
                match self.connection.extract() {
                    Ok(Some(matched)) => self.dispatch_response(matched).await,
                    Ok(None) => break,
                    Err(error) => {
                        self.fail_connection(error).await;
                        break;
                    }
                }
            },
            Err(error @ Error::ConnectionReset) => {
                // Reset is non-fatal to the program: pending exchanges
                // fail, the connection becomes reconnect-eligible, and
                // nothing else is torn down.
                warn!("connection reset by peer");
                self.fail_connection(error).await;
            }
            Err(error) => self.fail_connection(error).await,
        }
    }

    async fn dispatch_response(&mut self, matched: FrameMatch<ResponsePattern>) {
        let response = match Response::decode(&matched) {
            Ok(response) => response,
            Err(error) => {
                warn!(
                    frame = %String::from_utf8_lossy(&matched.frame),
                    %error,
                    "dropping undecodable frame"
                );
                return;
            }
        };
        let change = self.apply_response(&response);
        let completed = self.commands.try_complete(matched.pattern);
        if change.is_none() && completed.is_none() {
            debug!(frame = %response, "unroutable frame dropped");
        }
        if let Some(change) = change {
            self.handle_state_change(change);
        }
        if let Some(pending) = completed {
            debug!(serial = pending.serial, "exchange complete");
            self.complete_waiter(pending.waiter, Ok(response));
            self.pump().await;
        }
    }

    fn apply_response(&mut self, response: &Response) -> Option<StateChange> {
        match response {
            Response::ZoneName { .. }
            | Response::ZoneVolume { .. }
            | Response::ZoneMute { .. }
            | Response::ZoneSource { .. }
            | Response::ZoneBalance { .. }
            | Response::ZoneTone { .. }
            | Response::ZoneHighpass { .. }
            | Response::ZoneLowpass { .. } => self.zones.handle(response),
            Response::SourceName { .. } => self.sources.handle(response),
            Response::GroupName { .. }
            | Response::GroupZoneAdded { .. }
            | Response::GroupZoneRemoved { .. } => self.groups.handle(response),
            Response::FavoriteName { .. } => self.favorites.handle(response),
            Response::PresetName { .. } | Response::PresetBand { .. } => {
                self.presets.handle(response)
            }
            Response::InfraredDisabled { .. } => self.infrared.handle(response),
            Response::NetworkDhcp { .. } | Response::NetworkSddp { .. } => {
                self.network.handle(response)
            }
            Response::FrontPanelBrightness { .. } | Response::FrontPanelLocked { .. } => {
                self.front_panel.handle(response)
            }
            // Query completion markers carry no state.
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Outbound path
    // ------------------------------------------------------------------

    async fn pump(&mut self) {
        while !self.commands.has_pending() {
            let Some(exchange) = self.commands.take_next() else {
                break;
            };
            let frame = exchange.request.encode();
            match self.connection.send(&frame).await {
                Ok(()) => {
                    self.commands
                        .arm(&exchange.request, exchange.waiter, exchange.timeout);
                }
                Err(error) => {
                    self.complete_waiter(exchange.waiter, Err(error.clone()));
                    self.fail_connection(error).await;
                    break;
                }
            }
        }
    }

    async fn handle_exchange_timeout(&mut self) {
        if let Some(pending) = self.commands.take_timed_out(Instant::now()) {
            warn!(serial = pending.serial, "exchange timed out");
            self.complete_waiter(pending.waiter, Err(Error::Timeout));
            self.pump().await;
        }
    }

    fn complete_waiter(&mut self, waiter: Waiter, result: Result<Response, Error>) {
        match waiter {
            Waiter::Caller(tx) => {
                let _ = tx.send(result);
            }
            Waiter::Refresh => match result {
                Ok(_) => self.on_refresh_exchange_complete(),
                Err(error) => self.finish_refresh(Err(error)),
            },
        }
    }

    fn fail_exchanges(&mut self, error: Error) {
        for waiter in self.commands.fail_all() {
            if let Waiter::Caller(tx) = waiter {
                let _ = tx.send(Err(error.clone()));
            }
        }
        if self.refresh.is_some() {
            self.finish_refresh(Err(error));
        }
    }

    async fn fail_connection(&mut self, error: Error) {
        self.events.connection(ConnectionEvent::Error {
            error: error.clone(),
        });
        self.fail_exchanges(error.clone());
        let _ = self.connection.disconnect(Some(error));
    }

    // ------------------------------------------------------------------
    // Refresh orchestration
    // ------------------------------------------------------------------

    async fn start_refresh(
        &mut self,
        timeout: Duration,
        reply: oneshot::Sender<Result<(), Error>>,
    ) {
        if self.refresh.is_some() {
            let _ = reply.send(Err(Error::InProgress));
            return;
        }
        if !self.connection.is_connected() {
            let _ = reply.send(Err(Error::NotInitialized));
            return;
        }
        for slot in &mut self.container {
            slot.1 = false;
        }
        self.events.emit(ClientEvent::WillRefresh);
        self.events.emit(ClientEvent::IsRefreshing { percent: 0 });
        self.refresh = Some(RefreshState {
            current: 0,
            remaining: VecDeque::new(),
            total: 0,
            done: 0,
            completed_children: 0,
            timeout,
            reply,
        });
        self.load_current_child();
        self.pump().await;
    }

    fn refresh_queries_for(&self, kind: ControllerKind) -> Vec<Request> {
        match kind {
            ControllerKind::Zones => self.zones.refresh_queries(),
            ControllerKind::Sources => self.sources.refresh_queries(),
            ControllerKind::Groups => self.groups.refresh_queries(),
            ControllerKind::Favorites => self.favorites.refresh_queries(),
            ControllerKind::EqualizerPresets => self.presets.refresh_queries(),
            ControllerKind::Infrared => self.infrared.refresh_queries(),
            ControllerKind::Network => self.network.refresh_queries(),
            ControllerKind::FrontPanel => self.front_panel.refresh_queries(),
        }
    }

    /// Load the current child's queries, skipping over children that
    /// complete immediately, and enqueue the first query. Finishes the
    /// refresh when the container is exhausted.
    fn load_current_child(&mut self) {
        loop {
            let children = self.container.len();
            let Some(index) = self.refresh.as_ref().map(|r| r.current) else {
                return;
            };
            if index >= children {
                self.finish_refresh(Ok(()));
                return;
            }
            let kind = self.container[index].0;
            let queries = self.refresh_queries_for(kind);
            if queries.is_empty() {
                self.container[index].1 = true;
                let Some(refresh) = self.refresh.as_mut() else {
                    return;
                };
                refresh.completed_children += 1;
                refresh.current += 1;
                let percent = (refresh.completed_children * 100 / children) as u8;
                self.events.emit(ClientEvent::IsRefreshing { percent });
                continue;
            }
            let Some(refresh) = self.refresh.as_mut() else {
                return;
            };
            refresh.total = queries.len();
            refresh.done = 0;
            refresh.remaining = VecDeque::from(queries);
            let timeout = refresh.timeout;
            if let Some(request) = refresh.remaining.pop_front() {
                self.commands.enqueue(Exchange {
                    request,
                    waiter: Waiter::Refresh,
                    timeout: Some(timeout),
                });
            }
            return;
        }
    }

    fn on_refresh_exchange_complete(&mut self) {
        let children = self.container.len();
        let mut child_finished = false;
        let mut next: Option<(Request, Duration)> = None;
        let percent;
        {
            let Some(refresh) = self.refresh.as_mut() else {
                return;
            };
            refresh.done += 1;
            let child_percent = refresh.done * 100 / refresh.total.max(1);
            percent = ((refresh.completed_children * 100 + child_percent) / children) as u8;
            if refresh.done == refresh.total {
                self.container[refresh.current].1 = true;
                refresh.completed_children += 1;
                refresh.current += 1;
                child_finished = true;
            } else {
                next = refresh
                    .remaining
                    .pop_front()
                    .map(|request| (request, refresh.timeout));
            }
        }
        self.events.emit(ClientEvent::IsRefreshing { percent });
        if child_finished {
            self.load_current_child();
        } else if let Some((request, timeout)) = next {
            self.commands.enqueue(Exchange {
                request,
                waiter: Waiter::Refresh,
                timeout: Some(timeout),
            });
        }
    }

    /// Complete the refresh exactly once. A successful pass runs the
    /// group-state derivation before `DidRefresh` goes out.
    fn finish_refresh(&mut self, result: Result<(), Error>) {
        let Some(refresh) = self.refresh.take() else {
            return;
        };
        if result.is_ok() {
            self.derive_all_groups();
            self.events.emit(ClientEvent::DidRefresh);
        }
        let _ = refresh.reply.send(result);
    }

    // ------------------------------------------------------------------
    // Group-state derivation
    // ------------------------------------------------------------------

    fn handle_state_change(&mut self, change: StateChange) {
        enum Fanout {
            Zone(Identifier),
            Group(Identifier),
            None,
        }
        let fanout = if self.deriving {
            Fanout::None
        } else {
            match &change {
                StateChange::ZoneMute { zone, .. }
                | StateChange::ZoneVolume { zone, .. }
                | StateChange::ZoneSource { zone, .. } => Fanout::Zone(*zone),
                StateChange::GroupZoneAdded { group, .. }
                | StateChange::GroupZoneRemoved { group, .. } => Fanout::Group(*group),
                _ => Fanout::None,
            }
        };
        self.events.emit(ClientEvent::State(change));
        match fanout {
            Fanout::Zone(zone) => {
                let affected = self.groups.groups_containing(zone);
                self.deriving = true;
                for group in affected {
                    self.derive_group(group);
                }
                self.deriving = false;
            }
            Fanout::Group(group) => {
                self.deriving = true;
                self.derive_group(group);
                self.deriving = false;
            }
            Fanout::None => {}
        }
    }

    fn derive_all_groups(&mut self) {
        self.deriving = true;
        for group in Kind::Group.all() {
            self.derive_group(group);
        }
        self.deriving = false;
    }

    fn derive_group(&mut self, group: Identifier) {
        let state = self.compute_group_state(group);
        let changes = self.groups.store_derived(group, state);
        for change in changes {
            // The deriving flag is set by our caller, so these events do
            // not re-enter the derivation pass.
            self.handle_state_change(change);
        }
    }

    /// Pure function of the member zones: AND of mutes, rounded mean of
    /// volumes, union of sources. Order-independent and idempotent.
    fn compute_group_state(&self, group: Identifier) -> Option<DerivedGroupState> {
        let model = self.groups.group(group)?;
        if model.is_empty() {
            return None;
        }
        let mut muted = true;
        let mut sum: i32 = 0;
        let mut count: i32 = 0;
        let mut sources = BTreeSet::new();
        for zone_id in model.zones() {
            let Some(zone) = self.zones.zone(zone_id) else {
                continue;
            };
            muted &= zone.muted();
            sum += i32::from(zone.volume());
            count += 1;
            if zone.source().is_valid() {
                sources.insert(zone.source());
            }
        }
        if count == 0 {
            return None;
        }
        let volume = (f64::from(sum) / f64::from(count)).round() as i8;
        Some(DerivedGroupState {
            muted,
            volume,
            sources,
        })
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    fn snapshot(&self) -> AmplifierModel {
        AmplifierModel {
            zones: self.zones.models().to_vec(),
            sources: self.sources.models().to_vec(),
            groups: self.groups.models().to_vec(),
            favorites: self.favorites.models().to_vec(),
            presets: self.presets.models().to_vec(),
            infrared: *self.infrared.model(),
            network: *self.network.model(),
            front_panel: *self.front_panel.model(),
        }
    }
}

fn far_deadline(deadline: Option<Instant>) -> Instant {
    deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> ApplicationController {
        ApplicationController::new(ClientOptions::default()).0
    }

    fn zone(n: u32) -> Identifier {
        Kind::Zone.checked(n).unwrap()
    }

    fn feed(app: &mut ApplicationController, frame: &str) {
        let matched = hlx_proto::response_matcher()
            .match_frame(frame.as_bytes())
            .unwrap_or_else(|| panic!("no pattern for {frame}"));
        let response = Response::decode(&matched).unwrap();
        if let Some(change) = app.apply_response(&response) {
            app.handle_state_change(change);
        }
    }

    #[test]
    fn group_derivation_matches_the_specified_aggregates() {
        let mut app = controller();
        feed(&mut app, "(GA2O3)");
        feed(&mut app, "(GA2O5)");
        feed(&mut app, "(GA2O7)");
        feed(&mut app, "(VO3-10)");
        feed(&mut app, "(VO5-20)");
        feed(&mut app, "(VO7-30)");
        feed(&mut app, "(VMO7)");
        feed(&mut app, "(CO31)");
        feed(&mut app, "(CO52)");
        feed(&mut app, "(CO72)");

        let g2 = Kind::Group.checked(2).unwrap();
        let derived = app.groups.derived(g2).unwrap();
        assert_eq!(derived.volume, -20);
        assert!(!derived.muted, "mute is the AND of members");
        let sources: Vec<u8> = derived.sources.iter().map(|s| s.get()).collect();
        assert_eq!(sources, vec![1, 2]);
    }

    #[test]
    fn group_derivation_is_order_independent() {
        let frames = [
            "(GA2O3)", "(GA2O5)", "(GA2O7)", "(VO3-10)", "(VO5-20)", "(VO7-30)", "(VMO7)",
        ];
        // A handful of distinct arrival orders, including reversed.
        let mut orders: Vec<Vec<usize>> = vec![
            (0..frames.len()).collect(),
            (0..frames.len()).rev().collect(),
            vec![3, 0, 6, 1, 4, 2, 5],
            vec![6, 5, 4, 0, 1, 2, 3],
        ];
        let mut results = Vec::new();
        for order in orders.drain(..) {
            let mut app = controller();
            for index in order {
                feed(&mut app, frames[index]);
            }
            let g2 = Kind::Group.checked(2).unwrap();
            results.push(app.groups.derived(g2).cloned());
        }
        for window in results.windows(2) {
            assert_eq!(window[0], window[1]);
        }
        let finally = results[0].as_ref().unwrap();
        assert_eq!(finally.volume, -20);
        assert!(!finally.muted);
    }

    #[test]
    fn zone_change_rederives_only_containing_groups() {
        let mut app = controller();
        feed(&mut app, "(GA1O3)");
        feed(&mut app, "(GA2O4)");
        feed(&mut app, "(VO3-10)");
        let g1 = Kind::Group.checked(1).unwrap();
        let g2 = Kind::Group.checked(2).unwrap();
        assert_eq!(app.groups.derived(g1).unwrap().volume, -10);
        // Group 2's member never changed volume; its derived level is the
        // default member volume.
        assert_eq!(app.groups.derived(g2).unwrap().volume, -80);
    }

    #[test]
    fn already_set_values_produce_no_change() {
        let mut app = controller();
        let z3 = zone(3);
        feed(&mut app, "(VO3-20)");
        assert_eq!(app.zones.zone(z3).unwrap().volume(), -20);
        // Same value again: the handler must swallow it.
        let matched = hlx_proto::response_matcher()
            .match_frame(b"(VO3-20)")
            .unwrap();
        let response = Response::decode(&matched).unwrap();
        assert!(app.apply_response(&response).is_none());
    }

    #[test]
    fn aggregate_progress_formula_matches_expected_sequence() {
        // Children of sizes 1/1/8/1: the aggregate runs 25, 50, then eight
        // steps across the third child, then 100.
        let children = 4usize;
        let mut seen = vec![0u8];
        let sizes = [1usize, 1, 8, 1];
        let mut completed = 0usize;
        for size in sizes {
            for done in 1..=size {
                let child_percent = done * 100 / size;
                seen.push(((completed * 100 + child_percent) / children) as u8);
            }
            completed += 1;
        }
        assert_eq!(
            seen,
            vec![0, 25, 50, 53, 56, 59, 62, 65, 68, 71, 75, 100]
        );
        let mut sorted = seen.clone();
        sorted.sort_unstable();
        assert_eq!(seen, sorted, "progress is monotonically non-decreasing");
        assert_eq!(*seen.last().unwrap(), 100);
    }
}
