//! Per-client hooks: membership reconciliation and the debounced tile check.

use crate::client::{Client, ClientSignal};
use crate::controller::Controller;
use crate::desktop::Desktop;
use crate::error::ControllerError;
use crate::host::{Host, TimerId, TimerTask};
use tracing::{debug, trace};

impl Controller {
    /// Subscribe to a client's change signals and snapshot its membership.
    ///
    /// Runs at most once per client; later calls return immediately.
    pub fn attach_client_hooks(&mut self, host: &mut Host<'_>, client: &mut Client) {
        if client.hooks_registered {
            return;
        }
        client.hooks_registered = true;
        client.previous_desktops = Some(Desktop::from_client(client));

        for signal in ClientSignal::ALL {
            host.events.subscribe(client.id, signal);
        }
        trace!("Hooked client {}", client.id);
    }

    /// Route a signal emitted by a hooked client.
    pub fn handle_signal(
        &mut self,
        host: &mut Host<'_>,
        client: &mut Client,
        signal: ClientSignal,
    ) -> Result<(), ControllerError> {
        match signal {
            ClientSignal::TileChanged => {
                self.on_tile_changed(host, client);
                Ok(())
            }
            _ => self.on_membership_changed(host, client),
        }
    }

    /// Desktop, activities or screen of a client changed.
    ///
    /// Drivers of domains the client left release it before drivers of
    /// domains it entered admit it. Every screen is rebuilt afterwards.
    pub fn on_membership_changed(
        &mut self,
        host: &mut Host<'_>,
        client: &mut Client,
    ) -> Result<(), ControllerError> {
        let Some(previous) = client.previous_desktops.clone() else {
            return Ok(());
        };
        if !client.is_tiled {
            return Ok(());
        }

        let current = Desktop::from_client(client);
        let removed: Vec<Desktop> = previous
            .iter()
            .filter(|d| !current.contains(d))
            .cloned()
            .collect();
        let added: Vec<Desktop> = current
            .iter()
            .filter(|d| !previous.contains(d))
            .cloned()
            .collect();
        debug!(
            "Client {} membership changed: -{} +{} desktop(s)",
            client.id,
            removed.len(),
            added.len()
        );

        self.manager.remove_client(client, Some(&removed))?;
        self.manager.add_client(client, Some(&added))?;
        client.previous_desktops = Some(current);

        self.manager.rebuild_layout(&mut *host.workspace, None)
    }

    /// A client's tile reference changed. Evaluation is deferred until the
    /// compositor has settled; a newer change replaces a pending check.
    pub fn on_tile_changed(&mut self, host: &mut Host<'_>, client: &Client) {
        if self.manager.is_building_layout() {
            trace!("Ignoring tile change of client {} during rebuild", client.id);
            return;
        }

        if let Some(previous) = self.pending_tile_checks.remove(&client.id) {
            host.scheduler.cancel(previous);
        }
        let timer = host
            .scheduler
            .schedule(self.tile_check_delay, TimerTask::TileCheck(client.id));
        self.pending_tile_checks.insert(client.id, timer);
    }

    /// A tile check timer fired for `client`.
    ///
    /// Timers that were replaced or cancelled are ignored.
    pub fn on_tile_check_due(
        &mut self,
        host: &mut Host<'_>,
        timer: TimerId,
        client: &mut Client,
    ) -> Result<(), ControllerError> {
        if self.pending_tile_checks.get(&client.id) != Some(&timer) {
            trace!("Stale tile check {:?} for client {}", timer, client.id);
            return Ok(());
        }
        self.pending_tile_checks.remove(&client.id);

        if !client.is_tiled && client.in_managed_tile() {
            self.attach_client_hooks(host, client);
            let Some(tile) = client.tile else {
                return Ok(());
            };
            debug!("Client {} entered tile {:?}", client.id, tile.id);
            self.manager
                .put_client_in_tile(&*host.workspace, client, &tile, None)?;
            self.manager
                .rebuild_layout(&mut *host.workspace, Some(client.screen))
        } else if client.is_tiled && client.tile.is_none() {
            debug!("Client {} left its tile", client.id);
            self.manager.remove_client(client, None)?;
            self.manager
                .rebuild_layout(&mut *host.workspace, Some(client.screen))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::controller::ControllerConfig;
    use crate::testing::{
        managed_tile, DriverCall, FakeWorkspace, ManualScheduler, RecordingEvents,
        RecordingFactory, ACTIVITY,
    };
    use crate::tile::{TileId, TileRef};

    /// A controller wired to fake host collaborators.
    pub struct Harness {
        pub controller: Controller,
        pub factory: RecordingFactory,
        pub workspace: FakeWorkspace,
        pub events: RecordingEvents,
        pub scheduler: ManualScheduler,
    }

    impl Harness {
        pub fn new(screens: usize) -> Self {
            let factory = RecordingFactory::new();
            Self {
                controller: Controller::new(ControllerConfig::default(), Box::new(factory.clone())),
                factory,
                workspace: FakeWorkspace::new(screens),
                events: RecordingEvents::default(),
                scheduler: ManualScheduler::default(),
            }
        }

        fn split(&mut self) -> (&mut Controller, Host<'_>) {
            (
                &mut self.controller,
                Host {
                    workspace: &mut self.workspace,
                    events: &mut self.events,
                    scheduler: &mut self.scheduler,
                },
            )
        }

        pub fn attach(&mut self, client: &mut Client) {
            let (controller, mut host) = self.split();
            controller.attach_client_hooks(&mut host, client);
        }

        pub fn client_added(&mut self, client: &mut Client, tile: bool) -> Result<(), ControllerError> {
            let (controller, mut host) = self.split();
            controller.on_client_added(&mut host, client, tile)
        }

        pub fn client_removed(&mut self, client: &mut Client) -> Result<(), ControllerError> {
            let (controller, mut host) = self.split();
            controller.on_client_removed(&mut host, client)
        }

        pub fn current_changed(&mut self) -> Result<(), ControllerError> {
            let (controller, mut host) = self.split();
            controller.on_current_changed(&mut host)
        }

        pub fn signal(&mut self, client: &mut Client, signal: ClientSignal) -> Result<(), ControllerError> {
            let (controller, mut host) = self.split();
            controller.handle_signal(&mut host, client, signal)
        }

        pub fn tile_changed(&mut self, client: &Client) {
            let (controller, mut host) = self.split();
            controller.on_tile_changed(&mut host, client);
        }

        /// Fire the oldest pending timer against `client`.
        pub fn fire_next(&mut self, client: &mut Client) -> Result<(), ControllerError> {
            let (timer, task) = self.scheduler.pop_due().expect("no pending timer");
            assert_eq!(task.client(), client.id);
            let (controller, mut host) = self.split();
            controller.on_tile_check_due(&mut host, timer, client)
        }
    }

    fn client(screen: usize, desktop: u32) -> Client {
        Client::new(1, screen, vec![ACTIVITY.into()], desktop)
    }

    #[test]
    fn test_attach_is_idempotent() {
        let mut h = Harness::new(1);
        let mut c = client(0, 1);

        h.attach(&mut c);
        let snapshot = c.previous_desktops().map(<[Desktop]>::to_vec);
        c.desktop = 2;
        h.attach(&mut c);

        assert!(c.hooks_registered());
        assert_eq!(h.events.subscriptions.len(), ClientSignal::ALL.len());
        assert_eq!(c.previous_desktops().map(<[Desktop]>::to_vec), snapshot);
    }

    #[test]
    fn test_membership_diff() {
        let mut h = Harness::new(1);
        let mut c = client(0, 1);
        h.client_added(&mut c, true).unwrap();
        h.factory.clear_calls();

        c.desktop = 2;
        h.signal(&mut c, ClientSignal::DesktopChanged).unwrap();

        assert_eq!(
            h.factory.calls(),
            vec![
                DriverCall::Remove { driver: 0, client: 1 },
                DriverCall::Add { driver: 1, client: 1 },
                DriverCall::Build { driver: 0, root: TileId::root(0) },
            ]
        );
        assert_eq!(
            c.previous_desktops().unwrap(),
            &[Desktop::new(0, ACTIVITY, 2)]
        );
        assert!(c.is_tiled());
    }

    #[test]
    fn test_membership_change_across_activities() {
        let mut h = Harness::new(1);
        let mut c = client(0, 1);
        h.client_added(&mut c, true).unwrap();

        c.activities.push("other".into());
        h.signal(&mut c, ClientSignal::ActivitiesChanged).unwrap();

        let main = Desktop::new(0, ACTIVITY, 1);
        let other = Desktop::new(0, "other", 1);
        assert!(h.controller.manager().is_managed_by(&main, 1));
        assert!(h.controller.manager().is_managed_by(&other, 1));
        assert_eq!(c.previous_desktops().unwrap().len(), 2);
    }

    #[test]
    fn test_membership_change_ignored_when_untracked() {
        let mut h = Harness::new(1);

        // No snapshot
        let mut c = client(0, 1);
        c.desktop = 2;
        h.signal(&mut c, ClientSignal::DesktopChanged).unwrap();
        assert!(h.factory.calls().is_empty());

        // Hooked but floating
        let mut c = client(0, 1);
        h.client_added(&mut c, false).unwrap();
        c.screen = 1;
        h.signal(&mut c, ClientSignal::ScreenChanged).unwrap();
        assert!(h.factory.calls().is_empty());
        assert_eq!(c.previous_desktops().unwrap(), &[Desktop::new(0, ACTIVITY, 1)]);
    }

    #[test]
    fn test_tile_change_suppressed_while_building() {
        let mut h = Harness::new(1);
        let c = client(0, 1);

        h.controller.manager().set_building_layout(true);
        h.tile_changed(&c);

        assert!(h.scheduler.pending.is_empty());
        assert!(!h.controller.has_pending_tile_check(1));
        assert!(h.factory.calls().is_empty());
    }

    #[test]
    fn test_tile_change_schedules_with_delay() {
        let mut h = Harness::new(1);
        let c = client(0, 1);

        h.tile_changed(&c);

        assert_eq!(h.scheduler.pending.len(), 1);
        assert_eq!(h.scheduler.pending[0].1, crate::DEFAULT_TILE_CHECK_DELAY);
        assert!(h.controller.has_pending_tile_check(1));
    }

    #[test]
    fn test_tile_entry() {
        let mut h = Harness::new(2);
        let mut c = client(1, 1);
        let tile = managed_tile(1, 0);
        c.tile = Some(tile);

        h.tile_changed(&c);
        h.fire_next(&mut c).unwrap();

        assert!(c.hooks_registered());
        assert!(c.is_tiled());
        assert_eq!(
            h.factory.calls(),
            vec![
                DriverCall::Put {
                    driver: 0,
                    client: 1,
                    tile: tile.id,
                    direction: None,
                },
                DriverCall::Build { driver: 0, root: TileId::root(1) },
            ]
        );
        assert!(!h.controller.has_pending_tile_check(1));
        assert!(h.scheduler.pending.is_empty());
    }

    #[test]
    fn test_tile_exit() {
        let mut h = Harness::new(1);
        let mut c = client(0, 1);
        h.client_added(&mut c, true).unwrap();
        h.factory.clear_calls();

        c.tile = None;
        h.tile_changed(&c);
        h.fire_next(&mut c).unwrap();

        assert!(!c.is_tiled());
        assert_eq!(
            h.factory.calls(),
            vec![
                DriverCall::Remove { driver: 0, client: 1 },
                DriverCall::Build { driver: 0, root: TileId::root(0) },
            ]
        );
        assert!(!h.controller.has_pending_tile_check(1));
    }

    #[test]
    fn test_tile_check_without_transition_does_nothing() {
        let mut h = Harness::new(1);
        let mut c = client(0, 1);
        c.tile = Some(TileRef {
            managed: false,
            ..managed_tile(0, 0)
        });

        h.tile_changed(&c);
        h.fire_next(&mut c).unwrap();

        assert!(!c.is_tiled());
        assert!(h.factory.calls().is_empty());
        assert!(!h.controller.has_pending_tile_check(1));
    }

    #[test]
    fn test_rapid_tile_changes_coalesce() {
        let mut h = Harness::new(1);
        let c = client(0, 1);

        h.tile_changed(&c);
        let first = h.scheduler.pending[0].0;
        h.tile_changed(&c);

        assert_eq!(h.scheduler.pending.len(), 1);
        assert_eq!(h.scheduler.cancelled, vec![first]);
    }

    #[test]
    fn test_stale_timer_is_ignored() {
        let mut h = Harness::new(1);
        let mut c = client(0, 1);
        c.tile = Some(managed_tile(0, 0));

        h.tile_changed(&c);
        let (stale, _) = h.scheduler.pop_due().unwrap();
        h.tile_changed(&c);

        let (controller, mut host) = h.split();
        controller.on_tile_check_due(&mut host, stale, &mut c).unwrap();

        assert!(!c.is_tiled());
        assert!(h.factory.calls().is_empty());
        assert!(h.controller.has_pending_tile_check(1));
    }
}
