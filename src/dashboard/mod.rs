pub mod filter;
pub mod mirror;
pub mod projector;
pub mod render;

use crate::audit::{AuditAction, AuditLog};
use crate::auth::{AuthService, SessionEvent};
use crate::db::conf::schema::Conf;
use crate::store::{DocumentStore, Snapshot, Subscription};
use crate::{db, Result};
use filter::{FilterState, TimeRange, TrendType};
use mirror::{Collection, Mirror};
use projector::ProjectionConf;
use render::{RenderSink, Screen};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use strum::{AsRefStr, IntoEnumIterator};
use time::OffsetDateTime;
use tracing::{error, info};

pub const LOAD_ERROR: &str = "Failed to load dashboard data";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Section {
    Dashboard,
    Facilities,
    Users,
    Children,
    Immunizations,
    Reports,
    Settings,
}

impl Section {
    pub fn title(&self) -> &'static str {
        match self {
            Section::Dashboard => "Dashboard",
            Section::Facilities => "Facilities",
            Section::Users => "Users",
            Section::Children => "Children",
            Section::Immunizations => "Immunizations",
            Section::Reports => "Reports",
            Section::Settings => "Settings",
        }
    }
}

struct DashboardState<S> {
    mirror: Mirror,
    filter: FilterState,
    conf: ProjectionConf,
    sink: S,
    failed: bool,
}

impl<S: RenderSink> DashboardState<S> {
    fn refresh(&mut self) {
        let today = OffsetDateTime::now_utc().date();
        let view = projector::project(&self.mirror, &self.filter, &self.conf, today);
        render::paint(&view, &mut self.sink);
    }

    fn fail(&mut self) {
        if !self.failed {
            self.failed = true;
            self.sink.show_error(LOAD_ERROR);
        }
    }
}

/// Owns the mirror, the filter state and the sink of one mounted dashboard. The store
/// subscriptions are the only writers of the mirror, filter changes come from the methods
/// below.
pub struct Dashboard<S> {
    state: Arc<Mutex<DashboardState<S>>>,
    audit: AuditLog,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl<S: RenderSink + Send + 'static> Dashboard<S> {
    /// Subscribes to every watched collection. A subscription that can't be established is
    /// reported once through the sink's error port, the dashboard stays usable.
    pub async fn mount(store: &DocumentStore, audit: AuditLog, conf: &Conf, sink: S) -> Self {
        let conf = ProjectionConf::from(conf);
        let state = Arc::new(Mutex::new(DashboardState {
            mirror: Mirror::default(),
            filter: FilterState::default(),
            conf,
            sink,
            failed: false,
        }));
        let mut subscriptions = vec![];
        for collection in Collection::iter() {
            let listener_state = state.clone();
            let listener = move |snapshot: Snapshot| {
                let mut state = listener_state
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                if state.mirror.apply(collection, &snapshot) {
                    state.refresh();
                }
            };
            let query = collection.query(conf.row_limit as i64);
            match store.subscribe(query, listener).await {
                Ok(subscription) => subscriptions.push(subscription),
                Err(e) => {
                    error!(%collection, error = %e, "Failed to subscribe");
                    state.lock().unwrap_or_else(PoisonError::into_inner).fail();
                }
            }
        }
        info!(subscriptions = subscriptions.len(), "Dashboard mounted");
        Dashboard {
            state,
            audit,
            subscriptions: Mutex::new(subscriptions),
        }
    }

    pub async fn select_facilities(&self, selected: &[String], actor_email: &str) {
        self.change_filter(|it| it.select_facilities(selected), actor_email)
            .await
    }

    pub async fn set_time_range(&self, time_range: TimeRange, actor_email: &str) {
        self.change_filter(|it| it.set_time_range(time_range), actor_email)
            .await
    }

    pub async fn set_trend_type(&self, trend_type: TrendType, actor_email: &str) {
        self.change_filter(|it| it.set_trend_type(trend_type), actor_email)
            .await
    }

    async fn change_filter(&self, change: impl FnOnce(&mut FilterState), actor_email: &str) {
        let details = {
            let mut state = self.lock();
            change(&mut state.filter);
            state.refresh();
            state.filter.audit_details()
        };
        self.audit
            .log(AuditAction::DashboardFilterChange, details, actor_email)
            .await;
    }

    pub async fn navigate(&self, section: Section, actor_email: &str) -> &'static str {
        let mut details = Map::new();
        details.insert("section".into(), json!(section.as_ref()));
        self.audit
            .log(AuditAction::Navigation, details, actor_email)
            .await;
        section.title()
    }

    pub fn filter(&self) -> FilterState {
        self.lock().filter.clone()
    }

    pub fn with_sink<R>(&self, read: impl FnOnce(&S) -> R) -> R {
        read(&self.lock().sink)
    }

    /// Cancels every subscription, later store writes have no effect on this dashboard
    pub fn unmount(&self) {
        let mut subscriptions = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let count = subscriptions.len();
        subscriptions.clear();
        info!(subscriptions = count, "Dashboard unmounted");
    }

    fn lock(&self) -> MutexGuard<'_, DashboardState<S>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keeps at most one dashboard mounted for the HTTP surface
#[derive(Clone)]
pub struct DashboardHost {
    store: DocumentStore,
    audit: AuditLog,
    mounted: Arc<Mutex<Option<Arc<Dashboard<Screen>>>>>,
}

impl DashboardHost {
    pub fn new(store: &DocumentStore) -> Self {
        DashboardHost {
            store: store.clone(),
            audit: AuditLog::new(store.pool()),
            mounted: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn get_or_mount(&self) -> Result<Arc<Dashboard<Screen>>> {
        if let Some(dashboard) = self.current() {
            return Ok(dashboard);
        }
        let conf = db::conf::queries::select(self.store.pool()).await?;
        let dashboard = Arc::new(
            Dashboard::mount(&self.store, self.audit.clone(), &conf, Screen::default()).await,
        );
        let mut mounted = self.mounted.lock().unwrap_or_else(PoisonError::into_inner);
        // mounted concurrently, keep the first one
        if let Some(existing) = mounted.as_ref() {
            dashboard.unmount();
            return Ok(existing.clone());
        }
        *mounted = Some(dashboard.clone());
        Ok(dashboard)
    }

    pub fn current(&self) -> Option<Arc<Dashboard<Screen>>> {
        self.mounted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns false if nothing was mounted
    pub fn unmount(&self) -> bool {
        let dashboard = self
            .mounted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match dashboard {
            Some(dashboard) => {
                dashboard.unmount();
                true
            }
            None => false,
        }
    }

    /// Tears the dashboard down whenever the admin signs out
    pub fn listen(&self, auth: &AuthService) {
        let host = self.clone();
        auth.on_session_changed(move |event| {
            if let SessionEvent::SignedOut { .. } = event {
                host.unmount();
            }
        });
    }
}

#[cfg(test)]
mod test {
    use super::render::test::RecordingSink;
    use super::render::Screen;
    use super::filter::{TimeRange, ALL_FACILITIES};
    use super::{Dashboard, DashboardHost, Section, LOAD_ERROR};
    use crate::audit::AuditLog;
    use crate::db::conf::schema::Conf;
    use crate::db::test::pool;
    use crate::store::DocumentStore;
    use crate::test::fields;
    use crate::{db, Result};
    use serde_json::{json, Map};
    use std::sync::Arc;
    use time::{Duration, OffsetDateTime};

    async fn store() -> DocumentStore {
        DocumentStore::new(&Arc::new(pool().await))
    }

    #[actix_web::test]
    async fn mount_on_empty_store() -> Result<()> {
        let host = DashboardHost::new(&store().await);
        let dashboard = host.get_or_mount().await?;
        dashboard.with_sink(|screen| {
            assert_eq!("0", screen.counters["total_facilities"]);
            assert_eq!("0", screen.counters["total_users"]);
            assert_eq!("0", screen.counters["total_children"]);
            assert_eq!("0", screen.counters["total_immunizations"]);
            assert_eq!("0%", screen.counters["coverage_rate"]);
            assert!(screen.table.is_empty());
            assert_eq!(None, screen.error);
        });
        assert!(Arc::ptr_eq(&dashboard, &host.get_or_mount().await?));
        Ok(())
    }

    #[actix_web::test]
    async fn store_writes_repaint() -> Result<()> {
        let store = store().await;
        let host = DashboardHost::new(&store);
        let dashboard = host.get_or_mount().await?;
        store.add("children", Map::new()).await?;
        store
            .add(
                "immunizations",
                fields(json!({"childName": "Asha", "vaccineName": "BCG",
                    "facilityName": "North", "date": "2024-01-05"})),
            )
            .await?;
        dashboard.with_sink(|screen| {
            assert_eq!("1", screen.counters["total_children"]);
            assert_eq!("10%", screen.counters["coverage_rate"]);
            assert_eq!(1, screen.table.len());
            assert_eq!("Jan 5, 2024", screen.table[0].date);
        });
        Ok(())
    }

    #[actix_web::test]
    async fn immunizations_are_a_window() -> Result<()> {
        let store = store().await;
        let dashboard = Dashboard::mount(
            &store,
            AuditLog::new(store.pool()),
            &Conf {
                recent_immunizations_limit: 2,
                ..Conf::mock()
            },
            RecordingSink::default(),
        )
        .await;
        for day in ["2024-01-01", "2024-01-03", "2024-01-02"] {
            store
                .add("immunizations", fields(json!({"date": day})))
                .await?;
        }
        let rows = dashboard.lock().mirror.immunizations().len();
        assert_eq!(2, rows);
        Ok(())
    }

    #[actix_web::test]
    async fn unmount_stops_updates() -> Result<()> {
        let store = store().await;
        let host = DashboardHost::new(&store);
        let dashboard = host.get_or_mount().await?;
        assert!(host.unmount());
        assert!(!host.unmount());
        store.add("users", Map::new()).await?;
        dashboard.with_sink(|screen| assert_eq!("0", screen.counters["total_users"]));
        Ok(())
    }

    #[actix_web::test]
    async fn failed_subscription_shows_error_once() -> Result<()> {
        let store = store().await;
        store
            .pool()
            .get()
            .await?
            .interact(|conn| conn.execute_batch("DROP TABLE document"))
            .await??;
        let dashboard = Dashboard::mount(
            &store,
            AuditLog::new(store.pool()),
            &Conf::mock(),
            RecordingSink::default(),
        )
        .await;
        dashboard.with_sink(|sink| assert_eq!(vec![LOAD_ERROR.to_string()], sink.errors));
        assert!(dashboard.subscriptions.lock().unwrap().is_empty());
        Ok(())
    }

    #[actix_web::test]
    async fn filter_changes_are_audited() -> Result<()> {
        let store = store().await;
        let host = DashboardHost::new(&store);
        let dashboard = host.get_or_mount().await?;
        dashboard
            .select_facilities(&["f1".to_string()], "admin@example.org")
            .await;
        let title = dashboard
            .navigate(Section::Children, "admin@example.org")
            .await;
        assert_eq!("Children", title);
        let log = db::audit_log::queries::select_latest(2, store.pool()).await?;
        assert_eq!("NAVIGATION", log[0].action);
        assert_eq!(json!("children"), log[0].details["section"]);
        assert_eq!("DASHBOARD_FILTER_CHANGE", log[1].action);
        assert_eq!(json!(["f1"]), log[1].details["facilities"]);
        assert_eq!(vec!["f1".to_string()], dashboard.filter().facilities.values());
        Ok(())
    }

    fn selected(dashboard: &Dashboard<Screen>) -> Vec<String> {
        dashboard.with_sink(|screen| {
            screen
                .facility_options
                .iter()
                .filter(|it| it.selected)
                .map(|it| it.value.clone())
                .collect()
        })
    }

    fn children(dashboard: &Dashboard<Screen>) -> Vec<String> {
        dashboard.with_sink(|screen| screen.table.iter().map(|it| it.child_name.clone()).collect())
    }

    #[actix_web::test]
    async fn filter_changes_repaint() -> Result<()> {
        let store = store().await;
        store.set("facilities", "f1", fields(json!({"name": "North"}))).await?;
        store.set("facilities", "f2", fields(json!({"name": "South"}))).await?;
        let recent = (OffsetDateTime::now_utc() - Duration::days(2)).date().to_string();
        for (child, facility, date) in [
            ("Asha", "North", recent.as_str()),
            ("Ravi", "South", recent.as_str()),
            ("Mira", "North", "2020-01-01"),
        ] {
            store
                .add(
                    "immunizations",
                    fields(json!({"childName": child, "facilityName": facility, "date": date})),
                )
                .await?;
        }
        let host = DashboardHost::new(&store);
        let dashboard = host.get_or_mount().await?;
        assert_eq!(vec![ALL_FACILITIES.to_string()], selected(&dashboard));
        assert_eq!(vec!["Asha", "Ravi", "Mira"], children(&dashboard));

        dashboard
            .select_facilities(&["f1".to_string()], "admin@example.org")
            .await;
        assert_eq!(vec!["f1".to_string()], selected(&dashboard));
        assert_eq!(vec!["Asha", "Mira"], children(&dashboard));

        dashboard
            .set_time_range(TimeRange::Last7Days, "admin@example.org")
            .await;
        assert_eq!(vec!["Asha"], children(&dashboard));

        store.delete("facilities", "f1").await?;
        assert_eq!(vec![ALL_FACILITIES.to_string()], selected(&dashboard));
        assert_eq!(vec!["Asha", "Ravi"], children(&dashboard));
        Ok(())
    }
}
