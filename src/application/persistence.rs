use crate::domain::models::{RemoteSettings, Settings, TimezoneList, ZoomLevel};
use crate::domain::schedule::ScheduleMap;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::identity::{IdentityProvider, UserId};
use crate::infrastructure::kv_client::KvClient;
use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub fn schedules_key(user: &UserId) -> String {
    format!("gsd:{user}:schedules")
}

pub fn settings_key(user: &UserId) -> String {
    format!("gsd:{user}:settings")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Remote,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadResponse {
    pub schedules: ScheduleMap,
    pub settings: Option<RemoteSettings>,
    pub source: DataSource,
}

impl LoadResponse {
    pub fn local() -> Self {
        Self {
            schedules: ScheduleMap::new(),
            settings: None,
            source: DataSource::Local,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    pub success: bool,
    pub source: DataSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn load(&self, user: &UserId) -> Result<LoadResponse, InfraError>;

    /// Writes whichever documents are present; absent ones are left alone.
    async fn save(
        &self,
        user: &UserId,
        schedules: Option<&ScheduleMap>,
        settings: Option<&Settings>,
    ) -> Result<SaveOutcome, InfraError>;
}

/// Gateway used when no remote store is configured.
#[derive(Debug, Clone, Default)]
pub struct LocalOnlyGateway;

#[async_trait]
impl PersistenceGateway for LocalOnlyGateway {
    async fn load(&self, _user: &UserId) -> Result<LoadResponse, InfraError> {
        Ok(LoadResponse::local())
    }

    async fn save(
        &self,
        _user: &UserId,
        _schedules: Option<&ScheduleMap>,
        _settings: Option<&Settings>,
    ) -> Result<SaveOutcome, InfraError> {
        Ok(SaveOutcome {
            success: true,
            source: DataSource::Local,
            message: Some("no remote store configured, data saved locally only".to_string()),
        })
    }
}

pub struct KvPersistenceGateway<K>
where
    K: KvClient,
{
    client: Arc<K>,
}

impl<K> KvPersistenceGateway<K>
where
    K: KvClient,
{
    pub fn new(client: Arc<K>) -> Self {
        Self { client }
    }
}

fn decode_document<T>(raw: Option<String>, key: &str) -> Result<Option<T>, InfraError>
where
    T: serde::de::DeserializeOwned,
{
    raw.map(|raw| {
        serde_json::from_str::<T>(&raw)
            .map_err(|error| InfraError::Remote(format!("invalid document at {key}: {error}")))
    })
    .transpose()
}

/// Settings keys are read one by one; an unreadable key is dropped with a
/// warning so the rest of the document, and the schedules, still load.
fn decode_settings(raw: Option<String>, key: &str) -> Option<RemoteSettings> {
    let document = match serde_json::from_str::<serde_json::Value>(&raw?) {
        Ok(serde_json::Value::Object(document)) => document,
        Ok(_) => {
            warn!(key, "ignoring settings document that is not an object");
            return None;
        }
        Err(error) => {
            warn!(key, %error, "ignoring unreadable settings document");
            return None;
        }
    };

    Some(RemoteSettings {
        zoom_level: settings_field::<ZoomLevel>(&document, "zoomLevel", key),
        timezones: settings_field::<TimezoneList>(&document, "timezones", key),
    })
}

fn settings_field<T>(document: &serde_json::Map<String, serde_json::Value>, field: &str, key: &str) -> Option<T>
where
    T: serde::de::DeserializeOwned,
{
    let value = document.get(field).filter(|value| !value.is_null())?;
    match T::deserialize(value) {
        Ok(parsed) => Some(parsed),
        Err(error) => {
            warn!(key, field, %error, "ignoring invalid settings field");
            None
        }
    }
}

#[async_trait]
impl<K> PersistenceGateway for KvPersistenceGateway<K>
where
    K: KvClient,
{
    async fn load(&self, user: &UserId) -> Result<LoadResponse, InfraError> {
        let schedules_key = schedules_key(user);
        let settings_key = settings_key(user);
        let (schedules, settings) = tokio::try_join!(
            self.client.get(&schedules_key),
            self.client.get(&settings_key)
        )?;

        Ok(LoadResponse {
            schedules: decode_document(schedules, &schedules_key)?.unwrap_or_default(),
            settings: decode_settings(settings, &settings_key),
            source: DataSource::Remote,
        })
    }

    async fn save(
        &self,
        user: &UserId,
        schedules: Option<&ScheduleMap>,
        settings: Option<&Settings>,
    ) -> Result<SaveOutcome, InfraError> {
        let schedules_doc = schedules.map(serde_json::to_string).transpose()?;
        let settings_doc = settings.map(serde_json::to_string).transpose()?;
        let schedules_key = schedules_key(user);
        let settings_key = settings_key(user);

        tokio::try_join!(
            async {
                match schedules_doc.as_deref() {
                    Some(document) => self.client.set(&schedules_key, document).await,
                    None => Ok(()),
                }
            },
            async {
                match settings_doc.as_deref() {
                    Some(document) => self.client.set(&settings_key, document).await,
                    None => Ok(()),
                }
            }
        )?;

        Ok(SaveOutcome {
            success: true,
            source: DataSource::Remote,
            message: None,
        })
    }
}

/// Holds at most one pending write. A new request aborts the pending timer
/// and starts a fresh quiet period; once the period elapses the write runs
/// detached and later requests no longer affect it.
#[derive(Debug)]
pub struct DebouncedSaver {
    quiet_period: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl DebouncedSaver {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            pending: Mutex::new(None),
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    pub fn schedule<F, Fut>(&self, write: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            warn!("no async runtime available; dropping debounced save");
            return;
        };

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.take() {
            previous.abort();
        }

        let quiet_period = self.quiet_period;
        let spawner = runtime.clone();
        *pending = Some(runtime.spawn(async move {
            tokio::time::sleep(quiet_period).await;
            spawner.spawn(write());
        }));
    }

    pub fn has_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for DebouncedSaver {
    fn drop(&mut self) {
        if let Some(handle) = self
            .pending
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

/// Resolves the signed-in user and forwards load/save to the gateway.
pub struct PersistenceService {
    identity: Arc<dyn IdentityProvider>,
    gateway: Arc<dyn PersistenceGateway>,
    saver: DebouncedSaver,
}

impl PersistenceService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        gateway: Arc<dyn PersistenceGateway>,
        quiet_period: Duration,
    ) -> Self {
        Self {
            identity,
            gateway,
            saver: DebouncedSaver::new(quiet_period),
        }
    }

    fn require_user(&self) -> Result<UserId, InfraError> {
        self.identity
            .current_user()
            .ok_or_else(|| InfraError::Unauthorized("sign-in required for cloud sync".to_string()))
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.current_user().is_some()
    }

    pub async fn load(&self) -> Result<LoadResponse, InfraError> {
        let user = self.require_user()?;
        self.gateway.load(&user).await
    }

    pub async fn save(
        &self,
        schedules: Option<&ScheduleMap>,
        settings: Option<&Settings>,
    ) -> Result<SaveOutcome, InfraError> {
        let user = self.require_user()?;
        self.gateway.save(&user, schedules, settings).await
    }

    /// Queues a full-state write behind the debounce window. Failures are
    /// logged and dropped.
    pub fn request_sync(self: &Arc<Self>, schedules: ScheduleMap, settings: Settings) {
        let service = Arc::clone(self);
        self.saver.schedule(move || async move {
            match service.save(Some(&schedules), Some(&settings)).await {
                Ok(outcome) => info!(source = ?outcome.source, dates = schedules.len(), "state synced"),
                Err(InfraError::Unauthorized(_)) => debug!("skipping cloud sync without a signed-in user"),
                Err(error) => warn!(%error, "debounced save failed"),
            }
        });
    }

    pub fn has_pending_sync(&self) -> bool {
        self.saver.has_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{DaySchedule, Task, TaskColor, TimezoneList, ZoomLevel};
    use crate::infrastructure::identity::StaticIdentity;
    use crate::infrastructure::kv_client::InMemoryKvClient;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct RecordingGateway {
        saves: Mutex<Vec<(String, Option<ScheduleMap>, Option<Settings>)>>,
        save_calls: AtomicUsize,
        save_delay: Option<Duration>,
        fail_saves: bool,
    }

    impl RecordingGateway {
        fn saved_schedules(&self) -> Vec<Option<ScheduleMap>> {
            self.saves
                .lock()
                .expect("saves lock poisoned")
                .iter()
                .map(|(_, schedules, _)| schedules.clone())
                .collect()
        }
    }

    #[async_trait]
    impl PersistenceGateway for RecordingGateway {
        async fn load(&self, _user: &UserId) -> Result<LoadResponse, InfraError> {
            Ok(LoadResponse::local())
        }

        async fn save(
            &self,
            user: &UserId,
            schedules: Option<&ScheduleMap>,
            settings: Option<&Settings>,
        ) -> Result<SaveOutcome, InfraError> {
            self.save_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.save_delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_saves {
                return Err(InfraError::Remote("store unavailable".to_string()));
            }
            self.saves.lock().expect("saves lock poisoned").push((
                user.to_string(),
                schedules.cloned(),
                settings.cloned(),
            ));
            Ok(SaveOutcome {
                success: true,
                source: DataSource::Remote,
                message: None,
            })
        }
    }

    fn user() -> UserId {
        UserId::new("user_1").expect("valid user")
    }

    fn schedule_for(date: &str, task_id: &str) -> ScheduleMap {
        [DaySchedule {
            date: date.to_string(),
            tasks: vec![Task {
                id: task_id.to_string(),
                title: "Plan".to_string(),
                start_time: DateTime::parse_from_rfc3339(&format!("{date}T09:00:00Z"))
                    .expect("valid datetime")
                    .with_timezone(&Utc),
                duration: 30,
                color: TaskColor::Emerald,
                completed: false,
            }],
        }]
        .into_iter()
        .collect()
    }

    fn service_with(gateway: Arc<RecordingGateway>, quiet_period: Duration) -> Arc<PersistenceService> {
        Arc::new(PersistenceService::new(
            Arc::new(StaticIdentity::new(Some("user_1"))),
            gateway,
            quiet_period,
        ))
    }

    #[test]
    fn keys_are_namespaced_per_user() {
        assert_eq!(schedules_key(&user()), "gsd:user_1:schedules");
        assert_eq!(settings_key(&user()), "gsd:user_1:settings");
    }

    #[tokio::test]
    async fn kv_gateway_round_trips_documents_as_strings() {
        let client = Arc::new(InMemoryKvClient::default());
        let gateway = KvPersistenceGateway::new(Arc::clone(&client));
        let schedules = schedule_for("2024-01-01", "A");
        let settings = Settings {
            zoom_level: ZoomLevel::ThirtyMinutes,
            timezones: TimezoneList::new(vec!["UTC".to_string()]).expect("zones"),
        };

        gateway
            .save(&user(), Some(&schedules), Some(&settings))
            .await
            .expect("save documents");

        let raw = client
            .get("gsd:user_1:settings")
            .await
            .expect("read settings")
            .expect("settings present");
        assert_eq!(raw, r#"{"zoomLevel":30,"timezones":["UTC"]}"#);

        let loaded = gateway.load(&user()).await.expect("load documents");
        assert_eq!(loaded.source, DataSource::Remote);
        assert_eq!(loaded.schedules, schedules);
        assert_eq!(loaded.settings, Some(RemoteSettings::from(settings)));
    }

    #[tokio::test]
    async fn kv_gateway_save_skips_absent_documents() {
        let client = Arc::new(InMemoryKvClient::default());
        let gateway = KvPersistenceGateway::new(Arc::clone(&client));

        gateway
            .save(&user(), Some(&ScheduleMap::new()), None)
            .await
            .expect("save schedules only");

        assert_eq!(client.get("gsd:user_1:schedules").await.expect("get"), Some("{}".to_string()));
        assert_eq!(client.get("gsd:user_1:settings").await.expect("get"), None);
    }

    #[tokio::test]
    async fn kv_gateway_load_of_new_user_is_empty_remote() {
        let gateway = KvPersistenceGateway::new(Arc::new(InMemoryKvClient::default()));
        let loaded = gateway.load(&user()).await.expect("load");
        assert_eq!(loaded.source, DataSource::Remote);
        assert!(loaded.schedules.is_empty());
        assert_eq!(loaded.settings, None);
    }

    #[tokio::test]
    async fn kv_gateway_reports_corrupt_schedules_as_remote_errors() {
        let client = Arc::new(InMemoryKvClient::default());
        client
            .insert("gsd:user_1:schedules", r#"{"2024-01-01": {"date": "2024-01-01", "tasks": 3}}"#)
            .expect("seed schedules");
        let gateway = KvPersistenceGateway::new(client);

        assert!(matches!(gateway.load(&user()).await, Err(InfraError::Remote(_))));
    }

    #[tokio::test]
    async fn kv_gateway_drops_invalid_settings_fields_and_keeps_schedules() {
        let client = Arc::new(InMemoryKvClient::default());
        let schedules = schedule_for("2024-01-02", "A");
        client
            .insert(
                "gsd:user_1:schedules",
                &serde_json::to_string(&schedules).expect("encode schedules"),
            )
            .expect("seed schedules");
        client
            .insert("gsd:user_1:settings", r#"{"zoomLevel":60,"timezones":[]}"#)
            .expect("seed settings");
        let gateway = KvPersistenceGateway::new(Arc::clone(&client));

        let loaded = gateway.load(&user()).await.expect("load");
        assert_eq!(loaded.schedules, schedules);
        assert_eq!(
            loaded.settings,
            Some(RemoteSettings {
                zoom_level: Some(ZoomLevel::OneHour),
                timezones: None,
            })
        );

        client
            .insert("gsd:user_1:settings", r#"{"zoomLevel":45,"timezones":["UTC"]}"#)
            .expect("seed settings");
        let loaded = gateway.load(&user()).await.expect("load");
        assert_eq!(loaded.settings.and_then(|settings| settings.zoom_level), None);

        client.insert("gsd:user_1:settings", "[1, 2]").expect("seed settings");
        assert_eq!(gateway.load(&user()).await.expect("load").settings, None);
    }

    #[tokio::test]
    async fn local_only_gateway_reports_local_source() {
        let gateway = LocalOnlyGateway;
        assert_eq!(gateway.load(&user()).await.expect("load"), LoadResponse::local());
        let outcome = gateway.save(&user(), None, None).await.expect("save");
        assert!(outcome.success);
        assert_eq!(outcome.source, DataSource::Local);
    }

    #[tokio::test]
    async fn unauthenticated_calls_fail_with_authorization_error() {
        let service = PersistenceService::new(
            Arc::new(StaticIdentity::anonymous()),
            Arc::new(LocalOnlyGateway),
            Duration::from_millis(10),
        );

        assert!(matches!(service.load().await, Err(InfraError::Unauthorized(_))));
        assert!(matches!(
            service.save(None, None).await,
            Err(InfraError::Unauthorized(_))
        ));
        assert!(!service.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_requests_collapse_into_one_write_with_latest_state() {
        let gateway = Arc::new(RecordingGateway::default());
        let service = service_with(Arc::clone(&gateway), Duration::from_secs(1));

        for task_id in ["first", "second", "third"] {
            service.request_sync(schedule_for("2024-01-01", task_id), Settings::default());
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        assert_eq!(gateway.save_calls.load(Ordering::SeqCst), 0);
        assert!(service.has_pending_sync());

        tokio::time::sleep(Duration::from_millis(1_500)).await;

        assert_eq!(gateway.save_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            gateway.saved_schedules(),
            vec![Some(schedule_for("2024-01-01", "third"))]
        );
        assert!(!service.has_pending_sync());
    }

    #[tokio::test(start_paused = true)]
    async fn request_after_quiet_period_does_not_cancel_in_flight_write() {
        let gateway = Arc::new(RecordingGateway {
            save_delay: Some(Duration::from_millis(500)),
            ..RecordingGateway::default()
        });
        let service = service_with(Arc::clone(&gateway), Duration::from_secs(1));

        service.request_sync(schedule_for("2024-01-01", "a"), Settings::default());
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(gateway.save_calls.load(Ordering::SeqCst), 1);

        service.request_sync(schedule_for("2024-01-01", "b"), Settings::default());
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(gateway.save_calls.load(Ordering::SeqCst), 2);
        assert_eq!(gateway.saved_schedules().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_writes_are_swallowed_and_not_retried() {
        let gateway = Arc::new(RecordingGateway {
            fail_saves: true,
            ..RecordingGateway::default()
        });
        let service = service_with(Arc::clone(&gateway), Duration::from_millis(200));

        service.request_sync(ScheduleMap::new(), Settings::default());
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(gateway.save_calls.load(Ordering::SeqCst), 1);
        assert!(gateway.saved_schedules().is_empty());
    }
}
