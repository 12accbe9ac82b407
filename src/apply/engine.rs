//! Apply engine for single change items.
//!
//! The engine posts an item's settings to its stanza path. A 404 means the
//! stanza does not exist yet: it is then created on the collection path with
//! an extra `name` field, unless update-only mode is active.

use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

use crate::config::{ChangeItem, ChangeValidator};
use crate::error::ApplyError;
use crate::splunk::{RemoteResponse, ResolvedTarget, SplunkClient, TargetResolver};

use super::outcome::ApplyOutcome;

/// Form field carrying the stanza name on create.
const NAME_FIELD: &str = "name";

/// Decision taken from the response to an update request.
#[derive(Debug)]
enum UpdateDecision {
    /// The stanza exists and was updated.
    Applied(u16),
    /// The stanza does not exist.
    Missing,
    /// The server refused the update; no fallback is attempted.
    Rejected(ApplyError),
}

/// Engine applying one change item at a time.
#[derive(Debug, Clone)]
pub struct ApplyEngine {
    /// Management API client.
    client: SplunkClient,
    /// Path resolver.
    resolver: TargetResolver,
    /// Per-item validator.
    validator: ChangeValidator,
    /// Whether missing stanzas are skipped instead of created.
    update_only: bool,
}

impl UpdateDecision {
    fn from_response(response: &RemoteResponse) -> Self {
        if response.is_success() {
            Self::Applied(response.status)
        } else if response.is_not_found() {
            Self::Missing
        } else {
            Self::Rejected(ApplyError::rejected(response.status, &response.body))
        }
    }
}

impl ApplyEngine {
    /// Creates a new engine that creates missing stanzas.
    #[must_use]
    pub fn new(client: SplunkClient, resolver: TargetResolver, has_conf_type: bool) -> Self {
        Self {
            client,
            resolver,
            validator: ChangeValidator::new(has_conf_type),
            update_only: false,
        }
    }

    /// Sets update-only mode.
    #[must_use]
    pub const fn with_update_only(mut self, update_only: bool) -> Self {
        self.update_only = update_only;
        self
    }

    /// Returns the management API client.
    #[must_use]
    pub const fn client(&self) -> &SplunkClient {
        &self.client
    }

    /// Returns the path resolver.
    #[must_use]
    pub const fn resolver(&self) -> &TargetResolver {
        &self.resolver
    }

    /// Returns whether update-only mode is active.
    #[must_use]
    pub const fn update_only(&self) -> bool {
        self.update_only
    }

    /// Validates, resolves and applies one item.
    ///
    /// Never fails: every error is turned into a failed outcome.
    pub async fn apply(&self, item: &ChangeItem) -> ApplyOutcome {
        if let Err(e) = self.validator.check_item(item) {
            error!("Stanza '{}' is invalid: {e}. Skipping.", item.title);
            return ApplyOutcome::failed(item, None, e.to_string());
        }

        let target = match self.resolver.resolve(item) {
            Ok(target) => target,
            Err(e) => {
                error!("{e}. Skipping.");
                return ApplyOutcome::failed(item, None, e.to_string());
            }
        };

        info!(
            "Processing [{}] in app={}",
            item.title,
            item.app_or(self.resolver.defaults())
        );

        self.apply_to(item, target).await
    }

    /// Applies one item to an already resolved target.
    pub async fn apply_to(&self, item: &ChangeItem, target: ResolvedTarget) -> ApplyOutcome {
        let title = &item.title;
        let app = item.app_or(self.resolver.defaults());
        let url = self.resolver.url_for(&target.stanza_path);
        debug!("Updating {title} at {url}");

        let response = match self.client.post_form(url, &item.settings).await {
            Ok(response) => response,
            Err(e) => {
                error!("Failed {title} in app={app}. {e}");
                return ApplyOutcome::failed(item, Some(target), e.to_string());
            }
        };

        match UpdateDecision::from_response(&response) {
            UpdateDecision::Applied(status) => {
                info!("Successfully applied changes to {title} in app={app} (updated).");
                ApplyOutcome::updated(item, target, format!("HTTP {status}"))
            }
            UpdateDecision::Rejected(e) => {
                error!("Failed {title} in app={app}. {e}");
                ApplyOutcome::failed(item, Some(target), e.to_string())
            }
            UpdateDecision::Missing if self.update_only => {
                warn!("Stanza '{title}' not found. Skipping (--update-only).");
                let reason = ApplyError::NotFound {
                    path: target.stanza_path.clone(),
                };
                ApplyOutcome::skipped(item, target, reason.to_string())
            }
            UpdateDecision::Missing => {
                info!("Stanza '{title}' not found. Attempting to create...");
                self.create(item, target).await
            }
        }
    }

    /// Creates a stanza on its collection path.
    async fn create(&self, item: &ChangeItem, target: ResolvedTarget) -> ApplyOutcome {
        let title = &item.title;
        let app = item.app_or(self.resolver.defaults());
        let url = self.resolver.url_for(&target.collection_path);

        let mut form: BTreeMap<String, String> = item.settings.clone();
        form.insert(String::from(NAME_FIELD), title.clone());

        match self.client.post_form(url, &form).await {
            Ok(response) if response.is_success() => {
                info!("Successfully applied changes to {title} in app={app} (created).");
                ApplyOutcome::created(item, target, format!("HTTP {}", response.status))
            }
            Ok(response) => {
                let e = ApplyError::rejected(response.status, &response.body);
                error!("Failed {title} in app={app}. {e}");
                ApplyOutcome::failed(item, Some(target), format!("Create failed: {e}"))
            }
            Err(e) => {
                error!("Failed {title} in app={app}. {e}");
                ApplyOutcome::failed(item, Some(target), format!("Create failed: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::ApplyStatus;
    use crate::config::TargetDefaults;
    use reqwest::Url;
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const STANZA: &str = "/servicesNS/nobody/search/configs/conf-macros/test_cli_macro_with_args%282%29";
    const COLLECTION: &str = "/servicesNS/nobody/search/configs/conf-macros";

    fn engine(server: &MockServer) -> ApplyEngine {
        let resolver = TargetResolver::with_base(
            Url::parse(&server.uri()).unwrap(),
            Some(String::from("macros")),
            TargetDefaults::default(),
        );
        ApplyEngine::new(SplunkClient::new("t").unwrap(), resolver, true)
    }

    fn item() -> ChangeItem {
        ChangeItem::new("test_cli_macro_with_args(2)")
            .with_setting("definition", "index=$a$ sourcetype=$b$")
            .with_setting("args", "a,b")
    }

    #[tokio::test]
    async fn test_existing_stanza_is_updated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STANZA))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(COLLECTION))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let outcome = engine(&server).apply(&item()).await;
        assert_eq!(outcome.status, ApplyStatus::Updated);
        assert_eq!(outcome.target.unwrap().stanza_path, STANZA);
    }

    #[tokio::test]
    async fn test_repeated_apply_updates_twice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STANZA))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let engine = engine(&server);
        assert_eq!(engine.apply(&item()).await.status, ApplyStatus::Updated);
        assert_eq!(engine.apply(&item()).await.status, ApplyStatus::Updated);
    }

    #[tokio::test]
    async fn test_missing_stanza_is_created_with_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STANZA))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(COLLECTION))
            .and(body_string_contains("name=test_cli_macro_with_args%282%29"))
            .and(body_string_contains("args=a%2Cb"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = engine(&server).apply(&item()).await;
        assert_eq!(outcome.status, ApplyStatus::Created);
        assert_eq!(outcome.detail, "HTTP 201");
    }

    #[tokio::test]
    async fn test_update_only_skips_without_create() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STANZA))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(COLLECTION))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let outcome = engine(&server).with_update_only(true).apply(&item()).await;
        assert_eq!(outcome.status, ApplyStatus::Skipped);
        assert!(outcome.applied_target().is_none());
    }

    #[tokio::test]
    async fn test_rejection_does_not_fall_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STANZA))
            .respond_with(ResponseTemplate::new(400).set_body_string("Argument \"bogus\" is not supported"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(COLLECTION))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let outcome = engine(&server).apply(&item()).await;
        assert_eq!(outcome.status, ApplyStatus::Failed);
        assert!(outcome.detail.starts_with("Status: 400"));
        assert!(outcome.detail.contains("bogus"));
    }

    #[tokio::test]
    async fn test_failed_create_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STANZA))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(COLLECTION))
            .respond_with(ResponseTemplate::new(409).set_body_string("already exists"))
            .mount(&server)
            .await;

        let outcome = engine(&server).apply(&item()).await;
        assert_eq!(outcome.status, ApplyStatus::Failed);
        assert_eq!(outcome.detail, "Create failed: Status: 409, Body: already exists");
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_retried() {
        let resolver = TargetResolver::new(
            "http",
            "127.0.0.1",
            1,
            Some(String::from("macros")),
            TargetDefaults::default(),
        )
        .unwrap();
        let engine = ApplyEngine::new(SplunkClient::new("t").unwrap(), resolver, true);

        let outcome = engine.apply(&item()).await;
        assert_eq!(outcome.status, ApplyStatus::Failed);
        assert!(outcome.detail.starts_with("Transport error"));
        assert!(outcome.target.is_some());
    }

    #[tokio::test]
    async fn test_invalid_item_fails_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let outcome = engine(&server).apply(&ChangeItem::new("empty")).await;
        assert_eq!(outcome.status, ApplyStatus::Failed);
        assert!(outcome.target.is_none());
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[tokio::test]
    async fn test_success_lines_name_title_and_app() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/servicesNS/nobody/ops/configs/conf-macros/updated_macro"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/servicesNS/nobody/search/configs/conf-macros/new_macro"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(COLLECTION))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let engine = engine(&server);
        let updated = ChangeItem::new("updated_macro")
            .with_app("ops")
            .with_setting("definition", "index=ops");
        let created = ChangeItem::new("new_macro").with_setting("definition", "index=main");

        assert_eq!(engine.apply(&updated).await.status, ApplyStatus::Updated);
        assert_eq!(engine.apply(&created).await.status, ApplyStatus::Created);

        let text = logs.text();
        assert!(text.contains("Successfully applied changes to updated_macro in app=ops (updated)."));
        assert!(text.contains("Successfully applied changes to new_macro in app=search (created)."));
    }

    #[tokio::test]
    async fn test_reference_path_is_posted_verbatim() {
        let server = MockServer::start().await;
        let reference = format!("https://elsewhere:8089{STANZA}");
        Mock::given(method("POST"))
            .and(path(STANZA))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let resolver = TargetResolver::with_base(
            Url::parse(&server.uri()).unwrap(),
            None,
            TargetDefaults::default(),
        );
        let engine = ApplyEngine::new(SplunkClient::new("t").unwrap(), resolver, false);

        let outcome = engine.apply(&item().with_resource_ref(reference)).await;
        assert_eq!(outcome.status, ApplyStatus::Updated);
    }
}
