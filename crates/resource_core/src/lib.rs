use std::sync::Arc;

use serde_json::Value;
use shared::{
    domain::{EntityId, FilterValue, Filters, ViewMode},
    protocol::{Identifiable, ListEnvelope},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

pub mod adapter;
pub mod pagination;
pub mod selection;
pub mod view_mode;

pub use adapter::{AdapterError, AdapterResult, Capability, CapabilitySet, ServiceAdapter};
pub use pagination::{PaginationInfo, DEFAULT_PAGE_SIZE};
pub use selection::SelectionManager;
pub use view_mode::{ListMethod, ListRoute};

/// Operation class a failure is scoped to when normalized into a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Fetch,
    Create,
    Update,
    Delete,
    Bulk,
}

impl OperationKind {
    fn verb(self) -> &'static str {
        match self {
            OperationKind::Fetch => "load",
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
            OperationKind::Bulk => "bulk-update",
        }
    }
}

fn scoped_message(kind: OperationKind, entity_name: &str, err: &AdapterError) -> String {
    format!("failed to {} {entity_name}: {err}", kind.verb())
}

/// Busy flags are independent per category; `creating` and `deleting` may
/// both be true at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BusyFlag {
    Loading,
    Creating,
    Updating,
    Deleting,
}

impl BusyFlag {
    fn apply<T>(self, state: &mut ResourceState<T>, value: bool) {
        match self {
            BusyFlag::Loading => state.loading = value,
            BusyFlag::Creating => state.creating = value,
            BusyFlag::Updating => state.updating = value,
            BusyFlag::Deleting => state.deleting = value,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ControllerEvent {
    StateChanged,
    OperationFailed {
        kind: OperationKind,
        message: String,
    },
    Unauthorized,
}

/// The single state object a controller exposes to its UI consumer. Mutated
/// only through controller operations; consumers receive clones.
#[derive(Debug, Clone)]
pub struct ResourceState<T> {
    /// Replaced wholesale on every successful list fetch, never patched
    /// incrementally. Order matches the server response.
    pub items: Vec<T>,
    pub current_item: Option<T>,
    pub loading: bool,
    pub creating: bool,
    pub updating: bool,
    pub deleting: bool,
    pub error: Option<String>,
    pub validation_errors: Option<std::collections::HashMap<String, String>>,
    pub pagination: PaginationInfo,
    pub filters: Filters,
    pub search_query: String,
    pub selection: SelectionManager,
    pub view_mode: ViewMode,
    /// Opaque aggregate object, present only when the adapter exposes a
    /// stats capability.
    pub stats: Option<Value>,
}

impl<T> Default for ResourceState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            current_item: None,
            loading: false,
            creating: false,
            updating: false,
            deleting: false,
            error: None,
            validation_errors: None,
            pagination: PaginationInfo::default(),
            filters: Filters::new(),
            search_query: String::new(),
            selection: SelectionManager::new(),
            view_mode: ViewMode::default(),
            stats: None,
        }
    }
}

struct Inner<T> {
    state: ResourceState<T>,
    // Bumped on every change to filters, page, page size, or view mode. A
    // list response is committed only when the token captured at fetch
    // entry still matches, so an older in-flight fetch cannot overwrite
    // newer state.
    fetch_token: u64,
}

type UnauthorizedHook = Box<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy)]
enum BulkOp {
    Activate,
    Deactivate,
    SoftDelete,
    Restore,
}

impl BulkOp {
    fn capability(self) -> Capability {
        match self {
            BulkOp::Activate => Capability::ActivateMultiple,
            BulkOp::Deactivate => Capability::DeactivateMultiple,
            BulkOp::SoftDelete => Capability::SoftDeleteMultiple,
            BulkOp::Restore => Capability::RestoreMultiple,
        }
    }

    fn busy_flag(self) -> BusyFlag {
        match self {
            BulkOp::SoftDelete => BusyFlag::Deleting,
            _ => BusyFlag::Updating,
        }
    }
}

/// Orchestrates list/detail state for one entity type against one service
/// adapter: pagination, filtering, view-mode-scoped fetching, bulk
/// mutation, selection tracking, and capability-aware dispatch.
///
/// Every operation catches its own failures at the boundary and folds them
/// into `error`/`validation_errors`; nothing is re-thrown past the
/// controller. Mutations reconcile by refetching the list from the source
/// of truth instead of patching local state.
pub struct ResourceController<A: ServiceAdapter> {
    adapter: Arc<A>,
    inner: Mutex<Inner<A::Entity>>,
    events: broadcast::Sender<ControllerEvent>,
    on_unauthorized: Option<UnauthorizedHook>,
}

impl<A> ResourceController<A>
where
    A: ServiceAdapter,
    A::Entity: Identifiable + Clone,
{
    pub fn new(adapter: Arc<A>) -> Arc<Self> {
        Self::build(adapter, None)
    }

    /// Builds a controller whose authentication failures invoke `hook`
    /// instead of any global side effect.
    pub fn with_unauthorized_hook(
        adapter: Arc<A>,
        hook: impl Fn() + Send + Sync + 'static,
    ) -> Arc<Self> {
        Self::build(adapter, Some(Box::new(hook)))
    }

    fn build(adapter: Arc<A>, on_unauthorized: Option<UnauthorizedHook>) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            adapter,
            inner: Mutex::new(Inner {
                state: ResourceState::default(),
                fetch_token: 0,
            }),
            events,
            on_unauthorized,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    /// Snapshot of the current state.
    pub async fn state(&self) -> ResourceState<A::Entity> {
        self.inner.lock().await.state.clone()
    }

    /// First bind: fetches aggregate stats once when the adapter supports
    /// them (best-effort, non-fatal), then issues the initial list fetch.
    pub async fn initialize(&self) -> bool {
        if self.adapter.capabilities().supports(Capability::GetStats) {
            match self.adapter.get_stats().await {
                Ok(stats) => {
                    let mut inner = self.inner.lock().await;
                    inner.state.stats = Some(stats);
                }
                Err(err) => {
                    warn!(
                        entity = self.adapter.entity_name(),
                        "stats fetch failed on initial bind: {err}"
                    );
                }
            }
        }
        self.fetch_list(Filters::new()).await
    }

    /// Fetches the current page under the current filters and view mode,
    /// replacing `items` wholesale on success. A failed fetch clears
    /// `items` so stale rows are never shown under a filter they no longer
    /// match.
    pub async fn fetch_list(&self, extra_params: Filters) -> bool {
        let (token, params, route) = {
            let mut inner = self.inner.lock().await;
            inner.state.error = None;
            inner.state.validation_errors = None;
            inner.state.loading = true;
            let route = view_mode::resolve(inner.state.view_mode, self.adapter.capabilities());
            let params = Self::list_params(&inner.state, &route, extra_params);
            (inner.fetch_token, params, route)
        };
        self.emit(ControllerEvent::StateChanged);

        let result = self.dispatch_list(route.method, &params).await;
        self.commit_list(token, result).await
    }

    /// Fetches a single record into `current_item`. On failure the previous
    /// `current_item` is left untouched and `false` is returned.
    pub async fn fetch_one(&self, id: EntityId) -> bool {
        {
            let mut inner = self.inner.lock().await;
            inner.state.error = None;
            inner.state.validation_errors = None;
            inner.state.loading = true;
        }
        self.emit(ControllerEvent::StateChanged);

        let result = self.adapter.get_by_id(id).await;
        let mut inner = self.inner.lock().await;
        inner.state.loading = false;
        match result {
            Ok(entity) => {
                inner.state.current_item = Some(entity);
                drop(inner);
                self.emit(ControllerEvent::StateChanged);
                true
            }
            Err(err) => {
                let message = self.record_failure(&mut inner.state, OperationKind::Fetch, &err);
                drop(inner);
                self.after_failure(OperationKind::Fetch, &err, message);
                false
            }
        }
    }

    pub async fn create(&self, data: Value) -> bool {
        self.begin(BusyFlag::Creating).await;
        let result = self.adapter.create(&data).await.map(|_| ());
        self.finish_mutation(BusyFlag::Creating, OperationKind::Create, result)
            .await
    }

    pub async fn update(&self, id: EntityId, data: Value, is_partial: bool) -> bool {
        self.begin(BusyFlag::Updating).await;
        let result = if is_partial {
            self.adapter.patch(id, &data).await.map(|_| ())
        } else {
            self.adapter.update(id, &data).await.map(|_| ())
        };
        self.finish_mutation(BusyFlag::Updating, OperationKind::Update, result)
            .await
    }

    pub async fn remove(&self, id: EntityId) -> bool {
        self.begin(BusyFlag::Deleting).await;
        let result = self.adapter.delete(id).await;
        self.finish_mutation(BusyFlag::Deleting, OperationKind::Delete, result)
            .await
    }

    pub async fn toggle_active(&self, id: EntityId, is_active: Option<bool>) -> bool {
        self.begin(BusyFlag::Updating).await;
        let result = self.adapter.toggle_active(id, is_active).await;
        self.finish_mutation(BusyFlag::Updating, OperationKind::Update, result)
            .await
    }

    pub async fn soft_delete(&self, id: EntityId) -> bool {
        self.begin(BusyFlag::Deleting).await;
        let result = self.adapter.soft_delete(id).await;
        self.finish_mutation(BusyFlag::Deleting, OperationKind::Delete, result)
            .await
    }

    pub async fn hard_delete(&self, id: EntityId) -> bool {
        self.begin(BusyFlag::Deleting).await;
        let result = self.adapter.hard_delete(id).await;
        self.finish_mutation(BusyFlag::Deleting, OperationKind::Delete, result)
            .await
    }

    pub async fn restore(&self, id: EntityId) -> bool {
        self.begin(BusyFlag::Updating).await;
        let result = self.adapter.restore(id).await;
        self.finish_mutation(BusyFlag::Updating, OperationKind::Update, result)
            .await
    }

    pub async fn bulk_activate(&self, ids: &[EntityId]) -> bool {
        self.bulk(BulkOp::Activate, ids).await
    }

    pub async fn bulk_deactivate(&self, ids: &[EntityId]) -> bool {
        self.bulk(BulkOp::Deactivate, ids).await
    }

    pub async fn bulk_soft_delete(&self, ids: &[EntityId]) -> bool {
        self.bulk(BulkOp::SoftDelete, ids).await
    }

    pub async fn bulk_restore(&self, ids: &[EntityId]) -> bool {
        self.bulk(BulkOp::Restore, ids).await
    }

    /// Runs a search through the adapter's dedicated search capability, or,
    /// when absent, falls back to `fetch_list` with the query folded into
    /// the parameters under the generic `search` key.
    pub async fn search(&self, query: &str, mut params: Filters) -> bool {
        if !self.adapter.capabilities().supports(Capability::Search) {
            {
                let mut inner = self.inner.lock().await;
                inner.state.search_query = query.to_string();
            }
            params.insert("search".to_string(), FilterValue::from(query));
            return self.fetch_list(params).await;
        }

        let (token, merged) = {
            let mut inner = self.inner.lock().await;
            inner.state.error = None;
            inner.state.validation_errors = None;
            inner.state.loading = true;
            inner.state.search_query = query.to_string();
            let mut merged = inner.state.filters.clone();
            merged.extend(params);
            merged.insert(
                "page".to_string(),
                FilterValue::from(inner.state.pagination.page),
            );
            merged.insert(
                "page_size".to_string(),
                FilterValue::from(inner.state.pagination.page_size),
            );
            (inner.fetch_token, merged)
        };
        self.emit(ControllerEvent::StateChanged);

        let result = self.adapter.search(query, &merged).await;
        self.commit_list(token, result).await
    }

    /// Replaces the filter set. Any filter change invalidates the current
    /// page position, so the page resets to 1 and the list is refetched.
    pub async fn set_filters(&self, filters: Filters) -> bool {
        {
            let mut inner = self.inner.lock().await;
            inner.state.filters = filters;
            inner.state.pagination.page = 1;
            inner.fetch_token = inner.fetch_token.wrapping_add(1);
        }
        self.fetch_list(Filters::new()).await
    }

    /// Switches the list scope, resets the page to 1, and refetches.
    pub async fn set_view_mode(&self, mode: ViewMode) -> bool {
        {
            let mut inner = self.inner.lock().await;
            inner.state.view_mode = mode;
            inner.state.pagination.page = 1;
            inner.fetch_token = inner.fetch_token.wrapping_add(1);
        }
        self.fetch_list(Filters::new()).await
    }

    pub async fn go_to_page(&self, page: u32) -> bool {
        {
            let mut inner = self.inner.lock().await;
            inner.state.pagination.page = page.max(1);
            inner.fetch_token = inner.fetch_token.wrapping_add(1);
        }
        self.fetch_list(Filters::new()).await
    }

    pub async fn change_page_size(&self, page_size: u32) -> bool {
        {
            let mut inner = self.inner.lock().await;
            inner.state.pagination.page_size = page_size.max(1);
            inner.state.pagination.page = 1;
            inner.fetch_token = inner.fetch_token.wrapping_add(1);
        }
        self.fetch_list(Filters::new()).await
    }

    /// Returns whether the id is selected after the toggle.
    pub async fn toggle_selection(&self, id: EntityId) -> bool {
        let selected = {
            let mut inner = self.inner.lock().await;
            inner.state.selection.toggle(id)
        };
        self.emit(ControllerEvent::StateChanged);
        selected
    }

    /// Selects exactly the identifiers of the currently loaded page.
    pub async fn select_all(&self) {
        {
            let mut inner = self.inner.lock().await;
            let ResourceState {
                items, selection, ..
            } = &mut inner.state;
            selection.select_all(items);
        }
        self.emit(ControllerEvent::StateChanged);
    }

    pub async fn clear_selection(&self) {
        {
            let mut inner = self.inner.lock().await;
            inner.state.selection.clear();
        }
        self.emit(ControllerEvent::StateChanged);
    }

    fn list_params(state: &ResourceState<A::Entity>, route: &ListRoute, extra: Filters) -> Filters {
        let mut params = state.filters.clone();
        for (key, value) in &route.extra {
            params.insert(key.clone(), value.clone());
        }
        params.extend(extra);
        params.insert("page".to_string(), FilterValue::from(state.pagination.page));
        params.insert(
            "page_size".to_string(),
            FilterValue::from(state.pagination.page_size),
        );
        params
    }

    async fn dispatch_list(
        &self,
        method: ListMethod,
        params: &Filters,
    ) -> AdapterResult<ListEnvelope<A::Entity>> {
        match method {
            ListMethod::GetAll => self.adapter.get_all(params).await,
            ListMethod::GetActive => self.adapter.get_active(params).await,
            ListMethod::GetInactive => self.adapter.get_inactive(params).await,
            ListMethod::GetDeleted => self.adapter.get_deleted(params).await,
        }
    }

    async fn commit_list(
        &self,
        token: u64,
        result: AdapterResult<ListEnvelope<A::Entity>>,
    ) -> bool {
        let mut inner = self.inner.lock().await;
        inner.state.loading = false;
        if inner.fetch_token != token {
            debug!(
                entity = self.adapter.entity_name(),
                "discarding stale list response"
            );
            drop(inner);
            self.emit(ControllerEvent::StateChanged);
            return false;
        }
        match result {
            Ok(envelope) => {
                let (items, meta) = envelope.into_parts();
                inner.state.items = items;
                if let Some(meta) = meta {
                    inner.state.pagination = pagination::compute(
                        &meta,
                        inner.state.pagination.page,
                        inner.state.pagination.page_size,
                    );
                }
                drop(inner);
                self.emit(ControllerEvent::StateChanged);
                true
            }
            Err(err) => {
                inner.state.items.clear();
                let message = self.record_failure(&mut inner.state, OperationKind::Fetch, &err);
                drop(inner);
                self.after_failure(OperationKind::Fetch, &err, message);
                false
            }
        }
    }

    async fn begin(&self, flag: BusyFlag) {
        {
            let mut inner = self.inner.lock().await;
            inner.state.error = None;
            inner.state.validation_errors = None;
            flag.apply(&mut inner.state, true);
        }
        self.emit(ControllerEvent::StateChanged);
    }

    async fn finish_mutation(
        &self,
        flag: BusyFlag,
        kind: OperationKind,
        result: AdapterResult<()>,
    ) -> bool {
        let failure = {
            let mut inner = self.inner.lock().await;
            flag.apply(&mut inner.state, false);
            match result {
                Ok(()) => None,
                Err(err) => {
                    let message = self.record_failure(&mut inner.state, kind, &err);
                    Some((err, message))
                }
            }
        };
        match failure {
            None => {
                self.emit(ControllerEvent::StateChanged);
                // Reconcile from the source of truth; no optimistic local
                // merge.
                self.fetch_list(Filters::new()).await;
                true
            }
            Some((err, message)) => {
                self.after_failure(kind, &err, message);
                false
            }
        }
    }

    async fn bulk(&self, op: BulkOp, ids: &[EntityId]) -> bool {
        let capability = op.capability();
        if !self.adapter.capabilities().supports(capability) {
            // Detected before any network call, so a missing capability can
            // never produce a partial mutation. The selection stays intact.
            let err = AdapterError::Unsupported(capability);
            let message = {
                let mut inner = self.inner.lock().await;
                inner.state.validation_errors = None;
                self.record_failure(&mut inner.state, OperationKind::Bulk, &err)
            };
            self.after_failure(OperationKind::Bulk, &err, message);
            return false;
        }

        let flag = op.busy_flag();
        self.begin(flag).await;
        let result = match op {
            BulkOp::Activate => self.adapter.activate_multiple(ids).await,
            BulkOp::Deactivate => self.adapter.deactivate_multiple(ids).await,
            BulkOp::SoftDelete => self.adapter.soft_delete_multiple(ids).await,
            BulkOp::Restore => self.adapter.restore_multiple(ids).await,
        };
        if result.is_ok() {
            let mut inner = self.inner.lock().await;
            inner.state.selection.clear();
        }
        self.finish_mutation(flag, OperationKind::Bulk, result).await
    }

    fn record_failure(
        &self,
        state: &mut ResourceState<A::Entity>,
        kind: OperationKind,
        err: &AdapterError,
    ) -> String {
        let message = scoped_message(kind, self.adapter.entity_name(), err);
        state.error = Some(message.clone());
        if let AdapterError::Validation { fields, .. } = err {
            if !fields.is_empty() {
                state.validation_errors = Some(fields.clone());
            }
        }
        message
    }

    fn after_failure(&self, kind: OperationKind, err: &AdapterError, message: String) {
        warn!(
            entity = self.adapter.entity_name(),
            kind = kind.verb(),
            "operation failed: {err}"
        );
        if matches!(err, AdapterError::Unauthorized) {
            if let Some(hook) = &self.on_unauthorized {
                hook();
            }
            self.emit(ControllerEvent::Unauthorized);
        }
        self.emit(ControllerEvent::OperationFailed { kind, message });
        self.emit(ControllerEvent::StateChanged);
    }

    fn emit(&self, event: ControllerEvent) {
        // Best-effort: a consumer that lags or never subscribed is not an
        // error.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
