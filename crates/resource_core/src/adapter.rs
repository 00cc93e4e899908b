use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde_json::Value;
use shared::{
    domain::{EntityId, Filters},
    protocol::ListEnvelope,
};
use thiserror::Error;

/// An adapter operation whose presence is declared once at construction
/// time. The controller consults the descriptor before dispatching; there is
/// no per-call reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    GetAll,
    GetActive,
    GetInactive,
    GetDeleted,
    Search,
    GetStats,
    Create,
    Update,
    Patch,
    Delete,
    ToggleActive,
    SoftDelete,
    HardDelete,
    Restore,
    ActivateMultiple,
    DeactivateMultiple,
    SoftDeleteMultiple,
    RestoreMultiple,
}

impl Capability {
    pub const ALL: [Capability; 18] = [
        Capability::GetAll,
        Capability::GetActive,
        Capability::GetInactive,
        Capability::GetDeleted,
        Capability::Search,
        Capability::GetStats,
        Capability::Create,
        Capability::Update,
        Capability::Patch,
        Capability::Delete,
        Capability::ToggleActive,
        Capability::SoftDelete,
        Capability::HardDelete,
        Capability::Restore,
        Capability::ActivateMultiple,
        Capability::DeactivateMultiple,
        Capability::SoftDeleteMultiple,
        Capability::RestoreMultiple,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::GetAll => "get_all",
            Capability::GetActive => "get_active",
            Capability::GetInactive => "get_inactive",
            Capability::GetDeleted => "get_deleted",
            Capability::Search => "search",
            Capability::GetStats => "get_stats",
            Capability::Create => "create",
            Capability::Update => "update",
            Capability::Patch => "patch",
            Capability::Delete => "delete",
            Capability::ToggleActive => "toggle_active",
            Capability::SoftDelete => "soft_delete",
            Capability::HardDelete => "hard_delete",
            Capability::Restore => "restore",
            Capability::ActivateMultiple => "activate_multiple",
            Capability::DeactivateMultiple => "deactivate_multiple",
            Capability::SoftDeleteMultiple => "soft_delete_multiple",
            Capability::RestoreMultiple => "restore_multiple",
        }
    }
}

/// Capability descriptor resolved once when an adapter is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    caps: HashSet<Capability>,
}

impl CapabilitySet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn full() -> Self {
        Capability::ALL.into_iter().collect()
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.caps.insert(capability);
        self
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.caps.contains(&capability)
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.caps.iter().copied()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self {
            caps: iter.into_iter().collect(),
        }
    }
}

/// Normalized failure taxonomy every adapter reports through.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("{message}")]
    Validation {
        message: String,
        fields: HashMap<String, String>,
    },
    #[error("operation '{}' is not supported by this backend", .0.as_str())]
    Unsupported(Capability),
    #[error("not found")]
    NotFound,
    #[error("unauthorized")]
    Unauthorized,
    #[error("unexpected failure: {0}")]
    Unknown(String),
}

pub type AdapterResult<T> = Result<T, AdapterError>;

/// Entity I/O backend for one resource type.
///
/// `get_all` and `get_by_id` are the mandatory floor; everything else
/// defaults to `Unsupported`, so a backend implements exactly the subset of
/// operations it actually has endpoints for. The `capabilities` descriptor
/// must agree with the overridden methods.
#[async_trait]
pub trait ServiceAdapter: Send + Sync {
    type Entity: Clone + Send + Sync;

    /// Plural, human-readable entity name used to scope error messages.
    fn entity_name(&self) -> &str;

    fn capabilities(&self) -> &CapabilitySet;

    async fn get_all(&self, params: &Filters) -> AdapterResult<ListEnvelope<Self::Entity>>;

    async fn get_by_id(&self, id: EntityId) -> AdapterResult<Self::Entity>;

    async fn get_active(&self, _params: &Filters) -> AdapterResult<ListEnvelope<Self::Entity>> {
        Err(AdapterError::Unsupported(Capability::GetActive))
    }

    async fn get_inactive(&self, _params: &Filters) -> AdapterResult<ListEnvelope<Self::Entity>> {
        Err(AdapterError::Unsupported(Capability::GetInactive))
    }

    async fn get_deleted(&self, _params: &Filters) -> AdapterResult<ListEnvelope<Self::Entity>> {
        Err(AdapterError::Unsupported(Capability::GetDeleted))
    }

    async fn search(
        &self,
        _query: &str,
        _params: &Filters,
    ) -> AdapterResult<ListEnvelope<Self::Entity>> {
        Err(AdapterError::Unsupported(Capability::Search))
    }

    async fn get_stats(&self) -> AdapterResult<Value> {
        Err(AdapterError::Unsupported(Capability::GetStats))
    }

    async fn create(&self, _data: &Value) -> AdapterResult<Self::Entity> {
        Err(AdapterError::Unsupported(Capability::Create))
    }

    async fn update(&self, _id: EntityId, _data: &Value) -> AdapterResult<Self::Entity> {
        Err(AdapterError::Unsupported(Capability::Update))
    }

    async fn patch(&self, _id: EntityId, _data: &Value) -> AdapterResult<Self::Entity> {
        Err(AdapterError::Unsupported(Capability::Patch))
    }

    async fn delete(&self, _id: EntityId) -> AdapterResult<()> {
        Err(AdapterError::Unsupported(Capability::Delete))
    }

    async fn toggle_active(&self, _id: EntityId, _is_active: Option<bool>) -> AdapterResult<()> {
        Err(AdapterError::Unsupported(Capability::ToggleActive))
    }

    async fn soft_delete(&self, _id: EntityId) -> AdapterResult<()> {
        Err(AdapterError::Unsupported(Capability::SoftDelete))
    }

    async fn hard_delete(&self, _id: EntityId) -> AdapterResult<()> {
        Err(AdapterError::Unsupported(Capability::HardDelete))
    }

    async fn restore(&self, _id: EntityId) -> AdapterResult<()> {
        Err(AdapterError::Unsupported(Capability::Restore))
    }

    async fn activate_multiple(&self, _ids: &[EntityId]) -> AdapterResult<()> {
        Err(AdapterError::Unsupported(Capability::ActivateMultiple))
    }

    async fn deactivate_multiple(&self, _ids: &[EntityId]) -> AdapterResult<()> {
        Err(AdapterError::Unsupported(Capability::DeactivateMultiple))
    }

    async fn soft_delete_multiple(&self, _ids: &[EntityId]) -> AdapterResult<()> {
        Err(AdapterError::Unsupported(Capability::SoftDeleteMultiple))
    }

    async fn restore_multiple(&self, _ids: &[EntityId]) -> AdapterResult<()> {
        Err(AdapterError::Unsupported(Capability::RestoreMultiple))
    }
}
