use shared::domain::{FilterValue, Filters, ViewMode};

use crate::adapter::{Capability, CapabilitySet};

/// Concrete list method selected for a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMethod {
    GetAll,
    GetActive,
    GetInactive,
    GetDeleted,
}

/// A resolved list route: the adapter method to call plus any extra query
/// parameters a fallback requires.
#[derive(Debug, Clone, PartialEq)]
pub struct ListRoute {
    pub method: ListMethod,
    pub extra: Filters,
}

/// Maps the requested scope plus the adapter's capability descriptor to a
/// concrete fetch. Backends that lack a dedicated scoped endpoint fall back
/// to `get_all` with a filter parameter, so one controller operates
/// correctly against partial adapters.
pub fn resolve(mode: ViewMode, capabilities: &CapabilitySet) -> ListRoute {
    let mut extra = Filters::new();
    let method = match mode {
        ViewMode::Active if capabilities.supports(Capability::GetActive) => ListMethod::GetActive,
        ViewMode::Active => {
            extra.insert("activo".to_string(), FilterValue::Bool(true));
            ListMethod::GetAll
        }
        ViewMode::Inactive if capabilities.supports(Capability::GetInactive) => {
            ListMethod::GetInactive
        }
        ViewMode::Inactive => {
            extra.insert("activo".to_string(), FilterValue::Bool(false));
            ListMethod::GetAll
        }
        ViewMode::Deleted if capabilities.supports(Capability::GetDeleted) => ListMethod::GetDeleted,
        ViewMode::Deleted => {
            extra.insert("eliminado".to_string(), FilterValue::Bool(true));
            ListMethod::GetAll
        }
        ViewMode::All => ListMethod::GetAll,
    };
    ListRoute { method, extra }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_dedicated_scoped_endpoints() {
        let caps = CapabilitySet::full();
        assert_eq!(
            resolve(ViewMode::Active, &caps).method,
            ListMethod::GetActive
        );
        assert_eq!(
            resolve(ViewMode::Inactive, &caps).method,
            ListMethod::GetInactive
        );
        assert_eq!(
            resolve(ViewMode::Deleted, &caps).method,
            ListMethod::GetDeleted
        );
        assert!(resolve(ViewMode::Active, &caps).extra.is_empty());
    }

    #[test]
    fn falls_back_to_get_all_with_scope_parameter() {
        let caps = CapabilitySet::empty().with(Capability::GetAll);

        let route = resolve(ViewMode::Active, &caps);
        assert_eq!(route.method, ListMethod::GetAll);
        assert_eq!(route.extra.get("activo"), Some(&FilterValue::Bool(true)));

        let route = resolve(ViewMode::Inactive, &caps);
        assert_eq!(route.method, ListMethod::GetAll);
        assert_eq!(route.extra.get("activo"), Some(&FilterValue::Bool(false)));

        let route = resolve(ViewMode::Deleted, &caps);
        assert_eq!(route.method, ListMethod::GetAll);
        assert_eq!(route.extra.get("eliminado"), Some(&FilterValue::Bool(true)));
    }

    #[test]
    fn all_scope_never_adds_parameters() {
        for caps in [CapabilitySet::full(), CapabilitySet::empty()] {
            let route = resolve(ViewMode::All, &caps);
            assert_eq!(route.method, ListMethod::GetAll);
            assert!(route.extra.is_empty());
        }
    }
}
