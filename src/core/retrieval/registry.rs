use std::sync::Arc;
use tracing::debug;

use super::traits::EndpointQuerier;
use crate::domain::entities::Endpoint;

/// Ordered adapter table for one result kind.
///
/// Registration order is priority order.
pub struct QuerierRegistry<T> {
    queriers: Vec<Arc<dyn EndpointQuerier<T>>>,
}

impl<T> Default for QuerierRegistry<T> {
    fn default() -> Self {
        Self {
            queriers: Vec::new(),
        }
    }
}

impl<T> QuerierRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, querier: Arc<dyn EndpointQuerier<T>>) {
        debug!(querier = querier.name(), "🔌 Registered endpoint querier");
        self.queriers.push(querier);
    }

    pub fn with_querier(mut self, querier: Arc<dyn EndpointQuerier<T>>) -> Self {
        self.register(querier);
        self
    }

    pub fn len(&self) -> usize {
        self.queriers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queriers.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.queriers.iter().map(|q| q.name().to_string()).collect()
    }

    /// Picks the adapter for an endpoint.
    ///
    /// A declared interface must be one of the adapter's interfaces. Without a
    /// declared interface, adapters speaking a preferred interface are tried
    /// first, then the rest in table order.
    pub fn select(
        &self,
        endpoint: &Endpoint,
        preferred_interfaces: &[String],
    ) -> Option<Arc<dyn EndpointQuerier<T>>> {
        if !endpoint.interface_name.is_empty() {
            return self
                .queriers
                .iter()
                .find(|q| {
                    q.supported_interfaces().contains(&endpoint.interface_name)
                        && q.supports(endpoint)
                })
                .cloned();
        }

        let speaks_preferred = |q: &Arc<dyn EndpointQuerier<T>>| {
            q.supported_interfaces()
                .iter()
                .any(|i| preferred_interfaces.contains(i))
        };

        self.queriers
            .iter()
            .find(|q| speaks_preferred(q) && q.supports(endpoint))
            .or_else(|| self.queriers.iter().find(|q| q.supports(endpoint)))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::synthetic::SyntheticQuerier;

    fn create_test_registry() -> QuerierRegistry<String> {
        QuerierRegistry::new()
            .with_querier(Arc::new(
                SyntheticQuerier::<String>::new("ldap").with_interfaces(&["org.nordugrid.ldapng"]),
            ))
            .with_querier(Arc::new(
                SyntheticQuerier::<String>::new("rest").with_interfaces(&["org.nordugrid.arcrest"]),
            ))
            .with_querier(Arc::new(
                SyntheticQuerier::<String>::new("files")
                    .with_interfaces(&["org.nordugrid.file"])
                    .with_schemes(&["file"]),
            ))
    }

    #[test]
    fn test_declared_interface_must_match() {
        let registry = create_test_registry();
        let endpoint = Endpoint::new("https://ce.example.org").with_interface("org.nordugrid.arcrest");
        assert_eq!(registry.select(&endpoint, &[]).unwrap().name(), "rest");

        let unknown = Endpoint::new("https://ce.example.org").with_interface("org.example.none");
        assert!(registry.select(&unknown, &[]).is_none());
    }

    #[test]
    fn test_preferred_interface_first_for_undeclared() {
        let registry = create_test_registry();
        let endpoint = Endpoint::new("https://ce.example.org");
        assert_eq!(registry.select(&endpoint, &[]).unwrap().name(), "ldap");
        assert_eq!(
            registry
                .select(&endpoint, &["org.nordugrid.arcrest".to_string()])
                .unwrap()
                .name(),
            "rest"
        );
    }

    #[test]
    fn test_supports_is_consulted() {
        let registry = create_test_registry();
        let endpoint = Endpoint::new("https://ce.example.org").with_interface("org.nordugrid.file");
        assert!(registry.select(&endpoint, &[]).is_none());
    }
}
