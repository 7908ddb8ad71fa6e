//! Application state for Axum handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use spotbook_core::ReservationService;

/// State shared across all HTTP handlers.
///
/// Generic over the record store so the same router serves the Firebase
/// adapter in production and the in-memory store in tests.
pub struct AppState<S> {
    /// Reservation business rules
    pub service: ReservationService<S>,
    /// Prometheus renderer; `/metrics` answers 404 without one
    pub metrics: Option<PrometheusHandle>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<S> AppState<S> {
    /// State without a metrics exporter.
    #[must_use]
    pub const fn new(service: ReservationService<S>) -> Self {
        Self {
            service,
            metrics: None,
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotbook_testing::{InMemoryRecordStore, fixtures};

    #[test]
    fn test_state_is_clone() {
        fn assert_clone<T: Clone + Send + Sync + 'static>() {}
        assert_clone::<AppState<InMemoryRecordStore>>();
    }

    #[test]
    fn test_state_without_metrics() {
        let (service, _store) = fixtures::service_with_capacity(1);
        assert!(AppState::new(service).metrics.is_none());
    }
}
