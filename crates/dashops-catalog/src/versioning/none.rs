//! The disabled versioning provider.

use async_trait::async_trait;

use dashops_core::UserContext;

use crate::error::Result;
use crate::service::Service;

use super::{ChangeAction, FieldChange, ServiceChange, VersioningProvider};

/// Versioning disabled: every write succeeds, history is always empty.
///
/// The controller maps history reads against this provider to
/// `CatalogError::VersioningDisabled` via [`VersioningProvider::is_enabled`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoneProvider;

#[async_trait]
impl VersioningProvider for NoneProvider {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }

    async fn record_change(
        &self,
        _service: &Service,
        _user: &UserContext,
        _action: ChangeAction,
        _changes: &[FieldChange],
    ) -> Result<()> {
        Ok(())
    }

    async fn record_deletion(&self, _name: &str, _user: &UserContext) -> Result<()> {
        Ok(())
    }

    async fn service_history(&self, _name: &str) -> Result<Vec<ServiceChange>> {
        Ok(Vec::new())
    }
}
