//! Service registry with async handlers
//!
//! Services are keyed by `domain.service`. Admin services additionally check
//! the caller: a call carrying a user id only goes through when that user is
//! known and is an administrator. System calls (no user) always pass.

use dashmap::DashMap;
use ha_core::{Context, ServiceCall};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

pub type ServiceResult = Result<Option<serde_json::Value>, ServiceError>;

pub type ServiceFuture = Pin<Box<dyn Future<Output = ServiceResult> + Send>>;

pub type ServiceHandler = Arc<dyn Fn(ServiceCall) -> ServiceFuture + Send + Sync>;

#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("service not found: {domain}.{service}")]
    NotFound { domain: String, service: String },

    #[error("user {user_id} is not allowed to call {domain}.{service}")]
    Unauthorized {
        user_id: String,
        domain: String,
        service: String,
    },

    #[error("unknown user: {0}")]
    UnknownUser(String),

    #[error("service call failed: {0}")]
    CallFailed(String),
}

/// Metadata for a registered service
#[derive(Debug, Clone)]
pub struct ServiceDescription {
    pub domain: String,
    pub service: String,
    pub description: Option<String>,
    /// Only administrators (or the system) may call this service
    pub admin_only: bool,
}

struct RegisteredService {
    handler: ServiceHandler,
    description: ServiceDescription,
}

pub struct ServiceRegistry {
    /// Keyed by "domain.service"
    services: DashMap<String, RegisteredService>,
    /// user_id -> is_admin
    users: DashMap<String, bool>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
            users: DashMap::new(),
        }
    }

    /// Make a user known to the registry
    pub fn add_user(&self, user_id: impl Into<String>, is_admin: bool) {
        self.users.insert(user_id.into(), is_admin);
    }

    /// Register a service anyone may call. Re-registering replaces the handler.
    #[instrument(skip(self, domain, service, handler))]
    pub fn register<F, Fut>(&self, domain: impl Into<String>, service: impl Into<String>, handler: F)
    where
        F: Fn(ServiceCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult> + Send + 'static,
    {
        self.insert(
            ServiceDescription {
                domain: domain.into(),
                service: service.into(),
                description: None,
                admin_only: false,
            },
            handler,
        );
    }

    /// Register a service restricted to administrators
    #[instrument(skip(self, domain, service, handler))]
    pub fn register_admin<F, Fut>(
        &self,
        domain: impl Into<String>,
        service: impl Into<String>,
        handler: F,
    ) where
        F: Fn(ServiceCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult> + Send + 'static,
    {
        self.insert(
            ServiceDescription {
                domain: domain.into(),
                service: service.into(),
                description: None,
                admin_only: true,
            },
            handler,
        );
    }

    fn insert<F, Fut>(&self, description: ServiceDescription, handler: F)
    where
        F: Fn(ServiceCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult> + Send + 'static,
    {
        let key = format!("{}.{}", description.domain, description.service);
        debug!(
            domain = %description.domain,
            service = %description.service,
            admin_only = description.admin_only,
            "Registering service"
        );

        let handler: ServiceHandler =
            Arc::new(move |call| Box::pin(handler(call)) as ServiceFuture);

        self.services.insert(
            key,
            RegisteredService {
                handler,
                description,
            },
        );
    }

    /// Call a service
    #[instrument(skip(self, service_data, context))]
    pub async fn call(
        &self,
        domain: &str,
        service: &str,
        service_data: serde_json::Value,
        context: Context,
    ) -> ServiceResult {
        let key = format!("{}.{}", domain, service);

        let registered = self.services.get(&key).ok_or_else(|| {
            warn!(domain = %domain, service = %service, "Service not found");
            ServiceError::NotFound {
                domain: domain.to_string(),
                service: service.to_string(),
            }
        })?;

        if registered.description.admin_only {
            self.check_admin(domain, service, &context)?;
        }

        let handler = registered.handler.clone();
        drop(registered); // Release the map guard before awaiting

        debug!(domain = %domain, service = %service, "Calling service");
        handler(ServiceCall::new(domain, service, service_data, context)).await
    }

    fn check_admin(&self, domain: &str, service: &str, context: &Context) -> Result<(), ServiceError> {
        let Some(user_id) = &context.user_id else {
            return Ok(());
        };

        match self.users.get(user_id).map(|is_admin| *is_admin) {
            Some(true) => Ok(()),
            Some(false) => Err(ServiceError::Unauthorized {
                user_id: user_id.clone(),
                domain: domain.to_string(),
                service: service.to_string(),
            }),
            None => Err(ServiceError::UnknownUser(user_id.clone())),
        }
    }

    pub fn has_service(&self, domain: &str, service: &str) -> bool {
        self.services.contains_key(&format!("{}.{}", domain, service))
    }

    pub fn get_service(&self, domain: &str, service: &str) -> Option<ServiceDescription> {
        self.services
            .get(&format!("{}.{}", domain, service))
            .map(|s| s.description.clone())
    }

    /// All services registered for a domain
    pub fn domain_services(&self, domain: &str) -> Vec<ServiceDescription> {
        self.services
            .iter()
            .filter(|s| s.description.domain == domain)
            .map(|s| s.description.clone())
            .collect()
    }

    #[instrument(skip(self))]
    pub fn unregister(&self, domain: &str, service: &str) -> bool {
        let removed = self
            .services
            .remove(&format!("{}.{}", domain, service))
            .is_some();

        if removed {
            debug!(domain = %domain, service = %service, "Unregistered service");
        }
        removed
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedServiceRegistry = Arc<ServiceRegistry>;
