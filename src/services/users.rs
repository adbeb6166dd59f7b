use async_trait::async_trait;
use uuid::Uuid;

use crate::{errors::ServiceError, models::User};

/// Source of the user a new document is attributed to.
#[async_trait]
pub trait UserService: Send + Sync {
    async fn current_user(&self) -> Result<User, ServiceError>;
}

/// Always answers with the same user. Used by batch tools that act as a
/// configured operator rather than a logged-in session.
#[derive(Debug, Clone)]
pub struct OperatorUserService {
    operator: User,
}

impl OperatorUserService {
    pub fn new(operator: User) -> Self {
        Self { operator }
    }

    pub fn from_config(config: &crate::config::AppConfig) -> Self {
        Self::new(User::new(
            config.operator_id.unwrap_or_else(Uuid::nil),
            config.operator_login.clone(),
        ))
    }
}

#[async_trait]
impl UserService for OperatorUserService {
    async fn current_user(&self) -> Result<User, ServiceError> {
        Ok(self.operator.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[tokio::test]
    async fn operator_defaults_to_nil_id_from_config() {
        let config = AppConfig::new("sqlite::memory:".into(), "test".into());
        let service = OperatorUserService::from_config(&config);

        let user = service.current_user().await.unwrap();
        assert_eq!(user.id, Uuid::nil());
        assert_eq!(user.login, "system");
    }
}
