use crate::user::UserProfile;
use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::time::Duration;

pub const DEMO_LOGIN_LATENCY: Duration = Duration::from_millis(1000);

const DEMO_NAME: &str = "Agent Smith";
const DEMO_AVATAR: &str =
    "https://images.unsplash.com/photo-1535713875002-d1d0cf377fde?q=80&w=100&auto=format&fit=crop";
const DEMO_XP: u32 = 1250;

/// Produces the profile of the user signing in. Logging out needs no provider
/// round trip and is handled by the user store directly.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn login(&self) -> Result<UserProfile>;
}

/// Signs everyone in as the same demo agent after a short delay.
pub struct DemoAuthProvider {
    latency: Duration,
}

impl DemoAuthProvider {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for DemoAuthProvider {
    fn default() -> Self {
        Self::new(DEMO_LOGIN_LATENCY)
    }
}

#[async_trait]
impl AuthProvider for DemoAuthProvider {
    async fn login(&self) -> Result<UserProfile> {
        tokio::time::sleep(self.latency).await;
        Ok(UserProfile::new(DEMO_NAME, DEMO_AVATAR, DEMO_XP))
    }
}
