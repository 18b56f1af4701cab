use rand::Rng;

/// Configuration for [`Client`](crate::Client).
///
/// # Examples
/// ```
/// # use togglet_proxy::ProxyConfig;
/// let config = ProxyConfig::from_api_token("*:production.token").environment("production");
/// ```
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub(crate) api_token: String,
    pub(crate) environment: Option<String>,
    pub(crate) instance_id: String,
}

impl ProxyConfig {
    /// Create a proxy configuration using the specified upstream API token.
    pub fn from_api_token(api_token: impl Into<String>) -> ProxyConfig {
        ProxyConfig {
            api_token: api_token.into(),
            environment: None,
            instance_id: generate_instance_id(),
        }
    }

    /// Set the proxy-wide default environment, used when an evaluation context carries none.
    pub fn environment(mut self, environment: impl Into<String>) -> ProxyConfig {
        self.environment = Some(environment.into());
        self
    }

    /// Override the generated instance identifier reported to the upstream server.
    pub fn instance_id(mut self, instance_id: impl Into<String>) -> ProxyConfig {
        self.instance_id = instance_id.into();
        self
    }
}

/// `"{user}-{hostname}"`, falling back to a random prefix when the username is unavailable.
fn generate_instance_id() -> String {
    let prefix = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| {
            format!(
                "generated-{}-{}",
                rand::thread_rng().gen_range(0..1_000_000),
                std::process::id()
            )
        });
    let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_owned());
    format!("{prefix}-{hostname}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_carries_environment_and_token() {
        let config = ProxyConfig::from_api_token("token").environment("test");
        assert_eq!(config.api_token, "token");
        assert_eq!(config.environment.as_deref(), Some("test"));
        assert!(!config.instance_id.is_empty());
    }

    #[test]
    fn environment_defaults_to_unset() {
        let config = ProxyConfig::from_api_token("token");
        assert_eq!(config.environment, None);
    }
}
