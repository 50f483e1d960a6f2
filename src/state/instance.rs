use std::fmt;
use uuid::Uuid;

const DELIMITER: &str = "@-@";

/// Identity of this running proxy process
///
/// Created once by the composition root and handed to everything that needs
/// it; the id never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrchestrationInstance {
    instance_id: String,
}

impl OrchestrationInstance {
    /// `<host>@-@<pid>@-@<random suffix>`
    pub fn new() -> Self {
        let host = std::env::var("HOSTNAME")
            .ok()
            .filter(|host| !host.trim().is_empty())
            .unwrap_or_else(|| "127.0.0.1".to_string());
        let suffix = Uuid::new_v4().simple().to_string();

        Self {
            instance_id: format!(
                "{}{}{}{}{}",
                host,
                DELIMITER,
                std::process::id(),
                DELIMITER,
                &suffix[..8]
            ),
        }
    }

    pub fn with_id(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }
}

impl Default for OrchestrationInstance {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrchestrationInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.instance_id)
    }
}
