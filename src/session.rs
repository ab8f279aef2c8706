use std::path::PathBuf;

/// Environment variable that overrides the token file
pub const TOKEN_ENV_VAR: &str = "ANAFLOW_TOKEN";

/// Read-only access to the persisted bearer credential.
///
/// The token is written by the login tooling (outside this client); anaflow
/// only ever reads it. A missing or empty token means the user is logged out,
/// and clearing a rejected token is likewise not this client's job.
#[derive(Clone)]
pub struct SessionStore {
    token_file: PathBuf,
}

impl SessionStore {
    pub fn new(token_file: PathBuf) -> Self {
        Self { token_file }
    }

    /// Path to the token file backing this store
    pub fn token_file(&self) -> &PathBuf {
        &self.token_file
    }

    /// Load the bearer token, if one is available.
    ///
    /// The `ANAFLOW_TOKEN` environment variable takes precedence over the
    /// token file. Surrounding whitespace is trimmed; an empty token counts
    /// as absent.
    pub fn load(&self) -> Option<String> {
        let env_token = std::env::var(TOKEN_ENV_VAR).ok();
        self.resolve(env_token.as_deref())
    }

    fn resolve(&self, env_token: Option<&str>) -> Option<String> {
        if let Some(token) = env_token {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }

        let content = std::fs::read_to_string(&self.token_file).ok()?;
        let token = content.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }
}
