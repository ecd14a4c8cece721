//! Target machine descriptors resolved from the FROM directive.

use serde::Serialize;

pub const DEFAULT_SSH_PORT: u16 = 22;

/// The address token naming the implicit local machine.
pub const LOCAL_ADDRESS: &str = "local";

/// One target machine. A script may resolve to many; each is executed
/// independently, duplicates included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Machine {
    host: String,
    port: u16,
}

impl Machine {
    /// The implicit local machine used when FROM is absent.
    pub fn local() -> Self {
        Self {
            host: LOCAL_ADDRESS.to_string(),
            port: DEFAULT_SSH_PORT,
        }
    }

    /// Parses a `host[:port]` token. The literal `local` selects direct
    /// local access; anything else is a remote address with default port 22.
    pub fn parse(token: &str) -> Result<Self, String> {
        let token = token.trim();
        if token.is_empty() {
            return Err("empty machine address".to_string());
        }
        if token == LOCAL_ADDRESS {
            return Ok(Self::local());
        }

        match token.rsplit_once(':') {
            Some((host, port)) => {
                if host.is_empty() {
                    return Err(format!("'{token}' has no host"));
                }
                let port = port
                    .parse::<u16>()
                    .map_err(|_| format!("'{port}' is not a valid port"))?;
                Ok(Self {
                    host: host.to_string(),
                    port,
                })
            }
            None => Ok(Self {
                host: token.to_string(),
                port: DEFAULT_SSH_PORT,
            }),
        }
    }

    pub fn is_local(&self) -> bool {
        self.host == LOCAL_ADDRESS
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Canonical address: `host:port` for remote machines, `local` for the
    /// local machine.
    pub fn address(&self) -> String {
        if self.is_local() {
            LOCAL_ADDRESS.to_string()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Filesystem-safe directory name for this machine under the workdir.
    pub fn dir_name(&self) -> String {
        sanitize(&self.address())
    }
}

/// Maps an address to a single valid path segment: anything outside
/// `[A-Za-z0-9._-]` (notably the `:` in `host:port`) becomes `_`.
pub fn sanitize(address: &str) -> String {
    address
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-' => c,
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_with_default_port() {
        let m = Machine::parse("10.0.0.1").unwrap();
        assert_eq!(m.host(), "10.0.0.1");
        assert_eq!(m.port(), DEFAULT_SSH_PORT);
        assert_eq!(m.address(), "10.0.0.1:22");
    }

    #[test]
    fn parses_explicit_port() {
        let m = Machine::parse("node-a:2222").unwrap();
        assert_eq!(m.address(), "node-a:2222");
        assert!(!m.is_local());
    }

    #[test]
    fn local_token_is_local_machine() {
        let m = Machine::parse("local").unwrap();
        assert!(m.is_local());
        assert_eq!(m.address(), "local");
        assert_eq!(m.dir_name(), "local");
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(Machine::parse("").is_err());
        assert!(Machine::parse("host:port").is_err());
        assert!(Machine::parse(":22").is_err());
        assert!(Machine::parse("host:70000").is_err());
    }

    #[test]
    fn sanitize_makes_single_segment() {
        assert_eq!(sanitize("10.0.0.1:22"), "10.0.0.1_22");
        assert_eq!(sanitize("node/a b"), "node_a_b");
        assert_eq!(sanitize("local"), "local");
    }
}
