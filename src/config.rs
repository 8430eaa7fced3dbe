use clap::Parser;

pub const DEFAULT_ADDR: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;

/// Where the server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: String,
    /// `0` lets the OS choose.
    pub port: u16,
}

/// Accumulates optional values and produces a config.
#[derive(Debug)]
pub struct ServerConfigBuilder {
    addr: String,
    port: u16,
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder {
            addr: DEFAULT_ADDR.to_string(),
            port: DEFAULT_PORT,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ServerConfigBuilder {
    pub fn addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn build(self) -> ServerConfig {
        ServerConfig {
            addr: self.addr,
            port: self.port,
        }
    }
}

/// Multi-user line-oriented chat server.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// Host or IP to bind.
    #[arg(long, env = "CHAT_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: String,

    /// Port to bind (0 for auto-assign).
    #[arg(long, env = "CHAT_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig::builder().addr(args.addr).port(args.port).build()
    }
}
