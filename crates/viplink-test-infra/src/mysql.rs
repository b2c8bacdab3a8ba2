use crate::{Result, TestInfraError};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::ImageExt;
use testcontainers::{ContainerAsync, GenericImage};
use typed_builder::TypedBuilder;

const MYSQL_PORT: u16 = 3306;

/// The server logs "ready for connections" once for its bootstrap instance
/// before restarting, so the first connects may still be refused.
const CONNECT_ATTEMPTS: u32 = 20;
const CONNECT_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, TypedBuilder)]
pub struct MysqlConfig {
    #[builder(default = "8.4".to_string())]
    tag: String,
    #[builder(default = "viplink".to_string())]
    database: String,
    #[builder(default = "viplink".to_string())]
    username: String,
    #[builder(default = "viplink".to_string())]
    password: String,
    #[builder(default = 5)]
    max_connections: u32,
}

impl MysqlConfig {
    /// Environment understood by the official `mysql` image.
    fn env(&self) -> [(&'static str, &str); 4] {
        [
            ("MYSQL_DATABASE", self.database.as_str()),
            ("MYSQL_USER", self.username.as_str()),
            ("MYSQL_PASSWORD", self.password.as_str()),
            ("MYSQL_ROOT_PASSWORD", "root"),
        ]
    }

    fn database_url(&self, host: &str, port: u16) -> String {
        format!(
            "mysql://{}:{}@{host}:{port}/{}",
            self.username, self.password, self.database
        )
    }
}

/// A disposable MySQL server holding the viplink test database.
///
/// The container is removed when the fixture is dropped.
pub struct MySqlServer {
    container: ContainerAsync<GenericImage>,
    config: MysqlConfig,
}

impl MySqlServer {
    pub async fn new(config: MysqlConfig) -> Result<Self> {
        let mut request = GenericImage::new("mysql", config.tag.as_str())
            .with_exposed_port(MYSQL_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stderr("ready for connections"))
            .with_startup_timeout(Duration::from_secs(120));
        for (name, value) in config.env() {
            request = request.with_env_var(name, value);
        }

        let container = request.start().await?;
        Ok(Self { container, config })
    }

    /// Connection string for the test database as seen from the host.
    pub async fn database_url(&self) -> Result<String> {
        let host = self.container.get_host().await?.to_string();
        let port = self.container.get_host_port_ipv4(MYSQL_PORT).await?;
        Ok(self.config.database_url(&host, port))
    }

    /// Opens a pool against the test database, retrying while the server
    /// finishes starting.
    pub async fn pool(&self) -> Result<MySqlPool> {
        let url = self.database_url().await?;
        let mut attempt = 1;
        loop {
            match MySqlPoolOptions::new()
                .max_connections(self.config.max_connections)
                .connect(&url)
                .await
            {
                Ok(pool) => return Ok(pool),
                Err(source) if attempt >= CONNECT_ATTEMPTS => {
                    return Err(TestInfraError::NotReady {
                        attempts: attempt,
                        source,
                    })
                }
                Err(_) => {
                    attempt += 1;
                    tokio::time::sleep(CONNECT_INTERVAL).await;
                }
            }
        }
    }
}
