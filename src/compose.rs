//! docker-compose project control for the tower stack.

use std::path::Path;

use tracing::info;

use crate::config::InstallerConfig;
use crate::error::InstallerError;
use crate::executor::{shell_quote, ExecOptions, Executor};

/// Render the compose file used when deploying from prebuilt images.
pub fn render_compose_file(config: &InstallerConfig) -> String {
    let images = &config.images;
    let project = &config.project;
    format!(
        "version: '3'
services:
  prisma:
    image: {prisma_image}
    restart: always
    depends_on:
      - 'postgres'
    ports:
      - '{prisma_port}:{prisma_port}'
    environment:
      PRISMA_CONFIG: |
        port: {prisma_port}
        databases:
          default:
            connector: postgres
            host: postgres
            port: 5432
            user: {db_user}
            password: {db_password}
            rawAccess: true
  postgres:
    image: {postgres_image}
    restart: always
    environment:
      POSTGRES_USER: {db_user}
      POSTGRES_PASSWORD: {db_password}
    volumes:
      - postgres:/var/lib/postgresql/data
  openresty:
    image: {openresty_image}
    restart: always
    ports:
      - '{http_port}:{http_port}'
    environment:
      - NGINX_PORT={http_port}
    volumes:
      - ../server/config/nginx:/etc/nginx/conf.d
      - ../ui/build:/www/tower
  server:
    image: {server_image}
    restart: always
    depends_on:
      - 'prisma'
    ports:
      - '{server_port}:{server_port}'
volumes:
  postgres: ~
",
        prisma_image = images.prisma,
        postgres_image = images.postgres,
        openresty_image = images.openresty,
        server_image = images.server,
        prisma_port = project.prisma_port,
        http_port = project.http_port,
        server_port = project.server_port,
        db_user = project.database_user,
        db_password = project.database_password,
    )
}

/// A docker-compose project bound to an executor.
pub struct Compose<'a> {
    project: &'a str,
    executor: &'a dyn Executor,
}

impl<'a> Compose<'a> {
    /// Bind `project` to `executor`.
    pub fn new(project: &'a str, executor: &'a dyn Executor) -> Self {
        Self { project, executor }
    }

    /// `docker-compose -p <project> -f <file> up -d`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::CommandFailed`] when the containers fail to start.
    pub async fn up_with_file(&self, file: &Path) -> Result<(), InstallerError> {
        let command = format!(
            "docker-compose -p {} -f {} up -d",
            shell_quote(self.project),
            shell_quote(&file.to_string_lossy())
        );
        info!(project = %self.project, file = %file.display(), "starting containers");
        let result = self.executor.execute(&command, ExecOptions::inherit()).await?;
        InstallerError::ensure_success("start tower containers", &result)
    }

    /// Pipe `compose_file` into `docker-compose -p <project> -f - up -d`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::CommandFailed`] when the containers fail to start.
    pub async fn up_from_stdin(&self, compose_file: &str) -> Result<(), InstallerError> {
        let command = format!(
            "docker-compose -p {} -f - up -d",
            shell_quote(self.project)
        );
        info!(project = %self.project, "starting containers from embedded compose file");
        let opts = ExecOptions::inherit().with_stdin(compose_file.as_bytes());
        let result = self.executor.execute(&command, opts).await?;
        InstallerError::ensure_success("start tower containers", &result)
    }

    /// `docker-compose -p <project> down`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::CommandFailed`] when shutdown fails.
    pub async fn down(&self) -> Result<(), InstallerError> {
        let command = format!("docker-compose -p {} down", shell_quote(self.project));
        info!(project = %self.project, "shutting down containers");
        let result = self.executor.execute(&command, ExecOptions::inherit()).await?;
        InstallerError::ensure_success("shut down tower containers", &result)
    }
}
