//! Registry of spawned render server processes.

use crate::error::{ExportError, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// Owns render server processes, at most one live process per port.
///
/// Every process still running is terminated on [`shutdown`](Self::shutdown)
/// or when the registry is dropped.
#[derive(Debug, Default)]
pub struct ServerRegistry {
    servers: BTreeMap<u16, Child>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a server on `port` unless the one spawned earlier is still alive.
    ///
    /// Returns `true` if a new process was spawned.
    pub fn ensure_running(&mut self, port: u16, executable: &Path) -> Result<bool> {
        if self.is_running(port) {
            log::debug!("Render server on port {} is already running", port);
            return Ok(false);
        }
        if !executable.is_file() {
            return Err(ExportError::ServerNotFound(executable.to_path_buf()));
        }

        log::info!("Starting render server {:?} on port {}", executable, port);
        let child = Command::new(executable)
            .arg("-p")
            .arg(port.to_string())
            .stdin(Stdio::null())
            .spawn()?;
        self.servers.insert(port, child);
        Ok(true)
    }

    /// Whether the process spawned for `port` is still alive.
    ///
    /// A process found to have exited is forgotten.
    pub fn is_running(&mut self, port: u16) -> bool {
        let Some(child) = self.servers.get_mut(&port) else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                log::debug!("Render server on port {} exited: {}", port, status);
                self.servers.remove(&port);
                false
            }
            Err(err) => {
                log::warn!("Can't poll render server on port {}: {}", port, err);
                self.servers.remove(&port);
                false
            }
        }
    }

    /// Terminate the server on `port`, if any.
    pub fn stop(&mut self, port: u16) -> Result<()> {
        let Some(mut child) = self.servers.remove(&port) else {
            return Ok(());
        };
        if child.try_wait()?.is_none() {
            log::info!("Stopping render server on port {}", port);
            child.kill()?;
        }
        child.wait()?;
        Ok(())
    }

    /// Terminate every server.
    pub fn shutdown(&mut self) {
        let ports: Vec<u16> = self.servers.keys().copied().collect();
        for port in ports {
            if let Err(err) = self.stop(port) {
                log::error!("Failed to stop render server on port {}: {}", port, err);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

impl Drop for ServerRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
