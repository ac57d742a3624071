//! Walks a catalog in execution order and makes the host match it.
//!
//! Plan mode reports the action list without touching anything.  Apply mode
//! writes files only when their content differs, fetches and verifies
//! artifacts, and runs the configured commands for packages, users, and
//! services.  After the walk, any service notified by a resource that
//! changed has its restart commands run.

use crate::error::{self, Result};
use catalog::{
    Catalog, Download, File, FileState, PackageState, Resource, ResourceId, ServiceState, User,
};
use itertools::join;
use serde::Serialize;
use sha2::{Digest, Sha256};
use snafu::{ensure, OptionExt, ResultExt};
use std::collections::BTreeSet;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::Command;

/// What applying a resource will do (or did).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Delete,
    Fetch,
    Install,
    Remove,
    Start,
    Stop,
    Write,
}

/// One step of a plan, in execution order.
#[derive(Debug, PartialEq, Serialize)]
pub struct Action {
    pub resource: ResourceId,
    pub operation: Operation,
}

/// What an apply changed.
#[derive(Debug, Default, Serialize)]
pub struct Outcome {
    pub changed: BTreeSet<ResourceId>,
    pub refreshed: Vec<ResourceId>,
}

/// The actions an apply would take, without performing any of them.
pub fn plan(catalog: &Catalog) -> Result<Vec<Action>> {
    let mut actions = Vec::new();
    for id in catalog.execution_order().context(error::CatalogSnafu)? {
        let resource = catalog
            .get(&id)
            .context(error::MissingResourceSnafu { id: id.clone() })?;
        let operation = match resource {
            Resource::Download(_) => Operation::Fetch,
            Resource::File(f) => match f.state {
                FileState::Present => Operation::Write,
                FileState::Absent => Operation::Delete,
            },
            Resource::Package(p) => match p.state {
                PackageState::Installed => Operation::Install,
                PackageState::Absent => Operation::Remove,
            },
            Resource::Service(s) => match s.state {
                ServiceState::Running => Operation::Start,
                ServiceState::Stopped => Operation::Stop,
            },
            Resource::User(_) => Operation::Create,
        };
        actions.push(Action {
            resource: id,
            operation,
        });
    }
    Ok(actions)
}

/// The plan as pretty JSON, for scripts and eyeballs alike.
pub fn render_plan(catalog: &Catalog) -> Result<String> {
    let actions = plan(catalog)?;
    serde_json::to_string_pretty(&actions).context(error::PlanJsonSnafu)
}

/// Apply the catalog to the host.
pub fn apply(catalog: &Catalog) -> Result<Outcome> {
    let order = catalog.execution_order().context(error::CatalogSnafu)?;

    let mut outcome = Outcome::default();
    for id in &order {
        let resource = catalog
            .get(id)
            .context(error::MissingResourceSnafu { id: id.clone() })?;
        debug!("Applying '{}'", id);
        let changed = match resource {
            Resource::Download(download) => apply_download(download)?,
            Resource::File(file) => apply_file(file)?,
            Resource::Package(package) => {
                match package.state {
                    PackageState::Installed => run_commands(&package.install_commands)?,
                    PackageState::Absent => run_commands(&package.remove_commands)?,
                }
                false
            }
            Resource::Service(service) => {
                match service.state {
                    ServiceState::Running => run_commands(&service.start_commands)?,
                    ServiceState::Stopped => run_commands(&service.stop_commands)?,
                }
                false
            }
            Resource::User(user) => apply_user(user)?,
        };
        if changed {
            info!("'{}' changed", id);
            outcome.changed.insert(id.clone());
        }
    }
    if !outcome.changed.is_empty() {
        debug!("Changed resources: {}", join(&outcome.changed, ", "));
    }

    // Refresh pass: restart every running service notified by something
    // that changed.
    for id in &order {
        let service = match catalog.get(id) {
            Some(Resource::Service(service)) if service.state == ServiceState::Running => service,
            _ => continue,
        };
        let needs_refresh = catalog
            .notifiers_of(id)
            .iter()
            .any(|notifier| outcome.changed.contains(notifier));
        if needs_refresh {
            info!("Restarting '{}' after config change", id);
            run_commands(&service.restart_commands)?;
            outcome.refreshed.push(id.clone());
        }
    }

    Ok(outcome)
}

/// Returns true if the file changed on disk.
fn apply_file(file: &File) -> Result<bool> {
    match file.state {
        FileState::Present => {
            let content = file
                .content
                .as_ref()
                .context(error::FileContentSnafu { path: &file.path })?;

            if fs::read(&file.path).ok().as_deref() == Some(content.as_bytes()) {
                trace!("'{}' already up to date", file.path.display());
                return Ok(false);
            }

            if let Some(dirname) = file.path.parent() {
                fs::create_dir_all(dirname).context(error::FileWriteSnafu {
                    path: dirname,
                    pathtype: "directory",
                })?;
            }
            fs::write(&file.path, content.as_bytes()).context(error::FileWriteSnafu {
                path: &file.path,
                pathtype: "file",
            })?;

            if let Some(mode) = &file.mode {
                let mode = u32::from_str_radix(mode, 8).context(error::FileModeSnafu {
                    path: &file.path,
                    mode: mode.as_str(),
                })?;
                fs::set_permissions(&file.path, fs::Permissions::from_mode(mode)).context(
                    error::FileWriteSnafu {
                        path: &file.path,
                        pathtype: "file mode",
                    },
                )?;
            }
            if let Some(owner) = &file.owner {
                let group = file.group.as_ref().unwrap_or(owner);
                run_command(&format!(
                    "chown {}:{} {}",
                    owner,
                    group,
                    file.path.display()
                ))?;
            }
            Ok(true)
        }
        FileState::Absent => {
            if !file.path.exists() {
                return Ok(false);
            }
            fs::remove_file(&file.path).context(error::FileRemoveSnafu { path: &file.path })?;
            Ok(true)
        }
    }
}

/// Fetch the artifact unless a verified copy is already in place.
fn apply_download(download: &Download) -> Result<bool> {
    if digest_matches(&download.path, &download.sha256) {
        trace!("'{}' already verified", download.path.display());
        return Ok(false);
    }

    run_commands(&download.fetch_commands)?;

    let data = fs::read(&download.path).context(error::FileReadSnafu {
        path: &download.path,
    })?;
    let actual = format!("{:x}", Sha256::digest(&data));
    ensure!(
        actual == download.sha256.to_lowercase(),
        error::ChecksumMismatchSnafu {
            path: &download.path,
            expected: download.sha256.clone(),
            actual,
        }
    );
    Ok(true)
}

fn digest_matches(path: &Path, expected: &str) -> bool {
    match fs::read(path) {
        Ok(data) => format!("{:x}", Sha256::digest(&data)) == expected.to_lowercase(),
        Err(_) => false,
    }
}

/// Create the account if it doesn't exist yet.
fn apply_user(user: &User) -> Result<bool> {
    let probe = format!("getent passwd {}", user.name);
    let mut probe_parts = probe.split(' ');
    let program = probe_parts
        .next()
        .context(error::InvalidCommandSnafu {
            command: probe.as_str(),
        })?;
    let exists = Command::new(program)
        .args(probe_parts)
        .output()
        .context(error::CommandExecutionFailureSnafu {
            command: probe.as_str(),
        })?
        .status
        .success();
    if exists {
        return Ok(false);
    }

    let mut command = format!("useradd {}", user.name);
    if user.system {
        command = format!("useradd --system {}", user.name);
    }
    if let Some(home) = &user.home {
        command = format!("{} --home-dir {}", command, home.display());
    }
    run_command(&command)?;
    Ok(true)
}

fn run_commands(commands: &[String]) -> Result<()> {
    for command in commands {
        run_command(command)?;
    }
    Ok(())
}

/// Run one command line; the first whitespace-separated token is the
/// program and the rest are its arguments.  A nonzero exit is an error.
fn run_command(command: &str) -> Result<()> {
    debug!("Running command: '{}'", command);
    let mut parts = command.split(' ');
    let program = parts
        .next()
        .context(error::InvalidCommandSnafu { command })?;

    let result = Command::new(program)
        .args(parts)
        .output()
        .context(error::CommandExecutionFailureSnafu { command })?;

    ensure!(
        result.status.success(),
        error::FailedCommandSnafu {
            command,
            stderr: String::from_utf8_lossy(&result.stderr),
        }
    );
    trace!("Command stdout: {}", String::from_utf8_lossy(&result.stdout));
    trace!("Command stderr: {}", String::from_utf8_lossy(&result.stderr));
    Ok(())
}
