//! Builds the resource catalog for a Riak CS node from resolved settings:
//! the package (repo install or verified artifact download), the rendered
//! configuration files, the service, the account it runs as, and the edges
//! between them.  When `absent` is set the catalog removes all of it
//! instead, with the service stopped before anything is deleted.

use crate::error::{self, Result};
use crate::settings::Settings;
use crate::{render, vmargs};
use catalog::{
    Catalog, Download, File, FileState, Package, PackageState, Resource, Service, ServiceState,
    User,
};
use snafu::{OptionExt, ResultExt};
use std::path::PathBuf;

/// Downloaded artifacts land here before installation.
const DOWNLOAD_DIR: &str = "/tmp";

const APP_CONFIG_FILE: &str = "app.config";
const VM_ARGS_FILE: &str = "vm.args";

pub fn build(settings: &Settings) -> Result<Catalog> {
    if settings.absent {
        decommission(settings)
    } else {
        converge(settings)
    }
}

fn converge(settings: &Settings) -> Result<Catalog> {
    let mut catalog = Catalog::new();

    let user = Resource::User(User {
        name: settings.user.name.clone(),
        system: settings.user.system,
        home: None,
    });
    let user_id = user.id();
    catalog.add(user).context(error::CatalogSnafu)?;

    let (download, package) = installed_package(settings)?;
    let package_id = package.id();
    catalog.add(package).context(error::CatalogSnafu)?;
    if let Some(download) = download {
        let download_id = download.id();
        catalog.add(download).context(error::CatalogSnafu)?;
        catalog
            .require(&download_id, &package_id)
            .context(error::CatalogSnafu)?;
    }

    let app_config = config_file(
        settings.config_dir.join(APP_CONFIG_FILE),
        render::render_app_config(settings)?,
        settings,
    );
    let vm_args = config_file(
        settings.config_dir.join(VM_ARGS_FILE),
        vmargs::render_vm_args(settings),
        settings,
    );
    let service = service_resource(settings, ServiceState::Running, true);
    let service_id = service.id();
    catalog.add(service).context(error::CatalogSnafu)?;

    for file in vec![app_config, vm_args] {
        let file_id = file.id();
        catalog.add(file).context(error::CatalogSnafu)?;
        // The package creates the config directory, so it lands first.
        catalog
            .require(&package_id, &file_id)
            .context(error::CatalogSnafu)?;
        catalog
            .require(&file_id, &service_id)
            .context(error::CatalogSnafu)?;
        if settings.service_autorestart {
            catalog
                .notify(&file_id, &service_id)
                .context(error::CatalogSnafu)?;
        }
    }

    catalog
        .require(&user_id, &service_id)
        .context(error::CatalogSnafu)?;
    catalog
        .require(&package_id, &service_id)
        .context(error::CatalogSnafu)?;

    Ok(catalog)
}

fn decommission(settings: &Settings) -> Result<Catalog> {
    let mut catalog = Catalog::new();

    let service = service_resource(settings, ServiceState::Stopped, false);
    let service_id = service.id();
    catalog.add(service).context(error::CatalogSnafu)?;

    let package = Resource::Package(Package {
        name: settings.package.name.clone(),
        state: PackageState::Absent,
        source: None,
        install_commands: vec![],
        remove_commands: remove_commands(&settings.package.name),
    });
    let package_id = package.id();
    catalog.add(package).context(error::CatalogSnafu)?;

    for name in [APP_CONFIG_FILE, VM_ARGS_FILE].iter() {
        let file = Resource::File(File {
            path: settings.config_dir.join(name),
            state: FileState::Absent,
            content: None,
            owner: None,
            group: None,
            mode: None,
        });
        let file_id = file.id();
        catalog.add(file).context(error::CatalogSnafu)?;
        // Stop the service before deleting its configuration.
        catalog
            .require(&service_id, &file_id)
            .context(error::CatalogSnafu)?;
        catalog
            .require(&file_id, &package_id)
            .context(error::CatalogSnafu)?;
    }

    catalog
        .require(&service_id, &package_id)
        .context(error::CatalogSnafu)?;

    Ok(catalog)
}

/// The package resource for an install, plus the artifact download when the
/// package doesn't come from the distro repos.
fn installed_package(settings: &Settings) -> Result<(Option<Resource>, Resource)> {
    let pkg = &settings.package;
    if pkg.use_repos {
        let reference = match &pkg.version {
            Some(version) => format!("{}={}", pkg.name, version),
            None => pkg.name.clone(),
        };
        let package = Resource::Package(Package {
            name: pkg.name.clone(),
            state: PackageState::Installed,
            source: None,
            install_commands: vec![format!("apt-get -q -y install {}", reference)],
            remove_commands: remove_commands(&pkg.name),
        });
        Ok((None, package))
    } else {
        let version = pkg
            .version
            .as_ref()
            .context(error::IncompleteDownloadSnafu)?;
        let url = pkg
            .download_url
            .as_ref()
            .context(error::IncompleteDownloadSnafu)?;
        let hash = pkg
            .download_hash
            .as_ref()
            .context(error::IncompleteDownloadSnafu)?;

        let path = PathBuf::from(format!("{}/{}-{}.deb", DOWNLOAD_DIR, pkg.name, version));
        let download = Resource::Download(Download {
            path: path.clone(),
            url: url.clone(),
            sha256: hash.clone(),
            fetch_commands: vec![format!("curl -sSfL -o {} {}", path.display(), url)],
        });
        let package = Resource::Package(Package {
            name: pkg.name.clone(),
            state: PackageState::Installed,
            source: Some(path.clone()),
            install_commands: vec![format!("dpkg -i {}", path.display())],
            remove_commands: remove_commands(&pkg.name),
        });
        Ok((Some(download), package))
    }
}

fn remove_commands(name: &str) -> Vec<String> {
    vec![format!("apt-get -q -y remove {}", name)]
}

fn config_file(path: PathBuf, content: String, settings: &Settings) -> Resource {
    Resource::File(File {
        path,
        state: FileState::Present,
        content: Some(content),
        owner: Some(settings.user.name.clone()),
        group: Some(settings.user.name.clone()),
        mode: Some("0640".to_string()),
    })
}

fn service_resource(settings: &Settings, state: ServiceState, enabled: bool) -> Resource {
    let unit = format!("{}.service", settings.service.name);
    let (start_commands, stop_commands) = match state {
        ServiceState::Running => (
            vec![
                format!("systemctl enable {}", unit),
                format!("systemctl start {}", unit),
            ],
            vec![],
        ),
        ServiceState::Stopped => (
            vec![],
            vec![
                format!("systemctl stop {}", unit),
                format!("systemctl disable {}", unit),
            ],
        ),
    };
    Resource::Service(Service {
        name: settings.service.name.clone(),
        state,
        enabled,
        start_commands,
        stop_commands,
        restart_commands: settings.service.restart_commands.clone(),
    })
}

#[cfg(test)]
mod test {
    use super::build;
    use crate::error::Error;
    use crate::layers;
    use crate::settings::Settings;
    use catalog::{EdgeKind, FileState, Kind, PackageState, Resource, ResourceId, ServiceState};

    fn defaults() -> Settings {
        layers::load(None, None).unwrap()
    }

    fn package_id(name: &str) -> ResourceId {
        ResourceId::new(Kind::Package, name)
    }

    fn service_id() -> ResourceId {
        ResourceId::new(Kind::Service, "riak-cs")
    }

    fn file_id(path: &str) -> ResourceId {
        ResourceId::new(Kind::File, path)
    }

    #[test]
    fn baseline_installs_and_runs_the_service() {
        let catalog = build(&defaults()).unwrap();

        match catalog.get(&package_id("riak-cs")).unwrap() {
            Resource::Package(p) => {
                assert_eq!(p.state, PackageState::Installed);
                assert!(p.source.is_none());
            }
            other => panic!("unexpected resource {:?}", other),
        }

        match catalog.get(&service_id()).unwrap() {
            Resource::Service(s) => {
                assert_eq!(s.state, ServiceState::Running);
                assert!(s.enabled);
            }
            other => panic!("unexpected resource {:?}", other),
        }

        for path in &["/etc/riak-cs/app.config", "/etc/riak-cs/vm.args"] {
            match catalog.get(&file_id(path)).unwrap() {
                Resource::File(f) => {
                    assert_eq!(f.state, FileState::Present);
                    assert!(f.content.is_some());
                }
                other => panic!("unexpected resource {:?}", other),
            }
        }

        assert!(catalog.get(&ResourceId::new(Kind::User, "riak")).is_some());
    }

    #[test]
    fn config_files_notify_the_service() {
        let catalog = build(&defaults()).unwrap();
        let notifiers = catalog.notifiers_of(&service_id());
        assert!(notifiers.contains(&&file_id("/etc/riak-cs/vm.args")));
        assert!(notifiers.contains(&&file_id("/etc/riak-cs/app.config")));
    }

    #[test]
    fn no_autorestart_drops_notify_edges() {
        let mut settings = defaults();
        settings.service_autorestart = false;
        let catalog = build(&settings).unwrap();

        assert!(catalog.notifiers_of(&service_id()).is_empty());
        // The ordering edges remain; only the refresh behavior goes away.
        assert!(catalog.edges().iter().any(|e| {
            e.kind == EdgeKind::Require
                && e.before == file_id("/etc/riak-cs/vm.args")
                && e.after == service_id()
        }));
    }

    #[test]
    fn custom_package_downloads_artifact() {
        let mut settings = defaults();
        settings.package.name = "custom_riak-cs".to_string();
        settings.package.version = Some("1.2.0".to_string());
        settings.package.use_repos = false;
        settings.package.download_url =
            Some("https://example.com/custom_riak-cs-1.2.0.deb".to_string());
        settings.package.download_hash = Some("abcd".to_string());

        let catalog = build(&settings).unwrap();
        let download_id = ResourceId::new(Kind::Download, "/tmp/custom_riak-cs-1.2.0.deb");
        match catalog.get(&download_id).unwrap() {
            Resource::Download(d) => {
                assert_eq!(d.sha256, "abcd");
                assert_eq!(d.url, "https://example.com/custom_riak-cs-1.2.0.deb");
            }
            other => panic!("unexpected resource {:?}", other),
        }

        match catalog.get(&package_id("custom_riak-cs")).unwrap() {
            Resource::Package(p) => {
                assert_eq!(
                    p.source.as_deref(),
                    Some(std::path::Path::new("/tmp/custom_riak-cs-1.2.0.deb"))
                );
                assert_eq!(p.install_commands, vec!["dpkg -i /tmp/custom_riak-cs-1.2.0.deb"]);
            }
            other => panic!("unexpected resource {:?}", other),
        }

        // The artifact is fetched and verified before the package installs.
        assert!(catalog.edges().iter().any(|e| {
            e.kind == EdgeKind::Require
                && e.before == download_id
                && e.after == package_id("custom_riak-cs")
        }));
    }

    #[test]
    fn download_needs_complete_settings() {
        let mut settings = defaults();
        settings.package.use_repos = false;
        let err = build(&settings).unwrap_err();
        assert!(matches!(err, Error::IncompleteDownload { .. }));
    }

    #[test]
    fn decommission_removes_everything() {
        let mut settings = defaults();
        settings.absent = true;
        let catalog = build(&settings).unwrap();

        match catalog.get(&package_id("riak-cs")).unwrap() {
            Resource::Package(p) => assert_eq!(p.state, PackageState::Absent),
            other => panic!("unexpected resource {:?}", other),
        }
        match catalog.get(&service_id()).unwrap() {
            Resource::Service(s) => {
                assert_eq!(s.state, ServiceState::Stopped);
                assert!(!s.enabled);
            }
            other => panic!("unexpected resource {:?}", other),
        }
        for path in &["/etc/riak-cs/app.config", "/etc/riak-cs/vm.args"] {
            match catalog.get(&file_id(path)).unwrap() {
                Resource::File(f) => assert_eq!(f.state, FileState::Absent),
                other => panic!("unexpected resource {:?}", other),
            }
        }

        // The service stops before its package is removed.
        let order = catalog.execution_order().unwrap();
        let position = |id: &ResourceId| order.iter().position(|o| o == id).unwrap();
        assert!(position(&service_id()) < position(&package_id("riak-cs")));
    }

    #[test]
    fn execution_order_is_valid_and_stable() {
        let catalog = build(&defaults()).unwrap();
        let order = catalog.execution_order().unwrap();
        assert_eq!(order.len(), catalog.len());
        assert_eq!(order, build(&defaults()).unwrap().execution_order().unwrap());
    }
}
