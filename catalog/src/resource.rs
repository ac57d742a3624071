use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// The kinds of resources a catalog can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Download,
    File,
    Package,
    Service,
    User,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Kind::Download => "download",
            Kind::File => "file",
            Kind::Package => "package",
            Kind::Service => "service",
            Kind::User => "user",
        };
        write!(f, "{}", kind)
    }
}

/// A ResourceId names one resource in a catalog, like `service/riak-cs` or
/// `file//etc/riak-cs/vm.args`.  Ids are unique within a catalog and give
/// edges something stable to point at.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResourceId {
    kind: Kind,
    name: String,
}

impl ResourceId {
    pub fn new<S: Into<String>>(kind: Kind, name: S) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageState {
    Installed,
    Absent,
}

/// A system package, installed from the distro repos or from a local
/// artifact.  The install/remove command lines come from settings so the
/// applier stays package-manager agnostic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Package {
    pub name: String,
    pub state: PackageState,
    /// Local artifact to install from instead of the repos.
    pub source: Option<PathBuf>,
    pub install_commands: Vec<String>,
    pub remove_commands: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileState {
    Present,
    Absent,
}

/// A managed file with fully rendered content; the applier only writes when
/// the content on disk differs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct File {
    pub path: PathBuf,
    pub state: FileState,
    pub content: Option<String>,
    pub owner: Option<String>,
    pub group: Option<String>,
    /// Octal mode string, e.g. "0640".
    pub mode: Option<String>,
}

/// An artifact fetched to a local path and verified against a SHA-256
/// digest before anything is allowed to depend on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Download {
    pub path: PathBuf,
    pub url: String,
    pub sha256: String,
    pub fetch_commands: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Running,
    Stopped,
}

/// A long-running system service.  The command lists hold full command
/// lines; restart commands run when a notifying resource changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Service {
    pub name: String,
    pub state: ServiceState,
    pub enabled: bool,
    pub start_commands: Vec<String>,
    pub stop_commands: Vec<String>,
    pub restart_commands: Vec<String>,
}

/// The system account a service runs as.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub name: String,
    pub system: bool,
    pub home: Option<PathBuf>,
}

/// One typed node in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Download(Download),
    File(File),
    Package(Package),
    Service(Service),
    User(User),
}

impl Resource {
    pub fn kind(&self) -> Kind {
        match self {
            Resource::Download(_) => Kind::Download,
            Resource::File(_) => Kind::File,
            Resource::Package(_) => Kind::Package,
            Resource::Service(_) => Kind::Service,
            Resource::User(_) => Kind::User,
        }
    }

    /// The id a resource is stored under; files and downloads are named by
    /// their target path.
    pub fn id(&self) -> ResourceId {
        let name = match self {
            Resource::Download(d) => d.path.display().to_string(),
            Resource::File(f) => f.path.display().to_string(),
            Resource::Package(p) => p.name.clone(),
            Resource::Service(s) => s.name.clone(),
            Resource::User(u) => u.name.clone(),
        };
        ResourceId::new(self.kind(), name)
    }
}
