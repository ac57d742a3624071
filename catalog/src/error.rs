use crate::resource::ResourceId;
use snafu::Snafu;

/// Potential errors while building or ordering a catalog
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Resource '{}' is already in the catalog", id))]
    DuplicateResource { id: ResourceId },

    #[snafu(display("Edge endpoint '{}' is not in the catalog", id))]
    UnknownResource { id: ResourceId },

    #[snafu(display("Resource '{}' can't be ordered against itself", id))]
    SelfEdge { id: ResourceId },

    #[snafu(display("Dependency cycle involving: {}", ids.join(", ")))]
    DependencyCycle { ids: Vec<String> },
}
