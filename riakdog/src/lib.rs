/*!
# Background

riakdog manages the front-end component of a Riak CS node.  It resolves the
host's settings from layered TOML sources, renders the service's
configuration files (`app.config` from a template, `vm.args` from the
argument formatter), and compiles the result into a typed resource catalog:
the package, the rendered files, the service, the account it runs as, and
the edges between them.  The applier walks that catalog in dependency order,
either reporting what it would do (plan) or converging the host (apply),
restarting the service when a configuration file it was notified about
changed.

Setting `absent = true` in the settings turns the catalog inside out: the
service is stopped and disabled, and the configuration files and package are
removed.
*/

#[macro_use]
extern crate log;

pub mod apply;
pub mod error;
pub mod layers;
pub mod render;
pub mod resources;
pub mod settings;
pub mod vmargs;

pub use error::Error;
