/*!
This library renders the arguments file read by the Erlang VM at service
startup (`vm.args`).  The input is a mapping of flag names to values, where a
value is either a scalar or, for flags like `-env`, a nested mapping of
environment variable names to scalars.  The output is one directive per line,
with the lines sorted so the rendered file is stable across runs.
*/

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// One arguments file's worth of directives, keyed by flag name.  Using an
/// ordered map means a flag can only be given once.
pub type ArgumentSet = BTreeMap<String, ArgValue>;

/// Environment variables set through the arguments file, for example under
/// the `-env` flag.
pub type EnvVars = BTreeMap<String, Scalar>;

/// The value of a single flag.  Only one level of nesting exists; there is
/// no way to express a mapping inside an `Env` mapping, so `render` can't be
/// handed malformed input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Scalar(Scalar),
    Env(EnvVars),
}

/// A scalar directive value; rendered literally, with no quoting or
/// escaping.  Callers are responsible for supplying values that need none.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(n) => write!(f, "{}", n),
            Scalar::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Render an `ArgumentSet` as the text of an arguments file.
///
/// Each scalar-valued flag becomes one `<flag> <value>` line; each `Env`
/// entry becomes one `<flag> <name> <value>` line per variable.  Lines are
/// sorted by their full rendered text and joined with newlines, with no
/// trailing newline.  Output is byte-identical across invocations.
pub fn render(args: &ArgumentSet) -> String {
    let mut lines = Vec::new();
    for (flag, value) in args {
        match value {
            ArgValue::Scalar(scalar) => lines.push(format!("{} {}", flag, scalar)),
            ArgValue::Env(vars) => {
                for (name, scalar) in vars {
                    lines.push(format!("{} {} {}", flag, name, scalar));
                }
            }
        }
    }
    lines.sort_unstable();
    lines.join("\n")
}
