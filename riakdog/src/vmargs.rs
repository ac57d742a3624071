//! Renders the VM arguments file (`vm.args`) from settings.  The directive
//! formatting itself lives in the `erl-args` crate; this module only adds
//! the file-level trailing newline.

use crate::settings::Settings;

pub fn render_vm_args(settings: &Settings) -> String {
    let mut rendered = erl_args::render(&settings.vm_args);
    rendered.push('\n');
    rendered
}

#[cfg(test)]
mod test {
    use super::render_vm_args;
    use crate::layers;
    use erl_args::{ArgValue, Scalar};
    use maplit::btreemap;

    #[test]
    fn defaults_render_sorted_directives() {
        let settings = layers::load(None, None).unwrap();
        let rendered = render_vm_args(&settings);
        assert!(rendered.ends_with('\n'));

        let lines: Vec<&str> = rendered.lines().collect();
        let mut sorted = lines.clone();
        sorted.sort_unstable();
        assert_eq!(lines, sorted);
        assert!(lines.contains(&"-name riak-cs@127.0.0.1"));
        assert!(lines.contains(&"-env ERL_MAX_PORTS 4096"));
    }

    #[test]
    fn override_replaces_directives() {
        let mut settings = layers::load(None, None).unwrap();
        settings.vm_args = btreemap! {
            "-name".to_string() => ArgValue::Scalar(Scalar::Text("riakcs-5".to_string())),
            "-env".to_string() => ArgValue::Env(btreemap! {
                "ERL_MAX_PORTS".to_string() => Scalar::Int(4096),
            }),
        };
        assert_eq!(
            render_vm_args(&settings),
            "-env ERL_MAX_PORTS 4096\n-name riakcs-5\n"
        );
    }
}
