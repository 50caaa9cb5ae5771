// src/argv.rs

//! Splitting the raw command line into launcher flags and module arguments.
//!
//! This is a positional heuristic, not a schema-aware parser:
//! - a token starting with `-` is a launcher flag;
//! - a flag without `=` also swallows the following token as its value;
//! - the first token that is not a flag starts the module arguments, and it
//!   and everything after it are passed through verbatim.
//!
//! Because of the second rule a boolean flag placed right before the module
//! name swallows the module name. Use `--flag=value` forms to avoid that.

/// Split `args` (program name already removed) into
/// `(launcher_args, module_args)`.
pub fn split_argv<I, S>(args: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut launcher_args = Vec::new();
    let mut module_args = Vec::new();

    let mut args = args.into_iter().map(Into::into);

    while let Some(arg) = args.next() {
        if !arg.starts_with('-') {
            module_args.push(arg);
            module_args.extend(args);
            break;
        }

        let takes_value = !arg.contains('=');
        launcher_args.push(arg);

        if takes_value {
            if let Some(value) = args.next() {
                launcher_args.push(value);
            }
        }
    }

    (launcher_args, module_args)
}

#[cfg(test)]
mod tests {
    use super::split_argv;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flag_with_value_then_module() {
        let (launcher, module) = split_argv(["-p", "3", "mymodule", "a", "b"]);
        assert_eq!(launcher, strings(&["-p", "3"]));
        assert_eq!(module, strings(&["mymodule", "a", "b"]));
    }

    #[test]
    fn bare_module_name() {
        let (launcher, module) = split_argv(["mymodule"]);
        assert!(launcher.is_empty());
        assert_eq!(module, strings(&["mymodule"]));
    }

    #[test]
    fn inline_value_consumes_nothing_extra() {
        let (launcher, module) = split_argv(["-p=3", "mymodule"]);
        assert_eq!(launcher, strings(&["-p=3"]));
        assert_eq!(module, strings(&["mymodule"]));
    }

    #[test]
    fn module_flags_are_passed_through_verbatim() {
        let (launcher, module) =
            split_argv(["--processes", "2", "worker", "--verbose", "-x", "1"]);
        assert_eq!(launcher, strings(&["--processes", "2"]));
        assert_eq!(module, strings(&["worker", "--verbose", "-x", "1"]));
    }

    #[test]
    fn only_flags_leaves_module_args_empty() {
        let (launcher, module) = split_argv(["--log-level=debug", "-p", "2"]);
        assert_eq!(launcher, strings(&["--log-level=debug", "-p", "2"]));
        assert!(module.is_empty());
    }

    #[test]
    fn trailing_flag_without_value() {
        let (launcher, module) = split_argv(["-p"]);
        assert_eq!(launcher, strings(&["-p"]));
        assert!(module.is_empty());
    }

    #[test]
    fn flag_without_equals_swallows_the_module_name() {
        let (launcher, module) = split_argv(["--verbose", "mymodule", "a"]);
        assert_eq!(launcher, strings(&["--verbose", "mymodule"]));
        assert_eq!(module, strings(&["a"]));
    }

    #[test]
    fn empty_input() {
        let (launcher, module) = split_argv(Vec::<String>::new());
        assert!(launcher.is_empty());
        assert!(module.is_empty());
    }
}
