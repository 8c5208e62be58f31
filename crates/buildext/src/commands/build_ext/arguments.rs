//! Options of the `build-ext` command
//!
//! Options are declared once in [`BUILD_OPTIONS`]; the clap arguments and the
//! validation mapping are both generated from that table.

use super::target::{parse_targets, BuildTarget};
use crate::errors::BuildExtError;
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// Boolean switch, present or absent
    Flag,
    /// Option taking a single string value
    Value,
}

/// One entry of the option registration table
#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    /// Long flag, e.g. `keep-tmp`
    pub name: &'static str,
    /// Field of [`BuildArguments`] the option fills
    pub field: &'static str,
    pub shortcut: Option<char>,
    pub kind: OptionKind,
    pub default: Option<&'static str>,
    pub description: &'static str,
}

pub const BUILD_OPTIONS: &[OptionSpec] = &[
    OptionSpec {
        name: "keep-tmp",
        field: "keep_tmp",
        shortcut: Some('k'),
        kind: OptionKind::Flag,
        default: None,
        description: "Whether to keep temporary directory.",
    },
    OptionSpec {
        name: "target",
        field: "target",
        shortcut: Some('t'),
        kind: OptionKind::Value,
        default: Some(DEFAULT_TARGET),
        description: "Comma-separated distributions to build (wheel, sdist, editable).",
    },
];

const DEFAULT_TARGET: &str = "wheel";

impl OptionSpec {
    /// Key used in the validation mapping: the shortcut if any, else the field
    pub fn key(&self) -> String {
        self.shortcut
            .map_or_else(|| self.field.to_string(), |c| c.to_string())
    }

    pub fn to_arg(&self) -> Arg {
        let mut arg = Arg::new(self.field).long(self.name).help(self.description);
        if let Some(shortcut) = self.shortcut {
            arg = arg.short(shortcut);
        }
        match self.kind {
            OptionKind::Flag => arg.action(ArgAction::SetTrue),
            OptionKind::Value => {
                let arg = arg.action(ArgAction::Set).value_name("VALUE");
                match self.default {
                    Some(default) => arg.default_value(default),
                    None => arg,
                }
            }
        }
    }

    fn resolve(&self, matches: &ArgMatches) -> Option<Value> {
        match self.kind {
            OptionKind::Flag => Some(Value::Bool(matches.get_flag(self.field))),
            OptionKind::Value => matches
                .get_one::<String>(self.field)
                .map(|value| Value::String(value.clone())),
        }
    }
}

/// clap definition of a command exposing `options`
pub fn command_definition(name: &'static str, options: &[OptionSpec]) -> Command {
    Command::new(name)
        .about("Build native extensions with scikit-build-core and copy them into the project")
        .args(options.iter().map(OptionSpec::to_arg))
}

/// Resolve every declared option from parsed CLI matches
pub fn collect_option_values(options: &[OptionSpec], matches: &ArgMatches) -> Map<String, Value> {
    options
        .iter()
        .filter_map(|option| option.resolve(matches).map(|value| (option.key(), value)))
        .collect()
}

/// Validated arguments of a `build-ext` run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildArguments {
    /// Whether to keep temporary directory.
    #[serde(default, alias = "k")]
    pub keep_tmp: bool,

    #[serde(default = "default_target", alias = "t")]
    pub target: String,
}

fn default_target() -> String {
    DEFAULT_TARGET.to_string()
}

impl Default for BuildArguments {
    fn default() -> Self {
        Self {
            keep_tmp: false,
            target: default_target(),
        }
    }
}

impl BuildArguments {
    /// Validate a mapping keyed by option shortcut or field name
    pub fn validate(values: Map<String, Value>) -> Result<Self, BuildExtError> {
        serde_json::from_value(Value::Object(values))
            .map_err(|e| BuildExtError::Validation(e.to_string()))
    }

    pub fn from_matches(matches: &ArgMatches) -> Result<Self, BuildExtError> {
        Self::validate(collect_option_values(BUILD_OPTIONS, matches))
    }

    pub fn targets(&self) -> Result<Vec<BuildTarget>, BuildExtError> {
        parse_targets(&self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(args: &[&str]) -> Result<BuildArguments, BuildExtError> {
        let matches = command_definition("build-ext", BUILD_OPTIONS)
            .try_get_matches_from(args)
            .map_err(|e| BuildExtError::Validation(e.to_string()))?;
        BuildArguments::from_matches(&matches)
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_defaults() {
        assert!(parse(&["build-ext"]).is_ok_and(|args| args == BuildArguments::default()));
    }

    #[test]
    fn test_keep_tmp_long_and_short() {
        assert!(parse(&["build-ext", "--keep-tmp"]).is_ok_and(|args| args.keep_tmp));
        assert!(parse(&["build-ext", "-k"]).is_ok_and(|args| args.keep_tmp));
    }

    #[test]
    fn test_target_option() {
        let args = parse(&["build-ext", "-t", "wheel,sdist"]);
        assert!(args.is_ok_and(|a| a.targets().is_ok_and(|t| t
            == vec![BuildTarget::Wheel, BuildTarget::Sdist])));
    }

    #[test]
    fn test_values_keyed_by_shortcut() {
        let Ok(matches) =
            command_definition("build-ext", BUILD_OPTIONS).try_get_matches_from(["build-ext", "-k"])
        else {
            return;
        };
        let values = collect_option_values(BUILD_OPTIONS, &matches);
        assert_eq!(values.get("k"), Some(&Value::Bool(true)));
        assert_eq!(values.get("t"), Some(&Value::String("wheel".to_string())));
        assert!(!values.contains_key("keep_tmp"));
    }

    #[test]
    fn test_field_name_key_without_shortcut() {
        let spec = OptionSpec {
            name: "keep-tmp",
            field: "keep_tmp",
            shortcut: None,
            kind: OptionKind::Flag,
            default: None,
            description: "",
        };
        assert_eq!(spec.key(), "keep_tmp");
        assert!(BuildArguments::validate(object(json!({"keep_tmp": true})))
            .is_ok_and(|args| args.keep_tmp));
    }

    #[test]
    fn test_wrong_type_is_validation_error() {
        let result = BuildArguments::validate(object(json!({"k": "yes"})));
        assert!(matches!(result, Err(BuildExtError::Validation(_))));
    }

    #[test]
    fn test_unknown_option_is_validation_error() {
        let result = BuildArguments::validate(object(json!({"k": false, "jobs": 4})));
        assert!(matches!(result, Err(BuildExtError::Validation(_))));
    }

    #[test]
    fn test_unknown_target_passes_validation_but_not_parsing() {
        let args = parse(&["build-ext", "--target", "msi"]);
        assert!(args.is_ok_and(|a| matches!(a.targets(), Err(BuildExtError::Configuration(_)))));
    }
}
