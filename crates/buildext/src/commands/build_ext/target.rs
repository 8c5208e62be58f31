use crate::errors::BuildExtError;
use std::fmt;
use std::str::FromStr;

/// Distribution kinds the backend can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildTarget {
    Sdist,
    Wheel,
    Editable,
}

impl BuildTarget {
    /// Name of the backend hook producing this target
    pub fn hook_name(self) -> &'static str {
        match self {
            BuildTarget::Sdist => "build_sdist",
            BuildTarget::Wheel => "build_wheel",
            BuildTarget::Editable => "build_editable",
        }
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildTarget::Sdist => "sdist",
            BuildTarget::Wheel => "wheel",
            BuildTarget::Editable => "editable",
        };
        f.write_str(name)
    }
}

impl FromStr for BuildTarget {
    type Err = BuildExtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sdist" => Ok(BuildTarget::Sdist),
            "wheel" => Ok(BuildTarget::Wheel),
            "editable" => Ok(BuildTarget::Editable),
            other => Err(BuildExtError::Configuration(format!(
                "Unknown target: {}",
                other
            ))),
        }
    }
}

/// Parse a comma-separated target list such as `"wheel,sdist"`
pub fn parse_targets(list: &str) -> Result<Vec<BuildTarget>, BuildExtError> {
    let targets = list
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(BuildTarget::from_str)
        .collect::<Result<Vec<_>, _>>()?;

    if targets.is_empty() {
        return Err(BuildExtError::Configuration(
            "No build target given".to_string(),
        ));
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_target() {
        assert!(parse_targets("wheel").is_ok_and(|t| t == vec![BuildTarget::Wheel]));
    }

    #[test]
    fn test_parse_target_list_keeps_order() {
        let targets = parse_targets("sdist, wheel,editable");
        assert!(targets.is_ok_and(|t| t
            == vec![
                BuildTarget::Sdist,
                BuildTarget::Wheel,
                BuildTarget::Editable
            ]));
    }

    #[test]
    fn test_unknown_target_is_configuration_error() {
        let err = parse_targets("wheel,msi");
        assert!(matches!(err, Err(BuildExtError::Configuration(ref msg)) if msg == "Unknown target: msi"));
    }

    #[test]
    fn test_empty_target_list() {
        assert!(matches!(
            parse_targets(" , "),
            Err(BuildExtError::Configuration(_))
        ));
    }

    #[test]
    fn test_hook_names() {
        assert_eq!(BuildTarget::Wheel.hook_name(), "build_wheel");
        assert_eq!(BuildTarget::Sdist.to_string(), "sdist");
    }
}
