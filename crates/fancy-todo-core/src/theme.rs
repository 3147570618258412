use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemePreference {
    #[default]
    Light,
    Dark,
}

impl ThemePreference {
    /// Literal written to the theme entry of the store.
    pub fn storage_value(self) -> &'static str {
        match self {
            ThemePreference::Light => "light",
            ThemePreference::Dark => "dark",
        }
    }

    /// Only the exact literal `dark` selects the dark theme.
    pub fn from_storage(raw: &str) -> Self {
        match raw {
            "dark" => ThemePreference::Dark,
            _ => ThemePreference::Light,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ThemePreference::Light => ThemePreference::Dark,
            ThemePreference::Dark => ThemePreference::Light,
        }
    }
}

impl fmt::Display for ThemePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.storage_value())
    }
}

impl FromStr for ThemePreference {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(ThemePreference::Light),
            "dark" => Ok(ThemePreference::Dark),
            other => Err(anyhow!("unknown theme: {other} (expected light or dark)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ThemePreference;

    #[test]
    fn storage_reads_anything_but_dark_as_light() {
        assert_eq!(ThemePreference::from_storage("dark"), ThemePreference::Dark);
        assert_eq!(ThemePreference::from_storage("light"), ThemePreference::Light);
        assert_eq!(ThemePreference::from_storage("Dark"), ThemePreference::Light);
        assert_eq!(ThemePreference::from_storage(""), ThemePreference::Light);
    }

    #[test]
    fn toggling_twice_is_identity() {
        let theme = ThemePreference::Dark;
        assert_eq!(theme.toggled(), ThemePreference::Light);
        assert_eq!(theme.toggled().toggled(), theme);
    }
}
