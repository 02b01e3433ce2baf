use std::{fmt, str::FromStr};

use crate::error::PlayerError;

/// Presets de filtro disponibles para `/filter`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPreset {
    BassBoost,
    Nightcore,
    Vaporwave,
    Karaoke,
    Clear,
}

impl FilterPreset {
    pub const ALL: [FilterPreset; 5] = [
        FilterPreset::BassBoost,
        FilterPreset::Nightcore,
        FilterPreset::Vaporwave,
        FilterPreset::Karaoke,
        FilterPreset::Clear,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FilterPreset::BassBoost => "bassboost",
            FilterPreset::Nightcore => "nightcore",
            FilterPreset::Vaporwave => "vaporwave",
            FilterPreset::Karaoke => "karaoke",
            FilterPreset::Clear => "clear",
        }
    }

    /// Cadena de filtros ffmpeg del preset
    pub fn chain(&self) -> FilterChain {
        let tokens: &[&str] = match self {
            FilterPreset::BassBoost => &["bass=g=10"],
            FilterPreset::Nightcore => &["asetrate=48000*1.25"],
            FilterPreset::Vaporwave => &["asetrate=48000*0.8"],
            // Cancela el centro estéreo, donde suele estar la voz. `pan=0.5|...`
            // no es una disposición de canales válida y sumar canales no quita la voz.
            FilterPreset::Karaoke => &["pan=stereo|c0=0.5*c0-0.5*c1|c1=0.5*c1-0.5*c0"],
            FilterPreset::Clear => &[],
        };
        FilterChain::from_tokens(tokens.iter().copied())
    }
}

impl FromStr for FilterPreset {
    type Err = PlayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|preset| preset.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|p| p.name()).collect();
                PlayerError::invalid(format!(
                    "Filtro desconocido `{}`. Disponibles: {}",
                    s.trim(),
                    names.join(", ")
                ))
            })
    }
}

impl fmt::Display for FilterPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lista ordenada de filtros de audio aplicada a la sesión activa.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterChain(Vec<String>);

impl FilterChain {
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tokens.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    /// Argumento para `ffmpeg -af`, o `None` si no hay filtros
    pub fn to_ffmpeg_arg(&self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.join(","))
        }
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("ninguno")
        } else {
            f.write_str(&self.0.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("NightCore".parse::<FilterPreset>(), Ok(FilterPreset::Nightcore));
        assert_eq!(" clear ".parse::<FilterPreset>(), Ok(FilterPreset::Clear));
    }

    #[test]
    fn test_unknown_preset_is_invalid_argument() {
        let err = "echo".parse::<FilterPreset>().unwrap_err();
        assert!(matches!(err, PlayerError::InvalidArgument(_)));
    }

    #[test]
    fn test_preset_chains() {
        assert_eq!(
            FilterPreset::Nightcore.chain().tokens(),
            &["asetrate=48000*1.25".to_string()]
        );
        assert_eq!(
            FilterPreset::BassBoost.chain().to_ffmpeg_arg(),
            Some("bass=g=10".to_string())
        );
        assert!(FilterPreset::Clear.chain().is_empty());
        assert_eq!(FilterPreset::Clear.chain().to_ffmpeg_arg(), None);
    }

    #[test]
    fn test_karaoke_subtracts_channels() {
        let arg = FilterPreset::Karaoke.chain().to_ffmpeg_arg().unwrap();
        assert!(arg.starts_with("pan=stereo|"));
        assert!(arg.contains("0.5*c0-0.5*c1"));
    }
}
