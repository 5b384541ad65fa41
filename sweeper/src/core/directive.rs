//! Directive namespace parsing for configuration keys.
//!
//! A key such as `@env.@sweep.CUDA_VISIBLE_DEVICES` is a leading run of
//! `@`-prefixed markers followed by the base name. Markers select compiler
//! behavior; the base name is the emitted flag and the reference target.

use crate::core::value::DistributionKind;

/// Prefix that introduces a directive marker segment.
pub const SIGIL: char = '@';

/// Markers with compiler-defined meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Global,
    Jobs,
    Seed,
    Sweep,
    Uniform,
    LogUniform,
    Env,
    Gin,
    Program,
    Format,
    Load,
    Priority,
    LogPath,
}

impl Marker {
    pub fn from_name(name: &str) -> Option<Self> {
        let marker = match name {
            "global" => Marker::Global,
            "jobs" => Marker::Jobs,
            "seed" => Marker::Seed,
            "sweep" => Marker::Sweep,
            "uniform" => Marker::Uniform,
            "loguniform" => Marker::LogUniform,
            "env" => Marker::Env,
            "gin" => Marker::Gin,
            "program" => Marker::Program,
            "format" => Marker::Format,
            "load" => Marker::Load,
            "priority" => Marker::Priority,
            "log_path" => Marker::LogPath,
            _ => return None,
        };
        Some(marker)
    }

    pub fn name(self) -> &'static str {
        match self {
            Marker::Global => "global",
            Marker::Jobs => "jobs",
            Marker::Seed => "seed",
            Marker::Sweep => "sweep",
            Marker::Uniform => "uniform",
            Marker::LogUniform => "loguniform",
            Marker::Env => "env",
            Marker::Gin => "gin",
            Marker::Program => "program",
            Marker::Format => "format",
            Marker::Load => "load",
            Marker::Priority => "priority",
            Marker::LogPath => "log_path",
        }
    }

    /// The full reserved key for this marker, e.g. `@program`.
    pub fn key(self) -> String {
        format!("{SIGIL}{}", self.name())
    }
}

/// How a directive-bearing key produces its candidate values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sampling {
    Sweep,
    Distribution(DistributionKind),
}

/// A key split into its marker run and base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKey {
    /// Marker names in key order, without the sigil.
    pub markers: Vec<String>,
    /// Residual dotted suffix; empty for a pure directive.
    pub base_name: String,
}

impl ParsedKey {
    pub fn has(&self, marker: Marker) -> bool {
        self.markers.iter().any(|name| name == marker.name())
    }

    /// First sampling marker on the key, if any.
    pub fn sampling(&self) -> Option<Sampling> {
        self.markers
            .iter()
            .find_map(|name| match Marker::from_name(name)? {
                Marker::Sweep => Some(Sampling::Sweep),
                Marker::Uniform => Some(Sampling::Distribution(DistributionKind::Uniform)),
                Marker::LogUniform => Some(Sampling::Distribution(DistributionKind::LogUniform)),
                _ => None,
            })
    }

    /// Token other values use to reference this key.
    ///
    /// `@base_name` normally; the last marker for a pure directive (a bare
    /// `@seed` is referenced as `@seed`). `None` for the empty key.
    pub fn reference_token(&self) -> Option<String> {
        if !self.base_name.is_empty() {
            return Some(format!("{SIGIL}{}", self.base_name));
        }
        self.markers.last().map(|name| format!("{SIGIL}{name}"))
    }

    /// The key with sampling markers removed.
    ///
    /// This is the key a concrete value is stored under after expansion, so
    /// `@env.@sweep.CUDA` becomes `@env.CUDA` and `@sweep.lr` becomes `lr`.
    pub fn residual_key(&self) -> String {
        let mut segments: Vec<String> = self
            .markers
            .iter()
            .filter(|name| {
                !matches!(
                    Marker::from_name(name),
                    Some(Marker::Sweep | Marker::Uniform | Marker::LogUniform)
                )
            })
            .map(|name| format!("{SIGIL}{name}"))
            .collect();
        if !self.base_name.is_empty() {
            segments.push(self.base_name.clone());
        }
        segments.join(".")
    }
}

/// Split `key` into its leading marker run and base name.
pub fn parse_key(key: &str) -> ParsedKey {
    let segments: Vec<&str> = key.split('.').collect();
    let marker_count = segments
        .iter()
        .take_while(|segment| segment.starts_with(SIGIL))
        .count();
    let markers = segments[..marker_count]
        .iter()
        .map(|segment| segment[SIGIL.len_utf8()..].to_string())
        .collect();
    let base_name = segments[marker_count..].join(".");
    ParsedKey { markers, base_name }
}
