//! HDFury model definitions.
//!
//! Each supported product family is described by a [`ModelConfig`] that
//! captures its default TCP port, input count, enumerated mode lists,
//! capability flags, and the [`Dialect`] of the text protocol it speaks.
//!
//! All families share the same `\r\n`-terminated ASCII transport, but the
//! command vocabulary drifts between them: the VERTEX selects inputs by
//! name (`top`/`bot`) while everything else uses numeric indices, the
//! VERTEX spells EDID audio as one word, the ARCANA2 says `scalemode`
//! instead of `scale`, and so on. Those differences live in the dialect
//! table so command builders never branch on the model identifier.
//!
//! | Model       | Port | Inputs | Sources        | Extras                    |
//! |-------------|------|--------|----------------|---------------------------|
//! | VRRooM      | 2222 | 4      | `inseltx0 n`   | 4 EDID slots              |
//! | VERTEX2     | 2220 | 4      | `inseltx0 n`   | 2-output matrix           |
//! | VERTEX      | 2220 | 2      | `input top/bot`| 2-output matrix           |
//! | DIVA        | 2210 | 4      | `inseltx0 n`   | LED modes and brightness  |
//! | Maestro     | 2200 | 4      | `inseltx0 n`   | Audio delay               |
//! | ARCANA2     | 2222 | 1      | none           | Audio modes, scale modes  |
//! | Dr.HDMI 8K  | 2201 | 1      | none           | 8 EDID slots              |

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Identifier of an HDFury product family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelId {
    Vrroom,
    Vertex2,
    Vertex,
    Diva,
    Maestro,
    Arcana2,
    Dr8k,
}

impl ModelId {
    /// Every known family, in registry order.
    pub const ALL: [ModelId; 7] = [
        ModelId::Vrroom,
        ModelId::Vertex2,
        ModelId::Vertex,
        ModelId::Diva,
        ModelId::Maestro,
        ModelId::Arcana2,
        ModelId::Dr8k,
    ];

    /// The family used when a configuration names an unknown model.
    pub const DEFAULT: ModelId = ModelId::Vrroom;

    /// Machine-readable identifier as stored in device configurations.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::Vrroom => "vrroom",
            ModelId::Vertex2 => "vertex2",
            ModelId::Vertex => "vertex",
            ModelId::Diva => "diva",
            ModelId::Maestro => "maestro",
            ModelId::Arcana2 => "arcana2",
            ModelId::Dr8k => "dr8k",
        }
    }

    /// Resolve an identifier, falling back to [`ModelId::DEFAULT`] for
    /// anything unrecognised.
    pub fn resolve(id: &str) -> ModelId {
        id.parse().unwrap_or_else(|_| {
            tracing::warn!(model_id = %id, "unknown model id, using default family");
            ModelId::DEFAULT
        })
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown model identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModelError(String);

impl fmt::Display for ParseModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown model: '{}'", self.0)
    }
}

impl std::error::Error for ParseModelError {}

impl FromStr for ModelId {
    type Err = ParseModelError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vrroom" => Ok(ModelId::Vrroom),
            "vertex2" => Ok(ModelId::Vertex2),
            "vertex" => Ok(ModelId::Vertex),
            "diva" => Ok(ModelId::Diva),
            "maestro" => Ok(ModelId::Maestro),
            "arcana2" => Ok(ModelId::Arcana2),
            "dr8k" => Ok(ModelId::Dr8k),
            _ => Err(ParseModelError(s.to_string())),
        }
    }
}

/// How a family selects its active input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStyle {
    /// No selectable inputs.
    None,
    /// `set <verb> <n>` with the trailing digits of `"HDMI n"`.
    Indexed { verb: &'static str },
    /// `set <verb> top|bot` for two-input switchers.
    TopBottom { verb: &'static str },
}

/// How a family addresses a matrix output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixStyle {
    /// No matrix routing.
    None,
    /// `set top|bot <source>`.
    NamedOutputs,
    /// `set inseltx<n> <source>`.
    IndexedOutputs,
}

/// Per-family command vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub source: SourceStyle,
    /// Verb for EDID audio selection (`"edid audio"` or `"edidaudio"`).
    pub edid_audio_verb: &'static str,
    /// Verb for the video scaler (`"scale"` or `"scalemode"`).
    pub scale_verb: &'static str,
    pub matrix: MatrixStyle,
    /// Upper bound for each LED colour-channel gain.
    pub led_gain_max: i32,
}

const STANDARD_DIALECT: Dialect = Dialect {
    source: SourceStyle::Indexed { verb: "inseltx0" },
    edid_audio_verb: "edid audio",
    scale_verb: "scale",
    matrix: MatrixStyle::None,
    led_gain_max: 31,
};

/// Static model definition for an HDFury device.
///
/// Empty mode lists mean the family does not offer that setting at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub id: ModelId,
    /// Human-readable model name (e.g. "VRRooM").
    pub display_name: &'static str,
    /// Factory TCP control port.
    pub default_port: u16,
    pub input_count: u8,
    pub edid_modes: &'static [&'static str],
    pub edid_audio_sources: &'static [&'static str],
    pub hdcp_modes: &'static [&'static str],
    pub earc_force_modes: &'static [&'static str],
    pub color_space_modes: &'static [&'static str],
    pub deep_color_modes: &'static [&'static str],
    pub output_resolutions: &'static [&'static str],
    pub scale_modes: &'static [&'static str],
    pub audio_modes: &'static [&'static str],
    pub hdr_custom_support: bool,
    pub hdr_disable_support: bool,
    pub cec_support: bool,
    pub oled_support: bool,
    pub autoswitch_support: bool,
    pub audio_delay_support: bool,
    pub led_brightness_support: bool,
    /// Number of outputs on matrix switchers.
    pub matrix_outputs: Option<u8>,
    /// Number of custom EDID slots.
    pub edid_slots: Option<u8>,
    /// LED profile key → display name (DIVA ambilight).
    pub led_modes: Option<&'static [(&'static str, &'static str)]>,
    pub dialect: Dialect,
}

impl ModelConfig {
    /// The source-select verb, or `None` for families without inputs to pick.
    pub fn source_command(&self) -> Option<&'static str> {
        match self.dialect.source {
            SourceStyle::None => None,
            SourceStyle::Indexed { verb } | SourceStyle::TopBottom { verb } => Some(verb),
        }
    }

    /// Display names of the selectable inputs.
    pub fn source_list(&self) -> Vec<String> {
        match self.dialect.source {
            SourceStyle::None => Vec::new(),
            SourceStyle::TopBottom { .. } => vec!["Top".to_string(), "Bottom".to_string()],
            SourceStyle::Indexed { .. } => (0..self.input_count)
                .map(|i| format!("HDMI {i}"))
                .collect(),
        }
    }

    /// Translate a source display name into the argument the device expects.
    ///
    /// Top/bottom families map `"Top"` → `top` and `"Bottom"` → `bot`;
    /// indexed families strip the `"HDMI "` prefix and pass the index through.
    pub fn format_source(&self, source: &str) -> Result<String> {
        match self.dialect.source {
            SourceStyle::None => Err(Error::Unsupported(format!(
                "{} has no selectable inputs",
                self.display_name
            ))),
            SourceStyle::TopBottom { .. } => match source.trim() {
                "Top" | "top" => Ok("top".to_string()),
                "Bottom" | "bottom" | "bot" => Ok("bot".to_string()),
                other => Err(Error::InvalidParameter(format!("unknown source '{other}'"))),
            },
            SourceStyle::Indexed { .. } => {
                let index = source.replace("HDMI ", "").trim().to_string();
                match index.parse::<u8>() {
                    Ok(n) if n < self.input_count => Ok(index),
                    _ => Err(Error::InvalidParameter(format!(
                        "unknown source '{source}' for {}",
                        self.display_name
                    ))),
                }
            }
        }
    }

    /// Resolve an LED profile given either its key (`"2"`) or its display
    /// name (`"Static"`, case-insensitive) to the key sent on the wire.
    pub fn led_mode_key(&self, mode: &str) -> Option<&'static str> {
        self.led_modes?.iter().find_map(|(key, name)| {
            (mode == *key || mode.eq_ignore_ascii_case(name)).then_some(*key)
        })
    }

    /// True if this family can route inputs to individual outputs.
    pub fn has_matrix(&self) -> bool {
        self.matrix_outputs.unwrap_or(0) > 0 && self.dialect.matrix != MatrixStyle::None
    }
}

/// VRRooM 8K four-input switcher / eARC hub.
pub fn vrroom() -> ModelConfig {
    ModelConfig {
        id: ModelId::Vrroom,
        display_name: "VRRooM",
        default_port: 2222,
        input_count: 4,
        edid_modes: &["automix", "custom", "fixed", "copytx0", "copytx1"],
        edid_audio_sources: &["stereo", "5.1", "full", "audioout", "earcout"],
        hdcp_modes: &["auto", "1.4"],
        earc_force_modes: &["auto", "earc", "hdmi"],
        color_space_modes: &["auto", "rgb", "ycbcr444", "ycbcr422", "ycbcr420"],
        deep_color_modes: &["auto", "8bit", "10bit", "12bit"],
        output_resolutions: &["auto", "4k60", "4k30", "1080p60", "1080p30"],
        scale_modes: &[],
        audio_modes: &[],
        hdr_custom_support: true,
        hdr_disable_support: true,
        cec_support: true,
        oled_support: true,
        autoswitch_support: true,
        audio_delay_support: false,
        led_brightness_support: false,
        matrix_outputs: None,
        edid_slots: Some(4),
        led_modes: None,
        dialect: STANDARD_DIALECT,
    }
}

/// VERTEX2 4x2 matrix.
pub fn vertex2() -> ModelConfig {
    ModelConfig {
        id: ModelId::Vertex2,
        display_name: "VERTEX2",
        default_port: 2220,
        input_count: 4,
        edid_modes: &["automix", "custom", "fixed", "copytx0", "copytx1"],
        edid_audio_sources: &["stereo", "5.1", "full", "native", "tx1"],
        hdcp_modes: &["auto", "1.4"],
        earc_force_modes: &["auto", "earc", "hdmi"],
        color_space_modes: &["auto", "rgb", "ycbcr444", "ycbcr422"],
        deep_color_modes: &["auto", "8bit", "10bit", "12bit"],
        output_resolutions: &[],
        scale_modes: &["auto", "custom", "none"],
        audio_modes: &[],
        hdr_custom_support: true,
        hdr_disable_support: true,
        cec_support: true,
        oled_support: true,
        autoswitch_support: true,
        audio_delay_support: false,
        led_brightness_support: false,
        matrix_outputs: Some(2),
        edid_slots: Some(4),
        led_modes: None,
        dialect: Dialect {
            matrix: MatrixStyle::IndexedOutputs,
            ..STANDARD_DIALECT
        },
    }
}

/// Original VERTEX 2x2 matrix with top/bottom inputs.
pub fn vertex() -> ModelConfig {
    ModelConfig {
        id: ModelId::Vertex,
        display_name: "VERTEX",
        default_port: 2220,
        input_count: 2,
        edid_modes: &["automix", "custom", "fixed", "copytop", "copybot"],
        edid_audio_sources: &["stereo", "5.1", "7.1", "native", "top"],
        hdcp_modes: &["1.4", "2.2"],
        earc_force_modes: &[],
        color_space_modes: &["auto", "rgb", "ycbcr444", "ycbcr422"],
        deep_color_modes: &["auto", "8bit", "10bit", "12bit"],
        output_resolutions: &[],
        scale_modes: &["auto", "custom", "none"],
        audio_modes: &[],
        hdr_custom_support: true,
        hdr_disable_support: true,
        cec_support: true,
        oled_support: true,
        autoswitch_support: true,
        audio_delay_support: false,
        led_brightness_support: false,
        matrix_outputs: Some(2),
        edid_slots: None,
        led_modes: None,
        dialect: Dialect {
            source: SourceStyle::TopBottom { verb: "input" },
            edid_audio_verb: "edidaudio",
            matrix: MatrixStyle::NamedOutputs,
            ..STANDARD_DIALECT
        },
    }
}

const DIVA_LED_MODES: &[(&str, &str)] = &[
    ("0", "Off"),
    ("1", "Follow"),
    ("2", "Static"),
    ("3", "Blinking"),
    ("4", "Pulsating"),
    ("5", "Rotating"),
];

/// DIVA 4-input HDR processor with ambilight LED output.
pub fn diva() -> ModelConfig {
    ModelConfig {
        id: ModelId::Diva,
        display_name: "DIVA",
        default_port: 2210,
        input_count: 4,
        edid_modes: &["automix", "custom", "fixed", "copytx0", "copytx1"],
        edid_audio_sources: &["stereo", "5.1", "full", "native", "tx1"],
        hdcp_modes: &["auto", "1.4"],
        earc_force_modes: &["auto", "earc", "hdmi"],
        color_space_modes: &["auto", "rgb", "ycbcr444", "ycbcr422"],
        deep_color_modes: &["auto", "8bit", "10bit", "12bit"],
        output_resolutions: &[],
        scale_modes: &["auto", "custom", "none"],
        audio_modes: &[],
        hdr_custom_support: true,
        hdr_disable_support: true,
        cec_support: true,
        oled_support: true,
        autoswitch_support: true,
        audio_delay_support: false,
        led_brightness_support: true,
        matrix_outputs: None,
        edid_slots: None,
        led_modes: Some(DIVA_LED_MODES),
        dialect: STANDARD_DIALECT,
    }
}

/// Maestro 4-input processor with lip-sync adjustment.
pub fn maestro() -> ModelConfig {
    ModelConfig {
        id: ModelId::Maestro,
        display_name: "Maestro",
        default_port: 2200,
        input_count: 4,
        edid_modes: &["automix", "custom", "fixed", "copytx0", "copytx1"],
        edid_audio_sources: &["stereo", "5.1", "full", "native", "tx1"],
        hdcp_modes: &["auto", "1.4"],
        earc_force_modes: &["auto", "earc", "hdmi"],
        color_space_modes: &["auto", "rgb", "ycbcr444", "ycbcr422"],
        deep_color_modes: &["auto", "8bit", "10bit", "12bit"],
        output_resolutions: &[],
        scale_modes: &["auto", "custom", "none"],
        audio_modes: &[],
        hdr_custom_support: true,
        hdr_disable_support: true,
        cec_support: true,
        oled_support: true,
        autoswitch_support: true,
        audio_delay_support: true,
        led_brightness_support: false,
        matrix_outputs: None,
        edid_slots: None,
        led_modes: None,
        dialect: STANDARD_DIALECT,
    }
}

/// ARCANA2 single-input eARC audio extractor and scaler.
pub fn arcana2() -> ModelConfig {
    ModelConfig {
        id: ModelId::Arcana2,
        display_name: "ARCANA2",
        default_port: 2222,
        input_count: 1,
        edid_modes: &[],
        edid_audio_sources: &[],
        hdcp_modes: &[],
        earc_force_modes: &["autoearc", "manualearc", "autoarc", "manualarc", "hdmi"],
        color_space_modes: &[],
        deep_color_modes: &[],
        output_resolutions: &[],
        scale_modes: &[
            "none",
            "downtx1",
            "frltmds",
            "audioonly",
            "4k60_444_8_lldv",
            "4k60_444_8_hdr",
            "4k60_444_8_sdr",
        ],
        audio_modes: &["display", "earc", "both"],
        hdr_custom_support: true,
        hdr_disable_support: false,
        cec_support: false,
        oled_support: true,
        autoswitch_support: false,
        audio_delay_support: false,
        led_brightness_support: false,
        matrix_outputs: None,
        edid_slots: Some(2),
        led_modes: None,
        dialect: Dialect {
            source: SourceStyle::None,
            scale_verb: "scalemode",
            ..STANDARD_DIALECT
        },
    }
}

/// Dr.HDMI 8K single-input EDID and signal fixer.
pub fn dr8k() -> ModelConfig {
    ModelConfig {
        id: ModelId::Dr8k,
        display_name: "Dr.HDMI 8K",
        default_port: 2201,
        input_count: 1,
        edid_modes: &["automix", "custom", "fixed", "copytx"],
        edid_audio_sources: &["stereo", "5.1", "full", "custom"],
        hdcp_modes: &[],
        earc_force_modes: &[],
        color_space_modes: &[],
        deep_color_modes: &[],
        output_resolutions: &["auto", "4k60", "4k30", "1080p60", "1080p30", "720p60"],
        scale_modes: &[],
        audio_modes: &[],
        hdr_custom_support: false,
        hdr_disable_support: false,
        cec_support: false,
        oled_support: true,
        autoswitch_support: false,
        audio_delay_support: false,
        led_brightness_support: false,
        matrix_outputs: None,
        edid_slots: Some(8),
        led_modes: None,
        dialect: Dialect {
            source: SourceStyle::None,
            ..STANDARD_DIALECT
        },
    }
}

/// Look up the definition for a family.
pub fn get(id: ModelId) -> ModelConfig {
    match id {
        ModelId::Vrroom => vrroom(),
        ModelId::Vertex2 => vertex2(),
        ModelId::Vertex => vertex(),
        ModelId::Diva => diva(),
        ModelId::Maestro => maestro(),
        ModelId::Arcana2 => arcana2(),
        ModelId::Dr8k => dr8k(),
    }
}

/// Look up a family by its configuration identifier. Unknown identifiers
/// resolve to the default family rather than failing.
pub fn lookup(model_id: &str) -> ModelConfig {
    get(ModelId::resolve(model_id))
}

/// All supported families.
pub fn all() -> Vec<ModelConfig> {
    ModelId::ALL.iter().map(|id| get(*id)).collect()
}
