//! HDFury command builders.
//!
//! This module turns abstract operations into the exact command lines a
//! given model expects. Every function is pure: it takes the active
//! [`ModelConfig`] (where the dialect or capabilities matter) and returns
//! the command text without the `\r\n` terminator, or an error if the
//! operation is unsupported by the model or the argument is out of range.
//! Nothing here touches a socket, so rejected arguments never reach the
//! device.
//!
//! # Command reference
//!
//! Commands are lower-case ASCII: `set <verb> <value>` to change a setting,
//! `get <verb>` to read one. Mode-valued arguments are accepted by their
//! list names (`ycbcr444`, `4k60`, `10bit`) and translated to the wire
//! tokens (`444`, `2160p60`, `10`). Bounded numeric settings are clamped
//! before formatting.

use hdfury_core::{
    AudioDelayStep, CecRole, Error, Intent, MatrixStyle, ModelConfig, Result, SourceStyle,
};

// ---------------------------------------------------------------
// Ranges
// ---------------------------------------------------------------

/// Analog output volume range in dB.
pub const ANALOG_VOLUME_RANGE: (i32, i32) = (-30, 10);
/// Analog bass and treble range in dB.
pub const ANALOG_TONE_RANGE: (i32, i32) = (-10, 10);
/// OLED page index range.
pub const OLED_PAGE_RANGE: (i32, i32) = (0, 4);
/// OLED fade timer range.
pub const OLED_FADE_RANGE: (i32, i32) = (0, 255);
/// Valid factory reset modes.
pub const FACTORY_RESET_MODES: [u8; 3] = [1, 2, 3];
/// Number of HDMI outputs with per-output audio and +5V controls.
pub const TX_OUTPUTS: u8 = 2;

fn clamp(value: i32, (lo, hi): (i32, i32)) -> i32 {
    value.clamp(lo, hi)
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

fn require(flag: bool, what: &str, model: &ModelConfig) -> Result<()> {
    if flag {
        Ok(())
    } else {
        Err(Error::Unsupported(format!("{what} on {}", model.display_name)))
    }
}

/// Check `mode` against a model's list. An empty list means the model does
/// not offer the setting at all.
fn check_mode(list: &[&str], mode: &str, what: &str, model: &ModelConfig) -> Result<()> {
    if list.is_empty() {
        return Err(Error::Unsupported(format!("{what} on {}", model.display_name)));
    }
    if list.contains(&mode) {
        Ok(())
    } else {
        Err(Error::InvalidParameter(format!(
            "{what} '{mode}' not offered by {}",
            model.display_name
        )))
    }
}

// ---------------------------------------------------------------
// Wire value maps
// ---------------------------------------------------------------

fn color_space_token(mode: &str) -> &str {
    match mode {
        "ycbcr444" => "444",
        "ycbcr422" => "422",
        "ycbcr420" => "420",
        other => other,
    }
}

fn deep_color_token(mode: &str) -> &str {
    match mode {
        "8bit" => "8",
        "10bit" => "10",
        "12bit" => "12",
        other => other,
    }
}

fn resolution_token(resolution: &str) -> &str {
    match resolution {
        "4k60" => "2160p60",
        "4k30" => "2160p30",
        other => other,
    }
}

// ---------------------------------------------------------------
// Routing
// ---------------------------------------------------------------

/// Select the active input (`set inseltx0 2`, `set input top`).
pub fn cmd_select_source(model: &ModelConfig, source: &str) -> Result<String> {
    let arg = model.format_source(source)?;
    match model.dialect.source {
        SourceStyle::Indexed { verb } | SourceStyle::TopBottom { verb } => {
            Ok(format!("set {verb} {arg}"))
        }
        SourceStyle::None => Err(Error::Unsupported(format!(
            "source selection on {}",
            model.display_name
        ))),
    }
}

/// Route `source` to matrix output `output` (0-based).
///
/// Named-output families address outputs as `top`/`bot`; indexed families
/// use `inseltx<n>`.
pub fn cmd_route_matrix(model: &ModelConfig, output: u8, source: &str) -> Result<String> {
    require(model.has_matrix(), "matrix routing", model)?;
    let outputs = model.matrix_outputs.unwrap_or(0);
    if output >= outputs {
        return Err(Error::InvalidParameter(format!(
            "matrix output {output} (model has {outputs})"
        )));
    }
    let arg = model.format_source(source)?;
    match model.dialect.matrix {
        MatrixStyle::NamedOutputs => {
            let name = if output == 0 { "top" } else { "bot" };
            Ok(format!("set {name} {arg}"))
        }
        MatrixStyle::IndexedOutputs => Ok(format!("set inseltx{output} {arg}")),
        MatrixStyle::None => Err(Error::Unsupported(format!(
            "matrix routing on {}",
            model.display_name
        ))),
    }
}

// ---------------------------------------------------------------
// EDID
// ---------------------------------------------------------------

pub fn cmd_set_edid_mode(model: &ModelConfig, mode: &str) -> Result<String> {
    check_mode(model.edid_modes, mode, "EDID mode", model)?;
    Ok(format!("set edidmode {mode}"))
}

/// Set the EDID audio source. The verb is one word on some families.
pub fn cmd_set_edid_audio(model: &ModelConfig, source: &str) -> Result<String> {
    check_mode(model.edid_audio_sources, source, "EDID audio source", model)?;
    Ok(format!("set {} {source}", model.dialect.edid_audio_verb))
}

fn check_edid_slot(model: &ModelConfig, slot: u8) -> Result<()> {
    let slots = model
        .edid_slots
        .ok_or_else(|| Error::Unsupported(format!("EDID slots on {}", model.display_name)))?;
    if (1..=slots).contains(&slot) {
        Ok(())
    } else {
        Err(Error::InvalidParameter(format!(
            "EDID slot {slot} (valid 1-{slots})"
        )))
    }
}

/// Load a custom EDID from a 1-based slot.
pub fn cmd_load_edid_slot(model: &ModelConfig, slot: u8) -> Result<String> {
    check_edid_slot(model, slot)?;
    Ok(format!("set edid load {slot}"))
}

/// Save the current EDID into a 1-based slot.
pub fn cmd_save_edid_slot(model: &ModelConfig, slot: u8) -> Result<String> {
    check_edid_slot(model, slot)?;
    Ok(format!("set edid save {slot}"))
}

// ---------------------------------------------------------------
// Video
// ---------------------------------------------------------------

pub fn cmd_set_color_space(model: &ModelConfig, mode: &str) -> Result<String> {
    check_mode(model.color_space_modes, mode, "color space", model)?;
    Ok(format!("set colorspace {}", color_space_token(mode)))
}

pub fn cmd_set_deep_color(model: &ModelConfig, mode: &str) -> Result<String> {
    check_mode(model.deep_color_modes, mode, "deep color", model)?;
    Ok(format!("set deepcolor {}", deep_color_token(mode)))
}

pub fn cmd_set_output_resolution(model: &ModelConfig, resolution: &str) -> Result<String> {
    check_mode(model.output_resolutions, resolution, "output resolution", model)?;
    Ok(format!("set res {}", resolution_token(resolution)))
}

pub fn cmd_set_hdr_custom(model: &ModelConfig, on: bool) -> Result<String> {
    require(model.hdr_custom_support, "custom HDR", model)?;
    Ok(format!("set hdrcustom {}", on_off(on)))
}

pub fn cmd_set_hdr_disable(model: &ModelConfig, on: bool) -> Result<String> {
    require(model.hdr_disable_support, "HDR disable", model)?;
    Ok(format!("set hdrdisable {}", on_off(on)))
}

/// Set the HDCP mode. `"14"` is accepted as shorthand for `"1.4"`.
pub fn cmd_set_hdcp_mode(model: &ModelConfig, mode: &str) -> Result<String> {
    let mode = if mode == "14" { "1.4" } else { mode };
    check_mode(model.hdcp_modes, mode, "HDCP mode", model)?;
    Ok(format!("set hdcp {mode}"))
}

pub fn cmd_set_scale_mode(model: &ModelConfig, mode: &str) -> Result<String> {
    check_mode(model.scale_modes, mode, "scale mode", model)?;
    Ok(format!("set {} {mode}", model.dialect.scale_verb))
}

pub fn cmd_set_avi_custom(on: bool) -> String {
    format!("set avicustom {}", on_off(on))
}

pub fn cmd_set_avi_disable(on: bool) -> String {
    format!("set avidisable {}", on_off(on))
}

/// Toggle HTPC mode for one input (0-based).
pub fn cmd_set_htpc_mode(model: &ModelConfig, input: u8, on: bool) -> Result<String> {
    if input >= model.input_count {
        return Err(Error::InvalidParameter(format!(
            "input {input} (model has {})",
            model.input_count
        )));
    }
    Ok(format!("set htpcmode{input} {}", on_off(on)))
}

// ---------------------------------------------------------------
// CEC / eARC
// ---------------------------------------------------------------

pub fn cmd_set_cec(model: &ModelConfig, on: bool) -> Result<String> {
    require(model.cec_support, "CEC", model)?;
    Ok(format!("set cec {}", on_off(on)))
}

pub fn cmd_set_cec_logical_address(model: &ModelConfig, role: CecRole) -> Result<String> {
    require(model.cec_support, "CEC", model)?;
    Ok(format!("set cecla {}", role.as_str()))
}

pub fn cmd_set_earc_force(model: &ModelConfig, mode: &str) -> Result<String> {
    check_mode(model.earc_force_modes, mode, "eARC force mode", model)?;
    Ok(format!("set earcforce {mode}"))
}

// ---------------------------------------------------------------
// Audio
// ---------------------------------------------------------------

pub fn cmd_set_audio_mode(model: &ModelConfig, mode: &str) -> Result<String> {
    check_mode(model.audio_modes, mode, "audio mode", model)?;
    Ok(format!("set audiomode {mode}"))
}

/// Step the lip-sync delay by one increment.
pub fn cmd_adjust_audio_delay(model: &ModelConfig, step: AudioDelayStep) -> Result<String> {
    require(model.audio_delay_support, "audio delay", model)?;
    let arg = match step {
        AudioDelayStep::Increase => "+",
        AudioDelayStep::Decrease => "-",
    };
    Ok(format!("set audiodelay {arg}"))
}

pub fn cmd_reset_audio_delay(model: &ModelConfig) -> Result<String> {
    require(model.audio_delay_support, "audio delay", model)?;
    Ok("set audiodelay 0".to_string())
}

/// Build a "set analog volume" command, clamped to [-30, 10].
pub fn cmd_set_analog_volume(volume: i32) -> String {
    format!("set analogvolume {}", clamp(volume, ANALOG_VOLUME_RANGE))
}

/// Build a "set analog bass" command, clamped to [-10, 10].
pub fn cmd_set_analog_bass(bass: i32) -> String {
    format!("set analogbass {}", clamp(bass, ANALOG_TONE_RANGE))
}

/// Build a "set analog treble" command, clamped to [-10, 10].
pub fn cmd_set_analog_treble(treble: i32) -> String {
    format!("set analogtreble {}", clamp(treble, ANALOG_TONE_RANGE))
}

fn check_tx(tx: u8) -> Result<()> {
    if tx < TX_OUTPUTS {
        Ok(())
    } else {
        Err(Error::InvalidParameter(format!("TX output {tx} (valid 0-1)")))
    }
}

/// Mute or unmute audio on one HDMI output (`set mutetx0audio on`).
pub fn cmd_mute_tx_audio(tx: u8, muted: bool) -> Result<String> {
    check_tx(tx)?;
    Ok(format!("set mutetx{tx}audio {}", on_off(muted)))
}

/// Toggle the +5V line on one HDMI output.
pub fn cmd_set_tx_plus5(tx: u8, on: bool) -> Result<String> {
    check_tx(tx)?;
    Ok(format!("set tx{tx}plus5 {}", on_off(on)))
}

// ---------------------------------------------------------------
// Display and LEDs
// ---------------------------------------------------------------

pub fn cmd_set_oled(model: &ModelConfig, on: bool) -> Result<String> {
    require(model.oled_support, "OLED", model)?;
    Ok(format!("set oled {}", on_off(on)))
}

/// Select the OLED page, clamped to [0, 4].
pub fn cmd_set_oled_page(model: &ModelConfig, page: i32) -> Result<String> {
    require(model.oled_support, "OLED", model)?;
    Ok(format!("set oledpage {}", clamp(page, OLED_PAGE_RANGE)))
}

/// Set the OLED fade timer, clamped to [0, 255].
pub fn cmd_set_oled_fade(model: &ModelConfig, fade: i32) -> Result<String> {
    require(model.oled_support, "OLED", model)?;
    Ok(format!("set oledfade {}", clamp(fade, OLED_FADE_RANGE)))
}

pub fn cmd_set_autoswitch(model: &ModelConfig, on: bool) -> Result<String> {
    require(model.autoswitch_support, "autoswitch", model)?;
    Ok(format!("set autosw {}", on_off(on)))
}

/// Select an LED profile by key or display name (`set ledprofilevideo 2`).
pub fn cmd_set_led_mode(model: &ModelConfig, mode: &str) -> Result<String> {
    require(model.led_modes.is_some(), "LED modes", model)?;
    let key = model
        .led_mode_key(mode)
        .ok_or_else(|| Error::InvalidParameter(format!("LED mode '{mode}'")))?;
    Ok(format!("set ledprofilevideo {key}"))
}

/// Set LED brightness as three channel-gain commands (red, green, blue),
/// each clamped to the model's gain range.
pub fn cmd_set_led_brightness(model: &ModelConfig, value: i32) -> Result<Vec<String>> {
    require(model.led_brightness_support, "LED brightness", model)?;
    let gain = clamp(value, (0, model.dialect.led_gain_max));
    Ok(["ledredgain", "ledgreengain", "ledbluegain"]
        .iter()
        .map(|verb| format!("set {verb} {gain}"))
        .collect())
}

// ---------------------------------------------------------------
// System
// ---------------------------------------------------------------

pub fn cmd_reboot() -> String {
    "set reboot".to_string()
}

pub fn cmd_hotplug() -> String {
    "set hotplug".to_string()
}

/// Factory reset. Only modes 1, 2 and 3 exist.
pub fn cmd_factory_reset(mode: u8) -> Result<String> {
    if FACTORY_RESET_MODES.contains(&mode) {
        Ok(format!("set factoryreset {mode}"))
    } else {
        Err(Error::InvalidParameter(format!(
            "factory reset mode {mode} (valid 1-3)"
        )))
    }
}

pub fn cmd_query_firmware() -> String {
    "get ver".to_string()
}

pub fn cmd_query_status() -> String {
    "get status".to_string()
}

/// Lightweight liveness probe: the active input where the model has one,
/// otherwise the firmware version.
pub fn cmd_heartbeat(model: &ModelConfig) -> String {
    if model.source_command().is_some() {
        "get insel".to_string()
    } else {
        cmd_query_firmware()
    }
}

// ---------------------------------------------------------------
// Intent dispatch
// ---------------------------------------------------------------

/// Translate an [`Intent`] into the command lines to send, in order.
///
/// Most intents produce one line; LED brightness produces three.
pub fn build(model: &ModelConfig, intent: &Intent) -> Result<Vec<String>> {
    let line = match intent {
        Intent::SelectSource(source) => cmd_select_source(model, source)?,
        Intent::RouteMatrix { output, source } => cmd_route_matrix(model, *output, source)?,
        Intent::SetEdidMode(mode) => cmd_set_edid_mode(model, mode)?,
        Intent::SetEdidAudio(source) => cmd_set_edid_audio(model, source)?,
        Intent::LoadEdidSlot(slot) => cmd_load_edid_slot(model, *slot)?,
        Intent::SaveEdidSlot(slot) => cmd_save_edid_slot(model, *slot)?,
        Intent::SetColorSpace(mode) => cmd_set_color_space(model, mode)?,
        Intent::SetDeepColor(mode) => cmd_set_deep_color(model, mode)?,
        Intent::SetOutputResolution(res) => cmd_set_output_resolution(model, res)?,
        Intent::SetHdrCustom(on) => cmd_set_hdr_custom(model, *on)?,
        Intent::SetHdrDisable(on) => cmd_set_hdr_disable(model, *on)?,
        Intent::SetCec(on) => cmd_set_cec(model, *on)?,
        Intent::SetCecLogicalAddress(role) => cmd_set_cec_logical_address(model, *role)?,
        Intent::SetEarcForce(mode) => cmd_set_earc_force(model, mode)?,
        Intent::SetOled(on) => cmd_set_oled(model, *on)?,
        Intent::SetOledPage(page) => cmd_set_oled_page(model, *page)?,
        Intent::SetOledFade(fade) => cmd_set_oled_fade(model, *fade)?,
        Intent::SetAutoswitch(on) => cmd_set_autoswitch(model, *on)?,
        Intent::SetHdcpMode(mode) => cmd_set_hdcp_mode(model, mode)?,
        Intent::SetScaleMode(mode) => cmd_set_scale_mode(model, mode)?,
        Intent::SetAudioMode(mode) => cmd_set_audio_mode(model, mode)?,
        Intent::AdjustAudioDelay(step) => cmd_adjust_audio_delay(model, *step)?,
        Intent::ResetAudioDelay => cmd_reset_audio_delay(model)?,
        Intent::SetLedMode(mode) => cmd_set_led_mode(model, mode)?,
        Intent::SetLedBrightness(value) => return cmd_set_led_brightness(model, *value),
        Intent::SetAnalogVolume(v) => cmd_set_analog_volume(*v),
        Intent::SetAnalogBass(v) => cmd_set_analog_bass(*v),
        Intent::SetAnalogTreble(v) => cmd_set_analog_treble(*v),
        Intent::MuteTxAudio { tx, muted } => cmd_mute_tx_audio(*tx, *muted)?,
        Intent::SetTxPlus5 { tx, on } => cmd_set_tx_plus5(*tx, *on)?,
        Intent::SetHtpcMode { input, on } => cmd_set_htpc_mode(model, *input, *on)?,
        Intent::SetAviCustom(on) => cmd_set_avi_custom(*on),
        Intent::SetAviDisable(on) => cmd_set_avi_disable(*on),
        Intent::Reboot => cmd_reboot(),
        Intent::FactoryReset(mode) => cmd_factory_reset(*mode)?,
        Intent::Hotplug => cmd_hotplug(),
        Intent::QueryFirmware => cmd_query_firmware(),
        Intent::QueryStatus => cmd_query_status(),
    };
    Ok(vec![line])
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdfury_core::models;

    // ---------------------------------------------------------------
    // Routing
    // ---------------------------------------------------------------

    #[test]
    fn select_source_indexed() {
        assert_eq!(
            cmd_select_source(&models::vrroom(), "HDMI 2").unwrap(),
            "set inseltx0 2"
        );
        assert_eq!(
            cmd_select_source(&models::maestro(), "HDMI 0").unwrap(),
            "set inseltx0 0"
        );
    }

    #[test]
    fn select_source_top_bottom() {
        let vertex = models::vertex();
        assert_eq!(cmd_select_source(&vertex, "Top").unwrap(), "set input top");
        assert_eq!(cmd_select_source(&vertex, "Bottom").unwrap(), "set input bot");
    }

    #[test]
    fn select_source_unsupported_without_inputs() {
        assert!(matches!(
            cmd_select_source(&models::arcana2(), "HDMI 0"),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn route_matrix_dialects() {
        assert_eq!(
            cmd_route_matrix(&models::vertex2(), 1, "HDMI 3").unwrap(),
            "set inseltx1 3"
        );
        assert_eq!(
            cmd_route_matrix(&models::vertex(), 0, "Bottom").unwrap(),
            "set top bot"
        );
        assert_eq!(
            cmd_route_matrix(&models::vertex(), 1, "Top").unwrap(),
            "set bot top"
        );
    }

    #[test]
    fn route_matrix_rejects() {
        assert!(matches!(
            cmd_route_matrix(&models::vertex2(), 2, "HDMI 0"),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            cmd_route_matrix(&models::vrroom(), 0, "HDMI 0"),
            Err(Error::Unsupported(_))
        ));
    }

    // ---------------------------------------------------------------
    // EDID
    // ---------------------------------------------------------------

    #[test]
    fn edid_audio_verb_per_family() {
        assert_eq!(
            cmd_set_edid_audio(&models::vertex(), "stereo").unwrap(),
            "set edidaudio stereo"
        );
        assert_eq!(
            cmd_set_edid_audio(&models::vrroom(), "5.1").unwrap(),
            "set edid audio 5.1"
        );
    }

    #[test]
    fn edid_mode_validated() {
        assert_eq!(
            cmd_set_edid_mode(&models::vrroom(), "automix").unwrap(),
            "set edidmode automix"
        );
        assert!(matches!(
            cmd_set_edid_mode(&models::vrroom(), "copytop"),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            cmd_set_edid_mode(&models::arcana2(), "automix"),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn edid_slots() {
        assert_eq!(
            cmd_load_edid_slot(&models::dr8k(), 8).unwrap(),
            "set edid load 8"
        );
        assert_eq!(
            cmd_save_edid_slot(&models::vrroom(), 1).unwrap(),
            "set edid save 1"
        );
        assert!(matches!(
            cmd_load_edid_slot(&models::vrroom(), 0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            cmd_load_edid_slot(&models::vrroom(), 5),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            cmd_load_edid_slot(&models::diva(), 1),
            Err(Error::Unsupported(_))
        ));
    }

    // ---------------------------------------------------------------
    // Video
    // ---------------------------------------------------------------

    #[test]
    fn value_maps() {
        let m = models::vrroom();
        assert_eq!(cmd_set_color_space(&m, "ycbcr444").unwrap(), "set colorspace 444");
        assert_eq!(cmd_set_color_space(&m, "ycbcr420").unwrap(), "set colorspace 420");
        assert_eq!(cmd_set_color_space(&m, "rgb").unwrap(), "set colorspace rgb");
        assert_eq!(cmd_set_deep_color(&m, "10bit").unwrap(), "set deepcolor 10");
        assert_eq!(cmd_set_deep_color(&m, "auto").unwrap(), "set deepcolor auto");
        assert_eq!(cmd_set_output_resolution(&m, "4k60").unwrap(), "set res 2160p60");
        assert_eq!(cmd_set_output_resolution(&m, "1080p30").unwrap(), "set res 1080p30");
        assert_eq!(
            cmd_set_output_resolution(&models::dr8k(), "720p60").unwrap(),
            "set res 720p60"
        );
    }

    #[test]
    fn color_space_420_only_where_listed() {
        assert!(matches!(
            cmd_set_color_space(&models::vertex2(), "ycbcr420"),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn hdcp_shorthand() {
        let m = models::vrroom();
        assert_eq!(cmd_set_hdcp_mode(&m, "14").unwrap(), "set hdcp 1.4");
        assert_eq!(cmd_set_hdcp_mode(&m, "auto").unwrap(), "set hdcp auto");
        assert_eq!(
            cmd_set_hdcp_mode(&models::vertex(), "2.2").unwrap(),
            "set hdcp 2.2"
        );
    }

    #[test]
    fn scale_verb_per_family() {
        assert_eq!(
            cmd_set_scale_mode(&models::arcana2(), "audioonly").unwrap(),
            "set scalemode audioonly"
        );
        assert_eq!(
            cmd_set_scale_mode(&models::vertex2(), "auto").unwrap(),
            "set scale auto"
        );
        assert!(matches!(
            cmd_set_scale_mode(&models::vrroom(), "auto"),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn htpc_mode_input_range() {
        let m = models::vrroom();
        assert_eq!(cmd_set_htpc_mode(&m, 3, true).unwrap(), "set htpcmode3 on");
        assert!(cmd_set_htpc_mode(&m, 4, true).is_err());
    }

    #[test]
    fn capability_gates() {
        assert!(matches!(
            cmd_set_hdr_disable(&models::arcana2(), true),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(
            cmd_set_cec(&models::dr8k(), true),
            Err(Error::Unsupported(_))
        ));
        assert_eq!(cmd_set_cec(&models::vrroom(), false).unwrap(), "set cec off");
        assert_eq!(
            cmd_set_autoswitch(&models::vrroom(), true).unwrap(),
            "set autosw on"
        );
        assert_eq!(
            cmd_set_hdr_custom(&models::vrroom(), true).unwrap(),
            "set hdrcustom on"
        );
    }

    // ---------------------------------------------------------------
    // Audio
    // ---------------------------------------------------------------

    #[test]
    fn analog_volume_clamped() {
        assert_eq!(cmd_set_analog_volume(-30), "set analogvolume -30");
        assert_eq!(cmd_set_analog_volume(10), "set analogvolume 10");
        assert_eq!(cmd_set_analog_volume(-50), "set analogvolume -30");
        assert_eq!(cmd_set_analog_volume(20), "set analogvolume 10");
    }

    #[test]
    fn analog_tone_clamped() {
        assert_eq!(cmd_set_analog_bass(-11), "set analogbass -10");
        assert_eq!(cmd_set_analog_bass(3), "set analogbass 3");
        assert_eq!(cmd_set_analog_treble(99), "set analogtreble 10");
    }

    #[test]
    fn tx_audio_and_plus5() {
        assert_eq!(cmd_mute_tx_audio(0, true).unwrap(), "set mutetx0audio on");
        assert_eq!(cmd_mute_tx_audio(1, false).unwrap(), "set mutetx1audio off");
        assert!(cmd_mute_tx_audio(2, true).is_err());
        assert_eq!(cmd_set_tx_plus5(1, true).unwrap(), "set tx1plus5 on");
    }

    #[test]
    fn audio_delay_maestro_only() {
        let m = models::maestro();
        assert_eq!(
            cmd_adjust_audio_delay(&m, AudioDelayStep::Increase).unwrap(),
            "set audiodelay +"
        );
        assert_eq!(
            cmd_adjust_audio_delay(&m, AudioDelayStep::Decrease).unwrap(),
            "set audiodelay -"
        );
        assert_eq!(cmd_reset_audio_delay(&m).unwrap(), "set audiodelay 0");
        assert!(matches!(
            cmd_reset_audio_delay(&models::vrroom()),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn audio_mode_arcana2() {
        assert_eq!(
            cmd_set_audio_mode(&models::arcana2(), "earc").unwrap(),
            "set audiomode earc"
        );
    }

    // ---------------------------------------------------------------
    // Display and LEDs
    // ---------------------------------------------------------------

    #[test]
    fn oled_ranges_clamped() {
        let m = models::vrroom();
        assert_eq!(cmd_set_oled_page(&m, -1).unwrap(), "set oledpage 0");
        assert_eq!(cmd_set_oled_page(&m, 9).unwrap(), "set oledpage 4");
        assert_eq!(cmd_set_oled_fade(&m, 300).unwrap(), "set oledfade 255");
        assert_eq!(cmd_set_oled_fade(&m, 42).unwrap(), "set oledfade 42");
    }

    #[test]
    fn led_brightness_three_gains() {
        let cmds = cmd_set_led_brightness(&models::diva(), 99).unwrap();
        assert_eq!(
            cmds,
            vec!["set ledredgain 31", "set ledgreengain 31", "set ledbluegain 31"]
        );
        let cmds = cmd_set_led_brightness(&models::diva(), -4).unwrap();
        assert_eq!(cmds[0], "set ledredgain 0");
        assert!(matches!(
            cmd_set_led_brightness(&models::vrroom(), 10),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn led_mode_by_key_or_name() {
        let m = models::diva();
        assert_eq!(cmd_set_led_mode(&m, "3").unwrap(), "set ledprofilevideo 3");
        assert_eq!(cmd_set_led_mode(&m, "Rotating").unwrap(), "set ledprofilevideo 5");
        assert!(matches!(
            cmd_set_led_mode(&m, "Strobe"),
            Err(Error::InvalidParameter(_))
        ));
    }

    // ---------------------------------------------------------------
    // System
    // ---------------------------------------------------------------

    #[test]
    fn factory_reset_modes() {
        for mode in FACTORY_RESET_MODES {
            assert_eq!(
                cmd_factory_reset(mode).unwrap(),
                format!("set factoryreset {mode}")
            );
        }
        assert!(matches!(cmd_factory_reset(0), Err(Error::InvalidParameter(_))));
        assert!(matches!(cmd_factory_reset(4), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn system_commands() {
        assert_eq!(cmd_reboot(), "set reboot");
        assert_eq!(cmd_hotplug(), "set hotplug");
        assert_eq!(cmd_query_firmware(), "get ver");
        assert_eq!(cmd_query_status(), "get status");
        assert_eq!(
            cmd_set_cec_logical_address(&models::vrroom(), CecRole::Audio).unwrap(),
            "set cecla audio"
        );
        assert_eq!(cmd_set_avi_custom(true), "set avicustom on");
        assert_eq!(cmd_set_avi_disable(false), "set avidisable off");
    }

    #[test]
    fn heartbeat_probe() {
        assert_eq!(cmd_heartbeat(&models::vrroom()), "get insel");
        assert_eq!(cmd_heartbeat(&models::vertex()), "get insel");
        assert_eq!(cmd_heartbeat(&models::dr8k()), "get ver");
    }

    // ---------------------------------------------------------------
    // Intent dispatch
    // ---------------------------------------------------------------

    #[test]
    fn build_from_intent() {
        let m = models::vrroom();
        assert_eq!(
            build(&m, &Intent::SelectSource("HDMI 1".into())).unwrap(),
            vec!["set inseltx0 1"]
        );
        assert_eq!(
            build(&m, &Intent::SetAnalogVolume(-99)).unwrap(),
            vec!["set analogvolume -30"]
        );
        assert_eq!(
            build(&models::diva(), &Intent::SetLedBrightness(12)).unwrap().len(),
            3
        );
        assert!(matches!(
            build(&m, &Intent::FactoryReset(9)),
            Err(Error::InvalidParameter(_))
        ));
    }
}
