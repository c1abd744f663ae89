//! Core data types: command intents, status codes, and availability.

use std::fmt;

use serde::Serialize;

use crate::error::Error;

/// Caller-facing outcome of a device command, mirroring the status codes
/// the host integration reports upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    Ok,
    BadRequest,
    NotImplemented,
    ServerError,
    ServiceUnavailable,
}

impl StatusCode {
    /// Map a command failure into the outcome reported to the caller.
    pub fn from_error(err: &Error) -> StatusCode {
        match err {
            Error::InvalidParameter(_) => StatusCode::BadRequest,
            Error::Unsupported(_) => StatusCode::NotImplemented,
            _ => StatusCode::ServerError,
        }
    }

    pub fn is_ok(&self) -> bool {
        *self == StatusCode::Ok
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "BAD_REQUEST",
            StatusCode::NotImplemented => "NOT_IMPLEMENTED",
            StatusCode::ServerError => "SERVER_ERROR",
            StatusCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        };
        f.write_str(s)
    }
}

/// Lifecycle state of a device session.
///
/// There is no separate "off" state: HDFury devices have no power control,
/// so a session is either reachable or it is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    #[default]
    Unavailable,
    Available,
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Unavailable => f.write_str("unavailable"),
            Availability::Available => f.write_str("available"),
        }
    }
}

/// Direction of a one-step lip-sync adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioDelayStep {
    Increase,
    Decrease,
}

/// CEC logical address role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CecRole {
    Video,
    Audio,
}

impl CecRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CecRole::Video => "video",
            CecRole::Audio => "audio",
        }
    }
}

/// An abstract operation requested by the host, independent of the
/// command dialect of any particular model.
///
/// Mode-valued payloads use the names from the model's mode lists
/// (e.g. `"ycbcr444"`, `"4k60"`); the command builders translate them
/// into wire tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    SelectSource(String),
    RouteMatrix { output: u8, source: String },
    SetEdidMode(String),
    SetEdidAudio(String),
    LoadEdidSlot(u8),
    SaveEdidSlot(u8),
    SetColorSpace(String),
    SetDeepColor(String),
    SetOutputResolution(String),
    SetHdrCustom(bool),
    SetHdrDisable(bool),
    SetCec(bool),
    SetCecLogicalAddress(CecRole),
    SetEarcForce(String),
    SetOled(bool),
    SetOledPage(i32),
    SetOledFade(i32),
    SetAutoswitch(bool),
    SetHdcpMode(String),
    SetScaleMode(String),
    SetAudioMode(String),
    AdjustAudioDelay(AudioDelayStep),
    ResetAudioDelay,
    SetLedMode(String),
    SetLedBrightness(i32),
    SetAnalogVolume(i32),
    SetAnalogBass(i32),
    SetAnalogTreble(i32),
    MuteTxAudio { tx: u8, muted: bool },
    SetTxPlus5 { tx: u8, on: bool },
    SetHtpcMode { input: u8, on: bool },
    SetAviCustom(bool),
    SetAviDisable(bool),
    Reboot,
    FactoryReset(u8),
    Hotplug,
    QueryFirmware,
    QueryStatus,
}

impl Intent {
    /// True for read-only queries whose reply text is meaningful.
    pub fn is_query(&self) -> bool {
        matches!(self, Intent::QueryFirmware | Intent::QueryStatus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_from_error() {
        assert_eq!(
            StatusCode::from_error(&Error::InvalidParameter("x".into())),
            StatusCode::BadRequest
        );
        assert_eq!(
            StatusCode::from_error(&Error::Unsupported("x".into())),
            StatusCode::NotImplemented
        );
        assert_eq!(StatusCode::from_error(&Error::Timeout), StatusCode::ServerError);
        assert_eq!(
            StatusCode::from_error(&Error::ConnectionLost),
            StatusCode::ServerError
        );
    }

    #[test]
    fn status_display() {
        assert_eq!(StatusCode::Ok.to_string(), "OK");
        assert_eq!(StatusCode::NotImplemented.to_string(), "NOT_IMPLEMENTED");
        assert!(StatusCode::Ok.is_ok());
        assert!(!StatusCode::ServerError.is_ok());
    }

    #[test]
    fn availability_defaults_to_unavailable() {
        assert_eq!(Availability::default(), Availability::Unavailable);
        assert_eq!(Availability::Available.to_string(), "available");
    }

    #[test]
    fn query_intents() {
        assert!(Intent::QueryFirmware.is_query());
        assert!(Intent::QueryStatus.is_query());
        assert!(!Intent::Reboot.is_query());
        assert!(!Intent::SelectSource("HDMI 1".into()).is_query());
    }
}
