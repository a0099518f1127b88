//! Identity types for the lockbox register model.
//!
//! - [`Channel`] - fast input/output channel (1 or 2)
//! - [`LoopId`] - one PID loop, addressed by its (input, output) pair
//! - [`Feature`] / [`LoopFeatures`] - boolean loop features packed in the
//!   shared configuration word
//! - [`AnalogPin`] - slow analog pins (`AOUT0..3`, `AIN0..3`)

use crate::consts::LOOP_COUNT;
use crate::error::{LockboxError, LockboxResult};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Fast analog channel, numbered 1 and 2 on the front panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Channel {
    /// Channel 1 (A).
    Ch1,
    /// Channel 2 (B).
    Ch2,
}

impl Channel {
    /// Both channels in order.
    pub const ALL: [Channel; 2] = [Channel::Ch1, Channel::Ch2];

    /// Resolve a front-panel channel number.
    ///
    /// # Errors
    /// `OutOfRange` unless `number` is 1 or 2.
    pub fn new(number: u8) -> LockboxResult<Self> {
        match number {
            1 => Ok(Self::Ch1),
            2 => Ok(Self::Ch2),
            other => Err(LockboxError::out_of_range("channel", other)),
        }
    }

    /// Zero-based index.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::Ch1 => 0,
            Self::Ch2 => 1,
        }
    }

    /// Front-panel number (1 or 2).
    #[inline]
    pub const fn number(self) -> u8 {
        self.index() as u8 + 1
    }
}

impl TryFrom<u8> for Channel {
    type Error = LockboxError;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        Self::new(number)
    }
}

impl From<Channel> for u8 {
    fn from(ch: Channel) -> u8 {
        ch.number()
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// One of the four PID loops, identified by the input it regulates on and
/// the output it drives.
///
/// The FPGA names loops `PIDxy` with `x` = output and `y` = input, so the
/// register slot is `(output - 1) * 2 + (input - 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoopId {
    input: Channel,
    output: Channel,
}

impl LoopId {
    /// All loops in register slot order.
    pub const ALL: [LoopId; LOOP_COUNT] = [
        LoopId::from_channels(Channel::Ch1, Channel::Ch1),
        LoopId::from_channels(Channel::Ch2, Channel::Ch1),
        LoopId::from_channels(Channel::Ch1, Channel::Ch2),
        LoopId::from_channels(Channel::Ch2, Channel::Ch2),
    ];

    /// Resolve a loop from raw (input, output) channel numbers.
    ///
    /// # Errors
    /// `OutOfRange` if either number is not 1 or 2.
    pub fn new(input: u8, output: u8) -> LockboxResult<Self> {
        let input =
            Channel::new(input).map_err(|_| LockboxError::out_of_range("input channel", input))?;
        let output =
            Channel::new(output).map_err(|_| LockboxError::out_of_range("output channel", output))?;
        Ok(Self::from_channels(input, output))
    }

    /// Build a loop from typed channels (always valid).
    pub const fn from_channels(input: Channel, output: Channel) -> Self {
        Self { input, output }
    }

    /// Input channel whose calibration the setpoint uses.
    #[inline]
    pub const fn input(self) -> Channel {
        self.input
    }

    /// Output channel the loop drives.
    #[inline]
    pub const fn output(self) -> Channel {
        self.output
    }

    /// Register slot (0..4) inside every per-loop word group.
    #[inline]
    pub const fn slot(self) -> usize {
        self.output.index() * 2 + self.input.index()
    }
}

impl fmt::Display for LoopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IN{}:OUT{}", self.input.number(), self.output.number())
    }
}

/// Boolean loop feature stored in the shared configuration word.
///
/// Discriminants are the feature's position in the word: bit
/// `feature * 4 + slot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Feature {
    /// Integrator held at zero.
    IntegratorReset = 0,
    /// Output sign inverted.
    Inverted = 1,
    /// Integrator reset when the output hits a limit.
    ResetWhenRailed = 2,
    /// Integrator frozen at its current value.
    IntegratorHold = 3,
    /// Automatic relock enabled.
    Relock = 4,
}

impl Feature {
    /// All features in configuration-word order.
    pub const ALL: [Feature; 5] = [
        Feature::IntegratorReset,
        Feature::Inverted,
        Feature::ResetWhenRailed,
        Feature::IntegratorHold,
        Feature::Relock,
    ];

    /// Position of this feature's 4-bit group.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Short name used in logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::IntegratorReset => "integrator reset",
            Self::Inverted => "inverted",
            Self::ResetWhenRailed => "reset when railed",
            Self::IntegratorHold => "integrator hold",
            Self::Relock => "relock",
        }
    }
}

bitflags! {
    /// Feature set of a single loop, decoded from the configuration word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct LoopFeatures: u8 {
        /// See [`Feature::IntegratorReset`].
        const INTEGRATOR_RESET  = 1 << 0;
        /// See [`Feature::Inverted`].
        const INVERTED          = 1 << 1;
        /// See [`Feature::ResetWhenRailed`].
        const RESET_WHEN_RAILED = 1 << 2;
        /// See [`Feature::IntegratorHold`].
        const INTEGRATOR_HOLD   = 1 << 3;
        /// See [`Feature::Relock`].
        const RELOCK            = 1 << 4;
    }
}

impl Default for LoopFeatures {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Feature> for LoopFeatures {
    fn from(feature: Feature) -> Self {
        Self::from_bits_truncate(1 << feature.index())
    }
}

/// Error returned when an analog pin mnemonic is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown analog pin '{0}'")]
pub struct ParsePinError(pub String);

/// Slow analog pin on the extension connector.
///
/// Raw ids follow the instrument enumeration: outputs 0–3, inputs 4–7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum AnalogPin {
    /// Analog output 0.
    Aout0 = 0,
    /// Analog output 1.
    Aout1 = 1,
    /// Analog output 2.
    Aout2 = 2,
    /// Analog output 3.
    Aout3 = 3,
    /// Analog input 0.
    Ain0 = 4,
    /// Analog input 1.
    Ain1 = 5,
    /// Analog input 2.
    Ain2 = 6,
    /// Analog input 3.
    Ain3 = 7,
}

impl AnalogPin {
    /// All pins in id order.
    pub const ALL: [AnalogPin; 8] = [
        AnalogPin::Aout0,
        AnalogPin::Aout1,
        AnalogPin::Aout2,
        AnalogPin::Aout3,
        AnalogPin::Ain0,
        AnalogPin::Ain1,
        AnalogPin::Ain2,
        AnalogPin::Ain3,
    ];

    /// The four input pins, indexable by relock selector value.
    pub const INPUTS: [AnalogPin; 4] = [
        AnalogPin::Ain0,
        AnalogPin::Ain1,
        AnalogPin::Ain2,
        AnalogPin::Ain3,
    ];

    /// The four output pins.
    pub const OUTPUTS: [AnalogPin; 4] = [
        AnalogPin::Aout0,
        AnalogPin::Aout1,
        AnalogPin::Aout2,
        AnalogPin::Aout3,
    ];

    /// Resolve a raw pin id.
    ///
    /// # Errors
    /// `OutOfRange` for ids above 7.
    pub fn from_id(id: u32) -> LockboxResult<Self> {
        Self::ALL
            .get(id as usize)
            .copied()
            .ok_or_else(|| LockboxError::out_of_range("analog pin", id))
    }

    /// Raw pin id (0–7).
    #[inline]
    pub const fn id(self) -> u32 {
        self as u32
    }

    /// True for `AIN0..AIN3`.
    #[inline]
    pub const fn is_input(self) -> bool {
        self.id() >= AnalogPin::Ain0.id()
    }

    /// Index within its direction (0–3).
    #[inline]
    pub const fn index(self) -> usize {
        (self.id() % 4) as usize
    }

    /// Protocol mnemonic.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Aout0 => "AOUT0",
            Self::Aout1 => "AOUT1",
            Self::Aout2 => "AOUT2",
            Self::Aout3 => "AOUT3",
            Self::Ain0 => "AIN0",
            Self::Ain1 => "AIN1",
            Self::Ain2 => "AIN2",
            Self::Ain3 => "AIN3",
        }
    }
}

impl fmt::Display for AnalogPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnalogPin {
    type Err = ParsePinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|pin| pin.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParsePinError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn loop_slots_follow_output_major_order() {
        assert_eq!(LoopId::new(1, 1).unwrap().slot(), 0);
        assert_eq!(LoopId::new(2, 1).unwrap().slot(), 1);
        assert_eq!(LoopId::new(1, 2).unwrap().slot(), 2);
        assert_eq!(LoopId::new(2, 2).unwrap().slot(), 3);
        for (slot, id) in LoopId::ALL.iter().enumerate() {
            assert_eq!(id.slot(), slot);
        }
    }

    #[test]
    fn invalid_loop_pairs_are_out_of_range() {
        for (i, o) in [(0, 1), (1, 0), (3, 1), (1, 3), (255, 255)] {
            let err = LoopId::new(i, o).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::OutOfRange, "pair ({i},{o})");
        }
    }

    #[test]
    fn loop_display_uses_protocol_naming() {
        assert_eq!(LoopId::new(2, 1).unwrap().to_string(), "IN2:OUT1");
    }

    #[test]
    fn feature_flags_line_up_with_indices() {
        for feature in Feature::ALL {
            assert_eq!(LoopFeatures::from(feature).bits(), 1 << feature.index());
        }
        assert_eq!(LoopFeatures::all().bits(), 0x1F);
    }

    #[test]
    fn pin_ids_and_directions() {
        assert_eq!(AnalogPin::from_id(4).unwrap(), AnalogPin::Ain0);
        assert_eq!(AnalogPin::from_id(8).unwrap_err().kind(), ErrorKind::OutOfRange);
        assert!(AnalogPin::Ain3.is_input());
        assert!(!AnalogPin::Aout3.is_input());
        assert_eq!(AnalogPin::Ain2.index(), 2);
        assert_eq!(AnalogPin::Aout1.index(), 1);
    }

    #[test]
    fn pin_mnemonics_parse() {
        assert_eq!("AIN1".parse::<AnalogPin>().unwrap(), AnalogPin::Ain1);
        assert_eq!("aout0".parse::<AnalogPin>().unwrap(), AnalogPin::Aout0);
        assert!("AIN4".parse::<AnalogPin>().is_err());
    }

    #[test]
    fn channel_serializes_as_number() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            ch: Channel,
        }
        let text = toml::to_string(&Wrapper { ch: Channel::Ch2 }).unwrap();
        assert!(text.contains("ch = 2"));
        assert!(toml::from_str::<Wrapper>("ch = 3").is_err());
    }
}
