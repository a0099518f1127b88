//! Analog mixed signals: slow analog pins and fast channel readback.

use crate::block::RegisterWindow;
use crate::convert::{
    FAST_IN_SCALE, FAST_OUT_SCALE, analog_out_to_counts, counts_to_absolute,
    counts_to_analog_out, counts_to_volts,
};
use lockbox_common::calibration::CalibrationSource;
use lockbox_common::consts::{
    AMS_AIF_OFFSET, AMS_DAC_OFFSET, AMS_FADC_OFFSET, AMS_FDAC_OFFSET, ANALOG_IN_MASK,
    ANALOG_OUT_BITS, ANALOG_OUT_MASK, FAST_DATA_MASK, WORD_SIZE,
};
use lockbox_common::error::{LockboxError, LockboxResult};
use lockbox_common::types::{AnalogPin, Channel};
use std::sync::Arc;
use tracing::{debug, info};

/// Reads and drives the AMS block.
pub struct AmsMonitor {
    regs: RegisterWindow,
    calibration: Arc<dyn CalibrationSource>,
}

impl std::fmt::Debug for AmsMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmsMonitor")
            .field("regs", &self.regs)
            .finish_non_exhaustive()
    }
}

impl AmsMonitor {
    /// Wrap the AMS register block.
    pub fn new(regs: RegisterWindow, calibration: Arc<dyn CalibrationSource>) -> Self {
        Self { regs, calibration }
    }

    fn aif(pin: AnalogPin) -> usize {
        AMS_AIF_OFFSET + pin.index() * WORD_SIZE
    }

    fn dac(pin: AnalogPin) -> usize {
        AMS_DAC_OFFSET + pin.index() * WORD_SIZE
    }

    /// Current voltage of a slow analog pin.
    ///
    /// Inputs read the slow ADC (0.0 to 7.0 V); outputs read back the DAC
    /// setting (0.0 to 1.8 V).
    pub fn pin_value(&self, pin: AnalogPin) -> LockboxResult<f64> {
        if pin.is_input() {
            let counts = self.regs.get_field(Self::aif(pin), ANALOG_IN_MASK, 0)?;
            Ok(counts_to_absolute(counts))
        } else {
            let counts = self
                .regs
                .get_field(Self::dac(pin), ANALOG_OUT_MASK, ANALOG_OUT_BITS)?;
            Ok(counts_to_analog_out(counts))
        }
    }

    /// Drive a slow analog output (saturates at 1.8 V).
    ///
    /// # Errors
    /// - `OutOfRange` if `pin` is an input
    /// - `InvalidParameterValue` for negative or NaN volts
    pub fn set_pin_value(&self, pin: AnalogPin, volts: f64) -> LockboxResult<()> {
        if pin.is_input() {
            return Err(LockboxError::out_of_range("analog output pin", pin.id()));
        }
        let counts = analog_out_to_counts(volts)?;
        debug!(%pin, volts, counts, "set analog output");
        self.regs
            .set_field(Self::dac(pin), counts, ANALOG_OUT_MASK, ANALOG_OUT_BITS)
    }

    /// Drive all slow analog outputs to 0 V.
    pub fn reset_pins(&self) -> LockboxResult<()> {
        for pin in AnalogPin::OUTPUTS {
            self.regs
                .set_field(Self::dac(pin), 0, ANALOG_OUT_MASK, ANALOG_OUT_BITS)?;
        }
        info!("analog outputs reset");
        Ok(())
    }

    /// Fast ADC reading of an input channel, through its input calibration.
    pub fn in_voltage(&self, channel: Channel) -> LockboxResult<f64> {
        let offset = AMS_FADC_OFFSET + channel.index() * WORD_SIZE;
        let raw = self.regs.get_field(offset, FAST_DATA_MASK, 0)?;
        let cal = self.calibration.current_calibration().input(channel);
        Ok(counts_to_volts(FAST_IN_SCALE, raw, cal, 0.0))
    }

    /// Fast DAC value of an output channel, through its output calibration.
    pub fn out_voltage(&self, channel: Channel) -> LockboxResult<f64> {
        let offset = AMS_FDAC_OFFSET + channel.index() * WORD_SIZE;
        let raw = self.regs.get_field(offset, FAST_DATA_MASK, 0)?;
        let cal = self.calibration.current_calibration().output(channel);
        Ok(counts_to_volts(FAST_OUT_SCALE, raw, cal, 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimBlock;
    use lockbox_common::calibration::CalibrationRecord;
    use lockbox_common::consts::AMS_BASE_SIZE;
    use lockbox_common::error::ErrorKind;

    fn monitor() -> AmsMonitor {
        AmsMonitor::new(
            RegisterWindow::new("ams", SimBlock::new(AMS_BASE_SIZE)),
            Arc::new(CalibrationRecord::default()),
        )
    }

    #[test]
    fn output_pin_lands_at_bit_16() {
        let ams = monitor();
        ams.regs.write_word(AMS_DAC_OFFSET + 4, 0xFF00_FFFF).unwrap();
        ams.set_pin_value(AnalogPin::Aout1, 0.9).unwrap();
        assert_eq!(ams.regs.read_word(AMS_DAC_OFFSET + 4).unwrap(), 0xFF4E_FFFF);
        assert!((ams.pin_value(AnalogPin::Aout1).unwrap() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn input_pins_are_read_only() {
        let ams = monitor();
        let err = ams.set_pin_value(AnalogPin::Ain0, 1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
        let err = ams.set_pin_value(AnalogPin::Aout0, -1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameterValue);
    }

    #[test]
    fn input_pin_reads_slow_adc() {
        let ams = monitor();
        ams.regs.write_word(AMS_AIF_OFFSET + 8, 0xFFF).unwrap();
        assert_eq!(ams.pin_value(AnalogPin::Ain2).unwrap(), 7.0);
        assert_eq!(ams.pin_value(AnalogPin::Ain0).unwrap(), 0.0);
    }

    #[test]
    fn reset_clears_every_output() {
        let ams = monitor();
        for pin in AnalogPin::OUTPUTS {
            ams.set_pin_value(pin, 1.8).unwrap();
        }
        ams.reset_pins().unwrap();
        for pin in AnalogPin::OUTPUTS {
            assert_eq!(ams.pin_value(pin).unwrap(), 0.0);
        }
    }

    #[test]
    fn fast_readback_is_signed() {
        let ams = monitor();
        ams.regs.write_word(AMS_FADC_OFFSET + 4, 0x3000).unwrap();
        ams.regs.write_word(AMS_FDAC_OFFSET, 0x1000).unwrap();
        assert_eq!(ams.in_voltage(Channel::Ch2).unwrap(), -0.5);
        assert_eq!(ams.out_voltage(Channel::Ch1).unwrap(), 0.5);
    }
}
