//! Built-in Units
//!
//! The units every patch description can instantiate: a constant parameter
//! source, a sine oscillator and a float-to-PCM converter.

use crate::component::{float_input, Arguments, Component, ComponentError, ExecutionContext};
use crate::port::{ComponentDescription, PortDescriptor};
use crate::value::{Sample, Value, ValueKind, FULL_SCALE};
use std::f64::consts::TAU;

/// Constant Float source
///
/// Holds the value given at construction and emits it on every step.
pub struct FloatParam {
    value: f64,
    spec: ComponentDescription,
}

impl FloatParam {
    pub const TYPE_NAME: &'static str = "FloatParam";

    pub fn new(value: f64) -> Self {
        Self {
            value,
            spec: ComponentDescription::new().with_output(
                PortDescriptor::new("float", ValueKind::Float)
                    .with_description("desired float value"),
            ),
        }
    }

    /// Construct from `value=<number>`; the value defaults to 0.0
    pub fn from_arguments(mut args: Arguments) -> Result<Self, ComponentError> {
        let value = args.take_float("value")?.unwrap_or(0.0);
        args.finish()?;
        Ok(Self::new(value))
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

impl Default for FloatParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Component for FloatParam {
    fn description(&self) -> &ComponentDescription {
        &self.spec
    }

    fn step(
        &mut self,
        _: &ExecutionContext,
        _: &[Value],
        outputs: &mut [Value],
    ) -> Result<(), ComponentError> {
        outputs[0] = Value::Float(self.value);
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }
}

/// Sine oscillator
///
/// `sinusoid = sin(phase) * gain + offset`, where the phase (radians) advances
/// by `2π · freq / fs` each step and wraps at 2π. The phase starts at zero, so
/// the first output is already one increment in.
pub struct SinGenerator {
    phase: f64,
    spec: ComponentDescription,
}

impl SinGenerator {
    pub const TYPE_NAME: &'static str = "SinGenerator";

    pub fn new() -> Self {
        Self {
            phase: 0.0,
            spec: ComponentDescription::new()
                .with_input(
                    PortDescriptor::new("freq", ValueKind::Float)
                        .with_description("frequency in Hz, between 0 and the sampling frequency"),
                )
                .with_input(
                    PortDescriptor::new("gain", ValueKind::Float)
                        .with_description("amplitude of the sinusoid, min 0"),
                )
                .with_input(
                    PortDescriptor::new("offset", ValueKind::Float)
                        .with_description("DC offset added to the sinusoid"),
                )
                .with_output(
                    PortDescriptor::new("sinusoid", ValueKind::Float)
                        .with_description("sinusoid curve"),
                ),
        }
    }

    pub fn from_arguments(args: Arguments) -> Result<Self, ComponentError> {
        args.finish()?;
        Ok(Self::new())
    }

    /// Current phase in radians, in [0, 2π)
    pub fn phase(&self) -> f64 {
        self.phase
    }
}

impl Default for SinGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for SinGenerator {
    fn description(&self) -> &ComponentDescription {
        &self.spec
    }

    fn step(
        &mut self,
        ctx: &ExecutionContext,
        inputs: &[Value],
        outputs: &mut [Value],
    ) -> Result<(), ComponentError> {
        if ctx.sampling_frequency == 0 {
            return Err(ComponentError::InvalidSamplingFrequency(0));
        }

        let freq = float_input(&self.spec, inputs, 0)?;
        let gain = float_input(&self.spec, inputs, 1)?;
        let offset = float_input(&self.spec, inputs, 2)?;

        let increment = TAU * freq / f64::from(ctx.sampling_frequency);
        self.phase = libm::fmod(self.phase + increment, TAU);

        outputs[0] = Value::Float(libm::sin(self.phase) * gain + offset);
        Ok(())
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }
}

/// Float to stereo PCM converter
///
/// Clamps its input to [-1, 1] and scales it to 16-bit full scale, rounding
/// half away from zero (0.5 becomes 16384). Both channels get the same value.
pub struct FloatToSample {
    spec: ComponentDescription,
}

impl FloatToSample {
    pub const TYPE_NAME: &'static str = "FloatToSample";

    pub fn new() -> Self {
        Self {
            spec: ComponentDescription::new()
                .with_input(
                    PortDescriptor::new("float", ValueKind::Float)
                        .with_description("float to convert into an audio signal"),
                )
                .with_output(
                    PortDescriptor::new("sample", ValueKind::Sample)
                        .with_description("converted audio"),
                ),
        }
    }

    pub fn from_arguments(args: Arguments) -> Result<Self, ComponentError> {
        args.finish()?;
        Ok(Self::new())
    }

    /// The conversion applied on every step
    pub fn convert(signal: f64) -> Sample {
        // NaN maps to silence
        let clamped = if signal.is_nan() {
            0.0
        } else {
            signal.clamp(-1.0, 1.0)
        };
        Sample::mono((clamped * FULL_SCALE).round() as i16)
    }
}

impl Default for FloatToSample {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for FloatToSample {
    fn description(&self) -> &ComponentDescription {
        &self.spec
    }

    fn step(
        &mut self,
        _: &ExecutionContext,
        inputs: &[Value],
        outputs: &mut [Value],
    ) -> Result<(), ComponentError> {
        let signal = float_input(&self.spec, inputs, 0)?;
        outputs[0] = Value::Sample(Self::convert(signal));
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const CTX: ExecutionContext = ExecutionContext {
        sampling_frequency: 48_000,
    };

    fn run(unit: &mut dyn Component, inputs: &[Value]) -> Value {
        let mut outputs = unit.description().initial_values(crate::port::Direction::Output);
        unit.step(&CTX, inputs, &mut outputs).unwrap();
        outputs.remove(0)
    }

    #[test]
    fn test_float_param_emits_constant() {
        let mut param = FloatParam::new(650.0);
        for _ in 0..3 {
            assert_eq!(run(&mut param, &[]), Value::Float(650.0));
        }
        assert_eq!(param.type_name(), "FloatParam");
    }

    #[test]
    fn test_float_param_arguments() {
        let param = FloatParam::from_arguments(Arguments::new().with("value", 2i64)).unwrap();
        assert_eq!(param.value(), 2.0);

        let param = FloatParam::from_arguments(Arguments::new()).unwrap();
        assert_eq!(param.value(), 0.0);

        let err = FloatParam::from_arguments(Arguments::new().with("volume", 1.0)).err();
        assert_eq!(err, Some(ComponentError::UnknownArgument("volume".into())));
    }

    #[test]
    fn test_sin_generator_phase_and_output() {
        let mut osc = SinGenerator::new();
        let inputs = [Value::Float(1000.0), Value::Float(1.0), Value::Float(0.0)];
        let increment = TAU * 1000.0 / 48_000.0;

        let mut expected_phase = 0.0_f64;
        for _ in 0..48 {
            let out = run(&mut osc, &inputs).as_float().unwrap();
            expected_phase = (expected_phase + increment) % TAU;
            assert_relative_eq!(osc.phase(), expected_phase, epsilon = 1e-9);
            assert_relative_eq!(out, expected_phase.sin(), epsilon = 1e-9);
        }

        // 48 steps at 1 kHz / 48 kHz is one full turn
        let turn = osc.phase().min(TAU - osc.phase());
        assert!(turn < 1e-9, "phase {} not back at zero", osc.phase());
    }

    #[test]
    fn test_sin_generator_gain_and_offset() {
        let mut osc = SinGenerator::new();
        // Quarter turn per step: first output is sin(π/2)
        let inputs = [Value::Float(12_000.0), Value::Float(0.5), Value::Float(0.25)];
        let out = run(&mut osc, &inputs).as_float().unwrap();
        assert_relative_eq!(out, 0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_sin_generator_reset() {
        let mut osc = SinGenerator::new();
        let inputs = [Value::Float(440.0), Value::Float(1.0), Value::Float(0.0)];
        run(&mut osc, &inputs);
        assert!(osc.phase() > 0.0);
        osc.reset();
        assert_eq!(osc.phase(), 0.0);
    }

    #[test]
    fn test_sin_generator_rejects_zero_sampling_frequency() {
        let mut osc = SinGenerator::new();
        let ctx = ExecutionContext {
            sampling_frequency: 0,
        };
        let inputs = [Value::Float(1.0), Value::Float(1.0), Value::Float(0.0)];
        let mut outputs = [Value::Float(0.0)];
        assert_eq!(
            osc.step(&ctx, &inputs, &mut outputs),
            Err(ComponentError::InvalidSamplingFrequency(0))
        );
    }

    #[test]
    fn test_sin_generator_rejects_wrong_input_kind() {
        let mut osc = SinGenerator::new();
        let inputs = [Value::Float(1.0), Value::Integer(1), Value::Float(0.0)];
        let mut outputs = [Value::Float(0.0)];
        let err = osc.step(&CTX, &inputs, &mut outputs).unwrap_err();
        assert_eq!(
            err,
            ComponentError::InputType {
                port: "gain".into(),
                expected: ValueKind::Float,
                found: ValueKind::Integer,
            }
        );
    }

    #[test]
    fn test_float_to_sample_clamps_and_rounds() {
        assert_eq!(FloatToSample::convert(1.5), Sample::mono(32767));
        assert_eq!(FloatToSample::convert(-2.0), Sample::mono(-32767));
        assert_eq!(FloatToSample::convert(0.5), Sample::mono(16384));
        assert_eq!(FloatToSample::convert(-0.5), Sample::mono(-16384));
        assert_eq!(FloatToSample::convert(0.0), Sample::SILENCE);
        assert_eq!(FloatToSample::convert(f64::NAN), Sample::SILENCE);
    }

    #[test]
    fn test_float_to_sample_step() {
        let mut f2s = FloatToSample::new();
        assert_eq!(
            run(&mut f2s, &[Value::Float(1.5)]),
            Value::Sample(Sample::new(32767, 32767))
        );
    }

    #[test]
    fn test_constructors_reject_arguments() {
        assert!(SinGenerator::from_arguments(Arguments::new().with("freq", 1.0)).is_err());
        assert!(FloatToSample::from_arguments(Arguments::new()).is_ok());
    }
}
