/// Symmetric triangle wave with unit period, scaled by `amplitude` and
/// clamped to `[-1, 1]`.
///
/// Peaks (`+amplitude`) at integer phases, troughs (`-amplitude`) at
/// half-integer phases. The phase is wrapped with a euclidean modulo so the
/// wave stays continuous through negative phases.
pub fn triangle(phase: f64, amplitude: f32) -> f32 {
    let fractional = phase.rem_euclid(1.0);
    let ramp = 4.0 * (fractional - 0.5).abs() - 1.0;
    let value = f64::from(amplitude) * ramp;
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(-1.0, 1.0) as f32
}
