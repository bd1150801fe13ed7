pub struct StatsHelper;

impl StatsHelper {
    /// Rounds half away from zero to `decimals` places.
    pub fn round_to(value: f32, decimals: u32) -> f32 {
        let factor = 10f32.powi(decimals as i32);
        (value * factor).round() / factor
    }

    pub fn mean(samples: &[f32]) -> Option<f32> {
        if samples.is_empty() {
            return None;
        }
        Some(samples.iter().sum::<f32>() / samples.len() as f32)
    }
}
