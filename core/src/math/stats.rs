pub struct StatsHelper;

impl StatsHelper {
    pub fn mean(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().sum::<f32>() / samples.len() as f32
    }

    pub fn rms(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f32 = samples.iter().map(|&v| v * v).sum();
        (sum_sq / samples.len() as f32).sqrt()
    }

    /// Population variance (divides by n, matching the feature pipeline).
    pub fn variance(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let mean = Self::mean(samples);
        samples.iter().map(|&v| (v - mean) * (v - mean)).sum::<f32>() / samples.len() as f32
    }

    pub fn std_dev(samples: &[f32]) -> f32 {
        Self::variance(samples).sqrt()
    }

    /// Excess kurtosis (Fisher definition); 0.0 for flat or degenerate input.
    pub fn kurtosis(samples: &[f32]) -> f32 {
        let m2 = Self::variance(samples);
        if samples.is_empty() || m2 <= f32::EPSILON {
            return 0.0;
        }
        let mean = Self::mean(samples);
        let m4 = samples
            .iter()
            .map(|&v| {
                let d = v - mean;
                d * d * d * d
            })
            .sum::<f32>()
            / samples.len() as f32;
        m4 / (m2 * m2) - 3.0
    }

    /// Moment-based skewness; 0.0 for degenerate input.
    pub fn skewness(samples: &[f32]) -> f32 {
        let m2 = Self::variance(samples);
        if samples.is_empty() || m2 <= f32::EPSILON {
            return 0.0;
        }
        let mean = Self::mean(samples);
        let m3 = samples
            .iter()
            .map(|&v| {
                let d = v - mean;
                d * d * d
            })
            .sum::<f32>()
            / samples.len() as f32;
        m3 / m2.powf(1.5)
    }
}
