use crate::error::{QuadError, Result};
use crate::ring_buffer::RingBuffer;
use super::TiltSample;

/// Number of samples averaged by the filter
pub const HISTORY_LEN: usize = 3;

/// Moving-average smoother over the last three tilt samples.
///
/// The history starts as three zero samples, so `filtered()` is defined
/// before anything has been fed in.
pub struct TiltFilter{
    history: RingBuffer<TiltSample>,
    precision: i32,
}

impl TiltFilter{
    pub fn new() -> Self{
        TiltFilter{
            history: RingBuffer::new(HISTORY_LEN),
            precision: 0,
        }
    }

    pub fn with_precision(precision: i32) -> Result<Self>{
        let mut filter = Self::new();
        filter.set_round_precision(precision)?;
        Ok(filter)
    }

    pub fn add_sample(&mut self, sample: TiltSample){
        self.history.push(sample);
    }

    /// Rounded mean of the three slots, recomputed on every call
    pub fn filtered(&self) -> TiltSample{
        let (sum_x, sum_y) = self.history.iter()
            .fold((0.0f32, 0.0f32), |(x, y), s| (x + s.angle_x, y + s.angle_y));
        let n = self.history.len() as f32;

        TiltSample{
            angle_x: round_to(sum_x / n, self.precision),
            angle_y: round_to(sum_y / n, self.precision),
        }
    }

    /// Digits after the decimal point; -1 rounds to tens
    pub fn set_round_precision(&mut self, precision: i32) -> Result<()>{
        if precision < -1{
            return Err(QuadError::InvalidArgument(
                format!("round precision must be >= -1, got {}", precision)
            ));
        }
        self.precision = precision;
        Ok(())
    }

    pub fn round_precision(&self) -> i32{
        self.precision
    }

    pub fn samples_seen(&self) -> u64{
        self.history.latest_epoch()
    }
}

impl Default for TiltFilter{
    fn default() -> Self{
        Self::new()
    }
}

//f32 has no fractional part above 2^23
const EXACT_INTEGER_LIMIT: f32 = 8_388_608.0;

//half away from zero
//a precision finer than f32 can hold leaves the value as is
fn round_to(value: f32, precision: i32) -> f32{
    if precision >= 0{
        let scale = 10f32.powi(precision);
        let scaled = value * scale;
        if !scaled.is_finite() || scaled.abs() >= EXACT_INTEGER_LIMIT{
            return value;
        }
        scaled.round() / scale
    }else{
        let scale = 10f32.powi(-precision);
        (value / scale).round() * scale
    }
}

#[cfg(test)]
mod tests{
    use super::*;

    fn mean_of(samples: &[TiltSample], precision: i32) -> TiltSample{
        let last: Vec<_> = samples.iter().rev().take(3).collect();
        let mut x = 0.0;
        let mut y = 0.0;
        for s in &last{
            x += s.angle_x;
            y += s.angle_y;
        }
        TiltSample::new(round_to(x / 3.0, precision), round_to(y / 3.0, precision))
    }

    #[test]
    fn test_zero_before_samples(){
        let filter = TiltFilter::new();
        assert_eq!(filter.filtered(), TiltSample::new(0.0, 0.0));
        assert_eq!(filter.samples_seen(), 0);
    }

    #[test]
    fn test_partial_history_averages_zero_slots(){
        let mut filter = TiltFilter::new();
        filter.add_sample(TiltSample::new(9.0, -3.0));
        assert_eq!(filter.filtered(), TiltSample::new(3.0, -1.0));
    }

    #[test]
    fn test_mean_of_last_three(){
        let samples = [
            TiltSample::new(12.0, 1.0),
            TiltSample::new(30.0, -4.0),
            TiltSample::new(3.0, 2.0),
            TiltSample::new(6.5, 8.0),
            TiltSample::new(-1.0, 0.4),
        ];
        let mut filter = TiltFilter::new();
        for (i, s) in samples.iter().enumerate(){
            filter.add_sample(*s);
            if i >= 2{
                assert_eq!(filter.filtered(), mean_of(&samples[..=i], 0));
            }
        }
        //3 + 6.5 - 1 = 8.5 -> 2.83 -> 3
        assert_eq!(filter.filtered().angle_x, 3.0);
    }

    #[test]
    fn test_precision(){
        let mut filter = TiltFilter::with_precision(2).unwrap();
        filter.add_sample(TiltSample::new(1.0, 0.0));
        filter.add_sample(TiltSample::new(1.0, 0.0));
        filter.add_sample(TiltSample::new(2.0, 0.0));
        assert!((filter.filtered().angle_x - 1.33).abs() < 1e-5);

        filter.set_round_precision(-1).unwrap();
        filter.add_sample(TiltSample::new(40.0, 0.0));
        //(1 + 2 + 40) / 3 = 14.33 -> 10
        assert_eq!(filter.filtered().angle_x, 10.0);
    }

    #[test]
    fn test_huge_precision_keeps_mean(){
        let mut filter = TiltFilter::with_precision(39).unwrap();
        assert_eq!(filter.filtered(), TiltSample::new(0.0, 0.0));
        for _ in 0..3{
            filter.add_sample(TiltSample::new(30.0, -12.5));
        }
        assert_eq!(filter.filtered(), TiltSample::new(30.0, -12.5));

        filter.set_round_precision(i32::MAX).unwrap();
        assert_eq!(filter.filtered(), TiltSample::new(30.0, -12.5));

        //scale is finite but value * scale overflows
        filter.set_round_precision(38).unwrap();
        assert_eq!(filter.filtered(), TiltSample::new(30.0, -12.5));

        filter.set_round_precision(20).unwrap();
        assert_eq!(filter.filtered(), TiltSample::new(30.0, -12.5));
    }

    #[test]
    fn test_invalid_precision_rejected(){
        let mut filter = TiltFilter::new();
        filter.set_round_precision(3).unwrap();
        let err = filter.set_round_precision(-2).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(filter.round_precision(), 3);
        assert!(TiltFilter::with_precision(-5).is_err());
    }
}
