use derive_more::Display;

/// Current in amperes, derived from an ACS712 output voltage.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display)]
#[display(fmt = "{:.3}", value)]
pub struct Current {
    pub value: f64,
}

impl Current {
    /// Convert a current sensor output voltage into amperes.
    ///
    /// `v_offset` is the sensor output with no current flowing and
    /// `sensitivity` is the output change per ampere (V/A). No rounding
    /// happens here, only when displayed.
    pub fn from_sensor_reading(reading: f64, v_offset: f64, sensitivity: f64) -> Self {
        Self {
            value: (v_offset - reading) / sensitivity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_current_at_offset() {
        let current = Current::from_sensor_reading(2.5, 2.5, 0.185);
        assert_eq!(current.value, 0.0);
        assert_eq!(current.to_string(), "0.000");
    }

    #[test]
    fn test_one_amp() {
        let current = Current::from_sensor_reading(2.315, 2.5, 0.185);
        assert_eq!(current.value, (2.5 - 2.315) / 0.185);
        assert_eq!(current.to_string(), "1.000");
    }

    #[test]
    fn test_is_exact_for_any_reading() {
        for reading in [0.0, 0.7, 1.234_567, 2.5, 3.9, 5.0] {
            for sensitivity in [0.185, 0.1, 0.066] {
                let current = Current::from_sensor_reading(reading, 2.5, sensitivity);
                assert_eq!(current.value, (2.5 - reading) / sensitivity);
            }
        }
    }

    #[test]
    fn test_reverse_current_is_negative() {
        let current = Current::from_sensor_reading(2.6, 2.5, 0.1);
        assert!(current.value < 0.0);
        assert_eq!(current.to_string(), "-1.000");
    }
}
