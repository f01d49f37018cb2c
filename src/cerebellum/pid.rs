use std::f64::consts::FRAC_PI_2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 0.5,
            ki: 0.01,
            kd: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Axis {
    integral: f64,
    last_error: f64,
}

impl Axis {
    fn step(&mut self, error: f64, gains: &PidGains, max_integral: f64, max_output: f64) -> f64 {
        self.integral = (self.integral + error).clamp(-max_integral, max_integral);
        let derivative = error - self.last_error;
        self.last_error = error;
        let output = gains.kp * error + gains.ki * self.integral + gains.kd * derivative;
        output.clamp(-max_output, max_output)
    }
}

/// Two independent PID loops (yaw and pitch) sharing one set of gains.
/// Errors are in degrees, outputs in rad/tick. Pitch saturates at half the
/// yaw limit.
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    max_integral: f64,
    max_output: f64,
    yaw: Axis,
    pitch: Axis,
}

impl Default for PidController {
    fn default() -> Self {
        Self::new(PidGains::default())
    }
}

impl PidController {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            max_integral: 10.0,
            max_output: FRAC_PI_2,
            yaw: Axis::default(),
            pitch: Axis::default(),
        }
    }

    pub fn yaw_rate(&mut self, yaw_error: f64) -> f64 {
        self.yaw.step(yaw_error, &self.gains, self.max_integral, self.max_output)
    }

    pub fn pitch_rate(&mut self, pitch_error: f64) -> f64 {
        self.pitch
            .step(pitch_error, &self.gains, self.max_integral, self.max_output / 2.0)
    }

    pub fn max_yaw_output(&self) -> f64 {
        self.max_output
    }

    pub fn max_pitch_output(&self) -> f64 {
        self.max_output / 2.0
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn set_gains(&mut self, gains: PidGains) {
        self.gains = gains;
    }

    pub fn set_max_integral(&mut self, max_integral: f64) {
        self.max_integral = max_integral.abs();
    }

    pub fn set_max_output(&mut self, max_output: f64) {
        self.max_output = max_output.abs();
    }

    pub fn reset(&mut self) {
        self.yaw = Axis::default();
        self.pitch = Axis::default();
    }
}
