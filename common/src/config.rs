use serde::{Deserialize, Serialize};

pub const MIN_POWER: u8 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlConfig {
    pub range_half_width_c: f32,
    pub boost_deficit_c: f32,
    pub normal_max_power: u8,
    pub boost_max_power: u8,
    pub peace_convector_pct: i8,
    pub boost_convector_pct: i8,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            range_half_width_c: 1.0,
            boost_deficit_c: 3.0,
            normal_max_power: 5,
            boost_max_power: 7,
            peace_convector_pct: -15,
            boost_convector_pct: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TrendThresholds {
    pub stability: f32,
    pub trend: f32,
}

impl TrendThresholds {
    pub const fn new(stability: f32, trend: f32) -> Self {
        Self { stability, trend }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendConfig {
    pub window_minutes: u32,
    pub min_span_minutes: u32,
    pub measured_temperature: TrendThresholds,
    pub configured_power: TrendThresholds,
    pub burn_temperature: TrendThresholds,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            window_minutes: 16,
            min_span_minutes: 10,
            measured_temperature: TrendThresholds::new(0.1, 0.1),
            configured_power: TrendThresholds::new(0.0, 0.0),
            burn_temperature: TrendThresholds::new(30.0, 30.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorConfig {
    pub temperature_offset_c: f32,
    pub stale_timeout_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            temperature_offset_c: -0.6,
            stale_timeout_ms: 600_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CadenceConfig {
    pub times: Vec<String>,
    pub io_timeout_ms: u64,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            times: vec!["PT5M".to_string()],
            io_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_pass: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mqtt_host: "127.0.0.1".to_string(),
            mqtt_port: 1883,
            mqtt_user: String::new(),
            mqtt_pass: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub trend: TrendConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub cadence: CadenceConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

impl ControlConfig {
    pub fn sanitize(&mut self) {
        self.range_half_width_c = self.range_half_width_c.clamp(0.1, 5.0);
        self.boost_deficit_c = self.boost_deficit_c.clamp(0.0, 10.0);
        self.normal_max_power = self.normal_max_power.max(MIN_POWER);
        if self.boost_max_power < self.normal_max_power {
            self.boost_max_power = self.normal_max_power;
        }
    }
}

impl TrendConfig {
    pub fn sanitize(&mut self) {
        self.window_minutes = self.window_minutes.max(1);
        if self.min_span_minutes > self.window_minutes {
            self.min_span_minutes = self.window_minutes;
        }
        for thresholds in [
            &mut self.measured_temperature,
            &mut self.configured_power,
            &mut self.burn_temperature,
        ] {
            thresholds.stability = thresholds.stability.max(0.0);
            thresholds.trend = thresholds.trend.max(0.0);
        }
    }
}

impl RuntimeConfig {
    pub fn sanitize(&mut self) {
        self.control.sanitize();
        self.trend.sanitize();
        if self.cadence.times.is_empty() {
            self.cadence.times = CadenceConfig::default().times;
        }
        self.cadence.io_timeout_ms = self.cadence.io_timeout_ms.clamp(1_000, 300_000);
    }
}
