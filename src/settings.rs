use log::{info, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    #[serde(default = "RenderSettings::default_directional_light_capacity")]
    pub directional_light_capacity: u32,
    #[serde(default = "RenderSettings::default_point_light_capacity")]
    pub point_light_capacity: u32,
    #[serde(default = "RenderSettings::default_model_capacity")]
    pub model_capacity: u32,
    #[serde(default = "RenderSettings::default_clear_color")]
    pub clear_color: [f32; 4],
    #[serde(default)]
    pub camera: CameraSettings,
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default)]
    pub present_mode: PresentModeSetting,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            directional_light_capacity: Self::default_directional_light_capacity(),
            point_light_capacity: Self::default_point_light_capacity(),
            model_capacity: Self::default_model_capacity(),
            clear_color: Self::default_clear_color(),
            camera: CameraSettings::default(),
            resolution: Resolution::default(),
            present_mode: PresentModeSetting::default(),
        }
    }
}

impl RenderSettings {
    pub fn load() -> Self {
        Self::load_from_path("settings.json")
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Self {
        use std::fs;

        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|err| {
                warn!(
                    "Failed to parse {:?} ({}). Falling back to default render settings.",
                    path, err
                );
                RenderSettings::default()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "Render settings file {:?} not found. Using default settings.",
                    path
                );
                RenderSettings::default()
            }
            Err(err) => {
                warn!(
                    "Failed to read {:?} ({}). Falling back to default render settings.",
                    path, err
                );
                RenderSettings::default()
            }
        }
    }

    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RenderSettings>(contents).map(RenderSettings::validate)
    }

    pub fn validate(mut self) -> Self {
        // Queues grow by doubling, which never leaves zero.
        if self.directional_light_capacity == 0 {
            warn!("Directional light capacity must be greater than zero. Using default value.");
            self.directional_light_capacity = Self::default_directional_light_capacity();
        }

        if self.point_light_capacity == 0 {
            warn!("Point light capacity must be greater than zero. Using default value.");
            self.point_light_capacity = Self::default_point_light_capacity();
        }

        if self.model_capacity == 0 {
            warn!("Model capacity must be greater than zero. Using default value.");
            self.model_capacity = Self::default_model_capacity();
        }

        if !self.camera.is_valid() {
            warn!("Camera requires 0 < fov < 180 and 0 < near < far. Using default camera.");
            self.camera = CameraSettings::default();
        }

        if self.resolution.width == 0 || self.resolution.height == 0 {
            warn!("Resolution must be greater than zero. Using default resolution.");
            self.resolution = Resolution::default();
        }

        self
    }

    pub fn present_mode(&self, available: &[wgpu::PresentMode]) -> wgpu::PresentMode {
        let desired = self.present_mode.to_wgpu();
        if available.contains(&desired) {
            return desired;
        }

        warn!(
            "Requested present mode {:?} is not supported. Falling back to FIFO.",
            desired
        );

        if available.contains(&wgpu::PresentMode::Fifo) {
            wgpu::PresentMode::Fifo
        } else {
            available
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo)
        }
    }

    const fn default_directional_light_capacity() -> u32 {
        32
    }

    const fn default_point_light_capacity() -> u32 {
        128
    }

    const fn default_model_capacity() -> u32 {
        1024
    }

    const fn default_clear_color() -> [f32; 4] {
        [0.0, 0.0, 0.0, 1.0]
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CameraSettings {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl CameraSettings {
    pub fn fov_radians(&self) -> f32 {
        self.fov_degrees.to_radians()
    }

    fn is_valid(&self) -> bool {
        self.fov_degrees > 0.0
            && self.fov_degrees < 180.0
            && self.near > 0.0
            && self.far > self.near
    }
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_degrees: 60.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentModeSetting {
    #[default]
    Fifo,
    FifoRelaxed,
    Immediate,
    Mailbox,
    AutoVsync,
    AutoNoVsync,
}

impl PresentModeSetting {
    fn to_wgpu(&self) -> wgpu::PresentMode {
        match self {
            PresentModeSetting::Fifo => wgpu::PresentMode::Fifo,
            PresentModeSetting::FifoRelaxed => wgpu::PresentMode::FifoRelaxed,
            PresentModeSetting::Immediate => wgpu::PresentMode::Immediate,
            PresentModeSetting::Mailbox => wgpu::PresentMode::Mailbox,
            PresentModeSetting::AutoVsync => wgpu::PresentMode::AutoVsync,
            PresentModeSetting::AutoNoVsync => wgpu::PresentMode::AutoNoVsync,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings = RenderSettings::from_json(r#"{ "point_light_capacity": 4 }"#).unwrap();

        assert_eq!(settings.point_light_capacity, 4);
        assert_eq!(settings.directional_light_capacity, 32);
        assert_eq!(settings.model_capacity, 1024);
        assert_eq!(settings.clear_color, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn validate_replaces_zero_capacities() {
        let settings = RenderSettings::from_json(
            r#"{
                "directional_light_capacity": 0,
                "point_light_capacity": 0,
                "model_capacity": 0,
                "resolution": { "width": 0, "height": 600 }
            }"#,
        )
        .unwrap();
        let defaults = RenderSettings::default();

        assert_eq!(
            settings.directional_light_capacity,
            defaults.directional_light_capacity
        );
        assert_eq!(settings.point_light_capacity, defaults.point_light_capacity);
        assert_eq!(settings.model_capacity, defaults.model_capacity);
        assert_eq!(settings.resolution.width, Resolution::default().width);
    }

    #[test]
    fn validate_rejects_inverted_clip_planes() {
        let settings = RenderSettings::from_json(
            r#"{ "camera": { "fov_degrees": 70.0, "near": 10.0, "far": 1.0 } }"#,
        )
        .unwrap();

        assert_eq!(settings.camera.near, CameraSettings::default().near);
        assert_eq!(settings.camera.far, CameraSettings::default().far);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(RenderSettings::from_json("{ not json").is_err());
    }

    #[test]
    fn present_mode_parses_snake_case() {
        let settings = RenderSettings::from_json(r#"{ "present_mode": "auto_no_vsync" }"#).unwrap();
        assert!(matches!(
            settings.present_mode,
            PresentModeSetting::AutoNoVsync
        ));
    }

    #[test]
    fn present_mode_returns_desired_when_available() {
        let settings = RenderSettings {
            present_mode: PresentModeSetting::Mailbox,
            ..RenderSettings::default()
        };

        let available = [
            wgpu::PresentMode::Fifo,
            wgpu::PresentMode::Mailbox,
            wgpu::PresentMode::Immediate,
        ];

        assert_eq!(
            settings.present_mode(&available),
            wgpu::PresentMode::Mailbox
        );
    }

    #[test]
    fn present_mode_falls_back_to_fifo_when_desired_missing() {
        let settings = RenderSettings {
            present_mode: PresentModeSetting::Mailbox,
            ..RenderSettings::default()
        };

        let available = [wgpu::PresentMode::Fifo, wgpu::PresentMode::Immediate];

        assert_eq!(settings.present_mode(&available), wgpu::PresentMode::Fifo);
    }

    #[test]
    fn present_mode_uses_first_available_when_fifo_missing() {
        let settings = RenderSettings {
            present_mode: PresentModeSetting::Mailbox,
            ..RenderSettings::default()
        };

        let available = [wgpu::PresentMode::Immediate];

        assert_eq!(
            settings.present_mode(&available),
            wgpu::PresentMode::Immediate
        );
    }
}
