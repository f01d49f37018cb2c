use crate::model::{names, EntityInfo, PlayerState, SkillCall, Vec3, WorldSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlMode {
    Navigation,
    Alignment,
    Mining,
    Combat,
    Escape,
    Idle,
}

/// Wraps an angle in degrees into [-180, 180).
pub fn normalize_angle(degrees: f64) -> f64 {
    (degrees + 180.0).rem_euclid(360.0) - 180.0
}

/// Heading (yaw, degrees) that faces from `from` towards `to`.
pub fn heading_to(from: Vec3, to: Vec3) -> f64 {
    (-(to.x - from.x)).atan2(to.z - from.z).to_degrees()
}

fn elevation_to(from: Vec3, to: Vec3) -> f64 {
    let horizontal = from.horizontal_distance_to(to.x, to.z);
    -(to.y - from.y).atan2(horizontal).to_degrees()
}

/// Per-call controller setup: which mode to run and what to aim for.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillContext {
    pub mode: ControlMode,
    pub target_position: Option<Vec3>,
    pub target_yaw: f64,
    pub target_pitch: f64,
    pub speed: f64,
    pub cautious: bool,
    pub tolerance: f64,
    pub stand_off: f64,
    pub threat: Option<String>,
    pub min_distance: f64,
}

impl SkillContext {
    fn base(mode: ControlMode) -> Self {
        Self {
            mode,
            target_position: None,
            target_yaw: 0.0,
            target_pitch: 0.0,
            speed: 1.0,
            cautious: false,
            tolerance: 0.05,
            stand_off: 3.5,
            threat: None,
            min_distance: 10.0,
        }
    }

    pub fn from_call(call: &SkillCall, snapshot: &WorldSnapshot) -> Self {
        let params = &call.params;
        let player = &snapshot.player;

        match call.skill_name.as_str() {
            names::NAVIGATE_TO => {
                let target = match (params.get("x"), params.get("z")) {
                    (Some(_), Some(_)) => Vec3::new(
                        params.f64_or("x", player.position.x),
                        params.f64_or("y", player.position.y),
                        params.f64_or("z", player.position.z),
                    ),
                    _ => Vec3::new(player.position.x + 10.0, player.position.y, player.position.z + 10.0),
                };
                Self {
                    target_position: Some(target),
                    target_yaw: heading_to(player.position, target),
                    speed: params.f64_or("speed", 1.0),
                    cautious: params.bool_or("cautious", false),
                    ..Self::base(ControlMode::Navigation)
                }
            }
            names::ALIGN_CROSSHAIR => Self {
                tolerance: params.f64_or("tolerance", 0.05),
                ..Self::base(ControlMode::Alignment).aimed(call, snapshot)
            },
            names::MINE => Self::base(ControlMode::Mining).aimed(call, snapshot),
            names::COMBAT_KITE => Self {
                stand_off: params.f64_or("distance", 3.5),
                ..Self::base(ControlMode::Combat).aimed(call, snapshot)
            },
            names::ESCAPE => Self {
                speed: 1.5,
                threat: params.text("threat").map(str::to_string),
                min_distance: params.f64_or("minDistance", 10.0),
                ..Self::base(ControlMode::Escape)
            },
            _ => Self::base(ControlMode::Idle),
        }
    }

    /// Explicit `targetYaw`/`targetPitch` params win; otherwise aim at the
    /// entity named by `target` (by id or kind, "enemy" meaning the nearest
    /// hostile) or the nearest block of the `resource` kind; otherwise aim at
    /// yaw 0, pitch 0.
    fn aimed(mut self, call: &SkillCall, snapshot: &WorldSnapshot) -> Self {
        let player = &snapshot.player;
        let params = &call.params;

        let target = params
            .text("target")
            .and_then(|t| find_target(t, snapshot))
            .or_else(|| params.text("resource").and_then(|r| find_block(r, snapshot)));
        if let Some(target) = target {
            let eye = player.position;
            self.target_position = Some(target);
            self.target_yaw = heading_to(eye, target);
            self.target_pitch = elevation_to(eye, target);
        }
        self.target_yaw = params.f64_or("targetYaw", self.target_yaw);
        self.target_pitch = params.f64_or("targetPitch", self.target_pitch);
        self
    }

    pub fn yaw_error(&self, player: &PlayerState) -> f64 {
        normalize_angle(self.target_yaw - player.yaw)
    }

    pub fn pitch_error(&self, player: &PlayerState) -> f64 {
        normalize_angle(self.target_pitch - player.pitch)
    }

    pub fn distance_to_target(&self, player: &PlayerState) -> Option<f64> {
        self.target_position.map(|t| player.distance_to(t))
    }
}

fn nearest_entity(snapshot: &WorldSnapshot, pred: impl Fn(&EntityInfo) -> bool) -> Option<Vec3> {
    let origin = snapshot.player.position;
    snapshot
        .entities
        .iter()
        .filter(|e| pred(e))
        .min_by(|a, b| a.distance_to(origin).total_cmp(&b.distance_to(origin)))
        .map(|e| e.position)
}

fn find_target(target: &str, snapshot: &WorldSnapshot) -> Option<Vec3> {
    nearest_entity(snapshot, |e| e.id == target || e.kind == target).or_else(|| {
        if target == "enemy" {
            nearest_entity(snapshot, EntityInfo::is_hostile)
        } else {
            None
        }
    })
}

fn find_block(kind: &str, snapshot: &WorldSnapshot) -> Option<Vec3> {
    let origin = snapshot.player.position;
    snapshot
        .blocks
        .iter()
        .filter(|b| b.kind == kind)
        .min_by(|a, b| a.distance_to(origin).total_cmp(&b.distance_to(origin)))
        .map(|b| b.position())
}
