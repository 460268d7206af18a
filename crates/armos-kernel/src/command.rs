//! [`RotationCommand`] – immutable combined arm + wrist target.

use armos_types::WristRotationMode;

/// One combined motion request as classified at submission time.
///
/// Never mutated: a new request builds a new command and swaps it in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationCommand {
    arm_target: i32,
    wrist_target: f64,
    mode: WristRotationMode,
}

impl RotationCommand {
    /// Build a command; `wrist_target` is clamped to `[0, 1]`.
    pub fn new(arm_target: i32, wrist_target: f64, mode: WristRotationMode) -> Self {
        Self {
            arm_target,
            wrist_target: wrist_target.clamp(0.0, 1.0),
            mode,
        }
    }

    pub fn arm_target(&self) -> i32 {
        self.arm_target
    }

    pub fn wrist_target(&self) -> f64 {
        self.wrist_target
    }

    pub fn mode(&self) -> WristRotationMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrist_target_is_clamped() {
        let high = RotationCommand::new(10, 1.7, WristRotationMode::Asap);
        assert_eq!(high.wrist_target(), 1.0);
        let low = RotationCommand::new(10, -0.2, WristRotationMode::Asap);
        assert_eq!(low.wrist_target(), 0.0);
    }

    #[test]
    fn fields_are_preserved() {
        let cmd = RotationCommand::new(-350, 0.42, WristRotationMode::CompactWhileMovingArm);
        assert_eq!(cmd.arm_target(), -350);
        assert_eq!(cmd.wrist_target(), 0.42);
        assert_eq!(cmd.mode(), WristRotationMode::CompactWhileMovingArm);
    }
}
