use super::frame::StereoFrame;

// Block effects that sit on the voice bus ahead of the master filter. Only
// distortion for now, but the engine holds them as trait objects so more
// can slot in without touching the render loop.
pub trait Effect: Send {
    fn process(&mut self, buf: &mut [StereoFrame]);

    // a bypassed effect is skipped entirely
    fn is_bypassed(&self) -> bool {
        false
    }
}

//distortion
pub struct Distortion {
    drive: f32,
}

impl Distortion {
    pub fn new(drive: f32) -> Self {
        Self {
            drive: drive.clamp(0.0, 1.0),
        }
    }

    pub fn set_drive(&mut self, drive: f32) {
        self.drive = drive.clamp(0.0, 1.0);
    }

    pub fn drive(&self) -> f32 {
        self.drive
    }
}

impl Effect for Distortion {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        let pre_gain = 1.0 + self.drive * 10.0;
        for f in buf.iter_mut() {
            f.left = (pre_gain * f.left.clamp(-1.0, 1.0)).tanh();
            f.right = (pre_gain * f.right.clamp(-1.0, 1.0)).tanh();
        }
    }

    fn is_bypassed(&self) -> bool {
        self.drive <= 0.0
    }
}
