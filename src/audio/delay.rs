// Feedback delay wired the way the chain expects:
//
//   in ──► [line] ──► × feedback ──┬──► out (wet only)
//            ▲                     │
//            └─────────────────────┘
//
// so the first echo is already scaled by `feedback`, and each repeat by
// another factor of it. Time and feedback glide like the other chain params.

use super::param::SmoothedParam;

pub struct FeedbackDelay {
    buffer: Vec<f32>,
    write_pos: usize,
    sample_rate: f32,
    time: SmoothedParam,     // seconds
    feedback: SmoothedParam, // 0..0.99
}

impl FeedbackDelay {
    pub fn new(sample_rate: f32, max_seconds: f32, time: f32, feedback: f32, tau: f32) -> Self {
        let len = (max_seconds * sample_rate).ceil() as usize + 2;
        Self {
            buffer: vec![0.0; len.max(4)],
            write_pos: 0,
            sample_rate,
            time: SmoothedParam::new(time, tau, sample_rate),
            feedback: SmoothedParam::new(feedback, tau, sample_rate),
        }
    }

    pub fn set_time(&mut self, seconds: f32) {
        self.time.set_target(seconds);
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback.set_target(feedback);
    }

    pub fn time(&self) -> f32 {
        self.time.value()
    }

    pub fn feedback(&self) -> f32 {
        self.feedback.value()
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let len = self.buffer.len();
        let delay_samples = (self.time.next() * self.sample_rate).clamp(1.0, (len - 2) as f32);

        // fractional read behind the write head
        let read = self.write_pos as f32 - delay_samples;
        let read = if read < 0.0 { read + len as f32 } else { read };
        let i = read as usize % len;
        let frac = read - read.floor();
        let a = self.buffer[i];
        let b = self.buffer[(i + 1) % len];
        let delayed = a + (b - a) * frac;

        let wet = delayed * self.feedback.next();
        self.buffer[self.write_pos] = x + wet;
        self.write_pos = (self.write_pos + 1) % len;
        wet
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
    }
}
