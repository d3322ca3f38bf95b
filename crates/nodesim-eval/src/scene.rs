//! Scene time: the clock simulation nodes read.

/// Source of the current simulation time.
pub trait TimeSource {
    /// Scene time in frames, possibly fractional for subframes.
    fn current_simulation_time(&self) -> f32;

    /// Integer frame, truncated toward zero.
    fn current_frame_index(&self) -> i32 {
        self.current_simulation_time() as i32
    }
}

/// A fixed point in scene time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneTime {
    time: f32,
}

impl SceneTime {
    pub fn new(time: f32) -> Self {
        SceneTime { time }
    }

    pub fn at_frame(frame: i32) -> Self {
        SceneTime { time: frame as f32 }
    }
}

impl TimeSource for SceneTime {
    fn current_simulation_time(&self) -> f32 {
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_index_truncates() {
        assert_eq!(SceneTime::new(7.75).current_frame_index(), 7);
        assert_eq!(SceneTime::new(-1.5).current_frame_index(), -1);
        assert_eq!(SceneTime::at_frame(12).current_simulation_time(), 12.0);
    }
}
