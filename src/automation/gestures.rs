use super::tree::Bounds;
use std::time::Duration;

pub const STROKE_DURATION: Duration = Duration::from_millis(300);
pub const SETTLE_DELAY: Duration = Duration::from_millis(800);
pub const RETRY_DELAY: Duration = Duration::from_millis(500);
pub const LEFT_ATTEMPTS: u32 = 8;
pub const RIGHT_ATTEMPTS: u32 = 4;
const PATH_STEPS: u32 = 5;
const MAX_JITTER: f32 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Swipe {
    pub start: Point,
    pub end: Point,
    pub duration: Duration,
}

impl Swipe {
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            start,
            end,
            duration: STROKE_DURATION,
        }
    }

    /// Start point followed by evenly spaced intermediate points ending at `end`.
    pub fn path(&self) -> Vec<Point> {
        let mut points = Vec::with_capacity(PATH_STEPS as usize + 1);
        points.push(self.start);
        for step in 1..=PATH_STEPS {
            let t = step as f32 / PATH_STEPS as f32;
            points.push(Point::new(
                self.start.x + (self.end.x - self.start.x) * t,
                self.start.y + (self.end.y - self.start.y) * t,
            ));
        }
        points
    }

    pub fn jittered(mut self, offset: f32) -> Self {
        self.start.x -= offset;
        self.end.x += offset;
        self
    }
}

pub fn jitter_for(attempt: u32) -> f32 {
    (attempt as f32 * 10.0).min(MAX_JITTER)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Left,
    Right,
}

impl SwipeDirection {
    pub fn label(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwipePlan {
    pub direction: SwipeDirection,
    pub attempts: u32,
    base: Swipe,
}

impl SwipePlan {
    /// Left pass first, then the right pass, both at 75% of screen height.
    pub fn full_screen(screen: Bounds) -> [SwipePlan; 2] {
        let width = screen.width() as f32;
        let left = screen.left as f32;
        let margin = width * 0.1;
        let y = screen.top as f32 + screen.height() as f32 * 0.75;
        let near = Point::new(left + margin, y);
        let far = Point::new(left + width - margin, y);

        [
            SwipePlan {
                direction: SwipeDirection::Left,
                attempts: LEFT_ATTEMPTS,
                base: Swipe::new(far, near),
            },
            SwipePlan {
                direction: SwipeDirection::Right,
                attempts: RIGHT_ATTEMPTS,
                base: Swipe::new(near, far),
            },
        ]
    }

    pub fn swipe_for_attempt(&self, attempt: u32) -> Swipe {
        self.base.jittered(jitter_for(attempt))
    }
}
