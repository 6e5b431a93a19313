use plotters::style::RGBAColor;

// =============================================================================
// Scene Graph
// =============================================================================

/// A list of primitive drawing commands in pixel space.
/// The backend just executes these blindly.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: u32,
    pub height: u32,
    /// `None` leaves the surface transparent.
    pub background: Option<RGBAColor>,
    pub commands: Vec<DrawCommand>,
}

impl Scene {
    pub fn new(width: u32, height: u32, background: Option<RGBAColor>) -> Self {
        Self {
            width,
            height,
            background,
            commands: Vec::new(),
        }
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    DrawLine {
        points: Vec<(f64, f64)>,
        color: RGBAColor,
        width: f64,
    },
    DrawRect {
        // Top-Left, Bottom-Right
        tl: (f64, f64),
        br: (f64, f64),
        fill: RGBAColor,
    },
    DrawCircle {
        center: (f64, f64),
        radius: f64,
        fill: RGBAColor,
        stroke: Option<RGBAColor>,
    },
    DrawPolygon {
        points: Vec<(f64, f64)>,
        fill: RGBAColor,
        stroke: Option<(RGBAColor, f64)>,
    },
    DrawText {
        pos: (f64, f64),
        text: String,
        color: RGBAColor,
        size: f64,
        anchor: TextAnchor,
    },
}
