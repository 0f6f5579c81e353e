use resvg::tiny_skia::Transform;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl fmt::Display for ViewBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AxisAlign {
    Min,
    Mid,
    Max,
}

impl AxisAlign {
    fn offset(self, free_space: f32) -> f32 {
        match self {
            Self::Min => 0.0,
            Self::Mid => free_space / 2.0,
            Self::Max => free_space,
        }
    }
}

/// Parsed `preserveAspectRatio`. `align` is `None` for non-uniform scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AspectRatio {
    align: Option<(AxisAlign, AxisAlign)>,
    slice: bool,
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self {
            align: Some((AxisAlign::Mid, AxisAlign::Mid)),
            slice: false,
        }
    }
}

impl AspectRatio {
    /// Parses the attribute value, falling back to the SVG default
    /// (`xMidYMid meet`) for anything unrecognised.
    pub fn parse(value: &str) -> Self {
        let mut tokens = value.split_whitespace().peekable();
        if tokens.peek() == Some(&"defer") {
            tokens.next();
        }

        let align = match tokens.next() {
            Some("none") => None,
            Some(token) => match parse_align(token) {
                Some(align) => Some(align),
                None => return Self::default(),
            },
            None => return Self::default(),
        };

        let slice = match tokens.next() {
            Some("slice") => true,
            Some("meet") | None => false,
            Some(_) => return Self::default(),
        };

        Self { align, slice }
    }
}

fn parse_axis(token: &str) -> Option<AxisAlign> {
    match token {
        "Min" => Some(AxisAlign::Min),
        "Mid" => Some(AxisAlign::Mid),
        "Max" => Some(AxisAlign::Max),
        _ => None,
    }
}

fn parse_align(token: &str) -> Option<(AxisAlign, AxisAlign)> {
    let rest = token.strip_prefix('x')?;
    let (x, y) = rest.split_once('Y')?;
    Some((parse_axis(x)?, parse_axis(y)?))
}

/// The user-space to viewport transform an SVG viewer applies for the
/// given viewBox, aspect ratio and viewport size.
pub fn view_box_transform(
    view_box: ViewBox,
    aspect: AspectRatio,
    width: f32,
    height: f32,
) -> Transform {
    let sx = width / view_box.width;
    let sy = height / view_box.height;

    let Some((align_x, align_y)) = aspect.align else {
        return Transform::from_row(sx, 0.0, 0.0, sy, -view_box.x * sx, -view_box.y * sy);
    };

    let scale = if aspect.slice { sx.max(sy) } else { sx.min(sy) };
    let tx = -view_box.x * scale + align_x.offset(width - view_box.width * scale);
    let ty = -view_box.y * scale + align_y.offset(height - view_box.height * scale);

    Transform::from_row(scale, 0.0, 0.0, scale, tx, ty)
}

pub fn map_point(transform: Transform, x: f32, y: f32) -> (f32, f32) {
    (
        transform.sx * x + transform.kx * y + transform.tx,
        transform.ky * x + transform.sy * y + transform.ty,
    )
}

/// Maps a displacement, ignoring the translation part of `transform`.
pub fn map_vector(transform: Transform, x: f32, y: f32) -> (f32, f32) {
    (
        transform.sx * x + transform.kx * y,
        transform.ky * x + transform.sy * y,
    )
}
