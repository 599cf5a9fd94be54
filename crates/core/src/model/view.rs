use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Orthographic,
    Perspective,
}

impl Projection {
    /// Value of the compiler's `--projection` flag.
    pub fn flag(self) -> &'static str {
        match self {
            Projection::Orthographic => "o",
            Projection::Perspective => "p",
        }
    }
}

/// Camera pose: translation, rotation (degrees) and distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub translate: [f64; 3],
    pub rotate: [f64; 3],
    pub distance: f64,
}

impl fmt::Display for CameraPose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [tx, ty, tz] = self.translate;
        let [rx, ry, rz] = self.rotate;
        write!(f, "{tx},{ty},{tz},{rx},{ry},{rz},{}", self.distance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSpec {
    pub name: &'static str,
    pub camera: CameraPose,
    pub projection: Projection,
}

const fn view(name: &'static str, rotate: [f64; 3], projection: Projection) -> ViewSpec {
    ViewSpec {
        name,
        camera: CameraPose {
            translate: [0.0, 0.0, 0.0],
            rotate,
            distance: 200.0,
        },
        projection,
    }
}

/// Fixed preview cameras, in render and index order.
pub static VIEWS: [ViewSpec; 4] = [
    view("iso", [55.0, 0.0, 25.0], Projection::Perspective),
    view("xy", [0.0, 0.0, 0.0], Projection::Orthographic),
    view("xz", [90.0, 0.0, 0.0], Projection::Perspective),
    view("yz", [90.0, 0.0, 90.0], Projection::Perspective),
];

pub fn view_by_name(name: &str) -> Option<&'static ViewSpec> {
    VIEWS.iter().find(|v| v.name == name)
}
