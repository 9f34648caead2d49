pub mod clip;
pub mod compose;
pub mod headless;
pub mod surface;

pub use self::clip::ClipMask;
pub use self::compose::composite;
pub use self::headless::HeadlessSurface;
pub use self::surface::{LayerFrame, LayerKind, MapSurface, ViewGuard, ViewState};
