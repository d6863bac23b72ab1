mod builder;
mod interface;
mod pattern;

pub use builder::CameraInterfaceBuilder;
pub use interface::CameraInterface;
pub use pattern::TestPattern;
