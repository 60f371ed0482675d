pub mod daemon;
pub mod launcher;
pub mod niri;
pub mod util;
