pub mod celebration;
pub mod celebration_frames;
