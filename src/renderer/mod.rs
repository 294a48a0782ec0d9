// 视频显示

pub mod egui_video_renderer;
pub mod surface;

pub use egui_video_renderer::EguiVideoRenderer;
pub use surface::VideoSurface;
